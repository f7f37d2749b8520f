//! Sequential step scripts for agents.

use tracing::{debug, warn};

use super::PathFollower;
use crate::logic::{
    ActionLogic, ConditionLogic, IntervalId, LogicContext, LogicNode, TargetLogic,
    TransferContext,
};
use crate::schema::StepConfig;
use crate::state::Timestamp;

/// Step transitions allowed in a single tick; bounds `Goto` loops that never wait.
const MAX_TRANSITIONS_PER_TICK: usize = 64;

#[derive(Debug)]
pub enum StepLogic {
    Wait {
        duration: i64,
    },
    Move {
        target: TargetLogic,
    },
    Rotate {
        rotation: f32,
        relative: bool,
    },
    Condition {
        condition: ConditionLogic,
        timeout: i64,
        success: Option<usize>,
        failure: Option<usize>,
    },
    Branch {
        condition: ConditionLogic,
        success: Option<usize>,
        failure: Option<usize>,
    },
    Goto {
        step: usize,
    },
    Action(ActionLogic),
    SetSpeed {
        speed: f32,
    },
    ClearSpeed,
}

/// Outcome of ticking the current step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Progress {
    Running,
    Next,
    Jump(usize),
}

impl StepLogic {
    pub fn new(config: &StepConfig) -> Self {
        match config {
            StepConfig::Wait { duration } => StepLogic::Wait {
                duration: *duration,
            },
            StepConfig::Move { target } => StepLogic::Move {
                target: TargetLogic::new(target),
            },
            StepConfig::Rotate { rotation, relative } => StepLogic::Rotate {
                rotation: *rotation,
                relative: *relative,
            },
            StepConfig::Condition {
                condition,
                timeout,
                success,
                failure,
            } => StepLogic::Condition {
                condition: ConditionLogic::new(condition),
                timeout: *timeout,
                success: *success,
                failure: *failure,
            },
            StepConfig::Branch {
                condition,
                success,
                failure,
            } => StepLogic::Branch {
                condition: ConditionLogic::new(condition),
                success: *success,
                failure: *failure,
            },
            StepConfig::Goto { step } => StepLogic::Goto { step: *step },
            StepConfig::Action(action) => StepLogic::Action(ActionLogic::new(action)),
            StepConfig::SetSpeed { speed } => StepLogic::SetSpeed { speed: *speed },
            StepConfig::ClearSpeed => StepLogic::ClearSpeed,
        }
    }

    fn jump(target: Option<usize>) -> Progress {
        target.map_or(Progress::Next, Progress::Jump)
    }
}

impl LogicNode for StepLogic {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        match self {
            StepLogic::Move { target } => target.fire_interval(ctx, id),
            StepLogic::Condition { condition, .. } | StepLogic::Branch { condition, .. } => {
                condition.fire_interval(ctx, id)
            }
            StepLogic::Action(action) => action.fire_interval(ctx, id),
            _ => false,
        }
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        match self {
            StepLogic::Move { target } => target.collect_intervals(out),
            StepLogic::Condition { condition, .. } | StepLogic::Branch { condition, .. } => {
                condition.collect_intervals(out)
            }
            StepLogic::Action(action) => action.collect_intervals(out),
            _ => {}
        }
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        match (self, source) {
            (StepLogic::Move { target }, StepLogic::Move { target: from }) => {
                target.transfer(from, tx)
            }
            (
                StepLogic::Condition { condition, .. },
                StepLogic::Condition {
                    condition: from, ..
                },
            )
            | (StepLogic::Branch { condition, .. }, StepLogic::Branch { condition: from, .. }) => {
                condition.transfer(from, tx)
            }
            (StepLogic::Action(action), StepLogic::Action(from)) => action.transfer(from, tx),
            _ => {}
        }
    }
}

/// Runs steps in order; a step ends when its tick reports completion.
#[derive(Debug)]
pub struct ScriptedLogic {
    steps: Vec<StepLogic>,
    index: usize,
    /// Set while the current step is in progress.
    began: Option<Timestamp>,
    follower: PathFollower,
    finished: bool,
}

impl ScriptedLogic {
    pub fn new(steps: &[StepConfig]) -> Self {
        Self {
            steps: steps.iter().map(StepLogic::new).collect(),
            index: 0,
            began: None,
            follower: PathFollower::default(),
            finished: false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn start(&mut self, _ctx: &mut LogicContext<'_>) {
        self.index = 0;
        self.began = None;
        self.finished = false;
        self.follower.clear();
    }

    pub fn tick(&mut self, ctx: &mut LogicContext<'_>) {
        for _ in 0..MAX_TRANSITIONS_PER_TICK {
            if self.finished {
                return;
            }
            if self.index >= self.steps.len() {
                self.finished = true;
                ctx.scene.halt(ctx.source);
                debug!(target: "sim::behavior", source = %ctx.source, "Script finished");
                return;
            }
            match self.run_step(ctx) {
                Progress::Running => return,
                Progress::Next => self.enter(self.index + 1),
                Progress::Jump(step) => self.enter(step),
            }
        }
        warn!(
            target: "sim::behavior",
            source = %ctx.source,
            step = self.index,
            "Script made no progress within one tick"
        );
    }

    pub fn stop(&mut self, ctx: &mut LogicContext<'_>) {
        self.follower.clear();
        ctx.scene.halt(ctx.source);
    }

    fn enter(&mut self, step: usize) {
        self.index = step;
        self.began = None;
        self.follower.clear();
    }

    fn run_step(&mut self, ctx: &mut LogicContext<'_>) -> Progress {
        let now = ctx.now();
        let first = self.began.is_none();
        let began = *self.began.get_or_insert(now);
        match &mut self.steps[self.index] {
            StepLogic::Wait { duration } => {
                if now - began >= *duration {
                    Progress::Next
                } else {
                    Progress::Running
                }
            }
            StepLogic::Move { target } => {
                if first {
                    let destination = target
                        .resolve_first(ctx, None)
                        .and_then(|key| ctx.scene.logic(key))
                        .map(|logic| logic.transform.translation);
                    match destination {
                        Some(destination) => self.follower.set([destination]),
                        None => return Progress::Next,
                    }
                }
                if self.follower.step(ctx) {
                    Progress::Next
                } else {
                    Progress::Running
                }
            }
            StepLogic::Rotate { rotation, relative } => {
                let base = if *relative {
                    ctx.scene
                        .logic(ctx.source)
                        .map_or(0.0, |logic| logic.transform.rotation)
                } else {
                    0.0
                };
                ctx.scene.face(ctx.source, base + *rotation);
                Progress::Next
            }
            StepLogic::Condition {
                condition,
                timeout,
                success,
                failure,
            } => {
                if condition.is_satisfied(ctx, None) {
                    StepLogic::jump(*success)
                } else if *timeout > 0 && now - began >= *timeout {
                    StepLogic::jump(*failure)
                } else {
                    Progress::Running
                }
            }
            StepLogic::Branch {
                condition,
                success,
                failure,
            } => {
                if condition.is_satisfied(ctx, None) {
                    StepLogic::jump(*success)
                } else {
                    StepLogic::jump(*failure)
                }
            }
            StepLogic::Goto { step } => Progress::Jump(*step),
            StepLogic::Action(action) => {
                let agent = Some(ctx.source);
                action.execute(ctx, now, agent);
                Progress::Next
            }
            StepLogic::SetSpeed { speed } => {
                ctx.scene.set_speed(ctx.source, Some(*speed));
                Progress::Next
            }
            StepLogic::ClearSpeed => {
                ctx.scene.set_speed(ctx.source, None);
                Progress::Next
            }
        }
    }
}

impl LogicNode for ScriptedLogic {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        self.steps.fire_interval(ctx, id)
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        self.steps.collect_intervals(out);
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        self.index = source.index;
        self.began = source.began;
        self.follower = source.follower.clone();
        self.finished = source.finished;
        self.steps.transfer(&source.steps, tx);
    }
}
