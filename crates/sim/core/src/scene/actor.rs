//! Live actor state.
//!
//! An [`Actor`] is the authoritative record of one simulated entity. Its
//! [`ActorRole`] carries what kind of actor it is: static props, mobiles driven by
//! an advancer, agents driven by a behavior, and pawns replaying client input.

use std::collections::VecDeque;
use std::sync::Arc;

use super::SpawnOrigin;
use super::advancer::{AdvanceEnv, Advancer, Body, LinearAdvancer};
use crate::config::SimConfig;
use crate::geom::{Shape, Transform, Vector2};
use crate::logic::{BehaviorLogic, HandlerLogic, LogicError};
use crate::schema::{ActorConfig, ActorKind, LogicClass, MobileConfig};
use crate::state::{
    ActorDelta, ActorFlags, ActorId, ActorSnapshot, EntityKey, FlagTable, LogicBase,
    MotionSnapshot, Timestamp,
};

/// One client input sample for a pawn.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputFrame {
    pub timestamp: Timestamp,
    /// Heading to move along; `None` stands still.
    pub direction: Option<f32>,
    pub rotation: f32,
}

/// Advancer-driven movement shared by mobiles, agents and pawns.
#[derive(Debug)]
pub struct Mobile {
    pub(crate) advancer: Box<dyn Advancer>,
    pub direction: f32,
    pub base_speed: f32,
    pub speed_override: Option<f32>,
    pub moving: bool,
    pub stasis: bool,
    /// Last time replication observed the actor.
    pub last_observed: Timestamp,
    /// 0 disables stasis.
    pub stasis_interval: i64,
}

impl Mobile {
    fn new(config: &MobileConfig, created: Timestamp, sim: &SimConfig) -> Self {
        Self {
            advancer: Box::new(LinearAdvancer::new(created, config.sub_step)),
            direction: 0.0,
            base_speed: config.speed,
            speed_override: None,
            moving: false,
            stasis: false,
            last_observed: created,
            stasis_interval: config
                .stasis_interval
                .unwrap_or(sim.default_stasis_interval)
                .max(0),
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed_override.unwrap_or(self.base_speed)
    }

    /// True once the actor has gone unobserved for longer than its interval.
    pub fn stasis_due(&self, now: Timestamp) -> bool {
        self.stasis_interval > 0 && now - self.last_observed > self.stasis_interval
    }
}

#[derive(Debug)]
pub struct AgentState {
    pub target_rotation: Option<f32>,
    pub turn_rate: f32,
    /// Empty while the behavior is running.
    pub(crate) behavior: Option<BehaviorLogic>,
    /// Synced from the behavior after every call into it.
    pub(crate) current_target: Option<EntityKey>,
}

impl AgentState {
    pub fn behavior(&self) -> Option<&BehaviorLogic> {
        self.behavior.as_ref()
    }

    pub fn current_target(&self) -> Option<EntityKey> {
        self.current_target
    }
}

#[derive(Debug, Default)]
pub struct PawnState {
    pub(crate) inputs: VecDeque<InputFrame>,
    /// Timestamp of the newest accepted frame.
    pub(crate) last_input: Option<Timestamp>,
}

impl PawnState {
    pub fn pending_inputs(&self) -> usize {
        self.inputs.len()
    }
}

#[derive(Debug)]
pub enum ActorRole {
    Static,
    Mobile(Mobile),
    Agent(Mobile, AgentState),
    Pawn(Mobile, PawnState),
}

/// Per-tick replication cache.
#[derive(Clone, Debug, Default)]
pub(crate) struct ReplicationCache {
    pub tick: Option<Timestamp>,
    pub current: Option<ActorSnapshot>,
    pub delta: Option<ActorDelta>,
}

#[derive(Debug)]
pub struct Actor {
    id: ActorId,
    pub base: LogicBase,
    config: Arc<ActorConfig>,
    flag_table: FlagTable,
    pub(crate) flags: ActorFlags,
    pub(crate) created: Timestamp,
    pub(crate) destroyed: Option<Timestamp>,
    pub(crate) end_scene: bool,
    pub(crate) shape: Shape,
    source: Option<EntityKey>,
    activator: Option<EntityKey>,
    /// A slot is empty while its handler is running.
    pub(crate) handlers: Vec<Option<HandlerLogic>>,
    pub(crate) role: ActorRole,
    pub(crate) replication: ReplicationCache,
}

impl Actor {
    pub(crate) fn new(
        id: ActorId,
        config: Arc<ActorConfig>,
        transform: Transform,
        created: Timestamp,
        origin: SpawnOrigin,
        sim: &SimConfig,
    ) -> Self {
        let mut base = LogicBase::new(id.into(), transform, config.tags.iter().cloned());
        for (name, value) in &config.variables {
            base.set_variable(name, value.clone());
        }
        let role = match &config.kind {
            ActorKind::Static => ActorRole::Static,
            ActorKind::Mobile(mobile) => ActorRole::Mobile(Mobile::new(mobile, created, sim)),
            ActorKind::Agent(agent) => ActorRole::Agent(
                Mobile::new(&agent.mobile, created, sim),
                AgentState {
                    target_rotation: None,
                    turn_rate: agent.turn_rate,
                    behavior: Some(BehaviorLogic::new(&agent.behavior)),
                    current_target: None,
                },
            ),
            ActorKind::Pawn(mobile) => {
                ActorRole::Pawn(Mobile::new(mobile, created, sim), PawnState::default())
            }
        };
        Self {
            id,
            base,
            flag_table: FlagTable::new(&config.flags),
            flags: ActorFlags::empty(),
            created,
            destroyed: None,
            end_scene: false,
            shape: config.shape.at(&transform),
            source: origin.source,
            activator: origin.activator,
            handlers: config
                .handlers
                .iter()
                .map(|handler| Some(HandlerLogic::new(handler)))
                .collect(),
            role,
            replication: ReplicationCache::default(),
            config,
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn config(&self) -> &ActorConfig {
        &self.config
    }

    pub fn shared_config(&self) -> Arc<ActorConfig> {
        self.config.clone()
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn flags(&self) -> ActorFlags {
        self.flags
    }

    pub fn created(&self) -> Timestamp {
        self.created
    }

    pub fn destroyed(&self) -> Option<Timestamp> {
        self.destroyed
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.is_some()
    }

    /// Entity whose logic spawned this actor.
    pub fn source(&self) -> Option<EntityKey> {
        self.source
    }

    pub fn activator(&self) -> Option<EntityKey> {
        self.activator
    }

    /// Reads a named flag bit; `None` when the name is not in the flag table.
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.flag_table.get(name).map(|bit| self.flags.contains(bit))
    }

    pub fn set_flag(&mut self, name: &str, value: bool) -> Result<(), LogicError> {
        let bit = self.flag_table.get(name).ok_or_else(|| LogicError::UnknownFlag {
            actor: self.id(),
            flag: name.to_owned(),
        })?;
        self.flags.set(bit, value);
        Ok(())
    }

    pub fn is_instance_of(&self, class: LogicClass) -> bool {
        match class {
            LogicClass::Actor => true,
            LogicClass::Mobile => self.mobile().is_some(),
            LogicClass::Agent => matches!(self.role, ActorRole::Agent(..)),
            LogicClass::Pawn => matches!(self.role, ActorRole::Pawn(..)),
            LogicClass::Entry => false,
        }
    }

    pub fn role(&self) -> &ActorRole {
        &self.role
    }

    pub fn mobile(&self) -> Option<&Mobile> {
        match &self.role {
            ActorRole::Static => None,
            ActorRole::Mobile(mobile) | ActorRole::Agent(mobile, _) | ActorRole::Pawn(mobile, _) => {
                Some(mobile)
            }
        }
    }

    pub fn mobile_mut(&mut self) -> Option<&mut Mobile> {
        match &mut self.role {
            ActorRole::Static => None,
            ActorRole::Mobile(mobile) | ActorRole::Agent(mobile, _) | ActorRole::Pawn(mobile, _) => {
                Some(mobile)
            }
        }
    }

    pub fn agent(&self) -> Option<&AgentState> {
        match &self.role {
            ActorRole::Agent(_, agent) => Some(agent),
            _ => None,
        }
    }

    pub fn agent_mut(&mut self) -> Option<&mut AgentState> {
        match &mut self.role {
            ActorRole::Agent(_, agent) => Some(agent),
            _ => None,
        }
    }

    pub fn pawn(&self) -> Option<&PawnState> {
        match &self.role {
            ActorRole::Pawn(_, pawn) => Some(pawn),
            _ => None,
        }
    }

    pub(crate) fn pawn_mut(&mut self) -> Option<(&mut Mobile, &mut PawnState)> {
        match &mut self.role {
            ActorRole::Pawn(mobile, pawn) => Some((mobile, pawn)),
            _ => None,
        }
    }

    pub fn in_stasis(&self) -> bool {
        self.mobile().is_some_and(|mobile| mobile.stasis)
    }

    /// Integrates movement up to `timestamp`; static actors are left alone.
    pub(crate) fn advance(
        &mut self,
        env: &dyn AdvanceEnv,
        timestamp: Timestamp,
        penetrations: &mut Vec<Vector2>,
    ) {
        let (mobile, target_rotation, turn_rate) = match &mut self.role {
            ActorRole::Static => return,
            ActorRole::Mobile(mobile) | ActorRole::Pawn(mobile, _) => (mobile, None, 0.0),
            ActorRole::Agent(mobile, agent) => (mobile, agent.target_rotation, agent.turn_rate),
        };
        let mut body = Body {
            transform: self.base.transform,
            shape: self.config.shape,
            mask: self.config.collision_mask,
            direction: mobile.direction,
            speed: mobile.speed(),
            moving: mobile.moving,
            target_rotation,
            turn_rate,
        };
        mobile.advancer.advance(&mut body, env, timestamp, penetrations);
        self.base.transform = body.transform;
    }

    /// Places the configured shape at the current transform.
    pub(crate) fn placed_shape(&self) -> Shape {
        self.config.shape.at(&self.base.transform)
    }

    pub fn snapshot(&self) -> ActorSnapshot {
        ActorSnapshot {
            id: self.id(),
            config: self.config.name.clone(),
            created: self.created,
            destroyed: self.destroyed,
            translation: self.base.transform.translation,
            rotation: self.base.transform.rotation,
            flags: self.flags,
            motion: self.mobile().map(|mobile| MotionSnapshot {
                direction: mobile.direction,
                speed: mobile.speed(),
                moving: mobile.moving,
            }),
        }
    }

    /// Copies physical and flag state from the mirrored actor of a retiring
    /// scene. References are rewritten by the caller.
    pub(crate) fn transfer_state(&mut self, source: &Actor, now: Timestamp) {
        self.base.transfer(&source.base);
        self.flags = source.flags;
        self.shape = self.placed_shape();
        if let (Some(mobile), Some(from)) = (self.mobile_mut(), source.mobile()) {
            mobile.direction = from.direction;
            mobile.speed_override = from.speed_override;
            mobile.moving = from.moving;
            mobile.stasis = from.stasis;
            mobile.last_observed = from.last_observed;
            mobile.advancer.jump(now);
        }
        if let (Some(agent), Some(from)) = (self.agent_mut(), source.agent()) {
            agent.target_rotation = from.target_rotation;
        }
        if let (Some((_, pawn)), Some(from)) = (self.pawn_mut(), source.pawn()) {
            pawn.inputs = from.inputs.clone();
            pawn.last_input = from.last_input;
        }
    }

    pub(crate) fn set_origin(&mut self, source: Option<EntityKey>, activator: Option<EntityKey>) {
        self.source = source;
        self.activator = activator;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AgentConfig;

    fn actor(kind: ActorKind) -> Actor {
        let config = ActorConfig {
            name: "crate".to_owned(),
            kind,
            flags: vec!["open".to_owned()],
            ..ActorConfig::default()
        };
        Actor::new(
            ActorId(3),
            Arc::new(config),
            Transform::new(Vector2::new(1.0, 2.0), 0.0),
            Timestamp(100),
            SpawnOrigin::default(),
            &SimConfig::new(),
        )
    }

    #[test]
    fn flags_resolve_through_the_table() {
        let mut actor = actor(ActorKind::Static);
        assert_eq!(actor.flag("open"), Some(false));
        assert_eq!(actor.flag("missing"), None);

        actor.set_flag("open", true).unwrap();
        assert_eq!(actor.flag("open"), Some(true));
        assert!(matches!(
            actor.set_flag("missing", true),
            Err(LogicError::UnknownFlag { .. })
        ));
    }

    #[test]
    fn class_membership_follows_the_role() {
        let prop = actor(ActorKind::Static);
        assert!(prop.is_instance_of(LogicClass::Actor));
        assert!(!prop.is_instance_of(LogicClass::Mobile));

        let agent = actor(ActorKind::Agent(AgentConfig::default()));
        assert!(agent.is_instance_of(LogicClass::Mobile));
        assert!(agent.is_instance_of(LogicClass::Agent));
        assert!(!agent.is_instance_of(LogicClass::Pawn));
        assert!(!agent.is_instance_of(LogicClass::Entry));
    }

    #[test]
    fn snapshot_carries_motion_for_mobiles_only() {
        assert!(actor(ActorKind::Static).snapshot().motion.is_none());

        let pawn = actor(ActorKind::Pawn(MobileConfig::default()));
        let snapshot = pawn.snapshot();
        assert_eq!(snapshot.config, "crate");
        assert_eq!(snapshot.created, Timestamp(100));
        assert_eq!(snapshot.translation, Vector2::new(1.0, 2.0));
        assert_eq!(
            snapshot.motion,
            Some(MotionSnapshot {
                direction: 0.0,
                speed: MobileConfig::default().speed,
                moving: false,
            })
        );
    }
}
