use sim_core::{ClientAction, SessionId, SessionOracle};

use crate::events::{Event, EventBus, SessionEvent};

/// Session oracle that turns scene requests into session events.
#[derive(Clone)]
pub struct ChannelSessionOracle {
    bus: EventBus,
}

impl ChannelSessionOracle {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl SessionOracle for ChannelSessionOracle {
    fn move_body(&self, session: SessionId, scene: &str, portal: Option<&str>) {
        tracing::debug!(target: "runtime::sessions", %session, scene, ?portal, "Moving body");
        self.bus.publish(Event::Session(SessionEvent::MoveBody {
            session,
            scene: scene.to_owned(),
            portal: portal.map(str::to_owned),
        }));
    }

    fn force_client_action(&self, session: SessionId, action: &ClientAction) {
        tracing::debug!(target: "runtime::sessions", %session, action = %action.name, "Forcing client action");
        self.bus.publish(Event::Session(SessionEvent::ClientAction {
            session,
            action: action.clone(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use sim_core::Value;

    use super::*;
    use crate::events::Topic;

    #[tokio::test]
    async fn requests_become_session_events() {
        let bus = EventBus::with_capacity(4);
        let mut rx = bus.subscribe(Topic::Session);
        let oracle = ChannelSessionOracle::new(bus);

        oracle.move_body(SessionId(2), "cellar", Some("stairs"));
        oracle.force_client_action(
            SessionId(2),
            &ClientAction {
                name: "shake".to_owned(),
                argument: Value::Number(0.5),
            },
        );

        match rx.recv().await.unwrap() {
            Event::Session(SessionEvent::MoveBody { session, scene, portal }) => {
                assert_eq!(session, SessionId(2));
                assert_eq!(scene, "cellar");
                assert_eq!(portal.as_deref(), Some("stairs"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        match rx.recv().await.unwrap() {
            Event::Session(SessionEvent::ClientAction { action, .. }) => {
                assert_eq!(action.name, "shake");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
