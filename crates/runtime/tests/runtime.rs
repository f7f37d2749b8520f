use std::path::PathBuf;
use std::time::Duration;

use runtime::{
    Event, LifecycleEvent, ReplicationEvent, Runtime, RuntimeConfig, RuntimeError, SessionEvent,
    Topic,
};
use sim_content::ContentFactory;
use sim_core::schema::ExpressionConfig;
use sim_core::{
    ActionConfig, ActorConfig, ActorKind, ClientAction, ConfigLibrary, EntityKey, EntryConfig,
    EntryId, HandlerConfig, HandlerKind, InputFrame, MobileConfig, SceneConfig, SceneError,
    SessionId, SimConfig, TargetConfig, Timestamp, Transform, Value, Vector2,
};
use tokio::sync::broadcast;
use tokio::time::timeout;

fn config() -> RuntimeConfig {
    RuntimeConfig {
        sim: SimConfig {
            default_stasis_interval: 0,
            ..SimConfig::with_seed(7)
        },
        auto_tick: false,
        ..RuntimeConfig::default()
    }
}

fn library() -> ConfigLibrary {
    ConfigLibrary::new()
        .with(
            "pawn",
            ActorConfig {
                kind: ActorKind::Pawn(MobileConfig::default()),
                ..ActorConfig::default()
            },
        )
        .with("crate", ActorConfig::default())
}

/// A bell that records signals and shakes the requesting client.
fn scene() -> SceneConfig {
    let bell = EntryConfig {
        name: "bell".to_owned(),
        handlers: vec![
            HandlerConfig::new(
                HandlerKind::Signal {
                    name: "ring".to_owned(),
                },
                ActionConfig::set_variable("rung", ExpressionConfig::constant(true)),
            ),
            HandlerConfig::new(
                HandlerKind::Request {
                    name: "pull".to_owned(),
                },
                ActionConfig::ForceClientAction {
                    target: TargetConfig::Activator,
                    action: ClientAction {
                        name: "shake".to_owned(),
                        argument: Value::Null,
                    },
                },
            ),
        ],
        ..EntryConfig::default()
    };
    SceneConfig {
        name: "belfry".to_owned(),
        entries: vec![bell],
        actors: Vec::new(),
    }
}

fn bell() -> EntityKey {
    EntityKey::Entry(EntryId(0))
}

async fn runtime() -> Runtime {
    Runtime::builder()
        .config(config())
        .scene(scene(), library())
        .build()
        .await
        .expect("runtime builds")
}

async fn next(rx: &mut broadcast::Receiver<Event>) -> Event {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event arrives in time")
        .expect("event channel open")
}

fn origin() -> Transform {
    Transform::new(Vector2::ZERO, 0.0)
}

// ============================================================================
// Building
// ============================================================================

#[tokio::test]
async fn build_requires_a_scene_source() {
    let result = Runtime::builder().config(config()).build().await;
    assert!(matches!(result, Err(RuntimeError::MissingScene)));
}

#[tokio::test]
async fn bundled_content_runs_under_the_runtime() {
    let data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../sim/content/data");
    let runtime = Runtime::builder()
        .config(config())
        .content(ContentFactory::new(data), "courtyard")
        .build()
        .await
        .expect("runtime builds");
    let handle = runtime.handle();
    let mut lifecycle = handle.subscribe(Topic::Lifecycle);

    for step in 1..=10 {
        handle.tick(Some(Timestamp(step * 100))).await.expect("tick");
    }
    let guards = handle
        .query(|scene| scene.tagged("guard").len())
        .await
        .expect("query");
    assert_eq!(guards, 1);

    let stopped_at = runtime.shutdown().await.expect("shutdown");
    assert!(stopped_at >= Timestamp(1_000));
    assert!(matches!(
        next(&mut lifecycle).await,
        Event::Lifecycle(LifecycleEvent::Stopped { scene, .. }) if scene == "courtyard"
    ));
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn occupants_move_and_receive_frames() {
    let runtime = runtime().await;
    let handle = runtime.handle();
    let mut frames = handle.subscribe(Topic::Replication);

    let pawn = handle
        .enter(SessionId(1), "pawn", origin())
        .await
        .expect("enter");
    assert_eq!(handle.occupants().await.expect("occupants"), vec![(SessionId(1), pawn)]);

    let frame = |timestamp| InputFrame {
        timestamp: Timestamp(timestamp),
        direction: Some(0.0),
        rotation: 0.0,
    };
    assert!(handle.submit_input(SessionId(1), frame(100)).await.expect("input"));
    assert!(!handle.submit_input(SessionId(1), frame(50)).await.expect("stale input"));

    assert_eq!(
        handle.tick(Some(Timestamp(1_100))).await.expect("tick"),
        Timestamp(1_100)
    );
    let snapshot = handle.snapshot(pawn).await.expect("snapshot").expect("pawn exists");
    assert!((snapshot.translation.x - 2.0).abs() < 1e-3);

    match next(&mut frames).await {
        Event::Replication(ReplicationEvent::Frame {
            session,
            actor,
            timestamp,
            replicas,
        }) => {
            assert_eq!(session, SessionId(1));
            assert_eq!(actor, pawn);
            assert_eq!(timestamp, Timestamp(1_100));
            assert!(replicas.iter().any(|replica| replica.snapshot.id == pawn));
        }
        other => panic!("unexpected event {other:?}"),
    }

    runtime.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn sessions_enter_once_and_leave_once() {
    let runtime = runtime().await;
    let handle = runtime.handle();
    let mut sessions = handle.subscribe(Topic::Session);

    let pawn = handle
        .enter(SessionId(3), "pawn", origin())
        .await
        .expect("enter");
    assert!(matches!(
        handle.enter(SessionId(3), "pawn", origin()).await,
        Err(RuntimeError::SessionOccupied(SessionId(3)))
    ));
    assert!(matches!(
        handle.enter(SessionId(4), "crate", origin()).await,
        Err(RuntimeError::Scene(SceneError::NotPawn(_)))
    ));

    assert_eq!(handle.leave(SessionId(3)).await.expect("leave"), pawn);
    assert!(matches!(
        handle.leave(SessionId(3)).await,
        Err(RuntimeError::UnknownSession(SessionId(3)))
    ));
    assert!(handle.occupants().await.expect("occupants").is_empty());

    assert!(matches!(
        next(&mut sessions).await,
        Event::Session(SessionEvent::Entered { session: SessionId(3), .. })
    ));
    assert!(matches!(
        next(&mut sessions).await,
        Event::Session(SessionEvent::Left { session: SessionId(3), actor }) if actor == pawn
    ));

    handle.tick(Some(Timestamp(100))).await.expect("tick");
    let remaining = handle.query(|scene| scene.actors().count()).await.expect("query");
    assert_eq!(remaining, 0);

    runtime.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn requests_reach_the_client_through_session_events() {
    let runtime = runtime().await;
    let handle = runtime.handle();
    let mut sessions = handle.subscribe(Topic::Session);

    handle
        .enter(SessionId(9), "pawn", origin())
        .await
        .expect("enter");
    assert!(handle.request_from(SessionId(9), bell(), "pull").await.expect("request"));
    assert!(matches!(
        handle.request_from(SessionId(5), bell(), "pull").await,
        Err(RuntimeError::UnknownSession(SessionId(5)))
    ));

    assert!(matches!(next(&mut sessions).await, Event::Session(SessionEvent::Entered { .. })));
    match next(&mut sessions).await {
        Event::Session(SessionEvent::ClientAction { session, action }) => {
            assert_eq!(session, SessionId(9));
            assert_eq!(action.name, "shake");
        }
        other => panic!("unexpected event {other:?}"),
    }

    runtime.shutdown().await.expect("shutdown");
}

// ============================================================================
// Reload
// ============================================================================

#[tokio::test]
async fn reload_keeps_logic_state_and_occupants() {
    let runtime = runtime().await;
    let handle = runtime.handle();
    let mut lifecycle = handle.subscribe(Topic::Lifecycle);

    handle
        .enter(SessionId(1), "pawn", Transform::new(Vector2::new(3.0, 1.0), 0.0))
        .await
        .expect("enter");
    assert!(handle.signal(bell(), "ring", None).await.expect("signal"));
    handle.tick(Some(Timestamp(500))).await.expect("tick");

    let mapped = handle.reload().await.expect("reload");
    assert!(mapped >= 2);

    let (rung, now) = handle
        .query(|scene| {
            let rung = scene
                .logic(EntityKey::Entry(EntryId(0)))
                .map(|logic| logic.variable("rung"))
                .unwrap_or_default();
            (rung, scene.now())
        })
        .await
        .expect("query");
    assert_eq!(rung, Value::Bool(true));
    assert_eq!(now, Timestamp(500));

    let occupants = handle.occupants().await.expect("occupants");
    assert_eq!(occupants.len(), 1);
    let (session, mirrored) = occupants[0];
    assert_eq!(session, SessionId(1));
    let snapshot = handle
        .snapshot(mirrored)
        .await
        .expect("snapshot")
        .expect("mirrored pawn exists");
    assert_eq!(snapshot.translation, Vector2::new(3.0, 1.0));
    assert_eq!(snapshot.config, "pawn");

    match next(&mut lifecycle).await {
        Event::Lifecycle(LifecycleEvent::Reloaded { scene, timestamp, .. }) => {
            assert_eq!(scene, "belfry");
            assert_eq!(timestamp, Timestamp(500));
        }
        other => panic!("unexpected event {other:?}"),
    }

    runtime.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn reload_picks_up_edited_content() {
    let data = tempfile::TempDir::new().expect("temp dir");
    let write = |relative: &str, content: &str| {
        let path = data.path().join(relative);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, content).expect("write");
    };
    write("config.toml", "seed = 3\n");
    write("actors.ron", r#"[("crate", (tags: ["prop"]))]"#);
    write(
        "scenes/gatehouse.ron",
        r#"(entries: [(name: "gate")], actors: [(config: "crate")])"#,
    );

    let runtime = Runtime::builder()
        .config(config())
        .content(ContentFactory::new(data.path()), "gatehouse")
        .build()
        .await
        .expect("runtime builds");
    let handle = runtime.handle();
    assert!(!handle.signal(bell(), "open", None).await.expect("signal"));

    write(
        "scenes/gatehouse.ron",
        r#"(
            entries: [
                (
                    name: "gate",
                    handlers: [(kind: Signal(name: "open"), action: SetVariable(name: "opened", value: Constant(Bool(true))))],
                ),
            ],
            actors: [(config: "crate")],
        )"#,
    );
    handle.reload().await.expect("reload");

    assert!(handle.signal(bell(), "open", None).await.expect("signal"));
    let (opened, props) = handle
        .query(|scene| {
            let opened = scene
                .logic(EntityKey::Entry(EntryId(0)))
                .map(|logic| logic.variable("opened"))
                .unwrap_or_default();
            (opened, scene.tagged("prop").len())
        })
        .await
        .expect("query");
    assert_eq!(opened, Value::Bool(true));
    assert_eq!(props, 1);

    runtime.shutdown().await.expect("shutdown");
}

// ============================================================================
// Scheduling
// ============================================================================

#[tokio::test]
async fn auto_tick_publishes_frames_without_commands() {
    let runtime = Runtime::builder()
        .config(RuntimeConfig {
            auto_tick: true,
            tick_interval: Duration::from_millis(10),
            ..config()
        })
        .scene(scene(), library())
        .build()
        .await
        .expect("runtime builds");
    let handle = runtime.handle();
    let mut frames = handle.subscribe(Topic::Replication);

    handle
        .enter(SessionId(2), "pawn", origin())
        .await
        .expect("enter");

    assert!(matches!(
        next(&mut frames).await,
        Event::Replication(ReplicationEvent::Frame { session: SessionId(2), .. })
    ));

    runtime.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn handles_fail_once_the_worker_stops() {
    let runtime = runtime().await;
    let handle = runtime.handle();

    runtime.shutdown().await.expect("shutdown");
    assert!(matches!(
        handle.tick(None).await,
        Err(RuntimeError::CommandChannelClosed)
    ));
}
