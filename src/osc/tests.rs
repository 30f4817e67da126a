//! Tests for the OSC router, listener and their interaction with state

use super::*;
use crate::state::{StateStore, Track};
use proptest::prelude::*;
use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::Level;

fn make_router() -> Router {
    Router::with_default_handlers(StateStore::new(), UnhandledPolicy::default()).unwrap()
}

/// Matches everything and counts calls
struct CountingHandler {
    calls: Arc<AtomicUsize>,
    succeed: bool,
}

impl MessageHandler for CountingHandler {
    fn name(&self) -> &str {
        "counting"
    }

    fn matches(&self, _address: &str) -> bool {
        true
    }

    fn handle(&self, _state: &StateStore, _address: &str, _args: &[OscType]) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.succeed
    }
}

#[test]
fn test_vu_sets_volume_only() {
    let router = make_router();

    let outcome = router.dispatch("/track/2/vu", &[OscType::Float(0.5)]);

    assert_eq!(outcome, DispatchOutcome::Handled);
    let track = router.state().get(2).unwrap();
    assert_eq!(
        track,
        Track {
            volume: 0.5,
            ..Track::new(2)
        }
    );
}

#[test]
fn test_mute_last_write_wins() {
    let router = make_router();

    router.dispatch("/track/7/mute", &[OscType::Bool(true)]);
    assert!(router.state().get(7).unwrap().muted);

    router.dispatch("/track/7/mute", &[OscType::Bool(false)]);
    assert!(!router.state().get(7).unwrap().muted);

    // REAPER sends toggles as floats
    router.dispatch("/track/7/mute", &[OscType::Float(1.0)]);
    assert!(router.state().get(7).unwrap().muted);
}

#[test]
fn test_all_default_suffixes() {
    let router = make_router();

    router.dispatch("/track/1/name", &[OscType::String("Kick".into())]);
    router.dispatch("/track/1/solo", &[OscType::Int(1)]);
    router.dispatch("/track/1/recarm", &[OscType::Float(1.0)]);

    let track = router.state().get(1).unwrap();
    assert_eq!(track.name, "Kick");
    assert!(track.solo);
    assert!(track.rec_armed);
    assert!(!track.muted);
    assert_eq!(track.volume, 1.0);
    assert_eq!(router.state().find_by_name("Kick").unwrap().id, 1);
}

#[test]
fn test_non_numeric_id_is_rejected() {
    let router = make_router();

    let outcome = router.dispatch("/track/abc/vu", &[OscType::Float(0.5)]);

    assert_eq!(outcome, DispatchOutcome::Rejected);
    assert!(router.state().is_empty());
}

#[test]
fn test_zero_args_is_handled_without_change() {
    let router = make_router();
    router.dispatch("/track/3/vu", &[OscType::Float(0.2)]);
    let before = router.state().list();

    assert_eq!(router.dispatch("/track/3/vu", &[]), DispatchOutcome::Handled);
    assert_eq!(router.dispatch("/track/4/mute", &[]), DispatchOutcome::Handled);

    assert_eq!(router.state().list(), before);
}

#[test]
fn test_unhandled_never_mutates() {
    for policy in [
        UnhandledPolicy::default(),
        UnhandledPolicy::silent(),
        UnhandledPolicy {
            enabled: true,
            level: Level::ERROR,
        },
    ] {
        let router = Router::with_default_handlers(StateStore::new(), policy).unwrap();

        assert_eq!(
            router.dispatch("/track/1/pan", &[OscType::Float(0.5)]),
            DispatchOutcome::Unhandled
        );
        assert_eq!(
            router.dispatch("/track/1/vu2", &[OscType::Float(0.5)]),
            DispatchOutcome::Unhandled
        );
        assert_eq!(router.dispatch("/time", &[]), DispatchOutcome::Unhandled);
        assert!(router.state().is_empty());
    }
}

/// In-memory sink for formatted log lines
#[derive(Clone, Default)]
struct LogBuffer(Arc<parking_lot::Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` under a subscriber that records every event, return the lines
fn capture_logs<F: FnOnce()>(f: F) -> Vec<String> {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_max_level(Level::TRACE)
        .with_ansi(false)
        .without_time()
        .finish();
    tracing::subscriber::with_default(subscriber, f);

    let output = String::from_utf8(buffer.0.lock().clone()).unwrap();
    output.lines().map(str::to_string).collect()
}

fn unhandled_lines(lines: &[String]) -> Vec<&String> {
    lines
        .iter()
        .filter(|line| line.contains("Unhandled OSC message"))
        .collect()
}

#[test]
fn test_unhandled_is_logged_at_configured_level() {
    for (level, label) in [(Level::ERROR, "ERROR"), (Level::INFO, "INFO")] {
        let router = Router::with_default_handlers(
            StateStore::new(),
            UnhandledPolicy {
                enabled: true,
                level,
            },
        )
        .unwrap();

        let lines = capture_logs(|| {
            router.dispatch("/track/1/pan", &[OscType::Float(0.5)]);
        });

        let unhandled = unhandled_lines(&lines);
        assert_eq!(unhandled.len(), 1, "{:?}", lines);
        assert!(unhandled[0].contains(label), "{}", unhandled[0]);
        assert!(unhandled[0].contains("/track/1/pan"));
        assert!(unhandled[0].contains("Float(0.5)"));
    }
}

#[test]
fn test_silent_policy_logs_nothing_for_unhandled() {
    let router = Router::with_default_handlers(StateStore::new(), UnhandledPolicy::silent()).unwrap();

    let lines = capture_logs(|| {
        router.dispatch("/track/1/pan", &[OscType::Float(0.5)]);
        router.dispatch("/time", &[]);
    });

    assert!(unhandled_lines(&lines).is_empty(), "{:?}", lines);
}

#[test]
fn test_handled_message_is_not_reported_unhandled() {
    let router = make_router();

    let lines = capture_logs(|| {
        router.dispatch("/track/1/vu", &[OscType::Float(0.5)]);
        // Rejected by its handler, still not unhandled
        router.dispatch("/track/abc/vu", &[OscType::Float(0.5)]);
    });

    assert!(unhandled_lines(&lines).is_empty(), "{:?}", lines);
    assert!(lines
        .iter()
        .any(|line| line.contains("Track 1 volume set to 0.5")));
}

#[test]
fn test_first_match_wins_without_fallthrough() {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let router = Router::new(
        StateStore::new(),
        vec![
            Box::new(CountingHandler {
                calls: first.clone(),
                succeed: false,
            }),
            Box::new(CountingHandler {
                calls: second.clone(),
                succeed: true,
            }),
        ],
        UnhandledPolicy::silent(),
    );

    assert_eq!(router.dispatch("/anything", &[]), DispatchOutcome::Rejected);
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 0);
}

#[test]
fn test_registration_order_is_dispatch_order() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut handlers = default_handlers().unwrap();
    handlers.push(Box::new(CountingHandler {
        calls: calls.clone(),
        succeed: true,
    }));
    let router = Router::new(StateStore::new(), handlers, UnhandledPolicy::silent());

    // Track handler claims it first
    router.dispatch("/track/1/vu", &[OscType::Float(0.1)]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Catch-all only sees what the track handlers skip
    assert_eq!(router.dispatch("/track/1/pan", &[]), DispatchOutcome::Handled);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(router.handler_names().last(), Some(&"counting"));
}

#[test]
fn test_dispatch_packet_flattens_bundles() {
    let router = make_router();
    let message = |addr: &str, arg: OscType| {
        OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args: vec![arg],
        })
    };
    let packet = OscPacket::Bundle(OscBundle {
        timetag: OscTime::from((0, 1)),
        content: vec![
            message("/track/1/vu", OscType::Float(0.25)),
            OscPacket::Bundle(OscBundle {
                timetag: OscTime::from((0, 1)),
                content: vec![message("/track/1/name", OscType::String("Bass".into()))],
            }),
            message("/master/vu", OscType::Float(0.9)),
        ],
    });

    let outcomes = router.dispatch_packet(&packet);

    assert_eq!(
        outcomes,
        vec![
            DispatchOutcome::Handled,
            DispatchOutcome::Handled,
            DispatchOutcome::Unhandled
        ]
    );
    let track = router.state().get(1).unwrap();
    assert_eq!(track.volume, 0.25);
    assert_eq!(track.name, "Bass");
}

proptest! {
    #[test]
    fn prop_vu_sets_volume(id in 0u32..100_000, v in -100.0f32..100.0) {
        let router = make_router();
        let address = format!("/track/{}/vu", id);

        prop_assert_eq!(router.dispatch(&address, &[OscType::Float(v)]), DispatchOutcome::Handled);

        let track = router.state().get(id).unwrap();
        prop_assert_eq!(track, Track { volume: f64::from(v), ..Track::new(id) });
    }

    #[test]
    fn prop_zero_args_leave_state_unchanged(
        id in 0u32..1_000,
        suffix in prop::sample::select(vec!["vu", "mute", "name", "solo", "recarm"]),
    ) {
        let router = make_router();
        router.dispatch("/track/0/name", &[OscType::String("Seed".into())]);
        let before = router.state().list();

        let address = format!("/track/{}/{}", id, suffix);
        prop_assert_eq!(router.dispatch(&address, &[]), DispatchOutcome::Handled);
        prop_assert_eq!(router.state().list(), before);
    }

    #[test]
    fn prop_foreign_addresses_are_unhandled(
        address in "/(master|fx|bus|time|marker)(/[a-z0-9]{1,6}){0,3}",
        enabled in any::<bool>(),
    ) {
        let policy = UnhandledPolicy { enabled, level: Level::DEBUG };
        let router = Router::with_default_handlers(StateStore::new(), policy).unwrap();

        prop_assert_eq!(router.dispatch(&address, &[OscType::Float(1.0)]), DispatchOutcome::Unhandled);
        prop_assert!(router.state().is_empty());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatch_distinct_ids() {
    let router = Arc::new(make_router());

    let tasks: Vec<_> = (0..100u32)
        .map(|id| {
            let router = router.clone();
            tokio::spawn(async move {
                let address = format!("/track/{}/vu", id);
                router.dispatch(&address, &[OscType::Float(id as f32 / 100.0)])
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), DispatchOutcome::Handled);
    }

    let tracks = router.state().list();
    assert_eq!(tracks.len(), 100);
    for track in tracks {
        assert_eq!(track.volume, f64::from(track.id as f32 / 100.0));
        assert!(!track.muted);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatch_same_track_different_attributes() {
    let router = Arc::new(make_router());

    let messages: Vec<(&str, OscType)> = vec![
        ("/track/9/vu", OscType::Float(0.4)),
        ("/track/9/mute", OscType::Bool(true)),
        ("/track/9/solo", OscType::Bool(true)),
        ("/track/9/recarm", OscType::Bool(true)),
        ("/track/9/name", OscType::String("Lead".into())),
    ];
    let tasks: Vec<_> = messages
        .into_iter()
        .map(|(addr, arg)| {
            let router = router.clone();
            tokio::spawn(async move { router.dispatch(addr, &[arg]) })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let track = router.state().get(9).unwrap();
    assert_eq!(router.state().len(), 1);
    assert_eq!(track.volume, f64::from(0.4f32));
    assert!(track.muted && track.solo && track.rec_armed);
    assert_eq!(track.name, "Lead");
}

// ===== Listener over a real loopback socket =====

async fn send_packet(socket: &UdpSocket, target: std::net::SocketAddr, packet: &OscPacket) {
    let buf = rosc::encoder::encode(packet).unwrap();
    socket.send_to(&buf, target).await.unwrap();
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_listener_routes_datagrams() {
    let router = Arc::new(make_router());
    let state = router.state().clone();
    let listener = Listener::bind("127.0.0.1:0", router).await.unwrap();
    let handle = listener.spawn().unwrap();
    let target = handle.local_addr();

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    // Garbage first: must not stop the loop
    client.send_to(b"not osc", target).await.unwrap();
    send_packet(
        &client,
        target,
        &OscPacket::Message(OscMessage {
            addr: "/track/5/name".to_string(),
            args: vec![OscType::String("Guitar".into())],
        }),
    )
    .await;
    send_packet(
        &client,
        target,
        &OscPacket::Message(OscMessage {
            addr: "/track/6/vu".to_string(),
            args: vec![OscType::Float(0.75)],
        }),
    )
    .await;

    wait_for(|| state.len() == 2).await;
    assert_eq!(state.find_by_name("Guitar").unwrap().id, 5);
    assert_eq!(state.get(6).unwrap().volume, 0.75);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_listener_bind_conflict_is_an_error() {
    let taken = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap().to_string();

    let result = Listener::bind(&addr, Arc::new(make_router())).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_listener_stops_on_shutdown() {
    let router = Arc::new(make_router());
    let state = router.state().clone();
    let handle = Listener::bind("127.0.0.1:0", router)
        .await
        .unwrap()
        .spawn()
        .unwrap();
    let target = handle.local_addr();

    tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
        .await
        .unwrap()
        .unwrap();

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    send_packet(
        &client,
        target,
        &OscPacket::Message(OscMessage {
            addr: "/track/1/vu".to_string(),
            args: vec![OscType::Float(0.5)],
        }),
    )
    .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(state.is_empty());
}

#[tokio::test]
async fn test_listener_keeps_running_after_handle_dropped() {
    let router = Arc::new(make_router());
    let state = router.state().clone();
    let handle = Listener::bind("127.0.0.1:0", router)
        .await
        .unwrap()
        .spawn()
        .unwrap();
    let target = handle.local_addr();
    drop(handle);

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    send_packet(
        &client,
        target,
        &OscPacket::Message(OscMessage {
            addr: "/track/1/vu".to_string(),
            args: vec![OscType::Float(0.5)],
        }),
    )
    .await;

    wait_for(|| state.len() == 1).await;
    assert_eq!(state.get(1).unwrap().volume, 0.5);
}
