mod common;

use std::thread;
use std::time::{Duration, Instant};

use suscan_remote_analyzer::{AnalyzerMessage, InitStatusKind, Session, SessionConfig};

use common::{sample_source_info, TestPeer};

#[test]
fn dropping_a_session_with_rx_blocked_returns_promptly() {
    let peer = TestPeer::bind();
    let port = peer.port();

    let peer_thread = thread::spawn(move || {
        let mut conn = peer.accept();
        conn.send_hello(1, 0, [0u8; 32]);
        let _auth = conn.recv_auth();
        conn.send_source_info(sample_source_info(1_000_000));
        // Hold the connection open without sending anything further,
        // so the RX thread is parked inside read_pdu when dropped.
        thread::sleep(Duration::from_secs(3));
    });

    let config = SessionConfig::new("127.0.0.1", port, "alice", "s3cret").unwrap();
    let (session, events) = Session::connect(config);

    for event in events.iter() {
        if let AnalyzerMessage::StatusUpdate(status) = &event {
            if status.kind == InitStatusKind::Success {
                break;
            }
        }
    }

    let started = Instant::now();
    drop(session);
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "Session::drop should return within the cancellation budget"
    );

    peer_thread.join().unwrap();
}
