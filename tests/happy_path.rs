mod common;

use std::thread;
use std::time::Duration;

use suscan_remote_analyzer::{AnalyzerMessage, InitStatusKind, Session, SessionConfig};

use common::{sample_source_info, TestPeer};

#[test]
fn authenticates_and_caches_source_info() {
    let peer = TestPeer::bind();
    let port = peer.port();

    let peer_thread = thread::spawn(move || {
        let mut conn = peer.accept();
        conn.send_hello(1, 0, [0u8; 32]);
        let _auth = conn.recv_auth();
        conn.send_source_info(sample_source_info(1_000_000));
    });

    let config = SessionConfig::new("127.0.0.1", port, "alice", "s3cret").unwrap();
    let (session, events) = Session::connect(config);

    let mut progress_count = 0;
    let mut saw_success = false;
    let mut saw_source_info = false;

    for event in events.iter().take(5) {
        match event {
            AnalyzerMessage::StatusUpdate(status) if status.kind == InitStatusKind::Progress => {
                progress_count += 1;
            }
            AnalyzerMessage::StatusUpdate(status) if status.kind == InitStatusKind::Success => {
                saw_success = true;
                break;
            }
            AnalyzerMessage::SourceInfo(info) => {
                assert_eq!(info.source_samp_rate, 1_000_000);
                saw_source_info = true;
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    assert_eq!(progress_count, 3, "expected resolving/connecting/authenticating progress events");
    assert!(saw_success);
    assert!(saw_source_info);
    assert_eq!(session.source_info().source_samp_rate, 1_000_000);
    assert_eq!(session.get_samp_rate(), 1_000_000);

    peer_thread.join().unwrap();
    thread::sleep(Duration::from_millis(50));
}
