mod common;

use std::thread;

use suscan_remote_analyzer::{AnalyzerMessage, InitStatusKind, Session, SessionConfig};

use common::TestPeer;

#[test]
fn older_server_major_version_is_rejected_as_incompatible() {
    let peer = TestPeer::bind();
    let port = peer.port();

    let peer_thread = thread::spawn(move || {
        let mut conn = peer.accept();
        conn.send_hello(0, 9, [0u8; 32]);
    });

    let config = SessionConfig::new("127.0.0.1", port, "alice", "s3cret").unwrap();
    let (_session, events) = Session::connect(config);

    let mut final_status = None;
    for event in events.iter() {
        if let AnalyzerMessage::StatusUpdate(status) = event {
            if status.kind != InitStatusKind::Progress {
                final_status = Some(status);
                break;
            }
        }
    }

    let status = final_status.expect("expected a terminal status event");
    assert_eq!(status.kind, InitStatusKind::Failure);
    assert!(status.message.unwrap().to_lowercase().contains("incompatible"));

    peer_thread.join().unwrap();
}
