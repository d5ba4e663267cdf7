mod common;

use std::thread;
use std::time::Duration;

use suscan_remote_analyzer::call::RemoteCall;
use suscan_remote_analyzer::{AnalyzerMessage, InitStatusKind, Session, SessionConfig};

use common::{sample_source_info, TestPeer};

#[test]
fn peer_initiated_force_eos_terminates_the_session_loops() {
    let peer = TestPeer::bind();
    let port = peer.port();

    let peer_thread = thread::spawn(move || {
        let mut conn = peer.accept();
        conn.send_hello(1, 0, [0u8; 32]);
        let _auth = conn.recv_auth();
        conn.send_source_info(sample_source_info(1_000_000));
        conn.send_call(RemoteCall::ForceEos);
    });

    let config = SessionConfig::new("127.0.0.1", port, "alice", "s3cret").unwrap();
    let (_session, events) = Session::connect(config);

    let mut saw_success = false;
    let mut saw_eos = false;
    for event in events.iter() {
        match event {
            AnalyzerMessage::StatusUpdate(status) if status.kind == InitStatusKind::Success => {
                saw_success = true;
            }
            AnalyzerMessage::Eos => {
                saw_eos = true;
                break;
            }
            _ => {}
        }
    }

    assert!(saw_success);
    assert!(saw_eos);

    // Once the RX loop posts EOS and exits, TX follows; both inbound
    // senders are dropped and the channel drains to disconnection.
    assert!(events.recv_timeout(Duration::from_secs(2)).is_err());

    peer_thread.join().unwrap();
}
