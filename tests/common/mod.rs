//! Shared loopback test-double peer for session integration scenarios.
//!
//! Speaks just enough of the wire protocol to drive the connect-and-auth
//! sequence and push calls afterward, from the "other side" of a real
//! `TcpListener` socket — no mocking of the session's transport layer.

use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use suscan_remote_analyzer::call::RemoteCall;
use suscan_remote_analyzer::auth::{ClientAuth, ServerHello};
use suscan_remote_analyzer::framing::{self, CancelToken};
use suscan_remote_analyzer::source_info::SourceInfo;

pub struct TestPeer {
    listener: TcpListener,
}

impl TestPeer {
    pub fn bind() -> Self {
        Self {
            listener: TcpListener::bind("127.0.0.1:0").unwrap(),
        }
    }

    pub fn port(&self) -> u16 {
        self.listener.local_addr().unwrap().port()
    }

    pub fn accept(&self) -> PeerConnection {
        let (stream, _) = self.listener.accept().unwrap();
        PeerConnection {
            stream,
            cancel: CancelToken::new(),
        }
    }
}

pub struct PeerConnection {
    stream: TcpStream,
    cancel: CancelToken,
}

impl PeerConnection {
    pub fn send_hello(&mut self, major: u8, minor: u8, salt: [u8; 32]) -> ServerHello {
        let mut hello = ServerHello::new("test-peer");
        hello.protocol_version_major = major;
        hello.protocol_version_minor = minor;
        hello.salt = salt;

        let mut buf = suscan_remote_analyzer::buffer::GrowBuf::new();
        hello.serialize(&mut buf);
        framing::write_pdu(&mut self.stream, buf.data()).unwrap();
        hello
    }

    pub fn recv_auth(&mut self) -> ClientAuth {
        let body = framing::read_pdu(&self.stream, &self.cancel, Some(Duration::from_secs(5)), Duration::from_secs(5)).unwrap();
        let mut cur = suscan_remote_analyzer::buffer::Cursor::new(&body);
        match RemoteCall::deserialize(&mut cur).unwrap() {
            RemoteCall::AuthInfo(auth) => auth,
            other => panic!("expected AuthInfo call, got {other:?}"),
        }
    }

    pub fn send_call(&mut self, call: RemoteCall) {
        let mut buf = suscan_remote_analyzer::buffer::GrowBuf::new();
        call.serialize(&mut buf);
        framing::write_pdu(&mut self.stream, buf.data()).unwrap();
    }

    pub fn send_source_info(&mut self, info: SourceInfo) {
        self.send_call(RemoteCall::SourceInfo(info));
    }

    pub fn send_auth_rejected(&mut self) {
        self.send_call(RemoteCall::AuthRejected);
    }

    pub fn recv_call(&mut self, timeout: Duration) -> RemoteCall {
        let body = framing::read_pdu(&self.stream, &self.cancel, Some(timeout), timeout).unwrap();
        let mut cur = suscan_remote_analyzer::buffer::Cursor::new(&body);
        RemoteCall::deserialize(&mut cur).unwrap()
    }
}

pub fn sample_source_info(samp_rate: u32) -> SourceInfo {
    SourceInfo {
        source_samp_rate: samp_rate,
        measured_samp_rate: samp_rate as f32,
        freq_min: 24e6,
        freq_max: 1_766e6,
        frequency: 100e6,
        lnb: 0.0,
        bandwidth: 200_000.0,
        antenna: "RX".into(),
        antenna_list: vec!["RX".into()],
        gains: vec![],
        dc_remove: false,
        iq_reverse: false,
        agc: false,
        permanent: false,
        source_time_ns: 0,
    }
}
