//! The session driver: connect-and-auth, the RX/TX thread pair, and the
//! public control surface applications use to treat a remote peer as a
//! local radio source.

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::auth::{ClientAuth, ServerHello};
use crate::buffer::{Cursor, GrowBuf};
use crate::call::{HopRange, RemoteCall};
use crate::config::SessionConfig;
use crate::error::{RemoteError, Result};
use crate::framing::{self, CancelToken};
use crate::message::{AnalyzerMessage, SourceInitStatus};
use crate::slow::{InspectorOverride, SlowDispatcher};
use crate::source_info::SourceInfo;

/// Items placed on the outbound PDU queue. `Halt` is a local-only
/// sentinel, never a wire call — it poisons the TX loop the way the
/// reference implementation's urgent-HALT enqueue does.
enum OutboundItem {
    Send(RemoteCall),
    Halt,
}

/// A connected (or connecting) remote analyzer session. Construction
/// never blocks and never fails except on malformed configuration,
/// which is rejected earlier by [`SessionConfig::new`]; every later
/// failure (resolution, connect, auth, transport) is reported
/// asynchronously as a [`SourceInitStatus`] event on the channel
/// returned alongside the session.
pub struct Session {
    cancel: CancelToken,
    outbound_tx: Sender<OutboundItem>,
    slow: SlowDispatcher,
    source_info: Arc<Mutex<SourceInfo>>,
    /// Joined on drop. The TX thread itself joins the RX thread it
    /// launches before returning, so joining this alone is enough to
    /// guarantee both have exited.
    tx_thread: Option<JoinHandle<()>>,
}

impl Session {
    /// Launches the TX thread (which performs connect-and-auth, then
    /// launches the RX thread) and returns immediately. The caller
    /// drains the returned [`Receiver`] for status/source-info/EOS/
    /// forwarded-message events; it closes when the session shuts down.
    pub fn connect(config: SessionConfig) -> (Self, Receiver<AnalyzerMessage>) {
        let cancel = CancelToken::new();
        let (outbound_tx, outbound_rx) = crossbeam_channel::unbounded::<OutboundItem>();
        let (inbound_tx, inbound_rx) = crossbeam_channel::unbounded::<AnalyzerMessage>();
        let source_info = Arc::new(Mutex::new(SourceInfo::default()));

        let slow_outbound_tx = outbound_tx.clone();
        let slow = SlowDispatcher::spawn(move |call| {
            let _ = slow_outbound_tx.send(OutboundItem::Send(call));
        });

        let tx_cancel = cancel.clone();
        let tx_source_info = Arc::clone(&source_info);
        let tx_outbound_tx = outbound_tx.clone();
        let tx_thread = std::thread::Builder::new()
            .name("remote-analyzer-tx".into())
            .spawn(move || {
                run_tx_loop(config, tx_cancel, outbound_rx, tx_outbound_tx, inbound_tx, tx_source_info);
            })
            .expect("failed to spawn TX thread");

        let session = Self {
            cancel,
            outbound_tx,
            slow,
            source_info,
            tx_thread: Some(tx_thread),
        };
        (session, inbound_rx)
    }

    pub fn source_info(&self) -> SourceInfo {
        self.source_info.lock().clone()
    }

    pub fn is_real_time(&self) -> bool {
        !self.source_info.lock().permanent
    }

    pub fn get_samp_rate(&self) -> u32 {
        self.source_info.lock().source_samp_rate
    }

    pub fn get_measured_samp_rate(&self) -> f32 {
        self.source_info.lock().measured_samp_rate
    }

    // --- coalescing slow-path control surface ---

    pub fn set_frequency(&self, frequency: f64, lnb: f64) {
        self.slow.request_frequency(frequency, lnb);
    }

    pub fn set_gain(&self, name: impl Into<String>, value: f32) {
        self.slow.request_gain(name, value);
    }

    pub fn set_antenna(&self, name: impl Into<String>) {
        self.slow.request_antenna(name);
    }

    pub fn set_bandwidth(&self, bandwidth: f32) {
        self.slow.request_bandwidth(bandwidth);
    }

    pub fn set_dc_remove(&self, enabled: bool) {
        self.slow.request_dc_remove(enabled);
    }

    pub fn set_agc(&self, enabled: bool) {
        self.slow.request_agc(enabled);
    }

    pub fn set_channel_inspection_mode(&self, enabled: bool) {
        self.slow.set_channel_inspection_mode(enabled);
    }

    pub fn request_inspector_override(&self, request: InspectorOverride) -> Result<()> {
        self.slow.request_inspector_override(request)
    }

    // --- fire-and-forget control surface: goes straight to the wire ---

    pub fn set_ppm(&self, ppm: f32) {
        self.send(RemoteCall::SetPpm(ppm));
    }

    pub fn set_iq_reverse(&self, enabled: bool) {
        self.send(RemoteCall::SetIqReverse(enabled));
    }

    pub fn set_sweep_strategy(&self, strategy: u32) -> Result<()> {
        if strategy >= 2 {
            return Err(RemoteError::Protocol(format!("invalid sweep strategy {strategy} (must be < 2)")));
        }
        self.send(RemoteCall::SetSweepStrategy(strategy));
        Ok(())
    }

    pub fn set_spectrum_partitioning(&self, partitioning: u32) -> Result<()> {
        if partitioning >= 2 {
            return Err(RemoteError::Protocol(format!(
                "invalid spectrum partitioning {partitioning} (must be < 2)"
            )));
        }
        self.send(RemoteCall::SetSpectrumPartitioning(partitioning));
        Ok(())
    }

    pub fn set_hop_range(&self, min: f64, max: f64) -> Result<()> {
        if min >= max {
            return Err(RemoteError::Protocol(format!("invalid hop range: min {min} >= max {max}")));
        }
        self.send(RemoteCall::SetHopRange(HopRange { min, max }));
        Ok(())
    }

    pub fn set_buffering_size(&self, size: u32) {
        self.send(RemoteCall::SetBufferingSize(size));
    }

    pub fn force_eos(&self) {
        self.send(RemoteCall::ForceEos);
    }

    pub fn req_halt(&self) {
        self.send(RemoteCall::ReqHalt);
    }

    /// Forwards an arbitrary analyzer message to the peer, wrapped in
    /// a `MESSAGE` call, for message types this client does not itself
    /// interpret.
    pub fn write_message(&self, message: AnalyzerMessage) {
        self.send(RemoteCall::Message(message));
    }

    fn send(&self, call: RemoteCall) {
        let _ = self.outbound_tx.send(OutboundItem::Send(call));
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
        let _ = self.outbound_tx.send(OutboundItem::Halt);
        if let Some(tx_thread) = self.tx_thread.take() {
            let _ = tx_thread.join();
        }
    }
}

fn report_status(inbound_tx: &Sender<AnalyzerMessage>, status: SourceInitStatus) {
    let _ = inbound_tx.send(AnalyzerMessage::StatusUpdate(status));
}

/// Resolves, connects, and authenticates. Returns the connected stream
/// plus the server hello on success; any failure is reported as a
/// `FAILURE` status before returning `Err`.
fn connect_and_auth(
    config: &SessionConfig,
    cancel: &CancelToken,
    inbound_tx: &Sender<AnalyzerMessage>,
) -> Result<(TcpStream, SourceInfo)> {
    report_status(inbound_tx, SourceInitStatus::progress("resolving"));
    let addr = (config.host(), config.port())
        .to_socket_addrs()
        .map_err(|e| RemoteError::Resolve(e.to_string()))?
        .next()
        .ok_or_else(|| RemoteError::Resolve(format!("no address found for {}", config.host())))?;

    report_status(inbound_tx, SourceInitStatus::progress("connecting"));
    let stream = framing::connect_cancellable(addr, cancel, config.connect_timeout())?;
    stream.set_nodelay(true).map_err(RemoteError::Io)?;

    report_status(inbound_tx, SourceInitStatus::progress("authenticating"));
    let hello_body = framing::read_pdu(&stream, cancel, Some(config.auth_timeout()), config.auth_timeout())?;
    let hello = ServerHello::deserialize(&mut Cursor::new(&hello_body))?;

    if hello.protocol_version_major < crate::auth::PROTOCOL_VERSION_MAJOR {
        return Err(RemoteError::IncompatibleVersion {
            server_major: hello.protocol_version_major,
            server_minor: hello.protocol_version_minor,
        });
    }

    let client_name = local_hostname();
    let auth = ClientAuth::new(&hello, client_name, config.user(), config.password());
    let mut write_stream = stream.try_clone().map_err(RemoteError::Io)?;
    let mut buf = GrowBuf::new();
    RemoteCall::AuthInfo(auth).serialize(&mut buf);
    framing::write_pdu(&mut write_stream, buf.data())?;

    let reply_body = framing::read_pdu(&stream, cancel, Some(config.auth_timeout()), config.auth_timeout())?;
    let reply = RemoteCall::deserialize(&mut Cursor::new(&reply_body))?;
    match reply {
        RemoteCall::AuthRejected => Err(RemoteError::AuthRejected),
        RemoteCall::SourceInfo(info) => Ok((stream, info)),
        _ => Err(RemoteError::InvalidServer("expected SOURCE_INFO or AUTH_REJECTED reply".into())),
    }
}

/// Truncates the local hostname to 63 bytes, matching the reference
/// implementation's fixed 64-byte (NUL-inclusive) hostname buffer.
fn local_hostname() -> String {
    truncate_hostname(&whoami::hostname())
}

fn truncate_hostname(name: &str) -> String {
    if name.len() <= 63 {
        return name.to_string();
    }
    let mut truncate_at = 63;
    while !name.is_char_boundary(truncate_at) {
        truncate_at -= 1;
    }
    name[..truncate_at].to_string()
}

fn run_tx_loop(
    config: SessionConfig,
    cancel: CancelToken,
    outbound_rx: Receiver<OutboundItem>,
    outbound_tx: Sender<OutboundItem>,
    inbound_tx: Sender<AnalyzerMessage>,
    source_info: Arc<Mutex<SourceInfo>>,
) {
    let (mut stream, info) = match connect_and_auth(&config, &cancel, &inbound_tx) {
        Ok(result) => result,
        Err(RemoteError::Cancelled) => {
            debug!("connect-and-auth cancelled before completion");
            return;
        }
        Err(e) => {
            warn!(error = %e, "connect-and-auth failed");
            report_status(&inbound_tx, SourceInitStatus::failure(e.to_string()));
            return;
        }
    };

    *source_info.lock() = info.clone();
    let _ = inbound_tx.send(AnalyzerMessage::SourceInfo(info));
    report_status(&inbound_tx, SourceInitStatus::success());
    info!("session authenticated, entering RX/TX loop");

    let rx_stream = stream.try_clone().expect("failed to clone control socket for RX thread");
    let rx_cancel = cancel.clone();
    let rx_source_info = Arc::clone(&source_info);
    let rx_inbound_tx = inbound_tx.clone();
    let rx_outbound_tx = outbound_tx.clone();
    let rx_body_timeout = config.body_timeout();
    let rx_thread = std::thread::Builder::new()
        .name("remote-analyzer-rx".into())
        .spawn(move || {
            run_rx_loop(rx_stream, rx_cancel, rx_body_timeout, rx_source_info, rx_inbound_tx, rx_outbound_tx);
        })
        .expect("failed to spawn RX thread");

    loop {
        match outbound_rx.recv() {
            Ok(OutboundItem::Halt) | Err(_) => break,
            Ok(OutboundItem::Send(call)) => {
                let mut buf = GrowBuf::new();
                call.serialize(&mut buf);
                trace!(bytes = buf.size(), "writing PDU");
                if let Err(e) = framing::write_pdu(&mut stream, buf.data()) {
                    warn!(error = %e, "write_pdu failed, terminating TX loop");
                    break;
                }
            }
        }
    }

    debug!("TX loop exiting");
    let _ = rx_thread.join();
}

fn run_rx_loop(
    stream: TcpStream,
    cancel: CancelToken,
    body_timeout: std::time::Duration,
    source_info: Arc<Mutex<SourceInfo>>,
    inbound_tx: Sender<AnalyzerMessage>,
    outbound_tx: Sender<OutboundItem>,
) {
    loop {
        let body = match framing::read_pdu(&stream, &cancel, None, body_timeout) {
            Ok(body) => body,
            Err(RemoteError::Cancelled) => {
                debug!("RX loop cancelled");
                break;
            }
            Err(e) => {
                warn!(error = %e, "RX loop terminating");
                break;
            }
        };

        let call = match RemoteCall::deserialize(&mut Cursor::new(&body)) {
            Ok(call) => call,
            Err(e) => {
                warn!(error = %e, "malformed PDU, terminating RX loop");
                break;
            }
        };

        match call {
            RemoteCall::SourceInfo(info) => {
                *source_info.lock() = info.clone();
                let _ = inbound_tx.send(AnalyzerMessage::SourceInfo(info));
            }
            RemoteCall::ForceEos => {
                let _ = inbound_tx.send(AnalyzerMessage::Eos);
                break;
            }
            RemoteCall::Message(msg) => {
                if let AnalyzerMessage::SourceInfo(info) = &msg {
                    *source_info.lock() = info.clone();
                }
                let _ = inbound_tx.send(msg);
            }
            _ => trace!("ignoring inbound call with no RX-loop handler"),
        }
    }

    let _ = outbound_tx.send(OutboundItem::Halt);
}
