//! Length-prefixed PDU framing on a TCP control connection, plus a
//! cancellable connect.
//!
//! The reference protocol unblocks a reader stuck in `read_pdu` by
//! `poll(2)`-ing the socket fd alongside a pipe's read end; a byte
//! written to the pipe wakes the poll immediately. Std gives us no
//! portable multi-fd poll, so the same guarantee — a bounded delay
//! between cancellation and the blocked call returning — is built from
//! short read timeouts and a shared flag, checked every [`POLL_INTERVAL`].

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{RemoteError, Result};

/// Fixed protocol magic stamped on every PDU header.
pub const PDU_MAGIC: u32 = 0x5343_7E14;

/// Chunk size bounding a single body read/write, matching the
/// reference implementation's receive buffer.
const CHUNK_SIZE: usize = 64 * 1024;

/// How often a blocked read/connect re-checks the cancellation flag.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A cheaply cloneable cancellation flag shared between the session's
/// owning thread and whichever thread is currently blocked in
/// `read_pdu` or `connect_cancellable`.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reads exactly `buf.len()` bytes, re-checking `cancel` and `deadline`
/// at every [`POLL_INTERVAL`] boundary. `deadline` of `None` waits
/// indefinitely, bounded only by cancellation. Never leaves bytes
/// consumed from the stream past what lands in `buf`.
fn read_fully(stream: &TcpStream, buf: &mut [u8], cancel: &CancelToken, deadline: Option<Instant>) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }
        let wait = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(RemoteError::Timeout);
                }
                (deadline - now).min(POLL_INTERVAL)
            }
            None => POLL_INTERVAL,
        };
        stream.set_read_timeout(Some(wait)).map_err(RemoteError::Io)?;
        match stream.read(&mut buf[filled..]) {
            Ok(0) => return Err(RemoteError::Disconnected),
            Ok(n) => filled += n,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => continue,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RemoteError::Io(e)),
        }
    }
    Ok(())
}

/// Reads one framed PDU: an 8-byte header (magic + big-endian body
/// length) followed by exactly that many body bytes, chunked at
/// [`CHUNK_SIZE`].
///
/// `header_timeout` bounds the wait for the next PDU's header —
/// `None` waits indefinitely (cancellation still unblocks it), matching
/// a call loop idle between human-paced control traffic. Once a header
/// arrives, each body chunk gets its own fresh `body_timeout` budget,
/// since a peer that commits to sending a body is expected to keep
/// making progress. Returns [`RemoteError::Cancelled`] if `cancel`
/// fires first, [`RemoteError::Timeout`] if the relevant budget elapses
/// first.
pub fn read_pdu(
    stream: &TcpStream,
    cancel: &CancelToken,
    header_timeout: Option<Duration>,
    body_timeout: Duration,
) -> Result<Vec<u8>> {
    let header_deadline = header_timeout.map(|t| Instant::now() + t);

    let mut header = [0u8; 8];
    read_fully(stream, &mut header, cancel, header_deadline)?;

    let magic = u32::from_be_bytes(header[0..4].try_into().unwrap());
    if magic != PDU_MAGIC {
        return Err(RemoteError::Protocol(format!("bad PDU magic {magic:#010x}")));
    }
    let body_len = u32::from_be_bytes(header[4..8].try_into().unwrap()) as usize;

    let mut body = vec![0u8; body_len];
    let mut filled = 0;
    while filled < body_len {
        let end = (filled + CHUNK_SIZE).min(body_len);
        let chunk_deadline = Some(Instant::now() + body_timeout);
        read_fully(stream, &mut body[filled..end], cancel, chunk_deadline)?;
        filled = end;
    }
    Ok(body)
}

/// Writes one framed PDU. Writes are not cancellable — the write loop
/// is expected to make forward progress once connected, per the
/// framing contract.
pub fn write_pdu(stream: &mut TcpStream, body: &[u8]) -> Result<()> {
    let mut header = [0u8; 8];
    header[0..4].copy_from_slice(&PDU_MAGIC.to_be_bytes());
    header[4..8].copy_from_slice(&(body.len() as u32).to_be_bytes());
    stream.write_all(&header).map_err(RemoteError::Io)?;
    for chunk in body.chunks(CHUNK_SIZE) {
        stream.write_all(chunk).map_err(RemoteError::Io)?;
    }
    Ok(())
}

/// Connects to `addr`, re-checking `cancel` between bounded connect
/// attempts so the overall call honors `timeout` and cancellation with
/// the same bounded-delay guarantee as [`read_pdu`].
pub fn connect_cancellable(addr: SocketAddr, cancel: &CancelToken, timeout: Duration) -> Result<TcpStream> {
    let deadline = Instant::now() + timeout;
    loop {
        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(RemoteError::Timeout);
        }
        let attempt = (deadline - now).min(POLL_INTERVAL);
        match TcpStream::connect_timeout(&addr, attempt) {
            Ok(stream) => return Ok(stream),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) => return Err(RemoteError::Connect(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn pdu_roundtrips_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let writer = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            write_pdu(&mut stream, b"hello, radio").unwrap();
        });

        let (reader_stream, _) = listener.accept().unwrap();
        let cancel = CancelToken::new();
        let body = read_pdu(&reader_stream, &cancel, Some(Duration::from_secs(5)), Duration::from_secs(5)).unwrap();
        assert_eq!(body, b"hello, radio");
        writer.join().unwrap();
    }

    #[test]
    fn bad_magic_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let writer = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(&[0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 0]).unwrap();
        });

        let (reader_stream, _) = listener.accept().unwrap();
        let cancel = CancelToken::new();
        let result = read_pdu(&reader_stream, &cancel, Some(Duration::from_secs(5)), Duration::from_secs(5));
        assert!(matches!(result, Err(RemoteError::Protocol(_))));
        writer.join().unwrap();
    }

    #[test]
    fn cancellation_unblocks_a_pending_read() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let _writer_side = TcpStream::connect(addr).unwrap();
        let (reader_stream, _) = listener.accept().unwrap();

        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            canceller.cancel();
        });

        let started = Instant::now();
        let result = read_pdu(&reader_stream, &cancel, Some(Duration::from_secs(30)), Duration::from_secs(30));
        assert!(matches!(result, Err(RemoteError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn cancellation_unblocks_an_infinite_header_wait() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let _writer_side = TcpStream::connect(addr).unwrap();
        let (reader_stream, _) = listener.accept().unwrap();

        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            canceller.cancel();
        });

        let started = Instant::now();
        let result = read_pdu(&reader_stream, &cancel, None, Duration::from_secs(5));
        assert!(matches!(result, Err(RemoteError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn timeout_fires_when_peer_sends_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let _writer_side = TcpStream::connect(addr).unwrap();
        let (reader_stream, _) = listener.accept().unwrap();

        let cancel = CancelToken::new();
        let result = read_pdu(&reader_stream, &cancel, Some(Duration::from_millis(300)), Duration::from_millis(300));
        assert!(matches!(result, Err(RemoteError::Timeout)));
    }
}
