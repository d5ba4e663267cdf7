// Connects to a remote analyzer, prints status transitions and the
// cached source info, then issues one retune before exiting.

use anyhow::{Context, Result};
use suscan_remote_analyzer::{AnalyzerMessage, InitStatusKind, Session, SessionConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().context("usage: connect <host> <port> <user> <password>")?;
    let port: u16 = args
        .next()
        .context("missing port")?
        .parse()
        .context("port must be a number")?;
    let user = args.next().context("missing user")?;
    let password = args.next().context("missing password")?;

    let config = SessionConfig::new(host, port, user, password)?;
    let (session, events) = Session::connect(config);

    for event in events {
        match event {
            AnalyzerMessage::StatusUpdate(status) => {
                println!("status: {:?} {:?}", status.kind, status.message);
                if status.kind == InitStatusKind::Failure {
                    break;
                }
            }
            AnalyzerMessage::SourceInfo(info) => {
                println!(
                    "source info: samp_rate={} frequency={} antenna={}",
                    info.source_samp_rate, info.frequency, info.antenna
                );
                session.set_frequency(info.frequency + 1_000.0, 0.0);
            }
            AnalyzerMessage::Eos => {
                println!("end of stream");
                break;
            }
            AnalyzerMessage::Opaque { type_tag, body } => {
                println!("forwarded message type {type_tag}, {} bytes", body.len());
            }
        }
    }

    Ok(())
}
