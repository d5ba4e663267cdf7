//! Analyzer messages: the payload carried by the `MESSAGE` call variant.
//!
//! The wire protocol only commits to "type tag + owned opaque body" for
//! this payload (§3/§6 of the design notes) — the actual message system
//! belongs to the embedding analyzer, out of scope here. A handful of
//! message kinds are meaningful to the client itself (source info
//! updates, end-of-stream, init-status notifications); everything else
//! passes through as [`AnalyzerMessage::Opaque`] for the caller to
//! interpret.

use crate::buffer::{Cursor, GrowBuf};
use crate::codec::{WireRead, WireWrite};
use crate::error::Result;
use crate::source_info::SourceInfo;

pub const MSG_TYPE_SOURCE_INFO: u32 = 0;
pub const MSG_TYPE_EOS: u32 = 1;
pub const MSG_TYPE_STATUS_UPDATE: u32 = 2;
/// Inspector frequency/bandwidth override request. No dedicated call
/// tag exists for this in the envelope table — it rides the generic
/// `MESSAGE` call as an opaque payload, since DSP inspectors are an
/// external collaborator this client only forwards requests to.
pub const MSG_TYPE_INSPECTOR_OVERRIDE: u32 = 3;

/// The three-way status of a source-init event: resolving/connecting/
/// authenticating are all `Progress`, terminated by one `Success` or
/// `Failure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatusKind {
    Progress,
    Success,
    Failure,
}

impl InitStatusKind {
    fn to_wire(self) -> u8 {
        match self {
            InitStatusKind::Progress => 0,
            InitStatusKind::Success => 1,
            InitStatusKind::Failure => 2,
        }
    }

    fn from_wire(v: u8) -> Result<Self> {
        match v {
            0 => Ok(InitStatusKind::Progress),
            1 => Ok(InitStatusKind::Success),
            2 => Ok(InitStatusKind::Failure),
            other => Err(crate::error::RemoteError::Protocol(format!(
                "invalid init status kind {other}"
            ))),
        }
    }
}

/// A source-init status event: the application observes a sequence of
/// `Progress` events terminated by exactly one `Success` or `Failure`.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInitStatus {
    pub kind: InitStatusKind,
    pub message: Option<String>,
}

impl SourceInitStatus {
    pub fn progress(message: impl Into<String>) -> Self {
        Self {
            kind: InitStatusKind::Progress,
            message: Some(message.into()),
        }
    }

    pub fn success() -> Self {
        Self {
            kind: InitStatusKind::Success,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            kind: InitStatusKind::Failure,
            message: Some(message.into()),
        }
    }

    fn serialize(&self, buf: &mut GrowBuf) {
        buf.put_u8(self.kind.to_wire());
        buf.put_bool(self.message.is_some());
        if let Some(message) = &self.message {
            buf.put_str(message);
        }
    }

    fn deserialize(cur: &mut Cursor<'_>) -> Result<Self> {
        let kind = InitStatusKind::from_wire(cur.get_u8()?)?;
        let has_message = cur.get_bool()?;
        let message = if has_message { Some(cur.get_str()?) } else { None };
        Ok(Self { kind, message })
    }
}

/// A message delivered asynchronously to the application, either
/// produced locally by the session driver (status, EOS, source info) or
/// forwarded unopened from the peer.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzerMessage {
    SourceInfo(SourceInfo),
    Eos,
    StatusUpdate(SourceInitStatus),
    /// A message type this client does not interpret; the DSP inspector
    /// and spectrum-source consumers are the intended recipients.
    Opaque { type_tag: u32, body: Vec<u8> },
}

impl AnalyzerMessage {
    pub fn type_tag(&self) -> u32 {
        match self {
            AnalyzerMessage::SourceInfo(_) => MSG_TYPE_SOURCE_INFO,
            AnalyzerMessage::Eos => MSG_TYPE_EOS,
            AnalyzerMessage::StatusUpdate(_) => MSG_TYPE_STATUS_UPDATE,
            AnalyzerMessage::Opaque { type_tag, .. } => *type_tag,
        }
    }

    pub fn encode_body(&self) -> Vec<u8> {
        let mut buf = GrowBuf::new();
        match self {
            AnalyzerMessage::SourceInfo(info) => info.serialize(&mut buf),
            AnalyzerMessage::Eos => {}
            AnalyzerMessage::StatusUpdate(status) => status.serialize(&mut buf),
            AnalyzerMessage::Opaque { body, .. } => return body.clone(),
        }
        buf.into_vec()
    }

    pub fn decode(type_tag: u32, body: &[u8]) -> Result<Self> {
        match type_tag {
            MSG_TYPE_SOURCE_INFO => {
                let mut cur = Cursor::new(body);
                Ok(AnalyzerMessage::SourceInfo(SourceInfo::deserialize(&mut cur)?))
            }
            MSG_TYPE_EOS => Ok(AnalyzerMessage::Eos),
            MSG_TYPE_STATUS_UPDATE => {
                let mut cur = Cursor::new(body);
                Ok(AnalyzerMessage::StatusUpdate(SourceInitStatus::deserialize(&mut cur)?))
            }
            other => Ok(AnalyzerMessage::Opaque {
                type_tag: other,
                body: body.to_vec(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_update_roundtrips() {
        let msg = AnalyzerMessage::StatusUpdate(SourceInitStatus::progress("Resolving remote host"));
        let body = msg.encode_body();
        let decoded = AnalyzerMessage::decode(msg.type_tag(), &body).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn eos_has_empty_body() {
        let msg = AnalyzerMessage::Eos;
        assert!(msg.encode_body().is_empty());
        let decoded = AnalyzerMessage::decode(MSG_TYPE_EOS, &[]).unwrap();
        assert_eq!(decoded, AnalyzerMessage::Eos);
    }

    #[test]
    fn opaque_passes_through_unknown_tags() {
        let msg = AnalyzerMessage::Opaque {
            type_tag: 9999,
            body: vec![1, 2, 3],
        };
        let body = msg.encode_body();
        let decoded = AnalyzerMessage::decode(9999, &body).unwrap();
        assert_eq!(decoded, msg);
    }
}
