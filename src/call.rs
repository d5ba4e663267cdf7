//! The call envelope: a tagged union covering every control-connection
//! message, in either direction.
//!
//! The C original protects a single reusable envelope slot with a mutex
//! (`acquire(tag) -> mutate fields -> queue(copy) -> release`); here each
//! call owns its payload outright and moves straight into the outbound
//! queue; see the redesign notes for why the mutex is unnecessary once
//! the envelope is an owned value instead of a shared slot.

use crate::auth::ClientAuth;
use crate::buffer::{Cursor, GrowBuf};
use crate::codec::{WireRead, WireWrite};
use crate::error::{RemoteError, Result};
use crate::message::AnalyzerMessage;
use crate::source_info::SourceInfo;

/// Wire tags, in table order (§3 of the design notes).
mod tag {
    pub const NONE: u32 = 0;
    pub const AUTH_INFO: u32 = 1;
    pub const SOURCE_INFO: u32 = 2;
    pub const SET_FREQUENCY: u32 = 3;
    pub const SET_GAIN: u32 = 4;
    pub const SET_ANTENNA: u32 = 5;
    pub const SET_BANDWIDTH: u32 = 6;
    pub const SET_PPM: u32 = 7;
    pub const SET_DC_REMOVE: u32 = 8;
    pub const SET_IQ_REVERSE: u32 = 9;
    pub const SET_AGC: u32 = 10;
    pub const FORCE_EOS: u32 = 11;
    pub const SET_SWEEP_STRATEGY: u32 = 12;
    pub const SET_SPECTRUM_PARTITIONING: u32 = 13;
    pub const SET_HOP_RANGE: u32 = 14;
    pub const SET_BUFFERING_SIZE: u32 = 15;
    pub const MESSAGE: u32 = 16;
    pub const REQ_HALT: u32 = 17;
    pub const AUTH_REJECTED: u32 = 18;
}

/// A tuned-frequency + LNB-offset pair, as carried by `SetFrequency`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyRequest {
    pub frequency: f64,
    pub lnb: f64,
}

/// A hop-scan range, as carried by `SetHopRange`. Deserialization
/// enforces `min < max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HopRange {
    pub min: f64,
    pub max: f64,
}

/// One tagged call, exchanged in either direction over the control
/// connection. Each variant owns whatever payload it carries; there is
/// no shared slot to release.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    None,
    AuthInfo(ClientAuth),
    SourceInfo(SourceInfo),
    SetFrequency(FrequencyRequest),
    SetGain { name: String, value: f32 },
    SetAntenna(String),
    SetBandwidth(f32),
    SetPpm(f32),
    SetDcRemove(bool),
    SetIqReverse(bool),
    SetAgc(bool),
    ForceEos,
    SetSweepStrategy(u32),
    SetSpectrumPartitioning(u32),
    SetHopRange(HopRange),
    SetBufferingSize(u32),
    Message(AnalyzerMessage),
    ReqHalt,
    AuthRejected,
}

impl RemoteCall {
    fn wire_tag(&self) -> u32 {
        match self {
            RemoteCall::None => tag::NONE,
            RemoteCall::AuthInfo(_) => tag::AUTH_INFO,
            RemoteCall::SourceInfo(_) => tag::SOURCE_INFO,
            RemoteCall::SetFrequency(_) => tag::SET_FREQUENCY,
            RemoteCall::SetGain { .. } => tag::SET_GAIN,
            RemoteCall::SetAntenna(_) => tag::SET_ANTENNA,
            RemoteCall::SetBandwidth(_) => tag::SET_BANDWIDTH,
            RemoteCall::SetPpm(_) => tag::SET_PPM,
            RemoteCall::SetDcRemove(_) => tag::SET_DC_REMOVE,
            RemoteCall::SetIqReverse(_) => tag::SET_IQ_REVERSE,
            RemoteCall::SetAgc(_) => tag::SET_AGC,
            RemoteCall::ForceEos => tag::FORCE_EOS,
            RemoteCall::SetSweepStrategy(_) => tag::SET_SWEEP_STRATEGY,
            RemoteCall::SetSpectrumPartitioning(_) => tag::SET_SPECTRUM_PARTITIONING,
            RemoteCall::SetHopRange(_) => tag::SET_HOP_RANGE,
            RemoteCall::SetBufferingSize(_) => tag::SET_BUFFERING_SIZE,
            RemoteCall::Message(_) => tag::MESSAGE,
            RemoteCall::ReqHalt => tag::REQ_HALT,
            RemoteCall::AuthRejected => tag::AUTH_REJECTED,
        }
    }

    /// Serializes the uint32 tag followed by the variant's fields, in
    /// the order the wire format specifies.
    pub fn serialize(&self, buf: &mut GrowBuf) {
        buf.put_u32(self.wire_tag());
        match self {
            RemoteCall::None
            | RemoteCall::ForceEos
            | RemoteCall::ReqHalt
            | RemoteCall::AuthRejected => {}
            RemoteCall::AuthInfo(auth) => auth.serialize(buf),
            RemoteCall::SourceInfo(info) => info.serialize(buf),
            RemoteCall::SetFrequency(req) => {
                buf.put_freq(req.frequency);
                buf.put_freq(req.lnb);
            }
            RemoteCall::SetGain { name, value } => {
                buf.put_str(name);
                buf.put_f32(*value);
            }
            RemoteCall::SetAntenna(name) => buf.put_str(name),
            RemoteCall::SetBandwidth(v) => buf.put_f32(*v),
            RemoteCall::SetPpm(v) => buf.put_f32(*v),
            RemoteCall::SetDcRemove(v) => buf.put_bool(*v),
            RemoteCall::SetIqReverse(v) => buf.put_bool(*v),
            RemoteCall::SetAgc(v) => buf.put_bool(*v),
            RemoteCall::SetSweepStrategy(v) => buf.put_u32(*v),
            RemoteCall::SetSpectrumPartitioning(v) => buf.put_u32(*v),
            RemoteCall::SetHopRange(range) => {
                buf.put_freq(range.min);
                buf.put_freq(range.max);
            }
            RemoteCall::SetBufferingSize(v) => buf.put_u32(*v),
            RemoteCall::Message(msg) => {
                buf.put_u32(msg.type_tag());
                buf.put_blob(&msg.encode_body());
            }
        }
    }

    /// Reads a tag and dispatches to the matching variant, enforcing
    /// the invariants the design notes require at deserialization time
    /// (sweep/partitioning range, hop-range ordering, unknown tag).
    pub fn deserialize(cur: &mut Cursor<'_>) -> Result<Self> {
        let wire_tag = cur.get_u32()?;
        Ok(match wire_tag {
            tag::NONE => RemoteCall::None,
            tag::AUTH_INFO => RemoteCall::AuthInfo(ClientAuth::deserialize(cur)?),
            tag::SOURCE_INFO => RemoteCall::SourceInfo(SourceInfo::deserialize(cur)?),
            tag::SET_FREQUENCY => RemoteCall::SetFrequency(FrequencyRequest {
                frequency: cur.get_freq()?,
                lnb: cur.get_freq()?,
            }),
            tag::SET_GAIN => RemoteCall::SetGain {
                name: cur.get_str()?,
                value: cur.get_f32()?,
            },
            tag::SET_ANTENNA => RemoteCall::SetAntenna(cur.get_str()?),
            tag::SET_BANDWIDTH => RemoteCall::SetBandwidth(cur.get_f32()?),
            tag::SET_PPM => RemoteCall::SetPpm(cur.get_f32()?),
            tag::SET_DC_REMOVE => RemoteCall::SetDcRemove(cur.get_bool()?),
            tag::SET_IQ_REVERSE => RemoteCall::SetIqReverse(cur.get_bool()?),
            tag::SET_AGC => RemoteCall::SetAgc(cur.get_bool()?),
            tag::FORCE_EOS => RemoteCall::ForceEos,
            tag::SET_SWEEP_STRATEGY => {
                let v = cur.get_u32()?;
                if v >= 2 {
                    return Err(RemoteError::Protocol(format!(
                        "invalid sweep strategy {v} (must be < 2)"
                    )));
                }
                RemoteCall::SetSweepStrategy(v)
            }
            tag::SET_SPECTRUM_PARTITIONING => {
                let v = cur.get_u32()?;
                if v >= 2 {
                    return Err(RemoteError::Protocol(format!(
                        "invalid spectrum partitioning {v} (must be < 2)"
                    )));
                }
                RemoteCall::SetSpectrumPartitioning(v)
            }
            tag::SET_HOP_RANGE => {
                let min = cur.get_freq()?;
                let max = cur.get_freq()?;
                if min >= max {
                    return Err(RemoteError::Protocol(format!(
                        "invalid hop range: min {min} >= max {max}"
                    )));
                }
                RemoteCall::SetHopRange(HopRange { min, max })
            }
            tag::SET_BUFFERING_SIZE => RemoteCall::SetBufferingSize(cur.get_u32()?),
            tag::MESSAGE => {
                let type_tag = cur.get_u32()?;
                let body = cur.get_blob()?;
                RemoteCall::Message(AnalyzerMessage::decode(type_tag, &body)?)
            }
            tag::REQ_HALT => RemoteCall::ReqHalt,
            tag::AUTH_REJECTED => RemoteCall::AuthRejected,
            other => return Err(RemoteError::Protocol(format!("unknown call tag {other}"))),
        })
    }
}
