//! Cached, read-only metadata describing the remote source: sample rate,
//! tuning limits, antenna list, and gain descriptors.
//!
//! The field set is not specified by the wire protocol itself (the
//! protocol only says "an opaque, serializable record"); it is grounded
//! on `suscan_source_gain_desc`/`suscan_source_device_info` in
//! `examples/original_source/analyzer/source.h`.

use crate::buffer::{Cursor, GrowBuf};
use crate::codec::{WireRead, WireWrite};
use crate::error::Result;

/// One named, bounded gain stage (e.g. "LNA", "VGA", "AMP").
#[derive(Debug, Clone, PartialEq)]
pub struct GainDescriptor {
    pub name: String,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
    pub value: f32,
}

impl GainDescriptor {
    fn serialize(&self, buf: &mut GrowBuf) {
        buf.put_str(&self.name);
        buf.put_f32(self.min);
        buf.put_f32(self.max);
        buf.put_f32(self.step);
        buf.put_f32(self.default);
        buf.put_f32(self.value);
    }

    fn deserialize(cur: &mut Cursor<'_>) -> Result<Self> {
        Ok(Self {
            name: cur.get_str()?,
            min: cur.get_f32()?,
            max: cur.get_f32()?,
            step: cur.get_f32()?,
            default: cur.get_f32()?,
            value: cur.get_f32()?,
        })
    }
}

/// Metadata describing the remote radio source, cached by the session
/// and exposed through read-only accessors. Updated whenever a
/// `SOURCE_INFO` call arrives, either during authentication or as a
/// later `MESSAGE`-wrapped notification.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub source_samp_rate: u32,
    pub measured_samp_rate: f32,
    pub freq_min: f64,
    pub freq_max: f64,
    pub frequency: f64,
    pub lnb: f64,
    pub bandwidth: f32,
    pub antenna: String,
    pub antenna_list: Vec<String>,
    pub gains: Vec<GainDescriptor>,
    pub dc_remove: bool,
    pub iq_reverse: bool,
    pub agc: bool,
    /// True if the source cannot be reconfigured (e.g. a capture file).
    pub permanent: bool,
    /// Source-reported time, epoch nanoseconds.
    pub source_time_ns: u64,
}

impl Default for SourceInfo {
    fn default() -> Self {
        Self {
            source_samp_rate: 0,
            measured_samp_rate: 0.0,
            freq_min: 0.0,
            freq_max: 0.0,
            frequency: 0.0,
            lnb: 0.0,
            bandwidth: 0.0,
            antenna: String::new(),
            antenna_list: Vec::new(),
            gains: Vec::new(),
            dc_remove: false,
            iq_reverse: false,
            agc: false,
            permanent: false,
            source_time_ns: 0,
        }
    }
}

impl SourceInfo {
    pub fn serialize(&self, buf: &mut GrowBuf) {
        buf.put_u32(self.source_samp_rate);
        buf.put_f32(self.measured_samp_rate);
        buf.put_freq(self.freq_min);
        buf.put_freq(self.freq_max);
        buf.put_freq(self.frequency);
        buf.put_freq(self.lnb);
        buf.put_f32(self.bandwidth);
        buf.put_str(&self.antenna);

        buf.put_u32(self.antenna_list.len() as u32);
        for name in &self.antenna_list {
            buf.put_str(name);
        }

        buf.put_u32(self.gains.len() as u32);
        for gain in &self.gains {
            gain.serialize(buf);
        }

        buf.put_bool(self.dc_remove);
        buf.put_bool(self.iq_reverse);
        buf.put_bool(self.agc);
        buf.put_bool(self.permanent);
        buf.put_u64(self.source_time_ns);
    }

    pub fn deserialize(cur: &mut Cursor<'_>) -> Result<Self> {
        let source_samp_rate = cur.get_u32()?;
        let measured_samp_rate = cur.get_f32()?;
        let freq_min = cur.get_freq()?;
        let freq_max = cur.get_freq()?;
        let frequency = cur.get_freq()?;
        let lnb = cur.get_freq()?;
        let bandwidth = cur.get_f32()?;
        let antenna = cur.get_str()?;

        let antenna_count = cur.get_u32()? as usize;
        let mut antenna_list = Vec::with_capacity(antenna_count);
        for _ in 0..antenna_count {
            antenna_list.push(cur.get_str()?);
        }

        let gain_count = cur.get_u32()? as usize;
        let mut gains = Vec::with_capacity(gain_count);
        for _ in 0..gain_count {
            gains.push(GainDescriptor::deserialize(cur)?);
        }

        let dc_remove = cur.get_bool()?;
        let iq_reverse = cur.get_bool()?;
        let agc = cur.get_bool()?;
        let permanent = cur.get_bool()?;
        let source_time_ns = cur.get_u64()?;

        Ok(Self {
            source_samp_rate,
            measured_samp_rate,
            freq_min,
            freq_max,
            frequency,
            lnb,
            bandwidth,
            antenna,
            antenna_list,
            gains,
            dc_remove,
            iq_reverse,
            agc,
            permanent,
            source_time_ns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_info_roundtrips() {
        let info = SourceInfo {
            source_samp_rate: 1_000_000,
            measured_samp_rate: 999_987.5,
            freq_min: 24e6,
            freq_max: 1_766e6,
            frequency: 100e6,
            lnb: 0.0,
            bandwidth: 200_000.0,
            antenna: "RX".into(),
            antenna_list: vec!["RX".into(), "TX/RX".into()],
            gains: vec![GainDescriptor {
                name: "LNA".into(),
                min: 0.0,
                max: 40.0,
                step: 8.0,
                default: 16.0,
                value: 24.0,
            }],
            dc_remove: true,
            iq_reverse: false,
            agc: true,
            permanent: false,
            source_time_ns: 1_690_000_000_000_000_000,
        };

        let mut buf = GrowBuf::new();
        info.serialize(&mut buf);
        let mut cur = Cursor::new(buf.data());
        let decoded = SourceInfo::deserialize(&mut cur).unwrap();
        assert_eq!(decoded, info);
    }
}
