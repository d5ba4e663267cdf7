//! Slow-path dispatcher: coalesces human-latency control operations
//! (retune, gain, antenna, bandwidth, DC-remove, AGC, inspector
//! overrides) onto a single worker, so rapid UI-driven updates collapse
//! into one hardware reconfiguration instead of one wire call per
//! keystroke.
//!
//! The producer side updates a pending slot and wakes the worker; the
//! worker drains the slot under the lock, releases it, then builds and
//! sends the corresponding [`RemoteCall`] outside the critical section.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::buffer::GrowBuf;
use crate::call::{FrequencyRequest, RemoteCall};
use crate::codec::WireWrite;
use crate::error::{RemoteError, Result};
use crate::message::{AnalyzerMessage, MSG_TYPE_INSPECTOR_OVERRIDE};

/// One pending gain request: a named stage plus its requested value.
/// Kept as a list (not a single slot) because distinct named gains are
/// independent and must all reach the hardware.
#[derive(Debug, Clone, PartialEq)]
pub struct GainRequest {
    pub name: String,
    pub value: f32,
}

/// A pending inspector frequency/bandwidth override, addressed by
/// handle. Only legal while the session is in channel-inspection mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InspectorOverride {
    Frequency { handle: u32, frequency: f64 },
    Bandwidth { handle: u32, bandwidth: f32 },
}

impl InspectorOverride {
    fn encode(self) -> AnalyzerMessage {
        let mut buf = GrowBuf::new();
        match self {
            InspectorOverride::Frequency { handle, frequency } => {
                buf.put_u32(handle);
                buf.put_u8(0);
                buf.put_freq(frequency);
            }
            InspectorOverride::Bandwidth { handle, bandwidth } => {
                buf.put_u32(handle);
                buf.put_u8(1);
                buf.put_f32(bandwidth);
            }
        }
        AnalyzerMessage::Opaque {
            type_tag: MSG_TYPE_INSPECTOR_OVERRIDE,
            body: buf.into_vec(),
        }
    }
}

#[derive(Default)]
struct PendingState {
    gains: Vec<GainRequest>,
    antenna: Option<String>,
    bandwidth: Option<f32>,
    frequency: Option<FrequencyRequest>,
    dc_remove: Option<bool>,
    agc: Option<bool>,
    inspector_override: Option<InspectorOverride>,
}

impl PendingState {
    fn is_empty(&self) -> bool {
        self.gains.is_empty()
            && self.antenna.is_none()
            && self.bandwidth.is_none()
            && self.frequency.is_none()
            && self.dc_remove.is_none()
            && self.agc.is_none()
            && self.inspector_override.is_none()
    }

    /// Drains every pending field into owned calls, clearing the slots
    /// in the process. Called with the lock held; the caller sends the
    /// returned calls after releasing it.
    fn drain(&mut self) -> Vec<RemoteCall> {
        let mut calls = Vec::new();
        for gain in self.gains.drain(..) {
            calls.push(RemoteCall::SetGain {
                name: gain.name,
                value: gain.value,
            });
        }
        if let Some(antenna) = self.antenna.take() {
            calls.push(RemoteCall::SetAntenna(antenna));
        }
        if let Some(bandwidth) = self.bandwidth.take() {
            calls.push(RemoteCall::SetBandwidth(bandwidth));
        }
        if let Some(freq) = self.frequency.take() {
            calls.push(RemoteCall::SetFrequency(freq));
        }
        if let Some(dc_remove) = self.dc_remove.take() {
            calls.push(RemoteCall::SetDcRemove(dc_remove));
        }
        if let Some(agc) = self.agc.take() {
            calls.push(RemoteCall::SetAgc(agc));
        }
        if let Some(inspector_override) = self.inspector_override.take() {
            calls.push(RemoteCall::Message(inspector_override.encode()));
        }
        calls
    }
}

/// Coalescing worker for the control operations listed above. One
/// instance is owned per [`crate::session::Session`]; it forwards
/// coalesced calls onto the session's outbound queue.
pub struct SlowDispatcher {
    pending: Arc<Mutex<PendingState>>,
    wake: Option<Sender<()>>,
    channel_inspection_mode: Arc<Mutex<bool>>,
    worker: Option<JoinHandle<()>>,
}

impl SlowDispatcher {
    /// Spawns the worker thread. `sink` is called once per coalesced
    /// call, on the worker thread, outside the pending-state lock —
    /// typically a closure pushing onto the session's outbound queue.
    pub fn spawn(sink: impl Fn(RemoteCall) + Send + 'static) -> Self {
        let pending: Arc<Mutex<PendingState>> = Arc::new(Mutex::new(PendingState::default()));
        let channel_inspection_mode = Arc::new(Mutex::new(false));
        let (wake, wake_rx): (Sender<()>, Receiver<()>) = crossbeam_channel::unbounded();

        let worker_pending = Arc::clone(&pending);
        let worker = std::thread::Builder::new()
            .name("remote-analyzer-slow".into())
            .spawn(move || Self::run(worker_pending, wake_rx, sink))
            .expect("failed to spawn slow dispatcher thread");

        Self {
            pending,
            wake: Some(wake),
            channel_inspection_mode,
            worker: Some(worker),
        }
    }

    fn run(pending: Arc<Mutex<PendingState>>, wake_rx: Receiver<()>, sink: impl Fn(RemoteCall)) {
        while wake_rx.recv().is_ok() {
            let calls = {
                let mut guard = pending.lock();
                if guard.is_empty() {
                    continue;
                }
                guard.drain()
            };
            for call in calls {
                sink(call);
            }
        }
    }

    fn wake_worker(&self) {
        if let Some(wake) = &self.wake {
            let _ = wake.send(());
        }
    }

    pub fn request_gain(&self, name: impl Into<String>, value: f32) {
        let name = name.into();
        {
            let mut guard = self.pending.lock();
            if let Some(existing) = guard.gains.iter_mut().find(|g| g.name == name) {
                existing.value = value;
            } else {
                guard.gains.push(GainRequest { name, value });
            }
        }
        self.wake_worker();
    }

    pub fn request_antenna(&self, name: impl Into<String>) {
        self.pending.lock().antenna = Some(name.into());
        self.wake_worker();
    }

    pub fn request_bandwidth(&self, bandwidth: f32) {
        self.pending.lock().bandwidth = Some(bandwidth);
        self.wake_worker();
    }

    pub fn request_frequency(&self, frequency: f64, lnb: f64) {
        self.pending.lock().frequency = Some(FrequencyRequest { frequency, lnb });
        self.wake_worker();
    }

    pub fn request_dc_remove(&self, enabled: bool) {
        self.pending.lock().dc_remove = Some(enabled);
        self.wake_worker();
    }

    pub fn request_agc(&self, enabled: bool) {
        self.pending.lock().agc = Some(enabled);
        self.wake_worker();
    }

    pub fn set_channel_inspection_mode(&self, enabled: bool) {
        *self.channel_inspection_mode.lock() = enabled;
    }

    /// Queues an inspector frequency/bandwidth override. Fails if the
    /// session is not currently in channel-inspection mode.
    pub fn request_inspector_override(&self, request: InspectorOverride) -> Result<()> {
        if !*self.channel_inspection_mode.lock() {
            return Err(RemoteError::Protocol(
                "inspector overrides require channel-inspection mode".into(),
            ));
        }
        self.pending.lock().inspector_override = Some(request);
        self.wake_worker();
        Ok(())
    }
}

impl Drop for SlowDispatcher {
    fn drop(&mut self) {
        // Drop the only sender so `wake_rx.recv()` on the worker thread
        // observes disconnection and the loop exits; otherwise join()
        // below blocks forever.
        self.wake.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn drain_calls(rx: &Receiver<RemoteCall>, expected: usize) -> Vec<RemoteCall> {
        let mut calls = Vec::new();
        for _ in 0..expected {
            calls.push(rx.recv_timeout(Duration::from_secs(2)).expect("expected a coalesced call"));
        }
        calls
    }

    #[test]
    fn rapid_retunes_coalesce_to_the_final_value() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let dispatcher = SlowDispatcher::spawn(move |call| {
            let _ = tx.send(call);
        });

        dispatcher.request_frequency(100e6, 0.0);
        dispatcher.request_frequency(200e6, 0.0);

        let calls = drain_calls(&rx, 1);
        assert_eq!(
            calls,
            vec![RemoteCall::SetFrequency(FrequencyRequest {
                frequency: 200e6,
                lnb: 0.0
            })]
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn distinct_named_gains_all_reach_the_worker() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let dispatcher = SlowDispatcher::spawn(move |call| {
            let _ = tx.send(call);
        });

        dispatcher.request_gain("LNA", 10.0);
        dispatcher.request_gain("VGA", 20.0);

        let calls = drain_calls(&rx, 2);
        assert!(calls.contains(&RemoteCall::SetGain {
            name: "LNA".into(),
            value: 10.0
        }));
        assert!(calls.contains(&RemoteCall::SetGain {
            name: "VGA".into(),
            value: 20.0
        }));
    }

    #[test]
    fn inspector_override_rejected_outside_channel_inspection_mode() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let dispatcher = SlowDispatcher::spawn(move |call| {
            let _ = tx.send(call);
        });
        let result = dispatcher.request_inspector_override(InspectorOverride::Frequency {
            handle: 1,
            frequency: 1_000.0,
        });
        assert!(result.is_err());
    }

    #[test]
    fn inspector_override_accepted_in_channel_inspection_mode() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let dispatcher = SlowDispatcher::spawn(move |call| {
            let _ = tx.send(call);
        });
        dispatcher.set_channel_inspection_mode(true);
        dispatcher
            .request_inspector_override(InspectorOverride::Bandwidth {
                handle: 7,
                bandwidth: 20_000.0,
            })
            .unwrap();

        let calls = drain_calls(&rx, 1);
        assert!(matches!(calls[0], RemoteCall::Message(AnalyzerMessage::Opaque { type_tag, .. }) if type_tag == MSG_TYPE_INSPECTOR_OVERRIDE));
    }
}
