//! Client-side protocol endpoint for a remote SDR analyzer source.
//!
//! Treats a network peer as if it were a locally attached radio: submit
//! control requests ([`Session::set_frequency`], [`Session::set_gain`],
//! …) and drain the returned channel for analyzer messages (source
//! metadata, end-of-stream, forwarded detector/inspector events).
//!
//! Out of scope: DSP inspector implementations, spectrum source
//! strategies, local SDR I/O, configuration file/CLI parsing, GUI
//! widgets — all external collaborators this crate forwards to or
//! receives from, never itself implements.

pub mod auth;
pub mod buffer;
pub mod call;
pub mod codec;
pub mod config;
pub mod error;
pub mod framing;
pub mod message;
pub mod session;
pub mod slow;
pub mod source_info;

pub use call::{FrequencyRequest, HopRange, RemoteCall};
pub use config::SessionConfig;
pub use error::{RemoteError, Result};
pub use message::{AnalyzerMessage, InitStatusKind, SourceInitStatus};
pub use session::Session;
pub use slow::InspectorOverride;
pub use source_info::{GainDescriptor, SourceInfo};
