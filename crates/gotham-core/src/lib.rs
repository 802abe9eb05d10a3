//! `gotham-core`: celebration lighting for a single Govee device.
//!
//! ```text
//! Stimulus ──▶ TriggerQueue ──▶ Orchestrator::trigger ──▶ GoveeClient ──▶ vendor API
//!                                        │                       │
//!                                 status / stop            RateLimiter (N per window)
//! ```
//!
//! The orchestrator is generic over [`device::LightDevice`] so the session
//! state machine can be driven against an in-memory device in tests.

pub mod config;
pub mod device;
pub mod error;
pub mod govee;
pub mod milestone;
pub mod orchestrator;
pub mod pattern;
pub mod queue;
pub mod rate_limit;
pub mod stimulus;

pub use device::{DeviceState, LightDevice, PowerState};
pub use error::{DeviceError, GothamError};
pub use govee::GoveeClient;
pub use orchestrator::{Orchestrator, RunOutcome, Status, StopReport, TriggerReceipt};
pub use pattern::{CelebrationPattern, PatternStep, Rgb, Tier};
pub use queue::TriggerQueue;
pub use rate_limit::RateLimiter;
pub use stimulus::{Stimulus, StimulusKind};
