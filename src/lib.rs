//! V2X channel model simulation core.
//!
//! Decides, per physics and radio theory, whether each candidate receiver
//! of a wireless transmission gets the message cleanly, as unusable
//! interference, or not at all, and at what simulated time. Three channel
//! strategies implement the shared contract:
//! - `Simple`: deterministic always-succeeds baseline
//! - `Direct`: short-range V2V with the full impairment model
//! - `Cellular`: V2I with base-station handover, wired backhaul, and HARQ
//!   retransmission delays
//!
//! ## Module Organization
//!
//! - `types`: message, node, and registry value types
//! - `geometry`: distance and line-of-sight velocity math
//! - `error_model`: bit-error-rate accumulation and success probability
//! - `timing`: propagation delay and transmission time helpers
//! - `scheduler`: event-scheduler contract and the time-ordered queue
//! - `settings`: channel and modulation tables per variant
//! - `channel`: the shared contract and the three strategies
//! - `scene`: scene loading and validation
//! - `config`: optional runner tuning file
//! - `runner`: the discrete-event loop driving one scene

pub mod channel;
pub mod config;
pub mod error_model;
pub mod geometry;
pub mod runner;
pub mod scene;
pub mod scheduler;
pub mod settings;
pub mod timing;
pub mod types;

pub use channel::{ChannelModel, ChannelModelCellular, ChannelModelDirect, ChannelModelSimple, LinkDirection, TransmissionContext};
pub use runner::{SimulationReport, run_scene};
pub use scene::{ModelKind, Scene, SceneLoadError, load_scene};
pub use scheduler::{EventQueue, EventSink, NetworkEventKind, ScheduledEvent};
pub use types::{NetworkMessage, NetworkNode, NodeId, ObjectKind, ObjectRegistry, SimNanos, Vec2};
