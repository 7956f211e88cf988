//! ZER01NE 67 core library.
//! 47 Earth validation points plus 20 child-safety logics behind one in-memory bridge.

pub mod alerts;
pub mod bridge;
pub mod config;
pub mod danger;
pub mod earth;
pub mod error;
pub mod registry;

pub use alerts::{AlertLog, SafetyAlert};
pub use bridge::{BondReceipt, Bridge, RegistrationReceipt, SafetyReport, SystemStats};
pub use config::GatewayConfig;
pub use danger::{danger_probability, ChildState, DangerAssessment, DangerScorer, ALERT_THRESHOLD};
pub use earth::{
    CollapseState, ConfidenceScorer, EarthSummary, EarthValidator, MatrixScorer, Phase,
    PointResult, ValidationResult, DEFAULT_ALTITUDE_M,
};
pub use error::{BridgeError, BridgeResult, EntityKind};
pub use registry::{Bond, BondSummary, Pool, Registry, Session};

pub const ZER01NE_POINTS: u32 = 47;
pub const SAFETY_POINTS: u32 = 20;
pub const TOTAL_POINTS: u32 = ZER01NE_POINTS + SAFETY_POINTS;
pub const EQUATION: &str = "47 + 20 = 67";
pub const GENESIS_TIMESTAMP: &str = "2026-02-20T23:52:44Z";

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Fresh opaque identifier (random 128-bit, hex).
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub(crate) fn now_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Presentation rounding used for confidences and probabilities.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
