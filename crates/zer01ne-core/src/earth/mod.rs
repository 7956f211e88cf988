//! EarthValidator: runs the 47-point battery, aggregates a collapse verdict and
//! drives the handshake/phase state machine.
//!
//! Every call to [`EarthValidator::validate`] advances the handshake counter, so
//! validation is not idempotent.

pub mod checks;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::GENESIS_TIMESTAMP;
pub use checks::{CheckContext, ConfidenceScorer, MatrixScorer, PointResult, BATTERY_SIZE};

/// Default altitude (metres) used when a caller does not supply one.
pub const DEFAULT_ALTITUDE_M: f64 = 300.0;

const ALPHA_THRESHOLD: f64 = 0.95;
const BETA_THRESHOLD: f64 = 0.70;
/// A point counts as passed at or above this confidence.
const POINT_PASS_CONFIDENCE: f64 = 0.7;

const AUDIT_AT: u64 = 500;
const CLIMB_AT: u64 = 1500;
const SOVEREIGN_AT: u64 = 3000;

/// Coarse lifecycle stage derived from the cumulative handshake count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Pulse,
    Audit,
    Climb,
    Sovereign,
}

impl Phase {
    pub fn for_handshakes(handshakes: u64) -> Self {
        if handshakes < AUDIT_AT {
            Phase::Pulse
        } else if handshakes < CLIMB_AT {
            Phase::Audit
        } else if handshakes < SOVEREIGN_AT {
            Phase::Climb
        } else {
            Phase::Sovereign
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pulse => "PULSE",
            Phase::Audit => "AUDIT",
            Phase::Climb => "CLIMB",
            Phase::Sovereign => "SOVEREIGN",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tri-state verdict summarizing aggregate confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollapseState {
    Alpha,
    Beta,
    Gamma,
}

impl CollapseState {
    pub fn from_confidence(average: f64) -> Self {
        if average > ALPHA_THRESHOLD {
            CollapseState::Alpha
        } else if average > BETA_THRESHOLD {
            CollapseState::Beta
        } else {
            CollapseState::Gamma
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, CollapseState::Alpha | CollapseState::Beta)
    }
}

/// Full outcome of one validation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub system: &'static str,
    pub genesis: &'static str,
    pub points_evaluated: usize,
    pub points_passed: usize,
    pub average_confidence: f64,
    pub collapse_state: CollapseState,
    pub verified: bool,
    pub points: Vec<PointResult>,
    pub handshakes: u64,
    pub phase: Phase,
}

/// The fields of a validation carried in registration receipts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarthSummary {
    pub collapse_state: CollapseState,
    pub points_passed: usize,
    pub average_confidence: f64,
}

impl ValidationResult {
    pub fn summary(&self) -> EarthSummary {
        EarthSummary {
            collapse_state: self.collapse_state,
            points_passed: self.points_passed,
            average_confidence: self.average_confidence,
        }
    }
}

pub struct EarthValidator {
    scorer: Box<dyn ConfidenceScorer>,
    handshakes: u64,
    phase: Phase,
}

impl Default for EarthValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl EarthValidator {
    pub fn new() -> Self {
        Self::with_scorer(Box::new(MatrixScorer))
    }

    pub fn with_scorer(scorer: Box<dyn ConfidenceScorer>) -> Self {
        Self {
            scorer,
            handshakes: 0,
            phase: Phase::Pulse,
        }
    }

    pub fn handshakes(&self) -> u64 {
        self.handshakes
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run the battery at `(lat, lon, alt)`. Never fails: an unverified location
    /// is reported through `verified == false`.
    pub fn validate(&mut self, lat: f64, lon: f64, alt: f64) -> ValidationResult {
        let prior_phase = self.advance();
        let ctx = CheckContext {
            lat,
            lon,
            alt,
            prior_phase,
            phase: self.phase,
            handshakes: self.handshakes,
            now: Utc::now(),
        };

        let points = self.scorer.score(&ctx);
        let average = if points.is_empty() {
            0.0
        } else {
            points.iter().map(|p| p.confidence).sum::<f64>() / points.len() as f64
        };
        let points_passed = points
            .iter()
            .filter(|p| p.confidence >= POINT_PASS_CONFIDENCE)
            .count();
        let collapse_state = CollapseState::from_confidence(average);

        tracing::debug!(
            lat,
            lon,
            average_confidence = average,
            collapse_state = ?collapse_state,
            handshakes = self.handshakes,
            "earth validation complete"
        );

        ValidationResult {
            system: "47-POINT MATRIX",
            genesis: GENESIS_TIMESTAMP,
            points_evaluated: points.len(),
            points_passed,
            average_confidence: crate::round4(average),
            collapse_state,
            verified: collapse_state.is_verified(),
            points,
            handshakes: self.handshakes,
            phase: self.phase,
        }
    }

    /// Scaling-phase step: one handshake, then recompute the phase. Returns the phase held before.
    fn advance(&mut self) -> Phase {
        let prior = self.phase;
        self.handshakes += 1;
        self.phase = Phase::for_handshakes(self.handshakes);
        if self.phase != prior {
            tracing::info!(
                from = %prior,
                to = %self.phase,
                handshakes = self.handshakes,
                "phase transition"
            );
        }
        prior
    }
}
