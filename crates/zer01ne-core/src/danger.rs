//! Danger scoring: the 20-logic proximity heuristic.
//!
//! ```text
//! distance_factor = max(0, 1 - distance_to_pool_m / 10)
//! movement_factor = 0.3 if moving toward the pool else 0
//! heart_factor    = max(0, (heart_rate_bpm - 60) / 100)
//! probability     = min(1, distance_factor*0.5 + movement_factor + heart_factor*0.2)
//! ```
//!
//! The formula is a compatibility contract; keep it bit-for-bit.

use serde::{Deserialize, Serialize};

use crate::alerts::{AlertLog, SafetyAlert};
use crate::registry::Bond;

/// An alert is raised strictly above this probability.
pub const ALERT_THRESHOLD: f64 = 0.8;

const DISTANCE_SATURATION_M: f64 = 10.0;
const DISTANCE_WEIGHT: f64 = 0.5;
const MOVEMENT_PENALTY: f64 = 0.3;
const HEART_BASELINE_BPM: f64 = 60.0;
const HEART_SPAN_BPM: f64 = 100.0;
const HEART_WEIGHT: f64 = 0.2;

fn default_child_id() -> String {
    "unknown".to_string()
}

fn default_heart_rate() -> f64 {
    HEART_BASELINE_BPM
}

/// Per-call telemetry snapshot. Never stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildState {
    #[serde(default = "default_child_id")]
    pub child_id: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
    #[serde(default, rename = "distance", alias = "distance_to_pool_m")]
    pub distance_to_pool_m: f64,
    #[serde(default, rename = "moving_toward", alias = "moving_toward_pool")]
    pub moving_toward_pool: bool,
    #[serde(default = "default_heart_rate", rename = "heart_rate", alias = "heart_rate_bpm")]
    pub heart_rate_bpm: f64,
    /// Epoch milliseconds; stamped with the current time when absent.
    #[serde(default = "crate::now_millis")]
    pub observed_at: i64,
}

impl ChildState {
    pub fn new(child_id: impl Into<String>) -> Self {
        Self {
            child_id: child_id.into(),
            lat: 0.0,
            lon: 0.0,
            distance_to_pool_m: 0.0,
            moving_toward_pool: false,
            heart_rate_bpm: HEART_BASELINE_BPM,
            observed_at: crate::now_millis(),
        }
    }

    pub fn at(mut self, lat: f64, lon: f64) -> Self {
        self.lat = lat;
        self.lon = lon;
        self
    }

    pub fn distance(mut self, meters: f64) -> Self {
        self.distance_to_pool_m = meters;
        self
    }

    pub fn moving_toward(mut self, moving: bool) -> Self {
        self.moving_toward_pool = moving;
        self
    }

    pub fn heart_rate(mut self, bpm: f64) -> Self {
        self.heart_rate_bpm = bpm;
        self
    }
}

pub fn danger_probability(child: &ChildState) -> f64 {
    let distance_factor = (1.0 - child.distance_to_pool_m / DISTANCE_SATURATION_M).max(0.0);
    let movement_factor = if child.moving_toward_pool {
        MOVEMENT_PENALTY
    } else {
        0.0
    };
    let heart_factor = ((child.heart_rate_bpm - HEART_BASELINE_BPM) / HEART_SPAN_BPM).max(0.0);
    (distance_factor * DISTANCE_WEIGHT + movement_factor + heart_factor * HEART_WEIGHT).min(1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DangerAssessment {
    pub probability: f64,
    pub alert: bool,
    /// The bond's handshake count after this check.
    pub handshake_count: u64,
    pub alert_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DangerScorer;

impl DangerScorer {
    /// Score `child` against `bond`: bumps the bond's handshake count and, above
    /// [`ALERT_THRESHOLD`], appends an escalated alert to `log`.
    pub fn score(&self, bond: &mut Bond, child: &ChildState, log: &mut AlertLog) -> DangerAssessment {
        let probability = danger_probability(child);
        bond.handshake_count += 1;
        let alert = probability > ALERT_THRESHOLD;

        let alert_id = alert.then(|| {
            let safety_alert = SafetyAlert::escalated(&child.child_id, &bond.pool_id, probability);
            let id = safety_alert.alert_id.clone();
            tracing::warn!(
                alert_id = %id,
                bond_id = %bond.bond_id,
                child_id = %child.child_id,
                danger_probability = probability,
                "safety alert raised; escalated to satellite"
            );
            log.append(safety_alert);
            id
        });

        DangerAssessment {
            probability,
            alert,
            handshake_count: bond.handshake_count,
            alert_id,
        }
    }
}
