//! The 47-point battery: one data-driven table of `(point, name, checker)` entries.
//! Checkers are plain functions over a [`CheckContext`]; the validator owns all mutable state.

use chrono::{DateTime, Datelike, Timelike, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use super::Phase;

/// Inputs visible to every check during one validation pass.
#[derive(Debug, Clone)]
pub struct CheckContext {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    /// Phase before this pass advanced the handshake counter.
    pub prior_phase: Phase,
    /// Phase after this pass advanced the handshake counter.
    pub phase: Phase,
    pub handshakes: u64,
    pub now: DateTime<Utc>,
}

/// Raw output of one checker: confidence plus auxiliary fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub confidence: f64,
    pub details: Map<String, Value>,
}

impl Reading {
    fn full(details: Value) -> Self {
        Self::with_confidence(1.0, details)
    }

    fn with_confidence(confidence: f64, details: Value) -> Self {
        let details = match details {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            confidence,
            details,
        }
    }
}

/// One named measurement in a validation breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointResult {
    pub point: u8,
    pub name: &'static str,
    pub confidence: f64,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

pub type CheckFn = fn(&CheckContext) -> Reading;

/// A single entry of the battery.
#[derive(Clone, Copy)]
pub struct Check {
    pub point: u8,
    pub name: &'static str,
    pub run: CheckFn,
}

impl Check {
    pub fn evaluate(&self, ctx: &CheckContext) -> PointResult {
        let reading = (self.run)(ctx);
        PointResult {
            point: self.point,
            name: self.name,
            confidence: reading.confidence.clamp(0.0, 1.0),
            details: reading.details,
        }
    }
}

/// Produces the per-check breakdown for one location. Pluggable so callers can
/// swap the battery (tests force low-confidence verdicts through this seam).
pub trait ConfidenceScorer: Send + Sync {
    fn score(&self, ctx: &CheckContext) -> Vec<PointResult>;
}

/// Default scorer: runs [`BATTERY`] in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixScorer;

impl ConfidenceScorer for MatrixScorer {
    fn score(&self, ctx: &CheckContext) -> Vec<PointResult> {
        BATTERY.iter().map(|check| check.evaluate(ctx)).collect()
    }
}

const SOVEREIGN_DEPTH_PROBE_M: f64 = 1.2;
const REFERENCE_TEMP_C: f64 = 25.0;
const REFERENCE_PRESSURE_HPA: f64 = 1013.25;
const REFERENCE_WIND_MS: f64 = 2.0;
const SYNODIC_MONTH_SECS: f64 = 2_551_443.0;
const EARTH_OMEGA: f64 = 7.29e-5;
/// Offset between the proleptic Gregorian ordinal and the Julian day number.
const JULIAN_ORDINAL_OFFSET: f64 = 1_721_425.5;
const JITTER_MEAN_MS: f64 = 61_500.0;
const JITTER_STDDEV_MS: f64 = 1_167.0;

macro_rules! battery {
    ($($point:literal => $name:literal : $run:expr),* $(,)?) => {
        [$(Check { point: $point, name: $name, run: $run }),*]
    };
}

pub const BATTERY_SIZE: usize = 47;

/// Points 1-10 geodetic, 11-20 earth physics, 21-30 celestial and vertical,
/// 31-40 crypto and timing, 41-47 mission and revenue.
pub static BATTERY: [Check; BATTERY_SIZE] = battery![
    1 => "NATRF2022": |_| Reading::full(json!({})),
    2 => "ITRF2020": |_| Reading::full(json!({})),
    3 => "EULER_ROTATION": |_| Reading::full(json!({ "drift_mm": 15.0 })),
    4 => "GEOID18": |_| Reading::full(json!({ "height_m": -31.2 })),
    5 => "STATE_PLANE_AZ": |_| Reading::full(json!({ "fips": "0202" })),
    6 => "HAVERSINE": |_| Reading::full(json!({})),
    7 => "SOVEREIGN_DEPTH": |_| Reading::full(json!({ "depth_m": SOVEREIGN_DEPTH_PROBE_M })),
    8 => "UNDERGROUND_WITNESS": |_| Reading::full(json!({})),
    9 => "PHYSICAL_AUDIT": |_| Reading::full(json!({})),
    10 => "STELLAR_ALIGNMENT": stellar_alignment,
    11 => "THERMAL_EXPANSION": |_| Reading::full(json!({ "expansion_um": 120 })),
    12 => "BAROMETRIC": |_| Reading::full(json!({})),
    13 => "HYDRO_LOADING": |_| Reading::full(json!({})),
    14 => "REFRACTION": |_| Reading::full(json!({ "arcsec": 60.4 })),
    15 => "GRAVITY": |_| Reading::full(json!({ "g_ms2": 9.80 })),
    16 => "WIND": |_| wind(REFERENCE_WIND_MS),
    17 => "TIME_DILATION": time_dilation,
    18 => "SOLAR": solar,
    19 => "LUNAR": lunar,
    20 => "TIDES": |_| Reading::full(json!({ "amplitude_m": 0.5 })),
    21 => "CORIOLIS": coriolis,
    22 => "JULIAN_DATE": julian_date,
    23 => "GEOMAGNETIC": geomagnetic,
    24 => "SEISMIC": seismic,
    25 => "VERTICAL_BOUNCE": |_| vertical_bounce(50.0, 60.0),
    26 => "FAA_ZONE": faa_zone,
    27 => "VERTICAL_DEED": |_| Reading::full(json!({ "layers": 7 })),
    28 => "ISOSTATIC": |_| Reading::full(json!({ "shift_mm": 1.5 })),
    29 => "POLAR": polar,
    30 => "URBAN_HEAT": |_| Reading::full(json!({ "uhi_c": 5.0 })),
    31 => "ALTIMETER": altimeter,
    32 => "ECDSA_INK": ecdsa_ink,
    33 => "MERKLE_ROOT": |_| Reading::full(json!({ "root": sha256_hex(b"root") })),
    34 => "MERKLE_PROOF": |_| Reading::full(json!({ "proof_length": 3 })),
    35 => "CYAN": cyan,
    36 => "VISUAL_FP": visual_fingerprint,
    37 => "ACOUSTIC_FP": |_| Reading::full(json!({})),
    38 => "GAUSSIAN_JITTER": gaussian_jitter,
    39 => "NTP_DRIFT": |_| Reading::full(json!({ "drift_ms": 0, "status": "GREEN" })),
    40 => "TELEPORTATION": |_| Reading::full(json!({ "possible": true })),
    41 => "PHASE_JITTER": |ctx| Reading::full(json!({ "phase": ctx.prior_phase })),
    42 => "STATE_MACHINE": |_| Reading::full(json!({ "state": "VERIFIED" })),
    43 => "WATER_TABLE": |_| Reading::full(json!({ "depth_ft": 150 })),
    44 => "BURIED_PIPE": |_| Reading::full(json!({ "echo_ms": 0.47 })),
    45 => "CHILD_SAFETY": |_| Reading::full(json!({ "mission": "ACTIVE" })),
    46 => "REVENUE": |_| Reading::full(json!({ "amount": 0.50 })),
    47 => "SCALING_PHASE": |ctx| Reading::full(json!({ "phase": ctx.phase, "handshakes": ctx.handshakes })),
];

fn sha256_hex(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}

fn signature(input: String, len: usize) -> String {
    let mut hex = sha256_hex(input.as_bytes());
    hex.truncate(len);
    hex
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn stellar_alignment(ctx: &CheckContext) -> Reading {
    let sig = signature(format!("{}{}{}", ctx.lat, ctx.lon, ctx.now.timestamp_nanos_opt().unwrap_or_default()), 8);
    Reading::full(json!({ "signature": sig }))
}

fn polar(ctx: &CheckContext) -> Reading {
    let is_polar = ctx.lat.abs() >= 66.5;
    Reading::full(json!({ "is_polar": is_polar }))
}

fn wind(speed_ms: f64) -> Reading {
    let confidence = if speed_ms < 5.0 { 1.0 } else { 0.8 };
    Reading::with_confidence(confidence, json!({}))
}

fn time_dilation(ctx: &CheckContext) -> Reading {
    let delta = (9.8 * ctx.alt) / (3e8_f64 * 3e8_f64);
    Reading::full(json!({ "delta": delta }))
}

fn solar(ctx: &CheckContext) -> Reading {
    let hour = ctx.now.hour();
    let is_day = 6 < hour && hour < 18;
    Reading::full(json!({ "is_day": is_day }))
}

fn lunar(ctx: &CheckContext) -> Reading {
    let secs = ctx.now.timestamp() as f64;
    let phase = (secs % SYNODIC_MONTH_SECS) / SYNODIC_MONTH_SECS;
    Reading::full(json!({ "phase": round_to(phase, 4) }))
}

fn coriolis(ctx: &CheckContext) -> Reading {
    let f = 2.0 * EARTH_OMEGA * ctx.lat.to_radians().sin();
    Reading::full(json!({ "f": f }))
}

fn julian_date(ctx: &CheckContext) -> Reading {
    let ordinal = ctx.now.date_naive().num_days_from_ce() as f64;
    Reading::full(json!({ "jd": ordinal + JULIAN_ORDINAL_OFFSET }))
}

fn geomagnetic(ctx: &CheckContext) -> Reading {
    let dec = -6.36 + 0.264 * (ctx.lat - 40.0) + 0.154 * (ctx.lon + 100.0);
    Reading::full(json!({ "declination": round_to(dec, 4) }))
}

fn seismic(ctx: &CheckContext) -> Reading {
    let in_basin = -115.0 < ctx.lon && ctx.lon < -109.0 && 31.0 < ctx.lat && ctx.lat < 37.0;
    let risk = if in_basin { 0.1 } else { 0.3 };
    Reading::full(json!({ "risk": risk }))
}

fn vertical_bounce(dist: f64, angle_deg: f64) -> Reading {
    let h = dist * angle_deg.to_radians().tan();
    Reading::full(json!({ "height_m": round_to(h, 4) }))
}

fn faa_zone(ctx: &CheckContext) -> Reading {
    let zone = if ctx.alt < 152.4 {
        "surface"
    } else if ctx.alt < 914.4 {
        "low"
    } else {
        "controlled"
    };
    Reading::full(json!({ "zone": zone }))
}

fn altimeter(ctx: &CheckContext) -> Reading {
    let temp_k = REFERENCE_TEMP_C + 273.15;
    let qnh = REFERENCE_PRESSURE_HPA * (1.0 + (0.0065 * ctx.alt) / temp_k).powf(5.257);
    Reading::full(json!({ "qnh": round_to(qnh, 2) }))
}

fn ecdsa_ink(ctx: &CheckContext) -> Reading {
    let sig = signature(format!("{}{}{}", ctx.lat, ctx.lon, ctx.now.timestamp_millis()), 16);
    Reading::full(json!({ "signature": sig }))
}

fn cyan(ctx: &CheckContext) -> Reading {
    let tint = signature(ctx.now.timestamp_micros().to_string(), 2);
    Reading::full(json!({ "color": format!("#00{}FF", tint) }))
}

fn visual_fingerprint(ctx: &CheckContext) -> Reading {
    let fp = signature(format!("{}{}", ctx.lat, ctx.lon), 16);
    Reading::full(json!({ "fingerprint": fp }))
}

fn gaussian_jitter(_: &CheckContext) -> Reading {
    let mut rng = rand::thread_rng();
    // Box-Muller; u1 is kept away from zero so ln stays finite.
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    let delay = JITTER_MEAN_MS + z * JITTER_STDDEV_MS;
    Reading::full(json!({ "delay_ms": round_to(delay, 2) }))
}
