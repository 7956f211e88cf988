//! The Bridge: composes the Earth validator, registry, danger scorer and alert log
//! into the register -> bond -> safety-check workflow.
//!
//! One `Bridge` is built at process start and lives until shutdown. It is not
//! internally synchronized; concurrent callers must hold a single lock around
//! every call so handshake/phase updates stay atomic.

use serde::Serialize;

use crate::alerts::{AlertLog, SafetyAlert};
use crate::danger::{ChildState, DangerScorer};
use crate::earth::{EarthSummary, EarthValidator, Phase, ValidationResult, DEFAULT_ALTITUDE_M};
use crate::error::{BridgeError, BridgeResult, EntityKind};
use crate::registry::{NewSession, Registry};

/// Safety checks re-anchor the session location whenever the global alert count
/// is a multiple of this (including zero).
pub const REVALIDATION_INTERVAL: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationReceipt {
    pub session_id: String,
    pub pool_id: String,
    pub earth_validation: EarthSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BondReceipt {
    pub bond_id: String,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyReport {
    pub bond_id: String,
    pub child_id: String,
    pub danger_probability: f64,
    pub alert: bool,
    pub handshake_count: u64,
    /// Nanoseconds since epoch.
    pub timestamp: i64,
    pub logics_applied: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<String>,
    pub earth_validated: bool,
    pub phase: Phase,
    pub total_handshakes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStats {
    pub sessions: usize,
    pub pools: usize,
    pub bonds: usize,
    pub alerts: usize,
    pub earth_handshakes: u64,
    pub phase: Phase,
}

#[derive(Default)]
pub struct Bridge {
    earth: EarthValidator,
    registry: Registry,
    alerts: AlertLog,
    danger: DangerScorer,
}

impl Bridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validator(earth: EarthValidator) -> Self {
        Self {
            earth,
            ..Self::default()
        }
    }

    pub fn earth(&self) -> &EarthValidator {
        &self.earth
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Validate, then register the pool and open a session holding the validation snapshot.
    pub fn register_location(
        &mut self,
        owner_id: &str,
        lat: f64,
        lon: f64,
        depth_m: f64,
        name: &str,
    ) -> BridgeResult<RegistrationReceipt> {
        let earth = self.earth.validate(lat, lon, DEFAULT_ALTITUDE_M);
        if !earth.verified {
            tracing::warn!(
                owner_id,
                lat,
                lon,
                collapse_state = ?earth.collapse_state,
                "registration rejected by earth validation"
            );
            return Err(BridgeError::ValidationFailed(Box::new(earth)));
        }

        let pool_id = self.registry.register_pool(owner_id, lat, lon, depth_m);
        let summary = earth.summary();
        let session_id = self.registry.open_session(NewSession {
            pool_id: pool_id.clone(),
            owner_id: owner_id.to_string(),
            lat,
            lon,
            depth_m,
            name: name.to_string(),
            earth_validation: earth,
        });

        Ok(RegistrationReceipt {
            session_id,
            pool_id,
            earth_validation: summary,
        })
    }

    pub fn create_family_bond(
        &mut self,
        session_id: &str,
        mother_id: &str,
        child_id: &str,
    ) -> BridgeResult<BondReceipt> {
        let pool_id = self
            .registry
            .get_session(session_id)
            .map(|s| s.pool_id.clone())
            .ok_or_else(|| BridgeError::not_found(EntityKind::Session, session_id))?;

        let bond_id = self.registry.create_bond(mother_id, child_id, &pool_id)?;
        self.registry.attach_bond(session_id, &bond_id)?;

        Ok(BondReceipt {
            bond_id,
            session_id: session_id.to_string(),
        })
    }

    pub fn safety_check(&mut self, bond_id: &str, child: &ChildState) -> BridgeResult<SafetyReport> {
        let (lat, lon) = self
            .registry
            .find_session_owning_bond(bond_id)
            .map(|s| (s.lat, s.lon))
            .ok_or_else(|| BridgeError::not_found(EntityKind::Bond, bond_id))?;

        if self.alerts.len() % REVALIDATION_INTERVAL == 0 {
            let earth = self.earth.validate(lat, lon, DEFAULT_ALTITUDE_M);
            tracing::info!(
                bond_id,
                alerts = self.alerts.len(),
                verified = earth.verified,
                "periodic earth re-validation"
            );
            if !earth.verified {
                tracing::warn!(bond_id, lat, lon, "earth validation lost; reanchor required");
                return Err(BridgeError::EarthValidationLost);
            }
        }

        let bond = self
            .registry
            .get_bond_mut(bond_id)
            .ok_or_else(|| BridgeError::not_found(EntityKind::Bond, bond_id))?;
        let assessment = self.danger.score(bond, child, &mut self.alerts);

        tracing::debug!(
            bond_id,
            child_id = %child.child_id,
            danger_probability = assessment.probability,
            alert = assessment.alert,
            "safety check complete"
        );

        Ok(SafetyReport {
            bond_id: bond_id.to_string(),
            child_id: child.child_id.clone(),
            danger_probability: crate::round4(assessment.probability),
            alert: assessment.alert,
            handshake_count: assessment.handshake_count,
            timestamp: crate::now_nanos(),
            logics_applied: crate::SAFETY_POINTS,
            alert_id: assessment.alert_id,
            earth_validated: true,
            phase: self.earth.phase(),
            total_handshakes: self.earth.handshakes(),
        })
    }

    pub fn alerts(&self, since: Option<i64>) -> Vec<&SafetyAlert> {
        self.alerts.query(since)
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }

    /// Standalone validation on a throwaway validator; never touches the shared
    /// handshake counter or phase.
    pub fn validate_location_only(lat: f64, lon: f64, alt: f64) -> ValidationResult {
        EarthValidator::new().validate(lat, lon, alt)
    }

    pub fn stats(&self) -> SystemStats {
        SystemStats {
            sessions: self.registry.session_count(),
            pools: self.registry.pool_count(),
            bonds: self.registry.bond_count(),
            alerts: self.alerts.len(),
            earth_handshakes: self.earth.handshakes(),
            phase: self.earth.phase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phoenix(bridge: &mut Bridge) -> RegistrationReceipt {
        bridge
            .register_location("M1", 33.4484, -112.074, 1.2, "Backyard Pool")
            .unwrap()
    }

    #[test]
    fn registration_opens_session_with_snapshot() {
        let mut bridge = Bridge::new();
        let receipt = phoenix(&mut bridge);
        let session = bridge.registry().get_session(&receipt.session_id).unwrap();
        assert_eq!(session.pool_id, receipt.pool_id);
        assert_eq!(session.earth_validation.handshakes, 1);
        assert!(session.earth_validation.verified);
        assert!(session.bonds().is_empty());
        assert!(bridge.registry().get_pool(&receipt.pool_id).is_some());
    }

    #[test]
    fn bond_on_unknown_session_is_not_found() {
        let mut bridge = Bridge::new();
        let err = bridge.create_family_bond("ghost", "M1", "C1").unwrap_err();
        assert!(matches!(err, BridgeError::NotFound { kind: EntityKind::Session, .. }));
        assert_eq!(bridge.stats().bonds, 0);
    }

    #[test]
    fn safety_check_on_unknown_bond_is_not_found() {
        let mut bridge = Bridge::new();
        phoenix(&mut bridge);
        let err = bridge
            .safety_check("ghost", &ChildState::new("C1"))
            .unwrap_err();
        assert!(matches!(err, BridgeError::NotFound { kind: EntityKind::Bond, .. }));
        // Lookup failed before the re-validation step.
        assert_eq!(bridge.earth().handshakes(), 1);
    }

    #[test]
    fn first_check_revalidates_because_log_is_empty() {
        let mut bridge = Bridge::new();
        let receipt = phoenix(&mut bridge);
        let bond = bridge.create_family_bond(&receipt.session_id, "M1", "C1").unwrap();
        let report = bridge
            .safety_check(&bond.bond_id, &ChildState::new("C1").distance(9.0))
            .unwrap();
        assert_eq!(report.total_handshakes, 2);
        assert_eq!(report.handshake_count, 1);
        assert!(report.earth_validated);
        assert_eq!(report.logics_applied, 20);
    }

    #[test]
    fn alert_count_off_the_modulus_skips_revalidation() {
        let mut bridge = Bridge::new();
        let receipt = phoenix(&mut bridge);
        let bond = bridge.create_family_bond(&receipt.session_id, "M1", "C1").unwrap();
        let danger = ChildState::new("C1").distance(0.0).moving_toward(true).heart_rate(160.0);

        // Empty log: re-validates, then raises alert #1.
        let first = bridge.safety_check(&bond.bond_id, &danger).unwrap();
        assert!(first.alert);
        assert!(first.alert_id.is_some());
        assert_eq!(first.total_handshakes, 2);

        // One alert logged: 1 % 10 != 0, no re-validation.
        let second = bridge.safety_check(&bond.bond_id, &danger).unwrap();
        assert_eq!(second.total_handshakes, 2);
        assert_eq!(second.handshake_count, 2);
        assert_eq!(bridge.alert_count(), 2);
    }

    #[test]
    fn validate_location_only_leaves_shared_state_alone() {
        let mut bridge = Bridge::new();
        phoenix(&mut bridge);
        let result = Bridge::validate_location_only(40.0, -100.0, 500.0);
        assert_eq!(result.points.len(), 47);
        assert_eq!(result.handshakes, 1);
        assert_eq!(bridge.earth().handshakes(), 1);
    }

    #[test]
    fn stats_reflect_registry_and_validator() {
        let mut bridge = Bridge::new();
        let receipt = phoenix(&mut bridge);
        bridge.create_family_bond(&receipt.session_id, "M1", "C1").unwrap();
        bridge.create_family_bond(&receipt.session_id, "M1", "C2").unwrap();
        let stats = bridge.stats();
        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.pools, 1);
        assert_eq!(stats.bonds, 2);
        assert_eq!(stats.alerts, 0);
        assert_eq!(stats.earth_handshakes, 1);
        assert_eq!(stats.phase, Phase::Pulse);
    }

    #[test]
    fn report_omits_alert_id_when_calm() {
        let mut bridge = Bridge::new();
        let receipt = phoenix(&mut bridge);
        let bond = bridge.create_family_bond(&receipt.session_id, "M1", "C1").unwrap();
        let report = bridge
            .safety_check(&bond.bond_id, &ChildState::new("C1").distance(20.0))
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("alert_id").is_none());
        assert_eq!(json["phase"], "PULSE");
        assert_eq!(json["danger_probability"], 0.0);
    }
}
