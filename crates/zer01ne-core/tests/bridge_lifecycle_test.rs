//! Integration test: Bridge lifecycle. Register location, bond a family, run
//! safety checks, and watch the periodic Earth re-validation gate.
//!
//! ## Scenarios
//! 1. Phoenix walkthrough: verified registration, bond, 0.745 danger without alert.
//! 2. GAMMA at registration fails with ValidationFailed and registers nothing.
//! 3. Re-validation fires on the empty log and on every 10th alert; a lost
//!    verdict aborts the check before any scoring happens.
//! 4. Alerts are queryable by cursor in insertion order.
//! 5. Phase advances through the bridge exactly at the 500th handshake.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use zer01ne_core::earth::CheckContext;
use zer01ne_core::{
    Bridge, BridgeError, ChildState, CollapseState, ConfidenceScorer, EarthValidator,
    MatrixScorer, Phase, PointResult,
};

/// Full-confidence battery until `lost` is set, then every point reads 0.1.
struct SwitchableScorer {
    lost: Arc<AtomicBool>,
}

impl ConfidenceScorer for SwitchableScorer {
    fn score(&self, ctx: &CheckContext) -> Vec<PointResult> {
        let points = MatrixScorer.score(ctx);
        if !self.lost.load(Ordering::SeqCst) {
            return points;
        }
        points
            .into_iter()
            .map(|p| PointResult {
                confidence: 0.1,
                ..p
            })
            .collect()
    }
}

fn switchable_bridge() -> (Bridge, Arc<AtomicBool>) {
    let lost = Arc::new(AtomicBool::new(false));
    let scorer = SwitchableScorer {
        lost: Arc::clone(&lost),
    };
    let bridge = Bridge::with_validator(EarthValidator::with_scorer(Box::new(scorer)));
    (bridge, lost)
}

fn high_danger(child_id: &str) -> ChildState {
    ChildState::new(child_id)
        .distance(0.0)
        .moving_toward(true)
        .heart_rate(160.0)
}

// ===========================================================================
// Scenario 1: Phoenix walkthrough
// ===========================================================================

#[test]
fn phoenix_walkthrough() {
    let mut bridge = Bridge::new();
    let receipt = bridge
        .register_location("M1", 33.4484, -112.074, 1.2, "Backyard Pool")
        .expect("verified registration");
    assert_eq!(receipt.earth_validation.collapse_state, CollapseState::Alpha);
    assert_eq!(receipt.earth_validation.points_passed, 47);

    let bond = bridge
        .create_family_bond(&receipt.session_id, "M1", "CHILD_AZ_001")
        .expect("bond on live session");
    assert_eq!(bond.session_id, receipt.session_id);

    let child = ChildState::new("CHILD_AZ_001")
        .at(33.4484, -112.074)
        .distance(2.5)
        .moving_toward(true)
        .heart_rate(95.0);
    let report = bridge.safety_check(&bond.bond_id, &child).unwrap();

    assert_eq!(report.danger_probability, 0.745);
    assert!(!report.alert);
    assert_eq!(report.handshake_count, 1);
    assert_eq!(report.phase, Phase::Pulse);
    assert_eq!(report.total_handshakes, 2);
    assert!(bridge.alerts(None).is_empty());

    let session = bridge.registry().get_session(&receipt.session_id).unwrap();
    assert_eq!(session.bonds().len(), 1);
    assert_eq!(session.bonds()[0].child_id, "CHILD_AZ_001");
}

// ===========================================================================
// Scenario 2: GAMMA registration
// ===========================================================================

#[test]
fn gamma_registration_is_rejected_without_side_effects() {
    let (mut bridge, lost) = switchable_bridge();
    lost.store(true, Ordering::SeqCst);

    let err = bridge
        .register_location("M1", 33.4484, -112.074, 1.2, "Pool")
        .unwrap_err();
    match err {
        BridgeError::ValidationFailed(result) => {
            assert_eq!(result.collapse_state, CollapseState::Gamma);
            assert!(!result.verified);
            assert_eq!(result.points.len(), 47);
        }
        other => panic!("expected ValidationFailed, got {other:?}"),
    }

    let stats = bridge.stats();
    assert_eq!(stats.pools, 0);
    assert_eq!(stats.sessions, 0);
    // The failed validation still counted as a handshake.
    assert_eq!(stats.earth_handshakes, 1);
}

// ===========================================================================
// Scenario 3: periodic re-validation
// ===========================================================================

#[test]
fn tenth_alert_triggers_revalidation_and_lost_verdict_aborts() {
    let (mut bridge, lost) = switchable_bridge();
    let receipt = bridge
        .register_location("M1", 33.4484, -112.074, 1.2, "Pool")
        .unwrap();
    let bond = bridge
        .create_family_bond(&receipt.session_id, "M1", "C1")
        .unwrap();

    let mut handshakes_seen = Vec::new();
    for _ in 0..10 {
        let report = bridge.safety_check(&bond.bond_id, &high_danger("C1")).unwrap();
        assert!(report.alert);
        handshakes_seen.push(report.total_handshakes);
    }
    // Only the first check (empty log) re-validated.
    assert_eq!(handshakes_seen, vec![2; 10]);
    assert_eq!(bridge.alert_count(), 10);

    lost.store(true, Ordering::SeqCst);
    let err = bridge
        .safety_check(&bond.bond_id, &high_danger("C1"))
        .unwrap_err();
    assert!(matches!(err, BridgeError::EarthValidationLost));
    assert_eq!(err.to_string(), "Earth validation lost - reanchor required");

    // No scoring happened: bond handshakes and the alert log are unchanged.
    let bond_state = bridge.registry().get_bond(&bond.bond_id).unwrap();
    assert_eq!(bond_state.handshake_count, 10);
    assert_eq!(bridge.alert_count(), 10);
    assert_eq!(bridge.earth().handshakes(), 3);
}

#[test]
fn lost_verdict_on_first_check_blocks_scoring() {
    let (mut bridge, lost) = switchable_bridge();
    let receipt = bridge
        .register_location("M1", 1.0, 1.0, 1.2, "Pool")
        .unwrap();
    let bond = bridge
        .create_family_bond(&receipt.session_id, "M1", "C1")
        .unwrap();

    lost.store(true, Ordering::SeqCst);
    let err = bridge
        .safety_check(&bond.bond_id, &ChildState::new("C1"))
        .unwrap_err();
    assert!(matches!(err, BridgeError::EarthValidationLost));
    assert_eq!(
        bridge.registry().get_bond(&bond.bond_id).unwrap().handshake_count,
        0
    );
}

#[test]
fn calm_checks_keep_revalidating_while_log_is_empty() {
    let mut bridge = Bridge::new();
    let receipt = bridge
        .register_location("M1", 1.0, 1.0, 1.2, "Pool")
        .unwrap();
    let bond = bridge
        .create_family_bond(&receipt.session_id, "M1", "C1")
        .unwrap();

    for n in 1..=5u64 {
        let report = bridge
            .safety_check(&bond.bond_id, &ChildState::new("C1").distance(50.0))
            .unwrap();
        assert_eq!(report.total_handshakes, 1 + n);
        assert_eq!(report.handshake_count, n);
    }
}

// ===========================================================================
// Scenario 4: alert cursor
// ===========================================================================

#[test]
fn alerts_are_ordered_and_filtered_by_cursor() {
    let mut bridge = Bridge::new();
    let receipt = bridge
        .register_location("M1", 1.0, 1.0, 1.2, "Pool")
        .unwrap();
    let bond = bridge
        .create_family_bond(&receipt.session_id, "M1", "C1")
        .unwrap();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let report = bridge.safety_check(&bond.bond_id, &high_danger("C1")).unwrap();
        ids.push(report.alert_id.expect("alert raised"));
    }

    let all: Vec<_> = bridge.alerts(None).iter().map(|a| a.alert_id.clone()).collect();
    assert_eq!(all, ids);

    let first_ts = bridge.alerts(None)[0].observed_at;
    let after_first: Vec<_> = bridge
        .alerts(Some(first_ts))
        .into_iter()
        .map(|a| a.observed_at)
        .collect();
    assert!(after_first.iter().all(|ts| *ts > first_ts));

    assert_eq!(bridge.alerts(Some(first_ts - 1)).len(), 3);
    assert!(bridge.alerts(Some(i64::MAX)).is_empty());
    assert!(bridge
        .alerts(None)
        .iter()
        .all(|a| a.escalated_to_satellite && a.pool_id == receipt.pool_id));
}

// ===========================================================================
// Scenario 5: phase through the bridge
// ===========================================================================

#[test]
fn five_hundredth_handshake_flips_to_audit() {
    let mut bridge = Bridge::new();
    for _ in 0..499 {
        bridge
            .register_location("M1", 1.0, 1.0, 1.2, "Pool")
            .unwrap();
    }
    assert_eq!(bridge.stats().phase, Phase::Pulse);
    assert_eq!(bridge.stats().earth_handshakes, 499);

    bridge
        .register_location("M1", 1.0, 1.0, 1.2, "Pool")
        .unwrap();
    let stats = bridge.stats();
    assert_eq!(stats.earth_handshakes, 500);
    assert_eq!(stats.phase, Phase::Audit);
    assert_eq!(stats.sessions, 500);
}
