//! Pool, bond and session registry. Plain in-memory maps owned by the bridge.
//!
//! `find_session_owning_bond` scans every session's bond list; fine at the
//! cardinalities this service sees, linear in total bonds otherwise.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::earth::ValidationResult;
use crate::error::{BridgeError, BridgeResult, EntityKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pool {
    pub pool_id: String,
    pub owner_id: String,
    pub lat: f64,
    pub lon: f64,
    pub depth_m: f64,
    pub created_at: DateTime<Utc>,
}

/// Monitoring relationship between a guardian and a child for one pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bond {
    pub bond_id: String,
    pub mother_id: String,
    pub child_id: String,
    pub pool_id: String,
    pub created_at: DateTime<Utc>,
    /// One per safety check against this bond; never decremented.
    pub handshake_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BondSummary {
    pub bond_id: String,
    pub mother_id: String,
    pub child_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Bond> for BondSummary {
    fn from(bond: &Bond) -> Self {
        Self {
            bond_id: bond.bond_id.clone(),
            mother_id: bond.mother_id.clone(),
            child_id: bond.child_id.clone(),
            created_at: bond.created_at,
        }
    }
}

/// Aggregation root an operator works with. Holds the validation that justified it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub session_id: String,
    pub pool_id: String,
    pub owner_id: String,
    pub lat: f64,
    pub lon: f64,
    pub depth_m: f64,
    pub name: String,
    pub earth_validation: ValidationResult,
    pub created_at: DateTime<Utc>,
    bonds: Vec<BondSummary>,
}

impl Session {
    /// Bond summaries in creation order. Append-only.
    pub fn bonds(&self) -> &[BondSummary] {
        &self.bonds
    }

    pub fn owns_bond(&self, bond_id: &str) -> bool {
        self.bonds.iter().any(|b| b.bond_id == bond_id)
    }
}

/// Fields needed to open a session; the registry assigns identity and time.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub pool_id: String,
    pub owner_id: String,
    pub lat: f64,
    pub lon: f64,
    pub depth_m: f64,
    pub name: String,
    pub earth_validation: ValidationResult,
}

#[derive(Debug, Default)]
pub struct Registry {
    pools: HashMap<String, Pool>,
    bonds: HashMap<String, Bond>,
    sessions: HashMap<String, Session>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pool(&mut self, owner_id: &str, lat: f64, lon: f64, depth_m: f64) -> String {
        let pool_id = crate::new_id();
        self.pools.insert(
            pool_id.clone(),
            Pool {
                pool_id: pool_id.clone(),
                owner_id: owner_id.to_string(),
                lat,
                lon,
                depth_m,
                created_at: Utc::now(),
            },
        );
        tracing::info!(pool_id = %pool_id, owner_id, lat, lon, depth_m, "pool registered");
        pool_id
    }

    /// Fails with `NotFound` (and leaves the registry untouched) when `pool_id` is unknown.
    pub fn create_bond(
        &mut self,
        mother_id: &str,
        child_id: &str,
        pool_id: &str,
    ) -> BridgeResult<String> {
        if !self.pools.contains_key(pool_id) {
            return Err(BridgeError::not_found(EntityKind::Pool, pool_id));
        }
        let bond_id = crate::new_id();
        self.bonds.insert(
            bond_id.clone(),
            Bond {
                bond_id: bond_id.clone(),
                mother_id: mother_id.to_string(),
                child_id: child_id.to_string(),
                pool_id: pool_id.to_string(),
                created_at: Utc::now(),
                handshake_count: 0,
            },
        );
        tracing::info!(bond_id = %bond_id, mother_id, child_id, pool_id, "bond created");
        Ok(bond_id)
    }

    pub fn open_session(&mut self, new: NewSession) -> String {
        let session_id = crate::new_id();
        tracing::info!(
            session_id = %session_id,
            pool_id = %new.pool_id,
            name = %new.name,
            "session opened"
        );
        self.sessions.insert(
            session_id.clone(),
            Session {
                session_id: session_id.clone(),
                pool_id: new.pool_id,
                owner_id: new.owner_id,
                lat: new.lat,
                lon: new.lon,
                depth_m: new.depth_m,
                name: new.name,
                earth_validation: new.earth_validation,
                created_at: Utc::now(),
                bonds: Vec::new(),
            },
        );
        session_id
    }

    /// Record `bond_id` under `session_id`. The bond must already exist.
    pub fn attach_bond(&mut self, session_id: &str, bond_id: &str) -> BridgeResult<()> {
        let summary = self
            .bonds
            .get(bond_id)
            .map(BondSummary::from)
            .ok_or_else(|| BridgeError::not_found(EntityKind::Bond, bond_id))?;
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| BridgeError::not_found(EntityKind::Session, session_id))?;
        session.bonds.push(summary);
        Ok(())
    }

    pub fn get_pool(&self, pool_id: &str) -> Option<&Pool> {
        self.pools.get(pool_id)
    }

    pub fn get_bond(&self, bond_id: &str) -> Option<&Bond> {
        self.bonds.get(bond_id)
    }

    pub fn get_bond_mut(&mut self, bond_id: &str) -> Option<&mut Bond> {
        self.bonds.get_mut(bond_id)
    }

    pub fn get_session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn find_session_owning_bond(&self, bond_id: &str) -> Option<&Session> {
        self.sessions.values().find(|s| s.owns_bond(bond_id))
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
