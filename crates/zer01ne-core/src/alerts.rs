//! Append-only alert log, queried by an `observed_at` cursor (epoch millis).

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyAlert {
    pub alert_id: String,
    pub child_id: String,
    pub pool_id: String,
    pub danger_probability: f64,
    /// Epoch milliseconds.
    pub observed_at: i64,
    pub triggered: bool,
    pub escalated_to_satellite: bool,
}

impl SafetyAlert {
    /// A triggered alert stamped now. Every raised alert is escalated to satellite.
    pub fn escalated(child_id: &str, pool_id: &str, danger_probability: f64) -> Self {
        Self {
            alert_id: crate::new_id(),
            child_id: child_id.to_string(),
            pool_id: pool_id.to_string(),
            danger_probability,
            observed_at: crate::now_millis(),
            triggered: true,
            escalated_to_satellite: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct AlertLog {
    alerts: Vec<SafetyAlert>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, alert: SafetyAlert) {
        self.alerts.push(alert);
    }

    /// Alerts with `observed_at > since` in insertion order; all of them when `since` is `None`.
    pub fn query(&self, since: Option<i64>) -> Vec<&SafetyAlert> {
        match since {
            Some(cursor) => self.alerts.iter().filter(|a| a.observed_at > cursor).collect(),
            None => self.alerts.iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert_at(id: &str, observed_at: i64) -> SafetyAlert {
        SafetyAlert {
            alert_id: id.to_string(),
            child_id: "C1".into(),
            pool_id: "p1".into(),
            danger_probability: 0.9,
            observed_at,
            triggered: true,
            escalated_to_satellite: true,
        }
    }

    fn seeded() -> AlertLog {
        let mut log = AlertLog::new();
        log.append(alert_at("a", 100));
        log.append(alert_at("b", 200));
        log.append(alert_at("c", 300));
        log
    }

    fn ids(alerts: Vec<&SafetyAlert>) -> Vec<&str> {
        alerts.into_iter().map(|a| a.alert_id.as_str()).collect()
    }

    #[test]
    fn query_without_cursor_returns_everything_in_order() {
        let log = seeded();
        assert_eq!(ids(log.query(None)), ["a", "b", "c"]);
    }

    #[test]
    fn cursor_is_exclusive() {
        let log = seeded();
        assert_eq!(ids(log.query(Some(100))), ["b", "c"]);
        assert_eq!(ids(log.query(Some(199))), ["b", "c"]);
        assert_eq!(ids(log.query(Some(200))), ["c"]);
    }

    #[test]
    fn cursor_outside_range() {
        let log = seeded();
        assert_eq!(ids(log.query(Some(0))), ["a", "b", "c"]);
        assert!(log.query(Some(300)).is_empty());
        assert!(log.query(Some(i64::MAX)).is_empty());
    }

    #[test]
    fn escalated_alert_is_triggered_and_sent() {
        let alert = SafetyAlert::escalated("C1", "p1", 0.93);
        assert!(alert.triggered);
        assert!(alert.escalated_to_satellite);
        assert!(alert.observed_at > 0);
        assert_eq!(alert.danger_probability, 0.93);
    }
}
