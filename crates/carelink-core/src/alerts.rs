//! # Alert Status Transitions
//!
//! Emergency alert status is a small state machine. The allowed moves are a
//! declared table so operators can tighten them without code changes.
//!
//! The default table is permissive: any status may follow any other,
//! including a resolved alert going back to pending.

use crate::{AlertStatus, CareError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Named transition tables selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPreset {
    /// Every move allowed.
    #[default]
    Permissive,
    /// pending -> acknowledged -> resolved, and pending -> resolved.
    ForwardOnly,
}

/// The set of allowed `(from, to)` status moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertTransitions {
    allowed: BTreeSet<(AlertStatus, AlertStatus)>,
}

impl Default for AlertTransitions {
    fn default() -> Self {
        Self::permissive()
    }
}

impl AlertTransitions {
    /// Every status may follow every status.
    #[must_use]
    pub fn permissive() -> Self {
        let allowed = AlertStatus::ALL
            .iter()
            .flat_map(|from| AlertStatus::ALL.iter().map(move |to| (*from, *to)))
            .collect();
        Self { allowed }
    }

    /// Status only moves forward. Re-setting the current status is allowed.
    #[must_use]
    pub fn forward_only() -> Self {
        use AlertStatus::{Acknowledged, Pending, Resolved};
        let mut allowed: BTreeSet<_> = AlertStatus::ALL.iter().map(|s| (*s, *s)).collect();
        allowed.insert((Pending, Acknowledged));
        allowed.insert((Pending, Resolved));
        allowed.insert((Acknowledged, Resolved));
        Self { allowed }
    }

    /// Build from an explicit list of moves.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (AlertStatus, AlertStatus)>) -> Self {
        Self {
            allowed: pairs.into_iter().collect(),
        }
    }

    /// Table for a named preset.
    #[must_use]
    pub fn from_preset(preset: TransitionPreset) -> Self {
        match preset {
            TransitionPreset::Permissive => Self::permissive(),
            TransitionPreset::ForwardOnly => Self::forward_only(),
        }
    }

    #[must_use]
    pub fn permits(&self, from: AlertStatus, to: AlertStatus) -> bool {
        self.allowed.contains(&(from, to))
    }

    /// `Ok` if the move is allowed, otherwise a validation error naming it.
    pub fn check(&self, from: AlertStatus, to: AlertStatus) -> Result<(), CareError> {
        if self.permits(from, to) {
            Ok(())
        } else {
            Err(CareError::Validation(format!(
                "Alert status cannot change from {from} to {to}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AlertStatus::{Acknowledged, Pending, Resolved};

    #[test]
    fn default_allows_reopening() {
        let table = AlertTransitions::default();
        assert!(table.permits(Resolved, Pending));
        assert!(table.permits(Acknowledged, Pending));
        assert!(table.check(Resolved, Pending).is_ok());
    }

    #[test]
    fn forward_only_rejects_going_back() {
        let table = AlertTransitions::forward_only();
        assert!(table.permits(Pending, Resolved));
        assert!(table.permits(Acknowledged, Resolved));
        assert!(table.permits(Resolved, Resolved));
        assert!(!table.permits(Resolved, Pending));
        assert!(!table.permits(Resolved, Acknowledged));

        let err = table.check(Resolved, Pending).expect_err("rejected");
        assert!(matches!(err, CareError::Validation(_)));
        assert!(err.to_string().contains("resolved"));
    }

    #[test]
    fn custom_pairs() {
        let table = AlertTransitions::from_pairs([(Pending, Acknowledged)]);
        assert!(table.permits(Pending, Acknowledged));
        assert!(!table.permits(Pending, Pending));
    }

    #[test]
    fn preset_parses_from_config_text() {
        let preset: TransitionPreset =
            serde_json::from_str("\"forward_only\"").expect("parse preset");
        assert_eq!(
            AlertTransitions::from_preset(preset),
            AlertTransitions::forward_only()
        );
    }
}
