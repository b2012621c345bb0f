//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the CareLink record engine:
//! - Opaque record identifiers (`RecordId`)
//! - Closed enumerations (`Role`, `Severity`, `AlertStatus`, `EntityKind`)
//! - Error types (`CareError`)
//!
//! ## Ordering Guarantees
//!
//! All identifier and enum types implement `Ord` so they can key `BTreeMap`
//! and `BTreeSet` collections with deterministic iteration order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// RECORD IDENTIFIER
// =============================================================================

/// Opaque identifier of a stored record.
///
/// Identifiers are assigned by the store on insert and cross the API
/// boundary as plain strings. Callers must not infer anything from their shape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Create an identifier from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier (UUID v4, simple hex form).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty identifier never references a record.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// =============================================================================
// ROLE
// =============================================================================

/// The two roles a user can hold. Fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Nurse,
    Patient,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nurse => "nurse",
            Self::Patient => "patient",
        }
    }
}

impl FromStr for Role {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nurse" => Ok(Self::Nurse),
            "patient" => Ok(Self::Patient),
            other => Err(CareError::Validation(format!(
                "Invalid role \"{other}\": expected nurse or patient"
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SEVERITY
// =============================================================================

/// Severity of a reported symptom.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    #[default]
    Moderate,
    Severe,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }
}

impl FromStr for Severity {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mild" => Ok(Self::Mild),
            "moderate" => Ok(Self::Moderate),
            "severe" => Ok(Self::Severe),
            other => Err(CareError::Validation(format!(
                "Invalid severity \"{other}\": expected mild, moderate or severe"
            ))),
        }
    }
}

// =============================================================================
// ALERT STATUS
// =============================================================================

/// Lifecycle state of an emergency alert.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    #[default]
    Pending,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Acknowledged, Self::Resolved];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
        }
    }
}

impl FromStr for AlertStatus {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "acknowledged" => Ok(Self::Acknowledged),
            "resolved" => Ok(Self::Resolved),
            other => Err(CareError::Validation(format!(
                "Invalid alert status \"{other}\": expected pending, acknowledged or resolved"
            ))),
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ENTITY KIND
// =============================================================================

/// The six persisted record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    User,
    VitalSigns,
    DailyTip,
    EmergencyAlert,
    Symptom,
    MedicalCondition,
}

impl EntityKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::User,
        Self::VitalSigns,
        Self::DailyTip,
        Self::EmergencyAlert,
        Self::Symptom,
        Self::MedicalCondition,
    ];

    /// Name of the storage table holding this kind.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::VitalSigns => "vital_signs",
            Self::DailyTip => "daily_tips",
            Self::EmergencyAlert => "emergency_alerts",
            Self::Symptom => "symptoms",
            Self::MedicalCondition => "medical_conditions",
        }
    }

    /// Type name as it appears in API error messages.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::VitalSigns => "VitalSigns",
            Self::DailyTip => "DailyTip",
            Self::EmergencyAlert => "EmergencyAlert",
            Self::Symptom => "Symptom",
            Self::MedicalCondition => "MedicalCondition",
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in CareLink core operations.
///
/// A missing record is not an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum CareError {
    /// Malformed or out-of-range input, rejected before persistence.
    #[error("{0}")]
    Validation(String),

    /// A uniqueness precondition failed.
    #[error("{0}")]
    Conflict(String),

    /// Login failed. Same message for an unknown email and a wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, malformed, tampered or expired token, or an acting identity
    /// the authority policy refuses. Same message in every case.
    #[error("Authentication required")]
    Unauthorized,

    /// A storage backend failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CareError {
    /// Shorthand for a validation failure.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_non_blank() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert_ne!(a, b);
        assert!(!a.is_blank());
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn role_round_trips_through_text() {
        for role in [Role::Nurse, Role::Patient] {
            assert_eq!(role.as_str().parse::<Role>().expect("parse"), role);
        }
        assert!(matches!(
            "doctor".parse::<Role>(),
            Err(CareError::Validation(_))
        ));
    }

    #[test]
    fn severity_defaults_to_moderate() {
        assert_eq!(Severity::default(), Severity::Moderate);
        assert!("critical".parse::<Severity>().is_err());
    }

    #[test]
    fn alert_status_defaults_to_pending() {
        assert_eq!(AlertStatus::default(), AlertStatus::Pending);
        assert_eq!(
            "resolved".parse::<AlertStatus>().expect("parse"),
            AlertStatus::Resolved
        );
    }

    #[test]
    fn auth_errors_do_not_leak_cause() {
        assert_eq!(CareError::InvalidCredentials.to_string(), "Invalid credentials");
        assert_eq!(CareError::Unauthorized.to_string(), "Authentication required");
    }

    #[test]
    fn table_names_are_distinct() {
        let mut names: Vec<_> = EntityKind::ALL.iter().map(|k| k.table_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EntityKind::ALL.len());
    }
}
