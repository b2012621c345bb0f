//! # Entity Records
//!
//! The six persisted record kinds and the `Entity` trait the store uses to
//! assign identity, order and filter them.
//!
//! Records are stored as postcard documents, so no serde attribute here may
//! change the field layout between encode and decode (no skipping).

use crate::{AlertStatus, EntityKind, RecordId, Role, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

// =============================================================================
// ENTITY TRAIT
// =============================================================================

/// A record kind the store can persist.
pub trait Entity: Serialize + DeserializeOwned + Clone + std::fmt::Debug {
    /// Which of the six kinds this is.
    const KIND: EntityKind;

    /// Name of the field the list filter matches against.
    const FILTER_FIELD: &'static str;

    /// The record's identifier.
    fn id(&self) -> &RecordId;

    /// Primary timestamp, used for newest-first ordering.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Assign identity and creation time. Called once, by the store, on insert.
    fn stamp(&mut self, id: RecordId, now: DateTime<Utc>);

    /// Current value of `FILTER_FIELD`, compared by exact match.
    fn filter_key(&self) -> &str;
}

// =============================================================================
// USER
// =============================================================================

/// A registered nurse or patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub username: String,
    pub email: String,
    /// Salted PBKDF2 hash. Never resolvable through the API.
    pub password_hash: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;
    const FILTER_FIELD: &'static str = "role";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn stamp(&mut self, id: RecordId, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
    }

    fn filter_key(&self) -> &str {
        self.role.as_str()
    }
}

// =============================================================================
// VITAL SIGNS
// =============================================================================

/// Systolic/diastolic pair in mmHg.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic: Option<i64>,
    pub diastolic: Option<i64>,
}

/// One set of measurements taken by a nurse for a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub nurse_id: RecordId,
    pub body_temperature: Option<f64>,
    pub heart_rate: Option<i64>,
    pub blood_pressure: Option<BloodPressure>,
    pub respiratory_rate: Option<i64>,
    pub weight: Option<f64>,
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
}

impl Entity for VitalSigns {
    const KIND: EntityKind = EntityKind::VitalSigns;
    const FILTER_FIELD: &'static str = "patientId";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }

    fn stamp(&mut self, id: RecordId, now: DateTime<Utc>) {
        self.id = id;
        self.date = now;
    }

    fn filter_key(&self) -> &str {
        self.patient_id.as_str()
    }
}

// =============================================================================
// DAILY TIP
// =============================================================================

/// Advice a nurse leaves for a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTip {
    pub id: RecordId,
    pub nurse_id: RecordId,
    pub patient_id: RecordId,
    pub content: String,
    pub is_read: bool,
    pub date: DateTime<Utc>,
}

impl Entity for DailyTip {
    const KIND: EntityKind = EntityKind::DailyTip;
    const FILTER_FIELD: &'static str = "patientId";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }

    fn stamp(&mut self, id: RecordId, now: DateTime<Utc>) {
        self.id = id;
        self.date = now;
    }

    fn filter_key(&self) -> &str {
        self.patient_id.as_str()
    }
}

// =============================================================================
// EMERGENCY ALERT
// =============================================================================

/// A patient's call for help.
///
/// `resolved_at` is written exactly when the status becomes resolved and is
/// never cleared afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyAlert {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub message: String,
    pub location: Option<String>,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Entity for EmergencyAlert {
    const KIND: EntityKind = EntityKind::EmergencyAlert;
    const FILTER_FIELD: &'static str = "status";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn stamp(&mut self, id: RecordId, now: DateTime<Utc>) {
        self.id = id;
        self.created_at = now;
    }

    fn filter_key(&self) -> &str {
        self.status.as_str()
    }
}

// =============================================================================
// SYMPTOM
// =============================================================================

/// One reported symptom inside a checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomItem {
    pub name: String,
    pub severity: Severity,
    pub duration: Option<String>,
}

/// A patient's symptom checklist submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symptom {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub symptoms: Vec<SymptomItem>,
    pub additional_notes: Option<String>,
    pub date: DateTime<Utc>,
}

impl Entity for Symptom {
    const KIND: EntityKind = EntityKind::Symptom;
    const FILTER_FIELD: &'static str = "patientId";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }

    fn stamp(&mut self, id: RecordId, now: DateTime<Utc>) {
        self.id = id;
        self.date = now;
    }

    fn filter_key(&self) -> &str {
        self.patient_id.as_str()
    }
}

// =============================================================================
// MEDICAL CONDITION
// =============================================================================

/// A candidate condition with its likelihood in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionItem {
    pub name: String,
    pub probability: f64,
    pub recommend_consultation: bool,
}

impl ConditionItem {
    #[must_use]
    pub fn new(name: impl Into<String>, probability: f64, recommend_consultation: bool) -> Self {
        Self {
            name: name.into(),
            probability,
            recommend_consultation,
        }
    }
}

/// Conditions a nurse recorded for a patient, optionally tied to a checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalCondition {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub nurse_id: RecordId,
    pub conditions: Vec<ConditionItem>,
    pub based_on_symptoms: Option<RecordId>,
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
}

impl Entity for MedicalCondition {
    const KIND: EntityKind = EntityKind::MedicalCondition;
    const FILTER_FIELD: &'static str = "patientId";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }

    fn stamp(&mut self, id: RecordId, now: DateTime<Utc>) {
        self.id = id;
        self.date = now;
    }

    fn filter_key(&self) -> &str {
        self.patient_id.as_str()
    }
}

// =============================================================================
// TESTS
// =============================================================================
