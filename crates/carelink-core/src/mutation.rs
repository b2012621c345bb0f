//! # Mutation Engine
//!
//! Validates input and persists new records or field updates.
//!
//! Every operation follows the same order:
//! 1. the authority policy accepts the acting claim
//! 2. the input is validated and normalized
//! 3. exactly one record is written
//!
//! A failure at step 1 or 2 writes nothing. Foreign ids (patient, nurse,
//! symptom basis) are not checked for existence; the resolver renders a
//! dangling one as `null`.

use crate::alerts::AlertTransitions;
use crate::auth::{AuthService, AuthSession, PasswordHasher};
use crate::authority::{ActingClaim, ActingIdentity, AuthorityPolicy};
use crate::prediction::check_probability;
use crate::primitives::{MAX_ITEMS, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};
use crate::records::{BloodPressure, ConditionItem, SymptomItem};
use crate::{
    AlertStatus, CareError, DailyTip, EmergencyAlert, EntityStore, MedicalCondition, RecordId,
    Role, Severity, Symptom, User, VitalSigns,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

// =============================================================================
// INPUTS
// =============================================================================

/// Arguments of `registerUser`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    /// RFC 3339 timestamp or `YYYY-MM-DD`.
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

/// A validated registration whose password is already hashed.
///
/// Built without touching the store, so the key derivation never runs under
/// the store's write lock.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    user: User,
}

impl RegisterUser {
    /// Validate and normalize the input, then hash the password.
    pub fn prepare(self, hasher: &PasswordHasher) -> Result<NewAccount, CareError> {
        let username = required("username", &self.username, MAX_NAME_LENGTH)?;
        let email = required("email", &self.email, MAX_NAME_LENGTH)?;
        if !email.contains('@') {
            return Err(CareError::invalid("email must be an email address"));
        }
        if self.password.is_empty() {
            return Err(CareError::invalid("password must not be empty"));
        }
        if self.password.len() > MAX_NAME_LENGTH {
            return Err(CareError::Validation(format!(
                "password exceeds {MAX_NAME_LENGTH} bytes"
            )));
        }
        let role: Role = self.role.trim().parse()?;
        let first_name = required("firstName", &self.first_name, MAX_NAME_LENGTH)?;
        let last_name = required("lastName", &self.last_name, MAX_NAME_LENGTH)?;
        let date_of_birth = self
            .date_of_birth
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_date)
            .transpose()?;

        Ok(NewAccount {
            user: User {
                id: RecordId::default(),
                username,
                email,
                password_hash: hasher.hash(&self.password),
                role,
                first_name,
                last_name,
                date_of_birth,
                created_at: DateTime::<Utc>::UNIX_EPOCH,
            },
        })
    }
}

/// Arguments of `loginUser`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginUser {
    pub email: String,
    pub password: String,
}

/// Arguments of `addVitalSigns`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVitalSigns {
    pub patient_id: String,
    pub nurse_id: String,
    #[serde(default)]
    pub body_temperature: Option<f64>,
    #[serde(default)]
    pub heart_rate: Option<i64>,
    #[serde(default)]
    pub blood_pressure: Option<BloodPressure>,
    #[serde(default)]
    pub respiratory_rate: Option<i64>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Arguments of `addDailyTip`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDailyTip {
    pub nurse_id: String,
    pub patient_id: String,
    pub content: String,
}

/// Arguments of `createEmergencyAlert`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmergencyAlert {
    pub patient_id: String,
    pub message: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// One entry of `addSymptoms`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewSymptomItem {
    pub name: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

/// Arguments of `addSymptoms`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSymptoms {
    pub patient_id: String,
    pub symptoms: Vec<NewSymptomItem>,
    #[serde(default)]
    pub additional_notes: Option<String>,
}

/// One entry of `addMedicalCondition`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConditionItem {
    pub name: String,
    pub probability: f64,
    #[serde(default)]
    pub recommend_consultation: bool,
}

/// Arguments of `addMedicalCondition`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedicalCondition {
    pub patient_id: String,
    pub nurse_id: String,
    pub conditions: Vec<NewConditionItem>,
    #[serde(default)]
    pub based_on_symptoms: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// RULES
// =============================================================================

/// Operator-configurable rules the engine enforces.
#[derive(Debug, Clone, Default)]
pub struct MutationRules {
    pub policy: AuthorityPolicy,
    pub transitions: AlertTransitions,
}

// =============================================================================
// ENGINE
// =============================================================================

/// Writes records on behalf of one caller.
pub struct MutationEngine<'a> {
    store: &'a mut EntityStore,
    auth: &'a AuthService,
    rules: &'a MutationRules,
    acting: &'a ActingIdentity,
}

impl<'a> MutationEngine<'a> {
    #[must_use]
    pub fn new(
        store: &'a mut EntityStore,
        auth: &'a AuthService,
        rules: &'a MutationRules,
        acting: &'a ActingIdentity,
    ) -> Self {
        Self {
            store,
            auth,
            rules,
            acting,
        }
    }

    fn authorize(&self, claim: ActingClaim<'_>) -> Result<(), CareError> {
        self.rules.policy.authorize(self.acting, claim)
    }

    // -------------------------------------------------------------------------
    // Accounts
    // -------------------------------------------------------------------------

    /// Create an account and sign it in.
    pub fn register_user(&mut self, input: RegisterUser) -> Result<AuthSession, CareError> {
        let account = input.prepare(self.auth.hasher())?;
        self.create_account(account)
    }

    /// Store a prepared account and sign it in.
    ///
    /// The email must not belong to an existing account.
    pub fn create_account(&mut self, account: NewAccount) -> Result<AuthSession, CareError> {
        let NewAccount { user } = account;
        if !self.store.find::<User>(|u| u.email == user.email)?.is_empty() {
            return Err(CareError::Conflict("User already exists".to_string()));
        }
        let user = self.store.insert(user)?;
        self.auth.session_for(user)
    }

    // -------------------------------------------------------------------------
    // Observations
    // -------------------------------------------------------------------------

    /// Record a set of vital signs taken by a nurse.
    pub fn add_vital_signs(&mut self, input: NewVitalSigns) -> Result<VitalSigns, CareError> {
        let patient_id = required_id("patientId", &input.patient_id)?;
        let nurse_id = required_id("nurseId", &input.nurse_id)?;
        self.authorize(ActingClaim::Nurse(&nurse_id))?;

        finite("bodyTemperature", input.body_temperature)?;
        finite("weight", input.weight)?;
        let notes = optional_text("notes", input.notes.as_deref(), MAX_TEXT_LENGTH)?;

        self.store.insert(VitalSigns {
            id: RecordId::default(),
            patient_id,
            nurse_id,
            body_temperature: input.body_temperature,
            heart_rate: input.heart_rate,
            blood_pressure: input.blood_pressure,
            respiratory_rate: input.respiratory_rate,
            weight: input.weight,
            notes,
            date: DateTime::<Utc>::UNIX_EPOCH,
        })
    }

    /// Leave a tip for a patient. Tips start unread.
    pub fn add_daily_tip(&mut self, input: NewDailyTip) -> Result<DailyTip, CareError> {
        let nurse_id = required_id("nurseId", &input.nurse_id)?;
        let patient_id = required_id("patientId", &input.patient_id)?;
        self.authorize(ActingClaim::Nurse(&nurse_id))?;

        let content = required("content", &input.content, MAX_TEXT_LENGTH)?;
        self.store.insert(DailyTip {
            id: RecordId::default(),
            nurse_id,
            patient_id,
            content,
            is_read: false,
            date: DateTime::<Utc>::UNIX_EPOCH,
        })
    }

    /// Mark a tip read. Repeating the call is harmless. `Ok(None)` if the
    /// tip does not exist.
    pub fn mark_tip_as_read(&mut self, id: &RecordId) -> Result<Option<DailyTip>, CareError> {
        self.authorize(ActingClaim::Authenticated)?;
        self.store.update::<DailyTip>(id, |tip| {
            tip.is_read = true;
            Ok(())
        })
    }

    /// Raise an alert. Alerts start pending.
    pub fn create_emergency_alert(
        &mut self,
        input: NewEmergencyAlert,
    ) -> Result<EmergencyAlert, CareError> {
        let patient_id = required_id("patientId", &input.patient_id)?;
        self.authorize(ActingClaim::Patient(&patient_id))?;

        let message = required("message", &input.message, MAX_TEXT_LENGTH)?;
        let location = optional_text("location", input.location.as_deref(), MAX_TEXT_LENGTH)?;
        self.store.insert(EmergencyAlert {
            id: RecordId::default(),
            patient_id,
            message,
            location,
            status: AlertStatus::Pending,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            resolved_at: None,
        })
    }

    /// Move an alert to `status`.
    ///
    /// The move must be in the configured transition table. Becoming
    /// resolved stamps `resolvedAt`; any other status leaves it as it was.
    /// `Ok(None)` if the alert does not exist.
    pub fn update_alert_status(
        &mut self,
        id: &RecordId,
        status: &str,
    ) -> Result<Option<EmergencyAlert>, CareError> {
        self.authorize(ActingClaim::Authenticated)?;
        let next: AlertStatus = status.trim().parse()?;
        let transitions = &self.rules.transitions;
        let now = Utc::now();

        self.store.update::<EmergencyAlert>(id, |alert| {
            transitions.check(alert.status, next)?;
            alert.status = next;
            if next == AlertStatus::Resolved {
                alert.resolved_at = Some(now);
            }
            Ok(())
        })
    }

    /// Store a patient's symptom checklist.
    pub fn add_symptoms(&mut self, input: NewSymptoms) -> Result<Symptom, CareError> {
        let patient_id = required_id("patientId", &input.patient_id)?;
        self.authorize(ActingClaim::Patient(&patient_id))?;

        if input.symptoms.len() > MAX_ITEMS {
            return Err(CareError::Validation(format!(
                "At most {MAX_ITEMS} symptoms can be submitted"
            )));
        }
        let symptoms = input
            .symptoms
            .iter()
            .map(|item| -> Result<SymptomItem, CareError> {
                Ok(SymptomItem {
                    name: required("symptoms.name", &item.name, MAX_NAME_LENGTH)?,
                    severity: match item.severity.as_deref().map(str::trim) {
                        None | Some("") => Severity::default(),
                        Some(s) => s.parse()?,
                    },
                    duration: optional_text(
                        "symptoms.duration",
                        item.duration.as_deref(),
                        MAX_NAME_LENGTH,
                    )?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let additional_notes = optional_text(
            "additionalNotes",
            input.additional_notes.as_deref(),
            MAX_TEXT_LENGTH,
        )?;

        self.store.insert(Symptom {
            id: RecordId::default(),
            patient_id,
            symptoms,
            additional_notes,
            date: DateTime::<Utc>::UNIX_EPOCH,
        })
    }

    /// Store conditions a nurse derived for a patient.
    ///
    /// Every probability must be a finite number in `[0, 1]`.
    pub fn add_medical_condition(
        &mut self,
        input: NewMedicalCondition,
    ) -> Result<MedicalCondition, CareError> {
        let patient_id = required_id("patientId", &input.patient_id)?;
        let nurse_id = required_id("nurseId", &input.nurse_id)?;
        self.authorize(ActingClaim::Nurse(&nurse_id))?;

        if input.conditions.len() > MAX_ITEMS {
            return Err(CareError::Validation(format!(
                "At most {MAX_ITEMS} conditions can be submitted"
            )));
        }
        let conditions = input
            .conditions
            .iter()
            .map(|item| -> Result<ConditionItem, CareError> {
                check_probability(item.probability)?;
                Ok(ConditionItem::new(
                    required("conditions.name", &item.name, MAX_NAME_LENGTH)?,
                    item.probability,
                    item.recommend_consultation,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let based_on_symptoms = input
            .based_on_symptoms
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(RecordId::new);
        let notes = optional_text("notes", input.notes.as_deref(), MAX_TEXT_LENGTH)?;

        self.store.insert(MedicalCondition {
            id: RecordId::default(),
            patient_id,
            nurse_id,
            conditions,
            based_on_symptoms,
            notes,
            date: DateTime::<Utc>::UNIX_EPOCH,
        })
    }
}

// =============================================================================
// VALIDATION HELPERS
// =============================================================================

fn required(field: &str, value: &str, max: usize) -> Result<String, CareError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CareError::Validation(format!("{field} must not be empty")));
    }
    if value.len() > max {
        return Err(CareError::Validation(format!(
            "{field} exceeds {max} bytes"
        )));
    }
    Ok(value.to_string())
}

fn required_id(field: &str, value: &str) -> Result<RecordId, CareError> {
    required(field, value, MAX_NAME_LENGTH).map(RecordId::new)
}

/// Blank optional text is stored as absent.
fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, CareError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required(field, v, max).map(Some),
    }
}

fn finite(field: &str, value: Option<f64>) -> Result<(), CareError> {
    match value {
        Some(v) if !v.is_finite() => Err(CareError::Validation(format!(
            "{field} must be a finite number"
        ))),
        _ => Ok(()),
    }
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, CareError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            CareError::Validation(format!(
                "dateOfBirth \"{value}\" is not a date (expected YYYY-MM-DD)"
            ))
        })
}

// =============================================================================
// TESTS
// =============================================================================
