//! # Schema
//!
//! Field tables for every type the API can return. The tables are the only
//! place that decides which stored values are visible and which fields are
//! lazy references.

use crate::auth::AuthSession;
use crate::records::ConditionItem;
use crate::resolver::{FieldSpec, FieldStrategy, Resolvable, SelectItem};
use crate::{
    DailyTip, EmergencyAlert, EntityKind, MedicalCondition, RecordId, Symptom, User, VitalSigns,
};
use serde::Serialize;
use serde_json::Value;

fn value<T: Serialize>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}

const fn direct<E>(name: &'static str, get: fn(&E) -> Value) -> FieldSpec<E> {
    FieldSpec {
        name,
        strategy: FieldStrategy::Direct(get),
    }
}

const fn reference<E>(
    name: &'static str,
    target: EntityKind,
    key: fn(&E) -> Option<RecordId>,
) -> FieldSpec<E> {
    FieldSpec {
        name,
        strategy: FieldStrategy::Reference { target, key },
    }
}

// =============================================================================
// USER
// =============================================================================

impl Resolvable for User {
    const TYPE_NAME: &'static str = "User";
    const FIELDS: &'static [FieldSpec<Self>] = &[
        direct("id", |u: &Self| value(&u.id)),
        direct("username", |u: &Self| value(&u.username)),
        direct("email", |u: &Self| value(&u.email)),
        direct("role", |u: &Self| value(&u.role)),
        direct("firstName", |u: &Self| value(&u.first_name)),
        direct("lastName", |u: &Self| value(&u.last_name)),
        FieldSpec {
            name: "dateOfBirth",
            strategy: FieldStrategy::Timestamp(|u: &Self| u.date_of_birth),
        },
        FieldSpec {
            name: "createdAt",
            strategy: FieldStrategy::Timestamp(|u: &Self| Some(u.created_at)),
        },
    ];
}

// =============================================================================
// VITAL SIGNS
// =============================================================================

impl Resolvable for VitalSigns {
    const TYPE_NAME: &'static str = "VitalSigns";
    const FIELDS: &'static [FieldSpec<Self>] = &[
        direct("id", |v: &Self| value(&v.id)),
        direct("patientId", |v: &Self| value(&v.patient_id)),
        direct("nurseId", |v: &Self| value(&v.nurse_id)),
        reference("patient", EntityKind::User, |v: &Self| Some(v.patient_id.clone())),
        reference("nurse", EntityKind::User, |v: &Self| Some(v.nurse_id.clone())),
        direct("bodyTemperature", |v: &Self| value(&v.body_temperature)),
        direct("heartRate", |v: &Self| value(&v.heart_rate)),
        direct("bloodPressure", |v: &Self| value(&v.blood_pressure)),
        direct("respiratoryRate", |v: &Self| value(&v.respiratory_rate)),
        direct("weight", |v: &Self| value(&v.weight)),
        direct("notes", |v: &Self| value(&v.notes)),
        FieldSpec {
            name: "date",
            strategy: FieldStrategy::Timestamp(|v: &Self| Some(v.date)),
        },
    ];
}

// =============================================================================
// DAILY TIP
// =============================================================================

impl Resolvable for DailyTip {
    const TYPE_NAME: &'static str = "DailyTip";
    const FIELDS: &'static [FieldSpec<Self>] = &[
        direct("id", |t: &Self| value(&t.id)),
        direct("nurseId", |t: &Self| value(&t.nurse_id)),
        direct("patientId", |t: &Self| value(&t.patient_id)),
        reference("nurse", EntityKind::User, |t: &Self| Some(t.nurse_id.clone())),
        reference("patient", EntityKind::User, |t: &Self| Some(t.patient_id.clone())),
        direct("content", |t: &Self| value(&t.content)),
        direct("isRead", |t: &Self| Value::Bool(t.is_read)),
        FieldSpec {
            name: "date",
            strategy: FieldStrategy::Timestamp(|t: &Self| Some(t.date)),
        },
    ];
}

// =============================================================================
// EMERGENCY ALERT
// =============================================================================

impl Resolvable for EmergencyAlert {
    const TYPE_NAME: &'static str = "EmergencyAlert";
    const FIELDS: &'static [FieldSpec<Self>] = &[
        direct("id", |a: &Self| value(&a.id)),
        direct("patientId", |a: &Self| value(&a.patient_id)),
        reference("patient", EntityKind::User, |a: &Self| Some(a.patient_id.clone())),
        direct("message", |a: &Self| value(&a.message)),
        direct("location", |a: &Self| value(&a.location)),
        direct("status", |a: &Self| value(&a.status)),
        FieldSpec {
            name: "createdAt",
            strategy: FieldStrategy::Timestamp(|a: &Self| Some(a.created_at)),
        },
        FieldSpec {
            name: "resolvedAt",
            strategy: FieldStrategy::Timestamp(|a: &Self| a.resolved_at),
        },
    ];
}

// =============================================================================
// SYMPTOM
// =============================================================================

impl Resolvable for Symptom {
    const TYPE_NAME: &'static str = "Symptom";
    const FIELDS: &'static [FieldSpec<Self>] = &[
        direct("id", |s: &Self| value(&s.id)),
        direct("patientId", |s: &Self| value(&s.patient_id)),
        reference("patient", EntityKind::User, |s: &Self| Some(s.patient_id.clone())),
        direct("symptoms", |s: &Self| value(&s.symptoms)),
        direct("additionalNotes", |s: &Self| value(&s.additional_notes)),
        FieldSpec {
            name: "date",
            strategy: FieldStrategy::Timestamp(|s: &Self| Some(s.date)),
        },
    ];
}

// =============================================================================
// MEDICAL CONDITION
// =============================================================================

impl Resolvable for MedicalCondition {
    const TYPE_NAME: &'static str = "MedicalCondition";
    const FIELDS: &'static [FieldSpec<Self>] = &[
        direct("id", |m: &Self| value(&m.id)),
        direct("patientId", |m: &Self| value(&m.patient_id)),
        direct("nurseId", |m: &Self| value(&m.nurse_id)),
        reference("patient", EntityKind::User, |m: &Self| Some(m.patient_id.clone())),
        reference("nurse", EntityKind::User, |m: &Self| Some(m.nurse_id.clone())),
        direct("conditions", |m: &Self| value(&m.conditions)),
        direct("basedOnSymptoms", |m: &Self| value(&m.based_on_symptoms)),
        reference("symptomData", EntityKind::Symptom, |m: &Self| {
            m.based_on_symptoms.clone()
        }),
        direct("notes", |m: &Self| value(&m.notes)),
        FieldSpec {
            name: "date",
            strategy: FieldStrategy::Timestamp(|m: &Self| Some(m.date)),
        },
    ];
}

// =============================================================================
// NON-PERSISTED RESULTS
// =============================================================================

impl Resolvable for ConditionItem {
    const TYPE_NAME: &'static str = "Condition";
    const FIELDS: &'static [FieldSpec<Self>] = &[
        direct("name", |c: &Self| value(&c.name)),
        direct("probability", |c: &Self| value(&c.probability)),
        direct("recommendConsultation", |c: &Self| Value::Bool(c.recommend_consultation)),
    ];
}

impl Resolvable for AuthSession {
    const TYPE_NAME: &'static str = "AuthPayload";
    const FIELDS: &'static [FieldSpec<Self>] = &[
        direct("token", |s: &Self| value(&s.token)),
        reference("user", EntityKind::User, |s: &Self| Some(s.user.id.clone())),
    ];

    /// The whole point of a session is the user, so it is returned by default.
    fn default_selection() -> Vec<SelectItem> {
        vec![
            SelectItem::field("token"),
            SelectItem::nested("user", Vec::new()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn names<E: Resolvable>() -> Vec<&'static str> {
        E::FIELDS.iter().map(|f| f.name).collect()
    }

    fn assert_unique<E: Resolvable>() {
        let all = names::<E>();
        let unique: BTreeSet<_> = all.iter().collect();
        assert_eq!(all.len(), unique.len(), "duplicate field on {}", E::TYPE_NAME);
    }

    #[test]
    fn field_names_are_unique() {
        assert_unique::<User>();
        assert_unique::<VitalSigns>();
        assert_unique::<DailyTip>();
        assert_unique::<EmergencyAlert>();
        assert_unique::<Symptom>();
        assert_unique::<MedicalCondition>();
        assert_unique::<ConditionItem>();
        assert_unique::<AuthSession>();
    }

    #[test]
    fn user_never_exposes_password_hash() {
        assert!(!names::<User>().contains(&"passwordHash"));
        assert!(!names::<User>().contains(&"password"));
    }

    #[test]
    fn medical_condition_links_to_symptom() {
        let field = MedicalCondition::FIELDS
            .iter()
            .find(|f| f.name == "symptomData")
            .expect("symptomData field");
        assert!(matches!(
            field.strategy,
            FieldStrategy::Reference {
                target: EntityKind::Symptom,
                ..
            }
        ));
    }

    #[test]
    fn session_default_includes_user() {
        let selection = AuthSession::default_selection();
        assert!(selection.contains(&SelectItem::nested("user", Vec::new())));
    }
}
