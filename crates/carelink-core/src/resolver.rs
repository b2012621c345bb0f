//! # Reference Resolver
//!
//! Turns a record into the response shape the caller asked for.
//!
//! Every resolvable type declares a static field table (see [`schema`](crate::schema)).
//! Each field has one of three strategies:
//! - `Direct`: copy the stored value
//! - `Timestamp`: render a date as ISO-8601 UTC with milliseconds, absent as `null`
//! - `Reference`: point lookup of another record by id, performed only when
//!   the field is selected
//!
//! A reference whose id is absent, blank, or unknown resolves to `null`.
//! It never fails and never invents a record.

use crate::primitives::MAX_SELECTION_DEPTH;
use crate::records::Entity;
use crate::{
    CareError, DailyTip, EmergencyAlert, EntityKind, EntityStore, MedicalCondition, RecordId,
    Symptom, User, VitalSigns,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// =============================================================================
// FIELD TABLES
// =============================================================================

/// How a single output field is produced.
pub enum FieldStrategy<E> {
    /// Stored value, serialized as-is.
    Direct(fn(&E) -> Value),
    /// Date rendered with [`format_timestamp`].
    Timestamp(fn(&E) -> Option<DateTime<Utc>>),
    /// Lazy lookup of another record.
    Reference {
        target: EntityKind,
        key: fn(&E) -> Option<RecordId>,
    },
}

/// One entry of a type's field table.
pub struct FieldSpec<E> {
    pub name: &'static str,
    pub strategy: FieldStrategy<E>,
}

/// A type with a static field table.
pub trait Resolvable: Sized + 'static {
    /// Type name used in error messages.
    const TYPE_NAME: &'static str;

    /// The field table. Field names are unique.
    const FIELDS: &'static [FieldSpec<Self>];

    /// Fields returned when the caller gives no selection: every field that
    /// does not need a lookup.
    fn default_selection() -> Vec<SelectItem> {
        Self::FIELDS
            .iter()
            .filter(|f| !matches!(f.strategy, FieldStrategy::Reference { .. }))
            .map(|f| SelectItem::Field(f.name.to_string()))
            .collect()
    }
}

// =============================================================================
// SELECTION
// =============================================================================

/// One entry of a field selection.
///
/// In JSON a plain string selects a field, and an object selects reference
/// fields together with their own selection:
///
/// ```json
/// ["id", "heartRate", {"nurse": ["firstName", "lastName"]}]
/// ```
///
/// An empty nested list selects the target's default fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectItem {
    Field(String),
    Nested(BTreeMap<String, Vec<SelectItem>>),
}

impl SelectItem {
    /// Select a plain field.
    #[must_use]
    pub fn field(name: &str) -> Self {
        Self::Field(name.to_string())
    }

    /// Select a reference field with a nested selection.
    #[must_use]
    pub fn nested(name: &str, selection: Vec<SelectItem>) -> Self {
        Self::Nested(BTreeMap::from([(name.to_string(), selection)]))
    }
}

/// Render a timestamp in the fixed wire format, e.g. `2024-01-02T03:04:05.678Z`.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Resolves records against a store for reference lookups.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'s> {
    store: &'s EntityStore,
}

impl<'s> Resolver<'s> {
    #[must_use]
    pub fn new(store: &'s EntityStore) -> Self {
        Self { store }
    }

    /// Resolve one record.
    pub fn resolve<E: Resolvable>(
        &self,
        record: &E,
        selection: Option<&[SelectItem]>,
    ) -> Result<Value, CareError> {
        validate_selection::<E>(selection)?;
        self.resolve_at(record, selection, 0)
    }

    /// Resolve an optional record; absence becomes `null`.
    ///
    /// The selection is checked even when there is no record.
    pub fn resolve_optional<E: Resolvable>(
        &self,
        record: Option<&E>,
        selection: Option<&[SelectItem]>,
    ) -> Result<Value, CareError> {
        validate_selection::<E>(selection)?;
        match record {
            Some(r) => self.resolve_at(r, selection, 0),
            None => Ok(Value::Null),
        }
    }

    /// Resolve a sequence, keeping its order. An empty sequence still has
    /// its selection checked.
    pub fn resolve_list<E: Resolvable>(
        &self,
        records: &[E],
        selection: Option<&[SelectItem]>,
    ) -> Result<Value, CareError> {
        validate_selection::<E>(selection)?;
        records
            .iter()
            .map(|r| self.resolve_at(r, selection, 0))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn resolve_at<E: Resolvable>(
        &self,
        record: &E,
        selection: Option<&[SelectItem]>,
        depth: usize,
    ) -> Result<Value, CareError> {
        if depth > MAX_SELECTION_DEPTH {
            return Err(CareError::Validation(format!(
                "Selection nested deeper than {MAX_SELECTION_DEPTH} levels"
            )));
        }

        let defaults;
        let items = match selection {
            Some(items) if !items.is_empty() => items,
            _ => {
                defaults = E::default_selection();
                defaults.as_slice()
            }
        };

        let mut out = Map::new();
        for item in items {
            match item {
                SelectItem::Field(name) => {
                    let value = self.field(record, name, None, depth)?;
                    out.insert(name.clone(), value);
                }
                SelectItem::Nested(fields) => {
                    for (name, sub) in fields {
                        let value = self.field(record, name, Some(sub), depth)?;
                        out.insert(name.clone(), value);
                    }
                }
            }
        }
        Ok(Value::Object(out))
    }

    fn field<E: Resolvable>(
        &self,
        record: &E,
        name: &str,
        sub: Option<&[SelectItem]>,
        depth: usize,
    ) -> Result<Value, CareError> {
        match &find_field::<E>(name)?.strategy {
            FieldStrategy::Direct(get) => {
                reject_subselection::<E>(name, sub)?;
                Ok(get(record))
            }
            FieldStrategy::Timestamp(get) => {
                reject_subselection::<E>(name, sub)?;
                Ok(get(record).map_or(Value::Null, |ts| Value::String(format_timestamp(ts))))
            }
            FieldStrategy::Reference { target, key } => match key(record) {
                Some(id) if !id.is_blank() => self.reference(*target, &id, sub, depth + 1),
                _ => Ok(Value::Null),
            },
        }
    }

    fn reference(
        &self,
        target: EntityKind,
        id: &RecordId,
        sub: Option<&[SelectItem]>,
        depth: usize,
    ) -> Result<Value, CareError> {
        match target {
            EntityKind::User => self.lookup::<User>(id, sub, depth),
            EntityKind::VitalSigns => self.lookup::<VitalSigns>(id, sub, depth),
            EntityKind::DailyTip => self.lookup::<DailyTip>(id, sub, depth),
            EntityKind::EmergencyAlert => self.lookup::<EmergencyAlert>(id, sub, depth),
            EntityKind::Symptom => self.lookup::<Symptom>(id, sub, depth),
            EntityKind::MedicalCondition => self.lookup::<MedicalCondition>(id, sub, depth),
        }
    }

    fn lookup<E: Entity + Resolvable>(
        &self,
        id: &RecordId,
        sub: Option<&[SelectItem]>,
        depth: usize,
    ) -> Result<Value, CareError> {
        match self.store.get::<E>(id)? {
            Some(record) => self.resolve_at(&record, sub, depth),
            None => Ok(Value::Null),
        }
    }
}

// =============================================================================
// SELECTION CHECKS
// =============================================================================

/// Check a selection against `E`'s field table without reading any record.
///
/// Unknown names, subselections on plain fields and excessive nesting are
/// rejected here, following references into their target tables. Callers
/// that write run this before taking the write lock.
pub fn validate_selection<E: Resolvable>(
    selection: Option<&[SelectItem]>,
) -> Result<(), CareError> {
    validate_at::<E>(selection, 0)
}

fn validate_at<E: Resolvable>(
    selection: Option<&[SelectItem]>,
    depth: usize,
) -> Result<(), CareError> {
    if depth > MAX_SELECTION_DEPTH {
        return Err(CareError::Validation(format!(
            "Selection nested deeper than {MAX_SELECTION_DEPTH} levels"
        )));
    }
    let Some(items) = selection else {
        return Ok(());
    };

    for item in items {
        match item {
            SelectItem::Field(name) => validate_field::<E>(name, None, depth)?,
            SelectItem::Nested(fields) => {
                for (name, sub) in fields {
                    validate_field::<E>(name, Some(sub), depth)?;
                }
            }
        }
    }
    Ok(())
}

fn validate_field<E: Resolvable>(
    name: &str,
    sub: Option<&[SelectItem]>,
    depth: usize,
) -> Result<(), CareError> {
    match &find_field::<E>(name)?.strategy {
        FieldStrategy::Direct(_) | FieldStrategy::Timestamp(_) => {
            reject_subselection::<E>(name, sub)
        }
        FieldStrategy::Reference { target, .. } => {
            let depth = depth + 1;
            match target {
                EntityKind::User => validate_at::<User>(sub, depth),
                EntityKind::VitalSigns => validate_at::<VitalSigns>(sub, depth),
                EntityKind::DailyTip => validate_at::<DailyTip>(sub, depth),
                EntityKind::EmergencyAlert => validate_at::<EmergencyAlert>(sub, depth),
                EntityKind::Symptom => validate_at::<Symptom>(sub, depth),
                EntityKind::MedicalCondition => validate_at::<MedicalCondition>(sub, depth),
            }
        }
    }
}

fn find_field<E: Resolvable>(name: &str) -> Result<&'static FieldSpec<E>, CareError> {
    E::FIELDS.iter().find(|f| f.name == name).ok_or_else(|| {
        CareError::Validation(format!(
            "Cannot query field \"{name}\" on type \"{}\"",
            E::TYPE_NAME
        ))
    })
}

fn reject_subselection<E: Resolvable>(
    name: &str,
    sub: Option<&[SelectItem]>,
) -> Result<(), CareError> {
    match sub {
        Some(items) if !items.is_empty() => Err(CareError::Validation(format!(
            "Field \"{name}\" on type \"{}\" has no subfields to select",
            E::TYPE_NAME
        ))),
        _ => Ok(()),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BloodPressure, Role};
    use chrono::TimeZone;
    use serde_json::json;

    fn user(role: Role, first: &str, last: &str) -> User {
        User {
            id: RecordId::default(),
            username: first.to_lowercase(),
            email: format!("{}@example.com", first.to_lowercase()),
            password_hash: "pbkdf2-sha256$1000$salt$hash".to_string(),
            role,
            first_name: first.to_string(),
            last_name: last.to_string(),
            date_of_birth: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn vitals(patient: &RecordId, nurse: &RecordId) -> VitalSigns {
        VitalSigns {
            id: RecordId::default(),
            patient_id: patient.clone(),
            nurse_id: nurse.clone(),
            body_temperature: None,
            heart_rate: Some(130),
            blood_pressure: Some(BloodPressure {
                systolic: Some(120),
                diastolic: Some(80),
            }),
            respiratory_rate: None,
            weight: None,
            notes: None,
            date: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn timestamp_format_is_fixed() {
        let ts = Utc
            .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
            .single()
            .expect("valid date");
        assert_eq!(format_timestamp(ts), "2024-01-02T03:04:05.000Z");
    }

    #[test]
    fn default_selection_skips_references() {
        let mut store = EntityStore::in_memory();
        let nurse = store.insert(user(Role::Nurse, "Nina", "Hart")).expect("insert");
        let patient = store.insert(user(Role::Patient, "Paul", "Stone")).expect("insert");
        let record = store.insert(vitals(&patient.id, &nurse.id)).expect("insert");

        let value = Resolver::new(&store).resolve(&record, None).expect("resolve");

        assert_eq!(value["heartRate"], json!(130));
        assert_eq!(value["bloodPressure"]["systolic"], json!(120));
        assert!(value.get("nurse").is_none());
        assert!(value.get("patient").is_none());
        assert!(value["date"].as_str().expect("date").ends_with('Z'));
    }

    #[test]
    fn selected_reference_is_looked_up() {
        let mut store = EntityStore::in_memory();
        let nurse = store.insert(user(Role::Nurse, "Nina", "Hart")).expect("insert");
        let patient = store.insert(user(Role::Patient, "Paul", "Stone")).expect("insert");
        let record = store.insert(vitals(&patient.id, &nurse.id)).expect("insert");

        let selection = vec![
            SelectItem::field("id"),
            SelectItem::nested(
                "nurse",
                vec![SelectItem::field("firstName"), SelectItem::field("lastName")],
            ),
        ];
        let value = Resolver::new(&store)
            .resolve(&record, Some(&selection))
            .expect("resolve");

        assert_eq!(value["nurse"], json!({"firstName": "Nina", "lastName": "Hart"}));
        assert!(value.get("heartRate").is_none());
    }

    #[test]
    fn dangling_reference_resolves_to_null() {
        let store = EntityStore::in_memory();
        let record = vitals(&RecordId::new("ghost-patient"), &RecordId::default());

        let selection = vec![
            SelectItem::nested("patient", vec![]),
            SelectItem::nested("nurse", vec![]),
        ];
        let value = Resolver::new(&store)
            .resolve(&record, Some(&selection))
            .expect("resolve");

        assert_eq!(value["patient"], Value::Null);
        assert_eq!(value["nurse"], Value::Null);
    }

    #[test]
    fn password_hash_is_not_queryable() {
        let store = EntityStore::in_memory();
        let u = user(Role::Patient, "Paul", "Stone");

        let default = Resolver::new(&store).resolve(&u, None).expect("resolve");
        assert!(default.get("passwordHash").is_none());

        let err = Resolver::new(&store)
            .resolve(&u, Some(&[SelectItem::field("passwordHash")]))
            .expect_err("unknown field");
        assert!(err.to_string().contains("passwordHash"));
    }

    #[test]
    fn absent_date_of_birth_is_null() {
        let store = EntityStore::in_memory();
        let u = user(Role::Patient, "Paul", "Stone");
        let value = Resolver::new(&store)
            .resolve(&u, Some(&[SelectItem::field("dateOfBirth")]))
            .expect("resolve");
        assert_eq!(value["dateOfBirth"], Value::Null);
    }

    #[test]
    fn subselection_on_scalar_is_rejected() {
        let store = EntityStore::in_memory();
        let u = user(Role::Nurse, "Nina", "Hart");
        let result = Resolver::new(&store).resolve(
            &u,
            Some(&[SelectItem::nested("email", vec![SelectItem::field("x")])]),
        );
        assert!(matches!(result, Err(CareError::Validation(_))));
    }

    #[test]
    fn unknown_field_rejected_without_records() {
        let store = EntityStore::in_memory();
        let selection = [SelectItem::field("bogus")];

        let list = Resolver::new(&store).resolve_list::<VitalSigns>(&[], Some(&selection));
        assert!(matches!(list, Err(CareError::Validation(_))));

        let missing = Resolver::new(&store).resolve_optional::<User>(None, Some(&selection));
        assert!(matches!(missing, Err(CareError::Validation(_))));
    }

    #[test]
    fn validation_follows_references() {
        let ok = [SelectItem::nested("nurse", vec![SelectItem::field("lastName")])];
        assert!(validate_selection::<VitalSigns>(Some(&ok)).is_ok());

        let bad = [SelectItem::nested("nurse", vec![SelectItem::field("nope")])];
        let err = validate_selection::<VitalSigns>(Some(&bad)).expect_err("unknown nested field");
        assert!(err.to_string().contains("\"User\""));

        let scalar = [SelectItem::nested("heartRate", vec![SelectItem::field("x")])];
        assert!(validate_selection::<VitalSigns>(Some(&scalar)).is_err());
        assert!(validate_selection::<VitalSigns>(None).is_ok());
    }

    #[test]
    fn select_items_parse_from_json() {
        let parsed: Vec<SelectItem> =
            serde_json::from_value(json!(["id", {"nurse": ["firstName"]}])).expect("parse");
        assert_eq!(
            parsed,
            vec![
                SelectItem::field("id"),
                SelectItem::nested("nurse", vec![SelectItem::field("firstName")]),
            ]
        );
    }
}
