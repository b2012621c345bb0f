//! # carelink-core
//!
//! The record and resolution engine for CareLink - THE LOGIC.
//!
//! This crate holds everything about nurse/patient clinical observations
//! that does not need a network: the six entity kinds, their storage, the
//! lazy reference resolver, the query and mutation engines, and the pure
//! auth and prediction primitives.
//!
//! ## Layers
//!
//! - `storage` + `store`: identifier-keyed documents, newest-first scans
//! - `resolver` + `schema`: per-type field tables and selection
//! - `query` / `mutation`: reads, and validated single-record writes
//! - `auth` / `authority` / `alerts`: tokens, acting identity, status rules
//! - `prediction`: classifier wire shapes, ranking and the fallback list
//!
//! ## Constraints
//!
//! - No async, no network, no logging: the server crate owns those
//! - A missing record is `Ok(None)`; a dangling reference resolves to `null`
//! - Validation always runs before anything is written

// =============================================================================
// MODULES
// =============================================================================

pub mod alerts;
pub mod auth;
pub mod authority;
pub mod mutation;
pub mod prediction;
pub mod primitives;
pub mod query;
pub mod records;
pub mod resolver;
pub mod schema;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{AlertStatus, CareError, EntityKind, RecordId, Role, Severity};

pub use records::{
    BloodPressure, ConditionItem, DailyTip, EmergencyAlert, Entity, MedicalCondition, Symptom,
    SymptomItem, User, VitalSigns,
};

// =============================================================================
// RE-EXPORTS: Engines
// =============================================================================

pub use mutation::{
    LoginUser, MutationEngine, MutationRules, NewAccount, NewConditionItem, NewDailyTip,
    NewEmergencyAlert, NewMedicalCondition, NewSymptomItem, NewSymptoms, NewVitalSigns,
    RegisterUser,
};
pub use query::QueryEngine;
pub use resolver::{Resolvable, Resolver, SelectItem, format_timestamp, validate_selection};
pub use storage::{MemoryStore, RecordStore, RedbStore, StorageBackend};
pub use store::EntityStore;

// =============================================================================
// RE-EXPORTS: Policies and Primitives
// =============================================================================

pub use alerts::{AlertTransitions, TransitionPreset};
pub use auth::{AuthService, AuthSession, Claims, Identity, PasswordHasher, TokenSigner};
pub use authority::{ActingClaim, ActingIdentity, AuthorityPolicy};
pub use prediction::{
    PredictionRequest, PredictionResponse, VitalsHint, check_probability, fallback_predictions,
    rank,
};
