//! # API Endpoint Handlers
//!
//! `GET /health` and the single typed operation endpoint `POST /api`.
//!
//! The field selection is checked against the result type before anything
//! else runs, so a bad selection never leaves a write behind.
//!
//! Queries hold the store's read lock; mutations hold the write lock for one
//! record write plus the resolution of its result. Password hashing and
//! verification run outside any lock, and a prediction holds no lock while
//! the classifier is called.

use super::{
    AppState,
    auth::acting_identity,
    types::{ApiRequest, ApiResponse, HealthResponse, Operation},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use carelink_core::{
    ActingIdentity, AuthSession, CareError, ConditionItem, DailyTip, EmergencyAlert, Entity,
    MedicalCondition, MutationEngine, PredictionRequest, QueryEngine, RecordId, Resolvable,
    Resolver, SelectItem, Symptom, User, VitalSigns, validate_selection,
};
use serde_json::Value;

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// A failed operation, ready to render.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl From<CareError> for ApiError {
    fn from(err: CareError) -> Self {
        match err {
            CareError::Validation(message) => Self {
                status: StatusCode::BAD_REQUEST,
                kind: "validation",
                message,
            },
            CareError::InvalidCredentials | CareError::Unauthorized => Self {
                status: StatusCode::UNAUTHORIZED,
                kind: "auth",
                message: err.to_string(),
            },
            CareError::Conflict(message) => Self {
                status: StatusCode::CONFLICT,
                kind: "conflict",
                message,
            },
            CareError::Storage(_) | CareError::Serialization(_) => {
                tracing::error!(error = %err, "Operation failed");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    kind: "internal",
                    message: "Internal server error".to_string(),
                }
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "validation",
            message: format!("Invalid request: {}", rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiResponse::error(self.kind, self.message)),
        )
            .into_response()
    }
}

// =============================================================================
// OPERATION HANDLER
// =============================================================================

/// Execute one operation.
pub async fn operation_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ApiRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, ApiError> {
    let Json(request) = payload?;
    let acting = acting_identity(&headers, &state.auth);
    let name = request.operation.name();

    match execute(&state, &acting, request).await {
        Ok(data) => Ok(Json(ApiResponse::success(data))),
        Err(e) => {
            tracing::debug!(operation = name, error = %e, "Operation rejected");
            Err(e.into())
        }
    }
}

/// Dispatch an operation and resolve its result.
async fn execute(
    state: &AppState,
    acting: &ActingIdentity,
    request: ApiRequest,
) -> Result<Value, CareError> {
    let ApiRequest { operation, select } = request;
    let select = select.as_deref();

    match operation {
        // ---------------------------------------------------------------------
        // Queries
        // ---------------------------------------------------------------------
        Operation::User { id } => fetch_one::<User>(state, &id, select).await,
        Operation::Users { role } => fetch_list::<User>(state, role.as_deref(), select).await,
        Operation::VitalSigns { patient_id } => {
            fetch_list::<VitalSigns>(state, patient_id.as_deref(), select).await
        }
        Operation::VitalSign { id } => fetch_one::<VitalSigns>(state, &id, select).await,
        Operation::DailyTips { patient_id } => {
            fetch_list::<DailyTip>(state, patient_id.as_deref(), select).await
        }
        Operation::DailyTip { id } => fetch_one::<DailyTip>(state, &id, select).await,
        Operation::EmergencyAlerts { status } => {
            fetch_list::<EmergencyAlert>(state, status.as_deref(), select).await
        }
        Operation::EmergencyAlert { id } => fetch_one::<EmergencyAlert>(state, &id, select).await,
        Operation::Symptoms { patient_id } => {
            fetch_list::<Symptom>(state, patient_id.as_deref(), select).await
        }
        Operation::Symptom { id } => fetch_one::<Symptom>(state, &id, select).await,
        Operation::MedicalConditions { patient_id } => {
            fetch_list::<MedicalCondition>(state, patient_id.as_deref(), select).await
        }
        Operation::MedicalCondition { id } => {
            fetch_one::<MedicalCondition>(state, &id, select).await
        }
        Operation::Me => {
            let identity = acting.identity().ok_or(CareError::Unauthorized)?;
            fetch_one::<User>(state, identity.user_id.as_str(), select).await
        }

        // ---------------------------------------------------------------------
        // Mutations
        // ---------------------------------------------------------------------
        Operation::RegisterUser(input) => {
            validate_selection::<AuthSession>(select)?;
            let account = input.prepare(state.auth.hasher())?;
            mutate(state, acting, select, |engine| {
                engine.create_account(account).map(Some)
            })
            .await
        }
        Operation::LoginUser(input) => {
            validate_selection::<AuthSession>(select)?;
            let account = {
                let store = state.store.read().await;
                QueryEngine::new(&store).user_by_email(&input.email)?
            };
            let session = state.auth.login(account, &input.password)?;
            let store = state.store.read().await;
            Resolver::new(&store).resolve(&session, select)
        }
        Operation::AddVitalSigns(input) => {
            mutate(state, acting, select, |engine| {
                engine.add_vital_signs(input).map(Some)
            })
            .await
        }
        Operation::AddDailyTip(input) => {
            mutate(state, acting, select, |engine| {
                engine.add_daily_tip(input).map(Some)
            })
            .await
        }
        Operation::MarkTipAsRead { id } => {
            let id = RecordId::new(id);
            mutate(state, acting, select, |engine| engine.mark_tip_as_read(&id)).await
        }
        Operation::CreateEmergencyAlert(input) => {
            mutate(state, acting, select, |engine| {
                engine.create_emergency_alert(input).map(Some)
            })
            .await
        }
        Operation::UpdateAlertStatus { id, status } => {
            let id = RecordId::new(id);
            mutate(state, acting, select, |engine| {
                engine.update_alert_status(&id, &status)
            })
            .await
        }
        Operation::AddSymptoms(input) => {
            mutate(state, acting, select, |engine| {
                engine.add_symptoms(input).map(Some)
            })
            .await
        }
        Operation::AddMedicalCondition(input) => {
            mutate(state, acting, select, |engine| {
                engine.add_medical_condition(input).map(Some)
            })
            .await
        }
        Operation::PredictConditions { symptoms, vitals } => {
            validate_selection::<ConditionItem>(select)?;
            let request = PredictionRequest::new(symptoms, vitals)?;
            let ranked = state.gateway.predict(&request).await;
            let store = state.store.read().await;
            Resolver::new(&store).resolve_list(&ranked, select)
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn fetch_one<E: Entity + Resolvable>(
    state: &AppState,
    id: &str,
    select: Option<&[SelectItem]>,
) -> Result<Value, CareError> {
    let store = state.store.read().await;
    let record = QueryEngine::new(&store).by_id::<E>(&RecordId::new(id))?;
    Resolver::new(&store).resolve_optional(record.as_ref(), select)
}

/// A blank filter means no filter.
async fn fetch_list<E: Entity + Resolvable>(
    state: &AppState,
    filter: Option<&str>,
    select: Option<&[SelectItem]>,
) -> Result<Value, CareError> {
    let filter = filter.map(str::trim).filter(|f| !f.is_empty());
    let store = state.store.read().await;
    let records = QueryEngine::new(&store).list::<E>(filter)?;
    Resolver::new(&store).resolve_list(&records, select)
}

/// Run one mutation under the write lock and resolve what it returns.
///
/// The selection is checked before the lock is taken.
async fn mutate<R, F>(
    state: &AppState,
    acting: &ActingIdentity,
    select: Option<&[SelectItem]>,
    op: F,
) -> Result<Value, CareError>
where
    R: Resolvable,
    F: FnOnce(&mut MutationEngine<'_>) -> Result<Option<R>, CareError>,
{
    validate_selection::<R>(select)?;
    let mut store = state.store.write().await;
    let record = {
        let mut engine = MutationEngine::new(&mut store, &state.auth, &state.rules, acting);
        op(&mut engine)?
    };
    Resolver::new(&store).resolve_optional(record.as_ref(), select)
}
