//! # API Request/Response Types
//!
//! JSON shapes of `POST /api` and `GET /health`.

use carelink_core::{
    LoginUser, NewDailyTip, NewEmergencyAlert, NewMedicalCondition, NewSymptoms, NewVitalSigns,
    RegisterUser, SelectItem, VitalsHint,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// One query or mutation, tagged by `type`.
///
/// ```json
/// {"type": "vitalSigns", "patientId": "abc"}
/// {"type": "updateAlertStatus", "id": "abc", "status": "resolved"}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Operation {
    // Queries
    User { id: String },
    Users { role: Option<String> },
    VitalSigns { patient_id: Option<String> },
    VitalSign { id: String },
    DailyTips { patient_id: Option<String> },
    DailyTip { id: String },
    EmergencyAlerts { status: Option<String> },
    EmergencyAlert { id: String },
    Symptoms { patient_id: Option<String> },
    Symptom { id: String },
    MedicalConditions { patient_id: Option<String> },
    MedicalCondition { id: String },
    Me,

    // Mutations
    RegisterUser(RegisterUser),
    LoginUser(LoginUser),
    AddVitalSigns(NewVitalSigns),
    AddDailyTip(NewDailyTip),
    MarkTipAsRead { id: String },
    CreateEmergencyAlert(NewEmergencyAlert),
    UpdateAlertStatus { id: String, status: String },
    AddSymptoms(NewSymptoms),
    AddMedicalCondition(NewMedicalCondition),
    PredictConditions {
        symptoms: Vec<String>,
        vitals: Option<VitalsHint>,
    },
}

impl Operation {
    /// Wire name, for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::User { .. } => "user",
            Self::Users { .. } => "users",
            Self::VitalSigns { .. } => "vitalSigns",
            Self::VitalSign { .. } => "vitalSign",
            Self::DailyTips { .. } => "dailyTips",
            Self::DailyTip { .. } => "dailyTip",
            Self::EmergencyAlerts { .. } => "emergencyAlerts",
            Self::EmergencyAlert { .. } => "emergencyAlert",
            Self::Symptoms { .. } => "symptoms",
            Self::Symptom { .. } => "symptom",
            Self::MedicalConditions { .. } => "medicalConditions",
            Self::MedicalCondition { .. } => "medicalCondition",
            Self::Me => "me",
            Self::RegisterUser(_) => "registerUser",
            Self::LoginUser(_) => "loginUser",
            Self::AddVitalSigns(_) => "addVitalSigns",
            Self::AddDailyTip(_) => "addDailyTip",
            Self::MarkTipAsRead { .. } => "markTipAsRead",
            Self::CreateEmergencyAlert(_) => "createEmergencyAlert",
            Self::UpdateAlertStatus { .. } => "updateAlertStatus",
            Self::AddSymptoms(_) => "addSymptoms",
            Self::AddMedicalCondition(_) => "addMedicalCondition",
            Self::PredictConditions { .. } => "predictConditions",
        }
    }
}

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

/// Body of `POST /api`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiRequest {
    pub operation: Operation,
    /// Field selection. Omitted means the result type's default fields.
    #[serde(default)]
    pub select: Option<Vec<SelectItem>>,
}

/// Error half of an [`ApiResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// One of `validation`, `auth`, `conflict`, `internal`.
    pub kind: String,
    pub message: String,
}

/// Body of every `POST /api` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Value,
    pub error: Option<ErrorBody>,
}

impl ApiResponse {
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    #[must_use]
    pub fn error(kind: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(ErrorBody {
                kind: kind.to_string(),
                message: message.into(),
            }),
        }
    }
}
