//! HTTP handlers for scoring, health and model metadata.
//!
//! Every error leaves the service as `{"error": {"message", "type", "details"?}}`.
//! Batch requests never fail as a whole because of one record; each element
//! gets either a prediction or its own error entry.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use loanrisk_core::{LoanRiskError, Prediction, RawRecord, Scalar, ServerConfig, TrainingSummary};
use loanrisk_model::ScoringContext;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};
use utoipa::ToSchema;

use crate::state::{AppState, ModelState};

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

/// Inner error detail, also used for per-record batch errors.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}

/// API error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// An error leaving a handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: ErrorDetail,
}

impl ApiError {
    fn new(status: StatusCode, error_type: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            detail: ErrorDetail {
                message: message.into(),
                error_type: error_type.to_string(),
                details: None,
            },
        }
    }

    fn with_details(mut self, details: Value) -> Self {
        self.detail.details = Some(details);
        self
    }

    /// 503 for a degraded service.
    pub fn unavailable(reason: &str) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "service_unavailable",
            "Model not loaded",
        )
        .with_details(json!({ "reason": reason }))
    }

    /// 400 for a batch over the configured cap.
    pub fn batch_too_large(size: usize, max: usize) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "batch_too_large",
            format!("Batch of {size} records exceeds the maximum of {max}"),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<LoanRiskError> for ApiError {
    fn from(err: LoanRiskError) -> Self {
        match &err {
            LoanRiskError::Validation(violations) => {
                let details = serde_json::to_value(violations).unwrap_or(Value::Null);
                Self::new(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "validation_error",
                    err.to_string(),
                )
                .with_details(details)
            }
            LoanRiskError::MissingField { field } => {
                let details = json!([{ "field": field, "message": "field is required" }]);
                Self::new(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "validation_error",
                    err.to_string(),
                )
                .with_details(details)
            }
            LoanRiskError::ShapeMismatch { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "reconciliation_error",
                err.to_string(),
            ),
            _ => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                err.to_string(),
            ),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = rejection.status();
        let error_type = if status == StatusCode::UNPROCESSABLE_ENTITY {
            "validation_error"
        } else {
            "invalid_request"
        };
        Self::new(status, error_type, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.detail })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// `GET /health` body.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: String,
    pub model_loaded: bool,
    pub preprocessing_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// `POST /predict` body.
#[derive(Debug, Serialize, ToSchema)]
pub struct PredictResponse {
    /// Predicted class: 1 = likely delinquent.
    pub prediction: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    /// `Low`, `Medium` or `High`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    /// Validated input, echoed when enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub features: Option<Value>,
}

impl PredictResponse {
    fn new(prediction: Prediction, config: &ServerConfig, record: Option<&RawRecord>) -> Self {
        let include = config.include_probability;
        Self {
            prediction: prediction.class,
            probability: include.then_some(prediction.probability),
            risk_level: include.then(|| prediction.risk_level().to_string()),
            features: record
                .filter(|_| config.echo_features)
                .map(RawRecord::to_json),
        }
    }
}

/// One element of a batch response: a prediction or an error.
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchEntry {
    /// Position in the request array.
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    /// `OrigUPB` of the scored record, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

/// `POST /predict-batch` body.
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResponse {
    pub results: Vec<BatchEntry>,
}

/// Encoder summary inside [`ModelInfo`].
#[derive(Debug, Serialize, ToSchema)]
pub struct PreprocessingInfo {
    /// Number of label-encoded columns.
    pub categorical_encoders: usize,
    pub label_columns: Vec<String>,
    pub one_hot_columns: Vec<String>,
    pub feature_count: usize,
}

/// `GET /model-info` body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ModelInfo {
    pub model_type: String,
    /// Length of the feature vector.
    pub features: usize,
    pub feature_names: Vec<String>,
    pub preprocessing: PreprocessingInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub trained_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub training: Option<TrainingSummary>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn scoring_context(state: &AppState) -> Result<&ScoringContext, ApiError> {
    match &state.model {
        ModelState::Ready(ctx) => Ok(ctx),
        ModelState::Degraded { reason, .. } => Err(ApiError::unavailable(reason)),
    }
}

fn score_value(
    state: &AppState,
    ctx: &ScoringContext,
    body: &Value,
) -> Result<(Prediction, RawRecord), ApiError> {
    let record = state.prepare(body)?;
    let prediction = ctx.score(&record).map_err(|e| {
        if !e.is_client_error() {
            error!(error = %e, "Scoring failed after validation");
        }
        ApiError::from(e)
    })?;
    Ok((prediction, record))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Service banner and endpoint map.
pub async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    let feature_count = state
        .model
        .context()
        .map(|ctx| ctx.descriptor().feature_count());
    Json(json!({
        "message": "Loan default risk prediction API",
        "service": "loanrisk",
        "description": "Loan default risk prediction",
        "version": env!("CARGO_PKG_VERSION"),
        "feature_count": feature_count,
        "endpoints": {
            "health": "GET /health",
            "ping": "GET /ping",
            "ready": "GET /ready",
            "predict": "POST /predict",
            "predict_batch": "POST /predict-batch",
            "model_info": "GET /model-info",
            "openapi": "GET /openapi.json",
        }
    }))
}

/// Liveness plus load state. Always 200.
#[utoipa::path(
    get,
    path = "/health",
    tag = "service",
    responses((status = 200, description = "Service is running", body = HealthResponse))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let body = match &state.model {
        ModelState::Ready(_) => HealthResponse {
            status: "healthy".to_string(),
            model_loaded: true,
            preprocessing_loaded: true,
            reason: None,
        },
        ModelState::Degraded {
            reason,
            model_loaded,
            preprocessing_loaded,
        } => HealthResponse {
            status: "degraded".to_string(),
            model_loaded: *model_loaded,
            preprocessing_loaded: *preprocessing_loaded,
            reason: Some(reason.clone()),
        },
    };
    Json(body)
}

pub async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Readiness: 200 once artifacts are loaded, 503 otherwise.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "service",
    responses(
        (status = 200, description = "Ready to score"),
        (status = 503, description = "Artifacts not loaded", body = ErrorBody)
    )
)]
pub async fn ready(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    scoring_context(&state)?;
    Ok(Json(json!({ "status": "ready" })))
}

/// Score one record.
#[utoipa::path(
    post,
    path = "/predict",
    tag = "prediction",
    request_body = Object,
    responses(
        (status = 200, description = "Prediction", body = PredictResponse),
        (status = 422, description = "Record failed validation", body = ErrorBody),
        (status = 500, description = "Feature vector does not fit the model", body = ErrorBody),
        (status = 503, description = "Model not loaded", body = ErrorBody)
    )
)]
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let ctx = scoring_context(&state)?;
    let Json(body) = payload?;

    let (prediction, record) = score_value(&state, ctx, &body)?;
    debug!(
        prediction = prediction.class,
        probability = prediction.probability,
        "Prediction served"
    );
    Ok(Json(PredictResponse::new(
        prediction,
        &state.config,
        Some(&record),
    )))
}

/// Score up to `max_batch_size` records independently.
#[utoipa::path(
    post,
    path = "/predict-batch",
    tag = "prediction",
    request_body = Vec<Object>,
    responses(
        (status = 200, description = "One entry per input record", body = BatchResponse),
        (status = 400, description = "Batch too large", body = ErrorBody),
        (status = 503, description = "Model not loaded", body = ErrorBody)
    )
)]
pub async fn predict_batch(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Vec<Value>>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let ctx = scoring_context(&state)?;
    let Json(records) = payload?;

    let max = state.config.max_batch_size;
    if records.len() > max {
        return Err(ApiError::batch_too_large(records.len(), max));
    }

    let results: Vec<BatchEntry> = records
        .iter()
        .enumerate()
        .map(|(index, body)| match score_value(&state, ctx, body) {
            Ok((prediction, record)) => {
                let scored = PredictResponse::new(prediction, &state.config, None);
                BatchEntry {
                    index,
                    prediction: Some(scored.prediction),
                    probability: scored.probability,
                    risk_level: scored.risk_level,
                    loan_amount: record.get("OrigUPB").and_then(Scalar::as_f64),
                    error: None,
                }
            }
            Err(err) => BatchEntry {
                index,
                prediction: None,
                probability: None,
                risk_level: None,
                loan_amount: None,
                error: Some(err.detail),
            },
        })
        .collect();

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    info!(records = results.len(), failed, "Batch scored");
    Ok(Json(BatchResponse { results }))
}

/// Describe the loaded model and its preprocessing.
#[utoipa::path(
    get,
    path = "/model-info",
    tag = "service",
    responses(
        (status = 200, description = "Model metadata", body = ModelInfo),
        (status = 503, description = "Model not loaded", body = ErrorBody)
    )
)]
pub async fn model_info(State(state): State<Arc<AppState>>) -> Result<Json<ModelInfo>, ApiError> {
    let ctx = scoring_context(&state)?;
    let descriptor = ctx.descriptor();

    Ok(Json(ModelInfo {
        model_type: ctx.classifier().type_name().to_string(),
        features: descriptor.feature_count(),
        feature_names: descriptor.feature_names.clone(),
        preprocessing: PreprocessingInfo {
            categorical_encoders: descriptor.label_encoders().count(),
            label_columns: descriptor
                .label_encoders()
                .map(|(name, _)| name.to_string())
                .collect(),
            one_hot_columns: descriptor
                .one_hot_columns()
                .map(|(name, _)| name.to_string())
                .collect(),
            feature_count: descriptor.feature_count(),
        },
        trained_at: descriptor.trained_at,
        training: descriptor.training.clone(),
    }))
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi;
    Json(crate::openapi::ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use loanrisk_core::FieldViolation;

    #[test]
    fn test_validation_maps_to_422_with_details() {
        let err = ApiError::from(LoanRiskError::Validation(vec![
            FieldViolation::new("CreditScore", "must be at most 850"),
            FieldViolation::new("LTV", "field is required"),
        ]));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.detail.error_type, "validation_error");
        let details = err.detail.details.unwrap();
        assert_eq!(details[1]["field"], "LTV");
    }

    #[test]
    fn test_missing_field_is_client_error() {
        let err = ApiError::from(LoanRiskError::MissingField {
            field: "PropertyState".into(),
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_shape_mismatch_is_internal() {
        let err = ApiError::from(LoanRiskError::ShapeMismatch {
            expected: 3,
            actual: 2,
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail.error_type, "reconciliation_error");
    }

    #[test]
    fn test_error_body_shape() {
        let body = serde_json::to_value(ErrorBody {
            error: ApiError::unavailable("missing model.json").detail,
        })
        .unwrap();
        assert_eq!(body["error"]["type"], "service_unavailable");
        assert_eq!(body["error"]["details"]["reason"], "missing model.json");
        assert!(body["error"]["message"].is_string());
    }

    #[test]
    fn test_predict_response_respects_flags() {
        let prediction = Prediction {
            class: 1,
            probability: 0.8,
        };
        let record = RawRecord::new().with("age", 40);

        let full = PredictResponse::new(
            prediction,
            &ServerConfig {
                echo_features: true,
                ..ServerConfig::default()
            },
            Some(&record),
        );
        assert_eq!(full.risk_level.as_deref(), Some("High"));
        assert_eq!(full.features.unwrap()["age"], 40);

        let bare = PredictResponse::new(
            prediction,
            &ServerConfig {
                include_probability: false,
                ..ServerConfig::default()
            },
            Some(&record),
        );
        let json = serde_json::to_value(bare).unwrap();
        assert_eq!(json, json!({ "prediction": 1 }));
    }
}
