//! OpenAPI documentation for the prediction service.
//!
//! Wires the `#[utoipa::path]` annotations in [`crate::api`] into a single
//! document served at `/openapi.json`.

use utoipa::OpenApi;

use crate::api::{
    BatchEntry, BatchResponse, ErrorBody, ErrorDetail, HealthResponse, ModelInfo,
    PredictResponse, PreprocessingInfo,
};

/// Prediction service API documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::health,
        crate::api::ready,
        crate::api::predict,
        crate::api::predict_batch,
        crate::api::model_info,
    ),
    components(schemas(
        ErrorBody,
        ErrorDetail,
        HealthResponse,
        PredictResponse,
        BatchEntry,
        BatchResponse,
        ModelInfo,
        PreprocessingInfo,
    )),
    tags(
        (name = "prediction", description = "Loan default scoring"),
        (name = "service", description = "Health and model metadata")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_scoring_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/predict"));
        assert!(doc.paths.paths.contains_key("/predict-batch"));
        assert!(doc.paths.paths.contains_key("/model-info"));
    }
}
