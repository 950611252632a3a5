use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ml::features::Granularity;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    QueryError(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Forecast request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Forecast API responded with status {status}: {message}")]
    ApiError {
        status: u16,
        message: String,
    },

    #[error("Malformed forecast response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("No {granularity} model for station {station_id}")]
    NotFound {
        station_id: i32,
        granularity: Granularity,
    },

    #[error("Model loading failed for {path}: {reason}")]
    ModelLoadError {
        path: String,
        reason: String,
    },

    #[error("Model was trained on features {artifact:?} but schema is {configured:?}")]
    SchemaMismatch {
        artifact: Vec<String>,
        configured: Vec<String>,
    },

    #[error("Inference failed: model takes {expected} features, got {actual}")]
    ShapeMismatch {
        expected: usize,
        actual: usize,
    },

    #[error("Model for station {station_id} produced a non-finite value")]
    NonFiniteOutput { station_id: i32 },
}

/// Failures surfaced to HTTP callers, one variant per status code family.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    MalformedArtifact(String),

    #[error("Weather service unavailable: {0}")]
    WeatherUnavailable(String),

    #[error("Database unavailable: {0}")]
    DatabaseUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MalformedArtifact(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::WeatherUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::DatabaseUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::MalformedArtifact(_) => "malformed_artifact",
            ApiError::WeatherUnavailable(_) | ApiError::DatabaseUnavailable(_) => {
                "upstream_unavailable"
            }
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::DatabaseUnavailable(err.to_string())
    }
}

impl From<WeatherError> for ApiError {
    fn from(err: WeatherError) -> Self {
        ApiError::WeatherUnavailable(err.to_string())
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            _ => ApiError::MalformedArtifact(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_distinct_statuses() {
        let cases = [
            (ApiError::InvalidRequest("hour".into()), StatusCode::BAD_REQUEST),
            (ApiError::NotFound("station".into()), StatusCode::NOT_FOUND),
            (
                ApiError::MalformedArtifact("bad json".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::WeatherUnavailable("timeout".into()), StatusCode::BAD_GATEWAY),
            (
                ApiError::DatabaseUnavailable("refused".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn missing_model_is_not_found_but_bad_model_is_malformed() {
        let missing: ApiError = ModelError::NotFound {
            station_id: 42,
            granularity: Granularity::Hourly,
        }
        .into();
        assert!(matches!(missing, ApiError::NotFound(_)));

        let mismatch: ApiError = ModelError::ShapeMismatch {
            expected: 11,
            actual: 10,
        }
        .into();
        assert!(matches!(mismatch, ApiError::MalformedArtifact(_)));
    }
}
