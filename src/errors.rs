use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Every failure the pipeline hands back to its caller.
///
/// Adapters translate transport, decode and io failures into one of these
/// variants at their boundary; nothing below this type escapes into the
/// presentation layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// Geocoding or reverse geocoding found no match.
    #[error("no location found for '{query}'")]
    ResolutionFailure { query: String },

    /// A remote weather/irradiance provider failed after retries were exhausted.
    #[error("{provider} request failed: {reason}")]
    RemoteFetchFailure { provider: String, reason: String },

    #[error("unsupported chart kind '{0}'")]
    UnsupportedChartKind(String),

    /// A requested column is absent from the assembled data.
    #[error("column '{0}' is not available")]
    MissingColumn(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl PipelineError {
    pub fn remote(provider: &str, reason: impl ToString) -> Self {
        PipelineError::RemoteFetchFailure {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid(reason: impl ToString) -> Self {
        PipelineError::InvalidInput(reason.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::InvalidInput(_) | PipelineError::UnsupportedChartKind(_) => {
                StatusCode::BAD_REQUEST
            }
            PipelineError::MissingColumn(_) | PipelineError::ResolutionFailure { .. } => {
                StatusCode::NOT_FOUND
            }
            PipelineError::RemoteFetchFailure { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PipelineError::invalid("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            PipelineError::UnsupportedChartKind("heatmap".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(PipelineError::MissingColumn("ghi".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            PipelineError::remote("open-meteo", "503").status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_display_names_the_column() {
        let err = PipelineError::MissingColumn("uv_index".into());
        assert_eq!(err.to_string(), "column 'uv_index' is not available");
    }
}
