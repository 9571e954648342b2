use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mcp_health_core::errors::Error as CoreError;
use mcp_health_core::health::HealthError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    Unavailable(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::Core(e) => match e {
                CoreError::Health(HealthError::StreamClosed) => {
                    (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
                }
                CoreError::Health(HealthError::UnknownComponent(_)) => {
                    (StatusCode::NOT_FOUND, e.to_string())
                }
                CoreError::Health(HealthError::InvalidConfig(_)) => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            },
            ApiError::Unavailable(reason) => (StatusCode::SERVICE_UNAVAILABLE, reason.clone()),
        };
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: msg,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<HealthError> for ApiError {
    fn from(err: HealthError) -> Self {
        ApiError::Core(CoreError::from(err))
    }
}
