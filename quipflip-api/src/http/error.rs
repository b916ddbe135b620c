//! Wire error taxonomy: every handler returns `ApiResult<T>`, and this is
//! the single place that maps the engine's `Error` enum to an HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] quipflip_core::Error),
    #[error("missing bearer token or api key")]
    Unauthenticated,
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    round_id: Option<uuid::Uuid>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail, round_id) = match self {
            ApiError::Engine(err) => {
                let round_id = match err {
                    quipflip_core::Error::AlreadyInRound(round_id) => Some(round_id.0),
                    _ => None,
                };
                (status_for(err), err.code().to_string(), round_id)
            }
            ApiError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "invalid_credentials".to_string(), None)
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
        };
        (status, Json(ErrorBody { detail, round_id })).into_response()
    }
}

fn status_for(err: quipflip_core::Error) -> StatusCode {
    use quipflip_core::Error::*;
    if err.is_infra() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    match err {
        InvalidCredentials | TokenExpired | TokenRevoked => StatusCode::UNAUTHORIZED,
        UsernameNotFound => StatusCode::NOT_FOUND,
        AlreadyInRound(_) | AlreadyVoted => StatusCode::CONFLICT,
        MaxOutstandingPrompts | InsufficientBalance | AlreadyClaimedToday => StatusCode::BAD_REQUEST,
        NoPromptsAvailable | NoWordsetsAvailable => StatusCode::BAD_REQUEST,
        InvalidPhrase | DuplicatePhrase => StatusCode::BAD_REQUEST,
        Expired => StatusCode::CONFLICT,
        NotAContributor => StatusCode::FORBIDDEN,
        NotFound => StatusCode::NOT_FOUND,
        RateLimited => StatusCode::TOO_MANY_REQUESTS,
        DependencyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
