use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    error::{ApiError, ApiResponse},
    state::AppState,
    users::{
        dto::{CreateUserRequest, UserResponse},
        services::ServiceError,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/:id", get(get_user))
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(_) => ApiError::bad_request(err.to_string()),
            ServiceError::NotFound => ApiError::new(StatusCode::NOT_FOUND, err.to_string()),
            // details are logged by the service, never returned
            ServiceError::Internal(_) => ApiError::internal(),
        }
    }
}

#[instrument(skip(state, body))]
pub async fn create_user(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    // the content type is not checked, only the body has to be JSON
    let req: CreateUserRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "rejected request body");
        ApiError::bad_request("invalid JSON body")
    })?;

    let user = state.users.create_user(req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(UserResponse::from(user))))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let id = parse_user_id(&raw_id).ok_or_else(|| ApiError::bad_request("invalid user id"))?;

    let user = state.users.get_user_by_id(id).await?;
    Ok(ApiResponse::ok(UserResponse::from(user)))
}

fn parse_user_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}
