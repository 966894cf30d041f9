use crate::error::AppError;
use axum::response::Response;

use super::track;

/// Handle /t endpoint, trace shipping is not implemented
pub async fn handle_traces() -> Result<Response, AppError> {
    track("/t", Err(AppError::Unimplemented))
}
