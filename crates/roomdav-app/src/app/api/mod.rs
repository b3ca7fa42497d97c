mod calendars;
mod healthcheck;
mod users;

use std::sync::Arc;

use salvo::{Depot, Response, Router, http::StatusCode, writing::Json};
use serde::Serialize;
use tracing::error;

use roomdav_service::calendar::CalendarSharingService;
use roomdav_service::error::ServiceError;

use crate::middleware::auth::ServiceAccountMiddleware;
use crate::service_handler::get_service_from_depot;

// Re-export route constants from core
pub use roomdav_core::constants::{API_ROUTE_COMPONENT, API_ROUTE_PREFIX};

/// ## Summary
/// Error response payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// ## Summary
/// Constructs the main API router. The healthcheck stays outside the
/// service-account gate; everything else sits behind it.
pub fn routes() -> anyhow::Result<Router> {
    Ok(Router::with_path(API_ROUTE_COMPONENT)
        .push(healthcheck::routes())
        .push(
            Router::new()
                .hoop(ServiceAccountMiddleware)
                .push(users::routes())
                .push(calendars::routes()),
        ))
}

/// Pulls the sharing service out of the depot, rendering a 500 when the
/// wiring is broken.
pub(crate) fn obtain_service(
    depot: &Depot,
    res: &mut Response,
) -> Option<Arc<CalendarSharingService>> {
    match get_service_from_depot(depot) {
        Ok(service) => Some(service),
        Err(e) => {
            error!(error = ?e, "Failed to get sharing service from depot");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(ErrorResponse {
                message: "Internal server error".to_string(),
            }));
            None
        }
    }
}

/// Renders a service error as the JSON error contract.
pub(crate) fn render_service_error(res: &mut Response, err: &ServiceError) {
    let status = match err {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::Generic(_) | ServiceError::Host(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    res.status_code(status);
    res.render(Json(ErrorResponse {
        message: err.to_string(),
    }));
}

/// Renders a 400 for malformed parameters or bodies.
pub(crate) fn render_bad_request(res: &mut Response, message: &str) {
    res.status_code(StatusCode::BAD_REQUEST);
    res.render(Json(ErrorResponse {
        message: message.to_string(),
    }));
}

/// The empty JSON object used by side-effect-only operations.
pub(crate) fn render_empty(res: &mut Response) {
    res.render(Json(serde_json::json!({})));
}
