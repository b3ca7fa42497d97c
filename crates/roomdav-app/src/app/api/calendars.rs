//! Room-scoped calendar routes: creation, teardown, and renaming.

use salvo::{Depot, Request, Response, Router, handler, writing::Json};
use serde::Deserialize;
use tracing::error;

use roomdav_core::constants::CALENDARS_ROUTE_COMPONENT;

use super::{obtain_service, render_bad_request, render_empty, render_service_error};

/// ## Summary
/// Create-and-share request payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAndShareRequest {
    pub mx_room_id: String,
    pub display_name: String,
    #[serde(default)]
    pub user_ids: Vec<String>,
}

/// ## Summary
/// Unshare request payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnShareRequest {
    #[serde(default)]
    pub calendar_ids: Vec<i64>,
    pub mx_room_id: String,
    #[serde(default)]
    pub delete_group: bool,
}

/// ## Summary
/// Rename request payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    #[serde(default)]
    pub calendar_ids: Vec<i64>,
    pub mx_room_id: String,
    pub display_name: String,
}

/// ## Summary
/// POST /api/calendars - Create the room's calendar under the service account
/// and share it with the given users. Idempotent on the room id.
///
/// ## Errors
/// Returns HTTP 500 if the host refuses a structural mutation.
#[handler]
async fn create_and_share_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(service) = obtain_service(depot, res) else {
        return;
    };
    let payload: CreateAndShareRequest = match req.parse_json().await {
        Ok(p) => p,
        Err(e) => {
            error!(error = ?e, "Failed to parse create-and-share request");
            render_bad_request(res, "Invalid request body");
            return;
        }
    };
    match service
        .create_and_share(&payload.mx_room_id, &payload.display_name, &payload.user_ids)
        .await
    {
        Ok(calendar) => res.render(Json(calendar)),
        Err(err) => render_service_error(res, &err),
    }
}

/// ## Summary
/// DELETE /api/calendars - Withdraw the room's access to the given calendars,
/// optionally deleting the room's group.
#[handler]
async fn un_share_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(service) = obtain_service(depot, res) else {
        return;
    };
    let payload: UnShareRequest = match req.parse_json().await {
        Ok(p) => p,
        Err(e) => {
            error!(error = ?e, "Failed to parse unshare request");
            render_bad_request(res, "Invalid request body");
            return;
        }
    };
    match service
        .un_share(&payload.calendar_ids, &payload.mx_room_id, payload.delete_group)
        .await
    {
        Ok(()) => render_empty(res),
        Err(err) => render_service_error(res, &err),
    }
}

/// ## Summary
/// PUT /api/calendars/displayname - Rename the room's group and calendars for
/// every current group member.
#[handler]
async fn rename_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(service) = obtain_service(depot, res) else {
        return;
    };
    let payload: RenameRequest = match req.parse_json().await {
        Ok(p) => p,
        Err(e) => {
            error!(error = ?e, "Failed to parse rename request");
            render_bad_request(res, "Invalid request body");
            return;
        }
    };
    match service
        .rename(&payload.calendar_ids, &payload.mx_room_id, &payload.display_name)
        .await
    {
        Ok(()) => render_empty(res),
        Err(err) => render_service_error(res, &err),
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(CALENDARS_ROUTE_COMPONENT)
        .post(create_and_share_handler)
        .delete(un_share_handler)
        .push(Router::with_path("displayname").put(rename_handler))
}
