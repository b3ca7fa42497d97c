//! User-scoped routes: membership, listing, sharing, and reordering.

use salvo::{Depot, Request, Response, Router, handler, writing::Json};
use serde::Deserialize;
use tracing::error;

use roomdav_core::constants::USERS_ROUTE_COMPONENT;

use super::{obtain_service, render_bad_request, render_empty, render_service_error};

/// ## Summary
/// Add-user request payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUserRequest {
    pub user_id: String,
    pub mx_room_id: String,
    #[serde(default)]
    pub calendar_ids: Vec<i64>,
    pub display_name: String,
}

/// ## Summary
/// Remove-user request payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveUserRequest {
    pub mx_room_id: String,
}

/// ## Summary
/// Share request payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub mx_room_id: String,
    pub display_name: String,
    #[serde(default)]
    pub user_ids: Vec<String>,
}

fn path_user_id(req: &Request, res: &mut Response) -> Option<String> {
    let user_id = req.param::<String>("user_id");
    if user_id.is_none() {
        render_bad_request(res, "userId required");
    }
    user_id
}

fn path_calendar_id(req: &Request, res: &mut Response) -> Option<i64> {
    let parsed = req
        .param::<String>("calendar_id")
        .and_then(|raw| raw.parse::<i64>().ok());
    if parsed.is_none() {
        render_bad_request(res, "calendarId must be an integer");
    }
    parsed
}

/// ## Summary
/// POST /api/users - Add a user to a room's group and rename its calendars
/// for them.
///
/// ## Errors
/// Returns HTTP 500 if a host mutation fails.
#[handler]
async fn add_user_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(service) = obtain_service(depot, res) else {
        return;
    };
    let payload: AddUserRequest = match req.parse_json().await {
        Ok(p) => p,
        Err(e) => {
            error!(error = ?e, "Failed to parse add user request");
            render_bad_request(res, "Invalid request body");
            return;
        }
    };
    match service
        .add_user(
            &payload.user_id,
            &payload.mx_room_id,
            &payload.calendar_ids,
            &payload.display_name,
        )
        .await
    {
        Ok(()) => render_empty(res),
        Err(err) => render_service_error(res, &err),
    }
}

/// ## Summary
/// DELETE /`api/users/{user_id`} - Remove a user from a room's group.
#[handler]
async fn remove_user_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(service) = obtain_service(depot, res) else {
        return;
    };
    let Some(user_id) = path_user_id(req, res) else {
        return;
    };
    let payload: RemoveUserRequest = match req.parse_json().await {
        Ok(p) => p,
        Err(e) => {
            error!(error = ?e, "Failed to parse remove user request");
            render_bad_request(res, "Invalid request body");
            return;
        }
    };
    match service.remove_user(&user_id, &payload.mx_room_id).await {
        Ok(()) => render_empty(res),
        Err(err) => render_service_error(res, &err),
    }
}

/// ## Summary
/// GET /`api/users/{user_id`}/calendars - List the calendars a user owns,
/// sorted by display name.
#[handler]
async fn list_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(service) = obtain_service(depot, res) else {
        return;
    };
    let Some(user_id) = path_user_id(req, res) else {
        return;
    };
    match service.list(&user_id).await {
        Ok(calendars) => res.render(Json(calendars)),
        Err(err) => render_service_error(res, &err),
    }
}

/// ## Summary
/// GET /`api/users/{user_id`}/calendars/{`calendar_id`} - One calendar with
/// the display name the user sees.
#[handler]
async fn get_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(service) = obtain_service(depot, res) else {
        return;
    };
    let Some(user_id) = path_user_id(req, res) else {
        return;
    };
    let Some(calendar_id) = path_calendar_id(req, res) else {
        return;
    };
    match service.get(&user_id, calendar_id).await {
        Ok(view) => res.render(Json(view)),
        Err(err) => render_service_error(res, &err),
    }
}

/// ## Summary
/// PUT /`api/users/{user_id`}/calendars/{`calendar_id`}/top - Move a calendar
/// to the front of the user's list.
#[handler]
async fn reorder_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(service) = obtain_service(depot, res) else {
        return;
    };
    let Some(user_id) = path_user_id(req, res) else {
        return;
    };
    let Some(calendar_id) = path_calendar_id(req, res) else {
        return;
    };
    match service.reorder(&user_id, calendar_id).await {
        Ok(()) => render_empty(res),
        Err(err) => render_service_error(res, &err),
    }
}

/// ## Summary
/// PUT /`api/users/{user_id`}/calendars/{`calendar_id`} - Share a calendar the
/// user owns with a room's group.
///
/// ## Errors
/// Returns HTTP 404 if the calendar is unknown, 403 if the user does not own
/// it, 500 if a host mutation fails.
#[handler]
async fn share_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Some(service) = obtain_service(depot, res) else {
        return;
    };
    let Some(user_id) = path_user_id(req, res) else {
        return;
    };
    let Some(calendar_id) = path_calendar_id(req, res) else {
        return;
    };
    let payload: ShareRequest = match req.parse_json().await {
        Ok(p) => p,
        Err(e) => {
            error!(error = ?e, "Failed to parse share request");
            render_bad_request(res, "Invalid request body");
            return;
        }
    };
    match service
        .share(
            &user_id,
            calendar_id,
            &payload.mx_room_id,
            &payload.display_name,
            &payload.user_ids,
        )
        .await
    {
        Ok(calendar) => res.render(Json(calendar)),
        Err(err) => render_service_error(res, &err),
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(USERS_ROUTE_COMPONENT)
        .post(add_user_handler)
        .push(
            Router::with_path("{user_id}")
                .delete(remove_user_handler)
                .push(
                    Router::with_path("calendars").get(list_handler).push(
                        Router::with_path("{calendar_id}")
                            .get(get_handler)
                            .put(share_handler)
                            .push(Router::with_path("top").put(reorder_handler)),
                    ),
                ),
        )
}
