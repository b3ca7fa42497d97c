use std::sync::Arc;

use salvo::async_trait;

use roomdav_service::calendar::CalendarSharingService;

use crate::error::{AppError, AppResult};

/// Injects the shared sharing service into the depot for every request.
pub struct ServiceHandler {
    pub service: Arc<CalendarSharingService>,
}

#[async_trait]
impl salvo::Handler for ServiceHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(self.service.clone());
    }
}

/// ## Summary
/// Retrieves the sharing service from the depot.
///
/// ## Errors
/// Returns an error if the service is not found in the depot.
pub fn get_service_from_depot(depot: &salvo::Depot) -> AppResult<Arc<CalendarSharingService>> {
    depot
        .obtain::<Arc<CalendarSharingService>>()
        .cloned()
        .map_err(|_err| {
            AppError::CoreError(roomdav_core::error::CoreError::InvariantViolation(
                "Sharing service not found in depot",
            ))
        })
}
