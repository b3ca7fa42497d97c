use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use salvo::Depot;
use salvo::writing::Json;
use serde::Serialize;
use tracing::error;

use crate::config::get_config_from_depot;

#[derive(Debug, Serialize)]
struct RejectionResponse {
    message: String,
}

/// ## Summary
/// Service-account gate: every request must present the configured service
/// account's Basic credentials. Anything else is rejected before a handler
/// runs; there are no per-user permissions behind this boundary.
///
/// ## Errors
/// Returns HTTP 403 with a JSON message for missing or foreign credentials.
pub struct ServiceAccountMiddleware;

#[salvo::async_trait]
impl salvo::Handler for ServiceAccountMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        let config = match get_config_from_depot(depot) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!(error = ?e, "Failed to get config from depot");
                res.status_code(salvo::http::StatusCode::INTERNAL_SERVER_ERROR);
                ctrl.skip_rest();
                return;
            }
        };

        let authorized = basic_credentials(req).is_some_and(|(account, secret)| {
            account == config.bridge.service_account && secret == config.bridge.secret
        });

        if !authorized {
            tracing::warn!("request rejected, caller is not the service account");
            res.status_code(salvo::http::StatusCode::FORBIDDEN);
            res.render(Json(RejectionResponse {
                message: "not the service account".to_string(),
            }));
            ctrl.skip_rest();
        }
    }
}

/// Extracts Basic credentials from the Authorization header.
fn basic_credentials(req: &salvo::Request) -> Option<(String, String)> {
    let header = req
        .headers()
        .get(salvo::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (account, secret) = decoded.split_once(':')?;
    Some((account.to_string(), secret.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvo::http::header::AUTHORIZATION;

    #[test]
    fn test_basic_credentials_parsed() {
        let mut req = salvo::Request::default();
        req.headers_mut().insert(
            AUTHORIZATION,
            format!("Basic {}", BASE64.encode("watcha:sesame"))
                .parse()
                .expect("header value"),
        );
        assert_eq!(
            basic_credentials(&req),
            Some(("watcha".to_string(), "sesame".to_string()))
        );
    }

    #[test]
    fn test_missing_header_yields_none() {
        let req = salvo::Request::default();
        assert_eq!(basic_credentials(&req), None);
    }

    #[test]
    fn test_garbage_header_yields_none() {
        let mut req = salvo::Request::default();
        req.headers_mut().insert(
            AUTHORIZATION,
            "Basic not-base64!".parse().expect("header value"),
        );
        assert_eq!(basic_credentials(&req), None);
    }
}
