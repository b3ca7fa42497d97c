//! Host adapter speaking the groupware host's own HTTP surfaces.
//!
//! Group, user, and preference operations go through the OCS provisioning
//! API; calendar and property operations go through the DAV endpoints. The
//! bridge authenticates with the service account's Basic credentials, which
//! must belong to a host admin so that other users' calendar homes and group
//! memberships are reachable.

mod caldav;
mod ocs;
pub mod xml;

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{HostError, HostResult};

/// Where a calendar id resolves to on the DAV tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CalendarLocation {
    pub owner_id: String,
    pub uri: String,
}

/// Host client implementing every store seam over HTTP.
pub struct NextcloudHost {
    http: reqwest::Client,
    base_url: String,
    service_account: String,
    service_password: String,
    /// Calendar ids are a host database concept the DAV tree only exposes as
    /// a property, so resolutions observed by listings are cached here.
    id_cache: Mutex<HashMap<i64, CalendarLocation>>,
}

impl NextcloudHost {
    #[must_use]
    pub fn new(base_url: &str, service_account: &str, service_password: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_account: service_account.to_string(),
            service_password: service_password.to_string(),
            id_cache: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn dav_calendar_home(&self, user_id: &str) -> String {
        format!("{}/remote.php/dav/calendars/{user_id}/", self.base_url)
    }

    pub(crate) fn dav_calendar_url(&self, user_id: &str, uri: &str) -> String {
        format!("{}/remote.php/dav/calendars/{user_id}/{uri}", self.base_url)
    }

    pub(crate) fn ocs_url(&self, path: &str) -> String {
        format!("{}/ocs/v1.php/cloud/{path}", self.base_url)
    }

    pub(crate) fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.service_account, Some(&self.service_password))
    }

    pub(crate) fn dav_method(name: &'static str) -> reqwest::Method {
        reqwest::Method::from_bytes(name.as_bytes()).expect("static DAV method name")
    }

    pub(crate) fn cache_location(&self, calendar_id: i64, owner_id: &str, uri: &str) {
        let mut cache = match self.id_cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.insert(
            calendar_id,
            CalendarLocation {
                owner_id: owner_id.to_string(),
                uri: uri.to_string(),
            },
        );
    }

    pub(crate) fn cached_location(&self, calendar_id: i64) -> Option<CalendarLocation> {
        let cache = match self.id_cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.get(&calendar_id).cloned()
    }

    pub(crate) fn check_status(
        operation: &'static str,
        status: reqwest::StatusCode,
    ) -> HostResult<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(HostError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
            })
        }
    }
}
