//! Calendar, property, and ordering operations over the host DAV endpoints.

use async_trait::async_trait;
use tracing::warn;

use roomdav_core::constants::USER_PRINCIPAL_PREFIX;

use crate::error::{HostError, HostResult};
use crate::store::{CalendarStore, OrderingStore, PropertyServer};
use crate::types::{Calendar, OrderingEntry, PropertyKind, PropertyStatus, ShareRecipient};

use super::xml::{
    CalendarResponse, mkcalendar_body, parse_multistatus, parse_proppatch_status,
    propfind_calendars_body, proppatch_body, share_body,
};
use super::{CalendarLocation, NextcloudHost};

impl NextcloudHost {
    /// PROPFIND on a DAV URL, parsed into calendar responses.
    async fn propfind(
        &self,
        operation: &'static str,
        url: &str,
        depth: &'static str,
    ) -> HostResult<Vec<CalendarResponse>> {
        let response = self
            .request(Self::dav_method("PROPFIND"), url)
            .header("Depth", depth)
            .header("Content-Type", "application/xml; charset=utf-8")
            .body(propfind_calendars_body())
            .send()
            .await?;
        Self::check_status(operation, response.status())?;
        let body = response.bytes().await?;
        parse_multistatus(&body)
    }

    /// Calendar rows of a user's calendar home, caching id resolutions for
    /// calendars the home user owns.
    async fn home_calendars(
        &self,
        operation: &'static str,
        user_id: &str,
    ) -> HostResult<Vec<Calendar>> {
        let url = self.dav_calendar_home(user_id);
        let responses = self.propfind(operation, &url, "1").await?;
        let mut calendars = Vec::new();
        for response in responses {
            if let Some(calendar) = Self::to_calendar(user_id, &response) {
                if calendar.owned_by(user_id) {
                    self.cache_location(calendar.id, user_id, &calendar.uri);
                }
                calendars.push(calendar);
            }
        }
        Ok(calendars)
    }

    /// Maps a multistatus response onto the calendar model. Rows without the
    /// host id property are unusable for the bridge and dropped.
    fn to_calendar(home_user: &str, response: &CalendarResponse) -> Option<Calendar> {
        if !response.is_calendar {
            return None;
        }
        let uri = response
            .href
            .trim_end_matches('/')
            .rsplit('/')
            .next()?
            .to_string();
        let Some(id) = response.id else {
            warn!(href = %response.href, "calendar row without host id, skipping");
            return None;
        };
        let principal_uri = response
            .owner_principal
            .clone()
            .unwrap_or_else(|| format!("{USER_PRINCIPAL_PREFIX}{home_user}"));
        Some(Calendar {
            id,
            principal_uri,
            uri,
            display_name: response.display_name.clone(),
            components: response.components.clone(),
        })
    }

    /// Resolves a calendar id to its owner home, refreshing the service
    /// account's home on a cache miss. Foreign calendars are only resolvable
    /// after a listing has observed them.
    async fn locate(&self, calendar_id: i64) -> HostResult<Option<CalendarLocation>> {
        if let Some(location) = self.cached_location(calendar_id) {
            return Ok(Some(location));
        }
        let service_account = self.service_account.clone();
        self.home_calendars("locate", &service_account).await?;
        Ok(self.cached_location(calendar_id))
    }
}

#[async_trait]
impl CalendarStore for NextcloudHost {
    async fn calendars_owned_by(&self, principal_uri: &str) -> HostResult<Vec<Calendar>> {
        let user_id = principal_uri
            .strip_prefix(USER_PRINCIPAL_PREFIX)
            .unwrap_or(principal_uri);
        let calendars = self.home_calendars("calendars_owned_by", user_id).await?;
        Ok(calendars
            .into_iter()
            .filter(|c| c.principal_uri == principal_uri)
            .collect())
    }

    async fn calendars_visible_to(&self, principal_uri: &str) -> HostResult<Vec<Calendar>> {
        let user_id = principal_uri
            .strip_prefix(USER_PRINCIPAL_PREFIX)
            .unwrap_or(principal_uri);
        self.home_calendars("calendars_visible_to", user_id).await
    }

    async fn calendar_by_id(&self, calendar_id: i64) -> HostResult<Option<Calendar>> {
        let Some(location) = self.locate(calendar_id).await? else {
            return Ok(None);
        };
        self.calendar_by_uri(
            &format!("{USER_PRINCIPAL_PREFIX}{}", location.owner_id),
            &location.uri,
        )
        .await
    }

    async fn calendar_by_uri(
        &self,
        principal_uri: &str,
        uri: &str,
    ) -> HostResult<Option<Calendar>> {
        let user_id = principal_uri
            .strip_prefix(USER_PRINCIPAL_PREFIX)
            .unwrap_or(principal_uri);
        let url = self.dav_calendar_url(user_id, uri);
        let response = self
            .request(Self::dav_method("PROPFIND"), &url)
            .header("Depth", "0")
            .header("Content-Type", "application/xml; charset=utf-8")
            .body(propfind_calendars_body())
            .send()
            .await?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        Self::check_status("calendar_by_uri", response.status())?;
        let body = response.bytes().await?;
        let responses = parse_multistatus(&body)?;
        let calendar = responses
            .first()
            .and_then(|r| Self::to_calendar(user_id, r));
        if let Some(calendar) = &calendar {
            if calendar.owned_by(user_id) {
                self.cache_location(calendar.id, user_id, &calendar.uri);
            }
        }
        Ok(calendar)
    }

    async fn create_calendar(
        &self,
        principal_uri: &str,
        uri: &str,
        display_name: &str,
    ) -> HostResult<i64> {
        let user_id = principal_uri
            .strip_prefix(USER_PRINCIPAL_PREFIX)
            .unwrap_or(principal_uri);
        let url = self.dav_calendar_url(user_id, uri);
        let response = self
            .request(Self::dav_method("MKCALENDAR"), &url)
            .header("Content-Type", "application/xml; charset=utf-8")
            .body(mkcalendar_body(display_name))
            .send()
            .await?;
        Self::check_status("create_calendar", response.status())?;

        let created = self.calendar_by_uri(principal_uri, uri).await?;
        created.map(|c| c.id).ok_or_else(|| {
            HostError::MalformedResponse(format!("created calendar {uri} has no host id"))
        })
    }

    async fn delete_calendar(&self, calendar_id: i64, force: bool) -> HostResult<()> {
        let Some(location) = self.locate(calendar_id).await? else {
            warn!(calendar_id, "calendar id not resolvable, delete skipped");
            return Ok(());
        };
        let url = self.dav_calendar_url(&location.owner_id, &location.uri);
        let mut request = self.request(reqwest::Method::DELETE, &url);
        if force {
            request = request.header("X-NC-CalDAV-No-Trashbin", "1");
        }
        let response = request.send().await?;
        if response.status().as_u16() == 404 {
            warn!(calendar_id, "calendar already gone on host");
            return Ok(());
        }
        Self::check_status("delete_calendar", response.status())
    }

    async fn update_shares(
        &self,
        calendar_id: i64,
        add: &[ShareRecipient],
        remove: &[String],
    ) -> HostResult<()> {
        let Some(location) = self.locate(calendar_id).await? else {
            if add.is_empty() {
                warn!(calendar_id, "calendar id not resolvable, share removal skipped");
                return Ok(());
            }
            return Err(HostError::MalformedResponse(format!(
                "calendar {calendar_id} not resolvable for share update"
            )));
        };
        let url = self.dav_calendar_url(&location.owner_id, &location.uri);
        let response = self
            .request(reqwest::Method::POST, &url)
            .header("Content-Type", "application/xml; charset=utf-8")
            .body(share_body(add, remove))
            .send()
            .await?;
        Self::check_status("update_shares", response.status())
    }
}

#[async_trait]
impl PropertyServer for NextcloudHost {
    async fn get_property(
        &self,
        _user_id: &str,
        path: &str,
        kind: PropertyKind,
    ) -> HostResult<Option<String>> {
        let url = format!("{}/remote.php/dav/{path}", self.base_url);
        let responses = self.propfind("get_property", &url, "0").await?;
        let Some(response) = responses.first() else {
            return Ok(None);
        };
        Ok(match kind {
            PropertyKind::DisplayName => response.display_name.clone(),
            PropertyKind::CalendarOrder => response.order.map(|o| o.to_string()),
        })
    }

    async fn update_property(
        &self,
        _user_id: &str,
        path: &str,
        kind: PropertyKind,
        value: &str,
    ) -> HostResult<PropertyStatus> {
        let url = format!("{}/remote.php/dav/{path}", self.base_url);
        let response = self
            .request(Self::dav_method("PROPPATCH"), &url)
            .header("Content-Type", "application/xml; charset=utf-8")
            .body(proppatch_body(kind, value))
            .send()
            .await?;
        if response.status().as_u16() == 404 {
            return Ok(PropertyStatus(404));
        }
        Self::check_status("update_property", response.status())?;
        let body = response.bytes().await?;
        let status = parse_proppatch_status(&body, kind)?;
        Ok(PropertyStatus(status.unwrap_or(500)))
    }
}

#[async_trait]
impl OrderingStore for NextcloudHost {
    /// Reads ordering rows back through the viewer's calendar home; rows for
    /// calendars no longer visible are not reported, which is acceptable for
    /// a full recomputation.
    async fn orderings_for_user(&self, user_id: &str) -> HostResult<Vec<OrderingEntry>> {
        let url = self.dav_calendar_home(user_id);
        let responses = self.propfind("orderings_for_user", &url, "1").await?;
        let mut entries: Vec<OrderingEntry> = responses
            .iter()
            .filter(|r| r.is_calendar)
            .filter_map(|r| {
                let uri = r.href.trim_end_matches('/').rsplit('/').next()?;
                r.order.map(|order| OrderingEntry {
                    property_path: format!("calendars/{user_id}/{uri}"),
                    order,
                })
            })
            .collect();
        entries.sort_by_key(|e| e.order);
        Ok(entries)
    }
}
