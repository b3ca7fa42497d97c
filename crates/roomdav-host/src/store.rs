//! Collaborator seams onto the groupware host.
//!
//! One trait per host concern, each limited to the calls the bridge makes.
//! Implementations: [`crate::nextcloud`] over the host's HTTP APIs and
//! [`crate::memory`] for tests and local development.

use async_trait::async_trait;

use crate::error::HostResult;
use crate::types::{Calendar, OrderingEntry, PropertyKind, PropertyStatus, ShareRecipient};

/// Calendar rows and their ACL-like shares.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Calendars the principal owns, in host return order.
    async fn calendars_owned_by(&self, principal_uri: &str) -> HostResult<Vec<Calendar>>;

    /// Calendars the principal can see (own plus shared-in), in host return
    /// order. Shared-in entries carry the viewer-relative suffixed URI.
    async fn calendars_visible_to(&self, principal_uri: &str) -> HostResult<Vec<Calendar>>;

    async fn calendar_by_id(&self, calendar_id: i64) -> HostResult<Option<Calendar>>;

    async fn calendar_by_uri(&self, principal_uri: &str, uri: &str)
    -> HostResult<Option<Calendar>>;

    /// Creates a calendar and returns its host-assigned id.
    async fn create_calendar(
        &self,
        principal_uri: &str,
        uri: &str,
        display_name: &str,
    ) -> HostResult<i64>;

    /// Deletes a calendar; `force` bypasses the host trash bin.
    async fn delete_calendar(&self, calendar_id: i64, force: bool) -> HostResult<()>;

    /// Adds and removes share grants by principal href.
    async fn update_shares(
        &self,
        calendar_id: i64,
        add: &[ShareRecipient],
        remove: &[String],
    ) -> HostResult<()>;
}

/// Host group directory and membership.
#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn group_exists(&self, group_id: &str) -> HostResult<bool>;

    /// Returns false when the host refuses the creation.
    async fn create_group(&self, group_id: &str) -> HostResult<bool>;

    /// Returns false when the host refuses the deletion.
    async fn delete_group(&self, group_id: &str) -> HostResult<bool>;

    async fn set_group_display_name(&self, group_id: &str, display_name: &str) -> HostResult<()>;

    /// Current member ids, or None when the group does not exist.
    async fn group_members(&self, group_id: &str) -> HostResult<Option<Vec<String>>>;

    async fn add_member(&self, group_id: &str, user_id: &str) -> HostResult<()>;

    async fn remove_member(&self, group_id: &str, user_id: &str) -> HostResult<()>;
}

/// User resolution, existence only.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_exists(&self, user_id: &str) -> HostResult<bool>;
}

/// Per-user DAV property access at viewer-relative paths.
#[async_trait]
pub trait PropertyServer: Send + Sync {
    async fn get_property(
        &self,
        user_id: &str,
        path: &str,
        kind: PropertyKind,
    ) -> HostResult<Option<String>>;

    async fn update_property(
        &self,
        user_id: &str,
        path: &str,
        kind: PropertyKind,
        value: &str,
    ) -> HostResult<PropertyStatus>;
}

/// Persisted calendar-order properties, read back in bulk.
#[async_trait]
pub trait OrderingStore: Send + Sync {
    /// All stored ordering rows for the user, ascending by order value.
    async fn orderings_for_user(&self, user_id: &str) -> HostResult<Vec<OrderingEntry>>;
}

/// Host-side user preference writes (used for the task-app default route).
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn set_preference(
        &self,
        user_id: &str,
        app: &str,
        key: &str,
        value: &str,
    ) -> HostResult<()>;
}
