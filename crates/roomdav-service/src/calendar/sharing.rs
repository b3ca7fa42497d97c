//! Room-driven calendar sharing orchestration.
//!
//! ## Summary
//! Translates room-shaped operations (keyed by an external messaging-room id)
//! into calendar, group, and property mutations on the host. Each room maps
//! to one group and one calendar, both named by the sha256 of the room id.
//!
//! Every operation is a single-pass sequence of store calls with no
//! transactionality: a failure partway leaves earlier side effects in place
//! for the next call to pick up idempotently. Concurrent calls against the
//! same room can race (group double-creation, interleaved reorders); the
//! host's own consistency is the only guard, as upstream.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use roomdav_core::constants::{GROUP_PRINCIPAL_PREFIX, SHARED_URI_SUFFIX, USER_PRINCIPAL_PREFIX};
use roomdav_core::util::room_id::group_id_for_room;
use roomdav_host::store::{
    CalendarStore, GroupStore, OrderingStore, PreferenceStore, PropertyServer, UserDirectory,
};
use roomdav_host::types::{Component, PropertyKind, ShareRecipient};

use crate::error::{ServiceError, ServiceResult};

use super::ordering::merge_with_stored_order;

/// One row of a user's calendar listing.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarSummary {
    pub id: i64,
    pub displayname: String,
    pub components: Vec<Component>,
}

/// Calendar projection returned by sharing operations.
#[derive(Debug, Clone, Serialize)]
pub struct FormattedCalendar {
    pub id: i64,
    pub components: Vec<Component>,
    pub is_personal: bool,
}

/// [`FormattedCalendar`] plus the display name resolved for one viewer.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarView {
    pub id: i64,
    pub components: Vec<Component>,
    pub is_personal: bool,
    pub displayname: String,
}

/// Viewer-relative URI of a calendar: owners see the plain URI, everyone
/// else the host's shared-suffixed form.
#[must_use]
pub fn shared_calendar_uri(uri: &str, owner_id: &str) -> String {
    format!("{uri}{SHARED_URI_SUFFIX}{owner_id}")
}

/// Orchestrates room-bound calendar sharing against the host stores.
pub struct CalendarSharingService {
    calendars: Arc<dyn CalendarStore>,
    groups: Arc<dyn GroupStore>,
    users: Arc<dyn UserDirectory>,
    properties: Arc<dyn PropertyServer>,
    orderings: Arc<dyn OrderingStore>,
    preferences: Arc<dyn PreferenceStore>,
    service_account: String,
}

impl CalendarSharingService {
    #[must_use]
    pub fn new(
        calendars: Arc<dyn CalendarStore>,
        groups: Arc<dyn GroupStore>,
        users: Arc<dyn UserDirectory>,
        properties: Arc<dyn PropertyServer>,
        orderings: Arc<dyn OrderingStore>,
        preferences: Arc<dyn PreferenceStore>,
        service_account: &str,
    ) -> Self {
        Self {
            calendars,
            groups,
            users,
            properties,
            orderings,
            preferences,
            service_account: service_account.to_string(),
        }
    }

    /// Builds the service from one backend implementing every store seam.
    #[must_use]
    pub fn with_backend<B>(backend: Arc<B>, service_account: &str) -> Self
    where
        B: CalendarStore
            + GroupStore
            + UserDirectory
            + PropertyServer
            + OrderingStore
            + PreferenceStore
            + 'static,
    {
        Self::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
            backend.clone(),
            backend.clone(),
            backend,
            service_account,
        )
    }

    fn principal_for(user_id: &str) -> String {
        format!("{USER_PRINCIPAL_PREFIX}{user_id}")
    }

    /// ## Summary
    /// Lists the calendars a user owns, ascending by case-insensitive
    /// display name.
    ///
    /// ## Errors
    /// Returns `NotFound` if the user is unknown to the directory.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, user_id: &str) -> ServiceResult<Vec<CalendarSummary>> {
        if !self.users.user_exists(user_id).await? {
            return Err(ServiceError::NotFound(format!(
                "user {user_id} not found, can't list calendars"
            )));
        }
        let calendars = self
            .calendars
            .calendars_owned_by(&Self::principal_for(user_id))
            .await?;
        let mut summaries: Vec<CalendarSummary> = calendars
            .into_iter()
            .map(|c| CalendarSummary {
                id: c.id,
                displayname: c.display_name.unwrap_or_default(),
                components: c.components,
            })
            .collect();
        summaries.sort_by_key(|s| s.displayname.to_lowercase());
        Ok(summaries)
    }

    /// ## Summary
    /// Returns one calendar with the display name resolved for the given
    /// viewer.
    ///
    /// ## Errors
    /// Returns `NotFound` if the calendar does not exist and `Forbidden` if
    /// it is not among the viewer's visible calendars.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, user_id: &str, calendar_id: i64) -> ServiceResult<CalendarView> {
        let formatted = self.formatted_calendar(calendar_id).await?;
        let displayname = self.display_name_for(user_id, calendar_id).await?;
        Ok(CalendarView {
            id: formatted.id,
            components: formatted.components,
            is_personal: formatted.is_personal,
            displayname,
        })
    }

    /// ## Summary
    /// Moves a calendar to the front of the user's list by recomputing every
    /// order property. A calendar with a task component also becomes the
    /// user's default task-list route.
    ///
    /// The read-merge-rewrite sequence is not atomic; a concurrent reorder
    /// for the same user has no defined merge semantics.
    #[tracing::instrument(skip(self))]
    pub async fn reorder(&self, user_id: &str, calendar_id: i64) -> ServiceResult<()> {
        let Some(calendar) = self.calendars.calendar_by_id(calendar_id).await? else {
            warn!(calendar_id, user_id, "calendar not found, can't reorder it");
            return Ok(());
        };

        if calendar.components.contains(&Component::Tasks) {
            let owner_id = calendar.owner_id().to_string();
            let uri = if owner_id == user_id {
                calendar.uri.clone()
            } else {
                shared_calendar_uri(&calendar.uri, &owner_id)
            };
            self.preferences
                .set_preference(user_id, "tasks", "various_initialRoute", &format!("/calendars/{uri}"))
                .await?;
            info!(%uri, user_id, "todo list defined as initial route");
        }

        let stored = self.orderings.orderings_for_user(user_id).await?;
        let principal_uri = Self::principal_for(user_id);
        let visible = self.calendars.calendars_visible_to(&principal_uri).await?;
        let merged = merge_with_stored_order(visible, &stored, user_id, &principal_uri);

        let mut next_order = 1;
        for entry in &merged {
            let path = format!("calendars/{user_id}/{}", entry.uri);
            let order = if entry.id == calendar_id {
                0
            } else {
                let order = next_order;
                next_order += 1;
                order
            };
            let _status = self
                .properties
                .update_property(user_id, &path, PropertyKind::CalendarOrder, &order.to_string())
                .await?;
        }
        info!(calendar_id, user_id, "calendar moved to top of list");
        Ok(())
    }

    /// ## Summary
    /// Creates the room's calendar under the service account if needed and
    /// shares it with the given users plus the service account itself.
    /// Idempotent on the calendar URI.
    ///
    /// ## Errors
    /// Propagates the same errors as [`Self::share`].
    #[tracing::instrument(skip(self))]
    pub async fn create_and_share(
        &self,
        mx_room_id: &str,
        display_name: &str,
        user_ids: &[String],
    ) -> ServiceResult<FormattedCalendar> {
        let caller = self.service_account.clone();
        let calendar_uri = group_id_for_room(mx_room_id);
        let calendar_id = self.create(&caller, &calendar_uri, display_name).await?;
        let mut members = user_ids.to_vec();
        members.push(caller.clone());
        self.share(&caller, calendar_id, mx_room_id, display_name, &members)
            .await
    }

    /// ## Summary
    /// Shares a calendar with the room's group, creating the group on first
    /// use. Members are added to the group before the share grant is created:
    /// granting first makes the host report an empty membership for the new
    /// share.
    ///
    /// ## Errors
    /// Returns `NotFound` if the calendar is missing, `Forbidden` if the
    /// caller does not own it, and `Generic` if the host refuses the group
    /// creation or the share mutation.
    #[tracing::instrument(skip(self))]
    pub async fn share(
        &self,
        user_id: &str,
        calendar_id: i64,
        mx_room_id: &str,
        display_name: &str,
        user_ids: &[String],
    ) -> ServiceResult<FormattedCalendar> {
        let Some(owner_id) = self.owner_of(calendar_id).await? else {
            let message = format!("calendar {calendar_id} not found, can't share it");
            warn!("{message}");
            return Err(ServiceError::NotFound(message));
        };
        if owner_id != user_id {
            let message =
                format!("calendar {calendar_id} is not owned by {user_id}, can't share it");
            warn!("{message}");
            return Err(ServiceError::Forbidden(message));
        }

        let group_id = group_id_for_room(mx_room_id);
        self.create_group(&group_id, display_name).await?;

        // Members must join the group before the grant exists, or the host
        // lists the fresh share with an empty membership.
        self.add_users_to_group(&group_id, user_ids, Some(&owner_id))
            .await?;

        let add = vec![ShareRecipient {
            href: format!("{GROUP_PRINCIPAL_PREFIX}{group_id}"),
            read_only: false,
        }];
        self.update_shares(calendar_id, &add, &[]).await?;

        self.rename_for_group_members(&group_id, calendar_id, display_name)
            .await?;

        self.formatted_calendar(calendar_id).await
    }

    /// ## Summary
    /// Withdraws the room's access to the given calendars. Calendars the
    /// service account owns are deleted outright; foreign ones only lose the
    /// group's grant. Optionally deletes the group afterwards.
    ///
    /// ## Errors
    /// Returns `Generic` if the host refuses the group deletion.
    #[tracing::instrument(skip(self))]
    pub async fn un_share(
        &self,
        calendar_ids: &[i64],
        mx_room_id: &str,
        delete_group: bool,
    ) -> ServiceResult<()> {
        let group_id = group_id_for_room(mx_room_id);
        for &calendar_id in calendar_ids {
            if self.owner_of(calendar_id).await?.as_deref() == Some(self.service_account.as_str())
            {
                self.delete(calendar_id).await?;
            } else {
                let remove = vec![format!("{GROUP_PRINCIPAL_PREFIX}{group_id}")];
                self.update_shares(calendar_id, &[], &remove).await?;
            }
        }
        if delete_group {
            self.delete_group(&group_id).await?;
        }
        Ok(())
    }

    /// ## Summary
    /// Adds a user to the room's group and applies the room's display name
    /// to each calendar for them. A rename target the user cannot reach yet
    /// is logged and skipped.
    #[tracing::instrument(skip(self))]
    pub async fn add_user(
        &self,
        user_id: &str,
        mx_room_id: &str,
        calendar_ids: &[i64],
        display_name: &str,
    ) -> ServiceResult<()> {
        let group_id = group_id_for_room(mx_room_id);
        let joining = [user_id.to_string()];
        for &calendar_id in calendar_ids {
            let owner_id = self.owner_of(calendar_id).await?;
            self.add_users_to_group(&group_id, &joining, owner_id.as_deref())
                .await?;
            match self.rename_for_user(user_id, calendar_id, display_name).await {
                Ok(()) => {}
                Err(ServiceError::NotFound(message)) => warn!("{message}"),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// ## Summary
    /// Removes a user from the room's group. Calendar shares are untouched:
    /// the host cascades membership into effective access.
    #[tracing::instrument(skip(self))]
    pub async fn remove_user(&self, user_id: &str, mx_room_id: &str) -> ServiceResult<()> {
        let group_id = group_id_for_room(mx_room_id);
        if self.groups.group_members(&group_id).await?.is_none() {
            warn!(%group_id, "group not found, can't remove user");
            return Ok(());
        }
        if !self.users.user_exists(user_id).await? {
            warn!(user_id, %group_id, "user not found, can't remove it from group");
            return Ok(());
        }
        self.groups.remove_member(&group_id, user_id).await?;
        info!(user_id, %group_id, "user removed from group");
        Ok(())
    }

    /// ## Summary
    /// Renames the room's group and the given calendars for every current
    /// group member.
    #[tracing::instrument(skip(self))]
    pub async fn rename(
        &self,
        calendar_ids: &[i64],
        mx_room_id: &str,
        display_name: &str,
    ) -> ServiceResult<()> {
        let group_id = group_id_for_room(mx_room_id);
        if self.groups.group_members(&group_id).await?.is_none() {
            warn!(%group_id, "group not found, can't rename it");
        } else {
            self.groups
                .set_group_display_name(&group_id, display_name)
                .await?;
            info!(%group_id, display_name, "group renamed");
        }
        for &calendar_id in calendar_ids {
            self.rename_for_group_members(&group_id, calendar_id, display_name)
                .await?;
        }
        Ok(())
    }

    async fn formatted_calendar(&self, calendar_id: i64) -> ServiceResult<FormattedCalendar> {
        let Some(calendar) = self.calendars.calendar_by_id(calendar_id).await? else {
            return Err(ServiceError::NotFound(format!(
                "calendar {calendar_id} not found"
            )));
        };
        Ok(FormattedCalendar {
            id: calendar.id,
            is_personal: calendar.owner_id() != self.service_account,
            components: calendar.components,
        })
    }

    /// Per-viewer display name, read from the property server at the path
    /// the viewer sees the calendar under.
    async fn display_name_for(&self, user_id: &str, calendar_id: i64) -> ServiceResult<String> {
        let principal_uri = Self::principal_for(user_id);
        let calendars = self.calendars.calendars_visible_to(&principal_uri).await?;
        for calendar in calendars {
            if calendar.id != calendar_id {
                continue;
            }
            let path = format!("calendars/{user_id}/{}", calendar.uri);
            let displayname = self
                .properties
                .get_property(user_id, &path, PropertyKind::DisplayName)
                .await?;
            return Ok(displayname.unwrap_or_default());
        }
        let message = format!(
            "calendar {calendar_id} not available for user {user_id}, can't get displayname"
        );
        warn!("{message}");
        Err(ServiceError::Forbidden(message))
    }

    /// Creates the calendar unless its URI is already taken, in which case
    /// the existing id is returned.
    async fn create(&self, user_id: &str, calendar_uri: &str, display_name: &str) -> ServiceResult<i64> {
        let principal_uri = Self::principal_for(user_id);
        if let Some(existing) = self
            .calendars
            .calendar_by_uri(&principal_uri, calendar_uri)
            .await?
        {
            warn!(calendar_uri, user_id, "calendar already exists");
            return Ok(existing.id);
        }
        let calendar_id = self
            .calendars
            .create_calendar(&principal_uri, calendar_uri, display_name)
            .await?;
        info!(calendar_id, display_name, "calendar created");
        Ok(calendar_id)
    }

    async fn delete(&self, calendar_id: i64) -> ServiceResult<()> {
        if self.calendars.calendar_by_id(calendar_id).await?.is_none() {
            warn!(calendar_id, "calendar not found, can't delete it");
            return Ok(());
        }
        self.calendars.delete_calendar(calendar_id, true).await?;
        info!(calendar_id, "calendar deleted");
        Ok(())
    }

    async fn update_shares(
        &self,
        calendar_id: i64,
        add: &[ShareRecipient],
        remove: &[String],
    ) -> ServiceResult<()> {
        if self.owner_of(calendar_id).await?.is_none() {
            if !add.is_empty() {
                let message = format!("no calendar {calendar_id} to add a share to");
                error!("{message}");
                return Err(ServiceError::Generic(message));
            }
            warn!(calendar_id, "no calendar to remove a share from");
            return Ok(());
        }
        self.calendars
            .update_shares(calendar_id, add, remove)
            .await?;
        info!(
            calendar_id,
            added = add.len(),
            removed = remove.len(),
            "shares updated"
        );
        Ok(())
    }

    async fn create_group(&self, group_id: &str, display_name: &str) -> ServiceResult<()> {
        if self.groups.group_exists(group_id).await? {
            warn!(group_id, "group already exists");
            return Ok(());
        }
        if !self.groups.create_group(group_id).await? {
            let message = format!("can't create {group_id}");
            error!("{message}");
            return Err(ServiceError::Generic(message));
        }
        self.groups
            .set_group_display_name(group_id, display_name)
            .await?;
        info!(group_id, display_name, "group created");
        Ok(())
    }

    async fn delete_group(&self, group_id: &str) -> ServiceResult<()> {
        if self.groups.group_members(group_id).await?.is_none() {
            warn!(group_id, "group not found, can't delete it");
            return Ok(());
        }
        if !self.groups.delete_group(group_id).await? {
            let message = format!("can't delete group {group_id}");
            error!("{message}");
            return Err(ServiceError::Generic(message));
        }
        info!(group_id, "group deleted");
        Ok(())
    }

    /// Adds users to the room's group, skipping the calendar owner (unless
    /// the owner is the service account) and users the directory does not
    /// know.
    async fn add_users_to_group(
        &self,
        group_id: &str,
        user_ids: &[String],
        owner_id: Option<&str>,
    ) -> ServiceResult<()> {
        if self.groups.group_members(group_id).await?.is_none() {
            warn!(group_id, "group not found, can't add users");
            return Ok(());
        }
        for user_id in user_ids {
            if owner_id == Some(user_id.as_str()) && owner_id != Some(self.service_account.as_str())
            {
                info!(%user_id, group_id, "user is the calendar owner, addition to group skipped");
                continue;
            }
            if !self.users.user_exists(user_id).await? {
                warn!(%user_id, group_id, "user not found, can't add it to group");
                continue;
            }
            self.groups.add_member(group_id, user_id).await?;
            info!(%user_id, group_id, "user added to group");
        }
        Ok(())
    }

    async fn rename_for_group_members(
        &self,
        group_id: &str,
        calendar_id: i64,
        display_name: &str,
    ) -> ServiceResult<()> {
        let Some(members) = self.groups.group_members(group_id).await? else {
            warn!(
                group_id,
                calendar_id, "group not found, can't rename calendar for its members"
            );
            return Ok(());
        };
        for user_id in members {
            match self
                .rename_for_user(&user_id, calendar_id, display_name)
                .await
            {
                Ok(()) => {}
                Err(ServiceError::NotFound(message)) => warn!("{message}"),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Writes the display-name property at the viewer's path for the
    /// calendar. Personal calendars of real users are left untouched.
    ///
    /// ## Errors
    /// Returns `NotFound` when the viewer's path does not resolve (access may
    /// not have propagated yet) and `Generic` when the host rejects the
    /// property write.
    async fn rename_for_user(
        &self,
        user_id: &str,
        calendar_id: i64,
        display_name: &str,
    ) -> ServiceResult<()> {
        if !self.users.user_exists(user_id).await? {
            warn!(user_id, calendar_id, "user not found, can't rename calendar for them");
            return Ok(());
        }
        let Some(calendar) = self.calendars.calendar_by_id(calendar_id).await? else {
            warn!(calendar_id, user_id, "calendar not found, can't rename it for user");
            return Ok(());
        };
        let owner_id = calendar.owner_id().to_string();
        // Never rename a personal calendar other than those of the service
        // account.
        if owner_id == user_id && owner_id != self.service_account {
            return Ok(());
        }
        let calendar_uri = if owner_id == user_id {
            calendar.uri.clone()
        } else {
            shared_calendar_uri(&calendar.uri, &owner_id)
        };
        let path = format!("calendars/{user_id}/{calendar_uri}");
        let status = self
            .properties
            .update_property(user_id, &path, PropertyKind::DisplayName, display_name)
            .await?;
        if status.is_missing() {
            return Err(ServiceError::NotFound(format!(
                "calendar with URI {calendar_uri} not found for user {user_id}"
            )));
        }
        if !status.accepted() {
            let message =
                format!("can't rename calendar with URI {calendar_uri} for user {user_id}");
            error!("{message}");
            return Err(ServiceError::Generic(message));
        }
        info!(calendar_id, display_name, user_id, "calendar renamed for user");
        Ok(())
    }

    /// Owner user id of a calendar, or None when the calendar is gone.
    async fn owner_of(&self, calendar_id: i64) -> ServiceResult<Option<String>> {
        let Some(calendar) = self.calendars.calendar_by_id(calendar_id).await? else {
            warn!(calendar_id, "calendar not found, can't parse owner");
            return Ok(None);
        };
        Ok(Some(calendar.owner_id().to_string()))
    }
}
