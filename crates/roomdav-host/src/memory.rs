//! Deterministic in-memory host backend.
//!
//! ## Summary
//! Implements every store seam against mutex-guarded maps. Used as the test
//! double for unit and integration tests and as the `host.mode = "memory"`
//! backend for local development. Calendar ids are sequential, listings keep
//! insertion order, and every mutation is appended to a call journal so tests
//! can assert on call ordering.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use roomdav_core::constants::{GROUP_PRINCIPAL_PREFIX, SHARED_URI_SUFFIX, USER_PRINCIPAL_PREFIX};

use crate::error::HostResult;
use crate::store::{
    CalendarStore, GroupStore, OrderingStore, PreferenceStore, PropertyServer, UserDirectory,
};
use crate::types::{Calendar, Component, OrderingEntry, PropertyKind, PropertyStatus, ShareRecipient};

/// One recorded host mutation, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    CreateGroup {
        group_id: String,
    },
    DeleteGroup {
        group_id: String,
    },
    AddMember {
        group_id: String,
        user_id: String,
    },
    RemoveMember {
        group_id: String,
        user_id: String,
    },
    CreateCalendar {
        principal_uri: String,
        uri: String,
    },
    DeleteCalendar {
        calendar_id: i64,
    },
    UpdateShares {
        calendar_id: i64,
        added: Vec<String>,
        removed: Vec<String>,
    },
    UpdateProperty {
        user_id: String,
        path: String,
        kind: PropertyKind,
        value: String,
    },
    SetPreference {
        user_id: String,
        app: String,
        key: String,
        value: String,
    },
}

#[derive(Debug, Clone)]
struct StoredCalendar {
    calendar: Calendar,
    shares: Vec<ShareRecipient>,
}

#[derive(Debug, Clone, Default)]
struct StoredGroup {
    display_name: Option<String>,
    members: Vec<String>,
}

#[derive(Default)]
struct State {
    next_calendar_id: i64,
    calendars: Vec<StoredCalendar>,
    groups: BTreeMap<String, StoredGroup>,
    users: Vec<String>,
    properties: BTreeMap<(String, String, PropertyKind), String>,
    preferences: BTreeMap<(String, String, String), String>,
    journal: Vec<HostCall>,
}

/// In-memory implementation of every host store seam.
#[derive(Default)]
pub struct MemoryHost {
    inner: Mutex<State>,
}

impl MemoryHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Registers a user in the directory.
    pub fn seed_user(&self, user_id: &str) {
        let mut state = self.lock();
        if !state.users.iter().any(|u| u == user_id) {
            state.users.push(user_id.to_string());
        }
    }

    /// Creates a calendar row directly, bypassing the journal.
    pub fn seed_calendar(
        &self,
        owner_id: &str,
        uri: &str,
        display_name: &str,
        components: &[Component],
    ) -> i64 {
        let mut state = self.lock();
        state.next_calendar_id += 1;
        let id = state.next_calendar_id;
        state.calendars.push(StoredCalendar {
            calendar: Calendar {
                id,
                principal_uri: format!("{USER_PRINCIPAL_PREFIX}{owner_id}"),
                uri: uri.to_string(),
                display_name: Some(display_name.to_string()),
                components: components.to_vec(),
            },
            shares: Vec::new(),
        });
        id
    }

    /// Stores a property row directly, bypassing the journal.
    pub fn seed_property(&self, user_id: &str, path: &str, kind: PropertyKind, value: &str) {
        let mut state = self.lock();
        state.properties.insert(
            (user_id.to_string(), path.to_string(), kind),
            value.to_string(),
        );
    }

    /// Snapshot of the mutation journal.
    #[must_use]
    pub fn journal(&self) -> Vec<HostCall> {
        self.lock().journal.clone()
    }

    /// Current members of a group, insertion-ordered.
    #[must_use]
    pub fn members_of(&self, group_id: &str) -> Vec<String> {
        self.lock()
            .groups
            .get(group_id)
            .map(|g| g.members.clone())
            .unwrap_or_default()
    }

    /// Stored property value, if any.
    #[must_use]
    pub fn property(&self, user_id: &str, path: &str, kind: PropertyKind) -> Option<String> {
        self.lock()
            .properties
            .get(&(user_id.to_string(), path.to_string(), kind))
            .cloned()
    }

    /// Stored preference value, if any.
    #[must_use]
    pub fn preference(&self, user_id: &str, app: &str, key: &str) -> Option<String> {
        self.lock()
            .preferences
            .get(&(user_id.to_string(), app.to_string(), key.to_string()))
            .cloned()
    }

    /// Share hrefs currently granted on a calendar.
    #[must_use]
    pub fn shares_of(&self, calendar_id: i64) -> Vec<String> {
        self.lock()
            .calendars
            .iter()
            .find(|c| c.calendar.id == calendar_id)
            .map(|c| c.shares.iter().map(|s| s.href.clone()).collect())
            .unwrap_or_default()
    }

    fn user_sees(state: &State, stored: &StoredCalendar, principal_uri: &str) -> bool {
        if stored.calendar.principal_uri == principal_uri {
            return true;
        }
        let user_id = principal_uri
            .rsplit('/')
            .next()
            .unwrap_or(principal_uri)
            .to_string();
        stored.shares.iter().any(|share| {
            if let Some(group_id) = share.href.strip_prefix(GROUP_PRINCIPAL_PREFIX) {
                state
                    .groups
                    .get(group_id)
                    .is_some_and(|g| g.members.iter().any(|m| *m == user_id))
            } else {
                share.href == format!("principal:{principal_uri}")
            }
        })
    }

    /// Finds the calendar a viewer-relative DAV path addresses, if the user
    /// can currently see it.
    fn resolve_path<'a>(
        state: &'a State,
        user_id: &str,
        path: &str,
    ) -> Option<&'a StoredCalendar> {
        let principal_uri = format!("{USER_PRINCIPAL_PREFIX}{user_id}");
        state.calendars.iter().find(|stored| {
            if !Self::user_sees(state, stored, &principal_uri) {
                return false;
            }
            let uri = if stored.calendar.principal_uri == principal_uri {
                stored.calendar.uri.clone()
            } else {
                format!(
                    "{}{SHARED_URI_SUFFIX}{}",
                    stored.calendar.uri,
                    stored.calendar.owner_id()
                )
            };
            path == format!("calendars/{user_id}/{uri}")
        })
    }

    /// Viewer-relative projection of a calendar row, suffixing shared-in URIs
    /// the way the host does.
    fn viewer_row(state: &State, stored: &StoredCalendar, principal_uri: &str) -> Calendar {
        let mut calendar = stored.calendar.clone();
        if calendar.principal_uri != principal_uri {
            let owner = calendar.owner_id().to_string();
            calendar.uri = format!("{}{SHARED_URI_SUFFIX}{owner}", calendar.uri);
            let viewer = principal_uri.rsplit('/').next().unwrap_or(principal_uri);
            let path = format!("calendars/{viewer}/{}", calendar.uri);
            if let Some(name) =
                state
                    .properties
                    .get(&(viewer.to_string(), path, PropertyKind::DisplayName))
            {
                calendar.display_name = Some(name.clone());
            }
        }
        calendar
    }
}

#[async_trait]
impl CalendarStore for MemoryHost {
    async fn calendars_owned_by(&self, principal_uri: &str) -> HostResult<Vec<Calendar>> {
        let state = self.lock();
        Ok(state
            .calendars
            .iter()
            .filter(|c| c.calendar.principal_uri == principal_uri)
            .map(|c| c.calendar.clone())
            .collect())
    }

    async fn calendars_visible_to(&self, principal_uri: &str) -> HostResult<Vec<Calendar>> {
        let state = self.lock();
        Ok(state
            .calendars
            .iter()
            .filter(|c| Self::user_sees(&state, c, principal_uri))
            .map(|c| Self::viewer_row(&state, c, principal_uri))
            .collect())
    }

    async fn calendar_by_id(&self, calendar_id: i64) -> HostResult<Option<Calendar>> {
        let state = self.lock();
        Ok(state
            .calendars
            .iter()
            .find(|c| c.calendar.id == calendar_id)
            .map(|c| c.calendar.clone()))
    }

    async fn calendar_by_uri(
        &self,
        principal_uri: &str,
        uri: &str,
    ) -> HostResult<Option<Calendar>> {
        let state = self.lock();
        Ok(state
            .calendars
            .iter()
            .find(|c| c.calendar.principal_uri == principal_uri && c.calendar.uri == uri)
            .map(|c| c.calendar.clone()))
    }

    async fn create_calendar(
        &self,
        principal_uri: &str,
        uri: &str,
        display_name: &str,
    ) -> HostResult<i64> {
        let mut state = self.lock();
        state.next_calendar_id += 1;
        let id = state.next_calendar_id;
        state.calendars.push(StoredCalendar {
            calendar: Calendar {
                id,
                principal_uri: principal_uri.to_string(),
                uri: uri.to_string(),
                display_name: Some(display_name.to_string()),
                components: vec![Component::Events, Component::Tasks],
            },
            shares: Vec::new(),
        });
        state.journal.push(HostCall::CreateCalendar {
            principal_uri: principal_uri.to_string(),
            uri: uri.to_string(),
        });
        Ok(id)
    }

    async fn delete_calendar(&self, calendar_id: i64, _force: bool) -> HostResult<()> {
        let mut state = self.lock();
        state.calendars.retain(|c| c.calendar.id != calendar_id);
        state.journal.push(HostCall::DeleteCalendar { calendar_id });
        Ok(())
    }

    async fn update_shares(
        &self,
        calendar_id: i64,
        add: &[ShareRecipient],
        remove: &[String],
    ) -> HostResult<()> {
        let mut state = self.lock();
        if let Some(stored) = state
            .calendars
            .iter_mut()
            .find(|c| c.calendar.id == calendar_id)
        {
            stored.shares.retain(|s| !remove.contains(&s.href));
            for recipient in add {
                if !stored.shares.iter().any(|s| s.href == recipient.href) {
                    stored.shares.push(recipient.clone());
                }
            }
        }
        state.journal.push(HostCall::UpdateShares {
            calendar_id,
            added: add.iter().map(|s| s.href.clone()).collect(),
            removed: remove.to_vec(),
        });
        Ok(())
    }
}

#[async_trait]
impl GroupStore for MemoryHost {
    async fn group_exists(&self, group_id: &str) -> HostResult<bool> {
        Ok(self.lock().groups.contains_key(group_id))
    }

    async fn create_group(&self, group_id: &str) -> HostResult<bool> {
        let mut state = self.lock();
        state
            .groups
            .entry(group_id.to_string())
            .or_insert_with(StoredGroup::default);
        state.journal.push(HostCall::CreateGroup {
            group_id: group_id.to_string(),
        });
        Ok(true)
    }

    async fn delete_group(&self, group_id: &str) -> HostResult<bool> {
        let mut state = self.lock();
        let removed = state.groups.remove(group_id).is_some();
        state.journal.push(HostCall::DeleteGroup {
            group_id: group_id.to_string(),
        });
        Ok(removed)
    }

    async fn set_group_display_name(&self, group_id: &str, display_name: &str) -> HostResult<()> {
        let mut state = self.lock();
        if let Some(group) = state.groups.get_mut(group_id) {
            group.display_name = Some(display_name.to_string());
        }
        Ok(())
    }

    async fn group_members(&self, group_id: &str) -> HostResult<Option<Vec<String>>> {
        Ok(self.lock().groups.get(group_id).map(|g| g.members.clone()))
    }

    async fn add_member(&self, group_id: &str, user_id: &str) -> HostResult<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        if let Some(group) = state.groups.get_mut(group_id) {
            if !group.members.iter().any(|m| m == user_id) {
                group.members.push(user_id.to_string());
            }
            state.journal.push(HostCall::AddMember {
                group_id: group_id.to_string(),
                user_id: user_id.to_string(),
            });
        }
        Ok(())
    }

    async fn remove_member(&self, group_id: &str, user_id: &str) -> HostResult<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        if let Some(group) = state.groups.get_mut(group_id) {
            group.members.retain(|m| m != user_id);
            state.journal.push(HostCall::RemoveMember {
                group_id: group_id.to_string(),
                user_id: user_id.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryHost {
    async fn user_exists(&self, user_id: &str) -> HostResult<bool> {
        Ok(self.lock().users.iter().any(|u| u == user_id))
    }
}

#[async_trait]
impl PropertyServer for MemoryHost {
    async fn get_property(
        &self,
        user_id: &str,
        path: &str,
        kind: PropertyKind,
    ) -> HostResult<Option<String>> {
        let state = self.lock();
        if let Some(value) = state
            .properties
            .get(&(user_id.to_string(), path.to_string(), kind))
        {
            return Ok(Some(value.clone()));
        }
        // Fall back to the calendar row itself, the way the host answers a
        // viewer who never overrode the property.
        if kind == PropertyKind::DisplayName {
            return Ok(Self::resolve_path(&state, user_id, path)
                .and_then(|stored| stored.calendar.display_name.clone()));
        }
        Ok(None)
    }

    async fn update_property(
        &self,
        user_id: &str,
        path: &str,
        kind: PropertyKind,
        value: &str,
    ) -> HostResult<PropertyStatus> {
        let mut state = self.lock();
        if Self::resolve_path(&state, user_id, path).is_none() {
            return Ok(PropertyStatus(404));
        }
        state.properties.insert(
            (user_id.to_string(), path.to_string(), kind),
            value.to_string(),
        );
        state.journal.push(HostCall::UpdateProperty {
            user_id: user_id.to_string(),
            path: path.to_string(),
            kind,
            value: value.to_string(),
        });
        Ok(PropertyStatus(200))
    }
}

#[async_trait]
impl OrderingStore for MemoryHost {
    async fn orderings_for_user(&self, user_id: &str) -> HostResult<Vec<OrderingEntry>> {
        let state = self.lock();
        let mut entries: Vec<OrderingEntry> = state
            .properties
            .iter()
            .filter(|((uid, _, kind), _)| uid == user_id && *kind == PropertyKind::CalendarOrder)
            .filter_map(|((_, path, _), value)| {
                value.parse::<i32>().ok().map(|order| OrderingEntry {
                    property_path: path.clone(),
                    order,
                })
            })
            .collect();
        entries.sort_by_key(|e| e.order);
        Ok(entries)
    }
}

#[async_trait]
impl PreferenceStore for MemoryHost {
    async fn set_preference(
        &self,
        user_id: &str,
        app: &str,
        key: &str,
        value: &str,
    ) -> HostResult<()> {
        let mut state = self.lock();
        state.preferences.insert(
            (user_id.to_string(), app.to_string(), key.to_string()),
            value.to_string(),
        );
        state.journal.push(HostCall::SetPreference {
            user_id: user_id.to_string(),
            app: app.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_sequential_calendar_ids() {
        let host = MemoryHost::new();
        let first = host
            .create_calendar("principals/users/svc", "a", "A")
            .await
            .expect("create");
        let second = host
            .create_calendar("principals/users/svc", "b", "B")
            .await
            .expect("create");
        assert_eq!(second, first + 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_shared_in_calendar_carries_suffixed_uri() {
        let host = MemoryHost::new();
        host.seed_user("alice");
        let id = host.seed_calendar("svc", "room", "Room", &[Component::Events]);
        host.create_group("g1").await.expect("group");
        host.add_member("g1", "alice").await.expect("member");
        host.update_shares(
            id,
            &[ShareRecipient {
                href: format!("{GROUP_PRINCIPAL_PREFIX}g1"),
                read_only: false,
            }],
            &[],
        )
        .await
        .expect("share");

        let visible = host
            .calendars_visible_to("principals/users/alice")
            .await
            .expect("visible");
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].uri, "room_shared_by_svc");
        assert_eq!(visible[0].owner_id(), "svc");
    }

    #[test_log::test(tokio::test)]
    async fn test_orderings_sorted_ascending() {
        let host = MemoryHost::new();
        host.seed_property("alice", "calendars/alice/b", PropertyKind::CalendarOrder, "2");
        host.seed_property("alice", "calendars/alice/a", PropertyKind::CalendarOrder, "5");
        host.seed_property("alice", "calendars/alice/c", PropertyKind::CalendarOrder, "1");

        let orderings = host.orderings_for_user("alice").await.expect("orderings");
        let orders: Vec<i32> = orderings.iter().map(|e| e.order).collect();
        assert_eq!(orders, vec![1, 2, 5]);
    }

    #[test_log::test(tokio::test)]
    async fn test_journal_records_call_order() {
        let host = MemoryHost::new();
        host.create_group("g1").await.expect("group");
        host.add_member("g1", "alice").await.expect("member");

        let journal = host.journal();
        assert_eq!(
            journal,
            vec![
                HostCall::CreateGroup {
                    group_id: "g1".to_string()
                },
                HostCall::AddMember {
                    group_id: "g1".to_string(),
                    user_id: "alice".to_string()
                },
            ]
        );
    }
}
