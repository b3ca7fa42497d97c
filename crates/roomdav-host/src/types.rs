//! Host-side data model as seen through the store seams.

use serde::Serialize;

use roomdav_core::constants::{
    CALENDAR_ORDER_PROPERTY, DISPLAYNAME_PROPERTY, USER_PRINCIPAL_PREFIX,
};

/// Calendar component kind without host dependencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum Component {
    Events,
    Tasks,
    Journal,
}

impl Component {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Events => "VEVENT",
            Self::Tasks => "VTODO",
            Self::Journal => "VJOURNAL",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "VEVENT" => Some(Self::Events),
            "VTODO" => Some(Self::Tasks),
            "VJOURNAL" => Some(Self::Journal),
            _ => None,
        }
    }
}

impl From<Component> for &'static str {
    fn from(component: Component) -> Self {
        component.as_str()
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A calendar row as the host reports it.
///
/// `uri` is relative to the principal the calendar was listed for: listings
/// of another user's view carry the host's `_shared_by_{owner}` suffix, while
/// `principal_uri` always names the owning principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    pub id: i64,
    pub principal_uri: String,
    pub uri: String,
    pub display_name: Option<String>,
    pub components: Vec<Component>,
}

impl Calendar {
    /// Last segment of the owning principal URI.
    #[must_use]
    pub fn owner_id(&self) -> &str {
        self.principal_uri
            .rsplit('/')
            .next()
            .unwrap_or(&self.principal_uri)
    }

    /// Whether the calendar is owned by the given user id.
    #[must_use]
    pub fn owned_by(&self, user_id: &str) -> bool {
        self.principal_uri == format!("{USER_PRINCIPAL_PREFIX}{user_id}")
    }
}

/// Share target handed to the host when granting access, addressed by
/// principal href string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRecipient {
    pub href: String,
    pub read_only: bool,
}

/// Per-user DAV properties the bridge reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyKind {
    DisplayName,
    CalendarOrder,
}

impl PropertyKind {
    /// Clark-notation name used on the wire; the enum never leaves the
    /// process, the string form does.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::DisplayName => DISPLAYNAME_PROPERTY,
            Self::CalendarOrder => CALENDAR_ORDER_PROPERTY,
        }
    }
}

/// Host status code reported for a property write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyStatus(pub u16);

impl PropertyStatus {
    /// The host reports 200 or 204 for an applied property update.
    #[must_use]
    pub const fn accepted(self) -> bool {
        matches!(self.0, 200 | 204)
    }

    /// The addressed path does not exist in the viewer's tree (yet).
    #[must_use]
    pub const fn is_missing(self) -> bool {
        self.0 == 404
    }
}

/// One persisted calendar-order property row for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingEntry {
    pub property_path: String,
    pub order: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_round_trip() {
        assert_eq!(Component::from_name("VTODO"), Some(Component::Tasks));
        assert_eq!(Component::Tasks.as_str(), "VTODO");
        assert_eq!(Component::from_name("VFREEBUSY"), None);
    }

    #[test]
    fn test_owner_id() {
        let calendar = Calendar {
            id: 1,
            principal_uri: "principals/users/alice".to_string(),
            uri: "work".to_string(),
            display_name: None,
            components: vec![Component::Events],
        };
        assert_eq!(calendar.owner_id(), "alice");
        assert!(calendar.owned_by("alice"));
        assert!(!calendar.owned_by("bob"));
    }

    #[test]
    fn test_property_status() {
        assert!(PropertyStatus(200).accepted());
        assert!(PropertyStatus(204).accepted());
        assert!(!PropertyStatus(403).accepted());
    }
}
