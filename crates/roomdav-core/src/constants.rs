/// Route component constants shared across crates
pub const API_ROUTE_COMPONENT: &str = "api";
pub const API_ROUTE_PREFIX: &str = const_str::concat!("/", API_ROUTE_COMPONENT);

pub const USERS_ROUTE_COMPONENT: &str = "users";
pub const USERS_ROUTE_PREFIX: &str =
    const_str::concat!(API_ROUTE_PREFIX, "/", USERS_ROUTE_COMPONENT);

pub const CALENDARS_ROUTE_COMPONENT: &str = "calendars";
pub const CALENDARS_ROUTE_PREFIX: &str =
    const_str::concat!(API_ROUTE_PREFIX, "/", CALENDARS_ROUTE_COMPONENT);

/// DAV property names as they appear on the wire, Clark-notation.
pub const DISPLAYNAME_PROPERTY: &str = "{DAV:}displayname";
pub const CALENDAR_ORDER_PROPERTY: &str = "{http://apple.com/ns/ical/}calendar-order";
pub const COMPONENT_SET_PROPERTY: &str =
    "{urn:ietf:params:xml:ns:caldav}supported-calendar-component-set";
pub const OWNER_PRINCIPAL_PROPERTY: &str = "{http://owncloud.org/ns}owner-principal";

/// Suffix the host appends to a calendar URI when resolving a non-owner's view.
pub const SHARED_URI_SUFFIX: &str = "_shared_by_";

/// Prefix of user principal URIs on the host.
pub const USER_PRINCIPAL_PREFIX: &str = "principals/users/";

/// Prefix of group principal hrefs used when targeting shares.
pub const GROUP_PRINCIPAL_PREFIX: &str = "principal:principals/groups/";
