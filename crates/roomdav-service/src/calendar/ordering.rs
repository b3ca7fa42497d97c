//! Calendar list ordering recomputation.
//!
//! The host returns a user's calendars in its own order; users can pin
//! foreign (shared-in) calendars to positions persisted as calendar-order
//! properties. Moving a calendar to the front rebuilds the whole sequence:
//! unpinned calendars keep the host order, pinned foreign calendars are
//! spliced back in at their stored index, then every row is renumbered.

use std::collections::HashMap;

use roomdav_host::types::{Calendar, OrderingEntry};

/// Merges the host-returned calendar list with the stored per-user ordering.
///
/// `stored` must be ascending by order value. Calendars the user owns, or
/// that have no stored order, keep their host position; foreign calendars
/// with a stored order are inserted at that index (clamped to the list end).
/// Stored rows whose calendar is no longer visible are dropped.
pub fn merge_with_stored_order(
    visible: Vec<Calendar>,
    stored: &[OrderingEntry],
    user_id: &str,
    principal_uri: &str,
) -> Vec<Calendar> {
    let stored_paths: HashMap<&str, i32> = stored
        .iter()
        .map(|e| (e.property_path.as_str(), e.order))
        .collect();

    let mut base = Vec::new();
    let mut pinned: HashMap<String, Calendar> = HashMap::new();

    for calendar in visible {
        let path = format!("calendars/{user_id}/{}", calendar.uri);
        if calendar.principal_uri != principal_uri && stored_paths.contains_key(path.as_str()) {
            pinned.insert(path, calendar);
        } else {
            base.push(calendar);
        }
    }

    for entry in stored {
        if let Some(calendar) = pinned.remove(&entry.property_path) {
            let index = usize::try_from(entry.order.max(0)).unwrap_or(0);
            base.insert(index.min(base.len()), calendar);
        }
    }

    base
}
