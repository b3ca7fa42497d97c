//! Room identifier derivation.
//!
//! ## Summary
//! Derives stable host-side identifiers from external messaging-room ids.
//! The same derived id names both the room's group and the room's calendar
//! URI, so a room maps to the same resources on every call.

use sha2::{Digest, Sha256};

/// Derive the host group/calendar identifier for a room.
///
/// Lowercase hex SHA-256 of the raw room id, always 64 characters.
/// Collisions between unrelated rooms are treated as a non-issue.
#[must_use]
pub fn group_id_for_room(room_id: &str) -> String {
    let digest = Sha256::digest(room_id.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable() {
        assert_eq!(
            group_id_for_room("!abc:matrix"),
            group_id_for_room("!abc:matrix")
        );
    }

    #[test]
    fn test_length_and_charset() {
        let id = group_id_for_room("!abc:matrix");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, id.to_lowercase());
    }

    #[test]
    fn test_distinct_rooms() {
        assert_ne!(
            group_id_for_room("!abc:matrix"),
            group_id_for_room("!abd:matrix")
        );
    }

    #[test]
    fn test_known_vector() {
        // sha256 of the empty string
        assert_eq!(
            group_id_for_room(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
