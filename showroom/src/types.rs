//! Common type definitions.
//!
//! All entity IDs are UUIDs wrapped in type aliases:
//!
//! - [`UserId`]: back office account identifier
//! - [`CarId`]: vehicle listing identifier
//! - [`InquiryId`]: customer inquiry identifier
//! - [`AttributeId`]: search attribute identifier
//!
//! The permission types live in [`crate::auth::permissions`].

use uuid::Uuid;

pub type UserId = Uuid;
pub type CarId = Uuid;
pub type InquiryId = Uuid;
pub type AttributeId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbrev_uuid() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }
}
