//! Entity model shared by every tier

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{StorageError, StorageResult};

/// Length of an entity id in hex characters (12 bytes).
pub const ENTITY_ID_LEN: usize = 24;

/// Entity role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::User => "User",
        }
    }

    /// Map caller-supplied role text: "admin" in any case is `Admin`,
    /// anything else is `User`.
    pub fn from_request(role: &str) -> Self {
        if role.eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::User
        }
    }

    /// Parse the canonical stored name. Unknown names are rejected.
    pub fn from_stored(role: &str) -> Option<Self> {
        match role {
            "Admin" => Some(Self::Admin),
            "User" => Some(Self::User),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of storage.
///
/// Only `description` changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub description: String,
}

impl Entity {
    /// Create a new entity with a freshly allocated id
    pub fn create(role: Role, description: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: generate_id(now),
            role,
            created_at: now,
            description: description.into(),
        }
    }

    /// Reject entities that cannot be stored under a key
    pub fn ensure_storable(&self) -> StorageResult<()> {
        if self.id.is_empty() {
            return Err(StorageError::InvalidArgument(
                "entity id must be non-empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Allocate a 24-hex-character id.
///
/// Layout: 4-byte big-endian unix seconds, 5 random bytes fixed per process,
/// 3-byte counter starting at a random value.
pub fn generate_id(now: DateTime<Utc>) -> String {
    static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

    let process = PROCESS_UNIQUE.get_or_init(rand::random::<[u8; 5]>);
    let counter = COUNTER
        .get_or_init(|| AtomicU32::new(rand::random::<u32>() & 0x00FF_FFFF))
        .fetch_add(1, Ordering::Relaxed);

    let seconds = now.timestamp() as u32;

    let mut bytes = [0u8; 12];
    bytes[..4].copy_from_slice(&seconds.to_be_bytes());
    bytes[4..9].copy_from_slice(process);
    bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
    hex::encode(bytes)
}

/// True if `id` has the shape produced by [`generate_id`]
pub fn is_well_formed_id(id: &str) -> bool {
    id.len() == ENTITY_ID_LEN && id.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_role_from_request() {
        assert_eq!(Role::from_request("ADMIN"), Role::Admin);
        assert_eq!(Role::from_request("admin"), Role::Admin);
        assert_eq!(Role::from_request("Admin"), Role::Admin);
        assert_eq!(Role::from_request("member"), Role::User);
        assert_eq!(Role::from_request("administrator"), Role::User);
    }

    #[test]
    fn test_role_from_stored() {
        assert_eq!(Role::from_stored("Admin"), Some(Role::Admin));
        assert_eq!(Role::from_stored("User"), Some(Role::User));
        assert_eq!(Role::from_stored("admin"), None);
    }

    #[test]
    fn test_generated_ids_are_unique_and_well_formed() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let a = generate_id(now);
        let b = generate_id(now);

        assert!(is_well_formed_id(&a), "{a}");
        assert!(is_well_formed_id(&b), "{b}");
        assert_ne!(a, b);
        // timestamp prefix
        assert_eq!(&a[..8], format!("{:08x}", now.timestamp() as u32));
        assert_eq!(&a[..8], &b[..8]);
    }

    #[test]
    fn test_entity_wire_format_uses_camel_case() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let entity = Entity::create(Role::Admin, "ops lead", now);
        let json = serde_json::to_value(&entity).unwrap();

        assert_eq!(json["role"], "Admin");
        assert_eq!(json["description"], "ops lead");
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["id"], entity.id.as_str());
    }

    #[test]
    fn test_empty_id_is_not_storable() {
        let now = Utc::now();
        let mut entity = Entity::create(Role::User, "x", now);
        assert!(entity.ensure_storable().is_ok());

        entity.id.clear();
        assert!(matches!(
            entity.ensure_storable(),
            Err(StorageError::InvalidArgument(_))
        ));
    }
}
