//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in the game has a strongly-typed ID to prevent accidental
//! mixing of identifiers at compile time. All IDs use UUID v7 (time-ordered)
//! so store keys sort by creation time.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a kingdom (one player's persistent game entity).
    KingdomId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct() {
        let a = KingdomId::new();
        let b = KingdomId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn id_roundtrips_through_uuid() {
        let id = KingdomId::new();
        let uuid: Uuid = id.into();
        let back = KingdomId::from(uuid);
        assert_eq!(id, back);
    }

    #[test]
    fn id_serializes_as_uuid_string() {
        let id = KingdomId::new();
        let json = serde_json::to_string(&id);
        assert!(json.is_ok());
        let json = json.unwrap_or_default();
        assert!(json.contains('-'));
    }
}
