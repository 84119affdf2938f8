//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing an `OrgUnitId` where an
//! `ApprovalLevelId` is expected, which matters in an engine whose keys are
//! five-way tuples of ids.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for a user.");
typed_id!(OrgUnitId, "Unique identifier for an organisational unit.");
typed_id!(ApprovalLevelId, "Unique identifier for an approval level.");
typed_id!(WorkflowId, "Unique identifier for an approval workflow.");
typed_id!(DataSetId, "Unique identifier for a data set.");
typed_id!(CategoryComboId, "Unique identifier for a category combination.");
typed_id!(
    AttributeOptionComboId,
    "Unique identifier for an attribute option combination."
);
typed_id!(
    OptionGroupSetId,
    "Unique identifier for a category option group set."
);
typed_id!(OptionGroupId, "Unique identifier for a category option group.");
typed_id!(AuditEntryId, "Unique identifier for an approval audit entry.");
