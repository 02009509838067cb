use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Namespace for name-derived lectern identifiers.
const LECTERN_NAMESPACE: Uuid = Uuid::from_u128(0x6c65_6374_6572_4e00_8000_636f_7572_7365);

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Derive the identifier from a stable name. Equal names always
            /// give equal identifiers.
            #[must_use]
            pub fn from_name(name: &str) -> Self {
                Self(Uuid::new_v5(&LECTERN_NAMESPACE, name.as_bytes()))
            }

            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }
    };
}

define_id!(CourseId, "Identifier of a course, derived from its title.");
define_id!(
    ChunkId,
    "Identifier of a content chunk, derived from its course title and index."
);

impl CourseId {
    #[must_use]
    pub fn for_title(title: &str) -> Self {
        Self::from_name(title)
    }
}

impl ChunkId {
    #[must_use]
    pub fn for_chunk(course_title: &str, chunk_index: u32) -> Self {
        // Unit separator keeps "A1" + 0 distinct from "A" + 10.
        Self::from_name(&format!("{course_title}\u{1f}{chunk_index}"))
    }
}
