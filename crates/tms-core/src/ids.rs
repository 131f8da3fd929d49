//! Strongly typed identifier wrappers.
//!
//! Site entities are keyed by short human-assigned codes (`"P001"`,
//! `"TW001"`, `"C001"`).  Each entity family gets its own newtype so a
//! `WarehouseId` can never be passed where an `EquipmentId` is expected.
//!
//! All IDs are `Ord`, and the ordering is plain lexicographic on the code.
//! Every "lowest id wins" tie-break in the engine relies on that.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Generate a typed ID wrapper around a `String` code.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
        #[serde(transparent)]
        $vis struct $name(String);

        impl $name {
            pub fn new(code: impl Into<String>) -> Self {
                Self(code.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// `true` for the empty code, which no registry accepts.
            #[inline]
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(code: &str) -> Self {
                Self(code.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(code: String) -> Self {
                Self(code)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

typed_id! {
    /// Catalog code of a product (e.g. `"P001"`).
    pub struct ProductId;
}

typed_id! {
    /// Code of a warehouse on the site (e.g. `"TW001"`, `"PW001"`).
    pub struct WarehouseId;
}

typed_id! {
    /// Code of a piece of handling equipment (e.g. `"C001"`, `"T001"`).
    pub struct EquipmentId;
}

typed_id! {
    /// Code of a transport task.  Generated as `T000001`, `T000002`, … by the
    /// task board unless the caller supplies one.
    pub struct TaskId;
}

impl TaskId {
    /// The generated code for creation sequence number `seq`.
    pub fn from_seq(seq: u64) -> Self {
        Self(format!("T{seq:06}"))
    }
}
