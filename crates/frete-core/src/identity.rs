//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier in the marketplace. These prevent
//! accidental identifier confusion: you cannot pass a `ProposalId` where a
//! `CargoId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! uuid_identifier {
    ($(#[$doc:meta])* $name:ident, $kind:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Parse the hyphenated UUID form.
            pub fn parse(s: &str) -> Result<Self, ValidationError> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| ValidationError::InvalidIdentifier {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($kind, ":{}"), self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a published cargo (the negotiation aggregate).
    CargoId,
    "cargo"
);

uuid_identifier!(
    /// Unique identifier for a carrier's proposal against a cargo.
    ProposalId,
    "proposal"
);

uuid_identifier!(
    /// Unique identifier for a carrier ("transportadora").
    CarrierId,
    "carrier"
);

uuid_identifier!(
    /// Unique identifier for a shipper ("embarcador").
    ShipperId,
    "shipper"
);
