//! # frete-core — Foundational Types for the Frete Marketplace
//!
//! Leaf crate of the workspace. Defines the primitives every other crate
//! shares so that identifiers, money and time have exactly one
//! representation across the negotiation core, the API and the CLI.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `CargoId`, `ProposalId`, `CarrierId` and
//!    `ShipperId` wrap a UUID each. A proposal id cannot be passed where a
//!    cargo id is expected.
//!
//! 2. **Integer money.** [`Amount`] counts centavos in a `u64`. Floats never
//!    carry monetary values; decimal strings are parsed exactly.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] is UTC, truncated to seconds.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `frete-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod money;
pub mod temporal;

pub use error::ValidationError;
pub use identity::{CargoId, CarrierId, ProposalId, ShipperId};
pub use money::Amount;
pub use temporal::Timestamp;
