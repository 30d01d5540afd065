//! # Infrahub Inventory Client
//!
//! GraphQL client for the Infrahub infrastructure inventory. It backs the
//! portal's selectable options ([`OptionSource`]) and creates deployment
//! branches ([`BranchManager`]).
//!
//! ## Example
//!
//! ```no_run
//! use franc_portal_inventory::InfrahubClient;
//! use franc_portal_core::inventory::InventoryKind;
//!
//! # async fn run() -> Result<(), franc_portal_inventory::InventoryError> {
//! let client = InfrahubClient::new("http://infrahub:8000").with_api_token("token");
//! let metros = client.select_options(InventoryKind::LocationMetro, &[]).await?;
//! println!("{} metros", metros.len());
//! # Ok(())
//! # }
//! ```
//!
//! [`OptionSource`]: franc_portal_core::inventory::OptionSource
//! [`BranchManager`]: franc_portal_core::inventory::BranchManager

pub mod client;
pub mod error;
pub mod graphql;

pub use client::{API_TOKEN_HEADER, DEFAULT_BRANCH, InfrahubClient};
pub use error::InventoryError;
