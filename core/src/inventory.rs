//! Seams to the infrastructure inventory.
//!
//! The portal reads selectable values (device types, locations, design
//! patterns, providers) from the inventory and, for data-center requests,
//! creates a deployment branch there. Both are reached only through the
//! traits in this module so that forms never depend on a concrete client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Schema kinds the portal offers as selections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryKind {
    /// Device types for connection requests
    DcimDeviceType,
    /// Buildings a device can be installed in
    LocationBuilding,
    /// Metro areas for DC and PoP deployments
    LocationMetro,
    /// Design templates, filtered by `type__value`
    DesignTopology,
    /// Service providers for PoP deployments
    OrganizationProvider,
}

impl InventoryKind {
    /// Schema kind name as the inventory knows it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DcimDeviceType => "DcimDeviceType",
            Self::LocationBuilding => "LocationBuilding",
            Self::LocationMetro => "LocationMetro",
            Self::DesignTopology => "DesignTopology",
            Self::OrganizationProvider => "OrganizationProvider",
        }
    }
}

impl fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attribute filter, e.g. `type__value = "DC"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionFilter {
    /// Filter argument name
    pub name: String,
    /// Required value
    pub value: String,
}

impl OptionFilter {
    /// Create a filter.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A selectable value: what the user sees and what the inventory stores.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectOption {
    /// Display label
    pub label: String,
    /// Inventory node id
    pub id: String,
}

impl SelectOption {
    /// Create an option.
    #[must_use]
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
        }
    }
}

/// Failures talking to the inventory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionSourceError {
    /// Network failure or non-success HTTP status
    #[error("inventory unreachable: {0}")]
    Unreachable(String),

    /// The response did not have the expected shape
    #[error("unexpected inventory response: {0}")]
    SchemaMismatch(String),

    /// The inventory answered with an error
    #[error("inventory rejected the query: {0}")]
    Rejected(String),

    /// No answer within the configured bound (milliseconds)
    #[error("inventory lookup timed out after {0}ms")]
    Timeout(u64),
}

/// Boxed future returned by [`OptionSource::fetch_options`].
pub type OptionsFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<SelectOption>, OptionSourceError>> + Send + 'a>>;

/// Where selectable options come from.
pub trait OptionSource: Send + Sync {
    /// Fetch every node of `kind` matching `filters`, in inventory order.
    ///
    /// # Errors
    ///
    /// Returns an [`OptionSourceError`] describing why the lookup failed.
    fn fetch_options<'a>(
        &'a self,
        kind: InventoryKind,
        filters: &'a [OptionFilter],
    ) -> OptionsFuture<'a>;
}

/// Creates deployment branches in the inventory.
pub trait BranchManager: Send + Sync {
    /// Create branch `name`.
    ///
    /// # Errors
    ///
    /// Returns an [`OptionSourceError`] when the inventory refuses or cannot
    /// be reached; the message becomes the failed workflow step's reason.
    fn create_branch<'a>(&'a self, name: &'a str) -> BranchFuture<'a>;
}

/// Boxed future returned by [`BranchManager::create_branch`].
pub type BranchFuture<'a> = Pin<Box<dyn Future<Output = Result<(), OptionSourceError>> + Send + 'a>>;
