//! Interface rows and vPC groups for the device connection form.
//!
//! [`InterfaceEditor`] owns the rows and the vPC group vocabulary. Every
//! mutation keeps one invariant: a row's group is either `None` or a name the
//! vocabulary currently offers. Shrinking or renaming the vocabulary re-points
//! or clears rows in the same call, so a dangling group reference cannot be
//! observed.
//!
//! # Example
//!
//! ```
//! use franc_portal_forms::interfaces::{InterfaceEditor, RowField};
//!
//! let mut editor = InterfaceEditor::new();
//! editor.set_interface_count(2);
//! editor.set_group_count(1);
//! editor.update_row(0, RowField::Group(Some("vPC-1".to_string())));
//! editor.update_row(1, RowField::Group(Some("vPC-1".to_string())));
//! editor.rename_group("vPC-1", "uplink").unwrap();
//!
//! let plan = editor.snapshot();
//! assert!(plan.rows.iter().all(|r| r.vpc_group.as_deref() == Some("uplink")));
//! ```

use crate::validation::{
    validate_minimum_count, validate_required_field, validate_unique_names, validate_vpc_groups,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Rows a fresh form starts with.
pub const DEFAULT_INTERFACE_COUNT: usize = 1;

/// Most rows one device connection request may carry.
pub const MAX_INTERFACE_COUNT: usize = 128;

/// Link speed of an interface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterfaceSpeed {
    /// 1 Gbit/s
    #[default]
    #[serde(rename = "1 Gbit")]
    OneGbit,
    /// 10 Gbit/s
    #[serde(rename = "10 Gbit")]
    TenGbit,
    /// 40 Gbit/s
    #[serde(rename = "40 Gbit")]
    FortyGbit,
    /// 100 Gbit/s
    #[serde(rename = "100 Gbit")]
    HundredGbit,
}

impl InterfaceSpeed {
    /// Every speed, slowest first
    pub const ALL: [Self; 4] = [Self::OneGbit, Self::TenGbit, Self::FortyGbit, Self::HundredGbit];

    /// Display label, e.g. `"10 Gbit"`
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OneGbit => "1 Gbit",
            Self::TenGbit => "10 Gbit",
            Self::FortyGbit => "40 Gbit",
            Self::HundredGbit => "100 Gbit",
        }
    }
}

impl fmt::Display for InterfaceSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unknown speed or role text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseRowValueError {
    kind: &'static str,
    value: String,
}

impl FromStr for InterfaceSpeed {
    type Err = ParseRowValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1 Gbit" | "1G" => Ok(Self::OneGbit),
            "10 Gbit" | "10G" => Ok(Self::TenGbit),
            "40 Gbit" | "40G" => Ok(Self::FortyGbit),
            "100 Gbit" | "100G" => Ok(Self::HundredGbit),
            other => Err(ParseRowValueError {
                kind: "interface speed",
                value: other.to_string(),
            }),
        }
    }
}

/// What an interface is used for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceRole {
    /// Production traffic
    #[default]
    Data,
    /// Out-of-band administration
    Management,
}

impl InterfaceRole {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Management => "management",
        }
    }
}

impl fmt::Display for InterfaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterfaceRole {
    type Err = ParseRowValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "data" => Ok(Self::Data),
            "management" => Ok(Self::Management),
            other => Err(ParseRowValueError {
                kind: "interface role",
                value: other.to_string(),
            }),
        }
    }
}

/// One interface row. Its identity is its position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRow {
    /// Free-text interface name, e.g. `Gi0/1`
    pub name: String,
    /// Link speed
    pub speed: InterfaceSpeed,
    /// Purpose
    pub role: InterfaceRole,
    /// vPC group, `None` when standalone
    pub vpc_group: Option<String>,
}

/// A single-attribute change to one row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowField {
    /// Replace the name
    Name(String),
    /// Replace the speed
    Speed(InterfaceSpeed),
    /// Replace the role
    Role(InterfaceRole),
    /// Assign a group; unknown names become `None`
    Group(Option<String>),
}

/// Why a rename was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenameError {
    /// `old` is not an offered group
    #[error("vPC group '{0}' does not exist")]
    UnknownGroup(String),

    /// `new` is empty after trimming
    #[error("vPC group name cannot be empty")]
    BlankName,

    /// `new` is already offered by another group
    #[error("vPC group '{0}' already exists")]
    NameTaken(String),
}

/// Read-only view of the rows and the group vocabulary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfacePlan {
    /// Rows in position order
    pub rows: Vec<InterfaceRow>,
    /// Group names offered to rows
    pub groups: Vec<String>,
}

impl InterfacePlan {
    /// Row names in position order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.name.as_str()).collect()
    }

    /// Distinct group names in row order; `None` when no row is grouped
    #[must_use]
    pub fn referenced_groups(&self) -> Option<Vec<String>> {
        let mut seen: Vec<String> = Vec::new();
        for group in self.rows.iter().filter_map(|r| r.vpc_group.as_ref()) {
            if !seen.contains(group) {
                seen.push(group.clone());
            }
        }
        (!seen.is_empty()).then_some(seen)
    }

    /// Messages for the interface part of the device form, in display order:
    /// at least one named interface, a name on every row, unique names, vPC
    /// group sizes.
    ///
    /// Per-row name errors are only reported once some row is named; with no
    /// names at all the minimum-count message already covers every row.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<Option<String>> {
        let names = self.names();
        let minimum = validate_minimum_count(&names, 1, "interface with a name");
        let mut results = Vec::with_capacity(self.rows.len() + 3);
        if minimum.is_none() {
            results.extend(self.rows.iter().enumerate().map(|(i, row)| {
                validate_required_field(Some(&row.name), &format!("Interface {} name", i + 1))
            }));
        }
        results.insert(0, minimum);
        results.push(validate_unique_names(&names, "Interface names"));
        results.push(validate_vpc_groups(self.rows.iter().map(|r| r.vpc_group.as_deref())));
        results
    }
}

/// `"name (speed, role[, vPC X])"` per row, joined with `", "`.
#[must_use]
pub fn interface_summary(plan: &InterfacePlan) -> String {
    plan.rows
        .iter()
        .map(|row| match &row.vpc_group {
            Some(group) => format!("{} ({}, {}, vPC {group})", row.name, row.speed, row.role),
            None => format!("{} ({}, {})", row.name, row.speed, row.role),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Mutable interface rows plus group vocabulary for one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceEditor {
    rows: Vec<InterfaceRow>,
    groups: Vec<String>,
}

impl Default for InterfaceEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl InterfaceEditor {
    /// One blank row, no groups
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: vec![InterfaceRow::default(); DEFAULT_INTERFACE_COUNT],
            groups: Vec::new(),
        }
    }

    /// Number of rows
    #[must_use]
    pub fn interface_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of offered groups
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Resize to exactly `count` rows, at most [`MAX_INTERFACE_COUNT`].
    ///
    /// Growing appends blank rows. Shrinking drops rows from the end and
    /// leaves the rest untouched, group assignments included. The group
    /// vocabulary never exceeds the row count: when it has to shrink,
    /// groups no remaining row uses are dropped first, from the end.
    pub fn set_interface_count(&mut self, count: usize) {
        let count = count.min(MAX_INTERFACE_COUNT);
        self.rows.resize_with(count, InterfaceRow::default);

        let mut excess = self.groups.len().saturating_sub(count);
        let mut position = self.groups.len();
        while excess > 0 && position > 0 {
            position -= 1;
            let group = &self.groups[position];
            if !self.rows.iter().any(|r| r.vpc_group.as_ref() == Some(group)) {
                self.groups.remove(position);
                excess -= 1;
            }
        }
    }

    /// Change one attribute of one row. Out-of-range indexes are ignored.
    pub fn update_row(&mut self, index: usize, field: RowField) {
        let offered = &self.groups;
        let Some(row) = self.rows.get_mut(index) else {
            tracing::debug!(index, "ignoring update for missing interface row");
            return;
        };
        match field {
            RowField::Name(name) => row.name = name,
            RowField::Speed(speed) => row.speed = speed,
            RowField::Role(role) => row.role = role,
            RowField::Group(group) => {
                row.vpc_group = group.filter(|g| offered.contains(g));
            },
        }
    }

    /// Offer `count` groups (clamped to the row count).
    ///
    /// New positions are named `vPC-{n}`; existing names, renamed or not, are
    /// kept. Rows assigned to a group that is no longer offered become
    /// standalone.
    pub fn set_group_count(&mut self, count: usize) {
        let count = count.min(self.rows.len());
        self.groups.truncate(count);
        let mut position = self.groups.len();
        while self.groups.len() < count {
            position += 1;
            let candidate = format!("vPC-{position}");
            if !self.groups.contains(&candidate) {
                self.groups.push(candidate);
            }
        }

        let offered = &self.groups;
        for row in &mut self.rows {
            if row.vpc_group.as_ref().is_some_and(|g| !offered.contains(g)) {
                row.vpc_group = None;
            }
        }
    }

    /// Rename a group and re-point every row assigned to it.
    ///
    /// # Errors
    ///
    /// Returns a [`RenameError`] and changes nothing when `old` is not
    /// offered, `new` is blank, or `new` names a different offered group.
    pub fn rename_group(&mut self, old: &str, new: &str) -> Result<(), RenameError> {
        let new = new.trim();
        let position = self
            .groups
            .iter()
            .position(|g| g == old)
            .ok_or_else(|| RenameError::UnknownGroup(old.to_string()))?;
        if new.is_empty() {
            return Err(RenameError::BlankName);
        }
        if new != old && self.groups.iter().any(|g| g == new) {
            return Err(RenameError::NameTaken(new.to_string()));
        }

        self.groups[position] = new.to_string();
        for row in &mut self.rows {
            if row.vpc_group.as_deref() == Some(old) {
                row.vpc_group = Some(new.to_string());
            }
        }
        Ok(())
    }

    /// Current rows and vocabulary, freshly copied.
    #[must_use]
    pub fn snapshot(&self) -> InterfacePlan {
        InterfacePlan {
            rows: self.rows.clone(),
            groups: self.groups.clone(),
        }
    }
}
