//! Field checks for portal forms.
//!
//! Every check is a pure function returning `Option<String>`: `None` when the
//! value passes, otherwise the message shown to the user. Checks never fail;
//! a bad value is reported as data. [`collect_validation_errors`] flattens the
//! results of many checks, in the order given, into a [`ValidationResult`].

use serde::Serialize;
use std::collections::HashMap;

/// Smallest number of interfaces a vPC group may contain.
pub const MIN_VPC_GROUP_MEMBERS: usize = 2;

/// Ordered error messages from one validation pass. Empty means valid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationResult {
    errors: Vec<String>,
}

impl ValidationResult {
    /// A result with no errors
    #[must_use]
    pub const fn valid() -> Self {
        Self { errors: Vec::new() }
    }

    /// True when no check reported an error
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The messages, first failing check first
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Same as [`ValidationResult::is_valid`]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Take the messages
    #[must_use]
    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }
}

impl<'a> IntoIterator for &'a ValidationResult {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// `"{field} is required."` unless `value` has non-whitespace content.
#[must_use]
pub fn validate_required_field(value: Option<&str>, field: &str) -> Option<String> {
    is_blank(value).then(|| format!("{field} is required."))
}

/// A selection must be one of `options`.
///
/// When there are no options at all the check passes: the caller decides how
/// an empty option list is handled (see `SelectField::validate`).
#[must_use]
pub fn validate_required_selection<S: AsRef<str>>(
    options: &[S],
    selected: Option<&str>,
    field: &str,
) -> Option<String> {
    if options.is_empty() {
        return None;
    }
    match selected {
        Some(value) if !value.is_empty() && options.iter().any(|o| o.as_ref() == value) => None,
        _ => Some(format!("{field} is required.")),
    }
}

/// Non-blank names (trimmed) must not repeat. Comparison is case-sensitive.
#[must_use]
pub fn validate_unique_names<S: AsRef<str>>(names: &[S], field: &str) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in names.iter().map(|n| n.as_ref().trim()).filter(|n| !n.is_empty()) {
        *counts.entry(name).or_default() += 1;
    }

    let mut duplicates: Vec<&str> = counts
        .into_iter()
        .filter_map(|(name, count)| (count > 1).then_some(name))
        .collect();
    if duplicates.is_empty() {
        return None;
    }
    duplicates.sort_unstable();

    let plural = if field.ends_with('s') {
        field.to_string()
    } else {
        format!("{field}s")
    };
    Some(format!(
        "{plural} must be unique. Duplicates found: {}",
        duplicates.join(", ")
    ))
}

/// At least `min` non-blank items.
#[must_use]
pub fn validate_minimum_count<S: AsRef<str>>(
    items: &[S],
    min: usize,
    field: &str,
) -> Option<String> {
    let present = items.iter().filter(|i| !i.as_ref().trim().is_empty()).count();
    if present >= min {
        return None;
    }
    Some(if min == 1 {
        format!("At least 1 {field} is required.")
    } else {
        format!("At least {min} {field}s are required.")
    })
}

/// Group names with fewer than [`MIN_VPC_GROUP_MEMBERS`] members, in order
/// of first appearance. Ungrouped and blank assignments are ignored.
pub fn find_undersized_groups<'a, I>(assignments: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for group in assignments.into_iter().flatten().map(str::trim) {
        if group.is_empty() {
            continue;
        }
        let count = counts.entry(group).or_default();
        if *count == 0 {
            order.push(group);
        }
        *count += 1;
    }

    order
        .into_iter()
        .filter(|g| counts.get(g).copied().unwrap_or_default() < MIN_VPC_GROUP_MEMBERS)
        .map(str::to_string)
        .collect()
}

/// Every referenced vPC group needs at least two interfaces.
pub fn validate_vpc_groups<'a, I>(assignments: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let undersized = find_undersized_groups(assignments);
    (!undersized.is_empty()).then(|| {
        format!(
            "Each vPC group must have at least two interfaces. Invalid groups: {}",
            undersized.join(", ")
        )
    })
}

/// Flatten check results in order, dropping passes and blank messages.
pub fn collect_validation_errors<I>(results: I) -> ValidationResult
where
    I: IntoIterator<Item = Option<String>>,
{
    ValidationResult {
        errors: results
            .into_iter()
            .flatten()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use franc_portal_testing::properties;
    use proptest::prelude::*;

    #[test]
    fn required_field() {
        assert_eq!(validate_required_field(Some("CHG-1"), "Change number"), None);
        assert_eq!(
            validate_required_field(Some("   "), "Change number"),
            Some("Change number is required.".to_string())
        );
        assert_eq!(
            validate_required_field(None, "Device name"),
            Some("Device name is required.".to_string())
        );
    }

    #[test]
    fn required_selection() {
        let options = ["Amsterdam", "Frankfurt"];
        assert_eq!(validate_required_selection(&options, Some("Amsterdam"), "Location"), None);
        assert_eq!(
            validate_required_selection(&options, Some("Paris"), "Location"),
            Some("Location is required.".to_string())
        );
        assert_eq!(
            validate_required_selection(&options, None, "Location"),
            Some("Location is required.".to_string())
        );
        let none: [&str; 0] = [];
        assert_eq!(validate_required_selection(&none, None, "Location"), None);
    }

    #[test]
    fn unique_names_lists_sorted_duplicates() {
        assert_eq!(validate_unique_names(&["A", "B", "C"], "Interface"), None);
        assert_eq!(
            validate_unique_names(&["b", "a", "b", " a ", "c"], "Interface"),
            Some("Interfaces must be unique. Duplicates found: a, b".to_string())
        );
        assert_eq!(
            validate_unique_names(&["x", "x"], "Interface names"),
            Some("Interface names must be unique. Duplicates found: x".to_string())
        );
    }

    #[test]
    fn unique_names_ignores_blank_and_respects_case() {
        assert_eq!(validate_unique_names(&["", " ", "Gi0/1"], "Names"), None);
        assert_eq!(validate_unique_names(&["gi0/1", "Gi0/1"], "Names"), None);
    }

    #[test]
    fn minimum_count_grammar() {
        assert_eq!(validate_minimum_count(&["A", "B", "C"], 2, "item"), None);
        assert_eq!(
            validate_minimum_count(&["A", " "], 2, "item"),
            Some("At least 2 items are required.".to_string())
        );
        assert_eq!(
            validate_minimum_count(&[""], 1, "interface with a name"),
            Some("At least 1 interface with a name is required.".to_string())
        );
    }

    #[test]
    fn undersized_groups_in_first_seen_order() {
        let groups = [Some("vPC-2"), Some("vPC-1"), None, Some("vPC-1"), Some("vPC-3")];
        assert_eq!(find_undersized_groups(groups), vec!["vPC-2", "vPC-3"]);
        assert_eq!(
            validate_vpc_groups(groups),
            Some(
                "Each vPC group must have at least two interfaces. Invalid groups: vPC-2, vPC-3"
                    .to_string()
            )
        );
        assert_eq!(validate_vpc_groups([Some("vPC-1"), Some("vPC-1"), None]), None);
    }

    #[test]
    fn collect_keeps_order_and_drops_blanks() {
        let result = collect_validation_errors([
            Some("Error 1".to_string()),
            None,
            Some("  ".to_string()),
            Some(" Error 2 ".to_string()),
        ]);
        assert_eq!(result.errors(), ["Error 1", "Error 2"]);
        assert!(collect_validation_errors([None, None]).is_valid());
    }

    proptest! {
        #[test]
        fn duplicate_reported_iff_name_repeats(
            names in prop::collection::vec(properties::interface_name(), 0..8)
        ) {
            let mut seen = std::collections::HashSet::new();
            let repeats = names.iter().any(|n| !seen.insert(n.clone()));
            prop_assert_eq!(validate_unique_names(&names, "Interface names").is_some(), repeats);
        }

        #[test]
        fn blank_change_number_is_always_required(text in properties::blank_text()) {
            prop_assert!(validate_required_field(Some(&text), "Change number").is_some());
        }
    }
}
