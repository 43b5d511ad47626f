//! Placeholder values substituted for missing data in exported rows.
//!
//! These strings are part of the export format; changing any of them
//! changes every file the tool has ever produced.

/// Stands in for an empty or absent transition value or parent key.
pub const NONE: &str = "None";

/// Assignee of an issue nobody is assigned to.
pub const UNASSIGNED: &str = "Unassigned";

/// Hold duration of a record with no following event.
pub const NOT_APPLICABLE: &str = "N/A";

/// Field name of the synthetic record marking an issue's creation.
pub const CREATED_FIELD: &str = "created";

/// Rendering of an unknown timestamp.
pub const ZERO_TIMESTAMP: &str = "0001-01-01T00:00:00Z";

/// Replaces an empty or absent value with [`NONE`].
pub fn normalize(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NONE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_substitutes_none_for_missing_values() {
        assert_eq!(normalize(None), "None");
        assert_eq!(normalize(Some("")), "None");
    }

    #[test]
    fn normalize_keeps_present_values() {
        assert_eq!(normalize(Some("In Progress")), "In Progress");
        assert_eq!(normalize(Some(" ")), " ");
    }
}
