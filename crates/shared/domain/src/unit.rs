//! Organizational unit entity and the DO-unit classifier.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DO_UNIT_SUFFIX, FIELD_FULL_NAME};
use crate::error::{DomainError, DomainResult};

/// `DEPARTMENT/SUBUNIT`, each side starting and ending with a visible character.
static FULL_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^/\s](?:[^/]*[^/\s])?/[^/\s](?:[^/]*[^/\s])?$").expect("valid unit name pattern")
});

/// Classify a unit full name as a DO unit.
///
/// Trims and upper-cases before checking for the `/DO` suffix, so
/// `" cpmsd/do "` qualifies and `"CPMSD/DOX"` does not. Missing or blank
/// names never qualify.
pub fn is_do_unit(full_name: Option<&str>) -> bool {
    full_name
        .map(normalize_full_name)
        .is_some_and(|name| name.ends_with(DO_UNIT_SUFFIX))
}

/// Storage form of a unit full name: trimmed and upper-cased.
pub fn normalize_full_name(full_name: &str) -> String {
    full_name.trim().to_uppercase()
}

/// Normalize and validate a full name.
///
/// # Errors
/// Returns a `full_name` field error unless the normalized name has the
/// `DEPARTMENT/SUBUNIT` shape.
pub fn parse_full_name(full_name: &str) -> DomainResult<String> {
    let normalized = normalize_full_name(full_name);
    if FULL_NAME_PATTERN.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(DomainError::field(
            FIELD_FULL_NAME,
            "The full name must have the form DEPARTMENT/SUBUNIT.",
        ))
    }
}

/// Unit domain entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: Uuid,
    pub code: String,
    /// Normalized `DEPARTMENT/SUBUNIT`
    pub full_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Unit {
    /// Whether at most one live user may be assigned here
    pub fn is_do_unit(&self) -> bool {
        is_do_unit(Some(self.full_name.as_str()))
    }
}

/// Unit creation data
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUnit {
    pub code: String,
    pub full_name: String,
    pub is_active: Option<bool>,
}

/// Unit update data; omitted fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUnit {
    pub code: Option<String>,
    pub full_name: Option<String>,
    pub is_active: Option<bool>,
}

/// Unit response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UnitResponse {
    pub id: Uuid,
    pub code: String,
    pub full_name: String,
    pub is_active: bool,
    /// Whether the single-holder rule applies
    pub is_do_unit: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Unit> for UnitResponse {
    fn from(unit: Unit) -> Self {
        Self {
            is_do_unit: unit.is_do_unit(),
            id: unit.id,
            code: unit.code,
            full_name: unit.full_name,
            is_active: unit.is_active,
            created_at: unit.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_is_case_insensitive() {
        assert!(is_do_unit(Some("cpmsd/do")));
        assert!(is_do_unit(Some("CPMSD/DO")));
        assert!(is_do_unit(Some("Cpmsd/Do")));
    }

    #[test]
    fn test_classifier_ignores_surrounding_whitespace() {
        assert!(is_do_unit(Some(" CPMSD/DO ")));
        assert!(is_do_unit(Some("\tcpmsd/do\n")));
    }

    #[test]
    fn test_classifier_requires_exact_suffix() {
        assert!(!is_do_unit(Some("CPMSD/DOX")));
        assert!(!is_do_unit(Some("CPMSD/RECORDS")));
        assert!(!is_do_unit(Some("CPMSDDO")));
        assert!(!is_do_unit(Some("DO/CPMSD")));
    }

    #[test]
    fn test_classifier_missing_or_blank_name() {
        assert!(!is_do_unit(None));
        assert!(!is_do_unit(Some("")));
        assert!(!is_do_unit(Some("   ")));
    }

    #[test]
    fn test_parse_full_name_normalizes() {
        assert_eq!(parse_full_name("  cpmsd/do ").unwrap(), "CPMSD/DO");
        assert_eq!(parse_full_name("Human Resources/Payroll").unwrap(), "HUMAN RESOURCES/PAYROLL");
    }

    #[test]
    fn test_parse_full_name_rejects_bad_shapes() {
        for bad in ["CPMSD", "/DO", "CPMSD/", "A/B/C", "A /B", "", "   "] {
            let err = parse_full_name(bad).unwrap_err();
            assert!(
                matches!(err, DomainError::Field { field: FIELD_FULL_NAME, .. }),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_unit_response_reports_classification() {
        let now = Utc::now();
        let unit = Unit {
            id: Uuid::new_v4(),
            code: "CPMSD-DO".to_string(),
            full_name: "CPMSD/DO".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        assert!(UnitResponse::from(unit).is_do_unit);
    }
}
