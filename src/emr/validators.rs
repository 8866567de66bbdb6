//! Prompt validators for the intake flow

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::dialog::Validator;

// TODO: the birth date is pattern-checked only; "2023-99-99" passes.
// Calendar validity (chrono::NaiveDate::parse_from_str) is a candidate
// tightening once the upstream document API defines its expectations.
static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern must compile")
});

/// Accepts only integers strictly greater than 20000
pub fn postal_code_validator() -> Validator {
    Arc::new(|value| value.as_i64().is_some_and(|code| code > 20000))
}

/// Accepts only strings matching yyyy-mm-dd (pattern only, no calendar check)
pub fn birth_date_validator() -> Validator {
    Arc::new(|value| value.as_str().is_some_and(|date| DATE_PATTERN.is_match(date)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn postal_code_boundaries() {
        let validator = postal_code_validator();
        assert!(validator(&json!(20001)));
        assert!(validator(&json!(99999)));
        assert!(!validator(&json!(20000)));
        assert!(!validator(&json!(19999)));
        assert!(!validator(&json!(-5)));
        assert!(!validator(&json!("22042")));
    }

    #[test]
    fn birth_date_pattern() {
        let validator = birth_date_validator();
        assert!(validator(&json!("1952-02-09")));
        assert!(!validator(&json!("52-02-09")));
        assert!(!validator(&json!("1952/02/09")));
        assert!(!validator(&json!("")));
        assert!(!validator(&json!("1952-2-9")));
        // Pattern only: calendar-invalid dates pass.
        assert!(validator(&json!("2023-99-99")));
    }

    proptest! {
        #[test]
        fn postal_codes_split_exactly_at_20000(code in -100_000i64..200_000) {
            let validator = postal_code_validator();
            prop_assert_eq!(validator(&json!(code)), code > 20000);
        }

        #[test]
        fn well_formed_dates_always_pass(y in 0u32..10_000, m in 0u32..100, d in 0u32..100) {
            let validator = birth_date_validator();
            let date = format!("{y:04}-{m:02}-{d:02}");
            prop_assert!(validator(&json!(date)));
        }
    }
}
