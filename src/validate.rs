use thiserror::Error;

use crate::result::TestResult;
use crate::scenario::Scenario;

/// Why a parsed result did not meet the scenario's expectations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("expected result '{expected}' not found in '{actual}'")]
    ResultMismatch { expected: String, actual: String },

    #[error("login_status '{actual}' does not report a successful login")]
    LoginNotSuccessful { actual: String },

    #[error("cart is empty")]
    EmptyCart,

    #[error("cart is missing {missing:?}; actual items: {actual:?}")]
    MissingCartItems {
        missing: Vec<String>,
        actual: Vec<String>,
    },
}

/// True iff any lowercase word of `expected` occurs in the result's free text.
pub fn is_loosely_matched(expected: &str, result: &TestResult) -> bool {
    let haystack = result.free_text();
    expected
        .split_whitespace()
        .map(str::to_lowercase)
        .any(|token| haystack.contains(&token))
}

/// Expected items absent from `actual`, compared case-insensitively, in expected order.
pub fn missing_cart_items(expected: &[String], actual: &[String]) -> Vec<String> {
    let actual: Vec<String> = actual.iter().map(|i| i.trim().to_lowercase()).collect();
    expected
        .iter()
        .filter(|item| !actual.contains(&item.trim().to_lowercase()))
        .cloned()
        .collect()
}

/// Check `result` against everything `scenario` expects.
pub fn validate(scenario: &Scenario, result: &TestResult) -> Result<(), ValidationError> {
    // "success" also occurs inside "unsuccessful", so the loose match alone is not enough
    if scenario.is_login() && !result.is_login_success() {
        return Err(ValidationError::LoginNotSuccessful {
            actual: result.login_status.clone(),
        });
    }

    if let Some(expected) = scenario.expected_result.as_deref() {
        if !is_loosely_matched(expected, result) {
            return Err(ValidationError::ResultMismatch {
                expected: expected.to_string(),
                actual: result.free_text(),
            });
        }
    }

    if scenario.is_cart() {
        if result.cart_items.is_empty() {
            return Err(ValidationError::EmptyCart);
        }
        if let Some(expected) = scenario.expected_cart_items.as_deref() {
            let missing = missing_cart_items(expected, &result.cart_items);
            if !missing.is_empty() {
                return Err(ValidationError::MissingCartItems {
                    missing,
                    actual: result.cart_items.clone(),
                });
            }
        }
    }

    Ok(())
}
