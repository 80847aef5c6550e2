use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Observable outcome of one scenario run, as reported by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub login_status: String,
    #[serde(default)]
    pub cart_items: Vec<String>,
    pub checkout_status: String,
    pub total_update_status: String,
    pub delivery_location_status: String,
    pub confirmation_message: String,
}

impl TestResult {
    /// Parse the agent's terminal output. A surrounding markdown code fence is ignored.
    pub fn parse(output: &str) -> Result<Self> {
        serde_json::from_str(strip_code_fence(output))
            .map_err(|e| Error::UnparseableResult(format!("{e}: {}", truncate(output, 200))))
    }

    /// Lowercased concatenation of the free-text status fields.
    pub fn free_text(&self) -> String {
        [
            self.login_status.as_str(),
            self.checkout_status.as_str(),
            self.confirmation_message.as_str(),
        ]
        .join(" ")
        .to_lowercase()
    }

    pub fn is_login_success(&self) -> bool {
        self.login_status.trim().to_lowercase().starts_with("success")
    }
}

/// JSON schema handed to the agent so its final answer matches [`TestResult`].
pub fn output_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "login_status": { "type": "string" },
            "cart_items": { "type": "array", "items": { "type": "string" } },
            "checkout_status": { "type": "string" },
            "total_update_status": { "type": "string" },
            "delivery_location_status": { "type": "string" },
            "confirmation_message": { "type": "string" }
        },
        "required": [
            "login_status",
            "checkout_status",
            "total_update_status",
            "delivery_location_status",
            "confirmation_message"
        ]
    })
}

pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop an optional language tag on the opening fence line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{
        "login_status": "Success",
        "checkout_status": "Completed",
        "total_update_status": "Updated",
        "delivery_location_status": "Set",
        "confirmation_message": "Your Order has been successfully placed."
    }"#;

    #[test]
    fn cart_items_default_to_empty() {
        let result = TestResult::parse(RECORD).unwrap();
        assert!(result.cart_items.is_empty());
        assert!(result.is_login_success());
    }

    #[test]
    fn parses_fenced_output() {
        let fenced = format!("```json\n{RECORD}\n```");
        let result = TestResult::parse(&fenced).unwrap();
        assert_eq!(result.checkout_status, "Completed");
    }

    #[test]
    fn missing_required_field_is_unparseable() {
        let err = TestResult::parse(r#"{"login_status": "Success"}"#).unwrap_err();
        assert!(matches!(err, Error::UnparseableResult(_)));
    }

    #[test]
    fn unsuccessful_login_is_not_success() {
        let mut result = TestResult::parse(RECORD).unwrap();
        result.login_status = "Unsuccessful".into();
        assert!(!result.is_login_success());
    }
}
