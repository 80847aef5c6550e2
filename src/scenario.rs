use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::config::Credentials;
use crate::error::{Error, Result};

pub const LOGIN_SCENARIO: &str = "login";
pub const CART_SCENARIO: &str = "cart";
pub const CHECKOUT_SCENARIO: &str = "checkout";

/// A named, ordered list of natural-language UI steps plus what it should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<String>,
    pub expected_result: Option<String>,
    pub expected_cart_items: Option<Vec<String>>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            name: name.into(),
            steps,
            expected_result: None,
            expected_cart_items: None,
        }
    }

    pub fn expect_result(mut self, expected: impl Into<String>) -> Self {
        self.expected_result = Some(expected.into());
        self
    }

    pub fn expect_cart_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_cart_items = Some(items.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_login(&self) -> bool {
        names_match(&self.name, LOGIN_SCENARIO)
    }

    pub fn is_cart(&self) -> bool {
        names_match(&self.name, CART_SCENARIO)
    }

    /// All steps as one numbered task text for the agent.
    pub fn task_description(&self) -> String {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. {}", i + 1, step.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn names_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Every scenario known to one process run, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ScenarioBook {
    scenarios: Vec<Scenario>,
}

impl ScenarioBook {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        let mut book = Self::default();
        for scenario in scenarios {
            book.insert(scenario);
        }
        book
    }

    /// Replace any scenario with the same name.
    pub fn insert(&mut self, scenario: Scenario) {
        self.scenarios.retain(|s| !names_match(&s.name, &scenario.name));
        self.scenarios.push(scenario);
    }

    pub fn get(&self, name: &str) -> Result<&Scenario> {
        self.scenarios
            .iter()
            .find(|s| names_match(&s.name, name))
            .ok_or_else(|| Error::UnknownScenario(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenarios.iter().map(|s| s.name.as_str())
    }

    /// The login, cart and checkout flows for the demo storefront at `base_url`.
    pub fn builtin(base_url: &str, credentials: &Credentials) -> Self {
        let login = Scenario::new(
            LOGIN_SCENARIO,
            vec![
                format!("Open {base_url}"),
                "Click the 'Sign In' button in the header".into(),
                format!("Choose '{}' as the username", credentials.username),
                format!("Choose '{}' as the password", credentials.password),
                "Click the 'Log In' button".into(),
                format!(
                    "Confirm the header shows '{}'. Set login_status to 'Success' if it does, otherwise 'Failed'",
                    credentials.username
                ),
            ],
        )
        .expect_result("success");

        let cart = Scenario::new(
            CART_SCENARIO,
            vec![
                format!("Open {base_url} if the product list is not already shown"),
                "Add 'iPhone X' to the cart".into(),
                "Add 'Samsung Note 8' to the cart".into(),
                "Open the cart".into(),
                "List the name of every product in the cart as cart_items".into(),
            ],
        )
        .expect_cart_items(["iPhone X", "Samsung Note 8"]);

        let checkout = Scenario::new(
            CHECKOUT_SCENARIO,
            vec![
                "Open the cart and click 'Checkout'".into(),
                "Fill the shipping form with First Name 'Test', Last Name 'User', Address '1 Main Street', State 'California', Postal Code '94016'".into(),
                "Click 'Submit'".into(),
                "Read the confirmation message".into(),
                "Set checkout_status to 'Completed' if the order was placed, otherwise 'Failed'".into(),
            ],
        )
        .expect_result("completed");

        Self::new(vec![login, cart, checkout])
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_csv_reader(file)
    }

    /// Load scenarios from CSV rows, one step per row, grouped by `Test Name`
    /// in order of first appearance.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut scenarios: Vec<Scenario> = Vec::new();

        for row in csv_reader.deserialize::<StepRow>() {
            let row = row?;
            let name = row.test_name.trim();
            if name.is_empty() {
                continue;
            }

            let idx = match scenarios.iter().position(|s| names_match(&s.name, name)) {
                Some(idx) => idx,
                None => {
                    scenarios.push(Scenario::new(name, Vec::new()));
                    scenarios.len() - 1
                }
            };
            let scenario = &mut scenarios[idx];

            if !row.step_description.trim().is_empty() {
                scenario.steps.push(row.step_description.trim().to_string());
            }
            if scenario.expected_result.is_none() {
                scenario.expected_result = non_empty(row.expected_result);
            }
            if scenario.expected_cart_items.is_none() {
                scenario.expected_cart_items = non_empty(row.expected_cart_items).map(|items| {
                    items
                        .split(", ")
                        .map(|item| item.trim().to_string())
                        .filter(|item| !item.is_empty())
                        .collect()
                });
            }
        }

        tracing::debug!(count = scenarios.len(), "loaded scenarios from csv");
        Ok(Self::new(scenarios))
    }
}

#[derive(Debug, Deserialize)]
struct StepRow {
    #[serde(rename = "Test Name")]
    test_name: String,
    #[serde(rename = "Step Description", default)]
    step_description: String,
    #[serde(rename = "Expected Result", default)]
    expected_result: Option<String>,
    #[serde(rename = "Expected Cart Items", default)]
    expected_cart_items: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
