pub mod agent;
pub mod browser;
pub mod config;
pub mod element;
pub mod error;
pub mod history;
pub mod llm;
pub mod orchestrator;
pub mod page;
pub mod report;
pub mod result;
pub mod scenario;
pub mod session;
pub mod validate;

pub use agent::{AgentAction, AutomationAgent, BrowserAgent};
pub use browser::{AgenticBrowser, BrowserSession, ChromeLauncher};
pub use config::{BrowserConfig, HarnessConfig};
pub use error::{Error, ErrorKind, Result};
pub use history::AgentHistory;
pub use orchestrator::{ScenarioOutcome, SessionState, TestOrchestrator};
pub use page::{Page, PageControl};
pub use result::TestResult;
pub use scenario::{Scenario, ScenarioBook};
pub use session::{Session, SessionLauncher};
pub use validate::{is_loosely_matched, missing_cart_items, validate, ValidationError};
