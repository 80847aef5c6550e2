use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::agent::{AutomationAgent, BrowserAgent};
use crate::browser::ChromeLauncher;
use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use crate::history::AgentHistory;
use crate::llm::ProviderChain;
use crate::result::TestResult;
use crate::scenario::{Scenario, ScenarioBook, LOGIN_SCENARIO};
use crate::session::{Session, SessionLauncher};
use crate::validate::validate;

/// File name of the most recent run's history, the report's default input.
pub const LATEST_HISTORY_FILE: &str = "agent_results.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    BrowserStarted,
    /// Terminal: never reverts for the lifetime of the orchestrator.
    LoggedIn,
}

/// Outcome of running and validating one scenario.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub scenario: String,
    pub outcome: Result<TestResult>,
}

impl ScenarioOutcome {
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Runs scenarios one after another in a single browser session, logging
/// in at most once before the first scenario that needs it.
///
/// Mutating methods take `&mut self`; scenarios cannot overlap.
pub struct TestOrchestrator<L, A>
where
    L: SessionLauncher,
    A: AutomationAgent<Session = L::Session>,
{
    launcher: L,
    agent: A,
    scenarios: ScenarioBook,
    history_dir: PathBuf,
    session: Option<L::Session>,
    state: SessionState,
    closed: bool,
}

impl TestOrchestrator<ChromeLauncher, BrowserAgent> {
    /// Chrome plus an LLM agent backed by every configured provider.
    pub fn from_config(config: &HarnessConfig, scenarios: ScenarioBook, headless: bool) -> Result<Self> {
        let llm = Arc::new(ProviderChain::from_config(config)?);
        let agent = BrowserAgent::new(llm, config.max_steps);
        let mut launcher = ChromeLauncher::new(&config.storefront_url).headless(headless);
        if let Some(path) = &config.chrome_path {
            launcher = launcher.chrome_path(path);
        }
        Ok(Self::new(launcher, agent, scenarios).history_dir(&config.history_dir))
    }
}

impl<L, A> TestOrchestrator<L, A>
where
    L: SessionLauncher,
    A: AutomationAgent<Session = L::Session>,
{
    pub fn new(launcher: L, agent: A, scenarios: ScenarioBook) -> Self {
        Self {
            launcher,
            agent,
            scenarios,
            history_dir: PathBuf::from("."),
            session: None,
            state: SessionState::Uninitialized,
            closed: false,
        }
    }

    /// Directory that receives the per-scenario history files.
    pub fn history_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.history_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_logged_in(&self) -> bool {
        self.state == SessionState::LoggedIn
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// Launch the browser unless a session already exists.
    pub async fn start_browser(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        if self.session.is_some() {
            return Ok(());
        }

        let session = self.launcher.launch().await?;
        self.session = Some(session);
        if self.state == SessionState::Uninitialized {
            self.state = SessionState::BrowserStarted;
        }
        tracing::info!("browser session started");
        Ok(())
    }

    /// Run one scenario and parse the agent's final answer.
    ///
    /// Non-login scenarios first run the login scenario unless the session is
    /// already logged in; a failed login fails this scenario without running it.
    pub async fn run_scenario(&mut self, name: &str) -> Result<TestResult> {
        let scenario = self.scenarios.get(name)?.clone();
        self.start_browser().await?;

        if !scenario.is_login() && !self.is_logged_in() {
            tracing::info!(scenario = %scenario.name, "logging in before scenario");
            self.ensure_login(&scenario.name).await?;
        }

        tracing::info!(scenario = %scenario.name, steps = scenario.steps.len(), "running scenario");
        let result = self.execute(&scenario).await?;
        if scenario.is_login() && result.is_login_success() {
            self.mark_logged_in();
        }
        Ok(result)
    }

    /// Run one scenario and check its result against the scenario's expectations.
    pub async fn run_and_validate(&mut self, name: &str) -> ScenarioOutcome {
        let outcome = match self.run_scenario(name).await {
            Ok(result) => {
                let checked = self
                    .scenarios
                    .get(name)
                    .and_then(|scenario| validate(scenario, &result).map_err(Error::from));
                checked.map(|_| result)
            }
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(_) => tracing::info!(scenario = name, "scenario passed"),
            Err(e) => tracing::error!(scenario = name, kind = ?e.kind(), "scenario failed: {e}"),
        }

        ScenarioOutcome {
            scenario: name.to_string(),
            outcome,
        }
    }

    /// Run every named scenario in order, then close the browser whatever happened.
    pub async fn run_suite<I, S>(mut self, names: I) -> Vec<ScenarioOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut outcomes = Vec::new();
        for name in names {
            outcomes.push(self.run_and_validate(name.as_ref()).await);
        }
        if let Err(e) = self.close().await {
            tracing::warn!("closing browser session failed: {e}");
        }
        outcomes
    }

    /// Release the browser session. Later calls are no-ops; later runs fail.
    pub async fn close(&mut self) -> Result<()> {
        self.closed = true;
        match self.session.take() {
            Some(session) => {
                session.close().await?;
                tracing::info!("browser session closed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn ensure_login(&mut self, requested: &str) -> Result<()> {
        let failed = |reason: String| Error::LoginFailed {
            scenario: requested.to_string(),
            reason,
        };

        let login = self
            .scenarios
            .get(LOGIN_SCENARIO)
            .map_err(|e| failed(e.to_string()))?
            .clone();

        match self.execute(&login).await {
            Ok(result) if result.is_login_success() => {
                self.mark_logged_in();
                Ok(())
            }
            Ok(result) => Err(failed(format!("login_status was '{}'", result.login_status))),
            Err(e) => Err(failed(e.to_string())),
        }
    }

    fn mark_logged_in(&mut self) {
        if self.state != SessionState::LoggedIn {
            tracing::info!("login successful; session will be reused");
        }
        self.state = SessionState::LoggedIn;
    }

    async fn execute(&self, scenario: &Scenario) -> Result<TestResult> {
        let session = self.session.as_ref().ok_or(Error::SessionClosed)?;
        let history = match self.agent.run(&scenario.task_description(), session).await {
            Ok(history) => history,
            Err(Error::RunAborted { history, source }) => {
                self.save_history(&scenario.name, &history);
                return Err(*source);
            }
            Err(e) => return Err(e),
        };
        self.save_history(&scenario.name, &history);

        let output = history.final_result().ok_or_else(|| {
            let last_error = history.errors().last().copied().unwrap_or("none").to_string();
            Error::Execution(format!(
                "agent stopped after {} steps without a final result (last error: {last_error})",
                history.history.len()
            ))
        })?;
        tracing::debug!(scenario = %scenario.name, output, "agent finished");
        TestResult::parse(output)
    }

    fn save_history(&self, scenario: &str, history: &AgentHistory) {
        let paths = [
            self.history_dir.join(history_file_name(scenario)),
            self.history_dir.join(LATEST_HISTORY_FILE),
        ];
        for path in paths {
            if let Err(e) = history.save_to_file(&path) {
                tracing::warn!(path = %path.display(), "could not write run history: {e}");
            }
        }
    }
}

impl<L, A> Drop for TestOrchestrator<L, A>
where
    L: SessionLauncher,
    A: AutomationAgent<Session = L::Session>,
{
    fn drop(&mut self) {
        if self.session.is_some() {
            tracing::warn!("orchestrator dropped without close(); browser session leaked");
        }
    }
}

/// `agent_results_<scenario>.json`, with the name reduced to `[a-z0-9_]`.
pub fn history_file_name(scenario: &str) -> String {
    let slug: String = scenario
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("agent_results_{slug}.json")
}
