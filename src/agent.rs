use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::browser::BrowserSession;
use crate::error::{Error, Result};
use crate::history::{ActionResult, AgentBrain, AgentHistory, HistoryEntry, ModelOutput, PageState, StepMetadata};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::page::{index_selector, PageControl};
use crate::result::{output_schema, strip_code_fence, truncate};
use crate::session::Session;

const MAX_OBSERVATION_CHARS: usize = 12_000;
const MAX_EXTRACT_CHARS: usize = 4_000;
const DEFAULT_SCROLL_PIXELS: u32 = 600;
const DEFAULT_MAX_FAILURES: usize = 3;

/// Carries out a natural-language task against a live session.
///
/// A run that stops without a terminal answer still returns its history;
/// callers check [`AgentHistory::final_result`].
#[async_trait]
pub trait AutomationAgent: Send + Sync {
    type Session: Session;

    async fn run(&self, task: &str, session: &Self::Session) -> Result<AgentHistory>;
}

/// One browser action chosen by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentAction {
    GoToUrl { url: String },
    Click { index: u32 },
    InputText { index: u32, text: String },
    ExtractText,
    ScrollDown { pixels: Option<u32> },
    GoBack,
    /// Finish the task. `text` is the final answer, a string or a JSON object.
    Done { text: serde_json::Value },
}

#[derive(Debug, Clone, Deserialize)]
struct AgentReply {
    #[serde(default)]
    current_state: AgentBrain,
    action: AgentAction,
}

fn parse_reply(raw: &str) -> Result<AgentReply> {
    serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| Error::Execution(format!("model reply is not a valid action: {e}")))
}

fn done_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Record the step that hit `error` and hand back everything recorded so far.
fn aborted(
    mut history: AgentHistory,
    step_number: usize,
    step_start_time: f64,
    state: PageState,
    error: Error,
) -> Error {
    tracing::warn!(step_number, "agent run aborted: {error}");
    history.push(HistoryEntry {
        model_output: None,
        result: vec![ActionResult {
            is_done: false,
            extracted_content: None,
            error: Some(error.to_string()),
        }],
        state,
        metadata: Some(StepMetadata {
            step_number,
            step_start_time,
            step_end_time: now_secs(),
        }),
    });
    Error::RunAborted {
        history: Box::new(history),
        source: Box::new(error),
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

fn system_prompt() -> String {
    format!(
        r#"You control a web browser to complete a test task on an online store.
Each turn you see the current URL, title and a list of interactive elements written as [index]<tag> label.
Reply with exactly one JSON object:
{{"current_state": {{"evaluation_previous_goal": "...", "memory": "...", "next_goal": "..."}}, "action": ACTION}}
ACTION is one of:
{{"go_to_url": {{"url": "..."}}}}
{{"click": {{"index": N}}}}
{{"input_text": {{"index": N, "text": "..."}}}}
{{"extract_text": null}}
{{"scroll_down": {{"pixels": N}}}}
{{"go_back": null}}
{{"done": {{"text": RESULT}}}}
When every step is finished, or cannot be finished, use done. RESULT must be a JSON object matching this schema, using "N/A" for fields the task does not cover:
{schema}"#,
        schema = output_schema()
    )
}

/// LLM-driven observe/act loop over a single page.
pub struct BrowserAgent {
    llm: Arc<dyn LlmProvider>,
    max_steps: usize,
    max_failures: usize,
}

impl BrowserAgent {
    pub fn new(llm: Arc<dyn LlmProvider>, max_steps: usize) -> Self {
        Self {
            llm,
            max_steps,
            max_failures: DEFAULT_MAX_FAILURES,
        }
    }

    /// Stop after this many consecutive failed steps.
    pub fn max_failures(mut self, max_failures: usize) -> Self {
        self.max_failures = max_failures.max(1);
        self
    }

    async fn observe<P: PageControl + ?Sized>(page: &P) -> Result<(PageState, String)> {
        let state = PageState {
            url: page.url().await.unwrap_or_default(),
            title: page.title().await.unwrap_or_default(),
        };
        let tree = page.interactive_tree().await?;
        Ok((state, truncate(&tree, MAX_OBSERVATION_CHARS)))
    }

    fn request(&self, task: &str, notes: &[String], state: &PageState, tree: &str) -> CompletionRequest {
        let mut prompt = format!("Task:\n{task}\n");
        if !notes.is_empty() {
            prompt.push_str("\nPrevious steps:\n");
            for note in notes {
                prompt.push_str(note);
                prompt.push('\n');
            }
        }
        prompt.push_str(&format!(
            "\nCurrent URL: {}\nTitle: {}\nInteractive elements:\n{tree}",
            state.url, state.title
        ));

        let mut request =
            CompletionRequest::new(vec![ChatMessage::system(system_prompt()), ChatMessage::user(prompt)]).json();
        request.temperature = Some(0.0);
        request
    }

    async fn execute<P: PageControl + ?Sized>(page: &P, action: &AgentAction) -> ActionResult {
        let outcome = match action {
            AgentAction::GoToUrl { url } => page.goto(url).await.map(|_| format!("navigated to {url}")),
            AgentAction::Click { index } => page
                .click(&index_selector(*index))
                .await
                .map(|_| format!("clicked element {index}")),
            AgentAction::InputText { index, text } => page
                .type_text(&index_selector(*index), text)
                .await
                .map(|_| format!("typed '{text}' into element {index}")),
            AgentAction::ExtractText => page
                .visible_text()
                .await
                .map(|text| truncate(&text, MAX_EXTRACT_CHARS)),
            AgentAction::ScrollDown { pixels } => {
                let pixels = pixels.unwrap_or(DEFAULT_SCROLL_PIXELS);
                page.scroll_down(pixels)
                    .await
                    .map(|_| format!("scrolled down {pixels}px"))
            }
            AgentAction::GoBack => page.go_back().await.map(|_| "navigated back".to_string()),
            AgentAction::Done { text } => {
                return ActionResult {
                    is_done: true,
                    extracted_content: Some(done_text(text)),
                    error: None,
                }
            }
        };

        match outcome {
            Ok(content) => ActionResult {
                is_done: false,
                extracted_content: Some(content),
                error: None,
            },
            Err(e) => ActionResult {
                is_done: false,
                extracted_content: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Drive `page` until the model answers `done` or the run hits its step
    /// or failure limit.
    ///
    /// A page or backend error ends the run with [`Error::RunAborted`], which
    /// carries the steps recorded so far.
    pub async fn drive<P>(&self, task: &str, page: &P) -> Result<AgentHistory>
    where
        P: PageControl + ?Sized,
    {
        let mut history = AgentHistory::default();
        let mut notes: Vec<String> = Vec::new();
        let mut failures = 0;

        for step_number in 1..=self.max_steps {
            let step_start_time = now_secs();
            let (state, tree) = match Self::observe(page).await {
                Ok(observed) => observed,
                Err(e) => {
                    return Err(aborted(history, step_number, step_start_time, PageState::default(), e))
                }
            };
            let raw = match self.llm.complete(&self.request(task, &notes, &state, &tree)).await {
                Ok(raw) => raw,
                Err(e) => return Err(aborted(history, step_number, step_start_time, state, e)),
            };

            let (model_output, result) = match parse_reply(&raw) {
                Ok(reply) => {
                    tracing::debug!(step_number, goal = %reply.current_state.next_goal, "agent step");
                    let result = Self::execute(page, &reply.action).await;
                    let output = ModelOutput {
                        current_state: reply.current_state,
                        action: serde_json::to_value(&reply.action).into_iter().collect(),
                    };
                    (Some(output), result)
                }
                Err(e) => (
                    None,
                    ActionResult {
                        is_done: false,
                        extracted_content: None,
                        error: Some(e.to_string()),
                    },
                ),
            };

            let goal = model_output
                .as_ref()
                .map(|o| o.current_state.next_goal.clone())
                .unwrap_or_default();
            notes.push(match (&result.error, &result.extracted_content) {
                (Some(err), _) => format!("{step_number}. {goal} -> error: {err}"),
                (None, Some(content)) => format!("{step_number}. {goal} -> {}", truncate(content, 300)),
                (None, None) => format!("{step_number}. {goal}"),
            });

            if result.error.is_some() {
                failures += 1;
            } else {
                failures = 0;
            }
            let is_done = result.is_done;

            history.push(HistoryEntry {
                model_output,
                result: vec![result],
                state,
                metadata: Some(StepMetadata {
                    step_number,
                    step_start_time,
                    step_end_time: now_secs(),
                }),
            });

            if is_done {
                return Ok(history);
            }
            if failures >= self.max_failures {
                tracing::warn!(failures, "agent stopping after consecutive failures");
                return Ok(history);
            }
        }

        tracing::warn!(max_steps = self.max_steps, "agent reached step limit");
        Ok(history)
    }
}

#[async_trait]
impl AutomationAgent for BrowserAgent {
    type Session = BrowserSession;

    async fn run(&self, task: &str, session: &BrowserSession) -> Result<AgentHistory> {
        self.drive(task, session.page()).await
    }
}
