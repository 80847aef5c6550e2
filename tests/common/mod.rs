#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use storefront_harness::history::{ActionResult, AgentHistory, HistoryEntry, StepMetadata};
use storefront_harness::scenario::{Scenario, ScenarioBook};
use storefront_harness::{AutomationAgent, Error, Result, Session, SessionLauncher};

pub const LOGIN_MARK: &str = "LOGIN-STEP";
pub const CART_MARK: &str = "CART-STEP";
pub const CHECKOUT_MARK: &str = "CHECKOUT-STEP";

#[derive(Clone, Default)]
pub struct Counters {
    pub launches: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl Counters {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct FakeSession {
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Session for FakeSession {
    async fn close(self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeLauncher {
    pub counters: Counters,
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self) -> Result<FakeSession> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession {
            closes: Arc::clone(&self.counters.closes),
        })
    }
}

#[derive(Clone)]
pub enum Reply {
    Done(String),
    Unfinished,
    Fail,
    /// The run stops on a backend error after one recorded step.
    Abort(String),
}

/// Answers each task according to the first marker the task text contains.
pub struct ScriptedAgent {
    replies: Vec<(&'static str, Reply)>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedAgent {
    pub fn new(replies: Vec<(&'static str, Reply)>) -> Self {
        Self {
            replies,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Markers of the tasks run so far, in order.
    pub fn called_marks(&self) -> Vec<&'static str> {
        let calls = self.calls.lock().unwrap();
        calls
            .iter()
            .filter_map(|task| {
                self.replies
                    .iter()
                    .map(|(mark, _)| *mark)
                    .find(|mark| task.contains(mark))
            })
            .collect()
    }
}

#[async_trait]
impl AutomationAgent for ScriptedAgent {
    type Session = FakeSession;

    async fn run(&self, task: &str, _session: &FakeSession) -> Result<AgentHistory> {
        self.calls.lock().unwrap().push(task.to_string());
        let reply = self
            .replies
            .iter()
            .find(|(mark, _)| task.contains(mark))
            .map(|(_, reply)| reply.clone())
            .unwrap_or(Reply::Fail);

        match reply {
            Reply::Done(output) => Ok(history(vec![step(1, false, "clicked"), step(2, true, &output)])),
            Reply::Unfinished => Ok(history(vec![step(1, false, "clicked")])),
            Reply::Fail => Err(Error::Execution("agent crashed".into())),
            Reply::Abort(message) => Err(Error::RunAborted {
                history: Box::new(history(vec![step(1, false, "clicked"), failed_step(2, &message)])),
                source: Box::new(Error::BackendsExhausted(message)),
            }),
        }
    }
}

fn step(number: usize, is_done: bool, content: &str) -> HistoryEntry {
    HistoryEntry {
        result: vec![ActionResult {
            is_done,
            extracted_content: Some(content.to_string()),
            error: None,
        }],
        metadata: Some(StepMetadata {
            step_number: number,
            step_start_time: 1_700_000_000.0,
            step_end_time: 1_700_000_001.0,
        }),
        ..Default::default()
    }
}

fn failed_step(number: usize, error: &str) -> HistoryEntry {
    HistoryEntry {
        result: vec![ActionResult {
            is_done: false,
            extracted_content: None,
            error: Some(error.to_string()),
        }],
        metadata: Some(StepMetadata {
            step_number: number,
            step_start_time: 1_700_000_002.0,
            step_end_time: 1_700_000_003.0,
        }),
        ..Default::default()
    }
}

fn history(entries: Vec<HistoryEntry>) -> AgentHistory {
    let mut history = AgentHistory::default();
    for entry in entries {
        history.push(entry);
    }
    history
}

pub fn record(login: &str, cart_items: &[&str], checkout: &str, confirmation: &str) -> String {
    serde_json::json!({
        "login_status": login,
        "cart_items": cart_items,
        "checkout_status": checkout,
        "total_update_status": "N/A",
        "delivery_location_status": "N/A",
        "confirmation_message": confirmation,
    })
    .to_string()
}

pub fn book() -> ScenarioBook {
    ScenarioBook::new(vec![
        Scenario::new("login", vec![format!("{LOGIN_MARK} sign in")]).expect_result("success"),
        Scenario::new("cart", vec![format!("{CART_MARK} add phones")])
            .expect_cart_items(["iPhone X", "Samsung Note 8"]),
        Scenario::new("checkout", vec![format!("{CHECKOUT_MARK} place order")])
            .expect_result("completed"),
    ])
}
