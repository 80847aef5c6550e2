mod common;

use common::*;
use storefront_harness::orchestrator::LATEST_HISTORY_FILE;
use storefront_harness::{
    AgentHistory, Error, ErrorKind, SessionState, TestOrchestrator, TestResult, ValidationError,
};
use tempfile::TempDir;

fn happy_agent() -> ScriptedAgent {
    ScriptedAgent::new(vec![
        (LOGIN_MARK, Reply::Done(record("Success", &[], "N/A", "Logged in"))),
        (
            CART_MARK,
            Reply::Done(record("Success", &["iPhone X", "Samsung Note 8"], "N/A", "N/A")),
        ),
        (
            CHECKOUT_MARK,
            Reply::Done(record("Success", &[], "Completed", "Your order has been placed")),
        ),
    ])
}

type Harness = TestOrchestrator<FakeLauncher, ScriptedAgent>;

fn orchestrator(agent: ScriptedAgent) -> (Harness, Counters, TempDir) {
    let counters = Counters::default();
    let launcher = FakeLauncher {
        counters: counters.clone(),
    };
    let dir = tempfile::tempdir().unwrap();
    let orch = TestOrchestrator::new(launcher, agent, book()).history_dir(dir.path());
    (orch, counters, dir)
}

#[tokio::test]
async fn start_browser_is_idempotent() {
    let (mut orch, counters, _dir) = orchestrator(happy_agent());
    assert_eq!(orch.state(), SessionState::Uninitialized);

    orch.start_browser().await.unwrap();
    orch.start_browser().await.unwrap();

    assert_eq!(counters.launches(), 1);
    assert_eq!(orch.state(), SessionState::BrowserStarted);
    orch.close().await.unwrap();
}

#[tokio::test]
async fn non_login_scenario_logs_in_first_and_only_once() {
    let (mut orch, counters, _dir) = orchestrator(happy_agent());

    let cart = orch.run_scenario("cart").await.unwrap();
    assert_eq!(cart.cart_items, vec!["iPhone X", "Samsung Note 8"]);
    assert!(orch.is_logged_in());

    orch.run_scenario("checkout").await.unwrap();
    assert_eq!(
        orch.agent().called_marks(),
        vec![LOGIN_MARK, CART_MARK, CHECKOUT_MARK]
    );
    assert_eq!(counters.launches(), 1);
    orch.close().await.unwrap();
}

#[tokio::test]
async fn explicit_login_satisfies_the_precondition() {
    let (mut orch, _, _dir) = orchestrator(happy_agent());

    let login = orch.run_scenario("LOGIN").await.unwrap();
    assert!(login.is_login_success());
    assert_eq!(orch.state(), SessionState::LoggedIn);

    orch.run_scenario("cart").await.unwrap();
    assert_eq!(orch.agent().called_marks(), vec![LOGIN_MARK, CART_MARK]);
    orch.close().await.unwrap();
}

#[tokio::test]
async fn failed_login_short_circuits_the_requested_scenario() {
    let agent = ScriptedAgent::new(vec![
        (LOGIN_MARK, Reply::Done(record("Failed", &[], "N/A", "Bad password"))),
        (CART_MARK, Reply::Done(record("Success", &["iPhone X"], "N/A", "N/A"))),
    ]);
    let (mut orch, _, _dir) = orchestrator(agent);

    let err = orch.run_scenario("cart").await.unwrap_err();
    assert!(matches!(err, Error::LoginFailed { ref scenario, .. } if scenario == "cart"));
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(orch.agent().called_marks(), vec![LOGIN_MARK]);
    assert_eq!(orch.state(), SessionState::BrowserStarted);
    orch.close().await.unwrap();
}

#[tokio::test]
async fn unparseable_login_output_is_a_login_failure() {
    let agent = ScriptedAgent::new(vec![(LOGIN_MARK, Reply::Done("I think it worked".into()))]);
    let (mut orch, _, _dir) = orchestrator(agent);

    let err = orch.run_scenario("checkout").await.unwrap_err();
    assert!(matches!(err, Error::LoginFailed { .. }));
    assert!(!orch.is_logged_in());
    orch.close().await.unwrap();
}

#[tokio::test]
async fn logged_in_state_survives_later_failures() {
    let agent = ScriptedAgent::new(vec![
        (LOGIN_MARK, Reply::Done(record("Success", &[], "N/A", "N/A"))),
        (CART_MARK, Reply::Fail),
        (CHECKOUT_MARK, Reply::Done(record("Failed", &[], "N/A", "N/A"))),
    ]);
    let (mut orch, _, _dir) = orchestrator(agent);

    let err = orch.run_scenario("cart").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert!(orch.is_logged_in());

    // a later record reporting a failed login does not log the session out
    orch.run_scenario("checkout").await.unwrap();
    assert!(orch.is_logged_in());
    orch.close().await.unwrap();
}

#[tokio::test]
async fn unfinished_agent_run_is_an_execution_error() {
    let agent = ScriptedAgent::new(vec![
        (LOGIN_MARK, Reply::Done(record("Success", &[], "N/A", "N/A"))),
        (CHECKOUT_MARK, Reply::Unfinished),
    ]);
    let (mut orch, _, _dir) = orchestrator(agent);

    let err = orch.run_scenario("checkout").await.unwrap_err();
    assert!(matches!(err, Error::Execution(_)));
    orch.close().await.unwrap();
}

#[tokio::test]
async fn unknown_scenario_is_a_configuration_error() {
    let (mut orch, counters, _dir) = orchestrator(happy_agent());

    let err = orch.run_scenario("wishlist").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(counters.launches(), 0);
    orch.close().await.unwrap();
}

#[tokio::test]
async fn missing_cart_item_fails_validation() {
    let agent = ScriptedAgent::new(vec![
        (LOGIN_MARK, Reply::Done(record("Success", &[], "N/A", "N/A"))),
        (CART_MARK, Reply::Done(record("Success", &["iPhone X"], "N/A", "N/A"))),
    ]);
    let (mut orch, _, _dir) = orchestrator(agent);

    let outcome = orch.run_and_validate("cart").await;
    assert!(!outcome.passed());
    match outcome.outcome {
        Err(Error::Validation(ValidationError::MissingCartItems { missing, actual })) => {
            assert_eq!(missing, vec!["Samsung Note 8"]);
            assert_eq!(actual, vec!["iPhone X"]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    orch.close().await.unwrap();
}

#[tokio::test]
async fn run_suite_closes_the_session_even_after_failures() {
    let agent = ScriptedAgent::new(vec![(LOGIN_MARK, Reply::Fail)]);
    let (orch, counters, _dir) = orchestrator(agent);

    let outcomes = orch.run_suite(["cart", "checkout"]).await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| !o.passed()));
    assert_eq!(counters.launches(), 1);
    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn run_suite_passes_the_happy_path() {
    let (orch, counters, _dir) = orchestrator(happy_agent());

    let outcomes = orch.run_suite(["login", "cart", "checkout"]).await;

    for outcome in &outcomes {
        assert!(outcome.passed(), "{}: {:?}", outcome.scenario, outcome.outcome);
    }
    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn closed_orchestrator_refuses_new_runs() {
    let (mut orch, counters, _dir) = orchestrator(happy_agent());
    orch.start_browser().await.unwrap();
    orch.close().await.unwrap();
    orch.close().await.unwrap();

    let err = orch.run_scenario("login").await.unwrap_err();
    assert!(matches!(err, Error::SessionClosed));
    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn writes_per_scenario_and_latest_history() {
    let (mut orch, _, dir) = orchestrator(happy_agent());

    orch.run_scenario("cart").await.unwrap();
    orch.close().await.unwrap();

    assert!(dir.path().join("agent_results_login.json").exists());
    assert!(dir.path().join("agent_results_cart.json").exists());
    let latest = AgentHistory::load_from_file(dir.path().join(LATEST_HISTORY_FILE)).unwrap();
    let cart: TestResult = serde_json::from_str(latest.final_result().unwrap()).unwrap();
    assert_eq!(cart.cart_items.len(), 2);
}

#[tokio::test]
async fn explicit_login_reporting_unsuccessful_fails() {
    let agent = ScriptedAgent::new(vec![(
        LOGIN_MARK,
        Reply::Done(record("Unsuccessful", &[], "N/A", "Login unsuccessful")),
    )]);
    let (orch, counters, _dir) = orchestrator(agent);

    let outcomes = orch.run_suite(["login"]).await;

    assert!(!outcomes[0].passed());
    assert!(matches!(
        outcomes[0].outcome,
        Err(Error::Validation(ValidationError::LoginNotSuccessful { ref actual })) if actual == "Unsuccessful"
    ));
    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn aborted_run_still_writes_its_history() {
    let agent = ScriptedAgent::new(vec![
        (LOGIN_MARK, Reply::Done(record("Success", &[], "N/A", "N/A"))),
        (CHECKOUT_MARK, Reply::Abort("openai: connection reset".into())),
    ]);
    let (mut orch, _, dir) = orchestrator(agent);

    let err = orch.run_scenario("checkout").await.unwrap_err();
    assert!(matches!(err, Error::BackendsExhausted(_)));
    assert_eq!(err.kind(), ErrorKind::Backend);

    let latest = AgentHistory::load_from_file(dir.path().join(LATEST_HISTORY_FILE)).unwrap();
    assert_eq!(latest.history.len(), 2);
    assert_eq!(latest.errors(), vec!["openai: connection reset"]);
    assert!(dir.path().join("agent_results_checkout.json").exists());
    orch.close().await.unwrap();
}
