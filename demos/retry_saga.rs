//! Retry Saga Example
//!
//! Demonstrates decorating a saga-style coroutine with retry and backoff:
//! - Default options: retry on `*_FAILURE` actions, 400ms doubling backoff
//! - Per-call override through `meta.retries`
//! - Debug instrumentation actions
//! - A custom stop condition that skips non-retryable statuses
//!
//! Run with: cargo run --example retry_saga

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use eddy::prelude::*;
use futures::FutureExt;
use serde_json::{json, Value};

/// Fetch a user and report the outcome as an action.
fn fetch_user(request: &Action) -> Gen<Effect, Value, (), String> {
    let id = request.payload()["id"].clone();
    Gen::new(move |co: Co<Effect, Value, String>| async move {
        match co.suspend(Effect::call("api.fetch_user", id)).await {
            Ok(user) => {
                co.suspend(Effect::put(Action::new("USER_FETCH_SUCCESS").with_payload(user)))
                    .await?
            }
            Err(status) => {
                co.suspend(Effect::put(
                    Action::new("USER_FETCH_FAILURE").with_payload(json!({ "status": status })),
                ))
                .await?
            }
        };
        Ok(())
    })
}

/// A runtime whose API fails the first `failures` calls with `status`.
fn flaky_api(failures: u32, status: &'static str) -> Runtime<String> {
    let remaining = Rc::new(Cell::new(failures));
    Runtime::new(move |handler: &str, args: Value| {
        let outcome = if remaining.get() > 0 {
            remaining.set(remaining.get() - 1);
            Err(status.to_string())
        } else {
            Ok(json!({ "id": args, "name": "Ada" }))
        };
        tracing::info!(handler, ok = outcome.is_ok(), "api call");
        async move { outcome }.boxed_local()
    })
}

fn print_dispatched(runtime: &mut Runtime<String>) {
    for action in runtime.take_dispatched() {
        println!("  dispatched {} {}", action.kind(), action.payload());
    }
}

// ==================== Default Options ====================

async fn example_defaults() {
    println!("\n=== Example 1: Defaults ===");

    let fetch = decorate(named("fetch_user", fetch_user), RetryOptions::<Effect>::default())
        .expect("default pattern compiles");
    let mut runtime = flaky_api(2, "503");

    let request = Action::new("USER_FETCH_REQUEST").with_payload(json!({ "id": 1 }));
    let started = tokio::time::Instant::now();
    let result = runtime.run(fetch.spawn(&request)).await;

    println!("  result {:?} after {:?}", result, started.elapsed());
    print_dispatched(&mut runtime);
}

// ==================== Per-call Override ====================

async fn example_override() {
    println!("\n=== Example 2: Per-call Override ===");

    let fetch =
        decorate(fetch_user, RetryOptions::<Effect>::default()).expect("default pattern compiles");
    let mut runtime = flaky_api(10, "503");

    let request = Action::new("USER_FETCH_REQUEST")
        .with_payload(json!({ "id": 2 }))
        .with_meta(json!({ "retries": 1 }));
    let result = runtime.run(fetch.spawn(&request)).await;

    println!("  result {:?}", result);
    print_dispatched(&mut runtime);
}

// ==================== Debug Instrumentation ====================

async fn example_debug() {
    println!("\n=== Example 3: Debug Instrumentation ===");

    let options = RetryOptions::<Effect>::default()
        .with_backoff(Backoff::constant(Duration::from_millis(50)))
        .with_debug(true);
    let fetch = decorate(fetch_user, options).expect("default pattern compiles");
    let mut runtime = flaky_api(2, "503");

    let request = Action::new("USER_FETCH_REQUEST").with_payload(json!({ "id": 3 }));
    let _ = runtime.run(fetch.spawn(&request)).await;

    print_dispatched(&mut runtime);
}

// ==================== Custom Condition ====================

async fn example_condition() {
    println!("\n=== Example 4: Custom Condition ===");

    let retryable = |effect: &Effect| {
        effect.emitted_action().is_some_and(|action| {
            action.kind().ends_with("_FAILURE")
                && !matches!(action.payload()["status"].as_str(), Some("401" | "404" | "500"))
        })
    };
    let options = RetryOptions::<Effect>::default().with_condition(retryable);
    let fetch = decorate(fetch_user, options).expect("conditions need no compilation");

    for status in ["404", "503"] {
        let mut runtime = flaky_api(1, status);
        let request = Action::new("USER_FETCH_REQUEST").with_payload(json!({ "id": 4 }));
        let _ = runtime.run(fetch.spawn(&request)).await;
        println!("  status {status}:");
        print_dispatched(&mut runtime);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    example_defaults().await;
    example_override().await;
    example_debug().await;
    example_condition().await;
}
