//! Behavioral tests for decorated coroutines.

use super::*;
use crate::coroutine::{Co, Coroutine, CoroutineFactory, Gen, Step};
use crate::effect::{Action, Effect, HostEffect, RETRY_ACTION_TYPE};
use crate::testing::Recorder;
use crate::{assert_completed, assert_failed};
use serde_json::{json, Value};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

type Saga = Gen<Effect, Value, &'static str, String>;

/// Calls `fetch`, then reports the outcome as `FETCH_SUCCESS` or `FETCH_FAILURE`.
fn fetch_saga(_: &Action) -> Saga {
    Gen::new(|co: Co<Effect, Value, String>| async move {
        match co.suspend(Effect::call("fetch", json!(null))).await {
            Ok(data) => {
                co.suspend(Effect::put(Action::new("FETCH_SUCCESS").with_payload(data)))
                    .await?;
                Ok("success")
            }
            Err(e) => {
                co.suspend(Effect::put(Action::new("FETCH_FAILURE").with_payload(json!(e))))
                    .await?;
                Ok("failure")
            }
        }
    })
}

fn always_failing() -> Recorder<Effect, Value, String> {
    Recorder::new(|effect: &Effect| match effect {
        Effect::Call { .. } => Err("503".to_string()),
        _ => Ok(Value::Null),
    })
}

/// Fails the first `failures` calls, then succeeds.
fn flaky(failures: u32) -> Recorder<Effect, Value, String> {
    let mut seen = 0;
    Recorder::new(move |effect: &Effect| match effect {
        Effect::Call { .. } => {
            seen += 1;
            if seen <= failures {
                Err("503".to_string())
            } else {
                Ok(json!({ "ok": true }))
            }
        }
        _ => Ok(Value::Null),
    })
}

fn millis(values: &[u64]) -> Vec<Duration> {
    values.iter().copied().map(Duration::from_millis).collect()
}

#[test]
fn test_exhausted_retries_with_defaults() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
    let recording = always_failing().run(retrying.spawn(&Action::new("FETCH")));

    assert_eq!(recording.calls("fetch"), 4);
    assert_eq!(recording.delays(), millis(&[400, 800, 1600]));
    assert_eq!(recording.action_types(), vec!["FETCH_FAILURE"]);
    assert_completed!(recording, "failure");
}

#[test]
fn test_delay_follows_each_intercepted_failure() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
    let recording = always_failing().run(retrying.spawn(&Action::new("FETCH")));

    let fetch = Effect::call("fetch", json!(null));
    let failure = Effect::put(Action::new("FETCH_FAILURE").with_payload(json!("503")));
    assert_eq!(
        recording.effects,
        vec![
            fetch.clone(),
            Effect::delay(Duration::from_millis(400)),
            fetch.clone(),
            Effect::delay(Duration::from_millis(800)),
            fetch.clone(),
            Effect::delay(Duration::from_millis(1600)),
            fetch,
            failure,
        ]
    );
}

#[test]
fn test_succeeds_after_transient_failures() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
    let recording = flaky(2).run(retrying.spawn(&Action::new("FETCH")));

    assert_eq!(recording.calls("fetch"), 3);
    assert_eq!(recording.delays(), millis(&[400, 800]));
    assert_eq!(recording.action_types(), vec!["FETCH_SUCCESS"]);
    assert_completed!(recording, "success");
}

#[test]
fn test_first_attempt_success_is_transparent() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
    let action = Action::new("FETCH");

    let decorated = flaky(0).run(retrying.spawn(&action));
    let plain = flaky(0).run(fetch_saga(&action));

    assert_eq!(decorated, plain);
}

#[test]
fn test_per_call_override_applies_to_that_call_only() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();

    let boosted = Action::new("FETCH").with_meta(json!({ "retries": 4 }));
    let recording = always_failing().run(retrying.spawn(&boosted));
    assert_eq!(recording.calls("fetch"), 5);
    assert_eq!(recording.delays(), millis(&[400, 800, 1600, 3200]));

    let recording = always_failing().run(retrying.spawn(&Action::new("FETCH")));
    assert_eq!(recording.calls("fetch"), 4);
}

#[test]
fn test_zero_override_runs_once_without_interception() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
    let action = Action::new("FETCH").with_meta(json!({ "retries": 0 }));

    let recording = always_failing().run(retrying.spawn(&action));

    assert_eq!(recording.calls("fetch"), 1);
    assert!(recording.delays().is_empty());
    assert_eq!(recording.action_types(), vec!["FETCH_FAILURE"]);
}

#[test]
fn test_negative_override_behaves_like_zero() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
    let action = Action::new("FETCH").with_meta(json!({ "retries": -3 }));

    let recording = always_failing().run(retrying.spawn(&action));

    assert_eq!(recording.calls("fetch"), 1);
    assert!(recording.delays().is_empty());
}

#[test]
fn test_configured_max_attempts() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default().with_max_attempts(1)).unwrap();
    let recording = always_failing().run(retrying.spawn(&Action::new("FETCH")));

    assert_eq!(recording.calls("fetch"), 2);
    assert_eq!(recording.delays(), millis(&[400]));
}

#[test]
fn test_application_error_is_not_retried() {
    let crashing = |_: &()| {
        Gen::new(|co: Co<Effect, Value, String>| async move {
            co.suspend(Effect::call("fetch", json!(null))).await?;
            Ok(())
        })
    };
    let retrying = decorate(crashing, RetryOptions::<Effect>::default()).unwrap();

    let recording = always_failing().run(retrying.spawn(&()));

    assert_failed!(recording, "503".to_string());
    assert_eq!(recording.calls("fetch"), 1);
    assert!(recording.delays().is_empty());
}

#[test]
fn test_error_escaping_body_without_yield() {
    let broken = |_: &()| Gen::new(|_co: Co<Effect, Value, String>| async move {
        Err::<(), _>("bad input".to_string())
    });
    let retrying = decorate(broken, RetryOptions::<Effect>::default()).unwrap();

    let mut co = retrying.spawn(&());
    assert_eq!(co.start(), Err("bad input".to_string()));
}

#[test]
fn test_terminal_value_surfaces_unmodified() {
    let answer = |_: &()| {
        Gen::new(|co: Co<Effect, Value, String>| async move {
            let v = co.suspend(Effect::call("answer", json!(null))).await?;
            Ok(vec![v, json!("extra")])
        })
    };
    let retrying = decorate(answer, RetryOptions::<Effect>::default()).unwrap();

    let mut co = retrying.spawn(&());
    assert_eq!(co.start(), Ok(Step::Yield(Effect::call("answer", json!(null)))));
    assert_eq!(
        co.resume(Ok(json!(42))),
        Ok(Step::Complete(vec![json!(42), json!("extra")]))
    );
}

#[test]
fn test_resumption_values_reach_the_attempt() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
    let mut co = retrying.spawn(&Action::new("FETCH"));

    assert_eq!(co.start(), Ok(Step::Yield(Effect::call("fetch", json!(null)))));
    assert_eq!(
        co.resume(Ok(json!({ "id": 9 }))),
        Ok(Step::Yield(Effect::put(
            Action::new("FETCH_SUCCESS").with_payload(json!({ "id": 9 }))
        )))
    );
    assert_eq!(co.resume(Ok(Value::Null)), Ok(Step::Complete("success")));
}

#[test]
fn test_debug_mode_emits_notice_after_each_delay() {
    let options = RetryOptions::<Effect>::default().with_debug(true);
    let retrying = decorate(fetch_saga, options).unwrap();

    let recording = always_failing().run(retrying.spawn(&Action::new("FETCH")));

    assert_eq!(
        recording.action_types(),
        vec![RETRY_ACTION_TYPE, RETRY_ACTION_TYPE, RETRY_ACTION_TYPE, "FETCH_FAILURE"]
    );

    let notices: Vec<_> = recording
        .actions()
        .into_iter()
        .filter(|a| a.kind() == RETRY_ACTION_TYPE)
        .map(|a| a.payload().clone())
        .collect();
    assert_eq!(
        notices,
        vec![
            json!({ "originalActionType": "FETCH_FAILURE", "attemptNumber": 1 }),
            json!({ "originalActionType": "FETCH_FAILURE", "attemptNumber": 2 }),
            json!({ "originalActionType": "FETCH_FAILURE", "attemptNumber": 3 }),
        ]
    );

    // Every notice directly follows a delay.
    for (i, effect) in recording.effects.iter().enumerate() {
        if effect
            .emitted_action()
            .is_some_and(|a| a.kind() == RETRY_ACTION_TYPE)
        {
            assert!(recording.effects[i - 1].is_delay());
        }
    }
}

#[test]
fn test_debug_off_emits_no_notice() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
    let recording = always_failing().run(retrying.spawn(&Action::new("FETCH")));

    assert!(!recording.action_types().contains(&RETRY_ACTION_TYPE));
}

#[test]
fn test_custom_pattern() {
    let options = RetryOptions::<Effect>::default().with_pattern("^FETCH_(FAILURE|TIMEOUT)$");
    let retrying = decorate(fetch_saga, options).unwrap();

    let recording = always_failing().run(retrying.spawn(&Action::new("FETCH")));
    assert_eq!(recording.calls("fetch"), 4);

    let options = RetryOptions::<Effect>::default().with_pattern("_TIMEOUT$");
    let retrying = decorate(fetch_saga, options).unwrap();

    let recording = always_failing().run(retrying.spawn(&Action::new("FETCH")));
    assert_eq!(recording.calls("fetch"), 1);
}

#[test]
fn test_custom_condition_skips_non_retryable_statuses() {
    let status_saga = |status: &u16| {
        let status = *status;
        Gen::new(move |co: Co<Effect, Value, String>| async move {
            co.suspend(Effect::put(
                Action::new("REQUEST_FAILURE").with_payload(json!({ "status": status })),
            ))
            .await?;
            Ok(status)
        })
    };

    let options = RetryOptions::<Effect>::default().with_condition(|effect: &Effect| {
        effect.emitted_action().is_some_and(|action| {
            action.kind().ends_with("_FAILURE")
                && !matches!(action.payload()["status"].as_u64(), Some(401 | 404 | 500))
        })
    });
    let retrying = decorate(status_saga, options).unwrap();
    let mut recorder = Recorder::new(|_: &Effect| Ok::<_, String>(Value::Null));

    for status in [401u16, 404, 500] {
        let recording = recorder.run(retrying.spawn(&status));
        assert!(recording.delays().is_empty(), "status {status} was retried");
        assert_completed!(recording, status);
    }

    let recording = recorder.run(retrying.spawn(&503u16));
    assert_eq!(recording.delays().len(), 3);
    assert_completed!(recording, 503);
}

impl RetryArgs for u16 {}

#[test]
fn test_custom_backoff() {
    let options = RetryOptions::<Effect>::default()
        .with_backoff(Backoff::linear(Duration::from_millis(400)))
        .with_max_attempts(4);
    let retrying = decorate(fetch_saga, options).unwrap();

    let recording = always_failing().run(retrying.spawn(&Action::new("FETCH")));
    assert_eq!(recording.delays(), millis(&[400, 800, 1200, 1600]));
}

#[test]
fn test_each_attempt_spawns_from_original_arguments() {
    let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
    let log = seen.clone();
    let recording_saga = move |action: &Action| {
        log.borrow_mut().push(action.payload().clone());
        fetch_saga(action)
    };
    let retrying = decorate(recording_saga, RetryOptions::<Effect>::default()).unwrap();

    let action = Action::new("FETCH").with_payload(json!({ "id": 5 }));
    always_failing().run(retrying.spawn(&action));

    assert_eq!(*seen.borrow(), vec![json!({ "id": 5 }); 4]);
}

#[test]
fn test_error_thrown_into_delay_cancels() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
    let mut co = retrying.spawn(&Action::new("FETCH"));

    assert!(co.start().is_ok());
    assert_eq!(
        co.resume(Err("503".to_string())),
        Ok(Step::Yield(Effect::delay(Duration::from_millis(400))))
    );
    assert_eq!(
        co.resume(Err("cancelled".to_string())),
        Err("cancelled".to_string())
    );
}

#[test]
fn test_error_thrown_into_notice_cancels() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default().with_debug(true)).unwrap();
    let mut co = retrying.spawn(&Action::new("FETCH"));

    let _ = co.start();
    let _ = co.resume(Err("503".to_string()));
    let notice = co.resume(Ok(Value::Null)).unwrap();
    assert!(notice
        .effect()
        .and_then(|e| e.emitted_action())
        .is_some_and(|a| a.kind() == RETRY_ACTION_TYPE));

    assert_eq!(
        co.resume(Err("cancelled".to_string())),
        Err("cancelled".to_string())
    );
}

#[test]
fn test_dropping_decorated_coroutine_runs_inner_cleanup() {
    struct Guard(Rc<Cell<u32>>);
    impl Drop for Guard {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    let dropped = Rc::new(Cell::new(0));
    let counter = dropped.clone();
    let guarded = move |_: &()| {
        let counter = counter.clone();
        Gen::new(move |co: Co<Effect, Value, String>| async move {
            let _guard = Guard(counter);
            co.suspend(Effect::put(Action::new("LOAD_FAILURE"))).await?;
            Ok(())
        })
    };
    let retrying = decorate(guarded, RetryOptions::<Effect>::default().with_max_attempts(1)).unwrap();
    let mut co = retrying.spawn(&());

    // The intercepted attempt is dropped as soon as it is abandoned.
    assert!(co.start().unwrap().effect().is_some_and(Effect::is_delay));
    assert_eq!(dropped.get(), 1);

    // The second attempt is suspended; dropping the decorator cancels it.
    assert!(co.resume(Ok(Value::Null)).unwrap().effect().is_some_and(|e| !e.is_delay()));
    assert_eq!(dropped.get(), 1);
    drop(co);
    assert_eq!(dropped.get(), 2);
}

#[test]
fn test_attempt_counter() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
    let mut co = retrying.spawn(&Action::new("FETCH"));
    assert_eq!(co.max_attempts(), 3);
    assert_eq!(co.attempt(), 0);

    let _ = co.start();
    let _ = co.resume(Err("503".to_string()));
    assert_eq!(co.attempt(), 0);
    let _ = co.resume(Ok(Value::Null));
    assert_eq!(co.attempt(), 1);
}

#[test]
fn test_invocations_are_independent() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
    let mut first = retrying.spawn(&Action::new("FETCH"));
    let mut second = retrying.clone().spawn(&Action::new("FETCH"));

    let _ = first.start();
    let _ = first.resume(Err("503".to_string()));
    let _ = first.resume(Ok(Value::Null));
    assert_eq!(first.attempt(), 1);

    let _ = second.start();
    assert_eq!(second.attempt(), 0);
}

#[test]
#[should_panic(expected = "started twice")]
fn test_start_twice_panics() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
    let mut co = retrying.spawn(&Action::new("FETCH"));
    let _ = co.start();
    let _ = co.start();
}

#[test]
#[should_panic(expected = "resumed while done")]
fn test_resume_after_completion_panics() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
    let mut co = retrying.spawn(&Action::new("FETCH"));
    let _ = co.start();
    let _ = co.resume(Ok(Value::Null));
    let _ = co.resume(Ok(Value::Null));
    let _ = co.resume(Ok(Value::Null));
}

#[test]
#[should_panic(expected = "resumed while ready")]
fn test_resume_before_start_panics() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
    let mut co = retrying.spawn(&Action::new("FETCH"));
    let _ = co.resume(Ok(Value::Null));
}

#[test]
fn test_debug_output() {
    let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
    let co = retrying.spawn(&Action::new("FETCH"));
    let debug = format!("{:?}", co);
    assert!(debug.contains("Retrying"));
    assert!(debug.contains("ready"));
}

#[cfg(feature = "tracing")]
mod tracing_tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_logs_backoff_decisions() {
        let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
        always_failing().run(retrying.spawn(&Action::new("FETCH")));

        assert!(logs_contain("stop condition matched, backing off"));
        assert!(logs_contain("final attempt, stop condition disabled"));
        assert!(logs_contain("delay_ms=1600"));
    }

    #[test]
    #[traced_test]
    fn test_logs_negative_override() {
        let retrying = decorate(fetch_saga, RetryOptions::<Effect>::default()).unwrap();
        let action = Action::new("FETCH").with_meta(json!({ "retries": -1 }));
        let _ = retrying.spawn(&action);

        assert!(logs_contain("negative retry override clamped to zero"));
    }
}
