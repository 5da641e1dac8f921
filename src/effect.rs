//! Effect vocabulary shared by coroutines and their host runtime.
//!
//! The retry engine treats effects as opaque, with three exceptions that
//! go through the [`HostEffect`] trait: it must be able to *produce* a delay
//! effect (the backoff wait) and an emit effect (debug instrumentation), and
//! the default stop condition must be able to *inspect* an emitted action.
//!
//! [`Effect`] is the vocabulary shipped with this crate: invoke a handler,
//! emit an action, wait. Bring your own type by implementing [`HostEffect`].

use std::time::Duration;

use serde_json::Value;

/// Action type used for retry instrumentation emitted in debug mode.
pub const RETRY_ACTION_TYPE: &str = "@@eddy/RETRY";

/// A dispatched action: a type string plus free-form payload and metadata.
///
/// # Example
///
/// ```rust
/// use eddy::effect::Action;
/// use serde_json::json;
///
/// let action = Action::new("USER_FETCH_REQUEST")
///     .with_payload(json!({ "id": 7 }))
///     .with_meta(json!({ "retries": 5 }));
///
/// assert_eq!(action.kind(), "USER_FETCH_REQUEST");
/// assert_eq!(action.payload()["id"], 7);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Action {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    kind: String,
    #[cfg_attr(feature = "serde", serde(default))]
    payload: Value,
    #[cfg_attr(feature = "serde", serde(default))]
    meta: Value,
}

impl Action {
    /// Create an action with a null payload and no metadata.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Value::Null,
            meta: Value::Null,
        }
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Set the metadata.
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = meta;
        self
    }

    /// The action type.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The payload.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// The metadata.
    pub fn meta(&self) -> &Value {
        &self.meta
    }
}

/// Effects understood by [`crate::runtime::Runtime`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Effect {
    /// Invoke a named handler with arguments; resumes with its result.
    Call {
        /// Handler name.
        handler: String,
        /// Handler arguments.
        args: Value,
    },
    /// Dispatch an action.
    Put(Action),
    /// Wait before resuming.
    Delay(Duration),
}

impl Effect {
    /// Invoke `handler` with `args`.
    pub fn call(handler: impl Into<String>, args: Value) -> Self {
        Effect::Call {
            handler: handler.into(),
            args,
        }
    }

    /// Dispatch `action`.
    pub fn put(action: Action) -> Self {
        Effect::Put(action)
    }

    /// Wait for `duration`.
    pub fn delay(duration: Duration) -> Self {
        Effect::Delay(duration)
    }

    /// Returns true for delay effects.
    pub fn is_delay(&self) -> bool {
        matches!(self, Effect::Delay(_))
    }
}

/// The effect shapes the retry engine produces and inspects.
pub trait HostEffect: Sized {
    /// An effect asking the host to wait for `duration`.
    fn delay(duration: Duration) -> Self;

    /// An effect asking the host to dispatch `action`.
    fn emit(action: Action) -> Self;

    /// The action if this effect dispatches one.
    fn emitted_action(&self) -> Option<&Action>;
}

impl HostEffect for Effect {
    fn delay(duration: Duration) -> Self {
        Effect::Delay(duration)
    }

    fn emit(action: Action) -> Self {
        Effect::Put(action)
    }

    fn emitted_action(&self) -> Option<&Action> {
        match self {
            Effect::Put(action) => Some(action),
            _ => None,
        }
    }
}

/// Build the instrumentation action emitted after a backoff wait.
///
/// `attempt` is the 1-based number of the retry about to start.
pub(crate) fn retry_notice(original: Option<&str>, attempt: u32) -> Action {
    Action::new(RETRY_ACTION_TYPE).with_payload(serde_json::json!({
        "originalActionType": original,
        "attemptNumber": attempt,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_emitted_action_only_for_put() {
        let put = Effect::put(Action::new("SAVE_SUCCESS"));
        assert_eq!(put.emitted_action().map(Action::kind), Some("SAVE_SUCCESS"));

        let call = Effect::call("api", json!([1, 2]));
        assert!(call.emitted_action().is_none());

        let wait = Effect::delay(Duration::from_millis(400));
        assert!(wait.emitted_action().is_none());
        assert!(wait.is_delay());
    }

    #[test]
    fn test_host_effect_constructors() {
        let wait = <Effect as HostEffect>::delay(Duration::from_millis(5));
        assert_eq!(wait, Effect::Delay(Duration::from_millis(5)));

        let emit = <Effect as HostEffect>::emit(Action::new("PING"));
        assert_eq!(emit, Effect::Put(Action::new("PING")));
    }

    #[test]
    fn test_retry_notice_shape() {
        let notice = retry_notice(Some("LOAD_FAILURE"), 2);
        assert_eq!(notice.kind(), RETRY_ACTION_TYPE);
        assert_eq!(
            notice.payload(),
            &json!({ "originalActionType": "LOAD_FAILURE", "attemptNumber": 2 })
        );
    }

    #[test]
    fn test_retry_notice_without_original_type() {
        let notice = retry_notice(None, 1);
        assert_eq!(notice.payload()["originalActionType"], Value::Null);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_action_serializes_with_type_key() {
        let action = Action::new("X").with_payload(json!(1));
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value, json!({ "type": "X", "payload": 1, "meta": null }));
    }
}
