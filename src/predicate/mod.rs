//! Predicates that decide when an attempt is abandoned.
//!
//! A stop condition is any [`Predicate`] over the effects a coroutine yields.
//! The retry engine checks every yielded effect against it; a match aborts
//! the current attempt before the effect reaches the host runtime.
//!
//! # Example
//!
//! ```rust
//! use eddy::effect::{Action, Effect, HostEffect};
//! use eddy::predicate::*;
//! use serde_json::json;
//!
//! // Retry on failures, except for "not found"
//! let failure = action_type_matches("_FAILURE$").unwrap();
//! let not_found = |e: &Effect| {
//!     e.emitted_action()
//!         .is_some_and(|a| a.payload()["status"] == json!(404))
//! };
//! let stop = failure.and(not_found.not());
//!
//! let transient = Effect::put(Action::new("LOAD_FAILURE").with_payload(json!({ "status": 503 })));
//! let missing = Effect::put(Action::new("LOAD_FAILURE").with_payload(json!({ "status": 404 })));
//!
//! assert!(stop.check(&transient));
//! assert!(!stop.check(&missing));
//! ```

mod combinators;
mod condition;

// Re-export core trait
pub use combinators::{Predicate, PredicateExt};

// Re-export combinator types
pub use combinators::{all_of, any_of, AllOf, And, AnyOf, Not, Or};

// Re-export stop conditions
pub use condition::{
    action_type_matches, ActionTypeMatches, Condition, Never, DEFAULT_FAILURE_PATTERN,
};
