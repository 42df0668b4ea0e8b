//! Unit tests for error types.

use std::error::Error as _;

use rstest::rstest;

use super::*;

#[test]
fn disposed_error_names_component() {
    let error = LifecycleError::Disposed {
        component: "billing::Ledger",
    };
    let message = error.to_string();
    assert!(
        message.contains("billing::Ledger"),
        "expected component in message: {message}"
    );
    assert!(error.is_disposed());
    assert_eq!(error.phase(), None);
}

#[test]
fn component_error_carries_phase_tenant_and_source() {
    let error = LifecycleError::Component {
        component: "billing::Ledger",
        tenant: "acme".into(),
        phase: Phase::Stop,
        source: ComponentError::new("flush failed"),
    };
    let message = error.to_string();
    assert!(message.contains("acme"), "expected tenant in message: {message}");
    assert!(message.contains("stop"), "expected phase in message: {message}");
    assert!(!error.is_disposed());
    assert_eq!(error.phase(), Some(Phase::Stop));
    let source = error.source().expect("component failure is the source");
    assert_eq!(source.to_string(), "flush failed");
}

#[rstest]
#[case::not_registered(
    ResolveError::NotRegistered { capability: "dyn app::Clock" },
    "dyn app::Clock"
)]
#[case::mismatch(
    ResolveError::TypeMismatch {
        capability: "dyn app::Clock",
        implementation: "app::SystemClock",
    },
    "app::SystemClock"
)]
#[case::construction(
    ResolveError::construction("app::SystemClock", "no time source"),
    "no time source"
)]
fn resolve_error_message_includes_context(#[case] error: ResolveError, #[case] expected: &str) {
    let message = error.to_string();
    assert!(
        message.contains(expected),
        "expected '{expected}' in message: {message}"
    );
}

#[test]
fn conflict_lists_every_matching_rule() {
    let error = RewriteError::EligibilityConflict {
        implementation: "app::Worker",
        rules: vec!["declared-binding", "always"],
    };
    let message = error.to_string();
    assert!(
        message.contains("declared-binding, always"),
        "expected rule list in message: {message}"
    );
}
