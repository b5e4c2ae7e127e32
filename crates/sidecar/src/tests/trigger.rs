use crate::config::ShutdownSettings;
use crate::shutdown::{ShutdownOutcome, ShutdownPhase, ShutdownRequest};
use crate::supervisor::{LifecycleEvent, ShutdownTrigger, SupervisorStatus};

use std::time::Duration;

use googletest::assert_that;
use googletest::prelude::eq;

#[test]
fn given_orderly_triggers_when_request_then_graceful_with_grace_timeout() {
    let settings = ShutdownSettings::default();
    let expected = ShutdownRequest::graceful(Duration::from_millis(2000));

    for trigger in [
        ShutdownTrigger::WindowClose,
        ShutdownTrigger::AppQuit,
        ShutdownTrigger::Signal(15),
        ShutdownTrigger::RendererUnresponsive,
    ] {
        assert_that!(trigger.request(&settings), eq(expected));
    }
}

#[test]
fn given_panic_trigger_when_request_then_forced_without_grace() {
    let request = ShutdownTrigger::UnhandledPanic.request(&ShutdownSettings::default());

    assert!(!request.graceful);
    assert_that!(request.timeout, eq(Duration::ZERO));
}

#[test]
fn given_triggers_when_exit_code_then_failures_are_non_zero() {
    assert_that!(ShutdownTrigger::WindowClose.exit_code(), eq(0));
    assert_that!(ShutdownTrigger::Signal(2).exit_code(), eq(0));
    assert_that!(ShutdownTrigger::UnhandledPanic.exit_code(), eq(1));
    assert_that!(ShutdownTrigger::RendererUnresponsive.exit_code(), eq(1));
}

#[test]
fn given_signal_trigger_when_display_then_names_signal() {
    assert_that!(ShutdownTrigger::Signal(15).to_string(), eq("signal 15"));
    assert_that!(ShutdownTrigger::WindowClose.to_string(), eq("window close"));
}

#[test]
fn given_phases_when_display_then_snake_case() {
    assert_that!(
        ShutdownPhase::WaitingForPortRelease.to_string(),
        eq("waiting_for_port_release")
    );
    assert_that!(ShutdownPhase::Idle.to_string(), eq("idle"));
}

#[test]
fn given_events_when_serialized_then_tagged_for_host() {
    let ready = serde_json::to_value(LifecycleEvent::Ready { port: 8001 }).unwrap();
    let stopped = serde_json::to_value(ShutdownOutcome::Completed {
        forced: true,
        port_released: false,
    })
    .unwrap();
    let status = serde_json::to_value(SupervisorStatus::Running { port: 8001 }).unwrap();

    assert_that!(
        ready,
        eq(&serde_json::json!({ "event": "ready", "port": 8001 }))
    );
    assert_that!(
        stopped,
        eq(&serde_json::json!({ "outcome": "completed", "forced": true, "port_released": false }))
    );
    assert_that!(
        status,
        eq(&serde_json::json!({ "state": "running", "port": 8001 }))
    );
}
