//! End-to-end pipeline scenarios: ordering, validation gates, fan-out
//! semantics, failure propagation, and composition.

use braid::{bootstrap, contract, Pipeline, PipelineError, SharedContext, StepBody};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

static TRACING: Once = Once::new();

/// Route engine logs through the test harness; set RUST_LOG=braid=debug to
/// see per-step tracing under `--nocapture`
fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Step body that appends its own name to an array-valued input
fn trace_step(name: &str) -> StepBody {
    let name = name.to_string();
    StepBody::from_fn(move |value, _ctx| {
        let name = name.clone();
        async move {
            let mut items = value.as_array().cloned().unwrap_or_default();
            items.push(json!(name));
            Ok(Value::Array(items))
        }
    })
}

#[tokio::test]
async fn sequential_order_matches_registration() {
    init_tracing();
    let pipeline = Pipeline::builder()
        .plain("extract", contract::sequence(), trace_step("extract"))
        .unwrap()
        .plain("transform", contract::sequence(), trace_step("transform"))
        .unwrap()
        .effect("load", contract::sequence(), trace_step("load"))
        .unwrap()
        .build();

    let out = bootstrap(&pipeline).run(json!([])).await.unwrap();
    assert_eq!(out, json!(["extract", "transform", "load"]));
}

#[tokio::test]
async fn validation_gate_rejects_before_any_body_runs() {
    init_tracing();
    let executed = Arc::new(AtomicUsize::new(0));
    let counter = executed.clone();

    let pipeline = Pipeline::builder()
        .plain(
            "numeric-only",
            contract::number(),
            StepBody::from_fn(move |value, _ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok(value) }
            }),
        )
        .unwrap()
        .build();

    let err = bootstrap(&pipeline).run(json!("twelve")).await.unwrap_err();

    match err {
        PipelineError::ValidationFailed { step, value } => {
            assert_eq!(step, "numeric-only");
            assert!(value.contains("twelve"));
        }
        other => panic!("expected ValidationFailed, got {:?}", other),
    }
    assert_eq!(executed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fan_out_rejects_non_sequence_input() {
    init_tracing();
    let pipeline = Pipeline::builder()
        .fan_out(
            "per-record",
            contract::any(),
            StepBody::from_fn(|value, _ctx| async move { Ok(value) }),
        )
        .unwrap()
        .build();

    let err = bootstrap(&pipeline).run(json!(7)).await.unwrap_err();
    match err {
        PipelineError::TypeMismatch { step, value } => {
            assert_eq!(step, "per-record");
            assert_eq!(value, "7");
        }
        other => panic!("expected TypeMismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn fan_out_element_contract_gates_each_element() {
    init_tracing();
    let pipeline = Pipeline::builder()
        .fan_out(
            "numbers-only",
            contract::number(),
            StepBody::from_fn(|value, _ctx| async move { Ok(value) }),
        )
        .unwrap()
        .build();

    // A sequence with one offending element fails validation, not dispatch,
    // and the error names the offending element.
    let err = bootstrap(&pipeline).run(json!([1, "two", 3])).await.unwrap_err();
    match err {
        PipelineError::ValidationFailed { step, value } => {
            assert_eq!(step, "numbers-only");
            assert_eq!(value, "\"two\"");
        }
        other => panic!("expected ValidationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn fan_out_preserves_input_order_under_inverse_delays() {
    init_tracing();
    // Later elements finish first; the output order must still match input.
    let pipeline = Pipeline::builder()
        .fan_out(
            "delayed",
            contract::number(),
            StepBody::from_fn(|value, _ctx| async move {
                let i = value.as_u64().unwrap();
                tokio::time::sleep(Duration::from_millis(60 - 15 * i)).await;
                Ok(json!(i * 100))
            }),
        )
        .unwrap()
        .build();

    let out = bootstrap(&pipeline).run(json!([0, 1, 2, 3])).await.unwrap();
    assert_eq!(out, json!([0, 100, 200, 300]));
}

#[tokio::test]
async fn fan_out_fails_fast_with_no_partial_result() {
    init_tracing();
    let pipeline = Pipeline::builder()
        .fan_out(
            "flaky",
            contract::string(),
            StepBody::from_fn(|value, _ctx| async move {
                if value == json!("b") {
                    anyhow::bail!("element b exploded");
                }
                Ok(value)
            }),
        )
        .unwrap()
        .build();

    let err = bootstrap(&pipeline)
        .run(json!(["a", "b", "c"]))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Step(_)));
    assert_eq!(err.to_string(), "element b exploded");
}

#[tokio::test]
async fn nesting_is_transparent_to_the_caller() {
    init_tracing();
    let inner = Pipeline::builder()
        .plain(
            "negate",
            contract::number(),
            StepBody::from_fn(|v, _ctx| async move { Ok(json!(-v.as_i64().unwrap())) }),
        )
        .unwrap()
        .plain(
            "stringify",
            contract::number(),
            StepBody::from_fn(|v, _ctx| async move { Ok(json!(v.to_string())) }),
        )
        .unwrap()
        .build();

    let outer = Pipeline::builder()
        .plain("wrapped", contract::number(), inner.clone())
        .unwrap()
        .build();

    let direct = bootstrap(&inner).run(json!(5)).await.unwrap();
    let nested = bootstrap(&outer).run(json!(5)).await.unwrap();
    assert_eq!(direct, nested);
    assert_eq!(nested, json!("-5"));
}

#[tokio::test]
async fn context_writes_are_visible_downstream() {
    init_tracing();
    let pipeline = Pipeline::builder()
        .effect(
            "login",
            contract::any(),
            StepBody::from_fn(|value, ctx| async move {
                ctx.insert("session", json!("s-42")).await;
                Ok(value)
            }),
        )
        .unwrap()
        .plain(
            "use-session",
            contract::any(),
            StepBody::from_fn(|_value, ctx| async move {
                Ok(ctx.get("session").await.unwrap_or(Value::Null))
            }),
        )
        .unwrap()
        .build();

    let ctx = SharedContext::new();
    let out = bootstrap(&pipeline)
        .run_with(Value::Null, ctx.clone())
        .await
        .unwrap();

    assert_eq!(out, json!("s-42"));
    // Caller-supplied context retains the mutation after the run.
    assert_eq!(ctx.get("session").await, Some(json!("s-42")));
}

#[tokio::test]
async fn fan_out_siblings_share_one_context() {
    init_tracing();
    let pipeline = Pipeline::builder()
        .fan_out(
            "tag",
            contract::string(),
            StepBody::from_fn(|value, ctx| async move {
                let key = format!("seen:{}", value.as_str().unwrap());
                ctx.insert(key, json!(true)).await;
                Ok(value)
            }),
        )
        .unwrap()
        .build();

    let ctx = SharedContext::new();
    bootstrap(&pipeline)
        .run_with(json!(["x", "y", "z"]), ctx.clone())
        .await
        .unwrap();

    for key in ["seen:x", "seen:y", "seen:z"] {
        assert_eq!(ctx.get(key).await, Some(json!(true)));
    }
}

#[tokio::test]
async fn nested_pipeline_runs_per_fan_out_element() {
    init_tracing();
    let per_element = Pipeline::builder()
        .plain(
            "double",
            contract::number(),
            StepBody::from_fn(|v, _ctx| async move { Ok(json!(v.as_i64().unwrap() * 2)) }),
        )
        .unwrap()
        .build();

    let pipeline = Pipeline::builder()
        .fan_out("double-each", contract::number(), per_element)
        .unwrap()
        .build();

    let out = bootstrap(&pipeline).run(json!([1, 2, 3])).await.unwrap();
    assert_eq!(out, json!([2, 4, 6]));
}

#[tokio::test]
async fn unbounded_fan_out_launches_all_elements_at_once() {
    init_tracing();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let pipeline = Pipeline::builder()
        .fan_out("burst", contract::number(), gauge_body(&in_flight, &peak))
        .unwrap()
        .build();

    bootstrap(&pipeline)
        .run(json!([0, 1, 2, 3, 4, 5]))
        .await
        .unwrap();

    assert_eq!(peak.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn bounded_fan_out_respects_the_ceiling() {
    init_tracing();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let limit = std::num::NonZeroUsize::new(2).unwrap();
    let pipeline = Pipeline::builder()
        .fan_out_bounded("drip", contract::number(), limit, gauge_body(&in_flight, &peak))
        .unwrap()
        .build();

    let out = bootstrap(&pipeline)
        .run(json!([0, 1, 2, 3, 4, 5]))
        .await
        .unwrap();

    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(out, json!([0, 1, 2, 3, 4, 5]));
}

/// Body that records the peak number of concurrent invocations
fn gauge_body(in_flight: &Arc<AtomicUsize>, peak: &Arc<AtomicUsize>) -> StepBody {
    let in_flight = in_flight.clone();
    let peak = peak.clone();
    StepBody::from_fn(move |value, _ctx| {
        let in_flight = in_flight.clone();
        let peak = peak.clone();
        async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(value)
        }
    })
}
