use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use blockrun::{
    host_fn, sync_fn, CodeRunner, ContextBuilder, ExecutionContext, ExecutionError,
    ExecutionRunner, HostFunction, RunnerConfig, SourceUnit, TimeoutSignal, Value,
};

fn runner() -> ExecutionRunner {
    ExecutionRunner::default()
}

async fn execute(source: &str, context: ExecutionContext, timeout: Duration) -> Result<Value, ExecutionError> {
    runner()
        .execute(&SourceUnit::new(source), context, TimeoutSignal::after(timeout))
        .await
}

#[tokio::test]
async fn test_every_binding_is_visible() {
    let names = ["alpha", "beta", "gamma", "delta", "epsilon"];
    let builder = names
        .iter()
        .enumerate()
        .fold(ContextBuilder::new(), |b, (i, name)| b.value(*name, i as i64 * 10));
    let context = builder.build().unwrap();

    for (i, name) in names.iter().enumerate() {
        let value = execute(&format!("return {};", name), context.clone(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(value, Value::from(i as i64 * 10), "binding {}", name);
    }
}

#[tokio::test]
async fn test_synchronous_return() {
    let value = execute("return 'done';", ExecutionContext::empty(), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(value, Value::from("done"));
}

#[tokio::test]
async fn test_synchronous_throw_is_runtime_error() {
    let start = std::time::Instant::now();
    let err = execute(
        "throw new Error('bad');",
        ExecutionContext::empty(),
        Duration::from_millis(1000),
    )
    .await
    .unwrap_err();
    match &err {
        ExecutionError::Runtime { name, message, thrown } => {
            assert_eq!(name, "Error");
            assert_eq!(message, "bad");
            assert_eq!(thrown.as_error().map(|e| e.message.as_str()), Some("bad"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_await_forever_times_out_after_duration() {
    let never = host_fn("never", |_| futures::future::pending());
    let context = ContextBuilder::new().capability("never", never).build().unwrap();
    let start = tokio::time::Instant::now();
    let err = execute("await never(); return 1;", context, Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::Timeout { after } if after == Duration::from_millis(300)));
    assert!(start.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_context_built_twice_shares_functions() {
    let add_cut = sync_fn("addCut", |_| Ok(Value::Undefined));
    let builder = ContextBuilder::new()
        .capability("addCut", add_cut.clone())
        .value("ropeLength", 10);
    let first = builder.build().unwrap();
    let second = builder.build().unwrap();

    assert_eq!(first.names(), second.names());
    match (first.get("addCut"), second.get("addCut")) {
        (
            Some(Value::Function(blockrun::evaluator::Callable::Host(a))),
            Some(Value::Function(blockrun::evaluator::Callable::Host(b))),
        ) => {
            assert!(Arc::ptr_eq(a, b));
            assert!(Arc::ptr_eq(a, &add_cut));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(first.get("ropeLength"), second.get("ropeLength"));
}

#[tokio::test]
async fn test_add_cut_called_once_with_argument() {
    let calls: Arc<Mutex<Vec<Vec<Value>>>> = Arc::new(Mutex::new(Vec::new()));
    let removes = Arc::new(AtomicUsize::new(0));

    let recorded = calls.clone();
    let add_cut: Arc<dyn HostFunction> = host_fn("addCut", move |args| {
        recorded.lock().push(args);
        async { Ok(Value::Undefined) }
    });
    let removed = removes.clone();
    let remove_cut = sync_fn("removeCut", move |_| {
        removed.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Undefined)
    });
    let context = ContextBuilder::new()
        .capability("addCut", add_cut)
        .capability("removeCut", remove_cut)
        .build()
        .unwrap();

    let value = execute("await addCut(5); return 1;", context, Duration::from_millis(1000))
        .await
        .unwrap();
    assert_eq!(value, Value::from(1));
    let calls = calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], vec![Value::from(5)]);
    assert_eq!(removes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_sleeping_loop_times_out_promptly() {
    let context = ContextBuilder::new()
        .capability("sleep", blockrun::capabilities::sleep())
        .build()
        .unwrap();
    let start = std::time::Instant::now();
    let err = execute(
        "while (true) { await sleep(1); }",
        context,
        Duration::from_millis(50),
    )
    .await
    .unwrap_err();
    let elapsed = start.elapsed();
    assert!(err.is_timeout());
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(500), "took {:?}", elapsed);
}

#[tokio::test]
async fn test_tight_loop_times_out() {
    let start = std::time::Instant::now();
    let err = execute("let i = 0; while (true) { i++; }", ExecutionContext::empty(), Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tight_loop_times_out_on_multi_thread_runtime() {
    let err = execute("for (;;) {}", ExecutionContext::empty(), Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_strict_semantics() {
    let err = execute(
        "const rope = 1; rope = 2;",
        ExecutionContext::empty(),
        Duration::from_secs(1),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "TypeError: Assignment to constant variable.");

    let err = execute("return missing;", ExecutionContext::empty(), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "ReferenceError: missing is not defined");
}

#[tokio::test]
async fn test_bindings_shadow_intrinsics() {
    let context = ContextBuilder::new().value("Math", 7).build().unwrap();
    let value = execute("return Math;", context, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(value, Value::from(7));
}

#[tokio::test]
async fn test_shared_array_mutations_are_visible_to_host() {
    let items = Value::array(vec![Value::from(1)]);
    let context = ContextBuilder::new().value("items", items.clone()).build().unwrap();
    execute("items.push(2, 3);", context, Duration::from_secs(1))
        .await
        .unwrap();
    match items {
        Value::Array(items) => assert_eq!(items.lock().len(), 3),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_recursion_depth_is_bounded() {
    let err = execute(
        "function down(n) { return down(n + 1); } return down(0);",
        ExecutionContext::empty(),
        Duration::from_secs(5),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "RangeError: Maximum call stack size exceeded");
}

#[tokio::test]
async fn test_subset_sum_program() {
    let context = ContextBuilder::new()
        .value(
            "numbers",
            Value::array(vec![3.into(), 34.into(), 4.into(), 12.into(), 5.into(), 2.into()]),
        )
        .value("target", 9)
        .build()
        .unwrap();
    let source = r#"
        function canReach(i, remaining) {
            if (remaining === 0) return true;
            if (i >= numbers.length || remaining < 0) return false;
            return canReach(i + 1, remaining - numbers[i]) || canReach(i + 1, remaining);
        }
        return canReach(0, target);
    "#;
    let value = execute(source, context, Duration::from_secs(5)).await.unwrap();
    assert_eq!(value, Value::from(true));
}

#[tokio::test]
async fn test_long_operator_chain_is_a_syntax_error() {
    let source = format!("return 1{};", "+1".repeat(5_000));
    let err = execute(&source, ExecutionContext::empty(), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(err.is_construction(), "{:?}", err);
    assert!(err.to_string().contains("nested too deeply"), "{}", err);
}

#[tokio::test]
async fn test_long_member_and_call_chains_are_syntax_errors() {
    let context = ContextBuilder::new()
        .value("rope", Value::array(Vec::new()))
        .build()
        .unwrap();
    for source in [
        format!("return rope{};", ".length".repeat(5_000)),
        format!("return rope{};", "[0]".repeat(5_000)),
        format!("return rope.at{};", "(0)".repeat(5_000)),
    ] {
        let err = execute(&source, context.clone(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.is_construction(), "{:?}", err);
    }
}

#[tokio::test]
async fn test_chain_within_limit_runs() {
    let source = format!("return 0{};", "+1".repeat(150));
    let value = execute(&source, ExecutionContext::empty(), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(value, Value::from(150));
}

#[tokio::test]
async fn test_runs_do_not_keep_capabilities_alive() {
    let add_cut = sync_fn("addCut", |_| Ok(Value::Undefined));
    let context = ContextBuilder::new()
        .capability("addCut", add_cut.clone())
        .build()
        .unwrap();
    let baseline = Arc::strong_count(&add_cut);

    for _ in 0..10 {
        let value = execute(
            "function helper() { addCut(1); return 1; } return helper();",
            context.clone(),
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        assert_eq!(value, Value::from(1));
    }
    assert_eq!(Arc::strong_count(&add_cut), baseline);
}

#[tokio::test]
async fn test_flat_source_up_to_length_limit() {
    let runner = ExecutionRunner::new(RunnerConfig {
        max_code_length: 100_000,
        ..RunnerConfig::default()
    });
    let statement = "x = x + 1;\n";
    let repeats = (100_000 - 32) / statement.len();
    let code = format!("let x = 0;\n{}return x;", statement.repeat(repeats));
    assert!(code.len() <= 100_000);

    let value = runner
        .execute(
            &SourceUnit::new(code.clone()),
            ExecutionContext::empty(),
            TimeoutSignal::after(Duration::from_secs(10)),
        )
        .await
        .unwrap();
    assert_eq!(value, Value::from(repeats as i64));

    let too_long = format!("{}{}", code, " ".repeat(100_001 - code.len()));
    let err = runner
        .execute(
            &SourceUnit::new(too_long),
            ExecutionContext::empty(),
            TimeoutSignal::after(Duration::from_secs(10)),
        )
        .await
        .unwrap_err();
    assert!(err.is_construction(), "{:?}", err);
}
