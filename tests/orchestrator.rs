use std::sync::Arc;
use std::time::Duration;

use blockrun::capabilities::RopeEvent;
use blockrun::{
    AbandonPolicy, DiagnosticLevel, FakeIdGenerator, Feedback, MemorySink, Orchestrator,
    OrchestratorConfig, RopeBoard, RunnerConfig, SourceUnit, StandardCapabilities,
};

fn orchestrator(timeout_ms: u64) -> Orchestrator {
    Orchestrator::with_runner_config(RunnerConfig::default(), OrchestratorConfig { timeout_ms })
        .with_id_generator(Arc::new(FakeIdGenerator::new("run")))
}

#[tokio::test]
async fn test_rope_puzzle_attempt() {
    let orchestrator = orchestrator(1_000);
    let board = RopeBoard::new(12.0);
    let sink = Arc::new(MemorySink::new());
    let standard = StandardCapabilities::new(sink.clone());

    let source = SourceUnit::new(
        r#"
        for (let at = 3; at < ropeLength; at += 3) {
            await addCut(at);
            console.log('cut at', at);
        }
        return cuts();
        "#,
    );
    let report = orchestrator.run(&source, &[&standard, &board]).await;

    assert_eq!(report.id, "run-1");
    assert!(report.feedback.is_solved(), "{:?}", report.feedback);
    assert_eq!(board.pieces(), vec![3.0, 3.0, 3.0, 3.0]);
    assert_eq!(
        sink.messages(),
        vec!["cut at 3", "cut at 6", "cut at 9"]
    );
    assert!(sink.records().iter().all(|r| r.level == DiagnosticLevel::Log));
}

#[tokio::test]
async fn test_learner_error_becomes_code_error() {
    let orchestrator = orchestrator(1_000);
    let board = RopeBoard::new(10.0);
    let report = orchestrator
        .run(&SourceUnit::new("addCut(4); addCut(4);"), &[&board])
        .await;
    match &report.feedback {
        Feedback::CodeError { name, message } => {
            assert_eq!(name, "Error");
            assert_eq!(message, "There is already a cut at 4");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(board.cuts(), vec![4.0]);
}

#[tokio::test]
async fn test_syntax_error_feedback() {
    let orchestrator = orchestrator(1_000);
    let report = orchestrator
        .run(&SourceUnit::new("addCut(4"), &[&RopeBoard::new(10.0)])
        .await;
    match report.feedback {
        Feedback::CodeError { name, .. } => assert_eq!(name, "SyntaxError"),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_timed_out_attempt_cannot_touch_board_later() {
    let orchestrator = orchestrator(50);
    let board = RopeBoard::new(100.0);
    let standard = StandardCapabilities::new(Arc::new(MemorySink::new()));

    let source = SourceUnit::new(
        r#"
        let at = 1;
        while (true) {
            await sleep(20);
            await addCut(at);
            at += 1;
        }
        "#,
    );
    let report = orchestrator.run(&source, &[&standard, &board]).await;
    assert!(matches!(report.feedback, Feedback::TookTooLong { after_ms: 50 }));

    let cuts_at_timeout = board.history().len();
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(board.history().len(), cuts_at_timeout);
}

#[tokio::test]
async fn test_abort_policy_also_stops_task() {
    let orchestrator = Orchestrator::with_runner_config(
        RunnerConfig {
            abandon: AbandonPolicy::Abort,
            ..RunnerConfig::default()
        },
        OrchestratorConfig { timeout_ms: 30 },
    );
    let board = RopeBoard::new(100.0);
    let standard = StandardCapabilities::new(Arc::new(MemorySink::new()));
    let report = orchestrator
        .run(
            &SourceUnit::new("let at = 1; while (true) { await sleep(5); addCut(at++); }"),
            &[&standard, &board],
        )
        .await;
    assert_eq!(report.feedback.kind(), "took_too_long");

    let seen = board.history();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(board.history(), seen);
    assert!(seen.iter().all(|e| matches!(e, RopeEvent::AddCut(_))));
}

#[tokio::test]
async fn test_newer_attempt_supersedes_running_one() {
    let orchestrator = Arc::new(orchestrator(10_000));
    let board = RopeBoard::new(100.0);

    let first = {
        let orchestrator = orchestrator.clone();
        let board = board.clone();
        tokio::spawn(async move {
            let standard = StandardCapabilities::new(Arc::new(MemorySink::new()));
            orchestrator
                .run(
                    &SourceUnit::new("while (true) { await sleep(5); }"),
                    &[&standard, &board],
                )
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    let second = orchestrator
        .run(&SourceUnit::new("addCut(50); return 'second';"), &[&board])
        .await;
    assert!(second.feedback.is_solved());

    let first = first.await.unwrap();
    assert_eq!(first.feedback, Feedback::Stopped);
    assert_eq!(board.cuts(), vec![50.0]);
}
