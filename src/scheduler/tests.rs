use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::sleep;

use super::*;
use crate::engine::testing::FakeCompiler;

const SETTLE: Duration = Duration::from_millis(300);

fn snap(id: u64, text: &str) -> Snapshot {
    Snapshot::new(SnapshotId(id), text)
}

fn start(compiler: &Arc<FakeCompiler>) -> (SchedulerHandle, UnboundedReceiver<CompileEvent>) {
    CompileScheduler::spawn(compiler.clone(), SETTLE)
}

/// Drain whatever events are queued right now.
fn drain(rx: &mut UnboundedReceiver<CompileEvent>) -> Vec<CompileEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

fn finished_ids(events: &[CompileEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match e {
            CompileEvent::Finished { snapshot, .. } => Some(snapshot.0),
            _ => None,
        })
        .collect()
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_rapid_changes_coalesce_into_one_compile() {
    let compiler = FakeCompiler::new(Duration::from_millis(50));
    let (handle, mut events) = start(&compiler);

    for (i, text) in ["= A", "= Al", "= Ali", "= Alic", "= Alice"].iter().enumerate() {
        handle.notify_change(snap(i as u64 + 1, text));
        sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(compiler.call_count(), 0, "nothing fires while typing");

    sleep(Duration::from_secs(1)).await;
    assert_eq!(compiler.sources(), vec!["= Alice".to_string()]);
    assert_eq!(finished_ids(&drain(&mut events)), vec![5]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_fires_only_after_settle_period() {
    let compiler = FakeCompiler::new(Duration::ZERO);
    let (handle, _events) = start(&compiler);

    handle.notify_change(snap(1, "= Hi"));
    sleep(Duration::from_millis(299)).await;
    assert_eq!(compiler.call_count(), 0);

    sleep(Duration::from_millis(10)).await;
    assert_eq!(compiler.call_count(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_blank_buffer_short_circuits() {
    let compiler = FakeCompiler::new(Duration::ZERO);
    let (handle, mut events) = start(&compiler);

    handle.notify_change(snap(1, "= Draft"));
    sleep(Duration::from_millis(100)).await;
    handle.notify_change(snap(2, "  \n "));
    sleep(Duration::from_millis(10)).await;

    let seen = drain(&mut events);
    assert!(matches!(
        seen.as_slice(),
        [CompileEvent::Empty { snapshot: SnapshotId(2) }]
    ));

    sleep(Duration::from_secs(2)).await;
    assert_eq!(compiler.call_count(), 0, "pending countdown was cancelled");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_single_in_flight_then_latest_pending() {
    let compiler = FakeCompiler::new(Duration::from_millis(500));
    let (handle, mut events) = start(&compiler);

    // A fires at 300ms and runs until 800ms
    handle.notify_change(snap(1, "A"));
    sleep(Duration::from_millis(400)).await;
    handle.notify_change(snap(2, "AB"));
    sleep(Duration::from_millis(50)).await;
    handle.notify_change(snap(3, "ABC"));

    sleep(Duration::from_secs(3)).await;

    assert_eq!(compiler.sources(), vec!["A".to_string(), "ABC".to_string()]);
    assert_eq!(compiler.max_concurrent(), 1);
    assert_eq!(finished_ids(&drain(&mut events)), vec![1, 3]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_immediate_bypasses_debounce_and_drops_older_pending() {
    let compiler = FakeCompiler::new(Duration::from_millis(20));
    let (handle, mut events) = start(&compiler);

    handle.notify_change(snap(1, "= Old"));
    let result = handle
        .compile_now(snap(2, "= Saved"), ExportKind::Publish)
        .await
        .unwrap();
    assert!(result.pdf.is_some());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(
        compiler.calls(),
        vec![("= Saved".to_string(), ExportKind::Publish)]
    );
    assert_eq!(finished_ids(&drain(&mut events)), vec![2]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_immediate_waits_for_in_flight() {
    let compiler = FakeCompiler::new(Duration::from_millis(200));
    let (handle, _events) = start(&compiler);

    handle.notify_change(snap(1, "= Draft"));
    sleep(Duration::from_millis(350)).await; // draft compiling

    handle
        .compile_now(snap(2, "= Final"), ExportKind::Publish)
        .await
        .unwrap();

    assert_eq!(compiler.sources(), vec!["= Draft", "= Final"]);
    assert_eq!(compiler.max_concurrent(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_compile_errors_are_delivered() {
    let compiler = FakeCompiler::new(Duration::ZERO);
    let (handle, mut events) = start(&compiler);

    handle.notify_change(snap(1, "#error"));
    sleep(Duration::from_millis(400)).await;

    let seen = drain(&mut events);
    let failed = seen.iter().any(|e| {
        matches!(
            e,
            CompileEvent::Finished {
                result: Err(EngineError::Compile(_)),
                ..
            }
        )
    });
    assert!(failed, "{seen:?}");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_blank_immediate_never_reaches_engine() {
    let compiler = FakeCompiler::new(Duration::ZERO);
    let (handle, _events) = start(&compiler);

    let result = handle.compile_now(snap(1, ""), ExportKind::Publish).await;
    assert!(matches!(result, Err(EngineError::Compile(_))));
    assert_eq!(compiler.call_count(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_shutdown_stops_loop() {
    let compiler = FakeCompiler::new(Duration::ZERO);
    let (handle, mut events) = start(&compiler);

    handle.shutdown();
    sleep(Duration::from_millis(10)).await;
    assert!(events.recv().await.is_none());

    let result = handle.compile_now(snap(1, "= x"), ExportKind::Preview).await;
    assert!(matches!(result, Err(EngineError::NotReady)));
}
