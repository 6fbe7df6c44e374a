// チャンネルとマルチプレクサの統合テスト
#[path = "../fixtures/mod.rs"]
mod fixtures;

use balanced_pipeline::{
    core::{StageId, StageReporter},
    engine::{Multiplexer, StageRuntime},
    BoundedChannel, CancellationSignal, NoOpStageReporter, PipelineError,
};
use fixtures::within;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_second_put_blocks_without_consumer() {
    let cancel = CancellationSignal::new();
    let channel = BoundedChannel::shared("blocking", 1, cancel.clone()).unwrap();

    channel.put(1u64).await.unwrap();
    let blocked = tokio::time::timeout(Duration::from_millis(50), channel.put(2)).await;
    assert!(blocked.is_err(), "容量1のチャンネルで2件目のputが完了してはならない");
    assert_eq!(channel.len(), 1);

    // キャンセルで待機中のputが解放される
    let producer = {
        let channel = channel.clone();
        tokio::spawn(async move { channel.put(3).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();
    let result = within(1, producer).await.unwrap();
    assert!(matches!(result, Err(PipelineError::Cancelled { .. })));
}

#[tokio::test]
async fn test_backpressure_bounds_buffered_items() {
    let cancel = CancellationSignal::new();
    let channel = BoundedChannel::shared("bounded", 3, cancel).unwrap();

    let producer = {
        let channel = channel.clone();
        tokio::spawn(async move {
            for i in 0..50u64 {
                channel.put(i).await?;
            }
            channel.close();
            Ok::<_, PipelineError>(())
        })
    };

    let mut received = Vec::new();
    while let Some(item) = within(2, channel.take()).await.unwrap() {
        tokio::time::sleep(Duration::from_millis(1)).await;
        received.push(item);
    }
    producer.await.unwrap().unwrap();

    assert_eq!(received, (0..50).collect::<Vec<_>>());
    assert!(channel.peak_len() <= 3);
    assert!(channel.is_completed());
}

#[tokio::test]
async fn test_exhaustion_reports_none_repeatedly() {
    let channel = BoundedChannel::<u64>::new("done", 2, CancellationSignal::new()).unwrap();
    channel.put(9).await.unwrap();
    channel.close();

    assert_eq!(channel.take().await.unwrap(), Some(9));
    assert_eq!(channel.take().await.unwrap(), None);
    assert_eq!(channel.take().await.unwrap(), None);
    assert!(matches!(
        channel.put(10).await,
        Err(PipelineError::ClosedChannel { .. })
    ));
}

async fn run_multiplexer<R: StageReporter + 'static>(
    first: Vec<u64>,
    second: Vec<u64>,
    reporter: R,
) -> (Vec<u64>, balanced_pipeline::core::MultiplexerOutcome) {
    let runtime = StageRuntime::new(CancellationSignal::new(), Arc::new(reporter));
    let capacity = first.len().max(second.len()).max(1);
    let x = BoundedChannel::shared("x", capacity, runtime.cancel.clone()).unwrap();
    let y = BoundedChannel::shared("y", capacity, runtime.cancel.clone()).unwrap();
    let output = BoundedChannel::shared("out", 64, runtime.cancel.clone()).unwrap();

    for item in first {
        x.put(item).await.unwrap();
    }
    for item in second {
        y.put(item).await.unwrap();
    }
    x.close();
    y.close();

    let outcome = within(
        5,
        Multiplexer::new(StageId::new("Multiplexer", 2), [x, y], output.clone(), 1)
            .with_idle_backoff(Duration::from_millis(1))
            .run(runtime),
    )
    .await
    .unwrap();

    let mut emitted = Vec::new();
    while let Some(item) = output.take().await.unwrap() {
        emitted.push(item);
    }
    (emitted, outcome)
}

#[tokio::test]
async fn test_multiplexer_reorders_out_of_order_branch() {
    let (emitted, outcome) = run_multiplexer(
        vec![1, 3, 5, 7],
        vec![4, 2, 6, 8],
        NoOpStageReporter::new(),
    )
    .await;

    assert_eq!(emitted, (1..=8).collect::<Vec<_>>());
    assert!(!outcome.cancelled);
    assert_eq!(outcome.stats.emitted, 8);
    assert!(outcome.stats.peak_held_back >= 1);
}

#[tokio::test]
async fn test_multiplexer_handles_one_empty_branch() {
    let (emitted, outcome) =
        run_multiplexer(vec![1, 2, 3, 4, 5], Vec::new(), NoOpStageReporter::new()).await;

    assert_eq!(emitted, vec![1, 2, 3, 4, 5]);
    assert_eq!(outcome.stats.peak_input_len, [5, 0]);
}
