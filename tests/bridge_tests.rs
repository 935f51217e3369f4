use futures::StreamExt;
use pico_stream::{
    open_event_bridge, open_event_bridge_with_config, BridgeConfig, Capability, EventEmitter, EventSource,
    LazyList, LazyListError, ListenOptions,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn emitter<T: Send + 'static>() -> (Arc<EventEmitter<T>>, Arc<dyn EventSource<T>>) {
    let emitter = Arc::new(EventEmitter::new());
    let source: Arc<dyn EventSource<T>> = emitter.clone();
    (emitter, source)
}

/// A bridge pass never completes, so "nothing more" means "still pending"
async fn assert_idle<S>(pass: &mut S)
where
    S: futures::Stream + Unpin,
{
    assert!(
        timeout(Duration::from_millis(30), pass.next()).await.is_err(),
        "bridge should be waiting for more events"
    );
}

#[tokio::test]
async fn test_events_pushed_before_pull_arrive_in_order() {
    let (emitter, source) = emitter::<&'static str>();
    let bridge = open_event_bridge(source, "input", ListenOptions::new());

    emitter.emit("input", "x");
    emitter.emit("input", "y");

    let mut pass = bridge.stream();
    assert_eq!(pass.next().await, Some("x"));
    assert_eq!(pass.next().await, Some("y"));
    assert_idle(&mut pass).await;
}

#[tokio::test]
async fn test_first_three_pulls_match_arrival_order() {
    let (emitter, source) = emitter::<u32>();
    let bridge = open_event_bridge(source, "e", ListenOptions::new());

    for e in [1, 2, 3] {
        emitter.emit("e", e);
    }

    let first: Vec<u32> = bridge.stream().take(3).collect().await;
    assert_eq!(first, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_waiting_consumer_is_woken_by_push() {
    let (emitter, source) = emitter::<u32>();
    let bridge = open_event_bridge(source, "tick", ListenOptions::new());

    let consumer = tokio::spawn(async move { bridge.stream().take(2).collect::<Vec<_>>().await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    emitter.emit("tick", 7);
    tokio::time::sleep(Duration::from_millis(10)).await;
    emitter.emit("tick", 8);

    let received = timeout(Duration::from_secs(1), consumer)
        .await
        .expect("consumer should be woken")
        .unwrap();
    assert_eq!(received, vec![7, 8]);
}

#[tokio::test]
async fn test_terminal_event_stops_primary_delivery() {
    let (emitter, source) = emitter::<String>();
    let bridge = open_event_bridge(source, "move", ListenOptions::new().end("end"));
    assert_eq!(emitter.listener_count("move"), 1);
    assert_eq!(emitter.listener_count("end"), 1);

    emitter.emit("move", "a".to_string());
    emitter.emit("end", "stop".to_string());
    // Primary listener is gone: nobody receives this one
    assert_eq!(emitter.emit("move", "b".to_string()), 0);
    assert_eq!(emitter.listener_count("move"), 0);
    assert_eq!(emitter.listener_count("end"), 0);

    let mut pass = bridge.stream();
    assert_eq!(pass.next().await.as_deref(), Some("a"));
    assert_eq!(pass.next().await.as_deref(), Some("stop"));
    // The sequence goes idle rather than ending
    assert_idle(&mut pass).await;

    let stats = bridge.stats();
    assert!(stats.terminated);
    assert!(!stats.subscribed);
    assert_eq!(stats.delivered, 2);
}

#[tokio::test]
async fn test_without_terminal_event_subscription_outlives_bridge() {
    let (emitter, source) = emitter::<u8>();
    let bridge = open_event_bridge(source, "scroll", ListenOptions::new());
    drop(bridge);

    // No implicit teardown: the listener stays registered
    assert_eq!(emitter.listener_count("scroll"), 1);
    assert_eq!(emitter.emit("scroll", 1), 1);
}

#[tokio::test]
async fn test_backlog_survives_abandoned_pass() {
    let (emitter, source) = emitter::<u32>();
    let bridge = open_event_bridge(source, "data", ListenOptions::new());

    for e in 1..=3 {
        emitter.emit("data", e);
    }

    {
        let mut first = bridge.stream();
        assert_eq!(first.next().await, Some(1));
    }

    let mut second = bridge.stream();
    assert_eq!(second.next().await, Some(2));
    assert_eq!(second.next().await, Some(3));
    assert_idle(&mut second).await;
}

#[tokio::test]
async fn test_dispose_removes_listeners() {
    let (emitter, source) = emitter::<u8>();
    let bridge = open_event_bridge(source, "drag", ListenOptions::new().end("drop"));

    emitter.emit("drag", 1);
    bridge.dispose().unwrap();

    assert_eq!(emitter.listener_count("drag"), 0);
    assert_eq!(emitter.listener_count("drop"), 0);
    assert_eq!(
        bridge.dispose(),
        Err(LazyListError::Disposed("drag".to_string()))
    );

    // Already buffered values are still delivered
    let mut pass = bridge.stream();
    assert_eq!(pass.next().await, Some(1));
    assert_idle(&mut pass).await;

    let stats = bridge.stats();
    assert!(!stats.subscribed);
    assert!(!stats.terminated);
}

#[tokio::test]
async fn test_stats_track_pending_and_delivered() {
    let (emitter, source) = emitter::<u8>();
    let bridge = open_event_bridge(source, "key", ListenOptions::new());

    emitter.emit("key", 1);
    emitter.emit("key", 2);
    let stats = bridge.stats();
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.delivered, 0);
    assert!(stats.subscribed);
    assert_eq!(stats.to_string(), "EventBridge('key', 2 pending, 0 delivered)");

    let mut pass = bridge.stream();
    pass.next().await;
    let stats = bridge.stats();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.delivered, 1);

    bridge.dispose().unwrap();
    assert_eq!(bridge.stats().to_string(), "EventBridge('key', 1 pending, 1 delivered, disposed)");
}

#[tokio::test]
async fn test_backlog_threshold_never_drops() {
    let (emitter, source) = emitter::<usize>();
    let config = BridgeConfig { initial_capacity: 2, backlog_warning: Some(4) };
    let bridge = open_event_bridge_with_config(source, "flood", ListenOptions::new(), config);

    for e in 0..10 {
        emitter.emit("flood", e);
    }

    let received: Vec<usize> = bridge.stream().take(10).collect().await;
    assert_eq!(received, (0..10).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_producer_keeps_order() {
    let (emitter, source) = emitter::<usize>();
    let bridge = open_event_bridge(source, "n", ListenOptions::new());
    let count = 2_000;

    let producer = tokio::spawn(async move {
        for n in 0..count {
            emitter.emit("n", n);
            if n % 100 == 0 {
                tokio::task::yield_now().await;
            }
        }
    });

    let received: Vec<usize> = timeout(Duration::from_secs(5), bridge.stream().take(count).collect())
        .await
        .expect("every pushed value should be delivered");
    producer.await.unwrap();

    assert_eq!(received, (0..count).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_listen_builds_async_only_list() {
    let (emitter, source) = emitter::<i32>();
    let clicks = LazyList::listen(source, "click", ListenOptions::new().end("done"));
    assert_eq!(clicks.capability(), Capability::Async);
    assert_eq!(clicks.iter().err(), Some(LazyListError::AsyncOnly));
    assert_eq!(clicks.reduce(0, |a, b| a + b), Err(LazyListError::AsyncOnly));

    for x in [1, 2, 3, 4, 5, 6] {
        emitter.emit("click", x);
    }
    emitter.emit("done", 100);

    let doubled_evens: Vec<i32> = clicks
        .filter(|x| x % 2 == 0)
        .map(|x| x * 2)
        .stream()
        .take(4)
        .collect()
        .await;
    assert_eq!(doubled_evens, vec![4, 8, 12, 200]);
}

#[tokio::test]
async fn test_bridge_backed_list_zips_with_finite_list() {
    let (emitter, source) = emitter::<&'static str>();
    let events = LazyList::listen(source, "msg", ListenOptions::new());
    let labels = LazyList::from_iterable(vec![1, 2]);

    emitter.emit("msg", "a");
    emitter.emit("msg", "b");
    emitter.emit("msg", "c");

    let pairs: Vec<_> = events.zip(&labels).stream().take(3).collect().await;
    assert_eq!(
        pairs,
        vec![(Some("a"), Some(1)), (Some("b"), Some(2)), (Some("c"), None)]
    );
}

#[tokio::test]
async fn test_bridge_handle_streams_through_its_own_pass() {
    let (emitter, source) = emitter::<u32>();
    let mut bridge = open_event_bridge(source, "tick", ListenOptions::new());

    emitter.emit("tick", 1);
    emitter.emit("tick", 2);
    assert_eq!(bridge.next().await, Some(1));
    assert_eq!(bridge.next().await, Some(2));
    assert_idle(&mut bridge).await;

    // A clone starts its own pass over the same buffer
    let mut other = bridge.clone();
    emitter.emit("tick", 3);
    assert_eq!(other.next().await, Some(3));
    assert_eq!(bridge.stats().delivered, 3);

    emitter.emit("tick", 4);
    let rest: Vec<u32> = (&mut bridge).take(1).collect().await;
    assert_eq!(rest, vec![4]);
}
