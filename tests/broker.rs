//! Broker behavior with in-memory connections.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use pushvisor::{
    BrokerConfig, BrokerError, BrokerState, ChannelObserver, Connection, ConnectionFactory,
    FactoryFn, Notification, Observe, Outcome, SendError, ServiceBroker,
};
use tokio::sync::{Semaphore, mpsc::UnboundedReceiver};

#[derive(Clone, Debug, PartialEq)]
struct Msg {
    id: usize,
    target: String,
}

impl Msg {
    fn to(id: usize, target: &str) -> Self {
        Self {
            id,
            target: target.to_string(),
        }
    }
}

impl Notification for Msg {
    fn target(&self) -> &str {
        &self.target
    }
}

#[derive(Default)]
struct Recorder {
    created: AtomicUsize,
    sent: Mutex<Vec<usize>>,
    sent_by: Mutex<Vec<(usize, usize)>>,
}

impl Recorder {
    fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

struct FakeConnection {
    conn: usize,
    rec: Arc<Recorder>,
    gate: Option<Arc<Semaphore>>,
}

#[async_trait]
impl Connection<Msg> for FakeConnection {
    async fn send(&self, n: &Msg) -> Result<(), SendError> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.map_err(SendError::transport)?;
        }
        self.rec.sent.lock().push(n.id);
        self.rec.sent_by.lock().push((self.conn, n.id));

        match n.target.as_str() {
            "retry" => Err(SendError::RetryAfter {
                reason: "busy".into(),
                retry_not_before: Utc::now(),
            }),
            "expired" => Err(SendError::TargetExpired {
                old_target: n.target.clone(),
                expired_at: Utc::now(),
            }),
            "panic" => panic!("connection blew up"),
            _ => Ok(()),
        }
    }
}

fn factory(rec: &Arc<Recorder>, gate: Option<Arc<Semaphore>>) -> impl ConnectionFactory<Msg> {
    let rec = Arc::clone(rec);
    FactoryFn::new(move || {
        let conn = rec.created.fetch_add(1, Ordering::SeqCst) + 1;
        FakeConnection {
            conn,
            rec: Arc::clone(&rec),
            gate: gate.clone(),
        }
    })
}

fn broker(
    rec: &Arc<Recorder>,
    gate: Option<Arc<Semaphore>>,
    cfg: BrokerConfig,
) -> (ServiceBroker<Msg>, UnboundedReceiver<Outcome<Msg>>) {
    let broker = ServiceBroker::new(factory(rec, gate), cfg).unwrap();
    let (observer, outcomes) = ChannelObserver::new();
    broker.subscribe(Arc::new(observer));
    (broker, outcomes)
}

fn collect(outcomes: &mut UnboundedReceiver<Outcome<Msg>>) -> Vec<Outcome<Msg>> {
    let mut out = Vec::new();
    while let Ok(o) = outcomes.try_recv() {
        out.push(o);
    }
    out
}

#[tokio::test]
async fn three_items_two_workers() {
    let rec = Arc::new(Recorder::default());
    let (broker, mut outcomes) = broker(&rec, None, BrokerConfig::default().with_scale_size(2));

    for id in 0..3 {
        broker.queue_notification(Msg::to(id, "device")).unwrap();
    }
    broker.start().await.unwrap();
    assert_eq!(broker.worker_count().await, 2);
    broker.stop(false).await.unwrap();

    let events = collect(&mut outcomes);
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(Outcome::is_success));
    assert_eq!(rec.created(), 2);
    assert_eq!(broker.state(), BrokerState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_item_enqueued_before_start_gets_exactly_one_event() {
    let rec = Arc::new(Recorder::default());
    let (broker, mut outcomes) = broker(&rec, None, BrokerConfig::default().with_scale_size(3));

    for id in 0..200 {
        broker.queue_notification(Msg::to(id, "device")).unwrap();
    }
    assert_eq!(broker.pending(), 200);
    broker.start().await.unwrap();
    broker.stop(false).await.unwrap();

    let mut seen: HashMap<usize, usize> = HashMap::new();
    for outcome in collect(&mut outcomes) {
        *seen.entry(outcome.notification().id).or_default() += 1;
    }
    assert_eq!(seen.len(), 200);
    assert!(seen.values().all(|&count| count == 1));
    assert_eq!(rec.sent.lock().len(), 200);
    assert_eq!(broker.pending(), 0);
}

#[tokio::test]
async fn change_scale_converges_to_requested_count() {
    let rec = Arc::new(Recorder::default());
    let (broker, _outcomes) = broker(&rec, None, BrokerConfig::default());

    broker.start().await.unwrap();
    assert_eq!(broker.worker_count().await, 1);

    broker.change_scale(4).await.unwrap();
    assert_eq!(broker.worker_count().await, 4);
    assert_eq!(rec.created(), 4);

    broker.change_scale(2).await.unwrap();
    assert_eq!(broker.worker_count().await, 2);
    assert_eq!(rec.created(), 4);

    broker.change_scale(3).await.unwrap();
    assert_eq!(broker.worker_count().await, 3);
    assert_eq!(rec.created(), 5);

    assert_eq!(
        broker.change_scale(0).await,
        Err(BrokerError::InvalidScale { requested: 0 })
    );
    assert_eq!(broker.worker_count().await, 3);

    broker.stop(false).await.unwrap();
}

#[tokio::test]
async fn scaled_down_worker_finishes_its_batch_and_is_joined_by_stop() {
    let rec = Arc::new(Recorder::default());
    let gate = Arc::new(Semaphore::new(0));
    let (broker, mut outcomes) =
        broker(&rec, Some(Arc::clone(&gate)), BrokerConfig::default());

    broker.start().await.unwrap();
    broker.queue_notification(Msg::to(0, "in-flight")).unwrap();
    // worker #1 holds item 0 on the gate
    tokio::time::sleep(Duration::from_millis(20)).await;

    broker.change_scale(2).await.unwrap();
    broker.change_scale(1).await.unwrap();
    assert_eq!(broker.worker_count().await, 1);
    assert_eq!(rec.created(), 2);

    broker.queue_notification(Msg::to(1, "after-scale-down")).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(rec.sent_by.lock().is_empty());

    gate.add_permits(10);
    broker.stop(false).await.unwrap();
    assert_eq!(broker.state(), BrokerState::Stopped);

    let mut ids: Vec<usize> = collect(&mut outcomes)
        .iter()
        .map(|o| {
            assert!(o.is_success());
            o.notification().id
        })
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1]);

    // retired connection #1 sent only its own batch
    let mut sent_by = rec.sent_by.lock().clone();
    sent_by.sort_unstable();
    assert_eq!(sent_by, vec![(1, 0), (2, 1)]);
    assert_eq!(rec.created(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_scale_changes_settle_on_last_recorded_value() {
    let rec = Arc::new(Recorder::default());
    let (broker, _outcomes) = broker(&rec, None, BrokerConfig::default());
    broker.start().await.unwrap();

    let (a, b) = tokio::join!(broker.change_scale(2), broker.change_scale(6));
    a.unwrap();
    b.unwrap();

    assert_eq!(broker.worker_count().await, broker.scale_size());
    broker.stop(true).await.unwrap();
}

#[tokio::test]
async fn second_stop_is_a_lifecycle_error() {
    let rec = Arc::new(Recorder::default());
    let (broker, _outcomes) = broker(&rec, None, BrokerConfig::default());

    broker.start().await.unwrap();
    broker.stop(false).await.unwrap();

    let err = broker.stop(false).await.unwrap_err();
    assert_eq!(err.as_label(), "broker_lifecycle");
    assert_eq!(broker.queue_notification(Msg::to(1, "late")), Err(BrokerError::QueueCompleted));
}

#[tokio::test]
async fn immediate_stop_abandons_buffered_items() {
    let rec = Arc::new(Recorder::default());
    let gate = Arc::new(Semaphore::new(0));
    let (broker, mut outcomes) =
        broker(&rec, Some(Arc::clone(&gate)), BrokerConfig::default());
    let broker = Arc::new(broker);

    broker.start().await.unwrap();
    broker.queue_notification(Msg::to(0, "in-flight")).unwrap();
    // let the worker take item 0 and block on the gate
    tokio::time::sleep(Duration::from_millis(20)).await;

    broker.queue_notification(Msg::to(1, "buffered")).unwrap();
    broker.queue_notification(Msg::to(2, "buffered")).unwrap();

    let stopping = {
        let broker = Arc::clone(&broker);
        tokio::spawn(async move { broker.stop(true).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(broker.state(), BrokerState::Draining);

    gate.add_permits(10);
    stopping.await.unwrap().unwrap();

    let events = collect(&mut outcomes);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].notification().id, 0);
    assert_eq!(*rec.sent.lock(), vec![0]);
    assert_eq!(broker.pending(), 2);
}

#[tokio::test]
async fn stop_grace_aborts_stuck_workers() {
    let rec = Arc::new(Recorder::default());
    let gate = Arc::new(Semaphore::new(0));
    let (broker, mut outcomes) = broker(
        &rec,
        Some(gate),
        BrokerConfig::default()
            .with_scale_size(2)
            .with_stop_grace(Duration::from_millis(50)),
    );

    broker.start().await.unwrap();
    broker.queue_notification(Msg::to(0, "never-answers")).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    match broker.stop(false).await {
        Err(BrokerError::GraceExceeded { grace, stuck }) => {
            assert_eq!(grace, Duration::from_millis(50));
            assert_eq!(stuck, 1);
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(broker.state(), BrokerState::Stopped);
    assert!(collect(&mut outcomes).is_empty());
}

#[tokio::test]
async fn failures_are_reported_not_retried() {
    let rec = Arc::new(Recorder::default());
    let (broker, mut outcomes) = broker(&rec, None, BrokerConfig::default());

    broker.queue_notification(Msg::to(0, "retry")).unwrap();
    broker.queue_notification(Msg::to(1, "expired")).unwrap();
    broker.queue_notification(Msg::to(2, "panic")).unwrap();
    broker.queue_notification(Msg::to(3, "device")).unwrap();
    broker.start().await.unwrap();
    broker.stop(false).await.unwrap();

    let mut labels: HashMap<usize, &'static str> = HashMap::new();
    for outcome in collect(&mut outcomes) {
        let label = outcome.error().map_or("ok", SendError::as_label);
        labels.insert(outcome.notification().id, label);
    }

    assert_eq!(labels[&0], "send_retry_after");
    assert_eq!(labels[&1], "send_target_expired");
    assert_eq!(labels[&2], "send_transport");
    assert_eq!(labels[&3], "ok");

    let mut sent = rec.sent.lock().clone();
    sent.sort_unstable();
    assert_eq!(sent, vec![0, 1, 2, 3]);
}

#[derive(Default)]
struct Counting {
    ok: AtomicUsize,
    failed: AtomicUsize,
}

#[async_trait]
impl Observe<Msg> for Counting {
    async fn on_succeeded(&self, _n: &Msg) {
        self.ok.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_failed(&self, _n: &Msg, _err: &SendError) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}

struct Exploding;

#[async_trait]
impl Observe<Msg> for Exploding {
    async fn on_succeeded(&self, _n: &Msg) {
        panic!("observer bug");
    }

    async fn on_failed(&self, _n: &Msg, _err: &SendError) {
        panic!("observer bug");
    }
}

#[tokio::test]
async fn panicking_observer_does_not_starve_others() {
    let rec = Arc::new(Recorder::default());
    let broker = ServiceBroker::new(factory(&rec, None), BrokerConfig::default()).unwrap();
    let counting = Arc::new(Counting::default());
    broker.subscribe(Arc::new(Exploding));
    broker.subscribe(Arc::clone(&counting) as Arc<dyn Observe<Msg>>);

    broker.queue_notification(Msg::to(0, "device")).unwrap();
    broker.queue_notification(Msg::to(1, "expired")).unwrap();
    broker.start().await.unwrap();
    broker.stop(false).await.unwrap();

    assert_eq!(counting.ok.load(Ordering::SeqCst), 1);
    assert_eq!(counting.failed.load(Ordering::SeqCst), 1);
}
