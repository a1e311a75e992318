//! Grant stages as seen by a tracing subscriber.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use custody::GrantStatus;
use custody_testkit::Harness;

/// Collects the `stage` field of every event.
#[derive(Clone, Default)]
struct StageRecorder(Arc<Mutex<Vec<String>>>);

impl StageRecorder {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

struct StageField(Option<String>);

impl Visit for StageField {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "stage" {
            self.0 = Some(format!("{:?}", value));
        }
    }
}

impl<S: Subscriber> Layer<S> for StageRecorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut stage = StageField(None);
        event.record(&mut stage);
        if let Some(stage) = stage.0 {
            self.0.lock().unwrap().push(stage);
        }
    }
}

#[tokio::test]
async fn test_first_grant_passes_every_stage() {
    let recorder = StageRecorder::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

    let harness = Harness::new();
    let alice = harness.party("alice").await.unwrap();
    let bob = harness.party("bob").await.unwrap();
    let doc = harness.upload(&alice, "report", b"x").await.unwrap();
    recorder.take();

    harness
        .custody
        .grant_access(&alice.password, &alice.id, &doc.id, &bob.id)
        .await
        .unwrap();
    assert_eq!(
        recorder.take(),
        ["requested", "key_unwrapped", "key_rewrapped", "grant_emitted", "confirmed"]
    );
}

#[tokio::test]
async fn test_repeated_grant_passes_every_stage() {
    let recorder = StageRecorder::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

    let harness = Harness::new();
    let alice = harness.party("alice").await.unwrap();
    let bob = harness.party("bob").await.unwrap();
    let doc = harness.upload(&alice, "report", b"x").await.unwrap();
    harness
        .custody
        .grant_access(&alice.password, &alice.id, &doc.id, &bob.id)
        .await
        .unwrap();
    recorder.take();

    let outcome = harness
        .custody
        .grant_access(&alice.password, &alice.id, &doc.id, &bob.id)
        .await
        .unwrap();
    assert_eq!(outcome.status, GrantStatus::AlreadyGranted);
    assert_eq!(
        recorder.take(),
        ["requested", "key_unwrapped", "key_rewrapped", "grant_emitted", "confirmed"]
    );
}
