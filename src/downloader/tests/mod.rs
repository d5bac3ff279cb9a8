use super::test_helpers::*;
use super::*;
use crate::error::ErrorKind;
use crate::planner;
use crate::types::{DownloadOutcome, DownloadPreferences, DownloadRequest, DownloadState, Event};
use std::time::Duration;
use tokio::sync::broadcast;


/// Run the sample track through `downloader` with `prefs`
async fn run(downloader: &LosslessDownloader, prefs: DownloadPreferences) -> DownloadOutcome {
    downloader
        .execute(DownloadRequest::new(sample_identity(), prefs))
        .await
}

/// Wait (bounded) for the first event matching `pred`
async fn wait_for_event<F>(rx: &mut broadcast::Receiver<Event>, pred: F) -> Event
where
    F: Fn(&Event) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Every event currently buffered
fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
