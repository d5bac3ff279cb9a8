//! Common test utilities for lossless-dl integration tests

#[allow(dead_code)]
pub mod backends;
#[allow(dead_code)]
pub mod config;

#[allow(unused_imports)]
pub use backends::*;
#[allow(unused_imports)]
pub use config::*;

use lossless_dl::Event;
use std::time::Duration;
use tokio::sync::broadcast;

/// Wait for the first event matching `pred`
///
/// Returns None on timeout or when the channel closes.
#[allow(dead_code)]
pub async fn wait_for_event<F>(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    pred: F,
) -> Option<Event>
where
    F: Fn(&Event) -> bool,
{
    tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}
