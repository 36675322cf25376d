//! Server-Sent Events (SSE) utilities
//!
//! Turns an [`EventBus`](crate::events::EventBus) subscription into an axum SSE
//! response carrying the events of a single travel group.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::events::WayfareEvent;

/// Interval between heartbeat comments
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Build an SSE stream forwarding every event of `group_id`
///
/// Sends a `ConnectionStatus` event first, then one SSE event per matching
/// [`WayfareEvent`] named after its variant. A heartbeat comment goes out every
/// 15 seconds. The stream ends when the bus is dropped.
pub fn group_event_stream(
    mut rx: broadcast::Receiver<WayfareEvent>,
    group_id: Uuid,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(group_id = %group_id, "New SSE client connected to group events");

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("ConnectionStatus").data("connected"));

        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => {
                    match received {
                        Ok(event) if event.group_id() == group_id => {
                            let event_type = event.event_type();
                            match serde_json::to_string(&event) {
                                Ok(event_json) => {
                                    debug!(group_id = %group_id, "SSE: Broadcasting {}", event_type);
                                    yield Ok(Event::default().event(event_type).data(event_json));
                                }
                                Err(e) => {
                                    warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                                }
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(group_id = %group_id, skipped, "SSE: Subscriber lagged, events dropped");
                        }
                        Err(RecvError::Closed) => {
                            info!(group_id = %group_id, "SSE: Event bus closed, ending stream");
                            break;
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("heartbeat"))
}
