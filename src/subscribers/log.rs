use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Base subscriber that logs events to stdout.
///
/// Enabled via the `logging` feature. Useful for demos and debugging.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    fn name(&self) -> &'static str {
        "log-writer"
    }

    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::SchedulerStarted => {
                println!("[started]");
            }
            EventKind::SchedulerStopping => {
                println!("[stopping]");
            }
            EventKind::SchedulerStopped => {
                println!("[stopped]");
            }
            EventKind::WorkReceived => {
                println!("[received] tag={:?}", e.tag);
            }
            EventKind::ConsumeFailed => {
                println!("[consume-failed] err={:?}", e.reason);
            }
            EventKind::WorkFailed => {
                println!("[work-failed] tag={:?} err={:?}", e.tag, e.reason);
            }
            EventKind::ProduceFailed => {
                println!("[produce-failed] tag={:?} err={:?}", e.tag, e.reason);
            }
            EventKind::WorkAcked => {
                println!("[acked] tag={:?} outgoing={:?}", e.tag, e.outgoing);
            }
            EventKind::AckFailed => {
                println!("[ack-failed] tag={:?} err={:?}", e.tag, e.reason);
            }
            EventKind::WorkerPanicked => {
                println!("[panic] err={:?}", e.reason);
            }
        }
    }
}
