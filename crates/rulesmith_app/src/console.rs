//! Live console progress for a running batch.

use std::sync::atomic::{AtomicUsize, Ordering};

use rulesmith_core::ConversionStatus;
use rulesmith_engine::{BatchEvent, ProgressSink};

/// Prints one line per finished item, numbered by completion order.
pub struct ConsoleSink {
    total: usize,
    done: AtomicUsize,
}

impl ConsoleSink {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            done: AtomicUsize::new(0),
        }
    }
}

impl ProgressSink for ConsoleSink {
    fn emit(&self, event: BatchEvent) {
        let BatchEvent::ItemFinished {
            name,
            status,
            error,
            ..
        } = event
        else {
            return;
        };
        let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        match status {
            ConversionStatus::Success => {
                println!("[{done}/{total}] {name} ... ✓ success", total = self.total);
            }
            ConversionStatus::Partial => {
                println!(
                    "[{done}/{total}] {name} ... ~ partial: {detail}",
                    total = self.total,
                    detail = error.as_deref().unwrap_or("see report"),
                );
            }
            ConversionStatus::Failed => {
                println!(
                    "[{done}/{total}] {name} ... ✗ {detail}",
                    total = self.total,
                    detail = error.as_deref().unwrap_or("failed"),
                );
            }
        }
    }
}
