//! Fan-out execution of conversion tasks under a bounded worker pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Semaphore};

use rulesmith_core::{BatchSettings, ConversionResult, ConversionStatus, RuleItem, RunSummary};

use crate::convert::RuleConverter;

/// Reporting side channel: one event per lifecycle step of an item.
/// Rendering is the caller's concern; correctness never depends on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    ItemStarted {
        ordinal: usize,
        name: String,
    },
    ItemFinished {
        ordinal: usize,
        name: String,
        status: ConversionStatus,
        error: Option<String>,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: BatchEvent);
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: BatchEvent) {}
}

/// Cooperative stop signal, checked before each dispatch and again when a
/// worker slot is granted. Items already converting run to completion;
/// items that never started are recorded as failed.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct BatchScheduler {
    converter: Arc<RuleConverter>,
    settings: BatchSettings,
}

impl BatchScheduler {
    pub fn new(converter: Arc<RuleConverter>, settings: BatchSettings) -> Self {
        Self {
            converter,
            settings,
        }
    }

    /// Run every item through the converter, at most `settings.workers()` in
    /// flight at once, and collect exactly one result per item in original
    /// input order regardless of completion order.
    pub async fn run(
        &self,
        items: Vec<RuleItem>,
        sink: Arc<dyn ProgressSink>,
        cancel: &CancelFlag,
    ) -> RunSummary {
        let total = items.len();
        let started = Instant::now();
        let names: Vec<String> = items.iter().map(|item| item.name.clone()).collect();

        // Workers report over a channel tagged with the input ordinal; the
        // single collector below is the only writer of the aggregate.
        let (tx, mut rx) = mpsc::channel::<(usize, ConversionResult)>(total.max(1));
        let semaphore = Arc::new(Semaphore::new(self.settings.workers()));
        let mut handles = Vec::with_capacity(total);

        for (ordinal, item) in items.into_iter().enumerate() {
            if cancel.is_cancelled() {
                let result = ConversionResult::failed(
                    &item.name,
                    "cancelled before dispatch",
                    Duration::ZERO,
                );
                sink.emit(BatchEvent::ItemFinished {
                    ordinal,
                    name: item.name.clone(),
                    status: result.status,
                    error: result.error.clone(),
                });
                let _ = tx.send((ordinal, result)).await;
                continue;
            }

            let converter = self.converter.clone();
            let semaphore = semaphore.clone();
            let sink = sink.clone();
            let tx = tx.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                // The flag may have been raised while this item waited for
                // a slot; record it without starting the conversion.
                if cancel.is_cancelled() {
                    let result = ConversionResult::failed(
                        &item.name,
                        "cancelled before dispatch",
                        Duration::ZERO,
                    );
                    sink.emit(BatchEvent::ItemFinished {
                        ordinal,
                        name: item.name.clone(),
                        status: result.status,
                        error: result.error.clone(),
                    });
                    let _ = tx.send((ordinal, result)).await;
                    return;
                }
                sink.emit(BatchEvent::ItemStarted {
                    ordinal,
                    name: item.name.clone(),
                });
                let result = converter.convert(&item).await;
                sink.emit(BatchEvent::ItemFinished {
                    ordinal,
                    name: item.name.clone(),
                    status: result.status,
                    error: result.error.clone(),
                });
                let _ = tx.send((ordinal, result)).await;
            }));
        }
        drop(tx);

        let mut slots: Vec<Option<ConversionResult>> = (0..total).map(|_| None).collect();
        while let Some((ordinal, result)) = rx.recv().await {
            slots[ordinal] = Some(result);
        }
        for handle in handles {
            if let Err(err) = handle.await {
                log::error!("conversion task aborted: {err}");
            }
        }

        // A panicked task sent nothing; backfill so no result is dropped.
        let results = slots
            .into_iter()
            .enumerate()
            .map(|(ordinal, slot)| {
                slot.unwrap_or_else(|| {
                    ConversionResult::failed(
                        &names[ordinal],
                        "conversion task aborted unexpectedly",
                        Duration::ZERO,
                    )
                })
            })
            .collect();

        RunSummary::from_results(results, started.elapsed())
    }
}
