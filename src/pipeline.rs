//! Parallel, order-preserving annotation pipeline.
//!
//! Worker threads consume `(seq, variant, extra)` items from a bounded input
//! queue and emit `(seq, annotations)` to a bounded output queue; a single
//! collector restores input order by sequence number, so the delivered output
//! is byte-identical to sequential processing.  The annotator itself only
//! reads the immutable transcript model, which is what makes the workers safe
//! without locks.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use crossbeam_channel::bounded;

pub use crate::pipeline::error::Error;
use crate::{
    annotate::{Annotation, Annotator},
    store::VariantStore,
    variant::Variant,
};

mod error {
    /// Error type for pipeline runs.
    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("annotation input failed")]
        Input(#[source] Box<dyn std::error::Error + Send + Sync>),
        #[error("pipeline cancelled")]
        Cancelled,
    }
}

/// Request-scoped cancellation flag, checked at queue operations.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counters reported after a pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Variants annotated and delivered to the sink.
    pub annotated: u64,
    /// Malformed variants skipped with a warning.
    pub skipped: u64,
}

/// Ordered worker pool feeding the annotator.
pub struct Pipeline {
    annotator: Arc<Annotator>,
    workers: usize,
    cancel: CancelFlag,
    store: Option<Arc<VariantStore>>,
}

impl Pipeline {
    /// Create a pipeline with the given worker count, defaulting to the
    /// number of logical CPUs.
    pub fn new(annotator: Arc<Annotator>, workers: Option<usize>) -> Self {
        let workers = workers
            .unwrap_or_else(|| {
                thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1);
        Self {
            annotator,
            workers,
            cancel: CancelFlag::new(),
            store: None,
        }
    }

    /// Record every annotation into the given store as it is produced.
    ///
    /// Failed appends are logged as warnings; annotation output is not
    /// affected.
    pub fn with_store(mut self, store: Arc<VariantStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Flag that cancels this pipeline at the next queue operation.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Annotate all variants, delivering results to `sink` in input order.
    pub fn process<X, I, F>(&self, inputs: I, sink: F) -> Result<Stats, Error>
    where
        X: Send,
        I: IntoIterator<Item = (Variant, X)>,
        I::IntoIter: Send,
        F: FnMut(u64, Vec<Annotation>, X),
    {
        self.try_process(
            inputs
                .into_iter()
                .map(Ok::<_, std::convert::Infallible>),
            sink,
        )
    }

    /// Like [`Pipeline::process`] for fallible input streams (e.g. parsers).
    ///
    /// An input-side error stops feeding; it is reported only after all
    /// in-flight items have been collected and delivered.
    pub fn try_process<X, E, I, F>(&self, inputs: I, mut sink: F) -> Result<Stats, Error>
    where
        X: Send,
        E: std::error::Error + Send + Sync + 'static,
        I: IntoIterator<Item = Result<(Variant, X), E>>,
        I::IntoIter: Send,
        F: FnMut(u64, Vec<Annotation>, X),
    {
        let capacity = 2 * self.workers;
        let (in_tx, in_rx) = bounded::<(u64, Variant, X)>(capacity);
        let (out_tx, out_rx) =
            bounded::<(u64, Result<Vec<Annotation>, crate::variant::Error>, X)>(capacity);

        let mut stats = Stats::default();
        let annotator = &self.annotator;
        let cancel = &self.cancel;
        let inputs = inputs.into_iter();

        thread::scope(|scope| {
            for _ in 0..self.workers {
                let in_rx = in_rx.clone();
                let out_tx = out_tx.clone();
                let store = self.store.clone();
                scope.spawn(move || {
                    while let Ok((seq, variant, extra)) = in_rx.recv() {
                        let result = annotator.annotate(&variant);
                        if let (Some(store), Ok(annotations)) = (&store, &result) {
                            if let Err(e) = store.append(&variant, annotations) {
                                tracing::warn!("recording annotations failed: {}", e);
                            }
                        }
                        if out_tx.send((seq, result, extra)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(in_rx);
            drop(out_tx);

            let feeder = scope.spawn(move || -> Result<(), Error> {
                for (seq, item) in inputs.enumerate() {
                    if cancel.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                    let (variant, extra) = item.map_err(|e| Error::Input(Box::new(e)))?;
                    if in_tx.send((seq as u64, variant, extra)).is_err() {
                        break;
                    }
                }
                Ok(())
            });

            // Collector: restore input order before delivering.
            let mut pending = BTreeMap::new();
            let mut next = 0u64;
            while let Ok((seq, result, extra)) = out_rx.recv() {
                pending.insert(seq, (result, extra));
                while let Some((result, extra)) = pending.remove(&next) {
                    if !cancel.is_cancelled() {
                        match result {
                            Ok(annotations) => {
                                stats.annotated += 1;
                                sink(next, annotations, extra);
                            }
                            Err(e) => {
                                stats.skipped += 1;
                                tracing::warn!("skipping malformed variant: {}", e);
                            }
                        }
                    }
                    next += 1;
                }
            }

            feeder.join().expect("feeder thread panicked")
        })?;

        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(stats)
    }
}
