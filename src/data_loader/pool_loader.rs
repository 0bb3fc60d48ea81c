// src/data_loader/pool_loader.rs
//
// The prefetching batch assembler: a bounded pool of worker tasks fetches
// and collates index batches in parallel, and a reorder stage delivers the
// results to the consumer strictly in submission order.
//
//! Workers claim batches from one shared, ordered work queue, so whichever
//! worker is free takes the next batch; nothing is guaranteed about
//! completion order. Delivery order is restored by a sequence-numbered
//! reorder buffer: batch `n` is released to the consumer only after every
//! batch below `n` has been released. A semaphore with `prefetch` permits
//! caps the number of batches in flight: a permit is claimed before a
//! batch is taken off the queue and released only once the batch has been
//! handed to the consumer channel, so a slow consumer stalls the pool
//! instead of growing the reorder buffer without bound.
//!
//! A failed item fails its whole batch; the error is delivered at that
//! batch's turn and the epoch continues. With `num_workers == 0` the same
//! semantics run inline on the consumer's task, with no pool at all.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_stream::stream;
use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::data_loader::batch::IndexBatch;
use crate::data_loader::collate::collate;
use crate::data_loader::dataset::{
    BatchLoadError, Dataset, DatasetError, DynBatchStream, LoadedBatch, Sample,
};
use crate::data_loader::options::LoaderOptions;

/// One worker's completed batch, routed through the reorder stage.
/// Holding the permit until delivery is what enforces the in-flight cap.
struct Completion {
    seq: u64,
    result: Result<LoadedBatch, DatasetError>,
    _permit: OwnedSemaphorePermit,
}

/// Order-preserving parallel batch loader over any [`Sample`] dataset.
pub struct PoolLoader<D: Dataset<Item = Sample>> {
    dataset: Arc<D>,
    options: LoaderOptions,
}

impl<D: Dataset<Item = Sample>> PoolLoader<D> {
    pub fn new(dataset: Arc<D>, options: LoaderOptions) -> Self {
        Self { dataset, options }
    }

    /// Consume a batch source and return the epoch's delivery stream.
    ///
    /// The stream yields one `Result` per submitted batch, in submission
    /// order, and ends when the source is exhausted (or cancellation cuts
    /// the epoch short).
    pub fn stream_batches<I>(&self, batches: I) -> DynBatchStream
    where
        I: Iterator<Item = IndexBatch> + Send + 'static,
    {
        if self.options.num_workers == 0 {
            self.stream_inline(batches)
        } else {
            self.stream_pooled(batches)
        }
    }

    /// Synchronous path: fetch, collate and yield on the consumer's own
    /// task. Used for small corpora and debugging.
    fn stream_inline<I>(&self, batches: I) -> DynBatchStream
    where
        I: Iterator<Item = IndexBatch> + Send + 'static,
    {
        let dataset = Arc::clone(&self.dataset);
        let cancel = self.options.cancellation_token.clone().unwrap_or_default();
        let timeout = self.options.timeout;

        Box::pin(stream! {
            let mut batches = batches;
            'epoch: while let Some(batch) = batches.next() {
                if cancel.is_cancelled() {
                    break;
                }
                let mut samples = Vec::with_capacity(batch.indices.len());
                let mut failure: Option<DatasetError> = None;
                for &index in &batch.indices {
                    if cancel.is_cancelled() {
                        break 'epoch;
                    }
                    match fetch_item(dataset.as_ref(), index, timeout).await {
                        Ok(sample) => samples.push(sample),
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
                let result = match failure {
                    Some(e) => Err(e),
                    None => collate(batch.seq, samples),
                };
                match result {
                    Ok(loaded) => yield Ok(loaded),
                    Err(e) => {
                        warn!("batch {} failed: {}", batch.seq, e);
                        yield Err(BatchLoadError { seq: batch.seq, source: e });
                    }
                }
            }
        })
    }

    /// Pooled path: spawn the workers and the reorder stage, hand back the
    /// delivery channel.
    fn stream_pooled<I>(&self, batches: I) -> DynBatchStream
    where
        I: Iterator<Item = IndexBatch> + Send + 'static,
    {
        let workers = self.options.num_workers;
        let depth = self.options.prefetch.max(1);

        let work: Arc<Mutex<VecDeque<IndexBatch>>> =
            Arc::new(Mutex::new(batches.collect()));
        let inflight = Arc::new(Semaphore::new(depth));
        let cancel = self.options.cancellation_token.clone().unwrap_or_default();

        debug!(
            "starting pool: {} workers, prefetch depth {}, {} batches queued",
            workers,
            depth,
            work.lock().map(|q| q.len()).unwrap_or(0)
        );

        let (done_tx, done_rx) = mpsc::channel::<Completion>(depth);
        for _ in 0..workers {
            tokio::spawn(run_worker(
                Arc::clone(&self.dataset),
                Arc::clone(&work),
                Arc::clone(&inflight),
                done_tx.clone(),
                self.options.timeout,
                cancel.clone(),
            ));
        }
        drop(done_tx); // reorder stage ends once every worker is gone

        let (out_tx, out_rx) = mpsc::channel::<Result<LoadedBatch, BatchLoadError>>(1);
        tokio::spawn(reorder_and_deliver(done_rx, out_tx));

        Box::pin(ReceiverStream::new(out_rx))
    }
}

impl<D: Dataset<Item = Sample>> std::fmt::Debug for PoolLoader<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolLoader")
            .field("num_workers", &self.options.num_workers)
            .field("prefetch", &self.options.prefetch)
            .finish()
    }
}

/// Fetch one item, optionally bounded by the per-item timeout.
async fn fetch_item<D: Dataset<Item = Sample>>(
    dataset: &D,
    index: usize,
    timeout: Option<Duration>,
) -> Result<Sample, DatasetError> {
    match timeout {
        Some(bound) => match tokio::time::timeout(bound, dataset.get(index)).await {
            Ok(result) => result,
            Err(_) => Err(DatasetError::Timeout(bound)),
        },
        None => dataset.get(index).await,
    }
}

/// Worker loop: claim a permit, claim the next batch, realize it, report.
async fn run_worker<D: Dataset<Item = Sample>>(
    dataset: Arc<D>,
    work: Arc<Mutex<VecDeque<IndexBatch>>>,
    inflight: Arc<Semaphore>,
    done_tx: mpsc::Sender<Completion>,
    timeout: Option<Duration>,
    cancel: CancellationToken,
) {
    loop {
        let permit = tokio::select! {
            _ = cancel.cancelled() => return,
            permit = Arc::clone(&inflight).acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => return,
            },
        };

        let batch = {
            let mut queue = work.lock().expect("work queue lock poisoned");
            queue.pop_front()
        };
        let Some(batch) = batch else { return };

        let mut samples = Vec::with_capacity(batch.indices.len());
        let mut failure: Option<DatasetError> = None;
        for &index in &batch.indices {
            // Cooperative stop between items: abandon unfinished work.
            if cancel.is_cancelled() {
                return;
            }
            match fetch_item(dataset.as_ref(), index, timeout).await {
                Ok(sample) => samples.push(sample),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let result = match failure {
            Some(e) => Err(e),
            None => collate(batch.seq, samples),
        };
        if let Err(e) = &result {
            warn!("batch {} failed: {}", batch.seq, e);
        }

        let seq = batch.seq;
        if done_tx
            .send(Completion { seq, result, _permit: permit })
            .await
            .is_err()
        {
            // Consumer went away; nothing left to do.
            return;
        }
    }
}

/// Reorder stage: hold out-of-order completions until their sequence
/// number is next, then forward. The permit inside each completion drops
/// only after the forward succeeds, keeping the in-flight cap honest.
async fn reorder_and_deliver(
    mut done_rx: mpsc::Receiver<Completion>,
    out_tx: mpsc::Sender<Result<LoadedBatch, BatchLoadError>>,
) {
    let mut next_seq: u64 = 0;
    let mut pending: BTreeMap<u64, Completion> = BTreeMap::new();

    while let Some(done) = done_rx.recv().await {
        pending.insert(done.seq, done);
        if !flush_ready(&mut pending, &mut next_seq, &out_tx).await {
            return;
        }
    }

    // Workers are gone. Anything still pending past a gap was cut off by
    // cancellation; deliver only the contiguous prefix.
    flush_ready(&mut pending, &mut next_seq, &out_tx).await;
}

/// Forward every completion whose turn has come. Returns false when the
/// consumer has hung up.
async fn flush_ready(
    pending: &mut BTreeMap<u64, Completion>,
    next_seq: &mut u64,
    out_tx: &mpsc::Sender<Result<LoadedBatch, BatchLoadError>>,
) -> bool {
    while let Some(done) = pending.remove(next_seq) {
        let item = match done.result {
            Ok(loaded) => Ok(loaded),
            Err(source) => Err(BatchLoadError { seq: done.seq, source }),
        };
        if out_tx.send(item).await.is_err() {
            return false;
        }
        *next_seq += 1;
        // `done` drops here, releasing its in-flight permit.
    }
    true
}
