//! Fixed-size pool of workers running queries concurrently
//!
//! Specs flow in through a bounded flume queue shared by every worker.
//! Results flow out through a bounded tokio queue that closes only once all
//! workers have exited, so a receiver that sees the end of the queue has
//! seen every result.

use futures_util::future::join_all;
use log::{debug, error};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::query::QuerySpec;
use crate::resolver::Resolver;
use crate::result::{self, QueryResult, Tally};
use crate::transport::{Exchanger, Network};

/// Returned by [`PoolHandle::submit`] when no worker is left to run the spec
#[derive(Debug, Error)]
#[error("worker pool is closed")]
pub struct PoolClosed(pub QuerySpec);

pub struct WorkerPool<X: Exchanger = Network> {
    resolver: Resolver<X>,
    workers: usize,
}

/// Submits specs to a running pool
///
/// Dropping the handle, or calling [`PoolHandle::close`], tells the workers
/// that no more specs are coming.
#[derive(Clone)]
pub struct PoolHandle {
    specs: flume::Sender<QuerySpec>,
}

impl<X: Exchanger> WorkerPool<X> {
    pub fn new(resolver: Resolver<X>, workers: usize) -> WorkerPool<X> {
        WorkerPool {
            resolver,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Spawns the workers on the current runtime
    ///
    /// Returns the handle to submit with and the queue results arrive on, in
    /// completion order. Will panic if called from outside the context of a
    /// runtime.
    pub fn start(self) -> (PoolHandle, mpsc::Receiver<QueryResult>) {
        let capacity = self.workers * 2;
        let (spec_tx, spec_rx) = flume::bounded(capacity);
        let (result_tx, result_rx) = mpsc::channel(capacity);

        let handles: Vec<JoinHandle<()>> = (0..self.workers)
            .map(|id| {
                tokio::spawn(work(
                    id,
                    self.resolver.clone(),
                    spec_rx.clone(),
                    result_tx.clone(),
                ))
            })
            .collect();
        drop(spec_rx);

        // The last result sender is released only after every worker is done
        tokio::spawn(async move {
            for joined in join_all(handles).await {
                if let Err(err) = joined {
                    error!("worker task failed: {}", err);
                }
            }
            drop(result_tx);
        });

        (PoolHandle { specs: spec_tx }, result_rx)
    }
}

impl PoolHandle {
    /// Queues a spec, waiting while the queue is full
    pub async fn submit(&self, spec: QuerySpec) -> Result<(), PoolClosed> {
        self.specs
            .send_async(spec)
            .await
            .map_err(|err| PoolClosed(err.into_inner()))
    }

    /// Signals that no more specs are coming
    ///
    /// Workers drain what is already queued, then stop.
    pub fn close(self) {
        drop(self.specs);
    }
}

async fn work<X: Exchanger>(
    id: usize,
    resolver: Resolver<X>,
    specs: flume::Receiver<QuerySpec>,
    results: mpsc::Sender<QueryResult>,
) {
    debug!("worker {} started", id);
    let mut handled = 0usize;
    while let Ok(spec) = specs.recv_async().await {
        let result = resolver.execute(&spec).await;
        if results.send(result).await.is_err() {
            debug!("worker {}: nobody is waiting for results", id);
            break;
        }
        handled += 1;
    }
    debug!("worker {} finished after {} queries", id, handled);
}

/// Every result of a batch with its statistics
#[derive(Debug, Clone)]
pub struct Batch {
    pub results: Vec<QueryResult>,
    pub tally: Tally,
    pub elapsed: Duration,
}

impl Batch {
    pub fn queries_per_second(&self) -> f64 {
        self.tally.queries_per_second(self.elapsed)
    }
}

/// Runs every spec through a pool of `workers` and waits for all results
///
/// Specs are submitted from a separate task while results are drained, so a
/// batch larger than the queues cannot deadlock.
pub async fn run_batch<X: Exchanger>(
    resolver: Resolver<X>,
    specs: Vec<QuerySpec>,
    workers: usize,
) -> Batch {
    let start = Instant::now();
    let (handle, mut results) = WorkerPool::new(resolver, workers).start();

    let total = specs.len();
    let submitter = tokio::spawn(async move {
        for spec in specs {
            if let Err(PoolClosed(spec)) = handle.submit(spec).await {
                error!("dropping query for {}: pool closed", spec.domain);
                break;
            }
        }
        handle.close();
    });

    let (results, tally) = result::collect(&mut results).await;
    if let Err(err) = submitter.await {
        error!("submitter task failed: {}", err);
    }
    if results.len() != total {
        error!("batch of {} queries produced {} results", total, results.len());
    }

    Batch {
        results,
        tally,
        elapsed: start.elapsed(),
    }
}
