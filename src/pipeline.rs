//! Concurrent batch lookups: one producer, a pool of workers, one
//! collector.
//!
//! The producer turns input rows into [`Job`]s and feeds them through a
//! bounded queue. Each worker pulls a job, issues exactly one search and
//! hands the resulting [`Batch`] to the collector, which writes it to the
//! sink. Hits of one row always stay together and in backend order; rows
//! from different jobs are written in completion order unless
//! [`OutputOrder::Input`] is requested.
//!
//! The first error of any stage ends the run. Rows already written stay
//! written.

use std::{io::Write, sync::Arc, thread, time::Duration};

use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::{Mutex, mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    collector::{Collected, Collector, OutputOrder},
    columns,
    error::{Error, Result},
    gateway::SearchGateway,
    job::{Batch, Job, QuerySettings},
};

/// How a run is shaped, independent of what it queries.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub workers: usize,
    pub order: OutputOrder,
    /// Upper bound on waiting for the collector once all workers are
    /// done. `None` waits for as long as it takes.
    pub drain_timeout: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            order: OutputOrder::Completion,
            drain_timeout: None,
        }
    }
}

/// How delimited input rows become query text.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub columns: Vec<usize>,
    pub delimiter: String,
}

impl Projection {
    pub fn split(&self, line: &str) -> Vec<String> {
        line.split(self.delimiter.as_str())
            .map(str::to_string)
            .collect()
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub jobs: u64,
    pub rows: u64,
    pub collector_timed_out: bool,
}

/// Lifecycle of a single run. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Idle,
    Enqueuing,
    Draining,
    Finalizing,
    Done,
}

#[derive(Debug)]
struct Lifecycle {
    stage: Stage,
}

impl Lifecycle {
    fn new() -> Self {
        Self { stage: Stage::Idle }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.stage, "{:?} -> {next:?}", self.stage);
        tracing::debug!(from = ?self.stage, to = ?next, "pipeline stage");
        self.stage = next;
    }
}

/// Receiver shared by every worker of the pool.
struct SharedReceiver<T> {
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> SharedReceiver<T> {
    fn new(rx: mpsc::Receiver<T>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    async fn recv(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

enum Feed<'a, R> {
    Literal(&'a str),
    Rows {
        reader: R,
        projection: &'a Projection,
    },
}

pub struct Pipeline<G> {
    gateway: Arc<G>,
    settings: Arc<QuerySettings>,
    options: PipelineOptions,
}

impl<G> Pipeline<G>
where
    G: SearchGateway + 'static,
{
    pub fn new(
        gateway: Arc<G>,
        settings: QuerySettings,
        options: PipelineOptions,
    ) -> Result<Self> {
        if options.workers == 0 {
            return Err(Error::Config(
                "worker pool needs at least one worker".into(),
            ));
        }
        Ok(Self {
            gateway,
            settings: Arc::new(settings),
            options,
        })
    }

    /// Run a single job for `like_text`. Output rows carry no input
    /// fields, only the hit columns.
    pub async fn run_literal<W>(
        &self,
        like_text: &str,
        sink: W,
    ) -> Result<Summary>
    where
        W: Write + Send + 'static,
    {
        self.run(Feed::<&[u8]>::Literal(like_text), sink).await
    }

    /// Run one job per line of `reader`.
    pub async fn run_rows<R, W>(
        &self,
        reader: R,
        projection: &Projection,
        sink: W,
    ) -> Result<Summary>
    where
        R: AsyncBufRead + Unpin,
        W: Write + Send + 'static,
    {
        self.run(Feed::Rows { reader, projection }, sink).await
    }

    async fn run<R, W>(&self, feed: Feed<'_, R>, sink: W) -> Result<Summary>
    where
        R: AsyncBufRead + Unpin,
        W: Write + Send + 'static,
    {
        let mut lifecycle = Lifecycle::new();
        let cancel = CancellationToken::new();
        let workers = self.options.workers;

        let (queue_tx, queue_rx) = mpsc::channel::<Job>(workers);
        let (results_tx, results_rx) = mpsc::channel::<Batch>(workers);

        // Detached: runtime shutdown must not wait on a stuck sink.
        let collector =
            Collector::new(sink, self.options.order, cancel.clone());
        let (collected_tx, collected_rx) = oneshot::channel();
        thread::Builder::new()
            .name("dupsquash-collector".into())
            .spawn(move || {
                let _ = collected_tx.send(collector.drain(results_rx));
            })?;

        let pending = SharedReceiver::new(queue_rx);
        let handles: Vec<JoinHandle<Result<()>>> = (0..workers)
            .map(|id| {
                tokio::spawn(work(
                    id,
                    pending.clone(),
                    results_tx.clone(),
                    self.gateway.clone(),
                    cancel.clone(),
                ))
            })
            .collect();
        drop(pending);
        // Only workers hold senders now; the channel closes when they exit.
        drop(results_tx);

        lifecycle.advance(Stage::Enqueuing);
        let produced = self.produce(feed, queue_tx, &cancel).await;
        let mut failure = None;
        let jobs = match produced {
            Ok(count) => count,
            Err(e) => {
                cancel.cancel();
                failure = Some(e);
                0
            }
        };

        lifecycle.advance(Stage::Draining);
        for handle in handles {
            let outcome = handle
                .await
                .unwrap_or_else(|e| Err(Error::Join(e.to_string())));
            if let Err(e) = outcome {
                failure.get_or_insert(e);
            }
        }

        lifecycle.advance(Stage::Finalizing);
        let (collected, collector_timed_out) =
            match await_collector(collected_rx, self.options.drain_timeout)
                .await
            {
                Some(Ok(collected)) => (collected, false),
                Some(Err(e)) => {
                    failure.get_or_insert(e);
                    (Collected::default(), false)
                }
                None => (Collected::default(), true),
            };

        lifecycle.advance(Stage::Done);
        if let Some(e) = failure {
            return Err(e);
        }

        let summary = Summary {
            jobs,
            rows: collected.rows,
            collector_timed_out,
        };
        tracing::info!(
            jobs = summary.jobs,
            rows = summary.rows,
            "lookup run finished"
        );
        Ok(summary)
    }

    /// Feed jobs into the queue until the input ends, the run is
    /// cancelled, or a row cannot be projected. Dropping `queue` on return
    /// closes it.
    async fn produce<R>(
        &self,
        feed: Feed<'_, R>,
        queue: mpsc::Sender<Job>,
        cancel: &CancellationToken,
    ) -> Result<u64>
    where
        R: AsyncBufRead + Unpin,
    {
        let (mut reader, projection) = match feed {
            Feed::Literal(text) => {
                let job = Job {
                    seq: 0,
                    like_text: text.to_string(),
                    row: Vec::new(),
                    settings: self.settings.clone(),
                };
                return Ok(u64::from(enqueue(&queue, job, cancel).await));
            }
            Feed::Rows { reader, projection } => (reader, projection),
        };

        let mut seq = 0;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            // Bytes that are not UTF-8 become U+FFFD instead of ending the run.
            let line = String::from_utf8_lossy(&buf);
            let text = line.strip_suffix('\n').unwrap_or(line.as_ref());
            let text = text.strip_suffix('\r').unwrap_or(text);

            let row = projection.split(text);
            let like_text = columns::project(
                &row,
                &projection.columns,
                &self.settings.null_value,
            )?;
            let job = Job {
                seq,
                like_text,
                row,
                settings: self.settings.clone(),
            };
            if !enqueue(&queue, job, cancel).await {
                break;
            }
            seq += 1;
        }
        Ok(seq)
    }
}

/// Hand `job` to the pool. Returns `false` once the run is over.
async fn enqueue(
    queue: &mpsc::Sender<Job>,
    job: Job,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = queue.send(job) => sent.is_ok(),
    }
}

async fn work<G>(
    id: usize,
    jobs: SharedReceiver<Job>,
    results: mpsc::Sender<Batch>,
    gateway: Arc<G>,
    cancel: CancellationToken,
) -> Result<()>
where
    G: SearchGateway + 'static,
{
    tracing::debug!(worker = id, "worker started");
    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        let batch = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            batch = job.execute(gateway.as_ref()) => batch,
        };

        match batch {
            Ok(batch) => {
                tracing::debug!(
                    worker = id,
                    seq = batch.seq,
                    hits = batch.rows.len(),
                    "job done"
                );
                if results.send(batch).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(
                    worker = id,
                    seq = job.seq,
                    error = %e,
                    "job failed"
                );
                cancel.cancel();
                return Err(e);
            }
        }
    }
    tracing::debug!(worker = id, "worker stopped");
    Ok(())
}

/// Wait for the collector, bounded by `limit`. `None` means the wait
/// timed out and whatever the collector still holds may never be written.
async fn await_collector(
    collected: oneshot::Receiver<Result<Collected>>,
    limit: Option<Duration>,
) -> Option<Result<Collected>> {
    let delivered = match limit {
        None => collected.await,
        Some(limit) => match tokio::time::timeout(limit, collected).await {
            Ok(delivered) => delivered,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = limit.as_millis() as u64,
                    "collector did not finish in time, output may be incomplete"
                );
                return None;
            }
        },
    };
    Some(delivered.unwrap_or_else(|_| {
        Err(Error::Join("collector thread exited without a result".into()))
    }))
}
