use std::{collections::BTreeMap, io::Write};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{error::Result, job::Batch};

/// Field separator of written rows.
pub const SEPARATOR: &str = "\t";

/// Order in which the collector writes batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputOrder {
    /// Write each batch as soon as a worker delivers it. With more than
    /// one worker the output is not in input order.
    #[default]
    Completion,
    /// Hold early batches back until every earlier row has been written.
    Input,
}

/// What the collector wrote before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Collected {
    pub batches: u64,
    pub rows: u64,
}

/// Single consumer of the results channel.
///
/// Runs on its own thread and writes one line per row, fields joined by
/// [`SEPARATOR`], until the channel is closed and drained or the run is
/// cancelled.
pub struct Collector<W> {
    sink: W,
    order: OutputOrder,
    cancel: CancellationToken,
    pending: BTreeMap<u64, Vec<Vec<String>>>,
    next_seq: u64,
    collected: Collected,
}

impl<W: Write> Collector<W> {
    pub fn new(sink: W, order: OutputOrder, cancel: CancellationToken) -> Self {
        Self {
            sink,
            order,
            cancel,
            pending: BTreeMap::new(),
            next_seq: 0,
            collected: Collected::default(),
        }
    }

    /// Drain `results` until every sender is gone. A write failure
    /// cancels the run so producers stop feeding a dead sink.
    pub fn drain(
        mut self,
        mut results: mpsc::Receiver<Batch>,
    ) -> Result<Collected> {
        let outcome = self.consume(&mut results);
        if outcome.is_err() {
            self.cancel.cancel();
        }
        outcome?;
        Ok(self.collected)
    }

    fn consume(&mut self, results: &mut mpsc::Receiver<Batch>) -> Result<()> {
        while let Some(batch) = results.blocking_recv() {
            if self.cancel.is_cancelled() {
                tracing::debug!(seq = batch.seq, "run aborted, output stops");
                break;
            }
            match self.order {
                OutputOrder::Completion => self.write_rows(&batch.rows)?,
                OutputOrder::Input => self.accept_in_order(batch)?,
            }
        }

        // Anything still held back sits behind a row that never arrived.
        if !self.pending.is_empty() {
            tracing::debug!(
                batches = self.pending.len(),
                "dropping batches queued behind a missing row"
            );
            self.pending.clear();
        }

        self.sink.flush()?;
        Ok(())
    }

    fn accept_in_order(&mut self, batch: Batch) -> Result<()> {
        if batch.seq != self.next_seq {
            self.pending.insert(batch.seq, batch.rows);
            return Ok(());
        }
        self.write_rows(&batch.rows)?;
        self.next_seq += 1;
        while let Some(rows) = self.pending.remove(&self.next_seq) {
            self.write_rows(&rows)?;
            self.next_seq += 1;
        }
        Ok(())
    }

    fn write_rows(&mut self, rows: &[Vec<String>]) -> Result<()> {
        for row in rows {
            self.sink.write_all(row.join(SEPARATOR).as_bytes())?;
            self.sink.write_all(b"\n")?;
        }
        self.collected.batches += 1;
        self.collected.rows += rows.len() as u64;
        Ok(())
    }
}
