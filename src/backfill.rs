//! Chunked batch enrichment of existing property records.
//!
//! A backfill walks many records, enriches each one, and hands results to the
//! caller's [`PropertySink`] in chunks. Bad records and failed commits are
//! logged and counted; they never abort the batch.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::pipeline::SourceStrategy;
use crate::property::{PropertyEnricher, PropertyLocation, PropertyNearbyResult};

/// Default number of records per commit.
pub const DEFAULT_CHUNK_SIZE: usize = 400;

/// A property to enrich, keyed by its storage id.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    /// Storage id handed back to the sink
    pub id: String,
    /// Where the property is
    pub location: PropertyLocation,
}

/// Persists enriched results; implemented by the storage layer.
#[async_trait]
pub trait PropertySink: Send + Sync {
    /// Writes one chunk. Each pair is `(record id, result)`.
    async fn commit(&self, batch: Vec<(String, PropertyNearbyResult)>) -> anyhow::Result<()>;
}

/// Counters describing a finished backfill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Records enriched (resolved or not)
    pub processed: usize,
    /// Records whose chunk was committed successfully
    pub committed: usize,
    /// Records skipped for missing city or state
    pub skipped: usize,
    /// Records enriched with a `failed` source
    pub unresolved: usize,
    /// Chunks the sink rejected
    pub failed_batches: usize,
}

/// Drives a [`PropertyEnricher`] over a batch of records.
pub struct Backfill {
    enricher: PropertyEnricher,
    radius_miles: f64,
    chunk_size: usize,
}

impl Backfill {
    /// `chunk_size` is clamped to at least 1.
    pub fn new(enricher: PropertyEnricher, radius_miles: f64, chunk_size: usize) -> Self {
        Self {
            enricher,
            radius_miles,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Enriches every record and commits the results in chunks.
    ///
    /// Never fails: skipped records and rejected chunks are counted in the
    /// returned report.
    pub async fn run<I>(&self, records: I, sink: &dyn PropertySink) -> BackfillReport
    where
        I: IntoIterator<Item = PropertyRecord>,
    {
        let mut report = BackfillReport::default();
        let mut pending: Vec<(String, PropertyNearbyResult)> = Vec::with_capacity(self.chunk_size);

        for record in records {
            if !record.location.is_complete() {
                warn!(id = %record.id, "skipping property without city or state");
                report.skipped += 1;
                continue;
            }

            let result = self.enricher.enrich(&record.location, self.radius_miles).await;
            report.processed += 1;
            if result.source_strategy == SourceStrategy::Failed {
                report.unresolved += 1;
            }
            pending.push((record.id, result));

            if pending.len() >= self.chunk_size {
                self.flush(&mut pending, sink, &mut report).await;
            }
        }

        if !pending.is_empty() {
            self.flush(&mut pending, sink, &mut report).await;
        }

        info!(
            processed = report.processed,
            committed = report.committed,
            skipped = report.skipped,
            unresolved = report.unresolved,
            failed_batches = report.failed_batches,
            "backfill finished"
        );
        report
    }

    async fn flush(
        &self,
        pending: &mut Vec<(String, PropertyNearbyResult)>,
        sink: &dyn PropertySink,
        report: &mut BackfillReport,
    ) {
        let batch = std::mem::take(pending);
        let size = batch.len();
        match sink.commit(batch).await {
            Ok(()) => {
                report.committed += size;
                info!(size, committed = report.committed, "committed backfill chunk");
            }
            Err(error) => {
                report.failed_batches += 1;
                warn!(size, error = %error, "backfill chunk failed; continuing");
            }
        }
    }
}
