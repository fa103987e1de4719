//! Watermark-driven pull request sync.
//!
//! A run captures its start instant, reads the pipeline's watermark, then
//! pages through the pulls endpoint sorted by `updated_at` descending. Items
//! newer than the cutoff are batched and appended; paging stops at the
//! first item at or below the cutoff. Only after every batch has been
//! written is the start instant committed as the new watermark, so a failed
//! run is simply repeated from the previous watermark.

use chrono::{DateTime, SubsecRound, TimeDelta, Timelike, Utc};
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::github::{GitHubClient, IntakeError, PullRequestRecord, RepositoryLocator};
use crate::persistence::{PullRequestSink, WatermarkStore};
use crate::telemetry::{TelemetryEvent, TelemetrySink};

use super::{read_error, write_error};

/// Default first-run lookback window in days.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 90;

/// Default number of pull requests written per transaction.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default page size requested from GitHub (the API maximum).
pub const DEFAULT_PER_PAGE: u8 = 100;

/// Watermark pipeline name for a repository's pull request sync.
#[must_use]
pub fn pull_request_pipeline(repository: &RepositoryLocator) -> String {
    format!("github_prs::{}", repository.full_name())
}

/// Tunables for a pull request sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullRequestSyncSettings {
    /// How far back a first run reaches.
    pub lookback: TimeDelta,
    /// Records per append transaction.
    pub batch_size: usize,
    /// Items per API page.
    pub per_page: u8,
    /// Extra items scanned past the first one at or below the cutoff.
    pub ordering_safety_margin: usize,
}

impl Default for PullRequestSyncSettings {
    fn default() -> Self {
        Self {
            lookback: TimeDelta::days(i64::from(DEFAULT_LOOKBACK_DAYS)),
            batch_size: DEFAULT_BATCH_SIZE,
            per_page: DEFAULT_PER_PAGE,
            ordering_safety_margin: 0,
        }
    }
}

/// Stage of a pull request sync run, reported in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Run start captured, watermark being read.
    Init,
    /// Pages are being requested.
    Paging,
    /// An item is being compared with the cutoff.
    Filtering,
    /// An item was accepted into the current batch.
    Batching,
    /// A batch is being written.
    Flushing,
    /// The run start is being stored as the new watermark.
    WatermarkCommit,
    /// The run finished.
    Done,
}

/// Why paging ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The collection ran out of pages.
    Exhausted,
    /// An item at or below the previous watermark was reached.
    ReachedWatermark,
    /// An item older than the first-run lookback cutoff was reached.
    ReachedLookbackCutoff,
}

/// Outcome of a successful pull request sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSyncReport {
    /// Pipeline whose watermark was advanced.
    pub pipeline: String,
    /// Rows appended across all batches.
    pub inserted: u64,
    /// Batches written.
    pub batches: u32,
    /// Watermark the run started from.
    pub previous_watermark: Option<DateTime<Utc>>,
    /// New watermark: the instant the run started.
    pub watermark: DateTime<Utc>,
    /// Why paging ended.
    pub stop_reason: StopReason,
    /// Items whose `updated_at` was newer than their predecessor's.
    pub out_of_order_items: u32,
}

#[derive(Debug, Clone, Copy)]
enum Cutoff {
    Watermark(DateTime<Utc>),
    Lookback(DateTime<Utc>),
}

impl Cutoff {
    fn new(
        previous_watermark: Option<DateTime<Utc>>,
        run_start: DateTime<Utc>,
        lookback: TimeDelta,
    ) -> Self {
        previous_watermark.map_or_else(
            || {
                Self::Lookback(
                    run_start
                        .checked_sub_signed(lookback)
                        .unwrap_or(DateTime::<Utc>::MIN_UTC),
                )
            },
            Self::Watermark,
        )
    }

    fn excludes(self, updated_at: DateTime<Utc>) -> bool {
        match self {
            // GitHub reports whole seconds, so an update later in the
            // watermark's own second reads as that second and stays in.
            Self::Watermark(watermark) if watermark.nanosecond() != 0 => {
                updated_at < watermark.trunc_subsecs(0)
            }
            Self::Watermark(watermark) => updated_at <= watermark,
            Self::Lookback(oldest) => updated_at < oldest,
        }
    }

    const fn stop_reason(self) -> StopReason {
        match self {
            Self::Watermark(_) => StopReason::ReachedWatermark,
            Self::Lookback(_) => StopReason::ReachedLookbackCutoff,
        }
    }
}

#[derive(Debug)]
struct Progress {
    pipeline: String,
    batch: Vec<PullRequestRecord>,
    inserted: u64,
    batches: u32,
}

/// Runs the incremental pull request sync for one repository.
pub struct PullRequestSync<'a> {
    client: &'a GitHubClient,
    clock: &'a dyn Clock,
    telemetry: &'a dyn TelemetrySink,
    settings: PullRequestSyncSettings,
}

impl<'a> PullRequestSync<'a> {
    /// Creates a sync over `client` using `clock` for the run start.
    #[must_use]
    pub const fn new(
        client: &'a GitHubClient,
        clock: &'a dyn Clock,
        telemetry: &'a dyn TelemetrySink,
        settings: PullRequestSyncSettings,
    ) -> Self {
        Self {
            client,
            clock,
            telemetry,
            settings,
        }
    }

    /// Syncs `repository` into `warehouse` and advances its watermark.
    ///
    /// # Errors
    ///
    /// Returns the first client, record or warehouse error. No watermark is
    /// written in that case, though batches flushed before the failure stay
    /// in the append-only table.
    pub fn run<W>(
        &self,
        repository: &RepositoryLocator,
        warehouse: &mut W,
    ) -> Result<PullRequestSyncReport, IntakeError>
    where
        W: WatermarkStore + PullRequestSink,
    {
        let run_start = self.clock.utc();
        let pipeline = pull_request_pipeline(repository);
        trace_phase(&pipeline, SyncPhase::Init);

        let previous_watermark = warehouse
            .get_last_success(&pipeline)
            .map_err(|error| read_error(&error))?;
        info!(
            pipeline = %pipeline,
            last_success_ts = ?previous_watermark,
            "[state] last success"
        );
        let cutoff = Cutoff::new(previous_watermark, run_start, self.settings.lookback);

        let repo = repository.full_name();
        let mut progress = Progress {
            pipeline,
            batch: Vec::new(),
            inserted: 0,
            batches: 0,
        };
        let (stop_reason, out_of_order_items) =
            self.scan(repository, cutoff, warehouse, &repo, &mut progress)?;

        self.flush(warehouse, &repo, &mut progress)?;

        trace_phase(&progress.pipeline, SyncPhase::WatermarkCommit);
        warehouse
            .set_last_success(&progress.pipeline, run_start)
            .map_err(|error| write_error(&error))?;
        self.telemetry.record(TelemetryEvent::WatermarkCommitted {
            pipeline: progress.pipeline.clone(),
            last_success_ts: run_start.to_rfc3339(),
        });

        info!(
            pipeline = %progress.pipeline,
            inserted = progress.inserted,
            "Inserted {} PR rows into github_pull_requests",
            progress.inserted
        );
        trace_phase(&progress.pipeline, SyncPhase::Done);

        Ok(PullRequestSyncReport {
            pipeline: progress.pipeline,
            inserted: progress.inserted,
            batches: progress.batches,
            previous_watermark,
            watermark: run_start,
            stop_reason,
            out_of_order_items,
        })
    }

    fn scan<W: PullRequestSink>(
        &self,
        repository: &RepositoryLocator,
        cutoff: Cutoff,
        warehouse: &mut W,
        repo: &str,
        progress: &mut Progress,
    ) -> Result<(StopReason, u32), IntakeError> {
        trace_phase(&progress.pipeline, SyncPhase::Paging);
        let per_page = self.settings.per_page.to_string();
        let query = [
            ("state", "all"),
            ("sort", "updated"),
            ("direction", "desc"),
            ("per_page", per_page.as_str()),
        ];

        let mut stop_reason = StopReason::Exhausted;
        let mut remaining_scan: Option<usize> = None;
        let mut previous_updated_at: Option<DateTime<Utc>> = None;
        let mut out_of_order_items = 0_u32;

        for item in self.client.paginate(&repository.pulls_path(), &query) {
            let record = PullRequestRecord::from_payload(item?)?;
            trace_phase(&progress.pipeline, SyncPhase::Filtering);

            if previous_updated_at.is_some_and(|previous| record.updated_at > previous) {
                out_of_order_items = out_of_order_items.saturating_add(1);
                warn!(
                    pr_number = record.number,
                    updated_at = %record.updated_at,
                    "pull request arrived out of updated_at order"
                );
            }
            previous_updated_at = Some(record.updated_at);

            if let Some(remaining) = remaining_scan.as_mut() {
                *remaining = remaining.saturating_sub(1);
            }

            if cutoff.excludes(record.updated_at) {
                if remaining_scan.is_none() {
                    stop_reason = cutoff.stop_reason();
                    remaining_scan = Some(self.settings.ordering_safety_margin);
                }
            } else {
                trace_phase(&progress.pipeline, SyncPhase::Batching);
                progress.batch.push(record);
                if progress.batch.len() >= self.settings.batch_size {
                    self.flush(warehouse, repo, progress)?;
                }
            }

            if remaining_scan == Some(0) {
                break;
            }
        }

        Ok((stop_reason, out_of_order_items))
    }

    fn flush<W: PullRequestSink>(
        &self,
        warehouse: &mut W,
        repo: &str,
        progress: &mut Progress,
    ) -> Result<(), IntakeError> {
        if progress.batch.is_empty() {
            return Ok(());
        }

        trace_phase(&progress.pipeline, SyncPhase::Flushing);
        let rows = warehouse
            .insert_pull_requests(repo, &progress.batch, self.clock.utc())
            .map_err(|error| write_error(&error))?;
        progress.batch.clear();
        progress.inserted = progress.inserted.saturating_add(rows);
        progress.batches = progress.batches.saturating_add(1);

        info!(
            pipeline = %progress.pipeline,
            rows,
            total = progress.inserted,
            "[insert] appended pull request batch"
        );
        self.telemetry.record(TelemetryEvent::PullRequestBatchFlushed {
            pipeline: progress.pipeline.clone(),
            rows,
            total: progress.inserted,
        });
        Ok(())
    }
}

fn trace_phase(pipeline: &str, phase: SyncPhase) {
    debug!(pipeline, ?phase, "pull request sync phase");
}
