//! Batch driver: correlation grouping and the worker pool.
//!
//! Groups are independent, so each one is built on a rayon worker with only
//! shared read-only state (the [`AnalysisContext`]). A panic while building
//! one group is contained to that group, and a [`CancelHandle`] abandons the
//! groups not yet started.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::builder::{AnalysisContext, BuildOutcome, CallBuilder};
use crate::call::Call;
use crate::error::{CdrError, CdrResult};
use crate::leg::LegRecord;

/// Group legs by correlation id, in order of first appearance.
pub fn group_by_correlation(legs: Vec<LegRecord>) -> IndexMap<String, Vec<LegRecord>> {
    let mut groups: IndexMap<String, Vec<LegRecord>> = IndexMap::new();
    for leg in legs {
        groups
            .entry(
                leg.correlation_id
                    .clone(),
            )
            .or_default()
            .push(leg);
    }
    groups
}

/// Cloneable flag asking a running batch to stop picking up groups.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled
            .store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
            .load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Worker threads, at least one
    pub workers: usize,
    pub cancel: CancelHandle,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            cancel: CancelHandle::new(),
        }
    }
}

impl BatchOptions {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Calls built by one batch run, plus what happened to the other groups.
///
/// `calls` follows group order of first appearance, but consumers should not
/// rely on any ordering across groups.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub calls: Vec<Call>,
    pub groups: usize,
    pub rejected: usize,
    pub failed: usize,
}

enum GroupResult {
    Built(Call),
    Rejected,
    Failed,
    Skipped,
}

pub struct BatchDriver<'a> {
    context: &'a AnalysisContext,
    options: BatchOptions,
}

impl<'a> BatchDriver<'a> {
    pub fn new(context: &'a AnalysisContext, options: BatchOptions) -> Self {
        Self { context, options }
    }

    /// Build one call per correlation group.
    ///
    /// Returns [`CdrError::Cancelled`] when the cancel handle fired before
    /// every group was processed.
    pub fn run(&self, legs: Vec<LegRecord>) -> CdrResult<BatchReport> {
        let builder = CallBuilder::new(self.context);
        self.run_with(legs, |group| builder.build(group))
    }

    /// [`BatchDriver::run`] with a custom per-group build step.
    pub fn run_with<F>(&self, legs: Vec<LegRecord>, build: F) -> CdrResult<BatchReport>
    where
        F: Fn(Vec<LegRecord>) -> BuildOutcome + Sync,
    {
        let groups: Vec<(String, Vec<LegRecord>)> = group_by_correlation(legs)
            .into_iter()
            .collect();
        let total = groups.len();
        let completed = AtomicUsize::new(0);
        let cancel = &self
            .options
            .cancel;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(
                self.options
                    .workers
                    .max(1),
            )
            .thread_name(|i| format!("cdr-worker-{}", i))
            .build()
            .map_err(|e| CdrError::ThreadPool {
                message: e.to_string(),
            })?;

        debug!(
            "Building {} groups on {} workers",
            total,
            pool.current_num_threads()
        );

        let results: Vec<GroupResult> = pool.install(|| {
            groups
                .into_par_iter()
                .map(|(correlation_id, legs)| {
                    if cancel.is_cancelled() {
                        return GroupResult::Skipped;
                    }
                    let outcome = catch_unwind(AssertUnwindSafe(|| build(legs)));
                    completed.fetch_add(1, Ordering::Relaxed);
                    match outcome {
                        Ok(BuildOutcome::Built(call)) => GroupResult::Built(call),
                        Ok(BuildOutcome::Rejected(reason)) => {
                            debug!("Group {} rejected: {}", correlation_id, reason);
                            GroupResult::Rejected
                        }
                        Err(_) => {
                            warn!("Worker panicked while building group {}", correlation_id);
                            GroupResult::Failed
                        }
                    }
                })
                .collect()
        });

        let mut report = BatchReport {
            groups: total,
            ..Default::default()
        };
        let mut skipped = 0;
        for result in results {
            match result {
                GroupResult::Built(call) => report
                    .calls
                    .push(call),
                GroupResult::Rejected => report.rejected += 1,
                GroupResult::Failed => report.failed += 1,
                GroupResult::Skipped => skipped += 1,
            }
        }

        if skipped > 0 {
            return Err(CdrError::Cancelled {
                completed: completed.load(Ordering::Relaxed),
                total,
            });
        }

        info!(
            "Batch done: {} groups, {} calls, {} rejected, {} failed",
            report.groups,
            report
                .calls
                .len(),
            report.rejected,
            report.failed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(correlation_id: &str, sequence: u64, src: &str, dst: &str) -> LegRecord {
        LegRecord {
            correlation_id: correlation_id.into(),
            sequence,
            src: src.into(),
            dst: dst.into(),
            ..Default::default()
        }
    }

    #[test]
    fn grouping_keeps_first_appearance_order() {
        let groups = group_by_correlation(vec![
            leg("b", 1, "101", "102"),
            leg("a", 1, "101", "102"),
            leg("b", 2, "102", "103"),
        ]);
        let keys: Vec<&str> = groups
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(groups["b"].len(), 2);
    }

    #[test]
    fn one_call_per_valid_group() {
        let ctx = AnalysisContext::new(["101", "102"], Vec::<String>::new());
        let driver = BatchDriver::new(&ctx, BatchOptions::default().with_workers(2));
        let report = driver
            .run(vec![
                leg("a", 1, "101", "102"),
                leg("b", 1, "", "102"),
                leg("c", 1, "102", "101"),
                leg("a", 2, "102", "101"),
            ])
            .unwrap();
        assert_eq!(report.groups, 3);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.failed, 0);
        let ids: Vec<&str> = report
            .calls
            .iter()
            .map(|call| call.correlation_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn panic_in_one_group_is_contained() {
        let ctx = AnalysisContext::default();
        let builder = CallBuilder::new(&ctx);
        let driver = BatchDriver::new(&ctx, BatchOptions::default().with_workers(2));
        let report = driver
            .run_with(
                vec![leg("ok", 1, "101", "102"), leg("boom", 1, "101", "102")],
                |legs| {
                    if legs[0].correlation_id == "boom" {
                        panic!("bad group");
                    }
                    builder.build(legs)
                },
            )
            .unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(
            report
                .calls
                .len(),
            1
        );
        assert_eq!(report.calls[0].correlation_id, "ok");
    }

    #[test]
    fn cancelled_batch_reports_progress() {
        let ctx = AnalysisContext::default();
        let cancel = CancelHandle::new();
        cancel.cancel();
        let driver = BatchDriver::new(
            &ctx,
            BatchOptions::default()
                .with_workers(1)
                .with_cancel(cancel),
        );
        let err = driver
            .run(vec![leg("a", 1, "101", "102"), leg("b", 1, "101", "102")])
            .unwrap_err();
        match err {
            CdrError::Cancelled { completed, total } => {
                assert_eq!(completed, 0);
                assert_eq!(total, 2);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn empty_input_is_an_empty_report() {
        let ctx = AnalysisContext::default();
        let report = BatchDriver::new(&ctx, BatchOptions::default())
            .run(Vec::new())
            .unwrap();
        assert_eq!(report.groups, 0);
        assert!(report
            .calls
            .is_empty());
    }
}
