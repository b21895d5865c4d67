use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error};

use crate::error::{Error, Result};

/// Work source for a [`Scheduler`] run.
///
/// The controller pulls jobs with `next_job` and hands every successful
/// result back through `complete`, which may make new jobs available.
/// Both are called on the controller thread only.
pub trait Frontier {
    type Job: Send;
    type Output: Send;

    fn next_job(&mut self) -> Option<Self::Job>;

    fn complete(&mut self, output: Self::Output) -> Result<()>;
}

/// Counters from a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    pub completed: usize,
    pub failed: usize,
    /// Failures that arrived after the first one.
    pub secondary_errors: usize,
    /// Most workers ever in flight at once.
    pub peak_active: usize,
}

/// Bounded worker pool driving a [`Frontier`] to exhaustion.
#[derive(Clone, Copy, Debug)]
pub struct Scheduler {
    max_parallel: usize,
}

impl Scheduler {
    pub fn new(max_parallel: usize) -> Self {
        Scheduler {
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Run `work` on every job the frontier yields, with at most
    /// `max_parallel` jobs in flight.
    ///
    /// The first failure stops dispatch. Jobs already running are drained
    /// and their failures logged, then the first error is returned.
    pub fn run<F, W>(&self, frontier: &mut F, work: W) -> Result<SchedulerReport>
    where
        F: Frontier,
        W: Fn(F::Job) -> Result<F::Output> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("hashpack-fetch-{}", i))
            .num_threads(self.max_parallel)
            .build()?;

        let (tx, rx) = crossbeam_channel::unbounded::<Result<F::Output>>();
        let mut report = SchedulerReport::default();
        let mut first_error: Option<Error> = None;
        let mut active = 0usize;
        let work = &work;

        pool.in_place_scope(|s| loop {
            while first_error.is_none() && active < self.max_parallel {
                let Some(job) = frontier.next_job() else {
                    break;
                };
                active += 1;
                report.peak_active = report.peak_active.max(active);
                let tx = tx.clone();
                s.spawn(move |_| {
                    let result = catch_unwind(AssertUnwindSafe(|| work(job)))
                        .unwrap_or(Err(Error::WorkerPanic));
                    let _ = tx.send(result);
                });
            }
            if active == 0 {
                break;
            }

            let Ok(result) = rx.recv() else {
                break;
            };
            active -= 1;
            match result {
                Ok(output) => {
                    report.completed += 1;
                    if first_error.is_none() {
                        if let Err(e) = frontier.complete(output) {
                            first_error = Some(e);
                        }
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    if first_error.is_none() {
                        debug!(error = %e, active, "first failure, draining workers");
                        first_error = Some(e);
                    } else {
                        report.secondary_errors += 1;
                        error!(error = %e, "additional failure while draining");
                    }
                }
            }
        });

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}
