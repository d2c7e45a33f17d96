//! Pipeline controller: bounded fan-out, dedup, durable appends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use rastation::StationInput;

use crate::error::Result;
use crate::ledger::ProcessedLedger;
use crate::orchestrator::Orchestrator;
use crate::store::{ClaimJournal, OutputStore};

/// Tunables for one pipeline run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Maximum stations in flight at once
    pub concurrency: usize,
    /// Delay between successive dispatches
    pub pacing: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: 50,
            pacing: Duration::from_millis(10),
        }
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    /// Rows appended to the output store
    pub processed: usize,
    /// Stations skipped as already claimed or previously completed
    pub skipped: usize,
    /// Whether the run was cut short by an interrupt
    pub interrupted: bool,
}

/// Drives the orchestrator over the input set.
///
/// Owns the dedup ledger, the bounded concurrency pool and the single
/// output writer. Claims are taken before dispatch (claim-then-process),
/// and every completed station is appended and flushed immediately, so a
/// crash never loses finished work and never corrupts a row.
pub struct Controller {
    orchestrator: Arc<Orchestrator>,
    ledger: ProcessedLedger,
    store: Arc<OutputStore>,
    journal: Option<ClaimJournal>,
    options: PipelineOptions,
}

impl Controller {
    pub fn new(
        orchestrator: Orchestrator,
        ledger: ProcessedLedger,
        store: OutputStore,
        journal: Option<ClaimJournal>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            ledger,
            store: Arc::new(store),
            journal,
            options,
        }
    }

    /// Run the pipeline, stopping dispatch on ctrl-c.
    ///
    /// In-flight stations are abandoned on interrupt; rows already appended
    /// stay intact because each append is a single lock-guarded write.
    pub async fn run(&self, stations: Vec<StationInput>) -> Result<RunSummary> {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, stopping dispatch");
                    let _ = tx.send(true);
                }
                Err(e) => warn!("Interrupt handler unavailable: {e}"),
            }
        });

        self.run_with_shutdown(stations, rx).await
    }

    /// Run the pipeline with an external shutdown signal.
    pub async fn run_with_shutdown(
        &self,
        stations: Vec<StationInput>,
        mut stop: watch::Receiver<bool>,
    ) -> Result<RunSummary> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let written = Arc::new(AtomicUsize::new(0));
        let mut tasks = JoinSet::new();
        let mut summary = RunSummary::default();

        info!(
            "Dispatching {} station(s), concurrency {}",
            stations.len(),
            self.options.concurrency
        );

        for station in stations {
            if *stop.borrow() {
                summary.interrupted = true;
                break;
            }

            // Claim before dispatch: at most once per run, even when the
            // same pair appears twice in the input.
            if !self.ledger.claim(&station.name, &station.url) {
                info!(
                    "Skipping already processed station: {} ({})",
                    station.name, station.url
                );
                summary.skipped += 1;
                continue;
            }

            if let Some(journal) = &self.journal {
                journal.record(&station.name, &station.url)?;
            }

            let permit = tokio::select! {
                biased;
                _ = stopped(&mut stop) => {
                    summary.interrupted = true;
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let orchestrator = Arc::clone(&self.orchestrator);
            let store = Arc::clone(&self.store);
            let written = Arc::clone(&written);
            tasks.spawn(async move {
                let record = orchestrator.enrich(&station).await;
                match store.append(&record) {
                    Ok(()) => {
                        written.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => error!(
                        "Failed to append record for {} ({}): {e}",
                        record.name, record.url
                    ),
                }
                drop(permit);
            });

            // Spread dispatches out a little so external services are not
            // hit with the whole input at once.
            tokio::time::sleep(self.options.pacing).await;
        }

        if summary.interrupted {
            warn!("Abandoning {} in-flight station(s)", tasks.len());
            tasks.shutdown().await;
        } else {
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    error!("Station task failed: {e}");
                }
            }
        }

        summary.processed = written.load(Ordering::SeqCst);
        info!(
            "Run finished: {} processed, {} skipped{}",
            summary.processed,
            summary.skipped,
            if summary.interrupted {
                ", interrupted"
            } else {
                ""
            }
        );
        Ok(summary)
    }
}

/// Resolve once the shutdown flag is raised.
///
/// A vanished sender means no interrupt can ever arrive; in that case the
/// future stays pending so the race in the dispatch loop is decided by the
/// semaphore alone.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow() {
            return;
        }
        if stop.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
