//! Worker pool coordination
//!
//! The coordinator owns the enumerator, feeds fixed-size chunks to a pool of
//! CPU-bound worker threads over a rendezvous channel (the producer hands a
//! chunk over only when a worker is ready for it, so memory stays bounded by
//! workers x chunk size), collects per-chunk outcomes, commits progress in
//! contiguous-prefix order, and terminates the pool early on a win.

use crate::balance::BalanceClient;
use crate::config::RecoveryConfig;
use crate::derive::AddressDeriver;
use crate::enumerator::{Chunk, CombinationEnumerator};
use crate::error::{DeriveError, RecoveryError, Result};
use crate::monitor::{MonitorConfig, RecoveryMonitor};
use crate::progress::{ProgressTracker, RunStatus};
use crate::resolver::ResolvedPhrase;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{debug, info, warn};

/// Cooperative termination flag shared by the producer, workers and any
/// signal handler.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a graceful stop: in-flight chunks finish, nothing new is
    /// dispatched, progress is flushed.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-chunk result reported by a worker
#[derive(Debug)]
pub enum ChunkOutcome {
    /// No match in `[start, end)`; `valid` candidates passed the checksum
    Complete { start: u128, end: u128, valid: u64 },
    /// A derived address equaled the target
    MatchFound {
        index: u128,
        phrase: String,
        address: String,
    },
    /// A balance query returned more than zero
    LoadedWalletFound {
        index: u128,
        phrase: String,
        address: String,
        balance: u128,
    },
    /// Non-fatal worker failure; the range is skipped but still advances
    Failed {
        start: u128,
        end: u128,
        error: String,
    },
}

/// A winning candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Win {
    /// Global enumeration index of the winning tuple
    pub index: u128,
    /// The complete recovered phrase
    pub phrase: String,
    /// The address that matched or carried a balance
    pub address: String,
    /// Balance in base units, for loaded-wallet wins
    pub balance: Option<u128>,
}

/// Final result of a coordinator run
#[derive(Debug)]
pub struct RunOutcome {
    pub win: Option<Win>,
    pub status: RunStatus,
    /// Committed enumeration index at the end of the run
    pub committed: u128,
    /// Candidates that passed the BIP-39 checksum
    pub valid_candidates: u64,
}

/// Owns the enumerator and the worker pool for one run
pub struct Coordinator {
    config: RecoveryConfig,
    resolved: Arc<ResolvedPhrase>,
    stop: StopSignal,
    monitor_config: MonitorConfig,
}

/// Everything a worker thread needs, built before spawning
struct WorkerContext {
    resolved: Arc<ResolvedPhrase>,
    deriver: AddressDeriver,
    balance_client: Option<BalanceClient>,
    target: Option<String>,
    stop: StopSignal,
}

impl Coordinator {
    pub fn new(config: RecoveryConfig, resolved: ResolvedPhrase) -> Self {
        Self {
            config,
            resolved: Arc::new(resolved),
            stop: StopSignal::new(),
            monitor_config: MonitorConfig::default(),
        }
    }

    /// Disable the progress bar (used by tests and quiet runs)
    pub fn without_progress_bar(mut self) -> Self {
        self.monitor_config.show_progress_bar = false;
        self
    }

    /// Handle for requesting a graceful stop from outside the run
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Run the scan to completion, a win, or a stop request.
    pub fn run(self) -> Result<RunOutcome> {
        let repeating = self.config.repeating_words;
        let total = self.resolved.search_space(repeating);
        let mut enumerator = CombinationEnumerator::new(&self.resolved, repeating);

        let mut tracker = if self.config.resume {
            ProgressTracker::load_or_new(&self.config.progress_path, total)
        } else {
            ProgressTracker::new(&self.config.progress_path, total)
        };
        let resume_start = tracker.last_processed_index();
        if resume_start > 0 {
            enumerator.seek(resume_start)?;
            info!(index = %resume_start, "resuming from persisted progress");
        }
        // An unwritable progress file is fatal before any work is dispatched.
        tracker.set_status(RunStatus::Running, None)?;

        let mut monitor = RecoveryMonitor::new(total, self.monitor_config.clone());
        monitor.set_position(resume_start);

        // Rendezvous dispatch: the producer blocks until a worker is idle.
        let (chunk_tx, chunk_rx) = sync_channel::<Chunk>(0);
        let chunk_rx = Arc::new(Mutex::new(chunk_rx));
        let (result_tx, result_rx) = sync_channel::<ChunkOutcome>(self.config.workers * 2);

        let mut workers = Vec::with_capacity(self.config.workers);
        for worker_id in 0..self.config.workers {
            let context = WorkerContext {
                resolved: Arc::clone(&self.resolved),
                deriver: AddressDeriver::new(&self.config.chain),
                balance_client: if self.config.query_balances {
                    Some(BalanceClient::new(&self.config)?)
                } else {
                    None
                },
                target: self.config.public_key.clone(),
                stop: self.stop.clone(),
            };
            let rx = Arc::clone(&chunk_rx);
            let tx = result_tx.clone();
            workers.push(
                thread::Builder::new()
                    .name(format!("worker-{worker_id}"))
                    .spawn(move || worker_loop(context, rx, tx))?,
            );
        }
        // Workers hold the only remaining result senders; the collector
        // loop ends when all of them exit.
        drop(result_tx);

        let producer_stop = self.stop.clone();
        let chunk_size = self.config.chunk_size;
        let producer = thread::Builder::new()
            .name("producer".to_string())
            .spawn(move || {
                while !producer_stop.is_stopped() {
                    match enumerator.next_chunk(chunk_size) {
                        Some(chunk) => {
                            if chunk_tx.send(chunk).is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            })?;

        let collected = self.collect(result_rx, &mut tracker, &mut monitor, resume_start);

        // Channels are closed by now; reclaim the pool before reporting.
        producer
            .join()
            .map_err(|_| RecoveryError::Internal("producer thread panicked".to_string()))?;
        for worker in workers {
            worker
                .join()
                .map_err(|_| RecoveryError::Internal("worker thread panicked".to_string()))?;
        }

        let (win, valid_candidates) = match collected {
            Ok(result) => result,
            Err(err) => {
                let _ = tracker.set_status(RunStatus::Error, Some(err.to_string()));
                return Err(err);
            }
        };

        let status = if win.is_some() {
            RunStatus::Completed
        } else if self.stop.is_stopped() {
            RunStatus::Paused
        } else {
            RunStatus::Completed
        };
        tracker.set_status(status, None)?;

        monitor.finish(match (&win, status) {
            (Some(_), _) => "match found",
            (None, RunStatus::Paused) => "paused",
            _ => "search space exhausted",
        });

        Ok(RunOutcome {
            win,
            status,
            committed: monitor.processed(),
            valid_candidates,
        })
    }

    /// Collect worker outcomes until the pool drains.
    ///
    /// Chunks complete in arbitrary order; only the contiguous prefix of
    /// acknowledged ranges is committed, so a fast late chunk can never
    /// overwrite a slow early one in the progress file.
    fn collect(
        &self,
        result_rx: Receiver<ChunkOutcome>,
        tracker: &mut ProgressTracker,
        monitor: &mut RecoveryMonitor,
        resume_start: u128,
    ) -> Result<(Option<Win>, u64)> {
        let mut pending: BTreeMap<u128, u128> = BTreeMap::new();
        let mut next_commit = resume_start;
        let mut win: Option<Win> = None;
        let mut valid_candidates = 0u64;
        let mut fatal: Option<RecoveryError> = None;

        for outcome in result_rx.iter() {
            if fatal.is_some() {
                continue; // drain
            }
            match outcome {
                ChunkOutcome::Complete { start, end, valid } => {
                    valid_candidates += valid;
                    if win.is_none() {
                        pending.insert(start, end);
                        if let Err(err) =
                            commit_prefix(&mut pending, &mut next_commit, tracker, monitor)
                        {
                            self.stop.request_stop();
                            fatal = Some(err);
                        }
                    }
                }
                ChunkOutcome::Failed { start, end, error } => {
                    warn!(%start, %end, error, "chunk failed, skipping its range");
                    if win.is_none() {
                        pending.insert(start, end);
                        if let Err(err) =
                            commit_prefix(&mut pending, &mut next_commit, tracker, monitor)
                        {
                            self.stop.request_stop();
                            fatal = Some(err);
                        }
                    }
                }
                ChunkOutcome::MatchFound {
                    index,
                    phrase,
                    address,
                } => {
                    // First observed win takes the race; the rest of the
                    // in-flight results are drained and discarded.
                    if win.is_none() {
                        monitor.record_match(&address);
                        win = Some(Win {
                            index,
                            phrase,
                            address,
                            balance: None,
                        });
                        self.stop.request_stop();
                    }
                }
                ChunkOutcome::LoadedWalletFound {
                    index,
                    phrase,
                    address,
                    balance,
                } => {
                    if win.is_none() {
                        monitor.record_match(&address);
                        win = Some(Win {
                            index,
                            phrase,
                            address,
                            balance: Some(balance),
                        });
                        self.stop.request_stop();
                    }
                }
            }
        }

        match fatal {
            Some(err) => Err(err),
            None => Ok((win, valid_candidates)),
        }
    }
}

/// Commit the contiguous prefix of acknowledged chunk ranges
fn commit_prefix(
    pending: &mut BTreeMap<u128, u128>,
    next_commit: &mut u128,
    tracker: &mut ProgressTracker,
    monitor: &mut RecoveryMonitor,
) -> Result<()> {
    while let Some(entry) = pending.first_entry() {
        if *entry.key() > *next_commit {
            break;
        }
        let end = entry.remove();
        if end > *next_commit {
            *next_commit = end;
        }
        tracker.record_chunk(*next_commit)?;
        monitor.set_position(*next_commit);
    }
    Ok(())
}

/// Worker thread body: pull chunks until the queue closes
fn worker_loop(
    context: WorkerContext,
    chunk_rx: Arc<Mutex<Receiver<Chunk>>>,
    result_tx: SyncSender<ChunkOutcome>,
) {
    loop {
        let chunk = {
            let rx = chunk_rx.lock().unwrap();
            rx.recv()
        };
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(_) => break, // queue closed
        };
        if context.stop.is_stopped() {
            continue; // keep draining so the producer never blocks
        }
        let outcome = process_chunk(&context, &chunk);
        if result_tx.send(outcome).is_err() {
            break;
        }
    }
}

/// Derive and check every tuple of one chunk
fn process_chunk(context: &WorkerContext, chunk: &Chunk) -> ChunkOutcome {
    let start = chunk.start;
    let end = chunk.end();
    let mut valid = 0u64;

    for (offset, tuple) in chunk.tuples.iter().enumerate() {
        if context.stop.is_stopped() {
            break;
        }
        let index = start + offset as u128;
        let phrase = context.resolved.assemble(tuple);

        let derived = match context.deriver.derive(&phrase) {
            Ok(derived) => derived,
            // Checksum misses are the expected fate of most candidates.
            Err(DeriveError::InvalidMnemonic) => continue,
            Err(err) => {
                return ChunkOutcome::Failed {
                    start,
                    end,
                    error: err.to_string(),
                }
            }
        };
        valid += 1;
        debug!(%index, phrase, "valid candidate");

        if let Some(target) = &context.target {
            if let Some(address) = derived.matches(target) {
                return ChunkOutcome::MatchFound {
                    index,
                    phrase,
                    address,
                };
            }
        }

        if let Some(client) = &context.balance_client {
            for address in derived.rendered() {
                let balance = client.balance(&address);
                if balance > 0 {
                    return ChunkOutcome::LoadedWalletFound {
                        index,
                        phrase,
                        address,
                        balance,
                    };
                }
            }
        }
    }

    ChunkOutcome::Complete { start, end, valid }
}
