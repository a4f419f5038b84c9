// Copyright 2025. The Paydirt Project
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! The parallel preimage search.
//!
//! The domain is split into contiguous ranges, one per worker thread. The
//! first worker to hit the target flips the shared `found` flag and reports
//! its candidate; everyone else notices the flag (or a vote-now signal, or
//! shutdown) at the next checkpoint and stops scanning.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Instant,
};

use crossbeam::channel::{bounded, Sender};
use log::*;
use paydirt_core::{
    ipc::signals::PeerSignal,
    proof_of_work::{pow_hash, POW_LIMIT},
    shutdown::ShutdownSignal,
};

const LOG_TARGET: &str = "paydirt::miner::worker";

// How many candidates a worker scans between checks of the stop conditions.
const CHECK_INTERVAL: u64 = 1024;

// Thread's stack size; the scan itself keeps everything in registers.
const STACK_SIZE: usize = 32_000;

/// Scan `[0, POW_LIMIT)` for a preimage of `target` across `num_threads`
/// workers. Returns `None` when the search was abandoned: another peer
/// announced a win, or shutdown began.
pub fn search(target: u64, num_threads: usize, shutdown: ShutdownSignal) -> Option<u64> {
    let started = Instant::now();
    let found = Arc::new(AtomicBool::new(false));
    let (tx, rx) = bounded(num_threads);

    let workers = partition(POW_LIMIT, num_threads)
        .into_iter()
        .enumerate()
        .map(|(worker, (start, end))| {
            let tx = tx.clone();
            let found = Arc::clone(&found);
            thread::Builder::new()
                .name(format!("cpu-miner-{}", worker))
                .stack_size(STACK_SIZE)
                .spawn(move || scan_range(worker, start, end, target, &found, shutdown, tx))
                .expect("Failed to create mining thread")
        })
        .collect::<Vec<_>>();
    drop(tx);

    for handle in workers {
        if handle.join().is_err() {
            error!(target: LOG_TARGET, "mining thread panicked");
        }
    }

    let solution = rx.try_iter().next();
    if let Some(solution) = solution {
        debug!(
            target: LOG_TARGET,
            "solved target {} with {} in {:.2?}", target, solution, started.elapsed()
        );
    }
    solution
}

/// Split `[0, limit)` into `pieces` contiguous ranges; the last range absorbs
/// the remainder. `pieces` must be at least 1.
fn partition(limit: u64, pieces: usize) -> Vec<(u64, u64)> {
    let span = limit / pieces as u64;
    (0..pieces as u64)
        .map(|i| {
            let start = i * span;
            let end = if i == pieces as u64 - 1 { limit } else { start + span };
            (start, end)
        })
        .collect()
}

fn scan_range(
    worker: usize,
    start: u64,
    end: u64,
    target: u64,
    found: &AtomicBool,
    shutdown: ShutdownSignal,
    report: Sender<u64>,
) {
    trace!(target: LOG_TARGET, "worker {} scanning [{}, {})", worker, start, end);
    for candidate in start..end {
        if pow_hash(candidate) == target {
            // First writer wins; the runners-up stop at their next check.
            if !found.swap(true, Ordering::SeqCst) {
                debug!(target: LOG_TARGET, "worker {} found preimage {}", worker, candidate);
                let _ = report.try_send(candidate);
            }
            return;
        }
        if candidate % CHECK_INTERVAL == 0
            && (found.load(Ordering::SeqCst)
                || PeerSignal::VoteNow.pending()
                || shutdown.is_triggered())
        {
            return;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partition_covers_the_domain_without_overlap() {
        for pieces in [1, 2, 3, 7, 50] {
            let ranges = partition(POW_LIMIT, pieces);
            assert_eq!(ranges.len(), pieces);
            assert_eq!(ranges[0].0, 0);
            assert_eq!(ranges[pieces - 1].1, POW_LIMIT);
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].1, pair[1].0);
            }
        }
    }

    #[test]
    fn partition_last_range_absorbs_the_remainder() {
        let ranges = partition(10, 3);
        assert_eq!(ranges, vec![(0, 3), (3, 6), (6, 10)]);
    }

    #[test]
    fn search_finds_a_planted_target() {
        let solution = 4_321_987;
        let target = pow_hash(solution);
        assert_eq!(search(target, 4, ShutdownSignal::new()), Some(solution));
    }

    #[test]
    fn search_respects_the_found_flag_race() {
        // Two targets with the same preimage would be a bijection violation;
        // instead check that a single-thread search agrees with the
        // multi-thread one.
        let target = pow_hash(99_999);
        assert_eq!(
            search(target, 1, ShutdownSignal::new()),
            search(target, 8, ShutdownSignal::new())
        );
    }
}
