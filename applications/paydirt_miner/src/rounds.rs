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

//! The per-miner round state machine.
//!
//! One round: wait for the start signal, close the admission gate, search
//! for the target's preimage, race for the election latch, then either run
//! the winner protocol (announce, collect votes, tally, ship, rotate, reopen
//! the gate, start the next round) or vote on the winner's proposal.
//! Shutdown is reachable from every state; the exit path deregisters and,
//! for the last peer, tears the network down.

use std::{
    thread,
    time::{Duration, Instant},
};

use log::*;
use nix::unistd::getpid;
use paydirt_core::{
    blocks::{Block, VoteSlot, EMPTY_PEER, VOTE_ABSENT},
    consts::MAX_MINERS,
    ipc::signals::{PeerSignal, RoundSignals},
    proof_of_work::pow_hash,
    shutdown::ShutdownSignal,
};

use crate::{config::MinerConfig, errors::MinerError, registry::MinerNetwork, worker};

const LOG_TARGET: &str = "paydirt::miner::rounds";

/// Pause after the round-start signal so every peer has consumed it before
/// the gate closes and the search begins.
const ROUND_WARMUP: Duration = Duration::from_millis(10);
/// Pause between protocol steps that race signal delivery.
const STEP_PAUSE: Duration = Duration::from_millis(1);
/// Longest the winner waits for the vote quorum before tallying whatever
/// arrived.
const VOTE_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    WaitingStart,
    Mining,
    Winning(u64),
    Voting,
    Exiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    StartReceived,
    Latched(u64),
    SomeoneElseWon,
    RoundComplete,
    Shutdown,
}

/// Every possible state transition of a miner, given its current state and
/// the event its handler produced.
pub fn transition(state: RoundState, event: RoundEvent) -> RoundState {
    use RoundEvent::*;
    use RoundState::*;
    match (state, event) {
        (WaitingStart, StartReceived) => Mining,
        (Mining, Latched(solution)) => Winning(solution),
        (Mining, SomeoneElseWon) => Voting,
        (Winning(_), RoundComplete) => WaitingStart,
        (Voting, RoundComplete) => WaitingStart,
        (_, Shutdown) => Exiting,
        (s, e) => {
            warn!(target: LOG_TARGET, "no state transition for {:?} in {:?}", e, s);
            s
        },
    }
}

struct Tally {
    total: i32,
    approvals: i32,
}

fn tally(votes: &[VoteSlot]) -> Tally {
    let mut total = 0;
    let mut approvals = 0;
    for vote in votes {
        if vote.peer == EMPTY_PEER || vote.vote == VOTE_ABSENT {
            continue;
        }
        total += 1;
        if vote.vote == 1 {
            approvals += 1;
        }
    }
    Tally { total, approvals }
}

/// Strict majority of the peers active at announcement time.
fn approved(approvals: i32, active: i32) -> bool {
    approvals > active / 2
}

/// Retire the current block and seed the next round: the fresh target is the
/// solution that just won.
fn rotate(previous: &mut Block, current: &mut Block) {
    *previous = *current;
    current.id = previous.id + 1;
    current.target = previous.solution;
    current.solution = 0;
    current.winner = EMPTY_PEER;
    current.valid = 0;
    current.total_votes = 0;
    current.approvals = 0;
}

/// Collapse `Interrupted` into `None` so round handlers can turn it into a
/// `Shutdown` event; real errors keep propagating.
fn interruptible<T>(res: Result<T, MinerError>) -> Result<Option<T>, MinerError> {
    match res {
        Ok(value) => Ok(Some(value)),
        Err(MinerError::Interrupted) => Ok(None),
        Err(e) => Err(e),
    }
}

pub struct Miner {
    net: MinerNetwork,
    signals: RoundSignals,
    config: MinerConfig,
    pid: i32,
    coins: i32,
}

impl Miner {
    pub fn new(net: MinerNetwork, signals: RoundSignals, config: MinerConfig) -> Self {
        Self {
            net,
            signals,
            config,
            pid: getpid().as_raw(),
            coins: 0,
        }
    }

    fn shutdown(&self) -> ShutdownSignal {
        self.signals.shutdown()
    }

    /// Drive the state machine until shutdown, then leave the network.
    pub fn run(&mut self) -> Result<(), MinerError> {
        match self.net.register(self.coins) {
            Ok(()) => {},
            Err(MinerError::Interrupted) => return self.leave(),
            Err(e) => return Err(e),
        }

        let mut state = RoundState::WaitingStart;
        while state != RoundState::Exiting {
            let event = self.next_event(&state)?;
            state = transition(state, event);
        }
        self.leave()
    }

    fn next_event(&mut self, state: &RoundState) -> Result<RoundEvent, MinerError> {
        match state {
            RoundState::WaitingStart => Ok(self.await_round_start()),
            RoundState::Mining => self.mine(),
            RoundState::Winning(solution) => self.win(*solution),
            RoundState::Voting => self.vote(),
            RoundState::Exiting => unreachable!("no events are produced while exiting"),
        }
    }

    fn await_round_start(&self) -> RoundEvent {
        if self.signals.wait_for(PeerSignal::RoundStart) {
            RoundEvent::StartReceived
        } else {
            RoundEvent::Shutdown
        }
    }

    fn mine(&mut self) -> Result<RoundEvent, MinerError> {
        thread::sleep(ROUND_WARMUP);
        if interruptible(self.net.close_gate())?.is_none() {
            return Ok(RoundEvent::Shutdown);
        }
        if self.shutdown().is_triggered() {
            return Ok(RoundEvent::Shutdown);
        }

        println!("[{}] Generating blocks...", self.pid);
        let target = self.net.current_target();
        debug!(
            target: LOG_TARGET,
            "round {}: searching for the preimage of {}", self.net.current_round(), target
        );
        let solution = worker::search(target, self.config.num_mining_threads, self.shutdown());
        if self.shutdown().is_triggered() {
            return Ok(RoundEvent::Shutdown);
        }

        if let Some(solution) = solution {
            if self.net.winner_sem().try_wait() {
                if PeerSignal::VoteNow.pending() {
                    // A winner announced while this miner was latching; put
                    // the latch back and vote like everyone else.
                    self.net.winner_sem().post();
                    return Ok(RoundEvent::SomeoneElseWon);
                }
                return Ok(RoundEvent::Latched(solution));
            }
        }
        Ok(RoundEvent::SomeoneElseWon)
    }

    /// The winner protocol: announce the solution, gather votes, tally and
    /// ship the block, rotate the chain and open the next round.
    fn win(&mut self, solution: u64) -> Result<RoundEvent, MinerError> {
        let pid = self.pid;
        let announced = self.net.locked(|r| {
            for i in 0..MAX_MINERS {
                if r.votes[i].peer != EMPTY_PEER {
                    r.votes[i].vote = VOTE_ABSENT;
                }
            }
            r.current_block.solution = solution;
            r.current_block.winner = pid;
            if let Some(own) = r.votes.iter_mut().find(|v| v.peer == pid) {
                own.vote = 1;
            }
            r.peers
                .iter()
                .copied()
                .filter(|&p| p != EMPTY_PEER && p != pid)
                .collect::<Vec<i32>>()
        });
        let Some(voters) = interruptible(announced)? else {
            // The latch must go back or no round can ever elect again.
            self.net.winner_sem().post();
            return Ok(RoundEvent::Shutdown);
        };
        let active = voters.len() as i32 + 1;
        info!(
            target: LOG_TARGET,
            "round {}: won with solution {}, asking {} peers to vote",
            self.net.current_round(),
            solution,
            voters.len()
        );

        for peer in &voters {
            self.signals.notify(*peer, PeerSignal::VoteNow);
        }
        thread::sleep(STEP_PAUSE);
        // Release the latch so late finders can run their own election check.
        self.net.winner_sem().post();

        let polling_started = Instant::now();
        while self.net.cast_votes() < active
            && polling_started.elapsed() < VOTE_TIMEOUT
            && !self.shutdown().is_triggered()
        {
            thread::sleep(STEP_PAUSE);
        }

        let coins = &mut self.coins;
        let finalized = self.net.locked(|r| {
            let tally = tally(&r.votes);
            r.current_block.total_votes = tally.total;
            r.current_block.approvals = tally.approvals;
            if approved(tally.approvals, active) {
                if let Some(wallet) = r.wallets.iter_mut().find(|w| w.peer == pid) {
                    wallet.coins += 1;
                    *coins = wallet.coins;
                }
                r.current_block.valid = 1;
            } else {
                r.current_block.valid = 0;
            }
            r.current_block.wallets = r.wallets;
            r.current_block
        });
        let Some(block) = interruptible(finalized)? else {
            return Ok(RoundEvent::Shutdown);
        };
        info!(
            target: LOG_TARGET,
            "block {}: votes {}/{}, {}",
            block.id,
            block.total_votes,
            block.approvals,
            if block.is_valid() { "approved" } else { "rejected" }
        );

        // Ship before rotating so voters can never observe the next round's
        // unsolved block while this one is still in flight.
        self.net.queue.send(&block)?;

        let rotated = self.net.locked(|r| {
            rotate(&mut r.previous_block, &mut r.current_block);
            for i in 0..MAX_MINERS {
                if r.votes[i].peer != EMPTY_PEER {
                    r.votes[i].vote = VOTE_ABSENT;
                }
            }
        });
        if interruptible(rotated)?.is_none() {
            return Ok(RoundEvent::Shutdown);
        }
        if interruptible(self.net.open_gate())?.is_none() {
            return Ok(RoundEvent::Shutdown);
        }
        thread::sleep(STEP_PAUSE);

        let Some(peers) = interruptible(self.net.registered_peers_except(pid))? else {
            return Ok(RoundEvent::Shutdown);
        };
        for peer in &peers {
            self.signals.notify(*peer, PeerSignal::RoundStart);
        }
        PeerSignal::RoundStart.raise_local();
        Ok(RoundEvent::RoundComplete)
    }

    /// The voter protocol: re-check the winner's proposal and record the
    /// verdict in this peer's vote slot.
    fn vote(&mut self) -> Result<RoundEvent, MinerError> {
        if !self.signals.wait_for(PeerSignal::VoteNow) {
            return Ok(RoundEvent::Shutdown);
        }
        thread::sleep(STEP_PAUSE);
        let pid = self.pid;
        let verdict = self.net.locked(|r| {
            let ok = pow_hash(r.current_block.solution) == r.current_block.target;
            if let Some(own) = r.votes.iter_mut().find(|v| v.peer == pid) {
                own.vote = ok as i32;
            }
            ok
        });
        let Some(ok) = interruptible(verdict)? else {
            return Ok(RoundEvent::Shutdown);
        };
        debug!(
            target: LOG_TARGET,
            "round {}: voted to {}", self.net.current_round(), if ok { "approve" } else { "reject" }
        );
        Ok(RoundEvent::RoundComplete)
    }

    /// Deregister and, as the last peer out, tear the network down.
    fn leave(&mut self) -> Result<(), MinerError> {
        info!(target: LOG_TARGET, "[{}] leaving the network with {} coins", self.pid, self.coins);
        let last = match self.net.deregister() {
            Ok(last) => last,
            Err(MinerError::Interrupted) => {
                warn!(target: LOG_TARGET, "could not deregister cleanly before exit");
                false
            },
            Err(e) => return Err(e),
        };
        if last {
            self.net.teardown()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transitions_follow_the_round_protocol() {
        use RoundEvent::*;
        use RoundState::*;
        assert_eq!(transition(WaitingStart, StartReceived), Mining);
        assert_eq!(transition(Mining, Latched(42)), Winning(42));
        assert_eq!(transition(Mining, SomeoneElseWon), Voting);
        assert_eq!(transition(Winning(42), RoundComplete), WaitingStart);
        assert_eq!(transition(Voting, RoundComplete), WaitingStart);
    }

    #[test]
    fn shutdown_exits_from_every_state() {
        use RoundState::*;
        for state in [WaitingStart, Mining, Winning(1), Voting, Exiting] {
            assert_eq!(transition(state, RoundEvent::Shutdown), Exiting);
        }
    }

    #[test]
    fn unexpected_events_leave_the_state_alone() {
        use RoundEvent::*;
        use RoundState::*;
        assert_eq!(transition(WaitingStart, RoundComplete), WaitingStart);
        assert_eq!(transition(Voting, StartReceived), Voting);
    }

    fn vote(peer: i32, vote_value: i32) -> VoteSlot {
        VoteSlot { peer, vote: vote_value }
    }

    #[test]
    fn tally_ignores_absent_votes_and_empty_slots() {
        let votes = [
            vote(100, 1),
            vote(200, 0),
            vote(300, VOTE_ABSENT),
            VoteSlot::empty(),
        ];
        let t = tally(&votes);
        assert_eq!(t.total, 2);
        assert_eq!(t.approvals, 1);
        assert!(t.approvals <= t.total);
    }

    #[test]
    fn majority_is_strict() {
        // A 1-of-2 split is not a majority; the lone self-approval of a solo
        // miner is.
        assert!(approved(1, 1));
        assert!(!approved(1, 2));
        assert!(approved(2, 3));
        assert!(!approved(1, 3));
        assert!(!approved(2, 4));
        assert!(approved(3, 4));
    }

    #[test]
    fn rotation_links_the_chain() {
        let mut current = Block::seed();
        current.solution = 777;
        current.winner = 42;
        current.valid = 1;
        current.total_votes = 3;
        current.approvals = 3;
        let mut previous = Block::seed();

        rotate(&mut previous, &mut current);

        assert_eq!(previous.solution, 777);
        assert_eq!(current.id, previous.id + 1);
        assert_eq!(current.target, previous.solution);
        assert_eq!(current.solution, 0);
        assert_eq!(current.winner, EMPTY_PEER);
        assert_eq!(current.total_votes, 0);
        assert_eq!(current.approvals, 0);
        assert!(!current.is_valid());
    }

    #[test]
    fn repeated_rotation_keeps_ids_monotone() {
        let mut previous = Block::seed();
        let mut current = Block::seed();
        for round in 1..=5u64 {
            current.solution = round * 11;
            rotate(&mut previous, &mut current);
            assert_eq!(current.id, round + 1);
            assert_eq!(current.target, round * 11);
        }
    }
}
