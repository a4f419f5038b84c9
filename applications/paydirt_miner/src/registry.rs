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

//! The miner cluster's shared region: roster, votes, wallets, the block
//! pair, the election latch and the mid-round admission gate.
//!
//! The first miner to win the `O_CREAT | O_EXCL` race seeds the region and
//! starts round 1; everyone else attaches and waits for the seed to become
//! visible. The last miner out ships the terminator block and unlinks both
//! the region and the queue — the roster decrement and the "am I last?"
//! check happen in one critical section so exactly one peer sees the empty
//! roster.

use std::{ptr, thread, time::Duration};

use bytemuck::Zeroable;
use log::*;
use nix::unistd::getpid;
use paydirt_core::{
    blocks::{Block, CoinSlot, VoteSlot, EMPTY_PEER, VOTE_ABSENT},
    consts::{MAX_MINERS, MINER_SHM_NAME},
    ipc::{
        shm::RegionError,
        signals::{PeerSignal, RoundSignals},
        BlockQueue,
        Semaphore,
        SharedRegion,
    },
    shutdown::ShutdownSignal,
};

use crate::errors::MinerError;

const LOG_TARGET: &str = "paydirt::miner::registry";

/// Grace the initializer gives early joiners before kicking off round 1.
const FIRST_ROUND_GRACE: Duration = Duration::from_millis(5);
/// Poll step while a joiner waits for the initializer to finish seeding.
const SEED_POLL: Duration = Duration::from_millis(1);

/// Layout of the miner cluster's shared-memory region. Lives in shared
/// memory only; every process maps exactly one instance.
#[repr(C)]
pub struct MinerRegion {
    pub peers: [i32; MAX_MINERS],
    pub votes: [VoteSlot; MAX_MINERS],
    pub wallets: [CoinSlot; MAX_MINERS],
    pub previous_block: Block,
    pub current_block: Block,
    /// Guards peers, votes, wallets and both blocks.
    pub mutex: Semaphore,
    /// Election latch: one token, held briefly by the round's first finder.
    pub winner_sem: Semaphore,
    /// Guards `can_enter` and `waiters_count` exclusively.
    pub entry_mutex: Semaphore,
    /// Admission gate; opened `waiters_count` times by the winner.
    pub entry_gate: Semaphore,
    pub waiters_count: i32,
    pub can_enter: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initializer,
    Joiner,
}

/// A miner's attachment to the shared region and the outbound block queue.
pub struct MinerNetwork {
    shm: SharedRegion<MinerRegion>,
    pub queue: BlockQueue,
    shutdown: ShutdownSignal,
    role: Role,
}

impl MinerNetwork {
    /// Create-or-attach. The `O_EXCL` winner becomes the initializer: it
    /// seeds every slot, starts round 1 for itself and signals any peer that
    /// managed to register during the grace window.
    pub fn join(signals: &RoundSignals) -> Result<Self, MinerError> {
        let shutdown = signals.shutdown();
        match SharedRegion::<MinerRegion>::create_exclusive(MINER_SHM_NAME) {
            Ok(shm) => {
                let queue = match BlockQueue::open_sender() {
                    Ok(queue) => queue,
                    Err(e) => {
                        let _ = SharedRegion::<MinerRegion>::unlink(MINER_SHM_NAME);
                        return Err(e.into());
                    },
                };
                let net = Self {
                    shm,
                    queue,
                    shutdown,
                    role: Role::Initializer,
                };
                if let Err(e) = net.seed() {
                    let _ = SharedRegion::<MinerRegion>::unlink(MINER_SHM_NAME);
                    return Err(e);
                }
                info!(target: LOG_TARGET, "created {}, round 1 seeded", MINER_SHM_NAME);
                thread::sleep(FIRST_ROUND_GRACE);
                match net.registered_peers_except(getpid().as_raw()) {
                    Ok(peers) => {
                        for peer in peers {
                            signals.notify(peer, PeerSignal::RoundStart);
                        }
                    },
                    // Shutdown already began; the run loop unwinds and the
                    // exit path tears the region down.
                    Err(MinerError::Interrupted) => {},
                    Err(e) => return Err(e),
                }
                PeerSignal::RoundStart.raise_local();
                Ok(net)
            },
            Err(RegionError::AlreadyExists(_)) => {
                let queue = BlockQueue::open_sender()?;
                let shm = SharedRegion::open_existing(MINER_SHM_NAME)?;
                let net = Self {
                    shm,
                    queue,
                    shutdown,
                    role: Role::Joiner,
                };
                net.wait_until_seeded()?;
                info!(target: LOG_TARGET, "attached to existing {}", MINER_SHM_NAME);
                Ok(net)
            },
            Err(e) => Err(e.into()),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    fn seed(&self) -> Result<(), MinerError> {
        let r = self.shm.as_ptr();
        unsafe {
            (*r).mutex.init(1)?;
            (*r).winner_sem.init(1)?;
            (*r).entry_mutex.init(1)?;
            (*r).entry_gate.init(0)?;
            (*r).waiters_count = 0;
            (*r).can_enter = 1;
            for i in 0..MAX_MINERS {
                (*r).peers[i] = EMPTY_PEER;
                (*r).votes[i] = VoteSlot::empty();
                (*r).wallets[i] = CoinSlot::empty();
            }
            let mut previous: Block = Zeroable::zeroed();
            previous.winner = EMPTY_PEER;
            (*r).previous_block = previous;

            // Joiners spin until the current block id becomes non-zero, so
            // the id is published last.
            let mut current = Block::seed();
            let id = current.id;
            current.id = 0;
            (*r).current_block = current;
            ptr::write_volatile(ptr::addr_of_mut!((*r).current_block.id), id);
        }
        Ok(())
    }

    fn wait_until_seeded(&self) -> Result<(), MinerError> {
        let r = self.shm.as_ptr();
        loop {
            let id = unsafe { ptr::read_volatile(ptr::addr_of!((*r).current_block.id)) };
            if id > 0 {
                return Ok(());
            }
            if self.shutdown.is_triggered() {
                return Err(MinerError::Interrupted);
            }
            thread::sleep(SEED_POLL);
        }
    }

    /// Run `f` with the roster mutex held.
    pub fn locked<R>(&self, f: impl FnOnce(&mut MinerRegion) -> R) -> Result<R, MinerError> {
        let r = self.shm.as_ptr();
        if !unsafe { &(*r).mutex }.wait(&self.shutdown) {
            return Err(MinerError::Interrupted);
        }
        let out = f(unsafe { &mut *r });
        unsafe { &(*r).mutex }.post();
        Ok(out)
    }

    /// Run `f` with the admission-gate mutex held.
    fn entry_locked<R>(&self, f: impl FnOnce(&mut MinerRegion) -> R) -> Result<R, MinerError> {
        let r = self.shm.as_ptr();
        if !unsafe { &(*r).entry_mutex }.wait(&self.shutdown) {
            return Err(MinerError::Interrupted);
        }
        let out = f(unsafe { &mut *r });
        unsafe { &(*r).entry_mutex }.post();
        Ok(out)
    }

    /// Join the roster. If a round is in flight, block at the entry gate
    /// until the winner opens it; a peer admitted during round *k* first
    /// mines in round *k+1*.
    pub fn register(&self, coins: i32) -> Result<(), MinerError> {
        let pid = getpid().as_raw();
        let claimed = self.entry_locked(|r| {
            if r.can_enter != 0 {
                Some(claim_slot(r, pid, coins))
            } else {
                r.waiters_count += 1;
                None
            }
        })?;
        let slot = match claimed {
            Some(slot) => slot,
            None => {
                debug!(target: LOG_TARGET, "round in flight, waiting at the entry gate");
                let gate = unsafe { &(*self.shm.as_ptr()).entry_gate };
                if !gate.wait(&self.shutdown) {
                    // Retract the waiter count so the winner does not post a
                    // gate token for a peer that gave up.
                    let _ = self.entry_locked(|r| {
                        if r.waiters_count > 0 {
                            r.waiters_count -= 1;
                        }
                    });
                    return Err(MinerError::Interrupted);
                }
                self.entry_locked(|r| claim_slot(r, pid, coins))?
            },
        };
        match slot {
            Some(slot) => {
                info!(target: LOG_TARGET, "registered peer {} in slot {}", pid, slot);
                Ok(())
            },
            None => Err(MinerError::RosterFull),
        }
    }

    /// Close the gate before the search starts. The first miner into the
    /// round wins the write; the rest are idempotent.
    pub fn close_gate(&self) -> Result<(), MinerError> {
        self.entry_locked(|r| r.can_enter = 0)
    }

    /// Reopen the gate at round end and wake everyone the round locked out.
    pub fn open_gate(&self) -> Result<(), MinerError> {
        let waiters = self.entry_locked(|r| {
            r.can_enter = 1;
            let waiters = r.waiters_count;
            for _ in 0..waiters {
                r.entry_gate.post();
            }
            r.waiters_count = 0;
            waiters
        })?;
        if waiters > 0 {
            debug!(target: LOG_TARGET, "admitted {} peers through the gate", waiters);
        }
        Ok(())
    }

    /// Lock-free read of the current round's target.
    pub fn current_target(&self) -> u64 {
        let r = self.shm.as_ptr();
        unsafe { ptr::read_volatile(ptr::addr_of!((*r).current_block.target)) }
    }

    /// Lock-free read of the current round id, for diagnostics.
    pub fn current_round(&self) -> u64 {
        let r = self.shm.as_ptr();
        unsafe { ptr::read_volatile(ptr::addr_of!((*r).current_block.id)) }
    }

    /// Lock-free count of votes cast this round. Drives the winner's quorum
    /// poll; the binding tally happens later under the mutex.
    pub fn cast_votes(&self) -> i32 {
        let r = self.shm.as_ptr();
        let mut cast = 0;
        for i in 0..MAX_MINERS {
            let vote = unsafe { ptr::read_volatile(ptr::addr_of!((*r).votes[i])) };
            if vote.peer != EMPTY_PEER && vote.vote != VOTE_ABSENT {
                cast += 1;
            }
        }
        cast
    }

    pub fn winner_sem(&self) -> &Semaphore {
        unsafe { &(*self.shm.as_ptr()).winner_sem }
    }

    pub fn registered_peers_except(&self, pid: i32) -> Result<Vec<i32>, MinerError> {
        self.locked(|r| {
            r.peers
                .iter()
                .copied()
                .filter(|&p| p != EMPTY_PEER && p != pid)
                .collect()
        })
    }

    /// Clear the caller's slots and report whether it was the last peer.
    pub fn deregister(&self) -> Result<bool, MinerError> {
        let pid = getpid().as_raw();
        self.locked(|r| {
            release_slot(r, pid);
            r.peers.iter().all(|&p| p == EMPTY_PEER)
        })
    }

    /// Last-peer teardown: ship the terminator, then remove the queue and
    /// region names.
    pub fn teardown(&self) -> Result<(), MinerError> {
        self.queue.send(&Block::terminator())?;
        BlockQueue::unlink()?;
        SharedRegion::<MinerRegion>::unlink(MINER_SHM_NAME)?;
        info!(target: LOG_TARGET, "last peer out: terminator shipped, {} unlinked", MINER_SHM_NAME);
        Ok(())
    }
}

fn claim_slot(region: &mut MinerRegion, pid: i32, coins: i32) -> Option<usize> {
    let slot = region.peers.iter().position(|&p| p == EMPTY_PEER)?;
    // The pid write publishes the slot, so it goes last.
    region.votes[slot] = VoteSlot {
        peer: pid,
        vote: VOTE_ABSENT,
    };
    region.wallets[slot] = CoinSlot { peer: pid, coins };
    region.peers[slot] = pid;
    Some(slot)
}

fn release_slot(region: &mut MinerRegion, pid: i32) {
    if let Some(slot) = region.peers.iter().position(|&p| p == pid) {
        region.peers[slot] = EMPTY_PEER;
        region.votes[slot] = VoteSlot::empty();
        region.wallets[slot] = CoinSlot::empty();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn empty_region() -> MinerRegion {
        // Zeroed is fine for a roster-only test fixture: the semaphores are
        // never touched.
        let mut region: MinerRegion = unsafe { std::mem::zeroed() };
        region.peers = [EMPTY_PEER; MAX_MINERS];
        for i in 0..MAX_MINERS {
            region.votes[i] = VoteSlot::empty();
            region.wallets[i] = CoinSlot::empty();
        }
        region
    }

    #[test]
    fn claim_takes_the_first_free_slot_with_matching_ids() {
        let mut region = empty_region();
        assert_eq!(claim_slot(&mut region, 100, 0), Some(0));
        assert_eq!(claim_slot(&mut region, 200, 3), Some(1));
        assert_eq!(region.peers[1], 200);
        assert_eq!(region.votes[1].peer, 200);
        assert_eq!(region.votes[1].vote, VOTE_ABSENT);
        assert_eq!(region.wallets[1], CoinSlot { peer: 200, coins: 3 });
    }

    #[test]
    fn claim_reuses_released_slots() {
        let mut region = empty_region();
        claim_slot(&mut region, 100, 0);
        claim_slot(&mut region, 200, 0);
        release_slot(&mut region, 100);
        assert_eq!(region.peers[0], EMPTY_PEER);
        assert_eq!(claim_slot(&mut region, 300, 7), Some(0));
        assert_eq!(region.wallets[0].coins, 7);
    }

    #[test]
    fn full_roster_rejects_claims() {
        let mut region = empty_region();
        for pid in 0..MAX_MINERS as i32 {
            assert!(claim_slot(&mut region, 1000 + pid, 0).is_some());
        }
        assert_eq!(claim_slot(&mut region, 9999, 0), None);
    }

    #[test]
    fn releasing_everyone_empties_the_roster() {
        let mut region = empty_region();
        claim_slot(&mut region, 100, 0);
        claim_slot(&mut region, 200, 0);
        release_slot(&mut region, 100);
        assert!(!region.peers.iter().all(|&p| p == EMPTY_PEER));
        release_slot(&mut region, 200);
        assert!(region.peers.iter().all(|&p| p == EMPTY_PEER));
    }
}
