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

//! Fixed-layout records shared between processes.
//!
//! Everything here is `#[repr(C)]` and [`Pod`]: a `Block` is shipped through
//! the message queue as raw bytes and copied in and out of shared memory, so
//! the layout must be identical in every process and free of padding.

use bytemuck::{Pod, Zeroable};

use crate::consts::{EXIT_CODE, MAX_MINERS};

/// Marker for a free peer slot in rosters, vote tables and wallet tables.
pub const EMPTY_PEER: i32 = -1;

/// Vote value for a registered peer that has not voted this round.
pub const VOTE_ABSENT: i32 = -1;

/// A peer's wallet entry: process id and accumulated coins.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct CoinSlot {
    pub peer: i32,
    pub coins: i32,
}

impl CoinSlot {
    pub const fn empty() -> Self {
        Self { peer: EMPTY_PEER, coins: -1 }
    }

    pub fn is_empty(&self) -> bool {
        self.peer == EMPTY_PEER
    }
}

/// A peer's vote entry. `vote` is −1 (absent), 0 (reject) or 1 (approve).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct VoteSlot {
    pub peer: i32,
    pub vote: i32,
}

impl VoteSlot {
    pub const fn empty() -> Self {
        Self { peer: EMPTY_PEER, vote: VOTE_ABSENT }
    }
}

/// One round of the chain: the target that was mined, the proposed solution,
/// the winner, the vote counts and a snapshot of every wallet at round end.
///
/// Immutable once shipped. A block whose `solution` equals
/// [`EXIT_CODE`](crate::consts::EXIT_CODE) is the end-of-stream terminator.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Block {
    pub id: u64,
    pub target: u64,
    pub solution: u64,
    pub winner: i32,
    pub total_votes: i32,
    pub approvals: i32,
    pub valid: u32,
    pub wallets: [CoinSlot; MAX_MINERS],
}

/// Exact wire size of a block; the message queue is created with this as its
/// message size.
pub const BLOCK_SIZE: usize = std::mem::size_of::<Block>();

impl Block {
    /// The block the initializer seeds the region with: round 1, target 0,
    /// nothing mined yet.
    pub fn seed() -> Self {
        Self {
            id: 1,
            winner: EMPTY_PEER,
            ..Zeroable::zeroed()
        }
    }

    /// End-of-stream marker, zeroed apart from the sentinel solution.
    pub fn terminator() -> Self {
        Self {
            solution: EXIT_CODE,
            ..Zeroable::zeroed()
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.solution == EXIT_CODE
    }

    pub fn is_valid(&self) -> bool {
        self.valid != 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Reassemble a block received off the queue. The slice must be exactly
    /// [`BLOCK_SIZE`] bytes; it need not be aligned (queue buffers are plain
    /// byte arrays).
    pub fn read_from(bytes: &[u8]) -> Option<Self> {
        bytemuck::try_pod_read_unaligned(bytes).ok()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn layout_has_no_padding() {
        // Three u64 fields, four 4-byte fields, then the wallet snapshot.
        assert_eq!(BLOCK_SIZE, 8 * 3 + 4 * 4 + 8 * MAX_MINERS);
        assert_eq!(std::mem::align_of::<Block>(), 8);
        assert_eq!(std::mem::size_of::<CoinSlot>(), 8);
        assert_eq!(std::mem::size_of::<VoteSlot>(), 8);
    }

    #[test]
    fn terminator_round_trips_through_bytes() {
        let block = Block::terminator();
        assert!(block.is_terminator());
        let copy = Block::read_from(block.as_bytes()).unwrap();
        assert_eq!(copy, block);
        assert!(copy.is_terminator());
    }

    #[test]
    fn seed_block_is_round_one_with_no_winner() {
        let seed = Block::seed();
        assert_eq!(seed.id, 1);
        assert_eq!(seed.target, 0);
        assert_eq!(seed.winner, EMPTY_PEER);
        assert!(!seed.is_terminator());
        assert!(!seed.is_valid());
    }

    #[test]
    fn short_slice_is_rejected() {
        let block = Block::seed();
        assert!(Block::read_from(&block.as_bytes()[..BLOCK_SIZE - 1]).is_none());
    }
}
