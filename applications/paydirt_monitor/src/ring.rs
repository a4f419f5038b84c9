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

//! The monitor pair's shared ring of verified blocks: a textbook bounded
//! buffer with `empty`/`fill` counting semaphores and a mutex, one producer
//! (the Checker) and one consumer (the Printer).

use std::ptr;

use paydirt_core::{
    blocks::Block,
    consts::{MAX_BLOCKS, MONITOR_SHM_NAME},
    ipc::{shm::RegionError, Semaphore, SharedRegion},
    shutdown::ShutdownSignal,
};

use crate::errors::MonitorError;

/// Layout of the monitor's shared-memory region.
#[repr(C)]
pub struct MonitorRegion {
    pub blocks: [Block; MAX_BLOCKS],
    pub mutex: Semaphore,
    pub empty: Semaphore,
    pub fill: Semaphore,
    pub in_idx: u32,
    pub out_idx: u32,
}

fn advance(idx: u32) -> u32 {
    (idx + 1) % MAX_BLOCKS as u32
}

/// The mapped ring. Created once by the launcher before forking; both halves
/// of the pair drive it through their inherited mapping.
pub struct BlockRing {
    shm: SharedRegion<MonitorRegion>,
    shutdown: ShutdownSignal,
}

impl BlockRing {
    pub fn create() -> Result<Self, MonitorError> {
        Self::create_named(MONITOR_SHM_NAME)
    }

    fn create_named(name: &str) -> Result<Self, MonitorError> {
        let shm = match SharedRegion::<MonitorRegion>::create_exclusive(name) {
            Ok(shm) => shm,
            Err(RegionError::AlreadyExists(name)) => {
                return Err(MonitorError::AlreadyRunning(name))
            },
            Err(e) => return Err(e.into()),
        };
        let ring = Self {
            shm,
            shutdown: ShutdownSignal::new(),
        };
        let r = ring.shm.as_ptr();
        unsafe {
            (*r).mutex.init(1)?;
            (*r).empty.init(MAX_BLOCKS as u32)?;
            (*r).fill.init(0)?;
            (*r).in_idx = 0;
            (*r).out_idx = 0;
        }
        Ok(ring)
    }

    /// Producer side: waits for a free slot.
    pub fn produce(&self, block: &Block) -> Result<(), MonitorError> {
        let r = self.shm.as_ptr();
        if !unsafe { &(*r).empty }.wait(&self.shutdown) {
            return Err(MonitorError::RingWait);
        }
        if !unsafe { &(*r).mutex }.wait(&self.shutdown) {
            unsafe { &(*r).empty }.post();
            return Err(MonitorError::RingWait);
        }
        unsafe {
            let slot = (*r).in_idx;
            (*r).blocks[slot as usize] = *block;
            (*r).in_idx = advance(slot);
            (*r).mutex.post();
            (*r).fill.post();
        }
        Ok(())
    }

    /// Consumer side: waits for a filled slot.
    pub fn consume(&self) -> Result<Block, MonitorError> {
        let r = self.shm.as_ptr();
        if !unsafe { &(*r).fill }.wait(&self.shutdown) {
            return Err(MonitorError::RingWait);
        }
        if !unsafe { &(*r).mutex }.wait(&self.shutdown) {
            unsafe { &(*r).fill }.post();
            return Err(MonitorError::RingWait);
        }
        let block;
        unsafe {
            let slot = (*r).out_idx;
            block = ptr::read(ptr::addr_of!((*r).blocks[slot as usize]));
            (*r).out_idx = advance(slot);
            (*r).mutex.post();
            (*r).empty.post();
        }
        Ok(block)
    }

    pub fn unlink() -> Result<(), MonitorError> {
        SharedRegion::<MonitorRegion>::unlink(MONITOR_SHM_NAME)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_ring() -> BlockRing {
        let name = format!("/paydirt_test_ring_{}", std::process::id());
        let ring = BlockRing::create_named(&name).unwrap();
        SharedRegion::<MonitorRegion>::unlink(&name).unwrap();
        ring
    }

    fn block_with_id(id: u64) -> Block {
        let mut block = Block::seed();
        block.id = id;
        block
    }

    #[test]
    fn advance_wraps_at_the_ring_size() {
        let mut idx = 0;
        for _ in 0..MAX_BLOCKS {
            idx = advance(idx);
        }
        assert_eq!(idx, 0);
        assert_eq!(advance(MAX_BLOCKS as u32 - 1), 0);
    }

    #[test]
    fn ring_preserves_fifo_order_across_wraparound() {
        let ring = test_ring();
        // Fill completely, drain completely, then go around again so both
        // indices wrap.
        for id in 1..=MAX_BLOCKS as u64 {
            ring.produce(&block_with_id(id)).unwrap();
        }
        for id in 1..=MAX_BLOCKS as u64 {
            assert_eq!(ring.consume().unwrap().id, id);
        }
        for id in 10..14 {
            ring.produce(&block_with_id(id)).unwrap();
        }
        for id in 10..14 {
            assert_eq!(ring.consume().unwrap().id, id);
        }
    }

    #[test]
    fn terminator_passes_through_unchanged() {
        let ring = test_ring();
        ring.produce(&Block::terminator()).unwrap();
        assert!(ring.consume().unwrap().is_terminator());
    }
}
