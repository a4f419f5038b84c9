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

//! The Checker: pulls blocks off the miner queue, re-verifies each solution
//! independently of the miners' vote, and feeds the ring. The terminator is
//! forwarded (so the Printer unblocks) and the queue's name removed.

use log::*;
use paydirt_core::{ipc::BlockQueue, proof_of_work::pow_hash};

use crate::{errors::MonitorError, ring::BlockRing};

const LOG_TARGET: &str = "paydirt::monitor::checker";

pub fn run(ring: &BlockRing, queue: &BlockQueue) -> Result<(), MonitorError> {
    let pid = std::process::id();
    println!("[{}] Checking blocks...", pid);

    loop {
        let mut block = queue.receive()?;
        if block.is_terminator() {
            block.valid = 0;
            ring.produce(&block)?;
            BlockQueue::unlink()?;
            break;
        }
        block.valid = (pow_hash(block.solution) == block.target) as u32;
        debug!(
            target: LOG_TARGET,
            "block {}: target {} solution {} -> {}",
            block.id,
            block.target,
            block.solution,
            if block.is_valid() { "validated" } else { "incorrect" }
        );
        ring.produce(&block)?;
    }

    println!("[{}] Finishing", pid);
    Ok(())
}
