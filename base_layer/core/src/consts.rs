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

//! Tunable bounds and the names of the IPC objects shared by every process in
//! the simulation. The names and numbers here are the external interface of
//! the system; changing one side without the other strands running peers.

/// Maximum number of miner processes that can be registered at once.
pub const MAX_MINERS: usize = 50;

/// Upper bound on the worker threads a single miner may spawn.
pub const MAX_THREADS: usize = 100;

/// Depth of the monitor's ring buffer of verified blocks.
pub const MAX_BLOCKS: usize = 6;

/// Solution value that marks the end-of-stream terminator block. Equals
/// [`POW_LIMIT`](crate::proof_of_work::POW_LIMIT), the first value outside
/// the search domain, so it can never collide with a genuine solution.
pub const EXIT_CODE: u64 = 10_000_000;

/// Maximum number of blocks in flight on the miner-to-checker queue.
pub const QUEUE_DEPTH: usize = 10;

/// Name of the message queue carrying completed blocks to the Checker.
pub const QUEUE_NAME: &str = "/cola_mensajes_con_monitor";

/// Name of the miner cluster's shared-memory region.
pub const MINER_SHM_NAME: &str = "/red_de_mineros";

/// Name of the monitor pair's shared-memory region.
pub const MONITOR_SHM_NAME: &str = "/monitor";
