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

//! Cooperative shutdown for a single process.
//!
//! `SIGINT` and `SIGALRM` handlers trip one process-wide flag; every blocking
//! primitive (semaphore waits, signal suspends, bounded polls, the mining
//! scan) observes it and unwinds instead of blocking further. The flag is a
//! plain atomic so the signal handlers stay async-signal-safe.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// A cheap, clonable view of the process-wide shutdown flag. Handed to every
/// call that may suspend so it can bail out once shutdown begins.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShutdownSignal;

impl ShutdownSignal {
    pub fn new() -> Self {
        Self
    }

    pub fn is_triggered(&self) -> bool {
        SHUTDOWN.load(Ordering::SeqCst)
    }

    /// Trip the flag. Called from signal handlers; must stay signal-safe.
    pub fn trigger() {
        SHUTDOWN.store(true, Ordering::SeqCst);
    }

    /// Clear the flag. Test support only; production processes never resume
    /// after shutdown has begun.
    pub fn reset() {
        SHUTDOWN.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trigger_is_visible_to_every_clone() {
        ShutdownSignal::reset();
        let a = ShutdownSignal::new();
        let b = a;
        assert!(!a.is_triggered());
        ShutdownSignal::trigger();
        assert!(a.is_triggered());
        assert!(b.is_triggered());
        ShutdownSignal::reset();
        assert!(!a.is_triggered());
    }
}
