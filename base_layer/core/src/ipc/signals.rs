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

//! Round signalling between miner processes.
//!
//! `SIGUSR1` announces a new round, `SIGUSR2` tells voters the winner has
//! proposed a solution, and `SIGINT`/`SIGALRM` begin shutdown. Handlers only
//! flip atomics; everything else happens at well-defined suspension points.
//! During setup every signal is blocked, the four handlers are installed,
//! and exactly those four signals are unblocked again.

use std::sync::atomic::{AtomicBool, Ordering};

use log::*;
use nix::{
    errno::Errno,
    sys::signal::{kill, sigaction, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal},
    unistd::{alarm, Pid},
};
use thiserror::Error;

use crate::shutdown::ShutdownSignal;

const LOG_TARGET: &str = "paydirt::core::signals";

static ROUND_START: AtomicBool = AtomicBool::new(false);
static VOTE_NOW: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_round_start(_: libc::c_int) {
    ROUND_START.store(true, Ordering::SeqCst);
}

extern "C" fn handle_vote_now(_: libc::c_int) {
    VOTE_NOW.store(true, Ordering::SeqCst);
}

extern "C" fn handle_shutdown(_: libc::c_int) {
    ShutdownSignal::trigger();
}

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("sigprocmask failed: {0}")]
    Mask(Errno),
    #[error("sigaction({0}) failed: {1}")]
    Install(Signal, Errno),
}

/// The two peer-to-peer notifications of the round protocol. Each is a handle
/// on its delivery flag, so worker threads can poll for vote-now without any
/// further plumbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerSignal {
    RoundStart,
    VoteNow,
}

impl PeerSignal {
    fn signal(self) -> Signal {
        match self {
            PeerSignal::RoundStart => Signal::SIGUSR1,
            PeerSignal::VoteNow => Signal::SIGUSR2,
        }
    }

    fn flag(self) -> &'static AtomicBool {
        match self {
            PeerSignal::RoundStart => &ROUND_START,
            PeerSignal::VoteNow => &VOTE_NOW,
        }
    }

    /// Has the notification been delivered but not yet consumed?
    pub fn pending(self) -> bool {
        self.flag().load(Ordering::SeqCst)
    }

    /// Consume a pending notification, reporting whether one was pending.
    pub fn take(self) -> bool {
        self.flag().swap(false, Ordering::SeqCst)
    }

    /// Mark the notification delivered without a signal. The initializer
    /// starts its own first round this way, and the winner starts its next.
    pub fn raise_local(self) {
        self.flag().store(true, Ordering::SeqCst);
    }
}

/// Installed signal dispositions for one miner process.
pub struct RoundSignals {
    shutdown: ShutdownSignal,
}

impl RoundSignals {
    /// Block everything, install the handlers, then unblock exactly
    /// `SIGUSR1`, `SIGUSR2`, `SIGINT` and `SIGALRM`.
    pub fn install() -> Result<Self, SignalError> {
        nix::sys::signal::sigprocmask(SigmaskHow::SIG_BLOCK, Some(&SigSet::all()), None)
            .map_err(SignalError::Mask)?;

        let install = |sig: Signal, handler: extern "C" fn(libc::c_int)| {
            let action = SigAction::new(
                SigHandler::Handler(handler),
                SaFlags::SA_RESTART,
                SigSet::empty(),
            );
            unsafe { sigaction(sig, &action) }
                .map(|_| ())
                .map_err(|e| SignalError::Install(sig, e))
        };
        install(Signal::SIGUSR1, handle_round_start)?;
        install(Signal::SIGUSR2, handle_vote_now)?;
        install(Signal::SIGINT, handle_shutdown)?;
        install(Signal::SIGALRM, handle_shutdown)?;

        let mut ours = SigSet::empty();
        ours.add(Signal::SIGUSR1);
        ours.add(Signal::SIGUSR2);
        ours.add(Signal::SIGINT);
        ours.add(Signal::SIGALRM);
        nix::sys::signal::sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&ours), None)
            .map_err(SignalError::Mask)?;

        Ok(Self {
            shutdown: ShutdownSignal::new(),
        })
    }

    /// Arm the wall-clock deadline; `SIGALRM` fires after `seconds`.
    pub fn arm_deadline(&self, seconds: u32) {
        let _ = alarm::set(seconds);
    }

    pub fn shutdown(&self) -> ShutdownSignal {
        self.shutdown
    }

    /// Suspend until `which` has been delivered, then consume it. Only the
    /// awaited signal, `SIGINT` and `SIGALRM` can interrupt the suspend.
    /// Returns `false` when shutdown won the race.
    pub fn wait_for(&self, which: PeerSignal) -> bool {
        let mut mask = SigSet::all();
        mask.remove(which.signal());
        mask.remove(Signal::SIGINT);
        mask.remove(Signal::SIGALRM);
        while !which.pending() && !self.shutdown.is_triggered() {
            // sigsuspend always reports EINTR; the loop condition decides.
            let _ = mask.suspend();
        }
        if self.shutdown.is_triggered() {
            return false;
        }
        which.take();
        true
    }

    /// Send `which` to a peer. A peer that died since the roster was read is
    /// logged and skipped.
    pub fn notify(&self, peer: i32, which: PeerSignal) {
        match kill(Pid::from_raw(peer), which.signal()) {
            Ok(()) => {},
            Err(Errno::ESRCH) => {
                warn!(target: LOG_TARGET, "peer {} is gone, skipping {:?}", peer, which);
            },
            Err(e) => {
                error!(target: LOG_TARGET, "kill({}, {:?}) failed: {}", peer, which, e);
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn take_consumes_the_flag() {
        PeerSignal::RoundStart.raise_local();
        assert!(PeerSignal::RoundStart.pending());
        assert!(PeerSignal::RoundStart.take());
        assert!(!PeerSignal::RoundStart.pending());
        assert!(!PeerSignal::RoundStart.take());
    }
}
