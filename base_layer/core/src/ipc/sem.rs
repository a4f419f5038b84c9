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

//! Process-shared unnamed semaphores embedded in a shared-memory region.
//!
//! Waits are interruptible: `EINTR` is retried transparently until the
//! process-wide shutdown flag trips, at which point the wait reports `false`
//! and the caller unwinds, releasing whatever it holds. That mirrors how the
//! rest of the system treats every suspension point as a cancellation point.

use std::cell::UnsafeCell;

use log::*;
use nix::errno::Errno;

use crate::{ipc::shm::RegionError, shutdown::ShutdownSignal};

const LOG_TARGET: &str = "paydirt::core::sem";

/// An unnamed POSIX semaphore. Only meaningful at a fixed address inside a
/// [`SharedRegion`](crate::ipc::SharedRegion); never construct one on the
/// stack.
#[repr(transparent)]
pub struct Semaphore {
    inner: UnsafeCell<libc::sem_t>,
}

// The whole point of a pshared semaphore is concurrent access.
unsafe impl Sync for Semaphore {}

impl Semaphore {
    /// Initialize with `value` tokens.
    ///
    /// # Safety
    /// `self` must live in memory mapped by every participating process, and
    /// must be initialized exactly once before any wait or post.
    pub unsafe fn init(&self, value: u32) -> Result<(), RegionError> {
        if libc::sem_init(self.inner.get(), 1, value) != 0 {
            return Err(RegionError::SemaphoreInit(Errno::last()));
        }
        Ok(())
    }

    /// Take a token, retrying interrupted waits while no shutdown is pending.
    /// Returns `false` on shutdown or a non-transient failure; the caller
    /// must unwind without assuming the token was taken.
    pub fn wait(&self, shutdown: &ShutdownSignal) -> bool {
        loop {
            if unsafe { libc::sem_wait(self.inner.get()) } == 0 {
                return true;
            }
            if Errno::last() != Errno::EINTR {
                error!(target: LOG_TARGET, "sem_wait failed: {}", Errno::last());
                return false;
            }
            if shutdown.is_triggered() {
                return false;
            }
        }
    }

    /// Take a token only if one is immediately available.
    pub fn try_wait(&self) -> bool {
        unsafe { libc::sem_trywait(self.inner.get()) == 0 }
    }

    /// Return a token. Posting never blocks; a failure here means the
    /// semaphore itself is broken.
    pub fn post(&self) -> bool {
        if unsafe { libc::sem_post(self.inner.get()) } != 0 {
            error!(target: LOG_TARGET, "sem_post failed: {}", Errno::last());
            return false;
        }
        true
    }

    /// # Safety
    /// No process may touch the semaphore afterwards.
    pub unsafe fn destroy(&self) {
        let _ = libc::sem_destroy(self.inner.get());
    }
}
