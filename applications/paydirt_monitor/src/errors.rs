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

use nix::errno::Errno;
use paydirt_core::{
    exit_codes::{ExitCode, ExitError},
    ipc::{mqueue::QueueError, shm::RegionError},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("another monitor is already running ('{0}' exists)")]
    AlreadyRunning(String),
    #[error(transparent)]
    Region(#[from] RegionError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("ring semaphore failure")]
    RingWait,
    #[error("fork failed: {0}")]
    Fork(Errno),
}

impl From<MonitorError> for ExitError {
    fn from(err: MonitorError) -> Self {
        let exit_code = match &err {
            MonitorError::AlreadyRunning(_) | MonitorError::Region(_) => ExitCode::RegionError,
            MonitorError::Queue(_) => ExitCode::QueueError,
            MonitorError::RingWait | MonitorError::Fork(_) => ExitCode::RuntimeError,
        };
        ExitError::new(exit_code, err)
    }
}
