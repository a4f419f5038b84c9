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

use paydirt_core::{
    exit_codes::{ExitCode, ExitError},
    ipc::{mqueue::QueueError, shm::RegionError, signals::SignalError},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MinerError {
    /// A blocking step observed the shutdown flag. Not a failure: callers
    /// unwind to the deregistration path.
    #[error("interrupted by shutdown")]
    Interrupted,
    #[error("the peer roster is full")]
    RosterFull,
    #[error(transparent)]
    Region(#[from] RegionError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Signal(#[from] SignalError),
}

impl From<MinerError> for ExitError {
    fn from(err: MinerError) -> Self {
        let exit_code = match &err {
            MinerError::Region(_) => ExitCode::RegionError,
            MinerError::Queue(_) => ExitCode::QueueError,
            MinerError::Signal(_) => ExitCode::SignalError,
            MinerError::Interrupted | MinerError::RosterFull => ExitCode::RuntimeError,
        };
        ExitError::new(exit_code, err)
    }
}
