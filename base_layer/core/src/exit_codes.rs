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

use std::fmt;

use thiserror::Error;

/// Process exit statuses for the paydirt binaries. `main` maps an
/// [`ExitError`] to `std::process::exit(code as i32)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    ConfigError = 101,
    SignalError = 102,
    RegionError = 103,
    QueueError = 104,
    RuntimeError = 105,
}

impl ExitCode {
    pub fn hint(self) -> &'static str {
        match self {
            ExitCode::ConfigError => "Invalid arguments or configuration",
            ExitCode::SignalError => "Could not install signal handlers",
            ExitCode::RegionError => "Shared-memory region setup failed",
            ExitCode::QueueError => "Message queue unavailable (is the monitor running?)",
            ExitCode::RuntimeError => "Unrecoverable runtime failure",
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, *self as i32)
    }
}

/// An error carrying the exit status the process should terminate with.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{exit_code}: {details}")]
pub struct ExitError {
    pub exit_code: ExitCode,
    pub details: String,
}

impl ExitError {
    pub fn new<T: ToString>(exit_code: ExitCode, details: T) -> Self {
        Self {
            exit_code,
            details: details.to_string(),
        }
    }
}

impl From<ExitCode> for ExitError {
    fn from(exit_code: ExitCode) -> Self {
        Self {
            exit_code,
            details: exit_code.hint().to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ExitCode::ConfigError as i32, 101);
        assert_eq!(ExitCode::RuntimeError as i32, 105);
    }

    #[test]
    fn details_default_to_the_hint() {
        let err = ExitError::new(ExitCode::ConfigError, "threads must be positive");
        assert!(err.to_string().contains("threads must be positive"));
        let bare = ExitError::from(ExitCode::QueueError);
        assert!(bare.to_string().contains("monitor"));
    }
}
