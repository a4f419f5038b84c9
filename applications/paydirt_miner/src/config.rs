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
    consts::MAX_THREADS,
    exit_codes::{ExitCode, ExitError},
};
use serde::{Deserialize, Serialize};

/// Validated miner settings.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MinerConfig {
    pub deadline_secs: u32,
    pub num_mining_threads: usize,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            deadline_secs: 60,
            num_mining_threads: num_cpus::get().clamp(1, MAX_THREADS),
        }
    }
}

impl MinerConfig {
    pub fn new(deadline_secs: u32, num_mining_threads: usize) -> Result<Self, ExitError> {
        if deadline_secs == 0 {
            return Err(ExitError::new(
                ExitCode::ConfigError,
                "the deadline must be at least one second",
            ));
        }
        if num_mining_threads == 0 || num_mining_threads > MAX_THREADS {
            return Err(ExitError::new(
                ExitCode::ConfigError,
                format!("threads must be between 1 and {}", MAX_THREADS),
            ));
        }
        Ok(Self {
            deadline_secs,
            num_mining_threads,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accepts_the_bounds() {
        assert!(MinerConfig::new(1, 1).is_ok());
        assert!(MinerConfig::new(1, MAX_THREADS).is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert_eq!(MinerConfig::new(0, 2).unwrap_err().exit_code, ExitCode::ConfigError);
        assert_eq!(MinerConfig::new(5, 0).unwrap_err().exit_code, ExitCode::ConfigError);
        assert_eq!(
            MinerConfig::new(5, MAX_THREADS + 1).unwrap_err().exit_code,
            ExitCode::ConfigError
        );
    }

    #[test]
    fn default_thread_count_is_in_range() {
        let config = MinerConfig::default();
        assert!((1..=MAX_THREADS).contains(&config.num_mining_threads));
    }
}
