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

use clap::Parser;
use log::*;
use paydirt_core::{
    exit_codes::{ExitCode, ExitError},
    ipc::signals::RoundSignals,
    logging::init_logging,
};

use crate::{cli::Cli, registry::MinerNetwork, rounds::Miner};

pub const LOG_TARGET: &str = "paydirt::miner::main";

mod cli;
mod config;
mod errors;
mod registry;
mod rounds;
mod worker;

/// Application entry point
fn main() {
    match main_inner() {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            eprintln!("Fatal error: {}", err);
            error!(target: LOG_TARGET, "Exiting with code: {}", err.exit_code);
            std::process::exit(err.exit_code as i32)
        },
    }
}

fn main_inner() -> Result<(), ExitError> {
    let cli = Cli::parse();
    let config = cli.config()?;
    init_logging(cli.log_level)?;

    let signals =
        RoundSignals::install().map_err(|e| ExitError::new(ExitCode::SignalError, e))?;
    let net = MinerNetwork::join(&signals).map_err(ExitError::from)?;
    signals.arm_deadline(config.deadline_secs);
    info!(
        target: LOG_TARGET,
        "joined as {:?}: {} worker threads, {}s deadline",
        net.role(),
        config.num_mining_threads,
        config.deadline_secs
    );

    Miner::new(net, signals, config).run().map_err(ExitError::from)
}
