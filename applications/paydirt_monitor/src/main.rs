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

//! The monitor launcher: creates the ring region, forks the Checker/Printer
//! pair (parent checks, child prints), reaps the child and removes the
//! region when the chain ends.

use clap::Parser;
use log::*;
use nix::{
    sys::wait::waitpid,
    unistd::{fork, ForkResult},
};
use paydirt_core::{
    blocks::Block,
    exit_codes::ExitError,
    ipc::BlockQueue,
    logging::init_logging,
};

use crate::{errors::MonitorError, ring::BlockRing};

pub const LOG_TARGET: &str = "paydirt::monitor::main";

mod checker;
mod errors;
mod printer;
mod ring;

#[derive(Parser, Debug)]
#[command(author, version, about = "Block monitor for the paydirt network", long_about = None)]
struct Cli {
    /// Diagnostic verbosity on stderr
    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

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
    init_logging(cli.log_level)?;

    let ring = BlockRing::create().map_err(ExitError::from)?;

    match unsafe { fork() }.map_err(|e| ExitError::from(MonitorError::Fork(e)))? {
        ForkResult::Child => printer::run(&ring).map_err(ExitError::from),
        ForkResult::Parent { child } => {
            let outcome = run_checker(&ring);
            if outcome.is_err() {
                // Best effort: unblock the Printer so the reap below returns.
                let _ = ring.produce(&Block::terminator());
            }
            if let Err(e) = waitpid(child, None) {
                warn!(target: LOG_TARGET, "waitpid({}) failed: {}", child, e);
            }
            println!("Finishing monitor");
            BlockRing::unlink().map_err(ExitError::from)?;
            outcome.map_err(ExitError::from)
        },
    }
}

fn run_checker(ring: &BlockRing) -> Result<(), MonitorError> {
    let queue = BlockQueue::create_receiver()?;
    checker::run(ring, &queue)
}
