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

//! The Printer: drains the ring and renders one stanza per block on stdout.
//! The terminator ends the process without being printed.

use std::fmt::Write;

use paydirt_core::blocks::Block;

use crate::{errors::MonitorError, ring::BlockRing};

pub fn run(ring: &BlockRing) -> Result<(), MonitorError> {
    let pid = std::process::id();
    println!("[{}] Printing blocks...", pid);

    loop {
        let block = ring.consume()?;
        if block.is_terminator() {
            println!("[{}] Finishing", pid);
            return Ok(());
        }
        print!("{}", format_block(&block));
    }
}

fn format_block(block: &Block) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Id:         {:5}", block.id);
    let _ = writeln!(out, "Winner:     {:5}", block.winner);
    let _ = writeln!(out, "Target:     {:5}", block.target);
    let _ = writeln!(
        out,
        "Solution:   {:5} ({})",
        block.solution,
        if block.is_valid() { "validated" } else { "incorrect" }
    );
    let _ = writeln!(out, "Votes:      {}/{}", block.total_votes, block.approvals);
    let _ = write!(out, "Wallets:    ");
    for wallet in block.wallets.iter().filter(|w| w.peer > 0) {
        let _ = write!(out, "{}:{} ", wallet.peer, wallet.coins);
    }
    out.push_str("\n\n");
    out
}

#[cfg(test)]
mod test {
    use paydirt_core::blocks::CoinSlot;

    use super::*;

    #[test]
    fn stanza_lists_only_registered_wallets() {
        let mut block = Block::seed();
        block.id = 3;
        block.winner = 4242;
        block.target = 83;
        block.solution = 1_234_567;
        block.valid = 1;
        block.total_votes = 2;
        block.approvals = 2;
        block.wallets[0] = CoinSlot { peer: 4242, coins: 2 };
        block.wallets[1] = CoinSlot { peer: 5151, coins: 0 };

        let stanza = format_block(&block);
        assert!(stanza.starts_with("Id:"));
        assert!(stanza.contains("Winner:      4242\n"));
        assert!(stanza.contains("(validated)"));
        assert!(stanza.contains("Votes:      2/2\n"));
        assert!(stanza.contains("4242:2 "));
        assert!(stanza.contains("5151:0 "));
        assert!(stanza.ends_with("\n\n"));
    }

    #[test]
    fn rejected_blocks_read_incorrect() {
        let mut block = Block::seed();
        block.valid = 0;
        let stanza = format_block(&block);
        assert!(stanza.contains("(incorrect)"));
        // Empty wallet slots never show up.
        assert!(!stanza.contains("-1:"));
    }
}
