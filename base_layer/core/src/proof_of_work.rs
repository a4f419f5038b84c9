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

//! The proof-of-work function the miners race to invert.
//!
//! `pow_hash` is an affine permutation of `[0, POW_LIMIT)`: the multiplier is
//! coprime to the modulus, so every value in the domain has exactly one
//! preimage. That keeps the chain extensible forever — each round's target is
//! the previous round's solution, and a permutation guarantees the new target
//! is reachable by some candidate in the domain.

/// Size of the search domain. Candidates and hash outputs both live in
/// `[0, POW_LIMIT)`.
pub const POW_LIMIT: u64 = 10_000_000;

// Coprime to POW_LIMIT (no factor of 2 or 5), so the map is a bijection.
const MULTIPLIER: u64 = 48_271;
const INCREMENT: u64 = 83;

/// Hash a candidate. Pure and total on `[0, POW_LIMIT)`; inputs outside the
/// domain are folded in, which keeps the function total for callers that
/// re-hash untrusted block fields.
#[inline]
pub fn pow_hash(candidate: u64) -> u64 {
    (candidate % POW_LIMIT)
        .wrapping_mul(MULTIPLIER)
        .wrapping_add(INCREMENT)
        % POW_LIMIT
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deterministic() {
        for x in [0, 1, 7, 999_983, POW_LIMIT - 1] {
            assert_eq!(pow_hash(x), pow_hash(x));
        }
    }

    #[test]
    fn output_stays_in_domain() {
        for x in (0..POW_LIMIT).step_by(97_731) {
            assert!(pow_hash(x) < POW_LIMIT);
        }
        assert!(pow_hash(u64::MAX) < POW_LIMIT);
    }

    #[test]
    fn known_answers() {
        assert_eq!(pow_hash(0), 83);
        assert_eq!(pow_hash(1), 48_354);
        assert_eq!(pow_hash(POW_LIMIT), 83);
    }

    #[test]
    fn injective_on_sample() {
        use std::collections::HashSet;
        let mut seen = HashSet::new();
        for x in 0..100_000 {
            assert!(seen.insert(pow_hash(x)), "collision at candidate {}", x);
        }
    }

    #[test]
    fn every_target_has_a_preimage() {
        // Walk a short chain the way the rounds do: each solution becomes the
        // next target, and the next preimage must exist in the domain.
        let mut target = pow_hash(0);
        for _ in 0..4 {
            let solution = (0..POW_LIMIT)
                .find(|&i| pow_hash(i) == target)
                .expect("target outside the image of the domain");
            target = solution;
        }
    }
}
