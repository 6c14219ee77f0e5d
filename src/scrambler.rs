// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Self-synchronous scrambler/descrambler, polynomial `1 + x^14 + x^15`
//! (cf. spec §4.2, JESD204B section 5.2.3).
//!
//! Both operate on 32-bit blocks with one block of pipeline latency: the
//! octet swizzle and LFSR step computed from this cycle's input appear on
//! the *next* call to `step`, matching the registered output of the
//! original synchronous design.

/// Initial/reset LFSR state. The last scrambler revision in the reference
/// design; earlier revisions used `0x7FFF` and are not implemented here
/// (cf. spec §9 open questions).
pub const SCRAMBLER_SEED: u16 = 0x7f80;

/// Reorder a 32-bit word's octets as `[b3, b2, b1, b0]` so the MSB-first
/// byte becomes the input LFSR sees first. Its own inverse.
const fn swizzle(x: u32) -> u32 {
    x.swap_bytes()
}

/// One 32-bit scrambler/descrambler output: the data word plus whether the
/// pipeline has produced a valid sample yet (false only on the very first
/// call after construction/reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrambledWord {
    pub data: u32,
    pub valid: bool,
}

/// Build the recursive "full" bit array for the scrambler's feedback
/// computation (spec §4.2): `full[32..47)` holds `state`, and
/// `full[0..32)` (the feedback/output bits) are solved from MSB (k=31)
/// down to LSB (k=0), each depending only on already-solved higher bits.
fn scrambler_step(state: u16, input: u32) -> (u32, u16) {
    let swizzled_in = swizzle(input);
    let mut full = [false; 47];
    for i in 0..15u32 {
        full[32 + i as usize] = (state >> i) & 1 != 0;
    }
    for k in (0..32u32).rev() {
        let a = full[(k + 15) as usize];
        let b = full[(k + 14) as usize];
        let in_bit = (swizzled_in >> k) & 1 != 0;
        full[k as usize] = a ^ b ^ in_bit;
    }
    let mut feedback = 0u32;
    for k in 0..32u32 {
        if full[k as usize] {
            feedback |= 1 << k;
        }
    }
    let mut new_state = 0u16;
    for i in 0..15u32 {
        if full[i as usize] {
            new_state |= 1 << i;
        }
    }
    (feedback, new_state)
}

/// Descrambler's feedback computation: `full = swizzle_in || state` is
/// fully known up front (no recursion), so every `feedback[k]` is a direct
/// three-way XOR of bits from that known array.
fn descrambler_step(state: u16, input: u32) -> (u32, u16) {
    let swizzled_in = swizzle(input);
    let full_bit = |i: u32| -> bool {
        if i < 32 {
            (swizzled_in >> i) & 1 != 0
        } else {
            (state >> (i - 32)) & 1 != 0
        }
    };
    let mut feedback = 0u32;
    for k in 0..32u32 {
        if full_bit(k + 15) ^ full_bit(k + 14) ^ full_bit(k) {
            feedback |= 1 << k;
        }
    }
    let mut new_state = 0u16;
    for i in 0..15u32 {
        if full_bit(i) {
            new_state |= 1 << i;
        }
    }
    (feedback, new_state)
}

/// Self-synchronous scrambler (TX datapath).
#[derive(Debug, Clone)]
pub struct Scrambler {
    seed: u16,
    state: u16,
    pending: u32,
    valid: bool,
}

impl Scrambler {
    pub const fn new() -> Self {
        Self::with_seed(SCRAMBLER_SEED)
    }

    pub const fn with_seed(seed: u16) -> Self {
        Scrambler {
            seed,
            state: seed,
            pending: 0,
            valid: false,
        }
    }

    /// Restore the initial LFSR state and clear the output pipeline.
    pub fn reset(&mut self) {
        self.state = self.seed;
        self.pending = 0;
        self.valid = false;
    }

    /// Scramble one 32-bit input block. Returns the word latched from the
    /// *previous* call (one block of pipeline latency).
    pub fn step(&mut self, input: u32) -> ScrambledWord {
        let (feedback, new_state) = scrambler_step(self.state, input);
        let out = ScrambledWord {
            data: self.pending,
            valid: self.valid,
        };
        self.pending = swizzle(feedback);
        self.valid = true;
        self.state = new_state;
        out
    }
}

impl Default for Scrambler {
    fn default() -> Self {
        Self::new()
    }
}

/// Self-synchronous descrambler (RX datapath). Recovers from any single-bit
/// error within 15 output bits, since its state depends only on received
/// ciphertext, never on its own output.
#[derive(Debug, Clone)]
pub struct Descrambler {
    seed: u16,
    state: u16,
    pending: u32,
    valid: bool,
}

impl Descrambler {
    pub const fn new() -> Self {
        Self::with_seed(SCRAMBLER_SEED)
    }

    pub const fn with_seed(seed: u16) -> Self {
        Descrambler {
            seed,
            state: seed,
            pending: 0,
            valid: false,
        }
    }

    pub fn reset(&mut self) {
        self.state = self.seed;
        self.pending = 0;
        self.valid = false;
    }

    /// Descramble one 32-bit input block. One block of pipeline latency.
    pub fn step(&mut self, input: u32) -> ScrambledWord {
        let (feedback, new_state) = descrambler_step(self.state, input);
        let out = ScrambledWord {
            data: self.pending,
            valid: self.valid,
        };
        self.pending = swizzle(feedback);
        self.valid = true;
        self.state = new_state;
        out
    }
}

impl Default for Descrambler {
    fn default() -> Self {
        Self::new()
    }
}
