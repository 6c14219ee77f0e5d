// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ILAS ("Initial Lane Alignment Sequence") generator/checker (cf. spec
//! §4.7): a fixed 4-multiframe table embedding the lane's configuration
//! octets, streamed once per link bring-up.

use crate::error::JesdResult;
use crate::lane::{ControlChar, LaneWord, LANE_WORD_OCTETS};
use crate::settings::JesdSettings;

/// One octet of the flattened ILAS table plus its control-bit flag.
type TableOctet = (u8, bool);

fn build_table(settings: &JesdSettings, lid: u32, with_counter: bool) -> JesdResult<Vec<TableOctet>> {
    let cfg = settings.configuration_octets(lid)?;
    let octets_per_multiframe = settings.octets_per_lane() * settings.k;
    let total = (octets_per_multiframe * 4) as usize;
    let mut table = Vec::with_capacity(total);

    for mf in 0..4u32 {
        for j in 0..octets_per_multiframe {
            let idx = mf * octets_per_multiframe + j;
            let entry = if j == 0 {
                (ControlChar::R.as_octet(), true)
            } else if j == octets_per_multiframe - 1 {
                (ControlChar::A.as_octet(), true)
            } else if mf == 1 && j == 1 {
                (ControlChar::Q.as_octet(), true)
            } else if mf == 1 && (2..16).contains(&j) {
                (cfg[(j - 2) as usize], false)
            } else if with_counter {
                ((idx % 256) as u8, false)
            } else {
                (0, false)
            };
            table.push(entry);
        }
    }
    Ok(table)
}

fn pack_words(table: &[TableOctet]) -> Vec<LaneWord> {
    table
        .chunks(LANE_WORD_OCTETS)
        .map(|chunk| {
            let mut word = LaneWord::default();
            for (i, &(octet, ctrl)) in chunk.iter().enumerate() {
                word.set_octet(i, octet);
                word.set_ctrl(i, ctrl);
            }
            word
        })
        .collect()
}

/// Result of one [`IlasGenerator::step`] call.
#[derive(Debug, Clone, Copy)]
pub struct IlasOutput {
    pub word: LaneWord,
    /// Set on the final word of the sequence.
    pub last: bool,
    /// Stays set once the final word has been emitted.
    pub done: bool,
}

/// Streams the 4-multiframe ILAS table, holding on the final word once done.
#[derive(Debug, Clone)]
pub struct IlasGenerator {
    words: Vec<LaneWord>,
    index: usize,
    done: bool,
}

impl IlasGenerator {
    pub fn new(settings: &JesdSettings, lid: u32, with_counter: bool) -> JesdResult<Self> {
        let table = build_table(settings, lid, with_counter)?;
        Ok(IlasGenerator {
            words: pack_words(&table),
            index: 0,
            done: false,
        })
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.done = false;
    }

    pub fn step(&mut self) -> IlasOutput {
        let last_index = self.words.len() - 1;
        let word = self.words[self.index];
        let is_last = self.index == last_index;
        if is_last {
            self.done = true;
        } else {
            self.index += 1;
        }
        IlasOutput {
            word,
            last: is_last,
            done: self.done,
        }
    }
}

/// Result of one [`IlasChecker::step`] call.
#[derive(Debug, Clone, Copy)]
pub struct IlasCheckResult {
    pub valid: bool,
    pub done: bool,
}

/// Compares an incoming [`LaneWord`] stream against the expected ILAS table.
#[derive(Debug, Clone)]
pub struct IlasChecker {
    words: Vec<LaneWord>,
    index: usize,
    done: bool,
}

impl IlasChecker {
    pub fn new(settings: &JesdSettings, lid: u32, with_counter: bool) -> JesdResult<Self> {
        let table = build_table(settings, lid, with_counter)?;
        Ok(IlasChecker {
            words: pack_words(&table),
            index: 0,
            done: false,
        })
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.done = false;
    }

    pub fn step(&mut self, word: LaneWord) -> IlasCheckResult {
        let last_index = self.words.len() - 1;
        let expected = self.words[self.index];
        let valid = word.data == expected.data && word.ctrl == expected.ctrl;
        let is_last = self.index == last_index;
        if is_last {
            self.done = true;
        } else {
            self.index += 1;
        }
        IlasCheckResult {
            valid,
            done: self.done,
        }
    }
}
