// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::align::AlignInserter;
use crate::cgs::CgsGenerator;
use crate::error::JesdResult;
use crate::framer::Framer;
use crate::ilas::IlasGenerator;
use crate::lane::LaneWord;
use crate::scrambler::Scrambler;
use crate::settings::JesdSettings;

use super::JSYNC_GUARD_CYCLES;

/// Link TX FSM states (cf. spec §4.12).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    SendCgs,
    SendIlas,
    SendData,
}

/// One cycle's output from [`LinkTx::step`].
#[derive(Debug, Clone, Copy)]
pub struct LinkTxOutput {
    pub word: LaneWord,
    /// Set only in `SendData`.
    pub ready: bool,
}

/// Drives one lane's TX datapath through bring-up and steady-state framing.
#[derive(Debug, Clone)]
pub struct LinkTx {
    state: TxState,
    cgs: CgsGenerator,
    ilas: IlasGenerator,
    scrambler: Scrambler,
    framer: Framer,
    align_inserter: AlignInserter,
    jsync_low_cycles: u32,
}

impl LinkTx {
    pub fn new(settings: &JesdSettings, lid: u32) -> JesdResult<Self> {
        Ok(LinkTx {
            state: TxState::SendCgs,
            cgs: CgsGenerator::new(),
            ilas: IlasGenerator::new(settings, lid, true)?,
            scrambler: Scrambler::new(),
            framer: Framer::new(settings.octets_per_frame(), settings.k)?,
            align_inserter: AlignInserter::new(),
            jsync_low_cycles: 0,
        })
    }

    pub const fn state(&self) -> TxState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = TxState::SendCgs;
        self.ilas.reset();
        self.scrambler.reset();
        self.framer.reset();
        self.jsync_low_cycles = 0;
    }

    /// `data` is the next raw (pre-scramble) octet word from the transport
    /// mapper for this lane; ignored outside `SendData`.
    pub fn step(&mut self, reset: bool, jsync: bool, lmfc_zero: bool, data: u32) -> LinkTxOutput {
        if reset {
            self.reset();
        }

        match self.state {
            TxState::SendCgs => {
                let word = self.cgs.step();
                if jsync && lmfc_zero {
                    self.state = TxState::SendIlas;
                    self.ilas.reset();
                    self.framer.reset();
                }
                LinkTxOutput { word, ready: false }
            }
            TxState::SendIlas => {
                // Held in reset throughout ILAS so the first data frame
                // after ILAS starts from a fresh multiframe boundary.
                self.framer.reset();
                let out = self.ilas.step();
                if out.last {
                    self.state = TxState::SendData;
                    self.jsync_low_cycles = 0;
                }
                LinkTxOutput {
                    word: out.word,
                    ready: false,
                }
            }
            TxState::SendData => {
                let scrambled = self.scrambler.step(data);
                let framed = self.framer.step(scrambled.data);
                let word = self.align_inserter.step(framed);

                if jsync {
                    self.jsync_low_cycles = 0;
                } else {
                    self.jsync_low_cycles += 1;
                }
                if self.jsync_low_cycles > JSYNC_GUARD_CYCLES {
                    log::warn!("link tx: jsync deasserted beyond guard, returning to SEND-CGS");
                    self.state = TxState::SendCgs;
                    self.jsync_low_cycles = 0;
                }

                LinkTxOutput { word, ready: true }
            }
        }
    }
}
