// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::cgs::CgsChecker;
use crate::error::JesdResult;
use crate::framer::Deframer;
use crate::ilas::IlasChecker;
use crate::lane::{ControlChar, LaneWord};
use crate::scrambler::Descrambler;
use crate::settings::JesdSettings;

/// Link RX FSM states (cf. spec §4.13).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    ReceiveCgs,
    AssertSync,
    ReceiveIlas,
    ReceiveData,
}

/// One cycle's output from [`LinkRx::step`].
#[derive(Debug, Clone, Copy)]
pub struct LinkRxOutput {
    pub data: u32,
    /// To the converter.
    pub jsync: bool,
    pub ready: bool,
    /// Enables the upstream Aligner's "R"-detection this cycle.
    pub align: bool,
}

/// Drives one lane's RX datapath from CGS acquisition through steady-state
/// data reception.
#[derive(Debug, Clone)]
pub struct LinkRx {
    state: RxState,
    cgs: CgsChecker,
    ilas: IlasChecker,
    deframer: Deframer,
    descrambler: Descrambler,
    ilas_check: bool,
}

impl LinkRx {
    pub fn new(settings: &JesdSettings, lid: u32) -> JesdResult<Self> {
        Self::with_ilas_check(settings, lid, true)
    }

    /// `ilas_check = false` disables the ILAS-mismatch → RECEIVE-CGS
    /// transition, useful for bring-up against a non-compliant transmitter
    /// under test.
    pub fn with_ilas_check(settings: &JesdSettings, lid: u32, ilas_check: bool) -> JesdResult<Self> {
        Ok(LinkRx {
            state: RxState::ReceiveCgs,
            cgs: CgsChecker::new(),
            ilas: IlasChecker::new(settings, lid, true)?,
            deframer: Deframer::new(settings.octets_per_frame(), settings.k)?,
            descrambler: Descrambler::new(),
            ilas_check,
        })
    }

    pub const fn state(&self) -> RxState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = RxState::ReceiveCgs;
        self.ilas.reset();
        self.deframer.reset();
        self.descrambler.reset();
    }

    /// `word` is the aligned LaneWord for this cycle (already passed through
    /// the upstream Aligner this same cycle, gated by the `align` this
    /// method returned on the *previous* call).
    pub fn step(&mut self, reset: bool, lmfc_zero: bool, word: LaneWord) -> LinkRxOutput {
        if reset {
            self.reset();
        }

        match self.state {
            RxState::ReceiveCgs => {
                let cgs_valid = self.cgs.step(word);
                if cgs_valid && lmfc_zero {
                    self.state = RxState::AssertSync;
                    self.ilas.reset();
                    self.deframer.reset();
                    self.descrambler.reset();
                }
                LinkRxOutput {
                    data: 0,
                    jsync: false,
                    ready: false,
                    align: true,
                }
            }
            RxState::AssertSync => {
                let ilas_start = word.is_ctrl(0)
                    && word.octet(0) == ControlChar::R.as_octet()
                    && !word.is_ctrl(1)
                    && !word.is_ctrl(2)
                    && !word.is_ctrl(3);
                if ilas_start {
                    log::debug!("link rx: ILAS start pattern detected, entering RECEIVE-ILAS");
                    self.state = RxState::ReceiveIlas;
                    // The detected word IS the ILAS sequence's first word;
                    // feed it to the checker this same cycle rather than
                    // waiting for the next one.
                    let check = self.ilas.step(word);
                    if check.done {
                        self.state = RxState::ReceiveData;
                    } else if self.ilas_check && !check.valid {
                        self.state = RxState::ReceiveCgs;
                    }
                }
                LinkRxOutput {
                    data: 0,
                    jsync: true,
                    ready: false,
                    align: false,
                }
            }
            RxState::ReceiveIlas => {
                let check = self.ilas.step(word);
                if check.done {
                    self.state = RxState::ReceiveData;
                } else if self.ilas_check && !check.valid {
                    log::warn!("link rx: ILAS mismatch, returning to RECEIVE-CGS");
                    self.state = RxState::ReceiveCgs;
                }
                LinkRxOutput {
                    data: 0,
                    jsync: true,
                    ready: false,
                    align: false,
                }
            }
            RxState::ReceiveData => {
                let cgs_valid = self.cgs.step(word);
                let deframed = self.deframer.step(word);
                let descrambled = self.descrambler.step(deframed);
                if cgs_valid {
                    self.state = RxState::ReceiveCgs;
                }
                LinkRxOutput {
                    data: descrambled.data,
                    jsync: true,
                    ready: true,
                    align: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgs::CgsGenerator;
    use crate::ilas::IlasGenerator;
    use crate::settings::JesdSettingsParams;

    fn settings() -> JesdSettings {
        JesdSettings::new(JesdSettingsParams {
            l: 4,
            m: 4,
            f: 2,
            s: 1,
            n: 16,
            np: 16,
            k: 16,
            cs: 1,
            did: 0x5A,
            bid: 0x5,
        })
        .unwrap()
    }

    #[test]
    fn starts_in_receive_cgs_with_align_enabled() {
        let s = settings();
        let mut rx = LinkRx::new(&s, 0).unwrap();
        let cgs_gen = CgsGenerator::new();
        let out = rx.step(false, false, cgs_gen.step());
        assert_eq!(rx.state(), RxState::ReceiveCgs);
        assert!(out.align);
        assert!(!out.jsync);
    }

    #[test]
    fn locks_through_cgs_assert_sync_ilas_to_data() {
        let s = settings();
        let mut rx = LinkRx::new(&s, 0).unwrap();
        let mut ilas = IlasGenerator::new(&s, 0, true).unwrap();
        let cgs_word = CgsGenerator::new().step();

        rx.step(false, true, cgs_word);
        assert_eq!(rx.state(), RxState::AssertSync);

        loop {
            let out = ilas.step();
            rx.step(false, false, out.word);
            if out.last {
                break;
            }
        }
        assert_eq!(rx.state(), RxState::ReceiveData);
    }

    #[test]
    fn ilas_mismatch_returns_to_receive_cgs() {
        let s = settings();
        let mut rx = LinkRx::new(&s, 0).unwrap();
        let mut ilas = IlasGenerator::new(&s, 0, true).unwrap();
        let cgs_word = CgsGenerator::new().step();
        rx.step(false, true, cgs_word);

        // Feed the genuine first ILAS word to move AssertSync -> ReceiveIlas.
        rx.step(false, false, ilas.step().word);
        assert_eq!(rx.state(), RxState::ReceiveIlas);

        let mut second = ilas.step().word;
        // Corrupt a ramp octet.
        second.set_octet(1, second.octet(1) ^ 0xFF);
        rx.step(false, false, second);
        assert_eq!(rx.state(), RxState::ReceiveCgs);
    }

    #[test]
    fn cgs_reappearing_during_data_returns_to_receive_cgs() {
        let s = settings();
        let mut rx = LinkRx::new(&s, 0).unwrap();
        let mut ilas = IlasGenerator::new(&s, 0, true).unwrap();
        let cgs_word = CgsGenerator::new().step();
        rx.step(false, true, cgs_word);
        loop {
            let out = ilas.step();
            rx.step(false, false, out.word);
            if out.last {
                break;
            }
        }
        assert_eq!(rx.state(), RxState::ReceiveData);

        rx.step(false, false, CgsGenerator::new().step());
        assert_eq!(rx.state(), RxState::ReceiveCgs);
    }

    #[test]
    fn reset_returns_to_receive_cgs() {
        let s = settings();
        let mut rx = LinkRx::new(&s, 0).unwrap();
        let cgs_word = CgsGenerator::new().step();
        rx.step(false, true, cgs_word);
        assert_eq!(rx.state(), RxState::AssertSync);
        rx.step(true, false, LaneWord::default());
        assert_eq!(rx.state(), RxState::ReceiveCgs);
    }
}
