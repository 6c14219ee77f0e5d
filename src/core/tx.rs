// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::error::JesdResult;
use crate::lane::LaneWord;
use crate::link::LinkTx;
use crate::lmfc::Lmfc;
use crate::settings::JesdSettings;
use crate::stpl::StplGenerator;
use crate::transport::TransportTx;

/// One transport cycle's per-lane output plus the registered aggregate
/// `ready`. `lanes[i]` holds every sub-word [`LinkTx`] produced for lane `i`
/// this cycle, in emission order — a PHY passthrough must drive all of them,
/// not just the last.
#[derive(Debug, Clone)]
pub struct CoreTxOutput {
    pub lanes: Vec<Vec<LaneWord>>,
    /// AND over all lanes' `ready`, registered one cycle (cf. spec §4.14):
    /// reflects lane state as of the call *before* this one, not this one.
    pub ready: bool,
}

/// TX orchestrator (cf. spec §4.14): fans one M-converter sample bundle out
/// through the transport mapper and L per-lane Link TX FSMs.
///
/// The sample source is chosen per call via [`Self::step_with_samples`] or
/// [`Self::step_stpl`] rather than a toggle plus an `Option` argument, so no
/// call shape can fail at runtime: each method's parameters supply
/// everything it needs.
#[derive(Debug, Clone)]
pub struct CoreTx {
    transport: TransportTx,
    lanes: Vec<LinkTx>,
    lmfc: Lmfc,
    stpl: StplGenerator,
    ready: bool,
}

impl CoreTx {
    pub fn new(settings: &JesdSettings, converter_data_width: u32) -> JesdResult<Self> {
        let transport = TransportTx::new(settings, converter_data_width)?;
        let lanes = (0..settings.l)
            .map(|lid| LinkTx::new(settings, lid))
            .collect::<JesdResult<Vec<_>>>()?;
        let lmfc = Lmfc::new(settings.lmfc_cycles(), 0);
        let stpl = StplGenerator::new(settings.m, settings.s, transport.samples_per_cycle(), true);
        Ok(CoreTx {
            transport,
            lanes,
            lmfc,
            stpl,
            ready: false,
        })
    }

    pub fn reset(&mut self) {
        for lane in &mut self.lanes {
            lane.reset();
        }
        self.lmfc.reset();
        self.ready = false;
    }

    /// Samples consumed by [`Self::step_with_samples`] per call.
    pub fn samples_per_cycle(&self) -> u32 {
        self.transport.samples_per_cycle()
    }

    /// One full "transport cycle" driven by caller-supplied sample bundles,
    /// shaped `[m][samples_per_cycle]`.
    pub fn step_with_samples(&mut self, reset: bool, jsync: bool, jref: bool, samples: &[Vec<u32>]) -> CoreTxOutput {
        self.step_inner(reset, jsync, jref, samples.to_vec())
    }

    /// One full "transport cycle" driven by the internal STPL generator
    /// instead of caller-supplied samples (cf. spec §4.13, board bring-up).
    pub fn step_stpl(&mut self, reset: bool, jsync: bool, jref: bool) -> CoreTxOutput {
        let bundle = self.stpl.step();
        self.step_inner(reset, jsync, jref, bundle)
    }

    /// Advances the LMFC and every lane FSM once per lane word produced by
    /// the transport mapper for this bundle (`jsync`/`jref` are held
    /// constant across that sub-sequence).
    fn step_inner(&mut self, reset: bool, jsync: bool, jref: bool, bundle: Vec<Vec<u32>>) -> CoreTxOutput {
        if reset {
            self.reset();
        }

        // `ready` is registered one cycle: this call reports the AND
        // latched by the *previous* call, then latches a fresh one for the
        // next.
        let registered_ready = self.ready;

        let lane_words = self.transport.step(&bundle);
        let words_per_cycle = lane_words.first().map_or(0, Vec::len);

        let mut lane_out = vec![Vec::with_capacity(words_per_cycle); self.lanes.len()];
        let mut ready = true;
        for w in 0..words_per_cycle {
            let lmfc_zero = self.lmfc.step(jref);
            ready = true;
            for (i, lane) in self.lanes.iter_mut().enumerate() {
                let data = lane_words[i][w].data;
                let out = lane.step(reset, jsync, lmfc_zero, data);
                lane_out[i].push(out.word);
                ready &= out.ready;
            }
        }
        self.ready = ready;

        CoreTxOutput {
            lanes: lane_out,
            ready: registered_ready,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn reaches_ready_after_bring_up() {
        let s = settings();
        let mut core = CoreTx::new(&s, 64).unwrap();

        // SEND-CGS until jsync && lmfc_zero; samples_per_cycle=4 so one
        // core step covers 4 LMFC cycles at a time. One extra iteration of
        // headroom covers the one-cycle `ready` registration delay.
        let mut ready = false;
        for _ in 0..65 {
            let out = core.step_stpl(false, true, false);
            if out.ready {
                ready = true;
                break;
            }
        }
        assert!(ready);
    }

    #[test]
    fn ready_is_registered_one_cycle_behind_the_lane_aggregate() {
        let s = settings();
        let mut core = CoreTx::new(&s, 64).unwrap();

        let mut combinational_first_true = None;
        let mut output_first_true = None;
        for i in 0..65 {
            let out = core.step_stpl(false, true, false);
            if combinational_first_true.is_none() && core.ready {
                combinational_first_true = Some(i);
            }
            if output_first_true.is_none() && out.ready {
                output_first_true = Some(i);
            }
        }
        let combinational_first_true = combinational_first_true.expect("lanes must assert ready eventually");
        let output_first_true = output_first_true.expect("registered ready must assert eventually");
        assert_eq!(output_first_true, combinational_first_true + 1);
    }
}
