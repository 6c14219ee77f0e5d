// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::aligner::Aligner;
use crate::error::JesdResult;
use crate::lane::LaneWord;
use crate::link::LinkRx;
use crate::lmfc::Lmfc;
use crate::settings::JesdSettings;
use crate::transport::TransportRx;

use super::skew_fifo::SkewFifo;

/// One cycle's aggregate output from [`CoreRx::step`].
#[derive(Debug, Clone)]
pub struct CoreRxOutput {
    pub jsync: bool,
    pub ready: bool,
    /// A reconstructed converter sample bundle, present only once every
    /// lane's skew FIFO has accumulated a full transport cycle's worth of
    /// words and the aggregate `ready` held at an LMFC-zero boundary.
    pub samples: Option<Vec<Vec<u32>>>,
}

/// RX orchestrator (cf. spec §4.14): per-lane Aligner + Link RX FSM, skew
/// FIFOs absorbing inter-lane latency, and the transport mapper's inverse.
#[derive(Debug, Clone)]
pub struct CoreRx {
    transport: TransportRx,
    aligners: Vec<Aligner>,
    lanes: Vec<LinkRx>,
    fifos: Vec<SkewFifo>,
    lmfc: Lmfc,
    prev_align: Vec<bool>,
    words_per_cycle: usize,
}

impl CoreRx {
    pub fn new(settings: &JesdSettings, converter_data_width: u32) -> JesdResult<Self> {
        let transport = TransportRx::new(settings, converter_data_width)?;
        let l = settings.l as usize;
        let lanes = (0..settings.l)
            .map(|lid| LinkRx::new(settings, lid))
            .collect::<JesdResult<Vec<_>>>()?;
        let fifo_depth = (settings.lmfc_cycles() as usize).max(1) * 2;
        Ok(CoreRx {
            words_per_cycle: transport.words_per_cycle() as usize,
            transport,
            aligners: vec![Aligner::new(); l],
            lanes,
            fifos: (0..l).map(|_| SkewFifo::new(fifo_depth)).collect(),
            lmfc: Lmfc::new(settings.lmfc_cycles(), 0),
            prev_align: vec![true; l],
        })
    }

    pub fn reset(&mut self) {
        for aligner in &mut self.aligners {
            aligner.reset();
        }
        for lane in &mut self.lanes {
            lane.reset();
        }
        for fifo in &mut self.fifos {
            fifo.reset();
        }
        self.lmfc.reset();
        self.prev_align.iter_mut().for_each(|a| *a = true);
    }

    /// One D-octet-wide cycle: `raw_lanes[i]` is lane `i`'s word straight
    /// from the PHY, pre-alignment.
    pub fn step_word(&mut self, reset: bool, jref: bool, raw_lanes: &[LaneWord]) -> CoreRxOutput {
        if reset {
            self.reset();
        }

        let lmfc_zero = self.lmfc.step(jref);
        let mut jsync = true;
        let mut ready = true;
        let mut lane_data = Vec::with_capacity(self.lanes.len());

        for i in 0..self.lanes.len() {
            let aligned = self.aligners[i].step(raw_lanes[i], self.prev_align[i]);
            let out = self.lanes[i].step(reset, lmfc_zero, aligned);
            self.prev_align[i] = out.align;
            jsync &= out.jsync;
            ready &= out.ready;
            if out.ready {
                self.fifos[i].push(out.data);
            } else {
                self.fifos[i].reset();
            }
            lane_data.push(out.data);
        }

        let samples = if ready && lmfc_zero && self.fifos.iter().all(|f| f.len() >= self.words_per_cycle) {
            let lanes: Vec<Vec<LaneWord>> = self
                .fifos
                .iter_mut()
                .map(|fifo| {
                    (0..self.words_per_cycle)
                        .map(|_| {
                            let mut word = LaneWord::default();
                            word.data = fifo.pop().expect("checked len above");
                            word
                        })
                        .collect()
                })
                .collect();
            Some(self.transport.step(&lanes))
        } else {
            None
        };

        CoreRxOutput { jsync, ready, samples }
    }
}
