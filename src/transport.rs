// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport mapper TX/RX (cf. spec §4.8/§4.9): bit-exact interleaving
//! between converter sample bundles and per-lane octet streams.
//!
//! Both directions are purely combinational over one "transport cycle" (a
//! bundle of `samples_per_cycle` samples per converter) — no carried state,
//! so both `step` methods take `&self`.
//!
//! Nibble packing, worked example (`np = 16`, so `nibbles_per_word = 4`,
//! nibbles emitted MSB-first as `n0 n1 n2 n3`): nibbles are paired up within
//! a converter's flattened per-frame nibble stream as `(n0, n1)`, `(n2,
//! n3)`, …, and each pair packs as `octet = (first << 4) | second` — the
//! *first*-emitted (more-significant) nibble of the pair lands in the
//! octet's upper four bits.

use crate::error::{JesdError, JesdResult};
use crate::lane::{LaneWord, LANE_WORD_OCTETS};
use crate::settings::JesdSettings;

const D: u32 = LANE_WORD_OCTETS as u32;

#[derive(Debug, Clone, Copy)]
struct Geometry {
    l: u32,
    m: u32,
    s: u32,
    n: u32,
    np: u32,
    nibbles_per_word: u32,
    octets_per_frame: u32,
    octets_per_lane: u32,
    samples_per_cycle: u32,
    frames_per_cycle: u32,
    octets_per_cycle: u32,
    words_per_cycle: u32,
}

fn geometry(settings: &JesdSettings, converter_data_width: u32) -> JesdResult<Geometry> {
    if converter_data_width % settings.n != 0 {
        return Err(JesdError::InvalidGeometry(format!(
            "converter_data_width={converter_data_width} is not a multiple of n={}",
            settings.n
        )));
    }
    let samples_per_cycle = converter_data_width / settings.n;
    if samples_per_cycle % settings.s != 0 {
        return Err(JesdError::InvalidGeometry(format!(
            "samples_per_cycle={samples_per_cycle} is not a multiple of s={}",
            settings.s
        )));
    }
    let frames_per_cycle = samples_per_cycle / settings.s;

    let octets_numer = (samples_per_cycle as u64) * (settings.np as u64) * (settings.m as u64);
    if octets_numer % ((settings.l as u64) * 8) != 0 {
        return Err(JesdError::InvalidGeometry(
            "octets_per_cycle = samples_per_cycle*np*m/(l*8) is non-integral".into(),
        ));
    }
    let octets_per_cycle = (octets_numer / ((settings.l as u64) * 8)) as u32;
    if octets_per_cycle % D != 0 {
        return Err(JesdError::InvalidGeometry(format!(
            "octets_per_cycle={octets_per_cycle} is not a multiple of the {D}-octet lane word"
        )));
    }

    Ok(Geometry {
        l: settings.l,
        m: settings.m,
        s: settings.s,
        n: settings.n,
        np: settings.np,
        nibbles_per_word: settings.nibbles_per_word(),
        octets_per_frame: settings.octets_per_frame(),
        octets_per_lane: settings.octets_per_lane(),
        samples_per_cycle,
        frames_per_cycle,
        octets_per_cycle,
        words_per_cycle: octets_per_cycle / D,
    })
}

fn sample_to_nibbles(sample: u32, n: u32, np: u32, nibbles_per_word: u32) -> Vec<u8> {
    let mask_n = if n == 32 { u32::MAX } else { (1u32 << n) - 1 };
    let word = (sample & mask_n) << (np - n);
    (0..nibbles_per_word)
        .map(|knt| {
            let shift = np - 4 * (knt + 1);
            ((word >> shift) & 0xF) as u8
        })
        .collect()
}

fn nibbles_to_sample(nibbles: &[u8], n: u32, np: u32) -> u32 {
    let mut word = 0u32;
    for (knt, &nibble) in nibbles.iter().enumerate() {
        let shift = np - 4 * (knt as u32 + 1);
        word |= (nibble as u32) << shift;
    }
    let mask_n = if n == 32 { u32::MAX } else { (1u32 << n) - 1 };
    (word >> (np - n)) & mask_n
}

fn pack_nibble_pairs(nibbles: &[u8]) -> Vec<u8> {
    nibbles
        .chunks(2)
        .map(|pair| {
            let first = pair[0];
            let second = if pair.len() > 1 { pair[1] } else { 0 };
            (first << 4) | second
        })
        .collect()
}

fn unpack_nibble_pairs(octets: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(octets.len() * 2);
    for &octet in octets {
        nibbles.push((octet >> 4) & 0xF);
        nibbles.push(octet & 0xF);
    }
    nibbles
}

/// TX side of the transport mapper: converter sample bundles → per-lane
/// octet (lane word) streams.
#[derive(Debug, Clone)]
pub struct TransportTx {
    geometry: Geometry,
}

impl TransportTx {
    /// `converter_data_width` must be a multiple of `settings.n`, and the
    /// resulting per-cycle geometry must divide evenly into frames, octets,
    /// and `LANE_WORD_OCTETS`-wide lane words.
    pub fn new(settings: &JesdSettings, converter_data_width: u32) -> JesdResult<Self> {
        Ok(TransportTx {
            geometry: geometry(settings, converter_data_width)?,
        })
    }

    /// Samples per converter consumed by one [`Self::step`] call.
    pub const fn samples_per_cycle(&self) -> u32 {
        self.geometry.samples_per_cycle
    }

    /// Lane words produced per lane by one [`Self::step`] call.
    pub const fn words_per_cycle(&self) -> u32 {
        self.geometry.words_per_cycle
    }

    /// `input[conv]` holds exactly `samples_per_cycle()` samples (only the
    /// low `n` bits of each are significant). Returns `l` per-lane vectors
    /// of `words_per_cycle()` lane words each.
    pub fn step(&self, input: &[Vec<u32>]) -> Vec<Vec<LaneWord>> {
        let g = &self.geometry;
        debug_assert_eq!(input.len(), g.m as usize);

        let mut lane_octets: Vec<Vec<u8>> = vec![Vec::with_capacity(g.octets_per_cycle as usize); g.l as usize];

        for fr in 0..g.frames_per_cycle {
            let mut frame_octets = Vec::with_capacity((g.octets_per_frame * g.m) as usize);
            for conv in 0..g.m {
                let mut nibbles = Vec::with_capacity((g.s * g.nibbles_per_word) as usize);
                for samp in 0..g.s {
                    let idx = (fr * g.s + samp) as usize;
                    let sample = input[conv as usize][idx];
                    nibbles.extend(sample_to_nibbles(sample, g.n, g.np, g.nibbles_per_word));
                }
                frame_octets.extend(pack_nibble_pairs(&nibbles));
            }
            for lane in 0..g.l {
                let start = (lane * g.octets_per_lane) as usize;
                let end = start + g.octets_per_lane as usize;
                lane_octets[lane as usize].extend_from_slice(&frame_octets[start..end]);
            }
        }

        lane_octets
            .into_iter()
            .map(|octets| {
                octets
                    .chunks(LANE_WORD_OCTETS)
                    .map(|chunk| {
                        let mut word = LaneWord::default();
                        for (i, &octet) in chunk.iter().enumerate() {
                            word.set_octet(i, octet);
                        }
                        word
                    })
                    .collect()
            })
            .collect()
    }
}

/// RX side of the transport mapper: exact inverse of [`TransportTx`].
#[derive(Debug, Clone)]
pub struct TransportRx {
    geometry: Geometry,
}

impl TransportRx {
    pub fn new(settings: &JesdSettings, converter_data_width: u32) -> JesdResult<Self> {
        Ok(TransportRx {
            geometry: geometry(settings, converter_data_width)?,
        })
    }

    pub const fn samples_per_cycle(&self) -> u32 {
        self.geometry.samples_per_cycle
    }

    pub const fn words_per_cycle(&self) -> u32 {
        self.geometry.words_per_cycle
    }

    /// `lanes[i]` holds exactly `words_per_cycle()` lane words for lane `i`.
    /// Returns `m` per-converter vectors of `samples_per_cycle()` samples.
    pub fn step(&self, lanes: &[Vec<LaneWord>]) -> Vec<Vec<u32>> {
        let g = &self.geometry;
        debug_assert_eq!(lanes.len(), g.l as usize);

        let lane_octets: Vec<Vec<u8>> = lanes
            .iter()
            .map(|words| {
                let mut octets = Vec::with_capacity(g.octets_per_cycle as usize);
                for word in words {
                    for i in 0..LANE_WORD_OCTETS {
                        octets.push(word.octet(i));
                    }
                }
                octets
            })
            .collect();

        let mut out: Vec<Vec<u32>> = vec![vec![0u32; g.samples_per_cycle as usize]; g.m as usize];

        for fr in 0..g.frames_per_cycle {
            let mut frame_octets = Vec::with_capacity((g.octets_per_frame * g.m) as usize);
            for lane in 0..g.l {
                let start = (fr * g.octets_per_lane) as usize;
                let end = start + g.octets_per_lane as usize;
                frame_octets.extend_from_slice(&lane_octets[lane as usize][start..end]);
            }

            for conv in 0..g.m {
                let start = (conv * g.octets_per_frame) as usize;
                let end = start + g.octets_per_frame as usize;
                let nibbles = unpack_nibble_pairs(&frame_octets[start..end]);
                for samp in 0..g.s {
                    let nib_start = (samp * g.nibbles_per_word) as usize;
                    let nib_end = nib_start + g.nibbles_per_word as usize;
                    let sample = nibbles_to_sample(&nibbles[nib_start..nib_end], g.n, g.np);
                    let idx = (fr * g.s + samp) as usize;
                    out[conv as usize][idx] = sample;
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::JesdSettingsParams;

    fn scenario_1_settings() -> JesdSettings {
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
    fn scenario_1_round_trip() {
        let settings = scenario_1_settings();
        let tx = TransportTx::new(&settings, 64).unwrap();
        let rx = TransportRx::new(&settings, 64).unwrap();
        assert_eq!(tx.samples_per_cycle(), 4);
        assert_eq!(tx.words_per_cycle(), 2);

        // converter c samples [c*256+0 .. c*256+15], fed 4 at a time.
        let full: Vec<Vec<u32>> = (0..4u32)
            .map(|c| (0..16u32).map(|i| c * 256 + i).collect())
            .collect();

        for chunk_idx in 0..4 {
            let input: Vec<Vec<u32>> = full
                .iter()
                .map(|samples| samples[chunk_idx * 4..chunk_idx * 4 + 4].to_vec())
                .collect();
            let lanes = tx.step(&input);
            assert_eq!(lanes.len(), 4);
            for lane in &lanes {
                assert_eq!(lane.len(), 2);
            }
            let recovered = rx.step(&lanes);
            assert_eq!(recovered, input);
        }
    }

    #[test]
    fn round_trip_is_exact_for_random_samples() {
        fastrand::seed(7);
        let settings = scenario_1_settings();
        let tx = TransportTx::new(&settings, 64).unwrap();
        let rx = TransportRx::new(&settings, 64).unwrap();

        for _ in 0..64 {
            let input: Vec<Vec<u32>> = (0..4)
                .map(|_| (0..4).map(|_| fastrand::u32(..) & 0xFFFF).collect())
                .collect();
            let lanes = tx.step(&input);
            let recovered = rx.step(&lanes);
            assert_eq!(recovered, input);
        }
    }

    #[test]
    fn nibble_pairs_pack_first_nibble_into_high_bits() {
        // sample 0xAB -> nibbles [0xA, 0xB] (MSB-first) -> octet must
        // reproduce the original byte: the first/more-significant nibble
        // of the pair occupies the upper four bits.
        assert_eq!(pack_nibble_pairs(&[0xA, 0xB]), vec![0xAB]);
        assert_eq!(unpack_nibble_pairs(&[0xAB]), vec![0xA, 0xB]);
    }

    fn scenario_s_gt_1_settings() -> JesdSettings {
        JesdSettings::new(JesdSettingsParams {
            l: 2,
            m: 2,
            f: 2,
            s: 2,
            n: 8,
            np: 8,
            k: 16,
            cs: 0,
            did: 0x11,
            bid: 0x2,
        })
        .unwrap()
    }

    #[test]
    fn round_trip_with_multiple_samples_per_frame() {
        // s=2 exercises the "s consecutive samples per converter per frame"
        // partitioning (spec §4.8 steps 1-2), which s=1 collapses to a
        // single-iteration no-op and so never exercises.
        fastrand::seed(11);
        let settings = scenario_s_gt_1_settings();
        let tx = TransportTx::new(&settings, 32).unwrap();
        let rx = TransportRx::new(&settings, 32).unwrap();
        assert_eq!(tx.samples_per_cycle(), 4);
        assert_eq!(settings.s, 2);

        for _ in 0..64 {
            let input: Vec<Vec<u32>> = (0..2)
                .map(|_| (0..4).map(|_| fastrand::u32(..) & 0xFF).collect())
                .collect();
            let lanes = tx.step(&input);
            let recovered = rx.step(&lanes);
            assert_eq!(recovered, input);
        }
    }

    #[test]
    fn rejects_non_multiple_converter_data_width() {
        let settings = scenario_1_settings();
        assert!(TransportTx::new(&settings, 17).is_err());
    }

    #[test]
    fn multiple_frames_per_cycle_when_s_less_than_samples_per_cycle() {
        let settings = scenario_1_settings();
        let tx = TransportTx::new(&settings, 64).unwrap();
        assert_eq!(tx.geometry.frames_per_cycle, 4);
    }
}
