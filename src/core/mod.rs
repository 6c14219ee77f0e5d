// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Core TX/RX orchestrators (cf. spec §4.14): the top-level objects a
//! caller actually drives one cycle at a time.

mod rx;
mod tx;
mod skew_fifo;

pub use rx::{CoreRx, CoreRxOutput};
pub use tx::{CoreTx, CoreTxOutput};
