// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! # kurs-core
//!
//! Turns arbitrary bank web pages into plausible USD buy/sell pairs and
//! reconciles them into one snapshot.
//!
//! This crate holds everything that does not touch the network or a
//! browser: the source registry, the rate normalizer, the extraction
//! strategy chain, the channel post parser and alias table, field-level
//! reconciliation and snapshot assembly.
//!
//! ```
//! use kurs_core::{extract, RateBand, SourceDescriptor};
//!
//! let band = RateBand::new(12_000, 13_200).unwrap();
//! let src = SourceDescriptor::fetched("Example Bank", "https://bank.example/");
//! let html = "<table><tr><th>Валюта</th><th>Покупка</th><th>Продажа</th></tr>\
//!             <tr><td>USD</td><td>12 140</td><td>12 260</td></tr></table>";
//! let raw = extract::extract_static(&src, html, &band);
//! assert_eq!((raw.buy, raw.sell), (Some(12_140), Some(12_260)));
//! ```

pub mod channel;
pub mod extract;
pub mod normalize;
pub mod reconcile;
pub mod registry;
pub mod snapshot;
pub mod types;

pub use channel::{AliasTable, ChannelQuotes};
pub use normalize::{NumberStyle, RateBand};
pub use registry::{default_registry, Registry};
pub use snapshot::{Counts, Snapshot};
pub use types::*;
