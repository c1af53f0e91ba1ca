// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Page acquisition.
//!
//! Plain HTTP for static sources, the channel feed and the central bank's
//! reference rate; the headless browser for rendered sources.

pub mod channel;
pub mod http_client;
pub mod reference;
pub mod rendered;

pub use http_client::HttpClient;
pub use rendered::fetch_rendered;
