// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! kurs runtime: page acquisition, cycle scheduling, persistence, the HTTP
//! API and the CLI around `kurs-core`.
//!
//! This library crate exposes the modules to the binary and to the
//! integration tests.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod renderer;
pub mod rest;
pub mod scheduler;
pub mod scrape;
pub mod store;
