// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Utility modules
//!
//! Terminal output helpers for the tractify CLI.

pub mod progress;
pub mod report;

pub use progress::*;
pub use report::*;
