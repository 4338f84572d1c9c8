// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Geometry helpers for diffusion gradient directions

mod gradients;
mod hemisphere;

pub use gradients::{GradientTable, DEFAULT_B0_THRESHOLD};
pub use hemisphere::{is_hemispherical, Hemisphere, Vec3, UNIT_NORM_TOLERANCE};
