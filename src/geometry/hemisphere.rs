// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Hemisphere membership test for unit-sphere directions
//!
//! Every ordered pair of input vectors contributes the normalized cross
//! product as a candidate vertex of the spherical polygon bounding the set.
//! The inputs fit in one hemisphere iff some candidate lies within 90° of
//! every input; the pole is the normalized mean of all such candidates.

use std::f64::consts::FRAC_PI_2;

use crate::errors::{TractifyError, TractifyResult};

/// Allowed deviation of an input norm from 1
pub const UNIT_NORM_TOLERANCE: f64 = 1e-5;

/// Slack on the 90° comparison so exactly orthogonal candidates qualify
const ANGLE_TOLERANCE: f64 = 1e-9;

/// Cross products shorter than this come from (anti)parallel pairs
const DEGENERATE_NORM: f64 = 1e-12;

/// A 3-vector
pub type Vec3 = [f64; 3];

/// Outcome of [`is_hemispherical`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hemisphere {
    /// Whether one hemisphere contains every input direction
    pub is_hemispherical: bool,
    /// Central pole of the inputs, or the zero vector
    pub pole: Vec3,
}

impl Hemisphere {
    fn none() -> Self {
        Self {
            is_hemispherical: false,
            pole: [0.0; 3],
        }
    }
}

/// Test whether all `vecs` lie in a common hemisphere.
///
/// Each vector must be 3-dimensional with unit norm (within
/// [`UNIT_NORM_TOLERANCE`]) and at least two vectors are required; otherwise
/// [`TractifyError::InvalidInput`] is returned.
///
/// Candidates come only from non-parallel pairs. A set whose directions are
/// all (anti)parallel, such as `{z, z}`, yields no candidate and is reported
/// as not hemispherical with a zero pole.
pub fn is_hemispherical<V: AsRef<[f64]>>(vecs: &[V]) -> TractifyResult<Hemisphere> {
    let vecs = validate(vecs)?;

    let mut qualifying: Vec<Vec3> = Vec::new();
    for (i, a) in vecs.iter().enumerate() {
        for (j, b) in vecs.iter().enumerate() {
            if i == j {
                continue;
            }
            let Some(candidate) = normalize(cross(a, b)) else {
                continue;
            };
            if vecs.iter().all(|v| angle(&candidate, v) <= FRAC_PI_2 + ANGLE_TOLERANCE) {
                qualifying.push(candidate);
            }
        }
    }

    let Some(first) = qualifying.first().copied() else {
        return Ok(Hemisphere::none());
    };

    let mut sum = [0.0; 3];
    for c in &qualifying {
        for k in 0..3 {
            sum[k] += c[k];
        }
    }
    let n = qualifying.len() as f64;
    let mean = [sum[0] / n, sum[1] / n, sum[2] / n];

    // Candidates can cancel (e.g. two orthogonal inputs give ±z); any single
    // qualifying candidate is still a valid pole then.
    let pole = normalize(mean).unwrap_or(first);

    Ok(Hemisphere {
        is_hemispherical: true,
        pole,
    })
}

fn validate<V: AsRef<[f64]>>(vecs: &[V]) -> TractifyResult<Vec<Vec3>> {
    if vecs.len() < 2 {
        return Err(TractifyError::invalid_input(format!(
            "At least two direction vectors are required, got {}",
            vecs.len()
        )));
    }

    vecs.iter()
        .enumerate()
        .map(|(i, v)| {
            let v = v.as_ref();
            if v.len() != 3 {
                return Err(TractifyError::invalid_input(format!(
                    "Input vectors must be 3D vectors (vector {} has {} components)",
                    i,
                    v.len()
                )));
            }
            let v = [v[0], v[1], v[2]];
            let norm = norm(&v);
            if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE || !norm.is_finite() {
                return Err(TractifyError::invalid_input(format!(
                    "Input vectors must be unit vectors (vector {} has norm {})",
                    i, norm
                )));
            }
            Ok(v)
        })
        .collect()
}

pub(crate) fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn norm(v: &Vec3) -> f64 {
    dot(v, v).sqrt()
}

fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: Vec3) -> Option<Vec3> {
    let n = norm(&v);
    if n < DEGENERATE_NORM {
        None
    } else {
        Some([v[0] / n, v[1] / n, v[2] / n])
    }
}

/// Angle between two unit vectors in radians
pub(crate) fn angle(a: &Vec3, b: &Vec3) -> f64 {
    dot(a, b).clamp(-1.0, 1.0).acos()
}
