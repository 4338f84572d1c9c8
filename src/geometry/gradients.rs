// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! FSL-format diffusion gradient tables

use std::path::Path;

use super::hemisphere::{is_hemispherical, norm, Hemisphere, Vec3};
use crate::errors::{TractifyError, TractifyResult};

/// Default b-value below which a volume counts as b0
pub const DEFAULT_B0_THRESHOLD: f64 = 50.0;

/// Paired b-values and gradient directions, one entry per volume
#[derive(Debug, Clone, PartialEq)]
pub struct GradientTable {
    bvals: Vec<f64>,
    bvecs: Vec<Vec3>,
}

impl GradientTable {
    /// Build a table from per-volume b-values and directions
    pub fn new(bvals: Vec<f64>, bvecs: Vec<Vec3>) -> TractifyResult<Self> {
        if bvals.len() != bvecs.len() {
            return Err(TractifyError::invalid_input(format!(
                "Gradient table has {} b-values but {} b-vectors",
                bvals.len(),
                bvecs.len()
            )));
        }
        Ok(Self { bvals, bvecs })
    }

    /// Load a `bvecs` (3 rows) / `bvals` (1 row) pair as written by FSL
    pub fn from_fsl_files(bvec_path: &Path, bval_path: &Path) -> TractifyResult<Self> {
        let bvec_text = read(bvec_path)?;
        let bval_text = read(bval_path)?;
        Self::from_fsl_text(&bvec_text, &bval_text)
    }

    /// Parse FSL-format gradient text
    pub fn from_fsl_text(bvec_text: &str, bval_text: &str) -> TractifyResult<Self> {
        let rows: Vec<Vec<f64>> = bvec_text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(parse_row)
            .collect::<TractifyResult<_>>()?;

        if rows.len() != 3 {
            return Err(TractifyError::invalid_input(format!(
                "b-vector file must have 3 rows, found {}",
                rows.len()
            )));
        }
        if rows[0].len() != rows[1].len() || rows[1].len() != rows[2].len() {
            return Err(TractifyError::invalid_input(
                "b-vector rows have different lengths",
            ));
        }

        let bvals: Vec<f64> = bval_text
            .split_whitespace()
            .map(parse_number)
            .collect::<TractifyResult<_>>()?;

        let bvecs = (0..rows[0].len())
            .map(|i| [rows[0][i], rows[1][i], rows[2][i]])
            .collect();

        Self::new(bvals, bvecs)
    }

    /// Number of volumes
    pub fn len(&self) -> usize {
        self.bvals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bvals.is_empty()
    }

    /// Number of volumes at or below the b0 threshold
    pub fn b0_count(&self, b0_threshold: f64) -> usize {
        self.bvals.iter().filter(|&&b| b <= b0_threshold).count()
    }

    /// Distinct shells, rounded to the nearest hundred
    pub fn shells(&self) -> Vec<u32> {
        let mut shells: Vec<u32> = self
            .bvals
            .iter()
            .map(|b| ((b / 100.0).round() * 100.0) as u32)
            .collect();
        shells.sort_unstable();
        shells.dedup();
        shells
    }

    /// Directions of the diffusion-weighted volumes
    pub fn diffusion_directions(&self, b0_threshold: f64) -> Vec<Vec3> {
        self.bvals
            .iter()
            .zip(&self.bvecs)
            .filter(|&(&b, v)| b > b0_threshold && norm(v) > 0.0)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Run the hemisphere test over the diffusion-weighted directions
    pub fn hemisphere(&self, b0_threshold: f64) -> TractifyResult<Hemisphere> {
        is_hemispherical(&self.diffusion_directions(b0_threshold))
    }
}

fn read(path: &Path) -> TractifyResult<String> {
    std::fs::read_to_string(path).map_err(|e| TractifyError::FileReadError {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

fn parse_row(line: &str) -> TractifyResult<Vec<f64>> {
    line.split_whitespace().map(parse_number).collect()
}

fn parse_number(token: &str) -> TractifyResult<f64> {
    token
        .parse::<f64>()
        .map_err(|_| TractifyError::invalid_input(format!("'{}' is not a number", token)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use tempfile::TempDir;

    const BVECS: &str = "0 1 0 0 -1\n0 0 1 0 0\n0 0 0 1 0\n";
    const BVALS: &str = "0 1000 1000 1000 2000\n";

    #[test]
    fn test_parse_fsl_text() {
        let table = GradientTable::from_fsl_text(BVECS, BVALS).unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(table.b0_count(DEFAULT_B0_THRESHOLD), 1);
        assert_eq!(table.shells(), vec![0, 1000, 2000]);
        assert_eq!(
            table.diffusion_directions(DEFAULT_B0_THRESHOLD),
            vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [-1.0, 0.0, 0.0]]
        );
    }

    #[test]
    fn test_hemisphere_over_weighted_directions() {
        let table = GradientTable::from_fsl_text(BVECS, BVALS).unwrap();
        // ±x with +y and +z still fit in the hemisphere around (0, 1, 1)
        let result = table.hemisphere(DEFAULT_B0_THRESHOLD).unwrap();
        assert!(result.is_hemispherical);
    }

    #[test]
    fn test_mismatched_lengths() {
        let err = GradientTable::from_fsl_text(BVECS, "0 1000\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_two_row_bvecs_rejected() {
        let err = GradientTable::from_fsl_text("0 1\n0 0\n", "0 1000\n").unwrap_err();
        assert!(err.to_string().contains("3 rows"));
    }

    #[test]
    fn test_from_files() {
        let temp_dir = TempDir::new().unwrap();
        let bvec = temp_dir.path().join("dwi.bvec");
        let bval = temp_dir.path().join("dwi.bval");
        std::fs::write(&bvec, BVECS).unwrap();
        std::fs::write(&bval, BVALS).unwrap();

        let table = GradientTable::from_fsl_files(&bvec, &bval).unwrap();
        assert_eq!(table.len(), 5);
    }
}
