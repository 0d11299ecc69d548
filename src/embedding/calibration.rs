//! Calibration matrices: the linear map `v_local ≈ v_premium · M_e` fitted offline by
//! [`crate::calibrator::Calibrator`] and loaded once at startup per premium embedder.

use std::path::Path;

use nalgebra::DMatrix;

use super::error::EmbeddingError;

/// Rectangular `(d_premium, d_local)` matrix, one per premium embedder. Never shared across
/// premium embedders even if their dimensions coincide.
#[derive(Debug, Clone)]
pub struct CalibrationMatrix {
    pub premium_name: String,
    pub d_premium: usize,
    pub d_local: usize,
    matrix: DMatrix<f32>,
}

impl CalibrationMatrix {
    pub fn new(premium_name: impl Into<String>, matrix: DMatrix<f32>) -> Self {
        let d_premium = matrix.nrows();
        let d_local = matrix.ncols();
        Self {
            premium_name: premium_name.into(),
            d_premium,
            d_local,
            matrix,
        }
    }

    /// Projects a premium-space vector into local space: `v_local = v_premium · M_e`, then
    /// L2-normalizes the result.
    pub fn project(&self, v_premium: &[f32]) -> Result<Vec<f32>, EmbeddingError> {
        if v_premium.len() != self.d_premium {
            return Err(EmbeddingError::InvalidConfig {
                reason: format!(
                    "calibration matrix for '{}' expects d_premium={}, got {}",
                    self.premium_name,
                    self.d_premium,
                    v_premium.len()
                ),
            });
        }
        let row = DMatrix::from_row_slice(1, v_premium.len(), v_premium);
        let projected = row * &self.matrix;
        let raw: Vec<f32> = projected.row(0).iter().copied().collect();
        Ok(super::local::l2_normalize(raw))
    }

    /// Serializes the matrix to the on-disk format: a little-endian header of
    /// `(d_premium: u32, d_local: u32, name_len: u32, name bytes)` followed by row-major f32s.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(self.d_premium as u32).to_le_bytes());
        buf.extend_from_slice(&(self.d_local as u32).to_le_bytes());
        let name_bytes = self.premium_name.as_bytes();
        buf.extend_from_slice(&(name_bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(name_bytes);
        for value in self.matrix.iter() {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EmbeddingError> {
        if bytes.len() < 12 {
            return Err(EmbeddingError::ModelLoadFailed {
                reason: "calibration matrix file too short for header".to_string(),
            });
        }
        let d_premium = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        let d_local = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
        let name_len = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
        let name_start = 12;
        let name_end = name_start + name_len;
        let premium_name = String::from_utf8(bytes[name_start..name_end].to_vec())
            .map_err(|e| EmbeddingError::ModelLoadFailed { reason: e.to_string() })?;

        let expected_values = d_premium * d_local;
        let values_start = name_end;
        let values_end = values_start + expected_values * 4;
        if bytes.len() < values_end {
            return Err(EmbeddingError::ModelLoadFailed {
                reason: "calibration matrix file truncated".to_string(),
            });
        }

        let mut values = Vec::with_capacity(expected_values);
        for chunk in bytes[values_start..values_end].chunks_exact(4) {
            values.push(f32::from_le_bytes(chunk.try_into().unwrap()));
        }

        let matrix = DMatrix::from_row_slice(d_premium, d_local, &values);
        Ok(Self::new(premium_name, matrix))
    }

    pub fn load(path: &Path) -> Result<Self, EmbeddingError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn save(&self, path: &Path) -> Result<(), EmbeddingError> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let matrix = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let calib = CalibrationMatrix::new("test-embedder", matrix);

        let bytes = calib.to_bytes();
        let restored = CalibrationMatrix::from_bytes(&bytes).unwrap();

        assert_eq!(restored.premium_name, "test-embedder");
        assert_eq!(restored.d_premium, 2);
        assert_eq!(restored.d_local, 3);
    }

    #[test]
    fn project_rejects_dimension_mismatch() {
        let matrix = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let calib = CalibrationMatrix::new("test-embedder", matrix);

        let result = calib.project(&[1.0, 2.0, 3.0]);
        assert!(result.is_err());
    }

    #[test]
    fn project_produces_unit_norm_output() {
        let matrix = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        let calib = CalibrationMatrix::new("identity", matrix);

        let projected = calib.project(&[3.0, 4.0]).unwrap();
        let norm: f32 = projected.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
