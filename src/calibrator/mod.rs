//! Calibrator (C11): offline procedure that fits the linear map `M_e` projecting a premium
//! embedder's native space into the local embedder's space, via least-squares over a
//! representative corpus sample. Invoked outside the query hot path — the Embedder Registry
//! (C1) loads its output at startup.

pub mod error;

use std::sync::Arc;

use nalgebra::DMatrix;
use tracing::info;

pub use error::CalibrationError;

use crate::constants::MIN_CALIBRATION_SAMPLE_SIZE;
use crate::embedding::{CalibrationMatrix, LocalEmbedder, PremiumEmbedder};

/// Fits calibration matrices; holds no state of its own beyond the minimum-sample-size
/// invariant, since `local`/`premium` are supplied per call.
pub struct Calibrator {
    min_sample_size: usize,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self { min_sample_size: MIN_CALIBRATION_SAMPLE_SIZE }
    }
}

impl Calibrator {
    pub fn new(min_sample_size: usize) -> Self {
        Self { min_sample_size }
    }

    /// Computes `A = local.embed_documents(sample)`, `B = premium.embed_documents(sample)`, and
    /// solves `M = pinv(B) · A` minimizing `||B · M − A||_F²` via the Moore–Penrose
    /// pseudoinverse. `M` has shape `(d_premium, d_local)`.
    pub async fn fit(
        &self,
        local: &Arc<dyn LocalEmbedder>,
        premium: &Arc<dyn PremiumEmbedder>,
        sample: &[String],
    ) -> Result<CalibrationMatrix, CalibrationError> {
        if sample.len() < self.min_sample_size {
            return Err(CalibrationError::InsufficientSample {
                actual: sample.len(),
                required: self.min_sample_size,
            });
        }

        let a_rows = local.embed_documents(sample).await?;
        let b_rows = premium.embed_documents(sample).await?;
        if a_rows.len() != b_rows.len() {
            return Err(CalibrationError::RowCountMismatch { local: a_rows.len(), premium: b_rows.len() });
        }

        let n = a_rows.len();
        let d_local = local.embedding_dim();
        let d_premium = premium.embedding_dim();

        let a = DMatrix::from_row_iterator(n, d_local, a_rows.into_iter().flatten());
        let b = DMatrix::from_row_iterator(n, d_premium, b_rows.into_iter().flatten());

        let b_pinv = b.clone().pseudo_inverse(1e-6).map_err(|_| CalibrationError::SingularSample { rows: n })?;
        let m = b_pinv * a;

        info!(
            premium_name = premium.name(),
            sample_size = n,
            d_local,
            d_premium,
            "fitted calibration matrix"
        );

        Ok(CalibrationMatrix::new(premium.name(), m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::local::HashLocalEmbedder;
    use crate::embedding::premium::StubPremiumEmbedder;

    fn sample(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("calibration sample text number {i}")).collect()
    }

    #[tokio::test]
    async fn rejects_sample_below_minimum() {
        let calibrator = Calibrator::new(100);
        let local: Arc<dyn LocalEmbedder> = Arc::new(HashLocalEmbedder::new(8));
        let premium: Arc<dyn PremiumEmbedder> = Arc::new(StubPremiumEmbedder::new("stub", 16));

        let result = calibrator.fit(&local, &premium, &sample(5)).await;
        assert!(matches!(result, Err(CalibrationError::InsufficientSample { .. })));
    }

    #[tokio::test]
    async fn fits_matrix_with_expected_shape() {
        let calibrator = Calibrator::new(10);
        let local: Arc<dyn LocalEmbedder> = Arc::new(HashLocalEmbedder::new(8));
        let premium: Arc<dyn PremiumEmbedder> = Arc::new(StubPremiumEmbedder::new("stub-premium", 16));

        let matrix = calibrator.fit(&local, &premium, &sample(20)).await.unwrap();
        assert_eq!(matrix.d_premium, 16);
        assert_eq!(matrix.d_local, 8);
        assert_eq!(matrix.premium_name, "stub-premium");
    }

    #[tokio::test]
    async fn projection_of_fitted_sample_approximates_local_embedding() {
        let calibrator = Calibrator::new(10);
        let local: Arc<dyn LocalEmbedder> = Arc::new(HashLocalEmbedder::new(8));
        let premium: Arc<dyn PremiumEmbedder> = Arc::new(StubPremiumEmbedder::new("stub-premium", 16));
        let texts = sample(50);

        let matrix = calibrator.fit(&local, &premium, &texts).await.unwrap();

        let probe = "calibration sample text number 3".to_string();
        let premium_vec = premium.embed_query(&probe).await.unwrap();
        let projected = matrix.project(&premium_vec).unwrap();
        assert_eq!(projected.len(), 8);
    }
}
