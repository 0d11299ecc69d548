//! Embedding layer: local + premium embedders, calibration, and the registry that ties them
//! together (C1 of the component design).

pub mod calibration;
pub mod device;
pub mod error;
pub mod local;
pub mod premium;
pub mod registry;

pub use calibration::CalibrationMatrix;
pub use error::EmbeddingError;
pub use local::{CandleLocalEmbedder, HashLocalEmbedder, LocalEmbedder};
pub use premium::{HttpPremiumEmbedder, PremiumEmbedder, StubPremiumEmbedder};
pub use registry::EmbedderRegistry;
