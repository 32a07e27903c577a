// Analysis artifacts
// Tempo, beat and segmentation data produced by the external beat tracker

pub mod artifact;

pub use artifact::{AnalysisArtifact, AnalysisData, AnalysisError};
