//! Reference data for the boonscan pipeline.
//!
//! Holds the trait codex (providers, traits, icon cross-references) and the
//! labeled-screen corpus used to verify classifier output. Everything here is
//! plain data; image handling lives in `boonscan-cv`.

pub mod codex;
pub mod training;

// Re-export commonly used types
pub use codex::{Category, Codex, CodexError, Provider, ProviderId, Subcategory, Trait, TraitId};
pub use training::TrainingData;
