//! spikecurate: model-based curation of spike sorting results.
//!
//! This crate labels spike-sorted units with a pre-trained classifier: it
//! assembles quality and template metrics into a feature table, runs the
//! model over it, converts the predicted classes to curation labels and
//! writes `label_prediction` / `label_confidence` properties back onto the
//! sorting. Models are loaded from a folder holding a serialized bundle
//! and an optional `model_info.json` metadata sidecar.
//!
//! The design favors small, testable modules: the classifier contract is a
//! trait, so the pipeline works the same for the bundled GBDT models and
//! for anything else that implements it.
pub mod analyzer;
pub mod curation;
pub mod error;
pub mod io;
pub mod loader;
pub mod metrics;
pub mod model_info;
pub mod models;
