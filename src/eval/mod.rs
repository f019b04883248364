//! Evaluation module - confusion-matrix metrics and ROC/AUC

pub mod metrics;
pub mod roc;

pub use metrics::*;
pub use roc::*;
