//! Incremental transcript reconciliation
//!
//! This module folds the engine's overlapping, revisable partial results
//! into two views:
//! - a durable committed transcript that only ever grows
//! - a replaceable speculative tail used for display only

mod reconciler;

pub use reconciler::{Applied, Reconciler, Segment, SegmentKind};
