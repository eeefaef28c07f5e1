//! # SMFix Passes
//!
//! Whole-sequence G-code rewrites for Snapmaker dual-extruder printers and
//! the pipeline that runs them in a fixed order.

pub mod passes;
pub mod pipeline;

pub use passes::{PreheatPass, ReinforceTowerPass, ShutoffPass, ToolRemapPass, ToolUnloadPass};
pub use pipeline::{PassContext, PassHandle, PassPipeline, SequencePass};
