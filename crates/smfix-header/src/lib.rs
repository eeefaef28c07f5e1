//! # SMFix Header
//!
//! Builds the metadata block Snapmaker firmware reads before printing:
//! slicer settings, work range, extruder usage, estimated time and the
//! embedded thumbnail, rendered in the legacy or the versioned layout.

pub mod estimate;
pub mod header;
pub mod params;
pub mod thumbnail;

pub use estimate::parse_estimated_time;
pub use header::{build_header, header_v0, header_v1, render_header};
pub use params::{Bounds, HeaderParams, MODEL_J1, TOOLHEAD_DUAL, TOOLHEAD_SINGLE};
pub use thumbnail::extract_thumbnail;
