//! # SMFix Core
//!
//! The in-memory G-code model shared by every SMFix crate: tokens, blocks,
//! the sequence buffer, the error taxonomy and the parallel lane scan.

pub mod error;
pub mod gcode;
pub mod parallel;

pub use error::{Error, GcodeError, Result};
pub use gcode::{AddressValue, Block, FromAddress, Sequence, Token, GCODE_SEPARATOR, MARK};
pub use parallel::Lanes;
