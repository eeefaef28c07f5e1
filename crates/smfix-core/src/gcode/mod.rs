//! G-Code model
//!
//! This module provides:
//! - Tokens (word + address) with typed address conversion
//! - Blocks (one line: command, params, comment)
//! - Sequences (the insertable working buffer)

pub mod block;
pub mod sequence;
pub mod token;

pub use block::*;
pub use sequence::*;
pub use token::*;
