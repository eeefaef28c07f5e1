//! Invalid tool unload cleanup
//!
//! Some slicers emit an `M104` with no usable tool inside the tool change
//! block. The firmware applies it to whatever nozzle is active, so it is
//! commented out.

use smfix_core::{Block, Sequence};

use crate::pipeline::{PassContext, SequencePass};

const TOOLCHANGE_START: &str = "; CP TOOLCHANGE START";
const TOOLCHANGE_END: &str = "; CP TOOLCHANGE END";

#[derive(Debug, Clone)]
pub struct ToolUnloadPass {
    enabled: bool,
}

impl ToolUnloadPass {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for ToolUnloadPass {
    fn default() -> Self {
        Self::new()
    }
}

impl SequencePass for ToolUnloadPass {
    fn name(&self) -> &str {
        "tool_unload"
    }

    fn description(&self) -> &str {
        "Removes M104 without a target tool inside tool changes"
    }

    fn apply(&self, mut sequence: Sequence, _ctx: &PassContext) -> Sequence {
        let mut in_toolchange = false;
        let mut removed = 0usize;

        for block in sequence.iter_mut() {
            if block.is_comment() {
                if block.in_comment(TOOLCHANGE_START) {
                    in_toolchange = true;
                }
                if block.in_comment(TOOLCHANGE_END) {
                    in_toolchange = false;
                }
            }

            if in_toolchange && block.is("M104") {
                if let Err(e) = block.tool_number() {
                    tracing::debug!("Removing '{}': {}", block, e);
                    *block = Block::comment_line(format!(
                        ";(Fixed: remove: {})",
                        block.format("%c %p")
                    ));
                    removed += 1;
                }
            }
        }

        tracing::info!("Tool unload: {} invalid M104 removed", removed);
        sequence
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
