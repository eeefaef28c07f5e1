//! Prime tower reinforcement
//!
//! Wipe moves on the prime tower are thin and the tower tends to split
//! between layers. Above the first layers every wipe move inside a tool
//! change gets a weaker extrusion in place before it.

use std::sync::OnceLock;

use regex::Regex;
use smfix_core::{Block, Sequence};
use smfix_settings::TowerSettings;

use crate::pipeline::{PassContext, SequencePass};

const WIPE_START: &str = "; CP TOOLCHANGE WIPE";
const TOOLCHANGE_END: &str = "; CP TOOLCHANGE END";

#[derive(Debug, Clone)]
pub struct ReinforceTowerPass {
    min_z: f32,
    extrusion_factor: f32,
    enabled: bool,
}

impl ReinforceTowerPass {
    pub fn new() -> Self {
        Self::from_settings(&TowerSettings::default())
    }

    pub fn from_settings(settings: &TowerSettings) -> Self {
        Self {
            min_z: settings.min_z,
            extrusion_factor: settings.extrusion_factor,
            enabled: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for ReinforceTowerPass {
    fn default() -> Self {
        Self::new()
    }
}

/// Height from a `;Z:<height>` comment
fn layer_height(comment: &str) -> Option<f32> {
    static Z_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = Z_REGEX.get_or_init(|| Regex::new(r"^;Z:([\d.]+)").expect("invalid regex pattern"));
    regex
        .captures(comment)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok())
}

/// Reinforcement state across one tool change
#[derive(Debug, Default)]
struct Wipe {
    active: bool,
    z: f32,
    e: f32,
    f: f32,
}

impl SequencePass for ReinforceTowerPass {
    fn name(&self) -> &str {
        "reinforce_tower"
    }

    fn description(&self) -> &str {
        "Adds reinforcement extrusion on prime tower wipes"
    }

    fn apply(&self, sequence: Sequence, _ctx: &PassContext) -> Sequence {
        let mut output = Sequence::with_capacity(sequence.len() + 2048);
        let mut wipe = Wipe::default();
        let mut inserted = 0usize;

        for block in sequence {
            if block.is_comment() {
                if block.in_comment(WIPE_START) {
                    wipe.active = true;
                }
                if block.in_comment(TOOLCHANGE_END) {
                    wipe.active = false;
                    wipe.e = 0.0;
                }
                if let Some(z) = layer_height(block.comment()) {
                    wipe.z = z;
                }
            }

            let wipe_move = block.is("G1") && block.has_param('E') && block.has_param('F');
            if wipe.active && wipe.z > self.min_z && wipe_move {
                if wipe.e < 0.01 {
                    if let (Ok(e), Ok(f)) = (block.param_as::<f32>('E'), block.param_as::<f32>('F')) {
                        wipe.e = if e > 0.0 { e * self.extrusion_factor } else { e };
                        wipe.f = f;
                    }
                }
                match Block::parse(&format!(
                    "G1 E{} F{} ;(Fixed: reinforce tower)",
                    wipe.e, wipe.f
                )) {
                    Ok(extra) => {
                        output.push(extra);
                        inserted += 1;
                    }
                    Err(e) => tracing::debug!("Cannot build reinforcement move: {}", e),
                }
            }
            output.push(block);
        }

        tracing::info!("Reinforce tower: {} moves added", inserted);
        output
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
