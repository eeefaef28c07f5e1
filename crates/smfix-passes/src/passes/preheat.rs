//! Preheat optimizer
//!
//! Slicers cool an idle nozzle down on a tool change and wait for it to heat
//! up again when it comes back. With `M73 R` progress markers in the file we
//! can tell how long the nozzle was idle and move the reheat earlier, so the
//! `M109` barely waits.
//!
//! Idle time is measured in distinct remaining-time values walked back from
//! the `M109`:
//! - below the short threshold the cooldown is simply removed
//! - below the long threshold a preheat is inserted at the short mark
//! - otherwise a preheat is inserted at the long mark, and the cooldown is
//!   replaced by a deep freeze that keeps the nozzle warm
//!
//! A cleanup walk then comments out temperature commands that repeat what
//! was already requested or reached.

use std::collections::HashMap;

use smfix_core::{Block, Sequence};
use smfix_settings::PreheatSettings;

use crate::pipeline::{PassContext, SequencePass};

#[derive(Debug, Clone)]
pub struct PreheatPass {
    short_distance: u32,
    long_distance: u32,
    deep_freeze_temperature: u32,
    enabled: bool,
}

/// What happened to one cooldown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Removed,
    Short(usize),
    Long(usize),
}

/// Marks collected while walking back from an `M109`
#[derive(Debug, Default)]
struct Distance {
    remaining: Option<f32>,
    count: u32,
    short_mark: Option<usize>,
    long_mark: Option<usize>,
}

impl Distance {
    fn observe(&mut self, remaining: f32, line: usize, short: u32, long: u32) {
        match self.remaining {
            None => self.remaining = Some(remaining),
            Some(prev) if prev != remaining => {
                self.remaining = Some(remaining);
                self.count += 1;
                if self.count == short {
                    self.short_mark = Some(line);
                } else if self.count == long {
                    self.long_mark = Some(line);
                }
            }
            Some(_) => {}
        }
    }
}

impl PreheatPass {
    pub fn new() -> Self {
        Self::from_settings(&PreheatSettings::default())
    }

    pub fn from_settings(settings: &PreheatSettings) -> Self {
        Self {
            short_distance: settings.short_distance,
            long_distance: settings.long_distance,
            deep_freeze_temperature: settings.deep_freeze_temperature,
            enabled: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Walk back from the `M109` at `n` and fix the cooldown it belongs to
    fn place_preheat(
        &self,
        sequence: &mut Sequence,
        n: usize,
        tool: i32,
        temp: f32,
    ) -> Option<Placement> {
        let mut distance = Distance::default();

        for pn in (0..n).rev() {
            let line = &sequence[pn];

            if line.is("M109") && line.tool_number().ok() == Some(tool) {
                return None;
            }

            if line.is("M73") {
                if let Ok(remaining) = line.param_as::<f32>('R') {
                    distance.observe(remaining, pn, self.short_distance, self.long_distance);
                }
                continue;
            }

            if !line.is("M104") || line.tool_number().ok() != Some(tool) {
                continue;
            }

            // any M104 for this tool ends the walk, cooldown or not
            if !is_cooldown(line, tool) {
                return None;
            }
            let original = line.format("%c %p");

            if distance.count < self.short_distance {
                sequence.replace(
                    pn,
                    Block::comment_line(format!(";(Fixed: remove cooldown: {})", original)),
                );
                return Some(Placement::Removed);
            }

            if distance.count < self.long_distance {
                let mark = distance.short_mark?;
                sequence.insert_before(mark, preheat_block(tool, temp, ";(Fixed: pre-heat short)")?);
                return Some(Placement::Short(mark));
            }

            let mark = distance.long_mark?;
            let freeze = Block::parse(&format!(
                "M104 T{} S{} ;(Fixed: deep freeze instead of: {})",
                tool, self.deep_freeze_temperature, original
            ))
            .ok()?;
            // the mark is after pn, so pn does not move
            sequence.replace(pn, freeze);
            sequence.insert_before(mark, preheat_block(tool, temp, ";(Fixed: pre-heat long)")?);
            return Some(Placement::Long(mark));
        }
        None
    }
}

impl Default for PreheatPass {
    fn default() -> Self {
        Self::new()
    }
}

fn is_cooldown(block: &Block, tool: i32) -> bool {
    block.in_comment("cooldown") || block.in_comment(&format!("standby T{}", tool))
}

fn preheat_block(tool: i32, temp: f32, comment: &str) -> Option<Block> {
    let mut block = Block::parse(&format!("M104 T{} S{}", tool, temp)).ok()?;
    block.set_comment(comment);
    Some(block)
}

/// Tool and `S` temperature of an `M104`/`M109`
fn temperature_target(block: &Block) -> Option<(i32, f32)> {
    if !(block.is("M104") || block.is("M109")) || !block.has_param('S') {
        return None;
    }
    let tool = block.tool_number().ok()?;
    let temp = block.param_as::<f32>('S').ok()?;
    Some((tool, temp))
}

/// Comment out temperature commands that change nothing
fn drop_repeated_temperatures(sequence: &mut Sequence) -> usize {
    // tool -> (requested temperature, reached via M109)
    let mut state: HashMap<i32, (f32, bool)> = HashMap::new();
    let mut dropped = 0;

    for block in sequence.iter_mut() {
        let Some((tool, temp)) = temperature_target(block) else {
            continue;
        };
        let waits = block.is("M109");

        match state.get_mut(&tool) {
            Some((current, guaranteed)) if *current == temp => {
                let note = if !waits {
                    "already requested temp"
                } else if *guaranteed {
                    "already stabilized temp"
                } else {
                    *guaranteed = true;
                    continue;
                };
                *block = Block::comment_line(format!(
                    ";(Fixed: {}: {})",
                    note,
                    block.format("%c %p")
                ));
                dropped += 1;
            }
            _ => {
                state.insert(tool, (temp, waits));
            }
        }
    }
    dropped
}

impl SequencePass for PreheatPass {
    fn name(&self) -> &str {
        "preheat"
    }

    fn description(&self) -> &str {
        "Moves nozzle reheats earlier and drops repeated temperature commands"
    }

    fn apply(&self, mut sequence: Sequence, _ctx: &PassContext) -> Sequence {
        let has_progress = sequence
            .iter()
            .any(|b| b.is("M73") && b.has_param('R'));
        if !has_progress {
            tracing::info!("Preheat: no M73 remaining-time markers, skipping");
            return sequence;
        }

        let (mut removed, mut short, mut long) = (0usize, 0usize, 0usize);
        let mut n = 0;
        while n < sequence.len() {
            let block = &sequence[n];
            let target = if block.is("M109") && block.has_param('S') {
                block
                    .tool_number()
                    .ok()
                    .zip(block.param_as::<f32>('S').ok())
            } else {
                None
            };

            if let Some((tool, temp)) = target {
                match self.place_preheat(&mut sequence, n, tool, temp) {
                    Some(Placement::Removed) => removed += 1,
                    Some(Placement::Short(mark)) => {
                        tracing::debug!("Preheat T{} at line {} (short)", tool, mark);
                        short += 1;
                        n += 1;
                    }
                    Some(Placement::Long(mark)) => {
                        tracing::debug!("Preheat T{} at line {} (long)", tool, mark);
                        long += 1;
                        n += 1;
                    }
                    None => {}
                }
            }
            n += 1;
        }

        let dropped = drop_repeated_temperatures(&mut sequence);
        tracing::info!(
            "Preheat: {} cooldowns removed, {} short and {} long preheats, {} repeated temperatures dropped",
            removed,
            short,
            long,
            dropped
        );
        sequence
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
