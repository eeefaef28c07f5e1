//! Tool number remap
//!
//! The printer has two nozzles but slicers happily emit `T0`..`Tn` for
//! multi-material profiles. Every tool reference is folded onto the
//! physical nozzle with the same parity:
//!
//! ```text
//! T0 -> T0, T1 -> T1
//! T2 -> T0, T3 -> T1
//! T4 -> T0, T5 -> T1
//! ```
//!
//! Per-tool summary comments written by the slicer are then cut down to the
//! two entries belonging to the first tool seen on each nozzle.

use smfix_core::{Block, Sequence};

use crate::pipeline::{PassContext, SequencePass};

/// Slicer summary comments holding one value per tool
const PER_TOOL_PREFIXES: [&str; 5] = [
    "; filament used [",
    "; filament_type = ",
    "; filament_retraction_length = ",
    "; nozzle_temperature_initial_layer = ",
    "; hot_plate_temp_initial_layer = ",
];

#[derive(Debug, Clone)]
pub struct ToolRemapPass {
    enabled: bool,
}

impl ToolRemapPass {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for ToolRemapPass {
    fn default() -> Self {
        Self::new()
    }
}

/// First original tool (by line) that landed on each nozzle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirstTools {
    even: Option<(usize, i32)>,
    odd: Option<(usize, i32)>,
}

impl FirstTools {
    fn observe(&mut self, line: usize, tool: i32) {
        let slot = if tool.rem_euclid(2) == 0 {
            &mut self.even
        } else {
            &mut self.odd
        };
        if slot.map_or(true, |(first, _)| line < first) {
            *slot = Some((line, tool));
        }
    }

    fn merge(mut self, other: Self) -> Self {
        for (line, tool) in [other.even, other.odd].into_iter().flatten() {
            self.observe(line, tool);
        }
        self
    }

    /// Original tool index on the left nozzle, 0 when no even tool was used
    pub fn even(&self) -> usize {
        self.even.map_or(0, |(_, tool)| tool as usize)
    }

    /// Original tool index on the right nozzle, 1 when no odd tool was used
    pub fn odd(&self) -> usize {
        self.odd.map_or(1, |(_, tool)| tool as usize)
    }
}

/// Which parameter carries the tool for a given `M` command
fn tool_param(block: &Block) -> Option<char> {
    let cmd = block.command()?;
    if cmd.word() != 'M' {
        return None;
    }
    let word = match cmd.address() {
        "106" | "107" => 'P',
        "104" | "109" => 'T',
        "301" | "303" => 'E',
        _ => return None,
    };
    block.has_param(word).then_some(word)
}

fn remap_line(block: &mut Block) -> Option<i32> {
    match block.word() {
        Some('T') => {
            // T-1 unloads and stays as written
            let cmd = block.command_mut()?;
            let tool = cmd.address_as::<i32>().ok().filter(|&t| t >= 0)?;
            cmd.set_address(tool % 2);
            Some(tool)
        }
        Some('M') => {
            let word = tool_param(block)?;
            let tool = block.tool_number().ok()?;
            if let Err(e) = block.set_param(word, tool.rem_euclid(2)) {
                tracing::debug!("Cannot remap {}: {}", block, e);
            }
            None
        }
        _ => None,
    }
}

/// Keep the entries for `even` and `odd` in a per-tool summary comment
///
/// Returns `None` when the comment is not one of the summary lines or the
/// list is too short.
pub fn select_tool_values(comment: &str, even: usize, odd: usize) -> Option<String> {
    if comment.len() <= 15 || !PER_TOOL_PREFIXES.iter().any(|p| comment.starts_with(p)) {
        return None;
    }
    let eq = comment.find('=')?;
    let values = &comment[eq + 1..];
    let delimiter = if values.contains(';') { ";" } else { "," };
    let entries: Vec<&str> = values.split(delimiter).collect();

    let first = entries.get(even)?.trim();
    let second = entries.get(odd)?.trim();
    let head = comment.get(..eq + 2)?;
    Some(format!("{}{}{}{}", head, first, delimiter, second))
}

impl SequencePass for ToolRemapPass {
    fn name(&self) -> &str {
        "tool_remap"
    }

    fn description(&self) -> &str {
        "Folds tool indices onto the two physical nozzles"
    }

    fn apply(&self, mut sequence: Sequence, ctx: &PassContext) -> Sequence {
        let lanes = ctx
            .lanes
            .scan_mut(sequence.as_mut_slice(), |acc: &mut FirstTools, n, block| {
                if let Some(tool) = remap_line(block) {
                    acc.observe(n, tool);
                }
            });
        let first = lanes.into_iter().fold(FirstTools::default(), FirstTools::merge);
        let (even, odd) = (first.even(), first.odd());
        tracing::debug!("Tool remap: left nozzle is T{}, right nozzle is T{}", even, odd);

        let rewritten: usize = ctx
            .lanes
            .scan_mut(sequence.as_mut_slice(), |count: &mut usize, _, block| {
                if !block.is_comment() {
                    return;
                }
                if let Some(comment) = select_tool_values(block.comment(), even, odd) {
                    block.set_comment(comment);
                    *count += 1;
                }
            })
            .into_iter()
            .sum();

        tracing::info!("Tool remap: {} summary comments rewritten", rewritten);
        sequence
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smfix_core::Lanes;

    fn remap(text: &str) -> Sequence {
        let sequence = Sequence::parse(text).unwrap();
        ToolRemapPass::new().apply(sequence, &PassContext::new(Lanes::new(3)))
    }

    #[test]
    fn test_tool_changes_fold_modulo_two() {
        let out = remap("T0\nT1\nT2\nT3\nT4\nT5\n");
        let tools: Vec<String> = out.iter().map(|b| b.to_string()).collect();
        assert_eq!(tools, vec!["T0", "T1", "T0", "T1", "T0", "T1"]);
    }

    #[test]
    fn test_tool_parameters_fold() {
        let out = remap("M106 P5 S255\nM107 P2\nM104 S200 T3\nM109 T4 S210\nM301 E3 P20\nM303 E2 S200\n");
        assert_eq!(
            out.to_text(),
            "M106 P1 S255\nM107 P0\nM104 S200 T1\nM109 T0 S210\nM301 E1 P20\nM303 E0 S200\n"
        );
    }

    #[test]
    fn test_unload_is_not_remapped() {
        let out = remap("T-1 ; unload T2
T2
");
        assert_eq!(out.to_text(), "T-1 ; unload T2
T0
");
    }

    #[test]
    fn test_other_lines_untouched() {
        let out = remap("G1 X10 E2\nM104 S200\nM140 S60\n");
        assert_eq!(out.to_text(), "G1 X10 E2\nM104 S200\nM140 S60\n");
    }

    #[test]
    fn test_summary_comments_use_first_tools() {
        let out = remap(
            "T2\nG1 X1\nT3\nG1 X2\nT0\n\
             ; filament_type = PLA;PETG;ABS;TPU\n\
             ; nozzle_temperature_initial_layer = 200,210,220,230\n\
             ; filament used [mm] = 1.0, 2.0, 3.0, 4.0\n",
        );
        assert_eq!(out[5].comment(), "; filament_type = ABS;TPU");
        assert_eq!(out[6].comment(), "; nozzle_temperature_initial_layer = 220,230");
        assert_eq!(out[7].comment(), "; filament used [mm] = 3.0,4.0");
    }

    #[test]
    fn test_summary_defaults_without_tool_changes() {
        let out = remap("; filament_type = PLA;PETG;ABS\n");
        assert_eq!(out[0].comment(), "; filament_type = PLA;PETG");
    }

    #[test]
    fn test_short_summary_is_left_alone() {
        let out = remap("T0\nT3\n; filament_type = PLA;PETG\n; layer_height = 0.2\n");
        assert_eq!(out[2].comment(), "; filament_type = PLA;PETG");
        assert_eq!(out[3].comment(), "; layer_height = 0.2");
    }

    #[test]
    fn test_first_tools_merge_keeps_lowest_line() {
        let mut a = FirstTools::default();
        a.observe(8, 2);
        let mut b = FirstTools::default();
        b.observe(3, 4);
        b.observe(5, 3);
        let merged = a.merge(b);
        assert_eq!(merged.even(), 4);
        assert_eq!(merged.odd(), 3);
    }

    #[test]
    fn test_select_tool_values() {
        assert_eq!(
            select_tool_values("; hot_plate_temp_initial_layer = 60,65,70", 2, 1).as_deref(),
            Some("; hot_plate_temp_initial_layer = 70,65")
        );
        assert_eq!(select_tool_values("; short = 1,2", 0, 1), None);
        assert_eq!(select_tool_values("; filament_type = PLA", 0, 1), None);
    }
}
