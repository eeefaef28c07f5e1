//! Nozzle shutoff
//!
//! Once the print switches away from a tool for the last time, an
//! `M104 S0 T<n>` is added right after the switch so the parked nozzle
//! stops oozing. If the slicer later heats that tool again anyway, the
//! shutoff lines for it are turned into comments that point at the problem.

use std::collections::HashMap;

use smfix_core::{Block, Sequence};

use crate::pipeline::{PassContext, SequencePass};

#[derive(Debug, Clone)]
pub struct ShutoffPass {
    enabled: bool,
}

impl ShutoffPass {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for ShutoffPass {
    fn default() -> Self {
        Self::new()
    }
}

/// Tool selected by a `T<n>` block
fn selected_tool(block: &Block) -> Option<i32> {
    let cmd = block.command()?;
    if cmd.word() != 'T' {
        return None;
    }
    cmd.address_as::<i32>().ok()
}

/// Tool and target temperature of an `M104`/`M109`; `R` wins over `S`
fn heat_target(block: &Block) -> Option<(i32, f64)> {
    if !(block.is("M104") || block.is("M109")) {
        return None;
    }
    let tool = block.tool_number().ok()?;
    let temp = block
        .param_as::<f64>('R')
        .or_else(|_| block.param_as::<f64>('S'))
        .ok()?;
    Some((tool, temp))
}

/// Highest line index of a `T<n>` per tool
pub fn last_tool_use(sequence: &Sequence, ctx: &PassContext) -> HashMap<i32, usize> {
    let lanes = ctx
        .lanes
        .scan(sequence.as_slice(), |acc: &mut HashMap<i32, usize>, n, block| {
            if let Some(tool) = selected_tool(block) {
                acc.insert(tool, n);
            }
        });

    let mut merged = HashMap::new();
    for lane in lanes {
        for (tool, n) in lane {
            let last = merged.entry(tool).or_insert(n);
            if *last < n {
                *last = n;
            }
        }
    }
    merged
}

impl SequencePass for ShutoffPass {
    fn name(&self) -> &str {
        "shutoff"
    }

    fn description(&self) -> &str {
        "Turns off nozzles after their last use"
    }

    fn apply(&self, sequence: Sequence, ctx: &PassContext) -> Sequence {
        let last_use = last_tool_use(&sequence, ctx);

        let mut output = Sequence::with_capacity(sequence.len() + 8);
        let mut current: Option<i32> = None;
        // output positions of the shutoff lines added per tool
        let mut shutoffs: HashMap<i32, Vec<usize>> = HashMap::new();
        let mut inserted = 0usize;
        let mut annotated = 0usize;

        for (n, block) in sequence.into_iter().enumerate() {
            let next_tool = selected_tool(&block);
            let heat = heat_target(&block);
            output.push(block);

            if let Some(next) = next_tool {
                if let Some(cur) = current.filter(|&cur| cur != next) {
                    let abandoned = last_use.get(&cur).is_some_and(|&last| last < n);
                    if let Some(shutoff) = abandoned.then(|| shutoff_block(cur)).flatten() {
                        output.push(shutoff);
                        shutoffs.entry(cur).or_default().push(output.len() - 1);
                        inserted += 1;
                        tracing::debug!("Shutting off T{} after line {}", cur, n);
                    }
                }
                current = (next >= 0).then_some(next);
            }

            if let Some((tool, temp)) = heat {
                let after_last_use = last_use.get(&tool).map_or(true, |&last| n > last);
                if temp > 0.0 && after_last_use {
                    if let Some(positions) = shutoffs.remove(&tool) {
                        tracing::warn!(
                            "T{} is heated again at line {} after being shut off",
                            tool,
                            n
                        );
                        for pos in positions {
                            let redundant = Block::comment_line(format!(
                                ";(Fixed: T{} has been shut off: {})",
                                tool,
                                output[pos].format("%c %p")
                            ));
                            output.replace(pos, redundant);
                            annotated += 1;
                        }
                    }
                }
            }
        }

        tracing::info!(
            "Shutoff: {} nozzle shutoffs added, {} marked redundant",
            inserted,
            annotated
        );
        output
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

fn shutoff_block(tool: i32) -> Option<Block> {
    Block::parse(&format!("M104 S0 T{tool} ; (Fixed: Shutoff T{tool})")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use smfix_core::Lanes;

    fn run(lines: &[&str]) -> Vec<String> {
        let sequence = Sequence::parse_lines(lines.iter().copied()).unwrap();
        let ctx = PassContext::new(Lanes::new(2));
        ShutoffPass::new()
            .apply(sequence, &ctx)
            .iter()
            .map(|b| b.format("%c %p").trim().to_string())
            .collect()
    }

    #[test]
    fn test_shutoff_after_last_use() {
        let out = run(&["T0", "G1 X10", "T1", "G1 X20"]);
        assert_eq!(out, vec!["T0", "G1 X10", "T1", "M104 S0 T0", "G1 X20"]);
    }

    #[test]
    fn test_shutoff_comment() {
        let sequence = Sequence::parse("T0\nT1\n").unwrap();
        let out = ShutoffPass::new().apply(sequence, &PassContext::default());
        assert_eq!(out[2].to_string(), "M104 S0 T0 ; (Fixed: Shutoff T0)");
    }

    #[test]
    fn test_no_shutoff_when_tool_returns() {
        let out = run(&["T0", "G1 X1", "T1", "G1 X2", "T0", "G1 X3"]);
        assert_eq!(
            out,
            vec!["T0", "G1 X1", "T1", "G1 X2", "T0", "M104 S0 T1", "G1 X3"]
        );
    }

    #[test]
    fn test_last_tool_is_never_shut_off() {
        let out = run(&["T0", "G1 X1"]);
        assert_eq!(out, vec!["T0", "G1 X1"]);
    }

    #[test]
    fn test_reselecting_same_tool_is_not_a_switch() {
        let out = run(&["T0", "G1 X1", "T0", "G1 X2"]);
        assert_eq!(out, vec!["T0", "G1 X1", "T0", "G1 X2"]);
    }

    #[test]
    fn test_three_consecutive_switches() {
        let out = run(&["T0", "G1 X1", "T1", "G1 X2", "T2", "G1 X3", "T3", "G1 X4"]);
        assert_eq!(
            out,
            vec![
                "T0",
                "G1 X1",
                "T1",
                "M104 S0 T0",
                "G1 X2",
                "T2",
                "M104 S0 T1",
                "G1 X3",
                "T3",
                "M104 S0 T2",
                "G1 X4",
            ]
        );
    }

    #[test]
    fn test_back_to_back_switches() {
        let out = run(&["T0", "T1", "T2", "T3"]);
        assert_eq!(
            out,
            vec!["T0", "T1", "M104 S0 T0", "T2", "M104 S0 T1", "T3", "M104 S0 T2"]
        );
    }

    #[test]
    fn test_reheat_marks_shutoff_redundant() {
        let sequence = Sequence::parse(
            "T0\nG1 X1\nT1\nG1 X2\nT2\nG1 X3\nM104 S200 T0\nM104 S0 T1\nG1 X4\n",
        )
        .unwrap();
        let out = ShutoffPass::new().apply(sequence, &PassContext::new(Lanes::new(3)));
        let text: Vec<String> = out.iter().map(|b| b.to_string()).collect();
        assert_eq!(
            text,
            vec![
                "T0",
                "G1 X1",
                "T1",
                ";(Fixed: T0 has been shut off: M104 S0 T0)",
                "G1 X2",
                "T2",
                "M104 S0 T1 ; (Fixed: Shutoff T1)",
                "G1 X3",
                "M104 S200 T0",
                "M104 S0 T1",
                "G1 X4",
            ]
        );
    }

    #[test]
    fn test_reheat_prefers_r_parameter() {
        let sequence = Sequence::parse("T0\nT1\nM109 R0 S200 T0\n").unwrap();
        let out = ShutoffPass::new().apply(sequence, &PassContext::default());
        assert!(out[2].is("M104"));
    }

    #[test]
    fn test_malformed_tool_change_is_ignored() {
        let out = run(&["T0", "Tx", "T1"]);
        assert_eq!(out, vec!["T0", "Tx", "T1", "M104 S0 T0"]);
    }

    #[test]
    fn test_last_tool_use_merges_lanes() {
        let sequence = Sequence::parse("T0\nT1\nT0\nG1\nT1\nT2\n").unwrap();
        let last = last_tool_use(&sequence, &PassContext::new(Lanes::new(4)));
        assert_eq!(last[&0], 2);
        assert_eq!(last[&1], 4);
        assert_eq!(last[&2], 5);
    }
}
