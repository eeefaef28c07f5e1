//! Pass pipeline
//!
//! Passes are whole-sequence transformations applied one after another.
//! Each pass takes ownership of the sequence and hands back the rewritten
//! one, so no pass ever sees another pass half done.

use std::sync::Arc;

use smfix_core::{Lanes, Sequence};
use smfix_settings::Config;

use crate::passes::{
    PreheatPass, ReinforceTowerPass, ShutoffPass, ToolRemapPass, ToolUnloadPass,
};

/// Shared state handed to every pass
#[derive(Debug, Clone, Copy, Default)]
pub struct PassContext {
    /// Width of the parallel scans
    pub lanes: Lanes,
}

impl PassContext {
    pub fn new(lanes: Lanes) -> Self {
        Self { lanes }
    }
}

/// A transformation over a whole G-code sequence
///
/// Per-line problems (unparsable numbers, missing parameters) are handled
/// inside the pass by leaving the line alone; a pass never fails.
pub trait SequencePass: Send + Sync {
    /// Get the name/identifier of this pass
    fn name(&self) -> &str;

    /// Get a description of what this pass does
    fn description(&self) -> &str;

    /// Rewrite the sequence
    fn apply(&self, sequence: Sequence, ctx: &PassContext) -> Sequence;

    /// Check if this pass is enabled
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Arc-wrapped pass for thread-safe sharing
pub type PassHandle = Arc<dyn SequencePass>;

/// Ordered list of passes
pub struct PassPipeline {
    passes: Vec<PassHandle>,
    context: PassContext,
}

impl PassPipeline {
    /// Create a new empty pipeline
    pub fn new(context: PassContext) -> Self {
        Self {
            passes: Vec::new(),
            context,
        }
    }

    /// The standard pipeline
    ///
    /// Order is fixed: remap, shutoff, preheat, reinforce, unload cleanup.
    /// Shutoff must see remapped tool numbers, and preheat must see the
    /// shutoff lines. Disabled passes keep their slot and are skipped.
    pub fn from_config(config: &Config) -> Self {
        let mut pipeline = Self::new(PassContext::new(Lanes::new(config.pipeline.workers)));
        pipeline
            .register(Arc::new(
                ToolRemapPass::new().enabled(config.pipeline.remap_tools),
            ))
            .register(Arc::new(
                ShutoffPass::new().enabled(config.pipeline.shutoff),
            ))
            .register(Arc::new(
                PreheatPass::from_settings(&config.preheat).enabled(config.pipeline.preheat),
            ))
            .register(Arc::new(
                ReinforceTowerPass::from_settings(&config.tower)
                    .enabled(config.pipeline.reinforce_tower),
            ))
            .register(Arc::new(
                ToolUnloadPass::new().enabled(config.pipeline.fix_tool_unload),
            ));
        pipeline
    }

    /// Register a pass; passes run in registration order
    pub fn register(&mut self, pass: PassHandle) -> &mut Self {
        self.passes.push(pass);
        self
    }

    /// Get the number of registered passes
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// List all registered passes as (name, description, enabled)
    pub fn list_passes(&self) -> Vec<(&str, &str, bool)> {
        self.passes
            .iter()
            .map(|p| (p.name(), p.description(), p.is_enabled()))
            .collect()
    }

    pub fn context(&self) -> &PassContext {
        &self.context
    }

    /// Run every enabled pass in order
    pub fn run(&self, mut sequence: Sequence) -> Sequence {
        for pass in &self.passes {
            if !pass.is_enabled() {
                tracing::debug!("Pass '{}' disabled, skipping", pass.name());
                continue;
            }
            let before = sequence.len();
            sequence = pass.apply(sequence, &self.context);
            tracing::debug!(
                "Pass '{}' done: {} -> {} lines",
                pass.name(),
                before,
                sequence.len()
            );
        }
        sequence
    }
}

impl Default for PassPipeline {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smfix_core::Block;

    struct AppendPass(&'static str);

    impl SequencePass for AppendPass {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "appends a comment"
        }

        fn apply(&self, mut sequence: Sequence, _ctx: &PassContext) -> Sequence {
            sequence.push(Block::comment_line(format!(";{}", self.0)));
            sequence
        }
    }

    #[test]
    fn test_passes_run_in_registration_order() {
        let mut pipeline = PassPipeline::new(PassContext::new(Lanes::new(1)));
        pipeline
            .register(Arc::new(AppendPass("first")))
            .register(Arc::new(AppendPass("second")));
        let out = pipeline.run(Sequence::new());
        assert_eq!(out.to_text(), ";first\n;second\n");
    }

    #[test]
    fn test_standard_pipeline_order() {
        let pipeline = PassPipeline::default();
        let names: Vec<&str> = pipeline.list_passes().iter().map(|p| p.0).collect();
        assert_eq!(
            names,
            vec!["tool_remap", "shutoff", "preheat", "reinforce_tower", "tool_unload"]
        );
    }

    #[test]
    fn test_disabled_passes_keep_their_slot() {
        let mut config = Config::default();
        config.pipeline.preheat = false;
        let pipeline = PassPipeline::from_config(&config);
        assert_eq!(pipeline.pass_count(), 5);
        let enabled: Vec<bool> = pipeline.list_passes().iter().map(|p| p.2).collect();
        assert_eq!(enabled, vec![true, true, false, true, true]);
    }
}
