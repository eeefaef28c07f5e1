//! The mutable working buffer the passes operate on

use std::ops::{Index, IndexMut};

use super::block::Block;
use crate::error::GcodeError;

/// First line written by SMFix; its presence means the file was already processed
pub const MARK: &str = "; Postprocessed by smfix (https://github.com/macdylan/SMFix)";

/// Ordered, insertable list of blocks
///
/// Positions are plain indices; every insertion shifts the blocks after it.
/// A sequence is moved from pass to pass and never shared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence {
    blocks: Vec<Block>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            blocks: Vec::with_capacity(capacity),
        }
    }

    /// Parse raw G-code text
    ///
    /// Fails with `AlreadyProcessed` before parsing anything if a line starts
    /// with [`MARK`]. Blank lines are dropped.
    pub fn parse(text: &str) -> Result<Self, GcodeError> {
        Self::parse_lines(text.lines())
    }

    pub fn parse_lines<'a, I>(lines: I) -> Result<Self, GcodeError>
    where
        I: IntoIterator<Item = &'a str>,
        I::IntoIter: Clone,
    {
        let lines = lines.into_iter();
        if lines.clone().any(|line| line.starts_with(MARK)) {
            return Err(GcodeError::AlreadyProcessed);
        }

        let mut sequence = Self::with_capacity(lines.size_hint().0);
        let mut skipped = 0usize;
        for line in lines {
            match Block::parse(line) {
                Ok(block) => sequence.push(block),
                Err(GcodeError::EmptyInput) => skipped += 1,
                Err(e) => return Err(e),
            }
        }
        tracing::debug!(
            "Parsed {} blocks, skipped {} blank lines",
            sequence.len(),
            skipped
        );
        Ok(sequence)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Insert so that `block` lands at `index`, ahead of the block that was there
    pub fn insert_before(&mut self, index: usize, block: Block) {
        self.blocks.insert(index, block);
    }

    /// Insert right behind the block at `index`
    pub fn insert_after(&mut self, index: usize, block: Block) {
        let at = (index + 1).min(self.blocks.len());
        self.blocks.insert(at, block);
    }

    /// Swap in a new block, returning the old one
    pub fn replace(&mut self, index: usize, block: Block) -> Block {
        std::mem::replace(&mut self.blocks[index], block)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Block> {
        self.blocks.iter_mut()
    }

    pub fn as_slice(&self) -> &[Block] {
        &self.blocks
    }

    pub fn as_mut_slice(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    /// Every block formatted on its own line, each terminated by `\n`
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.blocks.len() * 24);
        for block in &self.blocks {
            out.push_str(&block.to_string());
            out.push('\n');
        }
        out
    }
}

impl Index<usize> for Sequence {
    type Output = Block;

    fn index(&self, index: usize) -> &Block {
        &self.blocks[index]
    }
}

impl IndexMut<usize> for Sequence {
    fn index_mut(&mut self, index: usize) -> &mut Block {
        &mut self.blocks[index]
    }
}

impl IntoIterator for Sequence {
    type Item = Block;
    type IntoIter = std::vec::IntoIter<Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

impl FromIterator<Block> for Sequence {
    fn from_iter<T: IntoIterator<Item = Block>>(iter: T) -> Self {
        Self {
            blocks: iter.into_iter().collect(),
        }
    }
}
