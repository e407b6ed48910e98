// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pretty printers for reporting information. Lines are grouped into blocks,
//! and each block hangs off a tree drawn down the left-hand side.

use std::{borrow::Cow, sync::Mutex};

const VERTICAL: char = '│';
const UP_AND_RIGHT: char = '└';
const VERTICAL_AND_RIGHT: char = '├';

lazy_static::lazy_static! {
    static ref WARNINGS: Mutex<Blocks> = Mutex::new(Blocks::default());
}

type Block = Vec<Cow<'static, str>>;

#[derive(Default)]
struct Blocks(Vec<Block>);

impl Blocks {
    /// Every line of every block, prefixed with its tree glyph. Only the first
    /// line of a block gets a branch; the last block's branch closes the tree.
    fn tree_lines(&self) -> Vec<String> {
        let num_blocks = self.0.len();
        let mut lines = vec![];
        for (i_block, block) in self.0.iter().enumerate() {
            let last_block = i_block + 1 == num_blocks;
            for (i_line, line) in block.iter().enumerate() {
                let symbol = match (i_line, block.len() == 1 && last_block) {
                    (0, true) => UP_AND_RIGHT,
                    (0, false) => VERTICAL_AND_RIGHT,
                    _ => VERTICAL,
                };
                lines.push(format!("{symbol} {line}"));
            }
        }
        lines
    }
}

/// A titled summary, printed at the info level.
pub(crate) struct InfoPrinter {
    title: Cow<'static, str>,
    blocks: Blocks,
}

impl InfoPrinter {
    pub(crate) fn new(title: Cow<'static, str>) -> Self {
        Self {
            title,
            blocks: Blocks::default(),
        }
    }

    pub(crate) fn push_line(&mut self, line: Cow<'static, str>) {
        self.blocks.0.push(vec![line]);
    }

    pub(crate) fn push_block(&mut self, block: Block) {
        self.blocks.0.push(block);
    }

    pub(crate) fn display(self) {
        log::info!("{}", console::style(self.title).bold());
        for line in self.blocks.tree_lines() {
            log::info!("{line}");
        }
        log::info!("");
    }
}

/// Things that can be held back and printed together as warnings.
pub(crate) trait Warn {
    fn warn(self);
}

fn push_warning(block: Block) {
    if let Ok(mut warnings) = WARNINGS.lock() {
        warnings.0.push(block);
    }
}

impl Warn for &'static str {
    fn warn(self) {
        push_warning(vec![self.into()]);
    }
}

impl Warn for String {
    fn warn(self) {
        push_warning(vec![self.into()]);
    }
}

impl Warn for Block {
    fn warn(self) {
        push_warning(self);
    }
}

/// Print out any warnings that have been collected while command-line
/// arguments were parsed, then forget them.
pub(crate) fn display_warnings() {
    log::debug!("Displaying warnings");
    let mut warnings = match WARNINGS.lock() {
        Ok(w) => w,
        Err(_) => return,
    };
    if warnings.0.is_empty() {
        return;
    }

    log::warn!("{}", console::style("Warnings").bold());
    for line in warnings.tree_lines() {
        log::warn!("{line}");
    }
    log::warn!("");
    warnings.0.clear();
}

#[cfg(test)]
pub(super) fn tree_lines_of(blocks: Vec<Block>) -> Vec<String> {
    Blocks(blocks).tree_lines()
}
