//! Query responses
//!
//! The ordered non-Progress items a query produced, collected until the
//! server's end-of-stream marker. Progress reports are folded into one
//! accumulated counter instead of being kept as items.

use clickhouse_native_data::{Block, Row};
use clickhouse_native_protocol::{ProfileInfo, Progress};

/// One response item, in server arrival order
#[derive(Debug)]
pub enum ResponseItem {
    Data(Block),
    Totals(Block),
    Extremes(Block),
    Profile(ProfileInfo),
}

/// Everything a query produced up to end-of-stream
#[derive(Debug, Default)]
pub struct QueryResponse {
    items: Vec<ResponseItem>,
    progress: Progress,
}

impl QueryResponse {
    pub(crate) fn push(&mut self, item: ResponseItem) {
        self.items.push(item);
    }

    pub(crate) fn record_progress(&mut self, progress: Progress) {
        self.progress.accumulate(progress);
    }

    pub fn items(&self) -> &[ResponseItem] {
        &self.items
    }

    /// Accumulated progress across the whole response stream.
    pub fn progress(&self) -> Progress {
        self.progress
    }

    /// The data blocks of the result set, in order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.items.iter().filter_map(|item| match item {
            ResponseItem::Data(block) => Some(block),
            _ => None,
        })
    }

    /// All result rows across the data blocks.
    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        self.blocks()
            .flat_map(|block| (0..block.row_count()).filter_map(|index| block.row(index)))
    }

    /// Total result row count across the data blocks.
    pub fn row_count(&self) -> usize {
        self.blocks().map(|block| block.row_count()).sum()
    }

    pub fn totals(&self) -> Option<&Block> {
        self.items.iter().find_map(|item| match item {
            ResponseItem::Totals(block) => Some(block),
            _ => None,
        })
    }

    pub fn extremes(&self) -> Option<&Block> {
        self.items.iter().find_map(|item| match item {
            ResponseItem::Extremes(block) => Some(block),
            _ => None,
        })
    }

    pub fn profile(&self) -> Option<ProfileInfo> {
        self.items.iter().find_map(|item| match item {
            ResponseItem::Profile(profile) => Some(*profile),
            _ => None,
        })
    }
}
