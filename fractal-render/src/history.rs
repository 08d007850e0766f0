use fractal_core::RenderConfig;
use tracing::debug;

use crate::buffer::RenderBuffer;
use crate::error::RenderError;

/// One undo step: the configuration of a pass and the image it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub config: RenderConfig,
    pub surface: RenderBuffer,
}

/// Linear undo/redo history.
///
/// Appending while the cursor is not on the newest entry discards every entry
/// after the cursor first; there is never more than one forward branch.
#[derive(Debug, Default)]
pub struct HistoryBuffer {
    entries: Vec<HistoryEntry>,
    current: Option<usize>,
    max_entries: Option<usize>,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max` entries, evicting the oldest. `0` is treated as 1.
    pub fn with_max_entries(max: usize) -> Self {
        Self {
            max_entries: Some(max.max(1)),
            ..Self::default()
        }
    }

    /// Record a new state after the cursor and move the cursor onto it.
    pub fn append(&mut self, config: RenderConfig, surface: RenderBuffer) {
        let keep = self.current.map_or(0, |i| i + 1);
        let discarded = self.entries.len() - keep;
        if discarded > 0 {
            debug!(discarded, "discarding forward history");
        }
        self.entries.truncate(keep);
        self.entries.push(HistoryEntry { config, surface });

        if let Some(max) = self.max_entries {
            let excess = self.entries.len().saturating_sub(max);
            if excess > 0 {
                self.entries.drain(..excess);
            }
        }
        self.current = Some(self.entries.len() - 1);
    }

    /// Step the cursor back. Returns `false` at the oldest entry.
    pub fn undo(&mut self) -> bool {
        match self.current {
            Some(i) if i > 0 => {
                self.current = Some(i - 1);
                true
            }
            _ => false,
        }
    }

    /// Step the cursor forward. Returns `false` at the newest entry.
    pub fn redo(&mut self) -> bool {
        match self.current {
            Some(i) if i + 1 < self.entries.len() => {
                self.current = Some(i + 1);
                true
            }
            _ => false,
        }
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.current.and_then(|i| self.entries.get(i))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn first(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Move the cursor to `index` without discarding anything.
    pub fn jump_to(&mut self, index: usize) -> crate::Result<&HistoryEntry> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get(index)
            .ok_or(RenderError::HistoryIndex { index, len })?;
        self.current = Some(index);
        Ok(entry)
    }

    /// Replace the image of the newest entry, e.g. once its pass has finished.
    pub fn update_last_surface(&mut self, surface: RenderBuffer) -> bool {
        match self.entries.last_mut() {
            Some(last) => {
                last.surface = surface;
                true
            }
            None => false,
        }
    }

    /// Drop everything but the oldest entry and move the cursor onto it.
    pub fn truncate_to_first(&mut self) {
        self.entries.truncate(1);
        self.current = (!self.entries.is_empty()).then_some(0);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = None;
    }
}
