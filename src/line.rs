//! Start line state, built up from marked fixes.

use crate::fix::Fix;
use crate::gis::{LocalScale, LocalVector, Position};

/// A start line through the two most recent marks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefinedLine {
    /// Position of the second most recent mark, the anchor for the local
    /// frame.
    pub origin: Position,
    /// Unit vector from `origin` through the most recent mark.
    pub direction: LocalVector,
}

/// Outcome of attempting to mark a line point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkOutcome {
    /// The fix was recorded as a new line mark.
    Set(Fix),
    /// The fix sits at the same position as the most recent mark, nothing
    /// was recorded.
    AlreadySet,
}

/// The start line, accumulated from marked fixes.
///
/// Until two marks have been recorded there is no line. Afterwards the line
/// always runs through the two most recent marks, so marking a third point
/// moves the line rather than extending it.
#[derive(Debug, Default)]
pub struct StartLine {
    marks: Vec<Fix>,
    line: Option<DefinedLine>,
}

impl StartLine {
    /// Record `fix` as a line mark and recompute the line.
    pub fn mark(&mut self, fix: Fix, scale: &LocalScale) -> MarkOutcome {
        if let Some(last) = self.marks.last() {
            if last.position == fix.position {
                return MarkOutcome::AlreadySet;
            }
        }

        self.marks.push(fix);

        if self.marks.len() >= 2 {
            let origin = self.marks[self.marks.len() - 2].position;
            let through = self.marks[self.marks.len() - 1].position;
            // Adjacent marks never coincide, but a zero-length direction
            // would poison every later projection.
            if let Some(direction) = scale.project(through, origin).unit() {
                self.line = Some(DefinedLine { origin, direction });
            }
        }

        MarkOutcome::Set(fix)
    }

    /// The current line, once two marks have been recorded.
    pub fn defined(&self) -> Option<DefinedLine> {
        self.line
    }

    /// All recorded marks, oldest first.
    pub fn marks(&self) -> &[Fix] {
        &self.marks
    }
}
