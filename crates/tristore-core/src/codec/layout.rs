//! Table layouts (physical sort orders).

use std::fmt;

/// A triple position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Subject,
    Predicate,
    Object,
}

/// Physical sort order of a table.
///
/// All layouts hold the same logical quad set, so every singly or doubly
/// bound pattern is a contiguous range in at least one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableLayout {
    /// subject, predicate, object
    Spo,
    /// predicate, object, subject
    Po,
    /// object, subject, predicate
    Osp,
}

impl TableLayout {
    pub const ALL: [TableLayout; 3] = [TableLayout::Spo, TableLayout::Po, TableLayout::Osp];

    /// Positions in row order.
    pub fn order(&self) -> [Position; 3] {
        match self {
            TableLayout::Spo => [Position::Subject, Position::Predicate, Position::Object],
            TableLayout::Po => [Position::Predicate, Position::Object, Position::Subject],
            TableLayout::Osp => [Position::Object, Position::Subject, Position::Predicate],
        }
    }

    /// The position that leads the row (and is hashed in hash-prefixed tables).
    pub fn leading(&self) -> Position {
        self.order()[0]
    }

    /// Short table suffix.
    pub fn name(&self) -> &'static str {
        match self {
            TableLayout::Spo => "spo",
            TableLayout::Po => "po",
            TableLayout::Osp => "osp",
        }
    }
}

impl fmt::Display for TableLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
