//! Diagnostic codes with category prefixes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The subsystem a diagnostic originates from, which determines its prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Generic errors, prefixed with `E`.
    Error,
    /// Generic warnings, prefixed with `W`.
    Warning,
    /// Placement legality and cost consistency, prefixed with `P`.
    Placement,
    /// Timing analysis, prefixed with `T`.
    Timing,
    /// Network-on-chip cost and routing, prefixed with `N`.
    Noc,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
            Category::Placement => 'P',
            Category::Timing => 'T',
            Category::Noc => 'N',
        }
    }
}

/// A category prefix plus a number, displayed as e.g. `P101`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_prefixes() {
        assert_eq!(Category::Error.prefix(), 'E');
        assert_eq!(Category::Warning.prefix(), 'W');
        assert_eq!(Category::Placement.prefix(), 'P');
        assert_eq!(Category::Timing.prefix(), 'T');
        assert_eq!(Category::Noc.prefix(), 'N');
    }

    #[test]
    fn display_format() {
        assert_eq!(DiagnosticCode::new(Category::Placement, 101).to_string(), "P101");
        assert_eq!(DiagnosticCode::new(Category::Noc, 3).to_string(), "N003");
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagnosticCode::new(Category::Timing, 42);
        let json = serde_json::to_string(&code).unwrap();
        let back: DiagnosticCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }
}
