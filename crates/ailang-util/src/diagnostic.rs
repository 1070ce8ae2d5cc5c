//! Diagnostic reporting (§7).
//!
//! A `Diagnostic` is a value, never a thrown exception: every fallible stage
//! returns them instead of unwinding. `Handler` accumulates diagnostics so a
//! pass can be "best-effort" (collect several errors, still return `Err` at
//! the end) the way §7 requires of the elaborator and the linker.

use crate::{ErrorCode, Pos};
use std::cell::RefCell;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
    Note,
    Help,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Note => write!(f, "note"),
            Level::Help => write!(f, "help"),
        }
    }
}

/// A single compiler diagnostic: a stable code, a primary position, a
/// human-readable message, and any secondary positions/notes/suggestions
/// the producing pass could offer (§7 "structured suggestion").
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub level: Level,
    pub code: ErrorCode,
    pub message: String,
    pub primary: Pos,
    pub secondary: Vec<(Pos, String)>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn error(code: ErrorCode, message: impl Into<String>, primary: Pos) -> Self {
        Diagnostic {
            level: Level::Error,
            code,
            message: message.into(),
            primary,
            secondary: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
        }
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>, primary: Pos) -> Self {
        Diagnostic {
            level: Level::Warning,
            ..Self::error(code, message, primary)
        }
    }

    pub fn with_secondary(mut self, pos: Pos, note: impl Into<String>) -> Self {
        self.secondary.push((pos, note.into()));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}] {} at {}", self.level, self.code, self.message, self.primary)
    }
}

impl std::error::Error for Diagnostic {}

/// Accumulates diagnostics for a pass that keeps going after the first
/// failure (§7: elaborator is best-effort, linker reports every unresolved
/// reference before giving up).
#[derive(Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    pub fn new() -> Self {
        Handler::default()
    }

    pub fn emit(&self, diag: Diagnostic) {
        self.diagnostics.borrow_mut().push(diag);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.level == Level::Error)
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics.into_inner()
    }

    pub fn diagnostics(&self) -> std::cell::Ref<'_, Vec<Diagnostic>> {
        self.diagnostics.borrow()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Symbol;

    fn pos() -> Pos {
        Pos::new(Symbol::intern("t.ail"), 1, 1)
    }

    #[test]
    fn handler_tracks_has_errors_but_not_warnings() {
        let h = Handler::new();
        h.emit(Diagnostic::warning(ErrorCode::Cls004AmbiguousConstraint, "hm", pos()));
        assert!(!h.has_errors());
        h.emit(Diagnostic::error(ErrorCode::Typ001UnifyFail, "nope", pos()));
        assert!(h.has_errors());
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn diagnostic_display_includes_code_and_position() {
        let d = Diagnostic::error(ErrorCode::RtDiv0, "division by zero", pos());
        let s = d.to_string();
        assert!(s.contains("RT_DIV0"));
        assert!(s.contains("t.ail"));
    }
}
