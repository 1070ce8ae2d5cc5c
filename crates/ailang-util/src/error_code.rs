//! Stable error codes (§6.3).
//!
//! The teacher's `DiagnosticCode` (`prefix` + running `number`) models an
//! open, ever-growing code space appropriate for a general-purpose compiler.
//! AILANG's vocabulary is the opposite: it is closed and pinned by the
//! specification, and CI5 requires that it never silently drift. A plain
//! exhaustively-matched enum enforces that at compile time — adding a code
//! means touching this file and every `match` over it, which is the point.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Elaboration (§4.1)
    Elb001UnknownConstructor,
    Elb002UnknownName,
    Elb003ArityMismatch,
    Elb004InvalidEffectLabel,

    // Kinds (§4.3)
    Knd001KindMismatch,

    // Type checking (§4.3)
    Typ001UnifyFail,
    Typ002OccursCheck,

    // Row unification (§4.4)
    Row001ClosedRowMissingLabels,
    Row002RowMismatch,

    // Class resolution (§4.7)
    Cls001NoInstance,
    Cls002OverlappingInstances,
    Cls003MissingMethod,
    Cls004AmbiguousConstraint,

    // Module imports
    Imp011ImportConflict,

    // Linking (§4.9)
    Lnk001BuiltinNotFound,
    Lnk002AdtFactoryNotFound,
    Lnk003SymbolNotExported,
    Lnk004ModuleNotLoaded,
    Lnk005DictionaryNotFound,
    Lnk006AnfViolation,

    // Runtime (§4.10)
    RtUnbound,
    RtArity,
    RtType,
    RtMatch,
    RtDiv0,
    RtDictMethod,
    RtUnelaborated,
    RtCap,
}

impl ErrorCode {
    /// The exact stable string used in reports and golden tests (§6.3, CI5).
    pub const fn as_str(self) -> &'static str {
        use ErrorCode::*;
        match self {
            Elb001UnknownConstructor => "ELB001",
            Elb002UnknownName => "ELB002",
            Elb003ArityMismatch => "ELB003",
            Elb004InvalidEffectLabel => "ELB004",
            Knd001KindMismatch => "KND001",
            Typ001UnifyFail => "TYP001",
            Typ002OccursCheck => "TYP002",
            Row001ClosedRowMissingLabels => "ROW001",
            Row002RowMismatch => "ROW002",
            Cls001NoInstance => "CLS001",
            Cls002OverlappingInstances => "CLS002",
            Cls003MissingMethod => "CLS003",
            Cls004AmbiguousConstraint => "CLS004",
            Imp011ImportConflict => "IMP011",
            Lnk001BuiltinNotFound => "LNK001",
            Lnk002AdtFactoryNotFound => "LNK002",
            Lnk003SymbolNotExported => "LNK003",
            Lnk004ModuleNotLoaded => "LNK004",
            Lnk005DictionaryNotFound => "LNK005",
            Lnk006AnfViolation => "LNK006",
            RtUnbound => "RT_UNBOUND",
            RtArity => "RT_ARITY",
            RtType => "RT_TYPE",
            RtMatch => "RT_MATCH",
            RtDiv0 => "RT_DIV0",
            RtDictMethod => "RT_DICT_METHOD",
            RtUnelaborated => "RT_UNELABORATED",
            RtCap => "RT_CAP",
        }
    }

    /// True for the host-level fatal invariant breaches §4.10 and §7 single
    /// out as distinct from ordinary `ErrorValue` propagation.
    pub const fn is_fatal_invariant_breach(self) -> bool {
        matches!(self, ErrorCode::RtUnelaborated)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_to_their_pinned_strings() {
        assert_eq!(ErrorCode::Elb004InvalidEffectLabel.as_str(), "ELB004");
        assert_eq!(ErrorCode::RtDictMethod.as_str(), "RT_DICT_METHOD");
    }

    #[test]
    fn unelaborated_is_the_only_fatal_breach() {
        assert!(ErrorCode::RtUnelaborated.is_fatal_invariant_breach());
        assert!(!ErrorCode::RtDiv0.is_fatal_invariant_breach());
    }
}
