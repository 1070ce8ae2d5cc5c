//! Interned identifiers.
//!
//! A [`Symbol`] is a 4-byte handle to a string held in a process-global,
//! concurrently-writable table. Comparing symbols is an index comparison;
//! recovering the underlying text is an O(n) lookup and should stay off hot
//! paths (error rendering, `show`, debug output).

mod interner;

pub use interner::STRING_TABLE;

/// Snapshot of interner activity, exposed for diagnostics/benchmarks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InternerStats {
    pub count: usize,
    pub capacity: usize,
    pub collisions: usize,
    pub hits: usize,
    pub misses: usize,
}

impl InternerStats {
    pub fn load_factor(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.count as f64 / self.capacity as f64
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    pub(crate) index: u32,
}

impl std::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Surface keywords (§6.1). Indices are assigned in interner.rs's
// `initialize_known_symbols` list, in this same order.
pub const KW_MODULE: Symbol = Symbol { index: 0 };
pub const KW_IMPORT: Symbol = Symbol { index: 1 };
pub const KW_EXPORT: Symbol = Symbol { index: 2 };
pub const KW_FUNC: Symbol = Symbol { index: 3 };
pub const KW_TYPE: Symbol = Symbol { index: 4 };
pub const KW_LET: Symbol = Symbol { index: 5 };
pub const KW_IN: Symbol = Symbol { index: 6 };
pub const KW_IF: Symbol = Symbol { index: 7 };
pub const KW_THEN: Symbol = Symbol { index: 8 };
pub const KW_ELSE: Symbol = Symbol { index: 9 };
pub const KW_MATCH: Symbol = Symbol { index: 10 };
pub const KW_WITH: Symbol = Symbol { index: 11 };
pub const KW_TRUE: Symbol = Symbol { index: 12 };
pub const KW_FALSE: Symbol = Symbol { index: 13 };

// Closed effect-label vocabulary (§6.1).
pub const EFF_IO: Symbol = Symbol { index: 14 };
pub const EFF_FS: Symbol = Symbol { index: 15 };
pub const EFF_NET: Symbol = Symbol { index: 16 };
pub const EFF_CLOCK: Symbol = Symbol { index: 17 };
pub const EFF_RAND: Symbol = Symbol { index: 18 };
pub const EFF_DB: Symbol = Symbol { index: 19 };
pub const EFF_TRACE: Symbol = Symbol { index: 20 };
pub const EFF_ASYNC: Symbol = Symbol { index: 21 };

/// All eight effect labels, in the canonical sort order used for row
/// display and hashing (§3.2).
pub const EFFECT_LABELS: [Symbol; 8] = [
    EFF_IO, EFF_FS, EFF_NET, EFF_CLOCK, EFF_RAND, EFF_DB, EFF_TRACE, EFF_ASYNC,
];

// Primitive type names, CamelCase-normalized form used in dictionary keys
// and `show` output (§4.7).
pub const TY_INT: Symbol = Symbol { index: 22 };
pub const TY_FLOAT: Symbol = Symbol { index: 23 };
pub const TY_STRING: Symbol = Symbol { index: 24 };
pub const TY_BOOL: Symbol = Symbol { index: 25 };
pub const TY_UNIT: Symbol = Symbol { index: 26 };
pub const CLASS_NUM: Symbol = Symbol { index: 27 };
pub const CLASS_FRACTIONAL: Symbol = Symbol { index: 28 };

// Operator→method mapping (§4.7), pinned; must not drift.
pub const METHOD_ADD: Symbol = Symbol { index: 29 };
pub const METHOD_SUB: Symbol = Symbol { index: 30 };
pub const METHOD_MUL: Symbol = Symbol { index: 31 };
pub const METHOD_DIV: Symbol = Symbol { index: 32 };
pub const METHOD_MOD: Symbol = Symbol { index: 33 };
pub const METHOD_EQ: Symbol = Symbol { index: 34 };
pub const METHOD_NEQ: Symbol = Symbol { index: 35 };
pub const METHOD_LT: Symbol = Symbol { index: 36 };
pub const METHOD_LTE: Symbol = Symbol { index: 37 };
pub const METHOD_GT: Symbol = Symbol { index: 38 };
pub const METHOD_GTE: Symbol = Symbol { index: 39 };
pub const METHOD_NOT: Symbol = Symbol { index: 40 };
pub const METHOD_NEG: Symbol = Symbol { index: 41 };

// Synthetic module names (§3.4, §4.8).
pub const MODULE_BUILTIN: Symbol = Symbol { index: 42 };
pub const MODULE_ADT: Symbol = Symbol { index: 43 };

impl Symbol {
    /// Interns `string`, returning a stable handle. Thread-safe.
    pub fn intern(string: &str) -> Self {
        STRING_TABLE.intern(string)
    }

    /// Recovers the original text. O(n) in the number of interned strings;
    /// prefer comparing `Symbol`s directly over round-tripping through text.
    pub fn as_str(&self) -> &'static str {
        STRING_TABLE
            .get(*self)
            .expect("Symbol::as_str called with a symbol from a different interner instance")
    }

    /// True if `self` is one of the constants declared above (keyword,
    /// effect label, primitive type name, or pinned method name).
    pub fn is_known(&self) -> bool {
        self.index < 44
    }

    pub fn eq_str(&self, s: &str) -> bool {
        self.as_str() == s
    }

    pub fn stats() -> InternerStats {
        STRING_TABLE.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_round_trips() {
        let s = Symbol::intern("my_identifier");
        assert_eq!(s.as_str(), "my_identifier");
        assert!(!s.is_known());
    }

    #[test]
    fn keyword_constants_match_their_text() {
        assert_eq!(KW_MODULE.as_str(), "module");
        assert_eq!(KW_MATCH.as_str(), "match");
        assert!(KW_MODULE.is_known());
    }

    #[test]
    fn effect_labels_are_distinct_and_known() {
        let set: std::collections::HashSet<_> = EFFECT_LABELS.iter().collect();
        assert_eq!(set.len(), EFFECT_LABELS.len());
        assert!(EFFECT_LABELS.iter().all(Symbol::is_known));
    }

    #[test]
    fn method_mapping_constants_match_text() {
        assert_eq!(METHOD_ADD.as_str(), "add");
        assert_eq!(METHOD_NEG.as_str(), "neg");
    }
}
