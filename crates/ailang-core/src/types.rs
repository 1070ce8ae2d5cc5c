//! The type universe (§3.2) and rows (§4.4).
//!
//! Type nodes form an arena+index structure rather than a pointer graph
//! (§9): unification variables are named by [`InferId`] and row variables by
//! [`RowVarId`], both dense indices into side tables the checker owns, so
//! substitution touches one slot instead of walking every term that
//! mentions the variable.

use ailang_util::{define_idx, Symbol};
use std::collections::BTreeMap;

define_idx!(
    /// A unification variable (`TypeVar` in §3.2).
    pub struct InferId
);

define_idx!(
    /// A row variable — the `ρ` tail of an open record or effect row.
    pub struct RowVarId
);

/// Classifies type nodes themselves so the unifier can reject e.g. unifying
/// a `*`-kinded variable with a row (§3.2, KND001).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Star,
    Effect,
    Row(Box<Kind>),
    Record,
}

/// A row of labeled entries plus an optional open tail. Used unmodified
/// (§4.4) for both record fields (`V = Type`) and effect labels
/// (`V = ()`, presence-only).
#[derive(Clone, Debug, PartialEq)]
pub struct Row<V> {
    pub fields: BTreeMap<Symbol, V>,
    pub tail: Option<RowVarId>,
}

impl<V> Row<V> {
    pub fn closed(fields: BTreeMap<Symbol, V>) -> Self {
        Row { fields, tail: None }
    }

    pub fn open(fields: BTreeMap<Symbol, V>, tail: RowVarId) -> Self {
        Row { fields, tail: Some(tail) }
    }

    pub fn is_closed(&self) -> bool {
        self.tail.is_none()
    }

    /// Labels in the stable sort order used for display, hashing, and
    /// golden-test output (§3.2): lexicographic on the label's text, not on
    /// its (arbitrary) intern index.
    pub fn canonical_labels(&self) -> Vec<Symbol> {
        let mut labels: Vec<Symbol> = self.fields.keys().copied().collect();
        labels.sort_by_key(|s| s.as_str());
        labels
    }
}

pub type EffectRow = Row<()>;
pub type FieldRow = Row<Type>;

impl EffectRow {
    pub fn empty() -> Self {
        Row { fields: BTreeMap::new(), tail: None }
    }

    pub fn from_labels(labels: impl IntoIterator<Item = Symbol>) -> Self {
        let mut fields = BTreeMap::new();
        for l in labels {
            fields.insert(l, ());
        }
        Row { fields, tail: None }
    }

    pub fn contains(&self, label: Symbol) -> bool {
        self.fields.contains_key(&label)
    }
}

/// The tagged sum of §3.2. `List`/`Tuple` are written as their own variants
/// even though the source spec calls `TypeList` sugar for
/// `TypeApp(List, elem)` — keeping them distinct avoids re-deriving the
/// `List` constructor's identity every time a list type is built or matched.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Var(InferId, Kind),
    Con(Symbol),
    App(Box<Type>, Vec<Type>),
    Func(Vec<Type>, Box<Type>, EffectRow),
    Record(FieldRow),
    List(Box<Type>),
    Tuple(Vec<Type>),
}

impl Type {
    pub fn int() -> Self {
        Type::Con(ailang_util::symbol::TY_INT)
    }
    pub fn float() -> Self {
        Type::Con(ailang_util::symbol::TY_FLOAT)
    }
    pub fn string() -> Self {
        Type::Con(ailang_util::symbol::TY_STRING)
    }
    pub fn bool() -> Self {
        Type::Con(ailang_util::symbol::TY_BOOL)
    }
    pub fn unit() -> Self {
        Type::Con(ailang_util::symbol::TY_UNIT)
    }

    pub fn kind(&self) -> Kind {
        match self {
            Type::Var(_, k) => k.clone(),
            Type::Record(_) => Kind::Record,
            _ => Kind::Star,
        }
    }

    /// Free unification variables, for generalization (§3.2, §4.3) and the
    /// occurs check.
    pub fn free_vars(&self, out: &mut Vec<InferId>) {
        match self {
            Type::Var(id, _) => out.push(*id),
            Type::Con(_) => {}
            Type::App(ctor, args) => {
                ctor.free_vars(out);
                for a in args {
                    a.free_vars(out);
                }
            }
            Type::Func(params, ret, _eff) => {
                for p in params {
                    p.free_vars(out);
                }
                ret.free_vars(out);
            }
            Type::Record(row) => {
                for v in row.fields.values() {
                    v.free_vars(out);
                }
            }
            Type::List(e) => e.free_vars(out),
            Type::Tuple(elems) => {
                for e in elems {
                    e.free_vars(out);
                }
            }
        }
    }
}

/// `(class_name, type_arg)` predicate (§3.2).
#[derive(Clone, Debug, PartialEq)]
pub struct ClassConstraint {
    pub class: Symbol,
    pub ty: Type,
}

/// `∀ vars. constraints ⇒ type` (§3.2).
#[derive(Clone, Debug, PartialEq)]
pub struct TypeScheme {
    pub vars: Vec<InferId>,
    pub constraints: Vec<ClassConstraint>,
    pub ty: Type,
}

impl TypeScheme {
    /// A scheme with no quantified variables and no constraints — what a
    /// value-restricted (monomorphic) binding gets (§3.2, §4.3).
    pub fn monomorphic(ty: Type) -> Self {
        TypeScheme { vars: Vec::new(), constraints: Vec::new(), ty }
    }

    pub fn is_monomorphic(&self) -> bool {
        self.vars.is_empty()
    }
}
