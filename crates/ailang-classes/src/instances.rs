//! The canonical (class, type, method) instance table (§4.7), restated
//! independently of [`ailang_rt`]'s runtime dictionary build — the two are
//! deliberately kept as separate statements of the same fixed four-class
//! surface rather than one crate importing the other, since one lists
//! method *names* for [`crate::Solver`] scoping and the other builds actual
//! callable dictionary values; the pinned method-per-class shape is the one
//! invariant they must agree on.

use ailang_util::symbol::{self, Symbol};

/// `Bool`'s class — distinct from the numeric classes but still pinned to a
/// single type head, same as `Num`/`Fractional`.
pub fn class_eq() -> Symbol {
    Symbol::intern("Eq")
}

/// `String`'s class.
pub fn class_ord() -> Symbol {
    Symbol::intern("Ord")
}

/// One (class, type head, methods) group, mirroring the op-lowering naming
/// convention `{method}_{Type}` used for every builtin dictionary target.
fn groups() -> Vec<(Symbol, Symbol, Vec<Symbol>)> {
    vec![
        (
            symbol::CLASS_NUM,
            symbol::TY_INT,
            vec![
                symbol::METHOD_ADD,
                symbol::METHOD_SUB,
                symbol::METHOD_MUL,
                symbol::METHOD_DIV,
                symbol::METHOD_MOD,
                symbol::METHOD_EQ,
                symbol::METHOD_NEQ,
                symbol::METHOD_LT,
                symbol::METHOD_LTE,
                symbol::METHOD_GT,
                symbol::METHOD_GTE,
                symbol::METHOD_NEG,
            ],
        ),
        (
            symbol::CLASS_FRACTIONAL,
            symbol::TY_FLOAT,
            vec![
                symbol::METHOD_ADD,
                symbol::METHOD_SUB,
                symbol::METHOD_MUL,
                symbol::METHOD_DIV,
                symbol::METHOD_MOD,
                symbol::METHOD_EQ,
                symbol::METHOD_NEQ,
                symbol::METHOD_LT,
                symbol::METHOD_LTE,
                symbol::METHOD_GT,
                symbol::METHOD_GTE,
                symbol::METHOD_NEG,
            ],
        ),
        (class_eq(), symbol::TY_BOOL, vec![symbol::METHOD_EQ, symbol::METHOD_NEQ, symbol::METHOD_NOT]),
        (
            class_ord(),
            symbol::TY_STRING,
            vec![
                symbol::METHOD_EQ,
                symbol::METHOD_NEQ,
                symbol::METHOD_LT,
                symbol::METHOD_LTE,
                symbol::METHOD_GT,
                symbol::METHOD_GTE,
            ],
        ),
    ]
}

/// The class a (method, type head) pair resolves to, for sites where the
/// type checker only knows the concrete type and needs the real class
/// before asking [`crate::Solver`] to resolve — e.g. `Bool == Bool` is
/// `Eq`, not `Num`, even though every overloadable `BinOp` site starts out
/// tagged with `Num` as a defaulting-safe placeholder.
pub fn class_for_method_and_type(method: Symbol, type_head: Symbol) -> Option<Symbol> {
    groups()
        .into_iter()
        .find(|(_, ty, methods)| *ty == type_head && methods.contains(&method))
        .map(|(class, _, _)| class)
}

/// All `(class, type_head, method)` instance triples whose class owns
/// `method`, pre-scoped to that one method the way [`crate::Solver`]
/// requires — passing the full four-group table to one `Solver` would let
/// `Eq`-and-`Ord`-sharing methods on the same type head collide, since
/// `Solver::method_for` looks instances up by `(class, type_head)` alone.
pub fn instances_for_method(method: Symbol) -> Vec<(Symbol, Symbol, Symbol)> {
    groups()
        .into_iter()
        .filter(|(_, _, methods)| methods.contains(&method))
        .map(|(class, ty, _)| (class, ty, method))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_on_int_resolves_to_num() {
        assert_eq!(class_for_method_and_type(symbol::METHOD_ADD, symbol::TY_INT), Some(symbol::CLASS_NUM));
    }

    #[test]
    fn add_on_float_resolves_to_fractional() {
        assert_eq!(class_for_method_and_type(symbol::METHOD_ADD, symbol::TY_FLOAT), Some(symbol::CLASS_FRACTIONAL));
    }

    #[test]
    fn eq_on_bool_resolves_to_eq_class() {
        assert_eq!(class_for_method_and_type(symbol::METHOD_EQ, symbol::TY_BOOL), Some(class_eq()));
    }

    #[test]
    fn instances_for_eq_method_covers_all_four_type_heads() {
        let instances = instances_for_method(symbol::METHOD_EQ);
        assert_eq!(instances.len(), 4);
    }

    #[test]
    fn instances_for_neg_method_covers_only_int_and_float() {
        let instances = instances_for_method(symbol::METHOD_NEG);
        assert_eq!(instances.len(), 2);
    }
}
