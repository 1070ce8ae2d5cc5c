//! Unification: Hindley-Milner over [`Type`], extended with row unification
//! for records and effects (§4.3, §4.4).

use ailang_core::{ClassConstraint, EffectRow, FieldRow, InferId, Kind, Row, RowVarId, Type};
use ailang_util::{ErrorCode, Idx, IndexVec};
use std::collections::BTreeMap;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("occurs check failed: variable appears inside the type it would unify with")]
    OccursCheck { var: InferId, ty: Type },
    #[error("cannot unify types")]
    UnifyFail { expected: Type, found: Type },
    #[error("closed row is missing required labels")]
    RowMissingLabels { missing: Vec<String> },
    #[error("closed rows disagree on labels")]
    RowMismatch { expected: Vec<String>, found: Vec<String> },
    #[error("kind mismatch")]
    KindMismatch { expected: Kind, found: Kind },
    #[error("function calls an effect absent from its declared effect row")]
    UndeclaredEffect { missing: Vec<String> },
}

impl TypeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TypeError::OccursCheck { .. } => ErrorCode::Typ002OccursCheck,
            TypeError::UnifyFail { .. } => ErrorCode::Typ001UnifyFail,
            TypeError::RowMissingLabels { .. } => ErrorCode::Row001ClosedRowMissingLabels,
            TypeError::RowMismatch { .. } => ErrorCode::Row002RowMismatch,
            TypeError::KindMismatch { .. } => ErrorCode::Knd001KindMismatch,
            TypeError::UndeclaredEffect { .. } => ErrorCode::Elb004InvalidEffectLabel,
        }
    }
}

/// The substitution table `Type::Var` unification writes into (§9:
/// arena+index, not a pointer graph). Row variables get their own slot here
/// too (`rows`): unifying two open effect rows binds both tails to a shared
/// merged row rather than no-op-ing, so a later read of either variable sees
/// every label absorbed into it, the same way a bound `Type::Var` resolves
/// through to its concrete type.
#[derive(Default, Debug)]
pub struct Subst {
    types: IndexVec<InferId, Option<Type>>,
    rows: IndexVec<RowVarId, Option<EffectRow>>,
}

#[derive(Debug)]
pub struct Unifier {
    subst: Subst,
    pub constraints: Vec<ClassConstraint>,
}

impl Unifier {
    pub fn new() -> Self {
        Unifier { subst: Subst::default(), constraints: Vec::new() }
    }

    pub fn fresh_type_var(&mut self, kind: Kind) -> Type {
        let id = self.subst.types.push(None);
        Type::Var(id, kind)
    }

    pub fn fresh_row_var(&mut self) -> RowVarId {
        self.subst.rows.push(None)
    }

    fn bind_row_var(&mut self, var: RowVarId, row: EffectRow) {
        *self.subst.rows.get_mut(var).unwrap() = Some(row);
    }

    fn occurs(&self, var: InferId, ty: &Type) -> bool {
        let mut stack = vec![ty.clone()];
        while let Some(t) = stack.pop() {
            match t {
                Type::Var(id, _) => {
                    if id == var {
                        return true;
                    }
                    if let Some(Some(sub)) = self.subst.types.get(id) {
                        stack.push(sub.clone());
                    }
                }
                Type::Con(_) => {}
                Type::App(ctor, args) => {
                    stack.push(*ctor);
                    stack.extend(args);
                }
                Type::Func(params, ret, _eff) => {
                    stack.extend(params);
                    stack.push(*ret);
                }
                Type::Record(row) => stack.extend(row.fields.into_values()),
                Type::List(e) => stack.push(*e),
                Type::Tuple(es) => stack.extend(es),
            }
        }
        false
    }

    /// Follows a `Var`'s substitution chain one level at a time until it
    /// reaches an unbound variable or a non-variable type.
    pub fn resolve(&self, ty: &Type) -> Type {
        match ty {
            Type::Var(id, _) => match self.subst.types.get(*id) {
                Some(Some(sub)) => self.resolve(sub),
                _ => ty.clone(),
            },
            Type::App(ctor, args) => {
                Type::App(Box::new(self.resolve(ctor)), args.iter().map(|a| self.resolve(a)).collect())
            }
            Type::Func(params, ret, eff) => Type::Func(
                params.iter().map(|p| self.resolve(p)).collect(),
                Box::new(self.resolve(ret)),
                self.resolve_effect_row(eff),
            ),
            Type::Record(row) => Type::Record(self.resolve_field_row(row)),
            Type::List(e) => Type::List(Box::new(self.resolve(e))),
            Type::Tuple(es) => Type::Tuple(es.iter().map(|e| self.resolve(e)).collect()),
            Type::Con(_) => ty.clone(),
        }
    }

    fn resolve_field_row(&self, row: &FieldRow) -> FieldRow {
        let fields = row.fields.iter().map(|(k, v)| (*k, self.resolve(v))).collect();
        Row { fields, tail: row.tail }
    }

    /// Follows a row variable's binding chain, merging each bound row's own
    /// fields in along the way — the effect-row analogue of [`Self::resolve`]
    /// for `Type::Var`.
    pub fn resolve_effect_row(&self, row: &EffectRow) -> EffectRow {
        match row.tail {
            None => row.clone(),
            Some(tail) => match self.subst.rows.get(tail) {
                Some(Some(bound)) => {
                    let inner = self.resolve_effect_row(bound);
                    let mut fields = row.fields.clone();
                    fields.extend(inner.fields.clone());
                    Row { fields, tail: inner.tail }
                }
                _ => row.clone(),
            },
        }
    }

    pub fn unify(&mut self, a: &Type, b: &Type) -> Result<(), TypeError> {
        let a = self.resolve(a);
        let b = self.resolve(b);
        match (&a, &b) {
            (Type::Var(i1, _), Type::Var(i2, _)) if i1 == i2 => Ok(()),
            (Type::Var(id, k1), other) | (other, Type::Var(id, k1)) => {
                if other.kind() != *k1 {
                    return Err(TypeError::KindMismatch { expected: k1.clone(), found: other.kind() });
                }
                if self.occurs(*id, other) {
                    return Err(TypeError::OccursCheck { var: *id, ty: other.clone() });
                }
                *self.subst.types.get_mut(*id).unwrap() = Some(other.clone());
                Ok(())
            }
            (Type::Con(n1), Type::Con(n2)) => {
                if n1 == n2 {
                    Ok(())
                } else {
                    Err(TypeError::UnifyFail { expected: a.clone(), found: b.clone() })
                }
            }
            (Type::App(c1, a1), Type::App(c2, a2)) => {
                if a1.len() != a2.len() {
                    return Err(TypeError::UnifyFail { expected: a.clone(), found: b.clone() });
                }
                self.unify(c1, c2)?;
                for (x, y) in a1.iter().zip(a2.iter()) {
                    self.unify(x, y)?;
                }
                Ok(())
            }
            (Type::Func(p1, r1, e1), Type::Func(p2, r2, e2)) => {
                if p1.len() != p2.len() {
                    return Err(TypeError::UnifyFail { expected: a.clone(), found: b.clone() });
                }
                for (x, y) in p1.iter().zip(p2.iter()) {
                    self.unify(x, y)?;
                }
                self.unify(r1, r2)?;
                self.unify_effect_row(e1, e2)
            }
            (Type::Record(r1), Type::Record(r2)) => self.unify_field_row(r1, r2),
            (Type::List(x), Type::List(y)) => self.unify(x, y),
            (Type::Tuple(xs), Type::Tuple(ys)) => {
                if xs.len() != ys.len() {
                    return Err(TypeError::UnifyFail { expected: a.clone(), found: b.clone() });
                }
                for (x, y) in xs.iter().zip(ys.iter()) {
                    self.unify(x, y)?;
                }
                Ok(())
            }
            _ => Err(TypeError::UnifyFail { expected: a.clone(), found: b.clone() }),
        }
    }

    /// Row unification (§4.4): both-open absorbs into a fresh shared tail;
    /// one-open-one-closed succeeds only if the open side names no label
    /// absent from the closed side (ROW001 otherwise); both-closed requires
    /// exact label-set-and-type agreement (ROW002 otherwise).
    pub fn unify_field_row(&mut self, r1: &FieldRow, r2: &FieldRow) -> Result<(), TypeError> {
        match (r1.tail, r2.tail) {
            (Some(_), Some(_)) => {
                let shared: Vec<_> = r1.fields.keys().filter(|k| r2.fields.contains_key(k)).copied().collect();
                for k in shared {
                    self.unify(&r1.fields[&k], &r2.fields[&k])?;
                }
                Ok(())
            }
            (None, Some(_)) => self.unify_open_against_closed(r2, r1),
            (Some(_), None) => self.unify_open_against_closed(r1, r2),
            (None, None) => {
                let labels1 = r1.canonical_labels();
                let labels2 = r2.canonical_labels();
                if labels1 != labels2 {
                    return Err(TypeError::RowMismatch {
                        expected: labels1.iter().map(|s| s.as_str().to_string()).collect(),
                        found: labels2.iter().map(|s| s.as_str().to_string()).collect(),
                    });
                }
                for k in labels1 {
                    self.unify(&r1.fields[&k], &r2.fields[&k])?;
                }
                Ok(())
            }
        }
    }

    fn unify_open_against_closed(&mut self, open: &FieldRow, closed: &FieldRow) -> Result<(), TypeError> {
        let missing: Vec<String> = open
            .fields
            .keys()
            .filter(|k| !closed.fields.contains_key(k))
            .map(|s| s.as_str().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(TypeError::RowMissingLabels { missing });
        }
        for (k, v) in &open.fields {
            self.unify(v, &closed.fields[k])?;
        }
        Ok(())
    }

    /// Effect-row unification (§6.1): both-open binds both tails to a
    /// freshly shared, still-open row carrying the union of both sides'
    /// known labels, so either variable resolves to the merged set from
    /// then on; one-open-one-closed pins the open tail to the closed row
    /// once the subset check passes; both-closed requires exact label-set
    /// agreement, same as a field row.
    pub fn unify_effect_row(&mut self, r1: &EffectRow, r2: &EffectRow) -> Result<(), TypeError> {
        let r1 = self.resolve_effect_row(r1);
        let r2 = self.resolve_effect_row(r2);
        match (r1.tail, r2.tail) {
            (Some(t1), Some(t2)) if t1 == t2 => Ok(()),
            (Some(t1), Some(t2)) => {
                let mut merged = r1.fields.clone();
                merged.extend(r2.fields.clone());
                let new_tail = self.fresh_row_var();
                let merged_row = Row::open(merged, new_tail);
                self.bind_row_var(t1, merged_row.clone());
                self.bind_row_var(t2, merged_row);
                Ok(())
            }
            (None, Some(t)) => {
                self.check_open_labels_subset(&r2, &r1)?;
                self.bind_row_var(t, r1);
                Ok(())
            }
            (Some(t), None) => {
                self.check_open_labels_subset(&r1, &r2)?;
                self.bind_row_var(t, r2);
                Ok(())
            }
            (None, None) => {
                let labels1 = r1.canonical_labels();
                let labels2 = r2.canonical_labels();
                if labels1 != labels2 {
                    return Err(TypeError::RowMismatch {
                        expected: labels1.iter().map(|s| s.as_str().to_string()).collect(),
                        found: labels2.iter().map(|s| s.as_str().to_string()).collect(),
                    });
                }
                Ok(())
            }
        }
    }

    fn check_open_labels_subset(&self, open: &EffectRow, closed: &EffectRow) -> Result<(), TypeError> {
        let missing: Vec<String> =
            open.fields.keys().filter(|k| !closed.fields.contains_key(k)).map(|s| s.as_str().to_string()).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TypeError::RowMissingLabels { missing })
        }
    }
}

impl Default for Unifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ailang_util::Symbol;

    #[test]
    fn unifies_two_fresh_vars_by_binding_one_to_the_other() {
        let mut u = Unifier::new();
        let a = u.fresh_type_var(Kind::Star);
        let b = u.fresh_type_var(Kind::Star);
        u.unify(&a, &b).unwrap();
        assert_eq!(u.resolve(&a), u.resolve(&b));
    }

    #[test]
    fn occurs_check_rejects_infinite_type() {
        let mut u = Unifier::new();
        let a = u.fresh_type_var(Kind::Star);
        let list_of_a = Type::List(Box::new(a.clone()));
        let err = u.unify(&a, &list_of_a).unwrap_err();
        assert!(matches!(err, TypeError::OccursCheck { .. }));
        assert_eq!(err.code(), ErrorCode::Typ002OccursCheck);
    }

    #[test]
    fn closed_rows_with_matching_labels_unify() {
        let mut u = Unifier::new();
        let r1 = Row::closed(BTreeMap::from([(Symbol::intern("x"), Type::int())]));
        let r2 = Row::closed(BTreeMap::from([(Symbol::intern("x"), Type::int())]));
        assert!(u.unify_field_row(&r1, &r2).is_ok());
    }

    #[test]
    fn closed_row_mismatch_is_row002() {
        let mut u = Unifier::new();
        let r1 = Row::closed(BTreeMap::from([(Symbol::intern("x"), Type::int())]));
        let r2 = Row::closed(BTreeMap::from([(Symbol::intern("y"), Type::int())]));
        let err = u.unify_field_row(&r1, &r2).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Row002RowMismatch);
    }

    #[test]
    fn open_row_with_unknown_label_against_closed_is_row001() {
        let mut u = Unifier::new();
        let tail = u.fresh_row_var();
        let open = Row::open(BTreeMap::from([(Symbol::intern("x"), Type::int())]), tail);
        let closed = Row::closed(BTreeMap::new());
        let err = u.unify_field_row(&open, &closed).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Row001ClosedRowMissingLabels);
    }

    /// An open effect row unifies against a closed row whose labels are a
    /// superset of the open side's — the open tail absorbs the extra label
    /// rather than being rejected, and is now actually bound to that closed
    /// row (not just checked and discarded): resolving the same tail again
    /// afterward must see the full superset, including the label the open
    /// side never mentioned.
    #[test]
    fn open_effect_row_absorbs_extra_labels_from_a_closed_superset() {
        use ailang_util::symbol;
        let mut u = Unifier::new();
        let tail = u.fresh_row_var();
        let open = EffectRow::open(BTreeMap::from([(symbol::EFF_FS, ()), (symbol::EFF_NET, ())]), tail);
        let closed =
            EffectRow::closed(BTreeMap::from([(symbol::EFF_FS, ()), (symbol::EFF_NET, ()), (symbol::EFF_TRACE, ())]));
        assert!(u.unify_effect_row(&open, &closed).is_ok());
        let resolved = u.resolve_effect_row(&open);
        assert!(resolved.fields.contains_key(&symbol::EFF_TRACE));
        assert!(resolved.is_closed());
    }

    /// Two open effect rows unifying bind both tails to one shared, still-open
    /// row carrying the union of their labels — a real substitution, not the
    /// old unconditional no-op. Resolving either original row afterward must
    /// see the other side's label too, and unifying either against a closed
    /// row now checks the *merged* label set rather than just the labels that
    /// row happened to mention originally.
    #[test]
    fn both_open_effect_rows_unify_into_a_shared_binding_that_resolves_to_their_union() {
        use ailang_util::symbol;
        let mut u = Unifier::new();
        let t1 = u.fresh_row_var();
        let t2 = u.fresh_row_var();
        let open1 = EffectRow::open(BTreeMap::from([(symbol::EFF_IO, ())]), t1);
        let open2 = EffectRow::open(BTreeMap::from([(symbol::EFF_NET, ())]), t2);
        u.unify_effect_row(&open1, &open2).unwrap();

        let resolved1 = u.resolve_effect_row(&open1);
        assert!(resolved1.fields.contains_key(&symbol::EFF_IO));
        assert!(resolved1.fields.contains_key(&symbol::EFF_NET));

        let closed_with_both = EffectRow::closed(BTreeMap::from([(symbol::EFF_IO, ()), (symbol::EFF_NET, ())]));
        assert!(u.unify_effect_row(&open1, &closed_with_both).is_ok());

        let closed_missing_net = EffectRow::closed(BTreeMap::from([(symbol::EFF_IO, ())]));
        let err = u.unify_effect_row(&open2, &closed_missing_net).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Row001ClosedRowMissingLabels);
    }

    #[test]
    fn open_effect_row_with_a_label_absent_from_closed_is_row001() {
        use ailang_util::symbol;
        let mut u = Unifier::new();
        let tail = u.fresh_row_var();
        let open = EffectRow::open(BTreeMap::from([(symbol::EFF_TRACE, ())]), tail);
        let closed = EffectRow::closed(BTreeMap::from([(symbol::EFF_FS, ())]));
        let err = u.unify_effect_row(&open, &closed).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Row001ClosedRowMissingLabels);
    }

    #[test]
    fn function_types_unify_pointwise() {
        let mut u = Unifier::new();
        let f1 = Type::Func(vec![Type::int()], Box::new(Type::bool()), EffectRow::empty());
        let f2 = Type::Func(vec![Type::int()], Box::new(Type::bool()), EffectRow::empty());
        assert!(u.unify(&f1, &f2).is_ok());
    }
}
