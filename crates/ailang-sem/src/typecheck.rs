//! Program-level type inference (§4.3): Algorithm W over [`ailang_core::Expr`]
//! trees, producing a substitution (the [`Unifier`] already built for
//! unification alone) plus a `NodeId`-keyed list of overloaded-operator call
//! sites for [`ailang_classes`] to resolve into dictionaries.
//!
//! Top-level `Let`/`LetRec` bindings are generalized under the syntactic
//! value restriction (§4.3): a binding whose right-hand side is a syntactic
//! value (a literal, a variable, a lambda, or an aggregate built purely from
//! values — see [`is_syntactic_value`]) is quantified over every type
//! variable free in its inferred type but not free elsewhere in the
//! environment, and every later reference to that name gets its own fresh
//! instantiation of the resulting [`TypeScheme`] (see
//! [`Checker::instantiate`]). A binding that fails the restriction — most
//! commonly because its value is itself an application — is checked
//! monomorphically, same as a lambda parameter or a nested (non-top-level)
//! `let`: this pass only generalizes at the top level, matching how the
//! elaborator's SCC grouping already treats a mutually-recursive group as
//! one generalization unit (`group_by_scc`'s doc comment).
//!
//! [`ConstructorMap`] carries no field types, so an ADT constructor's
//! arguments are checked only enough to surface their own internal type
//! errors; the constructor's result type is always `Type::Con(type_name)`
//! and pattern-bound sub-names get fresh, unconstrained variables.
//!
//! A binding's declared effect row (carried on [`ailang_core::BindingMeta`])
//! is checked here too, against its *inferred* row rather than by scanning
//! its body for builtin calls: every `App` unifies the callee's effect row
//! into a per-binding ambient row (see [`Checker::current_effect_row`]) via
//! [`crate::infer::Unifier::unify_effect_row`]'s real row-variable
//! substitution, and once a binding's value is fully inferred, its ambient
//! (or, for a function, its inferred arrow type's own row) is unified
//! against the declared row — a genuine effect-subset check, not an AST walk.

use ailang_core::{
    ClassConstraint, ConstructorMap, EffectRow, Expr as CoreExpr, FieldRow, InferId, Kind, Pattern as CorePattern,
    Program, Row, TopLevel, Type, TypeScheme,
};
use ailang_syntax::{BinOpKind, Literal, UnOpKind};
use ailang_util::{symbol, FxHashMap, FxHashSet, NodeId, Symbol};

use crate::infer::{TypeError, Unifier};

/// One overloadable `BinOp`/`UnOp` call site, collected during inference for
/// later resolution (§4.7). `constraint.class` starts out tagged with
/// [`symbol::CLASS_NUM`] regardless of the real operator — the only class
/// [`ailang_classes::DefaultTable`] can default to when the operand type is
/// still unresolved — and the driver recomputes the real class from the
/// unifier-resolved concrete type head before handing this to
/// [`ailang_classes::Solver`].
#[derive(Debug, Clone)]
pub struct OverloadSite {
    pub node_id: NodeId,
    pub method: Symbol,
    pub constraint: ClassConstraint,
}

/// The result of inferring one program: the substitution every collected
/// type should be read back through, the overload sites awaiting class
/// resolution, and each top-level binding's own inferred monotype (its
/// scheme's body, before quantification — see [`InferenceResult::binding_types`]).
#[derive(Debug)]
pub struct InferenceResult {
    pub unifier: Unifier,
    pub sites: Vec<OverloadSite>,
    pub binding_types: FxHashMap<Symbol, Type>,
}

/// The pinned operator→method mapping (§4.7), mirrored from the
/// elaborator's `is_overloadable_binop` gate — every `BinOp` node reaching
/// this checker is one of these, since anything else became `Intrinsic`
/// during elaboration.
pub fn method_for_binop(op: BinOpKind) -> Symbol {
    use BinOpKind::*;
    match op {
        Add => symbol::METHOD_ADD,
        Sub => symbol::METHOD_SUB,
        Mul => symbol::METHOD_MUL,
        Div => symbol::METHOD_DIV,
        Mod => symbol::METHOD_MOD,
        Eq => symbol::METHOD_EQ,
        Neq => symbol::METHOD_NEQ,
        Lt => symbol::METHOD_LT,
        Lte => symbol::METHOD_LTE,
        Gt => symbol::METHOD_GT,
        Gte => symbol::METHOD_GTE,
        And | Or | Concat | Cons => {
            unreachable!("non-overloadable operator reached the class-method mapping")
        }
    }
}

fn method_for_unop(op: UnOpKind) -> Symbol {
    match op {
        UnOpKind::Neg => symbol::METHOD_NEG,
        UnOpKind::Not => symbol::METHOD_NOT,
    }
}

fn is_comparison(op: BinOpKind) -> bool {
    use BinOpKind::*;
    matches!(op, Eq | Neq | Lt | Lte | Gt | Gte)
}

fn literal_type(lit: &Literal) -> Type {
    match lit {
        Literal::Int(_) => Type::int(),
        Literal::Float(_) => Type::float(),
        Literal::String(_) => Type::string(),
        Literal::Bool(_) => Type::bool(),
        Literal::Unit => Type::unit(),
    }
}

/// The syntactic value restriction (§4.3): only these shapes are safe to
/// generalize, since anything that performs a computation (an `App`, `If`,
/// `Match`, operator, or record-field projection) could in principle build a
/// different concrete type on each evaluation, and ML-style generalization
/// of such a binding is unsound (the classic `ref` example).
fn is_syntactic_value(expr: &CoreExpr) -> bool {
    match expr {
        CoreExpr::Lit(..) | CoreExpr::Var(..) | CoreExpr::VarGlobal { .. } | CoreExpr::Lambda { .. } => true,
        CoreExpr::Tuple { elems, .. } => elems.iter().all(is_syntactic_value),
        CoreExpr::List { elems, .. } => elems.iter().all(is_syntactic_value),
        CoreExpr::Record { fields, .. } => fields.iter().all(|(_, v)| is_syntactic_value(v)),
        _ => false,
    }
}

/// Replaces every `Type::Var` whose id is a key of `mapping`, leaving
/// anything else untouched — the one substitution [`Checker::instantiate`]
/// needs, independent of the unifier's own substitution table (a scheme's
/// quantified variables were never entered into that table to begin with).
fn substitute(ty: &Type, mapping: &FxHashMap<InferId, Type>) -> Type {
    match ty {
        Type::Var(id, k) => mapping.get(id).cloned().unwrap_or_else(|| Type::Var(*id, k.clone())),
        Type::Con(_) => ty.clone(),
        Type::App(ctor, args) => {
            Type::App(Box::new(substitute(ctor, mapping)), args.iter().map(|a| substitute(a, mapping)).collect())
        }
        Type::Func(params, ret, eff) => Type::Func(
            params.iter().map(|p| substitute(p, mapping)).collect(),
            Box::new(substitute(ret, mapping)),
            eff.clone(),
        ),
        Type::Record(row) => Type::Record(Row {
            fields: row.fields.iter().map(|(k, v)| (*k, substitute(v, mapping))).collect(),
            tail: row.tail,
        }),
        Type::List(e) => Type::List(Box::new(substitute(e, mapping))),
        Type::Tuple(es) => Type::Tuple(es.iter().map(|e| substitute(e, mapping)).collect()),
    }
}

type Env = FxHashMap<Symbol, TypeScheme>;

/// Every type variable free in some binding already in `env`, not counting a
/// scheme's own quantified variables — the set [`Checker::generalize`] must
/// exclude from a new scheme, since a variable still mentioned monomorphically
/// elsewhere in scope is not actually free to generalize.
fn free_vars_of_env(env: &Env, unifier: &Unifier) -> FxHashSet<InferId> {
    let mut out = FxHashSet::default();
    for scheme in env.values() {
        let resolved = unifier.resolve(&scheme.ty);
        let mut vars = Vec::new();
        resolved.free_vars(&mut vars);
        for v in vars {
            if !scheme.vars.contains(&v) {
                out.insert(v);
            }
        }
    }
    out
}

/// Walks one file's worth of top-level bindings, threading a single
/// [`Unifier`] across all of them so a later binding can reference an
/// earlier one's inferred (and, value-restriction permitting, generalized)
/// type.
pub fn infer_program(program: &Program, ctors: &ConstructorMap) -> Result<InferenceResult, TypeError> {
    let mut checker = Checker::new(ctors);
    let mut env: Env = FxHashMap::default();
    let mut binding_types = FxHashMap::default();
    let declared_effects: FxHashMap<Symbol, Option<Vec<Symbol>>> =
        program.meta.iter().map(|m| (m.name, m.effect_annot.clone())).collect();

    for top in &program.bindings {
        match top {
            TopLevel::Let { name, value } => {
                let saved = checker.push_effect_scope();
                let ty = checker.infer(value, &env)?;
                let ambient = checker.pop_effect_scope(saved);
                let resolved = checker.unifier.resolve(&ty);
                checker.check_declared_effects(&resolved, &ambient, declared_effects.get(name).and_then(|e| e.as_deref()))?;
                let scheme = if is_syntactic_value(value) {
                    checker.generalize(&resolved, &env)
                } else {
                    TypeScheme::monomorphic(resolved.clone())
                };
                env.insert(*name, scheme);
                binding_types.insert(*name, resolved);
            }
            TopLevel::LetRec { bindings } => {
                let names: Vec<Symbol> = bindings.iter().map(|(n, _)| *n).collect();
                let placeholders: Vec<Type> =
                    bindings.iter().map(|_| checker.unifier.fresh_type_var(Kind::Star)).collect();
                for (name, placeholder) in names.iter().zip(placeholders.iter()) {
                    env.insert(*name, TypeScheme::monomorphic(placeholder.clone()));
                }
                let mut ambients = Vec::with_capacity(bindings.len());
                for ((_, value), placeholder) in bindings.iter().zip(placeholders.iter()) {
                    let saved = checker.push_effect_scope();
                    let ty = checker.infer(value, &env)?;
                    ambients.push(checker.pop_effect_scope(saved));
                    checker.unifier.unify(placeholder, &ty)?;
                }
                // Drop this group's own placeholders before generalizing any
                // of its members: a sibling's not-yet-regeneralized monomorphic
                // entry would otherwise count its own (about to be quantified)
                // variables as "free elsewhere in scope" and block generalization.
                for name in &names {
                    env.remove(name);
                }
                for (((name, value), placeholder), ambient) in
                    bindings.iter().zip(placeholders.iter()).zip(ambients.iter())
                {
                    let resolved = checker.unifier.resolve(placeholder);
                    checker.check_declared_effects(
                        &resolved,
                        ambient,
                        declared_effects.get(name).and_then(|e| e.as_deref()),
                    )?;
                    let scheme = if is_syntactic_value(value) {
                        checker.generalize(&resolved, &env)
                    } else {
                        TypeScheme::monomorphic(resolved.clone())
                    };
                    env.insert(*name, scheme);
                    binding_types.insert(*name, resolved);
                }
            }
        }
    }

    Ok(InferenceResult { unifier: checker.unifier, sites: checker.sites, binding_types })
}

struct Checker<'a> {
    unifier: Unifier,
    ctors: &'a ConstructorMap,
    sites: Vec<OverloadSite>,
    /// The effect row every `App` in the binding (or lambda body) currently
    /// being inferred unifies its callee's effect row into (§6.1) — swapped
    /// out for a fresh one on entering each [`Checker::push_effect_scope`]
    /// scope, so calling an effectful builtin accumulates into the row of
    /// whichever function actually performs the call, not some unrelated
    /// sibling expression's.
    current_effect_row: EffectRow,
}

impl<'a> Checker<'a> {
    fn new(ctors: &'a ConstructorMap) -> Self {
        let mut unifier = Unifier::new();
        let tail = unifier.fresh_row_var();
        let current_effect_row = EffectRow::open(Default::default(), tail);
        Checker { unifier, ctors, sites: Vec::new(), current_effect_row }
    }

    /// Starts a fresh ambient effect scope, returning the caller's own so it
    /// can be restored with [`Self::pop_effect_scope`] once this one's body
    /// has been fully inferred.
    fn push_effect_scope(&mut self) -> EffectRow {
        let fresh = self.open_effect_row();
        std::mem::replace(&mut self.current_effect_row, fresh)
    }

    /// Restores the caller's ambient row, returning whatever this scope's
    /// row accumulated while it was active (for the caller to check against
    /// a declared effect annotation, if any).
    fn pop_effect_scope(&mut self, saved: EffectRow) -> EffectRow {
        std::mem::replace(&mut self.current_effect_row, saved)
    }

    /// Checks `declared` (a function's surface `effect { ... }` annotation,
    /// if it wrote one) against the row that actually needs to flow through
    /// it: the inferred type's own row if it is a function (its own
    /// `Func`'s effect slot already accumulated every call inside its body
    /// via `current_effect_row`), or the caller-supplied ambient row
    /// otherwise (a non-function top-level binding has nowhere on its type
    /// to carry one). `None` means the binding never wrote an annotation, in
    /// which case no effect is declared and any nonempty inferred row fails
    /// the same way a closed-empty declared row would.
    fn check_declared_effects(
        &mut self,
        ty: &Type,
        ambient: &EffectRow,
        declared: Option<&[Symbol]>,
    ) -> Result<(), TypeError> {
        let declared_row = EffectRow::closed(declared.unwrap_or(&[]).iter().map(|s| (*s, ())).collect());
        let row_to_check = match ty {
            Type::Func(_, _, eff) => eff.clone(),
            _ => ambient.clone(),
        };
        match self.unifier.unify_effect_row(&row_to_check, &declared_row) {
            Ok(()) => Ok(()),
            Err(TypeError::RowMissingLabels { missing }) => Err(TypeError::UndeclaredEffect { missing }),
            Err(TypeError::RowMismatch { found, .. }) => Err(TypeError::UndeclaredEffect { missing: found }),
            Err(other) => Err(other),
        }
    }

    fn open_effect_row(&mut self) -> EffectRow {
        let tail = self.unifier.fresh_row_var();
        EffectRow::open(Default::default(), tail)
    }

    /// Quantifies `ty` over every free variable not also free in `env`
    /// (§4.3). Called only at a syntactic-value binding site — everywhere
    /// else gets [`TypeScheme::monomorphic`].
    fn generalize(&self, ty: &Type, env: &Env) -> TypeScheme {
        let resolved = self.unifier.resolve(ty);
        let mut ty_vars = Vec::new();
        resolved.free_vars(&mut ty_vars);
        let env_vars = free_vars_of_env(env, &self.unifier);
        let mut seen = FxHashSet::default();
        let vars: Vec<InferId> =
            ty_vars.into_iter().filter(|v| !env_vars.contains(v) && seen.insert(*v)).collect();
        TypeScheme { vars, constraints: Vec::new(), ty: resolved }
    }

    /// Freshens every quantified variable in `scheme`, so each reference to
    /// a generalized binding gets its own independent type variables (§4.3)
    /// — the step that makes `let id = \x -> x` usable at more than one
    /// type within the same program.
    fn instantiate(&mut self, scheme: &TypeScheme) -> Type {
        if scheme.vars.is_empty() {
            return scheme.ty.clone();
        }
        let mapping: FxHashMap<InferId, Type> =
            scheme.vars.iter().map(|v| (*v, self.unifier.fresh_type_var(Kind::Star))).collect();
        substitute(&scheme.ty, &mapping)
    }

    fn infer(&mut self, expr: &CoreExpr, env: &Env) -> Result<Type, TypeError> {
        match expr {
            CoreExpr::Var(name, _) => match env.get(name) {
                Some(scheme) => Ok(self.instantiate(scheme)),
                None => Ok(self.unifier.fresh_type_var(Kind::Star)),
            },
            CoreExpr::VarGlobal { module, name, .. } => self.infer_var_global(*module, *name),
            CoreExpr::Lit(lit, _) => Ok(literal_type(lit)),
            CoreExpr::Lambda { params, body, .. } => {
                let mut inner = env.clone();
                let param_types: Vec<Type> = params
                    .iter()
                    .map(|p| {
                        let ty = self.unifier.fresh_type_var(Kind::Star);
                        inner.insert(*p, TypeScheme::monomorphic(ty.clone()));
                        ty
                    })
                    .collect();
                let saved = self.push_effect_scope();
                let body_row = self.current_effect_row.clone();
                let ret = self.infer(body, &inner)?;
                self.pop_effect_scope(saved);
                Ok(Type::Func(param_types, Box::new(ret), body_row))
            }
            CoreExpr::DictRef { .. } | CoreExpr::DictApp { .. } | CoreExpr::DictAbs { .. } => {
                // Not expected before dictionary elaboration runs; stay total
                // over the grammar rather than panic.
                Ok(self.unifier.fresh_type_var(Kind::Star))
            }
            CoreExpr::Let { name, value, body, .. } => {
                // A nested (non-top-level) let is always checked
                // monomorphically — generalization only happens at the top
                // level, per this module's doc comment.
                let value_ty = self.infer(value, env)?;
                let mut inner = env.clone();
                inner.insert(*name, TypeScheme::monomorphic(value_ty));
                self.infer(body, &inner)
            }
            CoreExpr::LetRec { bindings, body, .. } => {
                let mut inner = env.clone();
                let placeholders: Vec<Type> =
                    bindings.iter().map(|_| self.unifier.fresh_type_var(Kind::Star)).collect();
                for ((name, _), placeholder) in bindings.iter().zip(placeholders.iter()) {
                    inner.insert(*name, TypeScheme::monomorphic(placeholder.clone()));
                }
                for ((_, value), placeholder) in bindings.iter().zip(placeholders.iter()) {
                    let ty = self.infer(value, &inner)?;
                    self.unifier.unify(placeholder, &ty)?;
                }
                self.infer(body, &inner)
            }
            CoreExpr::App { func, args, .. } => self.infer_app(func, args, env),
            CoreExpr::If { cond, then_branch, else_branch, .. } => {
                let cond_ty = self.infer(cond, env)?;
                self.unifier.unify(&cond_ty, &Type::bool())?;
                let then_ty = self.infer(then_branch, env)?;
                let else_ty = self.infer(else_branch, env)?;
                self.unifier.unify(&then_ty, &else_ty)?;
                Ok(then_ty)
            }
            CoreExpr::Match { scrutinee, arms, .. } => self.infer_match(scrutinee, arms, env),
            CoreExpr::Intrinsic { op, args, .. } => self.infer_intrinsic(*op, args, env),
            CoreExpr::BinOp { op, lhs, rhs, id } => self.infer_binop(*op, lhs, rhs, *id, env),
            CoreExpr::UnOp { op, operand, id } => self.infer_unop(*op, operand, *id, env),
            CoreExpr::Record { fields, .. } => {
                let mut row = std::collections::BTreeMap::new();
                for (name, value) in fields {
                    row.insert(*name, self.infer(value, env)?);
                }
                Ok(Type::Record(FieldRow::closed(row)))
            }
            CoreExpr::RecordAccess { record, field, .. } => {
                let record_ty = self.infer(record, env)?;
                let field_ty = self.unifier.fresh_type_var(Kind::Star);
                let tail = self.unifier.fresh_row_var();
                let expected = Row::open(std::collections::BTreeMap::from([(*field, field_ty.clone())]), tail);
                self.unifier.unify(&record_ty, &Type::Record(expected))?;
                Ok(field_ty)
            }
            CoreExpr::List { elems, .. } => {
                let elem_ty = self.unifier.fresh_type_var(Kind::Star);
                for e in elems {
                    let ty = self.infer(e, env)?;
                    self.unifier.unify(&elem_ty, &ty)?;
                }
                Ok(Type::List(Box::new(elem_ty)))
            }
            CoreExpr::Tuple { elems, .. } => {
                let tys: Result<Vec<Type>, TypeError> = elems.iter().map(|e| self.infer(e, env)).collect();
                Ok(Type::Tuple(tys?))
            }
        }
    }

    fn infer_var_global(&mut self, module: Symbol, name: Symbol) -> Result<Type, TypeError> {
        if module == symbol::MODULE_ADT {
            if let Some(info) = self.ctors.lookup(name) {
                return Ok(Type::Con(info.type_name));
            }
        } else if module == symbol::MODULE_BUILTIN {
            if let Some(desc) = ailang_builtins::surface::lookup_callable(name) {
                return Ok((desc.type_builder)());
            }
        }
        Ok(self.unifier.fresh_type_var(Kind::Star))
    }

    /// `App` gets a special case for zero-or-more-arity constructor
    /// references: their result type is `Con(type_name)` regardless of the
    /// arguments' types, since field types aren't tracked (§4.3 note above).
    /// Every other callee is checked as an ordinary function application.
    fn infer_app(&mut self, func: &CoreExpr, args: &[CoreExpr], env: &Env) -> Result<Type, TypeError> {
        if let CoreExpr::VarGlobal { module, name, .. } = func {
            if *module == symbol::MODULE_ADT {
                for a in args {
                    self.infer(a, env)?;
                }
                return Ok(match self.ctors.lookup(*name) {
                    Some(info) => Type::Con(info.type_name),
                    None => self.unifier.fresh_type_var(Kind::Star),
                });
            }
        }
        let func_ty = self.infer(func, env)?;
        let arg_tys: Result<Vec<Type>, TypeError> = args.iter().map(|a| self.infer(a, env)).collect();
        let arg_tys = arg_tys?;
        let ret = self.unifier.fresh_type_var(Kind::Star);
        // Unifying against the *ambient* row, not a fresh one, is what makes
        // this call's effect requirement actually reach the enclosing
        // function's own row rather than vanishing into an unrelated,
        // never-checked-again variable.
        let expected = Type::Func(arg_tys, Box::new(ret.clone()), self.current_effect_row.clone());
        self.unifier.unify(&func_ty, &expected)?;
        Ok(ret)
    }

    fn infer_match(&mut self, scrutinee: &CoreExpr, arms: &[ailang_core::MatchArm], env: &Env) -> Result<Type, TypeError> {
        let scrut_ty = self.infer(scrutinee, env)?;
        let mut result_ty: Option<Type> = None;
        for arm in arms {
            let mut inner = env.clone();
            self.bind_pattern(&arm.pattern, &scrut_ty, &mut inner)?;
            if let Some(guard) = &arm.guard {
                let guard_ty = self.infer(guard, &inner)?;
                self.unifier.unify(&guard_ty, &Type::bool())?;
            }
            let body_ty = self.infer(&arm.body, &inner)?;
            match &result_ty {
                Some(existing) => self.unifier.unify(existing, &body_ty)?,
                None => result_ty = Some(body_ty),
            }
        }
        Ok(result_ty.unwrap_or_else(|| self.unifier.fresh_type_var(Kind::Star)))
    }

    /// Binds the names a pattern introduces into `env`, unifying `scrutinee_ty`
    /// against the pattern's shape where that shape is known (literal,
    /// tuple/list/record arity, or an ADT constructor's own type) — but not
    /// against constructor field types, which [`ConstructorMap`] doesn't
    /// carry (§4.3 note above): sub-patterns under a constructor each get an
    /// unconstrained fresh variable. Pattern-bound names are always
    /// monomorphic — a `match` arm is not a generalization site.
    fn bind_pattern(&mut self, pattern: &CorePattern, scrutinee_ty: &Type, env: &mut Env) -> Result<(), TypeError> {
        match pattern {
            CorePattern::Wildcard => Ok(()),
            CorePattern::Var(name) => {
                env.insert(*name, TypeScheme::monomorphic(scrutinee_ty.clone()));
                Ok(())
            }
            CorePattern::Lit(lit) => self.unifier.unify(scrutinee_ty, &literal_type(lit)),
            CorePattern::Constructor(name, sub) => {
                if let Some(info) = self.ctors.lookup(*name) {
                    self.unifier.unify(scrutinee_ty, &Type::Con(info.type_name))?;
                }
                for p in sub {
                    let field_ty = self.unifier.fresh_type_var(Kind::Star);
                    self.bind_pattern(p, &field_ty, env)?;
                }
                Ok(())
            }
            CorePattern::Tuple(elems) => {
                let elem_tys: Vec<Type> = elems.iter().map(|_| self.unifier.fresh_type_var(Kind::Star)).collect();
                self.unifier.unify(scrutinee_ty, &Type::Tuple(elem_tys.clone()))?;
                for (p, ty) in elems.iter().zip(elem_tys.iter()) {
                    self.bind_pattern(p, ty, env)?;
                }
                Ok(())
            }
            CorePattern::List(elems, tail) => {
                let elem_ty = self.unifier.fresh_type_var(Kind::Star);
                self.unifier.unify(scrutinee_ty, &Type::List(Box::new(elem_ty.clone())))?;
                for p in elems {
                    self.bind_pattern(p, &elem_ty, env)?;
                }
                if let Some(t) = tail {
                    self.bind_pattern(t, scrutinee_ty, env)?;
                }
                Ok(())
            }
            CorePattern::Record(fields) => {
                let mut row = std::collections::BTreeMap::new();
                let mut field_tys = Vec::with_capacity(fields.len());
                for (name, _) in fields {
                    let ty = self.unifier.fresh_type_var(Kind::Star);
                    row.insert(*name, ty.clone());
                    field_tys.push(ty);
                }
                self.unifier.unify(scrutinee_ty, &Type::Record(FieldRow::closed(row)))?;
                for ((_, p), ty) in fields.iter().zip(field_tys.iter()) {
                    self.bind_pattern(p, ty, env)?;
                }
                Ok(())
            }
        }
    }

    fn infer_intrinsic(&mut self, op: ailang_core::IntrinsicOp, args: &[CoreExpr], env: &Env) -> Result<Type, TypeError> {
        let ailang_core::IntrinsicOp::Bin(bin_op) = op;
        let arg_tys: Result<Vec<Type>, TypeError> = args.iter().map(|a| self.infer(a, env)).collect();
        let arg_tys = arg_tys?;
        match bin_op {
            BinOpKind::And | BinOpKind::Or => {
                for ty in &arg_tys {
                    self.unifier.unify(ty, &Type::bool())?;
                }
                Ok(Type::bool())
            }
            BinOpKind::Concat => {
                for ty in &arg_tys {
                    self.unifier.unify(ty, &Type::string())?;
                }
                Ok(Type::string())
            }
            BinOpKind::Cons => {
                let elem_ty = arg_tys[0].clone();
                self.unifier.unify(&arg_tys[1], &Type::List(Box::new(elem_ty.clone())))?;
                Ok(Type::List(Box::new(elem_ty)))
            }
            other => unreachable!("elaborator never lowers `{other:?}` to Intrinsic"),
        }
    }

    fn infer_binop(&mut self, op: BinOpKind, lhs: &CoreExpr, rhs: &CoreExpr, id: NodeId, env: &Env) -> Result<Type, TypeError> {
        let lhs_ty = self.infer(lhs, env)?;
        let rhs_ty = self.infer(rhs, env)?;
        self.unifier.unify(&lhs_ty, &rhs_ty)?;
        self.sites.push(OverloadSite {
            node_id: id,
            method: method_for_binop(op),
            constraint: ClassConstraint { class: symbol::CLASS_NUM, ty: lhs_ty.clone() },
        });
        if is_comparison(op) {
            Ok(Type::bool())
        } else {
            Ok(lhs_ty)
        }
    }

    fn infer_unop(&mut self, op: UnOpKind, operand: &CoreExpr, id: NodeId, env: &Env) -> Result<Type, TypeError> {
        let operand_ty = self.infer(operand, env)?;
        self.sites.push(OverloadSite {
            node_id: id,
            method: method_for_unop(op),
            constraint: ClassConstraint { class: symbol::CLASS_NUM, ty: operand_ty.clone() },
        });
        match op {
            UnOpKind::Neg => Ok(operand_ty),
            UnOpKind::Not => {
                self.unifier.unify(&operand_ty, &Type::bool())?;
                Ok(Type::bool())
            }
        }
    }
}
