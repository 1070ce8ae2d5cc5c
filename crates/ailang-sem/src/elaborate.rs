//! Elaborator (§4.1-§4.2): Surface AST → Core v1 in A-Normal Form.
//!
//! Every non-atomic subterm in an argument/operand/condition/scrutinee
//! position is hoisted into a fresh `$tmpN` `Let` ahead of the expression
//! that needs it. Constructor applications (still plain `App(Var(ctor),
//! args)` at the surface) are recognized against the running
//! [`ConstructorMap`] and checked for arity (ELB003); everything else that
//! fails to resolve as either a constructor or a bound name is ELB001/ELB002.

use ailang_core::{ConstructorMap, Expr as CoreExpr, IntrinsicOp, MatchArm as CoreArm, Pattern as CorePattern};
use ailang_syntax::{Expr as SurfaceExpr, ExprKind, File, PatternKind};
use ailang_util::{symbol, ErrorCode, FxHashSet, NodeIdGen, Symbol};

use crate::scope::{RibKind, ScopeTree};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ElabError {
    pub code: ErrorCode,
    pub message: String,
}

fn err(code: ErrorCode, message: impl Into<String>) -> ElabError {
    ElabError { code, message: message.into() }
}

/// The pinned operator→method table (§4.7) covers arithmetic and comparison;
/// `and`/`or`/string-concat/list-cons never acquire a class constraint and
/// lower straight through `Intrinsic` to OpLowering (§4.8).
fn is_overloadable_binop(op: ailang_syntax::BinOpKind) -> bool {
    use ailang_syntax::BinOpKind::*;
    matches!(op, Add | Sub | Mul | Div | Mod | Eq | Neq | Lt | Lte | Gt | Gte)
}

/// Owns the fresh-name/fresh-id generators and scope tree shared across one
/// file's elaboration (§4.1).
pub struct Elaborator<'a> {
    ids: &'a NodeIdGen,
    scope: ScopeTree,
    ctors: &'a ConstructorMap,
    builtins: &'a FxHashSet<Symbol>,
    tmp_counter: u32,
}

impl<'a> Elaborator<'a> {
    pub fn new(ids: &'a NodeIdGen, ctors: &'a ConstructorMap, builtins: &'a FxHashSet<Symbol>) -> Self {
        Elaborator { ids, scope: ScopeTree::new(), ctors, builtins, tmp_counter: 0 }
    }

    fn fresh_tmp(&mut self) -> Symbol {
        let n = self.tmp_counter;
        self.tmp_counter += 1;
        Symbol::intern(&format!("$tmp{n}"))
    }

    /// Wraps `inner` in the `Let`s a [`Binder`] accumulated while atomizing
    /// its subterms, innermost-needed-first.
    fn wrap(&self, binder: &mut Binder, inner: CoreExpr) -> CoreExpr {
        let mut node = inner;
        for (name, value) in binder.pending.drain(..).rev() {
            node = CoreExpr::Let { name, value: Box::new(value), body: Box::new(node), id: self.ids.next() };
        }
        node
    }

    /// Elaborates one expression, pushing any hoisted `Let`s for non-atomic
    /// subterms as wrappers around the returned expression (so the return
    /// value is always safe to drop into an atomic position by construction,
    /// except for the top-level call which is never itself atomic-required).
    pub fn elaborate_expr(&mut self, e: &SurfaceExpr) -> Result<CoreExpr, ElabError> {
        match &e.kind {
            ExprKind::Lit(lit) => Ok(CoreExpr::Lit(lit.clone(), self.ids.next())),
            ExprKind::Var(name) => self.elaborate_var(*name),
            ExprKind::Lambda { params, body, .. } => {
                let rib = self.scope.enter(RibKind::Function);
                for p in params {
                    self.scope.bind(*p, self.ids.next());
                }
                let core_body = self.elaborate_expr(body)?;
                self.scope.exit_to(rib);
                Ok(CoreExpr::Lambda { params: params.clone(), body: Box::new(core_body), id: self.ids.next() })
            }
            ExprKind::App(func, args) => self.elaborate_app(func, args),
            ExprKind::If(cond, t, f) => {
                let (cond_atom, mut binder) = self.atomize(cond)?;
                let then_b = self.elaborate_expr(t)?;
                let else_b = self.elaborate_expr(f)?;
                let node = CoreExpr::If {
                    cond: Box::new(cond_atom),
                    then_branch: Box::new(then_b),
                    else_branch: Box::new(else_b),
                    id: self.ids.next(),
                };
                Ok(self.wrap(&mut binder, node))
            }
            ExprKind::Match(scrutinee, arms) => {
                let (scrut_atom, mut binder) = self.atomize(scrutinee)?;
                let mut core_arms = Vec::with_capacity(arms.len());
                for arm in arms {
                    let rib = self.scope.enter(RibKind::MatchArm);
                    self.bind_pattern_names(&arm.pattern);
                    let pattern = self.lower_pattern(&arm.pattern)?;
                    let guard = arm.guard.as_ref().map(|g| self.elaborate_expr(g)).transpose()?;
                    let body = self.elaborate_expr(&arm.body)?;
                    self.scope.exit_to(rib);
                    core_arms.push(CoreArm { pattern, guard, body });
                }
                let exhaustive = self.is_exhaustive(&arms.iter().map(|a| a.pattern.clone()).collect::<Vec<_>>());
                let node = CoreExpr::Match {
                    scrutinee: Box::new(scrut_atom),
                    arms: core_arms,
                    exhaustive,
                    id: self.ids.next(),
                };
                Ok(self.wrap(&mut binder, node))
            }
            ExprKind::Let { name, value, body } => {
                let core_value = self.elaborate_expr(value)?;
                self.scope.bind(*name, self.ids.next());
                let core_body = match body {
                    Some(b) => self.elaborate_expr(b)?,
                    None => CoreExpr::Lit(ailang_syntax::Literal::Unit, self.ids.next()),
                };
                Ok(CoreExpr::Let {
                    name: *name,
                    value: Box::new(core_value),
                    body: Box::new(core_body),
                    id: self.ids.next(),
                })
            }
            ExprKind::Block(stmts) => self.elaborate_block(stmts),
            ExprKind::BinOp(op, lhs, rhs) => {
                let (l, mut b1) = self.atomize(lhs)?;
                let (r, mut b2) = self.atomize(rhs)?;
                let id = self.ids.next();
                let node = if is_overloadable_binop(*op) {
                    CoreExpr::BinOp { op: *op, lhs: Box::new(l), rhs: Box::new(r), id }
                } else {
                    CoreExpr::Intrinsic { op: IntrinsicOp::Bin(*op), args: vec![l, r], id }
                };
                Ok(self.wrap(&mut b1, self.wrap(&mut b2, node)))
            }
            ExprKind::UnOp(op, operand) => {
                let (v, mut b) = self.atomize(operand)?;
                let node = CoreExpr::UnOp { op: *op, operand: Box::new(v), id: self.ids.next() };
                Ok(self.wrap(&mut b, node))
            }
            ExprKind::Record(fields) => {
                let mut binder = Binder::default();
                let mut core_fields = Vec::with_capacity(fields.len());
                for (name, value) in fields {
                    let (atom, b) = self.atomize(value)?;
                    binder.absorb(b);
                    core_fields.push((*name, atom));
                }
                let node = CoreExpr::Record { fields: core_fields, id: self.ids.next() };
                Ok(self.wrap(&mut binder, node))
            }
            ExprKind::RecordAccess(record, field) => {
                let (atom, mut binder) = self.atomize(record)?;
                let node = CoreExpr::RecordAccess { record: Box::new(atom), field: *field, id: self.ids.next() };
                Ok(self.wrap(&mut binder, node))
            }
            ExprKind::List(elems) => self.elaborate_seq(elems, |elems, id| CoreExpr::List { elems, id }),
            ExprKind::Tuple(elems) => self.elaborate_seq(elems, |elems, id| CoreExpr::Tuple { elems, id }),
        }
    }

    fn elaborate_seq(
        &mut self,
        elems: &[SurfaceExpr],
        build: impl FnOnce(Vec<CoreExpr>, ailang_util::NodeId) -> CoreExpr,
    ) -> Result<CoreExpr, ElabError> {
        let mut binder = Binder::default();
        let mut atoms = Vec::with_capacity(elems.len());
        for e in elems {
            let (atom, b) = self.atomize(e)?;
            binder.absorb(b);
            atoms.push(atom);
        }
        let node = build(atoms, self.ids.next());
        Ok(self.wrap(&mut binder, node))
    }

    /// `{ e1; e2; ...; en }` desugars into nested lets, the final
    /// expression's value flowing through unchanged (§4.1).
    fn elaborate_block(&mut self, stmts: &[SurfaceExpr]) -> Result<CoreExpr, ElabError> {
        match stmts {
            [] => Ok(CoreExpr::Lit(ailang_syntax::Literal::Unit, self.ids.next())),
            [last] => self.elaborate_expr(last),
            [first, rest @ ..] => {
                let value = self.elaborate_expr(first)?;
                let name = self.fresh_tmp();
                let body = self.elaborate_block(rest)?;
                Ok(CoreExpr::Let { name, value: Box::new(value), body: Box::new(body), id: self.ids.next() })
            }
        }
    }

    fn elaborate_var(&mut self, name: Symbol) -> Result<CoreExpr, ElabError> {
        if self.ctors.is_constructor(name) {
            let info = self.ctors.lookup(name).unwrap();
            if info.arity != 0 {
                return Err(err(
                    ErrorCode::Elb003ArityMismatch,
                    format!("constructor `{}` expects {} argument(s), applied to 0", name.as_str(), info.arity),
                ));
            }
            return Ok(CoreExpr::VarGlobal { module: Symbol::intern("$adt"), name, id: self.ids.next() });
        }
        if self.scope.resolve(name).is_some() {
            return Ok(CoreExpr::Var(name, self.ids.next()));
        }
        if self.builtins.contains(&name) {
            return Ok(CoreExpr::VarGlobal { module: symbol::MODULE_BUILTIN, name, id: self.ids.next() });
        }
        Err(err(ErrorCode::Elb002UnknownName, format!("unbound name `{}`", name.as_str())))
    }

    fn elaborate_app(&mut self, func: &SurfaceExpr, args: &[SurfaceExpr]) -> Result<CoreExpr, ElabError> {
        if let ExprKind::Var(name) = &func.kind {
            if self.ctors.is_constructor(*name) {
                let info = self.ctors.lookup(*name).unwrap().clone();
                if info.arity != args.len() {
                    return Err(err(
                        ErrorCode::Elb003ArityMismatch,
                        format!(
                            "constructor `{}` expects {} argument(s), got {}",
                            name.as_str(),
                            info.arity,
                            args.len()
                        ),
                    ));
                }
                let ctor_ref = CoreExpr::VarGlobal { module: Symbol::intern("$adt"), name: *name, id: self.ids.next() };
                return self.elaborate_seq(args, |atoms, id| CoreExpr::App {
                    func: Box::new(ctor_ref.clone()),
                    args: atoms,
                    id,
                });
            }
            if self.scope.resolve(*name).is_none() && !self.builtins.contains(name) {
                return Err(err(ErrorCode::Elb002UnknownName, format!("unbound name `{}`", name.as_str())));
            }
        }
        let (func_atom, mut binder) = self.atomize(func)?;
        let mut arg_atoms = Vec::with_capacity(args.len());
        for a in args {
            let (atom, b) = self.atomize(a)?;
            binder.absorb(b);
            arg_atoms.push(atom);
        }
        let node = CoreExpr::App { func: Box::new(func_atom), args: arg_atoms, id: self.ids.next() };
        Ok(self.wrap(&mut binder, node))
    }

    /// Elaborates `e` and, if the result is not already atomic, hoists it
    /// into a fresh `$tmpN` binding — returning the atomic reference plus a
    /// [`Binder`] the caller must wrap its final expression in.
    fn atomize(&mut self, e: &SurfaceExpr) -> Result<(CoreExpr, Binder), ElabError> {
        let core = self.elaborate_expr(e)?;
        if core.is_atomic() {
            return Ok((core, Binder::default()));
        }
        let name = self.fresh_tmp();
        let var = CoreExpr::Var(name, self.ids.next());
        Ok((var, Binder { pending: vec![(name, core)] }))
    }

    fn bind_pattern_names(&mut self, pattern: &ailang_syntax::Pattern) {
        match &pattern.kind {
            PatternKind::Var(name) => self.scope.bind(*name, self.ids.next()),
            PatternKind::Constructor(_, sub) => sub.iter().for_each(|p| self.bind_pattern_names(p)),
            PatternKind::Tuple(elems) => elems.iter().for_each(|p| self.bind_pattern_names(p)),
            PatternKind::List(elems, tail) => {
                elems.iter().for_each(|p| self.bind_pattern_names(p));
                if let Some(t) = tail {
                    self.bind_pattern_names(t);
                }
            }
            PatternKind::Record(fields) => fields.iter().for_each(|(_, p)| self.bind_pattern_names(p)),
            PatternKind::Lit(_) | PatternKind::Wildcard => {}
        }
    }

    fn lower_pattern(&mut self, pattern: &ailang_syntax::Pattern) -> Result<CorePattern, ElabError> {
        Ok(match &pattern.kind {
            PatternKind::Var(name) => CorePattern::Var(*name),
            PatternKind::Lit(lit) => CorePattern::Lit(lit.clone()),
            PatternKind::Wildcard => CorePattern::Wildcard,
            PatternKind::Constructor(name, sub) => {
                if !self.ctors.is_constructor(*name) {
                    return Err(err(
                        ErrorCode::Elb001UnknownConstructor,
                        format!("unknown constructor `{}`", name.as_str()),
                    ));
                }
                let info = self.ctors.lookup(*name).unwrap();
                if info.arity != sub.len() {
                    return Err(err(
                        ErrorCode::Elb003ArityMismatch,
                        format!(
                            "pattern for `{}` expects {} argument(s), got {}",
                            name.as_str(),
                            info.arity,
                            sub.len()
                        ),
                    ));
                }
                let lowered: Result<Vec<_>, _> = sub.iter().map(|p| self.lower_pattern(p)).collect();
                CorePattern::Constructor(*name, lowered?)
            }
            PatternKind::Tuple(elems) => {
                let lowered: Result<Vec<_>, _> = elems.iter().map(|p| self.lower_pattern(p)).collect();
                CorePattern::Tuple(lowered?)
            }
            PatternKind::List(elems, tail) => {
                let lowered: Result<Vec<_>, _> = elems.iter().map(|p| self.lower_pattern(p)).collect();
                let tail = tail.as_ref().map(|t| self.lower_pattern(t)).transpose()?.map(Box::new);
                CorePattern::List(lowered?, tail)
            }
            PatternKind::Record(fields) => {
                let lowered: Result<Vec<_>, _> =
                    fields.iter().map(|(n, p)| self.lower_pattern(p).map(|cp| (*n, cp))).collect();
                CorePattern::Record(lowered?)
            }
        })
    }

    /// A coarse exhaustiveness check (§4.2): a match is exhaustive if it has
    /// a trailing wildcard/var arm, or if every constructor of the matched
    /// ADT is covered. Record/tuple/list patterns are treated as always
    /// covering (single-shape types).
    fn is_exhaustive(&self, patterns: &[ailang_syntax::Pattern]) -> bool {
        if patterns.iter().any(|p| matches!(p.kind, PatternKind::Wildcard | PatternKind::Var(_))) {
            return true;
        }
        let mut covered = Vec::new();
        let mut type_name = None;
        for p in patterns {
            if let PatternKind::Constructor(name, _) = &p.kind {
                if let Some(info) = self.ctors.lookup(*name) {
                    type_name.get_or_insert(info.type_name);
                    covered.push(*name);
                }
            } else {
                return true;
            }
        }
        match type_name {
            Some(t) => {
                let all = self.ctors.constructors_of(t);
                all.iter().all(|c| covered.contains(&c.ctor_name))
            }
            None => false,
        }
    }
}

/// Accumulates `$tmpN` bindings produced while atomizing a non-atomic
/// subterm, to be wrapped around the expression that needed it.
#[derive(Default)]
struct Binder {
    pending: Vec<(Symbol, CoreExpr)>,
}

impl Binder {
    fn absorb(&mut self, other: Binder) {
        self.pending.extend(other.pending);
    }
}

/// Elaborates every top-level declaration in `file`, threading one
/// [`NodeIdGen`]/[`ConstructorMap`] pair across the whole module (§4.1).
///
/// Each declaration gets its own [`Elaborator`] (and so its own fresh
/// `$tmpN` counter), but every declaration's root scope is seeded with
/// every top-level function name first — a function calling itself or a
/// sibling declared anywhere else in the file must resolve as an ordinary
/// [`CoreExpr::Var`], the same as any other lexical reference, since that
/// is how the evaluator's top-level `env` resolves them at call time.
#[tracing::instrument(skip(file, ids, ctors))]
pub fn elaborate_file(
    file: &File,
    ids: &NodeIdGen,
    ctors: &ConstructorMap,
) -> Result<ailang_core::Program, ElabError> {
    tracing::debug!(func_decls = file.func_decls.len(), stmts = file.stmts.len(), "elaborating file");
    let builtins = ailang_builtins::surface::callable_names();
    let mut program = ailang_core::Program::new();
    let top_level_names: Vec<Symbol> = file.func_decls.iter().map(|d| d.name).collect();
    let mut values: Vec<(Symbol, CoreExpr)> = Vec::with_capacity(file.func_decls.len());
    for decl in &file.func_decls {
        let mut elaborator = Elaborator::new(ids, ctors, &builtins);
        for name in &top_level_names {
            elaborator.scope.bind(*name, ids.next());
        }
        for p in &decl.params {
            elaborator.scope.bind(p.name, ids.next());
        }
        let inner_body = elaborator.elaborate_expr(&decl.body)?;
        let body = if decl.params.is_empty() {
            inner_body
        } else {
            CoreExpr::Lambda { params: decl.params.iter().map(|p| p.name).collect(), body: Box::new(inner_body), id: ids.next() }
        };
        values.push((decl.name, body));
        program.meta.push(ailang_core::BindingMeta {
            name: decl.name,
            is_export: decl.is_export,
            is_pure: true,
            effect_annot: decl.effect_annot.clone(),
        });
    }
    program.bindings = group_by_scc(values, &top_level_names);
    for (i, stmt) in file.stmts.iter().enumerate() {
        let mut elaborator = Elaborator::new(ids, ctors, &builtins);
        let value = elaborator.elaborate_expr(stmt)?;
        let name = Symbol::intern(&format!("$stmt{i}"));
        program.bindings.push(ailang_core::TopLevel::Let { name, value });
        program.meta.push(ailang_core::BindingMeta { name, is_export: false, is_pure: false, effect_annot: None });
    }
    Ok(program)
}

/// Regroups a flat list of top-level bindings into `Let`/`LetRec` (§4.1,
/// §4.2) by the strongly connected components of their call graph: a
/// singleton that does not call itself becomes a plain `Let`; a singleton
/// that does, or any group of mutual callers, becomes one `LetRec` so the
/// type checker generalizes the whole group together.
fn group_by_scc(values: Vec<(Symbol, CoreExpr)>, names: &[Symbol]) -> Vec<ailang_core::TopLevel> {
    let mut by_name: ailang_util::FxHashMap<Symbol, CoreExpr> = values.into_iter().collect();
    let calls: ailang_util::FxHashMap<Symbol, Vec<Symbol>> =
        by_name.iter().map(|(n, v)| (*n, referenced_names(v, names))).collect();
    let sccs = ailang_util::tarjan_scc(names, |n| calls.get(n).cloned().unwrap_or_default());

    sccs.into_iter()
        .map(|scc| {
            if scc.len() == 1 && !calls.get(&scc[0]).is_some_and(|cs| cs.contains(&scc[0])) {
                let name = scc[0];
                let value = by_name.remove(&name).expect("scc member must have a value");
                ailang_core::TopLevel::Let { name, value }
            } else {
                let bindings = scc
                    .into_iter()
                    .map(|name| {
                        let value = by_name.remove(&name).expect("scc member must have a value");
                        (name, value)
                    })
                    .collect();
                ailang_core::TopLevel::LetRec { bindings }
            }
        })
        .collect()
}

/// Builds the call graph among top-level bindings and finds its strongly
/// connected components via an iterative Tarjan's algorithm (§4.2), so
/// mutually-recursive groups can be generalized together and the value
/// restriction applied per-group rather than per-binding.
pub fn call_graph_sccs(program: &ailang_core::Program) -> Vec<Vec<Symbol>> {
    let names: Vec<Symbol> = program
        .bindings
        .iter()
        .flat_map(|b| match b {
            ailang_core::TopLevel::Let { name, .. } => vec![*name],
            ailang_core::TopLevel::LetRec { bindings } => bindings.iter().map(|(n, _)| *n).collect(),
        })
        .collect();

    let mut calls: std::collections::HashMap<Symbol, Vec<Symbol>> = std::collections::HashMap::new();
    for b in &program.bindings {
        match b {
            ailang_core::TopLevel::Let { name, value } => {
                calls.insert(*name, referenced_names(value, &names));
            }
            ailang_core::TopLevel::LetRec { bindings } => {
                for (name, value) in bindings {
                    calls.insert(*name, referenced_names(value, &names));
                }
            }
        }
    }

    ailang_util::tarjan_scc(&names, |n| calls.get(n).cloned().unwrap_or_default())
}

fn referenced_names(expr: &CoreExpr, known: &[Symbol]) -> Vec<Symbol> {
    let mut out = Vec::new();
    expr.for_each_subexpr(&mut |e| {
        if let CoreExpr::Var(name, _) = e {
            if known.contains(name) {
                out.push(*name);
            }
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ailang_core::ConstructorInfo;
    use ailang_syntax::Literal;
    use ailang_util::Pos;

    fn pos() -> Pos {
        Pos::new(Symbol::intern("t.ail"), 1, 1)
    }

    fn no_builtins() -> FxHashSet<Symbol> {
        FxHashSet::default()
    }

    #[test]
    fn literal_elaborates_directly() {
        let ids = NodeIdGen::new();
        let ctors = ConstructorMap::new();
        let builtins = no_builtins();
        let mut elab = Elaborator::new(&ids, &ctors, &builtins);
        let e = SurfaceExpr::new(ExprKind::Lit(Literal::Int(42)), pos());
        let core = elab.elaborate_expr(&e).unwrap();
        assert!(matches!(core, CoreExpr::Lit(Literal::Int(42), _)));
    }

    #[test]
    fn unbound_variable_is_elb002() {
        let ids = NodeIdGen::new();
        let ctors = ConstructorMap::new();
        let builtins = no_builtins();
        let mut elab = Elaborator::new(&ids, &ctors, &builtins);
        let e = SurfaceExpr::new(ExprKind::Var(Symbol::intern("nope")), pos());
        let result = elab.elaborate_expr(&e);
        assert_eq!(result.unwrap_err().code, ErrorCode::Elb002UnknownName);
    }

    #[test]
    fn nested_call_hoists_a_tmp_binding() {
        let ids = NodeIdGen::new();
        let ctors = ConstructorMap::new();
        let builtins = no_builtins();
        let mut elab = Elaborator::new(&ids, &ctors, &builtins);
        elab.scope.bind(Symbol::intern("f"), ids.next());
        elab.scope.bind(Symbol::intern("g"), ids.next());
        let inner = SurfaceExpr::new(
            ExprKind::App(
                Box::new(SurfaceExpr::new(ExprKind::Var(Symbol::intern("g")), pos())),
                vec![SurfaceExpr::new(ExprKind::Lit(Literal::Int(1)), pos())],
            ),
            pos(),
        );
        let outer = SurfaceExpr::new(
            ExprKind::App(Box::new(SurfaceExpr::new(ExprKind::Var(Symbol::intern("f")), pos())), vec![inner]),
            pos(),
        );
        let core = elab.elaborate_expr(&outer).unwrap();
        match core {
            CoreExpr::Let { value, body, .. } => {
                assert!(matches!(*value, CoreExpr::App { .. }));
                assert!(matches!(*body, CoreExpr::App { .. }));
            }
            other => panic!("expected a hoisted Let, got {other:?}"),
        }
    }

    #[test]
    fn constructor_application_checks_arity() {
        let ids = NodeIdGen::new();
        let mut ctors = ConstructorMap::new();
        ctors
            .register(ConstructorInfo {
                type_name: Symbol::intern("Option"),
                ctor_name: Symbol::intern("Some"),
                arity: 1,
                tag: 0,
            })
            .unwrap();
        let builtins = no_builtins();
        let mut elab = Elaborator::new(&ids, &ctors, &builtins);
        let app = SurfaceExpr::new(
            ExprKind::App(Box::new(SurfaceExpr::new(ExprKind::Var(Symbol::intern("Some")), pos())), vec![]),
            pos(),
        );
        let result = elab.elaborate_expr(&app);
        assert_eq!(result.unwrap_err().code, ErrorCode::Elb003ArityMismatch);
    }

    #[test]
    fn mutually_recursive_top_levels_form_one_scc() {
        let ids = NodeIdGen::new();
        let is_even = Symbol::intern("is_even");
        let is_odd = Symbol::intern("is_odd");
        let call_is_odd = CoreExpr::App {
            func: Box::new(CoreExpr::Var(is_odd, ids.next())),
            args: vec![],
            id: ids.next(),
        };
        let call_is_even = CoreExpr::App {
            func: Box::new(CoreExpr::Var(is_even, ids.next())),
            args: vec![],
            id: ids.next(),
        };
        let program = ailang_core::Program {
            bindings: vec![
                ailang_core::TopLevel::Let { name: is_even, value: call_is_odd },
                ailang_core::TopLevel::Let { name: is_odd, value: call_is_even },
            ],
            meta: vec![],
            flags: ailang_core::ProgramFlags::default(),
        };
        let sccs = call_graph_sccs(&program);
        let group_of_is_even = sccs.iter().find(|g| g.contains(&is_even)).unwrap();
        assert!(group_of_is_even.contains(&is_odd));
    }

    fn func(name: &str, params: &[&str], body: SurfaceExpr) -> ailang_syntax::FuncDecl {
        ailang_syntax::FuncDecl {
            name: Symbol::intern(name),
            params: params
                .iter()
                .map(|p| ailang_syntax::Param { name: Symbol::intern(p), type_annot: None, pos: pos() })
                .collect(),
            ret_type: None,
            effect_annot: None,
            body,
            is_export: false,
            pos: pos(),
        }
    }

    fn var(name: &str) -> SurfaceExpr {
        SurfaceExpr::new(ExprKind::Var(Symbol::intern(name)), pos())
    }

    fn call(name: &str, args: Vec<SurfaceExpr>) -> SurfaceExpr {
        SurfaceExpr::new(ExprKind::App(Box::new(var(name)), args), pos())
    }

    fn file_with(decls: Vec<ailang_syntax::FuncDecl>) -> File {
        File { module: None, imports: vec![], type_decls: vec![], func_decls: decls, stmts: vec![] }
    }

    #[test]
    fn self_recursive_function_elaborates_to_letrec() {
        let ids = NodeIdGen::new();
        let ctors = ConstructorMap::new();
        let countdown = func("countdown", &["n"], call("countdown", vec![var("n")]));
        let program = elaborate_file(&file_with(vec![countdown]), &ids, &ctors).unwrap();
        assert_eq!(program.bindings.len(), 1);
        assert!(matches!(program.bindings[0], ailang_core::TopLevel::LetRec { .. }));
    }

    #[test]
    fn mutually_recursive_decls_elaborate_to_one_letrec() {
        let ids = NodeIdGen::new();
        let ctors = ConstructorMap::new();
        let is_even = func("is_even", &["n"], call("is_odd", vec![var("n")]));
        let is_odd = func("is_odd", &["n"], call("is_even", vec![var("n")]));
        let program = elaborate_file(&file_with(vec![is_even, is_odd]), &ids, &ctors).unwrap();
        assert_eq!(program.bindings.len(), 1);
        match &program.bindings[0] {
            ailang_core::TopLevel::LetRec { bindings } => assert_eq!(bindings.len(), 2),
            other => panic!("expected a single LetRec, got {other:?}"),
        }
    }

    #[test]
    fn non_recursive_sibling_call_elaborates_to_two_lets() {
        let ids = NodeIdGen::new();
        let ctors = ConstructorMap::new();
        let helper = func("helper", &["n"], var("n"));
        let caller = func("caller", &["n"], call("helper", vec![var("n")]));
        let program = elaborate_file(&file_with(vec![helper, caller]), &ids, &ctors).unwrap();
        assert_eq!(program.bindings.len(), 2);
        assert!(program.bindings.iter().all(|b| matches!(b, ailang_core::TopLevel::Let { .. })));
    }

    fn func_with_effects(
        name: &str,
        params: &[&str],
        body: SurfaceExpr,
        effect_annot: Option<Vec<Symbol>>,
    ) -> ailang_syntax::FuncDecl {
        let mut decl = func(name, params, body);
        decl.effect_annot = effect_annot;
        decl
    }

    #[test]
    fn call_to_a_stdlib_builtin_resolves_without_being_bound_locally() {
        let ids = NodeIdGen::new();
        let ctors = ConstructorMap::new();
        let f = func_with_effects(
            "greet",
            &["name"],
            call("_str_len", vec![var("name")]),
            None,
        );
        let program = elaborate_file(&file_with(vec![f]), &ids, &ctors).unwrap();
        assert_eq!(program.bindings.len(), 1);
    }

    /// Elaboration itself never rejects a missing effect declaration — that
    /// check needs the function's *inferred* effect row, which only exists
    /// once type checking has run (see `typecheck`'s
    /// `undeclared_effect_is_rejected_by_real_row_unification`). What
    /// elaboration does do is carry the declared row forward on
    /// `BindingMeta` regardless of whether it was ever written.
    #[test]
    fn effect_annotation_is_carried_onto_binding_meta_without_being_checked_here() {
        let ids = NodeIdGen::new();
        let ctors = ConstructorMap::new();
        let undeclared = func_with_effects("f", &["x"], call("_io_print", vec![var("x")]), None);
        let program = elaborate_file(&file_with(vec![undeclared]), &ids, &ctors).unwrap();
        assert_eq!(program.meta[0].effect_annot, None);
    }

    #[test]
    fn calling_an_io_builtin_with_io_declared_succeeds() {
        let ids = NodeIdGen::new();
        let ctors = ConstructorMap::new();
        let f = func_with_effects(
            "f",
            &["x"],
            call("_io_print", vec![var("x")]),
            Some(vec![ailang_util::symbol::EFF_IO]),
        );
        let program = elaborate_file(&file_with(vec![f]), &ids, &ctors).unwrap();
        assert_eq!(program.bindings.len(), 1);
        assert_eq!(program.meta[0].effect_annot, Some(vec![ailang_util::symbol::EFF_IO]));
    }
}
