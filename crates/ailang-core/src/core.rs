//! Core IR in A-Normal Form (§3.3).

use ailang_syntax::{BinOpKind, Literal, UnOpKind};
use ailang_util::{NodeId, Symbol};

/// Core patterns (§3.5). Unlike surface patterns, these are only ever
/// produced by the elaborator (constructor names are already resolved
/// against the local constructor map by the time a `Pattern` exists here).
#[derive(Clone, Debug, PartialEq)]
pub enum Pattern {
    Var(Symbol),
    Lit(Literal),
    Wildcard,
    Constructor(Symbol, Vec<Pattern>),
    Tuple(Vec<Pattern>),
    List(Vec<Pattern>, Option<Box<Pattern>>),
    Record(Vec<(Symbol, Pattern)>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: Expr,
}

/// A Core expression. Every variant carries its [`NodeId`] (§3.1); the
/// `is_atomic` cases (`Var`, `VarGlobal`, `Lit`, `Lambda`, `DictRef`) are the
/// only ones legal in an argument/operand/condition/scrutinee position (I1).
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Var(Symbol, NodeId),
    VarGlobal { module: Symbol, name: Symbol, id: NodeId },
    Lit(Literal, NodeId),
    Lambda { params: Vec<Symbol>, body: Box<Expr>, id: NodeId },
    DictRef { class: Symbol, type_name: Symbol, id: NodeId },

    Let { name: Symbol, value: Box<Expr>, body: Box<Expr>, id: NodeId },
    LetRec { bindings: Vec<(Symbol, Expr)>, body: Box<Expr>, id: NodeId },
    App { func: Box<Expr>, args: Vec<Expr>, id: NodeId },
    If { cond: Box<Expr>, then_branch: Box<Expr>, else_branch: Box<Expr>, id: NodeId },
    Match { scrutinee: Box<Expr>, arms: Vec<MatchArm>, exhaustive: bool, id: NodeId },

    /// Produced by a surface binary/unary operator before it is known
    /// whether dictionary elaboration or op-lowering will consume it
    /// (§3.3, §4.7, §4.8).
    Intrinsic { op: IntrinsicOp, args: Vec<Expr>, id: NodeId },
    /// Retained only for an operator that *did* receive a resolved class
    /// constraint and is awaiting dictionary elaboration's rewrite (§4.7).
    BinOp { op: BinOpKind, lhs: Box<Expr>, rhs: Box<Expr>, id: NodeId },
    UnOp { op: UnOpKind, operand: Box<Expr>, id: NodeId },

    Record { fields: Vec<(Symbol, Expr)>, id: NodeId },
    RecordAccess { record: Box<Expr>, field: Symbol, id: NodeId },
    List { elems: Vec<Expr>, id: NodeId },
    Tuple { elems: Vec<Expr>, id: NodeId },

    DictApp { dict: Box<Expr>, method: Symbol, args: Vec<Expr>, id: NodeId },
    DictAbs { params: Vec<Symbol>, body: Box<Expr>, id: NodeId },
}

/// An operator tag carried by an `Intrinsic` node: the non-overloadable
/// binary operators (`and`, `or`, string concat, list cons) that never
/// acquire a class constraint and so skip dictionary elaboration entirely,
/// going straight to OpLowering (§4.8).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntrinsicOp {
    Bin(BinOpKind),
}

impl Expr {
    pub fn id(&self) -> NodeId {
        match self {
            Expr::Var(_, id)
            | Expr::VarGlobal { id, .. }
            | Expr::Lit(_, id)
            | Expr::Lambda { id, .. }
            | Expr::DictRef { id, .. }
            | Expr::Let { id, .. }
            | Expr::LetRec { id, .. }
            | Expr::App { id, .. }
            | Expr::If { id, .. }
            | Expr::Match { id, .. }
            | Expr::Intrinsic { id, .. }
            | Expr::BinOp { id, .. }
            | Expr::UnOp { id, .. }
            | Expr::Record { id, .. }
            | Expr::RecordAccess { id, .. }
            | Expr::List { id, .. }
            | Expr::Tuple { id, .. }
            | Expr::DictApp { id, .. }
            | Expr::DictAbs { id, .. } => *id,
        }
    }

    /// True for the five node kinds ANF allows in an argument/operand
    /// position (§3.3 "Atomic nodes").
    pub fn is_atomic(&self) -> bool {
        matches!(
            self,
            Expr::Var(..) | Expr::VarGlobal { .. } | Expr::Lit(..) | Expr::Lambda { .. } | Expr::DictRef { .. }
        )
    }

    /// Walks every subexpression depth-first, `f` receiving each node
    /// exactly once. Shared by the ANF checker (P1), node-id uniqueness
    /// check (P2), dictionary elaboration, op-lowering, and the linker's
    /// final ANF re-verification (LNK006).
    pub fn for_each_subexpr<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::Var(..) | Expr::VarGlobal { .. } | Expr::Lit(..) | Expr::DictRef { .. } => {}
            Expr::Lambda { body, .. } | Expr::DictAbs { body, .. } => body.for_each_subexpr(f),
            Expr::Let { value, body, .. } => {
                value.for_each_subexpr(f);
                body.for_each_subexpr(f);
            }
            Expr::LetRec { bindings, body, .. } => {
                for (_, v) in bindings {
                    v.for_each_subexpr(f);
                }
                body.for_each_subexpr(f);
            }
            Expr::App { func, args, .. } => {
                func.for_each_subexpr(f);
                for a in args {
                    a.for_each_subexpr(f);
                }
            }
            Expr::If { cond, then_branch, else_branch, .. } => {
                cond.for_each_subexpr(f);
                then_branch.for_each_subexpr(f);
                else_branch.for_each_subexpr(f);
            }
            Expr::Match { scrutinee, arms, .. } => {
                scrutinee.for_each_subexpr(f);
                for arm in arms {
                    if let Some(g) = &arm.guard {
                        g.for_each_subexpr(f);
                    }
                    arm.body.for_each_subexpr(f);
                }
            }
            Expr::Intrinsic { args, .. } => {
                for a in args {
                    a.for_each_subexpr(f);
                }
            }
            Expr::BinOp { lhs, rhs, .. } => {
                lhs.for_each_subexpr(f);
                rhs.for_each_subexpr(f);
            }
            Expr::UnOp { operand, .. } => operand.for_each_subexpr(f),
            Expr::Record { fields, .. } => {
                for (_, v) in fields {
                    v.for_each_subexpr(f);
                }
            }
            Expr::RecordAccess { record, .. } => record.for_each_subexpr(f),
            Expr::List { elems, .. } | Expr::Tuple { elems, .. } => {
                for e in elems {
                    e.for_each_subexpr(f);
                }
            }
            Expr::DictApp { dict, args, .. } => {
                dict.for_each_subexpr(f);
                for a in args {
                    a.for_each_subexpr(f);
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgramFlags {
    pub lowered: bool,
    pub linked: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BindingMeta {
    pub name: Symbol,
    pub is_export: bool,
    pub is_pure: bool,
    /// The function's declared effect row (§6.1), carried through from the
    /// surface decl so the type checker can check it against the binding's
    /// *inferred* effect row once inference finishes — `None` for a binding
    /// with no declared row (a statement binding, or a function that never
    /// wrote `effect { ... }`).
    pub effect_annot: Option<Vec<Symbol>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TopLevel {
    Let { name: Symbol, value: Expr },
    LetRec { bindings: Vec<(Symbol, Expr)> },
}

/// The elaborator's output, and every later stage's input/output (§2, §4.1).
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub bindings: Vec<TopLevel>,
    pub meta: Vec<BindingMeta>,
    pub flags: ProgramFlags,
}

impl Program {
    pub fn new() -> Self {
        Program { bindings: Vec::new(), meta: Vec::new(), flags: ProgramFlags::default() }
    }

    fn each_top_expr<'a>(&'a self, mut f: impl FnMut(&'a Expr)) {
        for b in &self.bindings {
            match b {
                TopLevel::Let { value, .. } => value.for_each_subexpr(&mut f),
                TopLevel::LetRec { bindings } => {
                    for (_, v) in bindings {
                        v.for_each_subexpr(&mut f);
                    }
                }
            }
        }
    }

    /// P1: every argument/operand/condition/scrutinee in the program is
    /// atomic.
    pub fn assert_anf(&self) -> Result<(), String> {
        let mut violation = None;
        self.each_top_expr(|e| {
            if violation.is_some() {
                return;
            }
            let non_atomic_children: Vec<&Expr> = match e {
                Expr::App { func, args, .. } => {
                    let mut v = vec![func.as_ref()];
                    v.extend(args.iter());
                    v
                }
                Expr::If { cond, .. } => vec![cond.as_ref()],
                Expr::Match { scrutinee, arms, .. } => {
                    let mut v = vec![scrutinee.as_ref()];
                    v.extend(arms.iter().filter_map(|a| a.guard.as_ref()));
                    v
                }
                Expr::Intrinsic { args, .. } => args.iter().collect(),
                Expr::BinOp { lhs, rhs, .. } => vec![lhs.as_ref(), rhs.as_ref()],
                Expr::UnOp { operand, .. } => vec![operand.as_ref()],
                Expr::Record { fields, .. } => fields.iter().map(|(_, v)| v).collect(),
                Expr::RecordAccess { record, .. } => vec![record.as_ref()],
                Expr::List { elems, .. } | Expr::Tuple { elems, .. } => elems.iter().collect(),
                Expr::DictApp { dict, args, .. } => {
                    let mut v = vec![dict.as_ref()];
                    v.extend(args.iter());
                    v
                }
                _ => Vec::new(),
            };
            for child in non_atomic_children {
                if !child.is_atomic() {
                    violation = Some(format!(
                        "non-atomic subterm {:?} in argument position at node {:?}",
                        child.id(),
                        e.id()
                    ));
                    return;
                }
            }
        });
        match violation {
            Some(msg) => Err(msg),
            None => Ok(()),
        }
    }

    /// P2: NodeId uniqueness across the whole program.
    pub fn node_ids_unique(&self) -> Result<(), NodeId> {
        let mut seen = rustc_hash::FxHashSet::default();
        let mut dup = None;
        self.each_top_expr(|e| {
            if dup.is_some() {
                return;
            }
            if !seen.insert(e.id()) {
                dup = Some(e.id());
            }
        });
        match dup {
            Some(id) => Err(id),
            None => Ok(()),
        }
    }

    /// P6: lowered programs contain no `Intrinsic` nodes.
    pub fn no_intrinsics(&self) -> bool {
        let mut found = false;
        self.each_top_expr(|e| {
            if matches!(e, Expr::Intrinsic { .. }) {
                found = true;
            }
        });
        !found
    }

    /// P5: dictionary-elaborated programs contain no `BinOp`/`UnOp` nodes.
    pub fn no_binop_unop(&self) -> bool {
        let mut found = false;
        self.each_top_expr(|e| {
            if matches!(e, Expr::BinOp { .. } | Expr::UnOp { .. }) {
                found = true;
            }
        });
        !found
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}
