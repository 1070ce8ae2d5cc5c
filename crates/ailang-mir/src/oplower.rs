//! OpLowering (§4.8): Core v2 → Core v3. Rewrites every remaining
//! `Intrinsic(op, args)` — the non-overloadable operators dictionary
//! elaboration left alone — into `App(VarGlobal("$builtin", name), args)`
//! against a fixed operator-to-builtin-name table.

use ailang_core::{Expr, IntrinsicOp, Program, TopLevel};
use ailang_syntax::BinOpKind;
use ailang_util::{symbol, NodeIdGen, Symbol};

/// The fixed `Intrinsic` → builtin-name mapping (§4.8). Every non-overloadable
/// binary operator is monomorphic in its operand type, so — unlike the
/// dictionary-dispatched operators — the builtin name is decidable from the
/// operator tag alone, with no type lookup required.
fn builtin_name_for(op: IntrinsicOp) -> Symbol {
    match op {
        IntrinsicOp::Bin(BinOpKind::And) => Symbol::intern("and_Bool"),
        IntrinsicOp::Bin(BinOpKind::Or) => Symbol::intern("or_Bool"),
        IntrinsicOp::Bin(BinOpKind::Concat) => Symbol::intern("concat_String"),
        IntrinsicOp::Bin(BinOpKind::Cons) => Symbol::intern("cons_List"),
        IntrinsicOp::Bin(other) => {
            unreachable!("{other:?} is dictionary-dispatched and should never reach OpLowering as an Intrinsic")
        }
    }
}

struct Lowerer<'a> {
    ids: &'a NodeIdGen,
}

impl<'a> Lowerer<'a> {
    fn lower_expr(&self, expr: Expr) -> Expr {
        match expr {
            Expr::Intrinsic { op, args, id } => {
                let name = builtin_name_for(op);
                let func = Expr::VarGlobal { module: symbol::MODULE_BUILTIN, name, id: self.ids.next() };
                Expr::App { func: Box::new(func), args: args.into_iter().map(|a| self.lower_expr(a)).collect(), id }
            }
            Expr::Let { name, value, body, id } => Expr::Let {
                name,
                value: Box::new(self.lower_expr(*value)),
                body: Box::new(self.lower_expr(*body)),
                id,
            },
            Expr::LetRec { bindings, body, id } => Expr::LetRec {
                bindings: bindings.into_iter().map(|(n, v)| (n, self.lower_expr(v))).collect(),
                body: Box::new(self.lower_expr(*body)),
                id,
            },
            Expr::App { func, args, id } => Expr::App {
                func: Box::new(self.lower_expr(*func)),
                args: args.into_iter().map(|a| self.lower_expr(a)).collect(),
                id,
            },
            Expr::If { cond, then_branch, else_branch, id } => Expr::If {
                cond: Box::new(self.lower_expr(*cond)),
                then_branch: Box::new(self.lower_expr(*then_branch)),
                else_branch: Box::new(self.lower_expr(*else_branch)),
                id,
            },
            Expr::Match { scrutinee, arms, exhaustive, id } => Expr::Match {
                scrutinee: Box::new(self.lower_expr(*scrutinee)),
                arms: arms
                    .into_iter()
                    .map(|arm| ailang_core::MatchArm {
                        pattern: arm.pattern,
                        guard: arm.guard.map(|g| self.lower_expr(g)),
                        body: self.lower_expr(arm.body),
                    })
                    .collect(),
                exhaustive,
                id,
            },
            Expr::BinOp { op, lhs, rhs, id } => {
                Expr::BinOp { op, lhs: Box::new(self.lower_expr(*lhs)), rhs: Box::new(self.lower_expr(*rhs)), id }
            }
            Expr::UnOp { op, operand, id } => Expr::UnOp { op, operand: Box::new(self.lower_expr(*operand)), id },
            Expr::Record { fields, id } => {
                Expr::Record { fields: fields.into_iter().map(|(n, v)| (n, self.lower_expr(v))).collect(), id }
            }
            Expr::RecordAccess { record, field, id } => {
                Expr::RecordAccess { record: Box::new(self.lower_expr(*record)), field, id }
            }
            Expr::List { elems, id } => {
                Expr::List { elems: elems.into_iter().map(|e| self.lower_expr(e)).collect(), id }
            }
            Expr::Tuple { elems, id } => {
                Expr::Tuple { elems: elems.into_iter().map(|e| self.lower_expr(e)).collect(), id }
            }
            Expr::DictApp { dict, method, args, id } => Expr::DictApp {
                dict: Box::new(self.lower_expr(*dict)),
                method,
                args: args.into_iter().map(|a| self.lower_expr(a)).collect(),
                id,
            },
            Expr::DictAbs { params, body, id } => {
                Expr::DictAbs { params, body: Box::new(self.lower_expr(*body)), id }
            }
            Expr::Lambda { params, body, id } => Expr::Lambda { params, body: Box::new(self.lower_expr(*body)), id },
            atomic @ (Expr::Var(..) | Expr::VarGlobal { .. } | Expr::Lit(..) | Expr::DictRef { .. }) => atomic,
        }
    }
}

/// Lowers every binding in `program`, then sets `flags.lowered` (§4.8):
/// later passes (the linker, §4.9) may reject any surviving `Intrinsic` node
/// as an internal-invariant breach rather than a user-facing error.
#[tracing::instrument(skip(program, ids))]
pub fn lower_program(mut program: Program, ids: &NodeIdGen) -> Program {
    let lowerer = Lowerer { ids };
    program.bindings = program
        .bindings
        .into_iter()
        .map(|b| match b {
            TopLevel::Let { name, value } => TopLevel::Let { name, value: lowerer.lower_expr(value) },
            TopLevel::LetRec { bindings } => {
                TopLevel::LetRec { bindings: bindings.into_iter().map(|(n, v)| (n, lowerer.lower_expr(v))).collect() }
            }
        })
        .collect();
    program.flags.lowered = true;
    program
}

#[cfg(test)]
mod tests {
    use super::*;
    use ailang_core::ProgramFlags;
    use ailang_syntax::Literal;

    #[test]
    fn intrinsic_and_becomes_builtin_call() {
        let ids = NodeIdGen::new();
        let l = Expr::Lit(Literal::Bool(true), ids.next());
        let r = Expr::Lit(Literal::Bool(false), ids.next());
        let intrinsic = Expr::Intrinsic { op: IntrinsicOp::Bin(BinOpKind::And), args: vec![l, r], id: ids.next() };
        let program = Program {
            bindings: vec![TopLevel::Let { name: Symbol::intern("x"), value: intrinsic }],
            meta: vec![],
            flags: ProgramFlags::default(),
        };
        let lowered = lower_program(program, &ids);
        assert!(lowered.flags.lowered);
        assert!(lowered.no_intrinsics());
        match &lowered.bindings[0] {
            TopLevel::Let { value: Expr::App { func, .. }, .. } => match func.as_ref() {
                Expr::VarGlobal { name, .. } => assert_eq!(name.as_str(), "and_Bool"),
                other => panic!("expected VarGlobal, got {other:?}"),
            },
            other => panic!("expected App, got {other:?}"),
        }
    }

    #[test]
    fn lowering_is_idempotent_on_a_program_with_no_intrinsics() {
        let ids = NodeIdGen::new();
        let program = Program {
            bindings: vec![TopLevel::Let { name: Symbol::intern("x"), value: Expr::Lit(Literal::Int(1), ids.next()) }],
            meta: vec![],
            flags: ProgramFlags::default(),
        };
        let lowered = lower_program(program, &ids);
        assert!(lowered.no_intrinsics());
    }
}
