//! Dictionary elaboration (§4.7, second half): rewrites `BinOp`/`UnOp` nodes
//! that carry a resolved class constraint into `DictApp(DictRef, method,
//! args)`. `Intrinsic` nodes are left untouched — OpLowering (§4.8) owns
//! those.

use ailang_core::Expr;
use ailang_util::NodeId;
use rustc_hash::FxHashMap;

use crate::solve::ResolvedConstraint;

/// Rewrites one expression tree bottom-up. `resolved` maps a `BinOp`/`UnOp`
/// node's own [`NodeId`] to the constraint dictionary elaboration resolved
/// for it; a node absent from the map is left alone (it was not overloaded,
/// e.g. `&&`/`||`/list cons, which never carry a class constraint).
pub fn elaborate_dicts(expr: Expr, resolved: &FxHashMap<NodeId, ResolvedConstraint>, ids: &ailang_util::NodeIdGen) -> Expr {
    match expr {
        Expr::BinOp { lhs, rhs, id, .. } => {
            let lhs = elaborate_dicts(*lhs, resolved, ids);
            let rhs = elaborate_dicts(*rhs, resolved, ids);
            let rc = resolved
                .get(&id)
                .unwrap_or_else(|| unreachable!("every overloadable BinOp must carry a resolved constraint"));
            Expr::DictApp {
                dict: Box::new(Expr::DictRef { class: rc.class, type_name: rc.dict_key, id: ids.next() }),
                method: rc.method,
                args: vec![lhs, rhs],
                id,
            }
        }
        Expr::UnOp { operand, id, .. } => {
            let operand = elaborate_dicts(*operand, resolved, ids);
            let rc = resolved
                .get(&id)
                .unwrap_or_else(|| unreachable!("every overloadable UnOp must carry a resolved constraint"));
            Expr::DictApp {
                dict: Box::new(Expr::DictRef { class: rc.class, type_name: rc.dict_key, id: ids.next() }),
                method: rc.method,
                args: vec![operand],
                id,
            }
        }
        Expr::Let { name, value, body, id } => Expr::Let {
            name,
            value: Box::new(elaborate_dicts(*value, resolved, ids)),
            body: Box::new(elaborate_dicts(*body, resolved, ids)),
            id,
        },
        Expr::LetRec { bindings, body, id } => Expr::LetRec {
            bindings: bindings.into_iter().map(|(n, v)| (n, elaborate_dicts(v, resolved, ids))).collect(),
            body: Box::new(elaborate_dicts(*body, resolved, ids)),
            id,
        },
        Expr::App { func, args, id } => Expr::App {
            func: Box::new(elaborate_dicts(*func, resolved, ids)),
            args: args.into_iter().map(|a| elaborate_dicts(a, resolved, ids)).collect(),
            id,
        },
        Expr::If { cond, then_branch, else_branch, id } => Expr::If {
            cond: Box::new(elaborate_dicts(*cond, resolved, ids)),
            then_branch: Box::new(elaborate_dicts(*then_branch, resolved, ids)),
            else_branch: Box::new(elaborate_dicts(*else_branch, resolved, ids)),
            id,
        },
        Expr::Match { scrutinee, arms, exhaustive, id } => Expr::Match {
            scrutinee: Box::new(elaborate_dicts(*scrutinee, resolved, ids)),
            arms: arms
                .into_iter()
                .map(|arm| ailang_core::MatchArm {
                    pattern: arm.pattern,
                    guard: arm.guard.map(|g| elaborate_dicts(g, resolved, ids)),
                    body: elaborate_dicts(arm.body, resolved, ids),
                })
                .collect(),
            exhaustive,
            id,
        },
        Expr::Intrinsic { op, args, id } => {
            Expr::Intrinsic { op, args: args.into_iter().map(|a| elaborate_dicts(a, resolved, ids)).collect(), id }
        }
        Expr::Record { fields, id } => Expr::Record {
            fields: fields.into_iter().map(|(n, v)| (n, elaborate_dicts(v, resolved, ids))).collect(),
            id,
        },
        Expr::RecordAccess { record, field, id } => {
            Expr::RecordAccess { record: Box::new(elaborate_dicts(*record, resolved, ids)), field, id }
        }
        Expr::List { elems, id } => {
            Expr::List { elems: elems.into_iter().map(|e| elaborate_dicts(e, resolved, ids)).collect(), id }
        }
        Expr::Tuple { elems, id } => {
            Expr::Tuple { elems: elems.into_iter().map(|e| elaborate_dicts(e, resolved, ids)).collect(), id }
        }
        Expr::DictApp { dict, method, args, id } => Expr::DictApp {
            dict: Box::new(elaborate_dicts(*dict, resolved, ids)),
            method,
            args: args.into_iter().map(|a| elaborate_dicts(a, resolved, ids)).collect(),
            id,
        },
        Expr::DictAbs { params, body, id } => {
            Expr::DictAbs { params, body: Box::new(elaborate_dicts(*body, resolved, ids)), id }
        }
        Expr::Lambda { params, body, id } => {
            Expr::Lambda { params, body: Box::new(elaborate_dicts(*body, resolved, ids)), id }
        }
        atomic @ (Expr::Var(..) | Expr::VarGlobal { .. } | Expr::Lit(..) | Expr::DictRef { .. }) => atomic,
    }
}
