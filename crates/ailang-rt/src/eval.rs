//! The evaluator (§4.10): a single-threaded tree-walking interpreter over
//! linked, lowered Core. Determinism follows from having no internal
//! nondeterministic choice — every external source is a capability-gated
//! builtin.

use std::rc::Rc;

use ailang_builtins::BuiltinRegistry;
use ailang_core::{ConstructorMap, Expr, Pattern, Program, TopLevel};
use ailang_syntax::Literal;
use ailang_util::{symbol, ErrorCode, Symbol};
use rustc_hash::FxHashMap;

use crate::effects::EffContext;
use crate::env::Env;
use crate::value::{Closure, DictValue, Value};

/// A host-fatal condition (§4.10, §6.3's `RT_*` vocabulary) — distinct from
/// an [`crate::value::ErrorValue`], which is an ordinary value a program
/// can construct and inspect.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RuntimeFault {
    pub code: ErrorCode,
    pub message: String,
}

fn fault(code: ErrorCode, message: impl Into<String>) -> RuntimeFault {
    RuntimeFault { code, message: message.into() }
}

pub struct Evaluator<'a> {
    pub registry: &'a BuiltinRegistry<Value, EffContext>,
    pub ctors: &'a ConstructorMap,
    pub dicts: &'a FxHashMap<(Symbol, Symbol), Rc<DictValue>>,
    pub globals: &'a FxHashMap<(Symbol, Symbol), Value>,
    pub eff: EffContext,
}

impl<'a> Evaluator<'a> {
    /// Evaluates every top-level binding in order, returning the last
    /// binding's value (§2's "program" is a sequence of bindings with no
    /// distinguished entry point at this layer — the driver decides which
    /// binding is `main`).
    pub fn eval_program(&self, program: &Program, env: &Env) -> Result<Value, RuntimeFault> {
        let mut last = Value::Unit;
        for binding in &program.bindings {
            match binding {
                TopLevel::Let { name, value } => {
                    last = self.eval(value, env)?;
                    env.bind(*name, last.clone());
                }
                TopLevel::LetRec { bindings } => {
                    for (name, _) in bindings {
                        env.bind(*name, Value::Unit);
                    }
                    for (name, expr) in bindings {
                        let v = self.eval(expr, env)?;
                        env.bind(*name, v.clone());
                        last = v;
                    }
                }
            }
        }
        Ok(last)
    }

    fn invoke_builtin(&self, name: Symbol, args: &[Value]) -> Result<Value, RuntimeFault> {
        let spec = self
            .registry
            .lookup(name)
            .ok_or_else(|| fault(ErrorCode::RtUnbound, format!("unknown builtin `{}`", name.as_str())))?;
        if args.len() != spec.num_args {
            return Err(fault(
                ErrorCode::RtArity,
                format!("`{}` expects {} argument(s), got {}", name.as_str(), spec.num_args, args.len()),
            ));
        }
        if let Some(label) = spec.effect_label {
            if !self.eff.has(label) {
                return Err(fault(
                    ErrorCode::RtCap,
                    format!("capability `{}` not granted for `{}`", label.as_str(), name.as_str()),
                ));
            }
        }
        (spec.implementation)(&self.eff, args).map_err(|e| {
            if e == "DIV0" {
                fault(ErrorCode::RtDiv0, "division by zero")
            } else {
                fault(ErrorCode::RtType, e)
            }
        })
    }

    fn apply(&self, callee: Value, args: Vec<Value>) -> Result<Value, RuntimeFault> {
        match callee {
            Value::Function(closure) => {
                if closure.params.len() != args.len() {
                    return Err(fault(
                        ErrorCode::RtArity,
                        format!("closure expects {} argument(s), got {}", closure.params.len(), args.len()),
                    ));
                }
                let call_env = closure.env.child();
                for (param, value) in closure.params.iter().zip(args) {
                    call_env.bind(*param, value);
                }
                self.eval(&closure.body, &call_env)
            }
            Value::Builtin(name) => self.invoke_builtin(name, &args),
            other => Err(fault(ErrorCode::RtType, format!("`{}` is not callable", other.type_name()))),
        }
    }

    fn eval_var_global(&self, module: Symbol, name: Symbol) -> Result<Value, RuntimeFault> {
        if module == symbol::MODULE_BUILTIN {
            return Ok(Value::Builtin(name));
        }
        if module == symbol::MODULE_ADT {
            let info = self
                .ctors
                .lookup(name)
                .ok_or_else(|| fault(ErrorCode::RtUnbound, format!("unknown constructor `{}`", name.as_str())))?;
            if info.arity != 0 {
                return Err(fault(
                    ErrorCode::RtArity,
                    format!("constructor `{}` takes {} argument(s) and cannot stand alone", name.as_str(), info.arity),
                ));
            }
            return Ok(Value::Tagged { type_name: info.type_name, ctor: name, tag: info.tag, fields: Rc::new(Vec::new()) });
        }
        self.globals
            .get(&(module, name))
            .cloned()
            .ok_or_else(|| fault(ErrorCode::RtUnbound, format!("`{}::{}` is not bound", module.as_str(), name.as_str())))
    }

    pub fn eval(&self, expr: &Expr, env: &Env) -> Result<Value, RuntimeFault> {
        match expr {
            Expr::Var(name, _) => env
                .lookup(*name)
                .ok_or_else(|| fault(ErrorCode::RtUnbound, format!("unbound variable `{}`", name.as_str()))),
            Expr::VarGlobal { module, name, .. } => self.eval_var_global(*module, *name),
            Expr::Lit(lit, _) => Ok(literal_value(lit)),
            Expr::Lambda { params, body, .. } | Expr::DictAbs { params, body, .. } => {
                Ok(Value::Function(Rc::new(Closure { params: params.clone(), body: (**body).clone(), env: env.clone() })))
            }
            Expr::DictRef { class, type_name, .. } => self
                .dicts
                .get(&(*class, *type_name))
                .map(|d| Value::Dict(d.clone()))
                .ok_or_else(|| {
                    fault(
                        ErrorCode::RtDictMethod,
                        format!("no dictionary for `{}::{}`", class.as_str(), type_name.as_str()),
                    )
                }),

            Expr::Let { name, value, body, .. } => {
                let v = self.eval(value, env)?;
                let child = env.child();
                child.bind(*name, v);
                self.eval(body, &child)
            }
            Expr::LetRec { bindings, body, .. } => {
                let child = env.child();
                for (name, _) in bindings {
                    child.bind(*name, Value::Unit);
                }
                for (name, expr) in bindings {
                    let v = self.eval(expr, &child)?;
                    child.bind(*name, v);
                }
                self.eval(body, &child)
            }
            Expr::App { func, args, .. } => {
                if let Expr::VarGlobal { module, name, .. } = func.as_ref() {
                    if *module == symbol::MODULE_ADT {
                        let info = self.ctors.lookup(*name).ok_or_else(|| {
                            fault(ErrorCode::RtUnbound, format!("unknown constructor `{}`", name.as_str()))
                        })?;
                        let values =
                            args.iter().map(|a| self.eval(a, env)).collect::<Result<Vec<_>, _>>()?;
                        if values.len() != info.arity {
                            return Err(fault(
                                ErrorCode::RtArity,
                                format!("`{}` expects {} argument(s), got {}", name.as_str(), info.arity, values.len()),
                            ));
                        }
                        return Ok(Value::Tagged {
                            type_name: info.type_name,
                            ctor: *name,
                            tag: info.tag,
                            fields: Rc::new(values),
                        });
                    }
                }
                let callee = self.eval(func, env)?;
                let values = args.iter().map(|a| self.eval(a, env)).collect::<Result<Vec<_>, _>>()?;
                self.apply(callee, values)
            }
            Expr::If { cond, then_branch, else_branch, .. } => match self.eval(cond, env)? {
                Value::Bool(true) => self.eval(then_branch, env),
                Value::Bool(false) => self.eval(else_branch, env),
                other => Err(fault(ErrorCode::RtType, format!("if condition is {}, not Bool", other.type_name()))),
            },
            Expr::Match { scrutinee, arms, .. } => {
                let value = self.eval(scrutinee, env)?;
                for arm in arms {
                    let child = env.child();
                    if !bind_pattern(&arm.pattern, &value, &child) {
                        continue;
                    }
                    if let Some(guard) = &arm.guard {
                        match self.eval(guard, &child)? {
                            Value::Bool(true) => {}
                            Value::Bool(false) => continue,
                            other => {
                                return Err(fault(ErrorCode::RtType, format!("guard is {}, not Bool", other.type_name())))
                            }
                        }
                    }
                    return self.eval(&arm.body, &child);
                }
                Err(fault(ErrorCode::RtMatch, "no arm matched the scrutinee"))
            }
            Expr::DictApp { dict, method, args, .. } => {
                let dval = self.eval(dict, env)?;
                let Value::Dict(d) = dval else {
                    return Err(fault(ErrorCode::RtDictMethod, "DictApp target is not a dictionary"));
                };
                let callee = d.methods.get(method).cloned().ok_or_else(|| {
                    fault(ErrorCode::RtDictMethod, format!("no method `{}` in dictionary", method.as_str()))
                })?;
                let values = args.iter().map(|a| self.eval(a, env)).collect::<Result<Vec<_>, _>>()?;
                self.apply(callee, values)
            }
            Expr::BinOp { .. } | Expr::UnOp { .. } => Err(fault(
                ErrorCode::RtUnelaborated,
                "BinOp/UnOp reached the evaluator: dictionary elaboration did not run to completion",
            )),
            Expr::Intrinsic { .. } => Err(fault(
                ErrorCode::RtUnelaborated,
                "Intrinsic reached the evaluator: op-lowering did not run to completion",
            )),
            Expr::Record { fields, .. } => {
                let mut map = FxHashMap::default();
                for (name, value_expr) in fields {
                    map.insert(*name, self.eval(value_expr, env)?);
                }
                Ok(Value::Record(Rc::new(map)))
            }
            Expr::RecordAccess { record, field, .. } => match self.eval(record, env)? {
                Value::Record(map) => map
                    .get(field)
                    .cloned()
                    .ok_or_else(|| fault(ErrorCode::RtType, format!("record has no field `{}`", field.as_str()))),
                other => Err(fault(ErrorCode::RtType, format!("`{}` is not a record", other.type_name()))),
            },
            Expr::List { elems, .. } => {
                Ok(Value::List(Rc::new(elems.iter().map(|e| self.eval(e, env)).collect::<Result<Vec<_>, _>>()?)))
            }
            Expr::Tuple { elems, .. } => {
                Ok(Value::Tuple(Rc::new(elems.iter().map(|e| self.eval(e, env)).collect::<Result<Vec<_>, _>>()?)))
            }
        }
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(x) => Value::Float(*x),
        Literal::String(s) => Value::String(s.as_str().into()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Unit => Value::Unit,
    }
}

fn literal_matches(lit: &Literal, value: &Value) -> bool {
    match (lit, value) {
        (Literal::Int(a), Value::Int(b)) => a == b,
        (Literal::Float(a), Value::Float(b)) => a == b,
        (Literal::String(a), Value::String(b)) => a.as_str() == &**b,
        (Literal::Bool(a), Value::Bool(b)) => a == b,
        (Literal::Unit, Value::Unit) => true,
        _ => false,
    }
}

/// Binds every `Pattern::Var` this pattern introduces into `env` and reports
/// whether `value` matches it overall. On a partial match some bindings may
/// already be in `env` — harmless, since a failed arm's child `Env` is
/// discarded by the caller.
fn bind_pattern(pattern: &Pattern, value: &Value, env: &Env) -> bool {
    match pattern {
        Pattern::Wildcard => true,
        Pattern::Var(name) => {
            env.bind(*name, value.clone());
            true
        }
        Pattern::Lit(lit) => literal_matches(lit, value),
        Pattern::Tuple(pats) => match value {
            Value::Tuple(items) if items.len() == pats.len() => {
                pats.iter().zip(items.iter()).all(|(p, v)| bind_pattern(p, v, env))
            }
            _ => false,
        },
        Pattern::List(pats, rest) => match value {
            Value::List(items) => {
                if items.len() < pats.len() || (rest.is_none() && items.len() != pats.len()) {
                    return false;
                }
                if !pats.iter().zip(items.iter()).all(|(p, v)| bind_pattern(p, v, env)) {
                    return false;
                }
                match rest {
                    Some(tail_pat) => {
                        let tail = Value::List(Rc::new(items[pats.len()..].to_vec()));
                        bind_pattern(tail_pat, &tail, env)
                    }
                    None => true,
                }
            }
            _ => false,
        },
        Pattern::Record(fields) => match value {
            Value::Record(map) => {
                fields.iter().all(|(name, p)| map.get(name).map(|v| bind_pattern(p, v, env)).unwrap_or(false))
            }
            _ => false,
        },
        Pattern::Constructor(name, pats) => match value {
            Value::Tagged { ctor, fields, .. } if ctor == name && fields.len() == pats.len() => {
                pats.iter().zip(fields.iter()).all(|(p, v)| bind_pattern(p, v, env))
            }
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{build_dict_table, prelude_registry};
    use ailang_core::adt::ConstructorInfo;
    use ailang_util::NodeIdGen;

    fn evaluator<'a>(
        registry: &'a BuiltinRegistry<Value, EffContext>,
        ctors: &'a ConstructorMap,
        dicts: &'a FxHashMap<(Symbol, Symbol), Rc<DictValue>>,
        globals: &'a FxHashMap<(Symbol, Symbol), Value>,
    ) -> Evaluator<'a> {
        Evaluator { registry, ctors, dicts, globals, eff: EffContext::full() }
    }

    #[test]
    fn literal_and_arithmetic_via_dict_app() {
        let registry = prelude_registry();
        let dicts = build_dict_table(&registry);
        let ctors = ConstructorMap::new();
        let globals = FxHashMap::default();
        let ev = evaluator(&registry, &ctors, &dicts, &globals);
        let env = Env::root();

        let ids = NodeIdGen::new();
        let lhs = Expr::Lit(Literal::Int(2), ids.next());
        let rhs = Expr::Lit(Literal::Int(3), ids.next());
        let dict_ref = Expr::DictRef { class: symbol::CLASS_NUM, type_name: symbol::TY_INT, id: ids.next() };
        let app = Expr::DictApp { dict: Box::new(dict_ref), method: symbol::METHOD_ADD, args: vec![lhs, rhs], id: ids.next() };
        let result = ev.eval(&app, &env).unwrap();
        assert!(matches!(result, Value::Int(5)));
    }

    #[test]
    fn unbound_variable_is_rt_unbound() {
        let registry = prelude_registry();
        let dicts = build_dict_table(&registry);
        let ctors = ConstructorMap::new();
        let globals = FxHashMap::default();
        let ev = evaluator(&registry, &ctors, &dicts, &globals);
        let env = Env::root();
        let ids = NodeIdGen::new();
        let err = ev.eval(&Expr::Var(Symbol::intern("x"), ids.next()), &env).unwrap_err();
        assert_eq!(err.code, ErrorCode::RtUnbound);
    }

    #[test]
    fn div_by_zero_is_rt_div0() {
        let registry = prelude_registry();
        let dicts = build_dict_table(&registry);
        let ctors = ConstructorMap::new();
        let globals = FxHashMap::default();
        let ev = evaluator(&registry, &ctors, &dicts, &globals);
        let env = Env::root();
        let ids = NodeIdGen::new();
        let lhs = Expr::Lit(Literal::Int(1), ids.next());
        let rhs = Expr::Lit(Literal::Int(0), ids.next());
        let dict_ref = Expr::DictRef { class: symbol::CLASS_NUM, type_name: symbol::TY_INT, id: ids.next() };
        let app = Expr::DictApp { dict: Box::new(dict_ref), method: symbol::METHOD_DIV, args: vec![lhs, rhs], id: ids.next() };
        let err = ev.eval(&app, &env).unwrap_err();
        assert_eq!(err.code, ErrorCode::RtDiv0);
    }

    #[test]
    fn missing_capability_is_rt_cap() {
        let registry = prelude_registry();
        let dicts = build_dict_table(&registry);
        let ctors = ConstructorMap::new();
        let globals = FxHashMap::default();
        let ev = Evaluator { registry: &registry, ctors: &ctors, dicts: &dicts, globals: &globals, eff: EffContext::none() };
        let err = ev.invoke_builtin(Symbol::intern("_trace_log"), &[Value::String("hi".into())]).unwrap_err();
        assert_eq!(err.code, ErrorCode::RtCap);
    }

    #[test]
    fn match_falls_through_to_rt_match_when_no_arm_fits() {
        let registry = prelude_registry();
        let dicts = build_dict_table(&registry);
        let ctors = ConstructorMap::new();
        let globals = FxHashMap::default();
        let ev = evaluator(&registry, &ctors, &dicts, &globals);
        let env = Env::root();
        let ids = NodeIdGen::new();
        let scrutinee = Expr::Lit(Literal::Int(1), ids.next());
        let arm = ailang_core::MatchArm {
            pattern: Pattern::Lit(Literal::Int(2)),
            guard: None,
            body: Expr::Lit(Literal::Unit, ids.next()),
        };
        let m = Expr::Match { scrutinee: Box::new(scrutinee), arms: vec![arm], exhaustive: false, id: ids.next() };
        let err = ev.eval(&m, &env).unwrap_err();
        assert_eq!(err.code, ErrorCode::RtMatch);
    }

    #[test]
    fn nullary_constructor_evaluates_to_a_tagged_value() {
        let registry = prelude_registry();
        let dicts = build_dict_table(&registry);
        let mut ctors = ConstructorMap::new();
        let nil = Symbol::intern("Nil");
        ctors.register(ConstructorInfo { type_name: Symbol::intern("List"), ctor_name: nil, arity: 0, tag: 0 }).unwrap();
        let globals = FxHashMap::default();
        let ev = evaluator(&registry, &ctors, &dicts, &globals);
        let env = Env::root();
        let ids = NodeIdGen::new();
        let expr = Expr::VarGlobal { module: symbol::MODULE_ADT, name: nil, id: ids.next() };
        let result = ev.eval(&expr, &env).unwrap();
        assert!(matches!(result, Value::Tagged { ctor, .. } if ctor == nil));
    }
}
