//! Concretely instantiates [`BuiltinRegistry`] over `(Value, EffContext)` and
//! attaches a real Rust closure to every descriptor in the frozen surface
//! (§6.2). This is the one place `ailang-builtins`' value-agnostic surface
//! meets an actual value representation.

use std::rc::Rc;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ailang_builtins::{stdlib_surface, BuiltinRegistry, BuiltinSpec};
use ailang_util::{symbol, Symbol};
use rustc_hash::FxHashMap;

use crate::effects::EffContext;
use crate::value::{DictValue, ErrorValue, Value};

fn as_int(v: &Value) -> Result<i64, String> {
    match v {
        Value::Int(n) => Ok(*n),
        other => Err(format!("expected Int, found {}", other.type_name())),
    }
}
fn as_float(v: &Value) -> Result<f64, String> {
    match v {
        Value::Float(x) => Ok(*x),
        other => Err(format!("expected Float, found {}", other.type_name())),
    }
}
fn as_bool(v: &Value) -> Result<bool, String> {
    match v {
        Value::Bool(b) => Ok(*b),
        other => Err(format!("expected Bool, found {}", other.type_name())),
    }
}
fn as_str(v: &Value) -> Result<Rc<str>, String> {
    match v {
        Value::String(s) => Ok(s.clone()),
        other => Err(format!("expected String, found {}", other.type_name())),
    }
}

/// Sentinel error message `invoke_builtin` (in `eval.rs`) recognizes and
/// remaps to `RT_DIV0`; every other `Err` becomes `RT_TYPE`.
const DIV0: &str = "DIV0";

fn json_type_name() -> Symbol {
    Symbol::intern("Json")
}
fn result_type_name() -> Symbol {
    Symbol::intern("Result")
}

fn tagged_json(ctor: &str, tag: usize, fields: Vec<Value>) -> Value {
    Value::Tagged { type_name: json_type_name(), ctor: Symbol::intern(ctor), tag, fields: Rc::new(fields) }
}

fn result_ok(v: Value) -> Value {
    Value::Tagged { type_name: result_type_name(), ctor: Symbol::intern("Ok"), tag: 0, fields: Rc::new(vec![v]) }
}
fn result_err(v: Value) -> Value {
    Value::Tagged { type_name: result_type_name(), ctor: Symbol::intern("Err"), tag: 1, fields: Rc::new(vec![v]) }
}

/// `serde_json::Value` → the runtime's `Json` representation (§6.2): a
/// `Value::Tagged` per JSON node kind rather than a dedicated `Value`
/// variant, so pattern matches elsewhere in `eval.rs` don't need to learn a
/// new case. `Object` keeps its entries as an ordered list of `(String,
/// Json)` tuples instead of a `Record`, since record field order is not
/// semantically significant but JSON key order is.
fn json_to_value(j: &serde_json::Value) -> Value {
    match j {
        serde_json::Value::Null => tagged_json("Null", 0, vec![]),
        serde_json::Value::Bool(b) => tagged_json("Bool", 1, vec![Value::Bool(*b)]),
        serde_json::Value::Number(n) => tagged_json("Number", 2, vec![Value::Float(n.as_f64().unwrap_or(0.0))]),
        serde_json::Value::String(s) => tagged_json("Str", 3, vec![Value::String(s.as_str().into())]),
        serde_json::Value::Array(items) => {
            let values = items.iter().map(json_to_value).collect::<Vec<_>>();
            tagged_json("Array", 4, vec![Value::List(Rc::new(values))])
        }
        serde_json::Value::Object(map) => {
            let pairs = map
                .iter()
                .map(|(k, v)| Value::Tuple(Rc::new(vec![Value::String(k.as_str().into()), json_to_value(v)])))
                .collect::<Vec<_>>();
            tagged_json("Object", 5, vec![Value::List(Rc::new(pairs))])
        }
    }
}

fn value_to_json(v: &Value) -> Result<serde_json::Value, String> {
    let (ctor, fields) = match v {
        Value::Tagged { type_name, ctor, fields, .. } if *type_name == json_type_name() => (ctor.as_str(), fields),
        other => return Err(format!("expected Json, found {}", other.type_name())),
    };
    match ctor {
        "Null" => Ok(serde_json::Value::Null),
        "Bool" => Ok(serde_json::Value::Bool(as_bool(&fields[0])?)),
        "Number" => serde_json::Number::from_f64(as_float(&fields[0])?)
            .map(serde_json::Value::Number)
            .ok_or_else(|| "Json Number field is not finite".to_string()),
        "Str" => Ok(serde_json::Value::String(as_str(&fields[0])?.to_string())),
        "Array" => {
            let items = match &fields[0] {
                Value::List(items) => items,
                other => return Err(format!("Json Array field must be a List, found {}", other.type_name())),
            };
            Ok(serde_json::Value::Array(items.iter().map(value_to_json).collect::<Result<Vec<_>, _>>()?))
        }
        "Object" => {
            let pairs = match &fields[0] {
                Value::List(items) => items,
                other => return Err(format!("Json Object field must be a List, found {}", other.type_name())),
            };
            let mut map = serde_json::Map::new();
            for pair in pairs.iter() {
                match pair {
                    Value::Tuple(kv) if kv.len() == 2 => {
                        map.insert(as_str(&kv[0])?.to_string(), value_to_json(&kv[1])?);
                    }
                    other => {
                        return Err(format!(
                            "Json Object entry must be a (String, Json) tuple, found {}",
                            other.type_name()
                        ))
                    }
                }
            }
            Ok(serde_json::Value::Object(map))
        }
        other => Err(format!("unknown Json constructor `{other}`")),
    }
}

macro_rules! int_binop {
    ($f:expr) => {
        Arc::new(|_ctx: &EffContext, args: &[Value]| -> Result<Value, String> {
            let a = as_int(&args[0])?;
            let b = as_int(&args[1])?;
            $f(a, b)
        })
    };
}

fn implementation_for(name: &str) -> ailang_builtins::BuiltinFn<Value, EffContext> {
    match name {
        "add_Int" => int_binop!(|a: i64, b: i64| Ok(Value::Int(a.wrapping_add(b)))),
        "sub_Int" => int_binop!(|a: i64, b: i64| Ok(Value::Int(a.wrapping_sub(b)))),
        "mul_Int" => int_binop!(|a: i64, b: i64| Ok(Value::Int(a.wrapping_mul(b)))),
        "div_Int" => int_binop!(|a: i64, b: i64| if b == 0 { Err(DIV0.to_string()) } else { Ok(Value::Int(a / b)) }),
        "mod_Int" => int_binop!(|a: i64, b: i64| if b == 0 { Err(DIV0.to_string()) } else { Ok(Value::Int(a % b)) }),
        "eq_Int" => int_binop!(|a: i64, b: i64| Ok(Value::Bool(a == b))),
        "neq_Int" => int_binop!(|a: i64, b: i64| Ok(Value::Bool(a != b))),
        "lt_Int" => int_binop!(|a: i64, b: i64| Ok(Value::Bool(a < b))),
        "lte_Int" => int_binop!(|a: i64, b: i64| Ok(Value::Bool(a <= b))),
        "gt_Int" => int_binop!(|a: i64, b: i64| Ok(Value::Bool(a > b))),
        "gte_Int" => int_binop!(|a: i64, b: i64| Ok(Value::Bool(a >= b))),
        "neg_Int" => Arc::new(|_ctx, args| Ok(Value::Int(-as_int(&args[0])?))),

        "add_Float" => Arc::new(|_ctx, args| Ok(Value::Float(as_float(&args[0])? + as_float(&args[1])?))),
        "sub_Float" => Arc::new(|_ctx, args| Ok(Value::Float(as_float(&args[0])? - as_float(&args[1])?))),
        "mul_Float" => Arc::new(|_ctx, args| Ok(Value::Float(as_float(&args[0])? * as_float(&args[1])?))),
        // IEEE-754 handles zero division on its own (±Inf, NaN) — no check needed.
        "div_Float" => Arc::new(|_ctx, args| Ok(Value::Float(as_float(&args[0])? / as_float(&args[1])?))),
        "mod_Float" => Arc::new(|_ctx, args| Ok(Value::Float(as_float(&args[0])? % as_float(&args[1])?))),
        "eq_Float" => Arc::new(|_ctx, args| Ok(Value::Bool(as_float(&args[0])? == as_float(&args[1])?))),
        "neq_Float" => Arc::new(|_ctx, args| Ok(Value::Bool(as_float(&args[0])? != as_float(&args[1])?))),
        "lt_Float" => Arc::new(|_ctx, args| Ok(Value::Bool(as_float(&args[0])? < as_float(&args[1])?))),
        "lte_Float" => Arc::new(|_ctx, args| Ok(Value::Bool(as_float(&args[0])? <= as_float(&args[1])?))),
        "gt_Float" => Arc::new(|_ctx, args| Ok(Value::Bool(as_float(&args[0])? > as_float(&args[1])?))),
        "gte_Float" => Arc::new(|_ctx, args| Ok(Value::Bool(as_float(&args[0])? >= as_float(&args[1])?))),
        "neg_Float" => Arc::new(|_ctx, args| Ok(Value::Float(-as_float(&args[0])?))),

        "eq_Bool" => Arc::new(|_ctx, args| Ok(Value::Bool(as_bool(&args[0])? == as_bool(&args[1])?))),
        "neq_Bool" => Arc::new(|_ctx, args| Ok(Value::Bool(as_bool(&args[0])? != as_bool(&args[1])?))),
        "not_Bool" => Arc::new(|_ctx, args| Ok(Value::Bool(!as_bool(&args[0])?))),

        "eq_String" => Arc::new(|_ctx, args| Ok(Value::Bool(as_str(&args[0])? == as_str(&args[1])?))),
        "neq_String" => Arc::new(|_ctx, args| Ok(Value::Bool(as_str(&args[0])? != as_str(&args[1])?))),
        "lt_String" => Arc::new(|_ctx, args| Ok(Value::Bool(*as_str(&args[0])? < *as_str(&args[1])?))),
        "lte_String" => Arc::new(|_ctx, args| Ok(Value::Bool(*as_str(&args[0])? <= *as_str(&args[1])?))),
        "gt_String" => Arc::new(|_ctx, args| Ok(Value::Bool(*as_str(&args[0])? > *as_str(&args[1])?))),
        "gte_String" => Arc::new(|_ctx, args| Ok(Value::Bool(*as_str(&args[0])? >= *as_str(&args[1])?))),

        "and_Bool" => Arc::new(|_ctx, args| Ok(Value::Bool(as_bool(&args[0])? && as_bool(&args[1])?))),
        "or_Bool" => Arc::new(|_ctx, args| Ok(Value::Bool(as_bool(&args[0])? || as_bool(&args[1])?))),
        "concat_String" => {
            Arc::new(|_ctx, args| Ok(Value::String(format!("{}{}", as_str(&args[0])?, as_str(&args[1])?).into())))
        }
        "cons_List" => Arc::new(|_ctx, args| {
            let tail = match &args[1] {
                Value::List(items) => items,
                other => return Err(format!("expected List, found {}", other.type_name())),
            };
            let mut items = Vec::with_capacity(tail.len() + 1);
            items.push(args[0].clone());
            items.extend(tail.iter().cloned());
            Ok(Value::List(Rc::new(items)))
        }),

        "show" => Arc::new(|_ctx, args| Ok(Value::String(args[0].show().into()))),

        "_str_len" => Arc::new(|_ctx, args| Ok(Value::Int(as_str(&args[0])?.chars().count() as i64))),
        "_str_slice" => Arc::new(|_ctx, args| {
            let s = as_str(&args[0])?;
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            let start = as_int(&args[1])?.clamp(0, len) as usize;
            let end = as_int(&args[2])?.clamp(0, len) as usize;
            if start >= end {
                return Ok(Value::String("".into()));
            }
            Ok(Value::String(chars[start..end].iter().collect::<String>().into()))
        }),
        "_str_compare" => Arc::new(|_ctx, args| {
            let ordering = as_str(&args[0])?.as_ref().cmp(as_str(&args[1])?.as_ref());
            Ok(Value::Int(match ordering {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            }))
        }),
        "_str_eq" => Arc::new(|_ctx, args| Ok(Value::Bool(as_str(&args[0])? == as_str(&args[1])?))),
        "_str_find" => Arc::new(|_ctx, args| {
            let haystack = as_str(&args[0])?;
            let needle = as_str(&args[1])?;
            match haystack.find(needle.as_ref()) {
                Some(byte_idx) => Ok(Value::Int(haystack[..byte_idx].chars().count() as i64)),
                None => Ok(Value::Int(-1)),
            }
        }),
        "_str_upper" => Arc::new(|_ctx, args| Ok(Value::String(as_str(&args[0])?.to_uppercase().into()))),
        "_str_lower" => Arc::new(|_ctx, args| Ok(Value::String(as_str(&args[0])?.to_lowercase().into()))),
        "_str_trim" => Arc::new(|_ctx, args| Ok(Value::String(as_str(&args[0])?.trim().to_string().into()))),

        "intToFloat" => Arc::new(|_ctx, args| Ok(Value::Float(as_int(&args[0])? as f64))),
        "floatToInt" => Arc::new(|_ctx, args| Ok(Value::Int(as_float(&args[0])? as i64))),

        "_io_print" => Arc::new(|_ctx, args| {
            use std::io::Write;
            print!("{}", as_str(&args[0])?);
            std::io::stdout().flush().map_err(|e| e.to_string())?;
            Ok(Value::Unit)
        }),
        "_io_println" => Arc::new(|_ctx, args| {
            println!("{}", as_str(&args[0])?);
            Ok(Value::Unit)
        }),
        "_io_readLine" => Arc::new(|_ctx, _args| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map_err(|e| e.to_string())?;
            Ok(Value::String(line.trim_end_matches('\n').to_string().into()))
        }),
        "_fs_read_file" => Arc::new(|_ctx, args| {
            std::fs::read_to_string(&*as_str(&args[0])?).map(|s| Value::String(s.into())).map_err(|e| e.to_string())
        }),
        "_net_httpRequest" => Arc::new(|_ctx, _args| {
            Ok(result_err(Value::Error(Rc::new(ErrorValue {
                tag: Symbol::intern("NetError"),
                message: "network access is not available in this evaluator".to_string(),
            }))))
        }),
        "_clock_now_millis" => Arc::new(|_ctx, _args| {
            let now = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|e| e.to_string())?;
            Ok(Value::Int(now.as_millis() as i64))
        }),
        "_rand_int" => Arc::new(|_ctx, args| {
            let lo = as_int(&args[0])?;
            let hi = as_int(&args[1])?;
            if hi <= lo {
                return Err(format!("invalid range [{lo}, {hi})"));
            }
            let seed = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|e| e.to_string())?.as_nanos() as u64;
            // splitmix64, good enough for a non-cryptographic stdlib primitive.
            let mut z = seed.wrapping_add(0x9E3779B97F4A7C15);
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
            z ^= z >> 31;
            let span = (hi - lo) as u64;
            Ok(Value::Int(lo + (z % span) as i64))
        }),
        "_trace_log" => Arc::new(|_ctx, args| {
            tracing::info!(target: "ailang::trace", "{}", as_str(&args[0])?);
            Ok(Value::Unit)
        }),
        "_json_encode" => Arc::new(|_ctx, args| {
            let json = value_to_json(&args[0])?;
            serde_json::to_string(&json).map(|s| Value::String(s.into())).map_err(|e| e.to_string())
        }),
        "_json_decode" => Arc::new(|_ctx, args| {
            let text = as_str(&args[0])?;
            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(parsed) => Ok(result_ok(json_to_value(&parsed))),
                Err(e) => Ok(result_err(Value::String(e.to_string().into()))),
            }
        }),

        other => unreachable!("builtin `{other}` is in the frozen surface but has no implementation wired"),
    }
}

/// Builds and freezes a registry populated with every descriptor in the
/// frozen surface, each paired with its concrete implementation.
pub fn prelude_registry() -> BuiltinRegistry<Value, EffContext> {
    let registry = BuiltinRegistry::new();
    for descriptor in stdlib_surface() {
        let spec = BuiltinSpec {
            module: descriptor.module,
            name: descriptor.name,
            num_args: descriptor.num_args,
            is_pure: descriptor.is_pure,
            effect_label: descriptor.effect_label,
            type_builder: descriptor.type_builder,
            implementation: implementation_for(descriptor.name.as_str()),
        };
        registry.register(spec).expect("frozen surface descriptors must pass §4.5 validation");
    }
    registry.freeze();
    registry
}

/// The four classes the frozen surface's naming convention implies
/// (`{method}_{Type}`), grouped by which type each method's dictionary is
/// built for. `ailang-classes` resolves constraints to these same class
/// symbols; `ailang-rt` only needs the grouping to assemble [`DictValue`]s.
fn class_table() -> Vec<(Symbol, Symbol, Vec<Symbol>)> {
    use symbol::*;
    vec![
        (CLASS_NUM, TY_INT, vec![METHOD_ADD, METHOD_SUB, METHOD_MUL, METHOD_DIV, METHOD_MOD, METHOD_EQ, METHOD_NEQ, METHOD_LT, METHOD_LTE, METHOD_GT, METHOD_GTE, METHOD_NEG]),
        (CLASS_FRACTIONAL, TY_FLOAT, vec![METHOD_ADD, METHOD_SUB, METHOD_MUL, METHOD_DIV, METHOD_MOD, METHOD_EQ, METHOD_NEQ, METHOD_LT, METHOD_LTE, METHOD_GT, METHOD_GTE, METHOD_NEG]),
        (Symbol::intern("Eq"), TY_BOOL, vec![METHOD_EQ, METHOD_NEQ, METHOD_NOT]),
        (Symbol::intern("Ord"), TY_STRING, vec![METHOD_EQ, METHOD_NEQ, METHOD_LT, METHOD_LTE, METHOD_GT, METHOD_GTE]),
    ]
}

/// Builds the `(class, type) -> DictValue` table dictionary elaboration's
/// `DictRef` nodes resolve against, pairing each with the matching builtin
/// in `registry` by the `{method}_{Type}` naming convention.
pub fn build_dict_table(
    registry: &BuiltinRegistry<Value, EffContext>,
) -> FxHashMap<(Symbol, Symbol), Rc<DictValue>> {
    let mut table = FxHashMap::default();
    for (class, type_name, methods) in class_table() {
        let mut resolved = FxHashMap::default();
        for method in methods {
            let builtin_name = Symbol::intern(&format!("{}_{}", method.as_str(), type_name.as_str()));
            if registry.lookup(builtin_name).is_some() {
                resolved.insert(method, Value::Builtin(builtin_name));
            }
        }
        table.insert((class, type_name), Rc::new(DictValue { class, type_name, methods: resolved }));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_every_surface_name() {
        let registry = prelude_registry();
        for d in stdlib_surface() {
            assert!(registry.lookup(d.name).is_some(), "{} missing", d.name.as_str());
        }
    }

    #[test]
    fn int_division_by_zero_returns_div0_sentinel() {
        let registry = prelude_registry();
        let spec = registry.lookup(Symbol::intern("div_Int")).unwrap();
        let err = (spec.implementation)(&EffContext::none(), &[Value::Int(1), Value::Int(0)]).unwrap_err();
        assert_eq!(err, DIV0);
    }

    #[test]
    fn float_division_by_zero_is_infinity_not_an_error() {
        let registry = prelude_registry();
        let spec = registry.lookup(Symbol::intern("div_Float")).unwrap();
        let result = (spec.implementation)(&EffContext::none(), &[Value::Float(1.0), Value::Float(0.0)]).unwrap();
        assert!(matches!(result, Value::Float(f) if f.is_infinite()));
    }

    #[test]
    fn dict_table_has_num_dict_with_add_method() {
        let registry = prelude_registry();
        let dicts = build_dict_table(&registry);
        let num_int = dicts.get(&(symbol::CLASS_NUM, symbol::TY_INT)).unwrap();
        assert!(num_int.methods.contains_key(&symbol::METHOD_ADD));
    }

    #[test]
    fn and_or_cons_and_concat_are_wired_under_their_oplowering_names() {
        let registry = prelude_registry();
        let and_spec = registry.lookup(Symbol::intern("and_Bool")).unwrap();
        let and_result =
            (and_spec.implementation)(&EffContext::none(), &[Value::Bool(true), Value::Bool(false)]).unwrap();
        assert!(matches!(and_result, Value::Bool(false)));

        let concat_spec = registry.lookup(Symbol::intern("concat_String")).unwrap();
        let joined = (concat_spec.implementation)(
            &EffContext::none(),
            &[Value::String("foo".into()), Value::String("bar".into())],
        )
        .unwrap();
        assert!(matches!(joined, Value::String(s) if &*s == "foobar"));

        let cons_spec = registry.lookup(Symbol::intern("cons_List")).unwrap();
        let list = (cons_spec.implementation)(
            &EffContext::none(),
            &[Value::Int(1), Value::List(Rc::new(vec![Value::Int(2), Value::Int(3)]))],
        )
        .unwrap();
        match list {
            Value::List(items) => {
                assert_eq!(items.len(), 3);
                assert!(matches!(items[0], Value::Int(1)));
                assert!(matches!(items[1], Value::Int(2)));
                assert!(matches!(items[2], Value::Int(3)));
            }
            other => panic!("expected List, found {other:?}"),
        }
    }

    #[test]
    fn json_round_trips_through_encode_and_decode_preserving_object_key_order() {
        let registry = prelude_registry();
        let decode = registry.lookup(Symbol::intern("_json_decode")).unwrap();
        let encode = registry.lookup(Symbol::intern("_json_encode")).unwrap();

        let text = r#"{"z":1,"a":2,"m":3}"#;
        let decoded = (decode.implementation)(&EffContext::none(), &[Value::String(text.into())]).unwrap();
        let json = match decoded {
            Value::Tagged { ctor, fields, .. } if ctor == Symbol::intern("Ok") => fields[0].clone(),
            other => panic!("expected Ok(Json), found {other:?}"),
        };

        let encoded = (encode.implementation)(&EffContext::none(), &[json]).unwrap();
        assert!(matches!(encoded, Value::String(s) if &*s == text));
    }

    #[test]
    fn json_decode_of_invalid_text_returns_err_not_a_runtime_fault() {
        let registry = prelude_registry();
        let decode = registry.lookup(Symbol::intern("_json_decode")).unwrap();
        let decoded =
            (decode.implementation)(&EffContext::none(), &[Value::String("{not json".into())]).unwrap();
        assert!(matches!(decoded, Value::Tagged { ctor, .. } if ctor == Symbol::intern("Err")));
    }

    #[test]
    fn net_http_request_honestly_reports_unavailable_rather_than_fabricating_a_response() {
        let registry = prelude_registry();
        let spec = registry.lookup(Symbol::intern("_net_httpRequest")).unwrap();
        let args = [
            Value::String("GET".into()),
            Value::String("https://example.invalid".into()),
            Value::List(Rc::new(vec![])),
            Value::String("".into()),
        ];
        let result = (spec.implementation)(&EffContext::none(), &args).unwrap();
        match result {
            Value::Tagged { ctor, fields, .. } if ctor == Symbol::intern("Err") => {
                assert!(matches!(&fields[0], Value::Error(e) if e.tag == Symbol::intern("NetError")));
            }
            other => panic!("expected Err(NetError), found {other:?}"),
        }
    }
}
