//! The frozen §6.2 builtin surface (CI5): the golden list of every
//! primitive's name, arity, purity, and type signature. `ailang-rt` attaches
//! the Rust implementation and calls [`BuiltinRegistry::register`] once per
//! descriptor at process init; this module is the single source of truth for
//! what that surface contains, so a change here is the one place a reviewer
//! needs to look to see the stdlib's shape change.

use std::collections::BTreeMap;

use ailang_core::{EffectRow, FieldRow, InferId, Kind, Type};
use ailang_util::{symbol, Idx, Symbol};

#[derive(Clone, Copy)]
pub struct BuiltinDescriptor {
    pub module: Symbol,
    pub name: Symbol,
    pub num_args: usize,
    pub is_pure: bool,
    pub effect_label: Option<Symbol>,
    pub type_builder: fn() -> Type,
}

fn binop(ty: fn() -> Type, method: Symbol, type_name: Symbol) -> BuiltinDescriptor {
    BuiltinDescriptor {
        module: symbol::MODULE_BUILTIN,
        name: Symbol::intern(&format!("{}_{}", method.as_str(), type_name.as_str())),
        num_args: 2,
        is_pure: true,
        effect_label: None,
        type_builder: ty,
    }
}

fn unop(ty: fn() -> Type, method: Symbol, type_name: Symbol) -> BuiltinDescriptor {
    BuiltinDescriptor {
        module: symbol::MODULE_BUILTIN,
        name: Symbol::intern(&format!("{}_{}", method.as_str(), type_name.as_str())),
        num_args: 1,
        is_pure: true,
        effect_label: None,
        type_builder: ty,
    }
}

fn int_binop() -> Type {
    Type::Func(vec![Type::int(), Type::int()], Box::new(Type::int()), EffectRow::empty())
}
fn int_cmp() -> Type {
    Type::Func(vec![Type::int(), Type::int()], Box::new(Type::bool()), EffectRow::empty())
}
fn float_binop() -> Type {
    Type::Func(vec![Type::float(), Type::float()], Box::new(Type::float()), EffectRow::empty())
}
fn float_cmp() -> Type {
    Type::Func(vec![Type::float(), Type::float()], Box::new(Type::bool()), EffectRow::empty())
}
fn bool_cmp() -> Type {
    Type::Func(vec![Type::bool(), Type::bool()], Box::new(Type::bool()), EffectRow::empty())
}
fn string_cmp() -> Type {
    Type::Func(vec![Type::string(), Type::string()], Box::new(Type::bool()), EffectRow::empty())
}
fn int_neg() -> Type {
    Type::Func(vec![Type::int()], Box::new(Type::int()), EffectRow::empty())
}
fn float_neg() -> Type {
    Type::Func(vec![Type::float()], Box::new(Type::float()), EffectRow::empty())
}
fn bool_not() -> Type {
    Type::Func(vec![Type::bool()], Box::new(Type::bool()), EffectRow::empty())
}

/// The pinned operator→method dictionary surface (§4.7): one spec per
/// `(operator, type)` pair that dictionary elaboration's `DictApp` nodes can
/// resolve against.
fn class_method_specs() -> Vec<BuiltinDescriptor> {
    let mut v = Vec::new();
    for (method, ty, type_name) in [
        (symbol::METHOD_ADD, int_binop as fn() -> Type, symbol::TY_INT),
        (symbol::METHOD_SUB, int_binop, symbol::TY_INT),
        (symbol::METHOD_MUL, int_binop, symbol::TY_INT),
        (symbol::METHOD_DIV, int_binop, symbol::TY_INT),
        (symbol::METHOD_MOD, int_binop, symbol::TY_INT),
        (symbol::METHOD_EQ, int_cmp, symbol::TY_INT),
        (symbol::METHOD_NEQ, int_cmp, symbol::TY_INT),
        (symbol::METHOD_LT, int_cmp, symbol::TY_INT),
        (symbol::METHOD_LTE, int_cmp, symbol::TY_INT),
        (symbol::METHOD_GT, int_cmp, symbol::TY_INT),
        (symbol::METHOD_GTE, int_cmp, symbol::TY_INT),
        (symbol::METHOD_ADD, float_binop, symbol::TY_FLOAT),
        (symbol::METHOD_SUB, float_binop, symbol::TY_FLOAT),
        (symbol::METHOD_MUL, float_binop, symbol::TY_FLOAT),
        (symbol::METHOD_DIV, float_binop, symbol::TY_FLOAT),
        (symbol::METHOD_MOD, float_binop, symbol::TY_FLOAT),
        (symbol::METHOD_EQ, float_cmp, symbol::TY_FLOAT),
        (symbol::METHOD_NEQ, float_cmp, symbol::TY_FLOAT),
        (symbol::METHOD_LT, float_cmp, symbol::TY_FLOAT),
        (symbol::METHOD_LTE, float_cmp, symbol::TY_FLOAT),
        (symbol::METHOD_GT, float_cmp, symbol::TY_FLOAT),
        (symbol::METHOD_GTE, float_cmp, symbol::TY_FLOAT),
        (symbol::METHOD_EQ, bool_cmp, symbol::TY_BOOL),
        (symbol::METHOD_NEQ, bool_cmp, symbol::TY_BOOL),
        (symbol::METHOD_EQ, string_cmp, symbol::TY_STRING),
        (symbol::METHOD_NEQ, string_cmp, symbol::TY_STRING),
        (symbol::METHOD_LT, string_cmp, symbol::TY_STRING),
        (symbol::METHOD_LTE, string_cmp, symbol::TY_STRING),
        (symbol::METHOD_GT, string_cmp, symbol::TY_STRING),
        (symbol::METHOD_GTE, string_cmp, symbol::TY_STRING),
    ] {
        v.push(binop(ty, method, type_name));
    }
    v.push(unop(int_neg, symbol::METHOD_NEG, symbol::TY_INT));
    v.push(unop(float_neg, symbol::METHOD_NEG, symbol::TY_FLOAT));
    v.push(unop(bool_not, symbol::METHOD_NOT, symbol::TY_BOOL));
    v
}

fn bool_binop_ty() -> Type {
    Type::Func(vec![Type::bool(), Type::bool()], Box::new(Type::bool()), EffectRow::empty())
}
fn string_concat_ty() -> Type {
    Type::Func(vec![Type::string(), Type::string()], Box::new(Type::string()), EffectRow::empty())
}
/// OpLowering (§4.8) only rewrites `Intrinsic` nodes into calls against this
/// name after type checking has already finished, so the element variable
/// below is never handed to the real [`ailang_sem::Unifier`] — it exists
/// only so this descriptor's arity/shape golden tests have a `Type::Func`
/// to inspect.
fn list_cons_ty() -> Type {
    let elem = Type::Var(InferId::new(0), Kind::Star);
    Type::Func(
        vec![elem.clone(), Type::List(Box::new(elem.clone()))],
        Box::new(Type::List(Box::new(elem))),
        EffectRow::empty(),
    )
}

/// The four non-overloadable binary operators OpLowering rewrites a surviving
/// `Intrinsic` node into (§4.8): `&&`, `||`, string `++`, and list `::`.
/// Never directly callable by surface syntax (a program writes the operator,
/// not the name), but still part of the frozen surface the linker's builtin
/// set and the runtime registry must both recognize.
fn oplowering_target_specs() -> Vec<BuiltinDescriptor> {
    vec![
        BuiltinDescriptor {
            module: symbol::MODULE_BUILTIN,
            name: Symbol::intern("and_Bool"),
            num_args: 2,
            is_pure: true,
            effect_label: None,
            type_builder: bool_binop_ty,
        },
        BuiltinDescriptor {
            module: symbol::MODULE_BUILTIN,
            name: Symbol::intern("or_Bool"),
            num_args: 2,
            is_pure: true,
            effect_label: None,
            type_builder: bool_binop_ty,
        },
        BuiltinDescriptor {
            module: symbol::MODULE_BUILTIN,
            name: Symbol::intern("concat_String"),
            num_args: 2,
            is_pure: true,
            effect_label: None,
            type_builder: string_concat_ty,
        },
        BuiltinDescriptor {
            module: symbol::MODULE_BUILTIN,
            name: Symbol::intern("cons_List"),
            num_args: 2,
            is_pure: true,
            effect_label: None,
            type_builder: list_cons_ty,
        },
    ]
}

/// Same reasoning as [`list_cons_ty`]: `show` (§6.2, "Rendering") is the
/// surface's one genuinely polymorphic entry, specialized at use sites by
/// the evaluator's own [`ailang_rt::Value::show`] over the closed value sum
/// rather than through per-type dictionary dispatch — one descriptor, not
/// four monomorphic ones.
fn show_ty() -> Type {
    let elem = Type::Var(InferId::new(0), Kind::Star);
    Type::Func(vec![elem], Box::new(Type::string()), EffectRow::empty())
}

fn show_specs() -> Vec<BuiltinDescriptor> {
    vec![BuiltinDescriptor {
        module: symbol::MODULE_BUILTIN,
        name: Symbol::intern("show"),
        num_args: 1,
        is_pure: true,
        effect_label: None,
        type_builder: show_ty,
    }]
}

fn effect_fn(params: Vec<Type>, ret: Type, label: Symbol) -> impl Fn() -> Type {
    move || Type::Func(params.clone(), Box::new(ret.clone()), EffectRow::from_labels([label]))
}

fn record_of(fields: &[(Symbol, Type)]) -> Type {
    let mut map = BTreeMap::new();
    for (name, ty) in fields {
        map.insert(*name, ty.clone());
    }
    Type::Record(FieldRow::closed(map))
}

fn result_ty(ok: Type, err: Type) -> Type {
    Type::App(Box::new(Type::Con(Symbol::intern("Result"))), vec![ok, err])
}

fn json_ty() -> Type {
    Type::Con(Symbol::intern("Json"))
}

fn http_header_ty() -> Type {
    record_of(&[(Symbol::intern("name"), Type::string()), (Symbol::intern("value"), Type::string())])
}

fn http_response_ty() -> Type {
    record_of(&[
        (Symbol::intern("status"), Type::int()),
        (Symbol::intern("headers"), Type::List(Box::new(http_header_ty()))),
        (Symbol::intern("body"), Type::string()),
        (Symbol::intern("ok"), Type::bool()),
    ])
}

fn net_error_ty() -> Type {
    Type::Con(Symbol::intern("NetError"))
}

fn net_http_request_ty() -> Type {
    Type::Func(
        vec![Type::string(), Type::string(), Type::List(Box::new(http_header_ty())), Type::string()],
        Box::new(result_ty(http_response_ty(), net_error_ty())),
        EffectRow::from_labels([symbol::EFF_NET]),
    )
}

fn str_to_int_ty() -> Type {
    Type::Func(vec![Type::string()], Box::new(Type::int()), EffectRow::empty())
}
fn str_slice_ty() -> Type {
    Type::Func(vec![Type::string(), Type::int(), Type::int()], Box::new(Type::string()), EffectRow::empty())
}
fn str_pair_to_int_ty() -> Type {
    Type::Func(vec![Type::string(), Type::string()], Box::new(Type::int()), EffectRow::empty())
}
fn str_pair_to_bool_ty() -> Type {
    Type::Func(vec![Type::string(), Type::string()], Box::new(Type::bool()), EffectRow::empty())
}
fn str_to_str_ty() -> Type {
    Type::Func(vec![Type::string()], Box::new(Type::string()), EffectRow::empty())
}
fn int_to_float_ty() -> Type {
    Type::Func(vec![Type::int()], Box::new(Type::float()), EffectRow::empty())
}
fn float_to_int_ty() -> Type {
    Type::Func(vec![Type::float()], Box::new(Type::int()), EffectRow::empty())
}
fn json_decode_ty() -> Type {
    Type::Func(vec![Type::string()], Box::new(result_ty(json_ty(), Type::string())), EffectRow::empty())
}
fn json_encode_ty() -> Type {
    Type::Func(vec![json_ty()], Box::new(Type::string()), EffectRow::empty())
}

fn pure(name: &str, num_args: usize, ty: fn() -> Type) -> BuiltinDescriptor {
    BuiltinDescriptor {
        module: symbol::MODULE_BUILTIN,
        name: Symbol::intern(name),
        num_args,
        is_pure: true,
        effect_label: None,
        type_builder: ty,
    }
}

/// Everything that is not a dictionary-dispatched operator or an OpLowering
/// target: string utilities, IO, Net, Clock, Rand, numeric conversions, and
/// a Result-returning JSON surface (§6.2).
fn stdlib_specs() -> Vec<BuiltinDescriptor> {
    vec![
        pure("_str_len", 1, str_to_int_ty),
        pure("_str_slice", 3, str_slice_ty),
        pure("_str_compare", 2, str_pair_to_int_ty),
        pure("_str_eq", 2, str_pair_to_bool_ty),
        pure("_str_find", 2, str_pair_to_int_ty),
        pure("_str_upper", 1, str_to_str_ty),
        pure("_str_lower", 1, str_to_str_ty),
        pure("_str_trim", 1, str_to_str_ty),
        pure("intToFloat", 1, int_to_float_ty),
        pure("floatToInt", 1, float_to_int_ty),
        BuiltinDescriptor {
            module: symbol::MODULE_BUILTIN,
            name: Symbol::intern("_io_print"),
            num_args: 1,
            is_pure: false,
            effect_label: Some(symbol::EFF_IO),
            type_builder: || (effect_fn(vec![Type::string()], Type::unit(), symbol::EFF_IO))(),
        },
        BuiltinDescriptor {
            module: symbol::MODULE_BUILTIN,
            name: Symbol::intern("_io_println"),
            num_args: 1,
            is_pure: false,
            effect_label: Some(symbol::EFF_IO),
            type_builder: || (effect_fn(vec![Type::string()], Type::unit(), symbol::EFF_IO))(),
        },
        BuiltinDescriptor {
            module: symbol::MODULE_BUILTIN,
            name: Symbol::intern("_io_readLine"),
            num_args: 1,
            is_pure: false,
            effect_label: Some(symbol::EFF_IO),
            type_builder: || (effect_fn(vec![Type::unit()], Type::string(), symbol::EFF_IO))(),
        },
        BuiltinDescriptor {
            module: symbol::MODULE_BUILTIN,
            name: Symbol::intern("_fs_read_file"),
            num_args: 1,
            is_pure: false,
            effect_label: Some(symbol::EFF_FS),
            type_builder: || (effect_fn(vec![Type::string()], Type::string(), symbol::EFF_FS))(),
        },
        BuiltinDescriptor {
            module: symbol::MODULE_BUILTIN,
            name: Symbol::intern("_net_httpRequest"),
            num_args: 4,
            is_pure: false,
            effect_label: Some(symbol::EFF_NET),
            type_builder: net_http_request_ty,
        },
        BuiltinDescriptor {
            module: symbol::MODULE_BUILTIN,
            name: Symbol::intern("_clock_now_millis"),
            num_args: 1,
            is_pure: false,
            effect_label: Some(symbol::EFF_CLOCK),
            type_builder: || (effect_fn(vec![Type::unit()], Type::int(), symbol::EFF_CLOCK))(),
        },
        BuiltinDescriptor {
            module: symbol::MODULE_BUILTIN,
            name: Symbol::intern("_rand_int"),
            num_args: 2,
            is_pure: false,
            effect_label: Some(symbol::EFF_RAND),
            type_builder: || (effect_fn(vec![Type::int(), Type::int()], Type::int(), symbol::EFF_RAND))(),
        },
        BuiltinDescriptor {
            module: symbol::MODULE_BUILTIN,
            name: Symbol::intern("_trace_log"),
            num_args: 1,
            is_pure: false,
            effect_label: Some(symbol::EFF_TRACE),
            type_builder: || (effect_fn(vec![Type::string()], Type::unit(), symbol::EFF_TRACE))(),
        },
        pure("_json_encode", 1, json_encode_ty),
        pure("_json_decode", 1, json_decode_ty),
    ]
}

/// Names a user program can call directly by writing them in surface syntax
/// (the elaborator resolves an otherwise-unbound name against this set
/// before giving up with ELB002). The class-method, OpLowering-target, and
/// `show` specs are dictionary-dispatch/op-lowering targets only — a surface
/// program never spells `add_Int` or `cons_List` itself, it writes `+`/`::`.
pub fn callable_names() -> ailang_util::FxHashSet<Symbol> {
    stdlib_specs().iter().map(|d| d.name).collect()
}

/// Looks up a directly-callable stdlib primitive's descriptor by name, for
/// the type checker to build its call-site type and effect label from.
pub fn lookup_callable(name: Symbol) -> Option<BuiltinDescriptor> {
    stdlib_specs().into_iter().find(|d| d.name == name)
}

/// The whole frozen surface: class-method dict targets, OpLowering targets,
/// `show`, and stdlib primitives. CI5 pins this list's shape via the golden
/// test below.
pub fn stdlib_surface() -> Vec<BuiltinDescriptor> {
    let mut v = class_method_specs();
    v.extend(oplowering_target_specs());
    v.extend(show_specs());
    v.extend(stdlib_specs());
    v
}
