//! The linker (§4.9): resolves every `VarGlobal` and `DictRef` left in a
//! lowered Core program against the builtin registry, the ADT constructor
//! map, and a module's exported interface, then re-verifies ANF one final
//! time before marking the program linked.

use ailang_core::{ConstructorMap, Expr, Program, TopLevel};
use ailang_util::{symbol, Diagnostic, ErrorCode, Pos, Symbol};
use rustc_hash::FxHashSet;

use crate::loader::ModuleLoader;

/// The canonical dictionary key a resolved `DictRef` is rewritten against:
/// `module::Class::TypeName::` (§4.9). Kept as an opaque string rather than
/// a struct of its parts because its only consumers — the evaluator's
/// dictionary table and `DryRun` reporting — want it as a single lookup key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DictKey(pub String);

impl DictKey {
    pub fn new(module: Symbol, class: Symbol, type_name: Symbol) -> Self {
        DictKey(format!("{}::{}::{}::", module.as_str(), class.as_str(), type_name.as_str()))
    }
}

/// Everything the linker needs besides the program itself: the module table,
/// the ADT constructor map, the frozen builtin surface's name set, and the
/// dictionaries visible at this point in the search order the spec requires
/// (prelude first, then each import) as `(module, class, type_name)` triples.
pub struct LinkContext<'a> {
    pub loader: &'a ModuleLoader,
    pub ctors: &'a ConstructorMap,
    pub builtins: &'a FxHashSet<Symbol>,
    pub dicts: &'a [(Symbol, Symbol, Symbol)],
}

impl<'a> LinkContext<'a> {
    fn resolve_dict(&self, class: Symbol, type_name: Symbol) -> Option<DictKey> {
        self.dicts
            .iter()
            .find(|(_, c, t)| *c == class && *t == type_name)
            .map(|(m, c, t)| DictKey::new(*m, *c, *t))
    }
}

fn synthetic(code: ErrorCode, message: impl Into<String>) -> Diagnostic {
    Diagnostic::error(code, message, Pos::synthetic())
}

/// Checks a single `VarGlobal`/`DictRef` node, pushing a diagnostic onto
/// `errors` on failure. Every other node is structural and ignored here —
/// the walk itself is driven by `Expr::for_each_subexpr`.
fn check_node(expr: &Expr, ctx: &LinkContext, errors: &mut Vec<Diagnostic>) {
    match expr {
        Expr::VarGlobal { module, name, .. } if *module == symbol::MODULE_BUILTIN => {
            if !ctx.builtins.contains(name) {
                errors.push(synthetic(
                    ErrorCode::Lnk001BuiltinNotFound,
                    format!("no builtin named `{}`", name.as_str()),
                ));
            }
        }
        Expr::VarGlobal { module, name, .. } if *module == symbol::MODULE_ADT => {
            if ctx.ctors.lookup(*name).is_none() {
                errors.push(synthetic(
                    ErrorCode::Lnk002AdtFactoryNotFound,
                    format!("no constructor factory named `{}`", name.as_str()),
                ));
            }
        }
        Expr::VarGlobal { module, name, .. } => match ctx.loader.get(*module) {
            None => errors.push(synthetic(
                ErrorCode::Lnk004ModuleNotLoaded,
                format!("module `{}` is not loaded", module.as_str()),
            )),
            Some(compiled) if !compiled.exports.contains_key(name) => errors.push(synthetic(
                ErrorCode::Lnk003SymbolNotExported,
                format!("`{}` is not exported by module `{}`", name.as_str(), module.as_str()),
            )),
            Some(_) => {}
        },
        Expr::DictRef { class, type_name, .. } => {
            if ctx.resolve_dict(*class, *type_name).is_none() {
                errors.push(synthetic(
                    ErrorCode::Lnk005DictionaryNotFound,
                    format!(
                        "no instance of `{}` for `{}` is in scope",
                        class.as_str(),
                        type_name.as_str()
                    ),
                ));
            }
        }
        _ => {}
    }
}

/// Resolves every global reference in `program`, verifies ANF one final
/// time (LNK006), and — only if nothing failed — sets `flags.linked = true`.
/// Errors are collected rather than short-circuited (§7: the linker reports
/// every unresolved reference before giving up).
#[tracing::instrument(skip(program, ctx))]
pub fn link(mut program: Program, ctx: &LinkContext) -> Result<Program, Vec<Diagnostic>> {
    let mut errors = Vec::new();
    for binding in &program.bindings {
        let exprs: Vec<&Expr> = match binding {
            TopLevel::Let { value, .. } => vec![value],
            TopLevel::LetRec { bindings } => bindings.iter().map(|(_, v)| v).collect(),
        };
        for expr in exprs {
            expr.for_each_subexpr(&mut |node| check_node(node, ctx, &mut errors));
        }
    }
    if let Err(msg) = program.assert_anf() {
        errors.push(synthetic(ErrorCode::Lnk006AnfViolation, msg));
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    program.flags.linked = true;
    Ok(program)
}

/// `DryRun` mode (§4.9): collects the dictionary keys a program would need
/// without checking their availability or mutating anything — tooling uses
/// this to report "missing instance" errors ahead of a full link/evaluate.
pub fn dry_run(program: &Program, ctx: &LinkContext) -> Vec<DictKey> {
    let mut keys = Vec::new();
    for binding in &program.bindings {
        let exprs: Vec<&Expr> = match binding {
            TopLevel::Let { value, .. } => vec![value],
            TopLevel::LetRec { bindings } => bindings.iter().map(|(_, v)| v).collect(),
        };
        for expr in exprs {
            expr.for_each_subexpr(&mut |node| {
                if let Expr::DictRef { class, type_name, .. } = node {
                    if let Some(key) = ctx.resolve_dict(*class, *type_name) {
                        keys.push(key);
                    }
                }
            });
        }
    }
    keys
}
