//! `ModuleLoader` (§2 "Auxiliary subsystems", §4.9). Resolves `import` paths
//! against an in-memory table of already-compiled modules — real file I/O is
//! the driver's concern, out of scope here.

use ailang_core::Expr;
use ailang_util::{tarjan_scc, Symbol};
use rustc_hash::FxHashMap;

/// One compiled module's interface: the bindings it exports, keyed by their
/// surface name, plus the module paths it imports (used only for cycle
/// detection — the linker resolves individual symbols through `exports`).
#[derive(Clone, Debug)]
pub struct CompiledModule {
    pub name: Symbol,
    pub exports: FxHashMap<Symbol, Expr>,
    pub imports: Vec<Symbol>,
}

impl CompiledModule {
    pub fn new(name: Symbol) -> Self {
        CompiledModule { name, exports: FxHashMap::default(), imports: Vec::new() }
    }

    pub fn export(mut self, name: Symbol, value: Expr) -> Self {
        self.exports.insert(name, value);
        self
    }

    pub fn import(mut self, module: Symbol) -> Self {
        self.imports.push(module);
        self
    }
}

/// An in-memory registry of compiled modules, supplied by the driver. Mirrors
/// the builtin registry's open/lookup shape but carries no freeze phase —
/// modules are loaded incrementally as the driver compiles a project's
/// dependency graph.
#[derive(Default)]
pub struct ModuleLoader {
    modules: FxHashMap<Symbol, CompiledModule>,
}

impl ModuleLoader {
    pub fn new() -> Self {
        ModuleLoader::default()
    }

    pub fn register(&mut self, module: CompiledModule) {
        self.modules.insert(module.name, module);
    }

    pub fn get(&self, name: Symbol) -> Option<&CompiledModule> {
        self.modules.get(&name)
    }

    pub fn is_loaded(&self, name: Symbol) -> bool {
        self.modules.contains_key(&name)
    }

    /// Strongly-connected components of the import graph with more than one
    /// member — i.e. genuine import cycles, not the common case of a single
    /// module with no self-import. Reuses the same iterative Tarjan's
    /// implementation as the elaborator's call-graph analysis.
    pub fn import_cycles(&self) -> Vec<Vec<Symbol>> {
        let names: Vec<Symbol> = self.modules.keys().copied().collect();
        let sccs = tarjan_scc(&names, |m| {
            self.modules.get(m).map(|cm| cm.imports.clone()).unwrap_or_default()
        });
        sccs.into_iter().filter(|scc| scc.len() > 1).collect()
    }
}
