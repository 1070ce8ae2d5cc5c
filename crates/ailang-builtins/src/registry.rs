//! Builtin Registry (§4.5) — the single place the elaborator/linker, type
//! checker, and evaluator agree on every primitive's arity, purity, and
//! implementation.
//!
//! Generic over the evaluator's value representation `V` and effect-capability
//! context `C` so this crate never needs to depend on `ailang-rt` — the
//! runtime supplies both type parameters and populates the registry at
//! process start.

use ailang_core::Type;
use ailang_util::Symbol;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

#[derive(Debug, Clone, thiserror::Error)]
pub enum BuiltinError {
    #[error("builtin `{0}` already registered")]
    AlreadyRegistered(String),
    #[error("registry is frozen; `{0}` cannot be registered")]
    Frozen(String),
    #[error("builtin `{0}` has an empty name")]
    EmptyName(String),
    #[error("builtin `{name}` declares num_args={num_args} but its type signature takes {type_arity} parameter(s)")]
    ArityMismatch { name: String, num_args: usize, type_arity: usize },
    #[error("builtin `{name}` is_pure={is_pure} but its effect row is {effect_description}")]
    PurityMismatch { name: String, is_pure: bool, effect_description: String },
    #[error("builtin `{name}` declares effect label `{label}` absent from its type's effect row")]
    EffectLabelMissing { name: String, label: String },
}

pub type BuiltinFn<V, C> = Arc<dyn Fn(&C, &[V]) -> Result<V, String> + Send + Sync>;

pub struct BuiltinSpec<V, C> {
    pub module: Symbol,
    pub name: Symbol,
    pub num_args: usize,
    pub is_pure: bool,
    pub effect_label: Option<Symbol>,
    pub type_builder: fn() -> Type,
    pub implementation: BuiltinFn<V, C>,
}

impl<V, C> Clone for BuiltinSpec<V, C> {
    fn clone(&self) -> Self {
        BuiltinSpec {
            module: self.module,
            name: self.name,
            num_args: self.num_args,
            is_pure: self.is_pure,
            effect_label: self.effect_label,
            type_builder: self.type_builder,
            implementation: self.implementation.clone(),
        }
    }
}

impl<V, C> BuiltinSpec<V, C> {
    fn validate(&self) -> Result<(), BuiltinError> {
        if self.name.as_str().is_empty() {
            return Err(BuiltinError::EmptyName(self.name.as_str().to_string()));
        }
        let ty = (self.type_builder)();
        let (params, eff) = match &ty {
            Type::Func(params, _ret, eff) => (params.len(), eff.clone()),
            _ => (0, ailang_core::EffectRow::empty()),
        };
        if params != self.num_args {
            return Err(BuiltinError::ArityMismatch {
                name: self.name.as_str().to_string(),
                num_args: self.num_args,
                type_arity: params,
            });
        }
        let eff_empty = eff.fields.is_empty();
        if self.is_pure != eff_empty {
            return Err(BuiltinError::PurityMismatch {
                name: self.name.as_str().to_string(),
                is_pure: self.is_pure,
                effect_description: if eff_empty { "empty".into() } else { "non-empty".into() },
            });
        }
        if let Some(label) = self.effect_label {
            if !eff.contains(label) {
                return Err(BuiltinError::EffectLabelMissing {
                    name: self.name.as_str().to_string(),
                    label: label.as_str().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Open→Frozen lifecycle (§4.5): a [`DashMap`] accepts concurrent
/// registration during process init, then [`freeze`](Self::freeze) snapshots
/// it into a [`OnceCell`] that every later lookup reads lock-free.
pub struct BuiltinRegistry<V, C> {
    open: DashMap<Symbol, BuiltinSpec<V, C>>,
    frozen: OnceCell<ailang_util::FxHashMap<Symbol, BuiltinSpec<V, C>>>,
}

impl<V, C> BuiltinRegistry<V, C> {
    pub fn new() -> Self {
        BuiltinRegistry { open: DashMap::new(), frozen: OnceCell::new() }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get().is_some()
    }

    /// Registers `spec`, running the full §4.5 validation. Returns an error
    /// (never panics, per CI1-CI4's test-suite discipline) on a post-freeze
    /// call, a duplicate name, or any consistency failure.
    pub fn register(&self, spec: BuiltinSpec<V, C>) -> Result<(), BuiltinError> {
        if self.is_frozen() {
            return Err(BuiltinError::Frozen(spec.name.as_str().to_string()));
        }
        spec.validate()?;
        if self.open.contains_key(&spec.name) {
            return Err(BuiltinError::AlreadyRegistered(spec.name.as_str().to_string()));
        }
        self.open.insert(spec.name, spec);
        Ok(())
    }

    /// Snapshots the open map. Idempotent: a second call is a no-op.
    pub fn freeze(&self) {
        if self.is_frozen() {
            return;
        }
        let snapshot: ailang_util::FxHashMap<Symbol, BuiltinSpec<V, C>> =
            self.open.iter().map(|entry| (*entry.key(), entry.value().clone())).collect();
        let _ = self.frozen.set(snapshot);
        tracing::debug!(count = self.frozen.get().map(|m| m.len()).unwrap_or(0), "builtin registry frozen");
    }

    pub fn lookup(&self, name: Symbol) -> Option<BuiltinSpec<V, C>> {
        match self.frozen.get() {
            Some(map) => map.get(&name).cloned(),
            None => self.open.get(&name).map(|e| e.value().clone()),
        }
    }

    pub fn all_specs(&self) -> Vec<BuiltinSpec<V, C>> {
        match self.frozen.get() {
            Some(map) => map.values().cloned().collect(),
            None => self.open.iter().map(|e| e.value().clone()).collect(),
        }
    }

    /// CI1-CI4 as a single batch check, intended for the ambient consistency
    /// test suite (P3, P8) rather than hot-path use.
    pub fn check_consistency(&self) -> Vec<BuiltinError> {
        self.all_specs().iter().filter_map(|s| s.validate().err()).collect()
    }
}

impl<V, C> Default for BuiltinRegistry<V, C> {
    fn default() -> Self {
        Self::new()
    }
}
