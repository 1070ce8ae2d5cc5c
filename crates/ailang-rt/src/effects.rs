//! The effect context (§4.10, §5): the set of capabilities active for the
//! current evaluation. Budgets beyond presence/absence are the bundler's
//! concern and out of scope here (§5).

use ailang_util::{symbol, Symbol};
use rustc_hash::FxHashSet;

#[derive(Clone, Debug, Default)]
pub struct EffContext {
    capabilities: FxHashSet<Symbol>,
}

impl EffContext {
    pub fn none() -> Self {
        EffContext::default()
    }

    /// All eight effect labels granted — convenient for tests and a
    /// trusted top-level driver; production embedders should grant the
    /// narrowest set a program's declared effects actually need.
    pub fn full() -> Self {
        EffContext { capabilities: symbol::EFFECT_LABELS.iter().copied().collect() }
    }

    pub fn grant(mut self, label: Symbol) -> Self {
        self.capabilities.insert(label);
        self
    }

    pub fn has(&self, label: Symbol) -> bool {
        self.capabilities.contains(&label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_grants_nothing() {
        let ctx = EffContext::none();
        assert!(!ctx.has(symbol::EFF_IO));
    }

    #[test]
    fn granting_a_label_is_visible() {
        let ctx = EffContext::none().grant(symbol::EFF_IO);
        assert!(ctx.has(symbol::EFF_IO));
        assert!(!ctx.has(symbol::EFF_FS));
    }

    #[test]
    fn full_grants_every_effect_label() {
        let ctx = EffContext::full();
        assert!(symbol::EFFECT_LABELS.iter().all(|l| ctx.has(*l)));
    }
}
