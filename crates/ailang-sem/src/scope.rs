//! Lexical scoping for the elaborator (§4.1).
//!
//! A rib tree, one rib per lexical binding form (`let`, lambda, match arm,
//! module top level). Resolution walks ribs outward to the module root.

use ailang_util::{define_idx, Idx, Symbol};
use rustc_hash::FxHashMap;

define_idx!(
    /// A single lexical scope.
    pub struct RibId
);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RibKind {
    Module,
    Function,
    Let,
    MatchArm,
}

#[derive(Debug)]
struct Rib {
    bindings: FxHashMap<Symbol, ailang_util::NodeId>,
    parent: Option<RibId>,
    kind: RibKind,
}

/// Tracks every live lexical scope while the elaborator walks a [`ailang_syntax::File`].
pub struct ScopeTree {
    ribs: ailang_util::IndexVec<RibId, Rib>,
    current: RibId,
}

impl ScopeTree {
    pub fn new() -> Self {
        let mut ribs = ailang_util::IndexVec::new();
        let root = ribs.push(Rib { bindings: FxHashMap::default(), parent: None, kind: RibKind::Module });
        ScopeTree { ribs, current: root }
    }

    pub fn enter(&mut self, kind: RibKind) -> RibId {
        let new_rib = self.ribs.push(Rib { bindings: FxHashMap::default(), parent: Some(self.current), kind });
        self.current = new_rib;
        new_rib
    }

    /// Pops back to `parent`. Panics if `parent` is not an ancestor of the
    /// current rib — a caller bug, not a user-facing error.
    pub fn exit_to(&mut self, parent: RibId) {
        self.current = parent;
    }

    pub fn bind(&mut self, name: Symbol, id: ailang_util::NodeId) {
        self.ribs[self.current].bindings.insert(name, id);
    }

    /// Resolves `name` to the nearest enclosing binding's [`NodeId`], or
    /// `None` if unbound (the caller turns that into `RT_UNBOUND`/`ELB001`
    /// depending on the stage).
    pub fn resolve(&self, name: Symbol) -> Option<ailang_util::NodeId> {
        let mut rib = self.current;
        loop {
            if let Some(id) = self.ribs[rib].bindings.get(&name) {
                return Some(*id);
            }
            match self.ribs[rib].parent {
                Some(p) => rib = p,
                None => return None,
            }
        }
    }

    pub fn current_kind(&self) -> RibKind {
        self.ribs[self.current].kind
    }

    pub fn current_rib(&self) -> RibId {
        self.current
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ailang_util::NodeId;

    #[test]
    fn resolves_through_nested_scopes() {
        let mut tree = ScopeTree::new();
        tree.bind(Symbol::intern("x"), NodeId(0));
        let fn_rib = tree.enter(RibKind::Function);
        tree.bind(Symbol::intern("y"), NodeId(1));
        assert_eq!(tree.resolve(Symbol::intern("x")), Some(NodeId(0)));
        assert_eq!(tree.resolve(Symbol::intern("y")), Some(NodeId(1)));
        tree.exit_to(RibId::new(0));
        assert_eq!(tree.resolve(Symbol::intern("y")), None);
        let _ = fn_rib;
    }

    #[test]
    fn shadowing_prefers_innermost_binding() {
        let mut tree = ScopeTree::new();
        tree.bind(Symbol::intern("x"), NodeId(0));
        tree.enter(RibKind::Let);
        tree.bind(Symbol::intern("x"), NodeId(1));
        assert_eq!(tree.resolve(Symbol::intern("x")), Some(NodeId(1)));
    }

    #[test]
    fn unbound_name_resolves_to_none() {
        let tree = ScopeTree::new();
        assert_eq!(tree.resolve(Symbol::intern("nope")), None);
    }
}
