//! Constructor map (§3.4) — the elaborator's and linker's shared view of
//! which type owns which constructor, and with what arity.

use ailang_util::Symbol;
use rustc_hash::FxHashMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructorInfo {
    pub type_name: Symbol,
    pub ctor_name: Symbol,
    pub arity: usize,
    /// Index of this constructor within its type's declaration order —
    /// used by the evaluator's tag representation and by exhaustiveness
    /// checking (§4.2, §4.10).
    pub tag: usize,
}

/// Maps a constructor name to its owning type, for surface-to-core
/// rewriting of constructor applications (§4.1: `App(Var(ctor), args)` is
/// rewritten once the elaborator knows `ctor` names a constructor rather
/// than a function).
#[derive(Clone, Debug, Default)]
pub struct ConstructorMap {
    by_name: FxHashMap<Symbol, ConstructorInfo>,
}

impl ConstructorMap {
    pub fn new() -> Self {
        ConstructorMap { by_name: FxHashMap::default() }
    }

    /// Registers a constructor. Returns `Err` with the colliding entry if
    /// `ctor_name` is already registered against the current type, or any
    /// other type — constructor names share one namespace (ELB001 territory
    /// when a later lookup fails because of a typo, not a collision, but
    /// collisions are rejected eagerly here).
    pub fn register(&mut self, info: ConstructorInfo) -> Result<(), ConstructorInfo> {
        if let Some(existing) = self.by_name.get(&info.ctor_name) {
            return Err(existing.clone());
        }
        self.by_name.insert(info.ctor_name, info);
        Ok(())
    }

    pub fn lookup(&self, ctor_name: Symbol) -> Option<&ConstructorInfo> {
        self.by_name.get(&ctor_name)
    }

    pub fn is_constructor(&self, name: Symbol) -> bool {
        self.by_name.contains_key(&name)
    }

    /// All constructors belonging to `type_name`, ordered by declaration
    /// `tag` — used to decide exhaustiveness of a `match` over that type
    /// (§4.2, CLS/TYP exhaustiveness notes).
    pub fn constructors_of(&self, type_name: Symbol) -> Vec<&ConstructorInfo> {
        let mut v: Vec<&ConstructorInfo> = self.by_name.values().filter(|c| c.type_name == type_name).collect();
        v.sort_by_key(|c| c.tag);
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctor(type_name: &str, ctor_name: &str, arity: usize, tag: usize) -> ConstructorInfo {
        ConstructorInfo {
            type_name: Symbol::intern(type_name),
            ctor_name: Symbol::intern(ctor_name),
            arity,
            tag,
        }
    }

    #[test]
    fn register_then_lookup_round_trips() {
        let mut map = ConstructorMap::new();
        map.register(ctor("Option", "Some", 1, 0)).unwrap();
        map.register(ctor("Option", "None", 0, 1)).unwrap();
        assert!(map.is_constructor(Symbol::intern("Some")));
        assert_eq!(map.lookup(Symbol::intern("None")).unwrap().arity, 0);
    }

    #[test]
    fn duplicate_constructor_name_is_rejected() {
        let mut map = ConstructorMap::new();
        map.register(ctor("Option", "Some", 1, 0)).unwrap();
        let err = map.register(ctor("Result", "Some", 1, 0));
        assert!(err.is_err());
    }

    #[test]
    fn constructors_of_are_returned_in_declaration_order() {
        let mut map = ConstructorMap::new();
        map.register(ctor("Shape", "Circle", 1, 0)).unwrap();
        map.register(ctor("Shape", "Square", 1, 1)).unwrap();
        map.register(ctor("Shape", "Triangle", 3, 2)).unwrap();
        let names: Vec<&str> =
            map.constructors_of(Symbol::intern("Shape")).iter().map(|c| c.ctor_name.as_str()).collect();
        assert_eq!(names, vec!["Circle", "Square", "Triangle"]);
    }
}
