//! Lexical environments (§4.10): immutable per frame, `Rc`-shared so a
//! closure can capture its definition environment cheaply.

use std::cell::RefCell;
use std::rc::Rc;

use ailang_util::Symbol;
use rustc_hash::FxHashMap;

use crate::value::Value;

struct Frame {
    bindings: FxHashMap<Symbol, Value>,
    parent: Option<Env>,
}

#[derive(Clone)]
pub struct Env(Rc<RefCell<Frame>>);

impl Env {
    pub fn root() -> Self {
        Env(Rc::new(RefCell::new(Frame { bindings: FxHashMap::default(), parent: None })))
    }

    pub fn child(&self) -> Self {
        Env(Rc::new(RefCell::new(Frame { bindings: FxHashMap::default(), parent: Some(self.clone()) })))
    }

    pub fn bind(&self, name: Symbol, value: Value) {
        self.0.borrow_mut().bindings.insert(name, value);
    }

    /// Walks the parent chain from this frame outward (§3.3's lexical
    /// scoping: the innermost binding wins, matching the elaborator's rib
    /// resolution order).
    pub fn lookup(&self, name: Symbol) -> Option<Value> {
        if let Some(v) = self.0.borrow().bindings.get(&name) {
            return Some(v.clone());
        }
        let parent = self.0.borrow().parent.clone();
        parent.and_then(|p| p.lookup(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_scope_sees_parent_bindings() {
        let root = Env::root();
        root.bind(Symbol::intern("x"), Value::Int(1));
        let child = root.child();
        assert!(matches!(child.lookup(Symbol::intern("x")), Some(Value::Int(1))));
    }

    #[test]
    fn shadowing_in_child_does_not_affect_parent() {
        let root = Env::root();
        root.bind(Symbol::intern("x"), Value::Int(1));
        let child = root.child();
        child.bind(Symbol::intern("x"), Value::Int(2));
        assert!(matches!(child.lookup(Symbol::intern("x")), Some(Value::Int(2))));
        assert!(matches!(root.lookup(Symbol::intern("x")), Some(Value::Int(1))));
    }

    #[test]
    fn unbound_name_is_none() {
        let root = Env::root();
        assert!(root.lookup(Symbol::intern("nope")).is_none());
    }
}
