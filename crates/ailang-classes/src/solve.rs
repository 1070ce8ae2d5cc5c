//! Constraint solving and defaulting (§4.7, first half).

use ailang_core::{ClassConstraint, Type};
use ailang_sem::Unifier;
use ailang_util::{symbol, ErrorCode, NodeId, Symbol};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedConstraint {
    pub node_id: NodeId,
    pub class: Symbol,
    pub ty: Type,
    pub method: Symbol,
    pub dict_key: Symbol,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("CLS{0:03}: {1}")]
pub struct ClassError(pub u16, pub String);

impl ClassError {
    pub fn code(&self) -> ErrorCode {
        match self.0 {
            1 => ErrorCode::Cls001NoInstance,
            2 => ErrorCode::Cls002OverlappingInstances,
            3 => ErrorCode::Cls003MissingMethod,
            _ => ErrorCode::Cls004AmbiguousConstraint,
        }
    }
}

/// `class → default_type` (§4.7): the minimum defaulting table the spec
/// requires, open to extension by a prelude that declares more classes.
pub struct DefaultTable {
    defaults: HashMap<Symbol, Type>,
}

impl DefaultTable {
    pub fn minimal() -> Self {
        let mut defaults = HashMap::new();
        defaults.insert(symbol::CLASS_NUM, Type::int());
        defaults.insert(symbol::CLASS_FRACTIONAL, Type::float());
        DefaultTable { defaults }
    }

    pub fn default_for(&self, class: Symbol) -> Option<&Type> {
        self.defaults.get(&class)
    }
}

impl Default for DefaultTable {
    fn default() -> Self {
        Self::minimal()
    }
}

/// Normalizes a primitive type's dictionary-key text (§4.7): `int → Int`
/// etc. Non-primitive heads are used verbatim — class instances for ADTs key
/// off the constructor's declared name, which is already CamelCase by
/// convention.
pub fn normalize_type_name(ty: &Type) -> Symbol {
    match ty {
        Type::Con(name) if *name == symbol::TY_INT => symbol::TY_INT,
        Type::Con(name) if *name == symbol::TY_FLOAT => symbol::TY_FLOAT,
        Type::Con(name) if *name == symbol::TY_STRING => symbol::TY_STRING,
        Type::Con(name) if *name == symbol::TY_BOOL => symbol::TY_BOOL,
        Type::Con(name) => *name,
        Type::App(ctor, _) => normalize_type_name(ctor),
        _ => Symbol::intern("?"),
    }
}

/// Picks the most specific of two numeric classes collected on the same
/// variable (§4.7 "most-specific numeric class"): `Fractional` dominates
/// `Num`; any other pairing is left as-is (multiple non-numeric constraints
/// on one variable are not collapsed).
pub fn most_specific(a: Symbol, b: Symbol) -> Symbol {
    if a == symbol::CLASS_FRACTIONAL || b == symbol::CLASS_FRACTIONAL {
        symbol::CLASS_FRACTIONAL
    } else {
        a
    }
}

/// Collapses a variable's pending class constraints to the single most
/// specific class per (§4.7), grouping by the variable's `InferId` via the
/// constraint's origin (callers key by NodeID; this just reduces a class
/// multiset).
pub fn collapse_numeric_classes(classes: &[Symbol]) -> Option<Symbol> {
    classes.iter().copied().reduce(most_specific)
}

/// Attempts to resolve one constraint against `instances` (a set of
/// `(class, type_head)` pairs each instance provides, paired with the
/// dictionary method names it implements). Falls back to defaulting when the
/// constrained type is still a variable.
pub struct Solver<'a> {
    pub instances: &'a [(Symbol, Symbol, Symbol)], // (class, type_head, method)
    pub defaults: DefaultTable,
}

impl<'a> Solver<'a> {
    pub fn new(instances: &'a [(Symbol, Symbol, Symbol)]) -> Self {
        Solver { instances, defaults: DefaultTable::minimal() }
    }

    fn has_instance(&self, class: Symbol, type_head: Symbol) -> bool {
        self.instances.iter().any(|(c, t, _)| *c == class && *t == type_head)
    }

    fn method_for(&self, class: Symbol, type_head: Symbol) -> Option<Symbol> {
        self.instances.iter().find(|(c, t, _)| *c == class && *t == type_head).map(|(_, _, m)| *m)
    }

    /// Resolves `constraint` originating at `node_id`. `unifier` lets the
    /// caller resolve a `Type::Var` through substitutions first; `u` is
    /// `None` when the caller has already fully resolved `constraint.ty`.
    pub fn resolve(
        &self,
        node_id: NodeId,
        constraint: &ClassConstraint,
        u: Option<&Unifier>,
    ) -> Result<ResolvedConstraint, ClassError> {
        let ty = match u {
            Some(u) => u.resolve(&constraint.ty),
            None => constraint.ty.clone(),
        };
        let resolved_ty = self.default_if_variable(&ty, constraint.class)?;
        let head = normalize_type_name(&resolved_ty);
        if !self.has_instance(constraint.class, head) {
            return Err(ClassError(
                1,
                format!("no instance of `{}` for `{}`", constraint.class.as_str(), head.as_str()),
            ));
        }
        let method = self
            .method_for(constraint.class, head)
            .ok_or_else(|| ClassError(3, format!("instance for `{}` is missing a method", head.as_str())))?;
        Ok(ResolvedConstraint {
            node_id,
            class: constraint.class,
            ty: resolved_ty,
            method,
            dict_key: head,
        })
    }

    fn default_if_variable(&self, ty: &Type, class: Symbol) -> Result<Type, ClassError> {
        match ty {
            Type::Var(_, _) => {
                let default = self.defaults.default_for(class).cloned().ok_or_else(|| {
                    ClassError(4, format!("`{}` is ambiguous and has no default", class.as_str()))
                })?;
                let head = normalize_type_name(&default);
                if !self.has_instance(class, head) {
                    return Err(ClassError(
                        4,
                        format!("default `{}` for `{}` has no instance", head.as_str(), class.as_str()),
                    ));
                }
                Ok(default)
            }
            _ => Ok(ty.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ailang_util::Idx;

    fn int_num_instances() -> Vec<(Symbol, Symbol, Symbol)> {
        vec![
            (symbol::CLASS_NUM, symbol::TY_INT, symbol::METHOD_ADD),
            (symbol::CLASS_FRACTIONAL, symbol::TY_FLOAT, symbol::METHOD_DIV),
        ]
    }

    #[test]
    fn concrete_type_resolves_directly() {
        let instances = int_num_instances();
        let solver = Solver::new(&instances);
        let constraint = ClassConstraint { class: symbol::CLASS_NUM, ty: Type::int() };
        let resolved = solver.resolve(NodeId(0), &constraint, None).unwrap();
        assert_eq!(resolved.dict_key, symbol::TY_INT);
        assert_eq!(resolved.method, symbol::METHOD_ADD);
    }

    #[test]
    fn ambiguous_num_defaults_to_int() {
        let instances = int_num_instances();
        let solver = Solver::new(&instances);
        let var = Type::Var(ailang_core::InferId::new(0), ailang_core::Kind::Star);
        let constraint = ClassConstraint { class: symbol::CLASS_NUM, ty: var };
        let resolved = solver.resolve(NodeId(0), &constraint, None).unwrap();
        assert_eq!(resolved.dict_key, symbol::TY_INT);
    }

    #[test]
    fn ambiguous_fractional_defaults_to_float() {
        let instances = int_num_instances();
        let solver = Solver::new(&instances);
        let var = Type::Var(ailang_core::InferId::new(0), ailang_core::Kind::Star);
        let constraint = ClassConstraint { class: symbol::CLASS_FRACTIONAL, ty: var };
        let resolved = solver.resolve(NodeId(0), &constraint, None).unwrap();
        assert_eq!(resolved.dict_key, symbol::TY_FLOAT);
    }

    #[test]
    fn missing_instance_is_cls001() {
        let instances = int_num_instances();
        let solver = Solver::new(&instances);
        let constraint = ClassConstraint { class: symbol::CLASS_NUM, ty: Type::string() };
        let err = solver.resolve(NodeId(0), &constraint, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Cls001NoInstance);
    }

    #[test]
    fn fractional_dominates_num_when_collapsing() {
        assert_eq!(most_specific(symbol::CLASS_NUM, symbol::CLASS_FRACTIONAL), symbol::CLASS_FRACTIONAL);
        assert_eq!(
            collapse_numeric_classes(&[symbol::CLASS_NUM, symbol::CLASS_FRACTIONAL, symbol::CLASS_NUM]),
            Some(symbol::CLASS_FRACTIONAL)
        );
    }
}
