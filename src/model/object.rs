use std::collections::HashSet;

use indexmap::IndexMap;
use log::trace;

use super::combinators;
use super::{PairSet, Ty, TypeArena, TypeId, Unified, UnifyMemo};
use crate::conversion::ConversionKind;
use crate::diag::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::Result;
use crate::traversal::Traverser;

/// Named properties. A property that may be absent is typed `union(T, none)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectType {
    properties: IndexMap<String, TypeId>,
}

impl ObjectType {
    pub fn new(properties: IndexMap<String, TypeId>) -> Self {
        Self { properties }
    }

    pub fn properties(&self) -> &IndexMap<String, TypeId> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<TypeId> {
        self.properties.get(name).copied()
    }

    pub(super) fn traverse(&self, arena: &TypeArena, this: TypeId, traverser: &Traverser) -> (TypeId, Diagnostics) {
        let Some(name) = traverser.property_name() else {
            return (TypeId::DYNAMIC, Diagnostics::single(arena.unsupported_receiver(this, traverser)));
        };
        match self.property(name) {
            Some(ty) => (ty, Diagnostics::new()),
            None => {
                let diag = Diagnostic::error(
                    DiagnosticKind::UnknownProperty,
                    format!("unknown property `{name}`"),
                    format!("{} has no property `{name}`", arena.describe(this)),
                    traverser.source_range().clone(),
                );
                (TypeId::DYNAMIC, Diagnostics::single(diag))
            }
        }
    }

    pub(super) fn equals(&self, arena: &TypeArena, other: &Ty, seen: &mut PairSet) -> bool {
        let Ty::Object(other) = other else {
            return false;
        };
        self.properties.len() == other.properties.len()
            && self.properties.iter().all(|(name, &ty)| match other.property(name) {
                Some(other_ty) => arena.equals_seen(ty, other_ty, seen),
                None => false,
            })
    }

    pub(super) fn assignable_from(&self, arena: &TypeArena, this: TypeId, src: TypeId, seen: &mut PairSet) -> bool {
        combinators::assignable_from(arena, this, src, seen, |seen| {
            let Ty::Object(src) = arena.get(src) else {
                return false;
            };
            self.properties.iter().all(|(name, &ty)| {
                let src_ty = src.property(name).unwrap_or(TypeId::NONE);
                arena.assignable_seen(ty, src_ty, seen)
            })
        })
    }

    /// Property-wise, weakest wins. Missing source properties must accept
    /// `none`. A map source can never prove every key is present.
    pub(super) fn conversion_from(
        &self,
        arena: &TypeArena,
        this: TypeId,
        src: TypeId,
        unifying: bool,
        seen: &mut PairSet,
    ) -> ConversionKind {
        combinators::conversion_from(arena, this, src, unifying, seen, |seen| match arena.get(src) {
            Ty::Object(src) => self
                .properties
                .iter()
                .fold(ConversionKind::SafeConversion, |kind, (name, &ty)| {
                    let src_ty = src.property(name).unwrap_or(TypeId::NONE);
                    kind.weakest(arena.conversion_seen(ty, src_ty, unifying, seen))
                }),
            Ty::Map(src) => self
                .properties
                .values()
                .fold(ConversionKind::UnsafeConversion, |kind, &ty| {
                    kind.weakest(arena.conversion_seen(ty, src.element, unifying, seen))
                }),
            _ => ConversionKind::NoConversion,
        })
    }

    pub(super) fn render(&self, arena: &TypeArena, seen: &mut HashSet<TypeId>) -> String {
        let mut names: Vec<&String> = self.properties.keys().collect();
        names.sort();
        let items = names
            .into_iter()
            .map(|name| format!("{name} = {}", arena.render(self.properties[name], seen)))
            .collect::<Vec<_>>();
        format!("object({{{}}})", items.join(", "))
    }

    pub(super) fn unify(&self, arena: &mut TypeArena, this: TypeId, other: TypeId, memo: &mut UnifyMemo) -> Result<Unified> {
        combinators::unify(arena, this, other, memo, |arena, memo| {
            let other_object = match arena.get(other) {
                Ty::Object(other) => other.clone(),
                _ => return Ok(combinators::unify_by_conversion(arena, this, other)),
            };
            self.merge(arena, this, other, &other_object, memo)
        })
    }

    /// Shared properties are unified, one-sided ones become optional.
    fn merge(
        &self,
        arena: &mut TypeArena,
        this: TypeId,
        other: TypeId,
        other_object: &ObjectType,
        memo: &mut UnifyMemo,
    ) -> Result<Unified> {
        if let Some(&unified) = memo.get(&(this, other)) {
            trace!("unify cycle at {this} ~ {other}");
            return Ok(unified);
        }
        let result = arena.declare_object();
        memo.insert((this, other), (result, ConversionKind::SafeConversion));

        let mut properties = IndexMap::with_capacity(self.properties.len());
        let mut kind = ConversionKind::SafeConversion;
        for (name, &ty) in &self.properties {
            let unified = match other_object.property(name) {
                Some(other_ty) => {
                    let (unified, ck) = arena.unify_seen(ty, other_ty, memo)?;
                    kind = kind.weakest(ck);
                    unified
                }
                None => arena.optional(ty),
            };
            properties.insert(name.clone(), unified);
        }
        for (name, &other_ty) in &other_object.properties {
            if !self.properties.contains_key(name) {
                let optional = arena.optional(other_ty);
                properties.insert(name.clone(), optional);
            }
        }

        arena.define_object(result, properties)?;
        memo.insert((this, other), (result, kind));
        Ok((result, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::ConversionKind::*;
    use crate::traversal::parse_path;

    fn object(arena: &mut TypeArena, pairs: &[(&str, TypeId)]) -> TypeId {
        arena.object(pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    #[test]
    fn display_sorts_properties() {
        let mut arena = TypeArena::new();
        let obj = object(&mut arena, &[("name", TypeId::STRING), ("age", TypeId::INT)]);
        assert_eq!(arena.display(obj), "object({age = int, name = string})");
    }

    #[test]
    fn equality_ignores_declaration_order() {
        let mut arena = TypeArena::new();
        let a = object(&mut arena, &[("x", TypeId::INT), ("y", TypeId::BOOL)]);
        let b = object(&mut arena, &[("y", TypeId::BOOL), ("x", TypeId::INT)]);
        let c = object(&mut arena, &[("x", TypeId::INT), ("z", TypeId::BOOL)]);
        assert!(arena.equals(a, b));
        assert!(!arena.equals(a, c));
    }

    #[test]
    fn traversal_reports_unknown_properties() {
        let mut arena = TypeArena::new();
        let obj = object(&mut arena, &[("name", TypeId::STRING)]);
        let steps = parse_path(r#"name["name"].nope"#).unwrap();
        assert_eq!(arena.traverse(obj, &steps[0]).0, TypeId::STRING);
        assert_eq!(arena.traverse(obj, &steps[1]).0, TypeId::STRING);
        let (ty, diags) = arena.traverse(obj, &steps[2]);
        assert_eq!(ty, TypeId::DYNAMIC);
        assert_eq!(diags.0[0].kind, DiagnosticKind::UnknownProperty);
        assert_eq!(diags.0[0].range, *steps[2].source_range());
    }

    #[test]
    fn missing_source_properties_must_be_optional() {
        let mut arena = TypeArena::new();
        let maybe_int = arena.optional(TypeId::INT);
        let dest_optional = object(&mut arena, &[("a", TypeId::INT), ("b", maybe_int)]);
        let dest_required = object(&mut arena, &[("a", TypeId::INT), ("b", TypeId::INT)]);
        let src = object(&mut arena, &[("a", TypeId::INT), ("extra", TypeId::STRING)]);
        assert_eq!(arena.conversion_from(dest_optional, src), SafeConversion);
        assert!(arena.assignable_from(dest_optional, src));
        assert_eq!(arena.conversion_from(dest_required, src), NoConversion);
        assert!(!arena.assignable_from(dest_required, src));
    }

    #[test]
    fn object_from_map_is_unsafe_at_best() {
        let mut arena = TypeArena::new();
        let dest = object(&mut arena, &[("a", TypeId::STRING)]);
        let map = arena.map(TypeId::STRING);
        assert_eq!(arena.conversion_from(dest, map), UnsafeConversion);
    }

    #[test]
    fn unify_merges_properties() {
        let mut arena = TypeArena::new();
        let a = object(&mut arena, &[("id", TypeId::INT), ("name", TypeId::STRING)]);
        let b = object(&mut arena, &[("id", TypeId::NUMBER), ("tags", TypeId::STRING)]);
        let (ty, kind) = arena.unify(a, b).unwrap();
        assert_eq!(kind, SafeConversion);
        assert_eq!(
            arena.display(ty),
            "object({id = number, name = union(none, string), tags = union(none, string)})"
        );
    }

    #[test]
    fn unify_terminates_on_recursive_objects() {
        let mut arena = TypeArena::new();
        let ints = arena
            .recursive_object(|arena, this| {
                let children = arena.list(this);
                Ok(IndexMap::from([("value".to_string(), TypeId::INT), ("children".to_string(), children)]))
            })
            .unwrap();
        let numbers = arena
            .recursive_object(|arena, this| {
                let children = arena.list(this);
                Ok(IndexMap::from([("value".to_string(), TypeId::NUMBER), ("children".to_string(), children)]))
            })
            .unwrap();
        let (ty, kind) = arena.unify(ints, numbers).unwrap();
        assert_eq!(kind, SafeConversion);
        let Ty::Object(unified) = arena.get(ty) else {
            panic!("expected an object");
        };
        assert_eq!(unified.property("value"), Some(TypeId::NUMBER));
        let children = unified.property("children").unwrap();
        assert_eq!(*arena.get(children), Ty::List(crate::model::ListType::new(ty)));
        assert_eq!(arena.display(ty), "object({children = list(...), value = number})");
    }
}
