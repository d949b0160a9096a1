//! `list(T)` and `map(T)`.
use super::combinators;
use super::{PairSet, Ty, TypeArena, TypeId, Unified, UnifyMemo};
use crate::conversion::ConversionKind;
use crate::diag::Diagnostics;
use crate::error::Result;
use crate::traversal::Traverser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListType {
    pub element: TypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapType {
    pub element: TypeId,
}

// --------------------------------- List ----------------------------------- //

impl ListType {
    pub fn new(element: TypeId) -> Self {
        Self { element }
    }

    /// Numeric index only.
    pub(super) fn traverse(&self, arena: &TypeArena, this: TypeId, traverser: &Traverser) -> (TypeId, Diagnostics) {
        match traverser.list_index() {
            Some(_) => (self.element, Diagnostics::new()),
            None => (TypeId::DYNAMIC, Diagnostics::single(arena.unsupported_receiver(this, traverser))),
        }
    }

    pub(super) fn assignable_from(&self, arena: &TypeArena, this: TypeId, src: TypeId, seen: &mut PairSet) -> bool {
        combinators::assignable_from(arena, this, src, seen, |seen| match arena.get(src) {
            Ty::List(src) => arena.assignable_seen(self.element, src.element, seen),
            _ => false,
        })
    }

    pub(super) fn conversion_from(
        &self,
        arena: &TypeArena,
        this: TypeId,
        src: TypeId,
        unifying: bool,
        seen: &mut PairSet,
    ) -> ConversionKind {
        combinators::conversion_from(arena, this, src, unifying, seen, |seen| match arena.get(src) {
            Ty::List(src) => arena.conversion_seen(self.element, src.element, unifying, seen),
            _ => ConversionKind::NoConversion,
        })
    }

    pub(super) fn unify(&self, arena: &mut TypeArena, this: TypeId, other: TypeId, memo: &mut UnifyMemo) -> Result<Unified> {
        combinators::unify(arena, this, other, memo, |arena, memo| {
            let other_element = match arena.get(other) {
                Ty::List(other) => other.element,
                _ => return Ok(combinators::unify_by_conversion(arena, this, other)),
            };
            let (element, kind) = arena.unify_seen(self.element, other_element, memo)?;
            Ok((arena.list(element), kind))
        })
    }
}

// ---------------------------------- Map ----------------------------------- //

impl MapType {
    pub fn new(element: TypeId) -> Self {
        Self { element }
    }

    /// Any key reaches the element type.
    pub(super) fn traverse(&self) -> (TypeId, Diagnostics) {
        (self.element, Diagnostics::new())
    }

    pub(super) fn assignable_from(&self, arena: &TypeArena, this: TypeId, src: TypeId, seen: &mut PairSet) -> bool {
        combinators::assignable_from(arena, this, src, seen, |seen| match arena.get(src) {
            Ty::Map(src) => arena.assignable_seen(self.element, src.element, seen),
            Ty::Object(src) => src
                .properties()
                .values()
                .all(|&p| arena.assignable_seen(self.element, p, seen)),
            _ => false,
        })
    }

    pub(super) fn conversion_from(
        &self,
        arena: &TypeArena,
        this: TypeId,
        src: TypeId,
        unifying: bool,
        seen: &mut PairSet,
    ) -> ConversionKind {
        combinators::conversion_from(arena, this, src, unifying, seen, |seen| match arena.get(src) {
            Ty::Map(src) => arena.conversion_seen(self.element, src.element, unifying, seen),
            Ty::Object(src) => src
                .properties()
                .values()
                .fold(ConversionKind::SafeConversion, |kind, &p| {
                    kind.weakest(arena.conversion_seen(self.element, p, unifying, seen))
                }),
            _ => ConversionKind::NoConversion,
        })
    }

    pub(super) fn unify(&self, arena: &mut TypeArena, this: TypeId, other: TypeId, memo: &mut UnifyMemo) -> Result<Unified> {
        combinators::unify(arena, this, other, memo, |arena, memo| {
            let other_element = match arena.get(other) {
                Ty::Map(other) => other.element,
                _ => return Ok(combinators::unify_by_conversion(arena, this, other)),
            };
            let (element, kind) = arena.unify_seen(self.element, other_element, memo)?;
            Ok((arena.map(element), kind))
        })
    }
}
