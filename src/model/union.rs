use std::collections::HashSet;

use super::combinators;
use super::{PairSet, Ty, TypeArena, TypeId, Unified, UnifyMemo};
use crate::conversion::ConversionKind;
use crate::diag::Diagnostics;
use crate::error::Result;
use crate::traversal::Traverser;

/// Values that may be any one of `elements`. Never nested, never a
/// single element; see [`new_union`].
#[derive(Debug, Clone, PartialEq)]
pub struct UnionType {
    elements: Vec<TypeId>,
}

/// Flatten nested unions and drop structural duplicates.
pub(crate) fn new_union<I>(arena: &mut TypeArena, elements: I) -> TypeId
where
    I: IntoIterator<Item = TypeId>,
{
    let mut flat = Vec::new();
    {
        let arena: &TypeArena = arena;
        for element in elements {
            match arena.get(element) {
                Ty::Union(union) => {
                    for &inner in &union.elements {
                        push_distinct(arena, &mut flat, inner);
                    }
                }
                _ => push_distinct(arena, &mut flat, element),
            }
        }
    }
    match flat.len() {
        0 => TypeId::NONE,
        1 => flat[0],
        _ => arena.alloc_union(flat),
    }
}

pub(crate) fn push_distinct(arena: &TypeArena, out: &mut Vec<TypeId>, ty: TypeId) {
    if !out.iter().any(|&seen| arena.equals(seen, ty)) {
        out.push(ty);
    }
}

/// Shared ending of union-like traversal: no result is a failure, a single
/// result is returned as is (unless it is `none`), several results become a
/// plain union because the runtime member is unknown past this step.
pub(crate) fn resolve_traversal(
    arena: &mut TypeArena,
    receiver: TypeId,
    results: Vec<TypeId>,
    traverser: &Traverser,
) -> (TypeId, Diagnostics) {
    let mut distinct = Vec::with_capacity(results.len());
    for ty in results {
        push_distinct(arena, &mut distinct, ty);
    }
    if distinct.len() > 1 {
        return (arena.union(distinct), Diagnostics::new());
    }
    match distinct.first() {
        Some(&only) if !matches!(arena.get(only), Ty::None) => (only, Diagnostics::new()),
        _ => (TypeId::DYNAMIC, Diagnostics::single(arena.unsupported_receiver(receiver, traverser))),
    }
}

impl UnionType {
    pub(crate) fn new(elements: Vec<TypeId>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[TypeId] {
        &self.elements
    }

    /// Each element is tried independently; failing elements are skipped.
    /// `none` passes through so an optional receiver gives an optional result.
    pub(super) fn traverse(&self, arena: &mut TypeArena, this: TypeId, traverser: &Traverser) -> (TypeId, Diagnostics) {
        let mut results = Vec::new();
        for &element in &self.elements {
            if matches!(arena.get(element), Ty::None) {
                results.push(TypeId::NONE);
                continue;
            }
            let (ty, diags) = arena.traverse(element, traverser);
            if !diags.has_errors() {
                results.push(ty);
            }
        }
        resolve_traversal(arena, this, results, traverser)
    }

    /// Same elements in any order.
    pub(super) fn equals(&self, arena: &TypeArena, other: &Ty, seen: &mut PairSet) -> bool {
        let Ty::Union(other) = other else {
            return false;
        };
        let covers = |left: &[TypeId], right: &[TypeId], seen: &mut PairSet| {
            left.iter().all(|&l| right.iter().any(|&r| arena.equals_seen(l, r, seen)))
        };
        self.elements.len() == other.elements.len()
            && covers(&self.elements, &other.elements, seen)
            && covers(&other.elements, &self.elements, seen)
    }

    /// A union source must fit entirely; anything else must fit some element.
    pub(super) fn assignable_from(&self, arena: &TypeArena, this: TypeId, src: TypeId, seen: &mut PairSet) -> bool {
        combinators::assignable_from(arena, this, src, seen, |seen| match arena.get(src) {
            Ty::Union(src) => src.elements.iter().all(|&s| arena.assignable_seen(this, s, seen)),
            _ => self.elements.iter().any(|&e| arena.assignable_seen(e, src, seen)),
        })
    }

    /// As a destination: the best element conversion.
    pub(super) fn conversion_from(
        &self,
        arena: &TypeArena,
        this: TypeId,
        src: TypeId,
        unifying: bool,
        seen: &mut PairSet,
    ) -> ConversionKind {
        combinators::conversion_from(arena, this, src, unifying, seen, |seen| {
            self.elements.iter().fold(ConversionKind::NoConversion, |kind, &e| {
                kind.strongest(arena.conversion_seen(e, src, unifying, seen))
            })
        })
    }

    /// As a source: safe only if every element converts safely.
    pub(super) fn conversion_to(
        &self,
        arena: &TypeArena,
        dest: TypeId,
        unifying: bool,
        seen: &mut PairSet,
    ) -> ConversionKind {
        source_conversion(arena, self.elements.iter().copied(), dest, unifying, seen)
    }

    pub(super) fn render(&self, arena: &TypeArena, seen: &mut HashSet<TypeId>) -> String {
        let mut items = self
            .elements
            .iter()
            .map(|&e| arena.render(e, seen))
            .collect::<Vec<_>>();
        items.sort();
        format!("union({})", items.join(", "))
    }

    pub(super) fn unify(&self, arena: &mut TypeArena, this: TypeId, other: TypeId, memo: &mut UnifyMemo) -> Result<Unified> {
        combinators::unify(arena, this, other, memo, |arena, memo| self.unify_to(arena, this, other, memo))
    }

    pub(super) fn unify_to(&self, arena: &mut TypeArena, this: TypeId, other: TypeId, memo: &mut UnifyMemo) -> Result<Unified> {
        if arena.get(other).is_aggregate() {
            return Ok((arena.union([this, other]), ConversionKind::SafeConversion));
        }
        let mut elements = Vec::with_capacity(self.elements.len());
        let mut kind = ConversionKind::SafeConversion;
        for &element in &self.elements {
            let (unified, ck) = arena.unify_seen(element, other, memo)?;
            kind = kind.weakest(ck);
            elements.push(unified);
        }
        Ok((arena.union(elements), kind))
    }
}

/// Conversion out of a value that may be any of `members`: none if no
/// member converts, safe if all convert safely, unsafe otherwise.
pub(crate) fn source_conversion<I>(
    arena: &TypeArena,
    members: I,
    dest: TypeId,
    unifying: bool,
    seen: &mut PairSet,
) -> ConversionKind
where
    I: IntoIterator<Item = TypeId>,
{
    let mut kind = ConversionKind::SafeConversion;
    let mut exists = false;
    for member in members {
        match arena.conversion_seen(dest, member, unifying, seen) {
            ConversionKind::SafeConversion => exists = true,
            ConversionKind::UnsafeConversion => {
                kind = ConversionKind::UnsafeConversion;
                exists = true;
            }
            ConversionKind::NoConversion => kind = ConversionKind::UnsafeConversion,
        }
    }
    if exists { kind } else { ConversionKind::NoConversion }
}
