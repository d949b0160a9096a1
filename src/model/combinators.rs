//! Shared short-circuits for assignability, conversion and unification.
//!
//! Each variant hands in a fallback closure with its own structural rule;
//! identity, the dynamic type, recursion cycles and union-like sources are
//! settled here before the fallback runs.
use log::{debug, trace};

use super::{PairSet, Ty, TypeArena, TypeId, Unified, UnifyMemo};
use crate::conversion::ConversionKind;
use crate::error::Result;

pub(crate) fn assignable_from<F>(
    arena: &TypeArena,
    dest: TypeId,
    src: TypeId,
    seen: &mut PairSet,
    fallback: F,
) -> bool
where
    F: FnOnce(&mut PairSet) -> bool,
{
    if dest == src || matches!(arena.get(dest), Ty::Dynamic) || seen.equals(arena, dest, src) {
        return true;
    }
    if !seen.insert((dest, src)) {
        trace!("assignable cycle at {dest} <- {src}");
        return true;
    }
    let assignable = fallback(seen);
    seen.remove(&(dest, src));
    assignable
}

/// `unifying` is threaded through untouched; only leaf rules read it.
pub(crate) fn conversion_from<F>(
    arena: &TypeArena,
    dest: TypeId,
    src: TypeId,
    unifying: bool,
    seen: &mut PairSet,
    fallback: F,
) -> ConversionKind
where
    F: FnOnce(&mut PairSet) -> ConversionKind,
{
    if dest == src || matches!(arena.get(dest), Ty::Dynamic) {
        return ConversionKind::SafeConversion;
    }
    if matches!(arena.get(src), Ty::Dynamic) {
        return ConversionKind::UnsafeConversion;
    }
    if seen.equals(arena, dest, src) {
        return ConversionKind::SafeConversion;
    }
    if !seen.insert((dest, src)) {
        trace!("conversion cycle at {dest} <- {src}");
        return ConversionKind::SafeConversion;
    }
    // a union-like source is only as safe as its worst member
    let kind = if arena.get(src).is_aggregate() {
        arena.conversion_to(src, dest, unifying, seen)
    } else {
        fallback(seen)
    };
    seen.remove(&(dest, src));
    kind
}

pub(crate) fn unify<F>(
    arena: &mut TypeArena,
    a: TypeId,
    b: TypeId,
    memo: &mut UnifyMemo,
    fallback: F,
) -> Result<Unified>
where
    F: FnOnce(&mut TypeArena, &mut UnifyMemo) -> Result<Unified>,
{
    if a == b || arena.equals(a, b) {
        return Ok((a, ConversionKind::SafeConversion));
    }
    // dynamic unifies with anything by picking the other side
    if matches!(arena.get(a), Ty::Dynamic) {
        return Ok((b, ConversionKind::UnsafeConversion));
    }
    if matches!(arena.get(b), Ty::Dynamic) {
        return Ok((a, ConversionKind::UnsafeConversion));
    }
    if arena.get(b).is_aggregate() && !arena.get(a).is_aggregate() {
        debug!("unify {a} with aggregate {b}");
        return arena.unify_to(b, a, memo);
    }
    fallback(arena, memo)
}

/// Leaf fallback: keep whichever side the other converts into more safely.
/// Unrelated types become a union of both.
pub(crate) fn unify_by_conversion(arena: &mut TypeArena, a: TypeId, b: TypeId) -> Unified {
    let mut seen = PairSet::new();
    let into_a = arena.conversion_seen(a, b, true, &mut seen);
    let into_b = arena.conversion_seen(b, a, true, &mut seen);
    if into_a > into_b {
        return (a, into_a);
    }
    if into_b > into_a {
        return (b, into_b);
    }
    if !into_a.exists() {
        return (arena.union([a, b]), ConversionKind::SafeConversion);
    }
    if rank(arena.get(b)) > rank(arena.get(a)) {
        (b, into_b)
    } else {
        (a, into_a)
    }
}

fn rank(ty: &Ty) -> u8 {
    match ty {
        Ty::Primitive(p) => p.rank(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::conversion::ConversionKind::*;

    #[test]
    fn dynamic_short_circuits() {
        let mut arena = TypeArena::new();
        assert!(arena.assignable_from(TypeId::DYNAMIC, TypeId::STRING));
        assert_eq!(arena.conversion_from(TypeId::DYNAMIC, TypeId::INT), SafeConversion);
        assert_eq!(arena.conversion_from(TypeId::INT, TypeId::DYNAMIC), UnsafeConversion);
        assert_eq!(arena.unify(TypeId::DYNAMIC, TypeId::BOOL).unwrap(), (TypeId::BOOL, UnsafeConversion));
        assert_eq!(arena.unify(TypeId::BOOL, TypeId::DYNAMIC).unwrap(), (TypeId::BOOL, UnsafeConversion));
    }

    #[test]
    fn identity_is_safe() {
        let mut arena = TypeArena::new();
        let a = arena.list(TypeId::INT);
        let b = arena.list(TypeId::INT);
        assert!(arena.assignable_from(a, b));
        assert_eq!(arena.conversion_from(a, b), SafeConversion);
        assert_eq!(arena.unify(a, b).unwrap(), (a, SafeConversion));
    }

    #[test]
    fn unrelated_leaves_unify_into_a_union() {
        let mut arena = TypeArena::new();
        let obj = arena.object(IndexMap::new());
        let list = arena.list(TypeId::INT);
        let (ty, kind) = arena.unify(obj, list).unwrap();
        assert_eq!(kind, SafeConversion);
        assert_eq!(arena.display(ty), "union(list(int), object({}))");
    }

    #[test]
    fn primitive_ties_break_by_rank() {
        let mut arena = TypeArena::new();
        assert_eq!(arena.unify(TypeId::NUMBER, TypeId::STRING).unwrap(), (TypeId::STRING, UnsafeConversion));
        assert_eq!(arena.unify(TypeId::STRING, TypeId::NUMBER).unwrap(), (TypeId::STRING, UnsafeConversion));
        assert_eq!(arena.unify(TypeId::INT, TypeId::NUMBER).unwrap(), (TypeId::NUMBER, SafeConversion));
    }

    #[test]
    fn union_source_is_asked_first() {
        let mut arena = TypeArena::new();
        let int_or_string = arena.union([TypeId::INT, TypeId::STRING]);
        // as a destination the union takes its best member,
        assert_eq!(arena.conversion_from(int_or_string, TypeId::INT), SafeConversion);
        // as a source it is only as good as its worst one
        assert_eq!(arena.conversion_from(TypeId::NUMBER, int_or_string), UnsafeConversion);
        assert_eq!(arena.conversion_from(TypeId::STRING, int_or_string), SafeConversion);
    }
}
