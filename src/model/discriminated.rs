//! Tagged unions: the active member is picked by reading the `discriminator`
//! field off the value at runtime. Members are always object types.
use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, trace};

use super::combinators;
use super::union::{resolve_traversal, source_conversion};
use super::{PairSet, Ty, TypeArena, TypeId, Unified, UnifyMemo};
use crate::conversion::ConversionKind;
use crate::diag::Diagnostics;
use crate::error::{ModelError, Result};
use crate::traversal::Traverser;

#[derive(Debug, Clone, PartialEq)]
pub struct DiscriminatedUnionType {
    discriminator: String,
    /// Sorted by key so iteration, and therefore display, is stable.
    mapping: IndexMap<String, TypeId>,
}

impl DiscriminatedUnionType {
    /// Validation of the members happens in
    /// [`TypeArena::discriminated_union`], which is the only caller.
    pub(crate) fn new(discriminator: String, mut mapping: IndexMap<String, TypeId>) -> Self {
        mapping.sort_keys();
        Self { discriminator, mapping }
    }

    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    pub fn mapping(&self) -> &IndexMap<String, TypeId> {
        &self.mapping
    }

    pub fn member(&self, key: &str) -> Option<TypeId> {
        self.mapping.get(key).copied()
    }

    /// Every member is tried; a member that cannot take the step is skipped
    /// on the assumption that it is not the one present at runtime.
    pub(super) fn traverse(&self, arena: &mut TypeArena, this: TypeId, traverser: &Traverser) -> (TypeId, Diagnostics) {
        let mut results = Vec::with_capacity(self.mapping.len());
        for (key, &member) in &self.mapping {
            let (ty, diags) = arena.traverse(member, traverser);
            if diags.has_errors() {
                trace!("{}={key} cannot take `{traverser}`", self.discriminator);
                continue;
            }
            results.push(ty);
        }
        resolve_traversal(arena, this, results, traverser)
    }

    /// Same discriminator and the same keys, each mapped to equal members.
    pub(super) fn equals(&self, arena: &TypeArena, other: &Ty, seen: &mut PairSet) -> bool {
        let Ty::DiscriminatedUnion(other) = other else {
            return false;
        };
        self.discriminator == other.discriminator
            && self.mapping.len() == other.mapping.len()
            && self.mapping.iter().all(|(key, &member)| match other.member(key) {
                Some(other_member) => arena.equals_seen(member, other_member, seen),
                None => false,
            })
    }

    pub(super) fn assignable_from(&self, arena: &TypeArena, this: TypeId, src: TypeId, seen: &mut PairSet) -> bool {
        combinators::assignable_from(arena, this, src, seen, |seen| {
            self.mapping.values().any(|&member| arena.assignable_seen(member, src, seen))
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
        combinators::conversion_from(arena, this, src, unifying, seen, |seen| {
            self.mapping.values().fold(ConversionKind::NoConversion, |kind, &member| {
                kind.strongest(arena.conversion_seen(member, src, unifying, seen))
            })
        })
    }

    pub(super) fn conversion_to(
        &self,
        arena: &TypeArena,
        dest: TypeId,
        unifying: bool,
        seen: &mut PairSet,
    ) -> ConversionKind {
        source_conversion(arena, self.mapping.values().copied(), dest, unifying, seen)
    }

    pub(super) fn render(&self, arena: &TypeArena, seen: &mut HashSet<TypeId>) -> String {
        let mut text = format!("discriminated_union({}", self.discriminator);
        for (key, &member) in &self.mapping {
            text.push_str(&format!(", {key}={}", arena.render(member, seen)));
        }
        text.push(')');
        text
    }

    pub(super) fn unify(&self, arena: &mut TypeArena, this: TypeId, other: TypeId, memo: &mut UnifyMemo) -> Result<Unified> {
        combinators::unify(arena, this, other, memo, |arena, memo| self.unify_to(arena, this, other, memo))
    }

    /// Unify each member with `other`, keeping keys and discriminator. The
    /// result is only as safe as the weakest member unification. When some
    /// member would stop being an object, the two shapes are unrelated and
    /// the result is a plain union of both.
    pub(super) fn unify_to(&self, arena: &mut TypeArena, this: TypeId, other: TypeId, memo: &mut UnifyMemo) -> Result<Unified> {
        if arena.get(other).is_aggregate() || !self.absorbs(arena, other) {
            debug!("unify {this} with unrelated {other}");
            return Ok((arena.union([this, other]), ConversionKind::SafeConversion));
        }
        let mut mapping = IndexMap::with_capacity(self.mapping.len());
        let mut kind = ConversionKind::SafeConversion;
        for (key, &member) in &self.mapping {
            let (unified, ck) = arena.unify_seen(member, other, memo)?;
            // ruled out by `absorbs`
            if !arena.get(unified).is_object() {
                return Err(ModelError::NonObjectMember {
                    discriminator: self.discriminator.clone(),
                    key: key.clone(),
                    found: arena.describe(unified),
                });
            }
            kind = kind.weakest(ck);
            mapping.insert(key.clone(), unified);
        }
        let unified = arena.discriminated_union(self.discriminator.clone(), mapping)?;
        Ok((unified, kind))
    }

    /// Every member unifies with `other` into an object: `other` is an
    /// object itself, or each member takes it in more safely than it takes
    /// the member.
    fn absorbs(&self, arena: &TypeArena, other: TypeId) -> bool {
        if arena.get(other).is_object() {
            return true;
        }
        self.mapping.values().all(|&member| {
            let into_member = arena.conversion_seen(member, other, true, &mut PairSet::new());
            let into_other = arena.conversion_seen(other, member, true, &mut PairSet::new());
            into_member > into_other
        })
    }
}
