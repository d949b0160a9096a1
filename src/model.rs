//! Structural type model.
//!
//! Types live in a [`TypeArena`] and refer to each other through [`TypeId`]
//! handles, so recursive shapes are plain index cycles and the whole graph is
//! dropped with the arena. The variant set is closed: [`Ty`] is the only way
//! to describe a type, and every operation below matches on it exhaustively.
//!
//! Operations (the capability contract every variant answers):
//! - `source_node`: originating syntax range, if any.
//! - `traverse`: one property/index step.
//! - `equals`: structural equality, cycle-safe.
//! - `assignable_from`: can a `src` value be used as `dest` without conversion.
//! - `conversion_from`: best conversion from `src` to `dest`.
//! - `display`: canonical, deterministic text.
//! - `unify`: least upper bound plus the weakest conversion seen building it.
pub mod collection;
pub mod combinators;
pub mod discriminated;
pub mod object;
pub mod primitive;
pub mod union;

use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use log::debug;
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::conversion::ConversionKind;
use crate::diag::{Diagnostic, DiagnosticKind, Diagnostics, SourceRange};
use crate::error::{ModelError, Result};
use crate::traversal::Traverser;

pub use collection::{ListType, MapType};
pub use discriminated::DiscriminatedUnionType;
pub use object::ObjectType;
pub use primitive::Primitive;
pub use union::UnionType;

// ------------------------------- Handles ---------------------------------- //

/// Handle to a type stored in a [`TypeArena`]. Equality is identity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TypeId(u32);

impl TypeId {
    /// Escape hatch: converts to and from anything.
    pub const DYNAMIC: TypeId = TypeId(0);
    /// The absent value.
    pub const NONE: TypeId = TypeId(1);
    pub const BOOL: TypeId = TypeId(2);
    pub const INT: TypeId = TypeId(3);
    pub const NUMBER: TypeId = TypeId(4);
    pub const STRING: TypeId = TypeId(5);

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ------------------------------- Variants --------------------------------- //

#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Dynamic,
    None,
    Primitive(Primitive),
    List(ListType),
    Map(MapType),
    Object(ObjectType),
    Union(UnionType),
    DiscriminatedUnion(DiscriminatedUnionType),
}

impl Ty {
    /// Union-like variants. They answer source-side conversion themselves
    /// (`conversion_to`) and drive unification against non-aggregates.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Ty::Union(_) | Ty::DiscriminatedUnion(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Ty::Object(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Ty::Dynamic => "dynamic",
            Ty::None => "none",
            Ty::Primitive(_) => "primitive",
            Ty::List(_) => "list",
            Ty::Map(_) => "map",
            Ty::Object(_) => "object",
            Ty::Union(_) => "union",
            Ty::DiscriminatedUnion(_) => "discriminated_union",
        }
    }
}

/// `(dest, src)` pairs on the current recursion stack, plus every full
/// equality check already made during the same operation.
#[derive(Debug, Default)]
pub(crate) struct PairSet {
    stack: HashSet<(TypeId, TypeId)>,
    equal: HashMap<(TypeId, TypeId), bool>,
}

impl PairSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// False if the pair is already on the stack.
    pub(crate) fn insert(&mut self, pair: (TypeId, TypeId)) -> bool {
        self.stack.insert(pair)
    }

    pub(crate) fn remove(&mut self, pair: &(TypeId, TypeId)) {
        self.stack.remove(pair);
    }

    /// Structural equality, compared at most once per pair. The comparison
    /// runs on its own stack, since pairs on this one are conversion or
    /// assignability pairs, and shares the cache of earlier answers.
    pub(crate) fn equals(&mut self, arena: &TypeArena, a: TypeId, b: TypeId) -> bool {
        if let Some(&equal) = self.equal.get(&(a, b)) {
            return equal;
        }
        let mut scratch = PairSet { stack: HashSet::new(), equal: std::mem::take(&mut self.equal) };
        let equal = arena.equals_seen(a, b, &mut scratch);
        self.equal = scratch.equal;
        self.equal.insert((a, b), equal);
        equal
    }
}

/// Result of a unification: the common type and the weakest conversion
/// observed while building it.
pub type Unified = (TypeId, ConversionKind);

/// Unifications already started (or finished) for a pair of inputs.
pub(crate) type UnifyMemo = HashMap<(TypeId, TypeId), Unified>;

// -------------------------------- Arena ----------------------------------- //

#[derive(Debug)]
struct TypeNode {
    ty: Ty,
    origin: Option<SourceRange>,
    display: OnceCell<String>,
}

/// Owns every type of one model. Immutable once built, apart from the
/// once-only display cache, so `&TypeArena` can be shared across threads.
#[derive(Debug)]
pub struct TypeArena {
    nodes: Vec<TypeNode>,
    pending: HashSet<TypeId>,
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeArena {
    pub fn new() -> Self {
        let mut arena = Self { nodes: Vec::new(), pending: HashSet::new() };
        // order must match the TypeId constants
        arena.alloc(Ty::Dynamic, None);
        arena.alloc(Ty::None, None);
        for p in [Primitive::Bool, Primitive::Int, Primitive::Number, Primitive::String] {
            arena.alloc(Ty::Primitive(p), None);
        }
        arena
    }

    fn alloc(&mut self, ty: Ty, origin: Option<SourceRange>) -> TypeId {
        let id = TypeId(self.nodes.len() as u32);
        self.nodes.push(TypeNode { ty, origin, display: OnceCell::new() });
        id
    }

    fn node(&self, id: TypeId) -> &TypeNode {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: TypeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// True once every [`declare_object`](Self::declare_object) has been
    /// matched by a definition.
    pub fn is_pending_free(&self) -> bool {
        self.pending.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `id` was minted by a different arena.
    pub fn get(&self, id: TypeId) -> &Ty {
        &self.node(id).ty
    }

    /// Built-in types by their display name.
    pub fn builtin(name: &str) -> Option<TypeId> {
        match name {
            "dynamic" => Some(TypeId::DYNAMIC),
            "none" => Some(TypeId::NONE),
            _ => Primitive::from_name(name).map(Primitive::type_id),
        }
    }

    // ---------------------------- Construction ---------------------------- //

    pub fn list(&mut self, element: TypeId) -> TypeId {
        self.alloc(Ty::List(ListType::new(element)), None)
    }

    pub fn map(&mut self, element: TypeId) -> TypeId {
        self.alloc(Ty::Map(MapType::new(element)), None)
    }

    pub fn object(&mut self, properties: IndexMap<String, TypeId>) -> TypeId {
        self.alloc(Ty::Object(ObjectType::new(properties)), None)
    }

    pub fn object_at(&mut self, properties: IndexMap<String, TypeId>, origin: SourceRange) -> TypeId {
        self.alloc(Ty::Object(ObjectType::new(properties)), Some(origin))
    }

    /// Reserve an empty object whose properties are filled in later by
    /// [`define_object`](Self::define_object). This is how cycles are built.
    pub fn declare_object(&mut self) -> TypeId {
        let id = self.alloc(Ty::Object(ObjectType::default()), None);
        self.pending.insert(id);
        id
    }

    pub fn define_object(&mut self, id: TypeId, properties: IndexMap<String, TypeId>) -> Result<()> {
        if !self.pending.remove(&id) {
            return Err(ModelError::NotPending(id));
        }
        self.nodes[id.index()].ty = Ty::Object(ObjectType::new(properties));
        Ok(())
    }

    /// Build an object that may refer to itself through the handle passed to
    /// `build`.
    pub fn recursive_object<F>(&mut self, build: F) -> Result<TypeId>
    where
        F: FnOnce(&mut Self, TypeId) -> Result<IndexMap<String, TypeId>>,
    {
        let id = self.declare_object();
        let properties = build(self, id)?;
        self.define_object(id, properties)?;
        Ok(id)
    }

    /// Flattening, de-duplicating union. One element collapses to itself,
    /// zero elements to `none`.
    pub fn union<I>(&mut self, elements: I) -> TypeId
    where
        I: IntoIterator<Item = TypeId>,
    {
        union::new_union(self, elements)
    }

    pub fn optional(&mut self, ty: TypeId) -> TypeId {
        self.union([ty, TypeId::NONE])
    }

    pub(crate) fn alloc_union(&mut self, elements: Vec<TypeId>) -> TypeId {
        self.alloc(Ty::Union(UnionType::new(elements)), None)
    }

    /// A union whose active member is picked by reading `discriminator` off
    /// the value. Every member must be an object type.
    pub fn discriminated_union(
        &mut self,
        discriminator: impl Into<String>,
        mapping: IndexMap<String, TypeId>,
    ) -> Result<TypeId> {
        let discriminator = discriminator.into();
        if discriminator.is_empty() {
            return Err(ModelError::EmptyDiscriminator);
        }
        if mapping.is_empty() {
            return Err(ModelError::EmptyMapping { discriminator });
        }
        for (key, &member) in &mapping {
            if !self.get(member).is_object() {
                return Err(ModelError::NonObjectMember {
                    discriminator,
                    key: key.clone(),
                    found: self.describe(member),
                });
            }
        }
        let du = DiscriminatedUnionType::new(discriminator, mapping);
        Ok(self.alloc(Ty::DiscriminatedUnion(du), None))
    }

    // ------------------------------ Contract ------------------------------ //

    pub fn source_node(&self, id: TypeId) -> Option<&SourceRange> {
        self.node(id).origin.as_ref()
    }

    pub fn traverse(&mut self, id: TypeId, traverser: &Traverser) -> (TypeId, Diagnostics) {
        let ty = self.get(id).clone();
        match ty {
            Ty::Dynamic => (TypeId::DYNAMIC, Diagnostics::new()),
            Ty::None | Ty::Primitive(_) => {
                (TypeId::DYNAMIC, Diagnostics::single(self.unsupported_receiver(id, traverser)))
            }
            Ty::List(list) => list.traverse(self, id, traverser),
            Ty::Map(map) => map.traverse(),
            Ty::Object(object) => object.traverse(self, id, traverser),
            Ty::Union(union) => union.traverse(self, id, traverser),
            Ty::DiscriminatedUnion(du) => du.traverse(self, id, traverser),
        }
    }

    /// Apply each step in turn, stopping at the first failing one.
    pub fn traverse_path(&mut self, id: TypeId, path: &[Traverser]) -> (TypeId, Diagnostics) {
        let mut current = id;
        for step in path {
            let (next, diags) = self.traverse(current, step);
            if diags.has_errors() {
                return (next, diags);
            }
            current = next;
        }
        (current, Diagnostics::new())
    }

    pub fn equals(&self, a: TypeId, b: TypeId) -> bool {
        self.equals_seen(a, b, &mut PairSet::new())
    }

    pub fn assignable_from(&self, dest: TypeId, src: TypeId) -> bool {
        self.assignable_seen(dest, src, &mut PairSet::new())
    }

    pub fn conversion_from(&self, dest: TypeId, src: TypeId) -> ConversionKind {
        self.conversion_seen(dest, src, false, &mut PairSet::new())
    }

    /// Canonical text, computed once per type. Only call this on finished
    /// types; a pending declaration would be cached as an empty object.
    pub fn display(&self, id: TypeId) -> &str {
        self.node(id).display.get_or_init(|| self.render(id, &mut HashSet::new()))
    }

    pub fn unify(&mut self, a: TypeId, b: TypeId) -> Result<Unified> {
        let unified = self.unify_seen(a, b, &mut UnifyMemo::new())?;
        debug!("unify {a} {b} -> {} ({})", unified.0, unified.1);
        Ok(unified)
    }

    // ------------------------------ Dispatch ------------------------------ //

    pub(crate) fn equals_seen(&self, a: TypeId, b: TypeId, seen: &mut PairSet) -> bool {
        if a == b {
            return true;
        }
        // a declaration without properties yet has no structure to compare
        if self.pending.contains(&a) || self.pending.contains(&b) {
            return false;
        }
        if let Some(&equal) = seen.equal.get(&(a, b)) {
            return equal;
        }
        if !seen.insert((a, b)) {
            return true;
        }
        let equal = match (self.get(a), self.get(b)) {
            (Ty::Dynamic, Ty::Dynamic) | (Ty::None, Ty::None) => true,
            (Ty::Primitive(x), Ty::Primitive(y)) => x == y,
            (Ty::List(x), Ty::List(y)) => self.equals_seen(x.element, y.element, seen),
            (Ty::Map(x), Ty::Map(y)) => self.equals_seen(x.element, y.element, seen),
            (Ty::Object(x), other) => x.equals(self, other, seen),
            (Ty::Union(x), other) => x.equals(self, other, seen),
            (Ty::DiscriminatedUnion(x), other) => x.equals(self, other, seen),
            _ => false,
        };
        seen.remove(&(a, b));
        // a mismatch holds whatever was assumed about pairs on the stack
        if !equal {
            seen.equal.insert((a, b), false);
        }
        equal
    }

    pub(crate) fn assignable_seen(&self, dest: TypeId, src: TypeId, seen: &mut PairSet) -> bool {
        match self.get(dest) {
            Ty::Dynamic | Ty::None => combinators::assignable_from(self, dest, src, seen, |_| false),
            Ty::Primitive(p) => p.assignable_from(self, dest, src, seen),
            Ty::List(list) => list.assignable_from(self, dest, src, seen),
            Ty::Map(map) => map.assignable_from(self, dest, src, seen),
            Ty::Object(object) => object.assignable_from(self, dest, src, seen),
            Ty::Union(union) => union.assignable_from(self, dest, src, seen),
            Ty::DiscriminatedUnion(du) => du.assignable_from(self, dest, src, seen),
        }
    }

    pub(crate) fn conversion_seen(
        &self,
        dest: TypeId,
        src: TypeId,
        unifying: bool,
        seen: &mut PairSet,
    ) -> ConversionKind {
        match self.get(dest) {
            Ty::Dynamic | Ty::None => combinators::conversion_from(self, dest, src, unifying, seen, |_| {
                ConversionKind::NoConversion
            }),
            Ty::Primitive(p) => p.conversion_from(self, dest, src, unifying, seen),
            Ty::List(list) => list.conversion_from(self, dest, src, unifying, seen),
            Ty::Map(map) => map.conversion_from(self, dest, src, unifying, seen),
            Ty::Object(object) => object.conversion_from(self, dest, src, unifying, seen),
            Ty::Union(union) => union.conversion_from(self, dest, src, unifying, seen),
            Ty::DiscriminatedUnion(du) => du.conversion_from(self, dest, src, unifying, seen),
        }
    }

    /// Source-side conversion for aggregates: what `dest` gets from `src`
    /// when `src` may be any of its members at runtime.
    pub(crate) fn conversion_to(
        &self,
        src: TypeId,
        dest: TypeId,
        unifying: bool,
        seen: &mut PairSet,
    ) -> ConversionKind {
        match self.get(src) {
            Ty::Union(union) => union.conversion_to(self, dest, unifying, seen),
            Ty::DiscriminatedUnion(du) => du.conversion_to(self, dest, unifying, seen),
            other => {
                debug_assert!(!other.is_aggregate());
                ConversionKind::NoConversion
            }
        }
    }

    pub(crate) fn unify_seen(&mut self, a: TypeId, b: TypeId, memo: &mut UnifyMemo) -> Result<Unified> {
        let ty = self.get(a).clone();
        match ty {
            Ty::Dynamic | Ty::None | Ty::Primitive(_) => combinators::unify(self, a, b, memo, |arena, _| {
                Ok(combinators::unify_by_conversion(arena, a, b))
            }),
            Ty::List(list) => list.unify(self, a, b, memo),
            Ty::Map(map) => map.unify(self, a, b, memo),
            Ty::Object(object) => object.unify(self, a, b, memo),
            Ty::Union(union) => union.unify(self, a, b, memo),
            Ty::DiscriminatedUnion(du) => du.unify(self, a, b, memo),
        }
    }

    /// Let an aggregate unify itself with `other`.
    pub(crate) fn unify_to(&mut self, aggregate: TypeId, other: TypeId, memo: &mut UnifyMemo) -> Result<Unified> {
        let ty = self.get(aggregate).clone();
        match ty {
            Ty::Union(union) => union.unify_to(self, aggregate, other, memo),
            Ty::DiscriminatedUnion(du) => du.unify_to(self, aggregate, other, memo),
            _ => self.unify_seen(aggregate, other, memo),
        }
    }

    pub(crate) fn render(&self, id: TypeId, seen: &mut HashSet<TypeId>) -> String {
        if !seen.insert(id) {
            return "...".to_string();
        }
        let text = match self.get(id) {
            Ty::Dynamic => "dynamic".to_string(),
            Ty::None => "none".to_string(),
            Ty::Primitive(p) => p.as_str().to_string(),
            Ty::List(list) => format!("list({})", self.render(list.element, seen)),
            Ty::Map(map) => format!("map({})", self.render(map.element, seen)),
            Ty::Object(object) => object.render(self, seen),
            Ty::Union(union) => union.render(self, seen),
            Ty::DiscriminatedUnion(du) => du.render(self, seen),
        };
        seen.remove(&id);
        text
    }

    /// Uncached rendering, safe to use while the arena is still being built.
    pub fn describe(&self, id: TypeId) -> String {
        self.render(id, &mut HashSet::new())
    }

    pub(crate) fn unsupported_receiver(&self, receiver: TypeId, traverser: &Traverser) -> Diagnostic {
        Diagnostic::error(
            DiagnosticKind::UnsupportedReceiverType,
            "unsupported receiver type",
            format!("cannot traverse a value of type {} with `{traverser}`", self.describe(receiver)),
            traverser.source_range().clone(),
        )
    }
}
