use serde::Serialize;

use super::combinators;
use super::{PairSet, Ty, TypeArena, TypeId};
use crate::conversion::ConversionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Bool,
    Int,
    Number,
    String,
}

impl Primitive {
    pub fn type_id(self) -> TypeId {
        match self {
            Primitive::Bool => TypeId::BOOL,
            Primitive::Int => TypeId::INT,
            Primitive::Number => TypeId::NUMBER,
            Primitive::String => TypeId::STRING,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int => "int",
            Primitive::Number => "number",
            Primitive::String => "string",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(Primitive::Bool),
            "int" => Some(Primitive::Int),
            "number" => Some(Primitive::Number),
            "string" => Some(Primitive::String),
            _ => None,
        }
    }

    /// Tie-break when two primitives convert into each other equally well.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Primitive::Bool => 1,
            Primitive::Int => 2,
            Primitive::Number => 3,
            Primitive::String => 4,
        }
    }

    fn convert_from(self, src: Primitive, unifying: bool) -> ConversionKind {
        use ConversionKind::*;
        match (self, src) {
            (dest, src) if dest == src => SafeConversion,
            (Primitive::Number, Primitive::Int) => SafeConversion,
            (Primitive::Number, Primitive::Bool | Primitive::String) => UnsafeConversion,
            (Primitive::Int, Primitive::Number | Primitive::String) => UnsafeConversion,
            (Primitive::Bool, Primitive::String) => UnsafeConversion,
            // anything prints as a string, but while unifying we would rather
            // not pick string over a numeric or boolean side
            (Primitive::String, _) if unifying => UnsafeConversion,
            (Primitive::String, _) => SafeConversion,
            _ => NoConversion,
        }
    }

    pub(super) fn assignable_from(self, arena: &TypeArena, this: TypeId, src: TypeId, seen: &mut PairSet) -> bool {
        combinators::assignable_from(arena, this, src, seen, |_| {
            matches!((self, arena.get(src)), (Primitive::Number, Ty::Primitive(Primitive::Int)))
        })
    }

    pub(super) fn conversion_from(
        self,
        arena: &TypeArena,
        this: TypeId,
        src: TypeId,
        unifying: bool,
        seen: &mut PairSet,
    ) -> ConversionKind {
        combinators::conversion_from(arena, this, src, unifying, seen, |_| match arena.get(src) {
            Ty::Primitive(p) => self.convert_from(*p, unifying),
            _ => ConversionKind::NoConversion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::ConversionKind::*;

    #[test]
    fn conversion_table() {
        let arena = TypeArena::new();
        assert_eq!(arena.conversion_from(TypeId::NUMBER, TypeId::INT), SafeConversion);
        assert_eq!(arena.conversion_from(TypeId::INT, TypeId::NUMBER), UnsafeConversion);
        assert_eq!(arena.conversion_from(TypeId::INT, TypeId::BOOL), NoConversion);
        assert_eq!(arena.conversion_from(TypeId::BOOL, TypeId::STRING), UnsafeConversion);
        assert_eq!(arena.conversion_from(TypeId::BOOL, TypeId::NUMBER), NoConversion);
        assert_eq!(arena.conversion_from(TypeId::STRING, TypeId::BOOL), SafeConversion);
        assert_eq!(arena.conversion_from(TypeId::STRING, TypeId::NONE), NoConversion);
    }

    #[test]
    fn to_string_is_unsafe_while_unifying() {
        let arena = TypeArena::new();
        let mut seen = PairSet::new();
        assert_eq!(arena.conversion_seen(TypeId::STRING, TypeId::INT, true, &mut seen), UnsafeConversion);
        assert_eq!(arena.conversion_seen(TypeId::STRING, TypeId::INT, false, &mut seen), SafeConversion);
    }

    #[test]
    fn only_int_widens_without_conversion() {
        let arena = TypeArena::new();
        assert!(arena.assignable_from(TypeId::NUMBER, TypeId::INT));
        assert!(!arena.assignable_from(TypeId::INT, TypeId::NUMBER));
        assert!(!arena.assignable_from(TypeId::STRING, TypeId::INT));
    }

    #[test]
    fn names_round_trip() {
        for p in [Primitive::Bool, Primitive::Int, Primitive::Number, Primitive::String] {
            assert_eq!(Primitive::from_name(p.as_str()), Some(p));
        }
    }
}
