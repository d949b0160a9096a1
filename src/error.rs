use thiserror::Error;

use crate::model::TypeId;

pub type Result<T, E = ModelError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("discriminated union has an empty discriminator")]
    EmptyDiscriminator,

    #[error("discriminated union on `{discriminator}` has no members")]
    EmptyMapping { discriminator: String },

    /// A member of a discriminated union is (or unified into) something that
    /// is not an object type.
    #[error("member `{key}` of discriminated union on `{discriminator}` is not an object type: {found}")]
    NonObjectMember {
        discriminator: String,
        key: String,
        found: String,
    },

    #[error("type {0} is not a pending object declaration")]
    NotPending(TypeId),

    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("type `{0}` is defined more than once")]
    DuplicateType(String),

    #[error("type alias `{0}` refers to itself")]
    CyclicAlias(String),

    #[error("invalid schema: {0}")]
    Schema(String),

    #[error("invalid traversal path `{path}` at byte {offset}: {reason}")]
    InvalidPath {
        path: String,
        offset: usize,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
