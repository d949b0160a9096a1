//! JSON documents of named type declarations, loaded into a [`TypeArena`].
//!
//! ```json
//! { "types": {
//!     "Cat": { "object": { "name": "string", "lives": "int" } },
//!     "Pet": { "discriminated_union": { "discriminator": "kind", "mapping": { "cat": "Cat" } } }
//! } }
//! ```
//!
//! Named objects are declared before anything is resolved, so they may refer
//! to themselves and to each other. Every other name is an alias and must
//! bottom out without looping back to itself.
use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::model::{TypeArena, TypeId};

// ---------------------------------- AST ----------------------------------- //

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TypeExpr {
    /// A built-in such as `int`, or a declared name.
    Named(String),
    Compound(Compound),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Compound {
    Object(IndexMap<String, TypeExpr>),
    List(Box<TypeExpr>),
    Map(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    Optional(Box<TypeExpr>),
    DiscriminatedUnion {
        discriminator: String,
        mapping: IndexMap<String, TypeExpr>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    pub types: IndexMap<String, TypeExpr>,
}

// ------------------------------- Parsing ---------------------------------- //

/// Deserialize with the JSON path of the failing node in the error.
fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        ModelError::Schema(format!("at JSON path {path} → {}", err.into_inner()))
    })
}

impl Schema {
    pub fn parse(src: &str) -> Result<Self> {
        from_str_with_path(src)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_path_to_error::deserialize(value).map_err(|err| {
            let path = err.path().to_string();
            ModelError::Schema(format!("at JSON path {path} → {}", err.into_inner()))
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::parse(&source)
    }

    /// Add the declarations of `other`. Names must stay unique.
    pub fn merge(&mut self, other: Schema) -> Result<()> {
        for (name, expr) in other.types {
            if self.types.contains_key(&name) {
                return Err(ModelError::DuplicateType(name));
            }
            self.types.insert(name, expr);
        }
        Ok(())
    }

    /// Build every declared type into a fresh arena.
    pub fn build(&self) -> Result<Model> {
        let mut arena = TypeArena::new();
        let types = self.load(&mut arena)?;
        Ok(Model { arena, types })
    }

    /// Build every declared type into `arena` and return the handles by name,
    /// in declaration order.
    pub fn load(&self, arena: &mut TypeArena) -> Result<IndexMap<String, TypeId>> {
        let mut loader = Loader { schema: self, arena, resolved: IndexMap::new(), resolving: HashSet::new() };
        for name in self.types.keys() {
            if TypeArena::builtin(name).is_some() {
                return Err(ModelError::Schema(format!("`{name}` is a built-in type and cannot be redeclared")));
            }
        }

        let mut objects = Vec::new();
        for (name, expr) in &self.types {
            if let TypeExpr::Compound(Compound::Object(properties)) = expr {
                let id = loader.arena.declare_object();
                loader.resolved.insert(name.clone(), id);
                objects.push((id, properties));
            }
        }
        for (id, properties) in objects {
            let properties = loader.properties(properties)?;
            loader.arena.define_object(id, properties)?;
        }
        for name in self.types.keys() {
            loader.name(name)?;
        }

        let Loader { resolved, .. } = loader;
        debug!("loaded {} named types", resolved.len());
        Ok(self
            .types
            .keys()
            .filter_map(|name| resolved.get(name).map(|&id| (name.clone(), id)))
            .collect())
    }
}

// -------------------------------- Loader ---------------------------------- //

struct Loader<'a> {
    schema: &'a Schema,
    arena: &'a mut TypeArena,
    resolved: IndexMap<String, TypeId>,
    /// Aliases on the current resolution stack.
    resolving: HashSet<String>,
}

impl Loader<'_> {
    fn name(&mut self, name: &str) -> Result<TypeId> {
        if let Some(id) = TypeArena::builtin(name) {
            return Ok(id);
        }
        if let Some(&id) = self.resolved.get(name) {
            return Ok(id);
        }
        let schema = self.schema;
        let Some(expr) = schema.types.get(name) else {
            return Err(ModelError::UnknownType(name.to_string()));
        };
        if !self.resolving.insert(name.to_string()) {
            return Err(ModelError::CyclicAlias(name.to_string()));
        }
        let id = self.expr(expr)?;
        self.resolving.remove(name);
        self.resolved.insert(name.to_string(), id);
        Ok(id)
    }

    fn expr(&mut self, expr: &TypeExpr) -> Result<TypeId> {
        let compound = match expr {
            TypeExpr::Named(name) => return self.name(name),
            TypeExpr::Compound(compound) => compound,
        };
        match compound {
            Compound::Object(properties) => {
                let properties = self.properties(properties)?;
                Ok(self.arena.object(properties))
            }
            Compound::List(element) => {
                let element = self.expr(element)?;
                Ok(self.arena.list(element))
            }
            Compound::Map(element) => {
                let element = self.expr(element)?;
                Ok(self.arena.map(element))
            }
            Compound::Union(elements) => {
                let elements = elements.iter().map(|e| self.expr(e)).collect::<Result<Vec<_>>>()?;
                Ok(self.arena.union(elements))
            }
            Compound::Optional(element) => {
                let element = self.expr(element)?;
                Ok(self.arena.optional(element))
            }
            Compound::DiscriminatedUnion { discriminator, mapping } => {
                let mapping = self.properties(mapping)?;
                self.arena.discriminated_union(discriminator.clone(), mapping)
            }
        }
    }

    fn properties(&mut self, exprs: &IndexMap<String, TypeExpr>) -> Result<IndexMap<String, TypeId>> {
        let mut out = IndexMap::with_capacity(exprs.len());
        for (key, expr) in exprs {
            let id = self.expr(expr)?;
            out.insert(key.clone(), id);
        }
        Ok(out)
    }
}

// --------------------------------- Model ---------------------------------- //

/// A loaded schema: the arena plus its named entry points.
#[derive(Debug, Default)]
pub struct Model {
    pub arena: TypeArena,
    pub types: IndexMap<String, TypeId>,
}

impl Model {
    /// Declared names first, then built-ins.
    pub fn lookup(&self, name: &str) -> Result<TypeId> {
        self.types
            .get(name)
            .copied()
            .or_else(|| TypeArena::builtin(name))
            .ok_or_else(|| ModelError::UnknownType(name.to_string()))
    }
}
