//! The capability interface the engine is written against, and its
//! implementation for the in-memory [`Program`].
//!
//! The engine never constructs a host; it enumerates declarations, reads
//! annotations, and hands back new bodies and methods. A compiler plugin
//! would implement [`ProgramHost`] over its own trees.

use serde::Serialize;

use crate::error::HostError;
use crate::ir::{MethodDecl, Program, TypeDecl, simple_name};
use crate::tree::Stmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MethodId {
    pub ty: TypeId,
    pub index: usize,
}

pub trait ProgramHost {
    fn type_ids(&self) -> Vec<TypeId>;

    fn type_decl(&self, id: TypeId) -> Option<&TypeDecl>;

    fn method(&self, id: MethodId) -> Option<&MethodDecl> {
        self.type_decl(id.ty)?.methods.get(id.index)
    }

    fn method_ids(&self, ty: TypeId) -> Vec<MethodId> {
        let count = self.type_decl(ty).map_or(0, |t| t.methods.len());
        (0..count).map(|index| MethodId { ty, index }).collect()
    }

    /// Qualified name for `name` (qualified or simple), if the host knows it.
    fn lookup_type(&self, name: &str) -> Option<String>;

    /// Types outside this round that already expose the predicate.
    fn external_predicates(&self) -> &[String] {
        &[]
    }

    fn replace_body(&mut self, id: MethodId, body: Vec<Stmt>) -> Result<(), HostError>;

    fn add_method(&mut self, ty: TypeId, method: MethodDecl) -> Result<MethodId, HostError>;
}

/// Always resolvable, as if from the platform's standard library.
const PLATFORM_TYPES: &[&str] = &[
    "java.lang.Object",
    "java.lang.String",
    "java.lang.CharSequence",
    "java.lang.Exception",
    "java.lang.RuntimeException",
    "java.lang.IllegalArgumentException",
    "java.lang.IllegalStateException",
    "java.lang.NullPointerException",
    "java.lang.UnsupportedOperationException",
    "java.lang.IndexOutOfBoundsException",
];

impl Program {
    fn candidate_names(&self) -> impl Iterator<Item = &str> {
        self.types
            .iter()
            .map(|t| t.name.as_str())
            .chain(self.known_types.iter().map(String::as_str))
            .chain(PLATFORM_TYPES.iter().copied())
    }
}

impl ProgramHost for Program {
    fn type_ids(&self) -> Vec<TypeId> {
        (0..self.types.len()).map(TypeId).collect()
    }

    fn type_decl(&self, id: TypeId) -> Option<&TypeDecl> {
        self.types.get(id.0)
    }

    fn lookup_type(&self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.contains('.') {
            return self.candidate_names().find(|c| *c == name).map(str::to_string);
        }
        // simple names must be unambiguous
        let mut hits = self.candidate_names().filter(|c| simple_name(c) == name);
        let first = hits.next()?;
        match hits.find(|other| *other != first) {
            Some(_) => None,
            None => Some(first.to_string()),
        }
    }

    fn external_predicates(&self) -> &[String] {
        &self.external_predicates
    }

    fn replace_body(&mut self, id: MethodId, body: Vec<Stmt>) -> Result<(), HostError> {
        let method = self
            .types
            .get_mut(id.ty.0)
            .ok_or(HostError::UnknownType(id.ty.0))?
            .methods
            .get_mut(id.index)
            .ok_or(HostError::UnknownMethod { ty: id.ty.0, index: id.index })?;
        if method.body.is_none() {
            return Err(HostError::NoBody(method.name.clone()));
        }
        method.body = Some(body);
        method.instrumented = true;
        Ok(())
    }

    fn add_method(&mut self, ty: TypeId, method: MethodDecl) -> Result<MethodId, HostError> {
        let decl = self.types.get_mut(ty.0).ok_or(HostError::UnknownType(ty.0))?;
        decl.methods.push(method);
        Ok(MethodId { ty, index: decl.methods.len() - 1 })
    }
}
