// Host-neutral program model. This is what the in-memory host owns and what
// the CLI reads/writes as JSON.

use serde::{Deserialize, Serialize};

use crate::tree::Stmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    /// Extra qualified names the host can resolve (exception types from libraries, …).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub known_types: Vec<String>,
    /// Types instrumented in an earlier round; they already expose the predicate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_predicates: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
    Enum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,        // qualified, e.g. `com.acme.Order`
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub nested: bool,        // enclosing element is a type, not a package
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub fields: Vec<VarDecl>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

/// A field or a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Static,
    Final,
    Abstract,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default = "void")]
    pub return_type: String,
    #[serde(default)]
    pub params: Vec<VarDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    /// `None` for abstract and native methods.
    #[serde(default)]
    pub body: Option<Vec<Stmt>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub generated: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub instrumented: bool,
}

fn void() -> String {
    "void".to_string()
}

/// Markers and rules as they appear on declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Annotation {
    NotNull,
    Nullable,
    NotBlank,
    NumberRule {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default)]
        not_equal: Option<f64>,
    },
    SizeRule {
        #[serde(default)]
        min: Option<i64>,
        #[serde(default)]
        max: Option<i64>,
    },
    /// Inclusion marker; also carries exception type and message overrides.
    Throw {
        #[serde(default)]
        exception: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    /// Inclusion marker; a violated guard returns instead of throwing.
    /// `value` is host expression text, else the return type's default.
    Return {
        #[serde(default)]
        value: Option<String>,
    },
    Exclusive,
}

/// How a marked element fails, taken from its first inclusion marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Throw,
    Return { value: Option<String> },
}

impl Annotation {
    /// Annotations that make a parameter or field rule-bearing.
    pub fn is_rule(&self) -> bool {
        !matches!(self, Annotation::Exclusive)
    }
    pub fn is_inclusion_marker(&self) -> bool {
        self.marker().is_some()
    }
    pub fn marker(&self) -> Option<Marker> {
        match self {
            Annotation::Throw { .. } => Some(Marker::Throw),
            Annotation::Return { value } => Some(Marker::Return {
                value: value.clone().filter(|v| !v.trim().is_empty()),
            }),
            _ => None,
        }
    }
}

pub fn marker(annotations: &[Annotation]) -> Option<Marker> {
    annotations.iter().find_map(Annotation::marker)
}

pub fn has_rule(annotations: &[Annotation]) -> bool {
    annotations.iter().any(Annotation::is_rule)
}

pub fn is_marked(annotations: &[Annotation]) -> bool {
    annotations.iter().any(Annotation::is_inclusion_marker)
}

pub fn is_excluded(annotations: &[Annotation]) -> bool {
    annotations.iter().any(|a| matches!(a, Annotation::Exclusive))
}

/// `(exception, message)` of the first `throw` marker, if any.
pub fn throw_overrides(annotations: &[Annotation]) -> (Option<&str>, Option<&str>) {
    annotations
        .iter()
        .find_map(|a| match a {
            Annotation::Throw { exception, message } => {
                Some((exception.as_deref(), message.as_deref()))
            }
            _ => None,
        })
        .unwrap_or((None, None))
}

impl TypeDecl {
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    pub fn find_method(&self, name: &str, arity: usize) -> Option<&MethodDecl> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.params.len() == arity)
    }
}

impl MethodDecl {
    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(&Modifier::Abstract) || self.body.is_none()
    }
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(&Modifier::Static)
    }
}

pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}
