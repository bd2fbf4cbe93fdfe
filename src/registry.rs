//! Rule registry: which types expose the invalid-check predicate.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::diag::{Diagnostic, DiagnosticSink};
use crate::host::{ProgramHost, TypeId};
use crate::ir::{has_rule, simple_name};
use crate::rule::{GuardSpec, Rule};
use crate::typename::TypeName;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisteredType {
    pub type_id: TypeId,
    /// Rule-bearing fields in declaration order.
    pub fields: Vec<GuardSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleRegistry {
    types: IndexMap<String, RegisteredType>,
    #[serde(skip_serializing_if = "IndexSet::is_empty")]
    external: IndexSet<String>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One pass over every rule-bearing field of every non-interface type.
    pub fn build<H: ProgramHost + ?Sized>(
        host: &H,
        external: &[String],
        sink: &mut dyn DiagnosticSink,
    ) -> Self {
        let mut registry = RuleRegistry::new();
        for name in external {
            registry.external.insert(TypeName::parse(name).base);
        }

        for id in host.type_ids() {
            let Some(decl) = host.type_decl(id) else { continue };
            if decl.is_interface() {
                continue;
            }
            for field in decl.fields.iter().filter(|f| has_rule(&f.annotations)) {
                let field_type = TypeName::parse(&field.ty);
                if field_type.is_primitive() {
                    tracing::trace!(ty = %decl.name, field = %field.name, "primitive field, not registered");
                    continue;
                }
                match Rule::compile(&field.annotations, &field_type) {
                    Ok(Some(rule)) => {
                        registry.register(&decl.name, id, GuardSpec::new(field, field_type, rule));
                    }
                    Ok(None) => {}
                    Err(err) => sink.report(Diagnostic::error(
                        format!("{}.{}", decl.name, field.name),
                        format!("invalid rule: {err}"),
                    )),
                }
            }
        }

        tracing::debug!(types = registry.types.len(), "rule registry built");
        registry
    }

    pub fn register(&mut self, type_name: &str, type_id: TypeId, guard: GuardSpec) {
        let key = TypeName::parse(type_name).base;
        self.types
            .entry(key)
            .or_insert_with(|| RegisteredType { type_id, fields: Vec::new() })
            .fields
            .push(guard);
    }

    pub fn deregister(&mut self, type_name: &str) -> Option<RegisteredType> {
        self.types.shift_remove(type_name)
    }

    /// Whether `type_name` (qualified or simple, generics allowed) exposes
    /// the predicate.
    pub fn has_predicate(&self, type_name: &str) -> bool {
        self.lookup(type_name).is_some()
    }

    /// Whether a value declared as `ty` can be asked for its predicate. An
    /// array or varargs of a registered type cannot.
    pub fn delegates_to(&self, ty: &TypeName) -> bool {
        !ty.is_array() && self.has_predicate(&ty.base)
    }

    /// Registered (or external) qualified name matching `type_name`.
    pub fn lookup(&self, type_name: &str) -> Option<&str> {
        let base = TypeName::parse(type_name).base;
        let mut known = self.types.keys().chain(self.external.iter());
        if base.contains('.') {
            return known.find(|k| **k == base).map(String::as_str);
        }
        let mut hits = known.filter(|k| simple_name(k) == base);
        let first = hits.next()?;
        match hits.next() {
            Some(_) => None,
            None => Some(first.as_str()),
        }
    }

    pub fn get(&self, type_name: &str) -> Option<&RegisteredType> {
        self.types.get(type_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegisteredType)> {
        self.types.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn uses_blank(&self) -> bool {
        self.types.values().flat_map(|t| &t.fields).any(|g| g.rule.uses_blank())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{Diagnostics, Severity};
    use crate::ir::{Annotation, Program, TypeDecl, TypeKind, VarDecl};

    fn field(name: &str, ty: &str, annotations: Vec<Annotation>) -> VarDecl {
        VarDecl { name: name.into(), ty: ty.into(), annotations }
    }

    fn class(name: &str, kind: TypeKind, fields: Vec<VarDecl>) -> TypeDecl {
        TypeDecl {
            name: name.into(),
            kind,
            public: true,
            nested: false,
            annotations: vec![],
            fields,
            methods: vec![],
        }
    }

    fn program() -> Program {
        Program {
            types: vec![
                class(
                    "com.acme.Order",
                    TypeKind::Class,
                    vec![
                        field("id", "Long", vec![Annotation::NotNull]),
                        field("count", "int", vec![Annotation::NumberRule { min: Some(1.0), max: None, not_equal: None }]),
                        field("note", "String", vec![]),
                        field("code", "String", vec![Annotation::NotBlank]),
                    ],
                ),
                class("com.acme.Plain", TypeKind::Class, vec![field("x", "String", vec![])]),
                class("com.acme.Shape", TypeKind::Interface, vec![field("x", "String", vec![Annotation::NotNull])]),
                class("com.acme.Broken", TypeKind::Class, vec![field("n", "Integer", vec![Annotation::NotBlank])]),
            ],
            ..Program::default()
        }
    }

    #[test]
    fn registers_types_with_rule_bearing_fields_only() {
        let mut sink = Diagnostics::new();
        let registry = RuleRegistry::build(&program(), &[], &mut sink);
        assert_eq!(registry.type_names().collect::<Vec<_>>(), vec!["com.acme.Order"]);
        let order = registry.get("com.acme.Order").unwrap();
        let names: Vec<_> = order.fields.iter().map(|g| g.field_name.as_str()).collect();
        assert_eq!(names, vec!["id", "code"]);
        assert!(registry.uses_blank());
    }

    #[test]
    fn malformed_field_rules_are_reported() {
        let mut sink = Diagnostics::new();
        let registry = RuleRegistry::build(&program(), &[], &mut sink);
        assert!(!registry.has_predicate("com.acme.Broken"));
        assert_eq!(sink.items().len(), 1);
        assert_eq!(sink.items()[0].severity, Severity::Error);
        assert_eq!(sink.items()[0].element, "com.acme.Broken.n");
    }

    #[test]
    fn lookup_normalizes_names() {
        let mut sink = Diagnostics::new();
        let registry = RuleRegistry::build(&program(), &["lib.Money".to_string()], &mut sink);
        assert!(registry.has_predicate("com.acme.Order"));
        assert!(registry.has_predicate("Order"));
        assert!(registry.has_predicate("com.acme.Order<T>"));
        assert!(registry.has_predicate("Money"));
        assert!(!registry.has_predicate("com.acme.Plain"));
        assert!(!registry.has_predicate("other.Order"));
    }

    #[test]
    fn arrays_of_registered_types_do_not_delegate() {
        let mut sink = Diagnostics::new();
        let registry = RuleRegistry::build(&program(), &[], &mut sink);
        assert!(registry.delegates_to(&TypeName::parse("Order")));
        assert!(!registry.delegates_to(&TypeName::parse("Order[]")));
        assert!(!registry.delegates_to(&TypeName::parse("com.acme.Order...")));
        assert!(!registry.delegates_to(&TypeName::parse("Plain")));
    }

    #[test]
    fn deregistered_types_lose_their_predicate() {
        let mut sink = Diagnostics::new();
        let mut registry = RuleRegistry::build(&program(), &[], &mut sink);
        assert!(registry.deregister("com.acme.Order").is_some());
        assert!(!registry.has_predicate("Order"));
        assert!(registry.is_empty());
    }
}
