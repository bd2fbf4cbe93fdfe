//! Composite predicate synthesis: one `String <predicate>()` per registered
//! type, returning `null` when valid or the first failing field's reason.

use crate::builder;
use crate::config::Options;
use crate::diag::{Diagnostic, DiagnosticSink};
use crate::error::SynthError;
use crate::host::ProgramHost;
use crate::ir::{MethodDecl, Modifier};
use crate::registry::{RegisteredType, RuleRegistry};
use crate::regulation::{Failure, RegulationContext, StatementSequence};
use crate::tree::Stmt;

pub struct PredicateSynthesizer<'a> {
    options: &'a Options,
    blank_helper_owner: Option<&'a str>,
}

impl<'a> PredicateSynthesizer<'a> {
    pub fn new(options: &'a Options, blank_helper_owner: Option<&'a str>) -> Self {
        Self { options, blank_helper_owner }
    }

    /// Adds a predicate to every registered type. Types that cannot get one
    /// are reported and dropped from `registry`, so no caller delegates to
    /// a method that does not exist. Returns the types that now carry one.
    pub fn synthesize_all<H: ProgramHost + ?Sized>(
        &self,
        host: &mut H,
        registry: &mut RuleRegistry,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Vec<String>, SynthError> {
        let predicate = self.options.predicate_method.as_str();

        // settle clashes first: no predicate may delegate to a rejected type
        let mut rejected = Vec::new();
        for (name, registered) in registry.iter() {
            if self.existing(host, registered) == Some(false) {
                sink.report(Diagnostic::error(
                    format!("{name}.{predicate}()"),
                    "type already declares a method with the predicate's name",
                ));
                rejected.push(name.to_string());
            }
        }
        for name in &rejected {
            registry.deregister(name);
        }

        let mut done = Vec::new();
        for (name, registered) in registry.iter() {
            if self.existing(host, registered).is_some() {
                sink.report(Diagnostic::note(format!("{name}.{predicate}()"), "predicate already present, kept"));
            } else {
                let method = self.predicate_method(name, registered, registry, sink);
                host.add_method(registered.type_id, method)
                    .map_err(|source| SynthError::Host { element: name.to_string(), source })?;
                tracing::debug!(ty = name, fields = registered.fields.len(), "predicate synthesized");
            }
            done.push(name.to_string());
        }
        Ok(done)
    }

    /// `Some(generated)` when the type already has a method with the predicate's name.
    fn existing<H: ProgramHost + ?Sized>(&self, host: &H, registered: &RegisteredType) -> Option<bool> {
        host.type_decl(registered.type_id)
            .and_then(|t| t.find_method(&self.options.predicate_method, 0))
            .map(|m| m.generated)
    }

    fn predicate_method(
        &self,
        type_name: &str,
        registered: &RegisteredType,
        registry: &RuleRegistry,
        sink: &mut dyn DiagnosticSink,
    ) -> MethodDecl {
        let cx = RegulationContext {
            options: self.options,
            failure: Failure::Reason,
            blank_helper_owner: self.blank_helper_owner,
        };

        let mut body = Vec::new();
        let mut uses_temp = false;
        for guard in &registered.fields {
            if guard.rule.uses_blank() && self.blank_helper_owner.is_none() {
                sink.report(Diagnostic::error(
                    format!("{type_name}.{}", guard.field_name),
                    "blank check has no helper to call; field check omitted",
                ));
                continue;
            }
            let delegated = registry.delegates_to(&guard.field_type);
            uses_temp |= delegated;
            let subject = builder::this_field(&guard.field_name);
            let mut seq = StatementSequence::new();
            for regulation in guard.rule.regulations(delegated) {
                seq = regulation.handle(&cx, seq, &guard.field_name, &subject);
            }
            body.extend(seq.into_vec());
        }
        if uses_temp {
            body.insert(0, builder::local("String", &self.options.temp_variable, Some(builder::null())));
        }
        body.push(Stmt::Return(Some(builder::null())));

        MethodDecl {
            name: self.options.predicate_method.clone(),
            modifiers: vec![Modifier::Public],
            return_type: "String".to_string(),
            params: Vec::new(),
            annotations: Vec::new(),
            body: Some(body),
            generated: true,
            instrumented: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Diagnostics;
    use crate::ir::{Annotation, Program, TypeDecl, TypeKind, VarDecl};
    use crate::tree::Expr;

    fn field(name: &str, ty: &str, annotations: Vec<Annotation>) -> VarDecl {
        VarDecl { name: name.into(), ty: ty.into(), annotations }
    }

    fn class(name: &str, fields: Vec<VarDecl>) -> TypeDecl {
        TypeDecl {
            name: name.into(),
            kind: TypeKind::Class,
            public: true,
            nested: false,
            annotations: vec![],
            fields,
            methods: vec![],
        }
    }

    fn run(program: &mut Program) -> (RuleRegistry, Diagnostics, Vec<String>) {
        let options = Options::default();
        let mut sink = Diagnostics::new();
        let mut registry = RuleRegistry::build(program, &[], &mut sink);
        let done = PredicateSynthesizer::new(&options, None)
            .synthesize_all(program, &mut registry, &mut sink)
            .unwrap();
        (registry, sink, done)
    }

    #[test]
    fn predicate_returns_first_failure_then_null() {
        let mut program = Program {
            types: vec![class(
                "a.Range",
                vec![
                    field("a", "String", vec![Annotation::Nullable]),
                    field("b", "Integer", vec![Annotation::NumberRule { min: Some(0.0), max: Some(9.0), not_equal: None }]),
                ],
            )],
            ..Program::default()
        };
        let (_, sink, done) = run(&mut program);
        assert!(sink.items().is_empty());
        assert_eq!(done, vec!["a.Range"]);

        let method = &program.types[0].methods[0];
        assert_eq!(method.name, "invalid0");
        assert!(method.generated);
        let body = method.body.as_ref().unwrap();
        // nullable `a` with no other checks contributes nothing
        assert_eq!(body.len(), 4);
        assert!(matches!(&body[0], Stmt::If { then, .. }
            if **then == Stmt::Return(Some(Expr::Str("b is null".into())))));
        assert!(matches!(&body[1], Stmt::If { then, .. }
            if **then == Stmt::Return(Some(Expr::Str("b less than 0".into())))));
        assert!(matches!(&body[2], Stmt::If { then, .. }
            if **then == Stmt::Return(Some(Expr::Str("b greater than 9".into())))));
        assert_eq!(body[3], Stmt::Return(Some(Expr::Null)));
    }

    #[test]
    fn nested_registered_fields_delegate() {
        let mut program = Program {
            types: vec![
                class("a.Line", vec![field("item", "a.Item", vec![Annotation::NotNull])]),
                class("a.Item", vec![field("sku", "String", vec![Annotation::NotNull])]),
            ],
            ..Program::default()
        };
        run(&mut program);
        let body = program.types[0].methods[0].body.as_ref().unwrap();
        assert_eq!(body[0], builder::local("String", "mvar_0", Some(Expr::Null)));
        assert!(matches!(&body[1], Stmt::If { cond: Expr::Binary { .. }, .. }));
        assert_eq!(
            body[2],
            builder::assign("mvar_0", builder::call(builder::this_field("item"), "invalid0", vec![]))
        );
        assert_eq!(body.last(), Some(&Stmt::Return(Some(Expr::Null))));
    }

    #[test]
    fn array_fields_of_registered_types_are_only_null_checked() {
        let mut program = Program {
            types: vec![
                class("a.Tree", vec![field("kids", "a.Node[]", vec![Annotation::NotNull])]),
                class("a.Node", vec![field("label", "String", vec![Annotation::NotNull])]),
            ],
            ..Program::default()
        };
        let (_, sink, _) = run(&mut program);
        assert!(sink.items().is_empty());
        let body = program.types[0].methods[0].body.as_ref().unwrap();
        assert_eq!(body.len(), 2);
        assert!(matches!(&body[0], Stmt::If { then, .. }
            if **then == Stmt::Return(Some(Expr::Str("kids is null".into())))));
        assert_eq!(body[1], Stmt::Return(Some(Expr::Null)));
    }

    #[test]
    fn blank_fields_without_a_helper_are_reported_and_skipped() {
        let mut program = Program {
            types: vec![class(
                "a.Form",
                vec![
                    field("title", "String", vec![Annotation::NotBlank]),
                    field("owner", "String", vec![Annotation::NotNull]),
                ],
            )],
            ..Program::default()
        };
        let (_, sink, done) = run(&mut program);
        assert_eq!(done, vec!["a.Form"]);
        assert_eq!(sink.items().len(), 1);
        assert_eq!(sink.items()[0].element, "a.Form.title");
        assert!(sink.has_errors());
        let body = program.types[0].methods[0].body.as_ref().unwrap();
        assert_eq!(body.len(), 2);
        assert!(matches!(&body[0], Stmt::If { then, .. }
            if **then == Stmt::Return(Some(Expr::Str("owner is null".into())))));
    }

    #[test]
    fn existing_generated_predicate_is_kept_with_a_note() {
        let mut program = Program {
            types: vec![class("a.Tag", vec![field("name", "String", vec![Annotation::NotNull])])],
            ..Program::default()
        };
        run(&mut program);
        let first = program.clone();
        let (_, sink, done) = run(&mut program);
        assert_eq!(done, vec!["a.Tag"]);
        assert_eq!(program, first);
        assert_eq!(sink.items().len(), 1);
        assert_eq!(sink.items()[0].severity, crate::diag::Severity::Note);
        assert_eq!(sink.items()[0].element, "a.Tag.invalid0()");
    }

    #[test]
    fn user_method_with_predicate_name_deregisters_the_type() {
        let mut clash = class("a.Clash", vec![field("x", "String", vec![Annotation::NotNull])]);
        clash.methods.push(MethodDecl {
            name: "invalid0".into(),
            modifiers: vec![Modifier::Public],
            return_type: "String".into(),
            params: vec![],
            annotations: vec![],
            body: Some(vec![]),
            generated: false,
            instrumented: false,
        });
        let mut program = Program { types: vec![clash], ..Program::default() };
        let (registry, sink, done) = run(&mut program);
        assert!(done.is_empty());
        assert!(!registry.has_predicate("a.Clash"));
        assert!(sink.has_errors());
        assert_eq!(program.types[0].methods.len(), 1);
    }
}
