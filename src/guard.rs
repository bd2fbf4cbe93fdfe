//! Method guard synthesis: turns a method's parameter rules into a prologue
//! of guard clauses ahead of its original statements.

use crate::builder;
use crate::config::Options;
use crate::diag::{Diagnostic, DiagnosticSink, method_element, param_element};
use crate::error::{HostError, SynthError};
use crate::host::{MethodId, ProgramHost};
use crate::ir::{Marker, is_marked, marker, throw_overrides};
use crate::registry::RuleRegistry;
use crate::regulation::{Failure, RegulationContext, StatementSequence};
use crate::resolve::TypeResolver;
use crate::rule::Rule;
use crate::tree::{Expr, Stmt};
use crate::typename::TypeName;

/// What a violated guard on one parameter does.
enum OnViolation {
    Throw { exception: String, head: String },
    Return(Option<Expr>),
}

impl OnViolation {
    fn failure(&self) -> Failure<'_> {
        match self {
            OnViolation::Throw { exception, head } => Failure::Throw { exception, head },
            OnViolation::Return(value) => Failure::Return { value: value.as_ref() },
        }
    }
}

pub struct GuardSynthesizer<'a> {
    options: &'a Options,
    registry: &'a RuleRegistry,
    blank_helper_owner: Option<&'a str>,
}

impl<'a> GuardSynthesizer<'a> {
    pub fn new(options: &'a Options, registry: &'a RuleRegistry, blank_helper_owner: Option<&'a str>) -> Self {
        Self { options, registry, blank_helper_owner }
    }

    /// Rewrites the method's body in place. `Ok(false)` when no guard applied.
    pub fn apply<H: ProgramHost + ?Sized>(
        &self,
        host: &mut H,
        resolver: &mut TypeResolver,
        id: MethodId,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<bool, SynthError> {
        let Some(body) = self.synthesize(host, resolver, id, sink)? else {
            return Ok(false);
        };
        host.replace_body(id, body).map_err(|source| SynthError::Host {
            element: format!("method #{} of type #{}", id.index, id.ty.0),
            source,
        })?;
        Ok(true)
    }

    /// The new body: shared temp (if any delegated check), then one guard per
    /// qualifying parameter in declaration order, then the original statements.
    pub fn synthesize<H: ProgramHost + ?Sized>(
        &self,
        host: &H,
        resolver: &mut TypeResolver,
        id: MethodId,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Option<Vec<Stmt>>, SynthError> {
        let options = self.options;
        let ty = host.type_decl(id.ty).ok_or_else(|| SynthError::Host {
            element: format!("type #{}", id.ty.0),
            source: HostError::UnknownType(id.ty.0),
        })?;
        let method = host.method(id).ok_or_else(|| SynthError::Host {
            element: ty.name.clone(),
            source: HostError::UnknownMethod { ty: id.ty.0, index: id.index },
        })?;

        if method.params.iter().any(|p| p.name == options.temp_variable) {
            sink.report(Diagnostic::error(
                method_element(&ty.name, &method.name),
                format!("parameter shadows the shared temporary `{}`; method skipped", options.temp_variable),
            ));
            return Ok(None);
        }

        let marked = is_marked(&ty.annotations) || is_marked(&method.annotations);
        let (method_exception, method_message) = throw_overrides(&method.annotations);
        let (type_exception, type_message) = throw_overrides(&ty.annotations);
        let (method_marker, type_marker) = (marker(&method.annotations), marker(&ty.annotations));
        let return_type = TypeName::parse(&method.return_type);

        let mut prologue = Vec::new();
        let mut uses_temp = false;

        for param in &method.params {
            let element = param_element(&ty.name, &method.name, &param.name);
            let param_type = TypeName::parse(&param.ty);
            if param_type.is_primitive() {
                tracing::trace!(%element, "primitive parameter, no guard");
                continue;
            }

            let rule = match Rule::compile(&param.annotations, &param_type) {
                Ok(Some(rule)) => rule,
                Ok(None) if marked => Rule::implicit(),
                Ok(None) => continue,
                Err(err) => {
                    sink.report(Diagnostic::error(&element, format!("invalid rule: {err}; guard omitted")));
                    continue;
                }
            };

            if rule.uses_blank() && self.blank_helper_owner.is_none() {
                sink.report(Diagnostic::error(&element, "blank check has no helper to call; guard omitted"));
                continue;
            }

            let nearest = rule.marker.as_ref().or(method_marker.as_ref()).or(type_marker.as_ref());
            let on_violation = if let Some(Marker::Return { value }) = nearest {
                match value {
                    Some(_) if return_type.is_void() => {
                        sink.report(Diagnostic::error(&element, "`return` value on a void method; guard omitted"));
                        continue;
                    }
                    Some(text) => OnViolation::Return(Some(Expr::Raw(text.clone()))),
                    None => OnViolation::Return(options.default_return(&return_type)),
                }
            } else {
                let configured = rule.exception.as_deref().or(method_exception).or(type_exception);
                let Some(exception) = self.exception_for(host, resolver, &element, configured, sink) else {
                    continue;
                };
                let explicit = if rule.message.is_empty() {
                    method_message.or(type_message).unwrap_or("")
                } else {
                    rule.message.as_str()
                };
                let head = options.message_head(explicit, ty.simple_name(), &method.name);
                OnViolation::Throw { exception, head }
            };

            let delegated = self.registry.delegates_to(&param_type);
            if !delegated && !param_type.is_text() && resolver.resolve(host, &param_type.base).is_none() {
                tracing::debug!(%element, ty = %param_type.base, "type unknown to this round, no delegated check");
            }
            uses_temp |= delegated;

            let cx = RegulationContext {
                options,
                failure: on_violation.failure(),
                blank_helper_owner: self.blank_helper_owner,
            };
            let subject = builder::ident(&param.name);
            let mut seq = StatementSequence::new();
            for regulation in rule.regulations(delegated) {
                seq = regulation.handle(&cx, seq, &param.name, &subject);
            }
            tracing::debug!(%element, statements = seq.len(), delegated, "guard built");
            prologue.extend(seq.into_vec());
        }

        if prologue.is_empty() {
            return Ok(None);
        }

        let original = method.body.iter().flatten().cloned();
        let mut body = Vec::with_capacity(prologue.len() + 1);
        if uses_temp {
            body.push(builder::local("String", &options.temp_variable, Some(builder::null())));
        }
        body.extend(prologue);
        body.extend(original);
        Ok(Some(body))
    }

    /// Configured exception if it resolves, else the default; `None` (and an
    /// error) when not even the default resolves.
    fn exception_for<H: ProgramHost + ?Sized>(
        &self,
        host: &H,
        resolver: &mut TypeResolver,
        element: &str,
        configured: Option<&str>,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<String> {
        let default = self.options.exception.as_str();
        if let Some(name) = configured {
            if let Some(qualified) = resolver.resolve(host, name) {
                return Some(qualified);
            }
            sink.report(Diagnostic::warning(
                element,
                format!("cannot resolve exception `{name}`, using `{default}`"),
            ));
        }
        let resolved = resolver.resolve(host, default);
        if resolved.is_none() {
            sink.report(Diagnostic::error(
                element,
                format!("cannot resolve default exception `{default}`; guard omitted"),
            ));
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{Diagnostics, Severity};
    use crate::host::TypeId;
    use crate::ir::{Annotation, MethodDecl, Modifier, Program, TypeDecl, TypeKind, VarDecl};
    use crate::tree::{BinOp, Expr};

    fn param(name: &str, ty: &str, annotations: Vec<Annotation>) -> VarDecl {
        VarDecl { name: name.into(), ty: ty.into(), annotations }
    }

    fn program(params: Vec<VarDecl>, method_annotations: Vec<Annotation>) -> Program {
        Program {
            types: vec![TypeDecl {
                name: "com.acme.Foo".into(),
                kind: TypeKind::Class,
                public: true,
                nested: false,
                annotations: vec![],
                fields: vec![],
                methods: vec![MethodDecl {
                    name: "bar".into(),
                    modifiers: vec![Modifier::Public],
                    return_type: "void".into(),
                    params,
                    annotations: method_annotations,
                    body: Some(vec![Stmt::Raw("go();".into())]),
                    generated: false,
                    instrumented: false,
                }],
            }],
            ..Program::default()
        }
    }

    const BAR: MethodId = MethodId { ty: TypeId(0), index: 0 };

    fn synth(program: &Program, sink: &mut Diagnostics) -> Option<Vec<Stmt>> {
        let options = Options::default();
        let registry = RuleRegistry::new();
        let mut resolver = TypeResolver::new();
        GuardSynthesizer::new(&options, &registry, Some("com.acme.Foo"))
            .synthesize(program, &mut resolver, BAR, sink)
            .unwrap()
    }

    fn thrown(stmt: &Stmt) -> (&str, &Expr) {
        match stmt {
            Stmt::If { then, .. } => match then.as_ref() {
                Stmt::Throw(Expr::New { ty, args }) => (ty.as_str(), &args[0]),
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn explicit_message_and_exception_compose() {
        let p = program(
            vec![param("o", "Object", vec![Annotation::Throw {
                exception: Some("IllegalStateException".into()),
                message: Some("bad value".into()),
            }])],
            vec![],
        );
        let mut sink = Diagnostics::new();
        let body = synth(&p, &mut sink).unwrap();
        assert_eq!(body.len(), 2);
        let (exception, message) = thrown(&body[0]);
        assert_eq!(exception, "java.lang.IllegalStateException");
        assert_eq!(
            message,
            &builder::concat(
                builder::str_lit("bad value while attempting to access Foo.bar(), cuz "),
                builder::str_lit("o is null"),
            )
        );
        assert_eq!(body[1], Stmt::Raw("go();".into()));
    }

    #[test]
    fn primitives_and_unannotated_params_get_nothing() {
        let p = program(
            vec![
                param("n", "int", vec![Annotation::NotNull, Annotation::NumberRule { min: Some(1.0), max: None, not_equal: None }]),
                param("s", "String", vec![]),
            ],
            vec![],
        );
        let mut sink = Diagnostics::new();
        assert_eq!(synth(&p, &mut sink), None);
        assert!(sink.items().is_empty());
    }

    #[test]
    fn marked_method_guards_unannotated_params() {
        let p = program(
            vec![param("s", "String", vec![]), param("n", "long", vec![])],
            vec![Annotation::Throw { exception: None, message: None }],
        );
        let mut sink = Diagnostics::new();
        let body = synth(&p, &mut sink).unwrap();
        assert_eq!(body.len(), 2);
        match &body[0] {
            Stmt::If { cond: Expr::Binary { op: BinOp::Eq, lhs, .. }, .. } => {
                assert_eq!(lhs.as_ref(), &Expr::Ident("s".into()))
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(thrown(&body[0]).0, "java.lang.IllegalArgumentException");
    }

    #[test]
    fn unresolvable_exception_falls_back_with_warning() {
        let p = program(
            vec![param("s", "String", vec![Annotation::Throw { exception: Some("com.nope.Boom".into()), message: None }])],
            vec![],
        );
        let mut sink = Diagnostics::new();
        let body = synth(&p, &mut sink).unwrap();
        assert_eq!(thrown(&body[0]).0, "java.lang.IllegalArgumentException");
        assert_eq!(sink.items().len(), 1);
        assert_eq!(sink.items()[0].severity, Severity::Warning);
        assert_eq!(sink.items()[0].element, "com.acme.Foo.bar(s)");
    }

    #[test]
    fn malformed_rule_omits_only_that_guard() {
        let p = program(
            vec![
                param("a", "Integer", vec![Annotation::NotBlank]),
                param("b", "String", vec![Annotation::NotNull]),
            ],
            vec![],
        );
        let mut sink = Diagnostics::new();
        let body = synth(&p, &mut sink).unwrap();
        assert_eq!(body.len(), 2);
        assert!(sink.has_errors());
        assert_eq!(sink.items()[0].element, "com.acme.Foo.bar(a)");
    }

    #[test]
    fn shadowing_the_temporary_skips_the_method() {
        let p = program(vec![param("mvar_0", "String", vec![Annotation::NotNull])], vec![]);
        let mut sink = Diagnostics::new();
        assert_eq!(synth(&p, &mut sink), None);
        assert!(sink.has_errors());
    }

    #[test]
    fn return_marked_method_returns_the_type_default() {
        let mut p = program(vec![param("s", "String", vec![])], vec![Annotation::Return { value: None }]);
        p.types[0].methods[0].return_type = "boolean".into();
        let mut sink = Diagnostics::new();
        let body = synth(&p, &mut sink).unwrap();
        assert!(sink.items().is_empty());
        assert_eq!(body.len(), 2);
        match &body[0] {
            Stmt::If { cond, then, .. } => {
                assert_eq!(cond, &builder::is_null(builder::ident("s")));
                assert_eq!(then.as_ref(), &Stmt::Return(Some(Expr::Raw("false".into()))));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parameter_marker_beats_method_marker() {
        let mut p = program(
            vec![
                param("a", "String", vec![Annotation::Return { value: Some("\"?\"".into()) }]),
                param("b", "String", vec![Annotation::NotNull]),
            ],
            vec![Annotation::Throw { exception: None, message: None }],
        );
        p.types[0].methods[0].return_type = "String".into();
        let mut sink = Diagnostics::new();
        let body = synth(&p, &mut sink).unwrap();
        assert!(matches!(&body[0], Stmt::If { then, .. }
            if **then == Stmt::Return(Some(Expr::Raw("\"?\"".into())))));
        assert_eq!(thrown(&body[1]).0, "java.lang.IllegalArgumentException");
    }

    #[test]
    fn void_method_returns_bare_and_rejects_a_value() {
        let p = program(
            vec![
                param("a", "String", vec![Annotation::Return { value: None }]),
                param("b", "String", vec![Annotation::Return { value: Some("1".into()) }]),
            ],
            vec![],
        );
        let mut sink = Diagnostics::new();
        let body = synth(&p, &mut sink).unwrap();
        assert_eq!(body.len(), 2);
        assert!(matches!(&body[0], Stmt::If { then, .. } if **then == Stmt::Return(None)));
        assert_eq!(sink.items().len(), 1);
        assert_eq!(sink.items()[0].severity, Severity::Error);
        assert_eq!(sink.items()[0].element, "com.acme.Foo.bar(b)");
    }

    #[test]
    fn apply_marks_the_method_instrumented() {
        let mut p = program(vec![param("s", "String", vec![Annotation::NotNull])], vec![]);
        let options = Options::default();
        let registry = RuleRegistry::new();
        let mut resolver = TypeResolver::new();
        let mut sink = Diagnostics::new();
        let changed = GuardSynthesizer::new(&options, &registry, None)
            .apply(&mut p, &mut resolver, BAR, &mut sink)
            .unwrap();
        assert!(changed);
        assert!(p.types[0].methods[0].instrumented);
    }
}
