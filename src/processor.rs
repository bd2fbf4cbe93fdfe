//! One compilation round: plan, then helper, predicates and guards.

use serde::Serialize;

use crate::config::Options;
use crate::diag::{DiagnosticSink, method_element};
use crate::eligibility::{Eligibility, classify_all};
use crate::error::SynthError;
use crate::guard::GuardSynthesizer;
use crate::helper::ensure_blank_helper;
use crate::host::{MethodId, ProgramHost};
use crate::ir::Annotation;
use crate::predicate::PredicateSynthesizer;
use crate::registry::RuleRegistry;
use crate::resolve::TypeResolver;
use crate::typename::TypeName;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodPlan {
    pub id: MethodId,
    pub element: String,
    pub eligibility: Eligibility,
}

/// What a round would do, before anything is rewritten.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub methods: Vec<MethodPlan>,
    pub registry: RuleRegistry,
}

impl Plan {
    pub fn included(&self) -> impl Iterator<Item = &MethodPlan> {
        self.methods.iter().filter(|m| m.eligibility.is_included())
    }

    /// Whether anything in the round will call the blank helper.
    pub fn needs_blank_helper<H: ProgramHost + ?Sized>(&self, host: &H) -> bool {
        if self.registry.uses_blank() {
            return true;
        }
        self.included().filter_map(|m| host.method(m.id)).any(|method| {
            method.params.iter().any(|p| {
                !TypeName::parse(&p.ty).is_primitive()
                    && p.annotations.iter().any(|a| matches!(a, Annotation::NotBlank))
            })
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Types carrying the predicate after the round.
    pub predicates: Vec<String>,
    /// Methods whose bodies were rewritten.
    pub instrumented: Vec<String>,
    /// Class hosting the blank helper, if one was needed and installed.
    pub helper: Option<String>,
}

pub struct Processor<'a> {
    options: &'a Options,
}

impl<'a> Processor<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self { options }
    }

    pub fn plan<H: ProgramHost + ?Sized>(&self, host: &H, sink: &mut dyn DiagnosticSink) -> Plan {
        let _span = tracing::debug_span!("plan").entered();
        let methods = classify_all(host)
            .into_iter()
            .filter_map(|(id, eligibility)| {
                let ty = host.type_decl(id.ty)?;
                let method = host.method(id)?;
                let element = method_element(&ty.name, &method.name);
                if !eligibility.is_included() {
                    tracing::trace!(%element, ?eligibility, "method skipped");
                }
                Some(MethodPlan { id, element, eligibility })
            })
            .collect();
        let registry = RuleRegistry::build(host, host.external_predicates(), sink);
        Plan { methods, registry }
    }

    pub fn process<H: ProgramHost + ?Sized>(
        &self,
        host: &mut H,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Outcome, SynthError> {
        let _span = tracing::info_span!("round").entered();
        let plan = self.plan(host, sink);
        let needs_helper = plan.needs_blank_helper(host);
        let Plan { methods, mut registry } = plan;

        let helper = if needs_helper {
            ensure_blank_helper(host, self.options, sink)?
        } else {
            None
        };

        let predicates = PredicateSynthesizer::new(self.options, helper.as_deref())
            .synthesize_all(host, &mut registry, sink)?;

        let guards = GuardSynthesizer::new(self.options, &registry, helper.as_deref());
        let mut resolver = TypeResolver::new();
        let mut instrumented = Vec::new();
        for method in methods.iter().filter(|m| m.eligibility.is_included()) {
            if guards.apply(host, &mut resolver, method.id, sink)? {
                instrumented.push(method.element.clone());
            }
        }

        tracing::info!(
            predicates = predicates.len(),
            instrumented = instrumented.len(),
            lookups = resolver.lookups(),
            "round complete"
        );
        Ok(Outcome { predicates, instrumented, helper })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Diagnostics;
    use crate::ir::{MethodDecl, Modifier, Program, TypeDecl, TypeKind, VarDecl};
    use crate::tree::Stmt;

    fn var(name: &str, ty: &str, annotations: Vec<Annotation>) -> VarDecl {
        VarDecl { name: name.into(), ty: ty.into(), annotations }
    }

    fn method(name: &str, params: Vec<VarDecl>) -> MethodDecl {
        MethodDecl {
            name: name.into(),
            modifiers: vec![Modifier::Public],
            return_type: "void".into(),
            params,
            annotations: vec![],
            body: Some(vec![Stmt::Raw("work();".into())]),
            generated: false,
            instrumented: false,
        }
    }

    fn program() -> Program {
        Program {
            types: vec![TypeDecl {
                name: "a.Form".into(),
                kind: TypeKind::Class,
                public: true,
                nested: false,
                annotations: vec![],
                fields: vec![var("title", "String", vec![Annotation::NotBlank])],
                methods: vec![
                    method("submit", vec![var("form", "a.Form", vec![Annotation::NotNull])]),
                    method("reset", vec![var("count", "int", vec![])]),
                ],
            }],
            ..Program::default()
        }
    }

    #[test]
    fn plan_classifies_and_registers_without_mutating() {
        let program = program();
        let options = Options::default();
        let mut sink = Diagnostics::new();
        let plan = Processor::new(&options).plan(&program, &mut sink);
        assert_eq!(plan.included().count(), 1);
        assert_eq!(plan.methods[0].element, "a.Form.submit()");
        assert!(plan.registry.has_predicate("a.Form"));
        assert!(plan.needs_blank_helper(&program));
        assert_eq!(program.types[0].methods.len(), 2);
    }

    #[test]
    fn process_runs_every_phase() {
        let mut program = program();
        let options = Options::default();
        let mut sink = Diagnostics::new();
        let outcome = Processor::new(&options).process(&mut program, &mut sink).unwrap();
        assert!(sink.items().is_empty());
        assert_eq!(outcome.helper.as_deref(), Some("a.Form"));
        assert_eq!(outcome.predicates, vec!["a.Form"]);
        assert_eq!(outcome.instrumented, vec!["a.Form.submit()"]);

        let names: Vec<_> = program.types[0].methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["submit", "reset", "isBlank", "invalid0"]);
    }

    #[test]
    fn second_round_changes_nothing() {
        let mut program = program();
        let options = Options::default();
        let mut sink = Diagnostics::new();
        let processor = Processor::new(&options);
        processor.process(&mut program, &mut sink).unwrap();
        let once = program.clone();
        let outcome = processor.process(&mut program, &mut sink).unwrap();
        assert!(outcome.instrumented.is_empty());
        assert_eq!(program, once);
    }
}
