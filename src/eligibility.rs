//! Which methods are in scope for guard synthesis. Pure classification.

use serde::Serialize;

use crate::host::{MethodId, ProgramHost};
use crate::ir::{MethodDecl, TypeDecl, has_rule, is_excluded, is_marked};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Included {
    TypeMarked,
    MethodMarked,
    AnnotatedParameter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Excluded {
    Interface,
    Abstract,
    Exclusive,
    NoParameters,
    Generated,
    Instrumented,
    NoRuleAnnotations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    Included(Included),
    Excluded(Excluded),
}

impl Eligibility {
    pub fn is_included(self) -> bool {
        matches!(self, Eligibility::Included(_))
    }
}

pub fn classify_method(ty: &TypeDecl, method: &MethodDecl) -> Eligibility {
    use Eligibility::{Excluded as Out, Included as In};

    if ty.is_interface() {
        return Out(Excluded::Interface);
    }
    if method.is_abstract() {
        return Out(Excluded::Abstract);
    }
    if method.generated {
        return Out(Excluded::Generated);
    }
    if method.instrumented {
        return Out(Excluded::Instrumented);
    }
    if is_excluded(&ty.annotations) || is_excluded(&method.annotations) {
        return Out(Excluded::Exclusive);
    }
    if method.params.is_empty() {
        return Out(Excluded::NoParameters);
    }
    if is_marked(&ty.annotations) {
        return In(Included::TypeMarked);
    }
    if is_marked(&method.annotations) {
        return In(Included::MethodMarked);
    }
    if method.params.iter().any(|p| has_rule(&p.annotations)) {
        return In(Included::AnnotatedParameter);
    }
    Out(Excluded::NoRuleAnnotations)
}

/// Every method of every type, with its classification, in declaration order.
pub fn classify_all<H: ProgramHost + ?Sized>(host: &H) -> Vec<(MethodId, Eligibility)> {
    let mut out = Vec::new();
    for ty in host.type_ids() {
        let Some(decl) = host.type_decl(ty) else { continue };
        for id in host.method_ids(ty) {
            let Some(method) = host.method(id) else { continue };
            out.push((id, classify_method(decl, method)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Annotation, Modifier, TypeKind, VarDecl};
    use crate::tree::Stmt;

    fn param(annotations: Vec<Annotation>) -> VarDecl {
        VarDecl { name: "p".into(), ty: "String".into(), annotations }
    }

    fn method(params: Vec<VarDecl>) -> MethodDecl {
        MethodDecl {
            name: "run".into(),
            modifiers: vec![Modifier::Public],
            return_type: "void".into(),
            params,
            annotations: vec![],
            body: Some(vec![Stmt::Raw("work();".into())]),
            generated: false,
            instrumented: false,
        }
    }

    fn class(kind: TypeKind, annotations: Vec<Annotation>) -> TypeDecl {
        TypeDecl {
            name: "com.acme.Svc".into(),
            kind,
            public: true,
            nested: false,
            annotations,
            fields: vec![],
            methods: vec![],
        }
    }

    const MARK: Annotation = Annotation::Throw { exception: None, message: None };

    #[test]
    fn interface_and_abstract_methods_are_excluded() {
        let annotated = method(vec![param(vec![Annotation::NotNull])]);
        assert_eq!(
            classify_method(&class(TypeKind::Interface, vec![MARK]), &annotated),
            Eligibility::Excluded(Excluded::Interface)
        );
        let mut abstract_method = annotated.clone();
        abstract_method.modifiers.push(Modifier::Abstract);
        assert_eq!(
            classify_method(&class(TypeKind::Class, vec![MARK]), &abstract_method),
            Eligibility::Excluded(Excluded::Abstract)
        );
    }

    #[test]
    fn exclusion_marker_wins_over_inclusion() {
        let mut m = method(vec![param(vec![Annotation::NotNull])]);
        m.annotations = vec![MARK, Annotation::Exclusive];
        assert_eq!(
            classify_method(&class(TypeKind::Class, vec![]), &m),
            Eligibility::Excluded(Excluded::Exclusive)
        );
        assert_eq!(
            classify_method(&class(TypeKind::Class, vec![Annotation::Exclusive]), &method(vec![param(vec![MARK])])),
            Eligibility::Excluded(Excluded::Exclusive)
        );
    }

    #[test]
    fn inclusion_reasons() {
        let plain = method(vec![param(vec![])]);
        assert_eq!(
            classify_method(&class(TypeKind::Class, vec![MARK]), &plain),
            Eligibility::Included(Included::TypeMarked)
        );
        let mut marked = plain.clone();
        marked.annotations = vec![MARK];
        assert_eq!(
            classify_method(&class(TypeKind::Class, vec![]), &marked),
            Eligibility::Included(Included::MethodMarked)
        );
        assert_eq!(
            classify_method(&class(TypeKind::Class, vec![]), &method(vec![param(vec![Annotation::Nullable])])),
            Eligibility::Included(Included::AnnotatedParameter)
        );
        assert_eq!(
            classify_method(&class(TypeKind::Class, vec![]), &plain),
            Eligibility::Excluded(Excluded::NoRuleAnnotations)
        );
        assert_eq!(
            classify_method(&class(TypeKind::Class, vec![MARK]), &method(vec![])),
            Eligibility::Excluded(Excluded::NoParameters)
        );
    }

    #[test]
    fn return_marker_includes_like_throw() {
        let plain = method(vec![param(vec![])]);
        let returns = Annotation::Return { value: None };
        assert_eq!(
            classify_method(&class(TypeKind::Class, vec![returns.clone()]), &plain),
            Eligibility::Included(Included::TypeMarked)
        );
        let mut marked = plain.clone();
        marked.annotations = vec![returns.clone()];
        assert_eq!(
            classify_method(&class(TypeKind::Class, vec![]), &marked),
            Eligibility::Included(Included::MethodMarked)
        );
        assert_eq!(
            classify_method(&class(TypeKind::Class, vec![]), &method(vec![param(vec![returns])])),
            Eligibility::Included(Included::AnnotatedParameter)
        );
    }

    #[test]
    fn engine_output_is_never_reprocessed() {
        let mut m = method(vec![param(vec![Annotation::NotNull])]);
        m.instrumented = true;
        assert_eq!(
            classify_method(&class(TypeKind::Class, vec![]), &m),
            Eligibility::Excluded(Excluded::Instrumented)
        );
        m.generated = true;
        assert_eq!(
            classify_method(&class(TypeKind::Class, vec![]), &m),
            Eligibility::Excluded(Excluded::Generated)
        );
    }
}
