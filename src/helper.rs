//! Installs the static blank-string helper that blank checks call.

use crate::builder;
use crate::config::Options;
use crate::diag::{Diagnostic, DiagnosticSink};
use crate::error::SynthError;
use crate::host::{ProgramHost, TypeId};
use crate::ir::{MethodDecl, Modifier, TypeKind, VarDecl};

/// Ensures the helper exists on the first public top-level class and
/// returns that class's name. `Ok(None)` (with an error reported) when the
/// round has no such class.
pub fn ensure_blank_helper<H: ProgramHost + ?Sized>(
    host: &mut H,
    options: &Options,
    sink: &mut dyn DiagnosticSink,
) -> Result<Option<String>, SynthError> {
    let Some((id, owner)) = find_host_class(host) else {
        sink.report(Diagnostic::error("<round>", "cannot find any public class to host the blank helper"));
        return Ok(None);
    };

    let existing = host
        .type_decl(id)
        .and_then(|t| t.find_method(&options.blank_helper, 1))
        .map(|m| m.generated);
    match existing {
        Some(true) => return Ok(Some(owner)),
        Some(false) => {
            sink.report(Diagnostic::error(
                format!("{owner}.{}", options.blank_helper),
                "a method with the blank helper's name already exists",
            ));
            return Ok(None);
        }
        None => {}
    }

    host.add_method(id, blank_helper(options))
        .map_err(|source| SynthError::Host { element: owner.clone(), source })?;
    tracing::debug!(owner = %owner, helper = %options.blank_helper, "blank helper installed");
    Ok(Some(owner))
}

fn find_host_class<H: ProgramHost + ?Sized>(host: &H) -> Option<(TypeId, String)> {
    host.type_ids().into_iter().find_map(|id| {
        let decl = host.type_decl(id)?;
        (decl.kind == TypeKind::Class && decl.public && !decl.nested).then(|| (id, decl.name.clone()))
    })
}

/// `public static boolean isBlank(CharSequence s)`
fn blank_helper(options: &Options) -> MethodDecl {
    let s = || builder::ident("s");
    let trimmed_empty = builder::call(
        builder::call(builder::call(s(), "toString", vec![]), "trim", vec![]),
        "isEmpty",
        vec![],
    );
    MethodDecl {
        name: options.blank_helper.clone(),
        modifiers: vec![Modifier::Public, Modifier::Static],
        return_type: "boolean".to_string(),
        params: vec![VarDecl { name: "s".to_string(), ty: "CharSequence".to_string(), annotations: vec![] }],
        annotations: vec![],
        body: Some(vec![
            builder::if_then(builder::is_null(s()), builder::ret(crate::tree::Expr::Bool(true))),
            builder::ret(trimmed_empty),
        ]),
        generated: true,
        instrumented: false,
    }
}
