use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Note,
    Warning,
    Error,
}

/// A message keyed to a source element, e.g. `com.acme.Foo.bar(o)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub element: String,
    pub message: String,
}

impl Diagnostic {
    pub fn note(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self { severity: Severity::Note, element: element.into(), message: message.into() }
    }
    pub fn warning(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, element: element.into(), message: message.into() }
    }
    pub fn error(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, element: element.into(), message: message.into() }
    }
}

/// Where the engine reports; reporting never stops processing.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Collects diagnostics and mirrors them to `tracing`.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }
    pub fn into_items(self) -> Vec<Diagnostic> {
        self.items
    }
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        let Diagnostic { severity, element, message } = &diagnostic;
        match severity {
            Severity::Note => tracing::info!(%element, "{message}"),
            Severity::Warning => tracing::warn!(%element, "{message}"),
            Severity::Error => tracing::error!(%element, "{message}"),
        }
        self.items.push(diagnostic);
    }
}

/// `Type.method(param)` style element key.
pub fn param_element(type_name: &str, method: &str, param: &str) -> String {
    format!("{type_name}.{method}({param})")
}

pub fn method_element(type_name: &str, method: &str) -> String {
    format!("{type_name}.{method}()")
}
