//! Engine options.
//!
//! Loaded once at startup (defaults → optional JSON file → `GUARD_SYNTH_*`
//! environment variables) and passed by reference from then on.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tree::Expr;
use crate::typename::TypeName;

pub const ENV_PREFIX: &str = "GUARD_SYNTH_";

static IDENT_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_$]+$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Exception thrown when no rule or marker names one.
    pub exception: String,
    /// Message head when no rule or marker supplies one.
    pub message: String,
    /// Between a field name and its detail, e.g. `name` + ` ` + `is null`.
    pub separator: String,
    pub null_info: String,
    pub blank_info: String,
    pub less_info: String,
    pub greater_info: String,
    pub equal_info: String,
    pub predicate_method: String,
    pub temp_variable: String,
    pub blank_helper: String,
    /// What `return`-marked guards give back from `boolean`, numeric and
    /// `char` methods. Host expression text.
    pub return_boolean: String,
    pub return_number: String,
    pub return_char: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            exception: "java.lang.IllegalArgumentException".to_string(),
            message: "invalid argument".to_string(),
            separator: " ".to_string(),
            null_info: "is null".to_string(),
            blank_info: "is blank".to_string(),
            less_info: "less than".to_string(),
            greater_info: "greater than".to_string(),
            equal_info: "cannot equal".to_string(),
            predicate_method: "invalid0".to_string(),
            temp_variable: "mvar_0".to_string(),
            blank_helper: "isBlank".to_string(),
            return_boolean: "false".to_string(),
            return_number: "0".to_string(),
            return_char: "'\\0'".to_string(),
        }
    }
}

impl Options {
    /// Defaults, then `path` (if any), then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let options = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(options.with_overrides(std::env::vars()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let options: Options = crate::input::from_str_with_path(&source)
            .map_err(|message| ConfigError::Parse { path: path.to_path_buf(), message })?;
        Ok(options.sanitized())
    }

    /// Applies `GUARD_SYNTH_<OPTION>` pairs; unrelated keys are ignored.
    pub fn with_overrides<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let Some(option) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.into();
            match option.to_ascii_lowercase().as_str() {
                "exception" => self.exception = value,
                "message" => self.message = value,
                "separator" => self.separator = value,
                "null_info" => self.null_info = value,
                "blank_info" => self.blank_info = value,
                "less_info" => self.less_info = value,
                "greater_info" => self.greater_info = value,
                "equal_info" => self.equal_info = value,
                "predicate_method" => self.predicate_method = value,
                "temp_variable" => self.temp_variable = value,
                "blank_helper" => self.blank_helper = value,
                "return_boolean" => self.return_boolean = value,
                "return_number" => self.return_number = value,
                "return_char" => self.return_char = value,
                other => tracing::debug!(option = other, "ignoring unknown option override"),
            }
        }
        self.sanitized()
    }

    /// Reverts identifier-like options that are not legal identifiers.
    fn sanitized(mut self) -> Self {
        let defaults = Options::default();
        sanitize_into(&mut self.predicate_method, defaults.predicate_method, "predicate_method");
        sanitize_into(&mut self.temp_variable, defaults.temp_variable, "temp_variable");
        sanitize_into(&mut self.blank_helper, defaults.blank_helper, "blank_helper");
        self
    }

    /// `" while attempting to access Foo.bar(), cuz "`
    pub fn method_context(&self, type_name: &str, method: &str) -> String {
        format!(" while attempting to access {type_name}.{method}(), cuz ")
    }

    /// Message head for a guard: the explicit message, or the default one.
    pub fn message_head(&self, explicit: &str, type_name: &str, method: &str) -> String {
        let head = if explicit.is_empty() { self.message.as_str() } else { explicit };
        format!("{head}{}", self.method_context(type_name, method))
    }

    /// Value a `return`-marked guard gives back from a method returning
    /// `ty`. `None` for `void`; reference types get `null`.
    pub fn default_return(&self, ty: &TypeName) -> Option<Expr> {
        if ty.is_void() {
            return None;
        }
        if !ty.is_primitive() {
            return Some(Expr::Null);
        }
        let text = match ty.base.as_str() {
            "boolean" => &self.return_boolean,
            "char" => &self.return_char,
            _ => &self.return_number,
        };
        Some(Expr::Raw(text.clone()))
    }

    /// `"<field><separator><info>"`
    pub fn detail(&self, subject: &str, info: &str) -> String {
        format!("{subject}{}{info}", self.separator)
    }
}

fn sanitize_into(slot: &mut String, default: String, option: &str) {
    match fix_identifier(slot) {
        Some(fixed) => *slot = fixed,
        None => {
            tracing::warn!(option, value = %slot, "not a legal identifier, using default");
            *slot = default;
        }
    }
}

/// Legal identifier for `name`, or `None` when it holds characters outside
/// `[A-Za-z0-9_$]`. A leading digit gets an underscore prefix.
pub fn fix_identifier(name: &str) -> Option<String> {
    if !IDENT_CHARS.is_match(name) {
        return None;
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        Some(format!("_{name}"))
    } else {
        Some(name.to_string())
    }
}
