// Declared type names, normalized for registry lookups and rule checks.

use serde::Serialize;

const PRIMITIVES: &[&str] = &["boolean", "byte", "char", "short", "int", "long", "float", "double"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TypeName {
    pub raw: String,
    /// Generic arguments, whitespace and array suffixes stripped.
    pub base: String,
    pub dims: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericKind {
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
}

/// How a size bound reads the size of its subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeAccessor {
    LengthCall, // text.length()
    LengthField, // array.length
    SizeCall,   // collection.size()
}

impl TypeName {
    pub fn parse(raw: &str) -> Self {
        let mut compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

        let mut dims = 0;
        loop {
            if let Some(rest) = compact.strip_suffix("[]") {
                compact = rest.to_string();
            } else if let Some(rest) = compact.strip_suffix("...") {
                compact = rest.to_string();
            } else {
                break;
            }
            dims += 1;
        }

        let base = match compact.find('<') {
            Some(at) => compact[..at].to_string(),
            None => compact,
        };

        TypeName { raw: raw.trim().to_string(), base, dims }
    }

    pub fn simple_name(&self) -> &str {
        crate::ir::simple_name(&self.base)
    }

    pub fn is_array(&self) -> bool {
        self.dims > 0
    }

    pub fn is_void(&self) -> bool {
        !self.is_array() && self.base == "void"
    }

    pub fn is_primitive(&self) -> bool {
        !self.is_array() && PRIMITIVES.contains(&self.base.as_str())
    }

    pub fn is_text(&self) -> bool {
        !self.is_array() && self.lang_name().is_some_and(|n| n == "String" || n == "CharSequence")
    }

    pub fn numeric_kind(&self) -> Option<NumericKind> {
        if self.is_array() {
            return None;
        }
        Some(match self.lang_name()? {
            "Byte" => NumericKind::Byte,
            "Short" => NumericKind::Short,
            "Integer" => NumericKind::Integer,
            "Long" => NumericKind::Long,
            "Float" => NumericKind::Float,
            "Double" => NumericKind::Double,
            _ => return None,
        })
    }

    pub fn size_accessor(&self) -> SizeAccessor {
        if self.is_array() {
            SizeAccessor::LengthField
        } else if self.is_text() {
            SizeAccessor::LengthCall
        } else {
            SizeAccessor::SizeCall
        }
    }

    /// Name inside `java.lang`, when the type is written bare or fully qualified.
    fn lang_name(&self) -> Option<&str> {
        match self.base.strip_prefix("java.lang.") {
            Some(rest) => Some(rest),
            None if !self.base.contains('.') => Some(self.base.as_str()),
            None => None,
        }
    }
}

impl NumericKind {
    pub fn is_integral(self) -> bool {
        matches!(self, NumericKind::Byte | NumericKind::Short | NumericKind::Integer | NumericKind::Long)
    }

    /// Whether `value` can be written as a literal of this kind.
    pub fn holds(self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        let (lo, hi) = match self {
            NumericKind::Byte => (i8::MIN as f64, i8::MAX as f64),
            NumericKind::Short => (i16::MIN as f64, i16::MAX as f64),
            NumericKind::Integer => (i32::MIN as f64, i32::MAX as f64),
            NumericKind::Long => (i64::MIN as f64, i64::MAX as f64),
            NumericKind::Float => return value.abs() <= f32::MAX as f64,
            NumericKind::Double => return true,
        };
        // not `<= hi`: `i64::MAX as f64` rounds up to 2^63
        value.fract() == 0.0 && lo <= value && value < hi + 1.0
    }

    /// Literal in host syntax, e.g. `10L` for a `Long` bound.
    pub fn literal(self, value: f64) -> String {
        match self {
            NumericKind::Byte | NumericKind::Short | NumericKind::Integer => {
                format!("{}", value as i64)
            }
            NumericKind::Long => format!("{}L", value as i64),
            NumericKind::Float => format!("{value:?}F"),
            NumericKind::Double => format!("{value:?}"),
        }
    }

    /// Bound as it reads in a message.
    pub fn display(self, value: f64) -> String {
        if self.is_integral() {
            format!("{}", value as i64)
        } else {
            format!("{value}")
        }
    }
}
