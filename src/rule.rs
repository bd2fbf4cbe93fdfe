//! Rule model: what an annotated field or parameter asks for, validated
//! against its declared type.

use once_cell::sync::Lazy;
use ordered_float::OrderedFloat;
use regex::Regex;
use serde::Serialize;

use crate::error::RuleError;
use crate::ir::{Annotation, Marker, VarDecl};
use crate::regulation::Regulation;
use crate::typename::{NumericKind, SizeAccessor, TypeName};

static QUALIFIED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NumberBounds {
    pub kind: NumericKind,
    pub min: Option<OrderedFloat<f64>>,
    pub max: Option<OrderedFloat<f64>>,
    pub not_equal: Option<OrderedFloat<f64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SizeBounds {
    pub accessor: SizeAccessor,
    pub min: Option<u64>,
    pub max: Option<u64>,
}

/// Value checks, kept in annotation declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    Blank,
    Number(NumberBounds),
    Size(SizeBounds),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Rule {
    pub nullable: bool,
    /// Empty means "use the default message".
    pub message: String,
    pub exception: Option<String>,
    /// The element's own inclusion marker, if it carries one.
    pub marker: Option<Marker>,
    pub checks: Vec<Check>,
}

/// One rule-bearing field or parameter, ready for synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GuardSpec {
    pub field_name: String,
    pub field_type: TypeName,
    pub rule: Rule,
    pub is_primitive: bool,
}

impl Rule {
    /// The rule a marked method gives its unannotated parameters.
    pub fn implicit() -> Self {
        Rule { nullable: false, message: String::new(), exception: None, marker: None, checks: Vec::new() }
    }

    /// `Ok(None)` when none of `annotations` is a rule.
    pub fn compile(annotations: &[Annotation], ty: &TypeName) -> Result<Option<Rule>, RuleError> {
        let mut rule = Rule::implicit();
        let mut any = false;
        let mut not_null = false;

        for annotation in annotations {
            match annotation {
                Annotation::Exclusive => continue,
                Annotation::NotNull => {
                    if not_null {
                        return Err(RuleError::Duplicate("not_null"));
                    }
                    not_null = true;
                }
                Annotation::Nullable => {
                    if rule.nullable {
                        return Err(RuleError::Duplicate("nullable"));
                    }
                    rule.nullable = true;
                }
                Annotation::NotBlank => {
                    if !ty.is_text() {
                        return Err(unsupported("not_blank", ty));
                    }
                    rule.push_check(Check::Blank, "not_blank")?;
                }
                Annotation::NumberRule { min, max, not_equal } => {
                    let bounds = number_bounds(ty, *min, *max, *not_equal)?;
                    rule.push_check(Check::Number(bounds), "number_rule")?;
                }
                Annotation::SizeRule { min, max } => {
                    let bounds = size_bounds(ty, *min, *max)?;
                    rule.push_check(Check::Size(bounds), "size_rule")?;
                }
                Annotation::Throw { exception, message } => {
                    rule.set_marker(Marker::Throw)?;
                    if let Some(exception) = exception {
                        if !QUALIFIED_NAME.is_match(exception) {
                            return Err(RuleError::MalformedException(exception.clone()));
                        }
                        rule.exception = Some(exception.clone());
                    }
                    rule.message = message.clone().unwrap_or_default();
                }
                Annotation::Return { .. } => {
                    if let Some(marker) = annotation.marker() {
                        rule.set_marker(marker)?;
                    }
                }
            }
            any = true;
        }

        if not_null && rule.nullable {
            return Err(RuleError::ConflictingNullability);
        }
        Ok(any.then_some(rule))
    }

    fn set_marker(&mut self, marker: Marker) -> Result<(), RuleError> {
        match (&self.marker, &marker) {
            (None, _) => {
                self.marker = Some(marker);
                Ok(())
            }
            (Some(Marker::Throw), Marker::Throw) => Err(RuleError::Duplicate("throw")),
            (Some(Marker::Return { .. }), Marker::Return { .. }) => Err(RuleError::Duplicate("return")),
            _ => Err(RuleError::ConflictingMarkers),
        }
    }

    fn push_check(&mut self, check: Check, name: &'static str) -> Result<(), RuleError> {
        let duplicate = self
            .checks
            .iter()
            .any(|c| std::mem::discriminant(c) == std::mem::discriminant(&check));
        if duplicate {
            return Err(RuleError::Duplicate(name));
        }
        self.checks.push(check);
        Ok(())
    }

    pub fn uses_blank(&self) -> bool {
        self.checks.contains(&Check::Blank)
    }

    /// Regulations to run for this rule, in application order.
    ///
    /// The null check is applied last but prepends itself, so it still ends
    /// up first; the wrapper is applied last of all so it encloses the rest.
    pub fn regulations(&self, delegated: bool) -> Vec<Regulation> {
        let mut plan: Vec<Regulation> = self.checks.iter().map(Check::regulation).collect();
        if delegated {
            plan.push(Regulation::DelegatedInvalid);
        }
        plan.push(if self.nullable { Regulation::NotNullWrapper } else { Regulation::NullCheck });
        plan
    }
}

impl Check {
    fn regulation(&self) -> Regulation {
        match self {
            Check::Blank => Regulation::Blank,
            Check::Number(bounds) => Regulation::NumberRange(bounds.clone()),
            Check::Size(bounds) => Regulation::SizeRange(bounds.clone()),
        }
    }
}

impl GuardSpec {
    pub fn new(var: &VarDecl, field_type: TypeName, rule: Rule) -> Self {
        let is_primitive = field_type.is_primitive();
        GuardSpec { field_name: var.name.clone(), field_type, rule, is_primitive }
    }
}

fn unsupported(rule: &'static str, ty: &TypeName) -> RuleError {
    RuleError::UnsupportedType { rule, ty: ty.raw.clone() }
}

fn number_bounds(
    ty: &TypeName,
    min: Option<f64>,
    max: Option<f64>,
    not_equal: Option<f64>,
) -> Result<NumberBounds, RuleError> {
    const RULE: &str = "number_rule";
    let kind = ty.numeric_kind().ok_or_else(|| unsupported(RULE, ty))?;
    if min.is_none() && max.is_none() && not_equal.is_none() {
        return Err(RuleError::MissingBounds { rule: RULE });
    }
    for value in [min, max, not_equal].into_iter().flatten() {
        if !kind.holds(value) {
            return Err(RuleError::InvalidBound { rule: RULE, ty: ty.raw.clone(), value });
        }
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(RuleError::InvertedBounds { rule: RULE, min, max });
        }
    }
    Ok(NumberBounds {
        kind,
        min: min.map(OrderedFloat),
        max: max.map(OrderedFloat),
        not_equal: not_equal.map(OrderedFloat),
    })
}

fn size_bounds(ty: &TypeName, min: Option<i64>, max: Option<i64>) -> Result<SizeBounds, RuleError> {
    const RULE: &str = "size_rule";
    if ty.numeric_kind().is_some() {
        return Err(unsupported(RULE, ty));
    }
    if min.is_none() && max.is_none() {
        return Err(RuleError::MissingBounds { rule: RULE });
    }
    let to_size = |value: i64| {
        u64::try_from(value).map_err(|_| RuleError::InvalidBound {
            rule: RULE,
            ty: ty.raw.clone(),
            value: value as f64,
        })
    };
    let min = min.map(to_size).transpose()?;
    let max = max.map(to_size).transpose()?;
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(RuleError::InvertedBounds { rule: RULE, min: min as f64, max: max as f64 });
        }
    }
    Ok(SizeBounds { accessor: ty.size_accessor(), min, max })
}
