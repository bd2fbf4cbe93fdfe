//! The regulation chain: one handler per check kind, each rewriting the
//! pending statement sequence of a single field or parameter.

use std::collections::VecDeque;

use serde::Serialize;

use crate::builder;
use crate::config::Options;
use crate::rule::{NumberBounds, SizeBounds};
use crate::tree::{BinOp, Expr, Stmt};
use crate::typename::SizeAccessor;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Regulation {
    NullCheck,
    NotNullWrapper,
    Blank,
    NumberRange(NumberBounds),
    SizeRange(SizeBounds),
    DelegatedInvalid,
}

/// Statements pending for one element. Owned by whoever is synthesizing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementSequence {
    stmts: VecDeque<Stmt>,
}

impl StatementSequence {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn prepend(&mut self, stmt: Stmt) {
        self.stmts.push_front(stmt);
    }
    pub fn append(&mut self, stmt: Stmt) {
        self.stmts.push_back(stmt);
    }
    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
    pub fn len(&self) -> usize {
        self.stmts.len()
    }
    pub fn into_vec(self) -> Vec<Stmt> {
        self.stmts.into()
    }
}

impl Extend<Stmt> for StatementSequence {
    fn extend<I: IntoIterator<Item = Stmt>>(&mut self, iter: I) {
        self.stmts.extend(iter);
    }
}

/// What a failed check does.
#[derive(Debug, Clone, Copy)]
pub enum Failure<'a> {
    /// `throw new <exception>("<head>".concat(<detail>));`
    Throw { exception: &'a str, head: &'a str },
    /// `return <value>;`, or `return;` in a void method. The detail is dropped.
    Return { value: Option<&'a Expr> },
    /// `return <detail>;` (inside a predicate method)
    Reason,
}

impl Failure<'_> {
    fn action(&self, detail: Expr) -> Stmt {
        match self {
            Failure::Throw { exception, head } => {
                builder::throw(exception, builder::concat(builder::str_lit(head), detail))
            }
            Failure::Return { value } => Stmt::Return(value.cloned()),
            Failure::Reason => builder::ret(detail),
        }
    }

    /// Detail for a failed delegated predicate whose reason sits in `temp`.
    fn delegated_detail(&self, field_name: &str, temp: Expr) -> Expr {
        match self {
            Failure::Throw { .. } | Failure::Return { .. } => temp,
            Failure::Reason => builder::concat(builder::str_lit(&format!("{field_name}.")), temp),
        }
    }
}

pub struct RegulationContext<'a> {
    pub options: &'a Options,
    pub failure: Failure<'a>,
    /// Class hosting the blank helper, when one was installed.
    pub blank_helper_owner: Option<&'a str>,
}

impl Regulation {
    /// Applies this regulation to `statements` for the element `field_name`,
    /// read through `subject`.
    pub fn handle(
        &self,
        cx: &RegulationContext<'_>,
        mut statements: StatementSequence,
        field_name: &str,
        subject: &Expr,
    ) -> StatementSequence {
        let options = cx.options;
        match self {
            Regulation::NullCheck => {
                let detail = builder::str_lit(&options.detail(field_name, &options.null_info));
                let check = builder::if_then(builder::is_null(subject.clone()), cx.failure.action(detail));
                // runs before anything that dereferences the subject
                statements.prepend(check);
            }
            Regulation::NotNullWrapper => {
                if statements.is_empty() {
                    return statements;
                }
                let body = builder::block(statements.into_vec());
                let mut wrapped = StatementSequence::new();
                wrapped.append(builder::if_then(builder::not_null(subject.clone()), body));
                return wrapped;
            }
            Regulation::Blank => {
                let Some(owner) = cx.blank_helper_owner else {
                    tracing::warn!(field = field_name, "no blank helper installed, check dropped");
                    return statements;
                };
                let cond = builder::static_call(owner, &options.blank_helper, vec![subject.clone()]);
                let detail = builder::str_lit(&options.detail(field_name, &options.blank_info));
                statements.append(builder::if_then(cond, cx.failure.action(detail)));
            }
            Regulation::NumberRange(bounds) => {
                statements.extend(number_checks(cx, bounds, field_name, subject));
            }
            Regulation::SizeRange(bounds) => {
                statements.extend(size_checks(cx, bounds, field_name, subject));
            }
            Regulation::DelegatedInvalid => {
                let temp = builder::ident(&options.temp_variable);
                let invoke = builder::call(subject.clone(), &options.predicate_method, Vec::new());
                statements.append(builder::assign(&options.temp_variable, invoke));
                let detail = cx.failure.delegated_detail(field_name, temp.clone());
                statements.append(builder::if_then(builder::not_null(temp), cx.failure.action(detail)));
            }
        }
        statements
    }
}

fn number_checks(
    cx: &RegulationContext<'_>,
    bounds: &NumberBounds,
    field_name: &str,
    subject: &Expr,
) -> Vec<Stmt> {
    let options = cx.options;
    let kind = bounds.kind;
    let limits = [
        (bounds.min, BinOp::Lt, &options.less_info),
        (bounds.max, BinOp::Gt, &options.greater_info),
        (bounds.not_equal, BinOp::Eq, &options.equal_info),
    ];
    limits
        .into_iter()
        .filter_map(|(limit, op, info)| {
            let value = limit?.into_inner();
            let cond = builder::binary(op, subject.clone(), builder::number(kind.literal(value)));
            let info = format!("{info} {}", kind.display(value));
            let detail = builder::str_lit(&options.detail(field_name, &info));
            Some(builder::if_then(cond, cx.failure.action(detail)))
        })
        .collect()
}

fn size_checks(
    cx: &RegulationContext<'_>,
    bounds: &SizeBounds,
    field_name: &str,
    subject: &Expr,
) -> Vec<Stmt> {
    let options = cx.options;
    let (size, shown) = match bounds.accessor {
        SizeAccessor::LengthCall => {
            (builder::call(subject.clone(), "length", Vec::new()), format!("{field_name}.length()"))
        }
        SizeAccessor::LengthField => (builder::field(subject.clone(), "length"), format!("{field_name}.length")),
        SizeAccessor::SizeCall => {
            (builder::call(subject.clone(), "size", Vec::new()), format!("{field_name}.size()"))
        }
    };
    let limits = [(bounds.min, BinOp::Lt, &options.less_info), (bounds.max, BinOp::Gt, &options.greater_info)];
    limits
        .into_iter()
        .filter_map(|(limit, op, info)| {
            let value = limit?;
            let cond = builder::binary(op, size.clone(), builder::number(value.to_string()));
            let detail = builder::str_lit(&options.detail(&shown, &format!("{info} {value}")));
            Some(builder::if_then(cond, cx.failure.action(detail)))
        })
        .collect()
}
