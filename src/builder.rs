//! Stateless tree-construction helpers.
//!
//! Every function returns a fresh fragment; nothing here validates names or
//! types. Rules are checked before they get this far.

use crate::tree::{BinOp, Expr, Stmt};

pub fn ident(name: &str) -> Expr {
    Expr::Ident(name.to_string())
}

pub fn this_field(name: &str) -> Expr {
    field(Expr::This, name)
}

pub fn field(target: Expr, name: &str) -> Expr {
    Expr::Field { target: Box::new(target), name: name.to_string() }
}

pub fn null() -> Expr {
    Expr::Null
}

pub fn str_lit(value: &str) -> Expr {
    Expr::Str(value.to_string())
}

pub fn number(literal: String) -> Expr {
    Expr::Number(literal)
}

pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
}

/// `subject == null`
pub fn is_null(subject: Expr) -> Expr {
    binary(BinOp::Eq, subject, null())
}

/// `subject != null`
pub fn not_null(subject: Expr) -> Expr {
    binary(BinOp::Ne, subject, null())
}

pub fn call(target: Expr, method: &str, args: Vec<Expr>) -> Expr {
    Expr::Call { target: Some(Box::new(target)), method: method.to_string(), args }
}

/// `Owner.method(args)`; `owner` is a (qualified) type name.
pub fn static_call(owner: &str, method: &str, args: Vec<Expr>) -> Expr {
    call(ident(owner), method, args)
}

/// `head.concat(tail)`
pub fn concat(head: Expr, tail: Expr) -> Expr {
    call(head, "concat", vec![tail])
}

pub fn assign(target: &str, value: Expr) -> Stmt {
    Stmt::Expr(Expr::Assign { target: Box::new(ident(target)), value: Box::new(value) })
}

pub fn local(ty: &str, name: &str, init: Option<Expr>) -> Stmt {
    Stmt::Local { ty: ty.to_string(), name: name.to_string(), init }
}

/// `throw new <exception>(<message>);`
pub fn throw(exception: &str, message: Expr) -> Stmt {
    Stmt::Throw(Expr::New { ty: exception.to_string(), args: vec![message] })
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::Return(Some(value))
}

pub fn if_then(cond: Expr, then: Stmt) -> Stmt {
    Stmt::If { cond, then: Box::new(then), otherwise: None }
}

pub fn block(stmts: Vec<Stmt>) -> Stmt {
    Stmt::Block(stmts)
}
