// Statement and expression trees spliced into method bodies.
//
// The engine only ever builds these; host statements it does not understand
// travel as `Stmt::Raw` and are never inspected.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Eq,
    Ne,
    Lt,
    Gt,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Ident(String),
    This,
    Null,
    Str(String),
    /// Numeric literal, already in host syntax (`10`, `10L`, `1.5F`).
    Number(String),
    Bool(bool),
    Field {
        target: Box<Expr>,
        name: String,
    },
    Call {
        #[serde(default)]
        target: Option<Box<Expr>>,
        method: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    New {
        #[serde(rename = "type")]
        ty: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// Host expression text from configuration, emitted verbatim.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    Local {
        #[serde(rename = "type")]
        ty: String,
        name: String,
        #[serde(default)]
        init: Option<Expr>,
    },
    Expr(Expr),
    If {
        cond: Expr,
        then: Box<Stmt>,
        #[serde(default)]
        otherwise: Option<Box<Stmt>>,
    },
    Throw(Expr),
    Return(Option<Expr>),
    Block(Vec<Stmt>),
    Raw(String),
}

impl Stmt {
    /// Statements of a block, or the statement itself.
    pub fn as_slice(&self) -> &[Stmt] {
        match self {
            Stmt::Block(stmts) => stmts,
            other => std::slice::from_ref(other),
        }
    }
}
