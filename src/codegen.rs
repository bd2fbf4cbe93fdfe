//! Renders a program as Java-like source, for review and golden tests.
use std::fmt::Write as _;

use crate::ir::{Annotation, MethodDecl, Modifier, Program, TypeDecl, TypeKind, VarDecl};
use crate::tree::{Expr, Stmt};

const INDENT: &str = "    ";

pub struct Codegen {
    out: String,
    depth: usize,
}

impl Default for Codegen {
    fn default() -> Self {
        Self::new()
    }
}

impl Codegen {
    pub fn new() -> Self {
        Self { out: String::new(), depth: 0 }
    }

    pub fn into_string(self) -> String {
        self.out
    }

    pub fn emit(&mut self, program: &Program) {
        for (i, ty) in program.types.iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.emit_type(ty);
        }
    }

    pub fn emit_type(&mut self, ty: &TypeDecl) {
        self.line(&format!("// {}", ty.name));
        for annotation in &ty.annotations {
            self.line(&annotation_src(annotation));
        }
        let mut header = String::new();
        if ty.public {
            header.push_str("public ");
        }
        if ty.nested {
            header.push_str("static ");
        }
        header.push_str(match ty.kind {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Enum => "enum",
        });
        let _ = write!(header, " {} {{", ty.simple_name());
        self.line(&header);
        self.depth += 1;

        for field in &ty.fields {
            self.line(&format!("{};", var_src(field)));
        }
        for method in &ty.methods {
            self.out.push('\n');
            self.emit_method(method);
        }

        self.depth -= 1;
        self.line("}");
    }

    fn emit_method(&mut self, method: &MethodDecl) {
        for annotation in &method.annotations {
            self.line(&annotation_src(annotation));
        }
        let mut signature = String::new();
        for modifier in &method.modifiers {
            signature.push_str(modifier_src(*modifier));
            signature.push(' ');
        }
        let params: Vec<String> = method.params.iter().map(var_src).collect();
        let _ = write!(signature, "{} {}({})", method.return_type, method.name, params.join(", "));

        let Some(body) = &method.body else {
            signature.push(';');
            self.line(&signature);
            return;
        };
        signature.push_str(" {");
        self.line(&signature);
        self.depth += 1;
        for stmt in body {
            self.emit_stmt(stmt);
        }
        self.depth -= 1;
        self.line("}");
    }

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Local { ty, name, init } => match init {
                Some(init) => self.line(&format!("{ty} {name} = {};", expr_src(init))),
                None => self.line(&format!("{ty} {name};")),
            },
            Stmt::Expr(expr) => self.line(&format!("{};", expr_src(expr))),
            Stmt::If { cond, then, otherwise } => {
                self.line(&format!("if ({}) {{", expr_src(cond)));
                self.emit_nested(then);
                if let Some(otherwise) = otherwise {
                    self.line("} else {");
                    self.emit_nested(otherwise);
                }
                self.line("}");
            }
            Stmt::Throw(expr) => self.line(&format!("throw {};", expr_src(expr))),
            Stmt::Return(None) => self.line("return;"),
            Stmt::Return(Some(expr)) => self.line(&format!("return {};", expr_src(expr))),
            Stmt::Block(stmts) => {
                self.line("{");
                self.depth += 1;
                for stmt in stmts {
                    self.emit_stmt(stmt);
                }
                self.depth -= 1;
                self.line("}");
            }
            Stmt::Raw(text) => {
                for line in text.lines() {
                    self.line(line.trim_end());
                }
            }
        }
    }

    /// Body of an `if` arm; a block arm is inlined into the braces.
    fn emit_nested(&mut self, stmt: &Stmt) {
        self.depth += 1;
        for inner in stmt.as_slice() {
            self.emit_stmt(inner);
        }
        self.depth -= 1;
    }

    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }
}

pub fn expr_src(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::This => "this".to_string(),
        Expr::Null => "null".to_string(),
        Expr::Str(value) => string_literal(value),
        Expr::Number(value) => value.clone(),
        Expr::Bool(value) => value.to_string(),
        Expr::Field { target, name } => format!("{}.{name}", operand_src(target)),
        Expr::Call { target, method, args } => {
            let args: Vec<String> = args.iter().map(expr_src).collect();
            match target {
                Some(target) => format!("{}.{method}({})", operand_src(target), args.join(", ")),
                None => format!("{method}({})", args.join(", ")),
            }
        }
        Expr::New { ty, args } => {
            let args: Vec<String> = args.iter().map(expr_src).collect();
            format!("new {ty}({})", args.join(", "))
        }
        Expr::Binary { op, lhs, rhs } => {
            format!("{} {} {}", operand_src(lhs), op.symbol(), operand_src(rhs))
        }
        Expr::Assign { target, value } => format!("{} = {}", expr_src(target), expr_src(value)),
        Expr::Raw(text) => text.clone(),
    }
}

/// Parenthesized when it would otherwise bind wrongly as a receiver or operand.
fn operand_src(expr: &Expr) -> String {
    match expr {
        Expr::Binary { .. } | Expr::Assign { .. } | Expr::Raw(_) => format!("({})", expr_src(expr)),
        _ => expr_src(expr),
    }
}

pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn var_src(var: &VarDecl) -> String {
    let mut out = String::new();
    for annotation in &var.annotations {
        out.push_str(&annotation_src(annotation));
        out.push(' ');
    }
    let _ = write!(out, "{} {}", var.ty, var.name);
    out
}

fn modifier_src(modifier: Modifier) -> &'static str {
    match modifier {
        Modifier::Public => "public",
        Modifier::Protected => "protected",
        Modifier::Private => "private",
        Modifier::Static => "static",
        Modifier::Final => "final",
        Modifier::Abstract => "abstract",
    }
}

fn annotation_src(annotation: &Annotation) -> String {
    fn args(pairs: Vec<(&str, String)>) -> String {
        if pairs.is_empty() {
            return String::new();
        }
        let inner: Vec<String> = pairs.into_iter().map(|(k, v)| format!("{k} = {v}")).collect();
        format!("({})", inner.join(", "))
    }

    match annotation {
        Annotation::NotNull => "@NotNull".to_string(),
        Annotation::Nullable => "@Nullable".to_string(),
        Annotation::NotBlank => "@NotBlank".to_string(),
        Annotation::Exclusive => "@Exclusive".to_string(),
        Annotation::NumberRule { min, max, not_equal } => {
            let pairs = [("min", min), ("max", max), ("notEqual", not_equal)]
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v.to_string())))
                .collect();
            format!("@NumberRule{}", args(pairs))
        }
        Annotation::SizeRule { min, max } => {
            let pairs = [("min", min), ("max", max)]
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v.to_string())))
                .collect();
            format!("@SizeRule{}", args(pairs))
        }
        Annotation::Throw { exception, message } => {
            let mut pairs = Vec::new();
            if let Some(exception) = exception {
                pairs.push(("exception", format!("{exception}.class")));
            }
            if let Some(message) = message {
                pairs.push(("message", string_literal(message)));
            }
            format!("@Throw{}", args(pairs))
        }
        Annotation::Return { value } => {
            let pairs = value.iter().map(|v| ("value", string_literal(v))).collect();
            format!("@Return{}", args(pairs))
        }
    }
}
