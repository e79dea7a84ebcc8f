//! CoffeeScript writer.
//!
//! Walks the Python syntax tree depth-first and emits CoffeeScript-flavoured
//! text. Comments, blank lines and string spellings the tree dropped are
//! pulled back from a [`TokenSync`] as each statement is reached, so nodes
//! must be visited in source order.
//!
//! The output is a transliteration for a human to finish: headers keep their
//! Python colons, imports become annotated `pass` lines and comprehensions
//! stay in their Python shape.

use crate::ast::*;
use crate::error::{Diagnostic, DiagnosticKind, RenderError};
use crate::ops::{self, OpKind};
use crate::output::state::{RenderState, Scope};
use crate::sync::TokenSync;
use crate::tokenize::TokenRecord;
use serde::Deserialize;

/// Writer settings, embeddable in a driver's config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Text repeated once per indent level.
    pub indent_unit: String,
    /// Fail on operators without a spelling instead of emitting `<Kind>`.
    pub strict_operators: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            indent_unit: "    ".to_string(),
            strict_operators: false,
        }
    }
}

/// Rendered text plus whatever had to be degraded to produce it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Render `module` with default options.
pub fn render(module: &Module, source: &str, tokens: &[TokenRecord]) -> Result<String, RenderError> {
    render_with(module, source, tokens, &RenderOptions::default()).map(|rendered| rendered.text)
}

pub fn render_with(
    module: &Module,
    source: &str,
    tokens: &[TokenRecord],
    options: &RenderOptions,
) -> Result<Rendered, RenderError> {
    CoffeeWriter::emit(module, source, tokens, options)
}

/// Binding strength, loosest first. An operand is parenthesized when its own
/// level is below what its position requires.
mod prec {
    pub const TOP: u8 = 0;
    pub const LAMBDA: u8 = 1;
    pub const IF_EXP: u8 = 2;
    pub const OR: u8 = 3;
    pub const AND: u8 = 4;
    pub const NOT: u8 = 5;
    pub const CMP: u8 = 6;
    pub const BIT_OR: u8 = 7;
    pub const BIT_XOR: u8 = 8;
    pub const BIT_AND: u8 = 9;
    pub const SHIFT: u8 = 10;
    pub const ARITH: u8 = 11;
    pub const TERM: u8 = 12;
    pub const UNARY: u8 = 13;
    pub const POW: u8 = 14;
    pub const AWAIT: u8 = 15;
    pub const ATOM: u8 = 16;
}

fn binary_precedence(op: BinOp) -> u8 {
    match op {
        BinOp::BitOr => prec::BIT_OR,
        BinOp::BitXor => prec::BIT_XOR,
        BinOp::BitAnd => prec::BIT_AND,
        BinOp::LShift | BinOp::RShift => prec::SHIFT,
        BinOp::Add | BinOp::Sub => prec::ARITH,
        BinOp::Mult | BinOp::MatMult | BinOp::Div | BinOp::FloorDiv | BinOp::Mod => prec::TERM,
        BinOp::Pow => prec::POW,
    }
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Yield(_) | Expr::YieldFrom(_) => prec::TOP,
        Expr::Lambda { .. } => prec::LAMBDA,
        Expr::IfExp { .. } => prec::IF_EXP,
        Expr::BoolOp { op: BoolOp::Or, .. } => prec::OR,
        Expr::BoolOp { op: BoolOp::And, .. } => prec::AND,
        Expr::UnaryOp {
            op: UnaryOp::Not, ..
        } => prec::NOT,
        Expr::Compare { .. } => prec::CMP,
        Expr::BinOp { op, .. } => binary_precedence(*op),
        Expr::Concat(_) => prec::ARITH,
        Expr::UnaryOp { .. } => prec::UNARY,
        Expr::Await(_) => prec::AWAIT,
        _ => prec::ATOM,
    }
}

/// Quote a literal's value when its source spelling is unavailable.
fn requote(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        format!("'''{value}'''")
    }
}

/// What a function's first parameter becomes in its parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Receiver {
    Plain,
    /// Method receiver; the body spells it `@`.
    Dropped,
    /// `self` outside a class body, kept in place as `@`.
    Sigil,
}

/// Emits a Python syntax tree as CoffeeScript.
pub struct CoffeeWriter<'a> {
    sync: TokenSync<'a>,
    options: &'a RenderOptions,
    state: RenderState,
    output: String,
    /// Line of the statement being rendered.
    statement_line: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> CoffeeWriter<'a> {
    pub fn new(
        source: &'a str,
        tokens: &'a [TokenRecord],
        options: &'a RenderOptions,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            sync: TokenSync::new(source, tokens)?,
            options,
            state: RenderState::default(),
            output: String::new(),
            statement_line: 0,
            diagnostics: Vec::new(),
        })
    }

    /// Render a whole module.
    #[tracing::instrument(level = "debug", skip_all, fields(statements = module.body.len()))]
    pub fn emit(
        module: &Module,
        source: &'a str,
        tokens: &'a [TokenRecord],
        options: &'a RenderOptions,
    ) -> Result<Rendered, RenderError> {
        let mut writer = Self::new(source, tokens, options)?;
        writer.write_module(module)?;
        tracing::debug!(
            bytes = writer.output.len(),
            diagnostics = writer.diagnostics.len(),
            "rendered module"
        );
        Ok(Rendered {
            text: writer.output,
            diagnostics: writer.diagnostics,
        })
    }

    fn write_module(&mut self, module: &Module) -> Result<(), RenderError> {
        for stmt in &module.body {
            self.write_stmt(stmt)?;
        }
        // Comments after the last statement.
        let rest = self.sync.leading_string(usize::MAX);
        self.output.push_str(&rest);
        Ok(())
    }

    /// Prefix `text` with the current indentation, after any leading newlines.
    fn indent(&self, text: &str) -> String {
        let body = text.trim_start_matches('\n');
        let newlines = &text[..text.len() - body.len()];
        let unit = self.options.indent_unit.repeat(self.state.indent_level);
        format!("{newlines}{unit}{body}")
    }

    /// One source line: recovered leading lines, the indented text, then the
    /// line's trailing comment.
    fn line(
        &mut self,
        line: usize,
        render: impl FnOnce(&mut Self) -> Result<String, RenderError>,
    ) -> Result<(), RenderError> {
        let head = self.sync.leading_string(line);
        let tail = self.sync.trailing_comment(line);
        self.statement_line = line;
        let text = render(self)?;
        let text = self.indent(&text);
        self.output.push_str(&head);
        self.output.push_str(&text);
        self.output.push_str(&tail);
        Ok(())
    }

    /// Nested block one level deeper; the level is restored even on error.
    fn body(&mut self, body: &[Stmt]) -> Result<(), RenderError> {
        self.state.indent_level += 1;
        let result = body.iter().try_for_each(|stmt| self.write_stmt(stmt));
        self.state.indent_level -= 1;
        result
    }

    /// `else:` or `finally:` followed by its block.
    fn clause(&mut self, keyword: &str, line: Option<usize>, body: &[Stmt]) -> Result<(), RenderError> {
        if body.is_empty() {
            return Ok(());
        }
        match line {
            Some(line) => self.line(line, |_| Ok(keyword.to_string()))?,
            None => {
                let text = self.indent(keyword);
                self.output.push_str(&text);
                self.output.push('\n');
            }
        }
        self.body(body)
    }

    fn write_stmt(&mut self, stmt: &Stmt) -> Result<(), RenderError> {
        match stmt {
            Stmt::ClassDef(class) => self.write_class(class),
            Stmt::FunctionDef(func) => self.write_function(func),

            Stmt::Assign {
                targets,
                value,
                line,
            } => self.line(*line, |w| {
                let targets = w.join(targets, prec::LAMBDA, "=")?;
                let value = w.expr(value, prec::TOP)?;
                Ok(format!("{targets}={value}"))
            }),
            Stmt::AugAssign {
                target,
                op,
                value,
                line,
            } => self.line(*line, |w| {
                let target = w.expr(target, prec::LAMBDA)?;
                let op = w.op((*op).into())?;
                let value = w.expr(value, prec::TOP)?;
                Ok(format!("{target}{op}={value}"))
            }),
            Stmt::Expr { value, line } => self.line(*line, |w| w.expr(value, prec::TOP)),

            Stmt::If {
                test,
                body,
                orelse,
                else_line,
                line,
            } => {
                self.line(*line, |w| Ok(format!("if {}:", w.expr(test, prec::LAMBDA)?)))?;
                self.body(body)?;
                self.clause("else:", *else_line, orelse)
            }
            Stmt::For {
                target,
                iter,
                body,
                orelse,
                else_line,
                line,
            } => {
                self.line(*line, |w| {
                    let target = w.expr(target, prec::BIT_OR)?;
                    let iter = w.expr(iter, prec::LAMBDA)?;
                    Ok(format!("for {target} in {iter}:"))
                })?;
                self.body(body)?;
                self.clause("else:", *else_line, orelse)
            }
            Stmt::While {
                test,
                body,
                orelse,
                else_line,
                line,
            } => {
                self.line(*line, |w| Ok(format!("while {}:", w.expr(test, prec::LAMBDA)?)))?;
                self.body(body)?;
                self.clause("else:", *else_line, orelse)
            }
            Stmt::Try {
                body,
                handlers,
                orelse,
                else_line,
                finalbody,
                finally_line,
                line,
            } => {
                self.line(*line, |_| Ok("try".to_string()))?;
                self.body(body)?;
                for handler in handlers {
                    self.write_handler(handler)?;
                }
                self.clause("else:", *else_line, orelse)?;
                self.clause("finally:", *finally_line, finalbody)
            }
            Stmt::With { items, body, line } => {
                self.line(*line, |w| {
                    let mut parts = Vec::with_capacity(items.len());
                    for item in items {
                        let context = w.expr(&item.context, prec::LAMBDA)?;
                        match &item.optional_vars {
                            Some(vars) => {
                                parts.push(format!("{context} as {}", w.expr(vars, prec::BIT_OR)?))
                            }
                            None => parts.push(context),
                        }
                    }
                    Ok(format!("with {}:", parts.join(", ")))
                })?;
                self.body(body)
            }

            Stmt::Import { names, line } => {
                self.line(*line, |_| Ok(format!("pass # import {}", aliases(names))))
            }
            Stmt::ImportFrom {
                module,
                names,
                line,
            } => self.line(*line, |_| {
                Ok(format!("pass # from {module} import {}", aliases(names)))
            }),

            Stmt::Return { value, line } => self.line(*line, |w| match value {
                Some(value) => Ok(format!("return {}", w.expr(value, prec::TOP)?)),
                None => Ok("return".to_string()),
            }),
            Stmt::Raise { exc, cause, line } => self.line(*line, |w| {
                let mut text = String::from("raise");
                if let Some(exc) = exc {
                    text.push(' ');
                    text.push_str(&w.expr(exc, prec::LAMBDA)?);
                }
                if let Some(cause) = cause {
                    text.push_str(" from ");
                    text.push_str(&w.expr(cause, prec::LAMBDA)?);
                }
                Ok(text)
            }),
            Stmt::Delete { targets, line } => {
                self.line(*line, |w| Ok(format!("del {}", w.join(targets, prec::LAMBDA, ",")?)))
            }
            Stmt::Assert { test, msg, line } => self.line(*line, |w| {
                let test = w.expr(test, prec::LAMBDA)?;
                match msg {
                    Some(msg) => Ok(format!("assert {test}, {}", w.expr(msg, prec::LAMBDA)?)),
                    None => Ok(format!("assert {test}")),
                }
            }),
            Stmt::Global { names, line } => {
                self.line(*line, |_| Ok(format!("global {}", names.join(","))))
            }
            Stmt::Nonlocal { names, line } => {
                self.line(*line, |_| Ok(format!("nonlocal {}", names.join(","))))
            }
            Stmt::Print { values, dest, line } => self.line(*line, |w| {
                let mut args = Vec::with_capacity(values.len() + 1);
                for value in values {
                    args.push(w.expr(value, prec::LAMBDA)?);
                }
                if let Some(dest) = dest {
                    args.push(format!("dest={}", w.expr(dest, prec::LAMBDA)?));
                }
                Ok(format!("print({})", args.join(",")))
            }),
            Stmt::Exec {
                body,
                globals,
                locals,
                line,
            } => self.line(*line, |w| {
                let body = w.expr(body, prec::BIT_OR)?;
                let mut scopes = Vec::new();
                for scope in [globals, locals].into_iter().flatten() {
                    scopes.push(w.expr(scope, prec::LAMBDA)?);
                }
                if scopes.is_empty() {
                    Ok(format!("exec {body}"))
                } else {
                    Ok(format!("exec {body} in {}", scopes.join(",")))
                }
            }),
            Stmt::Pass { line } => self.line(*line, |_| Ok("pass".to_string())),
            Stmt::Break { line } => self.line(*line, |_| Ok("break".to_string())),
            Stmt::Continue { line } => self.line(*line, |_| Ok("continue".to_string())),
        }
    }

    fn write_decorators(&mut self, decorators: &[Decorator]) -> Result<(), RenderError> {
        for decorator in decorators {
            self.line(decorator.line, |w| {
                Ok(format!("@{}", w.expr(&decorator.expr, prec::LAMBDA)?))
            })?;
        }
        Ok(())
    }

    fn write_class(&mut self, class: &ClassDef) -> Result<(), RenderError> {
        self.write_decorators(&class.decorators)?;
        self.line(class.line, |w| {
            if class.bases.is_empty() {
                return Ok(format!("class {}", class.name));
            }
            let bases = w.join(&class.bases, prec::LAMBDA, ", ")?;
            Ok(format!("class {} extends {bases}", class.name))
        })?;
        self.state.push(Scope::class(&class.name));
        let result = self.body(&class.body);
        self.state.pop();
        result
    }

    fn write_function(&mut self, func: &FunctionDef) -> Result<(), RenderError> {
        self.write_decorators(&func.decorators)?;
        let method = self.state.in_class();
        let first = func.args.args.first();
        let (receiver, style) = match first {
            Some(name) if method && !func.is_static() => (Some(name.clone()), Receiver::Dropped),
            Some(name) if !method && name == "self" => (Some(name.clone()), Receiver::Sigil),
            _ => (None, Receiver::Plain),
        };
        self.line(func.line, |w| {
            let params = w.parameters(&func.args, style)?;
            let sep = if method { ": " } else { " = " };
            if params.is_empty() {
                Ok(format!("{}{sep}->", func.name))
            } else {
                Ok(format!("{}{sep}({}) ->", func.name, params.join(", ")))
            }
        })?;
        self.state.push(Scope::function(&func.name, receiver));
        let result = self.body(&func.body);
        self.state.pop();
        result
    }

    fn write_handler(&mut self, handler: &ExceptHandler) -> Result<(), RenderError> {
        self.line(handler.line, |w| {
            let mut text = String::from("except");
            if let Some(typ) = &handler.typ {
                text.push(' ');
                text.push_str(&w.expr(typ, prec::LAMBDA)?);
            }
            if let Some(name) = &handler.name {
                text.push_str(" as ");
                text.push_str(name);
            }
            text.push(':');
            Ok(text)
        })?;
        self.body(&handler.body)
    }

    /// Rendered parameters. Defaults pair with the tail of the positional
    /// list; `receiver` decides what happens to the first one.
    fn parameters(&mut self, args: &Arguments, receiver: Receiver) -> Result<Vec<String>, RenderError> {
        let plain = args.args.len().saturating_sub(args.defaults.len());
        let mut params = Vec::new();
        for (i, name) in args.args.iter().enumerate() {
            match i.checked_sub(plain).and_then(|d| args.defaults.get(d)) {
                Some(default) => params.push(format!("{name}={}", self.expr(default, prec::LAMBDA)?)),
                None => params.push(name.clone()),
            }
        }
        match receiver {
            Receiver::Plain => {}
            Receiver::Dropped if !params.is_empty() => {
                params.remove(0);
            }
            Receiver::Dropped => {}
            Receiver::Sigil => {
                if let Some(first) = params.first_mut() {
                    first.replace_range(..args.args[0].len(), "@");
                }
            }
        }
        if let Some(vararg) = &args.vararg {
            params.push(format!("*{vararg}"));
        }
        for (i, name) in args.kwonlyargs.iter().enumerate() {
            match args.kw_defaults.get(i).and_then(Option::as_ref) {
                Some(default) => params.push(format!("{name}={}", self.expr(default, prec::LAMBDA)?)),
                None => params.push(name.clone()),
            }
        }
        if let Some(kwarg) = &args.kwarg {
            params.push(format!("**{kwarg}"));
        }
        Ok(params)
    }

    fn join(&mut self, exprs: &[Expr], min: u8, sep: &str) -> Result<String, RenderError> {
        let mut parts = Vec::with_capacity(exprs.len());
        for expr in exprs {
            parts.push(self.expr(expr, min)?);
        }
        Ok(parts.join(sep))
    }

    /// Render `expr`, parenthesized if it binds looser than `min`.
    fn expr(&mut self, expr: &Expr, min: u8) -> Result<String, RenderError> {
        let text = self.bare_expr(expr)?;
        if precedence(expr) < min {
            Ok(format!("({text})"))
        } else {
            Ok(text)
        }
    }

    fn bare_expr(&mut self, expr: &Expr) -> Result<String, RenderError> {
        let text = match expr {
            Expr::Name(id) => {
                if self.state.receiver() == Some(id.as_str()) {
                    "@".to_string()
                } else {
                    id.clone()
                }
            }
            Expr::Constant(constant) => match constant {
                Constant::True => "true",
                Constant::False => "false",
                Constant::None => "null",
            }
            .to_string(),
            Expr::Num(text) => text.clone(),
            Expr::Str { value, line } => self.string(value, *line),
            Expr::Concat(parts) => self.join(parts, prec::ATOM, " + ")?,
            Expr::Ellipsis => "...".to_string(),

            Expr::Attribute { value, attr } => match value.as_ref() {
                Expr::Name(id) if self.state.receiver() == Some(id.as_str()) => format!("@{attr}"),
                _ => format!("{}.{attr}", self.expr(value, prec::ATOM)?),
            },
            Expr::Call { func, args } => {
                let func = self.expr(func, prec::ATOM)?;
                let mut parts = Vec::with_capacity(args.len());
                for arg in args {
                    parts.push(match arg {
                        Argument::Positional(value) => self.expr(value, prec::LAMBDA)?,
                        Argument::Keyword { name, value } => {
                            format!("{name}={}", self.expr(value, prec::LAMBDA)?)
                        }
                        Argument::Unpack(value) => format!("**{}", self.expr(value, prec::BIT_OR)?),
                    });
                }
                format!("{func}({})", parts.join(","))
            }
            Expr::Subscript { value, slice } => {
                let value = self.expr(value, prec::ATOM)?;
                format!("{value}[{}]", self.join(slice, prec::LAMBDA, ",")?)
            }
            Expr::Slice { lower, upper, step } => {
                let mut bound = |part: &Option<Box<Expr>>| match part {
                    Some(part) => self.expr(part, prec::LAMBDA),
                    None => Ok(String::new()),
                };
                let lower = bound(lower)?;
                let upper = bound(upper)?;
                match step {
                    Some(_) => format!("{lower}:{upper}:{}", bound(step)?),
                    None => format!("{lower}:{upper}"),
                }
            }

            Expr::List(elts) => format!("[{}]", self.join(elts, prec::LAMBDA, ",")?),
            Expr::Tuple(elts) => format!("({})", self.join(elts, prec::LAMBDA, ", ")?),
            Expr::Set(elts) => format!("new Set([{}])", self.join(elts, prec::LAMBDA, ",")?),
            Expr::Dict(entries) => self.dict(entries)?,

            Expr::ListComp { elt, generators } | Expr::SetComp { elt, generators } => {
                let elt = self.expr(elt, prec::LAMBDA)?;
                format!("{elt} for {}", self.generators(generators)?)
            }
            Expr::DictComp {
                key,
                value,
                generators,
            } => {
                let key = self.expr(key, prec::LAMBDA)?;
                let value = self.expr(value, prec::LAMBDA)?;
                format!("{key}:{value} for {}", self.generators(generators)?)
            }
            Expr::GeneratorExp { elt, generators } => {
                let elt = self.expr(elt, prec::LAMBDA)?;
                format!("<gen {elt} for {}>", self.generators(generators)?)
            }

            Expr::BinOp { left, op, right } => {
                let (left_min, right_min) = match op {
                    BinOp::Pow => (prec::AWAIT, prec::UNARY),
                    _ => {
                        let p = binary_precedence(*op);
                        (p, p + 1)
                    }
                };
                let left = self.expr(left, left_min)?;
                let op = self.op((*op).into())?;
                let right = self.expr(right, right_min)?;
                format!("{left}{op}{right}")
            }
            Expr::BoolOp { op, values } => {
                let sep = self.op((*op).into())?;
                self.join(values, precedence(expr) + 1, &sep)?
            }
            Expr::Compare {
                left,
                ops,
                comparators,
            } => self.compare(left, ops, comparators)?,
            Expr::UnaryOp { op, operand } => {
                let spelling = self.op((*op).into())?;
                let min = match op {
                    UnaryOp::Not => prec::NOT,
                    _ => prec::UNARY,
                };
                let sign = spelling.trim_start();
                let operand = self.expr(operand, min)?;
                // `-(-1)` must not collapse into `--1`.
                let doubled = matches!(op, UnaryOp::USub | UnaryOp::UAdd) && operand.starts_with(sign);
                if doubled {
                    format!("{sign}({operand})")
                } else {
                    format!("{sign}{operand}")
                }
            }
            Expr::IfExp { test, body, orelse } => {
                // Python order, so literals meet their tokens in sequence.
                let body = self.expr(body, prec::OR)?;
                let test = self.expr(test, prec::OR)?;
                let orelse = self.expr(orelse, prec::IF_EXP)?;
                format!("if {test} then {body} else {orelse}")
            }
            Expr::Lambda { args, body } => {
                let params = self.parameters(args, Receiver::Plain)?;
                let body = self.expr(body, prec::LAMBDA)?;
                if params.is_empty() {
                    format!("-> {body}")
                } else {
                    format!("({}) -> {body}", params.join(", "))
                }
            }

            Expr::Yield(value) => match value {
                Some(value) => format!("yield {}", self.expr(value, prec::LAMBDA)?),
                None => "yield".to_string(),
            },
            Expr::YieldFrom(value) => format!("yield from {}", self.expr(value, prec::LAMBDA)?),
            Expr::Await(value) => format!("await {}", self.expr(value, prec::ATOM)?),
            Expr::Starred(value) => format!("*{}", self.expr(value, prec::BIT_OR)?),
        };
        Ok(text)
    }

    fn compare(&mut self, left: &Expr, ops: &[CmpOp], comparators: &[Expr]) -> Result<String, RenderError> {
        let mut text = self.expr(left, prec::BIT_OR)?;
        if ops.len() != comparators.len() {
            let line = self.statement_line;
            self.diagnose(
                DiagnosticKind::MalformedComparisonShape,
                Some(line),
                format!(
                    "{} comparison operators for {} comparators",
                    ops.len(),
                    comparators.len()
                ),
            );
            for comparator in comparators {
                text.push_str(&self.expr(comparator, prec::BIT_OR)?);
            }
            return Ok(text);
        }
        for (op, comparator) in ops.iter().zip(comparators) {
            text.push_str(&self.op((*op).into())?);
            text.push_str(&self.expr(comparator, prec::BIT_OR)?);
        }
        Ok(text)
    }

    fn generators(&mut self, generators: &[Comprehension]) -> Result<String, RenderError> {
        let mut parts = Vec::with_capacity(generators.len());
        for generator in generators {
            let target = self.expr(&generator.target, prec::BIT_OR)?;
            let iter = self.expr(&generator.iter, prec::OR)?;
            let mut part = format!("{target} in {iter}");
            for cond in &generator.ifs {
                part.push_str(" if ");
                part.push_str(&self.expr(cond, prec::OR)?);
            }
            parts.push(part);
        }
        Ok(parts.join(" for "))
    }

    /// One `key:value` line per entry, one level deeper, with interior
    /// comments kept and blank lines dropped.
    fn dict(&mut self, entries: &[DictEntry]) -> Result<String, RenderError> {
        if entries.is_empty() {
            return Ok("{}".to_string());
        }
        let mut text = String::from("{\n");
        self.state.indent_level += 1;
        let result = self.dict_entries(entries, &mut text);
        self.state.indent_level -= 1;
        result?;
        text.push_str(&self.indent("}"));
        Ok(text)
    }

    fn dict_entries(&mut self, entries: &[DictEntry], text: &mut String) -> Result<(), RenderError> {
        for entry in entries {
            for line in self.sync.leading_lines(entry.key_line) {
                if !line.trim().is_empty() {
                    text.push_str(&line);
                }
            }
            // The statement emits its own line's comment.
            let tail = if entry.value_line == self.statement_line {
                "\n".to_string()
            } else {
                self.sync.trailing_comment(entry.value_line)
            };
            let item = match &entry.key {
                Some(key) => {
                    let key = self.expr(key, prec::LAMBDA)?;
                    format!("{key}:{}{tail}", self.expr(&entry.value, prec::LAMBDA)?)
                }
                None => format!("**{}{tail}", self.expr(&entry.value, prec::BIT_OR)?),
            };
            text.push_str(&self.indent(&item));
        }
        Ok(())
    }

    /// Source spelling of the next literal on `line`, or the value re-quoted.
    fn string(&mut self, value: &str, line: usize) -> String {
        match self.sync.next_string_literal(line) {
            Ok(text) => text.to_string(),
            Err(underflow) => {
                self.diagnose(
                    DiagnosticKind::StringQueueUnderflow,
                    Some(line),
                    underflow.to_string(),
                );
                requote(value)
            }
        }
    }

    fn op(&mut self, kind: OpKind) -> Result<String, RenderError> {
        if let Some(text) = ops::spelling(kind) {
            return Ok(text.to_string());
        }
        let line = self.statement_line;
        if self.options.strict_operators {
            return Err(RenderError::UnsupportedOperator { op: kind, line });
        }
        self.diagnose(
            DiagnosticKind::UnsupportedOperator,
            Some(line),
            format!("operator `{kind}` has no spelling"),
        );
        Ok(ops::placeholder(kind))
    }

    fn diagnose(&mut self, kind: DiagnosticKind, line: Option<usize>, message: String) {
        let context = line
            .map(|line| self.sync.lines().line_at(line, true))
            .unwrap_or_default();
        tracing::warn!(kind = ?kind, line = ?line, context = %context, "{}", message);
        self.diagnostics.push(Diagnostic {
            kind,
            line,
            message,
        });
    }
}

fn aliases(names: &[Alias]) -> String {
    names
        .iter()
        .map(|alias| match &alias.asname {
            Some(asname) => format!("{} as {asname}", alias.name),
            None => alias.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::tokenize;

    fn name(id: &str) -> Expr {
        Expr::name(id)
    }

    fn emit(module: &Module, source: &str, options: &RenderOptions) -> Result<Rendered, RenderError> {
        let tokens = tokenize(source).unwrap();
        CoffeeWriter::emit(module, source, &tokens, options)
    }

    fn text(module: &Module, source: &str) -> String {
        emit(module, source, &RenderOptions::default()).unwrap().text
    }

    fn assign(target: Expr, value: Expr, line: usize) -> Stmt {
        Stmt::Assign {
            targets: vec![target],
            value,
            line,
        }
    }

    #[test]
    fn parenthesizes_by_precedence() {
        let sum = Expr::binary(name("a"), BinOp::Add, name("b"));
        let product = Expr::binary(sum, BinOp::Mult, name("c"));
        let module = Module::new(vec![assign(name("x"), product, 1)]);
        assert_eq!(text(&module, "x = (a + b) * c\n"), "x=(a+b)*c\n");
    }

    #[test]
    fn right_operand_of_same_level_is_parenthesized() {
        let diff = Expr::binary(name("b"), BinOp::Sub, name("c"));
        let outer = Expr::binary(name("a"), BinOp::Sub, diff);
        let module = Module::new(vec![assign(name("x"), outer, 1)]);
        assert_eq!(text(&module, "x = a - (b - c)\n"), "x=a-(b-c)\n");
    }

    #[test]
    fn unary_spelling_is_trimmed() {
        let not = Expr::unary(UnaryOp::Not, name("a"));
        let neg = Expr::unary(UnaryOp::USub, name("b"));
        let module = Module::new(vec![
            assign(name("x"), not, 1),
            assign(name("y"), neg, 2),
        ]);
        assert_eq!(text(&module, "x = not a\ny = -b\n"), "x=not a\ny=-b\n");
    }

    #[test]
    fn matmult_renders_placeholder_by_default() {
        let value = Expr::binary(name("a"), BinOp::MatMult, name("b"));
        let module = Module::new(vec![assign(name("x"), value, 1)]);
        let rendered = emit(&module, "x = a @ b\n", &RenderOptions::default()).unwrap();
        assert_eq!(rendered.text, "x=a<MatMult>b\n");
        assert_eq!(rendered.diagnostics.len(), 1);
        assert_eq!(rendered.diagnostics[0].kind, DiagnosticKind::UnsupportedOperator);
        assert_eq!(rendered.diagnostics[0].line, Some(1));
    }

    #[test]
    fn matmult_fails_in_strict_mode() {
        let value = Expr::binary(name("a"), BinOp::MatMult, name("b"));
        let module = Module::new(vec![assign(name("x"), value, 1)]);
        let options = RenderOptions {
            strict_operators: true,
            ..RenderOptions::default()
        };
        let err = emit(&module, "x = a @ b\n", &options).unwrap_err();
        assert!(matches!(
            err,
            RenderError::UnsupportedOperator {
                op: OpKind::Bin(BinOp::MatMult),
                line: 1
            }
        ));
    }

    #[test]
    fn indent_level_is_restored_after_failed_body() {
        let source = "if t:\n    x = a @ b\n";
        let tokens = tokenize(source).unwrap();
        let options = RenderOptions {
            strict_operators: true,
            ..RenderOptions::default()
        };
        let mut writer = CoffeeWriter::new(source, &tokens, &options).unwrap();
        let stmt = Stmt::If {
            test: name("t"),
            body: vec![assign(
                name("x"),
                Expr::binary(name("a"), BinOp::MatMult, name("b")),
                2,
            )],
            orelse: vec![],
            else_line: None,
            line: 1,
        };
        assert!(writer.write_stmt(&stmt).is_err());
        assert_eq!(writer.state.indent_level, 0);
    }

    #[test]
    fn malformed_comparison_drops_operators() {
        let compare = Expr::compare(name("a"), vec![CmpOp::Lt], vec![name("b"), name("c")]);
        let module = Module::new(vec![Stmt::Expr {
            value: compare,
            line: 1,
        }]);
        let rendered = emit(&module, "a < b < c\n", &RenderOptions::default()).unwrap();
        assert_eq!(rendered.text, "abc\n");
        assert_eq!(
            rendered.diagnostics[0].kind,
            DiagnosticKind::MalformedComparisonShape
        );
    }

    #[test]
    fn string_underflow_requotes_value() {
        // The tree claims a literal on line 1, but the source has none.
        let module = Module::new(vec![assign(name("x"), Expr::string("it's", 1), 1)]);
        let rendered = emit(&module, "x = y\n", &RenderOptions::default()).unwrap();
        assert_eq!(rendered.text, "x=\"it's\"\n");
        assert_eq!(
            rendered.diagnostics[0].kind,
            DiagnosticKind::StringQueueUnderflow
        );
    }

    #[test]
    fn custom_indent_unit() {
        let module = Module::new(vec![Stmt::While {
            test: Expr::Constant(Constant::True),
            body: vec![Stmt::Break { line: 2 }],
            orelse: vec![],
            else_line: None,
            line: 1,
        }]);
        let options = RenderOptions {
            indent_unit: "\t".to_string(),
            ..RenderOptions::default()
        };
        let rendered = emit(&module, "while True:\n    break\n", &options).unwrap();
        assert_eq!(rendered.text, "while true:\n\tbreak\n");
    }

    #[test]
    fn elif_chain_nests_under_else() {
        let inner = Stmt::If {
            test: name("b"),
            body: vec![Stmt::Pass { line: 4 }],
            orelse: vec![],
            else_line: None,
            line: 3,
        };
        let module = Module::new(vec![Stmt::If {
            test: name("a"),
            body: vec![Stmt::Pass { line: 2 }],
            orelse: vec![inner],
            else_line: None,
            line: 1,
        }]);
        let source = "if a:\n    pass\nelif b:\n    pass\n";
        assert_eq!(
            text(&module, source),
            "if a:\n    pass\nelse:\n    if b:\n        pass\n"
        );
    }

    #[test]
    fn module_level_self_is_plain() {
        let module = Module::new(vec![assign(
            name("x"),
            Expr::attribute(name("self"), "y"),
            1,
        )]);
        assert_eq!(text(&module, "x = self.y\n"), "x=self.y\n");
    }

    #[test]
    fn self_parameter_of_plain_function_is_sigil() {
        let func = FunctionDef {
            name: "f".into(),
            args: Arguments {
                args: vec!["self".into(), "k".into()],
                ..Arguments::default()
            },
            body: vec![Stmt::Return {
                value: Some(Expr::binary(
                    Expr::attribute(name("self"), "x"),
                    BinOp::Add,
                    name("self"),
                )),
                line: 2,
            }],
            decorators: vec![],
            line: 1,
        };
        let module = Module::new(vec![Stmt::FunctionDef(func)]);
        let source = "def f(self, k):\n    return self.x + self\n";
        assert_eq!(text(&module, source), "f = (@, k) ->\n    return @x+@\n");
    }

    #[test]
    fn nested_same_sign_unary_keeps_parentheses() {
        let one = Expr::num("1");
        let neg = Expr::unary(UnaryOp::USub, Expr::unary(UnaryOp::USub, one.clone()));
        let pos = Expr::unary(UnaryOp::UAdd, Expr::unary(UnaryOp::UAdd, one.clone()));
        let mixed = Expr::unary(UnaryOp::USub, Expr::unary(UnaryOp::UAdd, one));
        let module = Module::new(vec![
            assign(name("x"), neg, 1),
            assign(name("y"), pos, 2),
            assign(name("z"), mixed, 3),
        ]);
        let source = "x = -(-1)\ny = +(+1)\nz = -(+1)\n";
        assert_eq!(text(&module, source), "x=-(-1)\ny=+(+1)\nz=-+1\n");
    }

    #[test]
    fn static_method_keeps_first_parameter() {
        let method = FunctionDef {
            name: "make".into(),
            args: Arguments {
                args: vec!["a".into()],
                ..Arguments::default()
            },
            body: vec![Stmt::Return {
                value: Some(name("a")),
                line: 4,
            }],
            decorators: vec![Decorator {
                expr: name("staticmethod"),
                line: 2,
            }],
            line: 3,
        };
        let module = Module::new(vec![Stmt::ClassDef(ClassDef {
            name: "C".into(),
            bases: vec![],
            body: vec![Stmt::FunctionDef(method)],
            decorators: vec![],
            line: 1,
        })]);
        let source = "class C:\n    @staticmethod\n    def make(a):\n        return a\n";
        assert_eq!(
            text(&module, source),
            "class C\n    @staticmethod\n    make: (a) ->\n        return a\n"
        );
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: RenderOptions = serde_json::from_str(r#"{"strict_operators": true}"#).unwrap();
        assert!(options.strict_operators);
        assert_eq!(options.indent_unit, "    ");
    }
}
