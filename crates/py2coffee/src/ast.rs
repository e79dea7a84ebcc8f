//! Python syntax tree consumed by the CoffeeScript writer.
//!
//! The shapes follow Python's own `ast` module closely, trimmed to what the
//! writer renders. Every statement carries its 1-based source line so the
//! token index can recover the comments and blank lines the tree drops.
//!
//! Expressions mostly carry no position. The exceptions are the places the
//! writer has to talk to the token index:
//! - `Expr::Str` keeps the line its token is bucketed on (the *end* line of
//!   a multi-line literal), so the exact spelling can be recovered
//! - `DictEntry` keeps key and value lines for interior comments

use serde::{Deserialize, Serialize};

/// A parsed source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub body: Vec<Stmt>,
}

impl Module {
    pub fn new(body: Vec<Stmt>) -> Self {
        Self { body }
    }
}

/// Statement node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    ClassDef(ClassDef),
    FunctionDef(FunctionDef),

    /// `a = b = value`: one entry per target, left to right.
    Assign {
        targets: Vec<Expr>,
        value: Expr,
        line: usize,
    },
    AugAssign {
        target: Expr,
        op: BinOp,
        value: Expr,
        line: usize,
    },
    /// Expression statement (calls, docstrings, bare yields).
    Expr {
        value: Expr,
        line: usize,
    },

    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
        /// Line of an explicit `else:`. `None` for `elif` chains, which
        /// nest another `If` in `orelse`.
        else_line: Option<usize>,
        line: usize,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
        else_line: Option<usize>,
        line: usize,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
        else_line: Option<usize>,
        line: usize,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<Stmt>,
        else_line: Option<usize>,
        finalbody: Vec<Stmt>,
        finally_line: Option<usize>,
        line: usize,
    },
    With {
        items: Vec<WithItem>,
        body: Vec<Stmt>,
        line: usize,
    },

    Import {
        names: Vec<Alias>,
        line: usize,
    },
    ImportFrom {
        /// Module text as written, including leading dots of relative imports.
        module: String,
        names: Vec<Alias>,
        line: usize,
    },

    Return {
        value: Option<Expr>,
        line: usize,
    },
    Raise {
        exc: Option<Expr>,
        cause: Option<Expr>,
        line: usize,
    },
    Delete {
        targets: Vec<Expr>,
        line: usize,
    },
    Assert {
        test: Expr,
        msg: Option<Expr>,
        line: usize,
    },
    Global {
        names: Vec<String>,
        line: usize,
    },
    Nonlocal {
        names: Vec<String>,
        line: usize,
    },
    /// Python 2 `print a, b` / `print >>f, a`.
    Print {
        values: Vec<Expr>,
        dest: Option<Expr>,
        line: usize,
    },
    /// Python 2 `exec code in g, l`.
    Exec {
        body: Expr,
        globals: Option<Expr>,
        locals: Option<Expr>,
        line: usize,
    },
    Pass {
        line: usize,
    },
    Break {
        line: usize,
    },
    Continue {
        line: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub bases: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub decorators: Vec<Decorator>,
    /// Line of the `class` keyword, not of the first decorator.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub args: Arguments,
    pub body: Vec<Stmt>,
    pub decorators: Vec<Decorator>,
    /// Line of the `def` keyword, not of the first decorator.
    pub line: usize,
}

impl FunctionDef {
    /// Whether a `@staticmethod` decorator is attached.
    pub fn is_static(&self) -> bool {
        self.decorators
            .iter()
            .any(|d| matches!(&d.expr, Expr::Name(name) if name == "staticmethod"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decorator {
    pub expr: Expr,
    pub line: usize,
}

/// Parameter list of a function or lambda.
///
/// `defaults` pairs with the *tail* of `args`, as in Python's `ast.arguments`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arguments {
    pub args: Vec<String>,
    pub defaults: Vec<Expr>,
    pub vararg: Option<String>,
    pub kwonlyargs: Vec<String>,
    /// One slot per keyword-only argument.
    pub kw_defaults: Vec<Option<Expr>>,
    pub kwarg: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptHandler {
    pub typ: Option<Expr>,
    pub name: Option<String>,
    pub body: Vec<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithItem {
    pub context: Expr,
    pub optional_vars: Option<Expr>,
}

/// `name as asname` in an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    pub asname: Option<String>,
}

impl Alias {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            asname: None,
        }
    }
}

/// Expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Name(String),
    Constant(Constant),
    /// Numeric literal, spelled as in the source.
    Num(String),
    /// String or bytes literal. `value` is the text between the quotes.
    Str {
        value: String,
        line: usize,
    },
    /// Implicitly concatenated literals (`'a' 'b'`), one `Str` per piece.
    Concat(Vec<Expr>),
    Ellipsis,

    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Argument>,
    },
    /// `value[a]`, `value[a, b:c]`: one entry per index.
    Subscript {
        value: Box<Expr>,
        slice: Vec<Expr>,
    },
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },

    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Set(Vec<Expr>),
    Dict(Vec<DictEntry>),

    ListComp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    SetComp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    DictComp {
        key: Box<Expr>,
        value: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    GeneratorExp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },

    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    BoolOp {
        op: BoolOp,
        values: Vec<Expr>,
    },
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOp>,
        comparators: Vec<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    Lambda {
        args: Box<Arguments>,
        body: Box<Expr>,
    },

    Yield(Option<Box<Expr>>),
    YieldFrom(Box<Expr>),
    Await(Box<Expr>),
    Starred(Box<Expr>),
}

impl Expr {
    pub fn name(id: impl Into<String>) -> Self {
        Expr::Name(id.into())
    }

    pub fn num(text: impl Into<String>) -> Self {
        Expr::Num(text.into())
    }

    pub fn string(value: impl Into<String>, line: usize) -> Self {
        Expr::Str {
            value: value.into(),
            line,
        }
    }

    pub fn attribute(value: Expr, attr: impl Into<String>) -> Self {
        Expr::Attribute {
            value: Box::new(value),
            attr: attr.into(),
        }
    }

    pub fn binary(left: Expr, op: BinOp, right: Expr) -> Self {
        Expr::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn compare(left: Expr, ops: Vec<CmpOp>, comparators: Vec<Expr>) -> Self {
        Expr::Compare {
            left: Box::new(left),
            ops,
            comparators,
        }
    }
}

/// `True`, `False` and `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constant {
    True,
    False,
    None,
}

/// One call argument. A call keeps its arguments in source order, which is
/// the order their string literals are queued in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Argument {
    /// `value`, or `*value` as an `Expr::Starred`.
    Positional(Expr),
    /// `name=value`.
    Keyword { name: String, value: Expr },
    /// `**value`.
    Unpack(Expr),
}

/// One `key: value` pair of a dict display; `key` is `None` for `**value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictEntry {
    pub key: Option<Expr>,
    pub value: Expr,
    pub key_line: usize,
    pub value_line: usize,
}

/// `for target in iter if cond...` inside a comprehension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comprehension {
    pub target: Expr,
    pub iter: Expr,
    pub ifs: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
    FloorDiv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Invert,
    Not,
    UAdd,
    USub,
}

/// Load/store context of a name. Python attaches one to every name; the
/// writer never renders it, but the operator table still spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExprContext {
    Load,
    Store,
    Del,
    AugLoad,
    AugStore,
    Param,
}
