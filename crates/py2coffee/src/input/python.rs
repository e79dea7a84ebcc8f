//! Tree-sitter based Python reader.
//!
//! Lowers the concrete syntax tree into [`crate::ast`]. Positions become
//! 1-based lines; a string literal records its *end* line, which is where the
//! token index buckets its token.

use crate::ast::*;
use crate::traits::{ReadError, Reader};
use tree_sitter::{Node, Parser, Tree};

/// Static instance of the Python reader.
pub static PYTHON_READER: PythonReader = PythonReader;

/// Python reader using tree-sitter.
pub struct PythonReader;

impl Reader for PythonReader {
    fn language(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn read(&self, source: &str) -> Result<Module, ReadError> {
        read_python(source)
    }
}

/// Parse Python source into the syntax tree.
pub fn read_python(source: &str) -> Result<Module, ReadError> {
    let mut parser = Parser::new();
    parser
        .set_language(&arborium_python::language().into())
        .map_err(|err| ReadError::Parse(err.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ReadError::Parse("failed to parse".into()))?;

    let ctx = ReadContext::new(source);
    ctx.read_module(&tree)
}

fn line(node: Node) -> usize {
    node.start_position().row + 1
}

fn end_line(node: Node) -> usize {
    node.end_position().row + 1
}

/// Named children, without comments.
fn named<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn fields<'t>(node: Node<'t>, field: &'static str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

fn field<'t>(node: Node<'t>, field: &'static str) -> Result<Node<'t>, ReadError> {
    node.child_by_field_name(field)
        .ok_or_else(|| missing(node, field))
}

fn first_named<'t>(node: Node<'t>, what: &'static str) -> Result<Node<'t>, ReadError> {
    named(node)
        .into_iter()
        .next()
        .ok_or_else(|| missing(node, what))
}

fn missing(node: Node, field: &'static str) -> ReadError {
    ReadError::MissingField {
        node: node.kind().to_string(),
        field,
        line: line(node),
    }
}

fn unsupported(node: Node) -> ReadError {
    ReadError::UnsupportedNodeKind {
        kind: node.kind().to_string(),
        line: line(node),
    }
}

fn first_error<'t>(node: Node<'t>) -> Option<Node<'t>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error)
}

fn binary_op(text: &str) -> Option<BinOp> {
    let op = match text {
        "+" => BinOp::Add,
        "-" => BinOp::Sub,
        "*" => BinOp::Mult,
        "@" => BinOp::MatMult,
        "/" => BinOp::Div,
        "//" => BinOp::FloorDiv,
        "%" => BinOp::Mod,
        "**" => BinOp::Pow,
        "<<" => BinOp::LShift,
        ">>" => BinOp::RShift,
        "|" => BinOp::BitOr,
        "^" => BinOp::BitXor,
        "&" => BinOp::BitAnd,
        _ => return None,
    };
    Some(op)
}

fn compare_op(text: &str) -> Option<CmpOp> {
    let op = match text {
        "==" => CmpOp::Eq,
        "!=" | "<>" => CmpOp::NotEq,
        "<" => CmpOp::Lt,
        "<=" => CmpOp::LtE,
        ">" => CmpOp::Gt,
        ">=" => CmpOp::GtE,
        "is" => CmpOp::Is,
        "is not" => CmpOp::IsNot,
        "in" => CmpOp::In,
        "not in" => CmpOp::NotIn,
        _ => return None,
    };
    Some(op)
}

struct ReadContext<'a> {
    source: &'a str,
}

impl<'a> ReadContext<'a> {
    fn new(source: &'a str) -> Self {
        Self { source }
    }

    fn node_text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn read_module(&self, tree: &Tree) -> Result<Module, ReadError> {
        let root = tree.root_node();

        if root.has_error() {
            let at = first_error(root).map(line).unwrap_or(1);
            return Err(ReadError::Parse(format!("syntax error on line {at}")));
        }

        Ok(Module::new(self.read_block(root)?))
    }

    fn read_block(&self, node: Node) -> Result<Vec<Stmt>, ReadError> {
        named(node)
            .into_iter()
            .map(|child| self.read_stmt(child))
            .collect()
    }

    fn read_exprs(&self, nodes: &[Node]) -> Result<Vec<Expr>, ReadError> {
        nodes.iter().map(|node| self.read_expr(*node)).collect()
    }

    fn read_stmt(&self, node: Node) -> Result<Stmt, ReadError> {
        let line = line(node);
        match node.kind() {
            "expression_statement" => self.read_expression_statement(node),
            "assignment" => self.read_assignment(node, line),
            "augmented_assignment" => self.read_augmented_assignment(node, line),

            "if_statement" => {
                let test = self.read_expr(field(node, "condition")?)?;
                let body = self.read_block(field(node, "consequence")?)?;
                let (orelse, else_line) = self.read_alternatives(&fields(node, "alternative"))?;
                Ok(Stmt::If {
                    test,
                    body,
                    orelse,
                    else_line,
                    line,
                })
            }
            "for_statement" => {
                let target = self.read_expr(field(node, "left")?)?;
                let iter = self.read_expr(field(node, "right")?)?;
                let body = self.read_block(field(node, "body")?)?;
                let (orelse, else_line) = self.read_alternatives(&fields(node, "alternative"))?;
                Ok(Stmt::For {
                    target,
                    iter,
                    body,
                    orelse,
                    else_line,
                    line,
                })
            }
            "while_statement" => {
                let test = self.read_expr(field(node, "condition")?)?;
                let body = self.read_block(field(node, "body")?)?;
                let (orelse, else_line) = self.read_alternatives(&fields(node, "alternative"))?;
                Ok(Stmt::While {
                    test,
                    body,
                    orelse,
                    else_line,
                    line,
                })
            }
            "try_statement" => self.read_try(node),
            "with_statement" => self.read_with(node),

            "function_definition" => Ok(Stmt::FunctionDef(self.read_function(node, Vec::new())?)),
            "class_definition" => Ok(Stmt::ClassDef(self.read_class(node, Vec::new())?)),
            "decorated_definition" => self.read_decorated(node),

            "import_statement" => Ok(Stmt::Import {
                names: self.read_aliases(node)?,
                line,
            }),
            "import_from_statement" => {
                let module = self.node_text(field(node, "module_name")?).to_string();
                let wildcard = named(node)
                    .iter()
                    .any(|child| child.kind() == "wildcard_import");
                let names = if wildcard {
                    vec![Alias::new("*")]
                } else {
                    self.read_aliases(node)?
                };
                Ok(Stmt::ImportFrom {
                    module,
                    names,
                    line,
                })
            }
            "future_import_statement" => Ok(Stmt::ImportFrom {
                module: "__future__".to_string(),
                names: self.read_aliases(node)?,
                line,
            }),

            "return_statement" => {
                let value = named(node)
                    .first()
                    .map(|child| self.read_expr(*child))
                    .transpose()?;
                Ok(Stmt::Return { value, line })
            }
            "raise_statement" => {
                let cause = node.child_by_field_name("cause");
                let exc = named(node)
                    .into_iter()
                    .find(|child| Some(*child) != cause)
                    .map(|child| self.read_expr(child))
                    .transpose()?;
                let cause = cause.map(|cause| self.read_expr(cause)).transpose()?;
                Ok(Stmt::Raise { exc, cause, line })
            }
            "delete_statement" => {
                let target = first_named(node, "target")?;
                let targets = if target.kind() == "expression_list" {
                    self.read_exprs(&named(target))?
                } else {
                    vec![self.read_expr(target)?]
                };
                Ok(Stmt::Delete { targets, line })
            }
            "assert_statement" => {
                let parts = named(node);
                let (test, msg) = match parts.as_slice() {
                    [test] => (self.read_expr(*test)?, None),
                    [test, msg, ..] => (self.read_expr(*test)?, Some(self.read_expr(*msg)?)),
                    [] => return Err(missing(node, "test")),
                };
                Ok(Stmt::Assert { test, msg, line })
            }
            "global_statement" => Ok(Stmt::Global {
                names: self.read_names(node),
                line,
            }),
            "nonlocal_statement" => Ok(Stmt::Nonlocal {
                names: self.read_names(node),
                line,
            }),
            "print_statement" => {
                let values = self.read_exprs(&fields(node, "argument"))?;
                let dest = named(node)
                    .into_iter()
                    .find(|child| child.kind() == "chevron")
                    .map(|chevron| first_named(chevron, "destination"))
                    .transpose()?
                    .map(|dest| self.read_expr(dest))
                    .transpose()?;
                Ok(Stmt::Print { values, dest, line })
            }
            "exec_statement" => {
                let code = field(node, "code")?;
                let scopes: Vec<Node> = named(node)
                    .into_iter()
                    .filter(|child| *child != code)
                    .collect();
                let mut scopes = self.read_exprs(&scopes)?.into_iter();
                Ok(Stmt::Exec {
                    body: self.read_expr(code)?,
                    globals: scopes.next(),
                    locals: scopes.next(),
                    line,
                })
            }

            "pass_statement" => Ok(Stmt::Pass { line }),
            "break_statement" => Ok(Stmt::Break { line }),
            "continue_statement" => Ok(Stmt::Continue { line }),

            // Calls, docstrings, `await`, bare tuples. Statement kinds
            // without a rule fail in `read_expr` as unsupported.
            _ => Ok(Stmt::Expr {
                value: self.read_expr(node)?,
                line,
            }),
        }
    }

    /// Grammars that wrap statement-level expressions in
    /// `expression_statement`.
    fn read_expression_statement(&self, node: Node) -> Result<Stmt, ReadError> {
        let line = line(node);
        let children = named(node);
        match children.as_slice() {
            [child] => match child.kind() {
                "assignment" => self.read_assignment(*child, line),
                "augmented_assignment" => self.read_augmented_assignment(*child, line),
                _ => Ok(Stmt::Expr {
                    value: self.read_expr(*child)?,
                    line,
                }),
            },
            // `a, b` as a bare statement.
            _ => Ok(Stmt::Expr {
                value: Expr::Tuple(self.read_exprs(&children)?),
                line,
            }),
        }
    }

    fn read_augmented_assignment(&self, node: Node, line: usize) -> Result<Stmt, ReadError> {
        let op_text = self.node_text(field(node, "operator")?);
        let op = binary_op(op_text.trim_end_matches('=')).ok_or_else(|| unsupported(node))?;
        Ok(Stmt::AugAssign {
            target: self.read_expr(field(node, "left")?)?,
            op,
            value: self.read_expr(field(node, "right")?)?,
            line,
        })
    }

    /// `a = b = value` nests assignments on the right; flatten the targets.
    fn read_assignment(&self, node: Node, line: usize) -> Result<Stmt, ReadError> {
        let mut targets = Vec::new();
        let mut current = node;
        loop {
            targets.push(self.read_expr(field(current, "left")?)?);
            // A bare annotation (`x: int`) has no value to render.
            let right = current
                .child_by_field_name("right")
                .ok_or_else(|| unsupported(current))?;
            match right.kind() {
                "assignment" => current = right,
                "augmented_assignment" => return Err(unsupported(right)),
                _ => {
                    return Ok(Stmt::Assign {
                        targets,
                        value: self.read_expr(right)?,
                        line,
                    });
                }
            }
        }
    }

    /// `elif`/`else` clauses, folded into nested `If`s.
    fn read_alternatives(&self, alternatives: &[Node]) -> Result<(Vec<Stmt>, Option<usize>), ReadError> {
        let Some((first, rest)) = alternatives.split_first() else {
            return Ok((Vec::new(), None));
        };
        match first.kind() {
            "else_clause" => Ok((
                self.read_block(field(*first, "body")?)?,
                Some(line(*first)),
            )),
            "elif_clause" => {
                let test = self.read_expr(field(*first, "condition")?)?;
                let body = self.read_block(field(*first, "consequence")?)?;
                let (orelse, else_line) = self.read_alternatives(rest)?;
                let nested = Stmt::If {
                    test,
                    body,
                    orelse,
                    else_line,
                    line: line(*first),
                };
                Ok((vec![nested], None))
            }
            _ => Err(unsupported(*first)),
        }
    }

    fn read_try(&self, node: Node) -> Result<Stmt, ReadError> {
        let body = self.read_block(field(node, "body")?)?;
        let mut handlers = Vec::new();
        let mut orelse = Vec::new();
        let mut else_line = None;
        let mut finalbody = Vec::new();
        let mut finally_line = None;

        for child in named(node) {
            match child.kind() {
                "except_clause" | "except_group_clause" => handlers.push(self.read_handler(child)?),
                "else_clause" => {
                    orelse = self.read_block(field(child, "body")?)?;
                    else_line = Some(line(child));
                }
                "finally_clause" => {
                    let block = named(child)
                        .into_iter()
                        .find(|c| c.kind() == "block")
                        .ok_or_else(|| missing(child, "block"))?;
                    finalbody = self.read_block(block)?;
                    finally_line = Some(line(child));
                }
                _ => {}
            }
        }

        Ok(Stmt::Try {
            body,
            handlers,
            orelse,
            else_line,
            finalbody,
            finally_line,
            line: line(node),
        })
    }

    fn read_handler(&self, node: Node) -> Result<ExceptHandler, ReadError> {
        let mut block = None;
        let mut parts = Vec::new();
        for child in named(node) {
            if child.kind() == "block" {
                block = Some(child);
            } else {
                parts.push(child);
            }
        }
        let block = block.ok_or_else(|| missing(node, "block"))?;

        let (typ, name) = match parts.as_slice() {
            [] => (None, None),
            [pattern] if pattern.kind() == "as_pattern" => {
                let typ = self.read_expr(first_named(*pattern, "value")?)?;
                let alias = field(*pattern, "alias")?;
                (Some(typ), Some(self.node_text(alias).to_string()))
            }
            [typ] => (Some(self.read_expr(*typ)?), None),
            [typ, name, ..] => (
                Some(self.read_expr(*typ)?),
                Some(self.node_text(*name).to_string()),
            ),
        };

        Ok(ExceptHandler {
            typ,
            name,
            body: self.read_block(block)?,
            line: line(node),
        })
    }

    fn read_with(&self, node: Node) -> Result<Stmt, ReadError> {
        let clause = named(node)
            .into_iter()
            .find(|child| child.kind() == "with_clause")
            .ok_or_else(|| missing(node, "with_clause"))?;

        let mut items = Vec::new();
        for item in named(clause) {
            let value = field(item, "value")?;
            if value.kind() == "as_pattern" {
                let context = self.read_expr(first_named(value, "value")?)?;
                let alias = field(value, "alias")?;
                let target = match named(alias).first() {
                    Some(target) => self.read_expr(*target)?,
                    None => Expr::name(self.node_text(alias)),
                };
                items.push(WithItem {
                    context,
                    optional_vars: Some(target),
                });
            } else {
                items.push(WithItem {
                    context: self.read_expr(value)?,
                    optional_vars: None,
                });
            }
        }

        Ok(Stmt::With {
            items,
            body: self.read_block(field(node, "body")?)?,
            line: line(node),
        })
    }

    fn read_decorated(&self, node: Node) -> Result<Stmt, ReadError> {
        let mut decorators = Vec::new();
        for child in named(node) {
            if child.kind() == "decorator" {
                decorators.push(Decorator {
                    expr: self.read_expr(first_named(child, "expression")?)?,
                    line: line(child),
                });
            }
        }

        let definition = field(node, "definition")?;
        match definition.kind() {
            "function_definition" => Ok(Stmt::FunctionDef(
                self.read_function(definition, decorators)?,
            )),
            "class_definition" => Ok(Stmt::ClassDef(self.read_class(definition, decorators)?)),
            _ => Err(unsupported(definition)),
        }
    }

    fn read_function(&self, node: Node, decorators: Vec<Decorator>) -> Result<FunctionDef, ReadError> {
        let name = self.node_text(field(node, "name")?).to_string();
        let args = node
            .child_by_field_name("parameters")
            .map(|params| self.read_parameters(params))
            .transpose()?
            .unwrap_or_default();
        let body = self.read_block(field(node, "body")?)?;

        Ok(FunctionDef {
            name,
            args,
            body,
            decorators,
            line: line(node),
        })
    }

    fn read_class(&self, node: Node, decorators: Vec<Decorator>) -> Result<ClassDef, ReadError> {
        let name = self.node_text(field(node, "name")?).to_string();
        // Keyword arguments (`metaclass=...`) are not bases.
        let bases = match node.child_by_field_name("superclasses") {
            Some(list) => {
                let positional: Vec<Node> = named(list)
                    .into_iter()
                    .filter(|child| child.kind() != "keyword_argument")
                    .collect();
                self.read_exprs(&positional)?
            }
            None => Vec::new(),
        };
        let body = self.read_block(field(node, "body")?)?;

        Ok(ClassDef {
            name,
            bases,
            body,
            decorators,
            line: line(node),
        })
    }

    fn read_parameters(&self, node: Node) -> Result<Arguments, ReadError> {
        let mut args = Arguments::default();
        // Set once `*` or `*args` has been seen.
        let mut keyword_only = false;

        for child in named(node) {
            match child.kind() {
                "identifier" => push_param(&mut args, keyword_only, self.node_text(child), None),
                "typed_parameter" => {
                    let inner = first_named(child, "name")?;
                    match inner.kind() {
                        "list_splat_pattern" => {
                            args.vararg = Some(self.splat_name(inner));
                            keyword_only = true;
                        }
                        "dictionary_splat_pattern" => args.kwarg = Some(self.splat_name(inner)),
                        _ => push_param(&mut args, keyword_only, self.node_text(inner), None),
                    }
                }
                "default_parameter" | "typed_default_parameter" => {
                    let name = self.node_text(field(child, "name")?);
                    let value = self.read_expr(field(child, "value")?)?;
                    push_param(&mut args, keyword_only, name, Some(value));
                }
                "list_splat_pattern" => {
                    args.vararg = Some(self.splat_name(child));
                    keyword_only = true;
                }
                "dictionary_splat_pattern" => args.kwarg = Some(self.splat_name(child)),
                "keyword_separator" => keyword_only = true,
                "positional_separator" => {}
                _ => return Err(unsupported(child)),
            }
        }

        Ok(args)
    }

    fn splat_name(&self, node: Node) -> String {
        match named(node).first() {
            Some(name) => self.node_text(*name).to_string(),
            None => self.node_text(node).trim_start_matches('*').to_string(),
        }
    }

    fn read_aliases(&self, node: Node) -> Result<Vec<Alias>, ReadError> {
        fields(node, "name")
            .into_iter()
            .map(|name| match name.kind() {
                "aliased_import" => Ok(Alias {
                    name: self.node_text(field(name, "name")?).to_string(),
                    asname: Some(self.node_text(field(name, "alias")?).to_string()),
                }),
                _ => Ok(Alias::new(self.node_text(name))),
            })
            .collect()
    }

    fn read_names(&self, node: Node) -> Vec<String> {
        named(node)
            .into_iter()
            .map(|child| self.node_text(child).to_string())
            .collect()
    }

    fn read_expr(&self, node: Node) -> Result<Expr, ReadError> {
        match node.kind() {
            "identifier" | "keyword_identifier" => Ok(Expr::name(self.node_text(node))),
            "true" => Ok(Expr::Constant(Constant::True)),
            "false" => Ok(Expr::Constant(Constant::False)),
            "none" => Ok(Expr::Constant(Constant::None)),
            "integer" | "float" => Ok(Expr::num(self.node_text(node))),
            "string" => Ok(self.read_string(node)),
            "concatenated_string" => Ok(Expr::Concat(
                named(node)
                    .into_iter()
                    .map(|piece| self.read_string(piece))
                    .collect(),
            )),
            "ellipsis" => Ok(Expr::Ellipsis),

            "attribute" => {
                let object = self.read_expr(field(node, "object")?)?;
                let attr = self.node_text(field(node, "attribute")?);
                Ok(Expr::attribute(object, attr))
            }
            "call" => self.read_call(node),
            "subscript" => {
                let value = self.read_expr(field(node, "value")?)?;
                let slice = self.read_exprs(&fields(node, "subscript"))?;
                Ok(Expr::Subscript {
                    value: Box::new(value),
                    slice,
                })
            }
            "slice" => self.read_slice(node),

            "list" | "list_pattern" => Ok(Expr::List(self.read_exprs(&named(node))?)),
            "tuple" | "tuple_pattern" | "expression_list" | "pattern_list" => {
                Ok(Expr::Tuple(self.read_exprs(&named(node))?))
            }
            "set" => Ok(Expr::Set(self.read_exprs(&named(node))?)),
            "dictionary" => self.read_dictionary(node),

            "list_comprehension" => Ok(Expr::ListComp {
                elt: Box::new(self.read_expr(field(node, "body")?)?),
                generators: self.read_generators(node)?,
            }),
            "set_comprehension" => Ok(Expr::SetComp {
                elt: Box::new(self.read_expr(field(node, "body")?)?),
                generators: self.read_generators(node)?,
            }),
            "generator_expression" => Ok(Expr::GeneratorExp {
                elt: Box::new(self.read_expr(field(node, "body")?)?),
                generators: self.read_generators(node)?,
            }),
            "dictionary_comprehension" => {
                let pair = field(node, "body")?;
                Ok(Expr::DictComp {
                    key: Box::new(self.read_expr(field(pair, "key")?)?),
                    value: Box::new(self.read_expr(field(pair, "value")?)?),
                    generators: self.read_generators(node)?,
                })
            }

            "binary_operator" => {
                let left = self.read_expr(field(node, "left")?)?;
                let op = binary_op(self.node_text(field(node, "operator")?))
                    .ok_or_else(|| unsupported(node))?;
                let right = self.read_expr(field(node, "right")?)?;
                Ok(Expr::binary(left, op, right))
            }
            "boolean_operator" => self.read_boolean_operator(node),
            "comparison_operator" => self.read_comparison_operator(node),
            "not_operator" => Ok(Expr::unary(
                UnaryOp::Not,
                self.read_expr(field(node, "argument")?)?,
            )),
            "unary_operator" => {
                let op = match self.node_text(field(node, "operator")?) {
                    "-" => UnaryOp::USub,
                    "+" => UnaryOp::UAdd,
                    "~" => UnaryOp::Invert,
                    _ => return Err(unsupported(node)),
                };
                Ok(Expr::unary(op, self.read_expr(field(node, "argument")?)?))
            }

            "parenthesized_expression" | "parenthesized_list_splat" => {
                self.read_expr(first_named(node, "expression")?)
            }
            "conditional_expression" => match named(node).as_slice() {
                [body, test, orelse] => Ok(Expr::IfExp {
                    test: Box::new(self.read_expr(*test)?),
                    body: Box::new(self.read_expr(*body)?),
                    orelse: Box::new(self.read_expr(*orelse)?),
                }),
                _ => Err(missing(node, "orelse")),
            },
            "lambda" => {
                let args = node
                    .child_by_field_name("parameters")
                    .map(|params| self.read_parameters(params))
                    .transpose()?
                    .unwrap_or_default();
                Ok(Expr::Lambda {
                    args: Box::new(args),
                    body: Box::new(self.read_expr(field(node, "body")?)?),
                })
            }

            "yield" => {
                let mut cursor = node.walk();
                let from = node.children(&mut cursor).any(|child| child.kind() == "from");
                let value = named(node)
                    .first()
                    .map(|value| self.read_expr(*value))
                    .transpose()?
                    .map(Box::new);
                match (from, value) {
                    (true, Some(value)) => Ok(Expr::YieldFrom(value)),
                    (true, None) => Err(missing(node, "value")),
                    (false, value) => Ok(Expr::Yield(value)),
                }
            }
            "await" => Ok(Expr::Await(Box::new(
                self.read_expr(first_named(node, "value")?)?,
            ))),
            "list_splat" | "list_splat_pattern" => Ok(Expr::Starred(Box::new(
                self.read_expr(first_named(node, "value")?)?,
            ))),

            _ => Err(unsupported(node)),
        }
    }

    /// String literal; the value is the text between the delimiters.
    fn read_string(&self, node: Node) -> Expr {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        let start = children
            .iter()
            .find(|child| child.kind() == "string_start")
            .map(|child| child.end_byte());
        let end = children
            .iter()
            .rev()
            .find(|child| child.kind() == "string_end")
            .map(|child| child.start_byte());

        let value = match (start, end) {
            (Some(start), Some(end)) if start <= end => {
                self.source.get(start..end).unwrap_or("").to_string()
            }
            _ => self
                .node_text(node)
                .trim_start_matches(|c: char| c.is_ascii_alphabetic())
                .trim_matches(|c| c == '"' || c == '\'')
                .to_string(),
        };
        Expr::string(value, end_line(node))
    }

    fn read_call(&self, node: Node) -> Result<Expr, ReadError> {
        let func = self.read_expr(field(node, "function")?)?;
        let arguments = field(node, "arguments")?;

        let args = if arguments.kind() == "generator_expression" {
            vec![Argument::Positional(self.read_expr(arguments)?)]
        } else {
            named(arguments)
                .into_iter()
                .map(|child| match child.kind() {
                    "keyword_argument" => Ok(Argument::Keyword {
                        name: self.node_text(field(child, "name")?).to_string(),
                        value: self.read_expr(field(child, "value")?)?,
                    }),
                    "dictionary_splat" => Ok(Argument::Unpack(
                        self.read_expr(first_named(child, "value")?)?,
                    )),
                    _ => Ok(Argument::Positional(self.read_expr(child)?)),
                })
                .collect::<Result<_, ReadError>>()?
        };

        Ok(Expr::Call {
            func: Box::new(func),
            args,
        })
    }

    /// `lower:upper:step`; the parts are told apart by the colons before them.
    fn read_slice(&self, node: Node) -> Result<Expr, ReadError> {
        let mut parts: [Option<Box<Expr>>; 3] = [None, None, None];
        let mut index = 0;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == ":" {
                index += 1;
            } else if child.is_named() && child.kind() != "comment" && index < parts.len() {
                parts[index] = Some(Box::new(self.read_expr(child)?));
            }
        }
        let [lower, upper, step] = parts;
        Ok(Expr::Slice { lower, upper, step })
    }

    fn read_dictionary(&self, node: Node) -> Result<Expr, ReadError> {
        let mut entries = Vec::new();
        for child in named(node) {
            match child.kind() {
                "pair" => {
                    let key = field(child, "key")?;
                    let value = field(child, "value")?;
                    entries.push(DictEntry {
                        key: Some(self.read_expr(key)?),
                        value: self.read_expr(value)?,
                        key_line: line(key),
                        value_line: line(value),
                    });
                }
                "dictionary_splat" => entries.push(DictEntry {
                    key: None,
                    value: self.read_expr(first_named(child, "value")?)?,
                    key_line: line(child),
                    value_line: line(child),
                }),
                _ => return Err(unsupported(child)),
            }
        }
        Ok(Expr::Dict(entries))
    }

    /// `for`/`if` clauses of a comprehension; each `if` belongs to the
    /// `for` before it.
    fn read_generators(&self, node: Node) -> Result<Vec<Comprehension>, ReadError> {
        let mut generators: Vec<Comprehension> = Vec::new();
        for child in named(node) {
            match child.kind() {
                "for_in_clause" => {
                    let target = self.read_expr(field(child, "left")?)?;
                    let rights = fields(child, "right");
                    let iter = match rights.as_slice() {
                        [single] => self.read_expr(*single)?,
                        _ => Expr::Tuple(self.read_exprs(&rights)?),
                    };
                    generators.push(Comprehension {
                        target,
                        iter,
                        ifs: Vec::new(),
                    });
                }
                "if_clause" => {
                    let cond = self.read_expr(first_named(child, "condition")?)?;
                    match generators.last_mut() {
                        Some(generator) => generator.ifs.push(cond),
                        None => return Err(unsupported(child)),
                    }
                }
                _ => {}
            }
        }
        Ok(generators)
    }

    /// `a or b or c` nests on the left; runs of one operator flatten into a
    /// single node.
    fn read_boolean_operator(&self, node: Node) -> Result<Expr, ReadError> {
        let op_text = self.node_text(field(node, "operator")?);
        let op = match op_text {
            "and" => BoolOp::And,
            "or" => BoolOp::Or,
            _ => return Err(unsupported(node)),
        };

        let left = field(node, "left")?;
        let mut values = Vec::new();
        let same_op = left.kind() == "boolean_operator"
            && left
                .child_by_field_name("operator")
                .is_some_and(|inner| self.node_text(inner) == op_text);
        match self.read_expr(left)? {
            Expr::BoolOp { values: inner, .. } if same_op => values.extend(inner),
            other => values.push(other),
        }
        values.push(self.read_expr(field(node, "right")?)?);

        Ok(Expr::BoolOp { op, values })
    }

    /// Operands are the named children; the anonymous tokens between two
    /// operands spell one operator (`not` `in` is a single `not in`).
    fn read_comparison_operator(&self, node: Node) -> Result<Expr, ReadError> {
        let mut operands = Vec::new();
        let mut ops = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if !child.is_named() {
                pending.extend(self.node_text(child).split_whitespace());
                continue;
            }
            if child.kind() == "comment" {
                continue;
            }
            if !pending.is_empty() {
                let op = compare_op(&pending.join(" ")).ok_or_else(|| unsupported(node))?;
                ops.push(op);
                pending.clear();
            }
            operands.push(self.read_expr(child)?);
        }

        let mut operands = operands.into_iter();
        let left = operands.next().ok_or_else(|| missing(node, "left"))?;
        Ok(Expr::compare(left, ops, operands.collect()))
    }
}

fn push_param(args: &mut Arguments, keyword_only: bool, name: &str, default: Option<Expr>) {
    if keyword_only {
        args.kwonlyargs.push(name.to_string());
        args.kw_defaults.push(default);
    } else {
        args.args.push(name.to_string());
        args.defaults.extend(default);
    }
}
