//! Operator spellings.

use crate::ast::{BinOp, BoolOp, CmpOp, ExprContext, UnaryOp};
use serde::Serialize;
use std::fmt;

/// Any operator the writer may have to spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OpKind {
    Bin(BinOp),
    Bool(BoolOp),
    Cmp(CmpOp),
    Unary(UnaryOp),
    Context(ExprContext),
}

impl OpKind {
    /// Python's class name for the operator (`Add`, `NotIn`, ...).
    pub fn name(self) -> &'static str {
        match self {
            OpKind::Bin(op) => match op {
                BinOp::Add => "Add",
                BinOp::Sub => "Sub",
                BinOp::Mult => "Mult",
                BinOp::MatMult => "MatMult",
                BinOp::Div => "Div",
                BinOp::Mod => "Mod",
                BinOp::Pow => "Pow",
                BinOp::LShift => "LShift",
                BinOp::RShift => "RShift",
                BinOp::BitOr => "BitOr",
                BinOp::BitXor => "BitXor",
                BinOp::BitAnd => "BitAnd",
                BinOp::FloorDiv => "FloorDiv",
            },
            OpKind::Bool(BoolOp::And) => "And",
            OpKind::Bool(BoolOp::Or) => "Or",
            OpKind::Cmp(op) => match op {
                CmpOp::Eq => "Eq",
                CmpOp::NotEq => "NotEq",
                CmpOp::Lt => "Lt",
                CmpOp::LtE => "LtE",
                CmpOp::Gt => "Gt",
                CmpOp::GtE => "GtE",
                CmpOp::Is => "Is",
                CmpOp::IsNot => "IsNot",
                CmpOp::In => "In",
                CmpOp::NotIn => "NotIn",
            },
            OpKind::Unary(op) => match op {
                UnaryOp::Invert => "Invert",
                UnaryOp::Not => "Not",
                UnaryOp::UAdd => "UAdd",
                UnaryOp::USub => "USub",
            },
            OpKind::Context(ctx) => match ctx {
                ExprContext::Load => "Load",
                ExprContext::Store => "Store",
                ExprContext::Del => "Del",
                ExprContext::AugLoad => "AugLoad",
                ExprContext::AugStore => "AugStore",
                ExprContext::Param => "Param",
            },
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<BinOp> for OpKind {
    fn from(op: BinOp) -> Self {
        OpKind::Bin(op)
    }
}

impl From<BoolOp> for OpKind {
    fn from(op: BoolOp) -> Self {
        OpKind::Bool(op)
    }
}

impl From<CmpOp> for OpKind {
    fn from(op: CmpOp) -> Self {
        OpKind::Cmp(op)
    }
}

impl From<UnaryOp> for OpKind {
    fn from(op: UnaryOp) -> Self {
        OpKind::Unary(op)
    }
}

/// Look up the literal spelling of an operator.
///
/// Matrix multiplication has no entry: the writer either fails or emits
/// [`placeholder`], depending on strictness.
pub fn spelling(kind: OpKind) -> Option<&'static str> {
    let text = match kind {
        OpKind::Bin(op) => match op {
            BinOp::Add => "+",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::LShift => "<<",
            BinOp::Mod => "%",
            BinOp::Mult => "*",
            BinOp::Pow => "**",
            BinOp::RShift => ">>",
            BinOp::Sub => "-",
            BinOp::MatMult => return None,
        },
        OpKind::Bool(BoolOp::And) => " and ",
        OpKind::Bool(BoolOp::Or) => " or ",
        OpKind::Cmp(op) => match op {
            CmpOp::Eq => "==",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::In => " in ",
            CmpOp::Is => " is ",
            CmpOp::IsNot => " is not ",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::NotEq => "!=",
            CmpOp::NotIn => " not in ",
        },
        OpKind::Context(ctx) => match ctx {
            ExprContext::AugLoad => "<AugLoad>",
            ExprContext::AugStore => "<AugStore>",
            ExprContext::Del => "<Del>",
            ExprContext::Load => "<Load>",
            ExprContext::Param => "<Param>",
            ExprContext::Store => "<Store>",
        },
        OpKind::Unary(op) => match op {
            UnaryOp::Invert => "~",
            UnaryOp::Not => " not ",
            UnaryOp::UAdd => "+",
            UnaryOp::USub => "-",
        },
    };
    Some(text)
}

/// Bracketed stand-in for an operator missing from the table.
pub fn placeholder(kind: OpKind) -> String {
    format!("<{}>", kind.name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_spellings() {
        let table = [
            (BinOp::Add, "+"),
            (BinOp::BitAnd, "&"),
            (BinOp::BitOr, "|"),
            (BinOp::BitXor, "^"),
            (BinOp::Div, "/"),
            (BinOp::FloorDiv, "//"),
            (BinOp::LShift, "<<"),
            (BinOp::Mod, "%"),
            (BinOp::Mult, "*"),
            (BinOp::Pow, "**"),
            (BinOp::RShift, ">>"),
            (BinOp::Sub, "-"),
        ];
        for (op, text) in table {
            assert_eq!(spelling(op.into()), Some(text), "{op:?}");
        }
    }

    #[test]
    fn comparison_and_boolean_spellings_keep_padding() {
        assert_eq!(spelling(BoolOp::And.into()), Some(" and "));
        assert_eq!(spelling(BoolOp::Or.into()), Some(" or "));
        assert_eq!(spelling(CmpOp::In.into()), Some(" in "));
        assert_eq!(spelling(CmpOp::NotIn.into()), Some(" not in "));
        assert_eq!(spelling(CmpOp::Is.into()), Some(" is "));
        assert_eq!(spelling(CmpOp::IsNot.into()), Some(" is not "));
        assert_eq!(spelling(CmpOp::LtE.into()), Some("<="));
        assert_eq!(spelling(CmpOp::NotEq.into()), Some("!="));
    }

    #[test]
    fn unary_and_context_spellings() {
        assert_eq!(spelling(UnaryOp::Invert.into()), Some("~"));
        assert_eq!(spelling(UnaryOp::Not.into()), Some(" not "));
        assert_eq!(spelling(UnaryOp::USub.into()), Some("-"));
        assert_eq!(spelling(OpKind::Context(ExprContext::Store)), Some("<Store>"));
        assert_eq!(spelling(OpKind::Context(ExprContext::AugLoad)), Some("<AugLoad>"));
    }

    #[test]
    fn matmult_is_missing() {
        let kind = OpKind::from(BinOp::MatMult);
        assert_eq!(spelling(kind), None);
        assert_eq!(placeholder(kind), "<MatMult>");
        assert_eq!(kind.to_string(), "MatMult");
    }
}
