//! The immutable syntax tree produced by [`crate::parse`]. Evaluation never
//! mutates it, so parsed expressions can be shared and cached freely.

use crate::ops::{BinaryOperator, DiceSize, Float, Int, SetOperator, UnaryOperator};
use std::fmt;

/// Root of a parsed roll: the expression plus an optional trailing comment.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub roll: Node,
    pub comment: Option<String>,
}

impl Expression {
    pub fn new(roll: Node, comment: Option<String>) -> Self {
        Self { roll, comment }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.comment {
            Some(comment) => write!(f, "{} {}", self.roll, comment),
            None => fmt::Display::fmt(&self.roll, f),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A value with one or more `[bracketed]` annotations (bracket-less text).
    Annotated(Box<Node>, Vec<String>),
    Int(Int),
    Float(Float),
    Parenthetical(Box<Node>, Vec<SetOperator>),
    /// A `NumberSet`: zero, or two-plus values, or one value with a trailing
    /// comma.
    Set(Vec<Node>, Vec<SetOperator>),
    Dice {
        num: Int,
        size: DiceSize,
        ops: Vec<SetOperator>,
    },
    Unary(UnaryOperator, Box<Node>),
    Binary(Box<Node>, BinaryOperator, Box<Node>),
}

impl Node {
    pub fn annotated(value: Node, annotations: Vec<String>) -> Self {
        Self::Annotated(Box::new(value), annotations)
    }

    pub fn parenthetical(value: Node, ops: Vec<SetOperator>) -> Self {
        Self::Parenthetical(Box::new(value), ops)
    }

    pub fn unary(op: UnaryOperator, value: Node) -> Self {
        Self::Unary(op, Box::new(value))
    }

    pub fn binary(left: Node, op: BinaryOperator, right: Node) -> Self {
        Self::Binary(Box::new(left), op, Box::new(right))
    }
}

fn fmt_ops(ops: &[SetOperator], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for op in ops {
        fmt::Display::fmt(op, f)?;
    }
    Ok(())
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Annotated(value, annotations) => {
                fmt::Display::fmt(value, f)?;
                for a in annotations {
                    write!(f, " [{}]", a)?;
                }
                Ok(())
            }
            Self::Int(x) => fmt::Display::fmt(x, f),
            Self::Float(x) => fmt::Debug::fmt(x, f),
            Self::Parenthetical(value, ops) => {
                write!(f, "({})", value)?;
                fmt_ops(ops, f)
            }
            Self::Set(values, ops) => {
                f.write_str("(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(value, f)?;
                }
                if values.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")?;
                fmt_ops(ops, f)
            }
            Self::Dice { num, size, ops } => {
                write!(f, "{}d{}", num, size)?;
                fmt_ops(ops, f)
            }
            Self::Unary(op, value) => write!(f, "{}{}", op, value),
            Self::Binary(left, op, right) => write!(f, "{} {} {}", left, op, right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{SetOperatorKind, SetSelector};

    #[test]
    fn test_display_roundtrips_structure() {
        let node = Node::binary(
            Node::Dice {
                num: 2,
                size: DiceSize::Int(20),
                ops: vec![SetOperator::new(
                    SetOperatorKind::Keep,
                    vec![SetSelector::Highest(1)],
                )],
            },
            BinaryOperator::Add,
            Node::Int(3),
        );
        assert_eq!(node.to_string(), "2d20kh1 + 3");
    }

    #[test]
    fn test_display_sets() {
        let single = Node::Set(vec![Node::Int(1)], vec![]);
        assert_eq!(single.to_string(), "(1,)");

        let many = Node::Set(
            vec![Node::Int(1), Node::Int(2)],
            vec![SetOperator::new(
                SetOperatorKind::Keep,
                vec![SetSelector::Highest(1)],
            )],
        );
        assert_eq!(many.to_string(), "(1, 2)kh1");

        assert_eq!(Node::Set(vec![], vec![]).to_string(), "()");
    }

    #[test]
    fn test_display_annotations_and_floats() {
        let node = Node::annotated(
            Node::Dice {
                num: 1,
                size: DiceSize::Int(20),
                ops: vec![],
            },
            vec!["Adv.".into(), "d20".into()],
        );
        assert_eq!(node.to_string(), "1d20 [Adv.] [d20]");
        assert_eq!(Node::Float(2.0).to_string(), "2.0");
        assert_eq!(
            Node::Dice {
                num: 2,
                size: DiceSize::Percentile,
                ops: vec![]
            }
            .to_string(),
            "2d%"
        );
    }
}
