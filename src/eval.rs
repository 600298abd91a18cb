//! Walks the AST and produces a fresh result tree, rolling dice as it goes.
//!
//! Evaluation is a single pass with pattern matching; the AST is never
//! mutated. A [`RollContext`] enforces two budgets across one top-level call:
//! faces generated and AST nodes visited.

use crate::ast;
use crate::error::RollError;
use crate::ops::{DiceSize, Int, Val};
use crate::rng::{DefaultRng, DieRoller};
use crate::tree::{BinOp, Dice, Expression, Literal, Number, NumberKind, Parenthetical, Set, UnOp};

/// Default ceiling on faces generated per call (initial rolls, rerolls, and
/// explosions all count).
pub const DEFAULT_MAX_ROLLS: usize = 1000;
/// Default ceiling on AST nodes visited per call.
pub const DEFAULT_MAX_OPS: usize = 10_000;

/// Owns the RNG and the per-call budgets. Created fresh for every top-level
/// evaluation and discarded afterwards.
pub struct RollContext<R = DefaultRng> {
    rng: R,
    max_rolls: usize,
    max_ops: usize,
    rolls: usize,
    ops: usize,
}

impl<R: DieRoller> RollContext<R> {
    pub fn new(rng: R) -> Self {
        Self::with_limits(rng, DEFAULT_MAX_ROLLS, DEFAULT_MAX_OPS)
    }

    pub fn with_limits(rng: R, max_rolls: usize, max_ops: usize) -> Self {
        Self {
            rng,
            max_rolls,
            max_ops,
            rolls: 0,
            ops: 0,
        }
    }

    fn count_roll(&mut self) -> crate::Result<()> {
        self.rolls += 1;
        if self.rolls > self.max_rolls {
            Err(RollError::TooManyRolls)
        } else {
            Ok(())
        }
    }

    fn count_op(&mut self) -> crate::Result<()> {
        self.ops += 1;
        if self.ops > self.max_ops {
            Err(RollError::TooManyRolls)
        } else {
            Ok(())
        }
    }

    /// Generates one face. The budget ticks before the face materializes, so
    /// limits fail before allocation; size-0 dice tick but yield no face.
    pub(crate) fn roll_face(&mut self, size: DiceSize) -> crate::Result<Option<Int>> {
        self.count_roll()?;
        Ok(match size {
            DiceSize::Int(s) if s < 1 => None,
            DiceSize::Int(s) => Some(self.rng.roll_die(s as u64) as Int),
            DiceSize::Percentile => Some((self.rng.roll_die(10) as Int - 1) * 10),
        })
    }
}

impl Default for RollContext {
    fn default() -> Self {
        Self::new(DefaultRng::default())
    }
}

/// Evaluates a parsed expression into a result tree.
pub fn eval<R: DieRoller>(
    expr: &ast::Expression,
    ctx: &mut RollContext<R>,
) -> crate::Result<Expression> {
    let roll = eval_node(&expr.roll, ctx)?;
    Ok(Expression::new(roll, expr.comment.clone()))
}

fn eval_node<R: DieRoller>(node: &ast::Node, ctx: &mut RollContext<R>) -> crate::Result<Number> {
    ctx.count_op()?;
    match node {
        ast::Node::Annotated(value, annotations) => {
            let mut ret = eval_node(value, ctx)?;
            let joined = annotations
                .iter()
                .map(|a| format!("[{}]", a))
                .collect::<Vec<_>>()
                .join(" ");
            ret.annotation = Some(joined);
            Ok(ret)
        }
        ast::Node::Int(x) => Ok(Number::new(NumberKind::Literal(Literal::new(Val::Int(*x))))),
        ast::Node::Float(x) => Ok(Number::new(NumberKind::Literal(Literal::new(Val::Float(
            *x,
        ))))),
        ast::Node::Parenthetical(value, ops) => {
            let inner = eval_node(value, ctx)?;
            let mut ret = Parenthetical::new(inner);
            for op in ops {
                op.operate_on_parenthetical(&mut ret)?;
                ret.operations.push(op.clone());
            }
            Ok(Number::new(NumberKind::Parenthetical(ret)))
        }
        ast::Node::Set(values, ops) => {
            let members = values
                .iter()
                .map(|v| eval_node(v, ctx))
                .collect::<crate::Result<Vec<_>>>()?;
            let mut ret = Set::new(members);
            for op in ops {
                op.operate_on_set(&mut ret)?;
                ret.operations.push(op.clone());
            }
            Ok(Number::new(NumberKind::Set(ret)))
        }
        ast::Node::Dice { num, size, ops } => {
            let mut ret = Dice::roll_new(*num, *size, ctx)?;
            for op in ops {
                op.operate_on_dice(&mut ret, ctx)?;
                ret.operations.push(op.clone());
            }
            Ok(Number::new(NumberKind::Dice(ret)))
        }
        ast::Node::Unary(op, value) => {
            let value = eval_node(value, ctx)?;
            Ok(Number::new(NumberKind::UnOp(UnOp::new(*op, value))))
        }
        ast::Node::Binary(left, op, right) => {
            let left = eval_node(left, ctx)?;
            let right = eval_node(right, ctx)?;
            Ok(Number::new(NumberKind::BinOp(BinOp::new(left, *op, right))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::FixedRoller;
    use crate::tree::NumberTrait;

    fn eval_str(s: &str, faces: Vec<u64>) -> crate::Result<Expression> {
        let ast = crate::parse::parse(s, false).unwrap();
        let mut ctx = RollContext::new(FixedRoller::new(faces));
        eval(&ast, &mut ctx)
    }

    fn check(s: &str, faces: Vec<u64>, expected: Val) {
        let result = eval_str(s, faces).unwrap();
        let total = result.total().unwrap();
        assert_eq!(total, expected, "evaluating {:?}", s);
    }

    #[test]
    fn test_eval_numbers() {
        check("2", vec![], Val::Int(2));
        check("2.0", vec![], Val::Float(2.0));
    }

    #[test]
    fn test_eval_unary() {
        check("-2", vec![], Val::Int(-2));
        check("--2", vec![], Val::Int(2));
    }

    #[test]
    fn test_eval_binary() {
        check("2 + 3", vec![], Val::Int(5));
        check("3.5 % 2", vec![], Val::Float(1.5));
        check("2 * (1 - 3)", vec![], Val::Int(-4));
        check("7 // 2", vec![], Val::Int(3));
        check("-7 // 2", vec![], Val::Int(-3));
        check("2 == 2", vec![], Val::Int(1));
        check("1 + 2 == 2", vec![], Val::Int(0));
    }

    #[test]
    fn test_eval_division_by_zero() {
        for expr in ["1 / 0", "1 // 0", "1 % 0"] {
            assert!(
                matches!(eval_str(expr, vec![]), Err(RollError::Value(_))),
                "{} should fail",
                expr
            );
        }
    }

    #[test]
    fn test_eval_dice() {
        check("1d20 + 4", vec![10], Val::Int(14));
        check("2d6", vec![3, 5], Val::Int(8));
        check("1d%", vec![4], Val::Int(30));
    }

    #[test]
    fn test_eval_sets() {
        check("(1, 2, 3)", vec![], Val::Int(6));
        check("()", vec![], Val::Int(0));
        check("(2d6, 1d6)", vec![1, 2, 3], Val::Int(6));
        check("(1, 2, 3)kh2", vec![], Val::Int(5));
    }

    #[test]
    fn test_eval_zero_size_dice() {
        let result = eval_str("3d0", vec![]).unwrap();
        assert_eq!(result.total().unwrap(), Val::Int(0));
        match &result.roll.kind {
            NumberKind::Dice(dice) => {
                assert_eq!(dice.values.len(), 3);
                assert!(dice.values.iter().all(|d| d.values.is_empty()));
            }
            other => panic!("expected dice, got {:?}", other),
        }
    }

    #[test]
    fn test_eval_operated_dice() {
        check("2d20kh1", vec![10, 11], Val::Int(11));
        check("4d6rr1", vec![1, 3, 4, 1, 5, 6], Val::Int(18));
        check("2d6e6", vec![6, 2, 3], Val::Int(11));
        check("4d6mi3", vec![1, 2, 5, 6], Val::Int(17));
    }

    #[test]
    fn test_eval_nested_parenthetical_ops() {
        // kh2 keeps 5 and 3; kl1 reaches through the parens and keeps the 3.
        check("(3d6kh2)kl1", vec![2, 5, 3], Val::Int(3));
    }

    #[test]
    fn test_eval_dice_op_on_set_fails() {
        assert!(matches!(
            eval_str("(1, 2)rr1", vec![]),
            Err(RollError::Value(_))
        ));
        assert!(matches!(
            eval_str("(1d6)e6", vec![6]),
            Err(RollError::Value(_))
        ));
    }

    #[test]
    fn test_eval_annotations() {
        let result = eval_str("1d4 [dmg] [fire]", vec![2]).unwrap();
        assert_eq!(result.roll.annotation.as_deref(), Some("[dmg] [fire]"));
    }

    #[test]
    fn test_eval_comment_carried_over() {
        let ast = crate::parse::parse("1d4 for the wolf", true).unwrap();
        let mut ctx = RollContext::new(FixedRoller::new(vec![3]));
        let result = eval(&ast, &mut ctx).unwrap();
        assert_eq!(result.comment.as_deref(), Some("for the wolf"));
    }

    #[test]
    fn test_too_many_rolls() {
        assert!(matches!(
            eval_str("1d1rr1", vec![1]),
            Err(RollError::TooManyRolls)
        ));
        assert!(matches!(
            eval_str("2000d6", vec![1]),
            Err(RollError::TooManyRolls)
        ));
    }

    #[test]
    fn test_limit_overrides() {
        let ast = crate::parse::parse("6d6", false).unwrap();
        let mut ctx = RollContext::with_limits(FixedRoller::new(vec![1]), 5, DEFAULT_MAX_OPS);
        assert_eq!(eval(&ast, &mut ctx), Err(RollError::TooManyRolls));

        let ast = crate::parse::parse("1 + 2 + 3", false).unwrap();
        let mut ctx = RollContext::with_limits(FixedRoller::new(vec![]), DEFAULT_MAX_ROLLS, 3);
        assert_eq!(eval(&ast, &mut ctx), Err(RollError::TooManyRolls));
    }

    #[test]
    fn test_zero_size_dice_still_tick_the_budget() {
        assert!(matches!(
            eval_str("2000d0", vec![]),
            Err(RollError::TooManyRolls)
        ));
    }
}
