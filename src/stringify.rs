//! Renderers over the result tree.
//!
//! [`Stringifier`] is a visitor with one method per node variant; the
//! provided bodies give the plain rendering, so an implementation overrides
//! only what it wants to change. Renderers never re-roll anything.

use crate::ops::{DiceSize, SetOperator, Val};
use crate::tree::{
    BinOp, Dice, Die, Expression, Literal, Number, NumberKind, NumberTrait, Parenthetical, Set,
    UnOp,
};

pub trait Stringifier {
    fn stringify(&mut self, expr: &Expression) -> crate::Result<String> {
        self.str_expression(expr)
    }

    /// Renders one node. Implementations that mark up dropped nodes override
    /// this and delegate to [`Stringifier::dispatch_node`].
    fn stringify_node(&mut self, node: &Number) -> crate::Result<String> {
        self.dispatch_node(node)
    }

    fn dispatch_node(&mut self, node: &Number) -> crate::Result<String> {
        let inside = match &node.kind {
            NumberKind::Literal(x) => self.str_literal(x),
            NumberKind::UnOp(x) => self.str_unop(x),
            NumberKind::BinOp(x) => self.str_binop(x),
            NumberKind::Parenthetical(x) => self.str_parenthetical(x),
            NumberKind::Set(x) => self.str_set(x),
            NumberKind::Dice(x) => self.str_dice(x),
        }?;
        Ok(match &node.annotation {
            Some(annotation) => format!("{} {}", inside, annotation),
            None => inside,
        })
    }

    fn str_expression(&mut self, node: &Expression) -> crate::Result<String> {
        Ok(format!(
            "{} = {}",
            self.stringify_node(&node.roll)?,
            node.total()?.as_int()
        ))
    }

    fn str_literal(&mut self, node: &Literal) -> crate::Result<String> {
        let history = node
            .values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        Ok(if node.exploded {
            format!("{}!", history)
        } else {
            history
        })
    }

    fn str_unop(&mut self, node: &UnOp) -> crate::Result<String> {
        Ok(format!("{}{}", node.op, self.stringify_node(&node.value)?))
    }

    fn str_binop(&mut self, node: &BinOp) -> crate::Result<String> {
        Ok(format!(
            "{} {} {}",
            self.stringify_node(&node.left)?,
            node.op,
            self.stringify_node(&node.right)?
        ))
    }

    fn str_parenthetical(&mut self, node: &Parenthetical) -> crate::Result<String> {
        Ok(format!(
            "({}){}",
            self.stringify_node(&node.value)?,
            str_ops(&node.operations)
        ))
    }

    fn str_set(&mut self, node: &Set) -> crate::Result<String> {
        let out = node
            .values
            .iter()
            .map(|v| self.stringify_node(v))
            .collect::<crate::Result<Vec<_>>>()?
            .join(", ");
        let ops = str_ops(&node.operations);
        Ok(if node.values.len() == 1 {
            format!("({},){}", out, ops)
        } else {
            format!("({}){}", out, ops)
        })
    }

    fn str_dice(&mut self, node: &Dice) -> crate::Result<String> {
        let the_dice = node
            .values
            .iter()
            .map(|die| self.str_die(die))
            .collect::<crate::Result<Vec<_>>>()?
            .join(", ");
        Ok(format!(
            "{}d{}{} ({})",
            node.num,
            node.size,
            str_ops(&node.operations),
            the_dice
        ))
    }

    fn str_die(&mut self, node: &Die) -> crate::Result<String> {
        if node.values.is_empty() {
            return Ok("0".to_string());
        }
        let values = node
            .values
            .iter()
            .map(|v| self.str_die_value(v, node.size))
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(values.join(", "))
    }

    fn str_die_value(&mut self, value: &Literal, _size: DiceSize) -> crate::Result<String> {
        self.str_literal(value)
    }
}

fn str_ops(ops: &[SetOperator]) -> String {
    ops.iter().map(ToString::to_string).collect()
}

/// Plain text, no markup; dropped values render like any other.
#[derive(Debug, Default)]
pub struct SimpleStringifier;

impl SimpleStringifier {
    pub fn new() -> Self {
        Self
    }
}

impl Stringifier for SimpleStringifier {}

/// Markdown rendering: dropped nodes in `~~…~~`, minimum/maximum faces in
/// `**…**`, the final total in backticks.
#[derive(Debug, Default)]
pub struct MarkdownStringifier {
    in_dropped: bool,
}

impl MarkdownStringifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Stringifier for MarkdownStringifier {
    fn stringify(&mut self, expr: &Expression) -> crate::Result<String> {
        self.in_dropped = false;
        self.str_expression(expr)
    }

    fn stringify_node(&mut self, node: &Number) -> crate::Result<String> {
        if !node.kept() && !self.in_dropped {
            self.in_dropped = true;
            let inside = self.dispatch_node(node)?;
            self.in_dropped = false;
            Ok(format!("~~{}~~", inside))
        } else {
            self.dispatch_node(node)
        }
    }

    fn str_expression(&mut self, node: &Expression) -> crate::Result<String> {
        Ok(format!(
            "{} = `{}`",
            self.stringify_node(&node.roll)?,
            node.total()?.as_int()
        ))
    }

    fn str_die(&mut self, node: &Die) -> crate::Result<String> {
        let wrap = !node.kept && !self.in_dropped;
        if wrap {
            self.in_dropped = true;
        }
        let mut out = if node.values.is_empty() {
            "0".to_string()
        } else {
            node.values
                .iter()
                .map(|v| self.str_die_value(v, node.size))
                .collect::<crate::Result<Vec<_>>>()?
                .join(", ")
        };
        if wrap {
            self.in_dropped = false;
            out = format!("~~{}~~", out);
        }
        Ok(out)
    }

    fn str_die_value(&mut self, value: &Literal, size: DiceSize) -> crate::Result<String> {
        let mut inside = self.str_literal(value)?;
        if !value.kept && !self.in_dropped {
            inside = format!("~~{}~~", inside);
        }
        let current = value.current();
        let bold = current == Val::Int(1)
            || matches!(size, DiceSize::Int(s) if current == Val::Int(s));
        if bold {
            inside = format!("**{}**", inside);
        }
        Ok(inside)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{eval, RollContext};
    use crate::rng::FixedRoller;

    fn render<S: Stringifier>(mut stringifier: S, input: &str, faces: Vec<u64>) -> String {
        let ast = crate::parse::parse(input, false).unwrap();
        let mut ctx = RollContext::new(FixedRoller::new(faces));
        let result = eval(&ast, &mut ctx).unwrap();
        stringifier.stringify(&result).unwrap()
    }

    fn check_simple(input: &str, faces: Vec<u64>, expected: &str) {
        assert_eq!(render(SimpleStringifier::new(), input, faces), expected);
    }

    fn check_md(input: &str, faces: Vec<u64>, expected: &str) {
        assert_eq!(render(MarkdownStringifier::new(), input, faces), expected);
    }

    #[test]
    fn test_simple_stringify() {
        check_simple("2 + 3", vec![], "2 + 3 = 5");
        check_simple("2d20", vec![10, 11], "2d20 (10, 11) = 21");
        check_simple("2d20kh1", vec![10, 11], "2d20kh1 (10, 11) = 11");
        check_simple(
            "4d4rr1 + 3",
            vec![2, 3, 4, 1, 2],
            "4d4rr1 (2, 3, 4, 1, 2) + 3 = 14",
        );
        check_simple(
            "8d6mi2mi3 + 5",
            vec![4, 5, 6, 1, 2, 3, 4, 5],
            "8d6mi2mi3 (4, 5, 6, 1 -> 2 -> 3, 2 -> 3, 3, 4, 5) + 5 = 38",
        );
        check_simple("(1,)", vec![], "(1,) = 1");
        check_simple("3d0", vec![], "3d0 (0, 0, 0) = 0");
    }

    #[test]
    fn test_markdown_basics() {
        check_md("2 + 3", vec![], "2 + 3 = `5`");
        check_md("1d20 + 5", vec![10], "1d20 (10) + 5 = `15`");
        check_md("2d%", vec![4, 10], "2d% (30, 90) = `120`");
    }

    #[test]
    fn test_markdown_keeps_and_drops() {
        check_md(
            "4d6kh3",
            vec![4, 4, 6, 3],
            "4d6kh3 (4, 4, **6**, ~~3~~) = `14`",
        );
        check_md(
            "2d6ro<3",
            vec![1, 3, 6],
            "2d6ro<3 (**~~1~~**, **6**, 3) = `9`",
        );
    }

    #[test]
    fn test_markdown_minimum_history() {
        check_md(
            "8d6mi2",
            vec![1, 6, 4, 2, 6, 2, 5, 6],
            "8d6mi2 (1 -> 2, **6**, 4, 2, **6**, 2, 5, **6**) = `33`",
        );
    }

    #[test]
    fn test_markdown_dropped_set_members() {
        check_md(
            "(1d4 + 1, 3, 2d6kl1)kh1",
            vec![2, 2, 5],
            "(1d4 (2) + 1, ~~3~~, ~~2d6kl1 (2, 5)~~)kh1 = `3`",
        );
    }

    #[test]
    fn test_markdown_explosions() {
        let rendered = render(
            MarkdownStringifier::new(),
            "4d6e6kh3",
            vec![6, 5, 6, 3, 2, 1],
        );
        assert_eq!(
            rendered,
            "6d6e6kh3 (**6!**, 5, **6!**, ~~3~~, ~~2~~, ~~**1**~~) = `17`"
        );
        assert_eq!(rendered.matches("6!").count(), 2);
    }

    #[test]
    fn test_markdown_annotations() {
        check_md("1d20 [d20]", vec![10], "1d20 (10) [d20] = `10`");
        check_md(
            "2d20kh1 [Adv.] [d20]",
            vec![10, 11],
            "2d20kh1 (~~10~~, 11) [Adv.] [d20] = `11`",
        );
    }
}
