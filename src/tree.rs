//! The mutable result tree built by evaluation.
//!
//! Every node carries a `kept` flag; dropped nodes stay in the tree so
//! renderers can show them, but contribute 0 to any total. Totals are
//! recomputed on demand, so replacing a child or dropping a node can never
//! leave a stale value behind.

use crate::error::RollError;
use crate::eval::RollContext;
use crate::ops::{BinaryOperator, DiceSize, Int, SetOperator, UnaryOperator, Val};
use crate::rng::DieRoller;
use vec1::{vec1, Vec1};

/// Capabilities shared by every node of the result tree.
#[enum_dispatch::enum_dispatch]
pub trait NumberTrait {
    fn kept(&self) -> bool {
        true
    }

    fn drop(&mut self) {}

    /// The node's value, ignoring its own `kept` flag.
    fn number(&self) -> crate::Result<Val>;

    /// The node's value with respect to `kept`; prefer this over `number`.
    fn total(&self) -> crate::Result<Val> {
        if self.kept() {
            self.number()
        } else {
            Ok(Val::ZERO)
        }
    }

    /// The leaf-level values this node contributes, dropped ones included.
    fn set(&self) -> crate::Result<Vec<Val>>;

    /// Like [`NumberTrait::set`], but only values that still count.
    fn keptset(&self) -> crate::Result<Vec<Val>>;
}

/// Root of a fully evaluated roll.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub roll: Number,
    pub comment: Option<String>,
}

impl Expression {
    pub fn new(roll: Number, comment: Option<String>) -> Self {
        Self { roll, comment }
    }

    pub fn children(&self) -> Vec<&Number> {
        vec![&self.roll]
    }

    pub fn set_child(&mut self, index: usize, child: Number) -> crate::Result<()> {
        if index != 0 {
            return Err(RollError::value_error(format!(
                "expression has no child at index {}",
                index
            )));
        }
        self.roll = child;
        Ok(())
    }
}

impl NumberTrait for Expression {
    fn number(&self) -> crate::Result<Val> {
        self.roll.total()
    }

    fn set(&self) -> crate::Result<Vec<Val>> {
        self.roll.set()
    }

    fn keptset(&self) -> crate::Result<Vec<Val>> {
        self.roll.keptset()
    }
}

/// A single result node: its variant plus the `kept` flag and any annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Number {
    pub kind: NumberKind,
    pub kept: bool,
    pub annotation: Option<String>,
}

impl Number {
    pub fn new(kind: NumberKind) -> Self {
        Self {
            kind,
            kept: true,
            annotation: None,
        }
    }

    pub fn children(&self) -> Vec<&Number> {
        match &self.kind {
            NumberKind::Literal(_) | NumberKind::Dice(_) => vec![],
            NumberKind::UnOp(x) => vec![&*x.value],
            NumberKind::BinOp(x) => vec![&*x.left, &*x.right],
            NumberKind::Parenthetical(x) => vec![&*x.value],
            NumberKind::Set(x) => x.values.iter().collect(),
        }
    }

    pub fn left(&self) -> Option<&Number> {
        self.children().into_iter().next()
    }

    pub fn right(&self) -> Option<&Number> {
        self.children().into_iter().last()
    }

    pub fn set_child(&mut self, index: usize, child: Number) -> crate::Result<()> {
        let slot = match &mut self.kind {
            NumberKind::UnOp(x) if index == 0 => &mut *x.value,
            NumberKind::BinOp(x) if index == 0 => &mut *x.left,
            NumberKind::BinOp(x) if index == 1 => &mut *x.right,
            NumberKind::Parenthetical(x) if index == 0 => &mut *x.value,
            NumberKind::Set(x) if index < x.values.len() => &mut x.values[index],
            _ => {
                return Err(RollError::value_error(format!(
                    "node has no child at index {}",
                    index
                )))
            }
        };
        *slot = child;
        Ok(())
    }
}

impl NumberTrait for Number {
    fn kept(&self) -> bool {
        self.kept
    }

    fn drop(&mut self) {
        self.kept = false;
    }

    fn number(&self) -> crate::Result<Val> {
        self.kind.number()
    }

    fn set(&self) -> crate::Result<Vec<Val>> {
        self.kind.set()
    }

    fn keptset(&self) -> crate::Result<Vec<Val>> {
        if self.kept {
            self.kind.keptset()
        } else {
            Ok(vec![])
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[enum_dispatch::enum_dispatch(NumberTrait)]
pub enum NumberKind {
    Literal(Literal),
    UnOp(UnOp),
    BinOp(BinOp),
    Parenthetical(Parenthetical),
    Set(Set),
    Dice(Dice),
}

/// A constant with its full history; rerolls and min/max clamps append, the
/// last entry is current.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub values: Vec1<Val>,
    pub kept: bool,
    pub exploded: bool,
}

impl Literal {
    pub fn new(value: Val) -> Self {
        Self {
            values: vec1![value],
            kept: true,
            exploded: false,
        }
    }

    pub fn current(&self) -> Val {
        *self.values.last()
    }

    pub(crate) fn explode(&mut self) {
        self.exploded = true;
    }

    pub(crate) fn update(&mut self, value: Val) {
        self.values.push(value);
    }
}

impl NumberTrait for Literal {
    fn kept(&self) -> bool {
        self.kept
    }

    fn drop(&mut self) {
        self.kept = false;
    }

    fn number(&self) -> crate::Result<Val> {
        Ok(self.current())
    }

    fn set(&self) -> crate::Result<Vec<Val>> {
        Ok(vec![self.current()])
    }

    fn keptset(&self) -> crate::Result<Vec<Val>> {
        Ok(if self.kept { vec![self.current()] } else { vec![] })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnOp {
    pub op: UnaryOperator,
    pub value: Box<Number>,
}

impl UnOp {
    pub fn new(op: UnaryOperator, value: Number) -> Self {
        Self {
            op,
            value: Box::new(value),
        }
    }
}

impl NumberTrait for UnOp {
    fn number(&self) -> crate::Result<Val> {
        let value = self.value.total()?;
        Ok(match self.op {
            UnaryOperator::Plus => value,
            UnaryOperator::Minus => -value,
        })
    }

    fn set(&self) -> crate::Result<Vec<Val>> {
        Ok(vec![self.number()?])
    }

    fn keptset(&self) -> crate::Result<Vec<Val>> {
        self.set()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinOp {
    pub op: BinaryOperator,
    pub left: Box<Number>,
    pub right: Box<Number>,
}

impl BinOp {
    pub fn new(left: Number, op: BinaryOperator, right: Number) -> Self {
        Self {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

impl NumberTrait for BinOp {
    fn number(&self) -> crate::Result<Val> {
        use BinaryOperator::*;

        let left = self.left.total()?;
        let right = self.right.total()?;
        Ok(match self.op {
            Add => left + right,
            Sub => left - right,
            Mul => left * right,
            Div => {
                if right.is_zero() {
                    return Err(RollError::value_error("cannot divide by zero"));
                }
                left / right
            }
            FloorDiv => {
                if right.is_zero() {
                    return Err(RollError::value_error("cannot divide by zero"));
                }
                left.trunc_div(right)
            }
            Mod => {
                if right.is_zero() {
                    return Err(RollError::value_error("cannot modulo by zero"));
                }
                left % right
            }
            Lt => Val::Int((left < right) as Int),
            Gt => Val::Int((left > right) as Int),
            Le => Val::Int((left <= right) as Int),
            Ge => Val::Int((left >= right) as Int),
            Eq => Val::Int((left == right) as Int),
            Ne => Val::Int((left != right) as Int),
        })
    }

    fn set(&self) -> crate::Result<Vec<Val>> {
        Ok(vec![self.number()?])
    }

    fn keptset(&self) -> crate::Result<Vec<Val>> {
        self.set()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parenthetical {
    pub value: Box<Number>,
    pub operations: Vec<SetOperator>,
}

impl Parenthetical {
    pub fn new(value: Number) -> Self {
        Self {
            value: Box::new(value),
            operations: Vec::new(),
        }
    }
}

impl NumberTrait for Parenthetical {
    fn number(&self) -> crate::Result<Val> {
        self.value.total()
    }

    fn set(&self) -> crate::Result<Vec<Val>> {
        self.value.set()
    }

    fn keptset(&self) -> crate::Result<Vec<Val>> {
        self.value.keptset()
    }
}

/// An evaluated `NumberSet`.
#[derive(Debug, Clone, PartialEq)]
pub struct Set {
    pub values: Vec<Number>,
    pub operations: Vec<SetOperator>,
}

impl Set {
    pub fn new(values: Vec<Number>) -> Self {
        Self {
            values,
            operations: Vec::new(),
        }
    }
}

impl NumberTrait for Set {
    fn number(&self) -> crate::Result<Val> {
        self.values
            .iter()
            .map(NumberTrait::total)
            .try_fold(Val::ZERO, |a, b| b.map(|b| a + b))
    }

    fn set(&self) -> crate::Result<Vec<Val>> {
        let mut out = Vec::new();
        for value in &self.values {
            out.extend(value.set()?);
        }
        Ok(out)
    }

    fn keptset(&self) -> crate::Result<Vec<Val>> {
        let mut out = Vec::new();
        for value in &self.values {
            out.extend(value.keptset()?);
        }
        Ok(out)
    }
}

/// An ordered bag of dice rolled from an `NdM` atom. `num` tracks
/// `values.len()`; explosions grow both.
#[derive(Debug, Clone, PartialEq)]
pub struct Dice {
    pub num: Int,
    pub size: DiceSize,
    pub values: Vec<Die>,
    pub operations: Vec<SetOperator>,
}

impl Dice {
    pub fn roll_new<R: DieRoller>(
        num: Int,
        size: DiceSize,
        ctx: &mut RollContext<R>,
    ) -> crate::Result<Self> {
        let mut this = Self {
            num,
            size,
            values: Vec::new(),
            operations: Vec::new(),
        };
        for _ in 0..num {
            this.values.push(Die::roll_new(size, ctx)?);
        }
        Ok(this)
    }

    pub(crate) fn roll_another<R: DieRoller>(
        &mut self,
        ctx: &mut RollContext<R>,
    ) -> crate::Result<()> {
        self.values.push(Die::roll_new(self.size, ctx)?);
        self.num += 1;
        Ok(())
    }
}

impl NumberTrait for Dice {
    fn number(&self) -> crate::Result<Val> {
        self.values
            .iter()
            .map(NumberTrait::total)
            .try_fold(Val::ZERO, |a, b| b.map(|b| a + b))
    }

    fn set(&self) -> crate::Result<Vec<Val>> {
        let mut out = Vec::new();
        for die in &self.values {
            out.extend(die.set()?);
        }
        Ok(out)
    }

    fn keptset(&self) -> crate::Result<Vec<Val>> {
        let mut out = Vec::new();
        for die in &self.values {
            out.extend(die.keptset()?);
        }
        Ok(out)
    }
}

/// One die. Its history holds every face it showed; a size-0 die has no
/// history and numbers to 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Die {
    pub size: DiceSize,
    pub values: Vec<Literal>,
    pub kept: bool,
}

impl Die {
    pub fn roll_new<R: DieRoller>(size: DiceSize, ctx: &mut RollContext<R>) -> crate::Result<Self> {
        let mut this = Self {
            size,
            values: Vec::new(),
            kept: true,
        };
        this.add_roll(ctx)?;
        Ok(this)
    }

    pub(crate) fn add_roll<R: DieRoller>(&mut self, ctx: &mut RollContext<R>) -> crate::Result<()> {
        if let Some(face) = ctx.roll_face(self.size)? {
            self.values.push(Literal::new(Val::Int(face)));
        }
        Ok(())
    }

    pub(crate) fn reroll<R: DieRoller>(&mut self, ctx: &mut RollContext<R>) -> crate::Result<()> {
        if let Some(last) = self.values.last_mut() {
            NumberTrait::drop(last);
        }
        self.add_roll(ctx)
    }

    pub(crate) fn explode(&mut self) {
        if let Some(last) = self.values.last_mut() {
            last.explode();
        }
    }

    pub(crate) fn force_value(&mut self, value: Int) {
        if let Some(last) = self.values.last_mut() {
            last.update(Val::Int(value));
        }
    }
}

impl NumberTrait for Die {
    fn kept(&self) -> bool {
        self.kept
    }

    fn drop(&mut self) {
        self.kept = false;
    }

    fn number(&self) -> crate::Result<Val> {
        self.values.last().map_or(Ok(Val::ZERO), |v| v.total())
    }

    fn set(&self) -> crate::Result<Vec<Val>> {
        Ok(self.values.last().map(|v| v.current()).into_iter().collect())
    }

    fn keptset(&self) -> crate::Result<Vec<Val>> {
        if self.kept {
            self.set()
        } else {
            Ok(vec![])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(x: Int) -> Number {
        Number::new(NumberKind::Literal(Literal::new(Val::Int(x))))
    }

    fn die(size: Int, face: Int) -> Die {
        Die {
            size: DiceSize::Int(size),
            values: vec![Literal::new(Val::Int(face))],
            kept: true,
        }
    }

    #[test]
    fn test_binop_totals() {
        let node = BinOp::new(lit(7), BinaryOperator::FloorDiv, lit(2));
        assert_eq!(node.number().unwrap(), Val::Int(3));

        let node = BinOp::new(lit(1), BinaryOperator::Lt, lit(2));
        assert_eq!(node.number().unwrap(), Val::Int(1));

        let node = BinOp::new(lit(1), BinaryOperator::Div, lit(0));
        assert!(matches!(node.number(), Err(RollError::Value(_))));
    }

    #[test]
    fn test_dropped_member_excluded_from_total() {
        let mut set = Set::new(vec![lit(1), lit(2), lit(3)]);
        NumberTrait::drop(&mut set.values[1]);
        assert_eq!(set.number().unwrap(), Val::Int(4));
        assert_eq!(set.set().unwrap(), vec![Val::Int(1), Val::Int(2), Val::Int(3)]);
        assert_eq!(set.keptset().unwrap(), vec![Val::Int(1), Val::Int(3)]);
    }

    #[test]
    fn test_die_history() {
        let mut d = die(6, 1);
        NumberTrait::drop(d.values.last_mut().unwrap());
        d.values.push(Literal::new(Val::Int(4)));
        assert_eq!(d.number().unwrap(), Val::Int(4));
        assert_eq!(d.set().unwrap(), vec![Val::Int(4)]);

        NumberTrait::drop(&mut d);
        assert_eq!(d.total().unwrap(), Val::ZERO);
        assert_eq!(d.keptset().unwrap(), vec![]);
    }

    #[test]
    fn test_set_child_recomputes_total() {
        let mut node = Number::new(NumberKind::BinOp(BinOp::new(
            lit(10),
            BinaryOperator::Add,
            lit(5),
        )));
        assert_eq!(node.total().unwrap(), Val::Int(15));

        node.set_child(1, lit(7)).unwrap();
        assert_eq!(node.total().unwrap(), Val::Int(17));
        assert!(node.set_child(2, lit(0)).is_err());
    }

    #[test]
    fn test_left_right() {
        let node = Number::new(NumberKind::BinOp(BinOp::new(
            lit(1),
            BinaryOperator::Add,
            lit(2),
        )));
        assert_eq!(node.left().unwrap().total().unwrap(), Val::Int(1));
        assert_eq!(node.right().unwrap().total().unwrap(), Val::Int(2));
        assert!(lit(1).left().is_none());
    }
}
