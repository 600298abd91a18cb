use std::cmp::Ordering;
use std::fmt::{self, Write};

pub type Int = i64;
pub type Float = f64;

/// An evaluated number. Arithmetic stays integral until a float gets involved.
#[derive(Debug, Copy, Clone)]
pub enum Val {
    Int(Int),
    Float(Float),
}

impl Val {
    pub const ZERO: Self = Self::Int(0);

    pub fn is_zero(self) -> bool {
        self.as_float() == 0.0
    }

    /// Truncates toward zero.
    pub fn as_int(self) -> Int {
        match self {
            Self::Int(x) => x,
            Self::Float(x) => x as Int,
        }
    }

    pub fn as_float(self) -> Float {
        match self {
            Self::Int(x) => x as Float,
            Self::Float(x) => x,
        }
    }

    /// Integer division, truncating toward zero in both representations.
    pub(crate) fn trunc_div(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::Int(x), Self::Int(y)) => Self::Int(x / y),
            (x, y) => Self::Float((x.as_float() / y.as_float()).trunc()),
        }
    }
}

impl std::ops::Neg for Val {
    type Output = Self;

    fn neg(self) -> Self::Output {
        match self {
            Self::Int(x) => Self::Int(-x),
            Self::Float(x) => Self::Float(-x),
        }
    }
}

macro_rules! val_impl_bin_op {
    ($Name:ident, $fn_name:ident) => {
        impl std::ops::$Name for Val {
            type Output = Self;

            fn $fn_name(self, rhs: Self) -> Self::Output {
                match (self, rhs) {
                    (Self::Int(x), Self::Int(y)) => Self::Int(x.$fn_name(y)),
                    (x, y) => Self::Float(x.as_float().$fn_name(y.as_float())),
                }
            }
        }
    };
}

val_impl_bin_op!(Add, add);
val_impl_bin_op!(Sub, sub);
val_impl_bin_op!(Mul, mul);
val_impl_bin_op!(Div, div);
val_impl_bin_op!(Rem, rem);

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        self.as_float() == other.as_float()
    }
}

impl PartialOrd for Val {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.as_float().partial_cmp(&other.as_float())
    }
}

impl From<Int> for Val {
    fn from(x: Int) -> Self {
        Self::Int(x)
    }
}

impl From<Float> for Val {
    fn from(x: Float) -> Self {
        Self::Float(x)
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(x) => fmt::Display::fmt(x, f),
            Self::Float(x) => fmt::Debug::fmt(x, f),
        }
    }
}

/// The face count of a die. Percentile dice roll multiples of ten in [0, 90].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DiceSize {
    Int(Int),
    Percentile,
}

impl fmt::Display for DiceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(x) => fmt::Display::fmt(x, f),
            Self::Percentile => f.write_char('%'),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UnaryOperator {
    Plus,
    Minus,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Self::Plus => '+',
            Self::Minus => '-',
        };
        f.write_char(c)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SetOperatorKind {
    Keep,
    Drop,
    Reroll,
    RerollOnce,
    RerollAdd,
    Explode,
    Minimum,
    Maximum,
}

impl SetOperatorKind {
    /// mi/ma apply immediately and never merge with a neighboring operator.
    pub const fn is_immediate(self) -> bool {
        matches!(self, Self::Minimum | Self::Maximum)
    }

    pub const fn to_str(self) -> &'static str {
        match self {
            Self::Keep => "k",
            Self::Drop => "p",
            Self::Reroll => "rr",
            Self::RerollOnce => "ro",
            Self::RerollAdd => "ra",
            Self::Explode => "e",
            Self::Minimum => "mi",
            Self::Maximum => "ma",
        }
    }
}

impl fmt::Display for SetOperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// An operation on a set or dice, with the selectors it applies to.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SetOperator {
    pub kind: SetOperatorKind,
    pub sels: Vec<SetSelector>,
}

impl SetOperator {
    pub fn new(kind: SetOperatorKind, sels: Vec<SetSelector>) -> Self {
        Self { kind, sels }
    }

    pub fn add_sels(&mut self, sels: &mut Vec<SetSelector>) {
        self.sels.append(sels);
    }
}

impl fmt::Display for SetOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The code repeats per selector so merged operators re-parse.
        for sel in &self.sels {
            write!(f, "{}{}", self.kind, sel)?;
        }
        Ok(())
    }
}

/// Identifies members of a set: the top/bottom n, a comparison, or a literal
/// face value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SetSelector {
    Highest(Int),
    Lowest(Int),
    GreaterThan(Int),
    LessThan(Int),
    EqualTo(Int),
}

impl fmt::Display for SetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Highest(n) => write!(f, "h{}", n),
            Self::Lowest(n) => write!(f, "l{}", n),
            Self::GreaterThan(x) => write!(f, ">{}", x),
            Self::LessThan(x) => write!(f, "<{}", x),
            Self::EqualTo(x) => write!(f, "{}", x),
        }
    }
}

/// Merges runs of the same operator (`kh1kl1` becomes one keep with two
/// selectors); immediate operators break the run.
pub(crate) fn simplify_ops(ops: &mut Vec<SetOperator>) {
    if ops.len() < 2 {
        return;
    }

    let mut merged: Vec<SetOperator> = Vec::with_capacity(ops.len());
    for mut op in ops.drain(..) {
        match merged.last_mut() {
            Some(last) if !op.kind.is_immediate() && last.kind == op.kind => {
                last.add_sels(&mut op.sels);
            }
            _ => merged.push(op),
        }
    }
    *ops = merged;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_val_arithmetic() {
        assert_eq!(Val::Int(2) + Val::Int(3), Val::Int(5));
        assert_eq!(Val::Int(7) % Val::Int(-2), Val::Int(1));
        assert_eq!(Val::Int(-7) % Val::Int(2), Val::Int(-1));
        assert_eq!(Val::Float(3.5) % Val::Int(2), Val::Float(1.5));
        assert_eq!(Val::Int(-7).trunc_div(Val::Int(2)), Val::Int(-3));
        assert_eq!(Val::Float(-7.0).trunc_div(Val::Int(2)), Val::Float(-3.0));
        assert_eq!((-Val::Int(2)).as_int(), -2);
    }

    #[test]
    fn test_val_truncation() {
        assert_eq!(Val::Float(2.9).as_int(), 2);
        assert_eq!(Val::Float(-2.9).as_int(), -2);
    }

    #[test]
    fn test_operator_display() {
        let op = SetOperator::new(
            SetOperatorKind::Keep,
            vec![SetSelector::Highest(1), SetSelector::Lowest(2)],
        );
        assert_eq!(op.to_string(), "kh1kl2");

        let op = SetOperator::new(SetOperatorKind::Reroll, vec![SetSelector::LessThan(3)]);
        assert_eq!(op.to_string(), "rr<3");

        let op = SetOperator::new(SetOperatorKind::Minimum, vec![SetSelector::EqualTo(2)]);
        assert_eq!(op.to_string(), "mi2");
    }

    #[test]
    fn test_simplify_ops() {
        let mut ops = vec![
            SetOperator::new(SetOperatorKind::Keep, vec![SetSelector::Highest(1)]),
            SetOperator::new(SetOperatorKind::Keep, vec![SetSelector::Lowest(1)]),
            SetOperator::new(SetOperatorKind::Minimum, vec![SetSelector::EqualTo(2)]),
            SetOperator::new(SetOperatorKind::Minimum, vec![SetSelector::EqualTo(3)]),
        ];
        simplify_ops(&mut ops);
        assert_eq!(
            ops,
            vec![
                SetOperator::new(
                    SetOperatorKind::Keep,
                    vec![SetSelector::Highest(1), SetSelector::Lowest(1)],
                ),
                SetOperator::new(SetOperatorKind::Minimum, vec![SetSelector::EqualTo(2)]),
                SetOperator::new(SetOperatorKind::Minimum, vec![SetSelector::EqualTo(3)]),
            ]
        );
    }
}
