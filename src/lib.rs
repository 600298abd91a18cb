//! A dice expression engine: parses expressions like `4d6kh3 + 2`, simulates
//! the rolls, and returns a result tree that keeps the full history of every
//! face rolled, rerolled, exploded, or dropped.
//!
//! ```
//! let result = croupier::roll("4d6kh3 + 2")?;
//! assert!((5..=20).contains(&result.total));
//! println!("{}", result); // e.g. 4d6kh3 (4, 4, **6**, ~~3~~) + 2 = `16`
//! # Ok::<(), croupier::RollError>(())
//! ```
//!
//! Set operators (`k`, `p`, `rr`, `ro`, `ra`, `e`, `mi`, `ma`) combine with
//! selectors (`h`, `l`, `>`, `<`, or a bare number) on dice and number sets.
//! A [`Roller`] caches parsed ASTs and owns its RNG; deterministic sources
//! can be injected through [`DieRoller`].

pub mod ast;
mod error;
mod eval;
mod ops;
mod parse;
mod rng;
mod roller;
mod setops;
mod stringify;
mod tree;

pub use error::RollError;
pub use eval::{eval, RollContext, DEFAULT_MAX_OPS, DEFAULT_MAX_ROLLS};
pub use ops::{
    BinaryOperator, DiceSize, Float, Int, SetOperator, SetOperatorKind, SetSelector,
    UnaryOperator, Val,
};
pub use rng::{DefaultRng, DieRoller, FixedRoller, RandRoller};
pub use roller::{AdvType, CritType, RollResult, Roller, DEFAULT_CACHE_SIZE};
pub use stringify::{MarkdownStringifier, SimpleStringifier, Stringifier};
pub use tree::{
    BinOp, Dice, Die, Expression, Literal, Number, NumberKind, NumberTrait, Parenthetical, Set,
    UnOp,
};

pub type Result<T> = std::result::Result<T, RollError>;

pub mod prelude {
    pub use crate::{
        parse, roll, AdvType, CritType, DieRoller, MarkdownStringifier, RollError, RollResult,
        Roller, SimpleStringifier,
    };
}

/// Rolls an expression with a fresh default [`Roller`] and the markdown
/// renderer.
pub fn roll(expr: &str) -> Result<RollResult> {
    Roller::new().roll(expr)
}

/// Parses an expression without rolling it. Comment mode is off; use
/// [`Roller::parse`] to allow comments.
pub fn parse(expr: &str) -> Result<ast::Expression> {
    parse::parse(expr, false)
}
