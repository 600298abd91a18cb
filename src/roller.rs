//! The reusable entry point: parse (with caching), roll, and package results.

use crate::ast;
use crate::eval::{eval, RollContext, DEFAULT_MAX_OPS, DEFAULT_MAX_ROLLS};
use crate::ops::{DiceSize, Int, SetOperator, SetOperatorKind, SetSelector, Val};
use crate::rng::{DefaultRng, DieRoller};
use crate::stringify::{MarkdownStringifier, Stringifier};
use crate::tree::{Expression, NumberKind, NumberTrait};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use log::debug;

/// Default capacity of a [`Roller`]'s AST cache.
pub const DEFAULT_CACHE_SIZE: usize = 256;

/// Whether a roll was a natural 20, a natural 1, or nothing special.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CritType {
    None = 0,
    Crit = 1,
    Fail = 2,
}

/// Advantage state for d20 rolls: roll two, keep the higher or lower.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AdvType {
    None = 0,
    Adv = 1,
    Dis = -1,
}

/// Everything a finished roll carries: the AST that was rolled, the result
/// tree, the rounded total, the rendered string, and any comment.
#[derive(Debug, Clone, PartialEq)]
pub struct RollResult {
    pub ast: Arc<ast::Expression>,
    pub expr: Expression,
    pub total: Int,
    pub result: String,
    pub comment: Option<String>,
    pub crit: CritType,
}

impl RollResult {
    fn new(
        ast: Arc<ast::Expression>,
        expr: Expression,
        stringifier: &mut dyn Stringifier,
    ) -> crate::Result<Self> {
        let total = expr.total()?.as_int();
        let result = stringifier.stringify(&expr)?;
        let comment = expr.comment.clone();
        let crit = crit_of(&expr);
        Ok(Self {
            ast,
            expr,
            total,
            result,
            comment,
            crit,
        })
    }
}

impl fmt::Display for RollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.result)
    }
}

/// Finds the leftmost node of the tree; if it is a d20 pool with exactly one
/// kept die, a 20 is a crit and a 1 a fail.
fn crit_of(expr: &Expression) -> CritType {
    let mut node = &expr.roll;
    while let Some(child) = node.left() {
        node = child;
    }

    let dice = match &node.kind {
        NumberKind::Dice(d) => d,
        _ => return CritType::None,
    };
    if dice.size != DiceSize::Int(20) {
        return CritType::None;
    }
    let mut kept = dice.values.iter().filter(|d| d.kept);
    let the_die = match (kept.next(), kept.next()) {
        (Some(die), None) => die,
        _ => return CritType::None,
    };
    match the_die.number() {
        Ok(v) if v == Val::Int(20) => CritType::Crit,
        Ok(v) if v == Val::Int(1) => CritType::Fail,
        _ => CritType::None,
    }
}

/// Copies the AST, turning a leftmost `1d20` into `2d20kh1`/`kl1`.
pub(crate) fn apply_advantage(expr: &ast::Expression, adv: AdvType) -> ast::Expression {
    let mut copy = expr.clone();
    if adv != AdvType::None {
        rewrite_leftmost(&mut copy.roll, adv);
    }
    copy
}

fn rewrite_leftmost(node: &mut ast::Node, adv: AdvType) {
    match node {
        ast::Node::Dice { num, size, ops } => {
            if *num == 1 && *size == DiceSize::Int(20) {
                let sel = match adv {
                    AdvType::Adv => SetSelector::Highest(1),
                    AdvType::Dis => SetSelector::Lowest(1),
                    AdvType::None => return,
                };
                *num = 2;
                ops.insert(0, SetOperator::new(SetOperatorKind::Keep, vec![sel]));
            }
        }
        ast::Node::Annotated(value, _)
        | ast::Node::Parenthetical(value, _)
        | ast::Node::Unary(_, value) => rewrite_leftmost(value, adv),
        ast::Node::Binary(left, _, _) => rewrite_leftmost(left, adv),
        ast::Node::Set(values, _) => {
            if let Some(first) = values.first_mut() {
                rewrite_leftmost(first, adv);
            }
        }
        ast::Node::Int(_) | ast::Node::Float(_) => {}
    }
}

#[derive(Debug)]
struct CacheEntry {
    ast: Arc<ast::Expression>,
    uses: u64,
}

/// Least-frequently-used cache of parsed ASTs, keyed by the literal
/// expression string.
#[derive(Debug)]
struct AstCache {
    capacity: usize,
    entries: HashMap<String, CacheEntry>,
}

impl AstCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
        }
    }

    fn get(&mut self, key: &str) -> Option<Arc<ast::Expression>> {
        self.entries.get_mut(key).map(|entry| {
            entry.uses += 1;
            Arc::clone(&entry.ast)
        })
    }

    fn put(&mut self, key: &str, ast: Arc<ast::Expression>) {
        if self.capacity == 0 || self.entries.contains_key(key) {
            return;
        }
        if self.entries.len() >= self.capacity {
            let evict = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.uses)
                .map(|(k, _)| k.clone());
            if let Some(evict) = evict {
                self.entries.remove(&evict);
            }
        }
        self.entries.insert(key.to_string(), CacheEntry { ast, uses: 1 });
    }
}

/// A reusable roller. Holds the RNG, the budget configuration, and the AST
/// cache; independent `Roller`s share nothing.
pub struct Roller<R: DieRoller = DefaultRng> {
    rng: R,
    cache: AstCache,
    max_rolls: usize,
    max_ops: usize,
}

impl Roller {
    pub fn new() -> Self {
        Self::with_rng(DefaultRng::default())
    }
}

impl Default for Roller {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: DieRoller> Roller<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            cache: AstCache::new(DEFAULT_CACHE_SIZE),
            max_rolls: DEFAULT_MAX_ROLLS,
            max_ops: DEFAULT_MAX_OPS,
        }
    }

    /// Overrides the per-call roll and AST-node budgets.
    pub fn limits(mut self, max_rolls: usize, max_ops: usize) -> Self {
        self.max_rolls = max_rolls;
        self.max_ops = max_ops;
        self
    }

    /// Replaces the AST cache with one of the given capacity; 0 disables it.
    pub fn cache_size(mut self, capacity: usize) -> Self {
        self.cache = AstCache::new(capacity);
        self
    }

    /// Parses an expression, reusing the cache when possible. Comment mode
    /// bypasses the cache entirely: a trailing comment changes the parse, so
    /// results keyed by the bare string would be wrong.
    pub fn parse(&mut self, expr: &str, allow_comments: bool) -> crate::Result<Arc<ast::Expression>> {
        if allow_comments {
            return crate::parse::parse(expr, true).map(Arc::new);
        }
        if let Some(hit) = self.cache.get(expr) {
            return Ok(hit);
        }
        let parsed = Arc::new(crate::parse::parse(expr, false)?);
        self.cache.put(expr, Arc::clone(&parsed));
        Ok(parsed)
    }

    /// Rolls with the default markdown renderer, no comments, no advantage.
    pub fn roll(&mut self, expr: &str) -> crate::Result<RollResult> {
        self.roll_with(expr, &mut MarkdownStringifier::new(), false, AdvType::None)
    }

    pub fn roll_with(
        &mut self,
        expr: &str,
        stringifier: &mut dyn Stringifier,
        allow_comments: bool,
        adv: AdvType,
    ) -> crate::Result<RollResult> {
        let parsed = self.parse(expr, allow_comments)?;
        let rolled_ast = if adv == AdvType::None {
            Arc::clone(&parsed)
        } else {
            Arc::new(apply_advantage(&parsed, adv))
        };

        #[cfg(feature = "logging")]
        debug!("rolling {}", rolled_ast);

        let mut ctx = RollContext::with_limits(&mut self.rng, self.max_rolls, self.max_ops);
        let tree = eval(&rolled_ast, &mut ctx)?;
        let result = RollResult::new(rolled_ast, tree, stringifier)?;

        #[cfg(feature = "logging")]
        debug!("rolled {} = {}", expr, result.total);

        Ok(result)
    }
}
