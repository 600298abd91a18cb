//! Tokenizer and recursive-descent parser for the dice language.
//!
//! Precedence, tightest-binding first: atoms (dice, literals, sets) >
//! unary `+`/`-` > `* / // %` > `+ -` > comparisons. Set operator suffixes
//! are accepted on any set-like atom here; which operators are legal on which
//! target is the evaluator's business.

use crate::ast::{Expression, Node};
use crate::error::RollError;
use crate::ops::{
    simplify_ops, BinaryOperator, DiceSize, Float, Int, SetOperator, SetOperatorKind, SetSelector,
    UnaryOperator,
};
use logos::Logos;
use std::ops::Range;
use std::str::FromStr;

type PResult<T> = Result<T, RollError>;

/// Parses a dice expression. With `allow_comments`, any trailing text that
/// cannot continue the expression is split off as the comment.
pub fn parse(input: &str, allow_comments: bool) -> PResult<Expression> {
    let mut parser = Parser::new(input);
    let roll = parser.parse_node()?;
    let comment = parser.finish(allow_comments)?;
    Ok(Expression::new(roll, comment))
}

#[derive(Logos, Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum TokenKind {
    #[regex(r"[0-9]+")]
    Integer,
    #[regex(r"([0-9]+\.[0-9]*)|(\.[0-9]+)")]
    Decimal,

    // A whole dice atom; an omitted count means one die.
    #[regex(r"[0-9]*d(%|[0-9]+)")]
    Dice,

    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token(",")]
    Comma,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("//")]
    SlashSlash,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("==")]
    EqualEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("<=")]
    LessEqual,
    #[token("!=")]
    BangEqual,
    #[token("<")]
    LessThan,
    #[token(">")]
    GreaterThan,

    #[token("k")]
    OpKeep,
    #[token("p")]
    OpDrop,
    #[token("rr")]
    OpReroll,
    #[token("ro")]
    OpRerollOnce,
    #[token("ra")]
    OpRerollAdd,
    #[token("e")]
    OpExplode,
    #[token("mi")]
    OpMinimum,
    #[token("ma")]
    OpMaximum,

    #[token("h")]
    SelHighest,
    #[token("l")]
    SelLowest,

    #[regex(r"\[[^\]]*\]")]
    Annotation,

    #[regex(r"[ \t\r\n]+", logos::skip)]
    #[error]
    Error,
}

impl TokenKind {
    fn to_str(self) -> &'static str {
        use TokenKind::*;

        match self {
            Integer => "<integer>",
            Decimal => "<decimal>",
            Dice => "<dice>",
            LeftParen => "'('",
            RightParen => "')'",
            Comma => "','",
            Plus => "'+'",
            Minus => "'-'",
            Star => "'*'",
            SlashSlash => "'//'",
            Slash => "'/'",
            Percent => "'%'",
            EqualEqual => "'=='",
            GreaterEqual => "'>='",
            LessEqual => "'<='",
            BangEqual => "'!='",
            LessThan => "'<'",
            GreaterThan => "'>'",
            OpKeep => "'k'",
            OpDrop => "'p'",
            OpReroll => "'rr'",
            OpRerollOnce => "'ro'",
            OpRerollAdd => "'ra'",
            OpExplode => "'e'",
            OpMinimum => "'mi'",
            OpMaximum => "'ma'",
            SelHighest => "'h'",
            SelLowest => "'l'",
            Annotation => "<annotation>",
            Error => "<unrecognized input>",
        }
    }
}

fn fmt_expected(expected: &[TokenKind]) -> String {
    match expected {
        [] => String::new(),
        [a] => a.to_str().to_string(),
        [a, b] => format!("{} or {}", a.to_str(), b.to_str()),
        many => {
            let head = many[..many.len() - 1]
                .iter()
                .map(|t| t.to_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}, or {}", head, many[many.len() - 1].to_str())
        }
    }
}

struct Token {
    kind: TokenKind,
    span: Range<usize>,
}

struct Parser<'a> {
    src: &'a str,
    lexer: logos::Lexer<'a, TokenKind>,
    peeked: Option<Option<Token>>,
}

impl<'a> Parser<'a> {
    const COMPARISON_OPS: &'static [TokenKind] = &[
        TokenKind::LessThan,
        TokenKind::GreaterThan,
        TokenKind::LessEqual,
        TokenKind::GreaterEqual,
        TokenKind::EqualEqual,
        TokenKind::BangEqual,
    ];

    const ADDITION_OPS: &'static [TokenKind] = &[TokenKind::Plus, TokenKind::Minus];

    const MULTIPLICATION_OPS: &'static [TokenKind] = &[
        TokenKind::Star,
        TokenKind::Slash,
        TokenKind::SlashSlash,
        TokenKind::Percent,
    ];

    const SET_OPS: &'static [TokenKind] = &[
        TokenKind::OpKeep,
        TokenKind::OpDrop,
        TokenKind::OpReroll,
        TokenKind::OpRerollOnce,
        TokenKind::OpRerollAdd,
        TokenKind::OpExplode,
        TokenKind::OpMinimum,
        TokenKind::OpMaximum,
    ];

    const SELECTOR_PREFIXES: &'static [TokenKind] = &[
        TokenKind::SelHighest,
        TokenKind::SelLowest,
        TokenKind::LessThan,
        TokenKind::GreaterThan,
    ];

    fn new(src: &'a str) -> Self {
        Self {
            src,
            lexer: TokenKind::lexer(src),
            peeked: None,
        }
    }

    fn peek_token(&mut self) -> Option<&Token> {
        if self.peeked.is_none() {
            let next = self.lexer.next().map(|kind| Token {
                kind,
                span: self.lexer.span(),
            });
            self.peeked = Some(next);
        }
        self.peeked.as_ref().unwrap().as_ref()
    }

    fn peek(&mut self) -> Option<TokenKind> {
        self.peek_token().map(|t| t.kind)
    }

    fn next_token(&mut self) -> Option<Token> {
        match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next().map(|kind| Token {
                kind,
                span: self.lexer.span(),
            }),
        }
    }

    fn slice(&self, token: &Token) -> &'a str {
        &self.src[token.span.clone()]
    }

    fn matches_any(&mut self, options: &[TokenKind]) -> bool {
        self.peek().map_or(false, |kind| options.contains(&kind))
    }

    fn consume(&mut self, expected: TokenKind) -> PResult<Token> {
        if self.peek() == Some(expected) {
            Ok(self.next_token().unwrap())
        } else {
            self.unexpected(&[expected])
        }
    }

    fn error_at<T>(&self, token: Option<&Token>, expected: &[TokenKind]) -> PResult<T> {
        let (position, found) = match token {
            Some(t) => (t.span.start, format!("{:?}", &self.src[t.span.clone()])),
            None => (self.src.len(), "<end of input>".to_string()),
        };
        Err(RollError::Syntax {
            position,
            found,
            expected: fmt_expected(expected),
        })
    }

    fn unexpected<T>(&mut self, expected: &[TokenKind]) -> PResult<T> {
        let token = self.next_token();
        self.error_at(token.as_ref(), expected)
    }

    fn number_from<T: FromStr>(&self, token: &Token, text: &str) -> PResult<T> {
        text.parse().map_err(|_| RollError::Syntax {
            position: token.span.start,
            found: format!("{:?}", self.slice(token)),
            expected: "a representable number".to_string(),
        })
    }

    fn finish(&mut self, allow_comments: bool) -> PResult<Option<String>> {
        let span = match self.peek_token() {
            None => return Ok(None),
            Some(token) => token.span.clone(),
        };
        if allow_comments {
            let comment = self.src[span.start..].trim();
            Ok(if comment.is_empty() {
                None
            } else {
                Some(comment.to_string())
            })
        } else {
            Err(RollError::Syntax {
                position: span.start,
                found: format!("{:?}", &self.src[span]),
                expected: "end of input".to_string(),
            })
        }
    }

    fn parse_node(&mut self) -> PResult<Node> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<Node> {
        let mut lhs = self.parse_addition()?;
        while self.matches_any(Self::COMPARISON_OPS) {
            let op = binary_op(self.next_token().unwrap().kind);
            let rhs = self.parse_addition()?;
            lhs = Node::binary(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn parse_addition(&mut self) -> PResult<Node> {
        let mut lhs = self.parse_multiplication()?;
        while self.matches_any(Self::ADDITION_OPS) {
            let op = binary_op(self.next_token().unwrap().kind);
            let rhs = self.parse_multiplication()?;
            lhs = Node::binary(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplication(&mut self) -> PResult<Node> {
        let mut lhs = self.parse_unary()?;
        while self.matches_any(Self::MULTIPLICATION_OPS) {
            let op = binary_op(self.next_token().unwrap().kind);
            let rhs = self.parse_unary()?;
            lhs = Node::binary(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Node> {
        let op = match self.peek() {
            Some(TokenKind::Plus) => UnaryOperator::Plus,
            Some(TokenKind::Minus) => UnaryOperator::Minus,
            _ => return self.parse_atom(),
        };
        self.next_token();
        Ok(Node::unary(op, self.parse_unary()?))
    }

    fn parse_atom(&mut self) -> PResult<Node> {
        let atom = match self.peek() {
            Some(TokenKind::LeftParen) => self.parse_set_or_parens()?,
            Some(TokenKind::Integer) => {
                let token = self.next_token().unwrap();
                Node::Int(self.number_from(&token, self.slice(&token))?)
            }
            Some(TokenKind::Decimal) => {
                let token = self.next_token().unwrap();
                Node::Float(self.number_from::<Float>(&token, self.slice(&token))?)
            }
            Some(TokenKind::Dice) => self.parse_dice()?,
            _ => {
                return self.unexpected(&[
                    TokenKind::LeftParen,
                    TokenKind::Integer,
                    TokenKind::Decimal,
                    TokenKind::Dice,
                ])
            }
        };

        let mut annotations = Vec::new();
        while self.peek() == Some(TokenKind::Annotation) {
            let token = self.next_token().unwrap();
            let slice = self.slice(&token);
            annotations.push(slice[1..slice.len() - 1].trim().to_string());
        }

        Ok(if annotations.is_empty() {
            atom
        } else {
            Node::annotated(atom, annotations)
        })
    }

    fn parse_set_or_parens(&mut self) -> PResult<Node> {
        self.consume(TokenKind::LeftParen)?;

        if self.peek() == Some(TokenKind::RightParen) {
            self.next_token();
            let ops = self.parse_ops()?;
            return Ok(Node::Set(Vec::new(), ops));
        }

        let first = self.parse_node()?;
        if self.peek() == Some(TokenKind::Comma) {
            let mut items = vec![first];
            while self.peek() == Some(TokenKind::Comma) {
                self.next_token();
                if self.peek() == Some(TokenKind::RightParen) {
                    break;
                }
                items.push(self.parse_node()?);
            }
            self.consume(TokenKind::RightParen)?;
            let ops = self.parse_ops()?;
            Ok(Node::Set(items, ops))
        } else {
            self.consume(TokenKind::RightParen)?;
            let ops = self.parse_ops()?;
            Ok(Node::parenthetical(first, ops))
        }
    }

    fn parse_dice(&mut self) -> PResult<Node> {
        let token = self.consume(TokenKind::Dice)?;
        let slice = self.slice(&token);
        // The lexer guarantees the shape `<digits?>d<digits or %>`.
        let (num, size) = slice.split_once('d').unwrap();
        let num: Int = if num.is_empty() {
            1
        } else {
            self.number_from(&token, num)?
        };
        let size = if size == "%" {
            DiceSize::Percentile
        } else {
            DiceSize::Int(self.number_from(&token, size)?)
        };

        let ops = self.parse_ops()?;
        Ok(Node::Dice { num, size, ops })
    }

    fn parse_ops(&mut self) -> PResult<Vec<SetOperator>> {
        let mut ops = Vec::new();
        while self.matches_any(Self::SET_OPS) {
            let kind = match self.next_token().unwrap().kind {
                TokenKind::OpKeep => SetOperatorKind::Keep,
                TokenKind::OpDrop => SetOperatorKind::Drop,
                TokenKind::OpReroll => SetOperatorKind::Reroll,
                TokenKind::OpRerollOnce => SetOperatorKind::RerollOnce,
                TokenKind::OpRerollAdd => SetOperatorKind::RerollAdd,
                TokenKind::OpExplode => SetOperatorKind::Explode,
                TokenKind::OpMinimum => SetOperatorKind::Minimum,
                TokenKind::OpMaximum => SetOperatorKind::Maximum,
                _ => unreachable!(),
            };
            let sel = self.parse_selector()?;
            ops.push(SetOperator::new(kind, vec![sel]));
        }
        simplify_ops(&mut ops);
        Ok(ops)
    }

    fn parse_selector(&mut self) -> PResult<SetSelector> {
        let prefix = if self.matches_any(Self::SELECTOR_PREFIXES) {
            Some(self.next_token().unwrap().kind)
        } else {
            None
        };

        if self.peek() != Some(TokenKind::Integer) {
            let mut expected = vec![TokenKind::Integer];
            if prefix.is_none() {
                expected.extend_from_slice(Self::SELECTOR_PREFIXES);
            }
            return self.unexpected(&expected);
        }
        let token = self.next_token().unwrap();
        let num: Int = self.number_from(&token, self.slice(&token))?;

        Ok(match prefix {
            Some(TokenKind::SelHighest) => SetSelector::Highest(num),
            Some(TokenKind::SelLowest) => SetSelector::Lowest(num),
            Some(TokenKind::LessThan) => SetSelector::LessThan(num),
            Some(TokenKind::GreaterThan) => SetSelector::GreaterThan(num),
            None => SetSelector::EqualTo(num),
            _ => unreachable!(),
        })
    }
}

fn binary_op(kind: TokenKind) -> BinaryOperator {
    match kind {
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Minus => BinaryOperator::Sub,
        TokenKind::Star => BinaryOperator::Mul,
        TokenKind::Slash => BinaryOperator::Div,
        TokenKind::SlashSlash => BinaryOperator::FloorDiv,
        TokenKind::Percent => BinaryOperator::Mod,
        TokenKind::LessThan => BinaryOperator::Lt,
        TokenKind::GreaterThan => BinaryOperator::Gt,
        TokenKind::LessEqual => BinaryOperator::Le,
        TokenKind::GreaterEqual => BinaryOperator::Ge,
        TokenKind::EqualEqual => BinaryOperator::Eq,
        TokenKind::BangEqual => BinaryOperator::Ne,
        _ => unreachable!(),
    }
}
