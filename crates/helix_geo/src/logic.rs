//! Postfix CSG logic over surface senses.
//!
//! Expressions are written in reverse Polish notation over local surface
//! ids: an integer pushes "inside that surface", `~` negates, `&` and `|`
//! combine the top two entries and `*` pushes true. For example a box
//! between `x=0` (surface 0) and `x=1` (surface 1) is `0 ~ 1 &`.

use crate::types::{FaceId, LocalSurfaceId, Sense};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicToken {
    Face(FaceId),
    True,
    Not,
    And,
    Or,
}

/// Logic with surface references rewritten as indices into a face list.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledLogic {
    /// Sorted, unique local surfaces referenced by the expression.
    pub faces: Vec<LocalSurfaceId>,
    pub tokens: Vec<LogicToken>,
    /// Whether the expression is an AND of (possibly negated) faces, in
    /// which case the nearest face crossing always exits the volume.
    pub is_conjunction: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogicError {
    #[error("expression is empty")]
    Empty,
    #[error("unexpected character '{0}'")]
    BadCharacter(char),
    #[error("operator '{0}' lacks operands")]
    MissingOperand(char),
    #[error("expression leaves {0} values on the stack")]
    Unbalanced(usize),
    #[error("expression nests too deeply")]
    TooDeep,
    #[error("surface {0} does not exist")]
    UnknownSurface(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawToken {
    Surface(usize),
    True,
    Not,
    And,
    Or,
}

fn tokenize(expr: &str) -> Result<Vec<RawToken>, LogicError> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '~' => tokens.push(RawToken::Not),
            '&' => tokens.push(RawToken::And),
            '|' => tokens.push(RawToken::Or),
            '*' => tokens.push(RawToken::True),
            '0'..='9' => {
                let mut value = c as usize - '0' as usize;
                while let Some(&next) = chars.peek() {
                    match next.to_digit(10) {
                        Some(d) => {
                            value = value * 10 + d as usize;
                            chars.next();
                        }
                        None => break,
                    }
                }
                tokens.push(RawToken::Surface(value));
            }
            other => return Err(LogicError::BadCharacter(other)),
        }
    }
    Ok(tokens)
}

pub fn compile(expr: &str, num_surfaces: usize) -> Result<CompiledLogic, LogicError> {
    let raw = tokenize(expr)?;
    if raw.is_empty() {
        return Err(LogicError::Empty);
    }

    // Validate stack usage
    let mut depth = 0usize;
    for token in &raw {
        match *token {
            RawToken::Surface(s) => {
                if s >= num_surfaces {
                    return Err(LogicError::UnknownSurface(s));
                }
                depth += 1;
            }
            RawToken::True => depth += 1,
            RawToken::Not => {
                if depth < 1 {
                    return Err(LogicError::MissingOperand('~'));
                }
            }
            RawToken::And | RawToken::Or => {
                if depth < 2 {
                    let op = if *token == RawToken::And { '&' } else { '|' };
                    return Err(LogicError::MissingOperand(op));
                }
                depth -= 1;
            }
        }
        if depth > LogicStack::MAX_DEPTH {
            return Err(LogicError::TooDeep);
        }
    }
    if depth != 1 {
        return Err(LogicError::Unbalanced(depth));
    }

    let mut faces: Vec<LocalSurfaceId> = raw
        .iter()
        .filter_map(|t| match t {
            RawToken::Surface(s) => Some(LocalSurfaceId::new(*s)),
            _ => None,
        })
        .collect();
    faces.sort_unstable();
    faces.dedup();

    let tokens: Vec<LogicToken> = raw
        .iter()
        .map(|t| match *t {
            RawToken::Surface(s) => {
                let face = faces.partition_point(|f| f.get() < s);
                LogicToken::Face(FaceId::new(face))
            }
            RawToken::True => LogicToken::True,
            RawToken::Not => LogicToken::Not,
            RawToken::And => LogicToken::And,
            RawToken::Or => LogicToken::Or,
        })
        .collect();

    let is_conjunction = is_conjunction(&tokens, faces.len());
    Ok(CompiledLogic {
        faces,
        tokens,
        is_conjunction,
    })
}

/// Match `lit (lit &)*` where `lit` is a face optionally followed by `~`,
/// with each face used once.
fn is_conjunction(tokens: &[LogicToken], num_faces: usize) -> bool {
    let mut iter = tokens.iter().peekable();
    let mut num_literals = 0;
    loop {
        match iter.next() {
            Some(LogicToken::Face(_)) => {}
            Some(LogicToken::True) if tokens.len() == 1 => return true,
            _ => return false,
        }
        if iter.peek() == Some(&&LogicToken::Not) {
            iter.next();
        }
        num_literals += 1;
        if num_literals > 1 && iter.next() != Some(&LogicToken::And) {
            return false;
        }
        if iter.peek().is_none() {
            return num_literals == num_faces;
        }
    }
}

/// Fixed-capacity stack of booleans packed into a word.
#[derive(Debug, Clone, Copy, Default)]
struct LogicStack {
    data: u64,
    size: usize,
}

impl LogicStack {
    const MAX_DEPTH: usize = 64;

    fn push(&mut self, value: bool) {
        debug_assert!(self.size < Self::MAX_DEPTH);
        self.data = (self.data << 1) | u64::from(value);
        self.size += 1;
    }

    fn pop(&mut self) -> bool {
        debug_assert!(self.size > 0);
        let result = self.data & 1 == 1;
        self.data >>= 1;
        self.size -= 1;
        result
    }

    fn apply_not(&mut self) {
        debug_assert!(self.size > 0);
        self.data ^= 1;
    }
}

/// Evaluate compiled logic given the sense of each face.
pub fn evaluate(tokens: &[LogicToken], senses: &[Sense]) -> bool {
    let mut stack = LogicStack::default();
    for token in tokens {
        match *token {
            LogicToken::Face(face) => stack.push(senses[face.get()].is_inside()),
            LogicToken::True => stack.push(true),
            LogicToken::Not => stack.apply_not(),
            LogicToken::And => {
                let a = stack.pop();
                let b = stack.pop();
                stack.push(a && b);
            }
            LogicToken::Or => {
                let a = stack.pop();
                let b = stack.pop();
                stack.push(a || b);
            }
        }
    }
    debug_assert_eq!(stack.size, 1);
    stack.pop()
}
