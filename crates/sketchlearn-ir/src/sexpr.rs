//! Minimal s-expression reader for policy text and solver replies.

use crate::error::IrError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SExpr {
    Atom(String),
    Str(String),
    List(Vec<SExpr>),
}

impl SExpr {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SExpr::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(items) => Some(items),
            _ => None,
        }
    }

    /// First atom of a list, e.g. `:rule` in `(:rule ...)`.
    pub fn head(&self) -> Option<&str> {
        self.as_list()?.first()?.as_atom()
    }
}

/// Parse every top-level expression in `input`. `;` starts a line comment.
pub fn parse(input: &str) -> Result<Vec<SExpr>, IrError> {
    let mut stack: Vec<Vec<SExpr>> = vec![Vec::new()];
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '(' => stack.push(Vec::new()),
            ')' => {
                let done = stack
                    .pop()
                    .filter(|_| !stack.is_empty())
                    .ok_or_else(|| IrError::PolicyParse("unbalanced `)`".into()))?;
                if let Some(parent) = stack.last_mut() {
                    parent.push(SExpr::List(done));
                }
            }
            ';' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '"' => {
                let mut text = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                text.push(escaped);
                            }
                        }
                        '"' => {
                            closed = true;
                            break;
                        }
                        other => text.push(other),
                    }
                }
                if !closed {
                    return Err(IrError::PolicyParse("unterminated string".into()));
                }
                push_item(&mut stack, SExpr::Str(text));
            }
            '|' => {
                let mut symbol = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '|' {
                        closed = true;
                        break;
                    }
                    symbol.push(c);
                }
                if !closed {
                    return Err(IrError::PolicyParse("unterminated quoted symbol".into()));
                }
                push_item(&mut stack, SExpr::Atom(symbol));
            }
            c if c.is_whitespace() => {}
            c => {
                let mut atom = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || matches!(next, '(' | ')' | '"' | ';') {
                        break;
                    }
                    atom.push(next);
                    chars.next();
                }
                push_item(&mut stack, SExpr::Atom(atom));
            }
        }
    }
    if stack.len() != 1 {
        return Err(IrError::PolicyParse("unbalanced `(`".into()));
    }
    Ok(stack.pop().unwrap_or_default())
}

fn push_item(stack: &mut [Vec<SExpr>], item: SExpr) {
    if let Some(top) = stack.last_mut() {
        top.push(item);
    }
}

/// Quote `text` as a string literal understood by [`parse`].
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
