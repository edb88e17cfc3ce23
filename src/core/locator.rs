//! Purpose: Find the statements that define a constant or variable in raw PHP source.
//! Exports: `Definition`, `DefinitionKind`, `DefinitionValue`, `find`, `find_all`.
//! Role: Static, token-based matcher used by the transformer; never executes code.
//! Invariants: Only `define('NAME', value);` and `$name = value;` at statement starts match.
//! Invariants: Occurrences inside comments and string literals never match.
//! Invariants: When a name is defined more than once, the last occurrence wins.
use std::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::core::lexer::{Token, TokenKind, significant, tokenize, tokenize_code};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Constant,
    Variable,
}

impl DefinitionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DefinitionKind::Constant => "constant",
            DefinitionKind::Variable => "variable",
        }
    }
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current value of a definition as written in the source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DefinitionValue {
    /// A single string literal, decoded.
    Quoted(String),
    /// Any other expression, verbatim.
    Raw(String),
}

impl DefinitionValue {
    pub fn as_str(&self) -> &str {
        match self {
            DefinitionValue::Quoted(value) | DefinitionValue::Raw(value) => value,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, DefinitionValue::Raw(_))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Definition {
    pub name: String,
    pub kind: DefinitionKind,
    pub value: DefinitionValue,
    /// The whole statement, through its terminating `;`.
    pub span: Range<usize>,
    /// The value expression inside the statement.
    pub value_span: Range<usize>,
}

/// Locate the last definition of `name` with the given kind.
pub fn find(source: &str, kind: DefinitionKind, name: &str) -> Option<Definition> {
    find_all(source)
        .into_iter()
        .rev()
        .find(|def| def.kind == kind && def.name == name)
}

/// Count the occurrences of `name`; more than one means earlier ones are shadowed.
pub fn occurrences(source: &str, kind: DefinitionKind, name: &str) -> usize {
    find_all(source)
        .iter()
        .filter(|def| def.kind == kind && def.name == name)
        .count()
}

/// Every definition in the document, in source order.
pub fn find_all(source: &str) -> Vec<Definition> {
    scan(source, &significant(tokenize(source)))
}

/// Like `find_all` for a fragment without an opening `<?php` tag.
pub fn find_all_in_code(source: &str) -> Vec<Definition> {
    scan(source, &significant(tokenize_code(source)))
}

// Keywords whose parenthesised header may be followed by a brace-less body.
const CONTROL_KEYWORDS: [&str; 5] = ["if", "elseif", "while", "for", "foreach"];

fn scan(source: &str, tokens: &[Token]) -> Vec<Definition> {
    let header_ends = control_header_ends(source, tokens);
    let mut found = Vec::new();
    let mut idx = 0;
    while idx < tokens.len() {
        if at_statement_start(source, tokens, idx, &header_ends) {
            let matched = match_constant(source, tokens, idx)
                .or_else(|| match_variable(source, tokens, idx));
            if let Some((definition, next)) = matched {
                found.push(definition);
                idx = next;
                continue;
            }
        }
        idx += 1;
    }
    found
}

// Sorted indices of the `)` closing each control-structure header.
fn control_header_ends(source: &str, tokens: &[Token]) -> Vec<usize> {
    let mut ends: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(idx, token)| {
            CONTROL_KEYWORDS.iter().any(|word| token.is_word(source, word))
                && kind_at(tokens, idx + 1) == Some(TokenKind::LParen)
        })
        .filter_map(|(idx, _)| matching_paren(tokens, idx + 1))
        .collect();
    ends.sort_unstable();
    ends.dedup();
    ends
}

fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            TokenKind::CloseTag | TokenKind::InlineHtml | TokenKind::OpenTag => return None,
            _ => {}
        }
    }
    None
}

fn at_statement_start(
    source: &str,
    tokens: &[Token],
    idx: usize,
    header_ends: &[usize],
) -> bool {
    let Some(prev_idx) = idx.checked_sub(1) else {
        return true;
    };
    let prev = &tokens[prev_idx];
    match prev.kind {
        TokenKind::Semicolon
        | TokenKind::LBrace
        | TokenKind::RBrace
        | TokenKind::Colon
        | TokenKind::OpenTag
        | TokenKind::InlineHtml => true,
        TokenKind::RParen => header_ends.binary_search(&prev_idx).is_ok(),
        _ => prev.is_word(source, "else"),
    }
}

fn kind_at(tokens: &[Token], idx: usize) -> Option<TokenKind> {
    tokens.get(idx).map(|token| token.kind)
}

// `define ( 'NAME' , value [, flag] ) ;`
fn match_constant(source: &str, tokens: &[Token], start: usize) -> Option<(Definition, usize)> {
    if !tokens[start].is_word(source, "define") {
        return None;
    }
    if kind_at(tokens, start + 1)? != TokenKind::LParen {
        return None;
    }
    let name_token = tokens.get(start + 2)?;
    if !name_token.is_string() || kind_at(tokens, start + 3)? != TokenKind::Comma {
        return None;
    }
    let name = name_token.string_value(source)?;

    let value_start = start + 4;
    let (value_end, stop) = scan_expression(tokens, value_start, |kind| {
        matches!(kind, TokenKind::Comma | TokenKind::RParen)
    })?;
    let mut close = value_end;
    if stop == TokenKind::Comma {
        let (flag_end, flag_stop) =
            scan_expression(tokens, value_end + 1, |kind| kind == TokenKind::RParen)?;
        if flag_stop != TokenKind::RParen || flag_end == value_end + 1 {
            return None;
        }
        close = flag_end;
    }
    if kind_at(tokens, close + 1)? != TokenKind::Semicolon {
        return None;
    }

    let definition = build(
        source,
        tokens,
        name,
        DefinitionKind::Constant,
        start,
        value_start..value_end,
        close + 1,
    );
    Some((definition, close + 2))
}

// `$name = value ;`
fn match_variable(source: &str, tokens: &[Token], start: usize) -> Option<(Definition, usize)> {
    let token = &tokens[start];
    if token.kind != TokenKind::Variable || kind_at(tokens, start + 1)? != TokenKind::Assign {
        return None;
    }
    let name = token.text(source)[1..].to_string();
    let value_start = start + 2;
    let (value_end, _) =
        scan_expression(tokens, value_start, |kind| kind == TokenKind::Semicolon)?;

    let definition = build(
        source,
        tokens,
        name,
        DefinitionKind::Variable,
        start,
        value_start..value_end,
        value_end,
    );
    Some((definition, value_end + 1))
}

// Walk an expression until a depth-zero stop token; returns (stop index, stop kind).
// Fails on an empty expression or when the statement is cut short.
fn scan_expression(
    tokens: &[Token],
    from: usize,
    is_stop: impl Fn(TokenKind) -> bool,
) -> Option<(usize, TokenKind)> {
    let mut depth = 0usize;
    let mut idx = from;
    while let Some(token) = tokens.get(idx) {
        let kind = token.kind;
        if depth == 0 && is_stop(kind) {
            return (idx > from).then_some((idx, kind));
        }
        match kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                depth = depth.checked_sub(1)?;
            }
            TokenKind::Semicolon if depth == 0 => return None,
            TokenKind::CloseTag | TokenKind::InlineHtml | TokenKind::OpenTag => return None,
            _ => {}
        }
        idx += 1;
    }
    None
}

fn build(
    source: &str,
    tokens: &[Token],
    name: String,
    kind: DefinitionKind,
    start: usize,
    value_tokens: Range<usize>,
    terminator: usize,
) -> Definition {
    let first = &tokens[value_tokens.start];
    let last = &tokens[value_tokens.end - 1];
    let value_span = first.span.start..last.span.end;
    let value = match (value_tokens.len(), first.string_value(source)) {
        (1, Some(decoded)) => DefinitionValue::Quoted(decoded),
        _ => DefinitionValue::Raw(source[value_span.clone()].to_string()),
    };
    Definition {
        name,
        kind,
        value,
        span: tokens[start].span.start..tokens[terminator].span.end,
        value_span,
    }
}
