// PHP tokenizer covering the subset of the language that configuration files use.
use std::ops::Range;

use logos::{Lexer, Logos};

#[derive(Logos, Clone, Copy, Debug, Eq, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    #[regex(r"<\?[pP][hH][pP]")]
    OpenTag,
    #[token("?>")]
    CloseTag,
    #[regex(r"//[^\n]*")]
    #[regex(r"#[^\n]*")]
    #[token("/*", block_comment)]
    Comment,
    #[regex(r"'([^'\\]|\\(.|\n))*'")]
    SingleQuoted,
    #[regex(r#""([^"\\]|\\(.|\n))*""#)]
    DoubleQuoted,
    /// `<<<ID` heredoc or `<<<'ID'` nowdoc, through the closing identifier.
    #[token("<<<", heredoc)]
    Heredoc,
    #[regex(r"\$[A-Za-z_][A-Za-z0-9_]*")]
    Variable,
    #[regex(r"[A-Za-z_\\][A-Za-z0-9_\\]*")]
    Ident,
    #[regex(r"[0-9][0-9_]*(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    #[regex(r"0[xX][0-9a-fA-F]+")]
    Number,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("::")]
    DoubleColon,
    #[token("?")]
    Question,
    #[token("??")]
    Coalesce,
    #[token("=")]
    Assign,
    #[token(".=")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("??=")]
    CompoundAssign,
    #[token("==")]
    Eq,
    #[token("!=")]
    #[token("<>")]
    NotEq,
    #[token("===")]
    Identical,
    #[token("!==")]
    NotIdentical,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("!")]
    Bang,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token(".")]
    Dot,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("++")]
    #[token("--")]
    IncDec,
    #[token("=>")]
    FatArrow,
    #[token("->")]
    Arrow,
    #[token("@")]
    At,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    /// Text outside `<?php ... ?>`.
    InlineHtml,
    Unknown,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    fn new(kind: TokenKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.clone()]
    }

    /// Keywords and function names are case-insensitive in PHP.
    pub fn is_word(&self, source: &str, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text(source).eq_ignore_ascii_case(word)
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, TokenKind::SingleQuoted | TokenKind::DoubleQuoted)
    }

    /// Decoded contents of a string literal token.
    pub fn string_value(&self, source: &str) -> Option<String> {
        let text = self.text(source);
        let body = text.get(1..text.len().saturating_sub(1))?;
        match self.kind {
            TokenKind::SingleQuoted => Some(unescape_single(body)),
            TokenKind::DoubleQuoted => Some(unescape_double(body)),
            _ => None,
        }
    }
}

/// Tokenize a PHP document; text before the first open tag is inline HTML.
pub fn tokenize(source: &str) -> Vec<Token> {
    lex(source, false)
}

/// Tokenize a fragment that is PHP code from its first byte.
pub fn tokenize_code(source: &str) -> Vec<Token> {
    lex(source, true)
}

/// Drop comments, keeping the tokens that carry meaning.
pub fn significant(tokens: Vec<Token>) -> Vec<Token> {
    tokens
        .into_iter()
        .filter(|token| token.kind != TokenKind::Comment)
        .collect()
}

fn lex(source: &str, mut in_code: bool) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut offset = 0;
    while offset < source.len() {
        if !in_code {
            let Some(start) = find_open_tag(source, offset) else {
                tokens.push(Token::new(TokenKind::InlineHtml, offset..source.len()));
                break;
            };
            if start > offset {
                tokens.push(Token::new(TokenKind::InlineHtml, offset..start));
            }
            offset = start;
        }
        match lex_code(source, offset, &mut tokens) {
            Some(end) => {
                offset = end;
                in_code = false;
            }
            None => break,
        }
    }
    tokens
}

// Returns the offset just past a closing tag, or None when the code runs to EOF.
fn lex_code(source: &str, base: usize, tokens: &mut Vec<Token>) -> Option<usize> {
    let mut lexer = TokenKind::lexer(&source[base..]);
    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = base + range.start..base + range.end;
        let kind = result.unwrap_or(TokenKind::Unknown);
        tokens.push(Token::new(kind, span.clone()));
        if kind == TokenKind::CloseTag {
            let rest = &source[span.end..];
            let newline = if rest.starts_with("\r\n") {
                2
            } else if rest.starts_with('\n') {
                1
            } else {
                0
            };
            return Some(span.end + newline);
        }
    }
    None
}

fn find_open_tag(source: &str, from: usize) -> Option<usize> {
    source[from..]
        .match_indices("<?")
        .map(|(idx, _)| from + idx)
        .find(|&idx| {
            source
                .get(idx + 2..idx + 5)
                .is_some_and(|tag| tag.eq_ignore_ascii_case("php"))
        })
}

// An unterminated comment runs to the end of the input, as in PHP.
fn block_comment(lex: &mut Lexer<TokenKind>) -> bool {
    let len = lex
        .remainder()
        .find("*/")
        .map_or(lex.remainder().len(), |end| end + 2);
    lex.bump(len);
    true
}

fn heredoc(lex: &mut Lexer<TokenKind>) -> bool {
    match heredoc_len(lex.remainder()) {
        Some(len) => {
            lex.bump(len);
            true
        }
        None => false,
    }
}

struct HeredocHeader<'a> {
    label: &'a str,
    /// Bytes through the newline ending the `<<<` line.
    len: usize,
    nowdoc: bool,
}

// Parses what follows `<<<`: optional blanks, `ID`, `"ID"` or `'ID'`, then a line break.
fn heredoc_header(rest: &str) -> Option<HeredocHeader<'_>> {
    let blanks = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    let mut idx = blanks;
    let quote = rest[idx..].chars().next().filter(|c| *c == '\'' || *c == '"');
    if quote.is_some() {
        idx += 1;
    }
    let label_len = rest[idx..]
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    if label_len == 0 || rest[idx..].starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let label = &rest[idx..idx + label_len];
    idx += label_len;
    if let Some(quote) = quote {
        if !rest[idx..].starts_with(quote) {
            return None;
        }
        idx += 1;
    }
    let newline = if rest[idx..].starts_with("\r\n") {
        2
    } else if rest[idx..].starts_with('\n') {
        1
    } else {
        return None;
    };
    Some(HeredocHeader {
        label,
        len: idx + newline,
        nowdoc: quote == Some('\''),
    })
}

// Length after `<<<` through the closing identifier, which may be indented.
fn heredoc_len(rest: &str) -> Option<usize> {
    let header = heredoc_header(rest)?;
    let mut line_start = header.len;
    loop {
        let line_end = rest[line_start..]
            .find('\n')
            .map_or(rest.len(), |idx| line_start + idx);
        let line = &rest[line_start..line_end];
        let code = line.trim_start_matches([' ', '\t']);
        let indent = line.len() - code.len();
        if let Some(after) = code.strip_prefix(header.label) {
            if !after.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
                return Some(line_start + indent + header.label.len());
            }
        }
        if line_end >= rest.len() {
            return None;
        }
        line_start = line_end + 1;
    }
}

/// Body of a heredoc token with the closing indentation removed, and whether it is a nowdoc.
pub fn heredoc_body(text: &str) -> Option<(String, bool)> {
    let rest = text.strip_prefix("<<<")?;
    let header = heredoc_header(rest)?;
    let content = rest.get(header.len..)?;
    let (body, closing) = match content.rfind('\n') {
        Some(newline) => (&content[..newline], &content[newline + 1..]),
        None => ("", content),
    };
    let indent = closing.strip_suffix(header.label)?;
    let body = body.strip_suffix('\r').unwrap_or(body);
    if body.is_empty() {
        return Some((String::new(), header.nowdoc));
    }
    let lines: Vec<&str> = body
        .split('\n')
        .map(|line| line.strip_prefix(indent).unwrap_or(line))
        .collect();
    Some((lines.join("\n"), header.nowdoc))
}

pub fn unescape_single(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(&next @ ('\\' | '\'')) = chars.peek() {
                out.push(next);
                chars.next();
                continue;
            }
        }
        out.push(ch);
    }
    out
}

pub fn unescape_double(body: &str) -> String {
    let chars: Vec<char> = body.chars().collect();
    let mut out = String::with_capacity(body.len());
    let mut idx = 0;
    while idx < chars.len() {
        let ch = chars[idx];
        if ch != '\\' || idx + 1 >= chars.len() {
            out.push(ch);
            idx += 1;
            continue;
        }
        let next = chars[idx + 1];
        let simple = match next {
            'n' => Some('\n'),
            't' => Some('\t'),
            'r' => Some('\r'),
            'v' => Some('\u{0b}'),
            'e' => Some('\u{1b}'),
            'f' => Some('\u{0c}'),
            '\\' => Some('\\'),
            '$' => Some('$'),
            '"' => Some('"'),
            _ => None,
        };
        if let Some(decoded) = simple {
            out.push(decoded);
            idx += 2;
            continue;
        }
        if next.is_digit(8) {
            let digits: String = chars[idx + 1..]
                .iter()
                .take(3)
                .take_while(|c| c.is_digit(8))
                .collect();
            let value = u32::from_str_radix(&digits, 8).unwrap_or(0) & 0xff;
            out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            idx += 1 + digits.len();
            continue;
        }
        if next == 'x' {
            let digits: String = chars[idx + 2..]
                .iter()
                .take(2)
                .take_while(|c| c.is_ascii_hexdigit())
                .collect();
            if !digits.is_empty() {
                let value = u32::from_str_radix(&digits, 16).unwrap_or(0);
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
                idx += 2 + digits.len();
                continue;
            }
        }
        if next == 'u' && chars.get(idx + 2) == Some(&'{') {
            let digits: String = chars[idx + 3..]
                .iter()
                .take_while(|c| c.is_ascii_hexdigit())
                .collect();
            if chars.get(idx + 3 + digits.len()) == Some(&'}') {
                if let Some(decoded) = u32::from_str_radix(&digits, 16)
                    .ok()
                    .and_then(char::from_u32)
                {
                    out.push(decoded);
                    idx += 4 + digits.len();
                    continue;
                }
            }
        }
        out.push('\\');
        idx += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn define_call_tokens() {
        let src = "<?php define( 'DB_NAME', \"wp\" );";
        assert_eq!(
            kinds(src),
            vec![
                TokenKind::OpenTag,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::SingleQuoted,
                TokenKind::Comma,
                TokenKind::DoubleQuoted,
                TokenKind::RParen,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn comments_are_single_tokens() {
        let src = "<?php\n// define('A', 1);\n# $b = 2;\n/* define('C', 3); */\n$d = 4;";
        let tokens = tokenize(src);
        let comments = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Comment)
            .count();
        assert_eq!(comments, 3);
        let rest = significant(tokens);
        assert_eq!(rest[1].text(src), "$d");
        assert_eq!(rest[2].kind, TokenKind::Assign);
    }

    #[test]
    fn doc_comments_end_at_the_first_close() {
        let src = "<?php\n/** The name of the database */\ndefine( 'DB_NAME', 'wp' );\n/**\n * Keys.\n **/\n$a = 1;";
        let tokens = significant(tokenize(src));
        assert_eq!(tokens[1].text(src), "define");
        assert!(tokens.iter().any(|t| t.text(src) == "$a"));
        assert!(tokens.iter().all(|t| t.kind != TokenKind::Unknown));

        let open = tokenize("<?php $a = 1; /* never closed");
        assert_eq!(open.last().map(|t| t.kind), Some(TokenKind::Comment));
    }

    #[test]
    fn heredocs_are_single_tokens() {
        let src = "<?php\n$sql = <<<SQL\nselect 1;\ndefine('FAKE', 'x');\nSQL;\n$b = <<<'RAW'\n  a $b\n  RAW;\n";
        let tokens = significant(tokenize(src));
        let docs: Vec<&Token> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Heredoc)
            .collect();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].text(src).ends_with("\nSQL"));
        assert!(!tokens.iter().any(|t| t.text(src) == "define"));
        assert_eq!(
            heredoc_body(docs[0].text(src)),
            Some(("select 1;\ndefine('FAKE', 'x');".to_string(), false))
        );
        assert_eq!(
            heredoc_body(docs[1].text(src)),
            Some(("a $b".to_string(), true))
        );
    }

    #[test]
    fn heredoc_label_must_stand_alone() {
        let src = "<<<EOT\nEOTX\n  EOT\n";
        let tokens = tokenize_code(src);
        assert_eq!(tokens[0].kind, TokenKind::Heredoc);
        assert_eq!(heredoc_body(tokens[0].text(src)), Some(("EOTX".to_string(), false)));
    }

    #[test]
    fn text_outside_tags_is_inline_html() {
        let src = "header\n<?php $a = 1; ?>\nfooter <?php $b = 2;";
        let tokens = tokenize(src);
        assert_eq!(tokens[0].kind, TokenKind::InlineHtml);
        assert_eq!(tokens[0].text(src), "header\n");
        let html: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::InlineHtml)
            .map(|t| t.text(src))
            .collect();
        assert_eq!(html, vec!["header\n", "footer "]);
        assert!(tokens.iter().any(|t| t.text(src) == "$b"));
    }

    #[test]
    fn code_mode_needs_no_open_tag() {
        let tokens = tokenize_code("define('AUTH_KEY', 'x');");
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens.len(), 7);
    }

    #[test]
    fn strings_keep_escaped_quotes_inside() {
        let src = r#"<?php $a = 'it\'s'; $b = "say \"hi\"";"#;
        let tokens = significant(tokenize(src));
        assert_eq!(tokens[3].string_value(src).as_deref(), Some("it's"));
        assert_eq!(tokens[7].string_value(src).as_deref(), Some("say \"hi\""));
    }

    #[test]
    fn operators_prefer_longest_match() {
        assert_eq!(
            kinds("<?php === !== == != ?? ?>"),
            vec![
                TokenKind::OpenTag,
                TokenKind::Identical,
                TokenKind::NotIdentical,
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::Coalesce,
                TokenKind::CloseTag,
            ]
        );
    }

    #[test]
    fn single_quote_unescape_only_touches_quote_and_backslash() {
        assert_eq!(unescape_single(r"a\'b\\c\nd"), r"a'b\c\nd");
    }

    #[test]
    fn double_quote_unescape_handles_common_sequences() {
        assert_eq!(unescape_double(r"a\tb\n\$x\\\x41\101\u{1F600}"), "a\tb\n$x\\AA\u{1F600}");
        assert_eq!(unescape_double(r"keep \q"), r"keep \q");
    }
}
