//! Parser for the declarative grammar expression DSL.
//!
//! The language is deliberately tiny: a grammar is a sequence of rules, each
//! `name:` followed by exactly one expression built from the five
//! combinators. Expressions may span lines; `%%` starts a comment.
//!
//! ```text
//! %% SQL-ish fragment
//! title: SELECT statement
//!
//! select-stmt:
//!   seq("SELECT", opt("DISTINCT"), loop(<result-column>))
//! ```

use crate::expr::{Expr, Grammar};
use crate::{Error, Result};
use serde::Serialize;

/// A recoverable per-rule parse failure, reported when parsing leniently.
#[derive(Debug, Clone, Serialize)]
pub struct GrammarIssue {
    /// Rule name when the failure happened inside a rule body.
    pub rule: Option<String>,
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Quoted(String),
    Angle(String),
    LParen,
    RParen,
    Comma,
    Colon,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: usize,
}

fn parse_err(line: usize, message: impl Into<String>) -> Error {
    Error::GrammarParse {
        line,
        message: message.into(),
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || c == '.'
}

struct Tokenized {
    title: Option<String>,
    tokens: Vec<Token>,
}

fn tokenize(code: &str) -> Result<Tokenized> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut title: Option<String> = None;
    let mut depth: usize = 0;

    for (idx, raw_line) in code.lines().enumerate() {
        let line_no = idx + 1;

        // A `title:` directive is free text to end of line, recognized only
        // between rules (never inside a parenthesized expression).
        if depth == 0 {
            let t = raw_line.trim_start();
            if let Some(rest) = t.strip_prefix("title:") {
                if title.is_some() {
                    return Err(parse_err(line_no, "duplicate title directive"));
                }
                let value = strip_line_comment(rest).trim().to_string();
                if value.is_empty() {
                    return Err(parse_err(line_no, "empty title directive"));
                }
                title = Some(value);
                continue;
            }
        }

        let mut chars = raw_line.char_indices().peekable();
        while let Some((pos, c)) = chars.next() {
            match c {
                '%' if matches!(chars.peek(), Some((_, '%'))) => break,
                c if c.is_whitespace() => {}
                '(' => {
                    depth += 1;
                    tokens.push(Token {
                        tok: Tok::LParen,
                        line: line_no,
                    });
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    tokens.push(Token {
                        tok: Tok::RParen,
                        line: line_no,
                    });
                }
                ',' => tokens.push(Token {
                    tok: Tok::Comma,
                    line: line_no,
                }),
                ':' => tokens.push(Token {
                    tok: Tok::Colon,
                    line: line_no,
                }),
                '"' | '\'' => {
                    let mut out = String::new();
                    let mut escaped = false;
                    let mut closed = false;
                    for (_, c2) in chars.by_ref() {
                        if escaped {
                            out.push(c2);
                            escaped = false;
                            continue;
                        }
                        match c2 {
                            '\\' => escaped = true,
                            c2 if c2 == c => {
                                closed = true;
                                break;
                            }
                            c2 => out.push(c2),
                        }
                    }
                    if !closed {
                        return Err(parse_err(line_no, "unterminated string literal"));
                    }
                    tokens.push(Token {
                        tok: Tok::Quoted(out),
                        line: line_no,
                    });
                }
                '<' => {
                    let mut out = String::new();
                    let mut closed = false;
                    for (_, c2) in chars.by_ref() {
                        if c2 == '>' {
                            closed = true;
                            break;
                        }
                        if !is_ident_char(c2) {
                            return Err(parse_err(
                                line_no,
                                format!("invalid character `{c2}` in <...> reference"),
                            ));
                        }
                        out.push(c2);
                    }
                    if !closed || out.is_empty() {
                        return Err(parse_err(line_no, "malformed <...> reference"));
                    }
                    tokens.push(Token {
                        tok: Tok::Angle(out),
                        line: line_no,
                    });
                }
                c if is_ident_char(c) => {
                    let mut end = pos + c.len_utf8();
                    while let Some(&(p2, c2)) = chars.peek() {
                        if is_ident_char(c2) {
                            end = p2 + c2.len_utf8();
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    tokens.push(Token {
                        tok: Tok::Ident(raw_line[pos..end].to_string()),
                        line: line_no,
                    });
                }
                other => {
                    return Err(parse_err(line_no, format!("unexpected character `{other}`")));
                }
            }
        }
    }

    Ok(Tokenized { title, tokens })
}

fn strip_line_comment(s: &str) -> &str {
    match s.find("%%") {
        Some(idx) => &s[..idx],
        None => s,
    }
}

/// One rule's worth of tokens: header name plus the body slice.
struct RuleChunk<'a> {
    name: &'a str,
    line: usize,
    body: &'a [Token],
}

/// Splits the token stream at line-start `ident :` pairs. A colon cannot
/// occur inside a well-formed expression, so this recovers rule boundaries
/// even when an earlier rule body is broken (e.g. unbalanced parens), which
/// is what lets lenient parsing isolate a bad rule without losing its
/// neighbors.
fn split_rules(tokens: &[Token]) -> Result<Vec<RuleChunk<'_>>> {
    let mut headers: Vec<(usize, &str, usize)> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let line_start = i == 0 || tokens[i - 1].line != tokens[i].line;
        if line_start
            && let Tok::Ident(name) = &tokens[i].tok
            && matches!(tokens.get(i + 1).map(|t| &t.tok), Some(Tok::Colon))
        {
            headers.push((i, name.as_str(), tokens[i].line));
            i += 2;
            continue;
        }
        i += 1;
    }

    if headers.is_empty() {
        if let Some(first) = tokens.first() {
            return Err(parse_err(first.line, "expected a rule header (`name:`)"));
        }
        return Ok(Vec::new());
    }
    if headers[0].0 != 0 {
        return Err(parse_err(
            tokens[0].line,
            "expected a rule header (`name:`) before the first expression",
        ));
    }

    let mut chunks = Vec::with_capacity(headers.len());
    for (n, &(start, name, line)) in headers.iter().enumerate() {
        let body_start = start + 2;
        let body_end = headers.get(n + 1).map_or(tokens.len(), |h| h.0);
        chunks.push(RuleChunk {
            name,
            line,
            body: &tokens[body_start..body_end],
        });
    }
    Ok(chunks)
}

struct ExprParser<'a> {
    toks: &'a [Token],
    pos: usize,
    end_line: usize,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let t = self.toks.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn here(&self) -> usize {
        self.peek().map_or(self.end_line, |t| t.line)
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let line = self.here();
        let Some(token) = self.next() else {
            return Err(parse_err(line, "expected an expression"));
        };
        match &token.tok {
            Tok::Quoted(text) => Ok(Expr::terminal(text.clone())),
            Tok::Angle(name) => Ok(Expr::nonterminal(name.clone())),
            Tok::Ident(name) => {
                let called = matches!(self.peek().map(|t| &t.tok), Some(Tok::LParen));
                if !called {
                    return Ok(Expr::nonterminal(name.clone()));
                }
                self.next();
                let args = self.parse_args(name, token.line)?;
                match name.as_str() {
                    "seq" => Ok(Expr::sequence(args)),
                    "stack" => Ok(Expr::stack(args)),
                    "opt" => {
                        let child = Self::exactly_one(args, "opt", token.line)?;
                        Ok(Expr::bypass(child))
                    }
                    "loop" => {
                        let child = Self::exactly_one(args, "loop", token.line)?;
                        Ok(Expr::repeat(child))
                    }
                    other => Err(parse_err(
                        token.line,
                        format!("unknown combinator `{other}` (expected seq, stack, opt or loop)"),
                    )),
                }
            }
            _ => Err(parse_err(token.line, "expected an expression")),
        }
    }

    fn parse_args(&mut self, name: &str, line: usize) -> Result<Vec<Expr>> {
        if matches!(self.peek().map(|t| &t.tok), Some(Tok::RParen)) {
            return Err(parse_err(
                line,
                format!("`{name}(...)` needs at least one operand"),
            ));
        }
        let mut args = vec![self.parse_expr()?];
        loop {
            match self.peek().map(|t| &t.tok) {
                Some(Tok::Comma) => {
                    self.next();
                    args.push(self.parse_expr()?);
                }
                Some(Tok::RParen) => {
                    self.next();
                    return Ok(args);
                }
                _ => {
                    return Err(parse_err(self.here(), "expected `,` or `)`"));
                }
            }
        }
    }

    fn exactly_one(args: Vec<Expr>, name: &str, line: usize) -> Result<Expr> {
        let mut args = args;
        if args.len() != 1 {
            return Err(parse_err(
                line,
                format!("`{name}(...)` takes exactly one operand, got {}", args.len()),
            ));
        }
        Ok(args.remove(0))
    }
}

fn parse_rule_body(chunk: &RuleChunk<'_>) -> Result<Expr> {
    if chunk.body.is_empty() {
        return Err(parse_err(chunk.line, "empty rule body"));
    }
    let end_line = chunk.body.last().map_or(chunk.line, |t| t.line);
    let mut parser = ExprParser {
        toks: chunk.body,
        pos: 0,
        end_line,
    };
    let expr = parser.parse_expr()?;
    if let Some(extra) = parser.peek() {
        return Err(parse_err(
            extra.line,
            "unexpected tokens after rule expression",
        ));
    }
    Ok(expr)
}

/// Parses a grammar source text into rules.
///
/// In strict mode the first failure aborts the parse. In lenient mode rule
/// boundaries are still recovered and each offending rule becomes an
/// [`Expr::Error`] placeholder under its own name, with the failure also
/// reported as a [`GrammarIssue`], so sibling rules keep rendering and the
/// diagram shows where the broken rule was.
pub fn parse_rules(code: &str, lenient: bool) -> Result<(Grammar, Vec<GrammarIssue>)> {
    let tokenized = match tokenize(code) {
        Ok(t) => t,
        Err(e) => {
            if lenient {
                let (line, message) = issue_parts(&e);
                return Ok((
                    Grammar::default(),
                    vec![GrammarIssue {
                        rule: None,
                        line,
                        message,
                    }],
                ));
            }
            return Err(e);
        }
    };

    let chunks = match split_rules(&tokenized.tokens) {
        Ok(c) => c,
        Err(e) => {
            if lenient {
                let (line, message) = issue_parts(&e);
                return Ok((
                    Grammar {
                        title: tokenized.title,
                        rules: Default::default(),
                    },
                    vec![GrammarIssue {
                        rule: None,
                        line,
                        message,
                    }],
                ));
            }
            return Err(e);
        }
    };

    let mut grammar = Grammar {
        title: tokenized.title,
        rules: Default::default(),
    };
    let mut issues: Vec<GrammarIssue> = Vec::new();

    for chunk in &chunks {
        if grammar.rules.contains_key(chunk.name) {
            let err = Error::DuplicateRule {
                name: chunk.name.to_string(),
                line: chunk.line,
            };
            if !lenient {
                return Err(err);
            }
            let (line, message) = issue_parts(&err);
            issues.push(GrammarIssue {
                rule: Some(chunk.name.to_string()),
                line,
                message,
            });
            continue;
        }
        match parse_rule_body(chunk) {
            Ok(expr) => {
                grammar.rules.insert(chunk.name.to_string(), expr);
            }
            Err(err) => {
                if !lenient {
                    return Err(err);
                }
                let (line, message) = issue_parts(&err);
                grammar
                    .rules
                    .insert(chunk.name.to_string(), Expr::error(message.clone()));
                issues.push(GrammarIssue {
                    rule: Some(chunk.name.to_string()),
                    line,
                    message,
                });
            }
        }
    }

    Ok((grammar, issues))
}

fn issue_parts(err: &Error) -> (usize, String) {
    match err {
        Error::GrammarParse { line, message } => (*line, message.clone()),
        Error::DuplicateRule { name, line } => (*line, format!("duplicate rule `{name}`")),
        other => (0, other.to_string()),
    }
}
