//! Tokens and the per-mode logos automata.

use logos::{Filter, Lexer, Logos};
use stirrup_ir::{Lookup, Span};

use crate::LexError;

/// What kind of token the parser expects next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LexMode {
    /// A value may start here.
    Operand,
    /// An operand was just completed.
    Operator,
    /// Right after `.` or `?.`: only a member name is valid.
    Member,
}

/// A lexed token.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

impl<'a> Token<'a> {
    #[inline]
    pub fn is_end(&self) -> bool {
        matches!(self.kind, TokenKind::End)
    }

    /// Byte offset just past the token.
    #[inline]
    pub fn end(&self) -> usize {
        self.span.end as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TokenKind<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    /// String literal contents between the quotes, escapes unprocessed.
    Str {
        raw: &'a str,
        /// `true` for `"..."`, which supports interpolation.
        double_quoted: bool,
    },
    /// Regex literal contents between `~/` and `/`.
    Regex(&'a str),
    /// `[:]`
    EmptyMap,
    Ident(Ident<'a>),
    /// Operator, opener or closer.
    Operator(&'a str),
    Comma,
    End,
}

/// An identifier-shaped token with its lookup prefix removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ident<'a> {
    pub lookup: Lookup,
    pub kind: IdentKind<'a>,
    /// Immediately followed by `(`, which is part of the token.
    pub call: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentKind<'a> {
    Name(&'a str),
    /// `.`, `..`, `../..`: section value `n` frames up.
    Current(u32),
    /// `.index` and friends; the name without the dot.
    Internal(&'a str),
    /// `@name`
    Annotation(&'a str),
}

/// Tokens valid where an operand may start.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
enum OperandLex {
    #[token("null")]
    Null,
    #[token("true")]
    True,
    #[token("false")]
    False,

    #[regex(r"[0-9]+[lL]?")]
    Int,
    #[regex(r"0[xX][0-9a-fA-F]+[lL]?")]
    HexInt,
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?[dDfF]?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?[dDfF]?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+[dDfF]?")]
    #[regex(r"[0-9]+[dDfF]")]
    Double,

    #[regex(r#""([^"\\]|\\.)*""#)]
    DoubleQuoted,
    #[regex(r"'([^'\\]|\\.)*'")]
    SingleQuoted,
    #[regex(r"~/([^/\\\n]|\\.)*/")]
    Regex,

    #[regex(r"(\./|(\.\./)+|/|\\)?\.?[A-Za-z_][A-Za-z0-9_]*\(?")]
    Ident,
    #[regex(r"\.|\.\.(/\.\.)*")]
    Current,
    #[regex(r"@[A-Za-z_][A-Za-z0-9_]*\(?")]
    Annotation,

    #[token("[:]")]
    EmptyMap,
    #[token("(")]
    #[token("[")]
    #[token("{")]
    #[token(")")]
    #[token("]")]
    #[token("}")]
    #[token("!")]
    #[token("-")]
    #[token("+")]
    #[token("~")]
    #[token("☠")]
    Operator,
    #[token(",")]
    Comma,
    #[token("/*", block_comment)]
    UnterminatedComment,
}

/// Tokens valid after a complete operand.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
enum OperatorLex {
    #[token(".")]
    #[token("?.")]
    #[token("[")]
    #[token("?[")]
    #[token("**")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    #[token("+")]
    #[token("-")]
    #[token("<<")]
    #[token(">>")]
    #[token(">>>")]
    #[token("..")]
    #[token("..<")]
    #[token("<=>")]
    #[token("<")]
    #[token("<=")]
    #[token(">")]
    #[token(">=")]
    #[token("==")]
    #[token("!=")]
    #[token("=~")]
    #[token("==~")]
    #[token("&")]
    #[token("^")]
    #[token("|")]
    #[token("&&")]
    #[token("||")]
    #[token("??")]
    #[token("?:")]
    #[token("!?")]
    #[token("!:")]
    #[token("?")]
    #[token(":")]
    #[token("=")]
    #[token(":=")]
    #[token("#>")]
    #[token("#.")]
    #[token("#|")]
    #[token("#?")]
    #[token("#<")]
    #[token("#^")]
    #[token(";")]
    #[token(")")]
    #[token("]")]
    #[token("}")]
    Operator,
    #[token(",")]
    Comma,
    #[token("/*", block_comment)]
    UnterminatedComment,
}

/// Skip a `/* ... */` comment; emit the token only when `*/` is missing.
fn block_comment<'s, T>(lex: &mut Lexer<'s, T>) -> Filter<()>
where
    T: Logos<'s, Source = str>,
{
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            Filter::Skip
        }
        None => {
            lex.bump(lex.remainder().len());
            Filter::Emit(())
        }
    }
}

/// Tokens valid after a navigation operator.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum MemberLex {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*\(?")]
    Name,
}

/// Lex the single token starting at (or after whitespace following) `pos`.
///
/// Returns [`TokenKind::End`] once only whitespace and comments remain.
/// Spans are relative to `text`.
pub fn next_token(text: &str, pos: usize, mode: LexMode) -> Result<Token<'_>, LexError> {
    let Some(rest) = text.get(pos..) else {
        return Ok(end_of(text));
    };
    match mode {
        LexMode::Operand => lex_operand(rest, pos, text),
        LexMode::Operator => lex_operator(rest, pos, text),
        LexMode::Member => lex_member(rest, pos, text),
    }
}

fn end_of(text: &str) -> Token<'_> {
    Token {
        kind: TokenKind::End,
        span: Span::from_range(text.len()..text.len()),
    }
}

fn lex_operand<'a>(rest: &'a str, pos: usize, text: &'a str) -> Result<Token<'a>, LexError> {
    let mut lexer = OperandLex::lexer(rest);
    let Some(result) = lexer.next() else {
        return Ok(end_of(text));
    };
    let range = lexer.span();
    let span = Span::from_range(pos + range.start..pos + range.end);
    let slice = lexer.slice();

    let kind = match result {
        Ok(OperandLex::Null) => TokenKind::Null,
        Ok(OperandLex::True) => TokenKind::Bool(true),
        Ok(OperandLex::False) => TokenKind::Bool(false),
        Ok(OperandLex::Int) => TokenKind::Int(parse_int(slice, 10, span)?),
        Ok(OperandLex::HexInt) => TokenKind::Int(parse_int(&slice[2..], 16, span)?),
        Ok(OperandLex::Double) => TokenKind::Double(parse_double(slice, span)?),
        Ok(OperandLex::DoubleQuoted) => TokenKind::Str {
            raw: &slice[1..slice.len() - 1],
            double_quoted: true,
        },
        Ok(OperandLex::SingleQuoted) => TokenKind::Str {
            raw: &slice[1..slice.len() - 1],
            double_quoted: false,
        },
        Ok(OperandLex::Regex) => TokenKind::Regex(&slice[2..slice.len() - 1]),
        Ok(OperandLex::Ident) => TokenKind::Ident(classify_ident(slice)),
        Ok(OperandLex::Current) => TokenKind::Ident(Ident {
            lookup: Lookup::Unstated,
            kind: IdentKind::Current(count_backreach(slice)),
            call: false,
        }),
        Ok(OperandLex::Annotation) => {
            let (name, call) = split_call(&slice[1..]);
            TokenKind::Ident(Ident {
                lookup: Lookup::Unstated,
                kind: IdentKind::Annotation(name),
                call,
            })
        }
        Ok(OperandLex::EmptyMap) => TokenKind::EmptyMap,
        Ok(OperandLex::Operator) => TokenKind::Operator(slice),
        Ok(OperandLex::Comma) => TokenKind::Comma,
        Ok(OperandLex::UnterminatedComment) => return Err(unterminated_comment(span)),
        Err(()) => return Err(unrecognized(&rest[range.start..], span, "operand")),
    };
    Ok(Token { kind, span })
}

fn lex_operator<'a>(rest: &'a str, pos: usize, text: &'a str) -> Result<Token<'a>, LexError> {
    let mut lexer = OperatorLex::lexer(rest);
    let Some(result) = lexer.next() else {
        return Ok(end_of(text));
    };
    let range = lexer.span();
    let span = Span::from_range(pos + range.start..pos + range.end);
    let kind = match result {
        Ok(OperatorLex::Operator) => TokenKind::Operator(lexer.slice()),
        Ok(OperatorLex::Comma) => TokenKind::Comma,
        Ok(OperatorLex::UnterminatedComment) => return Err(unterminated_comment(span)),
        Err(()) => return Err(unrecognized(&rest[range.start..], span, "operator")),
    };
    Ok(Token { kind, span })
}

fn lex_member<'a>(rest: &'a str, pos: usize, text: &'a str) -> Result<Token<'a>, LexError> {
    let mut lexer = MemberLex::lexer(rest);
    let Some(result) = lexer.next() else {
        return Ok(end_of(text));
    };
    let range = lexer.span();
    let span = Span::from_range(pos + range.start..pos + range.end);
    match result {
        Ok(MemberLex::Name) => {
            let (name, call) = split_call(lexer.slice());
            Ok(Token {
                kind: TokenKind::Ident(Ident {
                    lookup: Lookup::Unstated,
                    kind: IdentKind::Name(name),
                    call,
                }),
                span,
            })
        }
        Err(()) => Err(LexError::new(span, "expected a member name")),
    }
}

fn unterminated_comment(span: Span) -> LexError {
    LexError::new(Span::new(span.start, span.start + 2), "unterminated comment")
}

fn unrecognized(at: &str, span: Span, expected: &str) -> LexError {
    if at.starts_with(['"', '\'']) {
        return LexError::new(span, "unterminated string literal");
    }
    match at.chars().next() {
        Some(c) => LexError::new(span, format!("unexpected character '{c}', expected {expected}")),
        None => LexError::new(span, format!("expected {expected}")),
    }
}

fn parse_int(digits: &str, radix: u32, span: Span) -> Result<i64, LexError> {
    let digits = digits.trim_end_matches(['l', 'L']);
    i64::from_str_radix(digits, radix)
        .map_err(|_| LexError::new(span, "integer literal out of range"))
}

fn parse_double(slice: &str, span: Span) -> Result<f64, LexError> {
    slice
        .trim_end_matches(['d', 'D', 'f', 'F'])
        .parse::<f64>()
        .map_err(|_| LexError::new(span, "malformed floating point literal"))
}

fn split_call(slice: &str) -> (&str, bool) {
    match slice.strip_suffix('(') {
        Some(name) => (name, true),
        None => (slice, false),
    }
}

/// `.` is 0, `..` is 1, `../..` is 2.
fn count_backreach(slice: &str) -> u32 {
    if slice == "." {
        0
    } else {
        u32::try_from(slice.matches("..").count()).unwrap_or(u32::MAX)
    }
}

fn classify_ident(slice: &str) -> Ident<'_> {
    let (body, call) = split_call(slice);

    let (lookup, body) = if let Some(rest) = body.strip_prefix("./") {
        (Lookup::Backreach(0), rest)
    } else if body.starts_with("../") {
        let mut rest = body;
        let mut levels = 0u32;
        while let Some(next) = rest.strip_prefix("../") {
            rest = next;
            levels += 1;
        }
        (Lookup::Backreach(levels), rest)
    } else if let Some(rest) = body.strip_prefix(['/', '\\']) {
        (Lookup::Root, rest)
    } else {
        (Lookup::Unstated, body)
    };

    let kind = match body.strip_prefix('.') {
        Some(internal) => IdentKind::Internal(internal),
        None => IdentKind::Name(body),
    };
    Ident { lookup, kind, call }
}
