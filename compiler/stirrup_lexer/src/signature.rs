//! Shape scanners for named-expression signatures and lambda clauses.
//!
//! These constructs are recognized by lookahead over raw text rather than
//! by the token automata: `fib(n) -> ...` begins like a call and
//! `i -> ...` begins like an identifier, and only the arrow decides.

use stirrup_ir::Span;

/// `name -> body`, `name(a, b) -> body` or `name(...) => body`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Definition<'a> {
    pub name: &'a str,
    pub name_span: Span,
    pub params: Vec<(&'a str, Span)>,
    /// Declared with `=>`: the result is not rendered.
    pub discard: bool,
    /// Byte offset of the body, just past the arrow.
    pub body_start: usize,
}

/// `name ->` following a streaming operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LambdaBinding<'a> {
    pub name: &'a str,
    pub span: Span,
    /// Byte offset just past the arrow.
    pub end: usize,
}

/// Recognize a named-expression definition at the start of `text`.
pub fn scan_definition(text: &str) -> Option<Definition<'_>> {
    let bytes = text.as_bytes();
    let start = skip_ws(bytes, 0);
    let name_end = ident_end(bytes, start)?;
    let name = &text[start..name_end];
    if is_keyword(name) {
        return None;
    }

    let mut params = Vec::new();
    let mut i = name_end;
    if bytes.get(i) == Some(&b'(') {
        i = skip_ws(bytes, i + 1);
        if bytes.get(i) != Some(&b')') {
            loop {
                let param_end = ident_end(bytes, i)?;
                params.push((&text[i..param_end], Span::from_range(i..param_end)));
                i = skip_ws(bytes, param_end);
                match bytes.get(i) {
                    Some(b',') => i = skip_ws(bytes, i + 1),
                    Some(b')') => break,
                    _ => return None,
                }
            }
        }
        i += 1;
    }

    i = skip_ws(bytes, i);
    let discard = match bytes.get(i..i + 2) {
        Some(b"->") => false,
        Some(b"=>") => true,
        _ => return None,
    };
    Some(Definition {
        name,
        name_span: Span::from_range(start..name_end),
        params,
        discard,
        body_start: i + 2,
    })
}

/// Recognize `name ->` at `pos`.
pub fn scan_lambda_binding(text: &str, pos: usize) -> Option<LambdaBinding<'_>> {
    let bytes = text.as_bytes();
    let start = skip_ws(bytes, pos);
    let end = ident_end(bytes, start)?;
    let arrow = skip_ws(bytes, end);
    if !matches!(bytes.get(arrow..arrow + 2), Some(b"->")) || is_keyword(&text[start..end]) {
        return None;
    }
    Some(LambdaBinding {
        name: &text[start..end],
        span: Span::from_range(start..end),
        end: arrow + 2,
    })
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    i
}

fn ident_end(bytes: &[u8], start: usize) -> Option<usize> {
    let first = *bytes.get(start)?;
    if first != b'_' && !first.is_ascii_alphabetic() {
        return None;
    }
    let mut i = start + 1;
    while bytes
        .get(i)
        .is_some_and(|&b| b == b'_' || b.is_ascii_alphanumeric())
    {
        i += 1;
    }
    Some(i)
}

fn is_keyword(name: &str) -> bool {
    matches!(name, "null" | "true" | "false")
}
