//! String literal escapes and interpolation segments.
//!
//! Offsets in errors and segments are relative to the raw literal contents
//! (the text between the quotes).

use stirrup_ir::Span;

use crate::LexError;

/// A piece of an interpolated string literal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text with escapes already processed.
    Text(String),
    /// `${source}`; `offset` is where `source` starts.
    Expr { source: &'a str, offset: usize },
    /// `$name`
    Name { name: &'a str, offset: usize },
}

/// Process the escapes of a string literal.
pub fn unescape(raw: &str) -> Result<String, LexError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.char_indices();
    while let Some((at, c)) = chars.next() {
        if c == '\\' {
            escape(raw, at, &mut chars, &mut out)?;
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Split a double-quoted literal into text, `${expr}` and `$name` segments.
///
/// `\$` produces a literal dollar sign; a `$` not followed by `{` or an
/// identifier start is kept as text. Adjacent text is merged, and a literal
/// without interpolation yields a single [`Segment::Text`].
pub fn split_interpolated(raw: &str) -> Result<Vec<Segment<'_>>, LexError> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = raw.char_indices().peekable();

    while let Some((at, c)) = chars.next() {
        match c {
            '\\' => escape(raw, at, &mut chars, &mut text)?,
            '$' => match chars.peek().map(|&(_, next)| next) {
                Some('{') => {
                    let start = at + 2;
                    let end = matching_brace(raw, start)
                        .ok_or_else(|| LexError::new(span(at, raw.len()), "unterminated interpolation"))?;
                    let source = &raw[start..end];
                    if source.trim().is_empty() {
                        return Err(LexError::new(span(at, end + 1), "empty interpolation"));
                    }
                    flush(&mut text, &mut segments);
                    segments.push(Segment::Expr { source, offset: start });
                    while chars.next_if(|&(i, _)| i <= end).is_some() {}
                }
                Some(next) if next == '_' || next.is_ascii_alphabetic() => {
                    let start = at + 1;
                    let end = raw[start..]
                        .find(|ch: char| ch != '_' && !ch.is_ascii_alphanumeric())
                        .map_or(raw.len(), |len| start + len);
                    flush(&mut text, &mut segments);
                    segments.push(Segment::Name {
                        name: &raw[start..end],
                        offset: start,
                    });
                    while chars.next_if(|&(i, _)| i < end).is_some() {}
                }
                _ => text.push('$'),
            },
            _ => text.push(c),
        }
    }

    if !text.is_empty() || segments.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

/// Regex literal source with `\/` turned back into `/`.
pub fn regex_pattern(raw: &str) -> String {
    raw.replace("\\/", "/")
}

fn flush(text: &mut String, segments: &mut Vec<Segment<'_>>) {
    if !text.is_empty() {
        segments.push(Segment::Text(std::mem::take(text)));
    }
}

fn span(start: usize, end: usize) -> Span {
    Span::from_range(start..end)
}

fn escape(
    raw: &str,
    at: usize,
    chars: &mut impl Iterator<Item = (usize, char)>,
    out: &mut String,
) -> Result<(), LexError> {
    let Some((_, c)) = chars.next() else {
        return Err(LexError::new(span(at, at + 1), "dangling escape"));
    };
    let resolved = match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        'b' => '\u{8}',
        'f' => '\u{c}',
        '0' => '\0',
        '\\' | '\'' | '"' | '$' | '/' => c,
        'u' => {
            let digits = raw
                .get(at + 2..at + 6)
                .filter(|d| d.chars().all(|h| h.is_ascii_hexdigit()))
                .ok_or_else(|| LexError::new(span(at, at + 2), "malformed unicode escape"))?;
            let code = u32::from_str_radix(digits, 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| LexError::new(span(at, at + 6), "invalid unicode scalar"))?;
            for _ in 0..4 {
                chars.next();
            }
            code
        }
        other => {
            return Err(LexError::new(
                span(at, at + 1 + other.len_utf8()),
                format!("unknown escape '\\{other}'"),
            ))
        }
    };
    out.push(resolved);
    Ok(())
}

/// Byte index of the `}` closing the interpolation that starts at `start`.
fn matching_brace(raw: &str, start: usize) -> Option<usize> {
    let bytes = raw.as_bytes();
    let mut depth = 1u32;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'\\' => i += 1,
            _ => {}
        }
        i += 1;
    }
    None
}
