//! Math markup to styled text resolution.
//!
//! Inline math is typeset as plain styled text whenever that is lossless:
//! symbol macros become Unicode, `^`/`_` become superscript/subscript runs and
//! `\mathbf{...}` becomes bold. Anything else (fractions, roots, unknown
//! macros) is handed back for rasterization.
//!
//! ```
//! use folio::math::{MathRun, Resolution, SymbolTable, resolve};
//!
//! let resolved = resolve("x^2", SymbolTable::standard());
//! assert_eq!(
//!     resolved,
//!     Resolution::Text(vec![
//!         MathRun::Italic("x".into()),
//!         MathRun::Superscript(vec![MathRun::Upright("2".into())]),
//!     ])
//! );
//!
//! let fallback = resolve(r"\frac{a}{b}", SymbolTable::standard());
//! assert_eq!(fallback, Resolution::Rasterize(r"$\frac{a}{b}$".into()));
//! ```

mod symbols;

pub use symbols::SymbolTable;

const BOLD_WRAPPER: &str = "\\mathbf{";

/// A styled piece of resolved math.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MathRun {
    /// Letters, set in italics.
    Italic(String),
    /// Digits, operators and symbols.
    Upright(String),
    /// Content of a `\mathbf{...}` wrapper.
    Bold(String),
    Superscript(Vec<MathRun>),
    Subscript(Vec<MathRun>),
}

/// Outcome of resolving a math expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The expression is representable as styled text.
    Text(Vec<MathRun>),
    /// The expression needs the typesetting toolchain; carries the original
    /// markup wrapped in `$` delimiters.
    Rasterize(String),
}

impl Resolution {
    /// Concatenated text of all runs, or `None` for a rasterization request.
    pub fn plain_text(&self) -> Option<String> {
        match self {
            Resolution::Text(runs) => {
                let mut out = String::new();
                collect_text(runs, &mut out);
                Some(out)
            }
            Resolution::Rasterize(_) => None,
        }
    }
}

fn collect_text(runs: &[MathRun], out: &mut String) {
    for run in runs {
        match run {
            MathRun::Italic(s) | MathRun::Upright(s) | MathRun::Bold(s) => out.push_str(s),
            MathRun::Superscript(inner) | MathRun::Subscript(inner) => collect_text(inner, out),
        }
    }
}

/// Resolve accumulated math markup.
///
/// Deterministic and free of side effects.
pub fn resolve(markup: &str, symbols: &SymbolTable) -> Resolution {
    let substituted = substitute_symbols(markup, symbols);

    if has_unresolved_escape(&substituted) {
        return Resolution::Rasterize(format!("${markup}$"));
    }

    let compact: String = substituted
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    Resolution::Text(resolve_scripts(&compact))
}

/// Replace every `\name` with its symbol, leaving unknown macros in place.
fn substitute_symbols(markup: &str, symbols: &SymbolTable) -> String {
    let mut result = String::with_capacity(markup.len());
    let mut rest = markup;

    while let Some(pos) = memchr::memchr(b'\\', rest.as_bytes()) {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let name_len = after
            .bytes()
            .take_while(|b| b.is_ascii_alphabetic())
            .count();
        let name = &after[..name_len];

        match symbols.get(name) {
            Some(symbol) if !name.is_empty() => result.push_str(symbol),
            _ => {
                result.push('\\');
                result.push_str(name);
            }
        }
        rest = &after[name_len..];
    }
    result.push_str(rest);
    result
}

/// Any backslash that does not open a bold wrapper.
fn has_unresolved_escape(s: &str) -> bool {
    s.match_indices('\\')
        .any(|(pos, _)| !s[pos..].starts_with(BOLD_WRAPPER))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Superscript,
    Subscript,
    Bold,
}

/// Find the leftmost script marker or bold wrapper.
fn next_marker(s: &str) -> Option<(usize, Marker)> {
    let bytes = s.as_bytes();
    let mut from = 0;
    while let Some(offset) = memchr::memchr3(b'^', b'_', b'\\', &bytes[from..]) {
        let pos = from + offset;
        match bytes[pos] {
            b'^' => return Some((pos, Marker::Superscript)),
            b'_' => return Some((pos, Marker::Subscript)),
            _ if s[pos..].starts_with(BOLD_WRAPPER) => return Some((pos, Marker::Bold)),
            _ => from = pos + 1,
        }
    }
    None
}

fn resolve_scripts(s: &str) -> Vec<MathRun> {
    let mut runs = Vec::new();
    let mut rest = s;

    while let Some((pos, marker)) = next_marker(rest) {
        push_styled(&mut runs, &rest[..pos]);
        match marker {
            Marker::Superscript | Marker::Subscript => {
                let operand = &rest[pos + 1..];
                if operand.is_empty() {
                    // A dangling marker has nothing to raise or lower.
                    push_styled(&mut runs, &rest[pos..]);
                    rest = operand;
                    continue;
                }
                let (token, tail) = take_token(operand);
                let inner = resolve_scripts(token);
                if !inner.is_empty() {
                    runs.push(if marker == Marker::Superscript {
                        MathRun::Superscript(inner)
                    } else {
                        MathRun::Subscript(inner)
                    });
                }
                rest = tail;
            }
            Marker::Bold => {
                let (body, tail) = take_group(&rest[pos + BOLD_WRAPPER.len()..]);
                let body: String = body.chars().filter(|c| !matches!(c, '{' | '}')).collect();
                if !body.is_empty() {
                    runs.push(MathRun::Bold(body));
                }
                rest = tail;
            }
        }
    }
    push_styled(&mut runs, rest);
    runs
}

/// Split off the operand of a script marker: a brace group (without its
/// braces), a whole bold wrapper, or a single character.
fn take_token(s: &str) -> (&str, &str) {
    if let Some(group) = s.strip_prefix('{') {
        return take_group(group);
    }
    if let Some(body) = s.strip_prefix(BOLD_WRAPPER) {
        let (_, tail) = take_group(body);
        return (&s[..s.len() - tail.len()], tail);
    }
    match s.chars().next() {
        Some(c) => s.split_at(c.len_utf8()),
        None => ("", ""),
    }
}

/// `s` starts just after an opening brace; return the group body and the
/// text after the matching closing brace. An unclosed group runs to the end.
fn take_group(s: &str) -> (&str, &str) {
    let mut depth = 1usize;
    for (i, b) in s.bytes().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return (&s[..i], &s[i + 1..]);
                }
            }
            _ => {}
        }
    }
    (s, "")
}

/// Append literal text: ASCII letters italic, everything else upright.
/// Grouping braces are dropped.
fn push_styled(runs: &mut Vec<MathRun>, text: &str) {
    for c in text.chars() {
        if matches!(c, '{' | '}') {
            continue;
        }
        let italic = c.is_ascii_alphabetic();
        match runs.last_mut() {
            Some(MathRun::Italic(s)) if italic => s.push(c),
            Some(MathRun::Upright(s)) if !italic => s.push(c),
            _ if italic => runs.push(MathRun::Italic(c.to_string())),
            _ => runs.push(MathRun::Upright(c.to_string())),
        }
    }
}
