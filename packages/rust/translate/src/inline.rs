//! Inline rich-text tokenizer.
//!
//! Turns one line of text into an ordered sequence of [`TextSpan`]s in two
//! phases: hyperlink extraction first, then styled-run tokenization over the
//! link-free fragments.
//!
//! The style pass applies its five patterns in a fixed order, each scanning
//! the entire fragment rather than the tail left unconsumed by earlier
//! patterns, with a single shared cursor. Markers that belong to an
//! already-emitted run (the `*`s inside a consumed `**bold**`, say) can
//! therefore match again under a narrower pattern and yield duplicate or
//! overlapping spans. That artifact is long-standing observable output and is
//! kept as-is; do not replace this with a single-pass tokenizer.

use std::sync::LazyLock;

use regex::Regex;

use pagelift_shared::{Style, TextSpan};

/// `[label](http(s)://url)` — label may not contain `[`.
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[]+)\]\((https?://[^)]+)\)").expect("valid regex"));

/// Style patterns in application order. Order is load-bearing: bold must run
/// before italic so `**` runs are consumed before the single-`*` pattern sees
/// them (modulo the rescan artifact noted above).
static STYLE_RES: LazyLock<[(Regex, Style); 5]> = LazyLock::new(|| {
    let compile = |p: &str| Regex::new(p).expect("valid regex");
    [
        (compile(r"\*\*(.*?)\*\*"), Style::Bold),
        (compile(r"\*(.*?)\*"), Style::Italic),
        (compile(r"~~(.*?)~~"), Style::Strikethrough),
        (compile(r"`(.*?)`"), Style::Code),
        (compile(r"<u>(.*?)</u>"), Style::Underline),
    ]
});

/// Tokenize one line into styled spans.
///
/// Always returns at least one span, so every text-bearing block built from a
/// classified line carries a non-empty rich_text sequence.
pub fn tokenize(line: &str) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    // Phase 1: split out hyperlinks, left to right, non-overlapping.
    for caps in LINK_RE.captures_iter(line) {
        let whole = caps.get(0).expect("match has full capture");
        if whole.start() > cursor {
            spans.extend(tokenize_styles(&line[cursor..whole.start()]));
        }
        spans.push(TextSpan::link(&caps[1], &caps[2]));
        cursor = whole.end();
    }

    if cursor < line.len() {
        spans.extend(tokenize_styles(&line[cursor..]));
    }

    if spans.is_empty() {
        spans.push(TextSpan::plain(""));
    }
    spans
}

/// Phase 2: style tokenization over a link-free fragment.
fn tokenize_styles(fragment: &str) -> Vec<TextSpan> {
    let mut pieces = Vec::new();
    let mut last_end = 0;

    for (pattern, style) in STYLE_RES.iter() {
        for caps in pattern.captures_iter(fragment) {
            let whole = caps.get(0).expect("match has full capture");
            if whole.start() > last_end {
                pieces.push(TextSpan::plain(&fragment[last_end..whole.start()]));
            }
            pieces.push(TextSpan::styled(&caps[1], *style));
            // Unconditional: the cursor moves to this match's end even when
            // that is behind the previous position (the rescan artifact).
            last_end = whole.end();
        }
    }

    if last_end < fragment.len() {
        pieces.push(TextSpan::plain(&fragment[last_end..]));
    }
    pieces
}
