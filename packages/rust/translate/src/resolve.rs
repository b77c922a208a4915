//! Line resolvers — one pure classification function per markup construct.
//!
//! Each resolver takes a stripped line (plus indent context where relevant)
//! and returns `Some(Block)` on a match or `None` to let the cascade fall
//! through. Declining is never an error; the driver's paragraph fallback
//! keeps the cascade total.

use std::sync::LazyLock;

use regex::Regex;

use pagelift_shared::{Annotations, Block, Color, TextSpan};

use crate::inline::tokenize;

// ---------------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------------

/// `# ` through `###### `. Levels 1–3 map to native heading kinds; the store
/// schema has no deeper levels, so 4–6 degrade to colored paragraphs with the
/// first span forced bold.
pub(crate) fn heading(line: &str) -> Option<Block> {
    const PREFIXES: [(&str, usize); 6] = [
        ("# ", 1),
        ("## ", 2),
        ("### ", 3),
        ("#### ", 4),
        ("##### ", 5),
        ("###### ", 6),
    ];

    for (prefix, level) in PREFIXES {
        let Some(content) = line.strip_prefix(prefix) else {
            continue;
        };
        let mut rich_text = tokenize(content);
        let block = match level {
            1 => Block::Heading1 {
                rich_text,
                color: Color::Default,
            },
            2 => Block::Heading2 {
                rich_text,
                color: Color::Default,
            },
            3 => Block::Heading3 {
                rich_text,
                color: Color::Default,
            },
            deeper => {
                let color = match deeper {
                    4 => Color::Red,
                    5 => Color::Green,
                    _ => Color::Blue,
                };
                // Replaces, not augments: any style the tokenizer set on the
                // first span is discarded so the span is bold-only.
                if let Some(first) = rich_text.first_mut() {
                    first.annotations = Annotations {
                        bold: true,
                        ..Annotations::default()
                    };
                }
                Block::Paragraph { rich_text, color }
            }
        };
        return Some(block);
    }
    None
}

// ---------------------------------------------------------------------------
// List items
// ---------------------------------------------------------------------------

static ORDERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.").expect("valid regex"));

/// Glyph standing in for the bullet of a visually nested item.
const NESTED_GLYPH: &str = "📖 ";

/// `- `/`+ `/`* ` bullets and `1.`-style ordinals. The marker is treated as
/// two characters wide (multi-digit ordinals lose their tail digits; kept as
/// observed behavior). Indented items are not modeled as nested lists; they
/// degrade to a paragraph led by an indentation-proportional glyph prefix.
pub(crate) fn list_item(line: &str, indent: usize) -> Option<Block> {
    let unordered =
        line.starts_with("- ") || line.starts_with("+ ") || line.starts_with("* ");
    let ordered = !unordered && ORDERED_RE.is_match(line);
    if !unordered && !ordered {
        return None;
    }

    // Both marker forms start with two ASCII characters.
    let content = &line[2..];
    let spans = tokenize(content);

    if indent == 0 {
        let block = if unordered {
            Block::BulletedListItem {
                rich_text: spans,
                color: Color::Default,
            }
        } else {
            Block::NumberedListItem {
                rich_text: spans,
                color: Color::Default,
            }
        };
        return Some(block);
    }

    let mut rich_text = vec![TextSpan::plain(format!(
        "{}{}",
        "  ".repeat(indent),
        NESTED_GLYPH
    ))];
    rich_text.extend(spans);
    Some(Block::Paragraph {
        rich_text,
        color: Color::Default,
    })
}

// ---------------------------------------------------------------------------
// Quote
// ---------------------------------------------------------------------------

/// `> quoted` — the marker and the character slot after it are dropped.
pub(crate) fn quote(line: &str) -> Option<Block> {
    if !line.starts_with('>') {
        return None;
    }
    let content: String = line.chars().skip(2).collect();
    Some(Block::Quote {
        rich_text: tokenize(&content),
        color: Color::Default,
    })
}

// ---------------------------------------------------------------------------
// Equation
// ---------------------------------------------------------------------------

static DISPLAY_EQ_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\$(.+?)\$\$").expect("valid regex"));
static INLINE_EQ_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(.+?)\$").expect("valid regex"));

/// `$$...$$` (display) with `$...$` (inline) as fallback. Only the first
/// match on a line is honored, even when several equations appear; an
/// unterminated `$` yields no match and the line degrades to plain text.
pub(crate) fn equation(line: &str) -> Option<Block> {
    if line.contains("$$") {
        if let Some(caps) = DISPLAY_EQ_RE.captures(line) {
            return Some(Block::Equation {
                expression: caps[1].trim().to_string(),
            });
        }
    }
    if line.contains('$') {
        if let Some(caps) = INLINE_EQ_RE.captures(line) {
            return Some(Block::Equation {
                expression: caps[1].trim().to_string(),
            });
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Embed
// ---------------------------------------------------------------------------

static IFRAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<iframe [^>]*//([^"]+)""#).expect("valid regex"));

/// An iframe's `src` host-and-path, rebuilt as an https embed URL. The query
/// suffix disables autoplay on video embeds.
pub(crate) fn embed(line: &str) -> Option<Block> {
    let caps = IFRAME_RE.captures(line)?;
    Some(Block::Embed {
        url: format!("https://{}&autoplay=0", &caps[1]),
    })
}

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[(.*?)\]\((.*?)\)").expect("valid regex"));

/// A classified `![alt](target)` reference. URL resolution (and the
/// image-host side effect for local targets) happens in the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImageRef {
    pub target: String,
}

impl ImageRef {
    /// Whether the target is already an external URL.
    pub(crate) fn is_external(&self) -> bool {
        self.target.starts_with("http")
    }
}

pub(crate) fn image(line: &str) -> Option<ImageRef> {
    let caps = IMAGE_RE.captures(line)?;
    Some(ImageRef {
        target: caps[2].to_string(),
    })
}
