//! Block data model shared by the translation engine and the store client.
//!
//! [`Block`] mirrors the document store's structural units; [`Block::to_json`]
//! produces the exact wire shape the store's "append children" endpoint
//! consumes (`{"object": "block", "type": T, T: {...}}` — the kind tag doubles
//! as the payload key, which rules out a plain serde derive).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Rich text
// ---------------------------------------------------------------------------

/// Text color tag carried by annotations and text-bearing blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    #[default]
    Default,
    Red,
    Green,
    Blue,
}

impl Color {
    /// Wire name of the color.
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Default => "default",
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
        }
    }
}

/// A single inline styling attribute. At most one is set per span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
}

/// Styling flags for one run of text. Defaults are all-false / default color.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub code: bool,
    pub color: Color,
}

impl Annotations {
    fn to_json(&self) -> Value {
        json!({
            "bold": self.bold,
            "italic": self.italic,
            "underline": self.underline,
            "strikethrough": self.strikethrough,
            "code": self.code,
            "color": self.color.as_str(),
        })
    }
}

/// A run of text with uniform styling and an optional hyperlink target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub content: String,
    pub annotations: Annotations,
    pub link: Option<String>,
}

impl TextSpan {
    /// An unstyled span.
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            annotations: Annotations::default(),
            link: None,
        }
    }

    /// A span with exactly one style attribute set.
    pub fn styled(content: impl Into<String>, style: Style) -> Self {
        let mut annotations = Annotations::default();
        match style {
            Style::Bold => annotations.bold = true,
            Style::Italic => annotations.italic = true,
            Style::Underline => annotations.underline = true,
            Style::Strikethrough => annotations.strikethrough = true,
            Style::Code => annotations.code = true,
        }
        Self {
            content: content.into(),
            annotations,
            link: None,
        }
    }

    /// An unstyled span carrying a hyperlink.
    pub fn link(content: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            annotations: Annotations::default(),
            link: Some(url.into()),
        }
    }

    /// Wire shape of a rich-text element.
    pub fn to_json(&self) -> Value {
        let text = match &self.link {
            Some(url) => json!({ "content": self.content, "link": { "url": url } }),
            None => json!({ "content": self.content }),
        };
        json!({
            "type": "text",
            "text": text,
            "annotations": self.annotations.to_json(),
        })
    }
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// One structural unit of a translated document.
///
/// Text-bearing variants always carry a non-empty `rich_text` sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading1 { rich_text: Vec<TextSpan>, color: Color },
    Heading2 { rich_text: Vec<TextSpan>, color: Color },
    Heading3 { rich_text: Vec<TextSpan>, color: Color },
    Paragraph { rich_text: Vec<TextSpan>, color: Color },
    BulletedListItem { rich_text: Vec<TextSpan>, color: Color },
    NumberedListItem { rich_text: Vec<TextSpan>, color: Color },
    Quote { rich_text: Vec<TextSpan>, color: Color },
    /// Verbatim multi-line content held in a single span.
    Code { rich_text: TextSpan, language: String },
    Equation { expression: String },
    Embed { url: String },
    /// External image by URL.
    Image { url: String },
    Divider,
}

impl Block {
    /// Wire name of the block kind (also the payload key in the JSON shape).
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Heading1 { .. } => "heading_1",
            Block::Heading2 { .. } => "heading_2",
            Block::Heading3 { .. } => "heading_3",
            Block::Paragraph { .. } => "paragraph",
            Block::BulletedListItem { .. } => "bulleted_list_item",
            Block::NumberedListItem { .. } => "numbered_list_item",
            Block::Quote { .. } => "quote",
            Block::Code { .. } => "code",
            Block::Equation { .. } => "equation",
            Block::Embed { .. } => "embed",
            Block::Image { .. } => "image",
            Block::Divider => "divider",
        }
    }

    /// Serialize into the store's block wire shape.
    pub fn to_json(&self) -> Value {
        let kind = self.kind();
        let payload = match self {
            Block::Heading1 { rich_text, color }
            | Block::Heading2 { rich_text, color }
            | Block::Heading3 { rich_text, color }
            | Block::Paragraph { rich_text, color }
            | Block::BulletedListItem { rich_text, color }
            | Block::NumberedListItem { rich_text, color }
            | Block::Quote { rich_text, color } => json!({
                "rich_text": rich_text.iter().map(TextSpan::to_json).collect::<Vec<_>>(),
                "color": color.as_str(),
            }),
            Block::Code { rich_text, language } => json!({
                "rich_text": [rich_text.to_json()],
                "language": language,
            }),
            Block::Equation { expression } => json!({ "expression": expression }),
            Block::Embed { url } => json!({ "url": url }),
            Block::Image { url } => json!({
                "type": "external",
                "external": { "url": url },
            }),
            Block::Divider => json!({}),
        };
        json!({
            "object": "block",
            "type": kind,
            kind: payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_span_wire_shape() {
        let span = TextSpan::plain("hello");
        let v = span.to_json();
        assert_eq!(v["type"], "text");
        assert_eq!(v["text"]["content"], "hello");
        assert_eq!(v["annotations"]["bold"], false);
        assert_eq!(v["annotations"]["color"], "default");
        assert!(v["text"].get("link").is_none());
    }

    #[test]
    fn styled_span_sets_exactly_one_flag() {
        let span = TextSpan::styled("x", Style::Strikethrough);
        assert!(span.annotations.strikethrough);
        assert!(!span.annotations.bold);
        assert!(!span.annotations.italic);
        assert!(!span.annotations.underline);
        assert!(!span.annotations.code);
    }

    #[test]
    fn link_span_wire_shape() {
        let span = TextSpan::link("docs", "https://example.com/docs");
        let v = span.to_json();
        assert_eq!(v["text"]["link"]["url"], "https://example.com/docs");
        assert_eq!(v["annotations"]["italic"], false);
    }

    #[test]
    fn heading_block_wire_shape() {
        let block = Block::Heading2 {
            rich_text: vec![TextSpan::plain("Title")],
            color: Color::Default,
        };
        let v = block.to_json();
        assert_eq!(v["object"], "block");
        assert_eq!(v["type"], "heading_2");
        assert_eq!(v["heading_2"]["rich_text"][0]["text"]["content"], "Title");
        assert_eq!(v["heading_2"]["color"], "default");
    }

    #[test]
    fn image_block_tags_external_source() {
        let block = Block::Image {
            url: "https://cdn.example.com/a.png".into(),
        };
        let v = block.to_json();
        assert_eq!(v["image"]["type"], "external");
        assert_eq!(v["image"]["external"]["url"], "https://cdn.example.com/a.png");
    }

    #[test]
    fn divider_has_empty_payload() {
        let v = Block::Divider.to_json();
        assert_eq!(v["type"], "divider");
        assert_eq!(v["divider"], json!({}));
    }

    #[test]
    fn code_block_holds_single_span() {
        let block = Block::Code {
            rich_text: TextSpan::plain("fn main() {}\nlet x = 1;"),
            language: "rust".into(),
        };
        let v = block.to_json();
        assert_eq!(v["code"]["language"], "rust");
        assert_eq!(v["code"]["rich_text"].as_array().unwrap().len(), 1);
    }
}
