//! Markdown-to-block translation engine.
//!
//! Converts lightweight-markup documents into the typed block sequence the
//! document store consumes. The engine is a single forward pass over lines:
//! a code-fence accumulator sees every raw line first, then a fixed-priority
//! resolver cascade classifies what remains, with a paragraph fallback that
//! makes classification total. Inline text is tokenized into styled spans by
//! [`tokenize`].
//!
//! The only external collaborator reached from inside the engine is the
//! image host ([`ImageSync`]), invoked when a document references a local
//! image file.

mod fence;
mod inline;
mod resolve;

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use pagelift_shared::{Block, Color, PageliftError, Result};

pub use inline::tokenize;

// ---------------------------------------------------------------------------
// Image host port
// ---------------------------------------------------------------------------

/// Image-host collaborator: mirrors a local image directory to stable
/// external URLs.
///
/// `sync_directory` must be idempotent — implementations skip files already
/// present on the host — because the engine triggers it on every local-image
/// reference it encounters. Callers wanting fewer round trips memoize at the
/// injection site, not here.
pub trait ImageSync {
    fn sync_directory(&self, dir: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// No-op image host for documents without local images and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopImageSync;

impl ImageSync for NoopImageSync {
    async fn sync_directory(&self, _dir: &Path) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Translator
// ---------------------------------------------------------------------------

/// Options controlling local-image resolution.
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Public URL prefix prepended to mirrored image filenames. `None` (or
    /// empty) means no image host is configured; local references become a
    /// config error rather than a silently broken URL.
    pub image_host_prefix: Option<String>,
    /// Local directory the image host mirrors.
    pub local_image_dir: PathBuf,
}

/// Translates one document at a time. Holds no per-document state; fence
/// state is created per [`translate`](Translator::translate) call, so one
/// translator can serve many documents.
pub struct Translator<S> {
    images: S,
    options: TranslateOptions,
}

impl<S: ImageSync> Translator<S> {
    pub fn new(images: S, options: TranslateOptions) -> Self {
        Self { images, options }
    }

    /// Translate a document's text into its ordered block sequence.
    ///
    /// Single forward pass, no backtracking. Blank lines outside fences are
    /// skipped; every other non-fence line produces exactly one block. The
    /// only error raised here is a config error for an unresolvable local
    /// image reference; malformed markup degrades to plain text instead.
    #[instrument(skip_all)]
    pub async fn translate(&self, source: &str) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        let mut fence = fence::FenceState::new();

        for raw in source.lines() {
            // The fence sees every raw line first so that blank lines and
            // marker-like content inside code stay verbatim.
            match fence.feed(raw) {
                fence::FenceAction::Emit(block) => {
                    blocks.push(block);
                    continue;
                }
                fence::FenceAction::Consumed => continue,
                fence::FenceAction::NotConsumed => {}
            }

            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            let indent = raw.chars().take_while(|&c| c == ' ').count();
            blocks.push(self.classify(line, indent).await?);
        }

        if let Some(dropped) = fence.finish() {
            // A fence left open at end of input: the buffered content is
            // dropped. Surfaced as a diagnostic, never a failure.
            warn!(
                dropped_bytes = dropped.len(),
                "unterminated code fence at end of input, discarding buffered content"
            );
        }

        debug!(block_count = blocks.len(), "translation complete");
        Ok(blocks)
    }

    /// Fixed-priority resolver cascade. Order is semantically load-bearing;
    /// the paragraph fallback makes it total.
    async fn classify(&self, line: &str, indent: usize) -> Result<Block> {
        if let Some(block) = resolve::heading(line) {
            return Ok(block);
        }
        if let Some(block) = resolve::list_item(line, indent) {
            return Ok(block);
        }
        if let Some(block) = resolve::quote(line) {
            return Ok(block);
        }
        if let Some(block) = resolve::equation(line) {
            return Ok(block);
        }
        if let Some(block) = resolve::embed(line) {
            return Ok(block);
        }
        if line.starts_with("---") {
            return Ok(Block::Divider);
        }
        if let Some(image) = resolve::image(line) {
            return self.resolve_image(image).await;
        }
        Ok(Block::Paragraph {
            rich_text: inline::tokenize(line),
            color: Color::Default,
        })
    }

    /// External targets pass through verbatim; local targets trigger one
    /// directory sync and resolve against the configured host prefix.
    async fn resolve_image(&self, image: resolve::ImageRef) -> Result<Block> {
        if image.is_external() {
            return Ok(Block::Image { url: image.target });
        }

        let prefix = self
            .options
            .image_host_prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                PageliftError::config(format!(
                    "local image '{}' referenced but images.host_prefix is not configured",
                    image.target
                ))
            })?;

        self.images
            .sync_directory(&self.options.local_image_dir)
            .await?;

        let filename = Path::new(&image.target)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| image.target.clone());

        Ok(Block::Image {
            url: format!("{prefix}{filename}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use pagelift_shared::TextSpan;

    /// Records sync calls for assertion.
    #[derive(Default)]
    struct RecordingSync {
        calls: Mutex<Vec<PathBuf>>,
    }

    impl RecordingSync {
        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl ImageSync for &RecordingSync {
        async fn sync_directory(&self, dir: &Path) -> Result<()> {
            self.calls.lock().unwrap().push(dir.to_path_buf());
            Ok(())
        }
    }

    fn bare_translator() -> Translator<NoopImageSync> {
        Translator::new(NoopImageSync, TranslateOptions::default())
    }

    async fn translate(source: &str) -> Vec<Block> {
        bare_translator().translate(source).await.unwrap()
    }

    #[tokio::test]
    async fn translation_is_deterministic() {
        let source = "# T\n\n- a\n> q\n\n```rs\nlet x;\n```\ntext **b**\n";
        let first = translate(source).await;
        let second = translate(source).await;
        assert_eq!(first, second);
        let json_a: Vec<_> = first.iter().map(Block::to_json).collect();
        let json_b: Vec<_> = second.iter().map(Block::to_json).collect();
        assert_eq!(json_a, json_b);
    }

    #[tokio::test]
    async fn every_nonblank_line_outside_fences_yields_one_block() {
        let source = "# h\npara\n- item\n> q\n---\nlast";
        let blocks = translate(source).await;
        assert_eq!(blocks.len(), 6);
    }

    #[tokio::test]
    async fn blank_lines_never_produce_blocks() {
        let blocks = translate("a\n\n\n   \nb").await;
        assert_eq!(blocks.len(), 2);
    }

    #[tokio::test]
    async fn code_fence_round_trip() {
        let blocks = translate("```lang\nA\nB\n```").await;
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            Block::Code { rich_text, language } => {
                assert_eq!(language, "lang");
                assert_eq!(rich_text.content, "A\nB");
            }
            other => panic!("expected code block, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fence_content_is_never_misclassified() {
        let source = "```\n# comment\n\n- not a list\n```";
        let blocks = translate(source).await;
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            Block::Code { rich_text, .. } => {
                assert_eq!(rich_text.content, "# comment\n\n- not a list");
            }
            other => panic!("expected code block, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unclosed_fence_drops_buffered_content() {
        let blocks = translate("before\n```rust\nlet x = 1;\n").await;
        assert_eq!(
            blocks,
            vec![Block::Paragraph {
                rich_text: vec![TextSpan::plain("before")],
                color: Color::Default,
            }]
        );
    }

    #[tokio::test]
    async fn divider_from_triple_dash() {
        let blocks = translate("---").await;
        assert_eq!(blocks, vec![Block::Divider]);
    }

    #[tokio::test]
    async fn indented_bullet_degrades_to_glyph_paragraph() {
        let blocks = translate("  - x").await;
        match &blocks[0] {
            Block::Paragraph { rich_text, .. } => {
                assert_eq!(rich_text[0], TextSpan::plain("    📖 "));
                assert_eq!(rich_text[1], TextSpan::plain("x"));
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn equation_line_yields_single_equation_block() {
        let blocks = translate("$$ a^2 $$").await;
        assert_eq!(
            blocks,
            vec![Block::Equation {
                expression: "a^2".into()
            }]
        );
    }

    #[tokio::test]
    async fn fallback_paragraph_always_succeeds() {
        let blocks = translate("][ odd ** markup <").await;
        assert_eq!(blocks.len(), 1);
        assert!(matches!(blocks[0], Block::Paragraph { .. }));
    }

    #[tokio::test]
    async fn external_image_passes_through_without_sync() {
        let sync = RecordingSync::default();
        let translator = Translator::new(
            &sync,
            TranslateOptions {
                image_host_prefix: Some("https://cdn/".into()),
                local_image_dir: PathBuf::from("/imgs"),
            },
        );
        let blocks = translator
            .translate("![alt](http://x/y.png)")
            .await
            .unwrap();
        assert_eq!(
            blocks,
            vec![Block::Image {
                url: "http://x/y.png".into()
            }]
        );
        assert_eq!(sync.call_count(), 0);
    }

    #[tokio::test]
    async fn local_image_syncs_once_and_resolves_against_prefix() {
        let sync = RecordingSync::default();
        let translator = Translator::new(
            &sync,
            TranslateOptions {
                image_host_prefix: Some("https://cdn/".into()),
                local_image_dir: PathBuf::from("/imgs"),
            },
        );
        let blocks = translator.translate("![alt](local.png)").await.unwrap();
        assert_eq!(
            blocks,
            vec![Block::Image {
                url: "https://cdn/local.png".into()
            }]
        );
        assert_eq!(sync.call_count(), 1);
        assert_eq!(sync.calls.lock().unwrap()[0], PathBuf::from("/imgs"));
    }

    #[tokio::test]
    async fn local_image_basename_strips_directories() {
        let sync = RecordingSync::default();
        let translator = Translator::new(
            &sync,
            TranslateOptions {
                image_host_prefix: Some("https://cdn/".into()),
                local_image_dir: PathBuf::from("/imgs"),
            },
        );
        let blocks = translator
            .translate("![alt](assets/deep/pic.jpg)")
            .await
            .unwrap();
        assert_eq!(
            blocks,
            vec![Block::Image {
                url: "https://cdn/pic.jpg".into()
            }]
        );
    }

    #[tokio::test]
    async fn local_image_without_prefix_is_a_config_error() {
        let err = bare_translator()
            .translate("![alt](local.png)")
            .await
            .unwrap_err();
        assert!(matches!(err, PageliftError::Config { .. }));
        assert!(err.to_string().contains("local.png"));
    }

    #[tokio::test]
    async fn each_local_image_line_triggers_its_own_sync() {
        let sync = RecordingSync::default();
        let translator = Translator::new(
            &sync,
            TranslateOptions {
                image_host_prefix: Some("https://cdn/".into()),
                local_image_dir: PathBuf::from("/imgs"),
            },
        );
        translator
            .translate("![a](one.png)\n![b](two.png)")
            .await
            .unwrap();
        assert_eq!(sync.call_count(), 2);
    }

    #[tokio::test]
    async fn resolver_priority_heading_before_paragraph() {
        let blocks = translate("# $$ x $$").await;
        // Heading wins over equation by cascade order.
        assert!(matches!(blocks[0], Block::Heading1 { .. }));
    }

    #[tokio::test]
    async fn mixed_document_end_to_end() {
        let source = "\
# Notes

Intro paragraph with [a link](https://example.com).

- first
  - nested

> remember this

```python
def f():
    return 1
```

---
![cover](http://img/c.png)
";
        let blocks = translate(source).await;
        let kinds: Vec<_> = blocks.iter().map(Block::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "heading_1",
                "paragraph",
                "bulleted_list_item",
                "paragraph",
                "quote",
                "code",
                "divider",
                "image",
            ]
        );
    }
}
