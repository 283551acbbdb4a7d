use autumnus::{HtmlLinkedBuilder, formatter::Formatter, languages::Language, themes};

use super::paths::url_to_relative_path;
use super::pipeline::{FinalizeStage, OutputFile, PipelineContext, PipelineError, RenderedContent};
use crate::config::MarkdownConfig;

/// Code block highlighting for the markdown stage, using autumnus (tree-sitter based).
///
/// Output uses CSS classes; [`SyntaxHighlighter::css`] produces the matching stylesheet.
pub struct SyntaxHighlighter {
    theme_name: String,
    enabled: bool,
}

impl SyntaxHighlighter {
    pub fn new(theme_name: &str) -> Self {
        Self {
            theme_name: theme_name.to_string(),
            enabled: true,
        }
    }

    /// A highlighter that only escapes code.
    pub fn disabled() -> Self {
        Self {
            theme_name: String::new(),
            enabled: false,
        }
    }

    pub fn from_config(config: &MarkdownConfig) -> Self {
        if config.highlight {
            Self::new(&config.highlight_theme)
        } else {
            Self::disabled()
        }
    }

    /// Highlight code and return an HTML `<pre>` block.
    ///
    /// Unsupported languages fall back to an escaped `<pre><code>` block.
    pub fn highlight(&self, code: &str, language: &str) -> String {
        if !self.enabled {
            return plain_code_block(code, language);
        }

        let lang = Language::guess(language, code);
        if matches!(lang, Language::PlainText)
            && !language.is_empty()
            && language != "plaintext"
            && language != "text"
        {
            return plain_code_block(code, language);
        }

        let Ok(formatter) = HtmlLinkedBuilder::new().source(code).lang(lang).build() else {
            return plain_code_block(code, language);
        };

        let mut output: Vec<u8> = Vec::new();
        if formatter.format(&mut output).is_err() {
            return plain_code_block(code, language);
        }
        String::from_utf8(output).unwrap_or_else(|_| plain_code_block(code, language))
    }

    /// Stylesheet for the configured theme.
    pub fn css(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let theme = themes::get(&self.theme_name).ok()?;
        Some(theme.css(false))
    }
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::from_config(&MarkdownConfig::default())
    }
}

/// Writes the highlighter's stylesheet, since highlighted code only carries classes.
pub struct HighlightCssStage {
    path: String,
}

impl HighlightCssStage {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl FinalizeStage for HighlightCssStage {
    fn name(&self) -> &'static str {
        "highlight-css"
    }

    fn finalize(
        &self,
        ctx: &PipelineContext,
        _rendered: &RenderedContent,
    ) -> Result<Vec<OutputFile>, PipelineError> {
        let Some(css) = ctx.highlighter.css() else {
            if ctx.highlighter.enabled {
                return Err(PipelineError::stage(
                    self.name(),
                    format!("unknown highlight theme '{}'", ctx.highlighter.theme_name),
                ));
            }
            return Ok(Vec::new());
        };
        Ok(vec![OutputFile {
            path: url_to_relative_path(&self.path),
            contents: css.into_bytes(),
            source: self.name().to_string(),
        }])
    }
}

fn plain_code_block(code: &str, language: &str) -> String {
    let escaped = html_escape(code);
    if language.is_empty() {
        format!("<pre><code>{}</code></pre>", escaped)
    } else {
        format!(
            "<pre><code class=\"language-{}\">{}</code></pre>",
            html_escape(language),
            escaped
        )
    }
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
