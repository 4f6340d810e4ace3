//! HTML to Aozora-style plain text conversion.
//!
//! The [`Converter`] runs a fixed sequence of text rewrites over a fragment of
//! novel markup:
//!
//! 1. line breaks (`<br>`) to newlines, unless the input is pre-formatted
//! 2. paragraph ends (`</p>`) to a single newline
//! 3. ruby glosses to `｜base《gloss》`
//! 4. bold/italic/strikethrough tags to bracket annotations (optional)
//! 5. illustrations to `［＃挿絵（src）入る］`
//! 6. emphasis-dot spans to `［＃傍点］…［＃傍点終わり］`
//! 7. removal of every remaining tag
//! 8. character reference restoration
//!
//! Later passes rely on the normalisation done by earlier ones, so the order
//! is fixed. No pass can fail: malformed markup produces best-effort text.
//!
//! # Example
//!
//! ```rust
//! use narou_txt_core::Converter;
//!
//! let converter = Converter::default();
//! assert_eq!(converter.convert("これは<br>テストです<br />", false), "これは\nテストです\n");
//! assert_eq!(converter.convert("<ruby>漢字<rt>かんじ</rt></ruby>", false), "｜漢字《かんじ》");
//! ```

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

use crate::entity::restore_entities;
use crate::{NarouError, Result};

/// Default illustration pattern: any `<img>` tag, capturing its quoted `src`.
pub const DEFAULT_ILLUSTRATION_PATTERN: &str = r#"<img.+?src="(?P<src>.+?)".*?>"#;

static NEWLINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\r\n]+").unwrap());
static BR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br(?:\s[^>]*)?/?>").unwrap());
static P_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\n?</p>").unwrap());
static RUBY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<ruby>(.+?)</ruby>").unwrap());
static RT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<rt>").unwrap());
static RP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<rp>").unwrap());
static IDEOGRAPHS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\p{Han}々仝〆〇ヶ]+$").unwrap());
static EMPHASIS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<em class="emphasisDots">(.+?)</em>"#).unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<.+?>").unwrap());

/// Open tag, close tag, opening annotation and closing annotation.
static DECORATIONS: LazyLock<[(Regex, Regex, &'static str, &'static str); 3]> = LazyLock::new(|| {
    [
        (
            Regex::new(r"(?i)<b>").unwrap(),
            Regex::new(r"(?i)</b>").unwrap(),
            "［＃太字］",
            "［＃太字終わり］",
        ),
        (
            Regex::new(r"(?i)<i>").unwrap(),
            Regex::new(r"(?i)</i>").unwrap(),
            "［＃斜体］",
            "［＃斜体終わり］",
        ),
        (
            Regex::new(r"(?i)<s>").unwrap(),
            Regex::new(r"(?i)</s>").unwrap(),
            "［＃取消線］",
            "［＃取消線終わり］",
        ),
    ]
});

/// Validated settings for a [`Converter`].
///
/// Built through [`ConverterConfig::builder`]; an invalid illustration pattern
/// is rejected when the config is built, never while converting.
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    strip_decoration_tags: bool,
    illustration_base_url: String,
    illustration_pattern: Regex,
    compact_ruby: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            strip_decoration_tags: false,
            illustration_base_url: String::new(),
            illustration_pattern: Regex::new(DEFAULT_ILLUSTRATION_PATTERN).unwrap(),
            compact_ruby: false,
        }
    }
}

impl ConverterConfig {
    /// Creates a new builder starting from the default settings.
    ///
    /// # Example
    ///
    /// ```rust
    /// use narou_txt_core::ConverterConfig;
    ///
    /// let config = ConverterConfig::builder()
    ///     .strip_decoration_tags(true)
    ///     .illustration_base_url("https://ncode.syosetu.com/n1234ab/1/")
    ///     .build()
    ///     .unwrap();
    /// assert!(config.strip_decoration_tags());
    /// ```
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder::new()
    }

    /// Whether bold/italic/strikethrough tags are dropped instead of annotated.
    pub fn strip_decoration_tags(&self) -> bool {
        self.strip_decoration_tags
    }

    /// Base URL that relative illustration sources are resolved against.
    pub fn illustration_base_url(&self) -> &str {
        &self.illustration_base_url
    }

    /// Pattern used to detect illustrations.
    pub fn illustration_pattern(&self) -> &Regex {
        &self.illustration_pattern
    }

    /// Whether `｜` is omitted before ruby bases made only of ideographs.
    pub fn compact_ruby(&self) -> bool {
        self.compact_ruby
    }
}

/// Builder for ConverterConfig.
#[derive(Debug, Clone, Default)]
pub struct ConverterConfigBuilder {
    strip_decoration_tags: bool,
    illustration_base_url: String,
    illustration_pattern: Option<String>,
    compact_ruby: bool,
}

impl ConverterConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether decoration tags are stripped.
    pub fn strip_decoration_tags(mut self, value: bool) -> Self {
        self.strip_decoration_tags = value;
        self
    }

    /// Sets the base URL for illustration sources. Empty disables resolution.
    pub fn illustration_base_url(mut self, value: impl Into<String>) -> Self {
        self.illustration_base_url = value.into();
        self
    }

    /// Sets a custom illustration pattern.
    ///
    /// The pattern must contain a capture group; a group named `src` is
    /// preferred, otherwise the first group is used.
    pub fn illustration_pattern(mut self, value: impl Into<String>) -> Self {
        self.illustration_pattern = Some(value.into());
        self
    }

    /// Sets whether `｜` is omitted for ideograph-only ruby bases.
    pub fn compact_ruby(mut self, value: bool) -> Self {
        self.compact_ruby = value;
        self
    }

    /// Validates and builds the config.
    ///
    /// # Errors
    ///
    /// Returns [`NarouError::ConfigError`] if the illustration pattern does not
    /// compile or has no capture group.
    pub fn build(self) -> Result<ConverterConfig> {
        let illustration_pattern = match self.illustration_pattern.as_deref() {
            Some(pattern) if !pattern.is_empty() => compile_illustration_pattern(pattern)?,
            _ => Regex::new(DEFAULT_ILLUSTRATION_PATTERN).unwrap(),
        };

        Ok(ConverterConfig {
            strip_decoration_tags: self.strip_decoration_tags,
            illustration_base_url: self.illustration_base_url,
            illustration_pattern,
            compact_ruby: self.compact_ruby,
        })
    }
}

fn compile_illustration_pattern(pattern: &str) -> Result<Regex> {
    let re = Regex::new(pattern)
        .map_err(|e| NarouError::ConfigError(format!("invalid illustration pattern: {}", e)))?;
    if re.captures_len() < 2 {
        return Err(NarouError::ConfigError(
            "illustration pattern needs a capture group for the image source".to_string(),
        ));
    }
    Ok(re)
}

/// Markup to Aozora-style text converter.
///
/// One converter holds one [`ConverterConfig`] and can be reused for any
/// number of conversions.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: ConverterConfig,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Replaces the illustration settings.
    ///
    /// An empty `pattern` keeps the current one. The new settings are
    /// validated before anything is changed, so on error the converter keeps
    /// working with its previous configuration.
    pub fn update_illustration(&mut self, base_url: &str, pattern: &str) -> Result<()> {
        let illustration_pattern = if pattern.is_empty() {
            self.config.illustration_pattern.clone()
        } else {
            compile_illustration_pattern(pattern)?
        };

        self.config.illustration_base_url = base_url.to_string();
        self.config.illustration_pattern = illustration_pattern;
        Ok(())
    }

    /// Converts markup into Aozora-style text.
    ///
    /// `pre_formatted` skips the line-break pass for input whose newlines are
    /// already meaningful.
    pub fn convert(&self, html: &str, pre_formatted: bool) -> String {
        let mut text = if pre_formatted { html.to_string() } else { convert_line_breaks(html) };

        text = convert_paragraph_ends(&text);
        text = self.convert_ruby(&text);

        if !self.config.strip_decoration_tags {
            text = convert_decorations(&text);
        }

        text = self.convert_illustrations(&text);
        text = convert_emphasis(&text);
        text = strip_tags(&text);

        let restored = restore_entities(&text).into_owned();
        tracing::trace!(input_len = html.len(), output_len = restored.len(), "converted fragment");
        restored
    }

    /// Rewrites `<ruby>` spans as `｜base《gloss》`.
    ///
    /// Literal `《` and `》` are swapped for `≪` and `≫` first so they cannot be
    /// mistaken for gloss delimiters. A span without `<rt>` keeps only its
    /// base text.
    pub fn convert_ruby(&self, text: &str) -> String {
        let text = text.replace('《', "≪").replace('》', "≫");

        RUBY_RE
            .replace_all(&text, |caps: &Captures| {
                let mut parts = RT_RE.splitn(&caps[1], 2);
                let head = parts.next().unwrap_or_default();
                let Some(tail) = parts.next() else {
                    return strip_tags(head);
                };

                let base = strip_tags(RP_RE.splitn(head, 2).next().unwrap_or_default());
                let gloss = strip_tags(RP_RE.splitn(tail, 2).next().unwrap_or_default());
                self.format_ruby(&base, &gloss)
            })
            .into_owned()
    }

    fn format_ruby(&self, base: &str, gloss: &str) -> String {
        if self.config.compact_ruby && IDEOGRAPHS_RE.is_match(base) {
            format!("{}《{}》", base, gloss)
        } else {
            format!("｜{}《{}》", base, gloss)
        }
    }

    fn convert_illustrations(&self, text: &str) -> String {
        let base_url = self.config.illustration_base_url.as_str();

        self.config
            .illustration_pattern
            .replace_all(text, |caps: &Captures| {
                let Some(src) = caps.name("src").or_else(|| caps.get(1)) else {
                    return caps[0].to_string();
                };
                format!("［＃挿絵（{}）入る］", resolve_source(base_url, src.as_str()))
            })
            .into_owned()
    }
}

/// Resolves `src` against `base_url`, falling back to `src` unchanged.
fn resolve_source(base_url: &str, src: &str) -> String {
    if base_url.is_empty() {
        return src.to_string();
    }
    Url::parse(base_url)
        .and_then(|base| base.join(src))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| src.to_string())
}

fn convert_line_breaks(text: &str) -> String {
    let flattened = NEWLINES_RE.replace_all(text, "");
    BR_RE.replace_all(&flattened, "\n").into_owned()
}

fn convert_paragraph_ends(text: &str) -> String {
    P_CLOSE_RE.replace_all(text, "\n").into_owned()
}

fn convert_decorations(text: &str) -> String {
    let mut text = text.to_string();
    for (open, close, open_note, close_note) in DECORATIONS.iter() {
        text = open.replace_all(&text, *open_note).into_owned();
        text = close.replace_all(&text, *close_note).into_owned();
    }
    text
}

fn convert_emphasis(text: &str) -> String {
    EMPHASIS_RE
        .replace_all(text, "［＃傍点］${1}［＃傍点終わり］")
        .into_owned()
}

/// Removes every `<...>` span, including spans that cross newlines.
pub fn strip_tags(text: &str) -> String {
    TAG_RE.replace_all(text, "").into_owned()
}
