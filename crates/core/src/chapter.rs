//! Chapter descriptors and chapter page extraction.
//!
//! A [`Chapter`] is created by the table-of-contents walk and filled in as
//! the download progresses. [`fetch_chapter`] retrieves one chapter page under
//! a [`RetryPolicy`] and extracts three variants of it:
//!
//! - plain text: every `.p-novel__text` section, ruby converted and tags
//!   stripped, joined with a line of asterisks
//! - structural HTML: the inner HTML of `.p-novel__body`
//! - full page HTML: the whole page with site-relative asset paths made absolute

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

use crate::convert::{Converter, strip_tags};
use crate::entity::restore_entities;
use crate::fetch::PageSource;
use crate::parse::Document;
use crate::retry::RetryPolicy;
use crate::site;
use crate::{NarouError, Result};

/// Line placed between the text sections of one chapter.
pub const SECTION_SEPARATOR: &str = "\n************************************************\n";

static CSS_PATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"href="(/[^"]*\.css[^"]*)""#).unwrap());
static JS_PATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"src="(/[^"]*\.js[^"]*)""#).unwrap());
static IMAGE_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src="(/[^"]*\.(?:png|jpg|jpeg|gif|svg|webp)[^"]*)""#).unwrap());
static LINK_PATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"href="(/[^"]*)""#).unwrap());
static IFRAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<iframe[^>]*>.*?</iframe>").unwrap());
static IFRAME_SELF_CLOSING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<iframe[^>]*/>").unwrap());

/// Where a chapter is in the download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterState {
    #[default]
    Pending,
    /// Output already present from an earlier run.
    Skipped,
    /// Content retrieved but not (yet) written.
    Fetched,
    Saved,
    Failed,
}

/// One chapter of a work, in table-of-contents order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Chapter {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structural_html: Option<String>,
    #[serde(skip)]
    pub full_page_html: Option<String>,
    /// Attempts beyond the first spent on this chapter.
    pub retry_count: u32,
    pub failed: bool,
    pub state: ChapterState,
}

impl Chapter {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self { title: title.into(), url: url.into(), ..Default::default() }
    }

    /// Stores fetched content and marks the chapter as fetched.
    pub fn fill(&mut self, content: ChapterContent) {
        self.retry_count = content.attempts.saturating_sub(1);
        self.text_content = Some(content.text);
        self.structural_html = (!content.structural_html.is_empty()).then_some(content.structural_html);
        self.full_page_html = (!content.full_page_html.is_empty()).then_some(content.full_page_html);
        self.failed = false;
        self.state = ChapterState::Fetched;
    }

    /// Records a fetch failure after `attempts` tries.
    pub fn mark_failed(&mut self, attempts: u32) {
        self.retry_count = attempts.saturating_sub(1);
        self.failed = true;
        self.state = ChapterState::Failed;
    }

    /// HTML written as the chapter's page file, with iframes removed.
    ///
    /// Prefers the full page and falls back to the structural fragment.
    pub fn page_html(&self) -> Option<String> {
        self.full_page_html
            .as_deref()
            .or(self.structural_html.as_deref())
            .map(remove_iframes)
    }
}

/// Content extracted from one chapter page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterContent {
    pub text: String,
    pub structural_html: String,
    pub full_page_html: String,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

/// Fetches and extracts the chapter at `url`, retrying under `policy`.
///
/// Transport and extraction failures are retried alike. When every attempt
/// fails the returned [`NarouError::RetriesExhausted`] carries the last error.
pub async fn fetch_chapter<S: PageSource>(
    source: &S, url: &str, converter: &Converter, policy: &RetryPolicy,
) -> Result<ChapterContent> {
    let target = format!("chapter {}", url);

    policy
        .run(&target, move |attempt| async move {
            let html = source.fetch_html(url).await?;
            let mut content = extract_chapter(&html, url, converter)?;
            content.attempts = attempt + 1;
            Ok(content)
        })
        .await
}

/// Extracts all three variants from a chapter page fetched from `url`.
pub fn extract_chapter(html: &str, url: &str, converter: &Converter) -> Result<ChapterContent> {
    let doc = Document::parse(html)?;
    let text = extract_text(&doc, converter)?;
    let structural_html = extract_structural(&doc)?;
    let full_page_html = absolutize_asset_paths(&doc.as_string(), site::origin_for(url));

    Ok(ChapterContent { text, structural_html, full_page_html, attempts: 1 })
}

/// Plain text of every non-empty text section, in document order.
///
/// # Errors
///
/// Returns [`NarouError::NoContent`] when no section has any text.
pub fn extract_text(doc: &Document, converter: &Converter) -> Result<String> {
    let mut parts = Vec::new();

    for section in doc.select(site::TEXT_SECTION_SELECTOR)? {
        let converted = converter.convert_ruby(&section.inner_html());
        let stripped = strip_tags(&converted);
        let text = restore_entities(&stripped);
        let text = text.trim();
        if !text.is_empty() {
            parts.push(text.to_string());
        }
    }

    if parts.is_empty() {
        return Err(NarouError::NoContent);
    }

    tracing::debug!(sections = parts.len(), "extracted chapter text");
    Ok(parts.join(SECTION_SEPARATOR))
}

/// Inner HTML of the story body.
pub fn extract_structural(doc: &Document) -> Result<String> {
    doc.select_first(site::BODY_SELECTOR)?
        .map(|body| body.inner_html())
        .ok_or_else(|| NarouError::MissingElement(site::BODY_SELECTOR.to_string()))
}

/// Rewrites site-relative stylesheet, script, image and link paths in `html`
/// to absolute URLs under `origin`.
///
/// Fragment links, protocol-relative paths and paths containing a scheme are
/// left alone.
pub fn absolutize_asset_paths(html: &str, origin: &str) -> String {
    let absolutize = |attr: &'static str| {
        move |caps: &Captures| {
            let path = &caps[1];
            if path.starts_with("//") || path.contains("://") {
                caps[0].to_string()
            } else {
                format!(r#"{}="{}{}""#, attr, origin, path)
            }
        }
    };

    let html = CSS_PATH_RE.replace_all(html, absolutize("href"));
    let html = JS_PATH_RE.replace_all(&html, absolutize("src"));
    let html = IMAGE_PATH_RE.replace_all(&html, absolutize("src"));
    let html = LINK_PATH_RE.replace_all(&html, absolutize("href"));
    html.into_owned()
}

/// Removes `<iframe>` elements, paired or self-closing.
pub fn remove_iframes(html: &str) -> String {
    let html = IFRAME_RE.replace_all(html, "");
    IFRAME_SELF_CLOSING_RE.replace_all(&html, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const CHAPTER_HTML: &str = r#"<html><head>
        <link rel="stylesheet" href="/css/novel.css">
        <script src="/js/app.js"></script>
        </head><body>
        <h1 class="p-novel__title">第一話</h1>
        <div class="p-novel__body">
            <div class="p-novel__text p-novel__text--preface"><p id="Lp1">前書き</p></div>
            <div class="p-novel__text">
<p id="L1"><ruby>漢字<rp>(</rp><rt>かんじ</rt><rp>)</rp></ruby>の本文&amp;記号</p>
<p id="L2"><br></p>
<p id="L3">二行目</p>
            </div>
            <div class="p-novel__text">   </div>
        </div>
        <iframe src="https://ads.example.com/"></iframe>
        </body></html>"#;

    struct FlakySource {
        pages: HashMap<String, String>,
        failures_left: Mutex<u32>,
    }

    impl PageSource for FlakySource {
        async fn fetch_html(&self, url: &str) -> Result<String> {
            {
                let mut left = self.failures_left.lock().unwrap();
                if *left > 0 {
                    *left -= 1;
                    return Err(NarouError::Timeout { timeout: 10 });
                }
            }
            self.pages.get(url).cloned().ok_or_else(|| NarouError::InvalidUrl(url.to_string()))
        }
    }

    fn flaky(failures: u32) -> FlakySource {
        let mut pages = HashMap::new();
        pages.insert("https://ncode.syosetu.com/n1234ab/1/".to_string(), CHAPTER_HTML.to_string());
        pages.insert(
            "https://ncode.syosetu.com/n1234ab/2/".to_string(),
            "<html><body>no body</body></html>".to_string(),
        );
        FlakySource { pages, failures_left: Mutex::new(failures) }
    }

    #[test]
    fn test_extract_text_joins_sections() {
        let doc = Document::parse(CHAPTER_HTML).unwrap();
        let text = extract_text(&doc, &Converter::default()).unwrap();

        assert_eq!(
            text,
            format!("前書き{}｜漢字《かんじ》の本文&記号\n\n二行目", SECTION_SEPARATOR)
        );
    }

    #[test]
    fn test_extract_text_without_sections() {
        let doc = Document::parse("<div class=\"p-novel__body\"></div>").unwrap();
        assert!(matches!(extract_text(&doc, &Converter::default()), Err(NarouError::NoContent)));
    }

    #[test]
    fn test_extract_structural() {
        let doc = Document::parse(CHAPTER_HTML).unwrap();
        assert!(extract_structural(&doc).unwrap().contains("p-novel__text--preface"));

        let doc = Document::parse("<p>none</p>").unwrap();
        assert!(matches!(extract_structural(&doc), Err(NarouError::MissingElement(_))));
    }

    #[test]
    fn test_absolutize_asset_paths() {
        let html = concat!(
            r#"<link href="/css/a.css?v=1"><script src="/js/b.js"></script>"#,
            r##"<img src="/img/c.png"><a href="/n1234ab/2/">next</a><a href="#top">top</a>"##,
            r#"<a href="//cdn.example.com/x">cdn</a><img src="/img/unknown.bmp">"#,
        );
        let result = absolutize_asset_paths(html, site::AGE_GATED_ORIGIN);

        assert!(result.contains(r#"href="https://novel18.syosetu.com/css/a.css?v=1""#));
        assert!(result.contains(r#"src="https://novel18.syosetu.com/js/b.js""#));
        assert!(result.contains(r#"src="https://novel18.syosetu.com/img/c.png""#));
        assert!(result.contains(r#"href="https://novel18.syosetu.com/n1234ab/2/""#));
        assert!(result.contains(r##"href="#top""##));
        assert!(result.contains(r#"href="//cdn.example.com/x""#));
        assert!(result.contains(r#"src="/img/unknown.bmp""#));
    }

    #[test]
    fn test_remove_iframes() {
        let html = r#"<p>a</p><IFRAME src="x">
            inner</IFRAME><p>b</p><iframe src="y" /><p>c</p>"#;
        assert_eq!(remove_iframes(html), "<p>a</p><p>b</p><p>c</p>");
    }

    #[test]
    fn test_chapter_fill_and_page_html() {
        let mut chapter = Chapter::new("第一話", "https://ncode.syosetu.com/n1234ab/1/");
        chapter.fill(ChapterContent {
            text: "本文".to_string(),
            structural_html: "<div>本文</div>".to_string(),
            full_page_html: "<html><iframe src=\"a\"></iframe>本文</html>".to_string(),
            attempts: 2,
        });

        assert_eq!(chapter.state, ChapterState::Fetched);
        assert_eq!(chapter.retry_count, 1);
        assert_eq!(chapter.page_html().unwrap(), "<html>本文</html>");

        chapter.mark_failed(3);
        assert!(chapter.failed);
        assert_eq!(chapter.retry_count, 2);
    }

    #[tokio::test]
    async fn test_fetch_chapter_retries_transport_failures() {
        let source = flaky(2);
        let content = fetch_chapter(
            &source,
            "https://ncode.syosetu.com/n1234ab/1/",
            &Converter::default(),
            &RetryPolicy::immediate(3),
        )
        .await
        .unwrap();

        assert_eq!(content.attempts, 3);
        assert!(content.text.contains("二行目"));
        assert!(content.full_page_html.contains("https://ncode.syosetu.com/css/novel.css"));
    }

    #[tokio::test]
    async fn test_fetch_chapter_reports_last_error() {
        let source = flaky(0);
        let result = fetch_chapter(
            &source,
            "https://ncode.syosetu.com/n1234ab/2/",
            &Converter::default(),
            &RetryPolicy::immediate(3),
        )
        .await;

        match result {
            Err(NarouError::RetriesExhausted { attempts, source, .. }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, NarouError::NoContent));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
