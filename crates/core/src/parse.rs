//! HTML parsing and CSS selection.
//!
//! [`Document`] wraps a parsed page and [`Element`] a node inside it. Both
//! expose only the selection primitives the index walker and chapter
//! extractor need.
//!
//! # Example
//!
//! ```rust
//! use narou_txt_core::parse::Document;
//!
//! let html = r#"<div class="p-eplist__sublist"><a href="/n1234ab/1/">第一話</a></div>"#;
//! let doc = Document::parse(html).unwrap();
//! let links = doc.select(".p-eplist__sublist a").unwrap();
//! assert_eq!(links[0].attr("href"), Some("/n1234ab/1/"));
//! ```

use scraper::{Html, Selector};

use crate::{NarouError, Result};

fn compile_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| NarouError::HtmlParseError(format!("Invalid selector: {}", e)))
}

/// A parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses HTML from a string.
    ///
    /// The HTML5 parser recovers from malformed markup, so this only fails
    /// for input that is not a page at all (reserved for future checks).
    pub fn parse(html: &str) -> Result<Self> {
        let html = Html::parse_document(html);
        Ok(Self { html })
    }

    /// Gets the entire HTML as a string.
    pub fn as_string(&self) -> String {
        self.html.html()
    }

    /// Selects elements using a CSS selector, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`NarouError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = compile_selector(selector)?;
        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Selects the first element matching a CSS selector.
    pub fn select_first(&'_ self, selector: &str) -> Result<Option<Element<'_>>> {
        let sel = compile_selector(selector)?;
        Ok(self.html.select(&sel).next().map(|el| Element { element: el }))
    }

    /// Returns true if at least one element matches.
    pub fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.select_first(selector)?.is_some())
    }

    /// Concatenated text of every element matching `selector`.
    pub fn text_of(&self, selector: &str) -> Result<String> {
        Ok(self.select(selector)?.iter().map(Element::text).collect())
    }
}

/// A single element of a [`Document`].
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: scraper::ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the inner HTML of this element.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Gets the text content of this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element.value().attr(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <!DOCTYPE html>
        <html lang="ja">
        <head><title>テスト</title></head>
        <body>
            <h1 class="p-novel__title">作品名</h1>
            <div class="p-novel__author">作者：<a href="/user/1/">山田</a></div>
            <div class="p-novel__body">
                <div class="p-novel__text"><p>一段落</p></div>
                <div class="p-novel__text"><p>二段落</p></div>
            </div>
        </body>
        </html>
    "#;

    #[test]
    fn test_select_elements() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let elements = doc.select(".p-novel__body .p-novel__text").unwrap();

        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].text(), "一段落");
        assert_eq!(elements[1].inner_html(), "<p>二段落</p>");
    }

    #[test]
    fn test_select_first_and_exists() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();

        let author = doc.select_first(".p-novel__author a").unwrap().unwrap();
        assert_eq!(author.attr("href"), Some("/user/1/"));
        assert!(doc.exists(".p-novel__body").unwrap());
        assert!(!doc.exists(".p-eplist").unwrap());
    }

    #[test]
    fn test_text_of() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        assert_eq!(doc.text_of("h1").unwrap(), "作品名");
        assert_eq!(doc.text_of(".p-novel__author").unwrap(), "作者：山田");
        assert_eq!(doc.text_of(".missing").unwrap(), "");
    }

    #[test]
    fn test_invalid_selector() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let result = doc.select("[[invalid");

        assert!(matches!(result, Err(NarouError::HtmlParseError(_))));
    }
}
