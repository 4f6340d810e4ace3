//! Work discovery and table-of-contents walking.
//!
//! [`discover`] fetches the landing page of a work, reads its title and
//! author, and decides whether it is a serial (paginated episode list) or a
//! standalone story. Serials are walked page by page with [`walk_toc`].

use std::collections::HashSet;

use serde::Serialize;

use crate::chapter::{self, Chapter, ChapterContent};
use crate::convert::Converter;
use crate::fetch::PageSource;
use crate::parse::Document;
use crate::site;
use crate::{NarouError, Result};

/// Layout of a work's landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    /// Multi-episode work with a paginated table of contents.
    Serial,
    /// Single-page story.
    Standalone,
}

/// Everything learned about a work before downloading it.
///
/// For a standalone story `chapters` holds one already-fetched chapter whose
/// title is the work title.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeResult {
    pub page_type: PageType,
    /// Index URL the work was discovered from.
    pub url: String,
    pub title: String,
    pub author: String,
    pub chapters: Vec<Chapter>,
    /// Full HTML of every table-of-contents page, in walk order.
    #[serde(skip)]
    pub index_pages: Vec<String>,
}

impl ScrapeResult {
    /// Serializes the work summary and chapter list.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Result of walking a paginated table of contents.
#[derive(Debug, Clone, Default)]
pub struct TableOfContents {
    pub chapters: Vec<Chapter>,
    pub index_pages: Vec<String>,
}

/// Chapters and next-page link of one index page.
#[derive(Debug)]
struct IndexPage {
    chapters: Vec<Chapter>,
    next: Option<String>,
    full_html: String,
}

fn read_index_page(html: &str, page_url: &str, base_url: &str) -> Result<IndexPage> {
    let doc = Document::parse(html)?;

    let chapters = doc
        .select(site::CHAPTER_LINK_SELECTOR)?
        .iter()
        .filter_map(|link| {
            let href = link.attr("href")?;
            Some(Chapter::new(link.text().trim(), site::resolve_chapter_link(base_url, href)))
        })
        .collect();

    let next = doc
        .select_first(site::NEXT_PAGE_SELECTOR)?
        .and_then(|link| link.attr("href").map(str::to_string))
        .filter(|href| !href.is_empty())
        .map(|href| site::resolve_next_link(base_url, &href));

    let full_html = chapter::absolutize_asset_paths(&doc.as_string(), site::origin_for(page_url));

    Ok(IndexPage { chapters, next, full_html })
}

/// Walks a paginated table of contents starting from the already fetched
/// page `first_html` of `base_url`.
///
/// Chapters keep page order, then link order within each page. A failed page
/// fetch ends the walk with [`NarouError::IndexPage`]; a walk that finds no
/// chapters at all returns [`NarouError::NoChapters`].
pub async fn walk_toc<S: PageSource>(source: &S, first_html: &str, base_url: &str) -> Result<TableOfContents> {
    let mut toc = TableOfContents::default();
    let mut visited = HashSet::from([base_url.to_string()]);
    let mut page = read_index_page(first_html, base_url, base_url)?;

    loop {
        tracing::debug!(chapters = page.chapters.len(), "read index page");
        toc.chapters.append(&mut page.chapters);
        toc.index_pages.push(page.full_html);

        let Some(next_url) = page.next else {
            break;
        };
        if !visited.insert(next_url.clone()) {
            tracing::warn!(url = %next_url, "index page links back to a visited page");
            break;
        }

        let html = source
            .fetch_html(&next_url)
            .await
            .map_err(|e| NarouError::IndexPage { url: next_url.clone(), source: Box::new(e) })?;
        page = read_index_page(&html, &next_url, base_url)?;
    }

    if toc.chapters.is_empty() {
        return Err(NarouError::NoChapters);
    }

    tracing::info!(chapters = toc.chapters.len(), pages = toc.index_pages.len(), "walked table of contents");
    Ok(toc)
}

/// What the landing page says about the work.
struct Landing {
    title: String,
    author: String,
    page_type: PageType,
    standalone: Option<ChapterContent>,
}

fn read_landing(html: &str, url: &str, converter: &Converter) -> Result<Landing> {
    let doc = Document::parse(html)?;

    let title = doc.text_of(site::TITLE_SELECTOR)?.trim().to_string();
    let author = read_author(&doc)?;

    let page_type = if site::EPISODE_LIST_SELECTORS
        .iter()
        .map(|selector| doc.exists(selector))
        .collect::<Result<Vec<_>>>()?
        .contains(&true)
    {
        PageType::Serial
    } else if doc.exists(site::BODY_SELECTOR)? {
        PageType::Standalone
    } else {
        return Err(NarouError::UnknownPageType);
    };

    let standalone = match page_type {
        PageType::Serial => None,
        PageType::Standalone => Some(read_standalone(&doc, url, converter)?),
    };

    Ok(Landing { title, author, page_type, standalone })
}

fn read_author(doc: &Document) -> Result<String> {
    for selector in [site::AUTHOR_LINK_SELECTOR, site::AUTHOR_SELECTOR] {
        let author = doc.text_of(selector)?;
        let author = author.trim();
        if !author.is_empty() {
            return Ok(author.to_string());
        }
    }
    Ok(site::UNKNOWN_AUTHOR.to_string())
}

fn read_standalone(doc: &Document, url: &str, converter: &Converter) -> Result<ChapterContent> {
    let text = chapter::extract_text(doc, converter)?;

    let structural_html = chapter::extract_structural(doc).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not capture story structure");
        String::new()
    });
    let full_page_html = chapter::absolutize_asset_paths(&doc.as_string(), site::origin_for(url));

    Ok(ChapterContent { text, structural_html, full_page_html, attempts: 1 })
}

/// Discovers the work behind `url`.
///
/// Episode URLs are mapped to their work's index first. Serials return the
/// full chapter list; standalone stories return their single chapter with
/// content already filled in.
pub async fn discover<S: PageSource>(source: &S, url: &str, converter: &Converter) -> Result<ScrapeResult> {
    let index_url = site::to_index_url(url);
    if index_url != url {
        tracing::info!(from = url, to = %index_url, "episode URL mapped to work index");
    }

    let html = source.fetch_html(&index_url).await?;
    let landing = read_landing(&html, &index_url, converter)?;

    let (chapters, index_pages) = match landing.page_type {
        PageType::Serial => {
            let toc = walk_toc(source, &html, &index_url).await?;
            (toc.chapters, toc.index_pages)
        }
        PageType::Standalone => {
            let mut story = Chapter::new(landing.title.clone(), index_url.clone());
            if let Some(content) = landing.standalone {
                story.fill(content);
            }
            (vec![story], Vec::new())
        }
    };

    tracing::info!(title = %landing.title, author = %landing.author, page_type = ?landing.page_type, "discovered work");

    Ok(ScrapeResult {
        page_type: landing.page_type,
        url: index_url,
        title: landing.title,
        author: landing.author,
        chapters,
        index_pages,
    })
}
