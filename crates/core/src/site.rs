//! Layout and URL rules of the two supported novel domains.
//!
//! Both the general domain (`ncode.syosetu.com`) and the age-gated one
//! (`novel18.syosetu.com`) share one page layout; only the host differs.

use std::sync::LazyLock;

use regex::Regex;

/// Host of general-audience works.
pub const GENERAL_ORIGIN: &str = "https://ncode.syosetu.com";
/// Host of age-gated works, which need a consent cookie.
pub const AGE_GATED_ORIGIN: &str = "https://novel18.syosetu.com";
const AGE_GATED_HOST: &str = "novel18.syosetu.com";

/// Work title.
pub const TITLE_SELECTOR: &str = "h1";
/// Author name, preferring the linked name.
pub const AUTHOR_LINK_SELECTOR: &str = ".p-novel__author a";
pub const AUTHOR_SELECTOR: &str = ".p-novel__author";
/// Episode list markers identifying a serial index page.
pub const EPISODE_LIST_SELECTORS: [&str; 2] = [".p-eplist", ".p-eplist__sublist"];
/// Chapter links inside an index page.
pub const CHAPTER_LINK_SELECTOR: &str = ".p-eplist__sublist a";
/// "Next page" link of a paginated index.
pub const NEXT_PAGE_SELECTOR: &str = ".c-pager__item--next";
/// Story body container.
pub const BODY_SELECTOR: &str = ".p-novel__body";
/// Text sections inside the story body.
pub const TEXT_SECTION_SELECTOR: &str = ".p-novel__body .p-novel__text";

/// Author placeholder used when the page names nobody.
pub const UNKNOWN_AUTHOR: &str = "不明な作者";
/// Work code placeholder used when the URL has none.
pub const UNKNOWN_WORK_CODE: &str = "UNKNOWN";

static WORK_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/n([0-9]+[a-z]+)/").unwrap());
static EPISODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/n[0-9]+[a-z]+/([0-9]+)/?").unwrap());
static EPISODE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https://(?:ncode|novel18)\.syosetu\.com/n[0-9]+[a-z]+)/([0-9]+)/?$").unwrap()
});

/// Returns true for URLs on the age-gated domain.
pub fn is_age_gated(url: &str) -> bool {
    url.contains(AGE_GATED_HOST)
}

/// Origin used to absolutize site-relative links found under `base_url`.
pub fn origin_for(base_url: &str) -> &'static str {
    if is_age_gated(base_url) { AGE_GATED_ORIGIN } else { GENERAL_ORIGIN }
}

/// Resolves a chapter link found on the index page at `base_url`.
///
/// Absolute links pass through, root-relative links get the domain origin,
/// and anything else is appended to the base URL as a path segment.
pub fn resolve_chapter_link(base_url: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", origin_for(base_url), href)
    } else {
        format!("{}/{}", base_url, href)
    }
}

/// Resolves a "next page" link found on the index page at `base_url`.
///
/// Same as [`resolve_chapter_link`] except that same-page relative links such
/// as `?p=2` are concatenated to the base URL directly.
pub fn resolve_next_link(base_url: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", origin_for(base_url), href)
    } else {
        format!("{}{}", base_url, href)
    }
}

/// Maps an episode URL to the index URL of its work; other URLs pass through.
///
/// ```rust
/// use narou_txt_core::site::to_index_url;
///
/// assert_eq!(to_index_url("https://ncode.syosetu.com/n3161kd/12/"), "https://ncode.syosetu.com/n3161kd/");
/// assert_eq!(to_index_url("https://ncode.syosetu.com/n3161kd/"), "https://ncode.syosetu.com/n3161kd/");
/// ```
pub fn to_index_url(url: &str) -> String {
    match EPISODE_URL_RE.captures(url) {
        Some(caps) => format!("{}/", &caps[1]),
        None => url.to_string(),
    }
}

/// Derives the upper-cased work code (e.g. `N3161KD`) from a URL.
pub fn work_code(url: &str) -> String {
    if let Some(caps) = WORK_CODE_RE.captures(url) {
        return format!("N{}", caps[1].to_uppercase());
    }

    url.split('/')
        .find(|part| {
            part.len() > 1
                && part.starts_with('n')
                && part[1..].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
        .map(str::to_uppercase)
        .unwrap_or_else(|| UNKNOWN_WORK_CODE.to_string())
}

/// Parses the episode number from a chapter URL, defaulting to `"1"`.
pub fn episode_number(url: &str) -> String {
    if let Some(caps) = EPISODE_RE.captures(url) {
        return caps[1].to_string();
    }

    let parts: Vec<&str> = url.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if part.len() > 1
            && part.starts_with('n')
            && let Some(next) = parts.get(i + 1)
            && !next.is_empty()
            && next.chars().all(|c| c.is_ascii_digit())
        {
            return next.to_string();
        }
    }

    "1".to_string()
}

/// Episode number to use for the chapter at `index` (0-based) of a serial.
///
/// Falls back to the 1-based position when the URL yields nothing, or when it
/// yields `"1"` for anything but the first chapter. That second case is a
/// heuristic for layouts where every URL parses as episode one; it can
/// misfire, and is kept as is.
pub fn episode_for(url: &str, index: usize) -> String {
    let parsed = episode_number(url);
    if parsed.is_empty() || (index > 0 && parsed == "1") { (index + 1).to_string() } else { parsed }
}

/// Canonical file identifier `{workCode}-{episode}`.
pub fn file_identifier(work_code: &str, episode: &str) -> String {
    format!("{}-{}", work_code, episode)
}
