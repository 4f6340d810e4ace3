//! Persistence of downloaded chapters.
//!
//! The download pipeline hands already-formatted text to an [`ArchiveStore`];
//! byte encoding and line endings are the store's business. [`FileStore`] is
//! the filesystem implementation:
//!
//! ```text
//! {dir}/{workCode}-{episode}.txt   per-chapter text
//! {dir}/html/{episode}.html        per-chapter page
//! {dir}/all.txt                    combined text
//! ```

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;

/// Maximum length of a sanitized file name, in bytes.
pub const MAX_FILE_NAME_LEN: usize = 100;

/// Base name of the combined text file.
pub const COMBINED_FILE_STEM: &str = "all";

const STRUCTURAL_DIR: &str = "html";

/// Destination for chapter and combined output.
pub trait ArchiveStore {
    /// Returns true if the text file of chapter `id` already exists.
    fn has_chapter(&self, id: &str) -> bool;

    /// Returns true if the page file of `episode` already exists.
    fn has_structural(&self, episode: &str) -> bool;

    /// Reads back the text of chapter `id` with `\n` line endings.
    fn read_chapter(&self, id: &str) -> Option<String>;

    fn write_chapter(&self, id: &str, text: &str) -> Result<()>;

    fn write_structural(&self, episode: &str, html: &str) -> Result<()>;

    fn write_combined(&self, text: &str) -> Result<()>;
}

/// Line terminator written into text files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    /// Rewrites `\n` terminators in `text` to this line ending.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match self {
            LineEnding::Lf => Cow::Borrowed(text),
            LineEnding::Crlf => Cow::Owned(text.replace('\n', "\r\n")),
        }
    }
}

/// [`ArchiveStore`] writing UTF-8 files under one directory.
///
/// The directory (and its `html/` subdirectory) is created on first write.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    line_ending: LineEnding,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), line_ending: LineEnding::default() }
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    fn text_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", sanitize_file_name(stem)))
    }

    fn structural_path(&self, episode: &str) -> PathBuf {
        self.dir.join(STRUCTURAL_DIR).join(format!("{}.html", sanitize_file_name(episode)))
    }

    fn write_text(&self, stem: &str, text: &str) -> Result<()> {
        let path = self.text_path(stem);
        write_file(&path, self.line_ending.apply(text).as_bytes())
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}

impl ArchiveStore for FileStore {
    fn has_chapter(&self, id: &str) -> bool {
        self.text_path(id).is_file()
    }

    fn has_structural(&self, episode: &str) -> bool {
        self.structural_path(episode).is_file()
    }

    fn read_chapter(&self, id: &str) -> Option<String> {
        let text = fs::read_to_string(self.text_path(id)).ok()?;
        Some(text.replace("\r\n", "\n"))
    }

    fn write_chapter(&self, id: &str, text: &str) -> Result<()> {
        self.write_text(id, text)
    }

    fn write_structural(&self, episode: &str, html: &str) -> Result<()> {
        write_file(&self.structural_path(episode), html.as_bytes())
    }

    fn write_combined(&self, text: &str) -> Result<()> {
        self.write_text(COMBINED_FILE_STEM, text)
    }
}

/// Replaces characters that are invalid in file names with `_` and caps the
/// length at [`MAX_FILE_NAME_LEN`] bytes without splitting a character.
///
/// ```rust
/// use narou_txt_core::store::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("a/b:c?"), "a_b_c_");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect();

    if sanitized.len() > MAX_FILE_NAME_LEN {
        let mut end = MAX_FILE_NAME_LEN;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized.truncate(end);
    }

    sanitized
}

/// Default output directory for a work: `{parent}/{sanitized title}`.
pub fn output_dir_for(parent: &Path, title: &str) -> PathBuf {
    let name = sanitize_file_name(title.trim());
    if name.is_empty() { parent.join("untitled") } else { parent.join(name) }
}
