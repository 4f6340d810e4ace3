//! Layout of chapter and combined text files.

use crate::convert::Converter;

/// Separator placed between chapters in the combined file.
pub const CHAPTER_SEPARATOR: &str = "\n\n----------------\n\n\n";

/// Formats one chapter: heading, blank line, then the body line by line.
///
/// Lines holding only whitespace are written empty and every line ends with
/// `\n`. The heading goes through the ruby pass; the body is expected to be
/// converted already.
///
/// ```rust
/// use narou_txt_core::{Converter, format::format_chapter};
///
/// let text = format_chapter(&Converter::default(), "第一話", "一行目\n　\n二行目");
/// assert_eq!(text, "第一話\n\n一行目\n\n二行目\n");
/// ```
pub fn format_chapter(converter: &Converter, heading: &str, body: &str) -> String {
    let mut formatted = converter.convert_ruby(heading);
    formatted.push_str("\n\n");

    for line in body.split('\n') {
        if !line.trim().is_empty() {
            formatted.push_str(line);
        }
        formatted.push('\n');
    }

    formatted
}

/// Builds the combined file from already formatted chapter blocks.
pub fn assemble_combined(converter: &Converter, title: &str, author: &str, blocks: &[String]) -> String {
    let mut combined = String::new();
    combined.push_str(&converter.convert_ruby(title));
    combined.push('\n');
    combined.push_str(&converter.convert_ruby(author));
    combined.push_str("\n\n\n");
    combined.push_str(&blocks.join(CHAPTER_SEPARATOR));
    combined
}
