pub mod chapter;
pub mod convert;
pub mod download;
pub mod entity;
pub mod error;
pub mod fetch;
pub mod format;
pub mod parse;
pub mod progress;
pub mod retry;
pub mod site;
pub mod store;
pub mod toc;

pub use chapter::{Chapter, ChapterContent, ChapterState, fetch_chapter};
pub use convert::{Converter, ConverterConfig, ConverterConfigBuilder};
pub use download::{DownloadConfig, DownloadOptions, DownloadReport, Downloader};
pub use entity::restore_entities;
pub use error::{NarouError, Result};
#[cfg(feature = "fetch")]
pub use fetch::Fetcher;
pub use fetch::{FetchConfig, PageSource, fetch_file, fetch_stdin};
pub use format::{assemble_combined, format_chapter};
pub use parse::Document;
pub use progress::{NullProgress, ProgressSink, TracingProgress};
pub use retry::{Backoff, RetryPolicy};
pub use store::{ArchiveStore, FileStore, LineEnding, output_dir_for, sanitize_file_name};
pub use toc::{PageType, ScrapeResult, TableOfContents, discover, walk_toc};
