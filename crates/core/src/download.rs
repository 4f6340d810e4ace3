//! Sequential download of a discovered work.
//!
//! The [`Downloader`] walks the chapter list in order, skipping chapters whose
//! files already exist, fetching the rest under the fetch retry policy, pacing
//! requests with a fixed interval, and saving under the save retry policy.
//! A run of consecutive fetch failures aborts the download; isolated failures
//! are logged and skipped.
//!
//! # Example
//!
//! ```rust,no_run
//! use narou_txt_core::{DownloadConfig, Downloader, FetchConfig, Fetcher, FileStore, TracingProgress};
//!
//! # async fn run() -> narou_txt_core::Result<()> {
//! let downloader = Downloader::new(Fetcher::new(FetchConfig::default())?, TracingProgress, DownloadConfig::default());
//! let mut work = downloader.discover("https://ncode.syosetu.com/n1234ab/").await?;
//! let store = FileStore::new("./out");
//! let report = downloader.run(&store, &mut work).await?;
//! println!("{} saved, {} skipped", report.saved, report.skipped);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use serde::Serialize;

use crate::chapter::{ChapterState, fetch_chapter};
use crate::convert::{Converter, ConverterConfig};
use crate::fetch::PageSource;
use crate::format::{assemble_combined, format_chapter};
use crate::progress::{ProgressSink, chapter_percent};
use crate::retry::RetryPolicy;
use crate::site;
use crate::store::ArchiveStore;
use crate::toc::{self, PageType, ScrapeResult};
use crate::{NarouError, Result};

/// Which artifacts a download produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Per-chapter text files.
    pub emit_text: bool,
    /// Per-chapter HTML page files.
    pub emit_structural: bool,
    /// One combined text file for the whole work.
    pub emit_combined: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self { emit_text: true, emit_structural: false, emit_combined: true }
    }
}

impl DownloadOptions {
    fn wants_chapter_files(&self) -> bool {
        self.emit_text || self.emit_structural
    }
}

/// Settings for a [`Downloader`].
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub options: DownloadOptions,
    /// Pause after each fetched chapter except the last.
    pub chapter_interval: Duration,
    /// Consecutive fetch failures that abort the run.
    pub max_consecutive_failures: u32,
    pub fetch_retry: RetryPolicy,
    pub save_retry: RetryPolicy,
    pub converter: ConverterConfig,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            options: DownloadOptions::default(),
            chapter_interval: Duration::from_secs(10),
            max_consecutive_failures: 3,
            fetch_retry: RetryPolicy::chapter_fetch(),
            save_retry: RetryPolicy::file_save(),
            converter: ConverterConfig::default(),
        }
    }
}

/// Outcome counts of one download run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownloadReport {
    pub total: usize,
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Drives discovery and download against a page source, reporting progress.
pub struct Downloader<S, P> {
    source: S,
    progress: P,
    config: DownloadConfig,
    converter: Converter,
}

impl<S: PageSource, P: ProgressSink> Downloader<S, P> {
    pub fn new(source: S, progress: P, config: DownloadConfig) -> Self {
        let converter = Converter::new(config.converter.clone());
        Self { source, progress, config, converter }
    }

    /// Discovers the work behind `url`; see [`toc::discover`].
    pub async fn discover(&self, url: &str) -> Result<ScrapeResult> {
        self.progress.progress(0);
        self.progress.log("Fetching work index...");

        let index_url = site::to_index_url(url);
        if index_url != url {
            self.progress.log(&format!("Episode URL detected, downloading the whole work: {}", index_url));
        }

        let work = toc::discover(&self.source, url, &self.converter).await?;
        self.progress.log(&format!("{} by {}", work.title, work.author));
        Ok(work)
    }

    /// Downloads `work` into `store`.
    ///
    /// Chapter descriptors in `work` are updated in place with their content
    /// and final state.
    ///
    /// # Errors
    ///
    /// [`NarouError::NoChapters`] for an empty serial,
    /// [`NarouError::TooManyFailures`] when the circuit breaker trips, and save
    /// errors for the combined file or a standalone story.
    pub async fn run<A: ArchiveStore>(&self, store: &A, work: &mut ScrapeResult) -> Result<DownloadReport> {
        match work.page_type {
            PageType::Serial => self.run_serial(store, work).await,
            PageType::Standalone => self.run_standalone(store, work).await,
        }
    }

    fn should_skip<A: ArchiveStore>(&self, store: &A, id: &str, episode: &str) -> bool {
        let options = &self.config.options;
        if !options.wants_chapter_files() {
            return false;
        }
        (!options.emit_text || store.has_chapter(id)) && (!options.emit_structural || store.has_structural(episode))
    }

    async fn run_serial<A: ArchiveStore>(&self, store: &A, work: &mut ScrapeResult) -> Result<DownloadReport> {
        let total = work.chapters.len();
        if total == 0 {
            return Err(NarouError::NoChapters);
        }

        let options = self.config.options;
        let mut report = DownloadReport { total, ..Default::default() };
        let mut combined_blocks = Vec::new();
        let mut consecutive_failures = 0u32;
        let work_code = site::work_code(&work.chapters[0].url);

        self.progress.log(&format!("{} chapters found, starting download...", total));
        self.progress.label(&format!("0/{}", total));

        for (index, chapter) in work.chapters.iter_mut().enumerate() {
            let number = index + 1;
            self.progress.progress(chapter_percent(index, total));
            self.progress.label(&format!("{}/{}", index, total));

            let episode = site::episode_for(&chapter.url, index);
            let id = site::file_identifier(&work_code, &episode);

            if self.should_skip(store, &id, &episode) {
                chapter.state = ChapterState::Skipped;
                report.skipped += 1;
                self.progress.log(&format!("{}: {} is already saved, skipping", number, chapter.title));
                if options.emit_combined {
                    match store.read_chapter(&id) {
                        Some(block) => combined_blocks.push(block),
                        None => self.progress.log(&format!("{}: no saved text to put in the combined file", number)),
                    }
                }
                continue;
            }

            self.progress.log(&format!("{}: fetching {}...", number, chapter.title));
            let content =
                match fetch_chapter(&self.source, &chapter.url, &self.converter, &self.config.fetch_retry).await {
                    Ok(content) => content,
                    Err(e) => {
                        consecutive_failures += 1;
                        let attempts = match &e {
                            NarouError::RetriesExhausted { attempts, .. } => *attempts,
                            _ => 1,
                        };
                        chapter.mark_failed(attempts);
                        report.failed += 1;
                        tracing::warn!(chapter = number, url = %chapter.url, error = %e, "chapter failed");
                        self.progress.log(&format!(
                            "{}: failed: {} (consecutive failures: {}/{})",
                            number, e, consecutive_failures, self.config.max_consecutive_failures
                        ));

                        if consecutive_failures >= self.config.max_consecutive_failures {
                            return Err(NarouError::TooManyFailures {
                                failures: consecutive_failures,
                                source: Box::new(e),
                            });
                        }
                        continue;
                    }
                };

            consecutive_failures = 0;
            let body = content.text.clone();
            chapter.fill(content);
            tracing::info!(chapter = number, id = %id, retries = chapter.retry_count, "fetched chapter");

            let formatted = format_chapter(&self.converter, &chapter.title, &body);
            if options.emit_combined {
                combined_blocks.push(formatted.clone());
            }

            if index + 1 < total && !self.config.chapter_interval.is_zero() {
                self.progress.log(&format!(
                    "{}: done, waiting {} seconds...",
                    number,
                    self.config.chapter_interval.as_secs()
                ));
                tokio::time::sleep(self.config.chapter_interval).await;
            }

            let mut saved = true;
            if options.emit_text
                && let Err(e) =
                    self.save(&format!("chapter file {}", id), || store.write_chapter(&id, &formatted)).await
            {
                saved = false;
                self.progress.log(&format!("{}: could not save text: {}", number, e));
            }
            if options.emit_structural
                && let Some(page) = chapter.page_html()
                && let Err(e) =
                    self.save(&format!("page file {}", episode), || store.write_structural(&episode, &page)).await
            {
                saved = false;
                self.progress.log(&format!("{}: could not save page: {}", number, e));
            }

            if saved {
                chapter.state = ChapterState::Saved;
                report.saved += 1;
            }
        }

        if options.emit_combined && !combined_blocks.is_empty() {
            self.progress.progress(90);
            self.progress.label("combining");
            self.progress.log("Writing combined file...");

            let combined = assemble_combined(&self.converter, &work.title, &work.author, &combined_blocks);
            self.save("combined file", || store.write_combined(&combined)).await?;
        }

        self.progress.progress(100);
        self.progress.label(&format!("done ({}/{})", total, total));
        self.progress.log("Download complete");
        tracing::info!(?report, "download finished");

        Ok(report)
    }

    async fn run_standalone<A: ArchiveStore>(&self, store: &A, work: &mut ScrapeResult) -> Result<DownloadReport> {
        let options = self.config.options;
        let mut report = DownloadReport { total: 1, ..Default::default() };
        self.progress.label("standalone");

        let id = site::file_identifier(&site::work_code(&work.url), "1");
        let episode = "1";
        let title = work.title.clone();
        let story = work.chapters.first_mut().ok_or(NarouError::NoContent)?;

        if self.should_skip(store, &id, episode) {
            story.state = ChapterState::Skipped;
            report.skipped = 1;
            self.progress.log("Story is already saved, skipping");
            self.progress.progress(100);
            self.progress.label("done (skipped)");
            return Ok(report);
        }

        let mut written = false;
        if options.emit_text {
            let body = story.text_content.as_deref().unwrap_or_default();
            if body.trim().is_empty() {
                self.progress.log("No story text found");
                return Err(NarouError::NoContent);
            }
            let formatted = format_chapter(&self.converter, &title, body);
            self.save(&format!("story file {}", id), || store.write_chapter(&id, &formatted)).await?;
            written = true;
        }

        if options.emit_structural
            && let Some(page) = story.page_html()
        {
            self.save(&format!("page file {}", episode), || store.write_structural(episode, &page)).await?;
            written = true;
        }

        self.progress.progress(100);
        if !written {
            self.progress.label("done (nothing written)");
            self.progress.log("No per-story output requested, nothing written");
            return Ok(report);
        }

        story.state = ChapterState::Saved;
        report.saved = 1;

        self.progress.label("done");
        self.progress.log("Story saved");
        Ok(report)
    }

    async fn save<F>(&self, target: &str, write: F) -> Result<()>
    where
        F: Fn() -> Result<()>,
    {
        let write = &write;
        self.config.save_retry.run(target, move |_| async move { write() }).await
    }
}
