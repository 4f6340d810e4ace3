use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use narou_txt_core::{DownloadReport, ProgressSink, ScrapeResult};
use owo_colors::OwoColorize;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "narou-txt".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Web novel to Aozora-style text archiver\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print the work summary shown before a download or by `toc`
pub fn print_work(work: &ScrapeResult) {
    eprintln!("  {} {}", "Title:".dimmed(), work.title.bright_white());
    eprintln!("  {} {}", "Author:".dimmed(), work.author.bright_white());
    eprintln!("  {} {:?}", "Type:".dimmed(), work.page_type);
    eprintln!("  {} {}\n", "Chapters:".dimmed(), work.chapters.len().to_string().bright_white());
}

/// Print download counts
pub fn print_report(report: &DownloadReport) {
    eprintln!("{}", "═".repeat(40).dimmed());
    eprintln!("  {} {}", "Saved:".dimmed(), report.saved.to_string().bright_green());
    eprintln!("  {} {}", "Skipped:".dimmed(), report.skipped.to_string().bright_white());
    if report.failed > 0 {
        eprintln!("  {} {}", "Failed:".dimmed(), report.failed.to_string().bright_red());
    }
    eprintln!("  {} {}", "Total:".dimmed(), report.total.to_string().bright_white());
    eprintln!("{}", "═".repeat(40).dimmed());
}

/// Progress sink drawing a percent bar on stderr.
///
/// Log lines are printed above the bar, or straight to stderr when the bar is
/// hidden because stderr is not a terminal.
#[derive(Debug)]
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template("{prefix} [{elapsed_precise}] {wide_bar} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::stderr());
        bar.set_style(style);
        bar.set_prefix("download");
        Self { bar }
    }

    /// Runs `f` with the bar cleared so plain output does not tear it.
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.bar.suspend(f)
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn progress(&self, percent: u8) {
        self.bar.set_position(u64::from(percent.min(100)));
    }

    fn label(&self, text: &str) {
        self.bar.set_message(text.to_string());
    }

    fn log(&self, line: &str) {
        if self.bar.is_hidden() {
            print_info(line);
        } else {
            self.bar.println(format!("{} {}", "ℹ".blue(), line.bright_blue()));
        }
    }
}
