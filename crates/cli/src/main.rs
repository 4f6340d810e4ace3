use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use narou_txt_core::fetch::DEFAULT_USER_AGENT;
use narou_txt_core::{
    Converter, ConverterConfig, DownloadConfig, DownloadOptions, Downloader, FetchConfig, Fetcher, FileStore,
    LineEnding, PageType, discover, fetch_file, fetch_stdin, output_dir_for,
};
use owo_colors::OwoColorize;
use url::Url;

use crate::echo::{
    ConsoleProgress, print_banner, print_error, print_info, print_report, print_step, print_success, print_warning,
    print_work,
};

mod echo;
mod logging;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Archive web novels as Aozora-style text files
#[derive(Parser, Debug)]
#[command(name = "narou-txt")]
#[command(author = "narou-txt contributors")]
#[command(version)]
#[command(about = "Archive web novels as Aozora-style text files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download every chapter of a work
    Download(DownloadArgs),
    /// Convert an HTML fragment to Aozora-style text
    Convert(ConvertArgs),
    /// Print the chapter list of a work
    Toc(TocArgs),
    /// Generate shell completion script
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Settings shared by commands that talk to the site
#[derive(Args, Debug)]
struct HttpArgs {
    /// HTTP timeout in seconds
    #[arg(long, default_value = "10", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,
}

impl HttpArgs {
    fn fetcher(&self) -> anyhow::Result<Fetcher> {
        let config = FetchConfig {
            timeout: self.timeout,
            user_agent: self.user_agent.clone().unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            ..Default::default()
        };
        Fetcher::new(config).context("Failed to build HTTP client")
    }
}

/// Conversion switches shared by `download` and `convert`
#[derive(Args, Debug)]
struct ConvertOptions {
    /// Drop bold/italic/strikethrough tags instead of annotating them
    #[arg(long)]
    strip_decoration: bool,

    /// Omit the ruby marker before bases made only of kanji
    #[arg(long)]
    compact_ruby: bool,
}

#[derive(Args, Debug)]
struct DownloadArgs {
    /// Work index URL or any episode URL of the work
    #[arg(value_name = "URL")]
    url: String,

    /// Output directory (default: ./<title>)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Write CRLF line endings
    #[arg(long)]
    crlf: bool,

    /// Skip per-chapter text files
    #[arg(long)]
    no_text: bool,

    /// Also write per-chapter HTML pages under html/
    #[arg(long)]
    structural: bool,

    /// Skip the combined all.txt file
    #[arg(long)]
    no_combined: bool,

    /// Seconds to wait between chapters
    #[arg(long, default_value = "10", value_name = "SECS")]
    interval: u64,

    #[command(flatten)]
    convert: ConvertOptions,

    #[command(flatten)]
    http: HttpArgs,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Keep literal newlines and drop <br> tags
    #[arg(long)]
    pre_formatted: bool,

    /// Base URL that relative illustration sources are resolved against
    #[arg(long, value_name = "URL")]
    illustration_base: Option<String>,

    /// Regex detecting illustrations; needs a capture group for the source
    #[arg(long, value_name = "RE")]
    illustration_pattern: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    #[command(flatten)]
    convert: ConvertOptions,
}

#[derive(Args, Debug)]
struct TocArgs {
    /// Work index URL or any episode URL of the work
    #[arg(value_name = "URL")]
    url: String,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    http: HttpArgs,
}

fn parse_url(input: &str) -> anyhow::Result<()> {
    let url = Url::parse(input).with_context(|| format!("Invalid URL: {}", input))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("Unsupported URL scheme: {}", url.scheme());
    }
    Ok(())
}

async fn run_download(args: DownloadArgs, verbose: bool) -> anyhow::Result<()> {
    parse_url(&args.url)?;

    let converter = ConverterConfig::builder()
        .strip_decoration_tags(args.convert.strip_decoration)
        .compact_ruby(args.convert.compact_ruby)
        .build()
        .context("Invalid conversion options")?;

    let config = DownloadConfig {
        options: DownloadOptions {
            emit_text: !args.no_text,
            emit_structural: args.structural,
            emit_combined: !args.no_combined,
        },
        chapter_interval: Duration::from_secs(args.interval),
        converter,
        ..Default::default()
    };

    if !config.options.emit_text && !config.options.emit_structural && !config.options.emit_combined {
        print_warning("Nothing to write: every output is disabled");
    }

    let progress = ConsoleProgress::new();
    let downloader = Downloader::new(args.http.fetcher()?, &progress, config);

    if verbose {
        print_step(1, 2, &format!("Discovering {}", args.url.bright_white().underline()));
    }
    let mut work = match downloader.discover(&args.url).await {
        Ok(work) => work,
        Err(err) => {
            progress.finish();
            return Err(err).context("Failed to discover work");
        }
    };
    tracing::debug!(url = %work.url, chapters = work.chapters.len(), "work discovered");
    progress.suspend(|| print_work(&work));

    let dir = args.output.unwrap_or_else(|| output_dir_for(Path::new("."), &work.title));
    let line_ending = if args.crlf { LineEnding::Crlf } else { LineEnding::Lf };
    let store = FileStore::new(&dir).with_line_ending(line_ending);

    if verbose {
        print_step(2, 2, &format!("Downloading into {}", dir.display().bright_white()));
    }
    let result = downloader.run(&store, &mut work).await;
    progress.finish();

    let report = match result {
        Ok(report) => report,
        Err(err) if err.is_fatal() => {
            print_warning("Chapters saved so far are kept; run the same command again to resume");
            return Err(err).context("Download aborted");
        }
        Err(err) => return Err(err).context("Download failed"),
    };

    print_report(&report);
    if report.failed > 0 {
        print_warning(&format!("{} chapter(s) could not be fetched; run again to retry them", report.failed));
    }
    if report.saved == 0 && report.skipped == 0 {
        print_warning("Nothing was written");
    } else {
        print_success(&format!("Saved to {}", dir.display().bright_white()));
    }

    Ok(())
}

fn run_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let html = if args.input == "-" {
        fetch_stdin().context("Failed to read from stdin")?
    } else {
        fetch_file(&args.input).with_context(|| format!("Failed to read file: {}", args.input))?
    };

    let mut builder = ConverterConfig::builder()
        .strip_decoration_tags(args.convert.strip_decoration)
        .compact_ruby(args.convert.compact_ruby);
    if let Some(base) = args.illustration_base {
        builder = builder.illustration_base_url(base);
    }
    if let Some(pattern) = args.illustration_pattern {
        builder = builder.illustration_pattern(pattern);
    }
    let converter = Converter::new(builder.build().context("Invalid conversion options")?);

    let output = converter.convert(&html, args.pre_formatted);

    match args.output {
        Some(path) => {
            fs::write(&path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => {
            print!("{}", output);
        }
    }

    Ok(())
}

async fn run_toc(args: TocArgs) -> anyhow::Result<()> {
    parse_url(&args.url)?;

    let fetcher = args.http.fetcher()?;
    let work = discover(&fetcher, &args.url, &Converter::default())
        .await
        .context("Failed to discover work")?;

    if args.json {
        let json = work.to_json().context("Failed to serialize chapter list")?;
        println!("{}", serde_json::to_string_pretty(&json).context("Failed to serialize chapter list")?);
        return Ok(());
    }

    print_work(&work);
    match work.page_type {
        PageType::Serial => {
            for (index, chapter) in work.chapters.iter().enumerate() {
                println!("{:>4}  {}  {}", index + 1, chapter.title, chapter.url.dimmed());
            }
        }
        PageType::Standalone => print_info("Standalone story: no chapter list"),
    }

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Download(args) => run_download(args, cli.verbose).await,
        Command::Convert(args) => run_convert(args),
        Command::Toc(args) => run_toc(args).await,
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "narou-txt", &mut io::stdout());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = logging::init(cli.verbose) {
        print_error(&format!("{:#}", err));
    }

    if cli.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    if let Err(err) = run(cli).await {
        print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
}
