use std::{env, fs, path::PathBuf};

fn http_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("10"))
        .arg(clap::arg!(--user_agent <UA> "Custom User-Agent for HTTP requests").value_name("UA"))
}

fn convert_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(clap::arg!(--strip_decoration "Drop bold/italic/strikethrough tags instead of annotating them"))
        .arg(clap::arg!(--compact_ruby "Omit the ruby marker before bases made only of kanji"))
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let download = clap::Command::new("download")
        .about("Download every chapter of a work")
        .arg(clap::arg!(<URL> "Work index URL or any episode URL of the work"))
        .arg(
            clap::arg!(-o --output <DIR> "Output directory (default: ./<title>)")
                .value_name("DIR")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--crlf "Write CRLF line endings"))
        .arg(clap::arg!(--no_text "Skip per-chapter text files"))
        .arg(clap::arg!(--structural "Also write per-chapter HTML pages under html/"))
        .arg(clap::arg!(--no_combined "Skip the combined all.txt file"))
        .arg(clap::arg!(--interval <SECS> "Seconds to wait between chapters").default_value("10"));

    let convert = clap::Command::new("convert")
        .about("Convert an HTML fragment to Aozora-style text")
        .arg(clap::arg!(<INPUT> "Local HTML file, or '-' for stdin"))
        .arg(clap::arg!(--pre_formatted "Keep literal newlines and drop <br> tags"))
        .arg(clap::arg!(--illustration_base <URL> "Base URL that relative illustration sources are resolved against"))
        .arg(clap::arg!(--illustration_pattern <RE> "Regex detecting illustrations"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        );

    let toc = clap::Command::new("toc")
        .about("Print the chapter list of a work")
        .arg(clap::arg!(<URL> "Work index URL or any episode URL of the work"))
        .arg(clap::arg!(--json "Print the result as JSON"));

    let completions = clap::Command::new("completions")
        .about("Generate shell completion script")
        .arg(clap::arg!(<SHELL> "Target shell").value_parser(["bash", "zsh", "fish", "powershell", "elvish"]));

    let mut cmd = clap::Command::new("narou-txt")
        .version(env!("CARGO_PKG_VERSION"))
        .author("narou-txt contributors")
        .about("Archive web novels as Aozora-style text files")
        .arg(clap::arg!(-v --verbose "Enable debug logging").global(true))
        .subcommand_required(true)
        .subcommand(http_args(convert_args(download)))
        .subcommand(convert_args(convert))
        .subcommand(http_args(toc))
        .subcommand(completions);

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "narou-txt", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "narou-txt", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "narou-txt", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "narou-txt", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
