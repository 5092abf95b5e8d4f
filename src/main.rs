//! CLI entry point for `eml2msg`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use humansize::{format_size, BINARY};

use eml2msg::config::Config;
use eml2msg::convert::{self, ConversionReport, Progress};
use eml2msg::i18n;
use eml2msg::template::{self, TemplateProgress, TemplateReport};

#[derive(Parser)]
#[command(name = "eml2msg", version, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input .eml file followed by the output .msg / .oft file
    #[arg(value_name = "FILE", num_args = 0..)]
    files: Vec<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Language (en, es). Defaults to system locale.
    #[arg(long, global = true, value_name = "LANG")]
    lang: Option<String>,

    /// Print a JSON report instead of progress notices
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Build an .eml template from a folder with index.html and its images
    Build {
        /// Folder holding the HTML page and the images it references
        folder: PathBuf,
        /// Output .eml file
        output: PathBuf,
    },
    /// Generate a man page
    Manpage,
}

/// Detect language early from --lang arg or system env, before clap processes --help.
fn detect_lang_early() -> i18n::Lang {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--lang" {
            if let Some(code) = args.get(i + 1) {
                if let Some(lang) = i18n::Lang::from_code(code) {
                    return lang;
                }
            }
        }
        if let Some(code) = args[i].strip_prefix("--lang=") {
            if let Some(lang) = i18n::Lang::from_code(code) {
                return lang;
            }
        }
    }
    i18n::detect_system_lang()
}

/// Build a localized clap Command using i18n strings.
fn build_localized_command() -> clap::Command {
    let mut cmd = Cli::command()
        .about(i18n::app_about())
        .long_about(i18n::app_long_about())
        .after_help(i18n::app_after_help())
        .mut_arg("files", |a| a.help(i18n::help_files_arg()))
        .mut_arg("verbose", |a| a.help(i18n::help_verbose()))
        .mut_arg("lang", |a| a.help(i18n::help_lang()))
        .mut_arg("json", |a| a.help(i18n::help_output_json()))
        .mut_arg("config", |a| a.help(i18n::help_config()));

    cmd = cmd
        .mut_subcommand("completions", |s| s.about(i18n::help_cmd_completions()))
        .mut_subcommand("build", |s| s.about(i18n::help_cmd_build()))
        .mut_subcommand("manpage", |s| s.about(i18n::help_cmd_manpage()));

    cmd
}

fn main() -> ExitCode {
    // Detect language BEFORE clap parsing so --help is localized
    i18n::set_lang(detect_lang_early());

    let matches = build_localized_command().get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    // Config and logging start only once a command has work to do
    let start = || {
        let config = eml2msg::config::load_config(cli.config.as_deref());
        let log_level = match cli.verbose {
            0 => config.general.log_level.as_str(),
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        setup_logging(log_level, &config);
        tracing::debug!(lang = i18n::lang().code(), "Starting eml2msg");
        config
    };

    let result = match &cli.command {
        Some(Commands::Completions { shell }) => cmd_completions(*shell),
        Some(Commands::Manpage) => cmd_manpage(),
        Some(Commands::Build { folder, output }) => {
            return cmd_build(folder, output, &start(), cli.json)
        }
        None => return cmd_convert(&cli.files, start, cli.json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = eml2msg::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "eml2msg.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "eml2msg", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Convert `files[0]` into `files[1]`.
///
/// A wrong argument count prints usage and exits successfully; a missing
/// input or a failed conversion exits with status 1. Neither usage nor a
/// missing input touches the filesystem: `start` loads config and logging
/// only after both checks pass.
fn cmd_convert(files: &[PathBuf], start: impl FnOnce() -> Config, json: bool) -> ExitCode {
    let [input, output] = files else {
        print_usage();
        return ExitCode::SUCCESS;
    };

    if !json {
        println!("🔍 {} {}", i18n::msg_looking_for(), input.display());
    }
    if !input.is_file() {
        println!("❌ {} {}", i18n::err_file_not_found(), input.display());
        return ExitCode::FAILURE;
    }

    let config = start();
    let progress = |p: &Progress<'_>| {
        if !json {
            print_progress(p);
        }
    };

    match convert::convert(input, output, &config, &progress) {
        Ok(report) => {
            if json {
                if let Err(e) = print_report_json(&report) {
                    eprintln!("{}: {e}", i18n::err_report_json());
                    return ExitCode::FAILURE;
                }
            } else {
                print_completed(output);
            }
            ExitCode::SUCCESS
        }
        Err(e) if e.is_not_found() => {
            println!("❌ {} {}", i18n::err_file_not_found(), input.display());
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "Conversion failed");
            println!("❌ {} {e}", i18n::err_exception());
            println!("{}", i18n::err_images_hint());
            ExitCode::FAILURE
        }
    }
}

/// Build the `.eml` template in `folder` and write it to `output`.
///
/// Missing images are warned about and left out; a missing HTML page or a
/// failed write exits with status 1.
fn cmd_build(folder: &Path, output: &Path, config: &Config, json: bool) -> ExitCode {
    let progress = |p: &TemplateProgress<'_>| {
        if !json {
            print_template_progress(p);
        }
    };

    match template::write_template(folder, output, &config.template, &progress) {
        Ok(report) => {
            if json {
                if let Err(e) = print_template_json(&report) {
                    eprintln!("{}: {e}", i18n::err_report_json());
                    return ExitCode::FAILURE;
                }
            } else {
                println!("✅ {} {}", i18n::msg_eml_generated(), output.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) if e.is_not_found() => {
            let html = folder.join(&config.template.html_file);
            println!("❌ {} {}", i18n::err_file_not_found(), html.display());
            println!("{}", i18n::build_usage_line());
            println!("{}", i18n::build_usage_example());
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "Template build failed");
            println!("❌ {} {e}", i18n::err_generic());
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    println!("{}", i18n::usage_line());
    println!("{}", i18n::usage_example());
}

fn print_progress(progress: &Progress<'_>) {
    match progress {
        Progress::Reading => println!("📖 {}", i18n::msg_reading()),
        Progress::Inline {
            file_name,
            content_id,
            size,
        } => println!(
            "   📎 {} {file_name} (CID: {content_id}, {})",
            i18n::msg_inline_image(),
            format_size(*size, BINARY)
        ),
        Progress::Attachment { file_name, size } => println!(
            "   📎 {} {file_name} ({})",
            i18n::msg_attachment(),
            format_size(*size, BINARY)
        ),
    }
}

fn print_completed(output: &Path) {
    println!();
    println!("✅ {} {}", i18n::msg_completed(), output.display());
}

fn print_template_progress(progress: &TemplateProgress<'_>) {
    match progress {
        TemplateProgress::Embedded {
            path,
            content_id,
            size,
        } => println!(
            "   📎 {} {} (CID: {content_id}, {})",
            i18n::msg_embedded_image(),
            path.display(),
            format_size(*size, BINARY)
        ),
        TemplateProgress::Missing { path } => {
            println!("⚠️  {} {}", i18n::warn_image_not_found(), path.display())
        }
    }
}

fn print_template_json(report: &TemplateReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Print the conversion report as JSON.
fn print_report_json(report: &ConversionReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
