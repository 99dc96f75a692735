use anyhow::Context;
use clap::Parser;
use reposyn::{Config, Pipeline, git};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "reposyn",
    version,
    author,
    about = "Create an AI friendly repo synopsis",
    long_about = "Create an AI friendly repo synopsis.\n\n\
    Finds the git repository containing the target directory, writes recent commit \
    statistics, then every text file of the repository (respecting .gitignore) into \
    a single file, followed by a short context block for the model.\n\n\
    USAGE EXAMPLES:\n  \
      # Synopsis of the current repository\n  \
      reposyn\n\n  \
      # Skip data files, summarize JSON fixtures\n  \
      reposyn --ignore '*.csv,data/' --summarize '*.json'\n\n  \
      # Copy the synopsis to the clipboard\n  \
      reposyn -t ../other-project -c"
)]
struct Cli {
    /// Target directory; the enclosing git repository root is used
    #[arg(short, long, default_value = "./", value_name = "PATH")]
    target: PathBuf,

    /// Output text file
    #[arg(short, long, default_value = "repo-synopsis.txt", value_name = "FILE")]
    output: PathBuf,

    /// Write output to the clipboard instead of a file
    #[arg(short, long)]
    clipboard: bool,

    /// Extra ignore patterns, comma separated (gitignore syntax)
    #[arg(short, long, value_delimiter = ',', value_name = "PATTERNS")]
    ignore: Vec<String>,

    /// Patterns of files to summarize instead of including, comma separated
    #[arg(short, long, value_delimiter = ',', value_name = "PATTERNS")]
    summarize: Vec<String>,

    /// Allowed file extensions, comma separated (replaces the defaults)
    #[arg(short, long, value_delimiter = ',', value_name = "EXTS")]
    ext: Vec<String>,

    /// Number of worker threads (default: available CPUs)
    #[arg(short, long, env = "REPOSYN_WORKERS")]
    workers: Option<usize>,

    /// Do not write git commit statistics
    #[arg(long)]
    no_stats: bool,

    /// Do not append the closing context block
    #[arg(long)]
    no_context: bool,

    /// Print run statistics as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    let (root_dir, in_repository) = match git::find_git_root(&cli.target) {
        Ok(root) => {
            println!("Found repo at {}", root.display());
            (root, true)
        }
        Err(e) => {
            let root = std::path::absolute(&cli.target)
                .with_context(|| format!("Failed to resolve {}", cli.target.display()))?;
            warn!("{}; using {} as the root", e, root.display());
            (root, false)
        }
    };

    let mut builder = Config::builder()
        .root_dir(root_dir)
        .output_file(cli.output)
        .ignore_patterns(non_empty(cli.ignore))
        .summary_patterns(non_empty(cli.summarize))
        .repo_stats(in_repository && !cli.no_stats)
        .context_footer(!cli.no_context)
        .clipboard(cli.clipboard);

    let extensions = non_empty(cli.ext);
    if !extensions.is_empty() {
        builder = builder.extensions(extensions);
    }

    if let Some(workers) = cli.workers {
        builder = builder.workers(workers);
    }

    let config = builder.build().context("Failed to build configuration")?;

    println!(
        "Starting file concatenation with {} workers...",
        config.workers
    );

    let stats = Pipeline::new(config)
        .context("Failed to create pipeline")?
        .run()
        .context("Failed to summarize repo")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        stats.print_summary();
    }

    Ok(())
}

/// Drops blank entries left by stray commas.
fn non_empty(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("reposyn=info"),
        1 => EnvFilter::new("reposyn=debug"),
        _ => EnvFilter::new("reposyn=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("Failed to initialize tracing")?;

    Ok(())
}
