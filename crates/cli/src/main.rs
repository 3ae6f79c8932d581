mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{BuildArgs, cmd_headers, cmd_rewrite, cmd_sources};
use output::{OutputFormat, print_error};

/// mocgraph - declare and run meta-object generator actions
#[derive(Parser)]
#[command(name = "mocgraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Generate compilable sources and metadata from headers
  Headers {
    /// Rule name, used for the scratch directory of raw generator output
    #[arg(long, default_value = "moc")]
    name: String,

    /// Package the generated sources belong to, relative to the output directory
    #[arg(long, default_value = "")]
    package: String,

    /// Pass the include-debugging flag to the generator
    #[arg(long)]
    debug_includes: bool,

    #[command(flatten)]
    build: BuildArgs,

    /// Header files, relative to the build root
    #[arg(required = true)]
    hdrs: Vec<String>,
  },

  /// Generate self-include fragments from sources
  Sources {
    #[arg(long, default_value = "moc")]
    name: String,

    /// Pass the include-debugging flag to the generator
    #[arg(long)]
    debug_includes: bool,

    #[command(flatten)]
    build: BuildArgs,

    /// Source files, relative to the build root
    #[arg(required = true)]
    srcs: Vec<String>,
  },

  /// Rewrite quoted includes in a file the way generated sources are rewritten
  Rewrite {
    /// Header of the rule (repeatable)
    #[arg(long = "header", required = true)]
    headers: Vec<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// File to rewrite
    file: PathBuf,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(e) = run(cli.command) {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}

fn run(command: Commands) -> Result<()> {
  match command {
    Commands::Headers {
      name,
      package,
      debug_includes,
      build,
      hdrs,
    } => cmd_headers(&name, &package, debug_includes, &hdrs, &build),
    Commands::Sources {
      name,
      debug_includes,
      build,
      srcs,
    } => cmd_sources(&name, debug_includes, &srcs, &build),
    Commands::Rewrite { headers, output, file } => cmd_rewrite(&headers, &file, output),
  }
}
