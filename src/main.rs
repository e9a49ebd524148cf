//! siteconf CLI
//!
//! Entry point for the `siteconf` command-line tool.

use clap::{Args, Parser, Subcommand, ValueEnum};
use siteconf::{Catalog, ConfigResolver, EffectiveConfig, OutputFormat};
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing::debug;

#[derive(Parser)]
#[command(name = "siteconf")]
#[command(about = "Resolve layered static-site settings", version)]
struct Cli {
    /// More log output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration
    Resolve {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output format
        #[arg(long, short = 'f', value_enum, default_value_t = Format::Json)]
        format: Format,

        /// With JSON output, print only the settings object
        #[arg(long)]
        settings_only: bool,

        /// Write to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Print one setting as JSON
    Get {
        /// Setting name
        name: String,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Show which source supplied each setting
    Explain {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Check recognized settings for values of the wrong shape
    Check {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Settings files, lowest precedence first
    sources: Vec<PathBuf>,

    /// Directory of fragments applied before SOURCES, in file-name order
    #[arg(long, short = 'd', env = "SITECONF_DIR")]
    dir: Option<PathBuf>,

    /// Override a setting after all files (repeatable)
    #[arg(long = "set", short = 's', value_name = "NAME=LITERAL")]
    overrides: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Toml,
    /// NAME = literal lines
    Py,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => OutputFormat::Json,
            Format::Toml => OutputFormat::Toml,
            Format::Py => OutputFormat::Assignments,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    siteconf::logging::init(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Resolve {
            sources,
            format,
            settings_only,
            output,
        } => run_resolve(&sources, format, settings_only, output),
        Commands::Get { name, sources } => run_get(&name, &sources),
        Commands::Explain { sources, json } => run_explain(&sources, json),
        Commands::Check { sources, json } => run_check(&sources, json),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {}", message);
    process::exit(1);
}

fn resolve(args: &SourceArgs) -> EffectiveConfig {
    if args.sources.is_empty() && args.dir.is_none() && args.overrides.is_empty() {
        fail("no configuration sources given (pass files, --dir or --set)");
    }

    let mut resolver = ConfigResolver::new();
    if let Some(ref dir) = args.dir {
        resolver = resolver.dir(dir);
    }
    for path in &args.sources {
        resolver = resolver.source(path);
    }
    for spec in &args.overrides {
        resolver = match resolver.with_override_spec(spec) {
            Ok(r) => r,
            Err(e) => fail(e),
        };
    }

    match resolver.resolve() {
        Ok(config) => config,
        Err(e) => {
            debug!(error = ?e, "resolution failed");
            fail(e)
        }
    }
}

fn run_resolve(args: &SourceArgs, format: Format, settings_only: bool, output: Option<PathBuf>) {
    let config = resolve(args);

    let render = || match config.render(format.into(), settings_only) {
        Ok(text) => text,
        Err(e) => fail(format!("error serializing output: {}", e)),
    };

    match output {
        Some(path) => {
            let written = match format {
                Format::Json if !settings_only => config.write_to_file(&path),
                _ => fs::write(&path, render()),
            };
            if let Err(e) = written {
                fail(format!("failed to write {}: {}", path.display(), e));
            }
            eprintln!("Wrote {} settings to {}", config.len(), path.display());
        }
        None => {
            let rendered = render();
            print!("{}", rendered);
            if !rendered.ends_with('\n') {
                println!();
            }
        }
    }
}

fn run_get(name: &str, args: &SourceArgs) {
    let config = resolve(args);

    match config.get(name) {
        Some(value) => match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(format!("error serializing output: {}", e)),
        },
        None => {
            eprintln!("Setting '{}' is not defined by any source.", name);
            process::exit(1);
        }
    }
}

fn run_explain(args: &SourceArgs, json_output: bool) {
    let config = resolve(args);

    if json_output {
        let output: Vec<serde_json::Value> = config
            .iter()
            .map(|(name, value)| {
                serde_json::json!({
                    "name": name,
                    "value": value,
                    "source": config.origin_of(name),
                })
            })
            .collect();

        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(format!("error serializing output: {}", e)),
        }
        return;
    }

    println!("Sources ({} total, lowest precedence first):", config.sources().len());
    for (i, source) in config.sources().iter().enumerate() {
        match source.digest {
            Some(ref digest) => println!("  [{}] {} (sha256 {})", i, source.label(), digest.get(..12).unwrap_or(digest)),
            None => println!("  [{}] {}", i, source.label()),
        }
    }
    println!();

    if config.is_empty() {
        println!("No settings defined.");
        return;
    }

    let width = config.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, value) in config.iter() {
        let origin = config.origin_of(name).map(|s| s.label()).unwrap_or("?");
        println!("  {:<width$}  {}  [{}]", name, value, origin, width = width);
    }
}

fn run_check(args: &SourceArgs, json_output: bool) {
    let config = resolve(args);
    let catalog = match Catalog::builtin() {
        Ok(c) => c,
        Err(e) => fail(e),
    };
    let diagnostics = catalog.check(&config);

    if json_output {
        match serde_json::to_string_pretty(&diagnostics) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(format!("error serializing output: {}", e)),
        }
        return;
    }

    if diagnostics.is_empty() {
        println!("{} settings checked, no problems found.", config.len());
        return;
    }

    for diagnostic in &diagnostics {
        println!("warning: {}", diagnostic);
    }
    println!(
        "{} settings checked, {} warning(s).",
        config.len(),
        diagnostics.len()
    );
}
