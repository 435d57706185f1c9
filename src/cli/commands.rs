use crate::cli::manifest::load_manifest;
use crate::config::{load_options, GeneratorOptions};
use crate::generator::SpecGenerator;
use crate::logging::init_logging;
use crate::url_template::format_url_template;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Command-line interface for routedoc
///
/// Generates Swagger 2.0 / OpenAPI 3 documents from route manifests.
#[derive(Parser)]
#[command(name = "routedoc")]
#[command(version, about = "Route documentation generator", long_about = None)]
pub struct Cli {
    /// Log filter used when ROUTEDOC_LOG and RUST_LOG are unset
    #[arg(long, global = true, default_value = "warn", env = "ROUTEDOC_LOG_LEVEL")]
    pub log_level: String,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Generate a document from a route manifest
    Generate {
        /// Route manifest (YAML or JSON)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Generator options (YAML or JSON); Swagger 2.0 defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the OpenAPI form of a route URL pattern
    FormatUrl {
        /// Pattern in router syntax, e.g. `/users/:id`
        pattern: String,
    },
}

/// Serialization of the generated document.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

/// Parse arguments, install logging and run the selected command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    let stdout = std::io::stdout();
    execute(&cli.command, &mut stdout.lock())
}

/// Run a command, writing any document that goes to stdout into `out`.
pub fn execute(command: &Commands, out: &mut dyn Write) -> Result<()> {
    match command {
        Commands::Generate {
            manifest,
            config,
            format,
            output,
        } => {
            let options = match config {
                Some(path) => load_options(path)?,
                None => GeneratorOptions::default(),
            };
            let sink = load_manifest(manifest)?;
            let generator = SpecGenerator::new(sink, options);
            let text = match format {
                OutputFormat::Json => generator.json()?,
                OutputFormat::Yaml => generator.yaml()?,
            };

            match output {
                Some(path) => {
                    std::fs::write(path, text.as_bytes())
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(
                        output = %path.display(),
                        dialect = generator.dialect().name(),
                        "Wrote API document"
                    );
                }
                None => {
                    out.write_all(text.as_bytes())?;
                    if !text.ends_with('\n') {
                        writeln!(out)?;
                    }
                }
            }
            Ok(())
        }
        Commands::FormatUrl { pattern } => {
            writeln!(out, "{}", format_url_template(pattern))?;
            Ok(())
        }
    }
}
