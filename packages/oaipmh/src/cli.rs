//! Command-line interface for the harvester.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::client::Client;
use crate::config::ClientConfig;
use crate::datestamp::decode;
use crate::error::{OaiError, Result};
use crate::metadata::create_default_registry;
use crate::validation::Arguments;

/// OAI-PMH Harvester - Harvest metadata from OAI-PMH 2.0 repositories.
#[derive(Parser)]
#[command(name = "oaipmh-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Send requests with HTTP GET instead of POST
    #[arg(long, global = true)]
    pub get: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Repository and output shared by every subcommand.
#[derive(Args, Debug)]
pub struct Target {
    /// Repository base URL (default: $OAIPMH_BASE_URL)
    pub base_url: Option<String>,

    /// Write YAML to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Selective harvesting arguments of the list verbs.
#[derive(Args, Debug)]
pub struct Selection {
    /// Metadata prefix (e.g., oai_dc)
    #[arg(short, long, default_value = "oai_dc")]
    pub prefix: String,

    /// Lower datestamp bound (YYYY-MM-DD or YYYY-MM-DDThh:mm:ssZ)
    #[arg(long, value_parser = parse_datestamp)]
    pub from: Option<NaiveDateTime>,

    /// Upper datestamp bound (YYYY-MM-DD or YYYY-MM-DDThh:mm:ssZ)
    #[arg(long, value_parser = parse_datestamp)]
    pub until: Option<NaiveDateTime>,

    /// Set spec to harvest
    #[arg(short, long)]
    pub set: Option<String>,
}

impl Selection {
    fn arguments(&self) -> Arguments {
        Arguments::new()
            .metadata_prefix(self.prefix.as_str())
            .from(self.from)
            .until(self.until)
            .set(self.set.as_deref())
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the repository's Identify response.
    Identify {
        #[command(flatten)]
        target: Target,
    },
    /// List the metadata formats of the repository or of one item.
    Formats {
        #[command(flatten)]
        target: Target,

        /// Only formats available for this item
        #[arg(short, long)]
        identifier: Option<String>,
    },
    /// List the repository's sets.
    Sets {
        #[command(flatten)]
        target: Target,
    },
    /// Harvest record headers.
    Identifiers {
        #[command(flatten)]
        target: Target,

        #[command(flatten)]
        selection: Selection,
    },
    /// Harvest full records.
    Records {
        #[command(flatten)]
        target: Target,

        #[command(flatten)]
        selection: Selection,
    },
    /// Fetch a single record.
    GetRecord {
        #[command(flatten)]
        target: Target,

        /// Item identifier (e.g., hdl:1765/315)
        #[arg(short, long)]
        identifier: String,

        /// Metadata prefix
        #[arg(short, long, default_value = "oai_dc")]
        prefix: String,
    },
}

impl Commands {
    fn target(&self) -> &Target {
        match self {
            Commands::Identify { target }
            | Commands::Formats { target, .. }
            | Commands::Sets { target }
            | Commands::Identifiers { target, .. }
            | Commands::Records { target, .. }
            | Commands::GetRecord { target, .. } => target,
        }
    }
}

fn parse_datestamp(value: &str) -> std::result::Result<NaiveDateTime, String> {
    decode(value).map_err(|e| e.to_string())
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    execute(&cli)
}

/// Execute a parsed command line.
pub fn execute(cli: &Cli) -> Result<()> {
    let target = cli.command.target();

    // Validate inputs before making HTTP requests
    let mut config = match &target.base_url {
        Some(url) => ClientConfig::new(url)?,
        None => ClientConfig::from_env()?,
    };
    if cli.get {
        config = config.with_force_http_get(true);
    }
    let mut out = open_output(target.output.as_deref())?;
    let client = Client::with_config(config)?.with_registry(create_default_registry());

    eprintln!(
        "{} {}",
        style("Harvesting").bold(),
        style(client.base_url()).cyan()
    );

    let spinner = spinner();
    let result = match &cli.command {
        Commands::Identify { .. } => {
            spinner.set_message("Identify...");
            client
                .identify()
                .and_then(|identify| write_document(&mut out, &identify))
                .map(|()| 1)
        }
        Commands::Formats { identifier, .. } => {
            spinner.set_message("ListMetadataFormats...");
            let args = Arguments::new().with(
                "identifier",
                identifier.as_deref().map(|id| id.to_string().into()),
            );
            client.list_metadata_formats(&args).and_then(|formats| {
                formats
                    .iter()
                    .try_for_each(|format| write_document(&mut out, format))
                    .map(|()| formats.len())
            })
        }
        Commands::Sets { .. } => client
            .list_sets(&Arguments::new())
            .and_then(|sets| write_stream(&mut out, sets, &spinner, "sets")),
        Commands::Identifiers { selection, .. } => client
            .list_identifiers(&selection.arguments())
            .and_then(|headers| write_stream(&mut out, headers, &spinner, "headers")),
        Commands::Records { selection, .. } => client
            .list_records(&selection.arguments())
            .and_then(|records| write_stream(&mut out, records, &spinner, "records")),
        Commands::GetRecord {
            identifier, prefix, ..
        } => {
            spinner.set_message(format!("GetRecord {identifier}..."));
            let args = Arguments::new()
                .identifier(identifier.as_str())
                .metadata_prefix(prefix.as_str());
            client
                .get_record(&args)
                .and_then(|record| write_document(&mut out, &record))
                .map(|()| 1)
        }
    };
    spinner.finish_and_clear();

    let count = result?;
    out.flush()?;

    eprintln!("{} {}", style("Done:").green().bold(), count);
    if let Some(path) = &target.output {
        eprintln!("{} {}", style("Saved to:").green().bold(), path.display());
    }
    Ok(())
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Open `path` for writing, or stdout when no path is given.
fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let Some(path) = path else {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(OaiError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Output directory does not exist: {}", parent.display()),
            )));
        }
    }
    Ok(Box::new(BufWriter::new(File::create(path)?)))
}

/// Write one YAML document of a stream.
fn write_document<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<()> {
    let yaml = serde_yaml_ng::to_string(value)?;
    writeln!(out, "---")?;
    out.write_all(yaml.as_bytes())?;
    Ok(())
}

/// Drain a lazy list into the YAML stream, updating the spinner.
fn write_stream<T, I>(
    out: &mut dyn Write,
    items: I,
    spinner: &ProgressBar,
    noun: &str,
) -> Result<usize>
where
    T: Serialize,
    I: Iterator<Item = Result<T>>,
{
    let mut count = 0;
    spinner.set_message(format!("{count} {noun}"));
    for item in items {
        write_document(out, &item?)?;
        count += 1;
        spinner.set_message(format!("{count} {noun}"));
    }
    Ok(count)
}
