//! Command-line interface for mapxml.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use console::style;

use crate::config::{SchemaConfig, DEFAULT_OUTPUT_FORMAT};
use crate::engine::{MapOptions, MapXml};
use crate::error::Result;
use crate::mapper::NestedAbsence;
use crate::types::Record;
use crate::xml::DocumentMode;

/// MapXml - Map XML and HTML documents into records.
#[derive(Parser)]
#[command(name = "mapxml")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Map a document with a YAML schema and print the records.
    Map {
        /// Schema declaration file (YAML)
        schema: PathBuf,

        /// Document to map
        document: PathBuf,

        /// Parse the document as HTML instead of XML
        #[arg(long)]
        html: bool,

        /// Drop a record when one of its nested records is dropped
        #[arg(long)]
        strict_nested: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = DEFAULT_OUTPUT_FORMAT)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Map {
            schema,
            document,
            html,
            strict_nested,
            format,
        } => map_command(&schema, &document, html, strict_nested, format),
    }
}

/// Execute the map command.
fn map_command(
    schema_path: &Path,
    document_path: &Path,
    html: bool,
    strict_nested: bool,
    format: OutputFormat,
) -> Result<()> {
    let schema = SchemaConfig::from_file(schema_path)?.into_schema()?;

    let options = MapOptions::default()
        .with_mode(if html {
            DocumentMode::Html
        } else {
            DocumentMode::Xml
        })
        .with_nested_absence(if strict_nested {
            NestedAbsence::Cascade
        } else {
            NestedAbsence::Keep
        });

    let mut engine = MapXml::with_options(options);
    engine.load_file(document_path)?;
    let records = engine.map(&schema)?;

    if records.is_empty() {
        tracing::warn!(
            schema = %schema.name(),
            document = %document_path.display(),
            "No records mapped"
        );
    }

    println!("{}", render(&records, format)?);

    eprintln!(
        "{} {} {} from {}",
        style("Mapped").green().bold(),
        style(records.len()).cyan(),
        schema.name(),
        document_path.display()
    );

    Ok(())
}

/// Serialize records in the requested format.
pub fn render(records: &[Record], format: OutputFormat) -> Result<String> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(records)?,
        OutputFormat::Yaml => serde_yaml_ng::to_string(records)?,
    };
    Ok(text.trim_end().to_string())
}
