//! propsub cli interface

use clap::{Parser, Subcommand, ValueEnum};
use propsub::rewrite::LineEnding;
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; propsub ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replace ${...} expressions in resource files
    ///
    /// Only files with at least one changed line are rewritten.
    Replace(ReplaceCommand),

    /// Resolve a single line and print it
    #[command(alias = "eval")]
    Resolve(ResolveCommand),

    /// Print the merged properties
    Properties(PropertiesCommand),
}

#[derive(Parser, Debug)]
pub struct ReplaceCommand {
    #[clap(flatten)]
    pub properties: PropertyArgs,

    /// Directory the candidate files are matched in
    ///
    /// Can be specified multiple times. Defaults to the output directory.
    #[clap(short = 's', long = "source-dir")]
    pub source_directories: Vec<PathBuf>,

    /// Directory holding the files to rewrite
    #[clap(short = 'o', long = "output-dir")]
    pub output_directory: Option<PathBuf>,

    /// Glob pattern of files to include (default: all files)
    #[clap(short = 'i', long = "include")]
    pub includes: Vec<String>,

    /// Glob pattern of files to exclude
    #[clap(short = 'x', long = "exclude")]
    pub excludes: Vec<String>,

    /// Line terminator of rewritten files
    #[arg(long = "line-ending")]
    pub line_ending: Option<LineEnding>,

    /// Write scratch files to this directory instead of next to each file
    #[clap(long = "scratch-dir")]
    pub scratch_directory: Option<PathBuf>,

    /// Exit with an error if any file could not be verified after rewriting
    #[clap(long = "fail-on-unverified")]
    pub fail_on_unverified: bool,
}

#[derive(Parser, Debug)]
pub struct ResolveCommand {
    #[clap(flatten)]
    pub properties: PropertyArgs,

    /// Text containing ${...} expressions
    pub line: String,
}

#[derive(Parser, Debug)]
pub struct PropertiesCommand {
    #[clap(flatten)]
    pub properties: PropertyArgs,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct PropertyArgs {
    /// Build configuration file (yaml or json)
    #[clap(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Define a property (key=value)
    ///
    /// Overrides properties of the same name in the configuration file.
    #[clap(short = 'D', long = "define", value_parser = parse_definition)]
    pub definitions: Vec<(String, String)>,

    /// Load properties from file (.properties, .json, .yaml or .hcl)
    #[clap(short = 'p', long = "properties-file")]
    pub properties_file: Option<PathBuf>,

    /// Encoding of resource and properties files
    #[clap(short = 'e', long = "encoding")]
    pub encoding: Option<String>,

    /// Do not expose environment and platform properties
    #[clap(long = "no-system-properties")]
    pub no_system_properties: bool,

    /// Do not expose project properties
    #[clap(long = "no-project-properties")]
    pub no_project_properties: bool,
}

fn parse_definition(definition: &str) -> Result<(String, String), String> {
    definition
        .split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got {definition:?}"))
}

/// How the merged properties are printed
#[derive(Parser, Debug)]
pub struct OutputArgs {
    /// Format of the printed key/value mapping
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
