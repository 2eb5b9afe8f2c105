//! tplgen CLI entrypoint
//! Parses command-line arguments and dispatches to the core generator.
#![deny(unsafe_code)]

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use tplgen::generate::{GenerateConfig, run};

#[derive(Parser)]
#[command(name = "tplgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Template files to render; glob patterns are expanded, with a
    /// pattern that matches nothing kept as a literal path
    #[arg(required = true, value_name = "TEMPLATE")]
    templates: Vec<String>,

    /// Set a value for the templates, as a dotted.path=value pair
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    set: Vec<(String, String)>,

    /// Numeric range to iterate over, in the form var.path=from..to
    #[arg(long = "num-range", value_name = "SPEC", default_value = "")]
    num_range: String,

    /// Output name template evaluated against the value tree
    /// ('-' writes to standard output)
    #[arg(long, value_name = "TEMPLATE")]
    output: Option<String>,

    /// Additional template file included into every composed template,
    /// addressable by its base name via include(name=...)
    #[arg(long = "include", value_name = "FILE")]
    include: Vec<String>,

    /// File suffix used by the default output naming convention
    #[arg(long = "output-suffix", value_name = "EXT", default_value = "go")]
    output_suffix: String,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr: stdout may itself be an output target.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = GenerateConfig {
        templates: cli.templates,
        assignments: cli.set,
        range_spec: cli.num_range,
        output_template: cli.output,
        includes: cli.include,
        output_suffix: cli.output_suffix,
    };
    run(&config)?;
    Ok(())
}
