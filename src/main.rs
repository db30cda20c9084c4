//! rpcwire - request/response frame tool
//!
//! Encodes RPC frames from command-line arguments and decodes captured
//! frames or byte streams for inspection.

mod commands;
mod config;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use config::{Config, ConfigError, OutputFormat};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rpcwire")]
#[command(about = "Encode and inspect rpcwire request/response frames")]
#[command(version)]
struct Cli {
    /// YAML config file
    #[arg(short, long, env = "RPCWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Print decoded frames as JSON
    #[arg(long)]
    json: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Largest accepted frame in bytes
    #[arg(long)]
    max_frame_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

/// Opaque protocol codes carried in every frame.
#[derive(Args, Debug, Clone, Default)]
pub struct CodeArgs {
    /// Correlation id
    #[arg(short = 'i', long, default_value = "0")]
    pub message_id: u32,

    /// Protocol version code
    #[arg(long = "protocol-version", default_value = "0")]
    pub version: u8,

    /// Compressor code
    #[arg(long, default_value = "0")]
    pub compressor: u8,

    /// Serializer code
    #[arg(long, default_value = "0")]
    pub serializer: u8,
}

/// Which frame layout a byte stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FrameKind {
    Request,
    Response,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encode a request frame
    EncodeRequest {
        /// Target service name
        #[arg(short, long)]
        service: String,

        /// Target method name
        #[arg(short, long)]
        method: String,

        /// Metadata entry as key=value (repeatable)
        #[arg(long = "meta")]
        meta: Vec<String>,

        #[command(flatten)]
        codes: CodeArgs,

        /// Payload (literal, hex:<digits>, or @file)
        #[arg(short, long)]
        data: Option<String>,

        /// Write the raw frame here instead of printing hex
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Encode a response frame
    EncodeResponse {
        #[command(flatten)]
        codes: CodeArgs,

        /// Error payload (literal, hex:<digits>, or @file)
        #[arg(short, long)]
        error: Option<String>,

        /// Result payload (literal, hex:<digits>, or @file)
        #[arg(short, long)]
        data: Option<String>,

        /// Write the raw frame here instead of printing hex
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Decode a single request frame (file path, `-` for stdin, or hex:<digits>)
    DecodeRequest { input: String },

    /// Decode a single response frame (file path, `-` for stdin, or hex:<digits>)
    DecodeResponse { input: String },

    /// Split a captured byte stream into frames
    Split {
        input: String,

        /// Frame layout of the stream
        #[arg(short, long, value_enum, default_value = "request")]
        kind: FrameKind,
    },
}

fn main() {
    // Logs go to stderr so frame output stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => fail(e),
    };
    if !config.output.color {
        colored::control::set_override(false);
    }

    tracing::debug!(
        "max_frame_size={} validate_fields={} format={:?}",
        config.codec.max_frame_size,
        config.codec.validate_fields,
        config.output.format
    );

    match commands::execute(cli.command, &config) {
        Ok(output) => println!("{}", output),
        Err(e) => fail(e),
    }
}

/// Loads the config file and applies command-line overrides on top.
fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.json {
        config.output.format = OutputFormat::Json;
    }
    if cli.no_color {
        config.output.color = false;
    }
    if let Some(max) = cli.max_frame_size {
        config.codec.max_frame_size = max;
        config.validate()?;
    }
    Ok(config)
}

fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", "Error".red(), err);
    std::process::exit(1);
}
