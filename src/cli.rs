use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Push packaged static assets to S3 and keep a CloudFront distribution in step.
#[derive(Debug, Parser)]
#[command(name = "assetpush", version, about)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON). Defaults to `./assetpush.toml`.
    #[arg(short, long, global = true, env = "ASSETPUSH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity; ignored when `RUST_LOG` is set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload assets, skipping unchanged files, and invalidate replaced ones.
    Upload {
        /// Plan and compare without writing to the bucket or the CDN.
        #[arg(long)]
        dry_run: bool,
        /// Use this version token instead of resolving one.
        #[arg(long, value_name = "V")]
        asset_version: Option<String>,
    },
    /// Print the resolved version token.
    Version {
        #[arg(long, value_name = "V")]
        asset_version: Option<String>,
    },
    /// Print a stylesheet with its relative `url()` references versioned.
    RewriteCss {
        file: PathBuf,
        #[arg(long, value_name = "V")]
        asset_version: Option<String>,
    },
    /// Print the URL an asset is served from.
    AssetHost {
        source: String,
        /// Resolve as if the page was requested over HTTPS.
        #[arg(long)]
        ssl: bool,
        #[arg(long, value_name = "V")]
        asset_version: Option<String>,
    },
}

impl Cli {
    /// Log filter for the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
