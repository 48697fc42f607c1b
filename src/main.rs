use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use uupwatch::commands;
use uupwatch::core::config::{Endpoints, WatchConfig, DEFAULT_ARCH};
use uupwatch::core::locator::LocateStrategy;
use uupwatch::core::retriever::SubmitStrategy;
use uupwatch::core::retry::{RetryPolicy, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_SECS};

#[derive(Parser)]
#[clap(name = "uupwatch")]
#[clap(about = "Watch a UUP release channel and fetch new Windows builds")]
#[clap(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a channel and fetch the package when a new build appeared
    Check(CheckArgs),
    /// Show the newest build on a channel without downloading anything
    Latest {
        /// Release channel (e.g. retail, rp, wif, canary)
        channel: String,
        /// Architecture to look up
        #[clap(long, default_value = DEFAULT_ARCH)]
        arch: String,
        /// Listing format to query: json or html
        #[clap(long, default_value = "json")]
        locate: LocateStrategy,
        /// Attempts per request when rate limited
        #[clap(long, default_value_t = DEFAULT_MAX_RETRIES)]
        max_retries: u32,
        /// Seconds to wait between attempts
        #[clap(long, default_value_t = DEFAULT_RETRY_DELAY_SECS)]
        retry_delay: u64,
        /// Override the JSON listing endpoint
        #[clap(long)]
        api_url: Option<String>,
        /// Override the HTML listing endpoint
        #[clap(long)]
        html_url: Option<String>,
    },
    /// Record an update ID as the last processed build of a channel
    Record {
        /// Release channel
        channel: String,
        /// Update ID to store
        update_id: String,
        /// State file
        #[clap(long, default_value = "built.json")]
        state: PathBuf,
    },
    /// List the recorded build of every channel
    Status {
        /// State file
        #[clap(long, default_value = "built.json")]
        state: PathBuf,
    },
}

#[derive(Args)]
struct CheckArgs {
    /// Release channel (e.g. retail, rp, wif, canary)
    channel: String,
    /// Architecture to fetch; repeat for several (default: one package, amd64 lookup)
    #[clap(long = "arch")]
    architectures: Vec<String>,
    /// Listing format to query: json or html
    #[clap(long, default_value = "json")]
    locate: LocateStrategy,
    /// Package request flow: interactive or direct
    #[clap(long, default_value = "interactive")]
    submit: SubmitStrategy,
    /// State file holding the last processed build per channel
    #[clap(long, default_value = "built.json")]
    state: PathBuf,
    /// Options file with language pack and editions
    #[clap(long, default_value = "opts.json")]
    opts: PathBuf,
    /// Directory the downloaded package is written to
    #[clap(long, default_value = ".")]
    download_dir: PathBuf,
    /// Directory the package is extracted into
    #[clap(long, default_value = "work")]
    work_dir: PathBuf,
    /// Attempts per request when rate limited
    #[clap(long, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,
    /// Seconds to wait between attempts
    #[clap(long, default_value_t = DEFAULT_RETRY_DELAY_SECS)]
    retry_delay: u64,
    /// Leave the extracted scripts untouched
    #[clap(long)]
    no_patch: bool,
    /// Override the JSON listing endpoint
    #[clap(long)]
    api_url: Option<String>,
    /// Override the HTML listing endpoint
    #[clap(long)]
    html_url: Option<String>,
    /// Override the interactive download endpoint
    #[clap(long)]
    download_url: Option<String>,
    /// Override the direct download endpoint
    #[clap(long)]
    get_url: Option<String>,
}

impl CheckArgs {
    fn into_config(self) -> (String, WatchConfig) {
        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            api_url: self.api_url.unwrap_or(defaults.api_url),
            html_url: self.html_url.unwrap_or(defaults.html_url),
            download_url: self.download_url.unwrap_or(defaults.download_url),
            get_url: self.get_url.unwrap_or(defaults.get_url),
        };

        let config = WatchConfig {
            state_path: self.state,
            options_path: self.opts,
            download_dir: self.download_dir,
            work_dir: self.work_dir,
            architectures: self.architectures,
            locate_strategy: self.locate,
            submit_strategy: self.submit,
            endpoints,
            max_retries: self.max_retries,
            retry_delay_secs: self.retry_delay,
            patch_scripts: !self.no_patch,
            ..WatchConfig::default()
        };
        (self.channel, config)
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check(args) => {
            let (channel, config) = args.into_config();
            commands::check::check_channel(&channel, config)
                .map(|_| ())
                .map_err(|e| anyhow::anyhow!(e))
        }
        Commands::Latest {
            channel,
            arch,
            locate,
            max_retries,
            retry_delay,
            api_url,
            html_url,
        } => {
            let defaults = Endpoints::default();
            let endpoints = Endpoints {
                api_url: api_url.unwrap_or(defaults.api_url),
                html_url: html_url.unwrap_or(defaults.html_url),
                ..defaults
            };
            let retry = RetryPolicy::new(max_retries, Duration::from_secs(retry_delay));
            commands::latest::show_latest(&channel, &arch, locate, &endpoints, retry)
                .map(|_| ())
                .map_err(|e| anyhow::anyhow!(e))
        }
        Commands::Record {
            channel,
            update_id,
            state,
        } => commands::record::record_build(&state, &channel, &update_id)
            .map_err(|e| anyhow::anyhow!(e)),
        Commands::Status { state } => commands::status::show_status(&state),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
