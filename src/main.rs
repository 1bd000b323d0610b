mod app;
mod error;
mod model;
mod plugin;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use app::App;
use model::config::{ConfigOverrides, Configuration};

#[derive(Debug, Parser)]
#[command(
    name = "mco-plugin-install",
    version,
    about = "Install MCollective plugins from a source tree"
)]
struct Cli {
    /// Specifies path to mcollective plugins (default /usr/share/mcollective/plugins).
    #[arg(long, value_name = "PATH")]
    plugins_path: Option<String>,

    /// Specifies prefix for installation (default /).
    #[arg(long, value_name = "PATH")]
    prefix: Option<String>,

    /// Comma separated list of plugins in the form name:type (default all, *:*).
    #[arg(long, value_name = "LIST")]
    plugins: Option<String>,

    /// Lists all plugins and exits.
    #[arg(long, default_value_t = false)]
    list_plugins: bool,

    /// Root of the plugin source tree (default current directory).
    #[arg(long, value_name = "PATH")]
    source_dir: Option<PathBuf>,

    /// Config file to read instead of the per-user default.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level for diagnostics on stderr (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Disable coloured progress output.
    #[arg(long, default_value_t = false)]
    no_color: bool,
}

impl Cli {
    fn overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config,
            plugins_path: self.plugins_path,
            prefix: self.prefix,
            plugins: self.plugins,
            source_dir: self.source_dir,
            list_only: self.list_plugins,
            no_color: self.no_color,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Diagnostics go to stderr; stdout carries the plugin list and progress.
    let (non_blocking, _guard) = tracing_appender::non_blocking(io::stderr());
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::new(&cli.log_level))
        .with_target(false)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Configuration::load(cli.overrides())?;
    tracing::debug!(?config, "configuration resolved");

    let app = App::new(config);
    app.run(&mut io::stdout().lock())
}
