use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use fxrates::log::init_logging;
use fxrates::model::{DateRange, ProviderSelection};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch exchange rates for a currency
    Fetch {
        /// 3-letter currency code, e.g. USD
        currency: String,

        /// Start of an inclusive date range (YYYY-MM-DD); omit both dates
        /// for the latest rate
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// End of the inclusive date range (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        /// Rate source(s) to query
        #[arg(long, value_enum, default_value_t = SourceArg::All)]
        source: SourceArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    /// NBP tables A and C, quoted in PLN
    Nbp,
    /// ECB-based reference rates, quoted per EUR
    Ecb,
    /// Every configured source
    All,
}

impl From<SourceArg> for ProviderSelection {
    fn from(source: SourceArg) -> ProviderSelection {
        match source {
            SourceArg::Nbp => ProviderSelection::Nbp,
            SourceArg::Ecb => ProviderSelection::Ecb,
            SourceArg::All => ProviderSelection::All,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(Commands::Fetch {
            currency,
            from,
            to,
            source,
        }) => {
            let range = match (from, to) {
                (Some(start), Some(end)) => Some(DateRange::new(start, end)?),
                _ => None,
            };
            fxrates::run_command(
                fxrates::FetchRequest {
                    currency,
                    range,
                    selection: source.into(),
                },
                cli.config_path.as_deref(),
            )
            .await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = fxrates::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
providers:
  nbp:
    base_url: "https://api.nbp.pl/api/exchangerates"
  ecb:
    base_url: "https://api.frankfurter.app"
    fallback_url: "https://api.exchangerate.host"

timeout_secs: 10
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
