pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::{Converter, RateFetcher};
use crate::providers::{ExchangeRateApiFetcher, FallbackFetcher};
use crate::store::RateStore;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Rate {
        from: String,
        to: String,
    },
    Convert {
        amount: f64,
        from: String,
        to: String,
    },
    Batch {
        input: PathBuf,
        from: String,
        to: String,
        fields: Vec<String>,
        output: Option<PathBuf>,
    },
    Rates {
        base: Option<String>,
        refresh: bool,
    },
    Currencies,
}

/// Builds the rate store and converter described by `config`.
pub fn build_converter(config: &AppConfig) -> Result<Converter> {
    let fetcher: Arc<dyn RateFetcher> = match &config.providers.exchange_rate {
        Some(provider) if provider.is_usable() => Arc::new(ExchangeRateApiFetcher::new(
            &provider.base_url,
            provider.api_key.as_deref(),
            provider.timeout(),
        )?),
        Some(provider) => {
            warn!(
                base_url = %provider.base_url,
                "Exchange rate provider has no API key, using fallback rates"
            );
            Arc::new(FallbackFetcher)
        }
        None => {
            info!("No exchange rate provider configured, using fallback rates");
            Arc::new(FallbackFetcher)
        }
    };

    let base_currency = crate::core::currency::normalize_code(&config.base_currency);
    let store = RateStore::new(fetcher, &base_currency, config.cache_ttl());
    Ok(Converter::new(Arc::new(store)))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("xrate starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let converter = build_converter(&config)?;

    match command {
        AppCommand::Rate { from, to } => {
            let spinner = cli::ui::new_spinner("Loading exchange rates...");
            let output = cli::rates::display_rate(&converter, &from, &to).await;
            spinner.finish_and_clear();
            println!("{output}");
        }
        AppCommand::Convert { amount, from, to } => {
            let spinner = cli::ui::new_spinner("Loading exchange rates...");
            let output = cli::convert::display_conversion(&converter, amount, &from, &to).await;
            spinner.finish_and_clear();
            println!("{output}");
        }
        AppCommand::Batch {
            input,
            from,
            to,
            fields,
            output,
        } => {
            let summary = cli::batch::run_batch(
                &converter,
                &input,
                &from,
                &to,
                &fields,
                output.as_deref(),
            )
            .await?;
            eprintln!("{summary}");
        }
        AppCommand::Rates { base, refresh } => {
            let store = converter.store();
            let base = base
                .map(|b| crate::core::currency::normalize_code(&b))
                .unwrap_or_else(|| store.base_currency().to_string());

            let spinner = cli::ui::new_spinner("Loading exchange rates...");
            let table = if refresh {
                store.refresh(&base).await
            } else {
                store.get_rates_for(&base).await
            };
            spinner.finish_and_clear();
            println!("{}", cli::rates::display_rates(&table, &store.status()));
        }
        AppCommand::Currencies => println!("{}", cli::rates::display_currencies()),
    }

    Ok(())
}
