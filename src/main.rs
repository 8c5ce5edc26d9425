use clap::Parser;
use tracing::{error, Level};

use coinboard::{
    cli::{self, Cli, Commands},
    configuration::{AppState, State},
    error::Error,
    handler::cache_sweeper,
    server,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level({
            #[cfg(debug_assertions)]
            {
                Level::INFO
            }

            #[cfg(not(debug_assertions))]
            {
                Level::INFO
            }
        })
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::Coins {
            page,
            per_page,
            currency,
        } => cli::run_coins(page, per_page, currency).await,
        Commands::Coin { id, currency } => cli::run_coin(id, currency).await,
        Commands::Chart { id, currency, days } => {
            cli::run_chart(id, currency, days).await
        },
        Commands::Search { query } => cli::run_search(query).await,
    }
}

async fn serve() -> Result<(), Error> {
    let config = match cli::init_config() {
        Ok(config) => config,
        Err(e) => return Err(Error::ConfigurationError(e.to_string())),
    };

    let state = State::new(config)?;
    let app_state = AppState::new(state);

    let (_, _) = tokio::try_join!(
        server::server_task(&app_state),
        cache_sweeper::cache_sweep_task(app_state.clone()),
    )?;

    app_state.queries.dispose();

    Ok(())
}
