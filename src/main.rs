use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;

use lavka::auth::hash_password;
use lavka::cli::{Cli, Commands};
use lavka::config::AppConfig;
use lavka::panel::run_panel_server;
use lavka::storage::db::{self, NewProduct};
use lavka::storage::{create_pool, get_connection};
use lavka::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, SessionStore};

/// Main entry point
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (config, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init_timed();

    let cli = Cli::parse_args();
    let config = Arc::new(AppConfig::from_env()?);

    match cli.command {
        Some(Commands::Bot) => run_bot(config).await,
        Some(Commands::Panel) => {
            let db_pool = Arc::new(create_pool(&config.database_path)?);
            run_panel_server(config, db_pool).await
        }
        Some(Commands::Migrate) => {
            // create_pool applies pending migrations as part of setup
            let _pool = create_pool(&config.database_path)?;
            log::info!("Schema is up to date at {}", config.database_path);
            Ok(())
        }
        Some(Commands::CreateAdmin {
            tg_id,
            username,
            email,
            password,
        }) => run_create_admin(&config, tg_id, username, email, &password),
        Some(Commands::SeedCities { names }) => run_seed_cities(&config, names),
        Some(Commands::SeedProducts { city }) => run_seed_products(&config, &city),
        None => {
            // No command specified - default to running the bot
            log::info!("No command specified, running the bot");
            run_bot(config).await
        }
    }
}

/// Run the Telegram bot with long polling.
async fn run_bot(config: Arc<AppConfig>) -> Result<()> {
    let db_pool = Arc::new(create_pool(&config.database_path)?);
    let bot = create_bot(&config);

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let deps = HandlerDeps {
        db_pool,
        sessions: Arc::new(SessionStore::default()),
        config,
    };

    log::info!("Starting bot dispatcher");
    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn run_create_admin(
    config: &AppConfig,
    tg_id: i64,
    username: Option<String>,
    email: Option<String>,
    password: &str,
) -> Result<()> {
    let pool = create_pool(&config.database_path)?;
    let conn = get_connection(&pool)?;

    let password_hash = hash_password(password)?;
    let id = db::create_admin(&conn, tg_id, username.as_deref(), email.as_deref(), &password_hash)?;
    log::info!("Created admin #{} (tg_id {})", id, tg_id);

    Ok(())
}

fn run_seed_cities(config: &AppConfig, names: Vec<String>) -> Result<()> {
    let pool = create_pool(&config.database_path)?;
    let conn = get_connection(&pool)?;

    let names = if names.is_empty() {
        ["Dresden", "Munchen", "Berlin", "Hamburg"]
            .map(str::to_string)
            .to_vec()
    } else {
        names
    };

    for name in &names {
        if db::get_city_by_name(&conn, name)?.is_some() {
            log::info!("City {} already exists, skipping", name);
            continue;
        }
        db::create_city(&conn, name)?;
        log::info!("Added city {}", name);
    }

    Ok(())
}

fn run_seed_products(config: &AppConfig, city_name: &str) -> Result<()> {
    let pool = create_pool(&config.database_path)?;
    let conn = get_connection(&pool)?;

    let Some(city) = db::get_city_by_name(&conn, city_name)? else {
        anyhow::bail!("City {} not found. Run `lavka seed-cities` first.", city_name);
    };

    let demo = [
        ("003", "Elfliq", "Grape", 4.0, 10, 10.0, 2),
        ("005", "Elfliq", "Strawberry", 4.0, 15, 10.0, 5),
        ("007", "Lost Mary", "Blueberry", 5.0, 20, 12.0, 8),
    ];

    for (code, name, flavor, purchase_price, purchase_quantity, sale_price, sold_quantity) in demo {
        db::create_product(
            &conn,
            &NewProduct {
                code: code.to_string(),
                name: name.to_string(),
                flavor: Some(flavor.to_string()),
                purchase_price,
                purchase_quantity,
                sale_price,
                sold_quantity,
                avg_sale_price: sale_price,
                city_id: city.id,
            },
        )?;
        log::info!("Added product {} - {} {}", code, name, flavor);
    }

    Ok(())
}
