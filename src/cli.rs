use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lavka")]
#[command(author, version, about = "Telegram bot + web admin panel for a city-scoped courier shop", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the Telegram bot (long polling)
    Bot,

    /// Run the admin panel HTTP server
    Panel,

    /// Create the database schema / apply pending migrations
    Migrate,

    /// Create an admin account
    CreateAdmin {
        /// Telegram id of the admin
        #[arg(long)]
        tg_id: i64,

        /// Display name
        #[arg(long)]
        username: Option<String>,

        /// Contact email (unique)
        #[arg(long)]
        email: Option<String>,

        /// Plaintext password, hashed before storage
        #[arg(long)]
        password: String,
    },

    /// Insert cities (defaults to the standard four), skipping existing ones
    SeedCities {
        /// City names to insert
        names: Vec<String>,
    },

    /// Insert a handful of demo products into a city
    SeedProducts {
        /// Target city name
        #[arg(long, default_value = "Dresden")]
        city: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
