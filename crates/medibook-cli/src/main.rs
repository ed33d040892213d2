//! # medibook
//!
//! Command-line front end for the medibook booking API.
//!
//! ## Running
//!
//! ```bash
//! medibook --lat 6.9271 --lon 79.8612 nearby
//! medibook search "perera"
//! medibook login 0762199100 && medibook verify 0762199100 123456
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use medibook_client::Registration;
use medibook_core::config::{default_config_path, MedibookConfig};
use medibook_core::geo::Coordinate;
use tracing::debug;

mod app;
mod logging;
mod render;

use app::{App, Booking};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "MEDIBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Latitude of the current location
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude of the current location
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Also write JSON logs to rolling files in the data directory
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search doctors by name
    Search {
        /// Part of the doctor's name
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Doctors near --lat/--lon
    Nearby,
    /// Manage favorite doctor and dispensary pairs
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Send a sign-in code to a mobile number
    Login { mobile: String },
    /// Send a fresh sign-in code
    Resend { mobile: String },
    /// Submit a sign-in code
    Verify { mobile: String, otp: String },
    /// Create an account
    Register {
        mobile: String,
        name: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Upcoming sessions of a doctor at a dispensary
    Slots { doctor: String, dispensary: String },
    /// Fee breakdown of a doctor at a dispensary
    Fees { doctor: String, dispensary: String },
    /// Book the next appointment in a session
    Book {
        doctor: String,
        dispensary: String,
        /// Session index as listed by `slots`
        #[arg(long, default_value_t = 0)]
        slot: usize,
        /// Patient name (defaults to the signed-in user)
        #[arg(long)]
        name: Option<String>,
        /// Patient phone (defaults to the signed-in user)
        #[arg(long)]
        phone: Option<String>,
    },
    /// Show a booking summary
    Summary { transaction_id: String },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List favorites
    List,
    /// Add a doctor at a dispensary
    Add { doctor: String, dispensary: String },
    /// Remove a favorite by id (`<doctor>_<dispensary>`)
    Remove { id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    fn location(&self) -> Result<Option<Coordinate>> {
        let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
            return Ok(None);
        };
        let coordinate = Coordinate::new(lat, lon);
        if !coordinate.is_valid() {
            bail!("--lat must be within ±90 and --lon within ±180");
        }
        Ok(Some(coordinate))
    }

    fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(default_config_path)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config_path();

    // Writing a fresh file must not depend on the current one parsing.
    if let Commands::Config {
        action: ConfigAction::Init { force },
    } = cli.command
    {
        return init_config(config_path.as_deref(), force);
    }

    let config = MedibookConfig::load_from(config_path.as_deref())?;
    logging::init(cli.json.then(|| config.data_dir()).as_deref())?;
    debug!(path = ?config_path, "Configuration ready");

    let location = cli.location()?;
    let app = App::open(config, location).await?;

    match cli.command {
        Commands::Search { query } => app.search(&query.join(" ")).await,
        Commands::Nearby => app.nearby().await,
        Commands::Favorites { action } => match action {
            FavoritesAction::List => app.favorites_list().await,
            FavoritesAction::Add { doctor, dispensary } => {
                app.favorites_add(&doctor, &dispensary).await
            }
            FavoritesAction::Remove { id } => app.favorites_remove(&id).await,
        },
        Commands::Login { mobile } => app.login(&mobile).await,
        Commands::Resend { mobile } => app.resend(&mobile).await,
        Commands::Verify { mobile, otp } => app.verify(&mobile, &otp).await,
        Commands::Register {
            mobile,
            name,
            email,
        } => {
            app.register(&Registration {
                name,
                mobile,
                email,
                password: None,
            })
            .await
        }
        Commands::Logout => app.logout().await,
        Commands::Whoami => {
            app.whoami();
            Ok(())
        }
        Commands::Slots { doctor, dispensary } => app.slots(&doctor, &dispensary).await,
        Commands::Fees { doctor, dispensary } => app.fees(&doctor, &dispensary).await,
        Commands::Book {
            doctor,
            dispensary,
            slot,
            name,
            phone,
        } => {
            app.book(&Booking {
                doctor_id: doctor,
                dispensary_id: dispensary,
                slot,
                name,
                phone,
            })
            .await
        }
        Commands::Summary { transaction_id } => app.summary(&transaction_id).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => app.show_config(),
            ConfigAction::Init { force } => init_config(config_path.as_deref(), force),
        },
    }
}

fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let path = path.context("No configuration directory; pass --config")?;
    app::init_config(path, force)
}
