use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tallyman::config::Config;
use tallyman::storage::Storage;

#[derive(Parser)]
#[command(name = "tallyman")]
#[command(about = "Storage and reporting backend for multi-brand order data", long_about = None)]
struct Cli {
    /// Data directory (defaults to TALLYMAN_DATA_DIR or the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and stores
    Init,

    /// Print the resolved data directory
    DataDir,

    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage brands
    Brand {
        #[command(subcommand)]
        command: BrandCommands,
    },

    /// Import an orders report file for a brand
    Import {
        brand_id: String,
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user account
    Add {
        username: String,
        #[arg(long)]
        password: String,
    },

    /// Reset a user's password
    Reset {
        username: String,
        #[arg(long)]
        password: String,
    },

    /// List usernames
    List,
}

#[derive(Subcommand)]
enum BrandCommands {
    /// Register a brand and provision its order database
    Add {
        display_name: String,
        /// Brand id; derived from the display name when omitted
        #[arg(long)]
        id: Option<String>,
    },

    /// List registered brands
    List,

    /// Delete a brand (its data directory is archived, not destroyed)
    Rm { brand_id: String },
}

fn resolve_config(data_dir: Option<PathBuf>) -> anyhow::Result<Config> {
    match data_dir {
        Some(dir) => Ok(Config::with_data_dir(dir)),
        None => Ok(Config::from_env()?),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tallyman=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.data_dir)?;

    match cli.command {
        Commands::Init => {
            let storage = Storage::open(config)?;
            info!("initialized data directory");
            println!("Initialized data directory at {}", storage.data_dir().display());
        }
        Commands::DataDir => {
            println!("{}", config.data_dir.display());
        }
        Commands::User { command } => {
            let storage = Storage::open(config)?;
            match command {
                UserCommands::Add { username, password } => {
                    let user = storage.create_user(&username, &password)?;
                    println!("Created user '{}'", user.username);
                }
                UserCommands::Reset { username, password } => {
                    storage.reset_password(&username, &password)?;
                    println!("Password reset for '{username}'");
                }
                UserCommands::List => {
                    for user in storage.list_users()? {
                        println!("{}", user.username);
                    }
                }
            }
        }
        Commands::Brand { command } => {
            let storage = Storage::open(config)?;
            match command {
                BrandCommands::Add { display_name, id } => {
                    let entry = storage.create_brand(&display_name, id.as_deref())?;
                    println!("Created brand '{}' ({})", entry.brand_id, entry.display_name);
                }
                BrandCommands::List => {
                    let mut brands = storage.list_brands()?;
                    brands.sort_by(|a, b| a.brand_id.cmp(&b.brand_id));
                    for brand in brands {
                        println!("{}\t{}", brand.brand_id, brand.display_name);
                    }
                }
                BrandCommands::Rm { brand_id } => {
                    storage.delete_brand(&brand_id)?;
                    println!("Deleted brand '{brand_id}' (data archived)");
                }
            }
        }
        Commands::Import { brand_id, file } => {
            let storage = Storage::open(config)?;

            let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
                bail!("report path has no usable file name: {}", file.display());
            };
            let data = tokio::fs::read(&file).await?;

            let staged = storage.stage_upload(&data, name).await?;
            let record = storage.commit_upload(staged, &brand_id).await?;
            println!(
                "Imported {} rows for '{brand_id}', archived to {}",
                record.row_count, record.archived_path
            );
        }
    }

    Ok(())
}
