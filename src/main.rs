use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use casefile::auth::{generate_token, hash_token};
use casefile::cases::CaseService;
use casefile::config::ServerConfig;
use casefile::documents::{DocumentIndex, FsBlobStore};
use casefile::notify::{Dispatcher, LogMailer};
use casefile::server::{AppState, create_router};
use casefile::store::{SqliteStore, Store};
use casefile::types::{Role, UserProfile};

fn new_profile(email: String, full_name: Option<String>, role: Role) -> (UserProfile, String) {
    let raw_token = generate_token();
    let now = Utc::now();
    let profile = UserProfile {
        user_id: Uuid::new_v4().to_string(),
        email,
        full_name,
        role,
        is_active: true,
        token_hash: hash_token(&raw_token),
        created_at: now,
        updated_at: now,
    };
    (profile, raw_token)
}

#[cfg(unix)]
fn set_restrictive_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "casefile")]
#[command(about = "A case management server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Path to a casefile.toml. Flags below override values from the file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for database and document blobs
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Public base URL for case links in notification mail
        /// (e.g., "https://cases.example.com"). If not set, mail carries no link.
        #[arg(long)]
        public_base_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and admin account)
    Init {
        /// Data directory for database and document blobs
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },
}

fn email_validator(
    input: &str,
) -> Result<inquire::validator::Validation, inquire::CustomUserError> {
    if input.trim().is_empty() {
        Err("Email cannot be empty".into())
    } else if !input.contains('@') {
        Err("Email must contain '@'".into())
    } else {
        Ok(inquire::validator::Validation::Valid)
    }
}

fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let data_path: PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let db_path = data_path.join("casefile.db");
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    let token_file = data_path.join(".admin_token");

    if store.has_admin_profile()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let email = if non_interactive {
        "admin@localhost".to_string()
    } else {
        inquire::Text::new("Admin email:")
            .with_default("admin@localhost")
            .with_validator(email_validator)
            .prompt()?
            .trim()
            .to_lowercase()
    };

    let (profile, raw_token) = new_profile(email, None, Role::Admin);
    store.create_profile(&profile)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    if !non_interactive {
        create_investigator_prompt(&store)?;
    }

    Ok(())
}

fn create_investigator_prompt(store: &SqliteStore) -> anyhow::Result<()> {
    let create_user = inquire::Confirm::new("Would you like to create an investigator account?")
        .with_default(false)
        .prompt()?;

    if !create_user {
        return Ok(());
    }

    let email = inquire::Text::new("Email:")
        .with_validator(email_validator)
        .prompt()?
        .trim()
        .to_lowercase();
    let full_name = inquire::Text::new("Full name (optional):").prompt()?;
    let full_name = Some(full_name.trim().to_string()).filter(|s| !s.is_empty());

    let (profile, raw_token) = new_profile(email, full_name, Role::Investigator);
    store.create_profile(&profile)?;

    println!();
    println!("========================================");
    println!("Created investigator '{}' with token:", profile.email);
    println!();
    println!("  {raw_token}");
    println!();
    println!("========================================");
    println!();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("casefile=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => {
                run_init(data_dir, non_interactive)?;
            }
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            public_base_url,
        } => {
            let mut config = match config {
                Some(path) => ServerConfig::load(&path)?,
                None => ServerConfig::default(),
            };
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir;
            }
            if let Some(public_base_url) = public_base_url {
                config.public_base_url = Some(public_base_url);
            }

            let token_file = config.data_dir.join(".admin_token");
            if !token_file.exists() {
                bail!(
                    "Server not initialized. Run 'casefile admin init' first to create the database and admin account."
                );
            }

            let store = SqliteStore::new(config.db_path())?;
            if !store.has_admin_profile()? {
                bail!(
                    "Server not initialized. Run 'casefile admin init' first to create the database and admin account."
                );
            }

            info!("Admin token available at {}", token_file.display());

            let store: Arc<dyn Store> = Arc::new(store);
            let dispatcher = Arc::new(
                Dispatcher::new(store.clone(), Arc::new(LogMailer))
                    .with_send_timeout(Duration::from_secs(config.notify_send_timeout_secs))
                    .with_public_base_url(config.public_base_url.clone()),
            );

            let state = Arc::new(AppState {
                store: store.clone(),
                cases: CaseService::new(store.clone()),
                documents: DocumentIndex::new(
                    store,
                    Arc::new(FsBlobStore::new(&config.data_dir)),
                ),
                dispatcher,
            });

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
