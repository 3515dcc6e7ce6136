use bcrypt::{hash, DEFAULT_COST};
use chrono::Utc;
use clap::{Parser, Subcommand};
use fitbase_backend::config::Config;
use fitbase_backend::models::{Role, User};
use fitbase_backend::setup::cache_setup;
use fitbase_backend::store::local::{LocalCache, USERS_KEY};
use rand::RngCore;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial application setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Creates the cache database and seeds first-run defaults.
    Setup,
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
    },
    List,
}

#[derive(Subcommand, Debug)]
enum SecretAction {
    /// Prints a fresh SESSION_SECRET_KEY value.
    Generate,
}

fn main() {
    let cli = Cli::parse();

    // Secret generation needs no configuration at all.
    if let Commands::Secret {
        action: SecretAction::Generate,
    } = &cli.command
    {
        generate_secret();
        return;
    }

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    match &cli.command {
        Commands::Cache { action } => match action {
            CacheAction::Setup => setup_cache(&config),
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                password,
                name,
            } => create_admin_user(&config, email, password, name),
            AdminAction::List => list_admin_users(&config),
        },
        Commands::Secret { .. } => unreachable!("handled above"),
    }
}

fn open_cache(config: &Config) -> Option<LocalCache> {
    if let Err(e) = fs::create_dir_all(&config.cache_path) {
        eprintln!("❌ Error: Could not create cache directory: {}", e);
        return None;
    }
    match LocalCache::open(&config.cache_db_path()) {
        Ok(cache) => Some(cache),
        Err(e) => {
            eprintln!("❌ Error: Could not open cache database: {}", e);
            None
        }
    }
}

fn setup_cache(config: &Config) {
    println!(
        "\nSetting up cache database at '{}'...",
        config.cache_db_path().display()
    );
    let Some(cache) = open_cache(config) else {
        return;
    };
    match cache_setup::initialize_cache(&cache) {
        Ok(_) => println!("✅ Cache setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up cache: {}", e),
    }
}

fn create_admin_user(config: &Config, email: &str, password: &str, name: &str) {
    let Some(cache) = open_cache(config) else {
        return;
    };
    let mut users: Vec<User> = match cache.read_collection(USERS_KEY) {
        Ok(users) => users.unwrap_or_default(),
        Err(e) => {
            eprintln!("❌ Error reading user list: {}", e);
            return;
        }
    };

    if users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
        eprintln!("❌ Error: A user with email '{}' already exists.", email);
        return;
    }

    let password_hash = hash(password, DEFAULT_COST).expect("Failed to hash password");
    let now = Utc::now();
    users.push(User {
        id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        name: name.to_string(),
        role: Role::Admin,
        avatar: None,
        active: true,
        created_at: now,
        updated_at: now,
        last_login_at: None,
        password_hash: Some(password_hash),
    });

    match cache.write_collection(USERS_KEY, &users) {
        Ok(_) => println!("✅ Admin user '{}' created successfully.", email),
        Err(e) => eprintln!("❌ Error creating admin user: {}", e),
    }
}

fn list_admin_users(config: &Config) {
    let Some(cache) = open_cache(config) else {
        return;
    };
    let users: Vec<User> = match cache.read_collection(USERS_KEY) {
        Ok(Some(users)) => users,
        Ok(None) => {
            println!("No users found. Run `setup_cli cache setup` first.");
            return;
        }
        Err(e) => {
            eprintln!("❌ Error reading user list: {}", e);
            return;
        }
    };

    println!("Listing Admin Users:");
    for user in users.iter().filter(|u| u.role == Role::Admin) {
        println!("- {} ({})", user.email, user.name);
    }
}

fn generate_secret() {
    let mut bytes = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut bytes);
    println!("SESSION_SECRET_KEY={}", hex::encode(bytes));
}
