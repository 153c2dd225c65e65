use clap::Parser;
use fundline::{
    auth::AuthService,
    config::Settings,
    domain::{normalize_contact, NewUser, Role},
    repository::{SqliteUserRepository, UserRepository},
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

/// Creates the first admin account.
#[derive(Debug, Parser)]
#[command(name = "seed", about = "Create an admin user.", version)]
struct Cli {
    /// Admin email address
    #[arg(long)]
    email: String,
    /// Initial password
    #[arg(long)]
    password: String,
    /// Display name
    #[arg(long, default_value = "Administrator")]
    name: String,
    /// Database URL, defaults to the configured one
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let database_url = match cli.database_url {
        Some(url) => url,
        None => Settings::new().unwrap_or_default().database.url,
    };

    println!("🌱 Seeding {}", database_url);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true))
        .await?;

    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let user_repo = SqliteUserRepository::new(db_pool.clone());
    let email = normalize_contact(&cli.email);

    if let Some(existing) = user_repo.find_by_identifier(&email).await? {
        println!(
            "  ℹ️  {} already exists (role: {})",
            email,
            existing.role.as_str()
        );
        return Ok(());
    }

    if cli.password.len() < 8 {
        anyhow::bail!("Password must be at least 8 characters");
    }

    let password_hash = AuthService::hash_password(&cli.password).await?;
    let admin = user_repo
        .create(NewUser {
            full_name: cli.name,
            email: Some(email.clone()),
            phone: None,
            password_hash,
            role: Role::Admin,
        })
        .await?;

    println!("  ✅ Created admin user {} ({})", email, admin.id);

    Ok(())
}
