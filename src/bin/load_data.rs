//! CLI tool for reference data and user roles.
//!
//! Usage:
//! - `load-data [--config <config.yml>] tags|ingredients <file.json>`
//! - `load-data [--config <config.yml>] role <email> user|moderator|admin`
//!
//! - tags: `[{"name": "Breakfast", "slug": "breakfast"}, ...]`
//! - ingredients: `[{"name": "flour", "measurement_unit": "g"}, ...]`
//!
//! Existing entries are skipped, so the import can be re-run safely.
//!
//! The tool runs with its own in-memory cache. A running server keeps
//! serving its cached tag and ingredient lists until `cache.ttl_seconds`
//! passes; call `POST /api/admin/cache/clear` after an import to refresh
//! them at once.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foodgram::{
    cache::{create_cache, Cache},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxFollowRepository, SqlxIngredientRepository, SqlxTagRepository, SqlxTokenRepository,
            SqlxUserRepository,
        },
        DynDatabasePool,
    },
    models::{CreateIngredientInput, CreateTagInput, User, UserRole},
    services::{ImportSummary, IngredientService, TagService, UserService},
};

const USAGE: &str = "usage: load-data [--config <config.yml>] tags|ingredients <file.json>\n       \
                     load-data [--config <config.yml>] role <email> user|moderator|admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dataset {
    Tags,
    Ingredients,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Import { dataset: Dataset, file: PathBuf },
    Role { email: String, role: UserRole },
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    command: Command,
    config: PathBuf,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut config = PathBuf::from("config.yml");
    let mut positional = Vec::new();

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            config = args.next().map(PathBuf::from).context(USAGE)?;
        } else {
            positional.push(arg);
        }
    }

    let command = match positional.as_slice() {
        [dataset, file] => {
            let dataset = match dataset.as_str() {
                "tags" => Dataset::Tags,
                "ingredients" => Dataset::Ingredients,
                other => bail!("unknown dataset '{}'\n{}", other, USAGE),
            };
            Command::Import {
                dataset,
                file: PathBuf::from(file),
            }
        }
        [command, email, role] if command == "role" => Command::Role {
            email: email.clone(),
            role: role.parse().with_context(|| USAGE.to_string())?,
        },
        _ => bail!(USAGE),
    };

    Ok(Args { command, config })
}

fn read_items<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

async fn import(dataset: Dataset, file: &Path, pool: DynDatabasePool, cache: Arc<Cache>) -> Result<ImportSummary> {
    let summary = match dataset {
        Dataset::Tags => {
            let items: Vec<CreateTagInput> = read_items(file)?;
            TagService::new(SqlxTagRepository::boxed(pool), cache)
                .import(items)
                .await?
        }
        Dataset::Ingredients => {
            let items: Vec<CreateIngredientInput> = read_items(file)?;
            IngredientService::new(SqlxIngredientRepository::boxed(pool), cache)
                .import(items)
                .await?
        }
    };
    Ok(summary)
}

async fn assign_role(email: &str, role: UserRole, pool: DynDatabasePool) -> Result<User> {
    let users = UserService::new(
        SqlxUserRepository::boxed(pool.clone()),
        SqlxTokenRepository::boxed(pool.clone()),
        SqlxFollowRepository::boxed(pool),
    );
    let user = users.get_by_email(email).await?;
    Ok(users.set_role(user.id, role).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodgram=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = parse_args(std::env::args().skip(1))?;

    let config = Config::load_with_env(&args.config)?;
    config.validate()?;

    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    match args.command {
        Command::Import { dataset, file } => {
            let cache = create_cache(&config.cache)?;
            let summary = import(dataset, &file, pool, cache).await?;
            println!("Created {}, skipped {}", summary.created, summary.skipped);
        }
        Command::Role { email, role } => {
            let user = assign_role(&email, role, pool).await?;
            println!("{} is now {}", user.username, user.role);
        }
    }

    Ok(())
}
