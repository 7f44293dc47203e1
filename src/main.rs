use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use duorou::catalog::{build_client, CatalogError};
use duorou::config::Config;
use duorou::projection::CategoryFilter;
use duorou::storage::{Database, DatabaseError};
use duorou::surface::{Services, Surface, SurfaceError, SurfaceKind};
use duorou::theme::{FontSize, ThemeName};
use duorou::user_state::PreferencesPatch;

mod render;

/// Get the config directory path (~/.config/duorou/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("duorou");
    Ok(config_dir)
}

#[derive(Parser, Debug)]
#[command(name = "duorou", about = "Succulent plant catalog with offline cache and bookmarks")]
struct Args {
    /// Config file (default: ~/.config/duorou/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Home feed: banners and all plants (default)
    Feed {
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Category overview with counts
    Categories,
    /// Plants in one category ("all" and "uncategorized" are synthetic)
    List {
        category: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Search titles, categories, descriptions, tags and article titles
    Search {
        keyword: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Show one plant
    Show { id: String },
    /// Bookmarked plants
    Collection {
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Toggle a bookmark
    Collect { id: String },
    /// Remove a bookmark (no-op when absent)
    Uncollect { id: String },
    /// Remove all bookmarks
    ClearCollection,
    /// Show or change display settings
    Settings {
        #[arg(long, value_parser = parse_theme)]
        theme: Option<ThemeName>,
        #[arg(long, value_parser = parse_font_size)]
        font_size: Option<FontSize>,
    },
    /// Fetch the catalog now, ignoring the cache TTL
    Refresh,
    /// Drop the cached catalog
    ClearCache,
    /// Carousel items of the home feed
    Banners,
}

fn parse_theme(s: &str) -> std::result::Result<ThemeName, String> {
    ThemeName::from_str_name(s)
        .ok_or_else(|| format!("unknown theme '{s}' (green, blue, pink, purple, dark)"))
}

fn parse_font_size(s: &str) -> std::result::Result<FontSize, String> {
    FontSize::from_str_name(s).ok_or_else(|| format!("unknown font size '{s}' (small, medium, large)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(&config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let db_path = config_dir.join("duorou.db");
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of duorou appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let client = build_client().context("Failed to create HTTP client")?;
    let services = Services::new(db.clone(), client, &config);

    let command = args.command.unwrap_or(Command::Feed { page: 1 });
    let result = run(command, services).await;
    db.close().await;

    match result {
        Err(SurfaceError::Catalog(CatalogError::DataUnavailable(cause))) => {
            eprintln!("数据加载失败: no cached catalog and the fetch failed ({cause}).");
            eprintln!("Check your connection and retry with: duorou refresh");
            std::process::exit(1);
        }
        Err(SurfaceError::EntryNotFound(id)) => {
            eprintln!("Error: no plant with id {id}");
            std::process::exit(1);
        }
        result => result.context("Command failed"),
    }
}

async fn run(command: Command, services: Services) -> Result<(), SurfaceError> {
    let mut out = std::io::stdout().lock();

    match command {
        Command::Feed { page } => {
            let mut surface = activate(SurfaceKind::Feed, services).await?;
            let banners = surface.banners().await;
            print(|| {
                render::banners(&mut out, &banners)?;
                writeln!(out)?;
                render::entries(&mut out, &surface.rows(page), None)
            });
            finish(&mut surface).await;
        }
        Command::Categories => {
            let mut surface = activate(SurfaceKind::Categories, services).await?;
            print(|| render::categories(&mut out, &surface.categories()));
            finish(&mut surface).await;
        }
        Command::List { category, page } => {
            let kind = SurfaceKind::List(CategoryFilter::parse(&category));
            let mut surface = activate(kind, services).await?;
            print(|| render::entries(&mut out, &surface.rows(page), None));
            finish(&mut surface).await;
        }
        Command::Search { keyword, page } => {
            let mut surface = activate(SurfaceKind::Search(keyword.clone()), services).await?;
            print(|| render::entries(&mut out, &surface.rows(page), Some(&keyword)));
            finish(&mut surface).await;
        }
        Command::Show { id } => {
            let mut surface = activate(SurfaceKind::Detail(id.clone()), services).await?;
            let row = surface.detail().ok_or(SurfaceError::EntryNotFound(id))?;
            print(|| render::detail(&mut out, &row));
            finish(&mut surface).await;
        }
        Command::Collection { page } => {
            let surface = activate(SurfaceKind::Collection, services).await?;
            print(|| render::entries(&mut out, &surface.rows(page), None));
        }
        Command::Collect { id } => {
            let mut surface = activate(SurfaceKind::Detail(id.clone()), services).await?;
            let collected = surface.toggle_collection(&id).await?;
            println!("{} {id}", if collected { "★ collected" } else { "☆ removed" });
            finish(&mut surface).await;
        }
        Command::Uncollect { id } => {
            let mut surface = activate(SurfaceKind::Collection, services).await?;
            surface.remove_from_collection(&id).await?;
            println!("☆ {id} ({} collected)", surface.collection().len());
        }
        Command::ClearCollection => {
            let mut surface = activate(SurfaceKind::Collection, services).await?;
            surface.clear_collection().await?;
            println!("Collection cleared.");
        }
        Command::Settings { theme, font_size } => {
            let mut surface = activate(SurfaceKind::Settings, services).await?;
            let patch = PreferencesPatch {
                theme_name: theme,
                font_size,
            };
            if !patch.is_empty() {
                surface.update_preferences(patch).await?;
            }
            print(|| render::settings(&mut out, surface.display()));
        }
        Command::Refresh => {
            let mut surface = Surface::new(SurfaceKind::Feed, services);
            surface.refresh().await?;
            header(&surface);
            match surface.snapshot() {
                Some(snapshot) if !surface.is_stale() => println!(
                    "Catalog {} ({} plants) fetched.",
                    snapshot.version,
                    snapshot.entries.len()
                ),
                Some(snapshot) => println!(
                    "Fetch failed; keeping cached catalog {} from {}.",
                    snapshot.version,
                    snapshot.fetched_at.format("%Y-%m-%d %H:%M")
                ),
                None => {}
            }
        }
        Command::ClearCache => {
            let mut surface = Surface::new(SurfaceKind::Settings, services);
            surface.clear_cache().await?;
            println!("Catalog cache cleared.");
        }
        Command::Banners => {
            let surface = Surface::new(SurfaceKind::Feed, services);
            let banners = surface.banners().await;
            print(|| render::banners(&mut out, &banners));
        }
    }

    Ok(())
}

/// Build and activate a surface, then print its header.
async fn activate(kind: SurfaceKind, services: Services) -> Result<Surface, SurfaceError> {
    let mut surface = Surface::new(kind, services);
    surface.activate().await?;
    header(&surface);
    Ok(surface)
}

fn header(surface: &Surface) {
    let mut out = std::io::stdout();
    print(|| {
        render::header(&mut out, surface.display(), &surface.kind().title())?;
        if surface.is_stale() {
            render::stale_notice(&mut out)?;
        }
        Ok(())
    });
}

/// Let a background revalidation land before the process exits.
async fn finish(surface: &mut Surface) {
    if let Some(outcome) = surface.settle().await {
        tracing::debug!(outcome = ?outcome, "Background revalidation finished");
    }
}

/// Broken pipes (`duorou feed | head`) end output quietly.
fn print(f: impl FnOnce() -> std::io::Result<()>) {
    if let Err(e) = f() {
        tracing::debug!(error = %e, "Output write failed");
    }
}
