//! legacysms CLI - operator tool for the legacy SMS link store

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use legacysms::config::{self, LegacySmsConfig};
use legacysms::storage::LinkStore;
use legacysms::{ui, LegacyId, LinkKind, OwnedRef, UpsertOutcome};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "legacysms")]
#[command(version)]
#[command(about = "Legacy SMS link store - map legacy SMS ids to media platform entities")]
#[command(long_about = r#"
legacysms keeps the correspondence between ids from the legacy SMS system
and the collections and media items owned by the media platform.

Example usage:
  legacysms register --kind collection c1
  legacysms upsert --kind collection --legacy-id 42 --synced-at now --owned c1
  legacysms lookup --kind collection --legacy-id 42
  legacysms delete-owned --kind collection c1
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the database file (overrides legacysms.toml)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a legacysms.toml config file
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,

        /// Busy timeout in milliseconds for concurrent writers
        #[arg(long)]
        busy_timeout_ms: Option<u64>,
    },

    /// Create or refresh a link row
    Upsert {
        /// Link kind (collection, media_item)
        #[arg(short, long)]
        kind: LinkKind,

        /// Legacy SMS id
        #[arg(short, long)]
        legacy_id: i64,

        /// Last sync time (RFC 3339 or "now")
        #[arg(short, long)]
        synced_at: Option<String>,

        /// Owned entity id to link to
        #[arg(short, long)]
        owned: Option<String>,
    },

    /// Detach an owned entity from its link row
    Clear {
        #[arg(short, long)]
        kind: LinkKind,

        /// Owned entity id
        owned: String,
    },

    /// Look up a link by legacy id or owned entity
    Lookup {
        #[arg(short, long)]
        kind: LinkKind,

        #[arg(short, long, conflicts_with = "owned", required_unless_present = "owned")]
        legacy_id: Option<i64>,

        #[arg(short, long)]
        owned: Option<String>,
    },

    /// List link rows
    List {
        #[arg(short, long)]
        kind: LinkKind,

        /// Only rows without an owned entity
        #[arg(long)]
        orphans: bool,
    },

    /// Register an owned entity
    Register {
        #[arg(short, long)]
        kind: LinkKind,

        /// Owned entity id
        owned: String,
    },

    /// Delete an owned entity, orphaning its link row
    DeleteOwned {
        #[arg(short, long)]
        kind: LinkKind,

        /// Owned entity id
        owned: String,
    },

    /// Show link statistics
    Stats,
}

fn parse_synced_at(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    if raw.eq_ignore_ascii_case("now") {
        return Ok(Utc::now());
    }
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| anyhow::anyhow!("invalid --synced-at {:?}: {}", raw, e))?;
    Ok(parsed.with_timezone(&Utc))
}

fn open_store(cli_database: Option<&Path>, cfg: &LegacySmsConfig) -> anyhow::Result<LinkStore> {
    let path = cli_database
        .map(Path::to_path_buf)
        .or_else(|| cfg.database.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| config::default_database_path_in(Path::new(".")));

    config::ensure_db_dir(&path)?;
    tracing::debug!("Using database {}", path.display());
    Ok(LinkStore::open_with(&path, &cfg.store_options())?)
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(err) = run(cli) {
        ui::error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

fn run_init(cli_database: Option<&Path>, config_path: &Path, force: bool, busy_timeout_ms: Option<u64>, json: bool) -> anyhow::Result<()> {
    let database = cli_database
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config::default_database_path_in(Path::new(".")));
    let cfg = LegacySmsConfig {
        database: Some(database.display().to_string()),
        busy_timeout_ms,
    };
    config::write_config(config_path, &cfg, force)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
    } else {
        ui::success(&format!("Wrote {}", config_path.display()));
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    let command = match cli.command {
        Commands::Init { force, busy_timeout_ms } => {
            return run_init(cli.database.as_deref(), &config_path, force, busy_timeout_ms, cli.json);
        }
        command => command,
    };

    let cfg = config::load_config(Some(&config_path))?.unwrap_or_default();
    let mut store = open_store(cli.database.as_deref(), &cfg)?;

    match command {
        Commands::Init { .. } => {}

        Commands::Upsert { kind, legacy_id, synced_at, owned } => {
            let legacy_id = LegacyId::new(legacy_id)?;
            let synced_at = synced_at.as_deref().map(parse_synced_at).transpose()?;
            let owned = owned.map(OwnedRef::new).transpose()?;

            let outcome = store.upsert_link(kind, legacy_id, synced_at, owned.as_ref())?;
            let link = store.require_by_legacy_id(kind, legacy_id)?;

            if cli.json {
                let data = serde_json::json!({ "outcome": outcome, "link": link });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                match outcome {
                    UpsertOutcome::Created => ui::success(&format!("Created {} link {}", kind, legacy_id)),
                    UpsertOutcome::Updated => ui::success(&format!("Updated {} link {}", kind, legacy_id)),
                }
                ui::link_line(&link);
            }
        }

        Commands::Clear { kind, owned } => {
            let owned = OwnedRef::new(owned)?;
            let cleared = store.clear_owned_ref(kind, &owned)?;

            if cli.json {
                println!("{}", serde_json::json!({ "cleared": cleared }));
            } else if cleared == 0 {
                ui::warn(&format!("No {} link references {}", kind, owned));
            } else {
                ui::success(&format!("Cleared {} {}", kind, owned));
            }
        }

        Commands::Lookup { kind, legacy_id, owned } => {
            let link = match (legacy_id, owned) {
                (Some(id), _) => store.lookup_by_legacy_id(kind, LegacyId::new(id)?)?,
                (None, Some(owned)) => store.lookup_by_owned_ref(kind, &OwnedRef::new(owned)?)?,
                (None, None) => anyhow::bail!("either --legacy-id or --owned is required"),
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&link)?);
            } else {
                match link {
                    Some(link) => ui::link_line(&link),
                    None => ui::warn("Not found"),
                }
            }
        }

        Commands::List { kind, orphans } => {
            let links = if orphans { store.list_orphans(kind)? } else { store.list_links(kind)? };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&links)?);
            } else if links.is_empty() {
                ui::warn(&format!("No {} links", kind));
            } else {
                ui::header(&format!("{} {} link(s)", links.len(), kind));
                println!("{}", ui::links_table(&links));
            }
        }

        Commands::Register { kind, owned } => {
            let owned = OwnedRef::new(owned)?;
            let created = store.register_owned(kind, &owned)?;

            if cli.json {
                println!("{}", serde_json::json!({ "registered": created }));
            } else if created {
                ui::success(&format!("Registered {} {}", kind, owned));
            } else {
                ui::info(&format!("{} already registered", kind), owned.as_str());
            }
        }

        Commands::DeleteOwned { kind, owned } => {
            let owned = OwnedRef::new(owned)?;
            let deleted = store.delete_owned(kind, &owned)?;

            if cli.json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else if deleted {
                ui::success(&format!("Deleted {} {}", kind, owned));
            } else {
                ui::warn(&format!("{} {} was not registered", kind, owned));
            }
        }

        Commands::Stats => {
            let stats = store.stats()?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                ui::section("Legacy SMS Links");
                println!("{}", ui::stats_table(&stats));
            }
        }
    }

    Ok(())
}
