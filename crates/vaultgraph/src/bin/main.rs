//! vaultgraph CLI

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use vaultgraph::KnowledgeBase;
use vaultgraph_core::{ConfigProfile, EngineConfig, NoteId, ScanProgress, VaultId};
use vaultgraph_vault::ProgressFn;

/// Knowledge graph analytics for markdown vaults
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file (defaults are used when it does not exist)
    #[arg(short, long, env = "VAULTGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Configuration profile used when no config file is given
    #[arg(short, long, default_value = "production")]
    profile: String,

    /// Override the database location
    #[arg(long, env = "VAULTGRAPH_DB")]
    database: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a vault, then resolve references and compute metrics
    Scan {
        path: PathBuf,
        #[arg(short, long)]
        name: Option<String>,
        /// Only ingest; skip resolution and metrics
        #[arg(long, action = clap::ArgAction::SetTrue)]
        no_analyze: bool,
    },
    /// Re-run resolution, metrics and clustering for a registered vault
    Analyze { vault: String },
    /// Print statistics, hubs, orphans and broken references
    Report {
        vault: String,
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// List registered vaults
    Vaults,
    /// Find vault directories below a root
    Discover { root: PathBuf },
    /// Print the notes and links around a note
    Neighborhood {
        /// Note id
        note: String,
        /// Hops to follow in either direction (defaults to the configured radius)
        #[arg(short, long)]
        radius: Option<usize>,
    },
    /// Remove a vault and everything recorded for it
    Delete { vault: String },
}

async fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .await
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => match ConfigProfile::parse(&args.profile) {
            Some(profile) => profile.create_config(),
            None => bail!("unknown profile '{}'", args.profile),
        },
    };
    if let Some(database) = &args.database {
        config.database_path = Some(database.clone());
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_ascii_lowercase()));
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("vaultgraph: logging unavailable: {}", e);
    }
}

/// Accept either a vault id or the vault's directory
fn resolve_vault(kb: &KnowledgeBase, key: &str) -> Result<VaultId> {
    let id = VaultId::from(key);
    if kb.store().get_vault(&id)?.is_some() {
        return Ok(id);
    }
    let path = Path::new(key)
        .canonicalize()
        .with_context(|| format!("no vault with id or path '{}'", key))?;
    match kb.store().get_vault_by_path(&path)? {
        Some(vault) => Ok(vault.id),
        None => bail!("vault at {} has not been scanned", path.display()),
    }
}

fn emit<T: Serialize + std::fmt::Debug>(json: bool, label: &str, value: &T) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}: {:#?}", label, value);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args).await?;
    init_logging(&config.log_level);

    log::info!("vaultgraph v{}", env!("CARGO_PKG_VERSION"));
    let kb = KnowledgeBase::open(config).context("opening knowledge base")?;

    match &args.command {
        Command::Scan {
            path,
            name,
            no_analyze,
        } => {
            let report = |p: ScanProgress| log::info!("Scanned {}/{} files", p.processed, p.total);
            let progress: ProgressFn<'_> = &report;
            let stats = kb.ingest(path, name.as_deref(), Some(progress)).await?;
            emit(args.json, "scan", &stats)?;

            if let (false, Some(vault_id)) = (*no_analyze, &stats.vault_id) {
                let report = kb.analyze_vault(vault_id)?;
                emit(args.json, "analysis", &report)?;
            }
        }
        Command::Analyze { vault } => {
            let vault_id = resolve_vault(&kb, vault)?;
            emit(args.json, "analysis", &kb.analyze_vault(&vault_id)?)?;
        }
        Command::Report { vault, limit } => {
            let vault_id = resolve_vault(&kb, vault)?;
            emit(args.json, "stats", &kb.vault_stats(&vault_id)?)?;
            emit(args.json, "links", &kb.link_distribution(&vault_id)?)?;
            emit(args.json, "tags", &kb.tag_stats(&vault_id, Some(*limit))?)?;
            emit(args.json, "hubs", &kb.get_hub_notes(&vault_id, *limit)?)?;
            emit(args.json, "orphans", &kb.get_orphan_notes(&vault_id, Some(*limit))?)?;
            emit(
                args.json,
                "broken",
                &kb.get_broken_references(&vault_id, Some(*limit))?,
            )?;
        }
        Command::Vaults => emit(args.json, "vaults", &kb.list_vaults()?)?,
        Command::Discover { root } => emit(args.json, "vaults", &kb.discover_vaults(root)?)?,
        Command::Neighborhood { note, radius } => {
            let graph = kb.get_neighborhood(&NoteId::from(note.as_str()), *radius)?;
            let nodes: Vec<_> = graph.nodes().cloned().collect();
            let edges: Vec<_> = graph
                .edges()
                .map(|(source, target)| (source.clone(), target.clone()))
                .collect();
            emit(args.json, "nodes", &nodes)?;
            emit(args.json, "edges", &edges)?;
        }
        Command::Delete { vault } => {
            let vault_id = resolve_vault(&kb, vault)?;
            kb.delete_vault(&vault_id)?;
            println!("deleted {}", vault_id);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_logging_init_is_reported_not_fatal() {
        init_logging("warn");
        init_logging("debug");
    }

    #[test]
    fn test_neighborhood_radius_is_optional() {
        let args = Args::try_parse_from(["vaultgraph", "neighborhood", "abc123"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Neighborhood { ref note, radius: None } if note == "abc123"
        ));

        let args =
            Args::try_parse_from(["vaultgraph", "neighborhood", "abc123", "--radius", "3"]).unwrap();
        assert!(matches!(args.command, Command::Neighborhood { radius: Some(3), .. }));
    }
}
