//! Command-line surface and the wiring behind each command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docgen::{
    BatchPolicy, BoardContext, CategoryCache, DirectorySink, DocumentCatalog, FileStore,
    FillPipeline, Gateway, RenderOptions, SharedStore, TemplateEngine,
};
use tracing::info;

use crate::config::{parse_host_list, DocfillConfig};
use crate::diagnostics;
use crate::platform::CliPlatform;
use crate::relay::{self, RelayState};
use crate::relay_client::RelayClient;
use crate::session::{Session, SessionSettings};

/// Fill order templates with a case item's values.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML config file (lowest precedence after built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Graph API endpoint (overrides MONDAY_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// File relay base URL (overrides DOCFILL_RELAY_URL)
    #[arg(long, global = true)]
    pub relay_url: Option<String>,

    /// Key-value store file (overrides DOCFILL_STORE_PATH)
    #[arg(long, global = true)]
    pub store_path: Option<PathBuf>,

    /// Output directory for filled documents (overrides DOCFILL_OUTPUT_DIR)
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Order-type cache lifetime in seconds (overrides DOCFILL_CACHE_TTL_SECS)
    #[arg(long, global = true)]
    pub cache_ttl_secs: Option<u64>,

    /// abort | continue (overrides DOCFILL_BATCH_POLICY)
    #[arg(long, global = true, value_parser = parse_policy)]
    pub batch_policy: Option<BatchPolicy>,

    /// Keep `\n` in field values as text instead of line breaks
    #[arg(long, global = true, default_value_t = false)]
    pub no_linebreaks: bool,

    /// Debug logging for this app (RUST_LOG still wins)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the file relay server
    Serve {
        /// Listen address (overrides DOCFILL_BIND_ADDR)
        #[arg(long)]
        bind: Option<String>,

        /// Comma-separated hosts the relay may fetch from (overrides DOCFILL_ALLOWED_HOSTS)
        #[arg(long)]
        allowed_hosts: Option<String>,
    },
    /// List order types from the template board
    Categories {
        /// Ignore the cached list and fetch again
        #[arg(long, default_value_t = false)]
        refresh: bool,
    },
    /// List the documents attached to an order type
    Documents { category_id: String },
    /// Fill selected documents with an item's values
    Fill {
        /// Case item whose values are merged
        #[arg(long)]
        item: Option<String>,

        /// Board of the case item
        #[arg(long)]
        board: Option<String>,

        /// Document to fill, as <category-id>=<document name>; repeatable
        #[arg(long = "select", required = true, value_parser = parse_selection)]
        select: Vec<(String, String)>,
    },
    /// Manage the order-type cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Check storage and API connectivity
    Diagnose,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Delete the cached order types
    Clear,
}

fn parse_policy(raw: &str) -> Result<BatchPolicy, String> {
    raw.parse()
}

/// Parse `<category-id>=<document name>`.
pub fn parse_selection(raw: &str) -> Result<(String, String), String> {
    let (category, name) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <category-id>=<document name>, got '{raw}'"))?;
    let (category, name) = (category.trim(), name.trim());
    if category.is_empty() || name.is_empty() {
        return Err(format!("empty category id or document name in '{raw}'"));
    }
    Ok((category.to_string(), name.to_string()))
}

impl Cli {
    /// Apply flag overrides on top of a loaded config.
    pub fn apply_overrides(&self, config: &mut DocfillConfig) {
        if let Some(v) = &self.api_url {
            config.api_url = v.clone();
        }
        if let Some(v) = &self.relay_url {
            config.relay_url = v.clone();
        }
        if let Some(v) = &self.store_path {
            config.store_path = v.clone();
        }
        if let Some(v) = &self.output_dir {
            config.output_dir = v.clone();
        }
        if let Some(secs) = self.cache_ttl_secs {
            config.cache_ttl = Some(Duration::from_secs(secs));
        }
        if let Some(policy) = self.batch_policy {
            config.batch_policy = policy;
        }
        if self.no_linebreaks {
            config.linebreaks = false;
        }
        if let Command::Serve {
            bind,
            allowed_hosts,
        } = &self.command
        {
            if let Some(v) = bind {
                config.bind_addr = v.clone();
            }
            if let Some(v) = allowed_hosts {
                config.allowed_hosts = parse_host_list(v);
            }
        }
    }
}

fn gateway(config: &DocfillConfig) -> Result<Gateway> {
    Gateway::http(
        config.api_url.clone(),
        config.api_token.clone(),
        config.api_version.clone(),
    )
    .context("Failed to build graph client")
}

fn store(config: &DocfillConfig) -> SharedStore {
    FileStore::open(&config.store_path).shared()
}

fn session(config: &DocfillConfig, context: BoardContext) -> Result<Session> {
    let gateway = gateway(config)?;
    let pipeline = FillPipeline::new(
        gateway.clone(),
        Arc::new(RelayClient::new(config.relay_url.clone())),
        DirectorySink::new(&config.output_dir).shared(),
    )
    .with_policy(config.batch_policy)
    .with_engine(TemplateEngine::new(RenderOptions {
        linebreaks: config.linebreaks,
    }));
    let platform = Arc::new(CliPlatform::new(context, store(config)));
    let settings = SessionSettings {
        template_board: config.template_board.clone(),
        template_group: config.template_group.clone(),
        cache_ttl: config.cache_ttl,
    };
    Ok(Session::new(platform, gateway, pipeline, settings))
}

/// Execute the parsed command.
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = DocfillConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    info!(
        api = %config.api_url,
        relay = %config.relay_url,
        store = %config.store_path.display(),
        "tra-docfill starting"
    );

    match cli.command {
        Command::Serve { .. } => {
            let state = RelayState::new(config.allowed_hosts.clone())?;
            relay::serve(&config.bind_addr, state).await
        }
        Command::Categories { refresh } => {
            let mut session = session(&config, BoardContext::default())?;
            if refresh {
                session.mount_refreshed().await?;
            } else {
                session.mount().await?;
            }
            for category in session.categories() {
                println!("{}\t{}", category.id, category.name);
            }
            Ok(())
        }
        Command::Documents { category_id } => {
            let mut catalog = DocumentCatalog::new(gateway(&config)?);
            for entry in catalog.entries(&category_id).await? {
                let marker = if entry.fillable { "docx" } else { "-" };
                println!("{marker}\t{}", entry.name);
            }
            Ok(())
        }
        Command::Fill {
            item,
            board,
            select,
        } => {
            let context = BoardContext {
                board_id: board,
                item_id: item,
            };
            let mut session = session(&config, context)?;
            session.mount().await?;
            if let Some(message) = session.last_error() {
                bail!("{message}");
            }
            for (category_id, document_name) in &select {
                if !session.selection().contains(category_id, document_name) {
                    session.toggle(category_id, document_name).await?;
                }
            }
            for group in session.grouped_selection() {
                println!("{}: {}", group.label, group.documents.join(", "));
            }

            let report = session.fill_selected().await?;
            println!(
                "filled {} of {} into {}",
                report.succeeded(),
                report.outcomes.len(),
                config.output_dir.display()
            );
            if let Some(message) = session.last_error() {
                bail!("{message}");
            }
            Ok(())
        }
        Command::Cache {
            action: CacheAction::Clear,
        } => {
            CategoryCache::new(gateway(&config)?, store(&config))
                .invalidate()
                .await?;
            println!("order type cache cleared");
            Ok(())
        }
        Command::Diagnose => {
            let report = diagnostics::run(&gateway(&config)?, &store(&config)).await;
            for line in report.lines() {
                println!("{line}");
            }
            if !report.is_healthy() {
                bail!("diagnostics failed");
            }
            Ok(())
        }
    }
}
