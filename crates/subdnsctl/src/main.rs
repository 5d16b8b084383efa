// # subdnsctl - subdomain provisioning CLI
//
// Thin integration layer: all provisioning, teardown and reconciliation
// logic lives in subdns-core. This binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Registering gateways and stores, then building the engine
// 4. Running one subcommand and printing its result as JSON
//
// ## Configuration
//
// ### DNS Gateway
// - `SUBDNS_GATEWAY_TYPE`: Gateway type (bunny)
// - `SUBDNS_BUNNY_API_KEY`: Bunny account API key
// - `SUBDNS_BUNNY_BASE_URL`: API endpoint override (optional)
// - `SUBDNS_HTTP_TIMEOUT_SECS`: Per-request timeout (default 15)
// - `SUBDNS_MODE`: `dry-run` to perform lookups only
//
// ### Store
// - `SUBDNS_STORE_TYPE`: Store type (file, memory)
// - `SUBDNS_STORE_PATH`: Path to the store file (for file store)
//
// ### Engine
// - `SUBDNS_MAX_PER_WORKLOAD`: Subdomains allowed per workload (default 1)
// - `SUBDNS_INVENTORY_PATH`: JSON file with recipes, workloads, allocations and nodes
// - `SUBDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export SUBDNS_BUNNY_API_KEY=your_key
// export SUBDNS_STORE_TYPE=file
// export SUBDNS_STORE_PATH=/var/lib/subdns/state.json
// export SUBDNS_INVENTORY_PATH=/etc/subdns/inventory.json
//
// subdnsctl domain add --hostname play.example.com --mapping 1 --mapping 2:_minecraft:tcp
// subdnsctl provision --domain 1 --workload 10 --label survival
// ```

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Value, json};
use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use subdns_core::engine::{EngineEvent, ProvisionRequest};
use subdns_core::model::{DomainUpdate, NewDomain};
use subdns_core::{
    DnsGateway, EngineConfig, GatewayConfig, Registry, StaticInventory, StoreConfig, SubdnsConfig,
    SubdomainEngine,
};
use tokio::sync::mpsc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Command, DomainCommand};

/// Exit codes
///
/// - 0: Command succeeded
/// - 1: Configuration or startup error
/// - 2: The command itself failed
#[derive(Debug, Clone, Copy)]
enum CtlExitCode {
    Success = 0,
    ConfigError = 1,
    OperationError = 2,
}

impl From<CtlExitCode> for ExitCode {
    fn from(code: CtlExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    gateway_type: String,
    bunny_api_key: String,
    bunny_base_url: Option<String>,
    http_timeout_secs: u64,
    store_type: String,
    store_path: Option<String>,
    max_per_workload: usize,
    inventory_path: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let parse_or = |key: &str, default: u64| -> Result<u64> {
            match non_empty(key) {
                Some(raw) => raw
                    .parse::<u64>()
                    .with_context(|| format!("{} must be a non-negative integer. Got: {}", key, raw)),
                None => Ok(default),
            }
        };

        Ok(Self {
            gateway_type: non_empty("SUBDNS_GATEWAY_TYPE").unwrap_or_else(|| "bunny".to_string()),
            bunny_api_key: non_empty("SUBDNS_BUNNY_API_KEY").unwrap_or_default(),
            bunny_base_url: non_empty("SUBDNS_BUNNY_BASE_URL"),
            http_timeout_secs: parse_or("SUBDNS_HTTP_TIMEOUT_SECS", 15)?,
            store_type: non_empty("SUBDNS_STORE_TYPE").unwrap_or_else(|| "file".to_string()),
            store_path: non_empty("SUBDNS_STORE_PATH"),
            max_per_workload: parse_or("SUBDNS_MAX_PER_WORKLOAD", 1)? as usize,
            inventory_path: non_empty("SUBDNS_INVENTORY_PATH"),
            log_level: non_empty("SUBDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.gateway_type.as_str() {
            "bunny" => {}
            _ => anyhow::bail!(
                "SUBDNS_GATEWAY_TYPE '{}' is not supported. \
                Supported gateways: bunny",
                self.gateway_type
            ),
        }

        if self.bunny_api_key.is_empty() {
            anyhow::bail!(
                "SUBDNS_BUNNY_API_KEY is required. \
                Set it via: export SUBDNS_BUNNY_API_KEY=your_key"
            );
        }

        if let Some(ref url) = self.bunny_base_url
            && !url.starts_with("https://")
            && !url.starts_with("http://")
        {
            anyhow::bail!("SUBDNS_BUNNY_BASE_URL must use HTTP or HTTPS scheme. Got: {}", url);
        }

        if !(1..=300).contains(&self.http_timeout_secs) {
            anyhow::bail!(
                "SUBDNS_HTTP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.http_timeout_secs
            );
        }

        match self.store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "SUBDNS_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.store_type
            ),
        }

        if self.store_type == "file" {
            let Some(ref path) = self.store_path else {
                anyhow::bail!(
                    "SUBDNS_STORE_PATH is required when SUBDNS_STORE_TYPE=file. \
                    Set it via: export SUBDNS_STORE_PATH=/var/lib/subdns/state.json"
                );
            };

            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                anyhow::bail!(
                    "SUBDNS_STORE_PATH parent directory does not exist: {}. \
                    Create it first: sudo mkdir -p {}",
                    parent.display(),
                    parent.display()
                );
            }
        }

        if let Some(ref path) = self.inventory_path
            && !Path::new(path).is_file()
        {
            anyhow::bail!("SUBDNS_INVENTORY_PATH does not point to a file: {}", path);
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "SUBDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn to_subdns_config(&self) -> SubdnsConfig {
        let store = match self.store_type.as_str() {
            "memory" => StoreConfig::Memory,
            _ => StoreConfig::File {
                path: self.store_path.clone().unwrap_or_default(),
            },
        };

        SubdnsConfig {
            gateway: GatewayConfig::Bunny {
                api_key: self.bunny_api_key.clone(),
                base_url: self.bunny_base_url.clone(),
                timeout_secs: self.http_timeout_secs,
            },
            store,
            engine: EngineConfig {
                max_subdomains_per_workload: self.max_per_workload,
                ..EngineConfig::default()
            },
        }
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return CtlExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return CtlExitCode::ConfigError.into();
    }

    // Logs go to stderr; stdout carries the command result
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CtlExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CtlExitCode::ConfigError.into();
        }
    };

    rt.block_on(async {
        let (engine, events) = match build_engine(&config).await {
            Ok(parts) => parts,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return CtlExitCode::ConfigError;
            }
        };

        let result = run_command(&engine, cli.command).await;
        drain_events(events);

        match result {
            Ok(output) => {
                println!("{}", output);
                CtlExitCode::Success
            }
            Err(e) => {
                error!("Command failed: {}", e);
                eprintln!("{}", json!({ "error": e.code(), "message": e.to_string() }));
                CtlExitCode::OperationError
            }
        }
    })
    .into()
}

/// Register components and build the engine from configuration
async fn build_engine(
    config: &Config,
) -> Result<(SubdomainEngine, mpsc::Receiver<EngineEvent>)> {
    let registry = Registry::new();
    subdns_core::state::register(&registry);

    #[cfg(feature = "bunny")]
    subdns_provider_bunny::register(&registry);

    let subdns_config = config.to_subdns_config();
    subdns_config.validate()?;

    info!("Gateway type: {}", subdns_config.gateway.type_name());
    info!("Store type: {}", subdns_config.store.type_name());

    let gateway: Arc<dyn DnsGateway> = Arc::from(registry.create_gateway(&subdns_config.gateway)?);
    let store = registry.create_store(&subdns_config.store).await?;

    let inventory = match config.inventory_path {
        Some(ref path) => StaticInventory::load(path)
            .await
            .with_context(|| format!("Failed to load inventory from {}", path))?,
        None => {
            warn!("SUBDNS_INVENTORY_PATH not set; running with an empty inventory");
            StaticInventory::new()
        }
    };

    let (engine, events) =
        SubdomainEngine::new(gateway, store, Arc::new(inventory), subdns_config.engine)?;
    Ok((engine, events))
}

/// Run one subcommand and render its result
async fn run_command(engine: &SubdomainEngine, command: Command) -> subdns_core::Result<Value> {
    let output = match command {
        Command::Provision {
            domain,
            workload,
            label,
        } => {
            let subdomain = engine
                .provision(ProvisionRequest {
                    domain_id: domain,
                    workload_id: workload,
                    label,
                })
                .await?;
            serde_json::to_value(subdomain)?
        }
        Command::Teardown {
            workload,
            subdomain,
        } => serde_json::to_value(engine.teardown(workload, subdomain).await?)?,
        Command::Cleanup { workload } => serde_json::to_value(engine.cleanup_workload(workload).await)?,
        Command::Domain(DomainCommand::Add {
            hostname,
            mappings,
            inactive,
        }) => {
            let new = NewDomain {
                active: !inactive,
                ..NewDomain::new(hostname, mappings)
            };
            serde_json::to_value(engine.register_domain(new).await?)?
        }
        Command::Domain(DomainCommand::Update {
            id,
            hostname,
            active,
            mappings,
        }) => {
            let update = DomainUpdate {
                hostname,
                active,
                mappings: (!mappings.is_empty()).then_some(mappings),
            };
            serde_json::to_value(engine.update_domain(id, update).await?)?
        }
        Command::Domain(DomainCommand::Remove { id }) => {
            serde_json::to_value(engine.remove_domain(id).await?)?
        }
        Command::Domain(DomainCommand::InvalidateZone { id }) => {
            engine.invalidate_zone(id).await?;
            json!({ "domain_id": id, "zone_id": null })
        }
    };

    engine.flush().await?;
    Ok(output)
}

/// Log whatever events the command produced
fn drain_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            EngineEvent::OrphanRisk {
                ref zone_id,
                ref record_ids,
                ref reason,
            } => warn!(
                "Provider records may be orphaned in zone {}: {:?} ({})",
                zone_id, record_ids, reason
            ),
            other => info!("Engine event: {:?}", other),
        }
    }
}
