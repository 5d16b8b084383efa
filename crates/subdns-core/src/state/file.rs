// # File Store
//
// File-based implementation of SubdomainStore with crash recovery.
//
// ## Purpose
//
// Persists managed domains and provisioned subdomains across restarts so
// that teardown can find the provider record ids it needs.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "next_domain_id": 1,
//   "next_subdomain_id": 1,
//   "domains": { "1": { "id": 1, "hostname": "play.example.com", ... } },
//   "subdomains": { "1": { "id": 1, "label": "mc", "kind": "SRV", ... } }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use super::snapshot::StoreSnapshot;
use crate::Error;
use crate::config::StoreConfig;
use crate::model::{
    Domain, DomainId, DomainUpdate, NewDomain, NewSubdomain, Subdomain, SubdomainId, WorkloadId,
};
use crate::traits::{StoreFactory, SubdomainStore};

/// Store file format version
/// Used for future migration if format changes
const STORE_FILE_VERSION: &str = "1.0";

/// File-based store with crash recovery
///
/// Every mutation is applied to a copy of the table, written to disk, and
/// only then made visible. A failed write leaves the in-memory view
/// unchanged and surfaces as `Error::Persistence`.
///
/// # Example
///
/// ```rust,no_run
/// use subdns_core::state::FileStore;
/// use subdns_core::traits::SubdomainStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStore::new("/var/lib/subdns/state.json").await?;
///     let rows = store.list_by_workload(42).await?;
///     println!("workload 42 holds {} subdomain(s)", rows.len());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: RwLock<StoreSnapshot>,
}

/// Serializable store file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StoreFileFormat {
    version: String,
    #[serde(flatten)]
    snapshot: StoreSnapshot,
}

impl FileStore {
    /// Create or load a file store
    ///
    /// This will:
    /// 1. Try to load existing store file
    /// 2. If corruption detected, try to load from backup
    /// 3. If both fail, start empty
    /// 4. Create parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let snapshot = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: RwLock::new(snapshot),
        })
    }

    /// Load the store file with automatic recovery
    ///
    /// Recovery strategy:
    /// 1. Try to load main file
    /// 2. If JSON parse error, try loading backup
    /// 3. If backup also fails, start empty
    async fn load_with_recovery(path: &Path) -> Result<StoreSnapshot, Error> {
        match Self::load(path).await {
            Ok(snapshot) => {
                tracing::debug!("Loaded store from file: {} subdomain(s)", snapshot.len());
                Ok(snapshot)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Store file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty store.");
                    return Ok(StoreSnapshot::default());
                }

                match Self::load(&backup_path).await {
                    Ok(snapshot) => {
                        tracing::info!(
                            "Recovered store from backup: {} subdomain(s)",
                            snapshot.len()
                        );
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore store file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(snapshot)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also corrupted: {}. Starting with empty store.",
                            backup_err
                        );
                        Ok(StoreSnapshot::default())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Load the store from a file
    async fn load(path: &Path) -> Result<StoreSnapshot, Error> {
        if !path.exists() {
            tracing::debug!("Store file does not exist: {}", path.display());
            return Ok(StoreSnapshot::default());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::persistence(format!(
                "Failed to read store file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: StoreFileFormat = serde_json::from_str(&content)?;

        if file.version != STORE_FILE_VERSION {
            tracing::warn!(
                "Store file version mismatch: expected {}, got {}. Attempting to load anyway.",
                STORE_FILE_VERSION,
                file.version
            );
        }

        Ok(file.snapshot)
    }

    /// Write a snapshot to disk atomically
    async fn write(&self, snapshot: &StoreSnapshot) -> Result<(), Error> {
        let file = StoreFileFormat {
            version: STORE_FILE_VERSION.to_string(),
            snapshot: snapshot.clone(),
        };

        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::persistence(format!("Failed to serialize store: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut handle = fs::File::create(&temp_path).await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            handle.write_all(json.as_bytes()).await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            handle.flush().await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::persistence(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Store written to file: {}", self.path.display());
        Ok(())
    }

    /// Apply a mutation, persist it, then publish it
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut StoreSnapshot) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let value = f(&mut next)?;
        self.write(&next).await?;
        *guard = next;
        Ok(value)
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl SubdomainStore for FileStore {
    async fn domain(&self, id: DomainId) -> Result<Option<Domain>, Error> {
        Ok(self.state.read().await.domain(id).cloned())
    }

    async fn insert_domain(&self, domain: NewDomain) -> Result<Domain, Error> {
        self.mutate(|s| Ok(s.insert_domain(domain))).await
    }

    async fn update_domain(&self, id: DomainId, update: DomainUpdate) -> Result<Domain, Error> {
        self.mutate(|s| s.update_domain(id, update)).await
    }

    async fn delete_domain(&self, id: DomainId) -> Result<bool, Error> {
        self.mutate(|s| Ok(s.delete_domain(id))).await
    }

    async fn set_zone_id(&self, id: DomainId, zone_id: Option<String>) -> Result<(), Error> {
        self.mutate(|s| s.set_zone_id(id, zone_id)).await
    }

    async fn subdomain(&self, id: SubdomainId) -> Result<Option<Subdomain>, Error> {
        Ok(self.state.read().await.subdomain(id).cloned())
    }

    async fn find_by_label(
        &self,
        domain_id: DomainId,
        label: &str,
    ) -> Result<Option<Subdomain>, Error> {
        Ok(self.state.read().await.find_by_label(domain_id, label).cloned())
    }

    async fn list_by_workload(&self, workload_id: WorkloadId) -> Result<Vec<Subdomain>, Error> {
        Ok(self.state.read().await.list_by_workload(workload_id))
    }

    async fn count_by_workload(&self, workload_id: WorkloadId) -> Result<usize, Error> {
        Ok(self.state.read().await.count_by_workload(workload_id))
    }

    async fn count_by_domain(&self, domain_id: DomainId) -> Result<usize, Error> {
        Ok(self.state.read().await.count_by_domain(domain_id))
    }

    async fn insert_subdomain(&self, subdomain: NewSubdomain) -> Result<Subdomain, Error> {
        self.mutate(|s| s.insert_subdomain(subdomain)).await
    }

    async fn delete_subdomain(&self, id: SubdomainId) -> Result<bool, Error> {
        self.mutate(|s| Ok(s.delete_subdomain(id))).await
    }

    async fn delete_by_workload(&self, workload_id: WorkloadId) -> Result<usize, Error> {
        self.mutate(|s| Ok(s.delete_by_workload(workload_id))).await
    }

    async fn flush(&self) -> Result<(), Error> {
        // Every mutation is already on disk
        Ok(())
    }
}

/// Factory for file stores
pub struct FileStoreFactory;

#[async_trait]
impl StoreFactory for FileStoreFactory {
    async fn create(&self, config: &StoreConfig) -> Result<Arc<dyn SubdomainStore>, Error> {
        match config {
            StoreConfig::File { path } => Ok(Arc::new(FileStore::new(path).await?)),
            _ => Err(Error::config("Invalid config for file store")),
        }
    }
}
