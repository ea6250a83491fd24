use chrono::Utc;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::account::AccountStore;
use crate::error::LedgerError;

/// Single-document JSON snapshot of the whole account store
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Storage { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the snapshot durably: temp file, fsync, rename over the target.
    pub fn save(&self, store: &AccountStore) -> Result<(), LedgerError> {
        self.write_snapshot(store).map_err(|e| {
            error!(path = %self.path.display(), "snapshot write failed: {}", e);
            e
        })
    }

    fn write_snapshot(&self, store: &AccountStore) -> Result<(), LedgerError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let json = serde_json::to_vec_pretty(store)?;

        let tmp = self.sibling("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        self.sync_parent()?;
        Ok(())
    }

    /// Flush the directory entry so the rename itself survives a power loss
    #[cfg(unix)]
    fn sync_parent(&self) -> Result<(), LedgerError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        File::open(dir)?.sync_all()?;
        Ok(())
    }

    // Directories cannot be opened for syncing here.
    #[cfg(not(unix))]
    fn sync_parent(&self) -> Result<(), LedgerError> {
        Ok(())
    }

    /// Read the snapshot without any recovery
    pub fn read(&self) -> Result<Option<AccountStore>, LedgerError> {
        match fs::read(&self.path) {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Restore the store at startup.
    ///
    /// A missing document starts a fresh store with just the commission sink.
    /// An unreadable one is moved aside and replaced the same way. Either
    /// baseline is written out before returning.
    pub fn load_or_init(&self, system_account: &str) -> Result<AccountStore, LedgerError> {
        let mut store = match self.read() {
            Ok(Some(store)) => {
                info!(path = %self.path.display(), accounts = store.account_count(), "snapshot loaded");
                store
            }
            Ok(None) => {
                info!(path = %self.path.display(), "no snapshot found, creating a new store");
                let store = AccountStore::new(system_account);
                self.save(&store)?;
                return Ok(store);
            }
            Err(e) => {
                let aside = self.sibling(&format!("corrupt-{}", Utc::now().format("%Y%m%d%H%M%S")));
                warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    "snapshot unreadable ({}), starting over",
                    e
                );
                if let Err(rename_err) = fs::rename(&self.path, &aside) {
                    warn!("could not move unreadable snapshot aside: {}", rename_err);
                }
                let store = AccountStore::new(system_account);
                self.save(&store)?;
                return Ok(store);
            }
        };

        if store.system_account() != system_account {
            warn!(
                stored = store.system_account(),
                configured = system_account,
                "snapshot names a different commission account, keeping the stored one"
            );
        }
        if store.ensure_system_account() {
            info!("commission account was missing, re-created");
            self.save(&store)?;
        }
        Ok(store)
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "database.json".into());
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }
}
