use crate::store::StoreError;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use fs2::FileExt;
use nodelog_common::errors::*;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn setup(url: &str) -> Result<SqliteConnection, StoreError> {
    let mut connection =
        SqliteConnection::establish(url).map_err(|source| StoreError::Open {
            path: url.to_string(),
            source,
        })?;
    connection.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;

    let applied = connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| StoreError::Migration(err.to_string()))?;
    for version in applied {
        info!("Applied database migration {}", version);
    }

    Ok(connection)
}

/// Advisory lock next to the database, held for the duration of a refresh.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
    path: PathBuf,
}

impl StoreLock {
    pub fn acquire<P: AsRef<Path>>(db_path: P) -> Result<StoreLock, StoreError> {
        let path = lock_path(db_path.as_ref());
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        FileExt::try_lock_exclusive(&file).map_err(|source| StoreError::Locked {
            path: path.clone(),
            source,
        })?;
        debug!("Acquired store lock {:?}", path);

        Ok(StoreLock { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn lock_path(db_path: &Path) -> PathBuf {
    let mut name = OsString::from(db_path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}
