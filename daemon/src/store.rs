use crate::db;
use crate::models;
use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::SqliteConnection;
use nodelog_common::errors::*;
use nodelog_common::{Build, Job};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open store at {path:?}")]
    Open {
        path: String,
        #[source]
        source: diesel::ConnectionError,
    },
    #[error("Store is locked by another refresh ({path:?})")]
    Locked {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to access {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to migrate store: {0}")]
    Migration(String),
    #[error("Failed to begin transaction")]
    Begin(#[source] diesel::result::Error),
    #[error("Failed to commit transaction")]
    Commit(#[source] diesel::result::Error),
    #[error("Build {job:?} #{number} is not in the store")]
    MissingBuild { job: String, number: i32 },
    #[error("Store query failed")]
    Query(#[from] diesel::result::Error),
    #[error("Store actor stopped before it finished")]
    ActorGone,
}

/// Persistence primitives, the store actor is the only caller during a refresh.
pub trait Storage: Send + 'static {
    fn begin(&mut self) -> Result<(), StoreError>;

    fn commit(&mut self) -> Result<(), StoreError>;

    fn list_jobs(&mut self) -> Result<Vec<Job>, StoreError>;

    fn get_job(&mut self, name: &str) -> Result<Option<Job>, StoreError>;

    fn put_job(&mut self, job: &Job) -> Result<(), StoreError>;

    fn list_builds(&mut self, job: &str) -> Result<Vec<Build>, StoreError>;

    fn insert_build(&mut self, build: &Build) -> Result<(), StoreError>;

    fn update_build(&mut self, build: &Build) -> Result<(), StoreError>;
}

pub struct Store {
    connection: SqliteConnection,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Store, StoreError> {
        let path = path.as_ref();
        let url = path.to_str().ok_or_else(|| StoreError::Open {
            path: path.display().to_string(),
            source: diesel::ConnectionError::InvalidConnectionUrl(
                "store path is not valid utf-8".to_string(),
            ),
        })?;
        debug!("Opening store at {:?}", url);
        let connection = db::setup(url)?;
        Ok(Store { connection })
    }

    pub fn open_in_memory() -> Result<Store, StoreError> {
        let connection = db::setup(":memory:")?;
        Ok(Store { connection })
    }

    /// All stored builds ordered by job and number.
    pub fn list_all_builds(&mut self) -> Result<Vec<Build>, StoreError> {
        let builds = models::Build::list(&mut self.connection)?;
        Ok(builds.into_iter().map(Build::from).collect())
    }
}

impl Storage for Store {
    fn begin(&mut self) -> Result<(), StoreError> {
        AnsiTransactionManager::begin_transaction(&mut self.connection).map_err(StoreError::Begin)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        AnsiTransactionManager::commit_transaction(&mut self.connection)
            .map_err(StoreError::Commit)
    }

    fn list_jobs(&mut self) -> Result<Vec<Job>, StoreError> {
        let jobs = models::Job::list(&mut self.connection)?;
        Ok(jobs.into_iter().map(Job::from).collect())
    }

    fn get_job(&mut self, name: &str) -> Result<Option<Job>, StoreError> {
        let job = models::Job::get(name, &mut self.connection)?;
        Ok(job.map(Job::from))
    }

    fn put_job(&mut self, job: &Job) -> Result<(), StoreError> {
        models::Job::from(job).insert(&mut self.connection)?;
        Ok(())
    }

    fn list_builds(&mut self, job: &str) -> Result<Vec<Build>, StoreError> {
        let builds = models::Build::list_for_job(job, &mut self.connection)?;
        Ok(builds.into_iter().map(Build::from).collect())
    }

    fn insert_build(&mut self, build: &Build) -> Result<(), StoreError> {
        models::Build::from(build).insert(&mut self.connection)?;
        Ok(())
    }

    fn update_build(&mut self, build: &Build) -> Result<(), StoreError> {
        let affected = models::Build::from(build).update(&mut self.connection)?;
        if affected == 0 {
            return Err(StoreError::MissingBuild {
                job: build.job.clone(),
                number: build.number,
            });
        }
        Ok(())
    }
}
