use crate::store::{Storage, StoreError};
use nodelog_common::errors::*;
use nodelog_common::Build;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug)]
pub struct GetRequest {
    pub job: String,
    pub reply: oneshot::Sender<Vec<Build>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PutRequest {
    pub build: Build,
    pub update: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub job: String,
    pub number: i32,
    pub update: bool,
    pub reason: String,
}

/// What the actor did during one refresh cycle.
#[derive(Debug, Default)]
pub struct ActorSummary {
    pub inserted: usize,
    pub updated: usize,
    pub failed_reads: Vec<String>,
    pub failed_writes: Vec<WriteFailure>,
    pub commit_error: Option<String>,
}

/// Request side of the store actor.
///
/// Holds both senders, so the get and put channels always close together
/// once the last handle is dropped.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    gets: mpsc::Sender<GetRequest>,
    puts: mpsc::Sender<PutRequest>,
}

impl StoreHandle {
    /// Builds of `job` as currently persisted, empty if the read failed.
    pub async fn get_builds(&self, job: &str) -> Result<Vec<Build>, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.gets
            .send(GetRequest {
                job: job.to_string(),
                reply,
            })
            .await
            .map_err(|_| StoreError::ActorGone)?;
        rx.await.map_err(|_| StoreError::ActorGone)
    }

    pub async fn put(&self, request: PutRequest) -> Result<(), StoreError> {
        self.puts
            .send(request)
            .await
            .map_err(|_| StoreError::ActorGone)
    }
}

/// Resolves once the actor drained its channels and committed.
#[derive(Debug)]
pub struct Finished(oneshot::Receiver<ActorSummary>);

impl Finished {
    pub async fn wait(self) -> Result<ActorSummary, StoreError> {
        self.0.await.map_err(|_| StoreError::ActorGone)
    }
}

pub struct StoreActor<S> {
    storage: S,
    gets: mpsc::Receiver<GetRequest>,
    puts: mpsc::Receiver<PutRequest>,
    summary: ActorSummary,
}

/// Open a transaction on `storage` and start serving requests.
///
/// Fails without spawning anything if the transaction can't be started.
pub fn spawn<S: Storage>(
    mut storage: S,
    capacity: usize,
) -> Result<(StoreHandle, Finished), StoreError> {
    storage.begin()?;

    let (gets_tx, gets) = mpsc::channel(capacity);
    let (puts_tx, puts) = mpsc::channel(capacity);
    let (finished_tx, finished) = oneshot::channel();

    let actor = StoreActor {
        storage,
        gets,
        puts,
        summary: ActorSummary::default(),
    };
    tokio::spawn(actor.run(finished_tx));

    let handle = StoreHandle {
        gets: gets_tx,
        puts: puts_tx,
    };
    Ok((handle, Finished(finished)))
}

impl<S: Storage> StoreActor<S> {
    async fn run(mut self, finished: oneshot::Sender<ActorSummary>) {
        loop {
            tokio::select! {
                get = self.gets.recv() => match get {
                    Some(get) => self.handle_get(get),
                    None => break,
                },
                put = self.puts.recv() => match put {
                    Some(put) => self.handle_put(put),
                    None => break,
                },
            }
        }

        debug!("Store requests closed, draining remaining requests");
        while let Some(get) = self.gets.recv().await {
            self.handle_get(get);
        }
        while let Some(put) = self.puts.recv().await {
            self.handle_put(put);
        }

        if let Err(err) = self.storage.commit() {
            let err = Error::from(err);
            error!("Commit failure: {:#}", err);
            self.summary.commit_error = Some(format!("{:#}", err));
        } else {
            debug!("Committed store transaction");
        }

        if finished.send(self.summary).is_err() {
            warn!("Nobody is waiting for the store actor to finish");
        }
    }

    fn handle_get(&mut self, get: GetRequest) {
        let builds = match self.storage.list_builds(&get.job) {
            Ok(builds) => builds,
            Err(err) => {
                error!("Failed getting builds of {:?}: {:#}", get.job, Error::from(err));
                self.summary.failed_reads.push(get.job.clone());
                Vec::new()
            }
        };
        if get.reply.send(builds).is_err() {
            debug!("Requester for {:?} went away before the reply", get.job);
        }
    }

    fn handle_put(&mut self, put: PutRequest) {
        let PutRequest { build, update } = put;
        let result = if update {
            self.storage.update_build(&build)
        } else {
            self.storage.insert_build(&build)
        };

        match result {
            Ok(()) if update => {
                info!("Updated build {}", build);
                self.summary.updated += 1;
            }
            Ok(()) => {
                info!("Added build {}", build);
                self.summary.inserted += 1;
            }
            Err(err) => {
                let err = Error::from(err);
                error!("Failed to write build {}: {:#}", build, err);
                self.summary.failed_writes.push(WriteFailure {
                    job: build.job,
                    number: build.number,
                    update,
                    reason: format!("{:#}", err),
                });
            }
        }
    }
}
