//! SQLite-backed interpolant store.
//!
//! A single worker thread owns the connection. Async callers hand it closures
//! through [`Database::execute`] and await the reply on a oneshot channel, so
//! blocking SQLite calls never run on the async runtime.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

pub mod helpers;
mod migrations;
pub mod repositories;

use migrations::run_migrations;

const WORKER_THREAD_NAME: &str = "pupilfuse-store";

type StoreJob = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum StoreCommand {
    Run(StoreJob),
    Stop,
}

/// Owns the worker; stopping it is tied to the last handle going away.
struct Worker {
    jobs: mpsc::Sender<StoreCommand>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let handle = match self.thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return;
        };

        if let Err(err) = self.jobs.send(StoreCommand::Stop) {
            error!("Store worker already gone at shutdown: {err}");
        }
        if let Err(err) = handle.join() {
            error!("Store worker panicked: {err:?}");
        }
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("Failed to enable WAL mode: {err}");
    }

    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

fn serve(mut conn: Connection, jobs: mpsc::Receiver<StoreCommand>) {
    while let Ok(command) = jobs.recv() {
        match command {
            StoreCommand::Run(job) => job(&mut conn),
            StoreCommand::Stop => break,
        }
    }
    info!("Store worker shutting down");
}

/// Handle to the interpolant store. Clones share one worker.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    path: Arc<PathBuf>,
}

impl Database {
    /// Open (creating if needed) the store at `db_path` and migrate it.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (jobs_tx, jobs_rx) = mpsc::channel::<StoreCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let thread_path = db_path.clone();

        let thread = thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || match open_connection(&thread_path) {
                Ok(conn) => {
                    if ready_tx.send(Ok(())).is_err() {
                        error!("Store opener went away before the worker was ready");
                        return;
                    }
                    serve(conn, jobs_rx);
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .context("failed to spawn store worker thread")?;

        ready_rx
            .recv()
            .context("store worker exited before signaling readiness")??;

        info!("Interpolant store opened at {}", db_path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                jobs: jobs_tx,
                thread: Mutex::new(Some(thread)),
            }),
            path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Run `job` on the worker thread and await its result.
    pub async fn execute<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = StoreCommand::Run(Box::new(move |conn| {
            if reply_tx.send(job(conn)).is_err() {
                error!("Store caller dropped before receiving result");
            }
        }));

        self.worker
            .jobs
            .send(command)
            .map_err(|err| anyhow!("failed to send job to store worker: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("store worker terminated unexpectedly"))?
    }
}
