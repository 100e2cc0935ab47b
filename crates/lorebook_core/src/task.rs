//! Single-writer maintenance worker for long-running store operations.
//!
//! # Responsibility
//! - Run backup, restore, export and cleanup off the caller's thread and
//!   hand back a waitable task handle per submission.
//!
//! # Invariants
//! - One worker thread owns one connection: maintenance operations are
//!   serialized, so no two backup/restore/cleanup runs overlap and a
//!   restore's cleanup step always completes before its repopulate step.
//! - Jobs either complete or fail; there is no cancellation (the handle
//!   shape leaves room for a future cancellation token).

use crate::attach::AttachmentStore;
use crate::backup::{BackupCodec, BackupHandle, BackupResult, RestoreReport};
use crate::db::{open_db, DbError};
use crate::export::{ExportDocument, ExportRequest, ExportResult, Exporter};
use crate::paths::StorePaths;
use crate::service::cleanup::{CleanupReport, CleanupScope, CleanupService};
use crate::service::ServiceResult;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::thread::JoinHandle;

/// Error for task handles whose worker went away before replying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerGone;

impl Display for WorkerGone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "maintenance worker terminated before completing the task")
    }
}

impl Error for WorkerGone {}

/// Completion handle of one submitted maintenance job.
///
/// Single-shot: the result can be taken exactly once, by `wait` or by a
/// successful `try_wait`.
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the job completes and returns its result.
    pub fn wait(self) -> Result<T, WorkerGone> {
        self.rx.recv().map_err(|_| WorkerGone)
    }

    /// Polls for completion without blocking.
    pub fn try_wait(&self) -> Result<Option<T>, WorkerGone> {
        match self.rx.try_recv() {
            Ok(result) => Ok(Some(result)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(WorkerGone),
        }
    }
}

enum MaintenanceJob {
    Backup {
        name: String,
        reply: Sender<BackupResult<BackupHandle>>,
    },
    Restore {
        handle: BackupHandle,
        reply: Sender<BackupResult<RestoreReport>>,
    },
    ListBackups {
        reply: Sender<BackupResult<Vec<BackupHandle>>>,
    },
    Export {
        request: ExportRequest,
        reply: Sender<ExportResult<ExportDocument>>,
    },
    Cleanup {
        scope: CleanupScope,
        reply: Sender<ServiceResult<CleanupReport>>,
    },
    Shutdown,
}

/// Owner of the maintenance worker thread.
///
/// Dropping the worker shuts the thread down after in-flight jobs finish.
pub struct MaintenanceWorker {
    jobs: Sender<MaintenanceJob>,
    thread: Option<JoinHandle<()>>,
}

impl MaintenanceWorker {
    /// Opens a dedicated connection and starts the worker thread.
    pub fn spawn(paths: StorePaths) -> Result<Self, DbError> {
        let conn = open_db(&paths.db_file)?;
        let files = AttachmentStore::new(paths.attachments_dir.clone());
        let (jobs, inbox) = unbounded();

        let thread = std::thread::spawn(move || worker_loop(conn, files, paths, inbox));
        info!("event=worker_spawn module=task status=ok");
        Ok(Self {
            jobs,
            thread: Some(thread),
        })
    }

    /// Submits a whole-store backup under the given archive name.
    pub fn create_backup(&self, name: impl Into<String>) -> TaskHandle<BackupResult<BackupHandle>> {
        let (reply, rx) = bounded(1);
        let _ = self.jobs.send(MaintenanceJob::Backup {
            name: name.into(),
            reply,
        });
        TaskHandle { rx }
    }

    /// Submits a destructive restore from the given archive.
    pub fn restore_from_backup(
        &self,
        handle: BackupHandle,
    ) -> TaskHandle<BackupResult<RestoreReport>> {
        let (reply, rx) = bounded(1);
        let _ = self.jobs.send(MaintenanceJob::Restore { handle, reply });
        TaskHandle { rx }
    }

    /// Submits an archive listing, newest first.
    pub fn list_backups(&self) -> TaskHandle<BackupResult<Vec<BackupHandle>>> {
        let (reply, rx) = bounded(1);
        let _ = self.jobs.send(MaintenanceJob::ListBackups { reply });
        TaskHandle { rx }
    }

    /// Submits a one-way document export.
    pub fn export(&self, request: ExportRequest) -> TaskHandle<ExportResult<ExportDocument>> {
        let (reply, rx) = bounded(1);
        let _ = self.jobs.send(MaintenanceJob::Export { request, reply });
        TaskHandle { rx }
    }

    /// Submits a bulk deletion of the given scope.
    pub fn cleanup(&self, scope: CleanupScope) -> TaskHandle<ServiceResult<CleanupReport>> {
        let (reply, rx) = bounded(1);
        let _ = self.jobs.send(MaintenanceJob::Cleanup { scope, reply });
        TaskHandle { rx }
    }
}

impl Drop for MaintenanceWorker {
    fn drop(&mut self) {
        let _ = self.jobs.send(MaintenanceJob::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn worker_loop(
    mut conn: Connection,
    files: AttachmentStore,
    paths: StorePaths,
    inbox: Receiver<MaintenanceJob>,
) {
    for job in inbox {
        match job {
            MaintenanceJob::Backup { name, reply } => {
                let result = BackupCodec::try_new(&mut conn, &files, &paths.backups_dir)
                    .and_then(|mut codec| codec.create_backup(&name));
                let _ = reply.send(result);
            }
            MaintenanceJob::Restore { handle, reply } => {
                let result = BackupCodec::try_new(&mut conn, &files, &paths.backups_dir)
                    .and_then(|mut codec| codec.restore_from_backup(&handle));
                let _ = reply.send(result);
            }
            MaintenanceJob::ListBackups { reply } => {
                let result = BackupCodec::try_new(&mut conn, &files, &paths.backups_dir)
                    .and_then(|codec| codec.list_backups());
                let _ = reply.send(result);
            }
            MaintenanceJob::Export { request, reply } => {
                let result = Exporter::try_new(&conn, &paths.exports_dir)
                    .and_then(|exporter| exporter.export(&request));
                let _ = reply.send(result);
            }
            MaintenanceJob::Cleanup { scope, reply } => {
                let result = CleanupService::try_new(&mut conn, &files)
                    .and_then(|mut service| service.cleanup(scope));
                let _ = reply.send(result);
            }
            MaintenanceJob::Shutdown => break,
        }
    }
    info!("event=worker_stop module=task status=ok");
}
