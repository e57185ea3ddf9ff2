use tokio::task::JoinHandle;
use std::collections::HashMap;
use crate::error::{Error, Result};
use tracing::{info, error};

/// Tracks background tasks that run beside the gRPC server.
///
/// A task that finishes on its own is treated as a failure and reported by
/// [`TaskSupervisor::check_health`]; everything still running is aborted
/// by [`TaskSupervisor::shutdown_all`].
pub struct TaskSupervisor {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        TaskSupervisor {
            tasks: HashMap::new(),
        }
    }

    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F) -> &mut Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let handle = tokio::spawn(future);

        info!("Spawned background task: {}", name);
        self.tasks.insert(name, handle);
        self
    }

    /// Errors if any registered task has terminated. Finished tasks are
    /// dropped from tracking.
    pub fn check_health(&mut self) -> Result<()> {
        let mut failed_tasks: Vec<String> = self.tasks
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(name, _)| name.clone())
            .collect();

        if failed_tasks.is_empty() {
            return Ok(());
        }

        failed_tasks.sort();
        for name in &failed_tasks {
            self.tasks.remove(name);
        }

        let error_msg = format!("Tasks terminated unexpectedly: {:?}", failed_tasks);
        error!("{}", error_msg);
        Err(Error::TaskFailure(error_msg))
    }

    pub fn active_task_count(&self) -> usize {
        self.tasks.len()
    }

    pub async fn shutdown_all(&mut self) {
        info!("Shutting down {} background tasks", self.tasks.len());

        for (name, handle) in self.tasks.drain() {
            handle.abort();
            let _ = handle.await;
            info!("Stopped task: {}", name);
        }
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}
