//! Task group with first-error cancellation.
//!
//! Every task shares one cancellation token. The first task to fail records
//! its error and cancels the token so siblings wind down; `wait` joins them all
//! and hands back that first error.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A set of concurrent tasks sharing one cancellation scope.
pub struct TaskGroup<E> {
    token: CancellationToken,
    tasks: JoinSet<()>,
    first_error: Arc<Mutex<Option<E>>>,
}

impl<E: Send + 'static> TaskGroup<E> {
    /// Create a group whose token is a child of `parent`.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            tasks: JoinSet::new(),
            first_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Token cancelled when the parent is cancelled or any task fails.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Number of tasks still tracked by the group.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the group has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Spawn a task into the group.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
    {
        let token = self.token.clone();
        let first_error = Arc::clone(&self.first_error);
        self.tasks.spawn(async move {
            if let Err(err) = task.await {
                let mut slot = first_error.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.is_none() {
                    *slot = Some(err);
                }
                drop(slot);
                token.cancel();
            }
        });
    }

    /// Wait for every task, then return the first error, if any.
    ///
    /// The group token is cancelled once all tasks are done. A panicking task
    /// resumes its panic here.
    pub async fn wait(mut self) -> Result<(), E> {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(err) = joined {
                if err.is_panic() {
                    std::panic::resume_unwind(err.into_panic());
                }
            }
        }
        self.token.cancel();

        let first = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
