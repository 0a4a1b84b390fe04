//! Thread affinity for values that must stay on the thread that created them.
//!
//! Graphics contexts are tied to one OS thread. [`ContextThread`] owns such a
//! value on a dedicated worker and marshals closures to it through a queue.
//! Every call blocks until its closure has run, so callers observe the same
//! ordering as if they had called into the context directly.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    thread::{self, JoinHandle, ThreadId},
};

use anyhow::{Context as _, Result, anyhow, bail, ensure};
use futures::{
    StreamExt,
    channel::{mpsc, oneshot},
    executor::block_on,
};

type Job<C> = Box<dyn FnOnce(&mut C) + Send>;

/// A worker thread owning a `C`.
pub struct ContextThread<C: 'static> {
    name: String,
    jobs: Option<mpsc::UnboundedSender<Job<C>>>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
}

impl<C: 'static> std::fmt::Debug for ContextThread<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextThread")
            .field("name", &self.name)
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl<C: 'static> ContextThread<C> {
    /// Start the worker and build the context on it with `init`.
    ///
    /// Returns once `init` has finished; its error (or panic) is returned here.
    pub fn spawn<F>(name: &str, init: F) -> Result<Self>
    where
        F: FnOnce() -> Result<C> + Send + 'static,
    {
        let (jobs, mut queue) = mpsc::unbounded::<Job<C>>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();
        let thread_name = name.to_owned();

        let worker = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                let mut context = match init() {
                    Ok(context) => {
                        let _ = ready_tx.send(Ok(()));
                        context
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                log::debug!("{} started", thread_name);
                while let Some(job) = block_on(queue.next()) {
                    job(&mut context);
                }
                log::debug!("{} stopped", thread_name);
            })
            .with_context(|| format!("failed to spawn {}", name))?;
        let worker_id = worker.thread().id();

        match block_on(ready_rx) {
            Ok(Ok(())) => Ok(Self {
                name: name.to_owned(),
                jobs: Some(jobs),
                worker: Some(worker),
                worker_id,
            }),
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e.context(format!("failed to initialise the context on {}", name)))
            }
            // The sender was dropped without a message: `init` panicked.
            Err(_) => match worker.join() {
                Err(payload) => bail!("{} panicked during initialisation: {}", name, panic_message(&payload)),
                Ok(()) => bail!("{} exited during initialisation", name),
            },
        }
    }

    /// Run `f` on the worker against the context and wait for its result.
    ///
    /// A panic inside `f` is caught on the worker and returned as an error;
    /// the context stays usable for later calls.
    pub fn use_context<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut C) -> R + Send + 'static,
        R: Send + 'static,
    {
        ensure!(
            thread::current().id() != self.worker_id,
            "use_context called from inside {}; it would wait on itself",
            self.name
        );
        let jobs = self
            .jobs
            .as_ref()
            .with_context(|| format!("{} is shut down", self.name))?;

        let (done_tx, done_rx) = oneshot::channel();
        let job: Job<C> = Box::new(move |context| {
            let result = panic::catch_unwind(AssertUnwindSafe(|| f(context)));
            let _ = done_tx.send(result);
        });
        jobs.unbounded_send(job)
            .map_err(|_| anyhow!("{} is no longer accepting work", self.name))?;

        match block_on(done_rx) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => {
                let message = panic_message(&payload);
                log::error!("job on {} panicked: {}", self.name, message);
                bail!("job on {} panicked: {}", self.name, message)
            }
            Err(_) => bail!("{} stopped before the job finished", self.name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<C: 'static> Drop for ContextThread<C> {
    fn drop(&mut self) {
        // Closing the queue ends the worker loop once pending jobs are done.
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("{} panicked while shutting down", self.name);
            }
        }
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
