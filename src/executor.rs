//! Single-worker serialized task executor.
//!
//! One dedicated background thread drains a FIFO queue of jobs, one at a
//! time, for the lifetime of the owner. Dropping the executor closes the
//! queue, lets the already-queued jobs finish, and joins the thread.

use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, error};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct SingleThreadExecutor {
    queue: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl SingleThreadExecutor {
    /// Spawns the named worker thread. Fails only if the OS refuses the
    /// thread.
    pub fn new(thread_name: &str) -> io::Result<Self> {
        let (queue, jobs) = unbounded::<Job>();
        let worker = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || run_worker(&jobs))?;
        Ok(Self {
            queue: Some(queue),
            worker: Some(worker),
        })
    }

    /// Enqueues a job; it runs after every previously submitted job has
    /// finished. Never blocks.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(queue) = &self.queue {
            // The queue only disconnects during drop; a job lost in that
            // window is a job the owner no longer cares about.
            let _ = queue.send(Box::new(job));
        }
    }
}

fn run_worker(jobs: &Receiver<Job>) {
    debug!("worker thread started");
    for job in jobs.iter() {
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!("task panicked; worker keeps running");
        }
    }
    debug!("worker thread stopped");
}

impl Drop for SingleThreadExecutor {
    fn drop(&mut self) {
        // Closing the queue ends the worker's iterator once the remaining
        // jobs have run.
        self.queue.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn jobs_run_in_submission_order() {
        let executor = SingleThreadExecutor::new("test-worker").unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = mpsc::channel();

        for i in 0..10 {
            let order = Arc::clone(&order);
            let done_tx = done_tx.clone();
            executor.submit(move || {
                order.lock().unwrap().push(i);
                let _ = done_tx.send(());
            });
        }
        for _ in 0..10 {
            done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }
        assert_eq!(*order.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn worker_survives_panicking_job() {
        let executor = SingleThreadExecutor::new("test-worker").unwrap();
        let (done_tx, done_rx) = mpsc::channel();

        executor.submit(|| panic!("boom"));
        executor.submit(move || {
            let _ = done_tx.send(());
        });

        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("job after panic should still run");
    }

    #[test]
    fn drop_finishes_queued_jobs_before_joining() {
        let ran = Arc::new(Mutex::new(0u32));
        {
            let executor = SingleThreadExecutor::new("test-worker").unwrap();
            for _ in 0..5 {
                let ran = Arc::clone(&ran);
                executor.submit(move || {
                    std::thread::sleep(Duration::from_millis(10));
                    *ran.lock().unwrap() += 1;
                });
            }
        }
        // Drop joined the worker, so all queued jobs have completed.
        assert_eq!(*ran.lock().unwrap(), 5);
    }
}
