use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error, info};

use crate::error::WorkerError;

use super::panic_message;

/// Message stored for a slot whose worker died without reporting back.
const MISSING_RESULT: &str = "worker exited before reporting a result";

pub type Task<T> = Box<dyn FnOnce() -> T + Send + 'static>;

/// What happened to one submitted task.
#[derive(Debug)]
pub enum TaskOutcome<T> {
    Completed(T),
    Panicked(String),
}

impl<T> TaskOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed(_))
    }
}

/// Fixed-size pool of OS threads running boxed closures.
///
/// Each submitted task gets the next submission index; [`WorkerPool::join`]
/// returns outcomes in that order regardless of completion order. A panicking
/// task is caught and reported as [`TaskOutcome::Panicked`] without taking
/// its worker down.
pub struct WorkerPool<T: Send + 'static> {
    label: String,
    task_sender: Sender<(usize, Task<T>)>,
    result_receiver: Receiver<(usize, TaskOutcome<T>)>,
    workers: Vec<JoinHandle<()>>,
    submitted: usize,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Fails with [`WorkerError::NoWorkers`] when `worker_count` is 0.
    pub fn new(label: &str, worker_count: usize) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::NoWorkers {
                label: label.to_string(),
            });
        }
        let (task_sender, task_receiver) = bounded::<(usize, Task<T>)>(worker_count * 2);
        // Unbounded so workers never block on a caller that is still submitting.
        let (result_sender, result_receiver) = unbounded::<(usize, TaskOutcome<T>)>();

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let task_rx = task_receiver.clone();
            let result_tx = result_sender.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{}", label, worker_id))
                .spawn(move || run_worker(worker_id, task_rx, result_tx))
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;
            workers.push(handle);
        }

        info!("Started {} {} workers", worker_count, label);

        Ok(Self {
            label: label.to_string(),
            task_sender,
            result_receiver,
            workers,
            submitted: 0,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queues a task and returns its index. Blocks while the queue is full.
    pub fn submit<F>(&mut self, task: F) -> Result<usize, WorkerError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let index = self.submitted;
        self.task_sender
            .send((index, Box::new(task)))
            .map_err(|_| WorkerError::ChannelClosed)?;
        self.submitted += 1;
        Ok(index)
    }

    pub fn join(self) -> Vec<TaskOutcome<T>> {
        self.join_with(|_, _| {})
    }

    /// Waits for every submitted task, calling `on_result` as each one lands.
    pub fn join_with<F>(self, mut on_result: F) -> Vec<TaskOutcome<T>>
    where
        F: FnMut(usize, &TaskOutcome<T>),
    {
        let WorkerPool {
            label,
            task_sender,
            result_receiver,
            workers,
            submitted,
        } = self;

        // Closing the queue lets idle workers exit once it drains.
        drop(task_sender);

        let mut slots: Vec<Option<TaskOutcome<T>>> = (0..submitted).map(|_| None).collect();
        while let Ok((index, outcome)) = result_receiver.recv() {
            on_result(index, &outcome);
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(outcome);
            }
        }

        for (i, worker) in workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("{} worker {} panicked: {:?}", label, i, e);
            } else {
                debug!("{} worker {} finished", label, i);
            }
        }

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| TaskOutcome::Panicked(MISSING_RESULT.to_string())))
            .collect()
    }
}

fn run_worker<T: Send + 'static>(
    worker_id: usize,
    task_receiver: Receiver<(usize, Task<T>)>,
    result_sender: Sender<(usize, TaskOutcome<T>)>,
) {
    debug!("Worker {} started", worker_id);

    while let Ok((index, task)) = task_receiver.recv() {
        debug!("Worker {} running task {}", worker_id, index);

        let outcome = match catch_unwind(AssertUnwindSafe(task)) {
            Ok(value) => TaskOutcome::Completed(value),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Worker {} task {} panicked: {}", worker_id, index, message);
                TaskOutcome::Panicked(message)
            }
        };

        if result_sender.send((index, outcome)).is_err() {
            error!("Worker {} failed to send result for task {}", worker_id, index);
            break;
        }
    }

    debug!("Worker {} stopped", worker_id);
}
