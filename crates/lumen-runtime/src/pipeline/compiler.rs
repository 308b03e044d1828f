// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Background pipeline state compilation.

use crate::sync::lock;
use crossbeam_channel::{Receiver, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn finish_one(&self) {
        let mut count = lock(&self.count);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}

/// A pool of worker threads running pipeline state builds.
///
/// Dropping the compiler closes the queue, lets the workers finish every job
/// already queued and joins them. A panicking job is logged and counted as
/// done; the worker keeps serving the queue.
pub struct PipelineStateCompiler {
    sender: Option<Sender<Job>>,
    workers: Vec<thread::JoinHandle<()>>,
    in_flight: Arc<InFlight>,
}

impl PipelineStateCompiler {
    /// Starts `number_of_threads` workers, at least one.
    pub fn new(number_of_threads: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let in_flight = Arc::new(InFlight::default());
        let workers = (0..number_of_threads.max(1))
            .filter_map(|index| {
                let receiver: Receiver<Job> = receiver.clone();
                let in_flight = Arc::clone(&in_flight);
                thread::Builder::new()
                    .name(format!("lumen-pso-{index}"))
                    .spawn(move || {
                        for job in receiver.iter() {
                            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                                log::error!(
                                    "Pipeline state compiler worker {} caught a panicking job: {}",
                                    index,
                                    panic_message(payload.as_ref())
                                );
                            }
                            in_flight.finish_one();
                        }
                        log::trace!("Pipeline state compiler worker {} stopped", index);
                    })
                    .inspect_err(|error| {
                        log::error!("Cannot start pipeline state compiler worker {}: {}", index, error)
                    })
                    .ok()
            })
            .collect::<Vec<_>>();
        log::info!("Pipeline state compiler started with {} workers", workers.len());
        Self {
            sender: Some(sender),
            workers,
            in_flight,
        }
    }

    /// Number of running workers.
    pub fn number_of_workers(&self) -> usize {
        self.workers.len()
    }

    /// Queues a job. Without workers the job runs on the calling thread.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        let job: Job = Box::new(job);
        let Some(sender) = self.sender.as_ref().filter(|_| !self.workers.is_empty()) else {
            job();
            return;
        };
        *lock(&self.in_flight.count) += 1;
        if let Err(rejected) = sender.send(job) {
            self.in_flight.finish_one();
            (rejected.into_inner())();
        }
    }

    /// Number of queued or running jobs.
    pub fn pending(&self) -> usize {
        *lock(&self.in_flight.count)
    }

    /// Blocks until every queued job has run.
    pub fn wait_until_idle(&self) {
        let mut count = lock(&self.in_flight.count);
        while *count > 0 {
            count = self
                .in_flight
                .idle
                .wait(count)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }
}

impl Drop for PipelineStateCompiler {
    fn drop(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("A pipeline state compiler worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for PipelineStateCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineStateCompiler")
            .field("workers", &self.workers.len())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn every_queued_job_runs_before_drop_returns() {
        let counter = Arc::new(AtomicUsize::new(0));
        let compiler = PipelineStateCompiler::new(2);
        for _ in 0..32 {
            let counter = Arc::clone(&counter);
            compiler.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(compiler);
        assert_eq!(counter.load(Ordering::SeqCst), 32);
    }

    #[test]
    fn wait_until_idle_observes_completed_jobs() {
        let counter = Arc::new(AtomicUsize::new(0));
        let compiler = PipelineStateCompiler::new(3);
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            compiler.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        compiler.wait_until_idle();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
        assert_eq!(compiler.pending(), 0);
    }

    #[test]
    fn a_panicking_job_does_not_stall_the_queue() {
        let counter = Arc::new(AtomicUsize::new(0));
        let compiler = Arc::new(PipelineStateCompiler::new(1));
        compiler.submit(|| panic!("pipeline state build failed"));
        let later = Arc::clone(&counter);
        compiler.submit(move || {
            later.fetch_add(1, Ordering::SeqCst);
        });

        let (idle_sender, idle_receiver) = crossbeam_channel::bounded(1);
        let waiting = Arc::clone(&compiler);
        let waiter = thread::spawn(move || {
            waiting.wait_until_idle();
            let _ = idle_sender.send(());
        });
        assert!(idle_receiver
            .recv_timeout(std::time::Duration::from_secs(5))
            .is_ok());
        waiter.join().unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(compiler.pending(), 0);
        assert_eq!(compiler.number_of_workers(), 1);
    }
}
