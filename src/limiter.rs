// SPDX-FileCopyrightText: 2022 Hewlett-Packard Development Company, L.P.
//
// SPDX-License-Identifier: GPL-3.0-only

use std::{
    any::Any,
    fmt,
    num::NonZeroUsize,
    panic::{self, AssertUnwindSafe},
    sync::{mpsc, Mutex},
    thread,
};

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Failure of a single task, captured at the scheduler boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskError {
    pub index: usize,
    pub message: String,
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "task {} failed: {}", self.index, self.message)
    }
}

impl std::error::Error for TaskError {}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked".to_string()
    }
}

/// Run `tasks` with at most `limit` in flight at once.
///
/// Every task runs exactly once. Result `i` always belongs to task `i`, no
/// matter which task finishes first. A task that returns an error or panics
/// only fills its own slot with a `TaskError`; its siblings keep running.
pub fn run_bounded<T, E, F>(tasks: Vec<F>, limit: NonZeroUsize) -> Vec<Result<T, TaskError>>
where
    F: FnOnce() -> Result<T, E> + Send,
    T: Send,
    E: fmt::Display,
{
    let len = tasks.len();
    let mut slots: Vec<Option<Result<T, TaskError>>> = (0..len).map(|_| None).collect();
    if len == 0 {
        return Vec::new();
    }

    // Workers pull the next unstarted task from this shared cursor, so a free
    // worker is the only thing that admits new work.
    let queue = Mutex::new(tasks.into_iter().enumerate());
    let (sender, receiver) = mpsc::channel();

    thread::scope(|scope| {
        for _ in 0..limit.get().min(len) {
            let queue = &queue;
            let sender = sender.clone();
            scope.spawn(move || loop {
                let next = match queue.lock() {
                    Ok(mut queue) => queue.next(),
                    Err(poisoned) => poisoned.into_inner().next(),
                };
                let (index, task) = match next {
                    Some(next) => next,
                    None => break,
                };
                let result = match panic::catch_unwind(AssertUnwindSafe(task)) {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(err)) => Err(TaskError {
                        index,
                        message: err.to_string(),
                    }),
                    Err(payload) => Err(TaskError {
                        index,
                        message: panic_message(payload),
                    }),
                };
                if sender.send((index, result)).is_err() {
                    break;
                }
            });
        }
        drop(sender);

        for (index, result) in receiver {
            slots[index] = Some(result);
        }
    });

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                Err(TaskError {
                    index,
                    message: "task did not complete".to_string(),
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    fn limit(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    type Task<'a> = Box<dyn FnOnce() -> Result<usize, String> + Send + 'a>;

    // Deterministic but scrambled per-task delays
    fn delay(i: usize) -> Duration {
        Duration::from_millis(((i * 7919 + 13) % 23) as u64)
    }

    #[test]
    fn bounded_and_ordered() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let runs = AtomicUsize::new(0);

        let tasks: Vec<Task> = (0..40)
            .map(|i| {
                let in_flight = &in_flight;
                let peak = &peak;
                let runs = &runs;
                Box::new(move || {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    runs.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(delay(i));
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(i * 10)
                }) as Task
            })
            .collect();

        let results = run_bounded(tasks, limit(5));

        assert_eq!(runs.load(Ordering::SeqCst), 40);
        assert!(peak.load(Ordering::SeqCst) <= 5);
        let values: Vec<usize> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, (0..40).map(|i| i * 10).collect::<Vec<_>>());
    }

    #[test]
    fn failures_stay_in_their_slot() {
        let tasks: Vec<Task> = (0..6)
            .map(|i| {
                Box::new(move || {
                    thread::sleep(delay(i));
                    match i {
                        1 => Err("lookup failed".to_string()),
                        4 => panic!("worker blew up"),
                        _ => Ok(i),
                    }
                }) as Task
            })
            .collect();

        let results = run_bounded(tasks, limit(2));

        assert_eq!(results.len(), 6);
        assert_eq!(results[0], Ok(0));
        assert_eq!(
            results[1],
            Err(TaskError {
                index: 1,
                message: "lookup failed".to_string()
            })
        );
        assert_eq!(results[2], Ok(2));
        assert_eq!(results[3], Ok(3));
        assert_eq!(results[4].as_ref().unwrap_err().message, "worker blew up");
        assert_eq!(results[5], Ok(5));
    }

    #[test]
    fn limit_above_task_count() {
        let tasks: Vec<Task> = (0..3usize).map(|i| Box::new(move || Ok(i)) as Task).collect();
        let results = run_bounded(tasks, limit(50));
        assert_eq!(results, vec![Ok(0), Ok(1), Ok(2)]);
    }

    #[test]
    fn empty() {
        let results = run_bounded(Vec::<Task>::new(), limit(5));
        assert!(results.is_empty());
    }
}
