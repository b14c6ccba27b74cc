//! Bounded-concurrency fan-out.
//!
//! A [`TaskGroup`] spawns every unit onto the runtime immediately, but each
//! unit must hold a semaphore permit while it runs, so at most `limit` are in
//! flight. [`TaskGroup::join_all`] returns one result per unit in spawn
//! order. Dropping the group (for example because the calling future was
//! cancelled) aborts every unit that has not finished.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// A unit that panicked (or was aborted) before producing a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("task panicked before completing")]
pub struct TaskPanicked;

pub struct TaskGroup<T> {
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<(usize, T)>,
    spawned: usize,
}

impl<T: Send + 'static> TaskGroup<T> {
    /// A group running at most `limit` units at once (at least one).
    pub fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit.max(1))),
            tasks: JoinSet::new(),
            spawned: 0,
        }
    }

    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let slot = self.spawned;
        self.spawned += 1;
        let semaphore = Arc::clone(&self.semaphore);
        self.tasks.spawn(async move {
            // The semaphore is never closed, so acquisition only fails if the
            // group is gone, in which case this task is being aborted anyway.
            let _permit = semaphore.acquire_owned().await.ok();
            (slot, future.await)
        });
    }

    pub fn len(&self) -> usize {
        self.spawned
    }

    pub fn is_empty(&self) -> bool {
        self.spawned == 0
    }

    /// Wait for every unit and return their outputs in spawn order.
    pub async fn join_all(mut self) -> Vec<Result<T, TaskPanicked>> {
        let mut slots: Vec<Option<T>> = (0..self.spawned).map(|_| None).collect();

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((slot, value)) => slots[slot] = Some(value),
                Err(e) => tracing::error!(error = %e, "Task group unit failed to complete"),
            }
        }

        slots
            .into_iter()
            .map(|slot| slot.ok_or(TaskPanicked))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn results_come_back_in_spawn_order() {
        let mut group = TaskGroup::new(4);
        for i in 0..8u64 {
            group.spawn(async move {
                // Later units finish first.
                tokio::time::sleep(Duration::from_millis(16 - 2 * i)).await;
                i
            });
        }
        let results: Vec<u64> = group
            .join_all()
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(results, (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn never_exceeds_the_limit() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut group = TaskGroup::new(2);
        for _ in 0..10 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            group.spawn(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        assert_eq!(group.len(), 10);
        group.join_all().await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn a_panicking_unit_does_not_affect_the_others() {
        let mut group = TaskGroup::new(3);
        group.spawn(async { 1 });
        group.spawn(async { panic!("boom") });
        group.spawn(async { 3 });

        let results = group.join_all().await;
        assert_eq!(results, vec![Ok(1), Err(TaskPanicked), Ok(3)]);
    }

    #[tokio::test]
    async fn dropping_the_group_aborts_pending_units() {
        let finished = Arc::new(AtomicBool::new(false));
        let mut group = TaskGroup::new(1);
        let flag = Arc::clone(&finished);
        group.spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        });

        drop(group);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn empty_group_joins_to_nothing() {
        let group: TaskGroup<()> = TaskGroup::new(4);
        assert!(group.is_empty());
        assert!(group.join_all().await.is_empty());
    }
}
