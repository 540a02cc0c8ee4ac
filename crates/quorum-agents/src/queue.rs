use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use quorum_models::{OrchestrationResult, Task, TaskId, TaskStatus};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::OrchestratorError;

/// Heap entry ordered by (priority, insertion sequence).
struct Queued {
    seq: u64,
    task: Task,
}

impl Queued {
    fn key(&self) -> (i32, u64) {
        (self.task.priority, self.seq)
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[derive(Default)]
struct QueueState {
    pending: BinaryHeap<Reverse<Queued>>,
    queued_ids: HashSet<TaskId>,
    processing: HashMap<TaskId, Task>,
    completed: HashMap<TaskId, Arc<OrchestrationResult>>,
    /// Completion order, oldest first, for bounding `completed`.
    completed_order: VecDeque<TaskId>,
    next_seq: u64,
}

impl QueueState {
    fn insert_completed(&mut self, id: TaskId, result: Arc<OrchestrationResult>, limit: usize) {
        if self.completed.insert(id, result).is_none() {
            self.completed_order.push_back(id);
        }
        while self.completed.len() > limit {
            match self.completed_order.pop_front() {
                Some(oldest) => {
                    self.completed.remove(&oldest);
                    debug!(task_id = %oldest, "Evicted unclaimed task result");
                }
                None => break,
            }
        }
    }
}

/// Bounded priority queue of analysis tasks plus the in-flight and completed
/// records of the asynchronous path.
///
/// Lower priority values are served first; equal priorities are FIFO.
pub struct TaskQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    capacity: usize,
    max_completed: usize,
}

impl TaskQueue {
    pub fn new(capacity: usize, max_completed: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            capacity,
            max_completed: max_completed.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a task. Never blocks; fails when `capacity` tasks are already waiting.
    pub fn enqueue(&self, symbol: &str, priority: i32) -> Result<TaskId, OrchestratorError> {
        let task = Task::new(symbol, priority);
        let id = task.id;
        {
            let mut state = self.lock();
            if state.pending.len() >= self.capacity {
                return Err(OrchestratorError::QueueFull {
                    capacity: self.capacity,
                });
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.queued_ids.insert(id);
            state.pending.push(Reverse(Queued { seq, task }));
        }
        debug!(task_id = %id, symbol, priority, "Task enqueued");
        self.notify.notify_one();
        Ok(id)
    }

    fn try_pop(&self) -> Option<Task> {
        let mut state = self.lock();
        let Reverse(Queued { task, .. }) = state.pending.pop()?;
        state.queued_ids.remove(&task.id);
        state.processing.insert(task.id, task.clone());
        Some(task)
    }

    /// Wait up to `timeout` for the next task. Returns `None` on timeout or
    /// cancellation. The returned task is recorded as processing.
    pub async fn dequeue(&self, timeout: Duration, cancel: &CancellationToken) -> Option<Task> {
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(task) = self.try_pop() {
                // Pass the wakeup on if more work remains.
                if !self.is_empty() {
                    self.notify.notify_one();
                }
                return Some(task);
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = &mut deadline => return None,
                _ = cancel.cancelled() => return None,
            }
        }
    }

    /// Move a processing task to the completed record.
    pub fn complete(&self, id: TaskId, result: Arc<OrchestrationResult>) {
        let mut state = self.lock();
        state.processing.remove(&id);
        state.insert_completed(id, result, self.max_completed);
    }

    /// Record a result that needed no processing, returning its new task id.
    pub fn complete_immediately(&self, result: Arc<OrchestrationResult>) -> TaskId {
        let id = TaskId::new();
        self.lock().insert_completed(id, result, self.max_completed);
        id
    }

    /// Forget a processing task whose analysis was discarded.
    pub fn abandon(&self, id: TaskId) {
        self.lock().processing.remove(&id);
    }

    pub fn get_result(&self, id: TaskId) -> Option<Arc<OrchestrationResult>> {
        self.lock().completed.get(&id).cloned()
    }

    /// Remove and return a completed result, ending the task's lifetime.
    pub fn take_result(&self, id: TaskId) -> Option<Arc<OrchestrationResult>> {
        let mut state = self.lock();
        let result = state.completed.remove(&id)?;
        state.completed_order.retain(|t| *t != id);
        Some(result)
    }

    pub fn status(&self, id: TaskId) -> Option<TaskStatus> {
        let state = self.lock();
        if state.completed.contains_key(&id) {
            Some(TaskStatus::Completed)
        } else if state.processing.contains_key(&id) {
            Some(TaskStatus::Processing)
        } else if state.queued_ids.contains(&id) {
            Some(TaskStatus::Queued)
        } else {
            None
        }
    }

    /// Number of tasks waiting to be dequeued.
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn processing_len(&self) -> usize {
        self.lock().processing.len()
    }

    pub fn completed_len(&self) -> usize {
        self.lock().completed.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_models::ConsensusStrategy;

    fn result(symbol: &str) -> Arc<OrchestrationResult> {
        Arc::new(OrchestrationResult::fallback(
            symbol,
            ConsensusStrategy::WeightedAverage,
            "queue test",
            0,
        ))
    }

    #[test]
    fn full_queue_rejects_enqueue() {
        let queue = TaskQueue::new(2, 10);
        queue.enqueue("AAPL", 1).unwrap();
        queue.enqueue("MSFT", 1).unwrap();

        let err = queue.enqueue("TSLA", 1).unwrap_err();
        assert_eq!(err, OrchestratorError::QueueFull { capacity: 2 });
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn dequeue_frees_capacity() {
        let queue = TaskQueue::new(1, 10);
        let cancel = CancellationToken::new();
        queue.enqueue("AAPL", 1).unwrap();
        assert!(queue.enqueue("MSFT", 1).is_err());

        let task = queue.dequeue(Duration::from_millis(10), &cancel).await.unwrap();
        assert_eq!(task.symbol, "AAPL");
        assert!(queue.enqueue("MSFT", 1).is_ok());
    }

    #[tokio::test]
    async fn lower_priority_value_first_then_fifo() {
        let queue = TaskQueue::new(10, 10);
        let cancel = CancellationToken::new();
        queue.enqueue("LOW-A", 5).unwrap();
        queue.enqueue("URGENT", 1).unwrap();
        queue.enqueue("LOW-B", 5).unwrap();

        let mut order = Vec::new();
        while let Some(task) = queue.dequeue(Duration::from_millis(10), &cancel).await {
            order.push(task.symbol);
        }
        assert_eq!(order, vec!["URGENT", "LOW-A", "LOW-B"]);
    }

    #[tokio::test]
    async fn dequeue_times_out_when_empty() {
        let queue = TaskQueue::new(10, 10);
        let cancel = CancellationToken::new();
        let start = std::time::Instant::now();
        assert!(queue.dequeue(Duration::from_millis(30), &cancel).await.is_none());
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[tokio::test]
    async fn cancellation_wakes_blocked_dequeue() {
        let queue = Arc::new(TaskQueue::new(10, 10));
        let cancel = CancellationToken::new();

        let waiter = {
            let queue = queue.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { queue.dequeue(Duration::from_secs(30), &cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("dequeue should return promptly after cancel")
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn blocked_dequeue_receives_later_enqueue() {
        let queue = Arc::new(TaskQueue::new(10, 10));
        let cancel = CancellationToken::new();

        let waiter = {
            let queue = queue.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { queue.dequeue(Duration::from_secs(5), &cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        let id = queue.enqueue("NVDA", 0).unwrap();
        let task = waiter.await.unwrap().unwrap();
        assert_eq!(task.id, id);
        assert_eq!(queue.status(id), Some(TaskStatus::Processing));
    }

    #[tokio::test]
    async fn concurrent_workers_never_share_a_task() {
        let queue = Arc::new(TaskQueue::new(200, 200));
        let cancel = CancellationToken::new();
        for i in 0..100 {
            queue.enqueue(&format!("SYM{i}"), i % 3).unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let queue = queue.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(task) = queue.dequeue(Duration::from_millis(20), &cancel).await {
                    seen.push(task.id);
                    tokio::task::yield_now().await;
                }
                seen
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        let unique: HashSet<TaskId> = all.iter().copied().collect();
        assert_eq!(all.len(), 100);
        assert_eq!(unique.len(), 100);
    }

    #[tokio::test]
    async fn task_lifecycle_through_statuses() {
        let queue = TaskQueue::new(10, 10);
        let cancel = CancellationToken::new();
        let id = queue.enqueue("AAPL", 1).unwrap();
        assert_eq!(queue.status(id), Some(TaskStatus::Queued));
        assert!(queue.get_result(id).is_none());

        let task = queue.dequeue(Duration::from_millis(10), &cancel).await.unwrap();
        assert_eq!(queue.status(id), Some(TaskStatus::Processing));
        assert_eq!(queue.processing_len(), 1);

        let stored = result("AAPL");
        queue.complete(task.id, stored.clone());
        assert_eq!(queue.status(id), Some(TaskStatus::Completed));
        assert_eq!(queue.processing_len(), 0);
        assert!(Arc::ptr_eq(&queue.get_result(id).unwrap(), &stored));

        // Peeking keeps the result; taking removes it.
        assert!(queue.get_result(id).is_some());
        assert!(queue.take_result(id).is_some());
        assert_eq!(queue.status(id), None);
        assert!(queue.take_result(id).is_none());
    }

    #[test]
    fn completed_results_are_bounded() {
        let queue = TaskQueue::new(10, 2);
        let first = queue.complete_immediately(result("A"));
        let second = queue.complete_immediately(result("B"));
        let third = queue.complete_immediately(result("C"));

        assert_eq!(queue.completed_len(), 2);
        assert!(queue.get_result(first).is_none());
        assert!(queue.get_result(second).is_some());
        assert!(queue.get_result(third).is_some());
    }

    #[tokio::test]
    async fn abandon_drops_processing_task() {
        let queue = TaskQueue::new(10, 10);
        let cancel = CancellationToken::new();
        let id = queue.enqueue("AAPL", 1).unwrap();
        queue.dequeue(Duration::from_millis(10), &cancel).await.unwrap();

        queue.abandon(id);
        assert_eq!(queue.status(id), None);
        assert_eq!(queue.processing_len(), 0);
    }
}
