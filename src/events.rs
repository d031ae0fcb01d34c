//! Domain events published by collaborators after successful mutations.
//!
//! The store itself knows nothing about the broadcaster; the wiring lives
//! one layer up. These helpers exist so that layer never hand-rolls topic
//! ids.

use crate::broadcast::{Event, Subscription, TopicBroadcaster, TopicId};

/// Topic for [`TaskEvent::TasksChanged`].
pub const TOPIC_TASKS_CHANGED: TopicId = 1;

/// Events about the task collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    /// The task collection changed: something was added, edited, archived
    /// or deleted. Carries no payload; subscribers re-query the store.
    TasksChanged,
}

impl Event for TaskEvent {
    fn topic(&self) -> TopicId {
        match self {
            Self::TasksChanged => TOPIC_TASKS_CHANGED,
        }
    }
}

/// Broadcaster carrying [`TaskEvent`]s.
pub type TaskBroadcaster = TopicBroadcaster<TaskEvent>;

/// Notify all subscribers that the task collection changed, returning the
/// number of subscribers dispatched to.
pub fn notify_tasks_changed(broadcaster: &TaskBroadcaster) -> usize {
    broadcaster.notify(TaskEvent::TasksChanged)
}

/// Subscribe to task collection changes.
pub fn on_tasks_changed<F>(broadcaster: &TaskBroadcaster, callback: F) -> Subscription<TaskEvent>
where
    F: Fn(TaskEvent) + Send + Sync + 'static,
{
    broadcaster.subscribe(TOPIC_TASKS_CHANGED, callback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_event_topic_is_stable() {
        assert_eq!(TaskEvent::TasksChanged.topic(), TOPIC_TASKS_CHANGED);
    }

    #[test]
    fn test_notify_reaches_on_tasks_changed_subscribers() {
        let b = TaskBroadcaster::new();
        let (tx, rx) = mpsc::channel();
        let _sub = on_tasks_changed(&b, move |event| tx.send(event).unwrap());

        assert_eq!(notify_tasks_changed(&b), 1);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), TaskEvent::TasksChanged);
    }
}
