//! The authoritative task store.
//!
//! [`TaskStore`] is the single owner of all task records and the only writer
//! of the derived text index. Every public operation is safe for concurrent
//! use; all reads and writes serialize through one mutex so a reader can
//! never observe a half-committed mutation. The index is queried while that
//! lock is held, which keeps search results consistent with concurrent
//! add/edit/delete by construction.

pub mod index;
pub mod models;
pub mod query;

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use index::{MemoryIndex, TextIndex};
use models::{validate, SearchFilters, Status, Task};
use query::TextQuery;

/// In-memory task store with a derived full-text index.
///
/// Generic over the index implementation so tests can substitute a failing
/// index; production code uses the default [`MemoryIndex`].
pub struct TaskStore<I: TextIndex = MemoryIndex> {
    next_id: AtomicI64,
    inner: Mutex<Inner<I>>,
}

struct Inner<I> {
    /// Primary collection in insertion order.
    tasks: Vec<Task>,
    /// Id to position in `tasks`.
    by_id: HashMap<i64, usize>,
    /// Derived text index, kept in lockstep with `tasks`.
    index: I,
}

impl TaskStore<MemoryIndex> {
    /// Create an empty store backed by the in-memory index.
    #[must_use]
    pub fn new() -> Self {
        Self::with_index(MemoryIndex::new())
    }
}

impl Default for TaskStore<MemoryIndex> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: TextIndex> TaskStore<I> {
    /// Create an empty store backed by the given index.
    pub fn with_index(index: I) -> Self {
        Self {
            next_id: AtomicI64::new(0),
            inner: Mutex::new(Inner { tasks: Vec::new(), by_id: HashMap::new(), index }),
        }
    }

    /// Add a new task, returning its assigned id.
    ///
    /// Ids are strictly increasing and never reused within the store's
    /// lifetime. The new task starts as [`Status::Open`] and unarchived.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the inputs are invalid, or
    /// [`Error::Index`] if indexing fails; in either case no task becomes
    /// visible.
    pub fn add(
        &self,
        title: &str,
        description: &str,
        created: DateTime<Utc>,
        due: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        let v = validate(title, description);
        if v.is_err() {
            return Err(v.into());
        }

        let mut inner = self.inner.lock();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let task = Task {
            id,
            title: title.to_string(),
            description: description.to_string(),
            status: Status::Open,
            archived: false,
            created,
            due,
        };

        // Index first: an index failure aborts the add entirely and the
        // task never becomes visible.
        inner.index.upsert(id, &task.title, &task.description, task.archived)?;

        let pos = inner.tasks.len();
        inner.tasks.push(task);
        inner.by_id.insert(id, pos);
        Ok(id)
    }

    /// Edit a task in place via copy-on-write staging.
    ///
    /// The mutation runs against a scratch copy; the copy is validated and
    /// only then committed, so a failed mutation or validation leaves the
    /// stored task untouched. On success the index is updated last; an index
    /// error is surfaced after the field changes have committed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no task has the given id,
    /// [`Error::Validation`] if the mutated task is invalid, or any error
    /// returned by the mutation itself.
    ///
    /// # Panics
    ///
    /// Panics if the mutation changes the task's id. Ids key the lookup map
    /// and the index; mutating one would silently corrupt both, so this is
    /// a programming-contract violation rather than a recoverable error.
    pub fn edit<F>(&self, id: i64, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Task) -> Result<()>,
    {
        let mut inner = self.inner.lock();
        let pos = *inner.by_id.get(&id).ok_or(Error::NotFound(id))?;

        let mut staged = inner.tasks[pos].clone();
        mutate(&mut staged)?;
        assert_eq!(staged.id, id, "task ids are immutable, the mutation must not change them");

        let v = validate(&staged.title, &staged.description);
        if v.is_err() {
            return Err(v.into());
        }

        inner.tasks[pos] = staged;
        let task = inner.tasks[pos].clone();
        inner.index.upsert(id, &task.title, &task.description, task.archived)
    }

    /// Mark a task archived, hiding it from default listings.
    ///
    /// The index is updated with the new archived flag before the live
    /// record flips, so a text search never returns a just-archived task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no task has the given id, or
    /// [`Error::Index`] if re-indexing fails (the flag is left unflipped).
    pub fn archive(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.lock();
        let pos = *inner.by_id.get(&id).ok_or(Error::NotFound(id))?;

        let (title, description) =
            (inner.tasks[pos].title.clone(), inner.tasks[pos].description.clone());
        inner.index.upsert(id, &title, &description, true)?;
        inner.tasks[pos].archived = true;
        Ok(())
    }

    /// Delete a task from the primary collection, the id map, and the
    /// index as one atomic step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no task has the given id.
    pub fn delete(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.lock();
        let pos = *inner.by_id.get(&id).ok_or(Error::NotFound(id))?;

        inner.tasks.remove(pos);
        inner.by_id.remove(&id);
        for p in inner.by_id.values_mut() {
            if *p > pos {
                *p -= 1;
            }
        }
        inner.index.remove(id)
    }

    /// Query tasks.
    ///
    /// With blank text this is a structural filter over the primary
    /// collection by the archived flag, preserving insertion order, and
    /// never touches the index. With a text query the index ranks hits and
    /// they are resolved back to full records; hits that no longer resolve
    /// are silently skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Index`] if the index query fails.
    pub fn search(&self, filters: &SearchFilters) -> Result<Vec<Task>> {
        let inner = self.inner.lock();

        let Some(q) = TextQuery::build(filters) else {
            // Fast path: structural filter only.
            return Ok(inner
                .tasks
                .iter()
                .filter(|t| t.archived == filters.archived)
                .cloned()
                .collect());
        };

        let hits = inner.index.search(&q)?;
        Ok(hits
            .into_iter()
            .filter_map(|id| inner.by_id.get(&id).map(|&pos| &inner.tasks[pos]))
            .filter(|t| t.archived == filters.archived)
            .cloned()
            .collect())
    }

    /// Number of tasks in the store, archived included.
    pub fn len(&self) -> usize {
        self.inner.lock().tasks.len()
    }

    /// Whether the store holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().tasks.is_empty()
    }
}
