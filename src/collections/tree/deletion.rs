use std::cmp;
use std::ptr::NonNull;

use derive_more::{Display, Error, IsVariant};

use crate::collections::flat::FlatVector;
use crate::collections::settings::DEFAULT_MAX_DEPTH;
#[doc(inline)]
pub use crate::util::error::RecursionLimitExceeded;
use crate::util::option::OptionExt;

/// The step a [`Deletion`] took most recently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IsVariant)]
pub enum State {
    /// A child was pushed onto the stack and will be scanned next.
    Descend,
    /// A vacant slot of the current container was skipped.
    ScanChild,
    /// A container ran out of slots, was released and popped off the stack.
    Ascend,
    /// The stack is empty and every container has been released.
    Finished,
}

/// Counters collected over a finished [`Deletion`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeletionStats {
    /// The number of containers released, the root included.
    pub released: usize,
    /// The largest number of frames that were on the stack at once.
    pub deepest: usize,
}

/// A deletion that hit its depth limit. The part of the tree that wasn't released yet is handed
/// back, with every released subtree already detached from it.
#[derive(Debug, Display, Error)]
#[display("{source}")]
pub struct DeleteError {
    pub source: RecursionLimitExceeded,
    pub remainder: FlatVector,
}

struct Frame {
    vec: NonNull<FlatVector>,
    next: usize,
}

/// The traversal underneath both [`Deletion`] and the destructor of [`FlatVector`].
///
/// Releases every descendant of the root, deepest first, leaving the root itself with only vacant
/// slots. The root is never released here.
pub(crate) struct Walk {
    stack: Vec<Frame>,
    limit: usize,
    state: State,
    released: usize,
    deepest: usize,
}

impl Walk {
    /// Starts a walk below `root`, which must stay valid and otherwise untouched until the walk
    /// finishes or is dropped.
    pub fn new(root: NonNull<FlatVector>, limit: usize) -> Walk {
        Walk {
            stack: vec![Frame { vec: root, next: 0 }],
            limit,
            state: State::Descend,
            released: 0,
            deepest: 1,
        }
    }

    pub const fn state(&self) -> State {
        self.state
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Takes a single step, returning the new state. Once finished, further steps do nothing.
    ///
    /// # Errors
    /// Returns [`RecursionLimitExceeded`] when the next container to visit would put more frames on
    /// the stack than the limit allows. Nothing changes in that case, so the same error is returned
    /// by every later step.
    pub fn step(&mut self) -> Result<State, RecursionLimitExceeded> {
        if self.state.is_finished() {
            return Ok(State::Finished);
        }
        if self.stack.len() > self.limit {
            return Err(RecursionLimitExceeded { limit: self.limit });
        }

        // SAFETY: The stack is only empty once finished.
        let top = unsafe { self.stack.last_mut().assume_some() };
        // SAFETY: Every frame points either at the root or at a child still owned by the frame
        // below it, and nothing else accesses the tree during the walk.
        let vec = unsafe { top.vec.as_ref() };
        let slots = if vec.kind().is_nested() { vec.len() } else { 0 };

        self.state = if top.next < slots {
            match vec.child_ptr(top.next) {
                Some(child) => {
                    if self.stack.len() >= self.limit {
                        return Err(RecursionLimitExceeded { limit: self.limit });
                    }

                    self.stack.push(Frame { vec: child, next: 0 });
                    self.deepest = cmp::max(self.deepest, self.stack.len());
                    State::Descend
                },
                None => {
                    top.next += 1;
                    State::ScanChild
                },
            }
        } else {
            // SAFETY: The stack was non-empty above.
            let done = unsafe { self.stack.pop().assume_some() };

            match self.stack.last_mut() {
                Some(parent) => {
                    // SAFETY: The parent's slot at `next` holds the only pointer to `done`, which
                    // came from Box::into_raw. It is vacated before the child's storage and box
                    // are released, and all of the child's own slots are already vacant.
                    unsafe {
                        parent.vec.as_mut().clear_child_ptr(parent.next);
                        (*done.vec.as_ptr()).release_storage();
                        drop(Box::from_raw(done.vec.as_ptr()));
                    }

                    parent.next += 1;
                    self.released += 1;
                    State::Ascend
                },
                None => State::Finished,
            }
        };

        Ok(self.state)
    }
}

/// A step-wise, depth-bounded teardown of a [`FlatVector`] tree.
///
/// The tree is walked depth-first with an explicit stack of `(container, next slot)` frames, so
/// deletion uses heap memory proportional to the depth of the tree rather than call stack. A child
/// is only released after all of its own children, and only once its parent's slot no longer
/// refers to it.
///
/// # Examples
/// ```
/// # use packed_vector::collections::flat::FlatVector;
/// # use packed_vector::collections::tree::{Deletion, State};
/// let mut root = FlatVector::nested(2).unwrap();
/// root.push(FlatVector::new(1, 1).unwrap()).unwrap();
///
/// let mut deletion = Deletion::new(root, 10);
/// assert_eq!(deletion.step(), Ok(State::Descend));
/// assert_eq!(deletion.depth(), 2);
/// let stats = deletion.run().unwrap();
/// assert_eq!(stats.released, 2);
/// ```
pub struct Deletion {
    root: Option<NonNull<FlatVector>>,
    walk: Walk,
}

impl Deletion {
    /// Prepares to delete `tree`, allowing at most `max_depth` containers on the stack at once. The
    /// root counts as the first.
    pub fn new(tree: FlatVector, max_depth: usize) -> Deletion {
        let root = NonNull::from(Box::leak(Box::new(tree)));

        Deletion {
            root: Some(root),
            walk: Walk::new(root, max_depth),
        }
    }

    /// Prepares to delete `tree` with [`DEFAULT_MAX_DEPTH`].
    pub fn with_default_depth(tree: FlatVector) -> Deletion {
        Deletion::new(tree, DEFAULT_MAX_DEPTH)
    }

    /// Returns the most recent state.
    pub const fn state(&self) -> State {
        self.walk.state()
    }

    /// Returns the number of frames currently on the stack.
    pub fn depth(&self) -> usize {
        self.walk.depth()
    }

    /// Takes a single traversal step. The root is released along with the step that finishes the
    /// deletion.
    ///
    /// # Errors
    /// Returns [`RecursionLimitExceeded`] if the tree is deeper than the limit. Subtrees released
    /// before this stay released; the rest can be recovered with
    /// [`into_remainder`](Deletion::into_remainder).
    pub fn step(&mut self) -> Result<State, RecursionLimitExceeded> {
        let state = self.walk.step()?;

        if !state.is_finished() {
            return Ok(state);
        }

        if let Some(root) = self.root.take() {
            // SAFETY: The root came from Box::leak in new, and the finished walk no longer
            // refers to it.
            let mut root = unsafe { Box::from_raw(root.as_ptr()) };
            root.release_storage();
            self.walk.released += 1;
            log::debug!(
                "deleted tree of {} containers, {} levels deep",
                self.walk.released,
                self.walk.deepest
            );
        }

        Ok(state)
    }

    /// Steps until the deletion finishes.
    ///
    /// # Errors
    /// Returns a [`DeleteError`] holding the unreleased remainder of the tree if the depth limit is
    /// exceeded.
    pub fn run(mut self) -> Result<DeletionStats, DeleteError> {
        loop {
            match self.step() {
                Ok(State::Finished) => return Ok(self.stats()),
                Ok(_) => {},
                Err(source) => {
                    log::debug!(
                        "aborted tree deletion after {} containers: {source}",
                        self.walk.released
                    );
                    // SAFETY: The root is only taken by the finishing step, after which step never
                    // fails.
                    let remainder = unsafe { self.into_remainder().assume_some() };
                    return Err(DeleteError { source, remainder });
                },
            }
        }
    }

    /// Returns the counters collected so far.
    pub const fn stats(&self) -> DeletionStats {
        DeletionStats {
            released: self.walk.released,
            deepest: self.walk.deepest,
        }
    }

    /// Abandons the deletion, returning the part of the tree that hasn't been released yet, or
    /// [`None`] if the deletion already finished.
    pub fn into_remainder(mut self) -> Option<FlatVector> {
        self.take_remainder()
    }

    fn take_remainder(&mut self) -> Option<FlatVector> {
        // SAFETY: The root came from Box::leak in new and is taken at most once. Every subtree
        // the walk released was already detached from it, and the walk isn't stepped again.
        self.root.take().map(|root| *unsafe { Box::from_raw(root.as_ptr()) })
    }
}

impl Drop for Deletion {
    fn drop(&mut self) {
        // An abandoned deletion drops whatever is left of the tree normally.
        drop(self.take_remainder());
    }
}

/// Deletes `tree`, releasing every container in it exactly once.
///
/// # Errors
/// Returns a [`DeleteError`] holding the unreleased remainder of the tree if it is deeper than
/// `max_depth`.
///
/// # Examples
/// ```
/// # use packed_vector::collections::flat::FlatVector;
/// # use packed_vector::collections::tree::delete;
/// let mut tree = FlatVector::nested(1).unwrap();
/// for _ in 0..3 {
///     let mut parent = FlatVector::nested(1).unwrap();
///     parent.push(tree).unwrap();
///     tree = parent;
/// }
///
/// assert!(delete(tree, 2).is_err());
/// ```
pub fn delete(tree: FlatVector, max_depth: usize) -> Result<DeletionStats, DeleteError> {
    Deletion::new(tree, max_depth).run()
}
