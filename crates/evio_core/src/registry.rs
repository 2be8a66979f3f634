//! Handle registry.
//!
//! Sessions are addressed by small positive integers. Locking has three
//! tiers:
//!
//! 1. the slot table lock, held only while a handle is looked up, added or
//!    removed
//! 2. a per-session gate, shared by every operation and taken exclusively
//!    by close, so a close waits for operations already running and later
//!    ones see a closed session
//! 3. a per-session mutex around the session state itself

use crate::config::OpenOptions;
use crate::control::{Control, ControlReply};
use crate::error::{EvioError, EvioResult};
use crate::mode::{OpenFlags, Target};
use crate::random::{EventLocation, EventView};
use crate::session::Session;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;

/// Slots allocated by a new registry.
pub const INITIAL_SLOTS: usize = 100;

/// An open session's handle. Handles start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32);

impl Handle {
    /// Wraps a raw handle value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw handle value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    fn slot(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct SessionCell {
    /// True once the session has been closed.
    closed: RwLock<bool>,
    session: Mutex<Session>,
}

/// Table of open sessions.
///
/// A `Registry` is `Send + Sync`; share it between threads with an `Arc`.
///
/// Close every handle before dropping the registry. Dropping it closes the
/// sessions still open and logs a warning for each, but errors from those
/// closes can only be logged.
///
/// ```rust,ignore
/// use evio_core::{Registry, OpenOptions};
///
/// let registry = Registry::new();
/// let out = registry.open("run_%d.evio", "w")?;
/// registry.write(out, &[1, 0x0001_0100, 42])?;
/// registry.close(out)?;
/// ```
pub struct Registry {
    slots: Mutex<Vec<Option<Arc<SessionCell>>>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(INITIAL_SLOTS);
        slots.resize_with(INITIAL_SLOTS, || None);
        Self {
            slots: Mutex::new(slots),
        }
    }

    /// Opens `target` with a mode string such as `"r"`, `"wb"` or `"ra"`.
    ///
    /// # Errors
    ///
    /// - [`EvioError::BadArgument`] for an unknown mode or a target that
    ///   does not fit it
    /// - any error from opening the stream
    pub fn open(&self, target: impl Into<Target>, mode: &str) -> EvioResult<Handle> {
        self.open_with(target, mode, &OpenOptions::default())
    }

    /// Opens `target` with explicit options.
    ///
    /// # Errors
    ///
    /// As [`Registry::open`], plus invalid option values.
    pub fn open_with(
        &self,
        target: impl Into<Target>,
        mode: &str,
        options: &OpenOptions,
    ) -> EvioResult<Handle> {
        let flags: OpenFlags = mode.parse()?;
        let session = Session::open(target.into(), flags, options)?;
        let cell = Arc::new(SessionCell {
            closed: RwLock::new(false),
            session: Mutex::new(session),
        });
        Ok(self.insert(cell))
    }

    fn insert(&self, cell: Arc<SessionCell>) -> Handle {
        let mut slots = self.slots.lock();
        let index = match slots.iter().position(Option::is_none) {
            Some(index) => index,
            None => {
                let index = slots.len();
                let grown = index + (index / 2).max(1);
                slots.resize_with(grown, || None);
                tracing::debug!(slots = grown, "grew handle table");
                index
            }
        };
        slots[index] = Some(cell);
        Handle(index as u32 + 1)
    }

    fn cell(&self, handle: Handle) -> EvioResult<Arc<SessionCell>> {
        let slots = self.slots.lock();
        handle
            .slot()
            .and_then(|i| slots.get(i))
            .and_then(Option::as_ref)
            .map(Arc::clone)
            .ok_or(EvioError::BadHandle {
                handle: handle.get(),
            })
    }

    fn with_session<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&mut Session) -> EvioResult<R>,
    ) -> EvioResult<R> {
        let cell = self.cell(handle)?;
        let closed = cell.closed.read();
        if *closed {
            return Err(EvioError::BadHandle {
                handle: handle.get(),
            });
        }
        let mut session = cell.session.lock();
        f(&mut session)
    }

    /// Flushes and closes a session, then frees its handle.
    ///
    /// Waits for operations already running on the handle.
    ///
    /// # Errors
    ///
    /// - [`EvioError::BadHandle`] if the handle is not open
    /// - any error from the final flush; the handle is freed regardless
    pub fn close(&self, handle: Handle) -> EvioResult<()> {
        let cell = self.cell(handle)?;
        let mut closed = cell.closed.write();
        if *closed {
            return Err(EvioError::BadHandle {
                handle: handle.get(),
            });
        }
        *closed = true;
        let result = cell.session.lock().close();
        drop(closed);

        let mut slots = self.slots.lock();
        if let Some(slot) = handle.slot().and_then(|i| slots.get_mut(i)) {
            if slot.as_ref().is_some_and(|c| Arc::ptr_eq(c, &cell)) {
                *slot = None;
            }
        }
        result
    }

    /// Copies the next event into `buf` and returns its length in words, or
    /// `None` at the end of the stream.
    ///
    /// # Errors
    ///
    /// - [`EvioError::Truncated`] if `buf` is too small; the event stays
    ///   unread
    /// - [`EvioError::BadMode`] unless the handle reads sequentially
    pub fn read(&self, handle: Handle, buf: &mut [u32]) -> EvioResult<Option<usize>> {
        self.with_session(handle, |s| s.read(buf))
    }

    /// Reads the next event into a new vector.
    ///
    /// # Errors
    ///
    /// [`EvioError::BadMode`] unless the handle reads sequentially.
    pub fn read_alloc(&self, handle: Handle) -> EvioResult<Option<Vec<u32>>> {
        self.with_session(handle, Session::read_alloc)
    }

    /// Hands the next event to `f` in place, without copying.
    ///
    /// `f` runs with the session locked.
    ///
    /// # Errors
    ///
    /// [`EvioError::BadMode`] unless the handle reads a version 4 stream
    /// sequentially.
    pub fn read_no_copy<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&[u32]) -> R,
    ) -> EvioResult<Option<R>> {
        self.with_session(handle, |s| s.read_no_copy(f))
    }

    /// View of event `number` (1-based) of a random-access handle.
    ///
    /// The view outlives the handle.
    ///
    /// # Errors
    ///
    /// - [`EvioError::BadArgument`] if there is no such event
    /// - [`EvioError::BadMode`] unless opened for random access
    pub fn read_random(&self, handle: Handle, number: usize) -> EvioResult<EventView> {
        let store = self.with_session(handle, |s| s.store())?;
        EventView::new(store, number)
    }

    /// The random-access event table.
    ///
    /// # Errors
    ///
    /// [`EvioError::BadMode`] unless opened for random access.
    pub fn event_table(&self, handle: Handle) -> EvioResult<Vec<EventLocation>> {
        self.with_session(handle, |s| s.event_table())
    }

    /// Writes one event.
    ///
    /// # Errors
    ///
    /// [`EvioError::BadMode`] unless the handle writes.
    pub fn write(&self, handle: Handle, event: &[u32]) -> EvioResult<()> {
        self.with_session(handle, |s| s.write(event))
    }

    /// Writes the dictionary. Must come before any event.
    ///
    /// # Errors
    ///
    /// [`EvioError::BadMode`] unless writing a fresh stream.
    pub fn write_dictionary(&self, handle: Handle, xml: &str) -> EvioResult<()> {
        self.with_session(handle, |s| s.write_dictionary(xml))
    }

    /// A copy of the dictionary.
    ///
    /// # Errors
    ///
    /// [`EvioError::BadHandle`] if the handle is not open.
    pub fn dictionary(&self, handle: Handle) -> EvioResult<Option<String>> {
        self.with_session(handle, |s| Ok(s.dictionary()))
    }

    /// Applies or answers a configuration request.
    ///
    /// # Errors
    ///
    /// See [`Session::control`].
    pub fn control(&self, handle: Handle, control: Control) -> EvioResult<ControlReply> {
        self.with_session(handle, |s| s.control(control))
    }

    /// Bytes written to the destination.
    ///
    /// # Errors
    ///
    /// [`EvioError::BadMode`] unless the handle writes.
    pub fn bytes_written(&self, handle: Handle) -> EvioResult<u64> {
        self.with_session(handle, Session::bytes_written)
    }

    /// How a handle was opened.
    ///
    /// # Errors
    ///
    /// [`EvioError::BadHandle`] if the handle is not open.
    pub fn flags(&self, handle: Handle) -> EvioResult<OpenFlags> {
        self.with_session(handle, |s| Ok(s.flags()))
    }

    /// Number of open handles.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.is_some()).count()
    }

    /// Current size of the slot table.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.lock().len()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        for (index, slot) in self.slots.get_mut().iter_mut().enumerate() {
            let Some(cell) = slot.take() else { continue };
            let mut closed = cell.closed.write();
            if *closed {
                continue;
            }
            *closed = true;
            let handle = index + 1;
            tracing::warn!(handle, "registry dropped with session still open");
            if let Err(e) = cell.session.lock().close() {
                tracing::error!(handle, error = %e, "closing session on drop failed");
            };
        }
    }
}
