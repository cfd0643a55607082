//! Process Table
//!
//! Fixed-capacity arena of process records indexed by `pid % capacity`.
//! Only one record may occupy a slot; the allocator skips pids whose slot is
//! taken instead of chaining, which keeps lookups O(1) and bounds the
//! allocation probe.
//!
//! One lock serializes every read and write of the table and its records.

use alloc::boxed::Box;
use alloc::vec::Vec;
use spin::mutex::{Mutex, MutexGuard};

use crate::config::TableConfig;
use crate::error::{ProcError, Result};
use crate::pid::Pid;
use crate::record::{ProcessInfo, ProcessRecord, RecordState};
use crate::sched::Scheduler;
use crate::wait::WaitChannel;

/// Lock-protected part of the table.
pub(crate) struct TableInner {
    /// Slot arena, `pid % capacity` → record
    slots: Vec<Option<ProcessRecord>>,
    /// Next candidate pid for allocation
    next_pid: u32,
    /// Number of occupied slots
    live: usize,
    pid_min: u32,
    pid_max: u32,
}

impl TableInner {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Look up a record. `None` if the slot is empty or holds another pid.
    pub(crate) fn get(&self, pid: Pid) -> Option<&ProcessRecord> {
        if pid == Pid::INVALID {
            return None;
        }
        self.slots[pid.slot(self.capacity())]
            .as_ref()
            .filter(|record| record.pid == pid)
    }

    pub(crate) fn get_mut(&mut self, pid: Pid) -> Option<&mut ProcessRecord> {
        if pid == Pid::INVALID {
            return None;
        }
        let slot = pid.slot(self.capacity());
        self.slots[slot]
            .as_mut()
            .filter(|record| record.pid == pid)
    }

    /// Insert a record; its slot must be empty.
    fn put(&mut self, record: ProcessRecord) {
        let slot = record.pid.slot(self.capacity());
        assert!(
            self.slots[slot].is_none(),
            "slot {} already occupied when inserting pid {}",
            slot,
            record.pid
        );
        self.slots[slot] = Some(record);
        self.live += 1;
    }

    /// Remove a record without checking the reclamation predicate.
    fn take(&mut self, pid: Pid) -> ProcessRecord {
        let slot = pid.slot(self.capacity());
        let occupant = self.slots[slot].as_ref().map(|r| r.pid);
        match self.slots[slot].take() {
            Some(record) if occupant == Some(pid) => {
                self.live -= 1;
                record
            }
            _ => panic!("removing pid {} but slot {} holds {:?}", pid, slot, occupant),
        }
    }

    fn advance_cursor(&mut self) {
        if self.next_pid >= self.pid_max {
            self.next_pid = self.pid_min;
        } else {
            self.next_pid += 1;
        }
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Record in `slot`, whatever its pid.
    pub(crate) fn at(&self, slot: usize) -> Option<&ProcessRecord> {
        self.slots[slot].as_ref()
    }

    /// Iterate over every present record.
    pub(crate) fn records(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = &mut ProcessRecord> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }
}

/// Summary returned when a table is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Records still present (the bootup record included).
    pub live: usize,
    /// Records that had exited but were never collected.
    pub exited: usize,
}

/// The process table.
///
/// Contexts blocked in [`ProcessTable::join`] or [`ProcessTable::sleep_on`]
/// are parked and released through `S`.
pub struct ProcessTable<S: Scheduler> {
    pub(crate) inner: Mutex<TableInner>,
    /// One wait channel per slot, shared by successive occupants.
    pub(crate) channels: Box<[WaitChannel<S::TaskId>]>,
    pub(crate) sched: S,
    pub(crate) config: TableConfig,
}

impl<S: Scheduler> ProcessTable<S> {
    /// Create a table and seed the bootup process.
    ///
    /// Storage for every slot is reserved here; allocating a pid never
    /// touches the heap afterwards.
    pub fn bootstrap(config: TableConfig, sched: S) -> Result<Self> {
        config.validate()?;

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(config.capacity)
            .map_err(|_| ProcError::OutOfMemory)?;
        slots.resize_with(config.capacity, || None);

        let mut channels = Vec::new();
        channels
            .try_reserve_exact(config.capacity)
            .map_err(|_| ProcError::OutOfMemory)?;
        channels.resize_with(config.capacity, WaitChannel::new);

        let mut inner = TableInner {
            slots,
            next_pid: config.pid_min,
            live: 0,
            pid_min: config.pid_min,
            pid_max: config.pid_max,
        };
        inner.put(ProcessRecord::bootup());

        log::debug!(
            "[KPIO PID] Process table initialized ({} slots, pids {}..={})",
            config.capacity,
            config.pid_min,
            config.pid_max
        );

        Ok(Self {
            inner: Mutex::new(inner),
            channels: channels.into_boxed_slice(),
            sched,
            config,
        })
    }

    /// Tear the table down, reporting what was still in it.
    pub fn teardown(self) -> TableStats {
        let inner = self.inner.into_inner();
        let stats = TableStats {
            live: inner.live,
            exited: inner.records().filter(|r| r.is_exited()).count(),
        };
        log::debug!(
            "[KPIO PID] Process table torn down ({} live, {} uncollected)",
            stats.live,
            stats.exited
        );
        stats
    }

    /// The configuration this table was bootstrapped with.
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Number of records currently present.
    pub fn live_count(&self) -> usize {
        self.inner.lock().live
    }

    /// Allocate a pid for a new child of `parent`.
    ///
    /// The child starts out [`RecordState::Created`]; call
    /// [`ProcessTable::start`] once it runs, or [`ProcessTable::unalloc`] if
    /// it never will.
    pub fn allocate(&self, parent: Pid) -> Result<Pid> {
        let mut inner = self.inner.lock();

        match inner.get(parent) {
            None => panic!("allocating a child for pid {} which is not in the table", parent),
            Some(record) => assert!(
                !record.is_exited(),
                "allocating a child for pid {} which has exited",
                parent
            ),
        }

        if inner.live == inner.capacity() {
            log::debug!("[KPIO PID] Table full, cannot allocate for {}", parent);
            return Err(ProcError::ResourceExhausted);
        }

        // The live count check above guarantees a free slot; the bound only
        // guards against a corrupted count.
        let limit = inner.capacity() * 2 + 5;
        let mut probes = 0;
        while inner.slots[Pid(inner.next_pid).slot(inner.capacity())].is_some() {
            assert!(probes < limit, "pid allocation probe did not terminate");
            probes += 1;
            inner.advance_cursor();
        }

        let pid = Pid(inner.next_pid);
        inner.put(ProcessRecord::new(pid, Some(parent)));
        inner.advance_cursor();

        log::debug!("[KPIO PID] Allocated pid {} (parent {})", pid, parent);
        Ok(pid)
    }

    /// Process-birth hook: the process behind `pid` has started executing.
    pub fn start(&self, pid: Pid) {
        let mut inner = self.inner.lock();
        let Some(record) = inner.get_mut(pid) else {
            panic!("starting pid {} which is not in the table", pid);
        };
        assert_eq!(
            record.state,
            RecordState::Created,
            "starting pid {} twice",
            pid
        );
        record.state = RecordState::Running;
        log::trace!("[KPIO PID] pid {} started", pid);
    }

    /// Roll back an allocation whose process never ran.
    ///
    /// Only the recorded parent may do this, and only before the child has
    /// started. Anything else is a kernel bug and panics.
    pub fn unalloc(&self, parent: Pid, pid: Pid) {
        assert!(
            (self.config.pid_min..=self.config.pid_max).contains(&pid.as_u32()),
            "unalloc of out-of-range pid {}",
            pid
        );

        let mut inner = self.inner.lock();
        let Some(record) = inner.get(pid) else {
            panic!("unalloc of pid {} which is not in the table", pid);
        };
        assert_eq!(
            record.state,
            RecordState::Created,
            "unalloc of pid {} which has already run",
            pid
        );
        assert_eq!(
            record.parent,
            Some(parent),
            "unalloc of pid {} by {} which is not its parent",
            pid,
            parent
        );
        assert_eq!(record.joiners, 0, "unalloc of pid {} with joiners", pid);

        inner.take(pid);
        self.notify(pid);
        log::debug!("[KPIO PID] Unallocated pid {}", pid);
    }

    /// Remove a record that no future join can observe.
    ///
    /// Caller holds the lock and has checked the record is reclaimable.
    pub(crate) fn reclaim(&self, inner: &mut TableInner, pid: Pid) {
        let record = inner.take(pid);
        assert!(record.is_exited(), "reclaiming pid {} before it exited", pid);
        assert_eq!(
            record.joiners, 0,
            "reclaiming pid {} with {} joiners",
            pid, record.joiners
        );
        // Release anything still sleeping on the record.
        self.notify(pid);
        log::debug!(
            "[KPIO PID] Reclaimed pid {} (status {:?})",
            pid,
            record.exit_status()
        );
    }

    /// Reclaim `pid` if it is present and reclaimable. Returns whether it was.
    pub(crate) fn reclaim_if_done(&self, inner: &mut TableInner, pid: Pid) -> bool {
        match inner.get(pid) {
            Some(record) if record.is_reclaimable() => {
                self.reclaim(inner, pid);
                true
            }
            _ => false,
        }
    }

    fn channel(&self, pid: Pid) -> &WaitChannel<S::TaskId> {
        &self.channels[pid.slot(self.capacity())]
    }

    /// Block on `pid`'s channel with the table lock given up meanwhile.
    pub(crate) fn wait_on<'a>(
        &'a self,
        pid: Pid,
        inner: MutexGuard<'a, TableInner>,
    ) -> MutexGuard<'a, TableInner> {
        self.channel(pid).wait(&self.sched, inner, &self.inner)
    }

    /// Unblock everything waiting on `pid`'s channel. Table lock held.
    pub(crate) fn notify(&self, pid: Pid) -> usize {
        self.channel(pid).notify_all(&self.sched)
    }

    /// Tasks queued on `pid`'s channel.
    pub(crate) fn waiting_on(&self, pid: Pid) -> usize {
        self.channel(pid).waiters()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, TableInner> {
        self.inner.lock()
    }

    /// Snapshot of the record for `pid`, if present.
    pub fn lookup(&self, pid: Pid) -> Option<ProcessInfo> {
        self.inner.lock().get(pid).map(ProcessRecord::info)
    }

    /// Whether `pid` currently has a record.
    pub fn is_valid(&self, pid: Pid) -> bool {
        self.inner.lock().get(pid).is_some()
    }

    /// Snapshot of every present record, ordered by slot.
    pub fn snapshot(&self) -> Vec<ProcessInfo> {
        self.inner.lock().records().map(ProcessRecord::info).collect()
    }

    /// Pids whose recorded parent is `parent`.
    pub fn children_of(&self, parent: Pid) -> Vec<Pid> {
        self.inner
            .lock()
            .records()
            .filter(|r| r.parent == Some(parent))
            .map(|r| r.pid)
            .collect()
    }

    /// Threads currently blocked in join on `pid` (0 if absent).
    pub fn joiner_count(&self, pid: Pid) -> usize {
        self.inner.lock().get(pid).map_or(0, |r| r.joiners)
    }
}
