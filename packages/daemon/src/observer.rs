//! # Mutation Observer Adapter
//!
//! Moves raw records from the live DOM's undelivered buffer into a queue
//! owned by the daemon. Delivery is the asynchronous half: the DOM buffers
//! records as edits happen, [`ObserverAdapter::deliver`] is the callback
//! that hands them over.

use markweave_dom::{Dom, DomResult, MutationRecord, NodeId};
use tracing::{debug, trace};

#[derive(Debug, Default)]
pub struct ObserverAdapter {
    root: Option<NodeId>,
    started: bool,
    queue: Vec<MutationRecord>,
}

impl ObserverAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin observing `root`'s subtree. No-op while already started.
    pub fn start(&mut self, dom: &mut Dom, root: NodeId) -> DomResult<()> {
        if self.started {
            return Ok(());
        }
        dom.observe(root)?;
        self.root = Some(root);
        self.started = true;
        debug!(root = %root, "observer started");
        Ok(())
    }

    /// Disconnects, merging undelivered records into the queue first.
    /// No-op while stopped.
    pub fn stop(&mut self, dom: &mut Dom) {
        if !self.started {
            return;
        }
        let pending = dom.disconnect();
        let count = pending.len();
        self.queue.extend(pending);
        self.started = false;
        debug!(drained = count, "observer stopped");
    }

    /// Delivers buffered records; returns how many arrived
    pub fn deliver(&mut self, dom: &mut Dom) -> usize {
        if !self.started {
            return 0;
        }
        let records = dom.take_records();
        let count = records.len();
        if count > 0 {
            trace!(count, "records delivered");
        }
        self.queue.extend(records);
        count
    }

    /// Empties the queue. Only a flush calls this.
    pub fn drain(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.queue)
    }

    pub fn queue(&self) -> &[MutationRecord] {
        &self.queue
    }

    pub fn has_queued(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }
}
