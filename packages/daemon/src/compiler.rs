//! # Operation Log Compiler
//!
//! Turns a batch of raw records into semantic [`Operation`]s while rolling
//! each record back on the live DOM.
//!
//! ## Ordering
//!
//! Records are walked newest-first. Once record *i* is rolled back the live
//! tree is in the state just before *i*, which is exactly the state the
//! mirror is in when the operation for *i* is replayed. The collected list
//! is reversed at the end so the log reads oldest edit first.
//!
//! Within a record, added nodes are detached last-to-first, then removed
//! nodes are reinserted last-to-first, each in front of the node that
//! followed it.
//!
//! ```text
//! queue:     r1 ─ r2 ─ r3
//! rollback:            r3 → r2 → r1      (live tree back at pre-edit)
//! log:       op(r1) ─ op(r2) ─ op(r3)    (replayed on the mirror)
//! ```
//!
//! The DOM must not be observed while compiling, otherwise the rollback
//! itself would be captured.

use crate::address::{address_of, Address};
use crate::ignore::IgnoreRegistry;
use crate::operation::Operation;
use markweave_dom::{Dom, MutationRecord, NodeId, RecordKind};
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CompileOutput {
    /// Causally ordered log, oldest edit first
    pub operations: Vec<Operation>,

    /// Nodes or records dropped because an address could not be computed
    pub skipped: usize,
}

struct Compiler<'a> {
    dom: &'a mut Dom,
    root: NodeId,
    ignore: &'a IgnoreRegistry,
    emitted: Vec<Operation>,
    skipped: usize,
}

/// Compiles `records` (oldest first, as queued) against the live DOM
pub fn compile(
    dom: &mut Dom,
    root: NodeId,
    records: &[MutationRecord],
    ignore: &IgnoreRegistry,
) -> CompileOutput {
    let mut compiler = Compiler {
        dom,
        root,
        ignore,
        emitted: Vec::new(),
        skipped: 0,
    };

    for record in records.iter().rev() {
        match record.kind {
            RecordKind::CharacterData => compiler.character_data(record),
            RecordKind::ChildList => {
                compiler.added(record);
                compiler.removed(record);
            }
        }
    }

    let mut operations = compiler.emitted;
    operations.reverse();
    debug!(
        records = records.len(),
        operations = operations.len(),
        skipped = compiler.skipped,
        "batch compiled"
    );

    CompileOutput {
        operations,
        skipped: compiler.skipped,
    }
}

impl Compiler<'_> {
    fn address(&mut self, node: NodeId, what: &str) -> Option<Address> {
        let address = address_of(self.dom, self.root, node);
        if address.is_none() {
            warn!(node = %node, role = what, "no address, skipping");
            self.skipped += 1;
        }
        address
    }

    fn character_data(&mut self, record: &MutationRecord) {
        let target = record.target;
        let Some(old_value) = record.old_value.as_ref() else {
            return;
        };
        if self.ignore.is_ignored(self.dom, self.root, target) {
            debug!(node = %target, "ignored text change");
            return;
        }

        let current = self.dom.text(target).map(str::to_string);
        if let (Some(current), Some(address)) = (current, self.address(target, "text")) {
            let superseded = matches!(
                self.emitted.last(),
                Some(Operation::Text { address: last, .. }) if *last == address
            );
            if !superseded {
                debug!(address = %address, "TEXT");
                self.emitted.push(Operation::text(address, current));
            }
        }

        if let Err(err) = self.dom.set_text(target, old_value.clone()) {
            warn!(node = %target, error = %err, "text rollback failed");
        }
    }

    fn added(&mut self, record: &MutationRecord) {
        let parent = record.target;

        for &node in record.added_nodes.iter().rev() {
            if self.ignore.is_ignored_at(self.dom, self.root, node, Some(parent)) {
                debug!(node = %node, "ignored insertion");
                continue;
            }

            let before = self.next_addressable_sibling(node);
            let snapshot = self.dom.snapshot(node);
            if let Err(err) = self.dom.detach(node) {
                warn!(node = %node, error = %err, "insertion rollback failed");
                self.skipped += 1;
                continue;
            }

            let Ok(snapshot) = snapshot else {
                self.skipped += 1;
                continue;
            };
            let Some(parent_address) = self.address(parent, "parent") else {
                continue;
            };
            let before_address = match before {
                Some(sibling) => match self.address(sibling, "before") {
                    Some(address) => Some(address),
                    None => continue,
                },
                None => None,
            };

            debug!(parent = %parent_address, "ADD");
            self.emitted.push(Operation::Add {
                parent: parent_address,
                node: snapshot,
                before: before_address,
            });
        }
    }

    fn removed(&mut self, record: &MutationRecord) {
        let parent = record.target;
        let mut cursor = record
            .next_sibling
            .filter(|sibling| self.dom.parent(*sibling) == Some(parent));

        for &node in record.removed_nodes.iter().rev() {
            if self.ignore.is_ignored_at(self.dom, self.root, node, Some(parent)) {
                debug!(node = %node, "ignored removal");
                continue;
            }

            if let Err(err) = self.dom.insert_before(parent, node, cursor) {
                warn!(node = %node, error = %err, "removal rollback failed");
                self.skipped += 1;
                continue;
            }
            cursor = Some(node);

            let Some(parent_address) = self.address(parent, "parent") else {
                continue;
            };
            let Some(target) = self.address(node, "target") else {
                continue;
            };

            debug!(parent = %parent_address, target = %target, "REMOVE");
            self.emitted.push(Operation::Remove {
                parent: parent_address,
                target,
            });
        }
    }

    /// Following sibling that the mirror can also locate
    fn next_addressable_sibling(&self, node: NodeId) -> Option<NodeId> {
        let mut sibling = self.dom.next_sibling(node);
        while let Some(candidate) = sibling {
            let comment = !self.dom.is_element(candidate) && !self.dom.is_text(candidate);
            if !comment && !self.ignore.is_ignored(self.dom, self.root, candidate) {
                return Some(candidate);
            }
            sibling = self.dom.next_sibling(candidate);
        }
        None
    }
}
