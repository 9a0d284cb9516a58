//! Point-to-point and collective messaging between ranks
//!
//! [`MessageChannel`] is the only way ranks talk to each other. Messages on
//! one `(source, destination, tag)` stream arrive in send order; nothing is
//! promised across tags or sources, so a receiver that needs a deterministic
//! order has to sequence its receives itself.
//!
//! [`LocalChannel`] implements the trait for a group of ranks hosted in one
//! OS process. Each rank owns one endpoint; endpoints share nothing except
//! per-rank mailboxes and the barrier rendezvous.

use crate::error::{DistributedError, Result};
use crate::types::{Rank, Tag, COLLECTIVE_TAG};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Messaging endpoint of one rank in a fixed-size group
pub trait MessageChannel: Send {
    /// This endpoint's rank
    fn rank(&self) -> Rank;

    /// Number of ranks in the group
    fn size(&self) -> usize;

    /// Send `payload` to `destination` on `tag`
    ///
    /// Fails if the destination does not exist or has left the group.
    fn send(&self, payload: String, destination: Rank, tag: Tag) -> Result<()>;

    /// Block until a message from `source` on `tag` arrives
    fn receive(&self, source: Rank, tag: Tag) -> Result<String>;

    /// Block until every rank of the group has called `barrier`
    fn barrier(&self) -> Result<()>;

    /// Collect one value per rank at `root`
    ///
    /// The root gets the values ordered by ascending rank, its own included;
    /// every other rank gets `None`.
    fn gather(&self, value: String, root: Rank) -> Result<Option<Vec<String>>> {
        if root >= self.size() {
            return Err(DistributedError::ChannelError(format!(
                "gather root {} out of range for group of {}",
                root,
                self.size()
            )));
        }

        if self.rank() != root {
            self.send(value, root, COLLECTIVE_TAG)?;
            return Ok(None);
        }

        let mut own = Some(value);
        let mut values = Vec::with_capacity(self.size());
        for source in 0..self.size() {
            if source == root {
                values.push(own.take().unwrap_or_default());
            } else {
                values.push(self.receive(source, COLLECTIVE_TAG)?);
            }
        }
        Ok(Some(values))
    }
}

#[derive(Debug, Default)]
struct Mailbox {
    queues: Mutex<HashMap<(Rank, Tag), VecDeque<String>>>,
    arrived: Condvar,
}

#[derive(Debug, Default)]
struct RendezvousState {
    arrived: usize,
    generation: u64,
}

/// Counting rendezvous: callers block until the count reaches the group
/// size, then all are released and the count resets for the next round.
#[derive(Debug, Default)]
struct Rendezvous {
    state: Mutex<RendezvousState>,
    released: Condvar,
}

#[derive(Debug)]
struct GroupShared {
    size: usize,
    mailboxes: Vec<Mailbox>,
    rendezvous: Rendezvous,
    departed: Vec<AtomicBool>,
    departed_count: AtomicUsize,
}

impl GroupShared {
    fn has_departed(&self, rank: Rank) -> bool {
        self.departed[rank].load(Ordering::Acquire)
    }

    fn any_departed(&self) -> bool {
        self.departed_count.load(Ordering::Acquire) > 0
    }
}

/// In-process endpoint of a rank group
///
/// Dropping an endpoint removes its rank from the group: later sends to it
/// fail, receives from it fail once its queued messages are drained, and any
/// barrier it never reached fails instead of hanging.
#[derive(Debug)]
pub struct LocalChannel {
    rank: Rank,
    shared: Arc<GroupShared>,
}

impl LocalChannel {
    /// Create the endpoints of a group of `size` ranks, ordered by rank
    pub fn group(size: usize) -> Vec<LocalChannel> {
        let shared = Arc::new(GroupShared {
            size,
            mailboxes: (0..size).map(|_| Mailbox::default()).collect(),
            rendezvous: Rendezvous::default(),
            departed: (0..size).map(|_| AtomicBool::new(false)).collect(),
            departed_count: AtomicUsize::new(0),
        });

        (0..size)
            .map(|rank| LocalChannel {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    fn check_peer(&self, peer: Rank, what: &str) -> Result<()> {
        if peer >= self.shared.size {
            return Err(DistributedError::ChannelError(format!(
                "{} rank {} out of range for group of {}",
                what, peer, self.shared.size
            )));
        }
        Ok(())
    }
}

impl MessageChannel for LocalChannel {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn send(&self, payload: String, destination: Rank, tag: Tag) -> Result<()> {
        self.check_peer(destination, "destination")?;

        let mailbox = &self.shared.mailboxes[destination];
        let mut queues = mailbox.queues.lock();
        if self.shared.has_departed(destination) {
            return Err(DistributedError::ChannelError(format!(
                "rank {} is unreachable: it has left the group",
                destination
            )));
        }

        tracing::debug!(
            "rank {} -> rank {} tag {}: {} bytes",
            self.rank,
            destination,
            tag,
            payload.len()
        );
        queues
            .entry((self.rank, tag))
            .or_default()
            .push_back(payload);
        mailbox.arrived.notify_all();
        Ok(())
    }

    fn receive(&self, source: Rank, tag: Tag) -> Result<String> {
        self.check_peer(source, "source")?;

        let mailbox = &self.shared.mailboxes[self.rank];
        let mut queues = mailbox.queues.lock();
        loop {
            if let Some(payload) = queues.get_mut(&(source, tag)).and_then(|q| q.pop_front()) {
                return Ok(payload);
            }

            if self.shared.has_departed(source) {
                return Err(DistributedError::ChannelError(format!(
                    "rank {} left the group before sending on tag {}",
                    source, tag
                )));
            }

            mailbox.arrived.wait(&mut queues);
        }
    }

    fn barrier(&self) -> Result<()> {
        let rendezvous = &self.shared.rendezvous;
        let mut state = rendezvous.state.lock();

        if self.shared.any_departed() {
            return Err(DistributedError::ChannelError(
                "barrier cannot complete: a rank has left the group".to_string(),
            ));
        }

        let generation = state.generation;
        state.arrived += 1;

        if state.arrived == self.shared.size {
            state.arrived = 0;
            state.generation += 1;
            rendezvous.released.notify_all();
            return Ok(());
        }

        while state.generation == generation {
            if self.shared.any_departed() {
                state.arrived -= 1;
                return Err(DistributedError::ChannelError(
                    "barrier cannot complete: a rank has left the group".to_string(),
                ));
            }
            rendezvous.released.wait(&mut state);
        }

        Ok(())
    }
}

impl Drop for LocalChannel {
    fn drop(&mut self) {
        self.shared.departed[self.rank].store(true, Ordering::Release);
        self.shared.departed_count.fetch_add(1, Ordering::AcqRel);

        // Take each lock before notifying so a waiter cannot miss the departure
        // between its check and its wait.
        for mailbox in &self.shared.mailboxes {
            let _queues = mailbox.queues.lock();
            mailbox.arrived.notify_all();
        }
        let _state = self.shared.rendezvous.state.lock();
        self.shared.rendezvous.released.notify_all();
    }
}
