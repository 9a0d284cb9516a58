//! Core types for the rank group

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a rank inside its group, `0..size`
pub type Rank = usize;

/// Message tag distinguishing independent streams between the same peers
pub type Tag = u32;

/// Rank that partitions, gathers and reports
pub const COORDINATOR_RANK: Rank = 0;

/// Tag carrying worker record batches to the coordinator
pub const RESULT_TAG: Tag = 1;

/// Tag reserved for collective operations; point-to-point traffic must not use it
pub const COLLECTIVE_TAG: Tag = Tag::MAX;

/// Role a rank plays in the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankRole {
    /// Rank 0
    Coordinator,
    /// Any other rank; owns one shard
    Worker {
        /// Shard index, always `rank - 1`
        partition: usize,
    },
}

impl RankRole {
    /// Role of the given rank
    pub fn for_rank(rank: Rank) -> Self {
        if rank == COORDINATOR_RANK {
            RankRole::Coordinator
        } else {
            RankRole::Worker {
                partition: rank - 1,
            }
        }
    }

    pub fn is_coordinator(&self) -> bool {
        matches!(self, RankRole::Coordinator)
    }
}

impl fmt::Display for RankRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankRole::Coordinator => write!(f, "coordinator"),
            RankRole::Worker { partition } => write!(f, "worker(shard {})", partition),
        }
    }
}

/// Phases every rank walks through in lock step
///
/// Each transition to the next phase ends with a barrier, so at a barrier
/// boundary all ranks are in the same phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Init,
    BaselineMeasured,
    Partitioned,
    LocalFetchDone,
    Dispatched,
    Gathered,
    Reported,
    Cleaned,
}

impl Phase {
    /// All phases in execution order
    pub const ALL: [Phase; 8] = [
        Phase::Init,
        Phase::BaselineMeasured,
        Phase::Partitioned,
        Phase::LocalFetchDone,
        Phase::Dispatched,
        Phase::Gathered,
        Phase::Reported,
        Phase::Cleaned,
    ];

    /// The phase that follows this one, if any
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Init => Some(Phase::BaselineMeasured),
            Phase::BaselineMeasured => Some(Phase::Partitioned),
            Phase::Partitioned => Some(Phase::LocalFetchDone),
            Phase::LocalFetchDone => Some(Phase::Dispatched),
            Phase::Dispatched => Some(Phase::Gathered),
            Phase::Gathered => Some(Phase::Reported),
            Phase::Reported => Some(Phase::Cleaned),
            Phase::Cleaned => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::BaselineMeasured => "baseline_measured",
            Phase::Partitioned => "partitioned",
            Phase::LocalFetchDone => "local_fetch_done",
            Phase::Dispatched => "dispatched",
            Phase::Gathered => "gathered",
            Phase::Reported => "reported",
            Phase::Cleaned => "cleaned",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_for_rank() {
        assert_eq!(RankRole::for_rank(0), RankRole::Coordinator);
        assert_eq!(RankRole::for_rank(1), RankRole::Worker { partition: 0 });
        assert_eq!(RankRole::for_rank(7), RankRole::Worker { partition: 6 });
        assert!(RankRole::for_rank(0).is_coordinator());
        assert!(!RankRole::for_rank(3).is_coordinator());
    }

    #[test]
    fn test_phase_sequence() {
        let mut walked = vec![Phase::Init];
        let mut phase = Phase::Init;
        while let Some(next) = phase.next() {
            assert!(next > phase);
            walked.push(next);
            phase = next;
        }
        assert_eq!(walked, Phase::ALL.to_vec());
        assert_eq!(Phase::Cleaned.next(), None);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::LocalFetchDone.to_string(), "local_fetch_done");
    }
}
