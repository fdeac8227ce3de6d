//! Per-job single-flight guard.

use std::sync::Arc;

use dashmap::DashSet;

use crate::job::JobId;

/// Tracks which job identities currently have an execution in flight.
///
/// Shared by every engine a scheduler runs, so a body started before a
/// reload still blocks the same identity afterwards.
#[derive(Debug, Clone, Default)]
pub(crate) struct SingleFlight {
    in_flight: Arc<DashSet<JobId>>,
}

impl SingleFlight {
    /// Claim `id`. Returns `None` if an execution is already in flight.
    pub fn try_acquire(&self, id: JobId) -> Option<FlightPermit> {
        if self.in_flight.insert(id.clone()) {
            Some(FlightPermit {
                in_flight: Arc::clone(&self.in_flight),
                id,
            })
        } else {
            None
        }
    }

    pub fn is_running(&self, id: &JobId) -> bool {
        self.in_flight.contains(id)
    }
}

/// Releases the claimed identity when dropped.
#[derive(Debug)]
pub(crate) struct FlightPermit {
    in_flight: Arc<DashSet<JobId>>,
    id: JobId,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.in_flight.remove(&self.id);
    }
}
