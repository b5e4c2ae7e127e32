//! Port allocation and release confirmation.

use crate::clock::SharedClock;
use crate::port::SharedPortProbe;
use crate::{SupervisorError, SupervisorResult};

use std::panic::Location;
use std::time::Duration;

use error_location::ErrorLocation;
use tracing::{debug, info};

pub struct PortAllocator {
    probe: SharedPortProbe,
    clock: SharedClock,
    window: u16,
}

impl PortAllocator {
    pub fn new(probe: SharedPortProbe, clock: SharedClock, window: u16) -> Self {
        Self {
            probe,
            clock,
            window: window.max(1),
        }
    }

    /// Return the first free port in `start..start + window`.
    pub fn find_available_port(&self, start: u16) -> SupervisorResult<u16> {
        self.find_available_port_excluding(start, &[])
    }

    /// Like [`find_available_port`](Self::find_available_port), skipping
    /// ports whose release from a previous backend is still unconfirmed.
    pub fn find_available_port_excluding(
        &self,
        start: u16,
        excluded: &[u16],
    ) -> SupervisorResult<u16> {
        let end = start.saturating_add(self.window - 1);

        for port in start..=end {
            if excluded.contains(&port) {
                debug!("Skipping port {port}, release not confirmed");
                continue;
            }
            if !self.probe.is_port_in_use(port) {
                info!("Allocated port {port}");
                return Ok(port);
            }
            debug!("Port {port} in use");
        }

        Err(SupervisorError::NoPortAvailable {
            start,
            end,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    pub fn is_port_in_use(&self, port: u16) -> bool {
        self.probe.is_port_in_use(port)
    }

    /// Poll until `port` is free or `max_wait` elapses.
    ///
    /// Returns whether the port became free. The last sleep is shortened
    /// so the call never overruns its deadline.
    pub async fn wait_for_port_release(
        &self,
        port: u16,
        poll_interval: Duration,
        max_wait: Duration,
    ) -> bool {
        let deadline = self.clock.now() + max_wait;

        loop {
            if !self.probe.is_port_in_use(port) {
                debug!("Port {port} released");
                return true;
            }

            let now = self.clock.now();
            if now >= deadline {
                return false;
            }

            self.clock.sleep(poll_interval.min(deadline - now)).await;
        }
    }
}
