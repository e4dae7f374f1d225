//! Connectivity tracking.
//!
//! Two inputs fold into one effective online state: the detected network
//! state (fed by the host's probe or platform events) and the user's manual
//! offline override. The monitor only reports *effective* transitions; the
//! orchestrator reacts by cancelling or re-arming scheduled pushes.

/// An effective online-state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    WentOffline,
    CameOnline,
}

/// Tracks online/offline state and gates network operations.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    network_online: bool,
    manual_offline: bool,
}

impl ConnectivityMonitor {
    /// Starts online with no override, the normal session-start state.
    pub fn new() -> Self {
        Self {
            network_online: true,
            manual_offline: false,
        }
    }

    pub fn is_online(&self) -> bool {
        self.network_online && !self.manual_offline
    }

    /// Feed a detected network state change. Returns the effective
    /// transition, if any.
    pub fn set_network_online(&mut self, online: bool) -> Option<Transition> {
        let before = self.is_online();
        self.network_online = online;
        Self::transition(before, self.is_online())
    }

    /// Set or clear the manual offline override. Returns the effective
    /// transition, if any.
    pub fn set_manual_offline(&mut self, offline: bool) -> Option<Transition> {
        let before = self.is_online();
        self.manual_offline = offline;
        Self::transition(before, self.is_online())
    }

    fn transition(before: bool, after: bool) -> Option<Transition> {
        match (before, after) {
            (true, false) => Some(Transition::WentOffline),
            (false, true) => Some(Transition::CameOnline),
            _ => None,
        }
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_online() {
        assert!(ConnectivityMonitor::new().is_online());
    }

    #[test]
    fn test_network_transitions() {
        let mut monitor = ConnectivityMonitor::new();

        assert_eq!(
            monitor.set_network_online(false),
            Some(Transition::WentOffline)
        );
        // Repeated offline reports are not transitions
        assert_eq!(monitor.set_network_online(false), None);
        assert_eq!(
            monitor.set_network_online(true),
            Some(Transition::CameOnline)
        );
    }

    #[test]
    fn test_manual_override_transitions() {
        let mut monitor = ConnectivityMonitor::new();

        assert_eq!(
            monitor.set_manual_offline(true),
            Some(Transition::WentOffline)
        );
        assert!(!monitor.is_online());
        assert_eq!(
            monitor.set_manual_offline(false),
            Some(Transition::CameOnline)
        );
    }

    #[test]
    fn test_network_flaps_are_masked_by_override() {
        let mut monitor = ConnectivityMonitor::new();
        monitor.set_manual_offline(true);

        // Effectively offline either way: no transitions reported
        assert_eq!(monitor.set_network_online(false), None);
        assert_eq!(monitor.set_network_online(true), None);

        // Clearing the override while the network is up comes back online
        assert_eq!(
            monitor.set_manual_offline(false),
            Some(Transition::CameOnline)
        );
    }

    #[test]
    fn test_override_cleared_while_network_down_stays_offline() {
        let mut monitor = ConnectivityMonitor::new();
        monitor.set_manual_offline(true);
        monitor.set_network_online(false);

        assert_eq!(monitor.set_manual_offline(false), None);
        assert!(!monitor.is_online());
    }
}
