//! Server Selector (§4.4): a priority1-only heuristic standing in for the
//! full IEEE Best Master Clock Algorithm (explicitly out of scope, §1).

use crate::messages::ClockIdentity;

/// The server currently being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedServer {
    pub id: ClockIdentity,
    pub priority1: u8,
}

/// What happened as a result of processing an Announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceOutcome {
    /// No server was selected before; this one won by default.
    FirstSelection,
    /// Same server as before; its aging counter was refreshed.
    Refreshed,
    /// A strictly higher-priority (numerically lower) server took over.
    Switched,
    /// Lower priority than the current selection; ignored.
    Ignored,
}

/// Tracks exactly one selected server and ages its priority over time.
#[derive(Debug, Default)]
pub struct ServerSelector {
    selected: Option<SelectedServer>,
    utc_offset_s: u16,
}

impl ServerSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<SelectedServer> {
        self.selected
    }

    pub fn utc_offset_s(&self) -> u16 {
        self.utc_offset_s
    }

    pub fn is_selected(&self, id: ClockIdentity) -> bool {
        self.selected.map(|s| s.id) == Some(id)
    }

    /// Process an Announce from `sender`. See §4.4 for the exact policy.
    pub fn on_announce(&mut self, sender: ClockIdentity, priority1: u8, utc_offset: u16) -> AnnounceOutcome {
        match self.selected {
            None => {
                self.selected = Some(SelectedServer {
                    id: sender,
                    priority1,
                });
                self.utc_offset_s = utc_offset;
                AnnounceOutcome::FirstSelection
            }
            Some(current) if current.id == sender => {
                self.selected = Some(SelectedServer { id: sender, priority1 });
                self.utc_offset_s = utc_offset;
                AnnounceOutcome::Refreshed
            }
            Some(current) if priority1 < current.priority1 => {
                self.selected = Some(SelectedServer {
                    id: sender,
                    priority1,
                });
                self.utc_offset_s = utc_offset;
                AnnounceOutcome::Switched
            }
            Some(_) => AnnounceOutcome::Ignored,
        }
    }

    /// Periodic aging step: increments the selected server's `priority1` by
    /// one, saturating at 255, to allow eventual demotion on silence.
    pub fn on_tick(&mut self) {
        if let Some(server) = self.selected.as_mut() {
            server.priority1 = server.priority1.saturating_add(1);
        }
    }
}
