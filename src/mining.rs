//! Mining control state machine
//!
//! The node owns the truth about its miner. The client keeps the last status it
//! fetched plus what it has in flight, and derives the enablement of every
//! control from those two facts alone ([`MiningControls::derive`]). Start and
//! stop commands always finish with a fresh status poll, so the panel is
//! reconciled against the node whether the command succeeded or not.

use crate::api::NodeApi;
use crate::error::{DashboardError, Result};
use crate::format::{format_hash, format_hashrate};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed cadence of the status poll.
pub const MINING_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// `GET /mining/status` payload. Server-owned; the client only keeps the last one.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct MiningStatus {
    pub is_mining: bool,
    #[serde(default)]
    pub blocks_mined: u64,
    #[serde(default)]
    pub hashrate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MiningState {
    /// No poll has completed yet.
    #[default]
    Unknown,
    Inactive,
    Active,
    /// The last poll failed.
    Error,
}

impl MiningState {
    pub fn label(&self) -> &'static str {
        match self {
            MiningState::Unknown => "Unknown",
            MiningState::Inactive => "Inactive",
            MiningState::Active => "Active",
            MiningState::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningCommand {
    Start,
    Stop,
}

/// Enablement of the mining panel controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningControls {
    pub start_enabled: bool,
    pub stop_enabled: bool,
    pub address_input_enabled: bool,
    pub load_cli_wallet_enabled: bool,
}

impl MiningControls {
    /// Start is enabled iff the node was last seen inactive (or unreachable),
    /// stop iff it was last seen active, and nothing is enabled while a
    /// command or poll is in flight. [`MiningMachine::begin_command`] refuses
    /// commands under the same condition.
    pub fn derive(state: MiningState, in_flight: bool) -> Self {
        let start = !in_flight && matches!(state, MiningState::Inactive | MiningState::Error);
        let stop = !in_flight && state == MiningState::Active;
        MiningControls {
            start_enabled: start,
            stop_enabled: stop,
            address_input_enabled: start,
            load_cli_wallet_enabled: start,
        }
    }
}

/// Ticket for one status poll; later tickets supersede earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PollTicket(u64);

/// Synchronous core of the state machine. All transitions happen here.
#[derive(Debug, Default)]
pub struct MiningMachine {
    state: MiningState,
    last_status: Option<MiningStatus>,
    pending_command: Option<MiningCommand>,
    polls_in_flight: u32,
    next_ticket: u64,
    applied_ticket: Option<PollTicket>,
    miner_address: Option<String>,
}

impl MiningMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MiningState {
        self.state
    }

    pub fn last_status(&self) -> Option<&MiningStatus> {
        self.last_status.as_ref()
    }

    pub fn pending_command(&self) -> Option<MiningCommand> {
        self.pending_command
    }

    pub fn in_flight(&self) -> bool {
        self.pending_command.is_some() || self.polls_in_flight > 0
    }

    pub fn controls(&self) -> MiningControls {
        MiningControls::derive(self.state, self.in_flight())
    }

    pub fn miner_address(&self) -> Option<&str> {
        self.miner_address.as_deref()
    }

    pub fn set_miner_address(&mut self, address: &str) {
        let trimmed = address.trim();
        self.miner_address = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }

    pub fn begin_poll(&mut self) -> PollTicket {
        self.next_ticket += 1;
        self.polls_in_flight += 1;
        PollTicket(self.next_ticket)
    }

    /// Applies a poll outcome unless a newer poll has already been applied.
    /// Returns whether the outcome was applied.
    pub fn finish_poll(&mut self, ticket: PollTicket, outcome: &Result<MiningStatus>) -> bool {
        self.polls_in_flight = self.polls_in_flight.saturating_sub(1);
        if self.applied_ticket.is_some_and(|applied| applied > ticket) {
            debug!(ticket = ticket.0, "mining.poll.stale");
            return false;
        }
        self.applied_ticket = Some(ticket);

        let previous = self.state;
        match outcome {
            Ok(status) => {
                self.state = if status.is_mining {
                    MiningState::Active
                } else {
                    MiningState::Inactive
                };
                self.last_status = Some(status.clone());
            }
            Err(_) => self.state = MiningState::Error,
        }
        if previous != self.state {
            info!(from = previous.label(), to = self.state.label(), "mining.state");
        }
        true
    }

    /// Releases a poll that will never report back.
    pub fn abandon_poll(&mut self, ticket: PollTicket) {
        self.polls_in_flight = self.polls_in_flight.saturating_sub(1);
        debug!(ticket = ticket.0, "mining.poll.abandoned");
    }

    /// Checks command preconditions and marks the command in flight.
    /// Refused while anything is in flight, since the controls are disabled then.
    pub fn begin_command(&mut self, command: MiningCommand, address: Option<&str>) -> Result<()> {
        if self.in_flight() {
            return Err(DashboardError::CommandInFlight);
        }
        match command {
            MiningCommand::Start => {
                let address = address.map(str::trim).unwrap_or_default();
                if address.is_empty() {
                    return Err(DashboardError::invalid_input("Please enter a miner address"));
                }
                if self.state == MiningState::Active {
                    return Err(DashboardError::MiningAlreadyActive);
                }
                self.miner_address = Some(address.to_string());
            }
            MiningCommand::Stop => {
                // Unknown and Error still allow a stop attempt.
                if self.state == MiningState::Inactive {
                    return Err(DashboardError::MiningNotActive);
                }
            }
        }
        self.pending_command = Some(command);
        Ok(())
    }

    pub fn finish_command(&mut self) {
        self.pending_command = None;
    }

    pub fn panel(&self) -> MiningPanel {
        let (blocks_mined, hashrate) = match (&self.state, &self.last_status) {
            (MiningState::Unknown, _) | (_, None) => ("-".to_string(), "-".to_string()),
            (_, Some(status)) => (
                status.blocks_mined.to_string(),
                format_hashrate(status.hashrate),
            ),
        };
        MiningPanel {
            status: self.state.label().to_string(),
            blocks_mined,
            hashrate,
            miner_address: self
                .miner_address
                .as_deref()
                .map(format_hash)
                .unwrap_or_else(|| "Not Set".to_string()),
            controls: self.controls(),
        }
    }
}

/// Render-ready mining panel.
#[derive(Debug, Clone, PartialEq)]
pub struct MiningPanel {
    pub status: String,
    pub blocks_mined: String,
    pub hashrate: String,
    pub miner_address: String,
    pub controls: MiningControls,
}

/// Counts a poll as in flight until it lands or its future is dropped.
struct PollGuard {
    machine: Arc<Mutex<MiningMachine>>,
    ticket: Option<PollTicket>,
}

impl PollGuard {
    fn begin(machine: &Arc<Mutex<MiningMachine>>) -> Self {
        let ticket = machine.lock().begin_poll();
        PollGuard {
            machine: machine.clone(),
            ticket: Some(ticket),
        }
    }

    /// Applies the outcome through a lock the caller already holds.
    fn finish(mut self, machine: &mut MiningMachine, outcome: &Result<MiningStatus>) {
        if let Some(ticket) = self.ticket.take() {
            machine.finish_poll(ticket, outcome);
        }
    }
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.machine.lock().abandon_poll(ticket);
        }
    }
}

/// Holds the command slot until the command reconciles or its future is dropped.
struct CommandGuard {
    machine: Arc<Mutex<MiningMachine>>,
    armed: bool,
}

impl CommandGuard {
    fn finish(mut self, machine: &mut MiningMachine) {
        self.armed = false;
        machine.finish_command();
    }
}

impl Drop for CommandGuard {
    fn drop(&mut self) {
        if self.armed {
            self.machine.lock().finish_command();
        }
    }
}

/// Called with the new panel whenever a command starts or a poll lands.
pub type PanelObserver = Arc<dyn Fn(&MiningPanel) + Send + Sync>;

/// Drives a [`MiningMachine`] against the node.
#[derive(Clone)]
pub struct MiningController {
    api: Arc<dyn NodeApi>,
    machine: Arc<Mutex<MiningMachine>>,
    observer: Option<PanelObserver>,
}

impl MiningController {
    pub fn new(api: Arc<dyn NodeApi>) -> Self {
        MiningController {
            api,
            machine: Arc::new(Mutex::new(MiningMachine::new())),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: PanelObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    fn notify(&self, panel: &MiningPanel) {
        if let Some(observer) = &self.observer {
            observer(panel);
        }
    }

    /// Marks a command in flight and shows the all-disabled panel right away.
    fn begin(&self, command: MiningCommand, address: Option<&str>) -> Result<CommandGuard> {
        let panel = {
            let mut machine = self.machine.lock();
            machine.begin_command(command, address)?;
            machine.panel()
        };
        self.notify(&panel);
        Ok(CommandGuard {
            machine: self.machine.clone(),
            armed: true,
        })
    }

    pub fn panel(&self) -> MiningPanel {
        self.machine.lock().panel()
    }

    pub fn state(&self) -> MiningState {
        self.machine.lock().state()
    }

    pub fn controls(&self) -> MiningControls {
        self.machine.lock().controls()
    }

    pub fn set_miner_address(&self, address: &str) {
        self.machine.lock().set_miner_address(address);
    }

    pub fn miner_address(&self) -> Option<String> {
        self.machine.lock().miner_address().map(str::to_string)
    }

    /// One status poll. Failures land in the `Error` state, never in the caller.
    pub async fn poll(&self) -> MiningPanel {
        let poll = PollGuard::begin(&self.machine);
        let outcome = self.api.mining_status().await;
        if let Err(e) = &outcome {
            warn!(error = %e, "mining.poll.failed");
        }
        let panel = {
            let mut machine = self.machine.lock();
            poll.finish(&mut machine, &outcome);
            machine.panel()
        };
        self.notify(&panel);
        panel
    }

    pub async fn start_mining(&self, address: &str) -> Result<MiningPanel> {
        let command = self.begin(MiningCommand::Start, Some(address))?;
        let address = address.trim();
        info!(miner_address = %address, "mining.start");
        let outcome = self.api.start_mining(address).await;
        self.reconcile(command, MiningCommand::Start, outcome).await
    }

    pub async fn stop_mining(&self) -> Result<MiningPanel> {
        let command = self.begin(MiningCommand::Stop, None)?;
        info!("mining.stop");
        let outcome = self.api.stop_mining().await;
        self.reconcile(command, MiningCommand::Stop, outcome).await
    }

    /// Re-polls after a command, then releases the command slot. The command
    /// stays pending until the poll lands so the controls never flash enabled
    /// on stale state.
    async fn reconcile(
        &self,
        guard: CommandGuard,
        command: MiningCommand,
        outcome: Result<()>,
    ) -> Result<MiningPanel> {
        if let Err(e) = &outcome {
            warn!(command = ?command, error = %e, "mining.command.failed");
        }
        let poll = PollGuard::begin(&self.machine);
        let status = self.api.mining_status().await;
        let panel = {
            let mut machine = self.machine.lock();
            poll.finish(&mut machine, &status);
            guard.finish(&mut machine);
            machine.panel()
        };
        self.notify(&panel);
        outcome.map(|_| panel)
    }
}
