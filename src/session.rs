//! Session context
//!
//! One [`Session`] owns everything the dashboard shows: the active wallet, the
//! mining machine, the last rendered chain view and the price history. Every
//! user command and every background refresh goes through it, and every state
//! change is pushed to a [`Presenter`].
//!
//! Background work is started with [`Session::start`] and torn down with
//! [`SessionTasks::shutdown`]; nothing keeps running once the tasks are gone.

use crate::api::{HttpNodeApi, NodeApi};
use crate::config::{absolute_api_url, resolve_api_base, DashboardConfig};
use crate::dashboard::{self, BlockDetailPanel, DashboardBoard, DashboardView, SearchResult};
use crate::error::{DashboardError, Result};
use crate::mining::{MiningController, MiningPanel};
use crate::price::{self, HttpPriceSource, PriceHistory, PriceSource};
use crate::scheduler::{spawn_periodic, ScheduledTask};
use crate::transaction;
use crate::wallet::{self, Wallet, WalletPanel, WalletState};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// Render sink for session state. Calls arrive from background tasks too.
pub trait Presenter: Send + Sync {
    fn dashboard(&self, view: &DashboardView);
    fn mining(&self, panel: &MiningPanel);
    fn wallet(&self, panel: &WalletPanel);
    fn price(&self, _history: &PriceHistory) {}
}

/// Presenter that drops everything. Handy for one-shot commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn dashboard(&self, _view: &DashboardView) {}
    fn mining(&self, _panel: &MiningPanel) {}
    fn wallet(&self, _panel: &WalletPanel) {}
}

pub struct Session {
    api: Arc<dyn NodeApi>,
    presenter: Arc<dyn Presenter>,
    config: DashboardConfig,
    wallet: Mutex<WalletState>,
    mining: MiningController,
    board: Mutex<DashboardBoard>,
    prices: Mutex<PriceHistory>,
    price_source: Option<Arc<dyn PriceSource>>,
}

impl Session {
    pub fn new(
        api: Arc<dyn NodeApi>,
        presenter: Arc<dyn Presenter>,
        config: DashboardConfig,
    ) -> Self {
        let mining = {
            let presenter = presenter.clone();
            MiningController::new(api.clone())
                .with_observer(Arc::new(move |panel: &MiningPanel| presenter.mining(panel)))
        };
        Session {
            api,
            presenter,
            config,
            wallet: Mutex::new(WalletState::default()),
            mining,
            board: Mutex::new(DashboardBoard::default()),
            prices: Mutex::new(PriceHistory::default()),
            price_source: None,
        }
    }

    /// Resolves the API base (launch parameter, then `?api=`, then `/api`) and
    /// wires an HTTP-backed session with a price ticker.
    pub fn connect(
        config: DashboardConfig,
        launch_param: Option<&str>,
        page_url: Option<&str>,
        presenter: Arc<dyn Presenter>,
    ) -> Result<Self> {
        let base = resolve_api_base(launch_param, page_url);
        let url = absolute_api_url(&base, &config.origin)?;
        info!(api = %url, "session.connect");

        let api = HttpNodeApi::new(url, config.request_timeout)?;
        let price_source = HttpPriceSource::new(&config.price_url, config.request_timeout)?;
        Ok(Session::new(Arc::new(api), presenter, config).with_price_source(Arc::new(price_source)))
    }

    pub fn with_price_source(mut self, source: Arc<dyn PriceSource>) -> Self {
        self.price_source = Some(source);
        self
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Wallet
    // ------------------------------------------------------------------------

    pub fn wallet(&self) -> Option<Wallet> {
        self.wallet.lock().active().cloned()
    }

    pub fn wallet_panel(&self) -> WalletPanel {
        self.wallet.lock().panel()
    }

    /// Asks the node for a new wallet. On failure the current wallet stays.
    pub async fn create_wallet(&self) -> Result<WalletPanel> {
        let created = wallet::create(self.api.as_ref()).await?;
        self.install_wallet(created);
        Ok(self.refresh_balance().await)
    }

    /// Loads wallet JSON. On failure the current wallet stays.
    pub async fn load_wallet(&self, json: &str) -> Result<WalletPanel> {
        let loaded = Wallet::from_json(json)?;
        self.install_wallet(loaded);
        Ok(self.refresh_balance().await)
    }

    pub fn export_wallet(&self) -> Result<String> {
        self.wallet
            .lock()
            .active()
            .ok_or(DashboardError::NoWallet)?
            .to_json()
    }

    fn install_wallet(&self, new_wallet: Wallet) {
        info!(address = %new_wallet.address, "session.wallet");
        let panel = {
            let mut state = self.wallet.lock();
            state.replace(new_wallet);
            state.panel()
        };
        self.presenter.wallet(&panel);
    }

    /// Re-reads the balance of the active wallet. A balance for a wallet that
    /// was replaced in the meantime is discarded.
    pub async fn refresh_balance(&self) -> WalletPanel {
        let active = self.wallet.lock().active().map(|w| w.address.clone());
        let Some(address) = active else {
            return self.wallet_panel();
        };
        let balance = wallet::balance(self.api.as_ref(), &address).await;
        let panel = {
            let mut state = self.wallet.lock();
            state.set_balance(&address, balance);
            state.panel()
        };
        self.presenter.wallet(&panel);
        panel
    }

    /// Signs and submits a transfer from the active wallet, then refreshes
    /// the balance on success.
    pub async fn send(&self, to_address: &str, amount: &str) -> Result<String> {
        let active = self.wallet();
        let tx_hash = transaction::send(self.api.as_ref(), active.as_ref(), to_address, amount).await?;
        self.refresh_balance().await;
        Ok(tx_hash)
    }

    // ------------------------------------------------------------------------
    // Mining
    // ------------------------------------------------------------------------

    pub fn mining_panel(&self) -> MiningPanel {
        self.mining.panel()
    }

    pub async fn poll_mining(&self) -> MiningPanel {
        self.mining.poll().await
    }

    pub async fn start_mining(&self, miner_address: &str) -> Result<MiningPanel> {
        self.mining.start_mining(miner_address).await
    }

    pub async fn stop_mining(&self) -> Result<MiningPanel> {
        self.mining.stop_mining().await
    }

    /// Fills the miner address from the configured CLI wallet. Only allowed
    /// while the start control is.
    pub fn load_cli_wallet_address(&self) -> Result<MiningPanel> {
        let address = self.config.cli_miner_address.as_deref().ok_or_else(|| {
            DashboardError::Config("no cli_miner_address configured".to_string())
        })?;
        if !self.mining.controls().load_cli_wallet_enabled {
            return Err(DashboardError::invalid_input(
                "Mining controls are disabled right now",
            ));
        }
        self.mining.set_miner_address(address);
        let panel = self.mining.panel();
        self.presenter.mining(&panel);
        Ok(panel)
    }

    // ------------------------------------------------------------------------
    // Chain view
    // ------------------------------------------------------------------------

    pub fn dashboard_view(&self) -> DashboardView {
        self.board.lock().view().clone()
    }

    /// One refresh cycle. Always yields a view: failures render as offline.
    /// A cycle that finishes after a newer one is dropped.
    pub async fn refresh_dashboard(&self) -> DashboardView {
        let ticket = self.board.lock().begin_refresh();
        let result = dashboard::refresh(self.api.as_ref(), self.config.recent_block_limit).await;
        if let Err(e) = &result {
            warn!(error = %e, "dashboard.refresh.failed");
        }
        let view = DashboardView::render(&result);
        let published = self.board.lock().publish(ticket, view.clone());
        if published {
            self.presenter.dashboard(&view);
        }
        self.dashboard_view()
    }

    pub async fn block_details(&self, height: u64) -> BlockDetailPanel {
        dashboard::block_details(self.api.as_ref(), height).await
    }

    pub async fn search(&self, query: &str) -> Option<SearchResult> {
        dashboard::search(self.api.as_ref(), query).await
    }

    // ------------------------------------------------------------------------
    // Price
    // ------------------------------------------------------------------------

    pub fn price_history(&self) -> PriceHistory {
        self.prices.lock().clone()
    }

    /// Takes one price sample if a source is configured.
    pub async fn sample_price(&self) {
        let Some(source) = &self.price_source else {
            return;
        };
        if let Some(sample) = price::sample(source.as_ref()).await {
            let history = {
                let mut prices = self.prices.lock();
                prices.push(sample);
                prices.clone()
            };
            self.presenter.price(&history);
        }
    }

    // ------------------------------------------------------------------------
    // Background
    // ------------------------------------------------------------------------

    /// Starts the refresh loops: chain view, mining status and, when a price
    /// source is set, the price ticker. Each fires immediately.
    pub fn start(self: &Arc<Self>) -> SessionTasks {
        let mut tasks = Vec::with_capacity(3);

        let session = self.clone();
        tasks.push(spawn_periodic(
            "dashboard",
            self.config.dashboard_refresh_interval,
            move || {
                let session = session.clone();
                async move {
                    session.refresh_dashboard().await;
                }
            },
        ));

        let session = self.clone();
        tasks.push(spawn_periodic(
            "mining",
            self.config.mining_poll_interval,
            move || {
                let session = session.clone();
                async move {
                    session.poll_mining().await;
                }
            },
        ));

        if self.price_source.is_some() {
            let session = self.clone();
            tasks.push(spawn_periodic(
                "price",
                self.config.price_refresh_interval,
                move || {
                    let session = session.clone();
                    async move {
                        session.sample_price().await;
                    }
                },
            ));
        }

        SessionTasks { tasks }
    }
}

/// Handles for the loops started by [`Session::start`].
pub struct SessionTasks {
    tasks: Vec<ScheduledTask>,
}

impl SessionTasks {
    pub fn names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(ScheduledTask::name).collect()
    }

    pub async fn shutdown(self) {
        for task in self.tasks {
            task.cancel().await;
        }
    }
}
