//! Per-product watcher: stock polling, hold countdown, submission guard.
//!
//! One watcher per displayed product. It owns two background tasks:
//!
//! - a stock poll (default every 30 s, plus on demand via
//!   [`refresh_now`](ProductWatcher::refresh_now) and after every mutation)
//!   publishing [`StockSnapshot`]s on a watch channel;
//! - while a hold exists, a 1 s countdown deriving `M:SS` from the
//!   server-issued deadline.
//!
//! Both tasks are aborted when the watcher drops. The countdown reaching
//! zero is a UI event only: it emits an `Expired` notification and forces a
//! stock re-read, but never mutates server state. The server may keep
//! reporting the hold Active for a few more seconds; the next sweep or
//! mutating call settles it.
//!
//! The watcher never does stock arithmetic locally. Displayed availability
//! always comes from a fresh [`StockSnapshot`].

use crate::api::{ClientError, ReservationBackend};
use crate::countdown::{EXPIRED_LABEL, format_remaining};
use crate::notify::{Notification, NotificationKind};
use reserva_core::{Clock, ProductId, Reservation, StockSnapshot, SystemClock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Tunables for a [`ProductWatcher`].
#[derive(Clone, Copy, Debug)]
pub struct WatcherConfig {
    /// Interval between background stock reads.
    pub poll_interval: Duration,
    /// Interval between countdown updates while a hold exists.
    pub countdown_tick: Duration,
    /// Per-order quantity cap mirrored from the server policy.
    pub max_per_order: u32,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            countdown_tick: Duration::from_secs(1),
            max_per_order: 10,
        }
    }
}

/// Errors surfaced by watcher operations.
///
/// Every error is also pushed on the notification channel and triggers a
/// stock re-read before it is returned.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// A mutating call is already in flight; the submission was dropped.
    #[error("a request is already in flight")]
    Busy,
    /// The pre-reserve stock read showed too little stock; no request was sent.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        /// Units the user asked for
        requested: u32,
        /// Units the last snapshot showed
        available: u32,
    },
    /// Confirm or cancel with no hold in place.
    #[error("no active hold")]
    NoActiveHold,
    /// The request reached the server (or the transport) and failed.
    #[error(transparent)]
    Backend(#[from] ClientError),
}

struct Shared {
    backend: Arc<dyn ReservationBackend>,
    product_id: ProductId,
    token: String,
    clock: Arc<dyn Clock>,
    stock_tx: watch::Sender<Option<StockSnapshot>>,
    countdown_tx: watch::Sender<Option<String>>,
    notifications: mpsc::UnboundedSender<Notification>,
    refresh: Notify,
    in_flight: AtomicBool,
    hold: StdMutex<Option<Reservation>>,
}

impl Shared {
    fn current_hold(&self) -> Option<Reservation> {
        self.hold.lock().ok().and_then(|h| h.clone())
    }

    fn set_hold(&self, value: Option<Reservation>) {
        if let Ok(mut hold) = self.hold.lock() {
            *hold = value;
        }
    }

    fn notify(&self, kind: NotificationKind, message: impl Into<String>) {
        let _ = self
            .notifications
            .send(Notification::new(kind, message, self.clock.now()));
    }

    /// Reads a fresh snapshot and publishes it. Poll errors are logged, not
    /// surfaced; the previous snapshot stays on the channel.
    async fn publish_stock(&self) {
        match self.backend.stock(self.product_id).await {
            Ok(snapshot) => {
                self.stock_tx.send_replace(Some(snapshot));
            }
            Err(error) => {
                warn!(product = %self.product_id, %error, "stock poll failed");
            }
        }
    }
}

/// Releases the submission guard on every exit path.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Watches one product: publishes stock, runs the hold countdown, and
/// funnels reserve/confirm/cancel through a single-submission guard.
pub struct ProductWatcher {
    shared: Arc<Shared>,
    config: WatcherConfig,
    poll_task: JoinHandle<()>,
    countdown_task: StdMutex<Option<JoinHandle<()>>>,
    notifications_rx: Option<mpsc::UnboundedReceiver<Notification>>,
}

impl ProductWatcher {
    /// Starts watching `product_id`, acting as the bearer of `token`.
    #[must_use]
    pub fn new(
        backend: Arc<dyn ReservationBackend>,
        product_id: ProductId,
        token: impl Into<String>,
        config: WatcherConfig,
    ) -> Self {
        Self::with_clock(backend, product_id, token, config, Arc::new(SystemClock))
    }

    /// [`new`](Self::new) with an explicit clock for deterministic tests.
    #[must_use]
    pub fn with_clock(
        backend: Arc<dyn ReservationBackend>,
        product_id: ProductId,
        token: impl Into<String>,
        config: WatcherConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (stock_tx, _) = watch::channel(None);
        let (countdown_tx, _) = watch::channel(None);
        let (notifications, notifications_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            backend,
            product_id,
            token: token.into(),
            clock,
            stock_tx,
            countdown_tx,
            notifications,
            refresh: Notify::new(),
            in_flight: AtomicBool::new(false),
            hold: StdMutex::new(None),
        });

        let poll_task = tokio::spawn(Self::poll_loop(shared.clone(), config.poll_interval));

        Self {
            shared,
            config,
            poll_task,
            countdown_task: StdMutex::new(None),
            notifications_rx: Some(notifications_rx),
        }
    }

    async fn poll_loop(shared: Arc<Shared>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = shared.refresh.notified() => {}
            }
            shared.publish_stock().await;
        }
    }

    /// Latest stock snapshot; `None` until the first successful poll.
    #[must_use]
    pub fn stock_updates(&self) -> watch::Receiver<Option<StockSnapshot>> {
        self.shared.stock_tx.subscribe()
    }

    /// Countdown label while a hold exists (`M:SS`, then the expired label).
    #[must_use]
    pub fn countdown_updates(&self) -> watch::Receiver<Option<String>> {
        self.shared.countdown_tx.subscribe()
    }

    /// Takes the notification stream. Yields `None` on the second call.
    pub fn take_notifications(&mut self) -> Option<mpsc::UnboundedReceiver<Notification>> {
        self.notifications_rx.take()
    }

    /// The hold currently tracked by this watcher, if any.
    #[must_use]
    pub fn current_hold(&self) -> Option<Reservation> {
        self.shared.current_hold()
    }

    /// Forces an immediate stock read outside the regular poll cadence.
    pub fn refresh_now(&self) {
        self.shared.refresh.notify_one();
    }

    /// Clamps a requested quantity to `[1, min(stock, cap)]`.
    ///
    /// UX guidance only; the server revalidates. Returns 0 when the product
    /// is out of stock (the reserve control should be disabled).
    #[must_use]
    pub fn clamp_quantity(&self, requested: u32, stock: u32) -> u32 {
        if stock == 0 {
            0
        } else {
            requested.clamp(1, stock.min(self.config.max_per_order))
        }
    }

    /// Places a hold on the watched product.
    ///
    /// Re-reads stock first and refuses locally when the snapshot cannot
    /// cover `quantity`, saving a doomed round trip. On success the countdown
    /// starts and a fresh snapshot is published.
    ///
    /// # Errors
    ///
    /// [`WatchError::Busy`] while another submission is in flight,
    /// [`WatchError::InsufficientStock`] on the local refusal, or the
    /// backend's error. Every error also lands on the notification channel.
    pub async fn reserve(
        &self,
        quantity: u32,
        hold_minutes: Option<u32>,
    ) -> Result<Reservation, WatchError> {
        let _guard = self.acquire_guard()?;

        let snapshot = match self.shared.backend.stock(self.shared.product_id).await {
            Ok(snapshot) => snapshot,
            Err(error) => return Err(self.fail(error.into())),
        };
        if snapshot.stock_disponible < quantity {
            return Err(self.fail(WatchError::InsufficientStock {
                requested: quantity,
                available: snapshot.stock_disponible,
            }));
        }

        let reservation = match self
            .shared
            .backend
            .reserve(
                &self.shared.token,
                self.shared.product_id,
                quantity,
                hold_minutes,
            )
            .await
        {
            Ok(reservation) => reservation,
            Err(error) => return Err(self.fail(error.into())),
        };

        self.shared.set_hold(Some(reservation.clone()));
        self.start_countdown(reservation.clone());
        self.shared.notify(
            NotificationKind::Created,
            format!("Reserva creada, {} unidades", reservation.quantity),
        );
        self.shared.publish_stock().await;
        Ok(reservation)
    }

    /// Confirms the tracked hold, converting it to a sale.
    ///
    /// # Errors
    ///
    /// [`WatchError::Busy`], [`WatchError::NoActiveHold`], or the backend's
    /// error. A `409` from the server means the hold already reached a
    /// terminal state (usually expiry); the watcher drops it locally.
    pub async fn confirm(&self) -> Result<(), WatchError> {
        let _guard = self.acquire_guard()?;
        let hold = self.shared.current_hold().ok_or(WatchError::NoActiveHold)?;

        match self.shared.backend.confirm(&self.shared.token, hold.id).await {
            Ok(status) => {
                debug!(reservation = %hold.id, %status, "hold confirmed");
                self.clear_hold();
                self.shared
                    .notify(NotificationKind::Confirmed, "Reserva confirmada");
                self.shared.publish_stock().await;
                Ok(())
            }
            Err(error) => {
                self.drop_hold_if_terminal(&error);
                Err(self.fail(error.into()))
            }
        }
    }

    /// Cancels the tracked hold, returning its stock to the pool.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`confirm`](Self::confirm).
    pub async fn cancel(&self) -> Result<(), WatchError> {
        let _guard = self.acquire_guard()?;
        let hold = self.shared.current_hold().ok_or(WatchError::NoActiveHold)?;

        match self.shared.backend.cancel(&self.shared.token, hold.id).await {
            Ok(status) => {
                debug!(reservation = %hold.id, %status, "hold cancelled");
                self.clear_hold();
                self.shared
                    .notify(NotificationKind::Cancelled, "Reserva cancelada");
                self.shared.publish_stock().await;
                Ok(())
            }
            Err(error) => {
                self.drop_hold_if_terminal(&error);
                Err(self.fail(error.into()))
            }
        }
    }

    fn acquire_guard(&self) -> Result<FlightGuard<'_>, WatchError> {
        if self
            .shared
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Ok(FlightGuard(&self.shared.in_flight))
        } else {
            Err(WatchError::Busy)
        }
    }

    /// Pushes the error as a notification and forces a stock re-read, then
    /// hands the error back for the caller to propagate.
    fn fail(&self, error: WatchError) -> WatchError {
        let _ = self.shared.notifications.send(Notification::new(
            NotificationKind::Error,
            error.to_string(),
            self.shared.clock.now(),
        ));
        self.shared.refresh.notify_one();
        error
    }

    /// Terminal states are monotonic: a 409 means this hold will never be
    /// Active again, so tracking it further is pointless.
    fn drop_hold_if_terminal(&self, error: &ClientError) {
        if error.code() == Some("INVALID_TRANSITION") {
            self.clear_hold();
        }
    }

    fn clear_hold(&self) {
        self.shared.set_hold(None);
        self.shared.countdown_tx.send_replace(None);
        if let Ok(mut task) = self.countdown_task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }

    fn start_countdown(&self, reservation: Reservation) {
        let shared = self.shared.clone();
        let tick = self.config.countdown_tick;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            loop {
                ticker.tick().await;
                let now = shared.clock.now();
                if reservation.expires_at.is_expired(now) {
                    shared
                        .countdown_tx
                        .send_replace(Some(EXPIRED_LABEL.to_string()));
                    shared.set_hold(None);
                    shared.notify(
                        NotificationKind::Expired,
                        "La reserva ha expirado, el stock vuelve a estar disponible",
                    );
                    // Server-authoritative: the deadline passing is rendered,
                    // never written back. A refresh picks up the real state.
                    shared.refresh.notify_one();
                    break;
                }
                shared
                    .countdown_tx
                    .send_replace(Some(format_remaining(reservation.expires_at, now)));
            }
        });
        if let Ok(mut task) = self.countdown_task.lock() {
            if let Some(previous) = task.replace(handle) {
                previous.abort();
            }
        }
    }
}

impl Drop for ProductWatcher {
    fn drop(&mut self) {
        self.poll_task.abort();
        if let Ok(mut task) = self.countdown_task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}
