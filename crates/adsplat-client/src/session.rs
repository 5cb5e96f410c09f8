//! Session gate.
//!
//! The presence of a non-blank token in persistent storage is the only
//! authorization signal. Signing out wipes all persisted state, invalidates
//! every subscribed cache and schedules a redirect to the sign-in surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use adsplat_shared::constants::KEY_AUTHORIZATION;
use adsplat_store::{KvStore, StoreError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::notify::Feedback;
use crate::router::Navigator;

const SESSION_EXPIRED_NOTICE: &str = "Your session has expired, please sign in again";

/// Something holding state that must not outlive the session.
pub trait Invalidate: Send + Sync {
    fn invalidate(&self);
}

pub struct SessionGate {
    store: Arc<dyn KvStore>,
    feedback: Feedback,
    navigator: Option<Arc<dyn Navigator>>,
    sign_in_path: String,
    redirect_delay: Duration,
    listeners: Mutex<Vec<Weak<dyn Invalidate>>>,
    redirect_pending: Arc<AtomicBool>,
    /// Set once the expiry notice has been shown for the current token.
    expiry_noticed: AtomicBool,
}

impl SessionGate {
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn KvStore>,
        feedback: Feedback,
        navigator: Option<Arc<dyn Navigator>>,
    ) -> Self {
        Self {
            store,
            feedback,
            navigator,
            sign_in_path: config.sign_in_path.clone(),
            redirect_delay: config.redirect_delay,
            listeners: Mutex::new(Vec::new()),
            redirect_pending: Arc::new(AtomicBool::new(false)),
            expiry_noticed: AtomicBool::new(false),
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.token().is_some()
    }

    /// The trimmed session token, if one is stored.
    pub fn token(&self) -> Option<String> {
        match self.store.get(KEY_AUTHORIZATION) {
            Ok(token) => token
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            Err(e) => {
                error!(error = %e, "Failed to read session token");
                None
            }
        }
    }

    /// Store a new session token. Blank tokens are ignored.
    pub fn set_token(&self, token: &str) -> Result<(), StoreError> {
        let token = token.trim();
        if token.is_empty() {
            debug!("Ignoring blank session token");
            return Ok(());
        }
        self.store.set(KEY_AUTHORIZATION, token)?;
        self.expiry_noticed.store(false, Ordering::SeqCst);
        info!("Session token set");
        Ok(())
    }

    /// Register state to wipe on sign-out. Dropped listeners are pruned.
    pub fn subscribe(&self, listener: Weak<dyn Invalidate>) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.retain(|l| l.strong_count() > 0);
            listeners.push(listener);
        }
    }

    /// Handle an authorization failure reported by the backend.
    ///
    /// The expiry notice is shown at most once per token, and never while a
    /// redirect is already pending.
    pub fn expire(&self) -> Option<JoinHandle<()>> {
        let pending = self.redirect_pending.load(Ordering::SeqCst);
        if !pending && !self.expiry_noticed.swap(true, Ordering::SeqCst) {
            self.feedback.error(SESSION_EXPIRED_NOTICE);
        }
        self.sign_out()
    }

    /// Clear all persisted state and every subscribed cache, then redirect to
    /// the sign-in surface after the configured delay.
    ///
    /// Safe to call repeatedly: the clears run every time but only one
    /// redirect is ever pending. Returns the redirect task when one was
    /// scheduled.
    pub fn sign_out(&self) -> Option<JoinHandle<()>> {
        info!("Signing out");

        if let Err(e) = self.store.clear_all() {
            error!(error = %e, "Failed to clear persisted state");
        }

        let listeners: Vec<Arc<dyn Invalidate>> = self
            .listeners
            .lock()
            .map(|l| l.iter().filter_map(Weak::upgrade).collect())
            .unwrap_or_default();
        for listener in listeners {
            listener.invalidate();
        }

        self.schedule_redirect()
    }

    fn schedule_redirect(&self) -> Option<JoinHandle<()>> {
        let navigator = self.navigator.clone()?;

        if navigator.current_path() == self.sign_in_path {
            debug!("Already on the sign-in surface");
            return None;
        }
        if self.redirect_pending.swap(true, Ordering::SeqCst) {
            debug!("Redirect already pending");
            return None;
        }

        let path = self.sign_in_path.clone();
        let delay = self.redirect_delay;
        let pending = Arc::clone(&self.redirect_pending);
        let redirect = move || {
            if navigator.current_path() != path {
                navigator.navigate(&path);
            }
            pending.store(false, Ordering::SeqCst);
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => Some(handle.spawn(async move {
                tokio::time::sleep(delay).await;
                redirect();
            })),
            Err(_) => {
                warn!("No async runtime, redirecting immediately");
                redirect();
                None
            }
        }
    }
}
