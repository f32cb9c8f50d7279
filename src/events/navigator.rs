//! Navigation to the login surface.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

/// Page-level navigation used on unrecoverable authorization failures.
pub trait Navigator: Send + Sync {
    /// Path currently shown to the user.
    fn current_path(&self) -> String;

    /// Path of the login surface.
    fn login_path(&self) -> &str;

    fn go_to_login(&self);

    fn is_at_login(&self) -> bool {
        self.current_path() == self.login_path()
    }
}

/// Navigator that tracks the current route and counts login redirects.
#[derive(Debug)]
pub struct RouteTracker {
    login_path: String,
    current: RwLock<String>,
    redirects: AtomicUsize,
}

impl RouteTracker {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            current: RwLock::new("/".to_string()),
            redirects: AtomicUsize::new(0),
        }
    }

    /// Record a navigation initiated by the application itself.
    pub fn navigate(&self, path: impl Into<String>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = path.into();
    }

    /// Number of times the gateway sent the user to the login surface.
    pub fn redirect_count(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Default for RouteTracker {
    fn default() -> Self {
        Self::new("/login")
    }
}

impl Navigator for RouteTracker {
    fn current_path(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn login_path(&self) -> &str {
        &self.login_path
    }

    fn go_to_login(&self) {
        let from = self.current_path();
        self.navigate(self.login_path.clone());
        self.redirects.fetch_add(1, Ordering::SeqCst);
        tracing::warn!(from = %from, to = %self.login_path, "Redirecting to login");
    }
}
