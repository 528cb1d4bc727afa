//! Redirect hook for session-ending transitions.
//!
//! The SDK doesn't know what "go to the login view" means — a desktop
//! shell swaps a screen, a TUI swaps a pane, a test records the call.
//! The [`Navigator`] trait is the seam: implement it with your app's
//! navigation and hand it to the [`SessionController`].
//!
//! [`SessionController`]: crate::SessionController

/// Sends the user to the login view after a session ends.
///
/// Called from async tasks; implementations must be cheap and
/// non-blocking (post a message to your UI loop rather than doing the
/// navigation inline).
pub trait Navigator: Send + Sync + 'static {
    /// The session is over — show the login view.
    fn to_login(&self);
}

/// A [`Navigator`] that does nothing.
///
/// For headless embedders (scripts, collectors) that poll
/// `is_authenticated` instead of navigating.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn to_login(&self) {}
}
