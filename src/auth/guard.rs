//! Route guard for protected views.
//!
//! The guard reads the session broadcast and decides, per navigation,
//! whether a view may render. It never calls the backend.
//!
//! | Guard state       | Public route | Protected route                    |
//! |-------------------|--------------|------------------------------------|
//! | `Loading`         | render       | pending (nothing rendered)         |
//! | `Unauthenticated` | render       | redirect to sign-in, replacing     |
//! | `Authenticated`   | render       | render                             |

use std::fmt;

use tokio::sync::watch;

use super::session::{SessionSnapshot, SessionState};

/// Views of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    SignIn,
    Dashboard,
    Applications,
    Application(u64),
}

impl Route {
    pub fn is_protected(self) -> bool {
        !matches!(self, Route::SignIn)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::SignIn => write!(f, "/login"),
            Route::Dashboard => write!(f, "/"),
            Route::Applications => write!(f, "/applications"),
            Route::Application(id) => write!(f, "/applications/{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// The session has not been hydrated yet.
    Loading,
    Authenticated,
    Unauthenticated,
}

impl GuardState {
    fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        if !snapshot.hydrated {
            GuardState::Loading
        } else if snapshot.session.is_authenticated() {
            GuardState::Authenticated
        } else {
            GuardState::Unauthenticated
        }
    }
}

/// Outcome of asking the guard about a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// No decision yet; render nothing.
    Pending,
    Render(Route),
    /// Go elsewhere. With `replace`, the rejected entry is dropped from history.
    Redirect { to: Route, replace: bool },
}

/// Gates protected routes on the session.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: watch::Receiver<SessionSnapshot>,
}

impl RouteGuard {
    pub fn new(session: &SessionState) -> Self {
        Self {
            session: session.subscribe(),
        }
    }

    pub fn state(&self) -> GuardState {
        GuardState::from_snapshot(&self.session.borrow())
    }

    /// Decide what to do with a navigation to `route`.
    pub fn check(&self, route: Route) -> Navigation {
        if !route.is_protected() {
            return Navigation::Render(route);
        }
        match self.state() {
            GuardState::Loading => Navigation::Pending,
            GuardState::Authenticated => Navigation::Render(route),
            GuardState::Unauthenticated => Navigation::Redirect {
                to: Route::SignIn,
                replace: true,
            },
        }
    }

    /// Wait until the session has been hydrated and return the settled state.
    pub async fn wait_ready(&mut self) -> GuardState {
        // A closed channel means the session is gone; report what we last saw.
        let _ = self.session.wait_for(|snapshot| snapshot.hydrated).await;
        self.state()
    }

    /// Wait for the next session change and return the new state.
    pub async fn changed(&mut self) -> Option<GuardState> {
        self.session.changed().await.ok()?;
        Some(self.state())
    }
}

/// Navigation history driven by guard decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries: Vec<Route>,
}

impl History {
    pub fn new(start: Route) -> Self {
        Self {
            entries: vec![start],
        }
    }

    pub fn current(&self) -> Route {
        // `entries` is never empty: `new` seeds it and `back` keeps one entry.
        self.entries.last().copied().unwrap_or(Route::SignIn)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Navigate to `route` through the guard and apply the outcome.
    pub fn navigate(&mut self, guard: &RouteGuard, route: Route) -> Navigation {
        let outcome = guard.check(route);
        match outcome {
            Navigation::Pending => {}
            Navigation::Render(route) => self.push(route),
            Navigation::Redirect { to, replace: true } => self.replace(to),
            Navigation::Redirect { to, replace: false } => self.push(to),
        }
        outcome
    }

    /// Re-run the guard on the current entry, e.g. after the session changed.
    pub fn revalidate(&mut self, guard: &RouteGuard) -> Navigation {
        let outcome = guard.check(self.current());
        if let Navigation::Redirect { to, .. } = outcome {
            self.replace(to);
        }
        outcome
    }

    /// Go back one entry. Returns the new current route.
    pub fn back(&mut self) -> Route {
        if self.entries.len() > 1 {
            self.entries.pop();
        }
        self.current()
    }

    fn push(&mut self, route: Route) {
        if self.current() != route {
            self.entries.push(route);
        }
    }

    fn replace(&mut self, route: Route) {
        self.entries.pop();
        self.entries.push(route);
    }
}
