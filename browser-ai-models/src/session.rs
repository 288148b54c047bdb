//! Session lifecycle.
//!
//! A [`SessionManager`] owns at most one live session for a platform. The
//! first caller of [`SessionManager::get_session`] starts the initialisation;
//! concurrent callers wait on the same shared future, so the platform
//! constructor runs once.
//!
//! ```text
//!   NoSession --get_session--> Initializing --ok--> Ready
//!       ^                          |                  |
//!       +--------- failure --------+                  |
//!       +------------------- destroy ----------------+
//! ```

use crate::error::SessionError;
use crate::options::SessionOptions;
use crate::platform::{Availability, LanguageModelPlatform, LanguageModelSession};
use crate::progress::ProgressSink;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared handle to a live session.
pub type SessionHandle = Arc<dyn LanguageModelSession>;

type SharedInit = Shared<BoxFuture<'static, Result<SessionHandle, SessionError>>>;

enum SessionState {
    NoSession,
    Initializing { epoch: u64, init: SharedInit },
    Ready { epoch: u64, session: SessionHandle },
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            SessionState::NoSession => "no-session",
            SessionState::Initializing { .. } => "initializing",
            SessionState::Ready { .. } => "ready",
        }
    }
}

enum SessionEvent {
    Started(SharedInit),
    Succeeded(u64, SessionHandle),
    Failed(u64),
    Destroyed,
}

/// How a waiter's finished initialisation relates to the current state.
enum Outcome {
    Accepted,
    /// Promoted to ready, then destroyed before this waiter resumed.
    AlreadyDestroyed,
    /// Abandoned while still initializing.
    Abandoned { first_to_notice: bool },
}

struct Inner {
    state: SessionState,
    next_epoch: u64,
    discarded_epoch: Option<u64>,
    /// Epoch of the last ready session torn down by `destroy_session`.
    destroyed_ready: Option<u64>,
}

impl Inner {
    /// Apply an event. Returns `false` when the event belongs to an
    /// initialisation that has since been superseded.
    fn transition(&mut self, event: SessionEvent) -> bool {
        let current = std::mem::replace(&mut self.state, SessionState::NoSession);
        let (next, accepted) = match (current, event) {
            (SessionState::NoSession, SessionEvent::Started(init)) => {
                self.next_epoch += 1;
                (
                    SessionState::Initializing {
                        epoch: self.next_epoch,
                        init,
                    },
                    true,
                )
            }
            (SessionState::Initializing { epoch, .. }, SessionEvent::Succeeded(done, session))
                if epoch == done =>
            {
                (SessionState::Ready { epoch, session }, true)
            }
            (SessionState::Initializing { epoch, .. }, SessionEvent::Failed(done))
                if epoch == done =>
            {
                (SessionState::NoSession, true)
            }
            (SessionState::Ready { epoch, session }, SessionEvent::Succeeded(done, _))
                if epoch == done =>
            {
                // Another waiter already promoted this initialisation.
                (SessionState::Ready { epoch, session }, true)
            }
            (_, SessionEvent::Destroyed) => (SessionState::NoSession, true),
            (state, _) => (state, false),
        };
        self.state = next;
        accepted
    }
}

/// Owns the session for one platform.
pub struct SessionManager {
    platform: Arc<dyn LanguageModelPlatform>,
    base_options: SessionOptions,
    inner: Mutex<Inner>,
}

impl SessionManager {
    /// Create a manager with base options applied to every session.
    pub fn new(platform: Arc<dyn LanguageModelPlatform>, base_options: SessionOptions) -> Self {
        Self {
            platform,
            base_options,
            inner: Mutex::new(Inner {
                state: SessionState::NoSession,
                next_epoch: 0,
                discarded_epoch: None,
                destroyed_ready: None,
            }),
        }
    }

    /// The platform sessions are created on.
    pub fn platform(&self) -> &Arc<dyn LanguageModelPlatform> {
        &self.platform
    }

    /// Options applied to every session.
    pub fn base_options(&self) -> &SessionOptions {
        &self.base_options
    }

    /// Check availability without creating anything.
    pub async fn check_availability(&self) -> Availability {
        if !self.platform.is_supported() {
            return Availability::Unavailable;
        }
        match self.platform.availability(&self.base_options).await {
            Ok(availability) => availability,
            Err(e) => {
                warn!(platform = self.platform.name(), error = %e, "Availability check failed");
                Availability::Unavailable
            }
        }
    }

    /// Get the live session, creating it if needed.
    ///
    /// Once a session is ready it is returned as is; `options` only apply to
    /// the initialisation that creates it.
    pub async fn get_session(
        &self,
        options: Option<&SessionOptions>,
    ) -> Result<SessionHandle, SessionError> {
        let (epoch, init) = {
            let mut inner = self.inner.lock();
            match &inner.state {
                SessionState::Ready { session, .. } => return Ok(Arc::clone(session)),
                SessionState::Initializing { epoch, init } => {
                    debug!(epoch, "Joining in-flight session initialization");
                    (*epoch, init.clone())
                }
                SessionState::NoSession => {
                    let merged = match options {
                        Some(call) => self.base_options.merge(call),
                        None => self.base_options.clone(),
                    };
                    let init = initialize(Arc::clone(&self.platform), merged)
                        .boxed()
                        .shared();
                    inner.transition(SessionEvent::Started(init.clone()));
                    (inner.next_epoch, init)
                }
            }
        };

        let result = init.await;

        let outcome = {
            let mut inner = self.inner.lock();
            let accepted = match &result {
                Ok(session) => {
                    inner.transition(SessionEvent::Succeeded(epoch, Arc::clone(session)))
                }
                Err(_) => inner.transition(SessionEvent::Failed(epoch)),
            };
            if accepted {
                Outcome::Accepted
            } else if inner.destroyed_ready == Some(epoch) {
                Outcome::AlreadyDestroyed
            } else {
                let first_to_notice = inner.discarded_epoch != Some(epoch);
                inner.discarded_epoch = Some(epoch);
                Outcome::Abandoned { first_to_notice }
            }
        };

        match (result, outcome) {
            (Ok(session), Outcome::Accepted) => Ok(session),
            (Ok(session), Outcome::AlreadyDestroyed) => {
                // The session was handed out as ready before the destroy.
                debug!(epoch, "Late waiter on a session that was already destroyed");
                Ok(session)
            }
            (Ok(session), Outcome::Abandoned { first_to_notice }) => {
                debug!(epoch, "Session finished initializing after destroy; discarding");
                if first_to_notice {
                    destroy_handle(self.platform.name(), &session).await;
                }
                Err(SessionError::InitializationFailed(
                    "session was destroyed while initializing".to_string(),
                ))
            }
            (Err(e), _) => Err(e),
        }
    }

    /// Create the session, relaying download progress to `on_progress`.
    pub async fn create_session_with_progress(
        &self,
        on_progress: Arc<dyn ProgressSink>,
    ) -> Result<SessionHandle, SessionError> {
        let options = SessionOptions::new().on_download_progress(on_progress);
        self.get_session(Some(&options)).await
    }

    /// The live session, if one is ready.
    pub fn current_session(&self) -> Option<SessionHandle> {
        match &self.inner.lock().state {
            SessionState::Ready { session, .. } => Some(Arc::clone(session)),
            _ => None,
        }
    }

    /// Destroy the live session, if any.
    ///
    /// Always ends in the no-session state. An initialisation in flight is
    /// abandoned and its result discarded when it completes.
    pub async fn destroy_session(&self) {
        let previous = {
            let mut inner = self.inner.lock();
            let ready = match &inner.state {
                SessionState::Ready { epoch, session } => Some((*epoch, Arc::clone(session))),
                _ => None,
            };
            let handle = ready.map(|(epoch, session)| {
                inner.destroyed_ready = Some(epoch);
                inner.discarded_epoch = Some(epoch);
                session
            });
            debug!(state = inner.state.name(), "Destroying session");
            inner.transition(SessionEvent::Destroyed);
            handle
        };

        if let Some(session) = previous {
            destroy_handle(self.platform.name(), &session).await;
        }
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SessionManager")
            .field("platform", &self.platform.name())
            .field("state", &inner.state.name())
            .field("epoch", &inner.next_epoch)
            .finish()
    }
}

async fn initialize(
    platform: Arc<dyn LanguageModelPlatform>,
    options: SessionOptions,
) -> Result<SessionHandle, SessionError> {
    let name = platform.name().to_string();
    if !platform.is_supported() {
        return Err(SessionError::PlatformUnavailable(format!(
            "{name} is not supported in this environment"
        )));
    }

    let availability = platform
        .availability(&options)
        .await
        .map_err(|e| SessionError::ModelUnavailable(format!("{name}: {e}")))?;
    if availability == Availability::Unavailable {
        return Err(SessionError::ModelUnavailable(format!(
            "{name} reports the model as unavailable"
        )));
    }

    debug!(platform = %name, ?availability, "Creating session");
    let session = platform
        .create_session(options.into_request())
        .await
        .map_err(|e| SessionError::InitializationFailed(e.message))?;
    info!(platform = %name, "Session ready");
    Ok(session)
}

async fn destroy_handle(platform: &str, session: &SessionHandle) {
    if !session.supports_destroy() {
        return;
    }
    if let Err(e) = session.destroy().await {
        warn!(platform, error = %e, "Failed to destroy session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPlatform;
    use crate::progress::ProgressCallback;
    use crate::progress::ProgressReport;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn manager(platform: &Arc<MockPlatform>) -> SessionManager {
        SessionManager::new(platform.clone(), SessionOptions::new())
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_initialization() {
        let platform = Arc::new(MockPlatform::new().with_create_delay(Duration::from_millis(20)));
        let manager = manager(&platform);

        let (a, b, c) = tokio::join!(
            manager.get_session(None),
            manager.get_session(None),
            manager.get_session(None)
        );
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

        assert_eq!(platform.create_calls(), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
        assert!(manager.current_session().is_some());
    }

    #[tokio::test]
    async fn test_ready_session_ignores_later_options() {
        let platform = Arc::new(MockPlatform::new());
        let manager = manager(&platform);

        let first = manager
            .get_session(Some(&SessionOptions::new().temperature(0.1)))
            .await
            .unwrap();
        let second = manager
            .get_session(Some(&SessionOptions::new().temperature(0.9)))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(platform.create_calls(), 1);
        assert_eq!(platform.recorded_requests()[0].temperature, Some(0.1));
    }

    #[tokio::test]
    async fn test_destroy_then_recreate_yields_new_handle() {
        let platform = Arc::new(MockPlatform::new());
        let manager = manager(&platform);

        let first = manager.get_session(None).await.unwrap();
        manager.destroy_session().await;
        assert!(manager.current_session().is_none());
        assert_eq!(platform.destroyed_sessions(), 1);

        let second = manager.get_session(None).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(platform.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_destroy_failure_still_resets() {
        let platform = Arc::new(MockPlatform::new().with_failing_destroy());
        let manager = manager(&platform);

        manager.get_session(None).await.unwrap();
        manager.destroy_session().await;
        assert!(manager.current_session().is_none());
    }

    #[tokio::test]
    async fn test_unsupported_platform() {
        let platform = Arc::new(MockPlatform::new().unsupported());
        let manager = manager(&platform);

        let err = manager.get_session(None).await.err().unwrap();
        assert!(matches!(err, SessionError::PlatformUnavailable(_)));
        assert_eq!(platform.create_calls(), 0);
        assert_eq!(manager.check_availability().await, Availability::Unavailable);
    }

    #[tokio::test]
    async fn test_unavailable_model() {
        let platform = Arc::new(MockPlatform::new().with_availability(Availability::Unavailable));
        let manager = manager(&platform);

        let err = manager.get_session(None).await.err().unwrap();
        assert!(matches!(err, SessionError::ModelUnavailable(_)));
        assert_eq!(platform.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_initialization_can_be_retried() {
        let platform = Arc::new(MockPlatform::new().with_create_failures(1));
        let manager = manager(&platform);

        let err = manager.get_session(None).await.err().unwrap();
        assert!(matches!(err, SessionError::InitializationFailed(_)));
        assert!(manager.current_session().is_none());

        manager.get_session(None).await.unwrap();
        assert_eq!(platform.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_progress_is_relayed_in_order() {
        let platform = Arc::new(MockPlatform::new().with_progress([
            ProgressReport::Fraction(0.1),
            ProgressReport::Fraction(0.5),
            ProgressReport::Fraction(1.0),
        ]));
        let manager = manager(&platform);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        manager
            .create_session_with_progress(ProgressCallback::shared(move |v| {
                sink_seen.lock().push(v)
            }))
            .await
            .unwrap();

        assert_eq!(*seen.lock(), vec![0.1, 0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_destroy_while_initializing_discards_result() {
        let platform = Arc::new(MockPlatform::new().with_create_delay(Duration::from_millis(30)));
        let manager = Arc::new(manager(&platform));

        let waiter = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.get_session(None).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        manager.destroy_session().await;

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(SessionError::InitializationFailed(_))));
        assert!(manager.current_session().is_none());
        assert_eq!(platform.destroyed_sessions(), 1);

        manager.get_session(None).await.unwrap();
        assert_eq!(platform.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_late_waiter_after_ready_and_destroy_keeps_its_session() {
        let platform = Arc::new(MockPlatform::new().with_create_delay(Duration::from_millis(20)));
        let manager = manager(&platform);

        let mut first = Box::pin(manager.get_session(None));
        let mut second = Box::pin(manager.get_session(None));
        assert!(futures::poll!(first.as_mut()).is_pending());
        assert!(futures::poll!(second.as_mut()).is_pending());

        let first = first.await.unwrap();
        manager.destroy_session().await;
        let second = second.await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(platform.create_calls(), 1);
        let sessions = platform.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].destroy_calls(), 1);
        assert!(manager.current_session().is_none());
    }

    #[tokio::test]
    async fn test_check_availability_does_not_create() {
        let platform = Arc::new(MockPlatform::new().with_availability(Availability::Downloadable));
        let manager = manager(&platform);
        assert_eq!(manager.check_availability().await, Availability::Downloadable);
        assert_eq!(platform.create_calls(), 0);
        assert!(manager.current_session().is_none());
    }
}
