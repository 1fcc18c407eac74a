//! Single-flight credential refresh.
//!
//! When a request fails authentication the request client hands it to the
//! [`RefreshCoordinator`]. The first failure of an episode flips the state to
//! `Refreshing` and spawns exactly one refresh call; every failure arriving
//! while that call is in flight is queued as a waiter. When the call settles,
//! each waiter is either replayed once with the new access token or rejected
//! with a fatal authentication error.
//!
//! State transitions happen synchronously under the state lock before any I/O
//! is awaited, so at most one refresh call is ever in flight. `sign_in` and
//! `sign_out` bump a session epoch; an episode that settles after the epoch
//! moved leaves the store alone and rejects its waiters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, instrument, warn};

use super::refresher::TokenRefresher;
use super::store::CredentialStore;
use super::types::{CredentialPair, RefreshState, SessionEvent, SignOutReason};
use crate::error::{Error, Result};
use crate::transport::{ApiResponse, RequestDescriptor, Transport};

/// Default channel capacity for session events.
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// A request suspended until the current refresh episode settles.
struct Waiter {
    request: RequestDescriptor,
    /// One-shot: cleared by the single replay this waiter is allowed.
    retry_available: bool,
    reply: oneshot::Sender<Result<ApiResponse>>,
}

struct CoordinatorState {
    phase: RefreshState,
    waiters: Vec<Waiter>,
    /// Bumped by every explicit `sign_in` and `sign_out`.
    epoch: u64,
}

struct Inner {
    store: Arc<CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    transport: Arc<dyn Transport>,
    state: Mutex<CoordinatorState>,
    events: broadcast::Sender<SessionEvent>,
    refresh_calls: AtomicU64,
}

/// What to do with an authentication failure once it has been admitted.
enum Admission {
    Stale { waiter: Waiter, current: String },
    StartEpisode { epoch: u64 },
    Queued,
}

/// Outcome of a replay, for deciding whether the session must end.
enum ReplayOutcome {
    Settled,
    Rejected { token: String },
}

/// Serializes re-authentication and replays blocked requests.
///
/// Cheap to clone; clones share the same state, store and waiter queue.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                store,
                refresher,
                transport,
                state: Mutex::new(CoordinatorState {
                    phase: RefreshState::Idle,
                    waiters: Vec::new(),
                    epoch: 0,
                }),
                events,
                refresh_calls: AtomicU64::new(0),
            }),
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.inner.store
    }

    pub fn state(&self) -> RefreshState {
        self.inner.state.lock().phase
    }

    /// Number of waiters queued in the current episode.
    pub fn pending_waiters(&self) -> usize {
        self.inner.state.lock().waiters.len()
    }

    /// Number of refresh network calls made so far.
    pub fn refresh_count(&self) -> u64 {
        self.inner.refresh_calls.load(Ordering::Relaxed)
    }

    /// Subscribe to session events, including the global sign-out signal.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Install a credential pair obtained from login.
    pub fn sign_in(&self, pair: CredentialPair) {
        {
            let mut state = self.inner.state.lock();
            state.epoch += 1;
            self.inner.store.set(pair);
        }
        info!("Session established");
        self.publish(SessionEvent::SignedIn {
            timestamp: Utc::now(),
        });
    }

    /// Drop the current session.
    pub fn sign_out(&self) {
        {
            let mut state = self.inner.state.lock();
            state.epoch += 1;
            self.inner.store.clear();
        }
        info!("Session cleared by user");
        self.publish(SessionEvent::SignedOut {
            reason: SignOutReason::UserRequested,
            timestamp: Utc::now(),
        });
    }

    /// Handle a request that failed authentication.
    ///
    /// `sent_with` is the access token the failed attempt carried. The returned
    /// future resolves with the replayed response, or with
    /// [`Error::AuthenticationFatal`] if the session cannot be recovered.
    pub async fn on_auth_failure(
        &self,
        request: RequestDescriptor,
        sent_with: Option<&str>,
    ) -> Result<ApiResponse> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let waiter = Waiter {
            request,
            retry_available: true,
            reply: reply_tx,
        };

        let admission = {
            let mut state = self.inner.state.lock();
            match self.inner.store.access_token() {
                Some(current)
                    if state.phase == RefreshState::Idle
                        && sent_with != Some(current.as_str()) =>
                {
                    Admission::Stale { waiter, current }
                }
                _ => {
                    state.waiters.push(waiter);
                    match state.phase {
                        RefreshState::Idle => {
                            state.phase = RefreshState::Refreshing;
                            Admission::StartEpisode { epoch: state.epoch }
                        }
                        RefreshState::Refreshing => Admission::Queued,
                    }
                }
            }
        };

        match admission {
            Admission::Stale { waiter, current } => {
                // A refresh completed after this request was sent; replay with
                // the current token instead of starting another episode.
                debug!(request = %waiter.request.label(), "Replaying with already refreshed token");
                if let ReplayOutcome::Rejected { token } = self.settle(waiter, current).await {
                    self.end_session_after_rejection(&token);
                }
            }
            Admission::StartEpisode { epoch } => {
                // The episode owns the state machine until it settles; a caller
                // dropping its future must not strand it in `Refreshing`.
                let this = self.clone();
                tokio::spawn(async move { this.run_episode(epoch).await });
            }
            Admission::Queued => {}
        }

        Self::await_reply(reply_rx).await
    }

    async fn await_reply(rx: oneshot::Receiver<Result<ApiResponse>>) -> Result<ApiResponse> {
        rx.await
            .unwrap_or_else(|_| Err(Error::auth_fatal("refresh episode ended without a reply")))
    }

    #[instrument(skip(self), name = "refresh_episode")]
    async fn run_episode(self, epoch: u64) {
        let outcome = match self.inner.store.refresh_token() {
            Some(refresh_token) => {
                self.inner.refresh_calls.fetch_add(1, Ordering::Relaxed);
                info!("Access token rejected; refreshing");
                self.inner
                    .refresher
                    .refresh(&refresh_token)
                    .await
                    .map_err(|e| (SignOutReason::RefreshFailed, e.to_string()))
            }
            None => Err((
                SignOutReason::MissingRefreshToken,
                "no refresh token available".to_string(),
            )),
        };

        match outcome {
            Ok(tokens) => {
                let access_token = tokens.access_token.clone();
                let (waiters, current) = {
                    let mut state = self.inner.state.lock();
                    state.phase = RefreshState::Idle;
                    let current = state.epoch == epoch;
                    if current {
                        self.inner.store.apply_refresh(tokens);
                    }
                    (std::mem::take(&mut state.waiters), current)
                };
                if !current {
                    self.reject_superseded(waiters);
                    return;
                }

                let count = waiters.len();
                info!(waiters = count, "Refresh succeeded; replaying queued requests");
                self.publish(SessionEvent::Refreshed {
                    waiters: count,
                    timestamp: Utc::now(),
                });

                let outcomes = join_all(
                    waiters
                        .into_iter()
                        .map(|waiter| self.settle(waiter, access_token.clone())),
                )
                .await;

                if let Some(ReplayOutcome::Rejected { token }) = outcomes
                    .into_iter()
                    .find(|o| matches!(o, ReplayOutcome::Rejected { .. }))
                {
                    self.end_session_after_rejection(&token);
                }
            }
            Err((reason, message)) => {
                let (waiters, current) = {
                    let mut state = self.inner.state.lock();
                    state.phase = RefreshState::Idle;
                    let current = state.epoch == epoch;
                    if current {
                        self.inner.store.clear();
                    }
                    (std::mem::take(&mut state.waiters), current)
                };
                if !current {
                    self.reject_superseded(waiters);
                    return;
                }

                warn!(
                    waiters = waiters.len(),
                    reason = ?reason,
                    error = %message,
                    "Refresh failed; signing out"
                );

                for waiter in waiters {
                    let _ = waiter.reply.send(Err(Error::auth_fatal(format!(
                        "session expired: {}",
                        message
                    ))));
                }

                self.publish(SessionEvent::SignedOut {
                    reason,
                    timestamp: Utc::now(),
                });
            }
        }
    }

    /// Reject the waiters of an episode that outlived its session.
    fn reject_superseded(&self, waiters: Vec<Waiter>) {
        info!(
            waiters = waiters.len(),
            "Session changed during refresh; dropping refresh outcome"
        );
        for waiter in waiters {
            let _ = waiter
                .reply
                .send(Err(Error::auth_fatal("session changed during refresh")));
        }
    }

    /// Replay a waiter's request once with `access_token` and deliver the outcome.
    async fn settle(&self, mut waiter: Waiter, access_token: String) -> ReplayOutcome {
        if !std::mem::replace(&mut waiter.retry_available, false) {
            let _ = waiter
                .reply
                .send(Err(Error::auth_fatal("retry already consumed")));
            return ReplayOutcome::Settled;
        }

        let result = self
            .inner
            .transport
            .send(&waiter.request, Some(&access_token))
            .await;

        match result {
            Ok(response) if response.is_unauthorized() => {
                warn!(
                    request = %waiter.request.label(),
                    "Request rejected again after refresh"
                );
                let _ = waiter.reply.send(Err(Error::auth_fatal(format!(
                    "{} rejected with a fresh access token",
                    waiter.request.label()
                ))));
                ReplayOutcome::Rejected {
                    token: access_token,
                }
            }
            other => {
                let _ = waiter.reply.send(other);
                ReplayOutcome::Settled
            }
        }
    }

    /// End the session after a fresh token was rejected, unless it has
    /// already been replaced.
    fn end_session_after_rejection(&self, rejected_token: &str) {
        {
            let _state = self.inner.state.lock();
            if self.inner.store.access_token().as_deref() != Some(rejected_token) {
                return;
            }
            self.inner.store.clear();
        }
        self.publish(SessionEvent::SignedOut {
            reason: SignOutReason::ReplayRejected,
            timestamp: Utc::now(),
        });
    }

    fn publish(&self, event: SessionEvent) {
        debug!("Publishing session event: {}", event.description());
        // send() returns Err if there are no receivers, which is fine
        let _ = self.inner.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::StatusCode;
    use tokio::sync::Notify;

    use super::*;
    use crate::credentials::types::RefreshedTokens;

    /// Accepts exactly one token; records every token it sees.
    struct FakeTransport {
        valid_tokens: Mutex<HashSet<String>>,
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    impl FakeTransport {
        fn accepting(tokens: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                valid_tokens: Mutex::new(tokens.iter().map(|t| t.to_string()).collect()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn tokens_for(&self, path: &str) -> Vec<Option<String>> {
            self.seen
                .lock()
                .iter()
                .filter(|(p, _)| p == path)
                .map(|(_, t)| t.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(
            &self,
            request: &RequestDescriptor,
            access_token: Option<&str>,
        ) -> Result<ApiResponse> {
            self.seen
                .lock()
                .push((request.path.clone(), access_token.map(String::from)));
            let ok = access_token.is_some_and(|t| self.valid_tokens.lock().contains(t));
            if ok {
                Ok(ApiResponse::new(StatusCode::OK, request.path.clone()))
            } else {
                Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, ""))
            }
        }
    }

    /// Refresher that blocks until released, then returns a fixed outcome.
    struct GatedRefresher {
        calls: AtomicU64,
        gate: Notify,
        outcome: std::result::Result<&'static str, u16>,
    }

    impl GatedRefresher {
        fn succeeding(token: &'static str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU64::new(0),
                gate: Notify::new(),
                outcome: Ok(token),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU64::new(0),
                gate: Notify::new(),
                outcome: Err(status),
            })
        }

        fn release(&self) {
            self.gate.notify_one();
        }
    }

    #[async_trait]
    impl TokenRefresher for GatedRefresher {
        async fn refresh(&self, _refresh_token: &str) -> Result<RefreshedTokens> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            match self.outcome {
                Ok(token) => Ok(RefreshedTokens {
                    access_token: token.to_string(),
                    refresh_token: None,
                }),
                Err(status) => Err(Error::RefreshRejected { status }),
            }
        }
    }

    fn coordinator(
        transport: Arc<FakeTransport>,
        refresher: Arc<GatedRefresher>,
        pair: Option<CredentialPair>,
    ) -> RefreshCoordinator {
        let store = Arc::new(match pair {
            Some(pair) => CredentialStore::with_credentials(pair),
            None => CredentialStore::new(),
        });
        RefreshCoordinator::new(store, refresher, transport)
    }

    /// Let spawned tasks run until they block.
    async fn settle_tasks() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_concurrent_failures_share_one_refresh() {
        let transport = FakeTransport::accepting(&["T2"]);
        let refresher = GatedRefresher::succeeding("T2");
        let coordinator = coordinator(
            transport.clone(),
            refresher.clone(),
            Some(CredentialPair::new("T1", Some("R1".into()))),
        );

        let mut handles = Vec::new();
        for path in ["tasks/1", "tasks/2", "tasks/3"] {
            let c = coordinator.clone();
            handles.push(tokio::spawn(async move {
                c.on_auth_failure(RequestDescriptor::get(path), Some("T1"))
                    .await
            }));
        }

        settle_tasks().await;
        assert_eq!(coordinator.state(), RefreshState::Refreshing);
        assert_eq!(coordinator.pending_waiters(), 3);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);

        refresher.release();

        for handle in handles {
            let response = handle.await.unwrap().unwrap();
            assert!(response.is_success());
        }

        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.refresh_count(), 1);
        assert_eq!(coordinator.state(), RefreshState::Idle);
        for path in ["tasks/1", "tasks/2", "tasks/3"] {
            assert_eq!(transport.tokens_for(path), vec![Some("T2".to_string())]);
        }
        assert_eq!(coordinator.store().access_token().as_deref(), Some("T2"));
        assert_eq!(coordinator.store().refresh_token().as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_many_waiters_all_settle() {
        let transport = FakeTransport::accepting(&["T2"]);
        let refresher = GatedRefresher::succeeding("T2");
        let coordinator = coordinator(
            transport,
            refresher.clone(),
            Some(CredentialPair::new("T1", Some("R1".into()))),
        );

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let c = coordinator.clone();
                tokio::spawn(async move {
                    c.on_auth_failure(RequestDescriptor::get(format!("reports/{i}")), Some("T1"))
                        .await
                })
            })
            .collect();

        settle_tasks().await;
        refresher.release();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_rejects_all_and_signs_out() {
        let transport = FakeTransport::accepting(&[]);
        let refresher = GatedRefresher::failing(401);
        let coordinator = coordinator(
            transport.clone(),
            refresher.clone(),
            Some(CredentialPair::new("T1", Some("R1".into()))),
        );
        let mut events = coordinator.subscribe();

        let handles: Vec<_> = ["projects/", "tasks/"]
            .into_iter()
            .map(|path| {
                let c = coordinator.clone();
                tokio::spawn(async move {
                    c.on_auth_failure(RequestDescriptor::get(path), Some("T1"))
                        .await
                })
            })
            .collect();

        settle_tasks().await;
        refresher.release();

        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert!(err.is_auth_fatal());
        }

        assert!(!coordinator.store().is_signed_in());
        assert_eq!(coordinator.state(), RefreshState::Idle);
        // No replays after a failed refresh.
        assert!(transport.seen.lock().is_empty());

        let event = events.recv().await.unwrap();
        assert!(matches!(
            event,
            SessionEvent::SignedOut {
                reason: SignOutReason::RefreshFailed,
                ..
            }
        ));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_refresh_token_fails_without_network_call() {
        let transport = FakeTransport::accepting(&[]);
        let refresher = GatedRefresher::succeeding("T2");
        let coordinator = coordinator(
            transport,
            refresher.clone(),
            Some(CredentialPair::new("T1", None)),
        );
        let mut events = coordinator.subscribe();

        let err = coordinator
            .on_auth_failure(RequestDescriptor::get("tasks/"), Some("T1"))
            .await
            .unwrap_err();

        assert!(err.is_auth_fatal());
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::SignedOut {
                reason: SignOutReason::MissingRefreshToken,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_second_rejection_is_fatal_and_not_requeued() {
        // The refreshed token is still rejected by the server.
        let transport = FakeTransport::accepting(&[]);
        let refresher = GatedRefresher::succeeding("T2");
        let coordinator = coordinator(
            transport.clone(),
            refresher.clone(),
            Some(CredentialPair::new("T1", Some("R1".into()))),
        );
        let mut events = coordinator.subscribe();

        let c = coordinator.clone();
        let handle = tokio::spawn(async move {
            c.on_auth_failure(RequestDescriptor::get("tasks/4"), Some("T1"))
                .await
        });

        settle_tasks().await;
        refresher.release();

        let err = handle.await.unwrap().unwrap_err();
        assert!(err.is_auth_fatal());

        // Exactly one replay, one refresh, and nothing queued afterwards.
        assert_eq!(transport.tokens_for("tasks/4"), vec![Some("T2".to_string())]);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.pending_waiters(), 0);
        assert_eq!(coordinator.state(), RefreshState::Idle);

        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::Refreshed { waiters: 1, .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::SignedOut {
                reason: SignOutReason::ReplayRejected,
                ..
            }
        ));
        assert!(!coordinator.store().is_signed_in());
    }

    #[tokio::test]
    async fn test_stale_token_replays_without_refresh() {
        let transport = FakeTransport::accepting(&["T2"]);
        let refresher = GatedRefresher::succeeding("T3");
        let coordinator = coordinator(
            transport.clone(),
            refresher.clone(),
            Some(CredentialPair::new("T2", Some("R1".into()))),
        );

        // Sent with T1 before the store moved on to T2.
        let response = coordinator
            .on_auth_failure(RequestDescriptor::get("tasks/5"), Some("T1"))
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(transport.tokens_for("tasks/5"), vec![Some("T2".to_string())]);
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_strand_episode() {
        let transport = FakeTransport::accepting(&["T2"]);
        let refresher = GatedRefresher::succeeding("T2");
        let coordinator = coordinator(
            transport,
            refresher.clone(),
            Some(CredentialPair::new("T1", Some("R1".into()))),
        );

        // The originator gives up before the refresh settles.
        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            coordinator.on_auth_failure(RequestDescriptor::get("tasks/6"), Some("T1")),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(coordinator.state(), RefreshState::Refreshing);

        refresher.release();
        settle_tasks().await;

        assert_eq!(coordinator.state(), RefreshState::Idle);
        assert_eq!(coordinator.store().access_token().as_deref(), Some("T2"));
    }

    #[tokio::test]
    async fn test_sign_out_during_refresh_stays_signed_out() {
        let transport = FakeTransport::accepting(&["T2"]);
        let refresher = GatedRefresher::succeeding("T2");
        let coordinator = coordinator(
            transport.clone(),
            refresher.clone(),
            Some(CredentialPair::new("T1", Some("R1".into()))),
        );

        let c = coordinator.clone();
        let handle = tokio::spawn(async move {
            c.on_auth_failure(RequestDescriptor::get("tasks/8"), Some("T1"))
                .await
        });

        settle_tasks().await;
        assert_eq!(coordinator.state(), RefreshState::Refreshing);
        let mut events = coordinator.subscribe();

        coordinator.sign_out();
        refresher.release();

        let err = handle.await.unwrap().unwrap_err();
        assert!(err.is_auth_fatal());

        assert!(!coordinator.store().is_signed_in());
        assert_eq!(coordinator.store().access_token(), None);
        assert_eq!(coordinator.state(), RefreshState::Idle);
        // The refreshed token was never used.
        assert!(transport.tokens_for("tasks/8").is_empty());

        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::SignedOut {
                reason: SignOutReason::UserRequested,
                ..
            }
        ));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_sign_in_during_failed_refresh_keeps_new_session() {
        let transport = FakeTransport::accepting(&[]);
        let refresher = GatedRefresher::failing(401);
        let coordinator = coordinator(
            transport,
            refresher.clone(),
            Some(CredentialPair::new("T1", Some("R1".into()))),
        );

        let c = coordinator.clone();
        let handle = tokio::spawn(async move {
            c.on_auth_failure(RequestDescriptor::get("tasks/9"), Some("T1"))
                .await
        });

        settle_tasks().await;
        assert_eq!(coordinator.state(), RefreshState::Refreshing);
        let mut events = coordinator.subscribe();

        coordinator.sign_in(CredentialPair::new("NEW", Some("R2".into())));
        refresher.release();

        let err = handle.await.unwrap().unwrap_err();
        assert!(err.is_auth_fatal());

        assert_eq!(coordinator.store().access_token().as_deref(), Some("NEW"));
        assert_eq!(coordinator.store().refresh_token().as_deref(), Some("R2"));
        assert_eq!(coordinator.state(), RefreshState::Idle);

        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::SignedIn { .. }
        ));
        // No sign-out for the failed refresh of the old session.
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_sign_in_and_sign_out_publish_events() {
        let coordinator = coordinator(
            FakeTransport::accepting(&[]),
            GatedRefresher::succeeding("T2"),
            None,
        );
        let mut events = coordinator.subscribe();

        coordinator.sign_in(CredentialPair::new("T1", Some("R1".into())));
        assert!(coordinator.store().is_signed_in());
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::SignedIn { .. }
        ));

        coordinator.sign_out();
        assert!(!coordinator.store().is_signed_in());
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::SignedOut {
                reason: SignOutReason::UserRequested,
                ..
            }
        ));
    }
}
