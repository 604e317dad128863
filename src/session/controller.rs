//! Session lifecycle: sign-in, profile snapshot and visibility changes.
//!
//! Every operation takes a ticket from a monotonic sequence before it goes on
//! the wire. When the response comes back only the holder of the latest
//! ticket may touch the state; older responses are dropped, so a slow reply
//! can never overwrite the result of a newer request.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::graphql::{Credential, GraphQLRequest};
use crate::session::error::{ErrorKind, SessionError};
use crate::session::profile::{visibility_from_mutation_response, UserProfile, Visibility};
use crate::session::queries;
use crate::session::store::{CredentialStore, CREDENTIAL_KEY};
use crate::session::transport::{interpret_response, GatewayTransport};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Upper bound for every gateway call
    pub request_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Authenticating {
        credential: Credential,
    },
    Authenticated {
        credential: Credential,
        profile: UserProfile,
    },
    /// Visibility change in flight; the profile is still the confirmed one
    Mutating {
        credential: Credential,
        profile: UserProfile,
        requested: Visibility,
    },
    /// Last sign-in failed. `credential` is kept for retry; `profile` is the
    /// previously shown one when the failure was transient.
    Error {
        credential: Credential,
        profile: Option<UserProfile>,
        error: SessionError,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Authenticating { .. } => "authenticating",
            SessionState::Authenticated { .. } => "authenticated",
            SessionState::Mutating { .. } => "mutating",
            SessionState::Error { .. } => "error",
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(
            self,
            SessionState::Authenticated { .. } | SessionState::Mutating { .. }
        )
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            SessionState::Authenticated { profile, .. } | SessionState::Mutating { profile, .. } => {
                Some(profile)
            }
            SessionState::Error { profile, .. } => profile.as_ref(),
            SessionState::Idle | SessionState::Authenticating { .. } => None,
        }
    }
}

struct Inner {
    state: SessionState,
    /// Ticket of the most recently issued operation
    latest: u64,
    /// Profile to fall back on if the sign-in in flight fails transiently
    retained_profile: Option<UserProfile>,
    last_error: Option<SessionError>,
}

pub struct SessionController {
    transport: Arc<dyn GatewayTransport>,
    store: Arc<dyn CredentialStore>,
    options: SessionOptions,
    remembered: Option<String>,
    inner: Mutex<Inner>,
}

impl SessionController {
    /// Create an idle session. The remembered credential is read from `store`
    /// once, here.
    pub fn new(
        transport: Arc<dyn GatewayTransport>,
        store: Arc<dyn CredentialStore>,
        options: SessionOptions,
    ) -> Self {
        let remembered = store.load(CREDENTIAL_KEY);
        if remembered.is_some() {
            debug!("Found remembered API key");
        }

        Self {
            transport,
            store,
            options,
            remembered,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                latest: 0,
                retained_profile: None,
                last_error: None,
            }),
        }
    }

    /// Credential remembered from the last successful sign-in, for pre-filling
    pub fn remembered_credential(&self) -> Option<&str> {
        self.remembered.as_deref()
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state.clone()
    }

    pub async fn profile(&self) -> Option<UserProfile> {
        self.inner.lock().await.state.profile().cloned()
    }

    /// Most recent failure, including failed visibility changes that left the
    /// session signed in
    pub async fn last_error(&self) -> Option<SessionError> {
        self.inner.lock().await.last_error.clone()
    }

    /// Sign in with `key`, superseding any sign-in or mutation in flight.
    pub async fn submit_credential(&self, key: impl Into<String>) -> Result<UserProfile, SessionError> {
        let credential = Credential::new(key);

        let ticket = {
            let mut inner = self.inner.lock().await;
            inner.latest += 1;

            if let Some(profile) = inner.state.profile().cloned() {
                inner.retained_profile = Some(profile);
            }

            if credential.is_blank() {
                let error = SessionError::CredentialMissing;
                inner.retained_profile = None;
                inner.state = SessionState::Error {
                    credential,
                    profile: None,
                    error: error.clone(),
                };
                inner.last_error = Some(error.clone());
                return Err(error);
            }

            inner.state = SessionState::Authenticating {
                credential: credential.clone(),
            };
            inner.latest
        };

        info!("Signing in (request #{})", ticket);
        let outcome = self
            .call(&queries::login_request(), &credential)
            .await
            .and_then(|body| UserProfile::from_login_response(&body).map_err(SessionError::from));

        let mut inner = self.inner.lock().await;
        if inner.latest != ticket {
            debug!("Discarding stale sign-in response #{}", ticket);
            return Err(SessionError::Superseded);
        }

        let retained = inner.retained_profile.take();
        match outcome {
            Ok(profile) => {
                inner.state = SessionState::Authenticated {
                    credential: credential.clone(),
                    profile: profile.clone(),
                };
                inner.last_error = None;
                // Lock stays held so a newer sign-in cannot save before this one
                self.remember(&credential).await;
                info!("Signed in as {}", profile.name);
                Ok(profile)
            }
            Err(error) => {
                warn!("Sign-in failed: {}", error);
                let profile = match error.kind() {
                    Some(ErrorKind::TransportFailure) => retained,
                    _ => None,
                };
                inner.state = SessionState::Error {
                    credential,
                    profile,
                    error: error.clone(),
                };
                inner.last_error = Some(error.clone());
                Err(error)
            }
        }
    }

    async fn remember(&self, credential: &Credential) {
        let store = self.store.clone();
        let key = credential.as_str().to_string();
        let saved = tokio::task::spawn_blocking(move || store.save(CREDENTIAL_KEY, &key))
            .await
            .map_err(|e| format!("store task failed: {}", e))
            .and_then(|result| result);
        if let Err(e) = saved {
            warn!("Failed to remember API key: {}", e);
        }
    }

    /// Ask upstream to change profile visibility.
    ///
    /// The held profile takes the value upstream confirms, which may differ
    /// from `requested`. On failure the session stays signed in and the
    /// visibility is untouched.
    pub async fn change_visibility(&self, requested: Visibility) -> Result<Visibility, SessionError> {
        let (ticket, credential) = {
            let mut inner = self.inner.lock().await;
            let (credential, profile) = match &inner.state {
                SessionState::Authenticated { credential, profile }
                | SessionState::Mutating { credential, profile, .. } => {
                    (credential.clone(), profile.clone())
                }
                _ => return Err(SessionError::InvalidState("not signed in")),
            };

            inner.latest += 1;
            inner.state = SessionState::Mutating {
                credential: credential.clone(),
                profile,
                requested,
            };
            (inner.latest, credential)
        };

        info!("Changing visibility to {} (request #{})", requested, ticket);
        let outcome = self
            .call(&queries::update_visibility_request(requested), &credential)
            .await
            .and_then(|body| visibility_from_mutation_response(&body).map_err(SessionError::from));

        let mut inner = self.inner.lock().await;
        if inner.latest != ticket {
            debug!("Discarding stale visibility response #{}", ticket);
            return Err(SessionError::Superseded);
        }

        let (credential, mut profile) = match &inner.state {
            SessionState::Mutating { credential, profile, .. } => (credential.clone(), profile.clone()),
            _ => return Err(SessionError::Superseded),
        };

        let result = match outcome {
            Ok(confirmed) => {
                if confirmed != requested {
                    info!("Upstream confirmed visibility {} instead of {}", confirmed, requested);
                }
                profile.visibility = confirmed;
                inner.last_error = None;
                Ok(confirmed)
            }
            Err(error) => {
                warn!("Visibility change failed: {}", error);
                inner.last_error = Some(error.clone());
                Err(error)
            }
        };

        inner.state = SessionState::Authenticated { credential, profile };
        result
    }

    /// Return to idle and drop anything in flight. The remembered credential
    /// is kept for the next sign-in.
    pub async fn sign_out(&self) {
        let mut inner = self.inner.lock().await;
        inner.latest += 1;
        inner.state = SessionState::Idle;
        inner.retained_profile = None;
        inner.last_error = None;
        info!("Signed out");
    }

    async fn call(&self, request: &GraphQLRequest, credential: &Credential) -> Result<Value, SessionError> {
        let timeout = self.options.request_timeout;
        let response = tokio::time::timeout(timeout, self.transport.execute(request, credential))
            .await
            .map_err(|_| SessionError::Timeout(timeout))?
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        interpret_response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::GraphQLResponse;
    use crate::session::store::MemoryStore;
    use crate::session::transport::TransportError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::{mpsc, oneshot};

    type Reply = Result<GraphQLResponse, TransportError>;

    /// Answers calls from a queue and records what was sent
    #[derive(Default)]
    struct StubTransport {
        replies: StdMutex<VecDeque<Reply>>,
        calls: StdMutex<Vec<(Credential, GraphQLRequest)>>,
    }

    impl StubTransport {
        fn with_replies(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: StdMutex::new(replies.into()),
                calls: StdMutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(Credential, GraphQLRequest)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GatewayTransport for StubTransport {
        async fn execute(&self, request: &GraphQLRequest, credential: &Credential) -> Reply {
            self.calls
                .lock()
                .unwrap()
                .push((credential.clone(), request.clone()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Http("no reply scripted".into())))
        }
    }

    struct PendingCall {
        credential: Credential,
        reply: oneshot::Sender<Reply>,
    }

    /// Hands every call to the test, which decides when and how it completes
    struct ScriptedTransport {
        calls: mpsc::UnboundedSender<PendingCall>,
    }

    impl ScriptedTransport {
        fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PendingCall>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (Arc::new(Self { calls: tx }), rx)
        }
    }

    #[async_trait]
    impl GatewayTransport for ScriptedTransport {
        async fn execute(&self, _request: &GraphQLRequest, credential: &Credential) -> Reply {
            let (tx, rx) = oneshot::channel();
            self.calls
                .send(PendingCall {
                    credential: credential.clone(),
                    reply: tx,
                })
                .map_err(|_| TransportError::Http("test harness gone".into()))?;
            rx.await
                .map_err(|_| TransportError::Http("reply dropped".into()))?
        }
    }

    /// Never answers
    struct HangingTransport;

    #[async_trait]
    impl GatewayTransport for HangingTransport {
        async fn execute(&self, _request: &GraphQLRequest, _credential: &Credential) -> Reply {
            std::future::pending().await
        }
    }

    fn login_ok(name: &str, visibility: &str) -> Reply {
        Ok(GraphQLResponse::new(
            200,
            json!({"data": {"currentUser": {
                "name": name,
                "userSkills": [{"experience": 3, "skill": {"name": "Rust"}}],
                "jobApplications": {"nodes": [{"job": {"title": "Engineer"}}]},
                "profile": {"visibility": visibility}
            }}}),
        ))
    }

    fn mutation_ok(visibility: &str) -> Reply {
        Ok(GraphQLResponse::new(
            200,
            json!({"data": {"updateProfile": {"profile": {"visibility": visibility}}}}),
        ))
    }

    fn transport_down() -> Reply {
        Err(TransportError::Http("connection refused".into()))
    }

    fn controller(
        transport: Arc<dyn GatewayTransport>,
        store: Arc<MemoryStore>,
    ) -> SessionController {
        SessionController::new(transport, store, SessionOptions::default())
    }

    #[tokio::test]
    async fn test_sign_in_projects_profile_and_remembers_key() {
        let transport = StubTransport::with_replies(vec![Ok(GraphQLResponse::new(
            200,
            json!({"data": {"currentUser": {
                "name": "Ana",
                "userSkills": [],
                "jobApplications": {"nodes": []},
                "profile": {"visibility": "private"}
            }}}),
        ))]);
        let store = Arc::new(MemoryStore::default());
        let session = controller(transport.clone(), store.clone());

        let profile = session.submit_credential("abc123").await.unwrap();

        assert_eq!(profile.name, "Ana");
        assert_eq!(profile.visibility, Visibility::Private);
        match session.state().await {
            SessionState::Authenticated { credential, profile } => {
                assert_eq!(credential, Credential::from("abc123"));
                assert_eq!(profile.name, "Ana");
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(store.load(CREDENTIAL_KEY).as_deref(), Some("abc123"));

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Credential::from("abc123"));
        assert_eq!(calls[0].1.query, queries::LOGIN_QUERY);
    }

    #[tokio::test]
    async fn test_errors_array_with_200_is_not_a_sign_in() {
        let transport = StubTransport::with_replies(vec![Ok(GraphQLResponse::new(
            200,
            json!({"data": null, "errors": [{"message": "Invalid API key"}]}),
        ))]);
        let store = Arc::new(MemoryStore::default());
        let session = controller(transport, store.clone());

        let err = session.submit_credential("wrong").await.unwrap_err();

        assert_eq!(err.kind(), Some(ErrorKind::UpstreamRejected));
        assert_eq!(err.to_string(), "Invalid API key");
        match session.state().await {
            SessionState::Error { credential, profile, .. } => {
                assert_eq!(credential, Credential::from("wrong"));
                assert_eq!(profile, None);
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(store.load(CREDENTIAL_KEY), None);
    }

    #[tokio::test]
    async fn test_empty_errors_array_is_not_a_sign_in() {
        let transport = StubTransport::with_replies(vec![Ok(GraphQLResponse::new(
            200,
            json!({"errors": [], "data": {"currentUser": {
                "name": "Ana",
                "userSkills": [],
                "jobApplications": {"nodes": []},
                "profile": {"visibility": "private"}
            }}}),
        ))]);
        let store = Arc::new(MemoryStore::default());
        let session = controller(transport, store.clone());

        let err = session.submit_credential("abc123").await.unwrap_err();

        assert_eq!(err.kind(), Some(ErrorKind::UpstreamRejected));
        assert_eq!(err.to_string(), "Request rejected (HTTP 200)");
        assert_eq!(session.state().await.name(), "error");
        assert_eq!(session.profile().await, None);
        assert_eq!(store.load(CREDENTIAL_KEY), None);
    }

    #[tokio::test]
    async fn test_null_current_user_is_rejected() {
        let transport = StubTransport::with_replies(vec![Ok(GraphQLResponse::new(
            200,
            json!({"data": {"currentUser": null}}),
        ))]);
        let store = Arc::new(MemoryStore::default());
        let session = controller(transport, store.clone());

        let err = session.submit_credential("abc123").await.unwrap_err();

        assert_eq!(err.kind(), Some(ErrorKind::UpstreamRejected));
        assert_eq!(session.state().await.name(), "error");
        assert_eq!(store.load(CREDENTIAL_KEY), None);
    }

    #[tokio::test]
    async fn test_blank_key_fails_without_network() {
        let transport = StubTransport::with_replies(vec![]);
        let session = controller(transport.clone(), Arc::new(MemoryStore::default()));

        let err = session.submit_credential("   ").await.unwrap_err();

        assert_eq!(err, SessionError::CredentialMissing);
        assert_eq!(err.to_string(), "API key required");
        assert_eq!(session.state().await.name(), "error");
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_moves_to_error() {
        let transport = StubTransport::with_replies(vec![transport_down()]);
        let session = controller(transport, Arc::new(MemoryStore::default()));

        let err = session.submit_credential("abc123").await.unwrap_err();

        assert_eq!(err.kind(), Some(ErrorKind::TransportFailure));
        assert_eq!(session.last_error().await, Some(err));
        assert_eq!(session.profile().await, None);
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_previous_profile() {
        let transport = StubTransport::with_replies(vec![login_ok("Ana", "public"), transport_down()]);
        let session = controller(transport, Arc::new(MemoryStore::default()));
        let first = session.submit_credential("abc123").await.unwrap();

        let err = session.submit_credential("abc123").await.unwrap_err();

        assert_eq!(err.kind(), Some(ErrorKind::TransportFailure));
        match session.state().await {
            SessionState::Error { profile, .. } => assert_eq!(profile, Some(first)),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejection_clears_previous_profile() {
        let rejected = Ok(GraphQLResponse::new(
            200,
            json!({"errors": [{"message": "Invalid API key"}]}),
        ));
        let transport = StubTransport::with_replies(vec![login_ok("Ana", "public"), rejected]);
        let session = controller(transport, Arc::new(MemoryStore::default()));
        session.submit_credential("abc123").await.unwrap();

        session.submit_credential("revoked").await.unwrap_err();

        assert_eq!(session.profile().await, None);
    }

    #[tokio::test]
    async fn test_newer_sign_in_wins_over_late_older_response() {
        let (transport, mut calls) = ScriptedTransport::new();
        let store = Arc::new(MemoryStore::default());
        let session = Arc::new(controller(transport, store.clone()));

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.submit_credential("old").await }
        });
        let old_call = calls.recv().await.unwrap();
        assert_eq!(old_call.credential, Credential::from("old"));

        let second = tokio::spawn({
            let session = session.clone();
            async move { session.submit_credential("new").await }
        });
        let new_call = calls.recv().await.unwrap();
        assert_eq!(new_call.credential, Credential::from("new"));

        new_call.reply.send(login_ok("New", "public")).unwrap();
        let newest = second.await.unwrap().unwrap();
        assert_eq!(newest.name, "New");

        old_call.reply.send(login_ok("Old", "private")).unwrap();
        assert_eq!(first.await.unwrap(), Err(SessionError::Superseded));

        match session.state().await {
            SessionState::Authenticated { credential, profile } => {
                assert_eq!(credential, Credential::from("new"));
                assert_eq!(profile.name, "New");
                assert_eq!(profile.visibility, Visibility::Public);
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(store.load(CREDENTIAL_KEY).as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_response_after_sign_out_is_discarded() {
        let (transport, mut calls) = ScriptedTransport::new();
        let session = Arc::new(controller(transport, Arc::new(MemoryStore::default())));

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.submit_credential("abc123").await }
        });
        let call = calls.recv().await.unwrap();
        session.sign_out().await;
        call.reply.send(login_ok("Ana", "public")).unwrap();

        assert_eq!(pending.await.unwrap(), Err(SessionError::Superseded));
        assert_eq!(session.state().await, SessionState::Idle);
    }

    #[tokio::test]
    async fn test_change_visibility_uses_held_key_and_confirmed_value() {
        let transport = StubTransport::with_replies(vec![
            login_ok("Ana", "private"),
            mutation_ok("public"),
        ]);
        let session = controller(transport.clone(), Arc::new(MemoryStore::default()));
        session.submit_credential("abc123").await.unwrap();

        let confirmed = session.change_visibility(Visibility::Public).await.unwrap();

        assert_eq!(confirmed, Visibility::Public);
        assert_eq!(session.profile().await.unwrap().visibility, Visibility::Public);
        assert!(session.state().await.is_authenticated());

        let calls = transport.calls();
        assert_eq!(calls[1].0, Credential::from("abc123"));
        assert_eq!(calls[1].1.query, queries::UPDATE_VISIBILITY_MUTATION);
        assert_eq!(calls[1].1.variables.get("visibility"), Some(&json!("public")));
    }

    #[tokio::test]
    async fn test_server_value_overrides_requested_visibility() {
        let transport = StubTransport::with_replies(vec![
            login_ok("Ana", "private"),
            mutation_ok("private"),
        ]);
        let session = controller(transport, Arc::new(MemoryStore::default()));
        session.submit_credential("abc123").await.unwrap();

        let confirmed = session.change_visibility(Visibility::ClientsOnly).await.unwrap();

        assert_eq!(confirmed, Visibility::Private);
        assert_eq!(session.profile().await.unwrap().visibility, Visibility::Private);
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_session_and_visibility() {
        let rejected = Ok(GraphQLResponse::new(
            200,
            json!({"errors": [{"message": "not permitted"}]}),
        ));
        let transport = StubTransport::with_replies(vec![
            login_ok("Ana", "private"),
            transport_down(),
            rejected,
        ]);
        let session = controller(transport, Arc::new(MemoryStore::default()));
        session.submit_credential("abc123").await.unwrap();

        let err = session.change_visibility(Visibility::Public).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::TransportFailure));
        assert_eq!(session.state().await.name(), "authenticated");
        assert_eq!(session.profile().await.unwrap().visibility, Visibility::Private);
        assert_eq!(session.last_error().await, Some(err));

        let err = session.change_visibility(Visibility::Public).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::UpstreamRejected));
        assert_eq!(session.state().await.name(), "authenticated");
        assert_eq!(session.profile().await.unwrap().visibility, Visibility::Private);
    }

    #[tokio::test]
    async fn test_change_visibility_requires_sign_in() {
        let transport = StubTransport::with_replies(vec![]);
        let session = controller(transport.clone(), Arc::new(MemoryStore::default()));

        let err = session.change_visibility(Visibility::Public).await.unwrap_err();

        assert_eq!(err, SessionError::InvalidState("not signed in"));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_later_mutation_supersedes_earlier() {
        let (transport, mut calls) = ScriptedTransport::new();
        let session = Arc::new(controller(transport, Arc::new(MemoryStore::default())));

        let login = tokio::spawn({
            let session = session.clone();
            async move { session.submit_credential("abc123").await }
        });
        calls.recv().await.unwrap().reply.send(login_ok("Ana", "private")).unwrap();
        login.await.unwrap().unwrap();

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.change_visibility(Visibility::Public).await }
        });
        let first_call = calls.recv().await.unwrap();
        let second = tokio::spawn({
            let session = session.clone();
            async move { session.change_visibility(Visibility::ClientsOnly).await }
        });
        let second_call = calls.recv().await.unwrap();

        second_call.reply.send(mutation_ok("clients_only")).unwrap();
        assert_eq!(second.await.unwrap(), Ok(Visibility::ClientsOnly));
        first_call.reply.send(mutation_ok("public")).unwrap();
        assert_eq!(first.await.unwrap(), Err(SessionError::Superseded));

        assert_eq!(session.profile().await.unwrap().visibility, Visibility::ClientsOnly);
    }

    #[tokio::test]
    async fn test_sign_in_times_out() {
        let options = SessionOptions {
            request_timeout: Duration::from_millis(20),
        };
        let session = SessionController::new(
            Arc::new(HangingTransport),
            Arc::new(MemoryStore::default()),
            options,
        );

        let err = session.submit_credential("abc123").await.unwrap_err();

        assert_eq!(err, SessionError::Timeout(Duration::from_millis(20)));
        assert_eq!(err.kind(), Some(ErrorKind::TransportFailure));
        assert_eq!(session.state().await.name(), "error");
    }

    #[tokio::test]
    async fn test_mutation_timeout_keeps_session() {
        let (transport, mut calls) = ScriptedTransport::new();
        let options = SessionOptions {
            request_timeout: Duration::from_millis(50),
        };
        let session = Arc::new(SessionController::new(
            transport,
            Arc::new(MemoryStore::default()),
            options,
        ));

        let login = tokio::spawn({
            let session = session.clone();
            async move { session.submit_credential("abc123").await }
        });
        calls.recv().await.unwrap().reply.send(login_ok("Ana", "private")).unwrap();
        login.await.unwrap().unwrap();

        let mutation = tokio::spawn({
            let session = session.clone();
            async move { session.change_visibility(Visibility::Public).await }
        });
        // Held without replying so the call stays in flight
        let stalled = calls.recv().await.unwrap();
        assert_eq!(stalled.credential, Credential::from("abc123"));

        let err = mutation.await.unwrap().unwrap_err();

        assert_eq!(err, SessionError::Timeout(Duration::from_millis(50)));
        assert_eq!(session.state().await.name(), "authenticated");
        assert_eq!(session.profile().await.unwrap().visibility, Visibility::Private);
        assert_eq!(session.last_error().await, Some(err));

        // A reply arriving after the timeout changes nothing
        let _ = stalled.reply.send(mutation_ok("public"));
        assert_eq!(session.profile().await.unwrap().visibility, Visibility::Private);
    }

    #[tokio::test]
    async fn test_repeated_sign_in_is_idempotent() {
        let transport = StubTransport::with_replies(vec![
            login_ok("Ana", "public"),
            login_ok("Ana", "public"),
        ]);
        let session = controller(transport, Arc::new(MemoryStore::default()));

        let first = session.submit_credential("abc123").await.unwrap();
        session.sign_out().await;
        let second = session.submit_credential("abc123").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.skills.len(), 1);
        assert_eq!(second.job_applications.len(), 1);
    }

    #[tokio::test]
    async fn test_remembered_credential_read_at_start() {
        let store = Arc::new(MemoryStore::with_entry(CREDENTIAL_KEY, "saved-key"));
        let session = controller(StubTransport::with_replies(vec![]), store);

        assert_eq!(session.remembered_credential(), Some("saved-key"));
        assert_eq!(session.state().await, SessionState::Idle);
    }
}
