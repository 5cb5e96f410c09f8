//! Transport envelope around every backend call.
//!
//! A call never fails from the caller's point of view: every failure is
//! absorbed here and reported as [`Reply::Empty`], whose
//! [`Reply::into_value`] is the empty default for the endpoint's shape.

use std::sync::Arc;

use adsplat_shared::constants::{CODE_OK, CODE_UNAUTHORIZED};
use adsplat_shared::{codec, Envelope};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::config::ClientConfig;
use crate::error::{Failure, InvokeError};
use crate::invoke::Invoker;
use crate::notify::Feedback;
use crate::session::SessionGate;

const BUSY_DESCRIPTION: &str = "Please wait...";
const ENVIRONMENT_NOT_READY: &str = "The application environment is not ready, please try again later";

/// How an endpoint's reply is shaped and post-processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Bare JSON array, no envelope required.
    List,
    /// Envelope returned as-is.
    Management,
    /// Envelope whose string `data` is an encrypted payload.
    Encrypted,
}

impl EndpointKind {
    pub fn of(name: &str) -> Self {
        match name {
            "list" | "server_list" => EndpointKind::List,
            "test_ssh" | "test_stored_ssh" => EndpointKind::Management,
            n if n.starts_with("server_") => EndpointKind::Management,
            _ => EndpointKind::Encrypted,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    List(Vec<Value>),
    /// A parsed envelope. Its code may still be an application error.
    Envelope(Envelope),
    Empty { kind: EndpointKind, failure: Failure },
}

impl Reply {
    fn empty(kind: EndpointKind, failure: Failure) -> Self {
        Reply::Empty { kind, failure }
    }

    pub fn failure(&self) -> Option<Failure> {
        match self {
            Reply::Empty { failure, .. } => Some(*failure),
            _ => None,
        }
    }

    /// Untyped view: the array, the envelope object, or `[]` / `{}`.
    pub fn into_value(self) -> Value {
        match self {
            Reply::List(items) => Value::Array(items),
            Reply::Envelope(env) => serde_json::to_value(env).unwrap_or_default(),
            Reply::Empty {
                kind: EndpointKind::List,
                ..
            } => Value::Array(Vec::new()),
            Reply::Empty { .. } => Value::Object(Map::new()),
        }
    }
}

pub struct Transport {
    invoker: Option<Arc<dyn Invoker>>,
    session: Arc<SessionGate>,
    feedback: Feedback,
    client_json_key: String,
}

impl Transport {
    pub fn new(
        config: &ClientConfig,
        invoker: Option<Arc<dyn Invoker>>,
        session: Arc<SessionGate>,
        feedback: Feedback,
    ) -> Self {
        Self {
            invoker,
            session,
            feedback,
            client_json_key: config.client_json_key.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.invoker.is_some()
    }

    /// Call `name`, showing the busy indicator while it runs.
    pub async fn call(&self, name: &str, args: Map<String, Value>) -> Reply {
        let _busy = self.feedback.busy(BUSY_DESCRIPTION);
        self.dispatch(name, args).await
    }

    /// Call `name` without the busy indicator.
    pub async fn call_quiet(&self, name: &str, args: Map<String, Value>) -> Reply {
        self.dispatch(name, args).await
    }

    async fn dispatch(&self, name: &str, mut args: Map<String, Value>) -> Reply {
        let kind = EndpointKind::of(name);

        let Some(invoker) = &self.invoker else {
            warn!(endpoint = name, "Remote call capability unavailable");
            self.feedback.warning(ENVIRONMENT_NOT_READY);
            return Reply::empty(kind, Failure::EnvironmentUnavailable);
        };

        let Some(token) = self.session.token() else {
            debug!(endpoint = name, "Not signed in, skipping call");
            return Reply::empty(kind, Failure::Unauthorized);
        };

        args.insert("authorization".into(), Value::String(token));
        args.insert(
            "client_json".into(),
            Value::String(self.client_json_key.clone()),
        );

        let raw = match invoker.invoke(name, args).await {
            Ok(raw) => raw,
            Err(InvokeError::UnknownEndpoint(_)) => {
                warn!(endpoint = name, "Backend does not know this endpoint");
                return Reply::empty(kind, Failure::UnknownEndpoint);
            }
            Err(e) => {
                error!(endpoint = name, error = %e, "Backend call failed");
                self.feedback.error(&format!("Request failed: {e}"));
                return Reply::empty(kind, Failure::Transport);
            }
        };

        let parsed: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                error!(endpoint = name, error = %e, "Malformed reply");
                self.feedback.error(&format!("Request failed: {e}"));
                return Reply::empty(kind, Failure::Decode);
            }
        };

        let code = parsed.get("code").and_then(Value::as_i64);
        if code == Some(CODE_UNAUTHORIZED) {
            warn!(endpoint = name, "Backend rejected the session, signing out");
            self.session.expire();
            return Reply::empty(kind, Failure::Unauthorized);
        }

        match kind {
            EndpointKind::List => self.list_reply(name, parsed, code),
            EndpointKind::Management | EndpointKind::Encrypted => {
                self.envelope_reply(name, kind, parsed)
            }
        }
    }

    fn list_reply(&self, name: &str, parsed: Value, code: Option<i64>) -> Reply {
        if let Some(code) = code.filter(|c| *c != CODE_OK) {
            let msg = parsed
                .get("msg")
                .and_then(Value::as_str)
                .filter(|m| !m.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Request failed ({code})"));
            error!(endpoint = name, code, msg = %msg, "Backend reported an error");
            self.feedback.error(&msg);
            return Reply::empty(EndpointKind::List, Failure::Application);
        }

        match parsed {
            Value::Array(items) => Reply::List(items),
            Value::Object(mut obj) => match obj.remove("data") {
                Some(Value::Array(items)) => Reply::List(items),
                _ => {
                    warn!(endpoint = name, "List reply carried no array");
                    Reply::empty(EndpointKind::List, Failure::Decode)
                }
            },
            _ => {
                warn!(endpoint = name, "List reply is not an array");
                Reply::empty(EndpointKind::List, Failure::Decode)
            }
        }
    }

    fn envelope_reply(&self, name: &str, kind: EndpointKind, parsed: Value) -> Reply {
        let mut envelope: Envelope = match serde_json::from_value(parsed) {
            Ok(env) => env,
            Err(e) => {
                warn!(endpoint = name, error = %e, "Reply is not an envelope");
                return Reply::empty(kind, Failure::Decode);
            }
        };

        if !envelope.is_success() {
            let msg = envelope.error_message();
            error!(endpoint = name, code = envelope.code, msg = %msg, "Backend reported an error");
            self.feedback.error(&msg);
        }

        if kind == EndpointKind::Encrypted {
            if let Some(Value::String(payload)) = &envelope.data {
                match codec::decrypt(payload) {
                    Ok(decoded) => envelope.data = Some(decoded),
                    Err(e) => {
                        warn!(endpoint = name, error = %e, "Could not decrypt data, keeping it as-is");
                    }
                }
            }
        }

        Reply::Envelope(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adsplat_store::{KvStore, MemoryStore};
    use serde_json::json;

    use crate::notify::NoticeLevel;
    use crate::router::PathNavigator;
    use crate::testing::{RecordingBusy, RecordingNotifier, ScriptedInvoker};

    struct Fixture {
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
        busy: Arc<RecordingBusy>,
        invoker: Arc<ScriptedInvoker>,
        session: Arc<SessionGate>,
        transport: Transport,
    }

    fn fixture_with(invoker: Option<Arc<ScriptedInvoker>>) -> Fixture {
        let config = ClientConfig::default();
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let busy = Arc::new(RecordingBusy::default());
        let feedback = Feedback::new(Some(notifier.clone()), Some(busy.clone()));
        let session = Arc::new(SessionGate::new(
            &config,
            store.clone(),
            feedback.clone(),
            Some(Arc::new(PathNavigator::new("/welcome"))),
        ));
        session.set_token("tok").unwrap();

        let script = invoker.clone().unwrap_or_default();
        let transport = Transport::new(
            &config,
            invoker.map(|i| i as Arc<dyn Invoker>),
            session.clone(),
            feedback,
        );
        Fixture {
            store,
            notifier,
            busy,
            invoker: script,
            session,
            transport,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Some(Arc::new(ScriptedInvoker::default())))
    }

    #[test]
    fn test_endpoint_kinds() {
        assert_eq!(EndpointKind::of("list"), EndpointKind::List);
        assert_eq!(EndpointKind::of("server_list"), EndpointKind::List);
        assert_eq!(EndpointKind::of("server_info"), EndpointKind::Management);
        assert_eq!(EndpointKind::of("test_stored_ssh"), EndpointKind::Management);
        assert_eq!(EndpointKind::of("project_form"), EndpointKind::Encrypted);
        assert_eq!(EndpointKind::of("exec"), EndpointKind::Encrypted);
    }

    #[tokio::test]
    async fn test_unavailable_capability_warns_once() {
        let f = fixture_with(None);

        let reply = f.transport.call("list", Map::new()).await;

        assert_eq!(reply.failure(), Some(Failure::EnvironmentUnavailable));
        assert_eq!(reply.into_value(), json!([]));
        assert_eq!(f.notifier.count(NoticeLevel::Warning), 1);
        assert_eq!(f.notifier.count(NoticeLevel::Error), 0);

        let reply = f.transport.call("project_info", Map::new()).await;
        assert_eq!(reply.into_value(), json!({}));
    }

    #[tokio::test]
    async fn test_unauthorized_short_circuits() {
        let f = fixture();
        f.store.clear_all().unwrap();

        let reply = f.transport.call("exec", Map::new()).await;

        assert_eq!(reply.failure(), Some(Failure::Unauthorized));
        assert_eq!(f.invoker.call_count(), 0);
        assert!(f.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_token_and_client_key_attached() {
        let f = fixture();
        f.invoker.reply("server_info", json!({"code": 200, "msg": "ok"}));

        let mut args = Map::new();
        args.insert("serverId".into(), json!("s1"));
        f.transport.call("server_info", args).await;

        let (name, sent) = f.invoker.calls().remove(0);
        assert_eq!(name, "server_info");
        assert_eq!(sent["authorization"], "tok");
        assert_eq!(sent["client_json"], "client_json");
        assert_eq!(sent["serverId"], "s1");
    }

    #[tokio::test]
    async fn test_bare_array_list() {
        let f = fixture();
        f.invoker.reply("list", json!([{"server_id": "s1"}]));

        let reply = f.transport.call("list", Map::new()).await;
        assert_eq!(reply, Reply::List(vec![json!({"server_id": "s1"})]));
    }

    #[tokio::test]
    async fn test_list_envelope_with_array_data() {
        let f = fixture();
        f.invoker
            .reply("list", json!({"code": 200, "msg": "ok", "data": [{"server_id": "s1"}]}));

        let reply = f.transport.call("list", Map::new()).await;
        assert_eq!(reply, Reply::List(vec![json!({"server_id": "s1"})]));
    }

    #[tokio::test]
    async fn test_list_error_code_is_empty_with_notice() {
        let f = fixture();
        f.invoker.reply("list", json!({"code": 500, "msg": "kv unavailable"}));

        let reply = f.transport.call("list", Map::new()).await;

        assert_eq!(reply.failure(), Some(Failure::Application));
        assert_eq!(reply.into_value(), json!([]));
        assert_eq!(
            f.notifier.notices(),
            vec![(NoticeLevel::Error, "kv unavailable".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_401_signs_out() {
        let f = fixture();
        f.store.set("serverData", "[]").unwrap();
        f.invoker.reply("project_info", json!({"code": 401, "msg": "expired"}));

        let reply = f.transport.call("project_info", Map::new()).await;

        assert_eq!(reply.failure(), Some(Failure::Unauthorized));
        assert_eq!(reply.into_value(), json!({}));
        assert!(f.store.is_empty());
        assert!(!f.session.is_authorized());
        assert_eq!(f.notifier.count(NoticeLevel::Error), 1);
    }

    #[tokio::test]
    async fn test_application_error_still_returns_envelope() {
        let f = fixture();
        f.invoker.reply("exec", json!({"code": 500, "msg": ""}));

        let reply = f.transport.call("exec", Map::new()).await;

        match reply {
            Reply::Envelope(env) => assert_eq!(env.code, 500),
            other => panic!("expected envelope, got {other:?}"),
        }
        assert_eq!(
            f.notifier.notices(),
            vec![(NoticeLevel::Error, "Request failed (500)".to_string())]
        );
    }

    #[tokio::test]
    async fn test_encrypted_data_is_decoded() {
        let f = fixture();
        let payload = codec::encrypt(&json!({"project_name": "Site"})).unwrap();
        f.invoker
            .reply("project_info", json!({"code": 200, "msg": "ok", "data": payload}));

        let reply = f.transport.call("project_info", Map::new()).await;

        match reply {
            Reply::Envelope(env) => {
                assert_eq!(env.data, Some(json!({"project_name": "Site"})))
            }
            other => panic!("expected envelope, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_undecryptable_data_kept_verbatim() {
        let f = fixture();
        f.invoker
            .reply("exec", json!({"code": 200, "msg": "ok", "data": "plain text output"}));

        let reply = f.transport.call("exec", Map::new()).await;

        match reply {
            Reply::Envelope(env) => assert_eq!(env.data, Some(json!("plain text output"))),
            other => panic!("expected envelope, got {other:?}"),
        }
        assert!(f.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_management_data_not_decrypted() {
        let f = fixture();
        let payload = codec::encrypt(&json!({"x": 1})).unwrap();
        f.invoker
            .reply("server_info", json!({"code": 200, "msg": "ok", "data": payload.clone()}));

        let reply = f.transport.call("server_info", Map::new()).await;
        match reply {
            Reply::Envelope(env) => assert_eq!(env.data, Some(Value::String(payload))),
            other => panic!("expected envelope, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_code_on_envelope_endpoint_is_decode_failure() {
        let f = fixture();
        f.invoker.reply("project_info", json!({"data": "x"}));

        let reply = f.transport.call("project_info", Map::new()).await;
        assert_eq!(reply.failure(), Some(Failure::Decode));
        assert!(f.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_and_transport_errors_absorbed() {
        let f = fixture();
        f.invoker.reply_raw("exec", "{not json");
        f.invoker.fail("list", 503);

        let reply = f.transport.call("exec", Map::new()).await;
        assert_eq!(reply.failure(), Some(Failure::Decode));

        let reply = f.transport.call("list", Map::new()).await;
        assert_eq!(reply.failure(), Some(Failure::Transport));
        assert_eq!(reply.into_value(), json!([]));

        assert_eq!(f.notifier.count(NoticeLevel::Error), 2);
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_silent() {
        let f = fixture();

        let reply = f.transport.call("nope", Map::new()).await;
        assert_eq!(reply.failure(), Some(Failure::UnknownEndpoint));
        assert!(f.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_busy_indicator_released_on_every_path() {
        let f = fixture();
        f.invoker.reply("list", json!([]));
        f.invoker.fail("exec", 500);

        f.transport.call("list", Map::new()).await;
        f.transport.call("exec", Map::new()).await;
        f.transport.call_quiet("list", Map::new()).await;

        assert_eq!(f.busy.created(), 2);
        assert_eq!(f.busy.destroyed(), 2);
    }
}
