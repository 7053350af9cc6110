use crate::cache::{fingerprint, ResponseCache};
use crate::core::error::AishError;
use crate::providers::{CompletionClient, CompletionRequest, Message, Speaker};
use crate::roles::{OutputKind, RoleRegistry};
use crate::session::SessionStore;
use crate::system::SystemInfo;
use futures::StreamExt;
use tracing::{debug, warn};

/// One pipeline call: prompt plus everything that shapes the request.
/// `session: None` is temporary mode, nothing touches the session store.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub role_id: String,
    pub prompt: String,
    pub session: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub caching: bool,
    pub stream: bool,
}

/// Final text tagged with the role's output contract.
#[derive(Debug)]
pub struct PipelineReply {
    pub text: String,
    pub output: OutputKind,
    pub cached: bool,
}

/// The orchestration core: resolve role, assemble messages from session
/// history, consult the cache, dispatch to the provider, persist, return.
pub struct RequestPipeline<'a> {
    registry: &'a RoleRegistry,
    sessions: &'a SessionStore,
    cache: &'a ResponseCache,
    client: &'a dyn CompletionClient,
}

impl<'a> RequestPipeline<'a> {
    pub fn new(
        registry: &'a RoleRegistry,
        sessions: &'a SessionStore,
        cache: &'a ResponseCache,
        client: &'a dyn CompletionClient,
    ) -> Self {
        Self {
            registry,
            sessions,
            cache,
            client,
        }
    }

    /// Run one exchange. Fragments are forwarded through `on_fragment` as
    /// they arrive; a cache hit forwards the full text as one fragment.
    ///
    /// Persistence is all-or-nothing: a provider failure or an aborted
    /// stream leaves both the cache and the session untouched.
    pub async fn run(
        &self,
        invocation: &Invocation,
        system: &SystemInfo,
        on_fragment: &mut dyn FnMut(&str),
    ) -> Result<PipelineReply, AishError> {
        let role = self.registry.resolve(&invocation.role_id)?;

        let transcript = match &invocation.session {
            Some(name) => self.sessions.load_or_empty(name)?,
            None => Vec::new(),
        };

        let mut messages = Vec::with_capacity(transcript.len() + 2);
        if !matches!(transcript.first(), Some(m) if m.role == Speaker::System) {
            messages.push(Message::system(self.registry.render(role, system)));
        }
        messages.extend(transcript.iter().cloned());
        let user_message = Message::user(invocation.prompt.trim());
        messages.push(user_message.clone());

        let key = fingerprint(
            &role.name,
            &messages,
            &invocation.model,
            invocation.temperature,
            invocation.top_p,
        );

        if invocation.caching {
            if let Some(text) = self.cache.get(&key) {
                debug!(role = %role.name, "serving cached response");
                on_fragment(&text);
                return Ok(PipelineReply {
                    text,
                    output: role.output,
                    cached: true,
                });
            }
        }

        let request = CompletionRequest {
            messages,
            model: invocation.model.clone(),
            temperature: invocation.temperature,
            top_p: invocation.top_p,
            stream: invocation.stream,
        };

        debug!(role = %role.name, model = %request.model, stream = request.stream, "dispatching completion");
        let text = if invocation.stream {
            let mut stream = self.client.complete_stream(&request).await?;
            let mut full = String::new();
            while let Some(fragment) = stream.next().await {
                let fragment = fragment?;
                on_fragment(&fragment);
                full.push_str(&fragment);
            }
            full
        } else {
            let text = self.client.complete(&request).await?;
            on_fragment(&text);
            text
        };

        if invocation.caching {
            // Cache faults degrade the cache, never the request
            if let Err(e) = self.cache.put(&key, &text) {
                warn!(error = %e, "failed to store response in cache");
            }
        }

        if let Some(name) = &invocation.session {
            self.sessions
                .append_exchange(name, user_message, Message::assistant(text.clone()))?;
        }

        Ok(PipelineReply {
            text,
            output: role.output,
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ProviderErrorKind;
    use crate::providers::FragmentStream;
    use crate::roles::{RoleRegistry, DEFAULT_ROLE, SHELL_ROLE};
    use crate::system::ShellKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockClient {
        calls: AtomicUsize,
        fragments: Vec<String>,
        fail_with: Option<ProviderErrorKind>,
    }

    impl MockClient {
        fn replying(text: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fragments: vec![text.to_string()],
                fail_with: None,
            }
        }

        fn streaming(fragments: &[&str]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fragments: fragments.iter().map(|s| s.to_string()).collect(),
                fail_with: None,
            }
        }

        fn failing(kind: ProviderErrorKind) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fragments: Vec::new(),
                fail_with: Some(kind),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl CompletionClient for MockClient {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, AishError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(kind) = self.fail_with {
                return Err(AishError::provider(kind, "mock failure"));
            }
            Ok(self.fragments.concat())
        }

        async fn complete_stream(
            &self,
            _request: &CompletionRequest,
        ) -> Result<FragmentStream, AishError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(kind) = self.fail_with {
                return Err(AishError::provider(kind, "mock failure"));
            }
            let fragments: Vec<Result<String, AishError>> =
                self.fragments.iter().cloned().map(Ok).collect();
            Ok(futures::stream::iter(fragments).boxed())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        registry: RoleRegistry,
        sessions: SessionStore,
        cache: ResponseCache,
        system: SystemInfo,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionStore::new(dir.path().join("sessions"));
        let cache = ResponseCache::new(dir.path().join("cache"), 10);
        Fixture {
            _dir: dir,
            registry: RoleRegistry::builtin(),
            sessions,
            cache,
            system: SystemInfo {
                os: "Linux".to_string(),
                shell_path: "/bin/sh".to_string(),
                shell_name: "sh".to_string(),
                shell_kind: ShellKind::UnixLike,
            },
        }
    }

    fn invocation(role_id: &str, prompt: &str) -> Invocation {
        Invocation {
            role_id: role_id.to_string(),
            prompt: prompt.to_string(),
            session: None,
            model: "test-model".to_string(),
            temperature: 0.0,
            top_p: 1.0,
            caching: true,
            stream: false,
        }
    }

    #[tokio::test]
    async fn second_identical_invocation_is_a_cache_hit() {
        let f = fixture();
        let client = MockClient::replying("4");
        let pipeline = RequestPipeline::new(&f.registry, &f.sessions, &f.cache, &client);
        let inv = invocation(DEFAULT_ROLE, "2+2");

        let first = pipeline.run(&inv, &f.system, &mut |_| {}).await.unwrap();
        assert_eq!(first.text, "4");
        assert!(!first.cached);

        let second = pipeline.run(&inv, &f.system, &mut |_| {}).await.unwrap();
        assert_eq!(second.text, "4");
        assert!(second.cached);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn cached_text_survives_a_fresh_cache_handle() {
        // Same on-disk cache dir, new ResponseCache value, as a restarted
        // process would see it
        let f = fixture();
        let client = MockClient::replying("4");
        let inv = invocation(DEFAULT_ROLE, "2+2");
        {
            let pipeline = RequestPipeline::new(&f.registry, &f.sessions, &f.cache, &client);
            pipeline.run(&inv, &f.system, &mut |_| {}).await.unwrap();
        }

        let reopened = ResponseCache::new(f._dir.path().join("cache"), 10);
        let fresh_client = MockClient::replying("should not be asked");
        let pipeline = RequestPipeline::new(&f.registry, &f.sessions, &reopened, &fresh_client);
        let reply = pipeline.run(&inv, &f.system, &mut |_| {}).await.unwrap();
        assert_eq!(reply.text, "4");
        assert!(reply.cached);
        assert_eq!(fresh_client.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_role_aborts_before_dispatch() {
        let f = fixture();
        let client = MockClient::replying("never");
        let pipeline = RequestPipeline::new(&f.registry, &f.sessions, &f.cache, &client);
        let err = pipeline
            .run(&invocation("nope", "hi"), &f.system, &mut |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, AishError::UnknownRole(_)));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn shell_role_reply_is_tagged_shell() {
        let f = fixture();
        let client = MockClient::replying("ls");
        let pipeline = RequestPipeline::new(&f.registry, &f.sessions, &f.cache, &client);
        let reply = pipeline
            .run(
                &invocation(SHELL_ROLE, "list files in current directory"),
                &f.system,
                &mut |_| {},
            )
            .await
            .unwrap();
        assert_eq!(reply.text, "ls");
        assert_eq!(reply.output, OutputKind::Shell);
    }

    #[tokio::test]
    async fn streaming_forwards_fragments_and_persists_concatenation() {
        let f = fixture();
        let client = MockClient::streaming(&["Hel", "lo"]);
        let pipeline = RequestPipeline::new(&f.registry, &f.sessions, &f.cache, &client);

        let mut inv = invocation(DEFAULT_ROLE, "greet");
        inv.session = Some("greeting".to_string());
        inv.stream = true;

        let mut seen = Vec::new();
        let reply = pipeline
            .run(&inv, &f.system, &mut |frag| seen.push(frag.to_string()))
            .await
            .unwrap();

        assert_eq!(seen, vec!["Hel", "lo"]);
        assert_eq!(reply.text, "Hello");

        let transcript = f.sessions.load("greeting").unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].content, "Hello");
    }

    #[tokio::test]
    async fn fatal_provider_error_mutates_nothing() {
        let f = fixture();
        f.sessions
            .append_exchange("s", Message::user("q"), Message::assistant("a"))
            .unwrap();

        let client = MockClient::failing(ProviderErrorKind::Fatal);
        let pipeline = RequestPipeline::new(&f.registry, &f.sessions, &f.cache, &client);
        let mut inv = invocation(DEFAULT_ROLE, "next");
        inv.session = Some("s".to_string());

        let err = pipeline.run(&inv, &f.system, &mut |_| {}).await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(f.sessions.load("s").unwrap().len(), 2);
        assert!(f.cache.is_empty());
    }

    #[tokio::test]
    async fn transient_provider_error_surfaces_unretried() {
        let f = fixture();
        let client = MockClient::failing(ProviderErrorKind::Transient);
        let pipeline = RequestPipeline::new(&f.registry, &f.sessions, &f.cache, &client);
        let err = pipeline
            .run(&invocation(DEFAULT_ROLE, "hi"), &f.system, &mut |_| {})
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn session_keeps_alternating_across_exchanges() {
        let f = fixture();
        let client = MockClient::replying("answer");
        let pipeline = RequestPipeline::new(&f.registry, &f.sessions, &f.cache, &client);

        for (i, prompt) in ["one", "two", "three"].iter().enumerate() {
            let mut inv = invocation(DEFAULT_ROLE, prompt);
            inv.session = Some("multi".to_string());
            inv.caching = false;
            pipeline.run(&inv, &f.system, &mut |_| {}).await.unwrap();
            assert_eq!(f.sessions.load("multi").unwrap().len(), (i + 1) * 2);
        }

        let transcript = f.sessions.load("multi").unwrap();
        crate::session::check_alternation(&transcript).unwrap();
    }

    #[tokio::test]
    async fn a_changed_prior_turn_misses_the_cache() {
        let f = fixture();
        let client = MockClient::replying("reply");
        let pipeline = RequestPipeline::new(&f.registry, &f.sessions, &f.cache, &client);

        let mut inv = invocation(DEFAULT_ROLE, "follow-up");
        inv.session = Some("hist".to_string());
        f.sessions
            .append_exchange("hist", Message::user("q"), Message::assistant("a"))
            .unwrap();
        pipeline.run(&inv, &f.system, &mut |_| {}).await.unwrap();

        // Rewrite history: same length, one prior turn differs
        f.sessions.delete("hist").unwrap();
        f.sessions
            .append_exchange("hist", Message::user("q"), Message::assistant("different"))
            .unwrap();

        pipeline.run(&inv, &f.system, &mut |_| {}).await.unwrap();
        assert_eq!(client.calls(), 2);
    }
}
