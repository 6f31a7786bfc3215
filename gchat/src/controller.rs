//! Continuation controller: drives one turn through the multi-round loop.
//!
//! A turn streams provider events, routing content fragments to the buffer
//! and tool-call fragments to the accumulator, until a terminal signal. A
//! `stop` completes the turn; a `tool_calls` signal pauses generation,
//! executes the declared tools, folds their results into the session, and
//! resubmits. Every provider-call boundary is wrapped by the fallback
//! cascade, and a degraded session never re-attaches the tool manifest.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use futures_timer::Delay;
use futures_util::StreamExt;
use futures_util::future::{self, Either};
use gcommon::SessionId;
use gprovider::{
    BoxedEventStream, FallbackHooks, FallbackPlan, Message, ModelProvider, ModelRequest,
    NoopFallbackHooks, ProviderError, Role, StreamEvent, TerminalSignal, ToolCall, ToolResult,
    execute_with_fallback, resume_with_fallback,
};
use gtooling::{
    SequentialDispatcher, ToolDispatcher, ToolExecutionContext, ToolRegistry, fallback_results,
    unconfigured_results,
};

use crate::{
    ChatError, ChatEvent, ContentBuffer, EventSink, FlushSignal, HistoryStore, NoHistory,
    NoopTurnHooks, Session, SessionRegistry, ToolCallAccumulator, TurnHooks, TurnOutcome,
    TurnPolicy, TurnRequest, truncate_preserving_system, validate_continuation,
};

#[derive(Clone)]
pub struct TurnEngine {
    provider: Arc<dyn ModelProvider>,
    tool_registry: Option<Arc<ToolRegistry>>,
    dispatcher: Option<Arc<dyn ToolDispatcher>>,
    sessions: Arc<SessionRegistry>,
    history: Arc<dyn HistoryStore>,
    fallback: FallbackPlan,
    policy: TurnPolicy,
    fallback_hooks: Arc<dyn FallbackHooks>,
    turn_hooks: Arc<dyn TurnHooks>,
}

pub struct TurnEngineBuilder {
    provider: Arc<dyn ModelProvider>,
    tool_registry: Option<Arc<ToolRegistry>>,
    dispatcher: Option<Arc<dyn ToolDispatcher>>,
    sessions: Option<Arc<SessionRegistry>>,
    history: Option<Arc<dyn HistoryStore>>,
    fallback: FallbackPlan,
    policy: TurnPolicy,
    fallback_hooks: Arc<dyn FallbackHooks>,
    turn_hooks: Arc<dyn TurnHooks>,
}

impl TurnEngineBuilder {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            tool_registry: None,
            dispatcher: None,
            sessions: None,
            history: None,
            fallback: FallbackPlan::default(),
            policy: TurnPolicy::default(),
            fallback_hooks: Arc::new(NoopFallbackHooks),
            turn_hooks: Arc::new(NoopTurnHooks),
        }
    }

    pub fn tool_registry(mut self, tool_registry: Arc<ToolRegistry>) -> Self {
        self.tool_registry = Some(tool_registry);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn ToolDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn sessions(mut self, sessions: Arc<SessionRegistry>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn fallback(mut self, fallback: FallbackPlan) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn policy(mut self, policy: TurnPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn fallback_hooks(mut self, fallback_hooks: Arc<dyn FallbackHooks>) -> Self {
        self.fallback_hooks = fallback_hooks;
        self
    }

    pub fn turn_hooks(mut self, turn_hooks: Arc<dyn TurnHooks>) -> Self {
        self.turn_hooks = turn_hooks;
        self
    }

    pub fn build(self) -> TurnEngine {
        let dispatcher = self.dispatcher.or_else(|| {
            self.tool_registry.as_ref().map(|registry| {
                Arc::new(SequentialDispatcher::new(Arc::clone(registry))) as Arc<dyn ToolDispatcher>
            })
        });

        TurnEngine {
            provider: self.provider,
            tool_registry: self.tool_registry,
            dispatcher,
            sessions: self.sessions.unwrap_or_default(),
            history: self.history.unwrap_or_else(|| Arc::new(NoHistory)),
            fallback: self.fallback,
            policy: self.policy,
            fallback_hooks: self.fallback_hooks,
            turn_hooks: self.turn_hooks,
        }
    }
}

struct RoundOutcome {
    text: String,
    calls: Vec<ToolCall>,
    terminal: TerminalSignal,
}

enum RoundFailure {
    Provider(ProviderError),
    Chat(ChatError),
}

impl TurnEngine {
    pub fn builder(provider: Arc<dyn ModelProvider>) -> TurnEngineBuilder {
        TurnEngineBuilder::new(provider)
    }

    pub fn sessions(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.sessions)
    }

    /// Runs one turn to a terminal state, pushing events through `sink`.
    ///
    /// On success the session is closed (folded into history when linked).
    /// On failure the session is discarded and exactly one `error` event is
    /// emitted, unless the sink itself disconnected, which aborts silently.
    pub async fn run_turn(
        &self,
        request: TurnRequest,
        sink: &dyn EventSink,
    ) -> Result<TurnOutcome, ChatError> {
        if request.user_input.trim().is_empty() {
            return Err(ChatError::invalid_request("user_input must not be empty"));
        }

        let started = Instant::now();
        let seed = self.seed_messages(&request).await?;

        let session = self
            .sessions
            .create(request.context.clone(), request.conversation_id.clone());
        let session_id = {
            let mut session = lock_session(&session)?;
            session.messages = seed;
            session.id.clone()
        };

        self.turn_hooks.on_turn_start(&session_id, &request.model);

        let result = self.drive(&session, &session_id, &request, sink).await;
        drop(session);

        match result {
            Ok(outcome) => {
                self.turn_hooks
                    .on_turn_complete(&session_id, &outcome, started.elapsed());
                self.sessions
                    .close(&session_id, self.history.as_ref())
                    .await?;
                Ok(outcome)
            }
            Err(error) => {
                self.turn_hooks
                    .on_turn_failed(&session_id, &error, started.elapsed());
                if !error.is_silent() {
                    let _ = sink.emit(ChatEvent::error(error.to_string(), Some(&session_id)));
                }
                self.sessions.discard(&session_id);
                Err(error)
            }
        }
    }

    async fn seed_messages(&self, request: &TurnRequest) -> Result<Vec<Message>, ChatError> {
        let mut seed = Vec::new();
        if let Some(system_prompt) = &request.system_prompt {
            seed.push(Message::system(system_prompt.clone()));
        }

        if let Some(conversation_id) = &request.conversation_id
            && let Some(prior) = self.history.load(conversation_id).await?
        {
            // a fresh system prompt supersedes any stored one
            let replace_system = request.system_prompt.is_some();
            seed.extend(
                prior
                    .into_iter()
                    .filter(|message| !(replace_system && message.role == Role::System)),
            );
        }

        seed.push(Message::user(request.user_input.clone()));
        Ok(seed)
    }

    async fn drive(
        &self,
        session: &Arc<Mutex<Session>>,
        session_id: &SessionId,
        request: &TurnRequest,
        sink: &dyn EventSink,
    ) -> Result<TurnOutcome, ChatError> {
        self.emit(sink, ChatEvent::session_started(session_id))?;
        lock_session(session)?.stream_open = true;

        let mut rounds = 0usize;
        let mut stream = self.open_stream(session, request).await?;

        loop {
            rounds += 1;
            self.turn_hooks.on_round_start(session_id, rounds);

            let round = match self.consume_round(&mut stream, session_id, sink).await {
                Ok(round) => round,
                Err(RoundFailure::Chat(error)) => return Err(error),
                Err(RoundFailure::Provider(error)) => {
                    if lock_session(session)?.is_fallback() {
                        return Err(error.into());
                    }

                    // a stream that died mid-flight gets one pass through
                    // the cascade; the degraded stream replays the round
                    stream = self.recover_stream(session, request, error).await?;
                    rounds -= 1;
                    continue;
                }
            };

            match round.terminal {
                TerminalSignal::Stop => {
                    self.emit(sink, ChatEvent::stream_complete(session_id))?;

                    let assistant_message = non_empty(round.text);
                    let fallback_model = {
                        let mut session = lock_session(session)?;
                        if let Some(text) = &assistant_message {
                            session.messages.push(Message::assistant(text.clone()));
                        }
                        session.fallback_model.clone()
                    };

                    return Ok(TurnOutcome {
                        session_id: session_id.clone(),
                        assistant_message,
                        rounds,
                        fallback_model,
                        round_limit_reached: false,
                    });
                }
                TerminalSignal::ToolCalls => {
                    let calls = round.calls;
                    self.emit(sink, ChatEvent::tool_calls_started(calls.clone(), session_id))?;

                    lock_session(session)?
                        .messages
                        .push(Message::assistant_with_tool_calls(
                            non_empty(round.text.clone()),
                            calls.clone(),
                        ));

                    let results = self.execute_tools(session, session_id, &calls).await?;
                    {
                        // results land as a unit before the machine advances
                        let mut session = lock_session(session)?;
                        for result in &results {
                            session.messages.push(Message::tool(
                                result.tool_call_id.clone(),
                                result.content.clone(),
                            ));
                        }
                        truncate_preserving_system(&mut session.messages, self.policy.history_cap);
                    }
                    self.emit(sink, ChatEvent::tool_calls_completed(results, session_id))?;

                    if rounds >= self.policy.max_tool_rounds {
                        self.emit(sink, ChatEvent::stream_complete(session_id))?;
                        let fallback_model = lock_session(session)?.fallback_model.clone();
                        return Ok(TurnOutcome {
                            session_id: session_id.clone(),
                            assistant_message: non_empty(round.text),
                            rounds,
                            fallback_model,
                            round_limit_reached: true,
                        });
                    }

                    validate_continuation(&lock_session(session)?.messages)?;
                    stream = self.open_stream(session, request).await?;
                }
            }
        }
    }

    async fn consume_round(
        &self,
        stream: &mut BoxedEventStream<'_>,
        session_id: &SessionId,
        sink: &dyn EventSink,
    ) -> Result<RoundOutcome, RoundFailure> {
        let mut buffer = ContentBuffer::new(self.policy.buffer.clone());
        let mut accumulator = ToolCallAccumulator::new();
        let mut text = String::new();
        // the turn's single deferred-flush timer; re-armed, never duplicated
        let mut deferred: Option<Delay> = None;

        loop {
            let item = if let Some(mut delay) = deferred.take() {
                match future::select(stream.next(), &mut delay).await {
                    Either::Left((item, _)) => {
                        deferred = Some(delay);
                        item
                    }
                    Either::Right(((), _)) => {
                        if let Some(chunk) = buffer.take() {
                            self.emit(sink, ChatEvent::content(chunk, session_id))
                                .map_err(RoundFailure::Chat)?;
                        }
                        continue;
                    }
                }
            } else {
                stream.next().await
            };

            let Some(event) = item else {
                // stream ended without a terminal signal: degrade to a stop
                if let Some(chunk) = buffer.take() {
                    self.emit(sink, ChatEvent::content(chunk, session_id))
                        .map_err(RoundFailure::Chat)?;
                }
                return Ok(RoundOutcome {
                    text,
                    calls: accumulator.into_calls(),
                    terminal: TerminalSignal::Stop,
                });
            };

            match event.map_err(RoundFailure::Provider)? {
                StreamEvent::ContentDelta(delta) => {
                    text.push_str(&delta);
                    match buffer.push(&delta) {
                        FlushSignal::Now => {
                            deferred = None;
                            if let Some(chunk) = buffer.take() {
                                self.emit(sink, ChatEvent::content(chunk, session_id))
                                    .map_err(RoundFailure::Chat)?;
                            }
                        }
                        FlushSignal::Deferred => match deferred.as_mut() {
                            Some(delay) => delay.reset(self.policy.buffer.deferred_flush),
                            None => deferred = Some(Delay::new(self.policy.buffer.deferred_flush)),
                        },
                    }
                }
                StreamEvent::ToolCallDelta(fragment) => {
                    let snapshot = accumulator.apply(fragment);
                    self.emit(sink, ChatEvent::tool_call_progress(snapshot, session_id))
                        .map_err(RoundFailure::Chat)?;
                }
                StreamEvent::Terminal(signal) => {
                    // terminal signals force an unconditional flush first
                    if let Some(chunk) = buffer.take() {
                        self.emit(sink, ChatEvent::content(chunk, session_id))
                            .map_err(RoundFailure::Chat)?;
                    }
                    return Ok(RoundOutcome {
                        text,
                        calls: accumulator.into_calls(),
                        terminal: signal,
                    });
                }
            }
        }
    }

    async fn open_stream<'a>(
        &'a self,
        session: &Arc<Mutex<Session>>,
        request: &TurnRequest,
    ) -> Result<BoxedEventStream<'a>, ChatError> {
        let (messages, sticky_fallback) = {
            let session = lock_session(session)?;
            (session.messages.clone(), session.fallback_model.clone())
        };

        let outcome = execute_with_fallback(&self.fallback, self.fallback_hooks.as_ref(), {
            let messages = &messages;
            let sticky_fallback = &sticky_fallback;
            move |attempt_model| {
                let (model, with_tools) = match (&attempt_model, sticky_fallback) {
                    (Some(model), _) => (model.clone(), false),
                    (None, Some(model)) => (model.clone(), false),
                    (None, None) => (request.model.clone(), true),
                };

                let model_request = self.build_request(messages, request, model, with_tools);
                async move { self.provider.stream(model_request?).await }
            }
        })
        .await
        .map_err(ChatError::from)?;

        if let Some(chosen) = outcome.fallback_model {
            lock_session(session)?.fallback_model = Some(chosen);
        }

        Ok(outcome.value)
    }

    async fn recover_stream<'a>(
        &'a self,
        session: &Arc<Mutex<Session>>,
        request: &TurnRequest,
        primary_error: ProviderError,
    ) -> Result<BoxedEventStream<'a>, ChatError> {
        let messages = lock_session(session)?.messages.clone();
        self.fallback_hooks.on_primary_failure(&primary_error);

        let outcome = resume_with_fallback(
            &self.fallback,
            self.fallback_hooks.as_ref(),
            primary_error,
            |model| {
                let model_request = self.build_request(&messages, request, model, false);
                async move { self.provider.stream(model_request?).await }
            },
        )
        .await
        .map_err(ChatError::from)?;

        if let Some(chosen) = outcome.fallback_model {
            lock_session(session)?.fallback_model = Some(chosen);
        }

        Ok(outcome.value)
    }

    async fn execute_tools(
        &self,
        session: &Arc<Mutex<Session>>,
        session_id: &SessionId,
        calls: &[ToolCall],
    ) -> Result<Vec<ToolResult>, ChatError> {
        let (is_fallback, payload) = {
            let session = lock_session(session)?;
            (session.is_fallback(), session.context.clone())
        };

        // degraded sessions skip tool processing entirely
        if is_fallback {
            return Ok(fallback_results(calls));
        }

        let Some(dispatcher) = &self.dispatcher else {
            return Ok(unconfigured_results(calls));
        };

        let context = ToolExecutionContext::new(session_id.as_str()).with_payload(payload);
        Ok(dispatcher.dispatch(calls, &context).await)
    }

    fn build_request(
        &self,
        messages: &[Message],
        request: &TurnRequest,
        model: String,
        with_tools: bool,
    ) -> Result<ModelRequest, ProviderError> {
        let mut builder = ModelRequest::builder(model)
            .messages(messages.to_vec())
            .options(request.options.enable_streaming());

        if with_tools && let Some(registry) = &self.tool_registry {
            let definitions = registry.definitions();
            if !definitions.is_empty() {
                builder = builder.tools(definitions);
            }
        }

        builder.build()
    }

    fn emit(&self, sink: &dyn EventSink, event: ChatEvent) -> Result<(), ChatError> {
        sink.emit(event)
            .map_err(|_| ChatError::transport("client transport closed"))
    }
}

fn lock_session<'a>(session: &'a Arc<Mutex<Session>>) -> Result<MutexGuard<'a, Session>, ChatError> {
    session
        .lock()
        .map_err(|_| ChatError::session_state("session lock poisoned"))
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() { None } else { Some(text) }
}
