use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gchat::ChatFuture;
use gchat::prelude::*;
use gprovider::{
    BoxedEventStream, FallbackPlan, Message, ModelProvider, ModelRequest, ProviderError,
    ProviderFuture, Role, StreamEvent, TerminalSignal, ToolCallFragment, ToolDefinition,
    VecEventStream,
};
use serde_json::json;

type ScriptFn = dyn Fn(&ModelRequest, usize) -> Result<Vec<Result<StreamEvent, ProviderError>>, ProviderError>
    + Send
    + Sync;

struct ScriptedProvider {
    requests: Mutex<Vec<ModelRequest>>,
    script: Box<ScriptFn>,
}

impl ScriptedProvider {
    fn new<F>(script: F) -> Self
    where
        F: Fn(&ModelRequest, usize) -> Result<Vec<Result<StreamEvent, ProviderError>>, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            requests: Mutex::new(Vec::new()),
            script: Box::new(script),
        }
    }

    fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            let call_index = {
                let mut requests = self.requests.lock().expect("requests lock");
                requests.push(request.clone());
                requests.len() - 1
            };

            let events = (self.script)(&request, call_index)?;
            Ok(Box::pin(VecEventStream::new(events)) as BoxedEventStream<'a>)
        })
    }
}

fn diagnostics_registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register_sync_fn(
        ToolDefinition {
            name: "scan_adapters".to_string(),
            description: "Scans for connected ELM327 adapters".to_string(),
            input_schema: "{\"type\":\"object\"}".to_string(),
        },
        |args, _ctx| Ok(format!("{{\"adapters\":1,\"args\":{args}}}")),
    );
    registry.register_sync_fn(
        ToolDefinition {
            name: "read_dtcs".to_string(),
            description: "Reads stored diagnostic trouble codes".to_string(),
            input_schema: "{\"type\":\"object\"}".to_string(),
        },
        |_args, _ctx| Ok("{\"codes\":[\"P0300\"]}".to_string()),
    );
    Arc::new(registry)
}

fn tool_round_script(
    request: &ModelRequest,
    _call_index: usize,
) -> Result<Vec<Result<StreamEvent, ProviderError>>, ProviderError> {
    let has_tool_results = request
        .messages
        .iter()
        .any(|message| message.role == Role::Tool);

    if !has_tool_results {
        return Ok(vec![
            Ok(StreamEvent::ContentDelta("Checking the vehicle now.".to_string())),
            Ok(StreamEvent::ToolCallDelta(
                ToolCallFragment::new(0).with_id("call_scan").with_name("scan_"),
            )),
            Ok(StreamEvent::ToolCallDelta(
                ToolCallFragment::new(0).with_name("adapters").with_arguments("{"),
            )),
            Ok(StreamEvent::ToolCallDelta(
                ToolCallFragment::new(1)
                    .with_id("call_dtc")
                    .with_name("read_dtcs")
                    .with_arguments("{}"),
            )),
            Ok(StreamEvent::ToolCallDelta(
                ToolCallFragment::new(0).with_arguments("\"timeout\":5}"),
            )),
            Ok(StreamEvent::Terminal(TerminalSignal::ToolCalls)),
        ]);
    }

    Ok(vec![
        Ok(StreamEvent::ContentDelta("One misfire code was found. ".to_string())),
        Ok(StreamEvent::ContentDelta("Cylinder 3 needs attention.".to_string())),
        Ok(StreamEvent::Terminal(TerminalSignal::Stop)),
    ])
}

#[tokio::test]
async fn tool_loop_accumulates_dispatches_and_continues() {
    let provider = Arc::new(ScriptedProvider::new(tool_round_script));
    let engine = TurnEngine::builder(provider.clone())
        .tool_registry(diagnostics_registry())
        .build();
    let sink = CollectingSink::new();

    let outcome = engine
        .run_turn(
            TurnRequest::new("gpt-4o", "Why is my check-engine light on?"),
            &sink,
        )
        .await
        .expect("turn should complete");

    assert_eq!(outcome.rounds, 2);
    assert!(!outcome.round_limit_reached);
    assert!(outcome.fallback_model.is_none());

    let events = sink.take();
    assert!(matches!(events[0], ChatEvent::SessionStarted { .. }));

    // progress snapshots are cumulative, not deltas
    let progress: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            ChatEvent::ToolCallProgress { tool_call, .. } => Some(tool_call.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(progress.len(), 4);
    assert_eq!(progress[0].name, "scan_");
    assert_eq!(progress[1].name, "scan_adapters");
    assert_eq!(progress[3].arguments, "{\"timeout\":5}");

    let started = events
        .iter()
        .find_map(|event| match event {
            ChatEvent::ToolCallsStarted { tool_calls, .. } => Some(tool_calls.clone()),
            _ => None,
        })
        .expect("tool_calls_started should be emitted");
    assert_eq!(started.len(), 2);
    assert_eq!(started[0].id, "call_scan");
    assert_eq!(started[0].name, "scan_adapters");
    assert_eq!(started[0].arguments, "{\"timeout\":5}");
    assert_eq!(started[1].id, "call_dtc");

    // results arrive once, in declaration order
    let results = events
        .iter()
        .find_map(|event| match event {
            ChatEvent::ToolCallsCompleted { results, .. } => Some(results.clone()),
            _ => None,
        })
        .expect("tool_calls_completed should be emitted");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].tool_call_id, "call_scan");
    assert_eq!(results[1].tool_call_id, "call_dtc");
    assert!(results[1].content.contains("P0300"));

    assert!(matches!(events.last(), Some(ChatEvent::StreamComplete { .. })));

    // the continuation resubmitted the full transcript with the manifest
    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].tools.is_empty());
    assert!(!requests[1].tools.is_empty());

    let continuation = &requests[1];
    let assistant_index = continuation
        .messages
        .iter()
        .position(|message| !message.tool_calls.is_empty())
        .expect("assistant tool_calls message should precede results");
    assert_eq!(
        continuation.messages[assistant_index + 1].tool_call_id.as_deref(),
        Some("call_scan")
    );
    assert_eq!(
        continuation.messages[assistant_index + 2].tool_call_id.as_deref(),
        Some("call_dtc")
    );
}

#[tokio::test]
async fn buffered_fragments_emit_one_content_event_on_stop() {
    let provider = Arc::new(ScriptedProvider::new(|_request, _call| {
        Ok(vec![
            Ok(StreamEvent::ContentDelta("Hello ".to_string())),
            Ok(StreamEvent::ContentDelta("wor".to_string())),
            Ok(StreamEvent::ContentDelta("ld.".to_string())),
            Ok(StreamEvent::Terminal(TerminalSignal::Stop)),
        ])
    }));
    let engine = TurnEngine::builder(provider).build();
    let sink = CollectingSink::new();

    let outcome = engine
        .run_turn(TurnRequest::new("gpt-4o-mini", "say hello"), &sink)
        .await
        .expect("turn should complete");

    let contents: Vec<_> = sink
        .take()
        .into_iter()
        .filter_map(|event| match event {
            ChatEvent::Content { text, .. } => Some(text),
            _ => None,
        })
        .collect();

    assert_eq!(contents, vec!["Hello world.".to_string()]);
    assert_eq!(outcome.assistant_message.as_deref(), Some("Hello world."));
}

#[tokio::test]
async fn failed_primary_cascades_to_first_working_model_without_tools() {
    let provider = Arc::new(ScriptedProvider::new(|request, _call| {
        match request.model.as_str() {
            "model-b" => Ok(vec![
                Ok(StreamEvent::ContentDelta(
                    "Diagnostics are temporarily limited.".to_string(),
                )),
                Ok(StreamEvent::Terminal(TerminalSignal::Stop)),
            ]),
            "model-a" => Err(ProviderError::unavailable("model-a down")),
            _ => Err(ProviderError::unavailable("primary down")),
        }
    }));

    let engine = TurnEngine::builder(provider.clone())
        .tool_registry(diagnostics_registry())
        .fallback(FallbackPlan::new(vec![
            "model-a".to_string(),
            "model-b".to_string(),
        ]))
        .build();
    let sink = CollectingSink::new();

    let outcome = engine
        .run_turn(TurnRequest::new("gpt-4o", "scan please"), &sink)
        .await
        .expect("fallback should succeed");

    assert_eq!(outcome.fallback_model.as_deref(), Some("model-b"));

    let requests = provider.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].model, "gpt-4o");
    assert!(!requests[0].tools.is_empty());
    // degraded attempts never carry the tool manifest
    assert!(requests[1].tools.is_empty());
    assert!(requests[2].tools.is_empty());

    let events = sink.take();
    assert!(
        events
            .iter()
            .all(|event| !matches!(event, ChatEvent::Error { .. }))
    );
}

#[tokio::test]
async fn exhausted_cascade_emits_exactly_one_error_event() {
    let provider = Arc::new(ScriptedProvider::new(|_request, _call| {
        Err(ProviderError::timeout("everything is down"))
    }));
    let engine = TurnEngine::builder(provider)
        .fallback(FallbackPlan::new(vec!["model-a".to_string()]))
        .build();
    let sink = CollectingSink::new();

    let error = engine
        .run_turn(TurnRequest::new("gpt-4o", "scan please"), &sink)
        .await
        .expect_err("turn should fail");
    assert_eq!(error.kind, ChatErrorKind::Provider);
    // the surfaced failure is the original primary one
    assert!(error.message.contains("everything is down"));

    let events = sink.take();
    let errors: Vec<_> = events
        .iter()
        .filter(|event| matches!(event, ChatEvent::Error { .. }))
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(matches!(events.last(), Some(ChatEvent::Error { .. })));

    assert!(engine.sessions().is_empty());
}

#[tokio::test]
async fn mid_stream_failure_degrades_and_stays_tool_less() {
    // primary dies mid-stream after declaring a tool call; the degraded
    // model answers without tools
    let provider = Arc::new(ScriptedProvider::new(|request, _call| {
        if request.model == "limp-home" {
            return Ok(vec![
                Ok(StreamEvent::ContentDelta("Running without tools.".to_string())),
                Ok(StreamEvent::Terminal(TerminalSignal::Stop)),
            ]);
        }

        Ok(vec![
            Ok(StreamEvent::ContentDelta("Let me scan".to_string())),
            Err(ProviderError::transport("stream reset")),
        ])
    }));

    let engine = TurnEngine::builder(provider.clone())
        .tool_registry(diagnostics_registry())
        .fallback(FallbackPlan::default().with_model("limp-home"))
        .build();
    let sink = CollectingSink::new();

    let outcome = engine
        .run_turn(TurnRequest::new("gpt-4o", "scan please"), &sink)
        .await
        .expect("degraded turn should complete");

    assert_eq!(outcome.fallback_model.as_deref(), Some("limp-home"));
    assert_eq!(
        outcome.assistant_message.as_deref(),
        Some("Running without tools.")
    );

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].tools.is_empty());
}

#[tokio::test]
async fn degraded_session_answers_declared_calls_with_placeholders() {
    // primary is down; the degraded model misbehaves and declares a tool
    // call anyway, which must be answered without dispatching anything
    let provider = Arc::new(ScriptedProvider::new(|request, _call| {
        if request.model != "limp-home" {
            return Err(ProviderError::unavailable("primary down"));
        }

        let has_tool_results = request
            .messages
            .iter()
            .any(|message| message.role == Role::Tool);

        if !has_tool_results {
            return Ok(vec![
                Ok(StreamEvent::ToolCallDelta(
                    ToolCallFragment::new(0)
                        .with_id("call_ghost")
                        .with_name("scan_adapters")
                        .with_arguments("{}"),
                )),
                Ok(StreamEvent::Terminal(TerminalSignal::ToolCalls)),
            ]);
        }

        Ok(vec![
            Ok(StreamEvent::ContentDelta("Tooling is unavailable right now.".to_string())),
            Ok(StreamEvent::Terminal(TerminalSignal::Stop)),
        ])
    }));

    let engine = TurnEngine::builder(provider.clone())
        .tool_registry(diagnostics_registry())
        .fallback(FallbackPlan::default().with_model("limp-home"))
        .build();
    let sink = CollectingSink::new();

    let outcome = engine
        .run_turn(TurnRequest::new("gpt-4o", "scan please"), &sink)
        .await
        .expect("degraded turn should complete");
    assert_eq!(outcome.fallback_model.as_deref(), Some("limp-home"));

    let results = sink
        .take()
        .into_iter()
        .find_map(|event| match event {
            ChatEvent::ToolCallsCompleted { results, .. } => Some(results),
            _ => None,
        })
        .expect("declared call should still be answered");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].tool_call_id, "call_ghost");

    let body: serde_json::Value =
        serde_json::from_str(&results[0].content).expect("placeholder should be JSON");
    assert_eq!(body["message"], "tool processing unavailable");
    assert_eq!(body["status"], "fallback");
}

#[tokio::test]
async fn round_cap_ends_turn_gracefully() {
    let provider = Arc::new(ScriptedProvider::new(|_request, call_index| {
        Ok(vec![
            Ok(StreamEvent::ToolCallDelta(
                ToolCallFragment::new(0)
                    .with_id(format!("call_{call_index}"))
                    .with_name("read_dtcs")
                    .with_arguments("{}"),
            )),
            Ok(StreamEvent::Terminal(TerminalSignal::ToolCalls)),
        ])
    }));

    let engine = TurnEngine::builder(provider.clone())
        .tool_registry(diagnostics_registry())
        .policy(TurnPolicy::default().with_max_tool_rounds(2))
        .build();
    let sink = CollectingSink::new();

    let outcome = engine
        .run_turn(TurnRequest::new("gpt-4o", "keep scanning"), &sink)
        .await
        .expect("capped turn should complete");

    assert_eq!(outcome.rounds, 2);
    assert!(outcome.round_limit_reached);
    assert_eq!(provider.requests().len(), 2);
    assert!(matches!(sink.take().last(), Some(ChatEvent::StreamComplete { .. })));
}

#[derive(Default)]
struct RecordingHistory {
    saved: Mutex<Vec<(ConversationId, Vec<Message>)>>,
    preload: Mutex<Option<Vec<Message>>>,
}

impl RecordingHistory {
    fn with_preload(messages: Vec<Message>) -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            preload: Mutex::new(Some(messages)),
        }
    }

    fn saved(&self) -> Vec<(ConversationId, Vec<Message>)> {
        self.saved.lock().expect("saved lock").clone()
    }
}

impl HistoryStore for RecordingHistory {
    fn load<'a>(
        &'a self,
        _conversation_id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<Option<Vec<Message>>, ChatError>> {
        Box::pin(async move { Ok(self.preload.lock().expect("preload lock").clone()) })
    }

    fn save<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        messages: Vec<Message>,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            self.saved
                .lock()
                .expect("saved lock")
                .push((conversation_id.clone(), messages));
            Ok(())
        })
    }
}

#[tokio::test]
async fn linked_turns_load_and_fold_history() {
    let history = Arc::new(RecordingHistory::with_preload(vec![
        Message::user("earlier question"),
        Message::assistant("earlier answer"),
    ]));
    let provider = Arc::new(ScriptedProvider::new(|_request, _call| {
        Ok(vec![
            Ok(StreamEvent::ContentDelta("Battery voltage looks fine.".to_string())),
            Ok(StreamEvent::Terminal(TerminalSignal::Stop)),
        ])
    }));

    let engine = TurnEngine::builder(provider.clone())
        .history(history.clone())
        .build();
    let sink = CollectingSink::new();

    engine
        .run_turn(
            TurnRequest::new("gpt-4o-mini", "and the battery?")
                .with_system_prompt("You are a vehicle diagnostics assistant.")
                .with_conversation_id("garage-42")
                .with_context(json!({"vehicle":{"vin":"TEST123"}})),
            &sink,
        )
        .await
        .expect("linked turn should complete");

    // prior conversation seeded the provider transcript
    let request = &provider.requests()[0];
    assert_eq!(request.messages[0].role, Role::System);
    assert_eq!(request.messages[1].text(), "earlier question");
    assert_eq!(request.messages[3].text(), "and the battery?");

    // close folded the finished transcript back into history
    let saved = history.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].0, ConversationId::new("garage-42"));
    let folded = &saved[0].1;
    assert_eq!(folded[0].role, Role::System);
    assert_eq!(
        folded.last().map(|message| message.text().to_string()),
        Some("Battery voltage looks fine.".to_string())
    );
}

struct ClosingSink {
    remaining: AtomicUsize,
}

impl ClosingSink {
    fn after(events: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(events),
        }
    }
}

impl EventSink for ClosingSink {
    fn emit(&self, _event: ChatEvent) -> Result<(), SinkClosed> {
        let remaining = self.remaining.load(Ordering::SeqCst);
        if remaining == 0 {
            return Err(SinkClosed);
        }
        self.remaining.store(remaining - 1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn transport_disconnect_aborts_silently() {
    let history = Arc::new(RecordingHistory::default());
    let provider = Arc::new(ScriptedProvider::new(|_request, _call| {
        Ok(vec![
            Ok(StreamEvent::ContentDelta("A long diagnostic explanation. ".to_string())),
            Ok(StreamEvent::ContentDelta("More text follows here.".to_string())),
            Ok(StreamEvent::Terminal(TerminalSignal::Stop)),
        ])
    }));

    let engine = TurnEngine::builder(provider)
        .history(history.clone())
        .build();
    let sink = ClosingSink::after(1);

    let error = engine
        .run_turn(
            TurnRequest::new("gpt-4o-mini", "explain").with_conversation_id("garage-7"),
            &sink,
        )
        .await
        .expect_err("disconnected client should abort the turn");

    assert_eq!(error.kind, ChatErrorKind::Transport);
    assert!(error.is_silent());
    // no history fold and no lingering session after a silent abort
    assert!(history.saved().is_empty());
    assert!(engine.sessions().is_empty());
}
