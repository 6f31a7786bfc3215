use std::sync::Mutex;

use futures_util::StreamExt;
use gprovider::{
    BoxedEventStream, FallbackPlan, Message, ModelProvider, ModelRequest, NoopFallbackHooks,
    ProviderError, ProviderErrorKind, ProviderFuture, StreamEvent, TerminalSignal,
    VecEventStream, execute_with_fallback,
};

#[derive(Debug)]
struct FlakyProvider {
    healthy_model: String,
    requests: Mutex<Vec<String>>,
}

impl FlakyProvider {
    fn new(healthy_model: impl Into<String>) -> Self {
        Self {
            healthy_model: healthy_model.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requested_models(&self) -> Vec<String> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl ModelProvider for FlakyProvider {
    fn name(&self) -> &str {
        "flaky"
    }

    fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            self.requests
                .lock()
                .expect("requests lock")
                .push(request.model.clone());

            if request.model != self.healthy_model {
                return Err(ProviderError::unavailable(format!(
                    "model {} is down",
                    request.model
                )));
            }

            let stream = VecEventStream::new(vec![
                Ok(StreamEvent::ContentDelta("degraded reply".to_string())),
                Ok(StreamEvent::Terminal(TerminalSignal::Stop)),
            ]);
            Ok(Box::pin(stream) as BoxedEventStream<'a>)
        })
    }
}

fn request_for(model: &str) -> ModelRequest {
    ModelRequest::new(model, vec![Message::user("status?")])
}

#[tokio::test]
async fn cascade_over_real_provider_streams_reports_chosen_model() {
    let provider = FlakyProvider::new("model-b");
    let plan = FallbackPlan::new(vec!["model-a".to_string(), "model-b".to_string()]);

    let provider_ref = &provider;
    let outcome = execute_with_fallback(&plan, &NoopFallbackHooks, |fallback_model| {
        let model = fallback_model.unwrap_or_else(|| "primary".to_string());
        async move { provider_ref.stream(request_for(&model)).await }
    })
    .await
    .expect("model-b should stream");

    assert_eq!(outcome.fallback_model.as_deref(), Some("model-b"));
    assert_eq!(
        provider.requested_models(),
        vec!["primary".to_string(), "model-a".to_string(), "model-b".to_string()]
    );

    let mut stream = outcome.value;
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event.expect("event should be ok"));
    }

    assert_eq!(
        events,
        vec![
            StreamEvent::ContentDelta("degraded reply".to_string()),
            StreamEvent::Terminal(TerminalSignal::Stop),
        ]
    );
}

#[tokio::test]
async fn exhausted_cascade_surfaces_the_primary_stream_error() {
    let provider = FlakyProvider::new("nothing-works");
    let plan = FallbackPlan::new(vec!["model-a".to_string()]);

    let provider_ref = &provider;
    let error = execute_with_fallback(&plan, &NoopFallbackHooks, |fallback_model| {
        let model = fallback_model.unwrap_or_else(|| "primary".to_string());
        async move { provider_ref.stream(request_for(&model)).await }
    })
    .await
    .expect_err("every model is down");

    assert_eq!(error.kind, ProviderErrorKind::Unavailable);
    assert!(error.message.contains("primary"));
}
