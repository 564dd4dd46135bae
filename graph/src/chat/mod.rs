//! Chat over a client-supplied graph snapshot.
//!
//! Questions go to an OpenAI-compatible completion endpoint when one is
//! configured and the caller asks for it; every other case, and every failure
//! of the external call, is answered by the rule-based [`LocalResponder`].

pub mod client;
pub mod local;
pub mod prompt;
pub mod rules;

pub use client::{ChatClientError, ChatCompletion, OpenAiClient};
pub use local::LocalResponder;
pub use prompt::Prompt;
pub use rules::{RuleTable, RuleTableError};

use std::sync::Arc;

use kgviz_config::ChatConfig;
use kgviz_models::chat::ChatRequest;

use crate::errors::{GraphError, GraphResult};

/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    External,
    Local,
}

#[derive(Clone)]
pub struct ChatService {
    client: Option<Arc<dyn ChatCompletion>>,
    local: Arc<LocalResponder>,
}

impl ChatService {
    /// Builds the service from explicit settings. `external_enabled` is the
    /// deployment-wide switch; without an API key the external path stays off.
    pub fn from_config(config: &ChatConfig, external_enabled: bool) -> Self {
        let rules = RuleTable::load_or_default(config.rules_path.as_deref());
        let client: Option<Arc<dyn ChatCompletion>> = if external_enabled && config.external_enabled() {
            match OpenAiClient::new(config) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    tracing::warn!(error = %e, "External chat disabled");
                    None
                }
            }
        } else {
            None
        };
        Self::new(client, LocalResponder::new(rules))
    }

    pub fn new(client: Option<Arc<dyn ChatCompletion>>, local: LocalResponder) -> Self {
        Self {
            client,
            local: Arc::new(local),
        }
    }

    /// Local rules only.
    pub fn local_only() -> Self {
        Self::new(None, LocalResponder::default())
    }

    pub fn external_available(&self) -> bool {
        self.client.is_some()
    }

    pub async fn respond(&self, request: &ChatRequest) -> GraphResult<String> {
        self.answer(request).await.map(|(answer, _)| answer)
    }

    pub async fn answer(&self, request: &ChatRequest) -> GraphResult<(String, AnswerSource)> {
        if request.message.trim().is_empty() {
            return Err(GraphError::validation("message must not be empty"));
        }

        if request.use_external_ai {
            if let Some(client) = &self.client {
                match client.complete(&Prompt::for_request(request)).await {
                    Ok(answer) => return Ok((answer, AnswerSource::External)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Chat completion failed, answering locally");
                    }
                }
            }
        }

        Ok((self.local.respond(request), AnswerSource::Local))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kgviz_models::chat::{GraphSnapshot, SnapshotNode};

    struct Fixed(Result<&'static str, ()>);

    #[async_trait]
    impl ChatCompletion for Fixed {
        async fn complete(&self, _prompt: &Prompt) -> Result<String, ChatClientError> {
            self.0
                .map(str::to_string)
                .map_err(|_| ChatClientError::EmptyAnswer)
        }
    }

    fn request(use_external_ai: bool) -> ChatRequest {
        let graph = GraphSnapshot {
            nodes: vec![SnapshotNode {
                id: "1".into(),
                name: "Graph".into(),
                description: "A set of vertices".into(),
                domain: "default".into(),
                ..Default::default()
            }],
            links: vec![],
        };
        let mut request = ChatRequest::new("graph", graph);
        request.use_external_ai = use_external_ai;
        request
    }

    fn service(result: Result<&'static str, ()>) -> ChatService {
        ChatService::new(Some(Arc::new(Fixed(result))), LocalResponder::default())
    }

    #[tokio::test]
    async fn test_external_answer_is_used() {
        let (answer, source) = service(Ok("from llm")).answer(&request(true)).await.unwrap();
        assert_eq!(answer, "from llm");
        assert_eq!(source, AnswerSource::External);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_local() {
        let (answer, source) = service(Err(())).answer(&request(true)).await.unwrap();
        assert_eq!(source, AnswerSource::Local);
        assert!(answer.contains("Description: A set of vertices"));
    }

    #[tokio::test]
    async fn test_caller_can_opt_out_of_external() {
        let (_, source) = service(Ok("from llm")).answer(&request(false)).await.unwrap();
        assert_eq!(source, AnswerSource::Local);
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let mut request = request(false);
        request.message = "  ".into();
        let result = ChatService::local_only().respond(&request).await;
        assert!(matches!(result, Err(GraphError::Validation(_))));
    }

    #[test]
    fn test_no_key_means_local_only() {
        let service = ChatService::from_config(&ChatConfig::default(), true);
        assert!(!service.external_available());
    }
}
