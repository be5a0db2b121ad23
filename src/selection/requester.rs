use crate::backends::LanguageModel;
use crate::error::{DispatchError, DispatchResult};
use crate::selection::types::{ModelOutput, ModelPrompt};
use serde_json::{json, Value};
use std::sync::Arc;

const SELECTOR_PREAMBLE: &str = "You are an expert tool selector. Based on the user's input, \
choose the single most appropriate tool and provide the necessary arguments.\n\
Here are the available tools:";

const REPLY_FORMAT: &str = "Respond ONLY with a JSON object of the form \
{\"name\": string, \"arguments\": object}. Use literal argument values; \
do NOT return a JSON schema or descriptions.";

/// Asks the language model for one tool selection.
///
/// Exactly one model round-trip per call and no retries; retry policy
/// belongs to whoever drives the dispatch cycle.
#[derive(Clone)]
pub struct SelectionRequester {
    model: Arc<dyn LanguageModel>,
}

impl SelectionRequester {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn request(&self, user_text: &str, prompt_fragment: &str) -> DispatchResult<ModelOutput> {
        if user_text.trim().is_empty() {
            return Err(DispatchError::EmptyRequest);
        }

        let prompt = build_prompt(user_text, prompt_fragment);
        Ok(self.model.generate(&prompt).await?)
    }
}

/// Combine the catalog fragment with the user's request.
pub fn build_prompt(user_text: &str, prompt_fragment: &str) -> ModelPrompt {
    ModelPrompt {
        system: format!("{SELECTOR_PREAMBLE}\n\n{prompt_fragment}\n\n{REPLY_FORMAT}"),
        user: format!("Input: {}", user_text.trim()),
        response_schema: Some(selection_schema()),
    }
}

/// JSON schema of a `{name, arguments}` selection.
pub fn selection_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "arguments": { "type": "object" }
        },
        "required": ["name", "arguments"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingModel {
        prompts: Mutex<Vec<ModelPrompt>>,
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        async fn generate(&self, prompt: &ModelPrompt) -> Result<ModelOutput, ModelError> {
            self.prompts.lock().unwrap().push(prompt.clone());
            Ok(ModelOutput::Text("{}".into()))
        }
    }

    #[test]
    fn test_build_prompt_includes_fragment_and_input() {
        let prompt = build_prompt("  what is 7 plus 5 ", "- Tool Name: `add_numbers`");

        assert!(prompt.system.starts_with("You are an expert tool selector."));
        assert!(prompt.system.contains("- Tool Name: `add_numbers`"));
        assert!(prompt.system.ends_with(REPLY_FORMAT));
        assert_eq!(prompt.user, "Input: what is 7 plus 5");
        assert_eq!(prompt.response_schema, Some(selection_schema()));
    }

    #[tokio::test]
    async fn test_request_makes_one_model_call() {
        let model = Arc::new(RecordingModel {
            prompts: Mutex::new(Vec::new()),
        });
        let requester = SelectionRequester::new(model.clone());

        let output = requester.request("list posts", "fragment").await.unwrap();

        assert_eq!(output, ModelOutput::Text("{}".into()));
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_request_never_reaches_model() {
        let model = Arc::new(RecordingModel {
            prompts: Mutex::new(Vec::new()),
        });
        let requester = SelectionRequester::new(model.clone());

        let result = requester.request("   ", "fragment").await;

        assert!(matches!(result, Err(DispatchError::EmptyRequest)));
        assert!(model.prompts.lock().unwrap().is_empty());
    }
}
