//! Code fixer and code explainer

use std::sync::Arc;

use tracing::debug;

use super::error::ToolError;
use crate::llm::{generate_with_retry, prompts, LanguageModel, RetryPolicy};

pub struct CodeAssistant {
    model: Arc<dyn LanguageModel>,
    retry: RetryPolicy,
}

impl CodeAssistant {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Step-by-step diagnosis and corrected code for a snippet or traceback
    pub async fn fix(&self, code: &str) -> Result<String, ToolError> {
        if code.trim().is_empty() {
            return Err(ToolError::validation(
                "Please paste your Python code or error message.",
            ));
        }
        debug!("Requesting fix for {} bytes of code", code.len());
        Ok(generate_with_retry(self.model.as_ref(), &prompts::code_fix(code), &self.retry).await?)
    }

    /// Short explanation, language detection and authorship guess
    pub async fn explain(&self, code: &str) -> Result<String, ToolError> {
        if code.trim().is_empty() {
            return Err(ToolError::validation("Please enter a code snippet."));
        }
        debug!("Requesting explanation for {} bytes of code", code.len());
        Ok(
            generate_with_retry(self.model.as_ref(), &prompts::code_explain(code), &self.retry)
                .await?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;
    use crate::llm::LlmError;

    #[tokio::test]
    async fn test_fix_sends_fenced_code() {
        let model = Arc::new(ScriptedModel::new(vec![Ok("Missing parenthesis.".into())]));
        let assistant = CodeAssistant::new(model.clone());

        let answer = assistant.fix("print('hi'").await.unwrap();
        assert_eq!(answer, "Missing parenthesis.");
        assert!(model.prompts.lock()[0].contains("```python\nprint('hi'\n```"));
    }

    #[tokio::test]
    async fn test_explain_and_blank_input() {
        let model = Arc::new(ScriptedModel::default());
        let assistant = CodeAssistant::new(model.clone());

        assert!(matches!(
            assistant.explain(" \n ").await,
            Err(ToolError::Validation(_))
        ));
        assert!(matches!(assistant.fix("").await, Err(ToolError::Validation(_))));
        assert_eq!(model.calls(), 0);

        assistant.explain("SELECT 1;").await.unwrap();
        assert!(model.prompts.lock()[0].starts_with("Explain this code in 4-5 simple lines"));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = Arc::new(ScriptedModel::new(vec![Err(LlmError::Fatal("quota".into()))]));
        let err = CodeAssistant::new(model).fix("x = ").await.unwrap_err();
        assert!(matches!(err, ToolError::Llm(LlmError::Fatal(_))));
    }
}
