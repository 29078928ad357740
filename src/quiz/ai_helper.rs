use async_trait::async_trait;
use chatgpt::{client::ChatGPT, config::ChatGPTEngine, types::CompletionResponse};
use thiserror::Error;

use crate::config::Settings;
use crate::quiz::Dimension;

pub const MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "당신은 MBTI 전문가입니다. 요청받은 개수만큼 서로 겹치지 않는 MBTI 질문을 만들고, 네 가지 차원에 정확히 같은 개수씩 배분하세요. \
질문은 감성적인 어휘를 쓰되 일상의 구체적인 상황을 제시해서 두 개의 선택지 중 하나로 답할 수 있게 하세요. \
모든 질문은 서로 다른 상황과 맥락을 다뤄야 합니다. \
반드시 올바른 JSON 문서 하나로만 응답하고, 설명이나 다른 텍스트는 붙이지 마세요. 질문은 한국어로 작성하세요.";

/// How a single generation call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The credential was refused. Retrying cannot help.
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("generation service error: {0}")]
    Service(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<chatgpt::err::Error> for GenerationError {
    fn from(err: chatgpt::err::Error) -> Self {
        match err {
            chatgpt::err::Error::BackendError {
                message,
                error_type,
            } => {
                if is_auth_failure(&error_type, &message) {
                    GenerationError::Auth(message)
                } else {
                    GenerationError::Service(format!("{}: {}", error_type, message))
                }
            }
            other => GenerationError::Transport(other.to_string()),
        }
    }
}

/// OpenAI reports a bad key as `invalid_request_error` with a message about
/// the API key, newer endpoints as `authentication_error`.
fn is_auth_failure(error_type: &str, message: &str) -> bool {
    let message = message.to_lowercase();
    error_type == "authentication_error"
        || message.contains("api key")
        || message.contains("api_key")
}

/// One call to a text generator that should answer with a question document.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Issues exactly one request for `count` questions and returns the raw
    /// reply. Never retries.
    async fn request_questions(&self, count: usize) -> Result<String, GenerationError>;
}

/// Builds the per-call user prompt. Only `count` and `count / 4` vary.
pub fn build_prompt(count: usize) -> String {
    let per_dimension = count / Dimension::ALL.len();
    format!(
        "MBTI 성격 테스트에 쓸 질문 {count}개를 만들어 주세요. 각 차원마다 {per_dimension}개씩 균형 있게 배치해 주세요:

- E/I (외향/내향): {per_dimension}개
- S/N (감각/직관): {per_dimension}개
- T/F (사고/감정): {per_dimension}개
- J/P (판단/인식): {per_dimension}개

각 질문은 일상적이고 구체적인 상황을 제시하고 두 개의 선택지로 답할 수 있어야 합니다.
모든 질문은 서로 다른 상황을 다루고 중복되지 않아야 합니다.

반드시 아래 JSON 형식으로만 응답하세요. 다른 텍스트는 넣지 마세요:
{{
    \"questions\": [
        {{
            \"question\": \"질문 내용\",
            \"type\": \"E/I\",
            \"options\": [
                {{\"text\": \"첫 번째 선택지\", \"type\": \"E\"}},
                {{\"text\": \"두 번째 선택지\", \"type\": \"I\"}}
            ]
        }}
    ]
}}

한국어로 작성해 주세요."
    )
}

/// Asks ChatGPT for a question document.
pub struct ChatGptQuestionSource {
    chat_gpt: ChatGPT,
}

impl ChatGptQuestionSource {
    pub fn new(settings: &Settings) -> Result<Self, GenerationError> {
        // A key that cannot even be put into a header is a credential problem.
        let mut chat_gpt = ChatGPT::new(settings.api_key.as_str())
            .map_err(|err| GenerationError::Auth(err.to_string()))?;

        chat_gpt.config.engine = ChatGPTEngine::Custom(MODEL);
        chat_gpt.config.timeout = settings.request_timeout;
        chat_gpt.config.temperature = settings.temperature;

        Ok(Self { chat_gpt })
    }
}

#[async_trait]
impl QuestionSource for ChatGptQuestionSource {
    async fn request_questions(&self, count: usize) -> Result<String, GenerationError> {
        log::debug!("Requesting {} questions from {}", count, MODEL);

        let mut conversation = self.chat_gpt.new_conversation_directed(SYSTEM_PROMPT);
        let response: CompletionResponse = conversation.send_message(build_prompt(count)).await?;
        let content = response.message().clone().content;

        Ok(content)
    }
}
