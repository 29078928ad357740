//! Retry, validate, and fall back.
//!
//! [`QuestionGenerator::generate_questions`] calls its [`QuestionSource`] at
//! most `max_attempts` times. Each reply is parsed against the question
//! document shape and checked for length, per-question consistency, and an
//! even split across dimensions. The first reply that passes is returned
//! untouched. A refused credential aborts immediately; every other failure
//! only costs an attempt, and running out of attempts yields the fallback
//! questions from [`bank::synthesize_questions`].

use serde::Deserialize;
use thiserror::Error;

use crate::quiz::ai_helper::{GenerationError, QuestionSource};
use crate::quiz::{self, bank, Dimension, Question, QuizError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionOrigin {
    Generated,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuestions {
    pub questions: Vec<Question>,
    pub origin: QuestionOrigin,
    /// Number of calls made to the question source.
    pub attempts: u32,
}

/// Why an attempt did not produce a usable question set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("{0}")]
    Source(GenerationError),
    #[error("reply is not a question document: {0}")]
    Parse(String),
    #[error("expected {expected} questions, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("question {index} is malformed: {detail}")]
    Malformed { index: usize, detail: String },
    #[error("expected {expected} questions per dimension, got {}", format_counts(.counts))]
    Unbalanced { expected: usize, counts: [usize; 4] },
}

fn format_counts(counts: &[usize; 4]) -> String {
    Dimension::ALL
        .iter()
        .map(|d| format!("{}={}", d, counts[d.index()]))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Deserialize)]
struct QuestionDocument {
    questions: Vec<Question>,
}

enum AttemptState {
    Attempting(u32),
    Rejected { attempt: u32, reason: RejectReason },
    Accepted { attempt: u32, questions: Vec<Question> },
    ExhaustedFallback { attempts: u32 },
}

/// Models like to wrap JSON in a Markdown fence even when told not to.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening line.
    match body.split_once('\n') {
        Some((_, content)) => content.trim(),
        None => body.trim(),
    }
}

/// Parses a raw reply into questions. Unknown dimensions or letters, missing
/// fields, or a number of options other than two fail the parse.
pub fn parse_question_document(raw: &str) -> Result<Vec<Question>, RejectReason> {
    serde_json::from_str::<QuestionDocument>(strip_code_fence(raw))
        .map(|document| document.questions)
        .map_err(|err| RejectReason::Parse(err.to_string()))
}

/// Checks a parsed set against the requested `count`.
pub fn validate_question_set(questions: &[Question], count: usize) -> Result<(), RejectReason> {
    if questions.len() != count {
        return Err(RejectReason::WrongLength {
            expected: count,
            actual: questions.len(),
        });
    }

    for (index, question) in questions.iter().enumerate() {
        question
            .check()
            .map_err(|detail| RejectReason::Malformed { index, detail })?;
    }

    let expected = count / Dimension::ALL.len();
    let mut counts = [0usize; 4];
    for question in questions {
        counts[question.dimension.index()] += 1;
    }
    if counts.iter().any(|&c| c != expected) {
        return Err(RejectReason::Unbalanced { expected, counts });
    }

    Ok(())
}

fn preview(raw: &str) -> String {
    let mut preview: String = raw.chars().take(PREVIEW_CHARS).collect();
    if raw.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

pub struct QuestionGenerator<S> {
    source: S,
    max_attempts: u32,
}

impl<S: QuestionSource> QuestionGenerator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Returns a balanced set of `count` questions.
    ///
    /// Fails only for an invalid `count` or a refused credential.
    pub async fn generate_questions(&self, count: usize) -> Result<GeneratedQuestions, QuizError> {
        quiz::questions_per_dimension(count)?;

        let mut state = AttemptState::Attempting(1);
        loop {
            state = match state {
                AttemptState::Attempting(attempt) if attempt > self.max_attempts => {
                    AttemptState::ExhaustedFallback {
                        attempts: attempt - 1,
                    }
                }
                AttemptState::Attempting(attempt) => {
                    log::debug!("Question generation attempt {}/{}", attempt, self.max_attempts);
                    match self.attempt(count).await {
                        Ok(questions) => AttemptState::Accepted { attempt, questions },
                        Err(RejectReason::Source(GenerationError::Auth(message))) => {
                            log::error!("Question generation aborted: credential refused");
                            return Err(QuizError::Auth(message));
                        }
                        Err(reason) => AttemptState::Rejected { attempt, reason },
                    }
                }
                AttemptState::Rejected { attempt, reason } => {
                    log::warn!(
                        "Attempt {}/{} rejected: {}",
                        attempt,
                        self.max_attempts,
                        reason
                    );
                    AttemptState::Attempting(attempt + 1)
                }
                AttemptState::Accepted { attempt, questions } => {
                    log::info!("Accepted {} generated questions on attempt {}", questions.len(), attempt);
                    return Ok(GeneratedQuestions {
                        questions,
                        origin: QuestionOrigin::Generated,
                        attempts: attempt,
                    });
                }
                AttemptState::ExhaustedFallback { attempts } => {
                    log::warn!(
                        "Question generation failed after {} attempts, using fallback questions",
                        attempts
                    );
                    return Ok(GeneratedQuestions {
                        questions: bank::synthesize_questions(count)?,
                        origin: QuestionOrigin::Fallback,
                        attempts,
                    });
                }
            };
        }
    }

    async fn attempt(&self, count: usize) -> Result<Vec<Question>, RejectReason> {
        let raw = self
            .source
            .request_questions(count)
            .await
            .map_err(RejectReason::Source)?;
        log::debug!("Generation reply: {}", preview(&raw));

        let questions = parse_question_document(&raw)?;
        validate_question_set(&questions, count)?;
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{Choice, Letter};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays canned replies, one per call.
    struct ScriptedSource {
        replies: Mutex<VecDeque<Result<String, GenerationError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn repeating(reply: Result<String, GenerationError>, times: usize) -> Self {
            Self::new(vec![reply; times])
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuestionSource for ScriptedSource {
        async fn request_questions(&self, _count: usize) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Service("script exhausted".to_string())))
        }
    }

    /// A balanced set that is distinguishable from the fallback questions.
    fn generated_set(count: usize) -> Vec<Question> {
        bank::synthesize_questions(count)
            .unwrap()
            .into_iter()
            .enumerate()
            .map(|(i, mut q)| {
                q.text = format!("생성된 질문 {}", i + 1);
                q
            })
            .collect()
    }

    fn document(questions: &[Question]) -> String {
        serde_json::json!({ "questions": questions }).to_string()
    }

    #[tokio::test]
    async fn valid_first_reply_is_returned_verbatim() {
        let expected = generated_set(8);
        let generator = QuestionGenerator::new(ScriptedSource::new(vec![Ok(document(&expected))]));

        let result = generator.generate_questions(8).await.unwrap();

        assert_eq!(result.questions, expected);
        assert_eq!(result.origin, QuestionOrigin::Generated);
        assert_eq!(result.attempts, 1);
        assert_eq!(generator.source.calls(), 1);
    }

    #[tokio::test]
    async fn short_replies_exhaust_into_fallback() {
        let short = document(&generated_set(8)[..6]);
        let generator = QuestionGenerator::new(ScriptedSource::repeating(Ok(short), 3));

        let result = generator.generate_questions(8).await.unwrap();

        assert_eq!(result.questions, bank::synthesize_questions(8).unwrap());
        assert_eq!(result.questions, bank::base_questions());
        assert_eq!(result.origin, QuestionOrigin::Fallback);
        assert_eq!(result.attempts, 3);
        assert_eq!(generator.source.calls(), 3);
    }

    #[tokio::test]
    async fn transient_failures_fall_back_after_max_attempts() {
        let source = ScriptedSource::new(vec![
            Err(GenerationError::Transport("timed out".to_string())),
            Err(GenerationError::Service("overloaded".to_string())),
            Ok("I'm sorry, I can't do that.".to_string()),
            Ok(document(&generated_set(12))),
        ]);
        let generator = QuestionGenerator::new(source);

        let result = generator.generate_questions(12).await.unwrap();

        assert_eq!(result.questions, bank::synthesize_questions(12).unwrap());
        assert_eq!(result.origin, QuestionOrigin::Fallback);
        assert_eq!(generator.source.calls(), 3);
    }

    #[tokio::test]
    async fn recovers_on_a_later_attempt() {
        let expected = generated_set(4);
        let source = ScriptedSource::new(vec![
            Err(GenerationError::Service("overloaded".to_string())),
            Ok(format!("```json\n{}\n```", document(&expected))),
        ]);
        let generator = QuestionGenerator::new(source);

        let result = generator.generate_questions(4).await.unwrap();

        assert_eq!(result.questions, expected);
        assert_eq!(result.origin, QuestionOrigin::Generated);
        assert_eq!(result.attempts, 2);
    }

    #[tokio::test]
    async fn auth_failure_stops_after_one_call() {
        let source = ScriptedSource::new(vec![
            Err(GenerationError::Auth("Incorrect API key provided".to_string())),
            Ok(document(&generated_set(8))),
        ]);
        let generator = QuestionGenerator::new(source);

        let err = generator.generate_questions(8).await.unwrap_err();

        assert_eq!(err, QuizError::Auth("Incorrect API key provided".to_string()));
        assert_eq!(generator.source.calls(), 1);
    }

    #[tokio::test]
    async fn invalid_count_makes_no_calls() {
        let generator = QuestionGenerator::new(ScriptedSource::new(vec![]));

        let err = generator.generate_questions(10).await.unwrap_err();

        assert_eq!(err, QuizError::InvalidCount { count: 10 });
        assert_eq!(generator.source.calls(), 0);
    }

    #[tokio::test]
    async fn attempt_bound_is_configurable() {
        let generator = QuestionGenerator::new(ScriptedSource::new(vec![])).with_max_attempts(5);

        let result = generator.generate_questions(4).await.unwrap();

        assert_eq!(result.origin, QuestionOrigin::Fallback);
        assert_eq!(result.attempts, 5);
        assert_eq!(generator.source.calls(), 5);
    }

    #[test]
    fn unbalanced_sets_are_rejected() {
        let mut questions = generated_set(8);
        questions[1] = questions[0].clone();

        assert_eq!(
            validate_question_set(&questions, 8),
            Err(RejectReason::Unbalanced {
                expected: 2,
                counts: [3, 1, 2, 2],
            })
        );
    }

    #[test]
    fn duplicate_letter_questions_are_rejected() {
        let mut questions = generated_set(4);
        questions[2].options = [Choice::new("a", Letter::T), Choice::new("b", Letter::T)];

        assert!(matches!(
            validate_question_set(&questions, 4),
            Err(RejectReason::Malformed { index: 2, .. })
        ));
    }

    #[test]
    fn parse_refuses_unknown_codes_and_option_counts() {
        let unknown_dimension = r#"{"questions":[{"question":"q","type":"X/Y","options":[{"text":"a","type":"E"},{"text":"b","type":"I"}]}]}"#;
        assert!(matches!(
            parse_question_document(unknown_dimension),
            Err(RejectReason::Parse(_))
        ));

        let three_options = r#"{"questions":[{"question":"q","type":"E/I","options":[{"text":"a","type":"E"},{"text":"b","type":"I"},{"text":"c","type":"E"}]}]}"#;
        assert!(matches!(
            parse_question_document(three_options),
            Err(RejectReason::Parse(_))
        ));

        assert!(matches!(
            parse_question_document(r#"{"items": []}"#),
            Err(RejectReason::Parse(_))
        ));
    }

    #[test]
    fn parse_accepts_the_wire_shape() {
        let raw = r#"
            {"questions":[{"question":"주말에는?","type":"E/I","options":[{"text":"밖으로","type":"E"},{"text":"집에서","type":"I"}]}]}
        "#;
        let questions = parse_question_document(raw).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].dimension, Dimension::EI);
        assert_eq!(questions[0].options[1], Choice::new("집에서", Letter::I));
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }
}
