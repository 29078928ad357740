pub mod ai_helper;
pub mod bank;
pub mod generator;
pub mod scoring;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use scoring::Classification;

/// Failures that cross the quiz core boundary. Everything else is absorbed
/// by the generator's retry-then-fallback policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("question count must be a positive multiple of 4, got {count}")]
    InvalidCount { count: usize },
    #[error("the generation service rejected the API key: {0}")]
    Auth(String),
    #[error("the quiz attempt is already complete")]
    AttemptComplete,
    #[error("there is no choice number {index}")]
    NoSuchChoice { index: usize },
}

/// Returns how many questions each dimension gets for `count`.
pub fn questions_per_dimension(count: usize) -> Result<usize, QuizError> {
    if count == 0 || count % Dimension::ALL.len() != 0 {
        return Err(QuizError::InvalidCount { count });
    }
    Ok(count / Dimension::ALL.len())
}

/// One of the four opposing personality axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    #[serde(rename = "E/I")]
    EI,
    #[serde(rename = "S/N")]
    SN,
    #[serde(rename = "T/F")]
    TF,
    #[serde(rename = "J/P")]
    JP,
}

impl Dimension {
    /// Canonical order, also the order of letters in a classification.
    pub const ALL: [Dimension; 4] = [Dimension::EI, Dimension::SN, Dimension::TF, Dimension::JP];

    /// The pair of poles; the first one wins ties.
    pub fn letters(self) -> (Letter, Letter) {
        match self {
            Dimension::EI => (Letter::E, Letter::I),
            Dimension::SN => (Letter::S, Letter::N),
            Dimension::TF => (Letter::T, Letter::F),
            Dimension::JP => (Letter::J, Letter::P),
        }
    }

    pub fn index(self) -> usize {
        match self {
            Dimension::EI => 0,
            Dimension::SN => 1,
            Dimension::TF => 2,
            Dimension::JP => 3,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Dimension::EI => "E/I",
            Dimension::SN => "S/N",
            Dimension::TF => "T/F",
            Dimension::JP => "J/P",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single pole of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Letter {
    E,
    I,
    S,
    N,
    T,
    F,
    J,
    P,
}

impl Letter {
    pub const ALL: [Letter; 8] = [
        Letter::E,
        Letter::I,
        Letter::S,
        Letter::N,
        Letter::T,
        Letter::F,
        Letter::J,
        Letter::P,
    ];

    pub fn dimension(self) -> Dimension {
        match self {
            Letter::E | Letter::I => Dimension::EI,
            Letter::S | Letter::N => Dimension::SN,
            Letter::T | Letter::F => Dimension::TF,
            Letter::J | Letter::P => Dimension::JP,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Letter::E => 0,
            Letter::I => 1,
            Letter::S => 2,
            Letter::N => 3,
            Letter::T => 4,
            Letter::F => 5,
            Letter::J => 6,
            Letter::P => 7,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Letter::E => 'E',
            Letter::I => 'I',
            Letter::S => 'S',
            Letter::N => 'N',
            Letter::T => 'T',
            Letter::F => 'F',
            Letter::J => 'J',
            Letter::P => 'P',
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One of the two answers to a question, tagged with the pole it counts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    #[serde(rename = "type")]
    pub letter: Letter,
}

impl Choice {
    pub fn new(text: impl Into<String>, letter: Letter) -> Self {
        Self {
            text: text.into(),
            letter,
        }
    }
}

/// A forced-choice question. Field names follow the generation wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub text: String,
    #[serde(rename = "type")]
    pub dimension: Dimension,
    pub options: [Choice; 2],
}

impl Question {
    pub fn new(text: impl Into<String>, dimension: Dimension, options: [Choice; 2]) -> Self {
        Self {
            text: text.into(),
            dimension,
            options,
        }
    }

    /// Checks that the text is present and that the two options carry the two
    /// distinct poles of the question's dimension.
    pub fn check(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("question text is empty".to_string());
        }
        for choice in &self.options {
            if choice.text.trim().is_empty() {
                return Err("option text is empty".to_string());
            }
            if choice.letter.dimension() != self.dimension {
                return Err(format!(
                    "option letter {} does not belong to {}",
                    choice.letter, self.dimension
                ));
            }
        }
        if self.options[0].letter == self.options[1].letter {
            return Err(format!(
                "both options are tagged {}",
                self.options[0].letter
            ));
        }
        Ok(())
    }
}

/// One run through a question set. Owned by the caller; the core functions
/// never keep it between calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAttempt {
    questions: Vec<Question>,
    answers: Vec<Letter>,
}

impl QuizAttempt {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            answers: Vec::new(),
        }
    }

    pub fn answers(&self) -> &[Letter] {
        &self.answers
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.answers.len())
    }

    /// Records the pole of the chosen option for the current question.
    pub fn answer(&mut self, choice: usize) -> Result<Letter, QuizError> {
        let question = self.current_question().ok_or(QuizError::AttemptComplete)?;
        let letter = question
            .options
            .get(choice)
            .map(|c| c.letter)
            .ok_or(QuizError::NoSuchChoice { index: choice })?;
        self.answers.push(letter);
        Ok(letter)
    }

    /// `(answered, total)`
    pub fn progress(&self) -> (usize, usize) {
        (self.answers.len(), self.questions.len())
    }

    pub fn is_complete(&self) -> bool {
        self.answers.len() >= self.questions.len()
    }

    pub fn result(&self) -> Option<Classification> {
        if !self.is_complete() {
            return None;
        }
        Some(scoring::classify(&self.answers))
    }
}
