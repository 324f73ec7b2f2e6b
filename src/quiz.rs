//! Quiz snapshot ingestion.
//!
//! Quiz content is produced out of process (upstream generators or manual
//! import) and handed to the server over the control plane as [`QuizData`].
//! The core only ever works with a validated, immutable [`QuizSnapshot`]
//! shared behind an `Arc` -- question text never changes mid-game.

use serde::{Deserialize, Serialize};

use crate::protocol::QuestionView;

/// One question as it arrives on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// Stable id, preserved from the upstream generator.
    pub id: String,
    pub prompt: String,
    /// Exactly 2 or 4 options.
    pub options: Vec<String>,
    pub correct_index: usize,
    /// Optional background image reference (opaque to the core).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Bonus questions double base points, independent of player multipliers.
    #[serde(default)]
    pub is_bonus: bool,
}

/// A whole quiz as it arrives on the wire (control plane or `RESET_ROOM`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizData {
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

/// Why a [`QuizData`] was rejected.
#[derive(Debug, thiserror::Error)]
pub enum QuizValidationError {
    #[error("quiz has no questions")]
    NoQuestions,

    #[error("question {index} has {count} options; expected 2 or 4")]
    BadOptionCount { index: usize, count: usize },

    #[error("question {index} has correct_index {correct_index} out of range for {count} options")]
    CorrectIndexOutOfRange {
        index: usize,
        correct_index: usize,
        count: usize,
    },

    #[error("question {index} has an empty prompt")]
    EmptyPrompt { index: usize },

    #[error("question {index} has an empty option at position {option}")]
    EmptyOption { index: usize, option: usize },
}

/// A validated, immutable quiz.
///
/// Constructed once per room (and on `RESET_ROOM` with new content); the
/// room task shares it as `Arc<QuizSnapshot>`.
#[derive(Debug)]
pub struct QuizSnapshot {
    title: String,
    questions: Vec<QuizQuestion>,
}

impl QuizSnapshot {
    pub fn from_data(data: QuizData) -> Result<Self, QuizValidationError> {
        if data.questions.is_empty() {
            return Err(QuizValidationError::NoQuestions);
        }
        for (index, question) in data.questions.iter().enumerate() {
            let count = question.options.len();
            if count != 2 && count != 4 {
                return Err(QuizValidationError::BadOptionCount { index, count });
            }
            if question.correct_index >= count {
                return Err(QuizValidationError::CorrectIndexOutOfRange {
                    index,
                    correct_index: question.correct_index,
                    count,
                });
            }
            if question.prompt.trim().is_empty() {
                return Err(QuizValidationError::EmptyPrompt { index });
            }
            if let Some(option) = question.options.iter().position(|o| o.trim().is_empty()) {
                return Err(QuizValidationError::EmptyOption { index, option });
            }
        }
        Ok(Self {
            title: data.title,
            questions: data.questions,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn question(&self, index: usize) -> Option<&QuizQuestion> {
        self.questions.get(index)
    }

    /// Audience-safe projection of a question (no correct index).
    pub fn view(&self, index: usize, time_limit_seconds: u64) -> Option<QuestionView> {
        let question = self.question(index)?;
        Some(QuestionView {
            question_number: index + 1,
            total_questions: self.len(),
            prompt: question.prompt.clone(),
            options: question.options.clone(),
            time_limit_seconds,
            is_bonus: question.is_bonus,
            image: question.image.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: &[&str], correct: usize) -> QuizQuestion {
        QuizQuestion {
            id: "q1".into(),
            prompt: "2+2?".into(),
            options: options.iter().map(|s| (*s).to_string()).collect(),
            correct_index: correct,
            image: None,
            is_bonus: false,
        }
    }

    fn quiz(questions: Vec<QuizQuestion>) -> QuizData {
        QuizData {
            title: "Math".into(),
            questions,
        }
    }

    #[test]
    fn test_valid_quiz_accepted() {
        let snapshot =
            QuizSnapshot::from_data(quiz(vec![question(&["3", "4", "5", "6"], 1)])).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.title(), "Math");
        assert_eq!(snapshot.question(0).unwrap().correct_index, 1);
    }

    #[test]
    fn test_two_option_questions_allowed() {
        assert!(QuizSnapshot::from_data(quiz(vec![question(&["yes", "no"], 0)])).is_ok());
    }

    #[test]
    fn test_empty_quiz_rejected() {
        assert!(matches!(
            QuizSnapshot::from_data(quiz(vec![])),
            Err(QuizValidationError::NoQuestions)
        ));
    }

    #[test]
    fn test_three_options_rejected() {
        assert!(matches!(
            QuizSnapshot::from_data(quiz(vec![question(&["a", "b", "c"], 0)])),
            Err(QuizValidationError::BadOptionCount { index: 0, count: 3 })
        ));
    }

    #[test]
    fn test_correct_index_out_of_range_rejected() {
        assert!(matches!(
            QuizSnapshot::from_data(quiz(vec![question(&["a", "b"], 2)])),
            Err(QuizValidationError::CorrectIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_blank_prompt_rejected() {
        let mut q = question(&["a", "b"], 0);
        q.prompt = "   ".into();
        assert!(matches!(
            QuizSnapshot::from_data(quiz(vec![q])),
            Err(QuizValidationError::EmptyPrompt { index: 0 })
        ));
    }

    #[test]
    fn test_blank_option_rejected() {
        assert!(matches!(
            QuizSnapshot::from_data(quiz(vec![question(&["a", ""], 0)])),
            Err(QuizValidationError::EmptyOption {
                index: 0,
                option: 1
            })
        ));
    }

    #[test]
    fn test_view_hides_correct_index_and_numbers_from_one() {
        let snapshot = QuizSnapshot::from_data(quiz(vec![
            question(&["3", "4", "5", "6"], 1),
            question(&["yes", "no"], 0),
        ]))
        .unwrap();
        let view = snapshot.view(1, 20).unwrap();
        assert_eq!(view.question_number, 2);
        assert_eq!(view.total_questions, 2);
        assert_eq!(view.time_limit_seconds, 20);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("correct_index").is_none());
    }

    #[test]
    fn test_quiz_data_bonus_defaults_false() {
        let json = r#"{
            "title": "T",
            "questions": [
                {"id":"a","prompt":"p","options":["x","y"],"correct_index":0}
            ]
        }"#;
        let data: QuizData = serde_json::from_str(json).unwrap();
        assert!(!data.questions[0].is_bonus);
    }
}
