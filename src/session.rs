use serde::{Deserialize, Serialize};

use crate::game::{GemCount, GemKind, Question};

pub const DEFAULT_TOTAL_QUESTIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Start,
    Playing,
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub screen: Screen,
    /// 1-based; `total_questions + 1` only transiently while completing
    pub question_index: usize,
    pub total_questions: usize,
    pub gems: GemCount,
    // Question form / result view
    pub pending_answer: String,
    pub last_answer_correct: Option<bool>,
    pub question: Option<Question>,
    // Timing
    pub started_at_ms: Option<i64>,
    pub elapsed_ms: i64,
    pub best_ms: Option<u64>,
    pub is_new_record: bool,
    // Reward
    pub chest_open: bool,
    pub reward: Option<GemKind>,
}

impl SessionState {
    /// Fresh Start-screen state carrying the collection forward
    pub fn start(total_questions: usize, gems: GemCount) -> Self {
        Self {
            screen: Screen::Start,
            question_index: 1,
            total_questions,
            gems,
            pending_answer: String::new(),
            last_answer_correct: None,
            question: None,
            started_at_ms: None,
            elapsed_ms: 0,
            best_ms: None,
            is_new_record: false,
            chest_open: false,
            reward: None,
        }
    }

    pub fn showing_result(&self) -> bool {
        self.last_answer_correct.is_some()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::start(DEFAULT_TOTAL_QUESTIONS, GemCount::default())
    }
}

/// The part of a session that survives a restart.
///
/// Every field is optional: which ones are written depends on the screen,
/// and anything read back from disk may be partial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen: Option<Screen>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_questions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chest_open: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<GemKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_new_record: Option<bool>,
}

impl SessionSnapshot {
    /// Fields needed to resume an in-progress quiz
    pub fn playing(state: &SessionState) -> Self {
        Self {
            screen: Some(Screen::Playing),
            question_index: Some(state.question_index),
            total_questions: Some(state.total_questions),
            question: state.question,
            started_at_ms: state.started_at_ms,
            ..Self::default()
        }
    }

    /// Fields needed to show the results screen again
    pub fn finished(state: &SessionState) -> Self {
        Self {
            screen: Some(Screen::Finished),
            elapsed_ms: Some(state.elapsed_ms),
            best_ms: state.best_ms,
            started_at_ms: state.started_at_ms,
            chest_open: Some(state.chest_open),
            reward: state.reward,
            is_new_record: Some(state.is_new_record),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_start() {
        let state = SessionState::default();

        assert_eq!(state.screen, Screen::Start);
        assert_eq!(state.question_index, 1);
        assert_eq!(state.total_questions, DEFAULT_TOTAL_QUESTIONS);
        assert!(state.question.is_none());
        assert!(state.started_at_ms.is_none());
        assert!(!state.showing_result());
        assert!(!state.chest_open);
        assert!(state.reward.is_none());
    }

    #[test]
    fn test_playing_snapshot_fields() {
        let mut state = SessionState::default();
        state.screen = Screen::Playing;
        state.question_index = 3;
        state.question = Some(Question::new(7, 8));
        state.started_at_ms = Some(1_000);
        state.best_ms = Some(9_000);

        let snapshot = SessionSnapshot::playing(&state);
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "screen": "playing",
                "question_index": 3,
                "total_questions": 10,
                "question": {"a": 7, "b": 8, "answer": 56},
                "started_at_ms": 1000
            })
        );
    }

    #[test]
    fn test_finished_snapshot_fields() {
        let mut state = SessionState::default();
        state.screen = Screen::Finished;
        state.elapsed_ms = 45_000;
        state.best_ms = Some(30_000);
        state.started_at_ms = Some(5);
        state.chest_open = true;
        state.reward = Some(GemKind::RubySmall);

        let json = serde_json::to_value(SessionSnapshot::finished(&state)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "screen": "finished",
                "elapsed_ms": 45000,
                "best_ms": 30000,
                "started_at_ms": 5,
                "chest_open": true,
                "reward": "ruby_small",
                "is_new_record": false
            })
        );
    }

    #[test]
    fn test_partial_snapshot_parses() {
        let snapshot: SessionSnapshot =
            serde_json::from_str(r#"{"screen":"playing","question_index":3}"#).unwrap();

        assert_eq!(snapshot.screen, Some(Screen::Playing));
        assert_eq!(snapshot.question_index, Some(3));
        assert!(snapshot.question.is_none());
    }

    #[test]
    fn test_screen_display() {
        assert_eq!(Screen::Start.to_string(), "Start");
        assert_eq!(Screen::Playing.to_string(), "Playing");
        assert_eq!(Screen::Finished.to_string(), "Finished");
    }
}
