use rand::RngCore;
use tracing::{debug, info};

use crate::config::MAX_QUESTIONS;
use crate::error::SessionError;
use crate::game::{generate_question, pick_gem, GemCount};
use crate::session::{Screen, SessionSnapshot, SessionState};
use crate::storage::GameStore;
use crate::timer::{is_new_best, Clock, SystemClock, Timer};

/// Longest answer the question form accepts; 9 x 9 needs two digits
pub const MAX_ANSWER_LEN: usize = 4;

/// Receives each answer outcome as the player moves past it
pub type AnswerListener = Box<dyn FnMut(bool)>;

/// Counts correct and incorrect answers reported by [`Quiz::advance`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerTally {
    pub correct: u32,
    pub incorrect: u32,
}

impl AnswerTally {
    pub fn record(&mut self, correct: bool) {
        if correct {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
    }
}

/// The session state machine: Start -> Playing -> Finished -> Start.
///
/// Owns the [`SessionState`] and is the only writer of it; every intent
/// runs to completion, including its persistence write, before returning.
pub struct Quiz {
    state: SessionState,
    default_total: usize,
    store: GameStore,
    timer: Timer,
    rng: Box<dyn RngCore>,
    on_answer: Option<AnswerListener>,
}

impl Quiz {
    /// Build a quiz from persisted state, resuming a saved session if one is valid
    pub fn new(
        store: GameStore,
        clock: Box<dyn Clock>,
        rng: Box<dyn RngCore>,
        total_questions: usize,
    ) -> Self {
        let total_questions = total_questions.max(1);
        let mut quiz = Self {
            state: SessionState::start(total_questions, store.load_gems()),
            default_total: total_questions,
            store,
            timer: Timer::new(clock),
            rng,
            on_answer: None,
        };
        quiz.rehydrate();
        quiz
    }

    /// Production wiring: system clock and thread-local RNG
    pub fn with_store(store: GameStore, total_questions: usize) -> Self {
        Self::new(
            store,
            Box::new(SystemClock),
            Box::new(rand::thread_rng()),
            total_questions,
        )
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn screen(&self) -> Screen {
        self.state.screen
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    pub fn set_answer_listener(&mut self, listener: AnswerListener) {
        self.on_answer = Some(listener);
    }

    fn rehydrate(&mut self) {
        // The persisted best always seeds the state; a snapshot may override it.
        self.state.best_ms = self.store.load_best_time();

        let Some(snapshot) = self.store.load_snapshot() else {
            return;
        };

        match snapshot.screen {
            Some(Screen::Playing) => {
                let (Some(index), Some(question), Some(started_at)) = (
                    snapshot.question_index,
                    snapshot.question,
                    snapshot.started_at_ms,
                ) else {
                    return self.discard_snapshot("incomplete playing snapshot");
                };
                let total = snapshot.total_questions.unwrap_or(self.default_total);
                if !(1..=MAX_QUESTIONS).contains(&total)
                    || index == 0
                    || index > total + 1
                    || started_at < 0
                    || !question.is_valid()
                {
                    return self.discard_snapshot("invalid playing snapshot");
                }

                self.state.screen = Screen::Playing;
                self.state.question_index = index;
                self.state.total_questions = total;
                self.state.question = Some(question);
                self.state.started_at_ms = Some(started_at);
                self.state.elapsed_ms = self.timer.elapsed(started_at);
                info!(index, total, "resumed quiz in progress");

                if index > total {
                    // Saved between the last answer and the results screen
                    self.complete();
                }
            }
            Some(Screen::Finished) => {
                let Some(elapsed) = snapshot.elapsed_ms else {
                    return self.discard_snapshot("finished snapshot without a time");
                };

                self.state.screen = Screen::Finished;
                self.state.elapsed_ms = elapsed;
                self.state.started_at_ms = snapshot.started_at_ms;
                if snapshot.best_ms.is_some() {
                    self.state.best_ms = snapshot.best_ms;
                }
                self.state.is_new_record = snapshot.is_new_record.unwrap_or(false);
                self.state.reward = snapshot.reward;
                self.state.chest_open = snapshot.chest_open.unwrap_or(false) && snapshot.reward.is_some();
                info!(elapsed, "resumed results screen");
            }
            Some(Screen::Start) | None => self.discard_snapshot("snapshot without a session"),
        }
    }

    fn discard_snapshot(&mut self, reason: &str) {
        debug!(reason, "discarding saved session");
        self.store.clear_snapshot();
    }

    fn require_screen(&self, intent: &'static str, screen: Screen) -> Result<(), SessionError> {
        if self.state.screen == screen {
            Ok(())
        } else {
            Err(SessionError::WrongScreen {
                intent,
                screen: self.state.screen,
            })
        }
    }

    fn persist(&self) {
        match self.state.screen {
            Screen::Playing => self.store.save_snapshot(&SessionSnapshot::playing(&self.state)),
            Screen::Finished => self.store.save_snapshot(&SessionSnapshot::finished(&self.state)),
            Screen::Start => self.store.clear_snapshot(),
        }
    }

    fn clear_answer(&mut self) {
        self.state.pending_answer.clear();
        self.state.last_answer_correct = None;
    }

    /// Start -> Playing with a fresh first question
    pub fn start_game(&mut self) -> Result<(), SessionError> {
        self.require_screen("start", Screen::Start)?;

        let question = generate_question(&mut self.rng);
        let now = self.timer.now_ms();

        self.state.screen = Screen::Playing;
        self.state.question_index = 1;
        self.state.question = Some(question);
        self.state.started_at_ms = Some(now);
        self.state.elapsed_ms = 0;
        self.state.is_new_record = false;
        self.clear_answer();
        self.persist();

        info!(total = self.state.total_questions, "quiz started");
        Ok(())
    }

    /// Edit the answer field; only digits are accepted
    pub fn type_char(&mut self, c: char) {
        if self.state.screen == Screen::Playing
            && !self.state.showing_result()
            && c.is_ascii_digit()
            && self.state.pending_answer.len() < MAX_ANSWER_LEN
        {
            self.state.pending_answer.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.state.screen == Screen::Playing && !self.state.showing_result() {
            self.state.pending_answer.pop();
        }
    }

    /// Check `raw` against the current question.
    ///
    /// Returns `Ok(None)` and changes nothing when `raw` is not an unsigned
    /// integer (signs, decimals, blanks). The outcome is not reported to the
    /// answer listener until [`Quiz::advance`].
    pub fn submit_answer(&mut self, raw: &str) -> Result<Option<bool>, SessionError> {
        self.require_screen("submit", Screen::Playing)?;
        if self.state.showing_result() {
            return Err(SessionError::ResultPending { intent: "submit" });
        }

        let text = raw.trim();
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            debug!(input = raw, "ignoring malformed answer");
            return Ok(None);
        }

        let Some(question) = self.state.question else {
            return Ok(None);
        };
        // Too large for u32 can never equal a single-digit product
        let correct = text.parse::<u32>().map_or(false, |v| v == question.answer);

        self.state.pending_answer = text.to_string();
        self.state.last_answer_correct = Some(correct);
        debug!(index = self.state.question_index, correct, "answer checked");
        Ok(Some(correct))
    }

    /// Submit whatever is in the answer field
    pub fn submit_pending(&mut self) -> Result<Option<bool>, SessionError> {
        let raw = self.state.pending_answer.clone();
        self.submit_answer(&raw)
    }

    /// Move past the result view: next question, or the results screen after the last
    pub fn advance(&mut self) -> Result<(), SessionError> {
        self.require_screen("advance", Screen::Playing)?;
        let Some(correct) = self.state.last_answer_correct else {
            return Err(SessionError::NoResult { intent: "advance" });
        };

        if let Some(listener) = self.on_answer.as_mut() {
            listener(correct);
        }

        self.state.question_index += 1;
        if self.state.question_index > self.state.total_questions {
            self.complete();
            return Ok(());
        }

        self.state.question = Some(generate_question(&mut self.rng));
        self.clear_answer();
        self.persist();
        Ok(())
    }

    fn complete(&mut self) {
        let elapsed = self
            .state
            .started_at_ms
            .map(|start| self.timer.elapsed(start))
            .unwrap_or(0);

        // A clock set backwards yields a negative time; show it as zero and
        // never let it claim a record.
        let is_record = elapsed >= 0 && is_new_best(elapsed as u64, self.state.best_ms);
        if is_record {
            self.store.save_best_time(elapsed as u64);
            self.state.best_ms = Some(elapsed as u64);
        }

        self.state.screen = Screen::Finished;
        self.state.elapsed_ms = elapsed.max(0);
        self.state.is_new_record = is_record;
        self.state.chest_open = false;
        self.state.reward = None;
        self.clear_answer();
        self.persist();

        info!(elapsed_ms = self.state.elapsed_ms, new_record = is_record, "quiz finished");
    }

    /// Back to the question form after a wrong answer, same question
    pub fn retry_question(&mut self) -> Result<(), SessionError> {
        self.require_screen("retry", Screen::Playing)?;
        match self.state.last_answer_correct {
            None => Err(SessionError::NoResult { intent: "retry" }),
            Some(true) => Err(SessionError::RetryAfterCorrect),
            Some(false) => {
                self.clear_answer();
                Ok(())
            }
        }
    }

    /// Open the chest once and reveal the reward
    pub fn open_reward(&mut self) -> Result<(), SessionError> {
        self.require_screen("open reward", Screen::Finished)?;
        if self.state.chest_open {
            return Err(SessionError::ChestAlreadyOpen);
        }

        let gem = pick_gem(&mut self.rng);
        self.state.chest_open = true;
        self.state.reward = Some(gem);
        self.persist();

        debug!(gem = %gem, "chest opened");
        Ok(())
    }

    /// Add the revealed gem to the collection and return to Start
    pub fn claim_reward(&mut self) -> Result<(), SessionError> {
        self.require_screen("claim reward", Screen::Finished)?;
        let Some(gem) = self.state.reward else {
            return Err(SessionError::ChestClosed);
        };

        let gems = self.store.add_gem(gem, &self.state.gems);
        self.reset_to_start(gems);
        info!(gem = %gem, "reward claimed");
        Ok(())
    }

    /// Leave a quiz in progress; confirmation is the caller's job
    pub fn abandon_session(&mut self) -> Result<(), SessionError> {
        self.require_screen("abandon", Screen::Playing)?;

        let gems = self.state.gems;
        self.reset_to_start(gems);
        info!("quiz abandoned");
        Ok(())
    }

    fn reset_to_start(&mut self, gems: GemCount) {
        // best_ms is dropped from memory only; the Start screen re-reads the store
        self.state = SessionState::start(self.default_total, gems);
        self.persist();
    }

    /// Refresh the live elapsed time; a no-op outside Playing
    pub fn on_tick(&mut self) {
        if self.state.screen != Screen::Playing {
            return;
        }
        if let Some(start) = self.state.started_at_ms {
            self.state.elapsed_ms = self.timer.elapsed(start);
        }
    }

    /// Live while playing, frozen once finished, zero on Start
    pub fn elapsed_ms(&self) -> i64 {
        match (self.state.screen, self.state.started_at_ms) {
            (Screen::Playing, Some(start)) => self.timer.elapsed(start),
            (Screen::Finished, _) => self.state.elapsed_ms,
            _ => 0,
        }
    }

    /// Best time as persisted, read fresh for the Start screen
    pub fn best_time_for_display(&self) -> Option<u64> {
        self.store.load_best_time()
    }
}
