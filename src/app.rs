use std::cell::RefCell;
use std::rc::Rc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use crate::error::SessionError;
use crate::quiz::{AnswerTally, Quiz};
use crate::runtime::{FixedTicker, GameEvent, TickTask};
use crate::session::Screen;

/// What the event loop should do after handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Presentation layer: maps keys to quiz intents and owns the tick task
/// while a quiz is being played.
pub struct App {
    pub quiz: Quiz,
    /// "Quit this quiz?" prompt is showing
    pub confirm_quit: bool,
    tally: Rc<RefCell<AnswerTally>>,
    ticker: FixedTicker,
    tick: Option<TickTask>,
}

impl App {
    pub fn new(mut quiz: Quiz, ticker: FixedTicker) -> Self {
        let tally = Rc::new(RefCell::new(AnswerTally::default()));
        let sink = Rc::clone(&tally);
        quiz.set_answer_listener(Box::new(move |correct| sink.borrow_mut().record(correct)));

        let mut app = Self {
            quiz,
            confirm_quit: false,
            tally,
            ticker,
            tick: None,
        };
        app.sync_tick();
        app
    }

    /// Answers reported so far in the current quiz
    pub fn tally(&self) -> AnswerTally {
        *self.tally.borrow()
    }

    pub fn tick_task(&self) -> Option<&TickTask> {
        self.tick.as_ref()
    }

    /// Start ticking on entering Playing, cancel the moment we leave it
    fn sync_tick(&mut self) {
        match (self.quiz.screen(), self.tick.is_some()) {
            (Screen::Playing, false) => self.tick = Some(TickTask::start(&self.ticker)),
            (Screen::Playing, true) => {}
            (_, _) => {
                if let Some(task) = self.tick.take() {
                    task.cancel();
                }
            }
        }
    }

    pub fn on_event(&mut self, event: GameEvent) -> Flow {
        match event {
            GameEvent::Tick => {
                if self.tick.as_ref().is_some_and(TickTask::is_live) {
                    self.quiz.on_tick();
                }
                Flow::Continue
            }
            GameEvent::Resize => Flow::Continue,
            GameEvent::Closed => Flow::Quit,
            GameEvent::Key(key) => self.on_key(key),
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Flow::Quit;
        }

        let result = match self.quiz.screen() {
            Screen::Start => match key.code {
                KeyCode::Enter | KeyCode::Char('s') => {
                    *self.tally.borrow_mut() = AnswerTally::default();
                    self.quiz.start_game()
                }
                KeyCode::Esc | KeyCode::Char('q') => return Flow::Quit,
                _ => Ok(()),
            },
            Screen::Playing if self.confirm_quit => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.confirm_quit = false;
                    self.quiz.abandon_session()
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.confirm_quit = false;
                    Ok(())
                }
                _ => Ok(()),
            },
            Screen::Playing => self.on_playing_key(key.code),
            Screen::Finished => match key.code {
                KeyCode::Enter if self.quiz.state().chest_open => self.quiz.claim_reward(),
                KeyCode::Enter | KeyCode::Char('o') => self.quiz.open_reward(),
                KeyCode::Char('g') => self.quiz.claim_reward(),
                KeyCode::Esc | KeyCode::Char('q') => return Flow::Quit,
                _ => Ok(()),
            },
        };

        if let Err(e) = result {
            debug!(error = %e, "intent rejected");
        }
        self.sync_tick();
        Flow::Continue
    }

    fn on_playing_key(&mut self, code: KeyCode) -> Result<(), SessionError> {
        if code == KeyCode::Esc {
            self.confirm_quit = true;
            return Ok(());
        }

        match self.quiz.state().last_answer_correct {
            None => match code {
                KeyCode::Char(c) => {
                    self.quiz.type_char(c);
                    Ok(())
                }
                KeyCode::Backspace => {
                    self.quiz.backspace();
                    Ok(())
                }
                KeyCode::Enter => self.quiz.submit_pending().map(|_| ()),
                _ => Ok(()),
            },
            Some(correct) => match code {
                KeyCode::Char('r') if !correct => self.quiz.retry_question(),
                KeyCode::Enter | KeyCode::Char('n') => self.quiz.advance(),
                _ => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Question;
    use crate::session::SessionSnapshot;
    use crate::storage::GameStore;
    use crate::timer::ManualClock;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with(store: GameStore) -> App {
        let quiz = Quiz::new(
            store,
            Box::new(ManualClock::new(0)),
            Box::new(StdRng::seed_from_u64(11)),
            2,
        );
        App::new(quiz, FixedTicker::new(Duration::from_millis(10)))
    }

    fn type_answer(app: &mut App) {
        let answer = app.quiz.state().question.unwrap().answer;
        for c in answer.to_string().chars() {
            app.on_key(key(KeyCode::Char(c)));
        }
        app.on_key(key(KeyCode::Enter));
    }

    #[test]
    fn start_key_begins_quiz_and_ticking() {
        let mut app = app_with(GameStore::in_memory());
        assert!(app.tick_task().is_none());

        app.on_key(key(KeyCode::Enter));

        assert_eq!(app.quiz.screen(), Screen::Playing);
        assert!(app.tick_task().is_some_and(TickTask::is_live));
    }

    #[test]
    fn full_keyboard_playthrough() {
        let mut app = app_with(GameStore::in_memory());
        app.on_key(key(KeyCode::Char('s')));

        for _ in 0..2 {
            type_answer(&mut app);
            assert_eq!(app.quiz.state().last_answer_correct, Some(true));
            app.on_key(key(KeyCode::Enter));
        }

        assert_eq!(app.quiz.screen(), Screen::Finished);
        assert!(app.tick_task().is_none());
        assert_eq!(app.tally().correct, 2);

        app.on_key(key(KeyCode::Enter));
        assert!(app.quiz.state().chest_open);
        app.on_key(key(KeyCode::Enter));

        assert_eq!(app.quiz.screen(), Screen::Start);
        assert_eq!(app.quiz.state().gems.total(), 1);
    }

    #[test]
    fn wrong_answer_retry_with_r() {
        let mut app = app_with(GameStore::in_memory());
        app.on_key(key(KeyCode::Enter));
        let question = app.quiz.state().question;

        // 0 is never a product of 1..=9
        app.on_key(key(KeyCode::Char('0')));
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.quiz.state().last_answer_correct, Some(false));

        app.on_key(key(KeyCode::Char('r')));

        assert_eq!(app.quiz.state().last_answer_correct, None);
        assert_eq!(app.quiz.state().question, question);
        assert_eq!(app.quiz.state().question_index, 1);
    }

    #[test]
    fn escape_asks_before_abandoning() {
        let mut app = app_with(GameStore::in_memory());
        app.on_key(key(KeyCode::Enter));

        app.on_key(key(KeyCode::Esc));
        assert!(app.confirm_quit);
        app.on_key(key(KeyCode::Char('n')));
        assert!(!app.confirm_quit);
        assert_eq!(app.quiz.screen(), Screen::Playing);

        app.on_key(key(KeyCode::Esc));
        app.on_key(key(KeyCode::Char('y')));

        assert_eq!(app.quiz.screen(), Screen::Start);
        assert!(app.tick_task().is_none());
    }

    #[test]
    fn ticks_after_leaving_playing_are_ignored() {
        let store = GameStore::in_memory();
        store.save_snapshot(&SessionSnapshot {
            screen: Some(Screen::Playing),
            question_index: Some(1),
            total_questions: Some(2),
            question: Some(Question::new(2, 3)),
            started_at_ms: Some(0),
            ..SessionSnapshot::default()
        });
        let mut app = app_with(store);
        let token = app.tick_task().unwrap().token();

        app.on_key(key(KeyCode::Esc));
        app.on_key(key(KeyCode::Char('y')));

        assert!(token.is_cancelled());
        assert_eq!(app.on_event(GameEvent::Tick), Flow::Continue);
        assert_eq!(app.quiz.state().elapsed_ms, 0);
    }

    #[test]
    fn ctrl_c_and_escape_quit() {
        let mut app = app_with(GameStore::in_memory());
        assert_eq!(
            app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Flow::Quit
        );
        assert_eq!(app.on_key(key(KeyCode::Esc)), Flow::Quit);
        assert_eq!(app.on_event(GameEvent::Closed), Flow::Quit);
    }
}
