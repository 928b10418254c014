use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use matebuf::{
    app::{App, Flow},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore, MAX_QUESTIONS},
    logging,
    quiz::Quiz,
    runtime::{CrosstermEventSource, FixedTicker, GameEventSource, Runner},
    storage::{GameStore, MemoryBackend, SqliteBackend},
    ui,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};
use tracing::{info, warn};

/// multiplication table quiz for the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Practice the 1-9 multiplication table against the clock, beat your best time and collect a gem from the treasure chest after every round."
)]
pub struct Cli {
    /// number of questions per quiz (overrides the config file)
    #[clap(short = 'q', long, value_parser = clap::value_parser!(u16).range(1..=MAX_QUESTIONS as i64))]
    questions: Option<u16>,

    /// path to the progress database
    #[clap(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// forget gems, best time and any saved quiz before starting
    #[clap(long)]
    reset: bool,

    /// write a log file (defaults to the state directory)
    #[clap(long, value_name = "PATH", num_args = 0..=1)]
    log: Option<Option<PathBuf>>,
}

impl Cli {
    fn config(&self, base: Config) -> Config {
        Config {
            total_questions: self
                .questions
                .map_or(base.total_questions, usize::from),
            ..base
        }
        .sanitized()
    }

    fn log_path(&self) -> Option<PathBuf> {
        match &self.log {
            Some(Some(path)) => Some(path.clone()),
            Some(None) => AppDirs::log_path(),
            None => None,
        }
    }
}

fn open_store(cli: &Cli) -> GameStore {
    let path = cli.db.clone().or_else(AppDirs::db_path);
    let opened = match path {
        Some(path) => SqliteBackend::open(&path).map(|backend| {
            info!(path = %path.display(), "opened progress database");
            backend
        }),
        None => Err(matebuf::error::StoreError::Unavailable),
    };

    match opened {
        Ok(backend) => GameStore::new(Box::new(backend)),
        Err(e) => {
            warn!(error = %e, "progress will not be saved this run");
            GameStore::new(Box::new(MemoryBackend::new()))
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Some(path) = cli.log_path() {
        logging::init_file(&path)?;
    }

    let config = cli.config(FileConfigStore::new().load());
    let store = open_store(&cli);
    if cli.reset {
        store.reset_all();
    }

    let quiz = Quiz::with_store(store, config.total_questions);
    let mut app = App::new(quiz, FixedTicker::new(Duration::from_millis(config.tick_ms)));

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, Runner::new(CrosstermEventSource::new()));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: GameEventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: Runner<E>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        let event = runner.step(app.tick_task());
        if app.on_event(event) == Flow::Quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matebuf::{
        runtime::{GameEvent, TestEventSource},
        session::Screen,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use std::sync::mpsc;

    #[test]
    fn questions_flag_overrides_config() {
        let cli = Cli::parse_from(["matebuf", "-q", "5"]);
        let cfg = cli.config(Config::default());
        assert_eq!(cfg.total_questions, 5);
    }

    #[test]
    fn config_kept_without_flag() {
        let cli = Cli::parse_from(["matebuf"]);
        let base = Config {
            total_questions: 12,
            ..Config::default()
        };
        assert_eq!(cli.config(base).total_questions, 12);
        assert!(cli.log_path().is_none());
    }

    #[test]
    fn questions_out_of_range_rejected() {
        assert!(Cli::try_parse_from(["matebuf", "--questions", "0"]).is_err());
        assert!(Cli::try_parse_from(["matebuf", "--questions", "51"]).is_err());
    }

    #[test]
    fn log_flag_with_and_without_path() {
        let cli = Cli::parse_from(["matebuf", "--log", "/tmp/quiz.log"]);
        assert_eq!(cli.log_path(), Some(PathBuf::from("/tmp/quiz.log")));

        let cli = Cli::parse_from(["matebuf", "--log"]);
        assert_eq!(cli.log_path(), AppDirs::log_path());
    }

    #[test]
    fn tui_loop_draws_until_quit() {
        let (tx, rx) = mpsc::channel();
        tx.send(GameEvent::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)))
            .unwrap();
        tx.send(GameEvent::Resize).unwrap();
        tx.send(GameEvent::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )))
        .unwrap();

        let quiz = Quiz::with_store(GameStore::in_memory(), 3);
        let mut app = App::new(quiz, FixedTicker::new(Duration::from_millis(50)));
        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();

        start_tui(&mut terminal, &mut app, Runner::new(TestEventSource::new(rx))).unwrap();

        assert_eq!(app.quiz.screen(), Screen::Playing);
    }
}
