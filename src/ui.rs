use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget, Wrap},
    Frame,
};

use crate::{
    app::App,
    game::{GemCount, GemKind},
    session::Screen,
    timer::format_duration,
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

pub fn gem_color(kind: GemKind) -> Color {
    match kind {
        GemKind::RubySmall => Color::Red,
        GemKind::TopazSmall => Color::Yellow,
        GemKind::SapphireSmall => Color::Blue,
    }
}

pub fn draw(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.quiz.screen() {
            Screen::Start => render_start(self, area, buf),
            Screen::Playing => {
                render_playing(self, area, buf);
                if self.confirm_quit {
                    render_confirm_quit(area, buf);
                }
            }
            Screen::Finished => render_finished(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn legend(text: &str) -> Paragraph<'_> {
    Paragraph::new(Span::styled(
        text,
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
}

fn gem_lines(gems: &GemCount) -> Vec<Line<'static>> {
    GemKind::ALL
        .iter()
        .map(|kind| {
            Line::from(vec![
                Span::styled("◆ ", Style::default().fg(gem_color(*kind))),
                Span::styled(format!("{:<9}", kind.to_string()), bold()),
                Span::raw(gems.get(*kind).to_string()),
            ])
        })
        .collect()
}

fn render_start(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2), // title
            Constraint::Length(3), // best time
            Constraint::Length(5), // gems
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled(
        "Mate Buf",
        bold().fg(Color::Cyan),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    // Read straight from the store; the in-memory best is cleared between sessions
    if let Some(best) = app.quiz.best_time_for_display() {
        Paragraph::new(vec![
            Line::from(Span::styled("Best Time", bold())),
            Line::from(format_duration(i64::try_from(best).unwrap_or(i64::MAX))),
        ])
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
    }

    Paragraph::new(gem_lines(&app.quiz.state().gems))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Gems Collected"),
        )
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    legend("(enter) start / (esc)ape").render(chunks[4], buf);
}

fn render_playing(app: &App, area: Rect, buf: &mut Buffer) {
    let state = app.quiz.state();
    let Some(question) = state.question else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // progress
            Constraint::Length(1), // question count + timer
            Constraint::Min(0),
            Constraint::Length(3), // question or result
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let answered = state.question_index.saturating_sub(1).min(state.total_questions);
    Gauge::default()
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(answered as f64 / state.total_questions.max(1) as f64)
        .label("")
        .render(chunks[0], buf);

    let tally = app.tally();
    Paragraph::new(Line::from(vec![
        Span::styled(
            format!("Question {} of {}", state.question_index, state.total_questions),
            bold(),
        ),
        Span::raw("   "),
        Span::styled(format!("✓ {}", tally.correct), Style::default().fg(Color::Green)),
        Span::raw(" "),
        Span::styled(format!("✗ {}", tally.incorrect), Style::default().fg(Color::Red)),
        Span::raw("   "),
        Span::styled(format_duration(state.elapsed_ms), Style::default().fg(Color::Cyan)),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let (body, keys) = match state.last_answer_correct {
        None => (
            vec![Line::from(vec![
                Span::styled(format!("{} × {} = ", question.a, question.b), bold()),
                Span::styled(
                    if state.pending_answer.is_empty() {
                        "_".to_string()
                    } else {
                        state.pending_answer.clone()
                    },
                    bold().add_modifier(Modifier::UNDERLINED),
                ),
            ])],
            "type your answer / (enter) submit / (esc) quit",
        ),
        Some(true) => (
            vec![
                Line::from(Span::styled("Correct!", bold().fg(Color::Green))),
                Line::from(format!("{} × {} = {}", question.a, question.b, question.answer)),
            ],
            if state.question_index < state.total_questions {
                "(enter) next question"
            } else {
                "(enter) finish game"
            },
        ),
        Some(false) => (
            vec![
                Line::from(Span::styled("Not quite!", bold().fg(Color::Red))),
                Line::from("Try again!"),
            ],
            "(r) try again / (enter) skip",
        ),
    };

    Paragraph::new(body)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);

    legend(keys).render(chunks[5], buf);
}

fn render_confirm_quit(area: Rect, buf: &mut Buffer) {
    let width = 36.min(area.width);
    let height = 3.min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    Clear.render(popup, buf);
    Paragraph::new("Are you sure you want to quit? (y/n)")
        .block(Block::default().borders(Borders::ALL))
        .style(bold().fg(Color::Yellow))
        .alignment(Alignment::Center)
        .render(popup, buf);
}

fn render_finished(app: &App, area: Rect, buf: &mut Buffer) {
    let state = app.quiz.state();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2), // headline
            Constraint::Length(3), // time
            Constraint::Min(0),
            Constraint::Length(3), // chest
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(vec![
        Line::from(Span::styled("Congratulations!", bold().fg(Color::Magenta))),
        Line::from("You completed the game!"),
    ])
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let time_style = if state.is_new_record {
        bold().fg(Color::Green)
    } else {
        bold()
    };
    let mut time_lines = vec![
        Line::from(Span::styled("Your Time", bold())),
        Line::from(Span::styled(format_duration(app.quiz.elapsed_ms()), time_style)),
    ];
    if state.is_new_record {
        time_lines.push(Line::from(Span::styled(
            "New Best Time!",
            bold().fg(Color::Green),
        )));
    }
    Paragraph::new(time_lines)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let (chest, keys) = match (state.chest_open, state.reward) {
        (true, Some(gem)) => (
            vec![
                Line::from("[ chest is open ]"),
                Line::from(vec![
                    Span::raw("You found a "),
                    Span::styled(gem.to_string(), bold().fg(gem_color(gem))),
                    Span::raw("!"),
                ]),
            ],
            "(enter) grab gem",
        ),
        _ => (
            vec![
                Line::from("[ closed chest ]"),
                Line::from("Open the chest to get your reward!"),
            ],
            "(enter) open chest / (esc)ape",
        ),
    };

    Paragraph::new(chest)
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    legend(keys).render(chunks[5], buf);
}
