use chrono::prelude::*;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, Wrap},
    Frame,
};
use time_humanize::{Accuracy, HumanTime, Tense};

use stroop::color::palette;
use stroop::summary::Rating;
use stroop::util::std_dev;

use crate::{App, AppState, SetupField};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

pub fn render(app: &App, f: &mut Frame) {
    match app.state {
        AppState::Setup => draw_setup(app, f),
        AppState::Testing => draw_testing(app, f),
        AppState::Results => draw_results(app, f),
        AppState::History => draw_history(app, f),
    }
}

fn chunks(f: &Frame, constraints: &[Constraint]) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(constraints)
        .split(f.area())
}

fn field_style(app: &App, field: SetupField) -> Style {
    if app.setup.field == field {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn draw_setup(app: &App, f: &mut Frame) {
    let chunks = chunks(
        f,
        &[
            Constraint::Length(3), // title
            Constraint::Length(6), // fields
            Constraint::Length(2), // error
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ],
    );

    let title = Paragraph::new("stroop")
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let cursor = if app.setup.field == SetupField::User {
        "_"
    } else {
        ""
    };
    let fields = vec![
        Line::from(Span::styled(
            format!("user        {}{}", app.setup.user, cursor),
            field_style(app, SetupField::User),
        )),
        Line::from(Span::styled(
            format!("variant     < {} >", app.setup.variant),
            field_style(app, SetupField::Variant),
        )),
        Line::from(Span::styled(
            format!(
                "difficulty  < {} >  ({} colors, {} ms)",
                app.setup.difficulty,
                app.setup.difficulty.palette_size(),
                app.setup.difficulty.default_timeout().as_millis(),
            ),
            field_style(app, SetupField::Difficulty),
        )),
        Line::from(Span::styled(
            format!("trials      < {} >", app.setup.trials),
            field_style(app, SetupField::Trials),
        )),
    ];
    f.render_widget(
        Paragraph::new(fields).block(Block::default().borders(Borders::ALL).title("new session")),
        chunks[1],
    );

    if let Some(error) = &app.setup.error {
        let error = Paragraph::new(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center);
        f.render_widget(error, chunks[2]);
    }

    let legend = Paragraph::new(Span::styled(
        "(tab) field / (←/→) change / (enter) start / (h)istory / (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ));
    f.render_widget(legend, chunks[4]);
}

fn draw_testing(app: &App, f: &mut Frame) {
    let (Some(engine), Some(presentation)) = (&app.engine, &app.current) else {
        return;
    };
    let Some(config) = engine.config() else {
        return;
    };

    let chunks = chunks(
        f,
        &[
            Constraint::Length(1), // progress
            Constraint::Min(3),    // stimulus
            Constraint::Length(1), // time gauge
            Constraint::Length(1),
            Constraint::Length(1), // answer keys
            Constraint::Length(1),
            Constraint::Length(1), // legend
        ],
    );

    let trial = &presentation.trial;
    let progress = Paragraph::new(Span::styled(
        format!(
            "{} / {}   {} · {}",
            trial.index + 1,
            config.trials,
            config.variant,
            config.difficulty
        ),
        Style::default().add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center);
    f.render_widget(progress, chunks[0]);

    // The stimulus itself: the word rendered in its ink color. Vertically
    // centered within its chunk.
    let stimulus_area = chunks[1];
    let pad = stimulus_area.height.saturating_sub(1) / 2;
    let stimulus_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(pad),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(stimulus_area);
    let stimulus = Paragraph::new(Span::styled(
        trial.word.clone(),
        Style::default()
            .fg(trial.ink.terminal())
            .add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center);
    f.render_widget(stimulus, stimulus_chunks[1]);

    let timeout_ms = presentation.timeout.as_millis().max(1) as f64;
    let remaining_ms = engine.remaining_ms().unwrap_or(0) as f64;
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::DarkGray))
        .ratio((remaining_ms / timeout_ms).clamp(0.0, 1.0))
        .label(format!("{:.0} ms", remaining_ms));
    f.render_widget(gauge, chunks[2]);

    let mut keys: Vec<Span> = Vec::new();
    for (i, ink) in palette(config.difficulty).iter().enumerate() {
        if i > 0 {
            keys.push(Span::raw("   "));
        }
        let hotkey = if i < 9 { (b'1' + i as u8) as char } else { '0' };
        keys.push(Span::styled(
            format!("({hotkey}) {}", ink.name()),
            Style::default()
                .fg(ink.terminal())
                .add_modifier(Modifier::BOLD),
        ));
    }
    f.render_widget(
        Paragraph::new(Line::from(keys))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        chunks[4],
    );

    let prompt = match config.variant {
        stroop::config::Variant::Reverse => "name the word, not the ink",
        _ => "name the ink color, not the word",
    };
    let legend = Paragraph::new(Span::styled(
        format!("{prompt} / (esc) abort"),
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);
    f.render_widget(legend, chunks[6]);
}

fn rating_color(rating: Rating) -> Color {
    match rating {
        Rating::Excellent => Color::Rgb(0xff, 0xd7, 0x00),
        Rating::VeryGood => Color::Rgb(0x48, 0xbb, 0x78),
        Rating::Good => Color::Rgb(0x42, 0x99, 0xe1),
        Rating::Fair => Color::Rgb(0xed, 0x89, 0x36),
        Rating::NeedsImprovement => Color::Rgb(0xe5, 0x3e, 0x3e),
    }
}

fn draw_results(app: &App, f: &mut Frame) {
    let Some(outcome) = &app.outcome else {
        return;
    };

    let chunks = chunks(
        f,
        &[
            Constraint::Length(3), // title
            Constraint::Length(1), // stats
            Constraint::Length(1), // rating
            Constraint::Length(1), // timeouts
            Constraint::Length(1),
            Constraint::Length(2), // save/export notes
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ],
    );

    let title = Paragraph::new(format!(
        "session results · {} · {}",
        outcome.summary.variant, outcome.summary.difficulty
    ))
    .block(Block::default().borders(Borders::ALL))
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let times: Vec<f64> = outcome
        .result
        .records
        .iter()
        .map(|r| r.elapsed_ms as f64)
        .collect();
    let sd = std_dev(&times).unwrap_or(0.0);
    let stats = Paragraph::new(Span::styled(
        format!(
            "{:.1}% acc   {:.0} ms mean RT   {:.0} ms sd",
            outcome.summary.accuracy, outcome.summary.mean_reaction_time_ms, sd
        ),
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center);
    f.render_widget(stats, chunks[1]);

    let rating = Paragraph::new(Span::styled(
        format!("rating: {}", outcome.rating),
        Style::default()
            .fg(rating_color(outcome.rating))
            .add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center);
    f.render_widget(rating, chunks[2]);

    let timeouts = outcome
        .result
        .records
        .iter()
        .filter(|r| !matches!(r.answer, stroop::evaluate::CapturedAnswer::Answered(_)))
        .count();
    let detail = Paragraph::new(Span::styled(
        format!(
            "{} trials, {} timed out",
            outcome.result.records.len(),
            timeouts
        ),
        Style::default().add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center);
    f.render_widget(detail, chunks[3]);

    let mut notes: Vec<Line> = Vec::new();
    if let Some(save_error) = &outcome.save_error {
        notes.push(Line::from(Span::styled(
            format!("results not saved: {save_error}"),
            Style::default().fg(Color::Red),
        )));
    }
    if let Some(note) = &outcome.export_note {
        notes.push(Line::from(Span::styled(
            note.clone(),
            Style::default().fg(Color::Gray),
        )));
    }
    f.render_widget(
        Paragraph::new(notes).alignment(Alignment::Center),
        chunks[5],
    );

    let legend = Paragraph::new(Span::styled(
        "(r)etry / (n)ew / (h)istory / (e)xport / (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ));
    f.render_widget(legend, chunks[7]);
}

fn humanize(timestamp: DateTime<Local>) -> String {
    let age = Local::now()
        .signed_duration_since(timestamp)
        .to_std()
        .unwrap_or_default();
    HumanTime::from(age).to_text_en(Accuracy::Rough, Tense::Past)
}

fn draw_history(app: &App, f: &mut Frame) {
    let chunks = chunks(
        f,
        &[
            Constraint::Length(3), // header
            Constraint::Min(0),    // table
            Constraint::Length(1), // legend
        ],
    );

    let Some(profile) = &app.history.profile else {
        let message = app
            .history
            .load_error
            .clone()
            .unwrap_or_else(|| "no history yet".to_string());
        let empty = Paragraph::new(message)
            .block(Block::default().borders(Borders::ALL).title("history"))
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
        f.render_widget(empty, chunks[0]);
        let legend = Paragraph::new(Span::styled(
            "(b)ack / (esc)ape",
            Style::default().add_modifier(Modifier::ITALIC),
        ));
        f.render_widget(legend, chunks[2]);
        return;
    };

    let header_text = format!(
        "{} · {} sessions · best {:.1}% · mean {:.1}% · mean RT {:.0} ms",
        profile.name,
        profile.sessions(),
        profile.best_accuracy().unwrap_or(0.0),
        profile.mean_accuracy().unwrap_or(0.0),
        profile.mean_reaction_time_ms().unwrap_or(0.0),
    );
    let header = Paragraph::new(header_text)
        .block(Block::default().borders(Borders::ALL).title("history"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(header, chunks[0]);

    let table_height = chunks[1].height.saturating_sub(3) as usize;
    let recent = profile.recent(profile.sessions());
    let max_scroll = recent.len().saturating_sub(table_height.max(1));
    let offset = app.history.scroll_offset.min(max_scroll);

    let rows: Vec<Row> = recent
        .iter()
        .skip(offset)
        .take(table_height.max(1))
        .map(|summary| {
            Row::new(vec![
                Cell::from(humanize(summary.timestamp)),
                Cell::from(summary.variant.to_string()),
                Cell::from(summary.difficulty.to_string()),
                Cell::from(format!("{:.1}%", summary.accuracy)),
                Cell::from(format!("{:.0} ms", summary.mean_reaction_time_ms)),
                Cell::from(summary.rating().to_string())
                    .style(Style::default().fg(rating_color(summary.rating()))),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        &[
            Constraint::Length(20),
            Constraint::Length(11),
            Constraint::Length(11),
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Length(18),
        ],
    )
    .header(
        Row::new(vec!["when", "variant", "difficulty", "acc", "mean RT", "rating"]).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("recent sessions"),
    );
    f.render_widget(table, chunks[1]);

    let legend = Paragraph::new(Span::styled(
        "(↑/↓) scroll / (b)ack / (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ));
    f.render_widget(legend, chunks[2]);
}
