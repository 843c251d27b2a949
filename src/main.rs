pub mod ui;

use std::error::Error;
use std::io::{self, stdin};
use std::path::PathBuf;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use stroop::app_dirs::AppDirs;
use stroop::config::{
    Difficulty, FilePreferencesStore, Preferences, PreferencesStore, TestConfiguration, Variant,
};
use stroop::engine::{SessionEngine, SessionResult, SessionStep, TrialPresentation};
use stroop::export;
use stroop::profile::{JsonProfileStore, ProfileError, ProfileStore, UserProfile};
use stroop::runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner};
use stroop::summary::{summarize, Rating, SessionSummary};
use stroop::color;

const TICK_RATE_MS: u64 = 50;

/// Trial counts offered by the setup screen.
const TRIAL_CHOICES: [usize; 4] = [10, 20, 30, 50];

/// terminal stroop-effect test with timed trials and per-user history
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal Stroop-effect test. Name the ink color (or the word, in the \
reverse variant) of timed stimuli; accuracy and reaction times are rated and \
recorded per user."
)]
pub struct Cli {
    /// user profile to record results under
    #[clap(short = 'u', long)]
    user: Option<String>,

    /// test variant to preselect
    #[clap(short = 'v', long, value_enum)]
    variant: Option<Variant>,

    /// difficulty level to preselect
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// number of trials per session
    #[clap(short = 't', long)]
    trials: Option<usize>,

    /// per-trial timeout in milliseconds (default follows difficulty)
    #[clap(long)]
    timeout_ms: Option<u64>,

    /// fraction of congruent trials for classic/reverse sessions
    #[clap(long)]
    congruent_ratio: Option<f64>,

    /// profile file to use instead of the default location
    #[clap(long)]
    profile_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Setup,
    Testing,
    Results,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupField {
    User,
    Variant,
    Difficulty,
    Trials,
}

#[derive(Debug, Clone)]
pub struct SetupState {
    pub user: String,
    pub variant: Variant,
    pub difficulty: Difficulty,
    pub trials: usize,
    pub field: SetupField,
    pub error: Option<String>,
}

impl SetupState {
    fn from_preferences(prefs: &Preferences, cli: &Cli) -> Self {
        Self {
            user: cli.user.clone().unwrap_or_else(|| prefs.user.clone()),
            variant: cli.variant.unwrap_or(prefs.variant),
            difficulty: cli.difficulty.unwrap_or(prefs.difficulty),
            trials: cli.trials.unwrap_or(prefs.trials),
            field: SetupField::User,
            error: None,
        }
    }
}

/// Everything the results screen shows for the just-finished session.
#[derive(Debug)]
pub struct SessionOutcome {
    pub result: SessionResult,
    pub summary: SessionSummary,
    pub rating: Rating,
    pub save_error: Option<String>,
    pub export_note: Option<String>,
}

#[derive(Debug, Default)]
pub struct HistoryState {
    pub profile: Option<UserProfile>,
    pub load_error: Option<String>,
    pub scroll_offset: usize,
}

pub struct App {
    pub cli: Cli,
    pub state: AppState,
    pub setup: SetupState,
    pub engine: Option<SessionEngine>,
    pub current: Option<TrialPresentation>,
    pub outcome: Option<SessionOutcome>,
    pub history: HistoryState,
    pub should_quit: bool,
    prefs_store: FilePreferencesStore,
    profile_store: JsonProfileStore,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        let prefs_store = FilePreferencesStore::new();
        let profile_store = match &cli.profile_file {
            Some(path) => JsonProfileStore::with_path(path),
            None => JsonProfileStore::new(),
        };
        Self::with_stores(cli, prefs_store, profile_store)
    }

    pub fn with_stores(
        cli: Cli,
        prefs_store: FilePreferencesStore,
        profile_store: JsonProfileStore,
    ) -> Self {
        let prefs = prefs_store.load();
        Self {
            setup: SetupState::from_preferences(&prefs, &cli),
            cli,
            state: AppState::Setup,
            engine: None,
            current: None,
            outcome: None,
            history: HistoryState::default(),
            should_quit: false,
            prefs_store,
            profile_store,
        }
    }

    fn session_config(&self) -> TestConfiguration {
        let mut config = TestConfiguration::new(self.setup.variant, self.setup.difficulty);
        config.trials = self.setup.trials;
        if let Some(ms) = self.cli.timeout_ms {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(ratio) = self.cli.congruent_ratio {
            config.congruent_ratio = ratio;
        }
        config
    }

    pub fn start_session(&mut self) {
        let user = self.setup.user.trim().to_string();
        if user.is_empty() {
            self.setup.error = Some("enter a user name first".into());
            self.state = AppState::Setup;
            return;
        }

        let mut engine = SessionEngine::new();
        match engine.start(self.session_config()) {
            Ok(presentation) => {
                self.setup.error = None;
                let _ = self.prefs_store.save(&Preferences {
                    user,
                    variant: self.setup.variant,
                    difficulty: self.setup.difficulty,
                    trials: self.setup.trials,
                });
                self.engine = Some(engine);
                self.current = Some(presentation);
                self.outcome = None;
                self.state = AppState::Testing;
            }
            Err(e) => {
                self.setup.error = Some(e.to_string());
                self.state = AppState::Setup;
            }
        }
    }

    pub fn on_tick(&mut self) {
        if self.state != AppState::Testing {
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if engine.trial_expired() {
            let index = engine.current_trial().map(|t| t.index);
            if let Some(index) = index {
                // A submit that lands between the expiry check and this call
                // makes the timeout stale; the engine rejects it, we move on.
                if let Ok(step) = engine.timeout(index) {
                    self.apply_step(step);
                }
            }
        }
    }

    /// Map an answer hotkey ('1'..'9', '0' for the tenth) onto the palette.
    fn submit_option(&mut self, key: char) {
        let option = match key {
            '1'..='9' => key as usize - '1' as usize,
            '0' => 9,
            _ => return,
        };
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let Some(config) = engine.config() else {
            return;
        };
        let palette = color::palette(config.difficulty);
        if option >= palette.len() {
            return;
        }
        let answer = palette[option].name();
        let index = match engine.current_trial() {
            Some(trial) => trial.index,
            None => return,
        };
        if let Ok(step) = engine.submit(index, answer) {
            self.apply_step(step);
        }
    }

    fn apply_step(&mut self, step: SessionStep) {
        match step {
            SessionStep::Next(presentation) => self.current = Some(presentation),
            SessionStep::Finished(result) => self.finish_session(result),
        }
    }

    fn finish_session(&mut self, result: SessionResult) {
        let summary = summarize(&result);
        let rating = summary.rating();
        // Persistence failure degrades gracefully: the in-memory result
        // stands and the error is surfaced on the results screen.
        let save_error = self.persist(&summary).err().map(|e| e.to_string());
        self.outcome = Some(SessionOutcome {
            result,
            summary,
            rating,
            save_error,
            export_note: None,
        });
        self.engine = None;
        self.current = None;
        self.state = AppState::Results;
    }

    fn persist(&self, summary: &SessionSummary) -> Result<(), ProfileError> {
        let mut profile = self.profile_store.load_or_create(self.setup.user.trim())?;
        profile.merge(summary.clone());
        self.profile_store.save(&profile)
    }

    fn abort_session(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            let _ = engine.abort();
        }
        self.engine = None;
        self.current = None;
        self.state = AppState::Setup;
    }

    fn export_session(&mut self) {
        let Some(outcome) = self.outcome.as_mut() else {
            return;
        };
        let dir = AppDirs::export_dir().unwrap_or_else(|| PathBuf::from("."));
        let path = dir.join(export::default_file_name(&outcome.result));
        outcome.export_note = Some(match export::export_csv(&path, &outcome.result) {
            Ok(()) => format!("exported {}", path.display()),
            Err(e) => format!("export failed: {e}"),
        });
    }

    fn open_history(&mut self) {
        self.history = HistoryState::default();
        match self.profile_store.load(self.setup.user.trim()) {
            Ok(profile) => self.history.profile = Some(profile),
            Err(e) => self.history.load_error = Some(e.to_string()),
        }
        self.state = AppState::History;
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.state {
            AppState::Setup => self.on_setup_key(key),
            AppState::Testing => match key.code {
                KeyCode::Esc => self.abort_session(),
                KeyCode::Char(c) => self.submit_option(c),
                _ => {}
            },
            AppState::Results => match key.code {
                KeyCode::Esc => self.should_quit = true,
                KeyCode::Char('r') => self.start_session(),
                KeyCode::Char('n') => self.state = AppState::Setup,
                KeyCode::Char('h') => self.open_history(),
                KeyCode::Char('e') => self.export_session(),
                _ => {}
            },
            AppState::History => match key.code {
                KeyCode::Esc => self.should_quit = true,
                KeyCode::Char('b') | KeyCode::Backspace => {
                    self.state = if self.outcome.is_some() {
                        AppState::Results
                    } else {
                        AppState::Setup
                    };
                }
                KeyCode::Up => {
                    self.history.scroll_offset = self.history.scroll_offset.saturating_sub(1);
                }
                KeyCode::Down => {
                    self.history.scroll_offset += 1;
                }
                _ => {}
            },
        }
    }

    fn on_setup_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => self.start_session(),
            KeyCode::Tab | KeyCode::Down => self.setup.field = next_field(self.setup.field),
            KeyCode::BackTab | KeyCode::Up => self.setup.field = prev_field(self.setup.field),
            KeyCode::Left => self.cycle_setup_value(false),
            KeyCode::Right => self.cycle_setup_value(true),
            KeyCode::Backspace => {
                if self.setup.field == SetupField::User {
                    self.setup.user.pop();
                }
            }
            KeyCode::Char('h') if self.setup.field != SetupField::User => self.open_history(),
            KeyCode::Char(c) => {
                if self.setup.field == SetupField::User && !c.is_control() {
                    self.setup.user.push(c);
                }
            }
            _ => {}
        }
    }

    fn cycle_setup_value(&mut self, forward: bool) {
        match self.setup.field {
            SetupField::User => {}
            SetupField::Variant => {
                self.setup.variant = cycle(&Variant::ALL, self.setup.variant, forward);
            }
            SetupField::Difficulty => {
                self.setup.difficulty = cycle(&Difficulty::ALL, self.setup.difficulty, forward);
            }
            SetupField::Trials => {
                self.setup.trials = cycle(&TRIAL_CHOICES, self.setup.trials, forward);
            }
        }
    }
}

fn cycle<T: Copy + PartialEq>(choices: &[T], current: T, forward: bool) -> T {
    let pos = choices.iter().position(|c| *c == current).unwrap_or(0);
    let next = if forward {
        (pos + 1) % choices.len()
    } else {
        (pos + choices.len() - 1) % choices.len()
    };
    choices[next]
}

fn next_field(field: SetupField) -> SetupField {
    match field {
        SetupField::User => SetupField::Variant,
        SetupField::Variant => SetupField::Difficulty,
        SetupField::Difficulty => SetupField::Trials,
        SetupField::Trials => SetupField::User,
    }
}

fn prev_field(field: SetupField) -> SetupField {
    match field {
        SetupField::User => SetupField::Trials,
        SetupField::Variant => SetupField::User,
        SetupField::Difficulty => SetupField::Variant,
        SetupField::Trials => SetupField::Difficulty,
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(cli);
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let result = run(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<CrosstermEventSource, FixedTicker>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui::render(app, f))?;

        match runner.step() {
            AppEvent::Tick => app.on_tick(),
            AppEvent::Resize => {}
            AppEvent::Key(key) => app.on_key(key),
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
