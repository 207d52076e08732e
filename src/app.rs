use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::client::{ClientError, GeminiClient, Generator};
use crate::config::AppConfig;
use crate::form::ChannelInput;
use crate::markdown::MarkdownView;
use crate::prompt::GenerationRequest;
use crate::report::{spawn_generation, GenerationEvent, Report, ReportState};
use crate::theme::Theme;

/// Status messages clear after this many seconds
const STATUS_TIMEOUT_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Form,
    Report,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Topic,
    Audience,
    Goal,
    Experience,
    Capacity,
    Submit,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Topic,
        Field::Audience,
        Field::Goal,
        Field::Experience,
        Field::Capacity,
        Field::Submit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Topic => "Channel Topic",
            Field::Audience => "Target Audience",
            Field::Goal => "Primary Goal",
            Field::Experience => "Experience Level",
            Field::Capacity => "Posting Capacity",
            Field::Submit => "Generate Strategy",
        }
    }

    pub fn is_text(self) -> bool {
        matches!(self, Field::Topic | Field::Audience)
    }

    fn next(self) -> Option<Field> {
        let i = Self::ALL.iter().position(|f| *f == self)?;
        Self::ALL.get(i + 1).copied()
    }

    fn prev(self) -> Option<Field> {
        let i = Self::ALL.iter().position(|f| *f == self)?;
        i.checked_sub(1).map(|i| Self::ALL[i])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

pub struct App {
    pub section: Section,
    pub field: Field,
    pub popup: Popup,

    pub config: AppConfig,
    pub theme: Theme,
    pub input: ChannelInput,

    // Streaming report and its rendered form
    pub report: Report,
    pub view: MarkdownView,

    // Report scrolling; `follow` sticks the view to the bottom
    pub scroll: usize,
    pub follow: bool,
    pub viewport: u16,

    // Error banner under the button (validation / request failures)
    pub error: Option<String>,

    // Status message (footer, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    /// Advances every tick while generating, drives the spinners
    pub spinner: usize,

    generator: Option<Arc<dyn Generator>>,
    generation: u64,
    task: Option<JoinHandle<()>>,
    events_tx: UnboundedSender<GenerationEvent>,
    events_rx: UnboundedReceiver<GenerationEvent>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let theme = Theme::from_overrides(&config.theme);
        let input = config.defaults.clone();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            section: Section::Form,
            field: Field::Topic,
            popup: Popup::None,

            view: MarkdownView::new(theme.clone()),
            theme,
            config,
            input,

            report: Report::new(),

            scroll: 0,
            follow: true,
            viewport: 0,

            error: None,
            status_message: None,
            status_message_time: None,
            spinner: 0,

            generator: None,
            generation: 0,
            task: None,
            events_tx,
            events_rx,
        }
    }

    /// Use a specific generator instead of building a Gemini client on submit
    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set a status message (auto-clears after 3 seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    pub fn is_generating(&self) -> bool {
        self.report.is_generating()
    }

    pub fn can_submit(&self) -> bool {
        !self.is_generating() && self.input.is_submittable()
    }

    /// Whether a bare `q` should quit rather than be typed
    pub fn q_quits(&self) -> bool {
        self.popup == Popup::None && !(self.section == Section::Form && self.field.is_text())
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.popup != Popup::None {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Enter | KeyCode::Char('q') | KeyCode::F(1)
            ) {
                self.popup = Popup::None;
            }
            return Ok(());
        }

        match key.code {
            KeyCode::F(1) => {
                self.popup = Popup::Help;
                return Ok(());
            }
            KeyCode::Esc => {
                if self.is_generating() {
                    self.cancel();
                } else {
                    self.error = None;
                }
                return Ok(());
            }
            KeyCode::Tab => {
                self.focus_next();
                return Ok(());
            }
            KeyCode::BackTab => {
                self.focus_prev();
                return Ok(());
            }
            _ => {}
        }

        match self.section {
            Section::Form => self.handle_form_key(key),
            Section::Report => self.handle_report_key(key),
        }
    }

    fn focus_next(&mut self) {
        match self.section {
            Section::Form => match self.field.next() {
                Some(field) => self.field = field,
                None => self.section = Section::Report,
            },
            Section::Report => {
                self.section = Section::Form;
                self.field = Field::Topic;
            }
        }
    }

    fn focus_prev(&mut self) {
        match self.section {
            Section::Form => match self.field.prev() {
                Some(field) => self.field = field,
                None => self.section = Section::Report,
            },
            Section::Report => {
                self.section = Section::Form;
                self.field = Field::Submit;
            }
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<()> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Enter => self.submit()?,
            KeyCode::Down => {
                if let Some(field) = self.field.next() {
                    self.field = field;
                }
            }
            KeyCode::Up => {
                if let Some(field) = self.field.prev() {
                    self.field = field;
                }
            }
            KeyCode::Backspace if self.field.is_text() => {
                if let Some(text) = self.text_field_mut() {
                    text.pop();
                }
            }
            KeyCode::Char('u') if ctrl && self.field.is_text() => {
                if let Some(text) = self.text_field_mut() {
                    text.clear();
                }
            }
            KeyCode::Char(c) if self.field.is_text() && !ctrl => {
                if let Some(text) = self.text_field_mut() {
                    text.push(c);
                }
            }
            KeyCode::Char(' ') if self.field == Field::Submit => self.submit()?,
            KeyCode::Left => self.cycle_option(false),
            KeyCode::Right | KeyCode::Char(' ') => self.cycle_option(true),
            KeyCode::Char('?') => self.popup = Popup::Help,
            _ => {}
        }
        Ok(())
    }

    fn handle_report_key(&mut self, key: KeyEvent) -> Result<()> {
        let page = usize::from(self.viewport.max(2) - 1);
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.scroll_down(1),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_up(1),
            KeyCode::PageDown | KeyCode::Char(' ') => self.scroll_down(page),
            KeyCode::PageUp => self.scroll_up(page),
            KeyCode::Char('g') | KeyCode::Home => {
                self.follow = false;
                self.scroll = 0;
            }
            KeyCode::Char('G') | KeyCode::End => self.follow = true,
            KeyCode::Enter => {
                self.section = Section::Form;
                self.field = Field::Submit;
            }
            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,
            _ => {}
        }
        Ok(())
    }

    fn text_field_mut(&mut self) -> Option<&mut String> {
        match self.field {
            Field::Topic => Some(&mut self.input.topic),
            Field::Audience => Some(&mut self.input.audience),
            _ => None,
        }
    }

    fn cycle_option(&mut self, forward: bool) {
        let input = &mut self.input;
        match self.field {
            Field::Goal => input.goal = if forward { input.goal.next() } else { input.goal.prev() },
            Field::Experience => {
                input.experience = if forward {
                    input.experience.next()
                } else {
                    input.experience.prev()
                }
            }
            Field::Capacity => {
                input.capacity = if forward {
                    input.capacity.next()
                } else {
                    input.capacity.prev()
                }
            }
            _ => {}
        }
    }

    fn generator(&mut self) -> Result<Arc<dyn Generator>, ClientError> {
        if let Some(generator) = &self.generator {
            return Ok(generator.clone());
        }
        let client: Arc<dyn Generator> = Arc::new(GeminiClient::from_config(&self.config)?);
        self.generator = Some(client.clone());
        Ok(client)
    }

    /// Validate the form and start streaming a new strategy
    pub fn submit(&mut self) -> Result<()> {
        if self.is_generating() {
            return Ok(());
        }
        if let Err(e) = self.input.validate() {
            self.error = Some(e.to_string());
            self.field = Field::Topic;
            return Ok(());
        }
        let generator = match self.generator() {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!("Cannot start generation: {}", e);
                self.error = Some(e.to_string());
                return Ok(());
            }
        };

        self.generation += 1;
        let id = self.generation;
        tracing::info!(
            id,
            topic = %self.input.topic.trim(),
            goal = %self.input.goal,
            experience = %self.input.experience,
            capacity = %self.input.capacity,
            "submitting strategy request"
        );

        self.error = None;
        self.report.begin();
        self.view.reset();
        self.scroll = 0;
        self.follow = true;
        self.section = Section::Report;

        let request = GenerationRequest::new(&self.input, self.config.temperature);
        self.task = Some(spawn_generation(id, generator, request, self.events_tx.clone()));
        Ok(())
    }

    /// Abort the running generation, keeping whatever text already arrived
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if self.is_generating() {
            // Anything still queued from the aborted run is stale now
            self.generation += 1;
            self.report.cancel();
            self.set_status("Generation cancelled");
            tracing::info!("generation cancelled by user");
        }
    }

    pub fn apply_event(&mut self, event: GenerationEvent) {
        if event.id() != self.generation {
            tracing::trace!(id = event.id(), current = self.generation, "dropping stale event");
            return;
        }

        match event {
            GenerationEvent::Fragment { text, .. } => {
                self.report.append(&text);
            }
            GenerationEvent::Finished { .. } => {
                self.task = None;
                self.report.finish();
                self.set_status("Strategy ready");
                if self.config.notifications {
                    let topic = self.input.topic.trim().to_string();
                    if let Err(e) = notify("Strategy ready", &topic) {
                        tracing::warn!("Notification failed: {}", e);
                    }
                }
            }
            GenerationEvent::Failed { message, .. } => {
                self.task = None;
                self.report.fail(message.clone());
                self.error = Some(message);
            }
        }
    }

    /// Periodic update: drain generation events and expire status messages
    pub fn tick(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
        }

        if self.is_generating() {
            self.spinner = self.spinner.wrapping_add(1);
        }

        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= STATUS_TIMEOUT_SECS {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    /// Re-render the report for a pane of the given size
    pub fn sync_view(&mut self, width: u16, height: u16) {
        self.view.update(self.report.text(), width);
        self.viewport = height;
    }

    fn bottom(&self) -> usize {
        self.view.height().saturating_sub(usize::from(self.viewport))
    }

    /// First visible row of the report
    pub fn scroll_offset(&self) -> usize {
        if self.follow {
            self.bottom()
        } else {
            self.scroll.min(self.bottom())
        }
    }

    fn scroll_up(&mut self, rows: usize) {
        self.scroll = self.scroll_offset().saturating_sub(rows);
        self.follow = false;
    }

    fn scroll_down(&mut self, rows: usize) {
        let target = self.scroll_offset() + rows;
        if target >= self.bottom() {
            self.follow = true;
        } else {
            self.scroll = target;
        }
    }

    pub fn report_state(&self) -> &ReportState {
        self.report.state()
    }
}

fn notify(summary: &str, body: &str) -> Result<()> {
    notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .appname("ytstrat")
        .show()?;
    Ok(())
}
