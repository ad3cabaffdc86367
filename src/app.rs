use iced::widget::{button, column, container, pick_list, progress_bar, row, scrollable, text, text_input, Column};
use iced::widget::button as button_widget;
use iced::widget::container as container_widget;
use iced::{Alignment, Background, Command, Element, Length, Subscription, Theme};
use iced::theme;
use iced::widget::canvas::{Canvas, Frame, Geometry, Path, Program, Stroke, Text};
use iced::{Color, Font, Renderer};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tracing::warn;

use battery_additive_mixer::additives::DEFAULT_COMPOUNDS;
use battery_additive_mixer::config::ControllerConfig;
use battery_additive_mixer::report::{format_experiment, format_log, format_parameters};
use battery_additive_mixer::run::{CancelToken, SIMULATED_RANGE};
use battery_additive_mixer::session::{ApprovedRun, ExperimentRun, Mode, PendingRun, RunStep, Session};

const CONSOLE_LINES: usize = 400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Tab {
    Manual,
    Automatic,
    Log,
}

fn color_bg() -> Color {
    Color::from_rgb8(44, 62, 80)
}

fn color_surface() -> Color {
    Color::from_rgb8(52, 73, 94)
}

fn color_surface_alt() -> Color {
    Color::from_rgb8(59, 75, 92)
}

fn color_border() -> Color {
    Color::from_rgb8(78, 98, 118)
}

fn color_text() -> Color {
    Color::from_rgb8(236, 240, 241)
}

fn color_muted() -> Color {
    Color::from_rgb8(160, 176, 190)
}

fn color_accent() -> Color {
    Color::from_rgb8(52, 152, 219)
}

fn color_run() -> Color {
    Color::from_rgb8(46, 204, 113)
}

fn color_mode() -> Color {
    Color::from_rgb8(155, 89, 182)
}

fn color_danger() -> Color {
    Color::from_rgb8(231, 76, 60)
}

#[derive(Debug, Clone)]
pub enum Message {
    TabSelected(Tab),
    IterationsChanged(String),
    CompoundSelected(String),
    ConcentrationChanged(String),
    TotalChanged(String),
    CustomNameChanged(String),
    CustomConcentrationChanged(String),
    AddManual,
    AddCustom,
    AddAutomatic,
    ClearCompounds,
    IncreaseConcentrations,
    SubmitManual,
    SubmitAutomatic,
    PrintParameters,
    Run,
    AdvisoryAccepted,
    AdvisoryDeclined,
    Tick,
    StopRun,
}

struct ActiveRun {
    run: ExperimentRun<StdRng>,
    cancel: CancelToken,
}

pub struct App {
    session: Session,
    tab_selected: Tab,
    iterations: String,
    compound_items: Vec<String>,
    compound_selected: Option<String>,
    concentration: String,
    total: String,
    custom_name: String,
    custom_concentration: String,
    status: String,
    pending: Option<PendingRun>,
    active: Option<ActiveRun>,
    conductivity: Option<f64>,
    plot: Vec<f64>,
    console: Vec<String>,
}

impl App {
    fn with_config(config: ControllerConfig) -> Self {
        let compound_items: Vec<String> = DEFAULT_COMPOUNDS.iter().map(|c| c.to_string()).collect();
        App {
            iterations: config.default_iterations.to_string(),
            compound_selected: compound_items.first().cloned(),
            compound_items,
            session: Session::new(config),
            tab_selected: Tab::Manual,
            concentration: "".to_string(),
            total: "0.00".to_string(),
            custom_name: "".to_string(),
            custom_concentration: "".to_string(),
            status: "Idle".to_string(),
            pending: None,
            active: None,
            conductivity: None,
            plot: Vec::new(),
            console: Vec::new(),
        }
    }
}

impl iced::Application for App {
    type Executor = iced::executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = ControllerConfig;

    fn new(flags: ControllerConfig) -> (Self, Command<Self::Message>) {
        (App::with_config(flags), Command::none())
    }

    fn title(&self) -> String {
        "Battery Additives Experiment UI".to_string()
    }

    fn subscription(&self) -> Subscription<Self::Message> {
        if self.active.is_some() {
            let pause = self.session.config().iteration_pause_ms.max(1);
            iced::time::every(Duration::from_millis(pause)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }

    fn update(&mut self, message: Self::Message) -> Command<Self::Message> {
        match message {
            Message::TabSelected(tab) => {
                self.tab_selected = tab;
            }
            Message::IterationsChanged(v) => {
                self.iterations = v;
            }
            Message::CompoundSelected(v) => {
                self.compound_selected = Some(v);
            }
            Message::ConcentrationChanged(v) => {
                self.concentration = v;
            }
            Message::TotalChanged(v) => {
                self.total = v;
            }
            Message::CustomNameChanged(v) => {
                self.custom_name = v;
            }
            Message::CustomConcentrationChanged(v) => {
                self.custom_concentration = v;
            }
            Message::AddManual => {
                let Some(name) = self.compound_selected.clone() else {
                    self.status = "Select a compound first".to_string();
                    return Command::none();
                };
                match self.session.add_compound_text(&name, &self.concentration) {
                    Ok(added) => {
                        self.status = format!("Added {} with {:.2}% concentration.", added.name(), added.percentage());
                        self.concentration.clear();
                    }
                    Err(e) => self.status = format!("Invalid input: {}", e),
                }
            }
            Message::AddCustom => {
                match self.session.add_compound_text(&self.custom_name, &self.custom_concentration) {
                    Ok(added) => {
                        self.status = format!("Added {} with {:.2}% concentration.", added.name(), added.percentage());
                        self.custom_name.clear();
                        self.custom_concentration.clear();
                    }
                    Err(e) => self.status = format!("Invalid input: {}", e),
                }
            }
            Message::AddAutomatic => {
                let Some(name) = self.compound_selected.clone() else {
                    self.status = "Select a compound first".to_string();
                    return Command::none();
                };
                match self.session.add_automatic(&name) {
                    Ok(added) => self.status = format!("Added {} with {:.2}% concentration.", added.name(), added.percentage()),
                    Err(e) => self.status = format!("Invalid input: {}", e),
                }
            }
            Message::ClearCompounds => {
                self.session.clear_compounds();
                self.status = "Compounds list has been cleared for both tabs.".to_string();
            }
            Message::IncreaseConcentrations => {
                if let Err(e) = self.session.scale_concentrations(1.10) {
                    self.status = e.to_string();
                } else {
                    self.status = "Concentrations increased by 10%".to_string();
                }
            }
            Message::SubmitManual => {
                self.session.set_mode(Mode::Manual);
                self.status = "Mode set to Manual".to_string();
            }
            Message::SubmitAutomatic => {
                if self.total.trim().is_empty() {
                    self.total = "0.00".to_string();
                }
                self.session.set_mode(Mode::Automatic);
                self.status = "Mode set to Automatic".to_string();
            }
            Message::PrintParameters => {
                let params = format_parameters(self.session.selections(), self.session.config());
                print!("{}", params);
                self.push_console(&params);
            }
            Message::Run => {
                if self.active.is_some() || self.pending.is_some() {
                    return Command::none();
                }
                match self.session.request_run(&self.iterations, &self.total) {
                    Ok(RunStep::Ready(approved)) => self.start_run(approved),
                    Ok(RunStep::Confirm(pending)) => {
                        self.status = pending.advisory().title().to_string();
                        self.pending = Some(pending);
                    }
                    Err(e) => self.status = format!("Invalid input: {}", e),
                }
            }
            Message::AdvisoryAccepted => {
                if let Some(pending) = self.pending.take() {
                    match pending.accept() {
                        RunStep::Confirm(next) => {
                            self.status = next.advisory().title().to_string();
                            self.pending = Some(next);
                        }
                        RunStep::Ready(approved) => self.start_run(approved),
                    }
                }
            }
            Message::AdvisoryDeclined => {
                if let Some(pending) = self.pending.take() {
                    pending.decline();
                    self.status = "Run aborted".to_string();
                }
            }
            Message::Tick => {
                self.step_run();
            }
            Message::StopRun => {
                if let Some(active) = &self.active {
                    active.cancel.cancel();
                }
                self.step_run();
            }
        }
        Command::none()
    }

    fn view(&self) -> Element<'_, Self::Message> {
        let busy = self.active.is_some() || self.pending.is_some();

        let tab_button = |label: &str, tab: Tab| {
            let selected = self.tab_selected == tab;
            button(text(label).size(14))
                .padding([8, 14])
                .style(theme::Button::Custom(Box::new(TabButton { selected })))
                .on_press(Message::TabSelected(tab))
        };

        let tabs = row![
            tab_button("Manual", Tab::Manual),
            tab_button("Automatic", Tab::Automatic),
            tab_button("Log", Tab::Log),
        ]
        .spacing(10)
        .align_items(Alignment::Center);

        let compound_row = || {
            row![
                text("Select Default Compound:"),
                pick_list(self.compound_items.clone(), self.compound_selected.clone(), Message::CompoundSelected),
            ]
            .spacing(10)
            .align_items(Alignment::Center)
        };

        let total_row = || {
            row![
                text("Total Additive Concentration (%):"),
                text_input("0.00", &self.total).on_input(Message::TotalChanged),
            ]
            .spacing(10)
            .align_items(Alignment::Center)
        };

        let compounds_card = || {
            let entries = self
                .session
                .selections()
                .iter()
                .map(|s| text(s.to_string()).into())
                .collect::<Vec<Element<'_, Message>>>();
            let list = if entries.is_empty() {
                column![text("No compounds added").style(color_muted())]
            } else {
                Column::with_children(entries).spacing(4)
            };
            card(
                Tone::Plain,
                "Compounds List",
                column![
                    list,
                    text(format!("Sum: {:.2}%", self.session.compound_total())).style(color_muted()),
                    row![
                        button("Clear Compounds List")
                            .style(theme::Button::Custom(Box::new(DangerButton)))
                            .on_press(Message::ClearCompounds),
                        button("Increase Concentrations by 10%")
                            .style(theme::Button::Custom(Box::new(GhostButton)))
                            .on_press(Message::IncreaseConcentrations),
                    ]
                    .spacing(10)
                    .align_items(Alignment::Center),
                ],
            )
        };

        let run_card = || {
            let run_button = if busy {
                button("Running...")
                    .padding(10)
                    .style(theme::Button::Custom(Box::new(GhostButton)))
            } else {
                button("Run Experiment")
                    .on_press(Message::Run)
                    .padding(10)
                    .style(theme::Button::Custom(Box::new(RunButton)))
            };
            let stop_button = if self.active.is_some() {
                button("Stop")
                    .on_press(Message::StopRun)
                    .padding(10)
                    .style(theme::Button::Custom(Box::new(DangerButton)))
            } else {
                button("Stop")
                    .padding(10)
                    .style(theme::Button::Custom(Box::new(GhostButton)))
            };
            let progress = self.active.as_ref().map(|a| a.run.progress()).unwrap_or(0.0);
            card(
                Tone::Plain,
                "Run",
                column![
                    row![
                        text("Number of Iterations:"),
                        text_input("10", &self.iterations).on_input(Message::IterationsChanged),
                    ]
                    .spacing(10)
                    .align_items(Alignment::Center),
                    row![
                        run_button,
                        stop_button,
                        button("Print Parameters")
                            .padding(10)
                            .style(theme::Button::Custom(Box::new(GhostButton)))
                            .on_press(Message::PrintParameters),
                    ]
                    .spacing(10)
                    .align_items(Alignment::Center),
                    progress_bar(0.0..=1.0, progress),
                    Canvas::new(ReadingsView { values: self.plot.clone() })
                        .width(Length::Fill)
                        .height(160),
                ],
            )
        };

        let manual_card = card(
            Tone::Plain,
            "Manual Mode",
            column![
                compound_row(),
                row![
                    text("Concentration (%):"),
                    text_input("0.00", &self.concentration).on_input(Message::ConcentrationChanged),
                    button("Add Selected Compound")
                        .style(theme::Button::Custom(Box::new(PrimaryButton)))
                        .on_press(Message::AddManual),
                ]
                .spacing(10)
                .align_items(Alignment::Center),
                total_row(),
                row![
                    text("Other compound:"),
                    text_input("Name", &self.custom_name).on_input(Message::CustomNameChanged),
                    text_input("%", &self.custom_concentration).on_input(Message::CustomConcentrationChanged),
                    button("Add")
                        .style(theme::Button::Custom(Box::new(GhostButton)))
                        .on_press(Message::AddCustom),
                ]
                .spacing(10)
                .align_items(Alignment::Center),
                button("Submit (Manual)")
                    .padding(10)
                    .style(theme::Button::Custom(Box::new(ModeButton)))
                    .on_press(Message::SubmitManual),
            ],
        );

        let automatic_card = card(
            Tone::Plain,
            "Automatic Mode",
            column![
                compound_row(),
                total_row(),
                button("Add Selected Compound")
                    .style(theme::Button::Custom(Box::new(PrimaryButton)))
                    .on_press(Message::AddAutomatic),
                text("Compounds are listed at 0.00%; the controller decides the dose.").style(color_muted()),
                button("Submit (Automatic)")
                    .padding(10)
                    .style(theme::Button::Custom(Box::new(ModeButton)))
                    .on_press(Message::SubmitAutomatic),
            ],
        );

        let additives_card = {
            let rows = self
                .session
                .additives()
                .iter()
                .map(|slot| {
                    let line = format!(
                        "{:<11} port {}  {:<5}  {:>6.2}%  {:>5.2} ml",
                        slot.id.key(),
                        slot.port,
                        if slot.used { "used" } else { "-" },
                        slot.percentage,
                        slot.volume
                    );
                    let color = if slot.used { color_text() } else { color_muted() };
                    text(line).font(Font::MONOSPACE).style(color).into()
                })
                .collect::<Vec<Element<'_, Message>>>();
            card(Tone::Plain, "Additives", Column::with_children(rows).spacing(4))
        };

        let console_card = {
            let lines = self
                .console
                .iter()
                .map(|l| text(l).size(13).font(Font::MONOSPACE).into())
                .collect::<Vec<Element<'_, Message>>>();
            card(
                Tone::Plain,
                "Console",
                column![scrollable(Column::with_children(lines).spacing(2)).height(320)],
            )
        };

        let mode_pill = match self.session.mode() {
            Mode::Manual => pill("MANUAL", color_mode(), color_text()),
            Mode::Automatic => pill("AUTOMATIC", color_accent(), color_text()),
        };
        let run_pill = if self.active.is_some() {
            pill("RUNNING", color_run(), Color::from_rgb8(6, 24, 19))
        } else {
            pill("IDLE", color_surface_alt(), color_muted())
        };
        let conductivity = match self.conductivity {
            Some(v) => format!("Conductivity {:.2}", v),
            None => "Conductivity —".to_string(),
        };

        let hero = container(
            row![
                column![
                    text("Battery Additives").size(28).style(color_text()),
                    text("Electrolyte mixing experiment").size(16).style(color_muted()),
                ]
                .spacing(4)
                .width(Length::FillPortion(3)),
                column![
                    row![mode_pill, run_pill, text(&self.status).style(color_muted())]
                        .spacing(10)
                        .align_items(Alignment::Center),
                    row![
                        text(conductivity).style(color_text()),
                        text(format!("Experiments {}", self.session.experiment_count())).style(color_muted()),
                    ]
                    .spacing(14)
                    .align_items(Alignment::Center),
                ]
                .spacing(8)
                .width(Length::FillPortion(2)),
            ]
            .spacing(24)
            .align_items(Alignment::Center),
        )
        .padding(16)
        .width(Length::Fill)
        .style(theme::Container::from(hero_style));

        let body: Element<'_, Message> = match self.tab_selected {
            Tab::Manual => row![
                column![manual_card, compounds_card()].spacing(16).width(Length::FillPortion(3)),
                column![run_card()].spacing(16).width(Length::FillPortion(2)),
            ]
            .spacing(16)
            .align_items(Alignment::Start)
            .into(),
            Tab::Automatic => row![
                column![automatic_card, compounds_card()].spacing(16).width(Length::FillPortion(3)),
                column![run_card()].spacing(16).width(Length::FillPortion(2)),
            ]
            .spacing(16)
            .align_items(Alignment::Start)
            .into(),
            Tab::Log => row![
                column![console_card].spacing(16).width(Length::FillPortion(3)),
                column![additives_card].spacing(16).width(Length::FillPortion(2)),
            ]
            .spacing(16)
            .align_items(Alignment::Start)
            .into(),
        };

        let mut content = column![hero, tabs].spacing(18);
        if let Some(pending) = &self.pending {
            content = content.push(card(
                Tone::Alert,
                pending.advisory().title(),
                column![
                    text(pending.advisory().message()),
                    text(format!("{} check(s) left", pending.remaining())).style(color_muted()),
                    row![
                        button("Continue")
                            .padding(10)
                            .style(theme::Button::Custom(Box::new(PrimaryButton)))
                            .on_press(Message::AdvisoryAccepted),
                        button("Cancel")
                            .padding(10)
                            .style(theme::Button::Custom(Box::new(DangerButton)))
                            .on_press(Message::AdvisoryDeclined),
                    ]
                    .spacing(10)
                    .align_items(Alignment::Center),
                ],
            ));
        }
        let content = content
            .push(body)
            .padding(24)
            .width(Length::Fill)
            .align_items(Alignment::Start);

        let scroll = scrollable(content)
            .width(Length::Fill)
            .height(Length::Fill);

        container(scroll)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x()
            .style(theme::Container::from(body_style))
            .into()
    }
}

impl App {
    fn start_run(&mut self, approved: ApprovedRun) {
        let cancel = CancelToken::new();
        let run = approved.start(StdRng::from_entropy(), cancel.clone());
        let plan = run.plan();
        let header = format!(
            "Running experiment #{} with {} iterations ({} mode)",
            self.session.experiment_count() + 1,
            plan.iterations,
            plan.mode
        );
        println!("{}", header);
        self.push_console(&header);
        self.status = "Running...".to_string();
        self.plot.clear();
        self.conductivity = None;
        self.active = Some(ActiveRun { run, cancel });
        // First reading right away; the subscription paces the rest.
        self.step_run();
    }

    fn step_run(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if let Some(reading) = active.run.next() {
            self.conductivity = Some(reading.conductivity);
            self.plot.push(reading.conductivity);
            if !active.run.is_finished() {
                return;
            }
        }

        let Some(active) = self.active.take() else {
            return;
        };
        let completed = active.run.completed();
        match self.session.record(active.run) {
            Ok(record) => {
                let summary = format_experiment(record);
                let log = format_log(self.session.log());
                println!("\n{}\n{}", summary, log);
                self.push_console(&summary);
                self.push_console(&log);
                self.status = format!("Experiment #{} complete", self.session.experiment_count());
            }
            Err(e) => {
                warn!(completed, "{}, not recorded", e);
                self.push_console("Run stopped; not recorded.");
                self.status = "Run stopped".to_string();
            }
        }
    }

    fn push_console(&mut self, block: &str) {
        self.console.extend(block.lines().map(|l| l.to_string()));
        if self.console.len() > CONSOLE_LINES {
            let excess = self.console.len() - CONSOLE_LINES;
            self.console.drain(..excess);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Plain,
    Alert,
}

fn card<'a>(tone: Tone, title: &str, content: Column<'a, Message>) -> Element<'a, Message> {
    container(
        column![
            container(text(title).size(15).style(color_text()))
                .padding([6, 10])
                .width(Length::Fill)
                .style(theme::Container::from(header_style)),
            content.spacing(12),
        ]
        .spacing(12),
    )
    .padding(14)
    .width(Length::Fill)
    .style(theme::Container::Custom(Box::new(CardStyle(tone))))
    .into()
}

fn header_style(_theme: &Theme) -> container_widget::Appearance {
    container_widget::Appearance {
        background: Some(Background::Color(color_surface_alt())),
        text_color: Some(color_text()),
        border_radius: 8.0.into(),
        border_width: 1.0,
        border_color: color_border(),
    }
}

fn hero_style(_theme: &Theme) -> container_widget::Appearance {
    container_widget::Appearance {
        background: Some(Background::Color(color_surface())),
        text_color: Some(color_text()),
        border_radius: 14.0.into(),
        border_width: 1.0,
        border_color: color_accent(),
    }
}

fn body_style(_theme: &Theme) -> container_widget::Appearance {
    container_widget::Appearance {
        background: Some(Background::Color(color_bg())),
        text_color: Some(color_text()),
        ..Default::default()
    }
}

fn pill<'a>(label: &str, bg: Color, fg: Color) -> Element<'a, Message> {
    container(text(label).size(12))
        .padding([4, 10])
        .style(theme::Container::Custom(Box::new(PillStyle { bg, fg })))
        .into()
}

fn solid_button(bg: Color, fg: Color) -> button_widget::Appearance {
    button_widget::Appearance {
        background: Some(Background::Color(bg)),
        text_color: fg,
        border_radius: 8.0.into(),
        border_width: 1.0,
        border_color: bg,
        ..Default::default()
    }
}

fn lighten(color: Color, amount: f32) -> Color {
    Color::from_rgb(
        (color.r + amount).min(1.0),
        (color.g + amount).min(1.0),
        (color.b + amount).min(1.0),
    )
}

struct PrimaryButton;

impl button_widget::StyleSheet for PrimaryButton {
    type Style = Theme;

    fn active(&self, _style: &Self::Style) -> button_widget::Appearance {
        solid_button(color_accent(), Color::WHITE)
    }

    fn hovered(&self, _style: &Self::Style) -> button_widget::Appearance {
        solid_button(lighten(color_accent(), 0.08), Color::WHITE)
    }
}

struct RunButton;

impl button_widget::StyleSheet for RunButton {
    type Style = Theme;

    fn active(&self, _style: &Self::Style) -> button_widget::Appearance {
        solid_button(color_run(), Color::WHITE)
    }

    fn hovered(&self, _style: &Self::Style) -> button_widget::Appearance {
        solid_button(lighten(color_run(), 0.08), Color::WHITE)
    }
}

struct ModeButton;

impl button_widget::StyleSheet for ModeButton {
    type Style = Theme;

    fn active(&self, _style: &Self::Style) -> button_widget::Appearance {
        solid_button(color_mode(), Color::WHITE)
    }

    fn hovered(&self, _style: &Self::Style) -> button_widget::Appearance {
        solid_button(lighten(color_mode(), 0.08), Color::WHITE)
    }
}

struct DangerButton;

impl button_widget::StyleSheet for DangerButton {
    type Style = Theme;

    fn active(&self, _style: &Self::Style) -> button_widget::Appearance {
        solid_button(color_danger(), Color::WHITE)
    }

    fn hovered(&self, _style: &Self::Style) -> button_widget::Appearance {
        solid_button(lighten(color_danger(), 0.08), Color::WHITE)
    }
}

struct GhostButton;

impl button_widget::StyleSheet for GhostButton {
    type Style = Theme;

    fn active(&self, _style: &Self::Style) -> button_widget::Appearance {
        button_widget::Appearance {
            background: Some(Background::Color(color_surface_alt())),
            text_color: color_text(),
            border_radius: 8.0.into(),
            border_width: 1.0,
            border_color: color_border(),
            ..Default::default()
        }
    }

    fn hovered(&self, style: &Self::Style) -> button_widget::Appearance {
        let mut active = self.active(style);
        active.background = Some(Background::Color(lighten(color_surface_alt(), 0.05)));
        active
    }
}

struct TabButton {
    selected: bool,
}

impl button_widget::StyleSheet for TabButton {
    type Style = Theme;

    fn active(&self, _style: &Self::Style) -> button_widget::Appearance {
        let (bg, border_color) = if self.selected {
            (color_accent(), color_accent())
        } else {
            (color_surface_alt(), color_border())
        };
        button_widget::Appearance {
            background: Some(Background::Color(bg)),
            text_color: color_text(),
            border_radius: 8.0.into(),
            border_width: 1.0,
            border_color,
            ..Default::default()
        }
    }

    fn hovered(&self, style: &Self::Style) -> button_widget::Appearance {
        let mut active = self.active(style);
        if !self.selected {
            active.background = Some(Background::Color(lighten(color_surface_alt(), 0.05)));
        }
        active
    }
}

struct CardStyle(Tone);

impl container_widget::StyleSheet for CardStyle {
    type Style = Theme;

    fn appearance(&self, _style: &Self::Style) -> container_widget::Appearance {
        let (border_width, border_color) = match self.0 {
            Tone::Plain => (1.0, color_border()),
            Tone::Alert => (2.0, color_danger()),
        };
        container_widget::Appearance {
            background: Some(Background::Color(color_surface())),
            text_color: Some(color_text()),
            border_radius: 12.0.into(),
            border_width,
            border_color,
        }
    }
}

struct PillStyle {
    bg: Color,
    fg: Color,
}

impl container_widget::StyleSheet for PillStyle {
    type Style = Theme;

    fn appearance(&self, _style: &Self::Style) -> container_widget::Appearance {
        container_widget::Appearance {
            background: Some(Background::Color(self.bg)),
            text_color: Some(self.fg),
            border_radius: 999.0.into(),
            border_width: 1.0,
            border_color: self.bg,
        }
    }
}

/// Conductivity readings of the current run, plotted over the meter range.
struct ReadingsView {
    values: Vec<f64>,
}

impl<Message> Program<Message, Renderer> for ReadingsView {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: iced::Rectangle,
        _cursor: iced::mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let bg = Path::rectangle(iced::Point::ORIGIN, frame.size());
        frame.fill(&bg, Color::from_rgb8(30, 42, 54));

        let width = frame.size().width;
        let height = frame.size().height;
        let max = SIMULATED_RANGE.end as f32;

        let grid_color = Color::from_rgb8(60, 78, 96);
        for i in 0..=4 {
            let y = height * (i as f32 / 4.0);
            let line = Path::line(iced::Point::new(0.0, y), iced::Point::new(width, y));
            frame.stroke(&line, Stroke::default().with_width(1.0).with_color(grid_color));
            frame.fill_text(Text {
                content: format!("{:.0}", max * (1.0 - i as f32 / 4.0)),
                position: iced::Point::new(6.0, (y - 14.0).max(2.0)),
                color: color_muted(),
                size: 11.0,
                ..Text::default()
            });
        }

        if self.values.len() >= 2 {
            let step = width / (self.values.len() as f32 - 1.0);
            let path = Path::new(|builder| {
                for (i, v) in self.values.iter().enumerate() {
                    let unit = (*v as f32).clamp(0.0, max) / max;
                    let x = i as f32 * step;
                    let y = height - unit * height;
                    if i == 0 {
                        builder.move_to(iced::Point::new(x, y));
                    } else {
                        builder.line_to(iced::Point::new(x, y));
                    }
                }
            });
            frame.stroke(&path, Stroke::default().with_width(2.0).with_color(color_run()));
        } else if let Some(v) = self.values.first() {
            let unit = (*v as f32).clamp(0.0, max) / max;
            let dot = Path::circle(iced::Point::new(width / 2.0, height - unit * height), 3.0);
            frame.fill(&dot, color_run());
        }

        vec![frame.into_geometry()]
    }
}
