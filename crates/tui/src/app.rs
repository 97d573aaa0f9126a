use std::{io, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use nexus_core::{
    content::{Agent, MissionType},
    mission::{FailureReason, MissionEvent, MissionInstance, PhaseProgress, ThreatLevel},
    store::{Session, Team},
    AbilitySlot, EngineError, MissionService, MissionStatus, MissionTimer, Timeframe,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(250);
const EVENT_LINES: usize = 10;
const TRACE_SPIKE: f64 = 10.0;
const LEADERBOARD_ROWS: usize = 5;

enum AppEvent {
    Input(Event),
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    MissionSelect,
    AgentSelect,
    Play,
    Debrief,
}

/// Terminal front end issuing mission commands and rendering their results.
pub struct NexusApp {
    service: Arc<MissionService>,
    team: Team,
    session: Session,
    tick_interval: Duration,
    missions: Vec<MissionType>,
    agents: Vec<Agent>,
    screen: Screen,
    state: UiState,
    selected_mission: Option<String>,
    active: Option<MissionInstance>,
    timer: Option<MissionTimer>,
}

impl NexusApp {
    pub fn new(service: Arc<MissionService>, team_name: &str, tick_interval: Duration) -> Result<Self> {
        let team = service.register_team(team_name)?;
        let session = service.open_session(&team.id)?;
        let content = service.engine().content().clone();
        Ok(Self {
            missions: content.missions().cloned().collect(),
            agents: content.agents().cloned().collect(),
            service,
            team,
            session,
            tick_interval,
            screen: Screen::MissionSelect,
            state: UiState::default(),
            selected_mission: None,
            active: None,
            timer: None,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        self.state.set_status(format!(
            "Team {} ready • {} missions available",
            self.team.name,
            self.missions.len()
        ));

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) || self.state.should_quit {
                break;
            }
        }

        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        restore_terminal(&mut terminal)?;
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                if let Err(err) = self.handle_key(key) {
                    self.state.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Input(_)) => true,
            Some(AppEvent::Tick) => {
                self.handle_tick();
                true
            }
            None => false,
        }
    }

    fn handle_tick(&mut self) {
        if self.screen == Screen::Play {
            self.refresh_active();
        }
    }

    /// Reload the active instance snapshot, moving to the debrief once terminal.
    fn refresh_active(&mut self) {
        let Some(id) = self.active.as_ref().map(|instance| instance.id.clone()) else {
            return;
        };
        match self.service.mission(&id) {
            Ok(instance) => {
                let terminal = instance.status.is_terminal();
                self.active = Some(instance);
                if terminal && self.screen == Screen::Play {
                    self.enter_debrief();
                }
            }
            Err(err) => self.state.set_status(format!("Lost mission {id}: {err}")),
        }
    }

    fn enter_debrief(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        if let Ok(team) = self.service.team(&self.team.id) {
            self.team = team;
        }
        self.screen = Screen::Debrief;
        if let Some(instance) = &self.active {
            info!(mission_id = %instance.id, status = %instance.status, "debrief");
            self.state
                .set_status(format!("Mission {} • Enter to continue", instance.status));
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.code == KeyCode::Char('q') {
            self.state.should_quit = true;
            return Ok(());
        }
        match self.screen {
            Screen::MissionSelect => self.handle_mission_select_key(key),
            Screen::AgentSelect => self.handle_agent_select_key(key),
            Screen::Play => self.handle_play_key(key),
            Screen::Debrief => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                    self.screen = Screen::MissionSelect;
                    self.state.cursor = 0;
                    self.state.set_status("Select a mission".to_string());
                }
                Ok(())
            }
        }
    }

    fn handle_mission_select_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.move_cursor(1, self.missions.len()),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_cursor(-1, self.missions.len()),
            KeyCode::Enter => {
                if let Some(mission) = self.missions.get(self.state.cursor) {
                    self.selected_mission = Some(mission.id.clone());
                    self.screen = Screen::AgentSelect;
                    self.state.cursor = 0;
                    self.state.set_status(format!("{} • choose an agent", mission.name));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_agent_select_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.move_cursor(1, self.agents.len()),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_cursor(-1, self.agents.len()),
            KeyCode::Esc => {
                self.screen = Screen::MissionSelect;
                self.state.cursor = 0;
            }
            KeyCode::Enter => {
                let Some(mission_id) = self.selected_mission.clone() else {
                    self.screen = Screen::MissionSelect;
                    return Ok(());
                };
                let Some(agent) = self.agents.get(self.state.cursor) else {
                    return Ok(());
                };
                let instance =
                    self.service
                        .start_mission(&self.session.id, &mission_id, &agent.id)?;
                self.timer = Some(MissionTimer::spawn(
                    self.service.clone(),
                    instance.id.clone(),
                    self.tick_interval,
                ));
                self.state
                    .set_status(format!("{} deployed on {}", agent.name, instance.mission_id));
                self.active = Some(instance);
                self.screen = Screen::Play;
                self.state.cursor = 0;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_play_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(id) = self.active.as_ref().map(|instance| instance.id.clone()) else {
            self.screen = Screen::MissionSelect;
            return Ok(());
        };
        let objective_count = self
            .active
            .as_ref()
            .map_or(0, |instance| instance.objectives.len());

        let message = match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.state.move_cursor(1, objective_count);
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.state.move_cursor(-1, objective_count);
                None
            }
            KeyCode::Enter => {
                let objective_id = self
                    .active
                    .as_ref()
                    .and_then(|instance| instance.objectives.get(self.state.cursor))
                    .map(|objective| objective.id());
                objective_id.map(|objective_id| {
                    outcome_message(self.service.complete_objective(&id, objective_id), |done| {
                        match done.progress {
                            PhaseProgress::Advanced { to, .. } => {
                                format!("{} done • phase {to} unlocked", done.objective.template.name)
                            }
                            PhaseProgress::MissionCompleted(outcome) => {
                                format!("Mission complete • {} {}", outcome.final_score, outcome.rank)
                            }
                            PhaseProgress::Unchanged => format!(
                                "{} done • progress {}",
                                done.objective.template.name, done.mission_progress
                            ),
                        }
                    })
                })
            }
            KeyCode::Char('1') => Some(self.ability(&id, AbilitySlot::Ability1)),
            KeyCode::Char('2') => Some(self.ability(&id, AbilitySlot::Ability2)),
            KeyCode::Char('u') => Some(self.ability(&id, AbilitySlot::Ultimate)),
            KeyCode::Char('t') => Some(outcome_message(
                self.service.increase_trace(&id, TRACE_SPIKE, "manual_spike"),
                |change| {
                    if change.blocked {
                        "Trace spike blocked".to_string()
                    } else {
                        format!("Trace +{:.1} → {:.1}", change.amount, change.new_level)
                    }
                },
            )),
            KeyCode::Char('a') => Some(outcome_message(
                self.service.trigger_alarm(&id, "manual_alarm"),
                |total| format!("Alarm raised ({total} total)"),
            )),
            KeyCode::Char('b') => Some(outcome_message(
                self.service.engage_backup_tactics(&id),
                |_| "Backup tactics engaged".to_string(),
            )),
            KeyCode::Char('x') => Some(outcome_message(
                self.service.fail_mission(&id, FailureReason::Abandoned),
                |outcome| format!("Mission abandoned • {}", outcome.final_score),
            )),
            _ => None,
        };
        if let Some(message) = message {
            debug!(mission_id = %id, %message, "command");
            self.state.set_status(message);
        }
        self.refresh_active();
        Ok(())
    }

    fn ability(&self, id: &str, slot: AbilitySlot) -> String {
        outcome_message(self.service.use_ability(id, slot, None), |activation| {
            format!("{}: {}", activation.ability.name, activation.effects.message)
        })
    }

    fn draw(&mut self, frame: &mut Frame) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(frame.size());
        match self.screen {
            Screen::MissionSelect => self.draw_mission_select(frame, layout[0]),
            Screen::AgentSelect => self.draw_agent_select(frame, layout[0]),
            Screen::Play => self.draw_play(frame, layout[0]),
            Screen::Debrief => self.draw_debrief(frame, layout[0]),
        }
        self.draw_status(frame, layout[1]);
    }

    fn draw_mission_select(&self, frame: &mut Frame, area: Rect) {
        let columns = split_columns(area);
        let lines: Vec<Line> = self
            .missions
            .iter()
            .enumerate()
            .map(|(idx, mission)| {
                cursor_line(
                    idx == self.state.cursor,
                    format!("{} ({:?}, {}m)", mission.name, mission.difficulty, mission.duration / 60),
                )
            })
            .collect();
        frame.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Missions")),
            columns[0],
        );

        let mut detail = Vec::new();
        if let Some(mission) = self.missions.get(self.state.cursor) {
            detail.push(Line::from(Span::styled(
                mission.name.clone(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            if let Some(tagline) = &mission.tagline {
                detail.push(Line::from(tagline.clone()));
            }
            detail.push(Line::from(""));
            detail.push(Line::from(mission.description.clone()));
            detail.push(Line::from(""));
            for phase in &mission.phases {
                detail.push(Line::from(format!(
                    "Phase {}: {} ({} objectives)",
                    phase.id,
                    phase.name,
                    phase.objectives.len()
                )));
            }
            detail.push(Line::from(""));
            detail.push(Line::from(format!("Success: {}", mission.success_criteria)));
            detail.push(Line::from(format!("Failure: {}", mission.failure_condition)));
        }
        detail.push(Line::from(""));
        detail.push(Line::from(format!(
            "Team {} • score {} • xp {} • shards {} • achievements {}",
            self.team.name,
            self.team.total_score,
            self.team.xp,
            self.team.hex_shards.total(),
            self.team.achievements.len()
        )));
        frame.render_widget(
            Paragraph::new(detail)
                .block(Block::default().borders(Borders::ALL).title("Briefing"))
                .wrap(Wrap { trim: true }),
            columns[1],
        );
    }

    fn draw_agent_select(&self, frame: &mut Frame, area: Rect) {
        let columns = split_columns(area);
        let lines: Vec<Line> = self
            .agents
            .iter()
            .enumerate()
            .map(|(idx, agent)| cursor_line(idx == self.state.cursor, agent.name.clone()))
            .collect();
        frame.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Agents")),
            columns[0],
        );

        let mut detail = Vec::new();
        if let Some(agent) = self.agents.get(self.state.cursor) {
            detail.push(Line::from(agent.description.clone()));
            detail.push(Line::from(format!(
                "HCK {}  STL {}  CMB {}  ANL {}",
                agent.stats.hacking, agent.stats.stealth, agent.stats.combat, agent.stats.analysis
            )));
            detail.push(Line::from(""));
            let passive = agent.passive();
            detail.push(Line::from(format!("Passive  {}: {}", passive.name, passive.description)));
            for (key, slot) in [("1", AbilitySlot::Ability1), ("2", AbilitySlot::Ability2), ("u", AbilitySlot::Ultimate)] {
                if let Some(ability) = agent.ability(slot) {
                    detail.push(Line::from(format!("[{key}] {}: {}", ability.name, ability.description)));
                }
            }
        }
        frame.render_widget(
            Paragraph::new(detail)
                .block(Block::default().borders(Borders::ALL).title("Loadout"))
                .wrap(Wrap { trim: true }),
            columns[1],
        );
    }

    fn draw_play(&self, frame: &mut Frame, area: Rect) {
        let Some(instance) = &self.active else {
            return;
        };
        let engine = self.service.engine();
        let now = engine.now();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(6), Constraint::Length(EVENT_LINES as u16 + 2)])
            .split(area);

        let threat = ThreatLevel::from_trace(instance.trace_level);
        let remaining = instance.time_remaining(now);
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Trace {threat} • phase {}/{} • {:02}:{:02} left • charge {}",
                instance.current_phase,
                instance.last_phase,
                remaining / 60,
                remaining % 60,
                instance.abilities.ultimate_charge
            )))
            .gauge_style(Style::default().fg(threat_color(threat)))
            .ratio((instance.trace_level / 100.0).clamp(0.0, 1.0))
            .label(format!("{:.1}%", instance.trace_level));
        frame.render_widget(gauge, rows[0]);

        let columns = split_columns(rows[1]);
        let objectives: Vec<Line> = instance
            .objectives
            .iter()
            .enumerate()
            .map(|(idx, objective)| {
                let mark = if objective.completed {
                    "x"
                } else if objective.available {
                    " "
                } else {
                    "-"
                };
                let optional = if objective.required() { "" } else { " (optional)" };
                cursor_line(
                    idx == self.state.cursor,
                    format!(
                        "[{mark}] P{} {} +{}{optional}",
                        objective.phase_id, objective.template.name, objective.template.reward
                    ),
                )
            })
            .collect();
        frame.render_widget(
            Paragraph::new(objectives).block(Block::default().borders(Borders::ALL).title(format!(
                "Objectives • progress {}",
                instance.mission_progress
            ))),
            columns[0],
        );

        let mut abilities = Vec::new();
        if let Some(agent) = engine.content().agent(&instance.selected_agent) {
            for (key, slot) in [("1", AbilitySlot::Ability1), ("2", AbilitySlot::Ability2), ("u", AbilitySlot::Ultimate)] {
                let Some(ability) = agent.ability(slot) else {
                    continue;
                };
                let cooldown = engine.cooldown_remaining(instance, slot);
                let readiness = if slot == AbilitySlot::Ultimate {
                    format!("{}/{}", instance.abilities.ultimate_charge, ability.charge_required)
                } else if cooldown > 0 {
                    format!("{cooldown}s")
                } else {
                    "ready".to_string()
                };
                abilities.push(Line::from(format!("[{key}] {} • {readiness}", ability.name)));
            }
        }
        abilities.push(Line::from(""));
        for effect in instance.abilities.effects_snapshot() {
            if effect.is_active(now) {
                let left = (effect.end_time - now).num_seconds().max(0);
                abilities.push(Line::from(format!("{:?} {left}s", effect.kind)));
            }
        }
        abilities.push(Line::from(format!(
            "Alarms {} • score now {}",
            instance.alarms_triggered,
            engine.score(instance).score
        )));
        abilities.push(Line::from("t trace • a alarm • b backup • x abandon"));
        frame.render_widget(
            Paragraph::new(abilities).block(Block::default().borders(Borders::ALL).title("Abilities")),
            columns[1],
        );

        let events: Vec<Line> = instance
            .events
            .latest(EVENT_LINES)
            .map(|record| {
                Line::from(format!(
                    "{} {}",
                    record.at.with_timezone(&Local).format("%H:%M:%S"),
                    describe_event(&record.event)
                ))
            })
            .collect();
        frame.render_widget(
            Paragraph::new(events).block(Block::default().borders(Borders::ALL).title("Event log")),
            rows[2],
        );
    }

    fn draw_debrief(&self, frame: &mut Frame, area: Rect) {
        let columns = split_columns(area);
        let mut lines = Vec::new();
        if let Some(outcome) = self.active.as_ref().and_then(|instance| instance.outcome.as_ref()) {
            let color = match outcome.status {
                MissionStatus::Completed => Color::Green,
                MissionStatus::Failed => Color::Yellow,
                _ => Color::Red,
            };
            lines.push(Line::from(Span::styled(
                format!("{} • {} • {}", outcome.status.as_str().to_uppercase(), outcome.rank, outcome.final_score),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
            if let Some(reason) = &outcome.reason {
                lines.push(Line::from(format!("Reason: {reason}")));
            }
            lines.push(Line::from(format!("Time used: {}s", outcome.time_used)));
            if let Some(breakdown) = &outcome.breakdown {
                lines.push(Line::from(format!(
                    "Stealth ×{:.2} • Time ×{:.2} • Objectives ×{:.2}",
                    breakdown.stealth_multiplier, breakdown.time_multiplier, breakdown.objective_multiplier
                )));
                lines.push(Line::from(format!(
                    "No alarms ×{:.1} • Perfect ×{:.1} • Speed ×{:.1} • Penalties −{:.0}",
                    breakdown.no_alarms_bonus,
                    breakdown.perfect_run_bonus,
                    breakdown.speed_bonus,
                    breakdown.penalties
                )));
            }
            let shards = &outcome.hex_shards;
            lines.push(Line::from(format!(
                "Shards: C{} U{} R{} L{} M{}",
                shards.common, shards.uncommon, shards.rare, shards.legendary, shards.mythic
            )));
            for achievement in &outcome.achievements {
                lines.push(Line::from(format!("★ {achievement}: {}", achievement.description())));
            }
        }
        frame.render_widget(
            Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title("Debrief"))
                .wrap(Wrap { trim: true }),
            columns[0],
        );

        let board: Vec<Line> = self
            .service
            .leaderboard(LEADERBOARD_ROWS, Timeframe::All)
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| {
                Line::from(format!(
                    "{}. {} {} ({} runs, avg {})",
                    idx + 1,
                    entry.team_name,
                    entry.total_score,
                    entry.missions,
                    entry.average_rank
                ))
            })
            .collect();
        frame.render_widget(
            Paragraph::new(board).block(Block::default().borders(Borders::ALL).title("Leaderboard")),
            columns[1],
        );
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let hints = match self.screen {
            Screen::MissionSelect | Screen::AgentSelect => "↑/↓ select • Enter confirm • q quit",
            Screen::Play => "Enter complete • 1/2/u abilities • q quit",
            Screen::Debrief => "Enter continue • q quit",
        };
        let status = Paragraph::new(Line::from(vec![
            Span::styled(self.state.status.clone(), Style::default().fg(Color::White)),
            Span::styled(format!("  {hints}"), Style::default().fg(Color::DarkGray)),
        ]))
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(status, area);
    }
}

fn outcome_message<T>(result: Result<T, EngineError>, describe: impl FnOnce(T) -> String) -> String {
    match result {
        Ok(value) => describe(value),
        Err(err) => format!("Rejected: {err}"),
    }
}

fn describe_event(event: &MissionEvent) -> String {
    match event {
        MissionEvent::MissionStarted { mission_type, agent } => {
            format!("mission {mission_type} started with {agent}")
        }
        MissionEvent::ObjectiveCompleted { objective_id, reward, .. } => {
            format!("objective {objective_id} completed (+{reward})")
        }
        MissionEvent::PhaseCompleted { completed_phase, next_phase } => {
            format!("phase {completed_phase} complete, entering {next_phase}")
        }
        MissionEvent::AbilityUsed { name, .. } => format!("{name} activated"),
        MissionEvent::TraceBlocked { amount, source } => {
            format!("trace {amount:.1} from {source} blocked")
        }
        MissionEvent::FalseTelemetry { original_amount, reduced_amount } => {
            format!("false telemetry {original_amount:.1} → {reduced_amount:.1}")
        }
        MissionEvent::TraceIncreased { amount, source, new_level } => {
            format!("trace +{amount:.1} from {source} ({new_level:.1})")
        }
        MissionEvent::AlarmTriggered { source, total } => format!("alarm from {source} ({total})"),
        MissionEvent::BackupTacticsEngaged => "backup tactics engaged".to_string(),
        MissionEvent::BurnStateTriggered { .. } => "BURNED".to_string(),
        MissionEvent::MissionCompleted { final_score, rank, .. } => {
            format!("mission completed: {final_score} {rank}")
        }
        MissionEvent::MissionFailed { reason, final_score, .. } => {
            format!("mission failed ({reason}): {final_score}")
        }
    }
}

fn threat_color(threat: ThreatLevel) -> Color {
    match threat {
        ThreatLevel::Low => Color::Green,
        ThreatLevel::Moderate => Color::Yellow,
        ThreatLevel::High => Color::LightRed,
        ThreatLevel::Critical => Color::Red,
    }
}

fn cursor_line(selected: bool, text: String) -> Line<'static> {
    if selected {
        Line::from(Span::styled(
            format!("▶ {text}"),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(format!("  {text}"))
    }
}

fn split_columns(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area)
        .to_vec()
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    cursor: usize,
    status: String,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            cursor: 0,
            status: "Ready".to_string(),
            should_quit: false,
        }
    }
}

impl UiState {
    fn move_cursor(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, len as isize - 1) as usize;
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }
}
