//! Frame loop
//!
//! One thread, one loop at `FRAME_RATE`: drain key events, pump the hub link,
//! turn motor samples into paddle velocities, run fixed simulation substeps,
//! draw. The hub is polled without blocking so a slow or missing hub never
//! stalls rendering.

use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event};

use crate::consts::{FRAME_RATE, MAX_SUBSTEPS, SIM_DT};
use crate::device::{ButtonEdge, DeviceReader};
use crate::input::{self, Command, KeyboardControl};
use crate::motion::MotionMapper;
use crate::render::{Canvas, TerminalRenderer, scene};
use crate::select::SkillSelector;
use crate::sim::{GameEvent, GameState, MatchState, PlayerSkills, TickInput, tick};
use crate::{Port, Settings};

/// What the loop is currently showing
#[derive(Debug, Clone)]
pub enum Screen {
    Select(SkillSelector),
    Play,
    /// "Start a new game?" over a frozen match
    ConfirmNewGame,
}

pub struct App<D: DeviceReader> {
    device: D,
    settings: Settings,
    screen: Screen,
    state: GameState,
    mappers: [MotionMapper; 2],
    keyboard: KeyboardControl,
    launch_button: ButtonEdge,
    /// One-shot inputs waiting for the next substep
    pending: TickInput,
    accumulator: f32,
    seed: u64,
    quit: bool,

    // FPS tracking
    frame_times: [Duration; 60],
    frame_index: usize,
    fps: u32,
}

impl<D: DeviceReader> App<D> {
    /// Open on the selection screen unless `skills` is already decided
    pub fn new(device: D, settings: Settings, skills: Option<PlayerSkills>, seed: u64) -> Self {
        let initial = skills.unwrap_or_else(|| settings.skills());
        let keyboard = KeyboardControl::new(Duration::from_millis(settings.keyboard_hold_ms));
        let mappers = Port::ALL
            .map(|port| MotionMapper::new(settings.motion.clone(), initial.get(port).max_paddle_speed()));
        let button = device.button_pressed();

        let mut app = Self {
            device,
            screen: Screen::Select(SkillSelector::new(initial, button)),
            state: GameState::new(initial, seed),
            mappers,
            keyboard,
            launch_button: ButtonEdge::primed(button),
            pending: TickInput::default(),
            accumulator: 0.0,
            seed,
            quit: false,
            frame_times: [Duration::ZERO; 60],
            frame_index: 0,
            fps: 0,
            settings,
        };
        if let Some(skills) = skills {
            app.start_match(skills);
        }
        app
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Run until the player quits; returns the final score
    pub fn run(mut self, renderer: &mut TerminalRenderer) -> anyhow::Result<MatchState> {
        let frame = Duration::from_secs_f32(1.0 / FRAME_RATE as f32);
        let started = Instant::now();
        let mut last = started;

        while !self.quit {
            let frame_start = Instant::now();
            let now = frame_start - started;
            let dt = (frame_start - last).as_secs_f32();
            last = frame_start;

            while event::poll(Duration::ZERO)? {
                if let Event::Key(key) = event::read()?
                    && let Some(command) = input::command_for(&key)
                {
                    self.handle_command(command, now);
                }
            }
            if self.quit {
                break;
            }

            self.step(now, dt);

            let mut canvas = renderer.canvas();
            self.draw(&mut canvas);
            renderer.present(&canvas)?;

            thread::sleep(frame.saturating_sub(frame_start.elapsed()));
        }

        log::info!(
            "Final score {}-{} after {} rallies",
            self.state.match_state.score_a,
            self.state.match_state.score_b,
            self.state.match_state.rallies
        );
        Ok(self.state.match_state)
    }

    /// React to one key press
    pub fn handle_command(&mut self, command: Command, now: Duration) {
        match &mut self.screen {
            Screen::Select(selector) => {
                if matches!(command, Command::Quit | Command::Cancel) {
                    self.quit = true;
                } else if let Some(skills) = selector.on_command(command) {
                    self.start_match(skills);
                }
            }
            Screen::Play => match input::in_play(command) {
                Command::Move { port, direction } => self.keyboard.press(port, direction, now),
                Command::Launch => self.pending.launch = true,
                Command::ToggleDebug => self.pending.toggle_debug = true,
                Command::NewGame => {
                    log::debug!("New game requested");
                    self.keyboard.release_all();
                    self.screen = Screen::ConfirmNewGame;
                }
                Command::Quit | Command::Cancel => self.quit = true,
                Command::Confirm | Command::Up | Command::Down => {}
            },
            Screen::ConfirmNewGame => match command {
                Command::Confirm => self.begin_new_game(),
                Command::NewGame | Command::Cancel => self.screen = Screen::Play,
                Command::Quit => self.quit = true,
                _ => {}
            },
        }
    }

    /// One frame of device polling and simulation; `dt` is wall time since
    /// the previous frame (seconds)
    pub fn step(&mut self, now: Duration, dt: f32) {
        self.device.poll(now);
        self.track_fps(now);

        if let Screen::Select(selector) = &mut self.screen {
            for port in Port::ALL {
                if let Some(Ok(sample)) = self.device.read_angle(port) {
                    selector.on_sample(sample);
                }
            }
            if let Some(skills) = selector.on_button(self.device.button_pressed()) {
                self.start_match(skills);
            }
            return;
        }

        let mut input = std::mem::take(&mut self.pending);
        for port in Port::ALL {
            let read = self.device.read_angle(port);
            let mut motor = self.mappers[port.index()].update(read, now);
            if self.inverted(port) {
                motor = -motor;
            }
            let speed = self.state.skill(port).max_paddle_speed();
            let keys = self.keyboard.velocity(port, speed, now);
            input.paddle_velocity[port.index()] = input::combine(motor, keys);
        }
        if self.launch_button.update(self.device.button_pressed()) {
            input.launch = true;
        }

        // The match is frozen while the prompt is up
        if matches!(self.screen, Screen::ConfirmNewGame) {
            return;
        }

        self.accumulator += dt.min(0.1);
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(&mut self.state, &input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // Clear one-shot inputs after processing
            input.launch = false;
            input.toggle_debug = false;
        }
        if substeps == 0 {
            // Too early for a tick; keep the one-shots for the next frame
            self.pending.launch = input.launch;
            self.pending.toggle_debug = input.toggle_debug;
        }

        self.log_events();
    }

    fn inverted(&self, port: Port) -> bool {
        match port {
            Port::A => self.settings.invert_a,
            Port::B => self.settings.invert_b,
        }
    }

    fn start_match(&mut self, skills: PlayerSkills) {
        log::info!(
            "Starting match: Player 1 {}, Player 2 {}",
            skills.a,
            skills.b
        );
        let debug = self.state.match_state.debug_visible || self.settings.show_debug;
        self.state = GameState::new(skills, self.seed);
        self.state.match_state.debug_visible = debug;
        for port in Port::ALL {
            let mapper = &mut self.mappers[port.index()];
            mapper.set_max_speed(skills.get(port).max_paddle_speed());
            mapper.reset();
        }
        self.launch_button = ButtonEdge::primed(self.device.button_pressed());
        self.keyboard.release_all();
        self.pending = TickInput::default();
        self.accumulator = 0.0;
        self.screen = Screen::Play;
    }

    /// Confirmed "new game": scores reset, then skills are picked again
    fn begin_new_game(&mut self) {
        log::info!(
            "New game after {}-{}",
            self.state.match_state.score_a,
            self.state.match_state.score_b
        );
        self.state.new_match();
        self.seed = self.state.seed;
        self.screen = Screen::Select(SkillSelector::new(
            self.state.match_state.skills,
            self.device.button_pressed(),
        ));
    }

    fn log_events(&mut self) {
        for event in self.state.drain_events() {
            match event {
                GameEvent::PointScored {
                    scorer,
                    score_a,
                    score_b,
                } => log::info!("{} scores: {}-{}", scene::player_name(scorer), score_a, score_b),
                GameEvent::Launched { by } => log::debug!("{} served", scene::player_name(by)),
                GameEvent::SpeedUp { speed } => log::debug!("Ball speed up to {speed:.0} px/s"),
                GameEvent::PaddleHit { port, offset } => {
                    log::trace!("Paddle {port} hit at offset {offset:.2}")
                }
                GameEvent::WallHit => log::trace!("Wall bounce"),
            }
        }
    }

    fn track_fps(&mut self, now: Duration) {
        let oldest = self.frame_times[self.frame_index];
        self.frame_times[self.frame_index] = now;
        self.frame_index = (self.frame_index + 1) % self.frame_times.len();
        if oldest > Duration::ZERO && now > oldest {
            self.fps = (60.0 / (now - oldest).as_secs_f32()).round() as u32;
        }
    }

    pub fn draw(&self, canvas: &mut Canvas) {
        let hud = scene::Hud {
            hub: self.device.status(),
            fps: self.fps,
        };
        match &self.screen {
            Screen::Select(selector) => scene::draw_selection(canvas, selector, hud.hub),
            Screen::Play => scene::draw_game(canvas, &self.state, &hud),
            Screen::ConfirmNewGame => {
                scene::draw_game(canvas, &self.state, &hud);
                scene::draw_confirm(canvas, "Start a new game?");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SkillLevel;
    use crate::device::{HubStatus, MotorSample};
    use crate::error::DeviceError;
    use crate::sim::GamePhase;

    /// Scripted hub: motors turn at a fixed rate, button level set by the test
    #[derive(Default)]
    struct ScriptedHub {
        angle: [i32; 2],
        rate_per_frame: [i32; 2],
        button: bool,
        now: Duration,
        offline: bool,
    }

    impl DeviceReader for ScriptedHub {
        fn poll(&mut self, now: Duration) {
            self.now = now;
            for i in 0..2 {
                self.angle[i] += self.rate_per_frame[i];
            }
        }

        fn read_angle(&mut self, port: Port) -> Option<Result<MotorSample, DeviceError>> {
            if self.offline {
                return Some(Err(DeviceError::Unavailable));
            }
            Some(Ok(MotorSample {
                port,
                angle: self.angle[port.index()],
                timestamp: self.now,
            }))
        }

        fn button_pressed(&self) -> bool {
            self.button
        }

        fn status(&self) -> HubStatus {
            if self.offline {
                HubStatus::Disconnected
            } else {
                HubStatus::Connected
            }
        }
    }

    const FRAME: Duration = Duration::from_micros(16_667);

    fn run_frames<D: DeviceReader>(app: &mut App<D>, now: &mut Duration, frames: u32) {
        for _ in 0..frames {
            *now += FRAME;
            app.step(*now, FRAME.as_secs_f32());
        }
    }

    fn playing(hub: ScriptedHub) -> App<ScriptedHub> {
        App::new(
            hub,
            Settings::default(),
            Some(PlayerSkills::uniform(SkillLevel::NORMAL)),
            7,
        )
    }

    #[test]
    fn test_explicit_skills_skip_selection() {
        let app = playing(ScriptedHub::default());
        assert!(matches!(app.screen(), Screen::Play));
        let app = App::new(ScriptedHub::default(), Settings::default(), None, 7);
        assert!(matches!(app.screen(), Screen::Select(_)));
    }

    #[test]
    fn test_turning_motor_moves_paddle() {
        let hub = ScriptedHub {
            rate_per_frame: [3, 0],
            ..Default::default()
        };
        let mut app = playing(hub);
        let start = app.state().paddle(Port::A).position;
        let mut now = Duration::ZERO;
        run_frames(&mut app, &mut now, 30);
        assert!(app.state().paddle(Port::A).position > start);
        assert_eq!(app.state().paddle(Port::B).position, start);
    }

    #[test]
    fn test_inverted_motor_moves_the_other_way() {
        let hub = ScriptedHub {
            rate_per_frame: [3, 0],
            ..Default::default()
        };
        let settings = Settings {
            invert_a: true,
            ..Default::default()
        };
        let mut app = App::new(hub, settings, Some(PlayerSkills::default()), 7);
        let start = app.state().paddle(Port::A).position;
        let mut now = Duration::ZERO;
        run_frames(&mut app, &mut now, 30);
        assert!(app.state().paddle(Port::A).position < start);
    }

    #[test]
    fn test_button_edge_launches_once() {
        let mut app = playing(ScriptedHub::default());
        let mut now = Duration::ZERO;
        run_frames(&mut app, &mut now, 2);
        assert_eq!(app.state().phase, GamePhase::WaitingToLaunch);

        app.device.button = true;
        run_frames(&mut app, &mut now, 2);
        assert_eq!(app.state().phase, GamePhase::InPlay);
    }

    #[test]
    fn test_button_held_through_selection_does_not_launch() {
        let hub = ScriptedHub {
            button: true,
            ..Default::default()
        };
        let mut app = App::new(hub, Settings::default(), None, 7);
        app.handle_command(Command::Confirm, Duration::ZERO);
        app.handle_command(Command::Confirm, Duration::ZERO);
        assert!(matches!(app.screen(), Screen::Play));

        let mut now = Duration::ZERO;
        run_frames(&mut app, &mut now, 5);
        assert_eq!(app.state().phase, GamePhase::WaitingToLaunch);
    }

    #[test]
    fn test_keyboard_drives_paddle_without_hub() {
        let hub = ScriptedHub {
            offline: true,
            ..Default::default()
        };
        let mut app = playing(hub);
        let start = app.state().paddle(Port::B).position;
        let mut now = Duration::ZERO;
        for _ in 0..10 {
            app.handle_command(Command::Up, now);
            run_frames(&mut app, &mut now, 1);
        }
        assert!(app.state().paddle(Port::B).position < start);
    }

    #[test]
    fn test_new_game_needs_confirmation() {
        let mut app = playing(ScriptedHub::default());
        app.state.match_state.score_a = 4;

        app.handle_command(Command::NewGame, Duration::ZERO);
        assert!(matches!(app.screen(), Screen::ConfirmNewGame));
        app.handle_command(Command::Cancel, Duration::ZERO);
        assert!(matches!(app.screen(), Screen::Play));
        assert!(!app.quit_requested());
        assert_eq!(app.state().match_state.score_a, 4);

        app.handle_command(Command::NewGame, Duration::ZERO);
        app.handle_command(Command::Confirm, Duration::ZERO);
        assert!(matches!(app.screen(), Screen::Select(_)));
        assert_eq!(app.state().match_state.score_a, 0);
    }

    #[test]
    fn test_quit_key_works_on_prompt() {
        let mut app = playing(ScriptedHub::default());
        app.handle_command(Command::NewGame, Duration::ZERO);
        app.handle_command(Command::Quit, Duration::ZERO);
        assert!(app.quit_requested());
    }

    #[test]
    fn test_hub_lost_mid_rally_coasts_to_rest() {
        let hub = ScriptedHub {
            rate_per_frame: [3, 0],
            ..Default::default()
        };
        let mut app = playing(hub);
        let mut now = Duration::ZERO;
        app.handle_command(Command::Launch, now);
        run_frames(&mut app, &mut now, 20);
        assert!(app.state().paddle(Port::A).velocity > 0.0);

        app.device.offline = true;
        run_frames(&mut app, &mut now, 2);
        // Held through the stall timeout, not dropped at once
        assert!(app.state().paddle(Port::A).velocity > 0.0);

        let motion = Settings::default().motion;
        let settle = motion.stall_timeout() + motion.decay_window() + FRAME * 2;
        let frames = (settle.as_secs_f32() / FRAME.as_secs_f32()).ceil() as u32;
        run_frames(&mut app, &mut now, frames);
        assert_eq!(app.state().paddle(Port::A).velocity, 0.0);

        // Keyboard still drives the paddle
        let before = app.state().paddle(Port::A).position;
        for _ in 0..10 {
            let up = Command::Move {
                port: Port::A,
                direction: -1,
            };
            app.handle_command(up, now);
            run_frames(&mut app, &mut now, 1);
        }
        assert!(app.state().paddle(Port::A).position < before);
    }

    #[test]
    fn test_prompt_freezes_match() {
        let mut app = playing(ScriptedHub::default());
        let mut now = Duration::ZERO;
        app.handle_command(Command::Launch, now);
        run_frames(&mut app, &mut now, 1);
        assert_eq!(app.state().phase, GamePhase::InPlay);

        app.handle_command(Command::NewGame, now);
        let ball = app.state().ball.pos;
        run_frames(&mut app, &mut now, 10);
        assert_eq!(app.state().ball.pos, ball);
    }

    #[test]
    fn test_toggle_debug_applies_once() {
        let mut app = playing(ScriptedHub::default());
        let mut now = Duration::ZERO;
        app.handle_command(Command::ToggleDebug, now);
        run_frames(&mut app, &mut now, 3);
        assert!(app.state().match_state.debug_visible);
    }

    #[test]
    fn test_quit() {
        let mut app = playing(ScriptedHub::default());
        app.handle_command(Command::Quit, Duration::ZERO);
        assert!(app.quit_requested());
    }
}
