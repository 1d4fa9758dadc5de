/// Entry point and game loop.

mod ui;

use std::path::Path;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use blocklift::config::GameConfig;
use blocklift::sim::event::GameEvent;
use blocklift::sim::level::TomlLevelStore;
use blocklift::sim::save::{self, QUICKSAVE};
use blocklift::sim::step::{self, Ticker};
use blocklift::{Engine, EngineError};
use ui::gamepad::GamepadState;
use ui::input::{Command, InputState, Prompt};
use ui::renderer::{Renderer, Scene};
use ui::sound::{SoundEngine, CUE_LEVEL_START, CUE_LIFE_LOST};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();
    init_logging(&config.log_file);

    let seed = config.seed.unwrap_or_else(rand::random);
    info!("starting at '{}' with seed {}", config.start_level, seed);

    let saves_dir = save::save_dir();
    let store = TomlLevelStore::new(&config.levels_dir, &saves_dir);
    let mut engine = Engine::new(store, seed);

    if let Err(e) = engine.reset(&config.start_level) {
        error!("could not load '{}': {e}", config.start_level);
        eprintln!("Could not load level '{}': {e}", config.start_level);
        return;
    }

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    let mut saver = TomlLevelStore::new(&config.levels_dir, &saves_dir);

    let result = game_loop(&mut engine, &mut saver, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        error!("terminal error: {e}");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Block Lift!");
}

/// Log to a file; the terminal belongs to the renderer while the game runs.
fn init_logging(path: &Path) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    match std::fs::File::create(path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => {
            eprintln!("Warning: cannot open log file {}: {e}", path.display());
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
}

fn game_loop(
    engine: &mut Engine<TomlLevelStore>,
    saver: &mut TomlLevelStore,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> std::io::Result<()> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new(&config.gamepad);
    if gp.connected {
        info!("gamepad connected");
    }
    let mut scene = Scene::new();
    let mut ticker = Ticker::new(config.speed.ai_move_rate);
    let mut errors = ErrorLog::default();
    let tick_rate = Duration::from_millis(config.speed.tick_rate_ms);
    let mut last_tick = Instant::now();

    drain_events(engine, &mut scene, sound);

    loop {
        let mut commands = kb.drain_events();
        let pad = gp.poll();
        if kb.prompt().is_none() {
            commands.extend(pad);
        }

        for cmd in commands {
            let result = match cmd {
                Command::Quit => return Ok(()),
                Command::Act(action) => step::apply(engine, action).map(|_| ()),
                Command::Restart => engine.restart_current(),
                Command::Save => {
                    kb.open_prompt(Prompt::SaveName(QUICKSAVE.to_string()));
                    Ok(())
                }
                Command::SaveAs { name, overwrite } => match engine.save(&name, overwrite, saver) {
                    Ok(()) => {
                        scene.set_notice(format!("Game saved as '{name}'"));
                        Ok(())
                    }
                    Err(EngineError::SaveExists(name)) => {
                        kb.open_prompt(Prompt::Overwrite(name));
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
                Command::Load => engine.open_prompted(),
            };
            if let Err(e) = result {
                errors.report(&e, &mut scene);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            if let Err(e) = ticker.tick(engine) {
                errors.report(&e, &mut scene);
            }
            last_tick = Instant::now();
        }

        drain_events(engine, &mut scene, sound);
        scene.prompt = kb.prompt().map(Prompt::text);
        renderer.render(&scene)?;
        std::thread::sleep(FRAME_SLEEP);
    }
}

/// Feed queued engine events to the scene and the sound engine.
fn drain_events(engine: &mut Engine<TomlLevelStore>, scene: &mut Scene, sound: Option<&SoundEngine>) {
    for event in engine.take_events() {
        if let Some(sfx) = sound {
            match &event {
                GameEvent::Cue(cue) => sfx.play(cue.name()),
                GameEvent::LifeLost { .. } => sfx.play(CUE_LIFE_LOST),
                GameEvent::LevelLoaded { .. } => sfx.play(CUE_LEVEL_START),
                _ => {}
            }
        }
        scene.apply(&event);
    }
}

/// Errors repeat every tick while their cause stands (a door whose next
/// level is missing, say); log and show each one only when it changes.
#[derive(Default)]
struct ErrorLog {
    last: Option<String>,
}

impl ErrorLog {
    fn report(&mut self, e: &EngineError, scene: &mut Scene) {
        let text = e.to_string();
        if self.last.as_deref() == Some(text.as_str()) {
            return;
        }
        match e {
            EngineError::EmptyLevelId => warn!("{text}"),
            _ => error!("{text}"),
        }
        scene.set_notice(text.clone());
        self.last = Some(text);
    }
}
