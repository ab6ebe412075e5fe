/// Entry point and frame loop.
///
/// The loop only moves data between the terminal and `Game`:
///
///   keys ──▶ InputState ──▶ move_avatar / start_dig / tick ──▶ Snapshot ──▶ Renderer
///
/// Every rule lives in the library; nothing here inspects world state
/// beyond the phase.

mod ui;

use std::io;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags};
use crossterm::{execute, terminal};
use tracing::{info, trace, warn};
use tracing_subscriber::EnvFilter;

use digger::config::GameConfig;
use digger::domain::entity::Direction;
use digger::sim::game::Game;
use digger::sim::level::LevelCatalog;
use digger::sim::world::Phase;
use ui::input::InputState;
use ui::renderer::{Frame, Renderer};

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const LOG_FILE: &str = "digger.log";
const LOG_ENV: &str = "DIGGER_LOG";

fn main() {
    init_tracing();

    let config = GameConfig::load();
    let mut game = Game::new(LevelCatalog::builtin(), config.clone());
    info!(levels = game.level_count(), "digger starting");

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    // Release events make held keys exact; without them InputState falls
    // back to a hold timeout.
    let enhanced = matches!(terminal::supports_keyboard_enhancement(), Ok(true))
        && execute!(
            io::stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )
        .is_ok();

    let result = game_loop(&mut game, &mut renderer, &config, enhanced);

    if enhanced {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Digger!");
}

/// Logs go to a file; the terminal belongs to the renderer.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let file = match std::fs::File::create(LOG_FILE) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("logging disabled: could not create {LOG_FILE}: {e}");
            return;
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .compact()
        .init();
}

fn game_loop(
    game: &mut Game,
    renderer: &mut Renderer,
    config: &GameConfig,
    enhanced: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = InputState::new();
    input.honor_release = enhanced;

    let tick_rate = Duration::from_millis(config.driver.tick_rate_ms);
    let mut last_tick = Instant::now();
    let mut pending_dig: Option<Direction> = None;

    loop {
        input.drain_events();

        if handle_meta(game, &input, config) {
            break;
        }

        // Dig presses are edge-triggered; hold one until the next tick so a
        // press between ticks is not lost.
        if game.phase() == Phase::Playing {
            if let Some(dir) = input.dig_pressed() {
                pending_dig = Some(dir);
            }
        } else {
            pending_dig = None;
        }

        if last_tick.elapsed() >= tick_rate {
            let dt = last_tick.elapsed().as_secs_f32().min(config.driver.max_frame_dt);
            last_tick = Instant::now();

            if game.phase() == Phase::Playing {
                game.move_avatar(input.held_direction(), dt);
                if let Some(dir) = pending_dig.take() {
                    game.start_dig(dir);
                }
                for event in game.tick(dt) {
                    trace!(?event, "sim event");
                }
            }
        }

        let frame = Frame {
            has_next_level: game.next_level_id().is_some(),
            level_count: game.level_count(),
        };
        renderer.render(&game.snapshot(), frame)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Phase-level keys (start, pause, restart, advance, quit).
/// Returns true when the player asked to quit.
fn handle_meta(game: &mut Game, input: &InputState, config: &GameConfig) -> bool {
    if input.quit_pressed() {
        return true;
    }

    match game.phase() {
        Phase::Title => {
            if input.escape_pressed() {
                return true;
            }
            if input.confirm_pressed() {
                start_first_level(game, config);
            }
        }
        Phase::Playing => {
            if input.pause_pressed() || input.escape_pressed() {
                game.pause();
            } else if input.restart_pressed() {
                game.restart();
            }
        }
        Phase::Paused => {
            if input.pause_pressed() || input.escape_pressed() {
                game.resume();
            } else if input.restart_pressed() {
                game.restart();
            }
        }
        Phase::Win => {
            if input.escape_pressed() {
                return true;
            }
            if input.confirm_pressed() {
                match game.next_level_id() {
                    Some(id) => {
                        game.load(id);
                    }
                    None => start_first_level(game, config),
                }
            }
        }
        Phase::Lose => {
            if input.escape_pressed() {
                return true;
            }
            if input.restart_pressed() || input.confirm_pressed() {
                game.restart();
            }
        }
    }
    false
}

/// Load the configured start level, or the lowest id if that one is
/// missing.
fn start_first_level(game: &mut Game, config: &GameConfig) {
    if game.load(config.driver.start_level) {
        return;
    }
    warn!(id = config.driver.start_level, "start level unavailable");
    let fallback = game.level_ids().into_iter().next();
    if let Some(id) = fallback {
        game.load(id);
    }
}
