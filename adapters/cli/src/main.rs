#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Sidecraft session.
//!
//! The session walks the player across generated terrain with a scripted
//! input sequence and writes the final frame to a PNG file.

mod session;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use glam::{UVec2, Vec2};
use image::RgbaImage;
use sidecraft_core::{ColumnGenerator, Command, EntityId, Event, GridPos, Vector2, WORLD_ROWS};
use sidecraft_pack_classic::{self as classic, PLAYER, PLAYER_SIZE};
use sidecraft_rendering::{Camera, FrameSink};
use sidecraft_system_control::{WalkController, WalkInput, WalkTuning};
use sidecraft_system_generation::{CachedGenerator, LayeredTerrain};
use sidecraft_world::{self as world, query, World, WorldSettings};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use session::SessionSettings;

/// Frames between scripted changes of walking direction.
const WALK_PHASE: u64 = 120;
/// Frames between scripted jumps.
const JUMP_PERIOD: u64 = 45;

/// Command-line arguments; flags override the configuration file.
#[derive(Debug, Parser)]
#[command(name = "sidecraft", about = "Runs a headless Sidecraft session")]
struct Cli {
    /// TOML file with session and generator settings.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Terrain seed.
    #[arg(long)]
    seed: Option<u32>,
    /// Number of frames to simulate.
    #[arg(long)]
    frames: Option<u64>,
    /// PNG file receiving the last frame.
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Entry point for the Sidecraft command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    let mut sink = LastFrameWriter::new(settings.output.clone());
    run(&settings, &mut sink)?;
    sink.finish()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_settings(cli: &Cli) -> Result<SessionSettings> {
    let mut settings = match &cli.config {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            SessionSettings::from_toml_str(&contents)
                .with_context(|| format!("invalid settings in {}", path.display()))?
        }
        None => SessionSettings::default(),
    };
    if let Some(seed) = cli.seed {
        settings.generator.seed = seed;
    }
    if let Some(frames) = cli.frames {
        settings.frames = frames;
    }
    if let Some(output) = &cli.output {
        settings.output = output.clone();
    }
    Ok(settings)
}

fn run(settings: &SessionSettings, sink: &mut impl FrameSink) -> Result<()> {
    let catalog = classic::catalog().context("failed to register the classic pack")?;
    let terrain = LayeredTerrain::new(catalog.clone(), settings.generator.clone())
        .context("terrain generator settings are unusable")?;
    let mut world = World::with_settings(
        CachedGenerator::new(terrain),
        Vector2::new(settings.gravity[0], settings.gravity[1]),
        WorldSettings {
            window_cache_capacity: settings.window_cache_capacity,
        },
    );

    let requested = Vector2::new(settings.spawn[0], settings.spawn[1]);
    let spawn = clear_spawn(&mut world, requested)?;
    let player = world.add(catalog.spawn_entity(PLAYER, spawn, [])?);
    info!(x = spawn.x, y = spawn.y, "player spawned");

    let [width, height] = settings.resolution;
    let mut camera = Camera::new(Vec2::ZERO, UVec2::new(width, height))?;
    let mut controller = WalkController::new(WalkTuning::default());
    let dt = Duration::from_secs(1) / settings.fps;

    let mut commands = Vec::new();
    let mut events = Vec::new();
    for frame in 0..settings.frames {
        let snapshot =
            query::entity_snapshot(&world, player).context("player left the world")?;
        camera.follow(snapshot.position());

        let head = camera.world_to_screen(snapshot.position() + Vector2::new(0.0, 0.75));
        let input = scripted_input(frame, camera.resolution().as_vec2() / 2.0 - head);
        controller.handle(&input, &snapshot, dt, &mut commands);
        commands.push(Command::Tick { dt });
        for command in commands.drain(..) {
            world::apply(&mut world, command, &mut events)?;
        }
        report(frame, player, events.drain(..));

        let snapshot =
            query::entity_snapshot(&world, player).context("player left the world")?;
        camera.follow(snapshot.position());
        let window = world.image(camera.visible_columns(), camera.visible_rows())?;
        sink.submit(frame, camera.present(&window))?;
    }

    info!(
        frames = settings.frames,
        columns = query::stored_columns(&world),
        composites = query::composite_count(&world),
        "session finished"
    );
    Ok(())
}

/// Raises `requested` until the player no longer overlaps solid terrain.
fn clear_spawn<G: ColumnGenerator>(world: &mut World<G>, requested: Vector2) -> Result<Vector2> {
    let half_width = PLAYER_SIZE.x / 2.0;
    let first = (requested.x - half_width).floor() as i32;
    let last = (requested.x + half_width).floor() as i32;
    let mut surface: Option<i32> = None;
    for column in first..=last {
        for row in (0..WORLD_ROWS).rev() {
            if world.tile(GridPos::new(column, row))?.has_collision() {
                surface = surface.max(Some(row));
                break;
            }
        }
    }
    let lowest = match surface {
        Some(row) => (row + 1) as f32 + PLAYER_SIZE.y / 2.0,
        None => requested.y,
    };
    Ok(Vector2::new(requested.x, requested.y.max(lowest)))
}

/// Input for `frame`: walk in alternating directions, jump periodically, and
/// sweep the cursor in a circle around the screen centre.
fn scripted_input(frame: u64, head_to_centre: Vec2) -> WalkInput {
    let rightwards = (frame / WALK_PHASE) % 2 == 0;
    let angle = frame as f32 * 0.05;
    let cursor = Vec2::new(angle.cos() * 96.0, angle.sin() * 64.0) + head_to_centre;
    WalkInput {
        left: !rightwards,
        right: rightwards,
        jump: frame % JUMP_PERIOD == JUMP_PERIOD - 1,
        aim: Vector2::new(cursor.x, cursor.y),
    }
}

fn report(frame: u64, player: EntityId, events: impl Iterator<Item = Event>) {
    for event in events {
        match event {
            Event::FieldRejected { error } => warn!(frame, %error, "field change rejected"),
            Event::EntityMissing { entity } => {
                warn!(frame, entity = entity.get(), "command addressed a missing entity");
            }
            Event::TileRejected { position } => {
                warn!(frame, %position, "tile command outside the world rows");
            }
            Event::EntityLanded { entity } if entity == player => debug!(frame, "player landed"),
            Event::EntityHitWall { entity } if entity == player => {
                debug!(frame, "player hit a wall");
            }
            _ => {}
        }
    }
}

/// Keeps the most recent frame and writes it as a PNG when the session ends.
#[derive(Debug)]
struct LastFrameWriter {
    path: PathBuf,
    last: Option<RgbaImage>,
}

impl LastFrameWriter {
    fn new(path: PathBuf) -> Self {
        Self { path, last: None }
    }
}

impl FrameSink for LastFrameWriter {
    fn submit(&mut self, _index: u64, frame: RgbaImage) -> Result<()> {
        self.last = Some(frame);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(frame) = self.last.take() else {
            warn!("no frames were simulated, nothing written");
            return Ok(());
        };
        frame
            .save(&self.path)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        info!(path = %self.path.display(), "last frame written");
        Ok(())
    }
}
