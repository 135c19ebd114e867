use slot_muse::audio_player::{default_backend, RhythmPlayer, DEFAULT_SAMPLE_RATE};
use slot_muse::catalog::Catalog;
use slot_muse::config::TimingConfig;
use slot_muse::console_display::ConsoleDisplay;
use slot_muse::coordinator::Coordinator;
use slot_muse::event_log::{EventLog, SessionHeader};
use slot_muse::machine::SlotMachine;
use slot_muse::rhythm;
use slot_muse::session_reader::{summarize, SessionReader};
use slot_muse::simulator::Simulator;
use slot_muse::types::*;

use clap::Parser;
use crossbeam_channel::bounded;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;

#[derive(Parser)]
#[command(name = "slot-muse")]
#[command(about = "Songwriting slot machine: spin for a key, progression, vibe and rhythm")]
struct Cli {
    /// Timing config JSON (animation_duration_ms, lever_pre_delay_ms, ...)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Catalog JSON overriding the built-in reel contents
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Multiplier on every delay (2.0 = half speed, 0.5 = double speed)
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Seed the lever's random draws for a reproducible session
    #[arg(long)]
    seed: Option<u64>,

    /// Scripted input: "basic" (default), "tour" (keys and progressions), or "stress"
    #[arg(long, default_value = "basic")]
    demo: String,

    /// Read commands from stdin instead of running a demo
    #[arg(long)]
    interactive: bool,

    /// Journal every render event to a session directory
    #[arg(long)]
    log_events: bool,

    /// Output directory for logged sessions
    #[arg(long, default_value = "./sessions")]
    output_dir: PathBuf,

    /// Disable the console board
    #[arg(long)]
    no_console: bool,

    /// Clear the terminal for every board frame
    #[arg(long)]
    redraw: bool,

    /// Play rhythms on the default output device (needs the 'audio' feature)
    #[arg(long)]
    audio: bool,

    /// Play the landed rhythm after every lever pull
    #[arg(long)]
    auto_play: bool,

    /// Render this rhythm's two-measure loop to WAV and exit
    #[arg(long)]
    export_rhythm: Option<String>,

    /// Destination for --export-rhythm
    #[arg(long, default_value = "rhythm.wav")]
    export_path: PathBuf,

    /// Print a summary of a recorded events.jsonl and exit
    #[arg(long)]
    replay: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();

    if let Some(path) = &cli.replay {
        replay(path);
        return;
    }

    let catalog = match &cli.catalog {
        Some(path) => Catalog::load(path),
        None => Ok(Catalog::default()),
    }
    .unwrap_or_else(|e| fail(&e.to_string()));

    if let Some(name) = &cli.export_rhythm {
        if !catalog.values(Category::Tempo).iter().any(|v| v == name) {
            warn!("{:?} is not on the tempo reel; exporting the default pattern", name);
        }
        match rhythm::export_wav(name, &cli.export_path, DEFAULT_SAMPLE_RATE) {
            Ok(_) => return,
            Err(e) => fail(&e.to_string()),
        }
    }

    if !(cli.speed.is_finite() && cli.speed >= 0.0) {
        fail(&format!("--speed must be a non-negative number, got {}", cli.speed));
    }
    let timing = match &cli.config {
        Some(path) => TimingConfig::load(path).unwrap_or_else(|e| fail(&e.to_string())),
        None => TimingConfig::default(),
    }
    .scaled(cli.speed);

    let clock = SessionClock::new();

    info!("═══════════════════════════════════════════════");
    info!("  SLOT MUSE v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "  Reels: {} keys, {} progressions, {} vibes, {} rhythms",
        catalog.len(Category::Key),
        catalog.len(Category::Progression),
        catalog.len(Category::Vibe),
        catalog.len(Category::Tempo)
    );
    info!(
        "  Slide {} ms, lever worst case {} ms",
        timing.animation_duration_ms,
        timing.worst_case_lever_ms(Category::ALL.len())
    );
    match cli.seed {
        Some(seed) => info!("  Seed: {}", seed),
        None => info!("  Seed: random"),
    }
    info!(
        "  Input: {}",
        if cli.interactive { "stdin commands".to_string() } else { format!("demo {:?}", cli.demo) }
    );
    info!("═══════════════════════════════════════════════");

    // Channel: inputs → coordinator
    let (input_tx, input_rx) = bounded::<InputEvent>(256);

    // Channels: coordinator → consumers
    let mut event_txs = Vec::new();
    let mut handles = Vec::new();

    // ─── Console board ──────────────────────────────────────────────
    if !cli.no_console {
        let (tx, rx) = bounded::<StampedEvent>(1024);
        event_txs.push(tx);
        let redraw = cli.redraw;
        handles.push(spawn("display", move || {
            ConsoleDisplay::new(rx, redraw).run();
        }));
    }

    // ─── Event log ──────────────────────────────────────────────────
    if cli.log_events {
        let (tx, rx) = bounded::<StampedEvent>(4096);
        let header = SessionHeader::new(cli.seed, &timing, &catalog);
        match EventLog::create(rx, &cli.output_dir, header) {
            Ok(log) => {
                event_txs.push(tx);
                handles.push(spawn("logger", move || match log.run() {
                    Ok(stats) => info!("Logged {} events", stats.total_events),
                    Err(e) => error!("Event log failed: {}", e),
                }));
            }
            Err(e) => error!("Event logging disabled, cannot create session dir: {}", e),
        }
    }

    // ─── Coordinator ────────────────────────────────────────────────
    // The audio backend may not be Send, so the player is built on this thread
    let want_audio = cli.audio;
    let auto_play = cli.auto_play;
    let seed = cli.seed;
    let coord_clock = clock.clone();
    handles.push(spawn("coordinator", move || {
        let mut machine = SlotMachine::new(catalog, timing).starting_at(coord_clock.now_ms());
        if let Some(seed) = seed {
            machine = machine.with_seed(seed);
        }
        let player = RhythmPlayer::new(default_backend(want_audio));
        Coordinator::new(input_rx, event_txs, machine, player, coord_clock)
            .with_auto_play(auto_play)
            .run();
    }));

    // ─── Input source ───────────────────────────────────────────────
    let speed = cli.speed;
    if cli.interactive {
        handles.push(spawn("input", move || {
            let stdin = std::io::stdin();
            Simulator::new(input_tx, speed).run_interactive(stdin.lock());
        }));
    } else {
        let demo = cli.demo.clone();
        handles.push(spawn("simulator", move || {
            Simulator::new(input_tx, speed).run(&demo);
        }));
    }

    for h in handles {
        let _ = h.join();
    }
    info!("Session over after {:.1}s", clock.now_ms() as f64 / 1000.0);
}

fn spawn<F>(name: &str, f: F) -> thread::JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.into())
        .spawn(f)
        .unwrap_or_else(|e| fail(&format!("failed to spawn {} thread: {}", name, e)))
}

fn replay(path: &Path) {
    let reader = SessionReader::open_file(path).unwrap_or_else(|e| fail(&e.to_string()));
    let header = reader.header.clone();
    let events = reader.read_all();
    let stats = summarize(&events);

    info!(
        "Session {:?}: v{}, seed {:?}, {} events over {:.1}s",
        path,
        header.version,
        header.seed,
        events.len(),
        events.last().map_or(0, |e| e.t_ms) as f64 / 1000.0
    );
    info!(
        "  {} rotations, {} lever pulls, {} rhythms played",
        stats.rotations, stats.lever_pulls, stats.rhythms_played
    );
    if let Some(sel) = &stats.last_selection {
        for category in Category::ALL {
            info!("  {:<12} {}", category.name(), sel.value(category));
        }
    }
}

fn fail(msg: &str) -> ! {
    error!("{}", msg);
    process::exit(1);
}
