use crate::types::*;
use crossbeam_channel::Sender;
use log::{info, warn};
use std::io::BufRead;
use std::thread;
use std::time::Duration;

/// One scripted input source step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Wait { ms: u32 },
    Input(InputEvent),
}

/// Drives the coordinator with scripted demo sequences or with text
/// commands read line by line, standing in for the click zones and lever.
pub struct Simulator {
    tx: Sender<InputEvent>,
    /// Multiplier on every wait (< 1.0 = faster), kept in step with the
    /// animation timing scale.
    speed: f64,
}

impl Simulator {
    pub fn new(tx: Sender<InputEvent>, speed: f64) -> Self {
        Self { tx, speed }
    }

    /// Play the named demo. Blocks the calling thread. Returns false if the
    /// coordinator hung up before the script finished.
    pub fn run(&self, demo: &str) -> bool {
        let steps = demo_sequence(demo).unwrap_or_else(|| {
            warn!("Unknown demo {:?}, playing \"basic\"", demo);
            basic_sequence()
        });
        info!("Simulator starting demo {:?} ({} steps)...", demo, steps.len());

        for step in &steps {
            match step {
                Step::Wait { ms } => {
                    let ms = (*ms as f64 * self.speed).round() as u64;
                    thread::sleep(Duration::from_millis(ms));
                }
                Step::Input(event) => {
                    info!("  {}", describe(event));
                    if self.tx.send(event.clone()).is_err() {
                        return false;
                    }
                }
            }
        }
        info!("Demo sequence complete.");
        true
    }

    /// Forward text commands from `input` until EOF or `quit`.
    pub fn run_interactive<R: BufRead>(&self, input: R) {
        info!("Commands: {}", HELP);
        for line in input.lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if matches!(line, "quit" | "exit" | "q") {
                break;
            }
            match parse_command(line) {
                Some(event) => {
                    if self.tx.send(event).is_err() {
                        break;
                    }
                }
                None => warn!("Unrecognized {:?}. {}", line, HELP),
            }
        }
        info!("Input closed.");
    }
}

pub const HELP: &str = "up <reel> | down <reel> | lever | play | stop | quit  (reels: key, prog, vibe, tempo)";

/// Parse one text command. Case-insensitive; reels accept short aliases.
///
/// `up key`, `down prog`, `u v`, `lever` / `pull`, `play`, `stop`
pub fn parse_command(line: &str) -> Option<InputEvent> {
    let lower = line.trim().to_ascii_lowercase();
    let mut words = lower.split_whitespace();
    let verb = words.next()?;
    let arg = words.next();
    if words.next().is_some() {
        return None;
    }

    let event = match (verb, arg) {
        ("up" | "u", Some(reel)) => InputEvent::Rotate(Category::parse(reel)?, Direction::Up),
        ("down" | "d", Some(reel)) => InputEvent::Rotate(Category::parse(reel)?, Direction::Down),
        ("lever" | "pull" | "l", None) => InputEvent::PullLever,
        ("play" | "p", None) => InputEvent::PlayRhythm,
        ("stop" | "s", None) => InputEvent::StopRhythm,
        _ => return None,
    };
    Some(event)
}

fn describe(event: &InputEvent) -> String {
    match event {
        InputEvent::Rotate(category, direction) => format!("{:?} {}", direction, category),
        InputEvent::PullLever => "pull lever".into(),
        InputEvent::PlayRhythm => "play rhythm".into(),
        InputEvent::StopRhythm => "stop rhythm".into(),
    }
}

// ─── Demo sequences ─────────────────────────────────────────────────────────

pub const DEMOS: [&str; 3] = ["basic", "tour", "stress"];

pub fn demo_sequence(name: &str) -> Option<Vec<Step>> {
    match name {
        "basic" => Some(basic_sequence()),
        "tour" => Some(tour_sequence()),
        "stress" => Some(stress_sequence()),
        _ => None,
    }
}

fn rotate(category: Category, direction: Direction) -> Step {
    Step::Input(InputEvent::Rotate(category, direction))
}

fn wait(ms: u32) -> Step {
    Step::Wait { ms }
}

/// Every interaction once, with room for each animation to finish.
fn basic_sequence() -> Vec<Step> {
    vec![
        wait(400),
        // Walk each reel one card up and back
        rotate(Category::Key, Direction::Up),
        wait(300),
        rotate(Category::Progression, Direction::Up),
        wait(300),
        rotate(Category::Vibe, Direction::Down),
        wait(300),
        rotate(Category::Tempo, Direction::Up),
        wait(300),
        rotate(Category::Key, Direction::Down),
        wait(300),
        // Double click: the second rotate lands mid-slide and is dropped
        rotate(Category::Vibe, Direction::Up),
        wait(40),
        rotate(Category::Vibe, Direction::Up),
        wait(400),
        // Lever, then hear what it landed on
        Step::Input(InputEvent::PullLever),
        wait(1200),
        Step::Input(InputEvent::PlayRhythm),
        wait(2500),
        Step::Input(InputEvent::StopRhythm),
        wait(300),
        Step::Input(InputEvent::PullLever),
        wait(1200),
    ]
}

/// Spin through keys so chord spellings and progression hints update.
fn tour_sequence() -> Vec<Step> {
    let mut steps = vec![wait(400)];
    for _ in 0..6 {
        steps.push(rotate(Category::Key, Direction::Up));
        steps.push(wait(350));
    }
    for _ in 0..4 {
        steps.push(rotate(Category::Progression, Direction::Up));
        steps.push(wait(350));
    }
    for _ in 0..3 {
        steps.push(Step::Input(InputEvent::PullLever));
        steps.push(wait(1000));
        steps.push(Step::Input(InputEvent::PlayRhythm));
        steps.push(wait(3000));
    }
    steps.push(Step::Input(InputEvent::StopRhythm));
    steps.push(wait(300));
    steps
}

/// Inputs faster than animations can finish: most are dropped, the
/// machine must stay consistent.
fn stress_sequence() -> Vec<Step> {
    let mut steps = vec![wait(200)];
    for i in 0..80usize {
        let category = Category::ALL[i % 4];
        let direction = if i % 3 == 0 { Direction::Down } else { Direction::Up };
        steps.push(rotate(category, direction));
        if i % 10 == 5 {
            steps.push(Step::Input(InputEvent::PullLever));
        }
        if i % 25 == 0 {
            steps.push(Step::Input(InputEvent::PlayRhythm));
        }
        steps.push(wait(15));
    }
    steps.push(wait(1000));
    steps
}
