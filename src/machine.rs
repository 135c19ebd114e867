//! The reel sequencer and lever orchestrator.
//!
//! `SlotMachine` owns every reel's state and a timer queue on a virtual
//! millisecond clock. Callers feed it discrete inputs (`rotate`,
//! `pull_lever`) and move time forward with `advance_to`; everything the
//! renderer needs comes back as `RenderEvent`s from `drain_events`.
//!
//! ```text
//! rotate ──► lock reel, index ± 1, SlideStart ──(animation)──► SlideFinish, RotationComplete
//!
//! pull_lever ──► LeverCue ──(pre-delay)──► LeverRelease
//!                   │
//!                   ├─ +0·stagger  key run ─┐
//!                   ├─ +1·stagger  prog run ├─ each: ≤3 slides ──► ReelSettled
//!                   ├─ +2·stagger  vibe run │
//!                   └─ +3·stagger  tempo run┘
//!                                      all 4 settled ──► LeverComplete, CardRefresh ×4
//! ```

use crate::catalog::Catalog;
use crate::config::{TimingConfig, MAX_LEVER_STEPS};
use crate::reel::ReelState;
use crate::theory;
use crate::timer::TimerQueue;
use crate::types::*;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Why an input was dropped. Dropping is the defined behaviour, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// That reel (or, for the lever, some reel) is mid-animation.
    ReelBusy(Category),
    /// A lever pull is still running.
    LeverActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Started { index: usize },
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeverPull {
    Started,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlideOrigin {
    Manual,
    Lever,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    SlideDone(Category, SlideOrigin),
    LeverRelease,
    RunStart(Category),
    NextStep(Category),
}

/// One reel's share of a lever pull.
#[derive(Debug, Clone, Copy)]
struct ReelRun {
    target: usize,
    direction: Direction,
    steps: usize,
    taken: usize,
}

impl ReelRun {
    /// Index shown by the next step. The last step lands exactly on `target`.
    fn next_shown(&self, len: usize) -> usize {
        let remaining = (self.steps - self.taken - 1) as isize;
        wrap_index(self.target, -remaining * self.direction.step(), len)
    }
}

/// Lives from `pull_lever` until the last reel settles.
#[derive(Debug, Default)]
struct LeverRun {
    runs: [Option<ReelRun>; 4],
    settled: usize,
}

/// Direction and number of visible steps for a lever run from `current` to
/// `target`. Landing on the same card still turns the reel once.
pub fn plan_run(current: usize, target: usize) -> (Direction, usize) {
    if target == current {
        return (Direction::Up, 1);
    }
    let direction = if target > current {
        Direction::Up
    } else {
        Direction::Down
    };
    (direction, current.abs_diff(target).min(MAX_LEVER_STEPS))
}

pub struct SlotMachine {
    catalog: Catalog,
    timing: TimingConfig,
    reels: [ReelState; 4],
    timers: TimerQueue<Timer>,
    lever: Option<LeverRun>,
    rng: StdRng,
    now_ms: u64,
    outbox: Vec<RenderEvent>,
    lever_pulls: u64,
}

impl SlotMachine {
    pub fn new(catalog: Catalog, timing: TimingConfig) -> Self {
        let reels = Category::ALL.map(|c| ReelState::new(c, catalog.len(c)));
        Self {
            catalog,
            timing,
            reels,
            timers: TimerQueue::new(),
            lever: None,
            rng: StdRng::from_entropy(),
            now_ms: 0,
            outbox: Vec::new(),
            lever_pulls: 0,
        }
    }

    /// Reproducible lever draws.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Start the virtual clock at `now_ms` (e.g. the session clock at startup).
    pub fn starting_at(mut self, now_ms: u64) -> Self {
        self.now_ms = now_ms;
        self
    }

    // ─── Queries ────────────────────────────────────────────────────────

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn index(&self, category: Category) -> usize {
        self.reels[category.slot()].index()
    }

    pub fn value(&self, category: Category) -> &str {
        self.catalog.value(category, self.index(category))
    }

    pub fn is_animating(&self, category: Category) -> bool {
        self.reels[category.slot()].is_animating()
    }

    pub fn busy_reel(&self) -> Option<Category> {
        self.reels
            .iter()
            .find(|r| r.is_animating())
            .map(|r| r.category)
    }

    pub fn lever_active(&self) -> bool {
        self.lever.is_some()
    }

    /// Nothing animating, no lever run, no pending timers.
    pub fn is_idle(&self) -> bool {
        self.timers.is_empty() && self.lever.is_none() && self.busy_reel().is_none()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    pub fn lever_pulls(&self) -> u64 {
        self.lever_pulls
    }

    /// The card currently selected on `category`, with derived content.
    pub fn card(&self, category: Category) -> Card {
        self.card_at(category, self.index(category))
    }

    fn card_at(&self, category: Category, index: usize) -> Card {
        let value = self.catalog.value(category, index);
        Card {
            category,
            index,
            value: value.to_string(),
            derived: theory::derive(category, value, self.value(Category::Key)),
        }
    }

    pub fn cards(&self) -> [Card; 4] {
        Category::ALL.map(|c| self.card(c))
    }

    pub fn selection(&self) -> Selection {
        Selection {
            indices: Category::ALL.map(|c| self.index(c)),
            values: Category::ALL.map(|c| self.value(c).to_string()),
        }
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<RenderEvent> {
        std::mem::take(&mut self.outbox)
    }

    // ─── Inputs ─────────────────────────────────────────────────────────

    /// Turn one reel by one card. Dropped while that reel animates or a
    /// lever pull is running.
    pub fn rotate(&mut self, category: Category, direction: Direction) -> Rotation {
        if self.lever.is_some() {
            debug!("rotate {} {:?} ignored: lever active", category, direction);
            return Rotation::Ignored(IgnoreReason::LeverActive);
        }
        let reel = &mut self.reels[category.slot()];
        if !reel.lock() {
            debug!("rotate {} {:?} ignored: reel busy", category, direction);
            return Rotation::Ignored(IgnoreReason::ReelBusy(category));
        }
        let index = reel.advance(direction);

        let card = self.card(category);
        debug!("rotate {} {:?} → #{} {}", category, direction, index, card.value);
        self.outbox.push(RenderEvent::SlideStart { card, direction });
        self.schedule(
            self.timing.animation_duration_ms,
            Timer::SlideDone(category, SlideOrigin::Manual),
        );
        Rotation::Started { index }
    }

    /// Randomize every reel. Dropped while any reel animates or a pull is
    /// already running.
    pub fn pull_lever(&mut self) -> LeverPull {
        if self.lever.is_some() {
            debug!("lever ignored: already running");
            return LeverPull::Ignored(IgnoreReason::LeverActive);
        }
        if let Some(busy) = self.busy_reel() {
            debug!("lever ignored: {} animating", busy);
            return LeverPull::Ignored(IgnoreReason::ReelBusy(busy));
        }
        self.lever = Some(LeverRun::default());
        self.lever_pulls += 1;
        info!("Lever pull #{}", self.lever_pulls);
        self.outbox.push(RenderEvent::LeverCue);
        self.schedule(self.timing.lever_pre_delay_ms, Timer::LeverRelease);
        LeverPull::Started
    }

    // ─── Time ───────────────────────────────────────────────────────────

    /// Fire every timer due at or before `now_ms`, in deadline order,
    /// including timers scheduled while firing. Returns how many fired.
    /// Time never moves backwards.
    pub fn advance_to(&mut self, now_ms: u64) -> usize {
        let mut fired = 0;
        while let Some((deadline, timer)) = self.timers.pop_due(now_ms) {
            self.now_ms = self.now_ms.max(deadline);
            self.fire(timer);
            fired += 1;
        }
        self.now_ms = self.now_ms.max(now_ms);
        fired
    }

    /// Run the clock forward until no timers remain. Returns the final time.
    pub fn run_until_idle(&mut self) -> u64 {
        while let Some(deadline) = self.timers.next_deadline() {
            self.advance_to(deadline);
        }
        self.now_ms
    }

    fn schedule(&mut self, delay_ms: u64, timer: Timer) {
        self.timers.schedule_at(self.now_ms + delay_ms, timer);
    }

    fn fire(&mut self, timer: Timer) {
        match timer {
            Timer::SlideDone(category, SlideOrigin::Manual) => self.finish_rotation(category),
            Timer::SlideDone(category, SlideOrigin::Lever) => self.finish_lever_step(category),
            Timer::LeverRelease => self.release_lever(),
            Timer::RunStart(category) => self.start_run(category),
            Timer::NextStep(category) => self.lever_step(category),
        }
    }

    // ─── Single-reel rotation ───────────────────────────────────────────

    fn finish_rotation(&mut self, category: Category) {
        self.outbox.push(RenderEvent::SlideFinish { category });
        self.reels[category.slot()].unlock();
        let index = self.index(category);
        self.outbox
            .push(RenderEvent::RotationComplete { category, index });
        // The progression hint is spelled in the current key
        if category == Category::Key {
            let card = self.card(Category::Progression);
            self.outbox.push(RenderEvent::CardRefresh { card });
        }
    }

    // ─── Lever orchestration ────────────────────────────────────────────

    fn release_lever(&mut self) {
        self.outbox.push(RenderEvent::LeverRelease);
        for (i, category) in Category::ALL.into_iter().enumerate() {
            self.schedule(
                i as u64 * self.timing.inter_reel_stagger_ms,
                Timer::RunStart(category),
            );
        }
    }

    fn start_run(&mut self, category: Category) {
        let slot = category.slot();
        let len = self.reels[slot].len();
        let current = self.reels[slot].index();
        let target = self.rng.gen_range(0..len);
        let (direction, steps) = plan_run(current, target);

        let reel = &mut self.reels[slot];
        reel.set_index(target);
        if !reel.lock() {
            warn!("{} was already animating when its lever run started", category);
        }

        let Some(lever) = self.lever.as_mut() else {
            warn!("{} run started with no lever pull in progress", category);
            self.reels[slot].unlock();
            return;
        };
        lever.runs[slot] = Some(ReelRun {
            target,
            direction,
            steps,
            taken: 0,
        });
        debug!(
            "{} run: #{} → #{} ({:?}, {} step{})",
            category,
            current,
            target,
            direction,
            steps,
            if steps == 1 { "" } else { "s" }
        );
        self.lever_step(category);
    }

    fn lever_step(&mut self, category: Category) {
        let slot = category.slot();
        let len = self.reels[slot].len();
        let Some(run) = self.lever.as_mut().and_then(|l| l.runs[slot].as_mut()) else {
            return;
        };
        let shown = run.next_shown(len);
        run.taken += 1;
        let direction = run.direction;

        let card = self.card_at(category, shown);
        self.outbox.push(RenderEvent::SlideStart { card, direction });
        self.schedule(
            self.timing.animation_duration_ms,
            Timer::SlideDone(category, SlideOrigin::Lever),
        );
    }

    fn finish_lever_step(&mut self, category: Category) {
        self.outbox.push(RenderEvent::SlideFinish { category });
        let slot = category.slot();
        let remaining = self
            .lever
            .as_ref()
            .and_then(|l| l.runs[slot].as_ref())
            .map(|r| r.steps - r.taken);

        match remaining {
            Some(n) if n > 0 => {
                self.schedule(self.timing.inter_step_delay_ms, Timer::NextStep(category));
            }
            Some(_) => self.settle(category),
            None => {
                warn!("{} lever slide finished outside a lever run", category);
                self.reels[slot].unlock();
            }
        }
    }

    fn settle(&mut self, category: Category) {
        self.reels[category.slot()].unlock();
        let index = self.index(category);
        self.outbox
            .push(RenderEvent::ReelSettled { category, index });

        let all_settled = match self.lever.as_mut() {
            Some(lever) => {
                lever.settled += 1;
                lever.settled >= Category::ALL.len()
            }
            None => false,
        };
        if all_settled {
            self.finish_lever();
        }
    }

    fn finish_lever(&mut self) {
        self.lever = None;
        let selection = self.selection();
        info!(
            "Lever #{} landed: {} | {} | {} | {}",
            self.lever_pulls,
            selection.values[0],
            selection.values[1],
            selection.values[2],
            selection.values[3]
        );
        self.outbox.push(RenderEvent::LeverComplete { selection });
        for card in self.cards() {
            self.outbox.push(RenderEvent::CardRefresh { card });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(seed: u64) -> SlotMachine {
        SlotMachine::new(Catalog::default(), TimingConfig::default()).with_seed(seed)
    }

    fn count(events: &[RenderEvent], pred: impl Fn(&RenderEvent) -> bool) -> usize {
        events.iter().filter(|e| pred(e)).count()
    }

    #[test]
    fn test_plan_run() {
        assert_eq!(plan_run(4, 4), (Direction::Up, 1));
        assert_eq!(plan_run(0, 2), (Direction::Up, 2));
        assert_eq!(plan_run(0, 20), (Direction::Up, 3));
        assert_eq!(plan_run(9, 8), (Direction::Down, 1));
        assert_eq!(plan_run(27, 0), (Direction::Down, 3));
    }

    #[test]
    fn test_reel_run_shows_walk_ending_on_target() {
        let mut run = ReelRun {
            target: 10,
            direction: Direction::Up,
            steps: 3,
            taken: 0,
        };
        let mut shown = Vec::new();
        while run.taken < run.steps {
            shown.push(run.next_shown(28));
            run.taken += 1;
        }
        assert_eq!(shown, vec![8, 9, 10]);

        let mut run = ReelRun {
            target: 1,
            direction: Direction::Down,
            steps: 3,
            taken: 0,
        };
        let mut shown = Vec::new();
        while run.taken < run.steps {
            shown.push(run.next_shown(5));
            run.taken += 1;
        }
        assert_eq!(shown, vec![3, 2, 1]);
    }

    #[test]
    fn test_initial_state() {
        let m = machine(1);
        for c in Category::ALL {
            assert_eq!(m.index(c), 0);
            assert!(!m.is_animating(c));
        }
        assert!(m.is_idle());
        assert_eq!(m.value(Category::Key), "A Major");
    }

    #[test]
    fn test_rotate_moves_index_at_start() {
        let mut m = machine(1);
        assert_eq!(
            m.rotate(Category::Vibe, Direction::Up),
            Rotation::Started { index: 1 }
        );
        // Index already moved, animation still running
        assert_eq!(m.index(Category::Vibe), 1);
        assert!(m.is_animating(Category::Vibe));
        let ev = m.drain_events();
        assert!(matches!(
            &ev[..],
            [RenderEvent::SlideStart { card, direction: Direction::Up }]
                if card.value == "Euphoric" && card.index == 1
        ));

        m.advance_to(149);
        assert!(m.is_animating(Category::Vibe));
        assert!(m.drain_events().is_empty());

        m.advance_to(150);
        assert!(!m.is_animating(Category::Vibe));
        assert_eq!(
            m.drain_events(),
            vec![
                RenderEvent::SlideFinish { category: Category::Vibe },
                RenderEvent::RotationComplete { category: Category::Vibe, index: 1 },
            ]
        );
    }

    #[test]
    fn test_rotate_down_from_zero_wraps() {
        let mut m = machine(1);
        let len = m.catalog().len(Category::Tempo);
        assert_eq!(
            m.rotate(Category::Tempo, Direction::Down),
            Rotation::Started { index: len - 1 }
        );
        assert_eq!(m.value(Category::Tempo), "Shifting Accents");
    }

    #[test]
    fn test_round_trip_every_start_index() {
        for c in Category::ALL {
            let mut m = machine(1);
            let len = m.catalog().len(c);
            for start in 0..len {
                assert_eq!(m.index(c), start);
                m.rotate(c, Direction::Up);
                m.run_until_idle();
                assert_eq!(m.index(c), (start + 1) % len);
                m.rotate(c, Direction::Down);
                m.run_until_idle();
                assert_eq!(m.index(c), start, "{} round trip from {}", c, start);
                // step forward for the next start index
                m.rotate(c, Direction::Up);
                m.run_until_idle();
            }
        }
    }

    #[test]
    fn test_rotate_while_animating_is_dropped() {
        let mut m = machine(1);
        m.rotate(Category::Key, Direction::Up);
        m.drain_events();
        m.advance_to(100);
        assert_eq!(
            m.rotate(Category::Key, Direction::Up),
            Rotation::Ignored(IgnoreReason::ReelBusy(Category::Key))
        );
        assert_eq!(
            m.rotate(Category::Key, Direction::Down),
            Rotation::Ignored(IgnoreReason::ReelBusy(Category::Key))
        );
        assert_eq!(m.index(Category::Key), 1);
        assert!(m.drain_events().is_empty());
        // Other reels are independent
        assert!(matches!(
            m.rotate(Category::Vibe, Direction::Up),
            Rotation::Started { .. }
        ));
    }

    #[test]
    fn test_key_change_refreshes_progression_hint() {
        let mut m = machine(1);
        m.rotate(Category::Key, Direction::Up);
        m.run_until_idle();
        let ev = m.drain_events();
        let refresh = ev.iter().find_map(|e| match e {
            RenderEvent::CardRefresh { card } => Some(card.clone()),
            _ => None,
        });
        let card = refresh.expect("progression refresh after key change");
        assert_eq!(card.category, Category::Progression);
        let key = m.value(Category::Key).to_string();
        assert_eq!(
            card.derived,
            theory::derive(Category::Progression, m.value(Category::Progression), &key)
        );
    }

    #[test]
    fn test_lever_lands_on_drawn_targets() {
        for seed in 0..20 {
            let mut m = machine(seed);
            // Move off index 0 so runs go in both directions
            m.rotate(Category::Vibe, Direction::Down);
            m.rotate(Category::Key, Direction::Up);
            m.run_until_idle();

            let mut rng = StdRng::seed_from_u64(seed);
            let expected: Vec<usize> = Category::ALL
                .iter()
                .map(|&c| rng.gen_range(0..m.catalog().len(c)))
                .collect();

            assert_eq!(m.pull_lever(), LeverPull::Started);
            m.run_until_idle();
            for (i, &c) in Category::ALL.iter().enumerate() {
                assert_eq!(m.index(c), expected[i], "seed {} reel {}", seed, c);
            }
            assert!(m.is_idle());
        }
    }

    #[test]
    fn test_lever_completion_fires_once_after_all_reels() {
        for seed in 0..20 {
            let mut m = machine(seed);
            m.pull_lever();
            m.run_until_idle();
            let ev = m.drain_events();

            let completes: Vec<usize> = ev
                .iter()
                .enumerate()
                .filter(|(_, e)| matches!(e, RenderEvent::LeverComplete { .. }))
                .map(|(i, _)| i)
                .collect();
            assert_eq!(completes.len(), 1, "seed {}", seed);

            let settled: Vec<usize> = ev
                .iter()
                .enumerate()
                .filter(|(_, e)| matches!(e, RenderEvent::ReelSettled { .. }))
                .map(|(i, _)| i)
                .collect();
            assert_eq!(settled.len(), 4);
            assert!(settled.iter().all(|&i| i < completes[0]));
        }
    }

    #[test]
    fn test_lever_steps_capped_and_last_slide_is_target() {
        for seed in 0..30 {
            let mut m = machine(seed);
            m.pull_lever();
            m.run_until_idle();
            let ev = m.drain_events();
            for c in Category::ALL {
                let slides: Vec<&Card> = ev
                    .iter()
                    .filter_map(|e| match e {
                        RenderEvent::SlideStart { card, .. } if card.category == c => Some(card),
                        _ => None,
                    })
                    .collect();
                assert!(
                    (1..=MAX_LEVER_STEPS).contains(&slides.len()),
                    "seed {} {}: {} slides",
                    seed,
                    c,
                    slides.len()
                );
                assert_eq!(slides.last().unwrap().index, m.index(c));
            }
        }
    }

    #[test]
    fn test_lever_timeline_with_default_timing() {
        let mut m = machine(3);
        m.pull_lever();
        assert_eq!(m.drain_events(), vec![RenderEvent::LeverCue]);
        assert!(m.lever_active());

        m.advance_to(74);
        assert!(m.drain_events().is_empty());

        // Release at 75; key starts immediately, the rest are staggered
        m.advance_to(75);
        let ev = m.drain_events();
        assert_eq!(ev[0], RenderEvent::LeverRelease);
        assert!(matches!(&ev[1], RenderEvent::SlideStart { card, .. } if card.category == Category::Key));
        assert!(!m.is_animating(Category::Progression));

        m.advance_to(125);
        assert!(m.is_animating(Category::Progression));
        m.advance_to(175);
        assert!(m.is_animating(Category::Vibe));
        m.advance_to(225);
        assert!(m.is_animating(Category::Tempo));

        let end = m.run_until_idle();
        assert!(end <= TimingConfig::default().worst_case_lever_ms(4));
        assert!(!m.lever_active());
    }

    #[test]
    fn test_lever_steps_chain_with_inter_step_delay() {
        let timing = TimingConfig::default();
        let gap = timing.animation_duration_ms + timing.inter_step_delay_ms;
        let mut three_step_reels = 0;

        for seed in 0..20 {
            let mut m = machine(seed);
            m.pull_lever();
            let mut starts: [Vec<u64>; 4] = Default::default();
            let mut settled_at = [None; 4];
            let mut now = 0;
            while !m.is_idle() {
                now += 1;
                m.advance_to(now);
                for e in m.drain_events() {
                    match e {
                        RenderEvent::SlideStart { card, .. } => starts[card.category.slot()].push(now),
                        RenderEvent::ReelSettled { category, .. } => {
                            settled_at[category.slot()] = Some(now)
                        }
                        _ => {}
                    }
                }
                // Between the first slide and settling, the reel stays locked
                for c in Category::ALL {
                    let slot = c.slot();
                    if !starts[slot].is_empty() && settled_at[slot].is_none() {
                        assert!(m.is_animating(c), "seed {} {} unlocked at {}", seed, c, now);
                    }
                }
            }
            assert!(now <= timing.worst_case_lever_ms(4), "seed {} ended at {}", seed, now);

            for times in &starts {
                for pair in times.windows(2) {
                    assert_eq!(pair[1] - pair[0], gap, "seed {}", seed);
                }
                if times.len() == MAX_LEVER_STEPS {
                    three_step_reels += 1;
                }
            }
        }
        assert!(three_step_reels > 0);
    }

    #[test]
    fn test_lever_blocks_rotation_and_second_pull() {
        let mut m = machine(5);
        m.pull_lever();
        // During the pre-delay no reel is animating yet, but the lever holds
        assert_eq!(
            m.rotate(Category::Vibe, Direction::Up),
            Rotation::Ignored(IgnoreReason::LeverActive)
        );
        assert_eq!(m.pull_lever(), LeverPull::Ignored(IgnoreReason::LeverActive));
        m.advance_to(200);
        assert_eq!(
            m.rotate(Category::Key, Direction::Down),
            Rotation::Ignored(IgnoreReason::LeverActive)
        );
        m.run_until_idle();
        assert_eq!(m.lever_pulls(), 1);
        assert!(matches!(
            m.rotate(Category::Key, Direction::Down),
            Rotation::Started { .. }
        ));
    }

    #[test]
    fn test_lever_dropped_while_reel_animates() {
        let mut m = machine(5);
        m.rotate(Category::Tempo, Direction::Up);
        assert_eq!(
            m.pull_lever(),
            LeverPull::Ignored(IgnoreReason::ReelBusy(Category::Tempo))
        );
        assert!(!m.lever_active());
        m.run_until_idle();
        assert_eq!(m.pull_lever(), LeverPull::Started);
    }

    #[test]
    fn test_lever_complete_refreshes_every_card() {
        let mut m = machine(9);
        m.pull_lever();
        m.run_until_idle();
        let ev = m.drain_events();
        let pos = ev
            .iter()
            .position(|e| matches!(e, RenderEvent::LeverComplete { .. }))
            .unwrap();
        let refreshed = count(&ev[pos..], |e| matches!(e, RenderEvent::CardRefresh { .. }));
        assert_eq!(refreshed, 4);
        match &ev[pos] {
            RenderEvent::LeverComplete { selection } => assert_eq!(*selection, m.selection()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let mut a = machine(42);
        let mut b = machine(42);
        for _ in 0..3 {
            a.pull_lever();
            b.pull_lever();
            a.run_until_idle();
            b.run_until_idle();
            assert_eq!(a.selection(), b.selection());
        }
        assert_eq!(a.drain_events(), b.drain_events());
    }

    #[test]
    fn test_advance_never_rewinds() {
        let mut m = machine(1).starting_at(1000);
        m.advance_to(500);
        assert_eq!(m.now_ms(), 1000);
        m.rotate(Category::Key, Direction::Up);
        assert_eq!(m.next_deadline(), Some(1150));
    }
}
