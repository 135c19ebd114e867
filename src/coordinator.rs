use crate::audio_player::RhythmPlayer;
use crate::machine::{LeverPull, Rotation, SlotMachine};
use crate::types::*;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info};
use std::thread;
use std::time::Duration;

/// The coordinator owns the slot machine and the rhythm player. It receives
/// InputEvents, advances the machine on the session clock, and fans the
/// resulting RenderEvents out to every consumer.
///
/// Between inputs it sleeps on the input channel until the next timer
/// deadline, so animations complete on time without polling.
///
/// When every input sender is gone the coordinator lets in-flight
/// animations finish, then returns.
pub struct Coordinator {
    input_rx: Receiver<InputEvent>,
    event_txs: Vec<Sender<StampedEvent>>,
    machine: SlotMachine,
    player: RhythmPlayer,
    clock: SessionClock,
    /// Play the landed rhythm after every lever pull.
    pub auto_play: bool,
    sent: u64,
}

impl Coordinator {
    pub fn new(
        input_rx: Receiver<InputEvent>,
        event_txs: Vec<Sender<StampedEvent>>,
        machine: SlotMachine,
        player: RhythmPlayer,
        clock: SessionClock,
    ) -> Self {
        Self {
            input_rx,
            event_txs,
            machine,
            player,
            clock,
            auto_play: false,
            sent: 0,
        }
    }

    pub fn with_auto_play(mut self, enabled: bool) -> Self {
        self.auto_play = enabled;
        self
    }

    pub fn machine(&self) -> &SlotMachine {
        &self.machine
    }

    /// Run until the input side hangs up. Blocks the calling thread.
    pub fn run(&mut self) {
        info!(
            "Coordinator running (auto-play: {})",
            if self.auto_play { "ON" } else { "OFF" }
        );
        let mut inputs: u64 = 0;

        // Opening hand for the renderer
        let now = self.clock.now_ms();
        for card in self.machine.cards() {
            self.broadcast(now, RenderEvent::CardRefresh { card });
        }

        loop {
            let received = match self.next_wakeup() {
                Some(at) => {
                    let wait = at.saturating_sub(self.clock.now_ms());
                    self.input_rx.recv_timeout(Duration::from_millis(wait))
                }
                None => self
                    .input_rx
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(event) => {
                    inputs += 1;
                    self.handle(event, self.clock.now_ms());
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.tick(self.clock.now_ms());
        }

        info!("Input closed, letting reels settle...");
        while let Some(at) = self.next_wakeup() {
            let now = self.clock.now_ms();
            if at > now {
                thread::sleep(Duration::from_millis(at - now));
            }
            self.tick(self.clock.now_ms());
        }

        info!(
            "Coordinator shutting down after {} inputs, {} lever pulls, {} events",
            inputs,
            self.machine.lever_pulls(),
            self.sent
        );
    }

    fn next_wakeup(&self) -> Option<u64> {
        match (self.machine.next_deadline(), self.player.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Apply one input at `now_ms`.
    pub fn handle(&mut self, event: InputEvent, now_ms: u64) {
        debug!("Input {:?} at {} ms", event, now_ms);
        // Catch up first so a slide that has finished unlocks its reel
        self.tick(now_ms);
        match event {
            InputEvent::Rotate(category, direction) => {
                if let Rotation::Ignored(reason) = self.machine.rotate(category, direction) {
                    debug!("Rotate {} dropped: {:?}", category, reason);
                }
            }
            InputEvent::PullLever => {
                if let LeverPull::Ignored(reason) = self.machine.pull_lever() {
                    debug!("Lever dropped: {:?}", reason);
                }
            }
            InputEvent::PlayRhythm => {
                self.flush(now_ms);
                self.play_current(now_ms);
            }
            InputEvent::StopRhythm => {
                if self.player.stop() {
                    self.broadcast(now_ms, RenderEvent::RhythmStopped);
                }
            }
        }
        self.flush(now_ms);
    }

    /// Fire due timers and auto-stop a finished loop.
    pub fn tick(&mut self, now_ms: u64) {
        self.machine.advance_to(now_ms);
        self.flush(now_ms);
        if self.player.poll(now_ms) {
            self.broadcast(now_ms, RenderEvent::RhythmStopped);
        }
    }

    fn play_current(&mut self, now_ms: u64) {
        let name = self.machine.value(Category::Tempo).to_string();
        let was_playing = self.player.is_playing(now_ms);
        match self.player.play(&name, now_ms) {
            Some(duration_ms) => {
                self.broadcast(now_ms, RenderEvent::RhythmStarted { name, duration_ms })
            }
            None if was_playing => self.broadcast(now_ms, RenderEvent::RhythmStopped),
            None => {}
        }
    }

    fn flush(&mut self, now_ms: u64) {
        let mut landed = false;
        for event in self.machine.drain_events() {
            landed |= matches!(event, RenderEvent::LeverComplete { .. });
            self.broadcast(now_ms, event);
        }
        if landed && self.auto_play {
            self.play_current(now_ms);
        }
    }

    fn broadcast(&mut self, now_ms: u64, event: RenderEvent) {
        let stamped = StampedEvent {
            t_ms: now_ms,
            event,
        };
        for tx in &self.event_txs {
            let _ = tx.send(stamped.clone());
        }
        self.sent += 1;
    }
}
