//! Headless fixed-rate consumer
//!
//! Stands in for a render loop: ticks the synchronizer at the configured
//! rate, relays intensity input, and prints a status line once a second.

use crate::input::InputEvent;
use anyhow::Result;
use crossbeam_channel::{Receiver, TryRecvError};
use heartsync_control::{ConnectionState, TelemetryClient};
use heartsync_core::{RenderState, StateSynchronizer, Zone};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const STATUS_INTERVAL: Duration = Duration::from_secs(1);

pub struct HeadlessConsumer {
    client: TelemetryClient,
    sync: StateSynchronizer,
    input: Option<Receiver<InputEvent>>,
    running: Arc<AtomicBool>,
    tick_interval: Duration,
}

impl HeadlessConsumer {
    /// `running` is cleared by the signal handler to end [`run`](Self::run).
    pub fn new(
        client: TelemetryClient,
        input: Option<Receiver<InputEvent>>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let sync = client.synchronizer()?;
        let tick_interval = client.config().tick_interval();
        Ok(Self {
            client,
            sync,
            input,
            running,
            tick_interval,
        })
    }

    /// Tick until stopped by a signal, `quit`, or the end of input.
    pub fn run(&mut self) {
        info!(
            tick_hz = self.client.config().tick_rate_hz,
            transport = %self.client.config().transport,
            "Consumer loop started"
        );

        let mut last_tick = Instant::now();
        let mut last_status = last_tick;
        let mut next_tick = last_tick;

        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            self.step(now - last_tick);
            last_tick = now;

            if now.duration_since(last_status) >= STATUS_INTERVAL {
                println!("{}", self.status_line());
                last_status = now;
            }

            next_tick += self.tick_interval;
            let now = Instant::now();
            if next_tick > now {
                thread::sleep(next_tick - now);
            } else {
                // Fell behind; skip the missed ticks instead of bursting
                next_tick = now;
            }
        }
    }

    /// One tick: drain input, then advance the synchronizer by `dt`.
    pub fn step(&mut self, dt: Duration) -> bool {
        self.drain_input();
        self.sync.tick(dt)
    }

    fn drain_input(&mut self) {
        let Some(input) = &self.input else {
            return;
        };
        loop {
            let event = match input.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => InputEvent::Closed,
            };
            match event {
                InputEvent::Intensity(value) => match self.client.submit_intensity(value) {
                    Ok(()) => info!(value, "Intensity requested"),
                    Err(e) => warn!(value, error = %e, "Intensity rejected"),
                },
                InputEvent::Invalid(line) => {
                    warn!("Ignoring input {:?}: expected a number between 0 and 1", line)
                }
                InputEvent::Quit | InputEvent::Closed => {
                    info!("Input ended, shutting down");
                    self.running.store(false, Ordering::SeqCst);
                    self.input = None;
                    return;
                }
            }
        }
    }

    pub fn status_line(&self) -> String {
        format_status(
            self.sync.state(),
            self.sync.zone(),
            self.sync.pulse_scale(),
            self.client.connection_state(),
        )
    }

    pub fn synchronizer(&self) -> &StateSynchronizer {
        &self.sync
    }

    pub fn client(&self) -> &TelemetryClient {
        &self.client
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the client and report counters.
    pub fn shutdown(mut self) {
        self.client.stop();
        let mailbox = self.client.mailbox().stats();
        let supervisor = self.client.supervisor_stats();
        info!(
            published = mailbox.published,
            overwritten = mailbox.overwritten,
            applied = self.sync.snapshots_applied(),
            connects = supervisor.connects,
            attempts = supervisor.attempts,
            "Session summary"
        );
    }
}

pub fn format_status(
    state: &RenderState,
    zone: Zone,
    pulse_scale: f32,
    connection: ConnectionState,
) -> String {
    format!(
        "{:>6.1} bpm | {:<9} | {} | pulse {:.2} | {}",
        state.current_bpm,
        zone.label(),
        state.display_color.to_hex(),
        pulse_scale,
        connection
    )
}
