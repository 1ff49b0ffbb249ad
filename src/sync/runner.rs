use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::api::PlaybackApi;

use super::clock::TimeSource;
use super::hooks::Hooks;
use super::poller::{lock, PollOutcome, PollSchedule, SharedSession, Syncer};
use super::session::SyncPhase;

/// Sleeps out the remainder of each frame interval.
pub struct FramePacer {
    interval: Duration,
    last_tick: Instant,
    frames: u32,
    last_report: Instant,
}

impl FramePacer {
    pub fn new(frame_rate: f64) -> Self {
        let frame_rate = if frame_rate > 0.0 { frame_rate } else { 60.0 };
        Self {
            interval: Duration::from_secs_f64(1.0 / frame_rate),
            last_tick: Instant::now(),
            frames: 0,
            last_report: Instant::now(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn wait(&mut self) {
        self.count_frame();

        let now = Instant::now();
        let next_tick = self.last_tick + self.interval;
        if next_tick > now {
            thread::sleep(next_tick - now);
            self.last_tick = next_tick;
        } else {
            log::trace!("Frame loop fell behind by {:?}", now - next_tick);
            self.last_tick = now;
        }
    }

    fn count_frame(&mut self) {
        self.frames += 1;
        if self.last_report.elapsed() > Duration::from_secs(1) {
            log::trace!("Frames per second: {}", self.frames);
            self.frames = 0;
            self.last_report = Instant::now();
        }
    }
}

/// Advance the session by one display frame and notify listeners once the
/// session lock has been released.
pub fn render_frame<T: TimeSource>(session: &SharedSession, time: &T, hooks: &mut Hooks) {
    let now = time.now_ms();
    let (changes, snapshot) = {
        let mut session = lock(session);
        let changes = session.tick(now);
        let snapshot = hooks.wants_frames().then(|| session.snapshot());
        (changes, snapshot)
    };
    hooks.dispatch(&changes);
    if let Some(snapshot) = snapshot {
        hooks.publish(&snapshot);
    }
}

/// Drives the poll loop on the calling thread and, from the first successful
/// sync on, the frame loop on a thread of its own.
pub struct Runner<A, T> {
    syncer: Syncer<A, T>,
    time: Arc<T>,
    schedule: PollSchedule,
    hooks: Option<Hooks>,
    frame_rate: f64,
    phase: SyncPhase,
}

impl<A, T> Runner<A, T>
where
    A: PlaybackApi + 'static,
    T: TimeSource + 'static,
{
    pub fn new(
        syncer: Syncer<A, T>,
        time: Arc<T>,
        schedule: PollSchedule,
        hooks: Hooks,
        frame_rate: f64,
    ) -> Self {
        Self {
            syncer,
            time,
            schedule,
            hooks: Some(hooks),
            frame_rate,
            phase: SyncPhase::Uninitialized,
        }
    }

    /// Poll forever. Only fails if the frame thread cannot be started.
    pub fn run(mut self) -> Result<()> {
        log::info!("Polling playback state");
        loop {
            let delay = self.step()?;
            thread::sleep(delay);
        }
    }

    /// One poll cycle. Returns the delay before the next one.
    pub fn step(&mut self) -> Result<Duration> {
        let result = self.syncer.poll_once();
        match &result {
            Ok(PollOutcome::Synced { first: true, .. }) => self.start_frames()?,
            Ok(outcome) => log::trace!("Poll: {:?}", outcome),
            Err(err) => log::warn!("Poll failed: {}", err),
        }
        let phase = lock(self.syncer.session()).phase();
        if phase != self.phase {
            log::debug!("Session {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }

        let delay = self.schedule.next_delay(&result);
        if self.schedule.failures() > 0 {
            log::debug!("Next poll in {:?}", delay);
        }
        Ok(delay)
    }

    fn start_frames(&mut self) -> Result<()> {
        let Some(mut hooks) = self.hooks.take() else {
            return Ok(());
        };
        let session = Arc::clone(self.syncer.session());
        let time = Arc::clone(&self.time);
        let mut pacer = FramePacer::new(self.frame_rate);
        log::info!("Starting frame loop every {:?}", pacer.interval());

        thread::Builder::new()
            .name("Frames".to_string())
            .spawn(move || loop {
                pacer.wait();
                render_frame(&session, time.as_ref(), &mut hooks);
            })
            .context("Failed to spawn frame thread")?;
        Ok(())
    }
}
