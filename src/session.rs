use anyhow::{Context, Result};
use log::{debug, error, info, trace};
use serde::Serialize;
use std::{
    io::Write,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use signal_hook::consts::{SIGINT, SIGTERM, SIGUSR1};

use crate::config::Profile;
use crate::error::SessionError;
use crate::frame::Frame;
use crate::gestures::{GestureClassifier, GestureEvent};
use crate::machine::{CookingState, Machine, Transition};
use crate::motion::{self, MotionSample};
use crate::render::{self, RenderDescriptor};
use crate::source::FrameSource;

/// Quit and reset requests, set asynchronously by signal handlers.
#[derive(Debug, Clone, Default)]
pub struct ControlFlags {
    pub quit: Arc<AtomicBool>,
    pub reset: Arc<AtomicBool>,
}

impl ControlFlags {
    /// SIGINT/SIGTERM quit, SIGUSR1 resets the dough.
    pub fn register() -> Result<Self> {
        let flags = Self::default();
        for sig in [SIGINT, SIGTERM] {
            signal_hook::flag::register(sig, flags.quit.clone())
                .with_context(|| format!("failed to install handler for signal {sig}"))?;
        }
        signal_hook::flag::register(SIGUSR1, flags.reset.clone())
            .context("failed to install SIGUSR1 handler")?;
        Ok(flags)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub max_ticks: Option<u64>,
    /// Pace ticks for recorded sources; `None` runs as fast as frames arrive.
    pub fps: Option<f64>,
    /// Log a status line every N ticks (0 disables).
    pub status_every: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Quit,
    MaxTicks,
    EndOfStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub final_state: CookingState,
    pub reason: StopReason,
}

/// Everything that happened in one tick; also the JSON line we emit.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub t: f64,
    pub motion: MotionSample,
    pub event: GestureEvent,
    pub render: RenderDescriptor,
    #[serde(skip)]
    pub transition: Option<Transition>,
}

enum Pulled {
    Frame(Frame),
    Skipped,
    Ended,
}

pub struct Session {
    profile: Profile,
    classifier: GestureClassifier,
    machine: Machine,
    ticks: u64,
    started: Instant,
}

impl Session {
    pub fn new(profile: Profile) -> Self {
        let classifier = GestureClassifier::new(profile.gestures.clone(), &profile.motion);
        let machine = Machine::new(profile.gestures.clone(), profile.dough.clone());
        Self {
            profile,
            classifier,
            machine,
            ticks: 0,
            started: Instant::now(),
        }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn reset(&mut self, now: f64) {
        self.machine.reset();
        self.classifier.reset(now);
    }

    /// One frame-synchronous step: difference, classify, advance, describe.
    pub fn tick(&mut self, prev: &Frame, curr: &Frame, now: f64) -> Result<TickReport, SessionError> {
        let sample = motion::compute(prev, curr, &self.profile.motion)?;
        let event = self.classifier.classify(self.machine.state(), &sample, now);
        let transition = self.machine.update(event, now);

        self.ticks += 1;
        trace!(
            "tick {} t={now:.3} magnitude={} detected={} event={event:?}",
            self.ticks, sample.magnitude, sample.detected
        );

        let render = render::build(
            self.machine.state(),
            self.machine.progress(),
            self.machine.dough(),
            self.machine.tuning().kneads_required,
        );
        Ok(TickReport {
            tick: self.ticks,
            t: now,
            motion: sample,
            event,
            render,
            transition,
        })
    }

    pub fn run<S: FrameSource + ?Sized>(
        &mut self,
        source: &mut S,
        out: &mut dyn Write,
        opts: &RunOptions,
        ctl: &ControlFlags,
    ) -> Result<RunSummary> {
        info!("reading frames from {}", source.describe());
        let interval = opts
            .fps
            .filter(|f| *f > 0.0)
            .map(|f| Duration::from_secs_f64(1.0 / f));

        let mut prev = loop {
            if ctl.quit.load(Ordering::Relaxed) {
                return Ok(self.summary(StopReason::Quit));
            }
            match pull(source)? {
                Pulled::Frame(f) => break f,
                Pulled::Skipped => continue,
                Pulled::Ended => return Ok(self.summary(StopReason::EndOfStream)),
            }
        };
        info!(
            "baseline frame {}x{}, wave your hands to start",
            prev.width(),
            prev.height()
        );

        let reason = loop {
            if ctl.quit.load(Ordering::Relaxed) {
                break StopReason::Quit;
            }
            if opts.max_ticks.is_some_and(|max| self.ticks >= max) {
                break StopReason::MaxTicks;
            }
            if ctl.reset.swap(false, Ordering::Relaxed) {
                info!("reset requested");
                self.reset(self.now());
            }

            let tick_start = Instant::now();
            let curr = match pull(source)? {
                Pulled::Frame(f) => f,
                Pulled::Skipped => continue,
                Pulled::Ended => break StopReason::EndOfStream,
            };

            let report = match self.tick(&prev, &curr, self.now()) {
                Ok(r) => r,
                Err(e) => {
                    error!("session aborted: {e}");
                    return Err(e.into());
                }
            };
            serde_json::to_writer(&mut *out, &report)?;
            out.write_all(b"\n")?;

            if let Some(t) = report.transition {
                debug!("transition {} -> {}", t.from.name(), t.to.name());
            }
            if opts.status_every > 0 && report.tick % opts.status_every == 0 {
                info!(
                    "{}",
                    render::status_line(
                        self.machine.state(),
                        self.machine.progress(),
                        self.classifier.timers()
                    )
                );
            }

            prev = curr;

            if let Some(iv) = interval {
                let spent = tick_start.elapsed();
                if spent < iv {
                    thread::sleep(iv - spent);
                }
            }
        };

        out.flush()?;
        let summary = self.summary(reason);
        info!(
            "session ended after {} ticks in state '{}' ({:?})",
            summary.ticks,
            summary.final_state.name(),
            summary.reason
        );
        Ok(summary)
    }

    fn summary(&self, reason: StopReason) -> RunSummary {
        RunSummary {
            ticks: self.ticks,
            final_state: self.machine.state(),
            reason,
        }
    }
}

/// Fetch the next frame, rewinding finite sources when they run dry.
fn pull<S: FrameSource + ?Sized>(source: &mut S) -> Result<Pulled, SessionError> {
    match source.next_frame() {
        Ok(f) => Ok(Pulled::Frame(f)),
        Err(SessionError::EmptyFrame) if source.is_live() => {
            info!("live stream ended");
            Ok(Pulled::Ended)
        }
        Err(SessionError::EmptyFrame) => {
            debug!("end of {}, restarting from the first frame", source.describe());
            source.rewind()?;
            Ok(Pulled::Skipped)
        }
        Err(e) => Err(e),
    }
}
