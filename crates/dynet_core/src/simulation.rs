//! Fixed-step driver loop: optional transient, then record every
//! `stride`-th tick into a caller-supplied sink.

use crate::states::SystemStates;
use crate::traits::{DynamicalSystem, Integrator, Scalar};
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

/// When the recorded part of a run ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopCondition<T> {
    /// Exactly this many ticks.
    Steps(usize),
    /// Every tick with `t <= t_end`.
    Until(T),
}

/// Integration performed before anything is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Transient {
    #[default]
    None,
    Steps(usize),
    /// Step while `t < t_start`.
    Until(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub transient: Transient,
    /// Record one tick out of `stride`, starting with the first.
    pub stride: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            transient: Transient::None,
            stride: 1,
        }
    }
}

impl RunSettings {
    pub fn validate(&self) -> Result<()> {
        if self.stride == 0 {
            bail!("stride must be at least 1.");
        }
        if let Transient::Until(t) = self.transient {
            if !t.is_finite() {
                bail!("Transient end time must be finite.");
            }
        }
        Ok(())
    }
}

/// One recorded tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample<T> {
    pub time: T,
    pub states: Vec<T>,
    pub outputs: Vec<T>,
}

impl<T: Scalar> Sample<T> {
    pub fn capture(time: T, states: &SystemStates<T>) -> Self {
        Self {
            time,
            states: states.state_vector().to_vec(),
            outputs: states.output_vector().to_vec(),
        }
    }
}

/// Per-run callbacks invoked around every recorded-phase step.
pub struct Hooks<'a, T> {
    pub pre_step: Option<&'a mut dyn FnMut(T, &mut SystemStates<T>)>,
    pub post_step: Option<&'a mut dyn FnMut(T, &mut SystemStates<T>)>,
}

impl<T> Hooks<'_, T> {
    pub fn none() -> Self {
        Self {
            pre_step: None,
            post_step: None,
        }
    }
}

impl<T> Default for Hooks<'_, T> {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary<T> {
    /// Time after the last step.
    pub time: T,
    /// Steps taken, transient included.
    pub steps: usize,
    pub samples: usize,
}

/// Runs `system` from `t0`.
///
/// Each recorded-phase tick observes the system, emits a [`Sample`] if the
/// tick falls on the stride, then runs the pre-step hook, one integrator
/// step and the post-step hook. Outputs are refreshed through
/// [`DynamicalSystem::observe_current`] before they are sampled.
pub fn run<T, I, S>(
    integrator: &mut I,
    system: &mut S,
    t0: T,
    stop: StopCondition<T>,
    settings: &RunSettings,
    mut hooks: Hooks<'_, T>,
    mut sink: impl FnMut(&Sample<T>) -> Result<()>,
) -> Result<RunSummary<T>>
where
    T: Scalar,
    I: Integrator<T>,
    S: DynamicalSystem<T> + ?Sized,
{
    settings.validate()?;
    let h = integrator.step_size();
    let time_bounded = matches!(settings.transient, Transient::Until(_))
        || matches!(stop, StopCondition::Until(_));
    if time_bounded && !(h > T::zero()) {
        bail!("Step size must be positive for a time-bounded run.");
    }
    if let StopCondition::Until(t_end) = stop {
        if !t_end.is_finite() {
            bail!("End time must be finite.");
        }
    }

    tracing::debug!(
        t0 = ?t0,
        step = ?h,
        stop = ?stop,
        stride = settings.stride,
        "starting run"
    );

    let mut t = t0;
    let mut steps = 0usize;

    match settings.transient {
        Transient::None => {}
        Transient::Steps(n) => {
            for _ in 0..n {
                integrator.step(&mut t, system);
            }
            steps += n;
        }
        Transient::Until(t_start) => {
            let t_start = T::from_f64(t_start)
                .ok_or_else(|| anyhow!("Transient end time {t_start} is not representable."))?;
            while t < t_start {
                integrator.step(&mut t, system);
                steps += 1;
            }
        }
    }

    let mut samples = 0usize;
    let mut tick = 0usize;
    loop {
        let more = match stop {
            StopCondition::Steps(n) => tick < n,
            StopCondition::Until(t_end) => t <= t_end,
        };
        if !more {
            break;
        }

        if tick % settings.stride == 0 {
            system.observe_current(t);
            let sample = Sample::capture(t, system.states());
            sink(&sample).with_context(|| format!("Sample sink failed at t = {t:?}."))?;
            samples += 1;
        }

        if let Some(pre) = hooks.pre_step.as_deref_mut() {
            pre(t, system.states_mut());
        }
        integrator.step(&mut t, system);
        if let Some(post) = hooks.post_step.as_deref_mut() {
            post(t, system.states_mut());
        }

        tick += 1;
        steps += 1;
    }

    tracing::debug!(t = ?t, steps, samples, "finished run");

    Ok(RunSummary { time: t, steps, samples })
}
