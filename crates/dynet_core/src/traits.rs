use crate::error::{Error, Result};
use crate::states::SystemStates;
use crate::vector::Vector;
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in our dynamical systems.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Converts an `f64` literal into `T`.
pub(crate) fn lit<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap()
}

/// Represents a dynamical system: a state/derivative/output triple plus the
/// function computing the instantaneous derivative.
pub trait DynamicalSystem<T: Scalar> {
    fn states(&self) -> &SystemStates<T>;

    fn states_mut(&mut self) -> &mut SystemStates<T>;

    /// Evaluates the derivative at time `t` for the candidate state `x`,
    /// writing into `self.states().derivative_vector()` (and optionally the outputs).
    ///
    /// Must depend only on `t`, `x` and the system's parameters, never on
    /// `self.states().state_vector()` when `x` is a different buffer. Multi-stage
    /// integrators rely on this to sample candidate states.
    fn derive(&mut self, t: T, x: &Vector<T>);

    /// Output/measurement update. Does nothing unless overridden.
    fn observe(&mut self, _t: T, _x: &Vector<T>) {}

    /// `derive(t, x)` against the system's own state.
    fn derive_current(&mut self, t: T) {
        let x = self.states().state_vector().alias();
        self.derive(t, &x);
    }

    fn observe_current(&mut self, t: T) {
        let x = self.states().state_vector().alias();
        self.observe(t, &x);
    }

    /// Declared number of state variables.
    fn dim_states(&self) -> usize {
        self.states().size_states()
    }

    /// Declared number of outputs.
    fn dim_outputs(&self) -> usize {
        self.states().size_outputs()
    }

    /// Replaces the system's vectors, e.g. with views into a network's
    /// shared storage. Systems that hand out views of their own vectors
    /// override this to re-point them.
    fn attach(&mut self, states: SystemStates<T>) -> Result<()> {
        *self.states_mut() = states;
        Ok(())
    }

    /// Sets the initial conditions.
    fn init(&mut self, values: &[T]) -> Result<()> {
        let states = self.states();
        if values.len() != states.size_states() {
            return Err(Error::configuration(format!(
                "initial condition has {} values, system has {} states",
                values.len(),
                states.size_states()
            )));
        }
        for (i, &value) in values.iter().enumerate() {
            states.state_vector().set(i, value);
        }
        Ok(())
    }

    fn x(&self, index: usize) -> T {
        self.states().x(index)
    }

    fn dx(&self, index: usize) -> T {
        self.states().dx(index)
    }

    fn y(&self, index: usize) -> T {
        self.states().y(index)
    }

    fn set_x(&mut self, index: usize, value: T) {
        self.states_mut().set_x(index, value);
    }
}

/// A fixed-step integrator advancing a system in place.
pub trait Integrator<T: Scalar> {
    fn step_size(&self) -> T;

    fn set_step_size(&mut self, step: T);

    /// Performs one step.
    /// t: current time (updated after step)
    /// system: state updated in place; its derivative slot holds the last sample taken
    fn step<S: DynamicalSystem<T> + ?Sized>(&mut self, t: &mut T, system: &mut S);
}
