use crate::traits::{lit, DynamicalSystem, Integrator, Scalar};
use crate::vector::Vector;

/// Explicit Euler, order 1.
#[derive(Debug, Clone)]
pub struct Euler<T: Scalar> {
    step: T,
}

impl<T: Scalar> Euler<T> {
    pub fn new(step: T) -> Self {
        Self { step }
    }
}

impl<T: Scalar> Integrator<T> for Euler<T> {
    fn step_size(&self) -> T {
        self.step
    }

    fn set_step_size(&mut self, step: T) {
        self.step = step;
    }

    fn step<S: DynamicalSystem<T> + ?Sized>(&mut self, t: &mut T, system: &mut S) {
        let h = self.step;
        let x = system.states().state_vector().alias();
        let dx = system.states().derivative_vector().alias();

        system.derive(*t, &x);

        for i in 0..x.len() {
            x.set(i, x.get(i) + h * dx.get(i));
        }

        *t = *t + h;
    }
}

/// Classic Runge-Kutta 4th Order Solver
///
/// The stage buffers are kept between calls and only reallocated when the
/// system's state dimension changes.
#[derive(Debug)]
pub struct RungeKutta4<T: Scalar> {
    step: T,
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    tmp: Vector<T>,
}

impl<T: Scalar> RungeKutta4<T> {
    pub fn new(step: T) -> Self {
        Self {
            step,
            k1: Vec::new(),
            k2: Vec::new(),
            k3: Vec::new(),
            tmp: Vector::new(),
        }
    }

    fn fit(&mut self, dim: usize) {
        if self.k1.len() != dim {
            self.k1 = vec![T::zero(); dim];
            self.k2 = vec![T::zero(); dim];
            self.k3 = vec![T::zero(); dim];
            self.tmp = Vector::zeros(dim);
        }
    }
}

impl<T: Scalar> Integrator<T> for RungeKutta4<T> {
    fn step_size(&self) -> T {
        self.step
    }

    fn set_step_size(&mut self, step: T) {
        self.step = step;
    }

    fn step<S: DynamicalSystem<T> + ?Sized>(&mut self, t: &mut T, system: &mut S) {
        let dt = self.step;
        let half = dt * lit(0.5);
        let sixth = dt / lit(6.0);
        let two: T = lit(2.0);

        let t0 = *t;
        let x = system.states().state_vector().alias();
        let dx = system.states().derivative_vector().alias();
        let dim = x.len();
        self.fit(dim);

        // k1 = f(t, y)
        system.derive(t0, &x);
        for i in 0..dim {
            self.k1[i] = dx.get(i);
            self.tmp.set(i, x.get(i) + half * self.k1[i]);
        }

        // k2 = f(t + dt/2, y + dt*k1/2)
        system.derive(t0 + half, &self.tmp);
        for i in 0..dim {
            self.k2[i] = dx.get(i);
            self.tmp.set(i, x.get(i) + half * self.k2[i]);
        }

        // k3 = f(t + dt/2, y + dt*k2/2)
        system.derive(t0 + half, &self.tmp);
        for i in 0..dim {
            self.k3[i] = dx.get(i);
            self.tmp.set(i, x.get(i) + dt * self.k3[i]);
        }

        // k4 = f(t + dt, y + dt*k3), left in dx
        system.derive(t0 + dt, &self.tmp);

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        for i in 0..dim {
            let k4 = dx.get(i);
            x.set(
                i,
                x.get(i) + sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + k4),
            );
        }

        *t = t0 + dt;
    }
}

/// Discrete Map Stepper
/// Evaluates x_{n+1} = f(t_n, x_n): the system's `derive` writes the next
/// iterate into its derivative slot. `t` advances by the step size.
#[derive(Debug, Clone)]
pub struct Discrete<T: Scalar> {
    step: T,
}

impl<T: Scalar> Discrete<T> {
    pub fn new(step: T) -> Self {
        Self { step }
    }
}

impl<T: Scalar> Integrator<T> for Discrete<T> {
    fn step_size(&self) -> T {
        self.step
    }

    fn set_step_size(&mut self, step: T) {
        self.step = step;
    }

    fn step<S: DynamicalSystem<T> + ?Sized>(&mut self, t: &mut T, system: &mut S) {
        let x = system.states().state_vector().alias();
        let next = system.states().derivative_vector().alias();

        system.derive(*t, &x);

        for i in 0..x.len() {
            x.set(i, next.get(i));
        }

        *t = *t + self.step;
    }
}

/// Integrator chosen at runtime, e.g. from [`crate::settings::IntegratorSettings`].
#[derive(Debug)]
pub enum Stepper<T: Scalar> {
    Euler(Euler<T>),
    RungeKutta4(RungeKutta4<T>),
    Discrete(Discrete<T>),
}

impl<T: Scalar> Integrator<T> for Stepper<T> {
    fn step_size(&self) -> T {
        match self {
            Stepper::Euler(s) => s.step_size(),
            Stepper::RungeKutta4(s) => s.step_size(),
            Stepper::Discrete(s) => s.step_size(),
        }
    }

    fn set_step_size(&mut self, step: T) {
        match self {
            Stepper::Euler(s) => s.set_step_size(step),
            Stepper::RungeKutta4(s) => s.set_step_size(step),
            Stepper::Discrete(s) => s.set_step_size(step),
        }
    }

    fn step<S: DynamicalSystem<T> + ?Sized>(&mut self, t: &mut T, system: &mut S) {
        match self {
            Stepper::Euler(s) => s.step(t, system),
            Stepper::RungeKutta4(s) => s.step(t, system),
            Stepper::Discrete(s) => s.step(t, system),
        }
    }
}
