#![allow(dead_code)]

use dynet_core::{DynamicalSystem, LocalDynamics, SystemStates, Vector};

pub const A: f64 = 0.398;
pub const B: f64 = 2.0;
pub const C: f64 = 4.0;

/// dx = -y - z, dy = x + a y, dz = b + z (x - c)
pub struct Rossler {
    states: SystemStates<f64>,
    a: f64,
    b: f64,
    c: f64,
}

impl Rossler {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self {
            states: SystemStates::new(3, 0),
            a,
            b,
            c,
        }
    }

    pub fn standard() -> Self {
        Self::new(A, B, C)
    }
}

impl DynamicalSystem<f64> for Rossler {
    fn states(&self) -> &SystemStates<f64> {
        &self.states
    }

    fn states_mut(&mut self) -> &mut SystemStates<f64> {
        &mut self.states
    }

    fn derive(&mut self, _t: f64, x: &Vector<f64>) {
        let (x0, x1, x2) = (x.get(0), x.get(1), x.get(2));
        self.states.set_dx(0, -x1 - x2);
        self.states.set_dx(1, x0 + self.a * x1);
        self.states.set_dx(2, self.b + x2 * (x0 - self.c));
    }
}

/// Rössler node whose coupling arrives through connections.
pub struct LocalRossler {
    a: f64,
    b: f64,
    c: f64,
}

impl LocalRossler {
    pub fn standard() -> Self {
        Self { a: A, b: B, c: C }
    }
}

impl LocalDynamics<f64> for LocalRossler {
    fn dim_states(&self) -> usize {
        3
    }

    fn local_derive(&mut self, _t: f64, x: &Vector<f64>, dx: &Vector<f64>, _y: &Vector<f64>) {
        let (x0, x1, x2) = (x.get(0), x.get(1), x.get(2));
        dx.set(0, -x1 - x2);
        dx.set(1, x0 + self.a * x1);
        dx.set(2, self.b + x2 * (x0 - self.c));
    }
}

pub fn field(x: [f64; 3]) -> [f64; 3] {
    [-x[1] - x[2], x[0] + A * x[1], B + x[2] * (x[0] - C)]
}

/// Plain-array RK4 on the standard Rössler field.
pub fn reference_rk4(mut x: [f64; 3], dt: f64, steps: usize) -> [f64; 3] {
    let half = dt * 0.5;
    let sixth = dt / 6.0;
    for _ in 0..steps {
        let k1 = field(x);
        let k2 = field(std::array::from_fn(|i| x[i] + half * k1[i]));
        let k3 = field(std::array::from_fn(|i| x[i] + half * k2[i]));
        let k4 = field(std::array::from_fn(|i| x[i] + dt * k3[i]));
        x = std::array::from_fn(|i| x[i] + sixth * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]));
    }
    x
}

pub fn reference_euler(mut x: [f64; 3], dt: f64, steps: usize) -> [f64; 3] {
    for _ in 0..steps {
        let k = field(x);
        x = std::array::from_fn(|i| x[i] + dt * k[i]);
    }
    x
}
