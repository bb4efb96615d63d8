//! The `dynet_core` crate simulates continuous- and discrete-time dynamical
//! systems and composes many of them into coupled networks.
//! It is generic over the scalar type (`f32`, `f64`, ...).
//!
//! Key components:
//! - **Vectors**: `Vector` owns its storage or views a window of another vector through a re-bindable `Target`.
//! - **Traits**: `Scalar` (numeric type abstraction), `DynamicalSystem` (ODEs/Maps), `Integrator` (Solvers).
//! - **Solvers**: Fixed-step integrators (Euler, RK4) and iterators (Discrete).
//! - **Network**: Members sharing one flat state space, coupled through connections.
//! - **Simulation**: A driver loop recording samples to a caller-supplied sink.
pub mod error;
pub mod network;
pub mod settings;
pub mod simulation;
pub mod solvers;
pub mod states;
pub mod traits;
pub mod vector;

pub use error::{Error, OutOfRange, Result};
pub use network::{Connection, GainCoupling, LocalDynamics, LocalSystem, MemberHandle, Network};
pub use settings::{IntegratorSettings, Method};
pub use simulation::{Hooks, RunSettings, RunSummary, Sample, StopCondition, Transient};
pub use solvers::{Discrete, Euler, RungeKutta4, Stepper};
pub use states::SystemStates;
pub use traits::{DynamicalSystem, Integrator, Scalar};
pub use vector::{Target, Vector};
