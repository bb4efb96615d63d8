//! The state / derivative / output triple carried by every dynamical system.

use crate::error::{Error, Result};
use crate::traits::Scalar;
use crate::vector::Vector;
use std::fmt;

/// State `x`, derivative `dx` and output `y` vectors.
///
/// Each slot is independently owned or a view into external storage; the
/// ownership travels with the [`Vector`] handed in. `x` and `dx` always have
/// the same length, `y` is independent and may be empty.
pub struct SystemStates<T> {
    x: Vector<T>,
    dx: Vector<T>,
    y: Vector<T>,
}

impl<T: Scalar> SystemStates<T> {
    /// Owned, zero-initialized vectors.
    pub fn new(n_states: usize, n_outputs: usize) -> Self {
        Self {
            x: Vector::zeros(n_states),
            dx: Vector::zeros(n_states),
            y: Vector::zeros(n_outputs),
        }
    }

    pub fn from_vectors(x: Vector<T>, dx: Vector<T>, y: Vector<T>) -> Result<Self> {
        check_paired(&x, &dx)?;
        Ok(Self { x, dx, y })
    }

    pub fn into_vectors(self) -> (Vector<T>, Vector<T>, Vector<T>) {
        (self.x, self.dx, self.y)
    }

    pub fn state_vector(&self) -> &Vector<T> {
        &self.x
    }

    pub fn derivative_vector(&self) -> &Vector<T> {
        &self.dx
    }

    pub fn output_vector(&self) -> &Vector<T> {
        &self.y
    }

    #[inline]
    pub fn x(&self, index: usize) -> T {
        self.x.get(index)
    }

    #[inline]
    pub fn dx(&self, index: usize) -> T {
        self.dx.get(index)
    }

    #[inline]
    pub fn y(&self, index: usize) -> T {
        self.y.get(index)
    }

    #[inline]
    pub fn set_x(&mut self, index: usize, value: T) {
        self.x.set(index, value);
    }

    #[inline]
    pub fn set_dx(&mut self, index: usize, value: T) {
        self.dx.set(index, value);
    }

    #[inline]
    pub fn set_y(&mut self, index: usize, value: T) {
        self.y.set(index, value);
    }

    pub fn size_states(&self) -> usize {
        self.x.len()
    }

    pub fn size_derivatives(&self) -> usize {
        self.dx.len()
    }

    pub fn size_outputs(&self) -> usize {
        self.y.len()
    }

    pub fn owns_states(&self) -> bool {
        self.x.is_owned()
    }

    pub fn owns_derivatives(&self) -> bool {
        self.dx.is_owned()
    }

    pub fn owns_outputs(&self) -> bool {
        self.y.is_owned()
    }

    /// Replaces `x`. Pass an owned vector to hand it over, or `other.alias()`
    /// (or a slice) to borrow external storage. The previous vector is dropped.
    pub fn set_states(&mut self, x: Vector<T>) -> Result<()> {
        check_paired(&x, &self.dx)?;
        self.x = x;
        Ok(())
    }

    pub fn set_derivatives(&mut self, dx: Vector<T>) -> Result<()> {
        check_paired(&self.x, &dx)?;
        self.dx = dx;
        Ok(())
    }

    pub fn set_outputs(&mut self, y: Vector<T>) {
        self.y = y;
    }

    /// Replaces `x` and `dx` together, for changes of dimension.
    pub fn set_state_vectors(&mut self, x: Vector<T>, dx: Vector<T>) -> Result<()> {
        check_paired(&x, &dx)?;
        self.x = x;
        self.dx = dx;
        Ok(())
    }

    /// Resizes owned slots; view-backed slots only move their own bounds.
    ///
    /// Either every slot is resized or none is.
    pub fn resize(&mut self, n_states: usize, n_outputs: usize) -> Result<()> {
        self.x.check_resize(n_states)?;
        self.dx.check_resize(n_states)?;
        self.y.check_resize(n_outputs)?;
        self.x.resize(n_states)?;
        self.dx.resize(n_states)?;
        self.y.resize(n_outputs)
    }

    /// Deep element-wise copy of `other`, resizing `self` to match first.
    pub fn copy_from(&mut self, other: &SystemStates<T>) -> Result<()> {
        self.resize(other.size_states(), other.size_outputs())?;
        self.x.copy_from(&other.x)?;
        self.dx.copy_from(&other.dx)?;
        self.y.copy_from(&other.y)
    }
}

fn check_paired<T: Scalar>(x: &Vector<T>, dx: &Vector<T>) -> Result<()> {
    if x.len() != dx.len() {
        return Err(Error::configuration(format!(
            "state vector has {} entries but derivative vector has {}",
            x.len(),
            dx.len()
        )));
    }
    Ok(())
}

impl<T: Scalar> Default for SystemStates<T> {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// Compares states and outputs; derivatives are scratch and ignored.
impl<T: Scalar> PartialEq for SystemStates<T> {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl<T: Scalar> fmt::Debug for SystemStates<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemStates")
            .field("x", &self.x)
            .field("dx", &self.dx)
            .field("y", &self.y)
            .finish()
    }
}
