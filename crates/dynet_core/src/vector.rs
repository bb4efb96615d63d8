//! Numeric vectors that either own their storage or alias a window of another vector.
//!
//! A [`Vector`] is a handle. Owned vectors keep their buffer behind a
//! reference-counted cell, and views read and write through a [`Target`], a
//! shared slot naming the vector they alias. Because a target keeps the
//! storage it names alive, a view can never outlive the data it points at.
//!
//! Element writes go through `&self`: every handle sharing a buffer observes
//! the write, which is the whole point of a view.
//!
//! A [`Target`] can be re-bound at runtime. Every view built over it then
//! reads through the new vector, which is how a network evaluates its
//! members against a candidate state without touching their own views.

use crate::error::{Error, OutOfRange, Result};
use crate::traits::Scalar;
use nalgebra::DVector;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Buffer<T> = Rc<RefCell<Vec<T>>>;

enum Repr<T> {
    Owned(Buffer<T>),
    View(View<T>),
}

struct View<T> {
    target: Target<T>,
    begin: usize,
    end: usize,
}

impl<T> Clone for View<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            begin: self.begin,
            end: self.end,
        }
    }
}

impl<T: Scalar> Repr<T> {
    /// Shallow copy: the result names the same storage.
    fn share(&self) -> Self {
        match self {
            Repr::Owned(buffer) => Repr::Owned(Rc::clone(buffer)),
            Repr::View(view) => Repr::View(view.clone()),
        }
    }

    fn len(&self) -> usize {
        match self {
            Repr::Owned(buffer) => buffer.borrow().len(),
            Repr::View(view) => view.end - view.begin,
        }
    }

    fn try_get(&self, index: usize) -> Option<T> {
        match self {
            Repr::Owned(buffer) => buffer.borrow().get(index).copied(),
            Repr::View(view) => {
                if index < view.end - view.begin {
                    view.target.slot.borrow().try_get(view.begin + index)
                } else {
                    None
                }
            }
        }
    }

    fn try_set(&self, index: usize, value: T) -> bool {
        match self {
            Repr::Owned(buffer) => match buffer.borrow_mut().get_mut(index) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            Repr::View(view) => {
                index < view.end - view.begin
                    && view.target.slot.borrow().try_set(view.begin + index, value)
            }
        }
    }

    /// Backing buffer and absolute offset of element 0.
    fn locate(&self) -> (Buffer<T>, usize) {
        match self {
            Repr::Owned(buffer) => (Rc::clone(buffer), 0),
            Repr::View(view) => {
                let (buffer, offset) = view.target.slot.borrow().locate();
                (buffer, offset + view.begin)
            }
        }
    }

    fn reads_through(&self, target: &Target<T>) -> bool {
        match self {
            Repr::Owned(_) => false,
            Repr::View(view) => {
                Rc::ptr_eq(&view.target.slot, &target.slot)
                    || view.target.slot.borrow().reads_through(target)
            }
        }
    }
}

/// A dense numeric vector, either owning its buffer or viewing `[begin, end)` of a target.
pub struct Vector<T> {
    repr: Repr<T>,
}

impl<T: Scalar> Vector<T> {
    /// An empty owned vector.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn zeros(len: usize) -> Self {
        Self::from_vec(vec![T::zero(); len])
    }

    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            repr: Repr::Owned(Rc::new(RefCell::new(data))),
        }
    }

    pub fn from_slice(data: &[T]) -> Self {
        Self::from_vec(data.to_vec())
    }

    pub fn from_dvector(data: &DVector<T>) -> Self {
        Self::from_slice(data.as_slice())
    }

    pub fn len(&self) -> usize {
        self.repr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when this handle owns its buffer (as opposed to viewing another vector).
    pub fn is_owned(&self) -> bool {
        matches!(self.repr, Repr::Owned(_))
    }

    pub fn is_view(&self) -> bool {
        !self.is_owned()
    }

    /// `(begin, end)` within the target for views, `None` for owned vectors.
    pub fn bounds(&self) -> Option<(usize, usize)> {
        match &self.repr {
            Repr::Owned(_) => None,
            Repr::View(view) => Some((view.begin, view.end)),
        }
    }

    /// Fast-path read.
    ///
    /// # Panics
    /// Panics if `index` is outside the vector, or outside the storage the
    /// vector currently resolves to.
    #[inline]
    pub fn get(&self, index: usize) -> T {
        match self.repr.try_get(index) {
            Some(value) => value,
            None => panic!(
                "index {index} out of range for vector of length {}",
                self.len()
            ),
        }
    }

    /// Fast-path write.
    ///
    /// # Panics
    /// Same conditions as [`Vector::get`].
    #[inline]
    pub fn set(&self, index: usize, value: T) {
        if !self.repr.try_set(index, value) {
            panic!(
                "index {index} out of range for vector of length {}",
                self.len()
            );
        }
    }

    #[inline]
    pub fn update(&self, index: usize, f: impl FnOnce(T) -> T) {
        self.set(index, f(self.get(index)));
    }

    /// Bounds-checked read.
    pub fn at(&self, index: usize) -> Result<T> {
        self.repr.try_get(index).ok_or_else(|| {
            OutOfRange::Index {
                index,
                len: self.len(),
            }
            .into()
        })
    }

    /// Bounds-checked write.
    pub fn set_at(&self, index: usize, value: T) -> Result<()> {
        if self.repr.try_set(index, value) {
            Ok(())
        } else {
            Err(OutOfRange::Index {
                index,
                len: self.len(),
            }
            .into())
        }
    }

    /// Resizes an owned vector (new slots are zero), or moves the end bound of a view.
    ///
    /// A view never touches its target: growing it past the target's length
    /// fails with `OutOfRange`.
    pub fn resize(&mut self, len: usize) -> Result<()> {
        self.check_resize(len)?;
        match &mut self.repr {
            Repr::Owned(buffer) => buffer.borrow_mut().resize(len, T::zero()),
            Repr::View(view) => view.end = view.begin + len,
        }
        Ok(())
    }

    /// Fails exactly when [`Vector::resize`] to `len` would.
    pub(crate) fn check_resize(&self, len: usize) -> Result<()> {
        match &self.repr {
            Repr::Owned(_) => Ok(()),
            Repr::View(view) => {
                let available = view.target.len();
                if view.begin + len > available {
                    Err(OutOfRange::Range {
                        begin: view.begin,
                        end: view.begin + len,
                        len: available,
                    }
                    .into())
                } else {
                    Ok(())
                }
            }
        }
    }

    /// A fresh view aliasing `[begin, end)` of this vector.
    ///
    /// Slicing a view shares its target, so the slice follows any later
    /// re-binding of that target.
    pub fn slice(&self, begin: usize, end: usize) -> Result<Vector<T>> {
        let len = self.len();
        if begin > end || end > len {
            return Err(OutOfRange::Range { begin, end, len }.into());
        }
        let view = match &self.repr {
            Repr::Owned(_) => View {
                target: Target::new(self),
                begin,
                end,
            },
            Repr::View(view) => View {
                target: view.target.clone(),
                begin: view.begin + begin,
                end: view.begin + end,
            },
        };
        Ok(Self {
            repr: Repr::View(view),
        })
    }

    /// A view over the whole vector.
    pub fn alias(&self) -> Vector<T> {
        let repr = match &self.repr {
            Repr::Owned(_) => Repr::View(View {
                target: Target::new(self),
                begin: 0,
                end: self.len(),
            }),
            Repr::View(view) => Repr::View(view.clone()),
        };
        Self { repr }
    }

    /// Deep copy into a new owned vector.
    pub fn detach(&self) -> Vector<T> {
        Self::from_vec(self.to_vec())
    }

    pub fn fill(&self, value: T) {
        self.with_mut(|data| data.fill(value));
    }

    /// Resizes `self` to `other.len()` and copies every element.
    pub fn copy_from(&mut self, other: &Vector<T>) -> Result<()> {
        let values = other.to_vec();
        self.resize(values.len())?;
        self.with_mut(|data| data.copy_from_slice(&values));
        Ok(())
    }

    /// Copies `other` element-wise into the storage `self` resolves to.
    pub fn assign(&self, other: &Vector<T>) -> Result<()> {
        let values = other.to_vec();
        if values.len() != self.len() {
            return Err(Error::configuration(format!(
                "cannot assign {} values to a vector of length {}",
                values.len(),
                self.len()
            )));
        }
        self.with_mut(|data| data.copy_from_slice(&values));
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.with(|data| data.to_vec())
    }

    pub fn to_dvector(&self) -> DVector<T> {
        DVector::from_vec(self.to_vec())
    }

    /// Runs `f` over the contiguous elements this vector resolves to.
    ///
    /// # Panics
    /// Panics if the view reaches past its storage, or if the storage is
    /// mutably borrowed by an enclosing `with_mut`.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let (buffer, offset) = self.repr.locate();
        let data = buffer.borrow();
        f(&data[offset..offset + self.len()])
    }

    /// Mutable counterpart of [`Vector::with`].
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut [T]) -> R) -> R {
        let (buffer, offset) = self.repr.locate();
        let len = self.len();
        let mut data = buffer.borrow_mut();
        f(&mut data[offset..offset + len])
    }

    /// True when both handles currently resolve to the same elements of the same buffer.
    pub fn shares_storage(&self, other: &Vector<T>) -> bool {
        let (lhs, lhs_offset) = self.repr.locate();
        let (rhs, rhs_offset) = other.repr.locate();
        Rc::ptr_eq(&lhs, &rhs) && lhs_offset == rhs_offset && self.len() == other.len()
    }
}

impl<T: Scalar> Default for Vector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> From<Vec<T>> for Vector<T> {
    fn from(data: Vec<T>) -> Self {
        Self::from_vec(data)
    }
}

impl<T: Scalar> PartialEq for Vector<T> {
    fn eq(&self, other: &Self) -> bool {
        let len = self.len();
        len == other.len() && (0..len).all(|i| self.repr.try_get(i) == other.repr.try_get(i))
    }
}

impl<T: Scalar> fmt::Debug for Vector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<T> = (0..self.len()).filter_map(|i| self.repr.try_get(i)).collect();
        let kind = if self.is_owned() { "Owned" } else { "View" };
        f.debug_tuple(kind).field(&values).finish()
    }
}

/// Re-bindable shared reference to a vector.
///
/// Views created through [`Target::view`] (and slices of those views) index
/// into whatever vector the target is currently bound to. The target does
/// not copy: binding is O(1) and writes through the views land in the bound
/// vector.
pub struct Target<T> {
    slot: Rc<RefCell<Repr<T>>>,
}

impl<T> Clone for Target<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: Scalar> Target<T> {
    pub fn new(vector: &Vector<T>) -> Self {
        Self {
            slot: Rc::new(RefCell::new(vector.repr.share())),
        }
    }

    /// Re-points the target (and therefore every view over it) at `vector`.
    ///
    /// Fails if `vector` itself reads through this target.
    pub fn bind(&self, vector: &Vector<T>) -> Result<()> {
        if vector.repr.reads_through(self) {
            return Err(Error::configuration(
                "cannot bind a target to a vector that reads through it",
            ));
        }
        *self.slot.borrow_mut() = vector.repr.share();
        Ok(())
    }

    /// Length of the vector currently bound.
    pub fn len(&self) -> usize {
        self.slot.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_bound_to(&self, vector: &Vector<T>) -> bool {
        let (lhs, lhs_offset) = self.slot.borrow().locate();
        let (rhs, rhs_offset) = vector.repr.locate();
        Rc::ptr_eq(&lhs, &rhs) && lhs_offset == rhs_offset
    }

    /// A view of `[begin, end)` through this target.
    pub fn view(&self, begin: usize, end: usize) -> Result<Vector<T>> {
        let len = self.len();
        if begin > end || end > len {
            return Err(OutOfRange::Range { begin, end, len }.into());
        }
        Ok(Vector {
            repr: Repr::View(View {
                target: self.clone(),
                begin,
                end,
            }),
        })
    }
}

impl<T: Scalar> fmt::Debug for Target<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Target, Vector};
    use crate::error::{Error, OutOfRange};

    fn ramp(len: usize) -> Vector<f64> {
        Vector::from_vec((0..len).map(|i| i as f64).collect())
    }

    #[test]
    fn slice_aliases_the_target_window() {
        let base = ramp(10);
        let view = base.slice(2, 8).expect("valid slice");
        assert_eq!(view.len(), 6);
        assert!(view.is_view());
        for i in 0..view.len() {
            assert_eq!(view.get(i), base.get(i + 2));
        }

        view.set(1, -3.0);
        assert_eq!(base.get(3), -3.0);
        base.set(7, 42.0);
        assert_eq!(view.get(5), 42.0);
    }

    #[test]
    fn nested_slices_compose_offsets() {
        let base = ramp(10);
        let outer = base.slice(2, 8).unwrap();
        let inner = outer.slice(2, 4).unwrap();
        assert_eq!(inner.to_vec(), vec![4.0, 5.0]);
        assert_eq!(inner.bounds(), Some((4, 6)));
    }

    #[test]
    fn two_views_observe_each_others_writes() {
        let base = ramp(6);
        let a = base.slice(0, 4).unwrap();
        let b = base.slice(2, 6).unwrap();
        a.set(3, 9.5);
        assert_eq!(b.get(1), 9.5);
    }

    #[test]
    fn slice_rejects_inverted_or_oversized_ranges() {
        let base = ramp(5);
        assert_eq!(
            base.slice(3, 2).unwrap_err(),
            Error::OutOfRange(OutOfRange::Range {
                begin: 3,
                end: 2,
                len: 5
            })
        );
        assert!(base.slice(0, 6).unwrap_err().is_out_of_range());
        assert!(base.slice(5, 5).unwrap().is_empty());
    }

    #[test]
    fn checked_access_fails_past_the_end() {
        let base = ramp(3);
        assert_eq!(base.at(2), Ok(2.0));
        assert_eq!(
            base.at(3),
            Err(Error::OutOfRange(OutOfRange::Index { index: 3, len: 3 }))
        );
        let view = base.slice(1, 3).unwrap();
        assert!(view.at(2).is_err());
        assert!(view.set_at(2, 1.0).is_err());
        assert!(view.set_at(1, 1.0).is_ok());
        assert_eq!(base.get(2), 1.0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn unchecked_access_panics_past_the_end() {
        let base = ramp(3);
        let view = base.slice(0, 2).unwrap();
        view.get(2);
    }

    #[test]
    fn resizing_a_view_moves_only_its_bounds() {
        let base = ramp(8);
        let mut view = base.slice(2, 4).unwrap();
        view.resize(5).expect("fits in target");
        assert_eq!(view.to_vec(), vec![2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(base.len(), 8);
        assert!(view.resize(7).unwrap_err().is_out_of_range());
        assert_eq!(view.len(), 5);
    }

    #[test]
    fn resizing_an_owned_vector_drops_and_zero_fills() {
        let mut base = ramp(4);
        base.resize(2).unwrap();
        base.resize(4).unwrap();
        assert_eq!(base.to_vec(), vec![0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn views_keep_storage_alive() {
        let view = {
            let base = ramp(4);
            base.slice(1, 3).unwrap()
        };
        assert_eq!(view.to_vec(), vec![1.0, 2.0]);
    }

    #[test]
    fn equality_is_elementwise() {
        let base = ramp(6);
        let view = base.slice(1, 3).unwrap();
        assert_eq!(view, Vector::from_vec(vec![1.0, 2.0]));
        assert_ne!(view, Vector::from_vec(vec![1.0, 2.0, 3.0]));
        assert_ne!(view, Vector::from_vec(vec![1.0, 2.5]));
    }

    #[test]
    fn detach_copies_and_alias_shares() {
        let base = ramp(3);
        let copy = base.detach();
        let alias = base.alias();
        base.set(0, 7.0);
        assert_eq!(copy.get(0), 0.0);
        assert_eq!(alias.get(0), 7.0);
        assert!(copy.is_owned());
        assert!(alias.shares_storage(&base));
        assert!(!copy.shares_storage(&base));
    }

    #[test]
    fn copy_from_resizes_to_the_source() {
        let mut dst = Vector::zeros(1);
        dst.copy_from(&ramp(3)).unwrap();
        assert_eq!(dst.to_vec(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn assign_writes_through_a_view_without_resizing() {
        let base = ramp(5);
        let view = base.slice(1, 3).unwrap();
        view.assign(&Vector::from_vec(vec![8.0, 9.0])).unwrap();
        assert_eq!(base.to_vec(), vec![0.0, 8.0, 9.0, 3.0, 4.0]);
        assert!(view.assign(&ramp(3)).unwrap_err().is_configuration());
    }

    #[test]
    fn rebinding_a_target_redirects_every_view() {
        let home = ramp(6);
        let candidate = Vector::from_vec(vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let target = Target::new(&home);
        let first = target.view(0, 3).unwrap();
        let second = target.view(3, 6).unwrap();
        let nested = second.slice(1, 2).unwrap();

        target.bind(&candidate).unwrap();
        assert!(target.is_bound_to(&candidate));
        assert_eq!(first.to_vec(), vec![10.0, 11.0, 12.0]);
        assert_eq!(nested.get(0), 14.0);
        second.set(0, -1.0);
        assert_eq!(candidate.get(3), -1.0);
        assert_eq!(home.get(3), 3.0);

        target.bind(&home).unwrap();
        assert_eq!(first.to_vec(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn binding_a_target_through_itself_is_refused() {
        let home = ramp(4);
        let target = Target::new(&home);
        let through = target.view(0, 4).unwrap();
        assert!(target.bind(&through).unwrap_err().is_configuration());
        assert!(target.is_bound_to(&home));
    }

    #[test]
    fn target_view_checks_bounds() {
        let target = Target::new(&ramp(3));
        assert!(target.view(1, 4).is_err());
        assert_eq!(target.view(1, 3).unwrap().to_vec(), vec![1.0, 2.0]);
    }

    #[test]
    fn dvector_round_trip_preserves_values() {
        let base = ramp(4);
        let view = base.slice(1, 4).unwrap();
        let dense = view.to_dvector();
        assert_eq!(dense.len(), 3);
        assert_eq!(dense[2], 3.0);
        assert_eq!(Vector::from_dvector(&dense), view);
    }
}
