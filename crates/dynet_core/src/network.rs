//! Composition of many dynamical systems into one flat state space.
//!
//! Members are appended to a [`Network`] and receive disjoint, contiguous
//! ranges of the network's state and output vectors in insertion order.
//! Once [`Network::finish`] allocates the shared storage, every member reads
//! and writes through views into it.
//!
//! Member views are built over [`Target`]s rather than over the network's
//! vectors directly. When an integrator evaluates the network at a candidate
//! state, the state target is re-bound to the candidate for the duration of
//! the call, so members see the candidate without their views changing.
//!
//! Two kinds of members are supported:
//! - plain [`DynamicalSystem`]s, added with [`Network::add`];
//! - [`LocalDynamics`] nodes, added with [`Network::add_local`], which are
//!   handed the whole candidate state and sum the contributions of their
//!   [`Connection`]s into their own derivative.

use crate::error::{Error, Result};
use crate::states::SystemStates;
use crate::traits::{DynamicalSystem, Scalar};
use crate::vector::{Target, Vector};
use std::fmt;
use std::ops::Range;

/// Identifies a member by insertion position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberHandle(usize);

impl MemberHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Uncoupled dynamics of a network node.
pub trait LocalDynamics<T: Scalar> {
    fn dim_states(&self) -> usize;

    fn dim_outputs(&self) -> usize {
        0
    }

    /// Writes the node's own derivative into `dx`.
    /// x: the node's slice of the candidate network state
    /// dx: the node's slice of the network derivative
    /// y: the node's slice of the network outputs
    fn local_derive(&mut self, t: T, x: &Vector<T>, dx: &Vector<T>, y: &Vector<T>);

    fn local_observe(&mut self, _t: T, _x: &Vector<T>, _y: &Vector<T>) {}
}

/// A coupling term added into one derivative slot of the node that owns it.
pub trait Connection<T: Scalar> {
    /// Contribution given the full candidate network state.
    fn coupling(&self, x: &Vector<T>) -> T;

    /// Local state index of the receiving node the contribution is added to.
    fn slot(&self) -> usize {
        0
    }

    /// Absolute network state offsets read by [`Connection::coupling`], if
    /// known. [`Network::connect`] rejects offsets outside the network.
    fn state_offsets(&self) -> Vec<usize> {
        Vec::new()
    }
}

impl<T, F> Connection<T> for F
where
    T: Scalar,
    F: Fn(&Vector<T>) -> T,
{
    fn coupling(&self, x: &Vector<T>) -> T {
        self(x)
    }
}

/// Diffusive coupling `gain * (x[from] - x[to])` between absolute state offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainCoupling<T> {
    gain: T,
    from: usize,
    to: usize,
    slot: usize,
}

impl<T: Scalar> GainCoupling<T> {
    pub fn new(gain: T, from: usize, to: usize) -> Self {
        Self {
            gain,
            from,
            to,
            slot: 0,
        }
    }

    /// Couples state `state_offset` of `from` into the same state of `to`.
    ///
    /// Offsets are captured now; they stay valid as the network grows since
    /// members are never renumbered.
    pub fn between(
        network: &Network<T>,
        from: MemberHandle,
        to: MemberHandle,
        state_offset: usize,
        gain: T,
    ) -> Result<Self> {
        let source = network.state_range(from)?;
        let sink = network.state_range(to)?;
        if state_offset >= source.len() || state_offset >= sink.len() {
            return Err(Error::configuration(format!(
                "state offset {state_offset} exceeds a coupled member's dimension"
            )));
        }
        Ok(Self {
            gain,
            from: source.start + state_offset,
            to: sink.start + state_offset,
            slot: state_offset,
        })
    }

    /// Adds the contribution into local state `slot` instead.
    pub fn into_slot(mut self, slot: usize) -> Self {
        self.slot = slot;
        self
    }

    pub fn gain(&self) -> T {
        self.gain
    }

    pub fn set_gain(&mut self, gain: T) {
        self.gain = gain;
    }

    pub fn offsets(&self) -> (usize, usize) {
        (self.from, self.to)
    }
}

impl<T: Scalar> Connection<T> for GainCoupling<T> {
    fn coupling(&self, x: &Vector<T>) -> T {
        self.gain * (x.get(self.from) - x.get(self.to))
    }

    fn slot(&self) -> usize {
        self.slot
    }

    fn state_offsets(&self) -> Vec<usize> {
        vec![self.from, self.to]
    }
}

/// A node of the network: its dynamics, its incoming connections and, while
/// the network is being evaluated, read access to the candidate state.
pub struct LocalSystem<T: Scalar> {
    dynamics: Box<dyn LocalDynamics<T>>,
    connections: Vec<Box<dyn Connection<T>>>,
    current: Option<Vector<T>>,
    base: usize,
    base_output: usize,
    dx: Vector<T>,
    y: Vector<T>,
}

impl<T: Scalar> LocalSystem<T> {
    pub fn new(dynamics: impl LocalDynamics<T> + 'static) -> Self {
        Self {
            dynamics: Box::new(dynamics),
            connections: Vec::new(),
            current: None,
            base: 0,
            base_output: 0,
            dx: Vector::new(),
            y: Vector::new(),
        }
    }

    pub fn dim_states(&self) -> usize {
        self.dynamics.dim_states()
    }

    pub fn dim_outputs(&self) -> usize {
        self.dynamics.dim_outputs()
    }

    /// Offset of the node's first state in the network.
    pub fn base(&self) -> usize {
        self.base
    }

    pub fn base_output(&self) -> usize {
        self.base_output
    }

    pub fn connect(&mut self, connection: impl Connection<T> + 'static) -> Result<()> {
        let slot = connection.slot();
        if slot >= self.dim_states() {
            return Err(Error::configuration(format!(
                "connection slot {slot} is outside a node with {} states",
                self.dim_states()
            )));
        }
        self.connections.push(Box::new(connection));
        Ok(())
    }

    pub fn connections(&self) -> &[Box<dyn Connection<T>>] {
        &self.connections
    }

    pub fn set_current_state(&mut self, x: &Vector<T>) {
        self.current = Some(x.alias());
    }

    pub fn clear_current_state(&mut self) {
        self.current = None;
    }

    pub fn current_state(&self) -> Option<&Vector<T>> {
        self.current.as_ref()
    }

    /// Own dynamics plus the sum of all connection outputs, written into the
    /// node's slice of the network derivative.
    ///
    /// # Panics
    ///
    /// If no current state is set, or the current state does not cover the
    /// node's range. Either would leave the derivative stale.
    pub fn local_derive(&mut self, t: T) {
        let Some(x) = self.current.as_ref() else {
            panic!(
                "{}",
                Error::configuration(format!(
                    "local_derive called without a current state (node at {})",
                    self.base
                ))
            );
        };
        let own = match x.slice(self.base, self.base + self.dynamics.dim_states()) {
            Ok(own) => own,
            Err(err) => panic!(
                "{}",
                Error::configuration(format!(
                    "current state does not cover node at {}: {err}",
                    self.base
                ))
            ),
        };

        self.dynamics.local_derive(t, &own, &self.dx, &self.y);

        for connection in &self.connections {
            let u = connection.coupling(x);
            self.dx.update(connection.slot(), |v| v + u);
        }
    }

    pub fn local_observe(&mut self, t: T) {
        let Some(x) = self.current.as_ref() else {
            return;
        };
        if let Ok(own) = x.slice(self.base, self.base + self.dynamics.dim_states()) {
            self.dynamics.local_observe(t, &own, &self.y);
        }
    }
}

impl<T: Scalar> fmt::Debug for LocalSystem<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSystem")
            .field("base", &self.base)
            .field("dim_states", &self.dim_states())
            .field("connections", &self.connections.len())
            .finish()
    }
}

enum Kind<T: Scalar> {
    Plain(Box<dyn DynamicalSystem<T>>),
    Local(LocalSystem<T>),
}

struct Member<T: Scalar> {
    kind: Kind<T>,
    states: Range<usize>,
    outputs: Range<usize>,
}

/// Re-bindable targets over the network's own vectors.
struct Storage<T> {
    x: Target<T>,
    dx: Target<T>,
    y: Target<T>,
}

/// A dynamical system made of member systems sharing one state space.
pub struct Network<T: Scalar> {
    states: SystemStates<T>,
    members: Vec<Member<T>>,
    storage: Option<Storage<T>>,
    n_states: usize,
    n_outputs: usize,
}

impl<T: Scalar> Network<T> {
    pub fn new() -> Self {
        Self {
            states: SystemStates::new(0, 0),
            members: Vec::new(),
            storage: None,
            n_states: 0,
            n_outputs: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.storage.is_some()
    }

    /// Appends an independent system.
    ///
    /// Fails if its state and derivative vectors disagree, or if its
    /// declared dimensions differ from its vectors (e.g. an unfinished
    /// nested network).
    pub fn add(&mut self, system: impl DynamicalSystem<T> + 'static) -> Result<MemberHandle> {
        let states = system.states();
        if states.size_states() != states.size_derivatives() {
            return Err(Error::configuration(format!(
                "member has {} states but {} derivatives",
                states.size_states(),
                states.size_derivatives()
            )));
        }
        if system.dim_states() != states.size_states()
            || system.dim_outputs() != states.size_outputs()
        {
            return Err(Error::configuration(format!(
                "member declares {}x{} dimensions but holds {}x{} vectors",
                system.dim_states(),
                system.dim_outputs(),
                states.size_states(),
                states.size_outputs()
            )));
        }
        let dims = (system.dim_states(), system.dim_outputs());
        self.push(Kind::Plain(Box::new(system)), dims)
    }

    /// Appends a node whose coupling is expressed through connections.
    pub fn add_local(
        &mut self,
        dynamics: impl LocalDynamics<T> + 'static,
    ) -> Result<MemberHandle> {
        let local = LocalSystem::new(dynamics);
        let dims = (local.dim_states(), local.dim_outputs());
        self.push(Kind::Local(local), dims)
    }

    fn push(
        &mut self,
        kind: Kind<T>,
        (dim_states, dim_outputs): (usize, usize),
    ) -> Result<MemberHandle> {
        let states = self.n_states..self.n_states + dim_states;
        let outputs = self.n_outputs..self.n_outputs + dim_outputs;
        let mut member = Member {
            kind,
            states,
            outputs,
        };

        if let Some(storage) = &self.storage {
            // Offsets are append-only: growing in place keeps every existing
            // view and connection valid.
            self.states.resize(member.states.end, member.outputs.end)?;
            install(&mut member, storage)?;
            tracing::debug!(
                states = member.states.end,
                outputs = member.outputs.end,
                "grew network storage"
            );
        }

        let handle = MemberHandle(self.members.len());
        tracing::debug!(
            member = handle.0,
            states = ?member.states,
            outputs = ?member.outputs,
            "added network member"
        );
        self.n_states = member.states.end;
        self.n_outputs = member.outputs.end;
        self.members.push(member);
        Ok(handle)
    }

    /// Allocates the shared storage and re-points every member at it.
    ///
    /// Values the members held before are carried over. Calling it again is
    /// a no-op; members added later are installed as they are added.
    pub fn finish(&mut self) -> Result<()> {
        if self.storage.is_some() {
            return Ok(());
        }
        self.states.resize(self.n_states, self.n_outputs)?;
        let storage = Storage {
            x: Target::new(self.states.state_vector()),
            dx: Target::new(self.states.derivative_vector()),
            y: Target::new(self.states.output_vector()),
        };
        for member in &mut self.members {
            install(member, &storage)?;
        }
        tracing::debug!(
            members = self.members.len(),
            states = self.n_states,
            outputs = self.n_outputs,
            "allocated network storage"
        );
        self.storage = Some(storage);
        Ok(())
    }

    fn find(&self, handle: MemberHandle) -> Result<&Member<T>> {
        self.members
            .get(handle.0)
            .ok_or_else(|| Error::configuration(format!("unknown member {}", handle.0)))
    }

    fn find_mut(&mut self, handle: MemberHandle) -> Result<&mut Member<T>> {
        self.members
            .get_mut(handle.0)
            .ok_or_else(|| Error::configuration(format!("unknown member {}", handle.0)))
    }

    pub fn state_range(&self, handle: MemberHandle) -> Result<Range<usize>> {
        Ok(self.find(handle)?.states.clone())
    }

    pub fn output_range(&self, handle: MemberHandle) -> Result<Range<usize>> {
        Ok(self.find(handle)?.outputs.clone())
    }

    pub fn member(&self, handle: MemberHandle) -> Result<&dyn DynamicalSystem<T>> {
        match &self.find(handle)?.kind {
            Kind::Plain(system) => Ok(system.as_ref()),
            Kind::Local(_) => Err(Error::configuration(format!(
                "member {} is a local system",
                handle.0
            ))),
        }
    }

    pub fn member_mut(&mut self, handle: MemberHandle) -> Result<&mut dyn DynamicalSystem<T>> {
        match &mut self.find_mut(handle)?.kind {
            Kind::Plain(system) => Ok(system.as_mut()),
            Kind::Local(_) => Err(Error::configuration(format!(
                "member {} is a local system",
                handle.0
            ))),
        }
    }

    pub fn local(&self, handle: MemberHandle) -> Result<&LocalSystem<T>> {
        match &self.find(handle)?.kind {
            Kind::Local(local) => Ok(local),
            Kind::Plain(_) => Err(Error::configuration(format!(
                "member {} is not a local system",
                handle.0
            ))),
        }
    }

    pub fn local_mut(&mut self, handle: MemberHandle) -> Result<&mut LocalSystem<T>> {
        match &mut self.find_mut(handle)?.kind {
            Kind::Local(local) => Ok(local),
            Kind::Plain(_) => Err(Error::configuration(format!(
                "member {} is not a local system",
                handle.0
            ))),
        }
    }

    /// Wires `connection` into the local member `handle`. Every network
    /// offset the connection reads must lie inside the current state space.
    pub fn connect(
        &mut self,
        handle: MemberHandle,
        connection: impl Connection<T> + 'static,
    ) -> Result<()> {
        let n_states = self.n_states;
        if let Some(offset) = connection
            .state_offsets()
            .into_iter()
            .find(|&offset| offset >= n_states)
        {
            return Err(Error::configuration(format!(
                "connection reads state {offset} of a network with {n_states} states"
            )));
        }
        self.local_mut(handle)?.connect(connection)
    }

    /// Views of one member's slice of the shared storage.
    pub fn member_states(&self, handle: MemberHandle) -> Result<SystemStates<T>> {
        let storage = self.storage.as_ref().ok_or_else(|| {
            Error::configuration("network storage is not allocated; call finish() first")
        })?;
        let member = self.find(handle)?;
        member_views(member, storage)
    }

    /// Runs `visit` on every member with the state target bound to `x`.
    ///
    /// # Panics
    ///
    /// If the network has not been finished. An integrator stepping it would
    /// otherwise advance time over a derivative nobody wrote.
    fn dispatch(&mut self, x: &Vector<T>, mut visit: impl FnMut(&mut Kind<T>, &Vector<T>)) {
        let Some(storage) = &self.storage else {
            panic!("{}", Error::configuration("network evaluated before finish()"));
        };
        debug_assert_eq!(x.len(), self.n_states, "candidate state has the wrong size");

        let retarget = !storage.x.is_bound_to(x);
        if retarget {
            if let Err(err) = storage.x.bind(x) {
                tracing::error!(%err, "refusing to evaluate network at candidate state");
                return;
            }
        }

        for member in &mut self.members {
            visit(&mut member.kind, x);
        }

        if retarget {
            if let Err(err) = storage.x.bind(self.states.state_vector()) {
                tracing::error!(%err, "failed to restore network state target");
            }
        }
    }
}

/// Builds views of `member`'s ranges through the storage targets.
fn member_views<T: Scalar>(member: &Member<T>, storage: &Storage<T>) -> Result<SystemStates<T>> {
    let x = storage.x.view(member.states.start, member.states.end)?;
    let dx = storage.dx.view(member.states.start, member.states.end)?;
    let y = storage.y.view(member.outputs.start, member.outputs.end)?;
    SystemStates::from_vectors(x, dx, y)
}

/// Replaces a member's vectors with views into the shared storage, carrying
/// over the values it held. Its previous buffers are released.
fn install<T: Scalar>(member: &mut Member<T>, storage: &Storage<T>) -> Result<()> {
    let views = member_views(member, storage)?;
    match &mut member.kind {
        Kind::Plain(system) => {
            views.state_vector().assign(system.states().state_vector())?;
            views.output_vector().assign(system.states().output_vector())?;
            system.attach(views)
        }
        Kind::Local(local) => {
            let (_, dx, y) = views.into_vectors();
            local.base = member.states.start;
            local.base_output = member.outputs.start;
            local.dx = dx;
            local.y = y;
            Ok(())
        }
    }
}

impl<T: Scalar> Default for Network<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> DynamicalSystem<T> for Network<T> {
    fn states(&self) -> &SystemStates<T> {
        &self.states
    }

    fn states_mut(&mut self) -> &mut SystemStates<T> {
        &mut self.states
    }

    fn derive(&mut self, t: T, x: &Vector<T>) {
        self.dispatch(x, |kind, x| match kind {
            Kind::Plain(system) => system.derive_current(t),
            Kind::Local(local) => {
                local.set_current_state(x);
                local.local_derive(t);
                local.clear_current_state();
            }
        });
    }

    fn observe(&mut self, t: T, x: &Vector<T>) {
        self.dispatch(x, |kind, x| match kind {
            Kind::Plain(system) => system.observe_current(t),
            Kind::Local(local) => {
                local.set_current_state(x);
                local.local_observe(t);
                local.clear_current_state();
            }
        });
    }

    fn dim_states(&self) -> usize {
        self.n_states
    }

    fn dim_outputs(&self) -> usize {
        self.n_outputs
    }

    /// Also re-binds the internal targets, so members of a nested network
    /// keep reading through the enclosing network's views.
    fn attach(&mut self, states: SystemStates<T>) -> Result<()> {
        self.states = states;
        if let Some(storage) = &self.storage {
            storage.x.bind(self.states.state_vector())?;
            storage.dx.bind(self.states.derivative_vector())?;
            storage.y.bind(self.states.output_vector())?;
        }
        Ok(())
    }
}

impl<T: Scalar> fmt::Debug for Network<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("members", &self.members.len())
            .field("states", &self.n_states)
            .field("outputs", &self.n_outputs)
            .field("finished", &self.is_finished())
            .finish()
    }
}
