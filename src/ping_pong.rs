//! Two-slot arena with a single "readable" bit.
//!
//! Simulation state lives in two interchangeable slots. One slot is readable
//! (the source of truth for rendering and for the next step's reads), the
//! other is writable (the destination of the next step). [`PingPong::flip`]
//! swaps the roles; nothing else can.

/// Identifies one of the two slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    /// Array index of this slot.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }

    /// The opposite slot.
    #[inline]
    pub fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

/// A pair of values where exactly one is readable and the other writable.
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    slots: [T; 2],
    readable: Slot,
}

impl<T> PingPong<T> {
    /// Create a pair with `a` readable and `b` writable.
    pub fn new(a: T, b: T) -> Self {
        Self {
            slots: [a, b],
            readable: Slot::A,
        }
    }

    /// Build both slots from a constructor that receives the slot being built.
    pub fn from_fn(mut f: impl FnMut(Slot) -> T) -> Self {
        Self::new(f(Slot::A), f(Slot::B))
    }

    /// The slot currently holding the source of truth.
    #[inline]
    pub fn readable_slot(&self) -> Slot {
        self.readable
    }

    /// The slot the next step writes into.
    #[inline]
    pub fn writable_slot(&self) -> Slot {
        self.readable.other()
    }

    /// The readable value.
    #[inline]
    pub fn readable(&self) -> &T {
        &self.slots[self.readable.index()]
    }

    /// The writable value, read-only view.
    #[inline]
    pub fn writable(&self) -> &T {
        &self.slots[self.writable_slot().index()]
    }

    /// Access a slot by name regardless of its current role.
    #[inline]
    pub fn slot(&self, slot: Slot) -> &T {
        &self.slots[slot.index()]
    }

    /// Borrow the readable value immutably and the writable value mutably.
    ///
    /// The two borrows never alias, so a step can read one slot while
    /// writing the other.
    pub fn split_mut(&mut self) -> (&T, &mut T) {
        let [a, b] = &mut self.slots;
        match self.readable {
            Slot::A => (&*a, b),
            Slot::B => (&*b, a),
        }
    }

    /// Swap readable and writable roles.
    #[inline]
    pub fn flip(&mut self) {
        self.readable = self.readable.other();
    }
}
