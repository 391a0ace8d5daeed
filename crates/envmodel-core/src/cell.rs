// Resource state cells
//
// One cell per tracked resource instance. Cells are created at rest the
// first time a transition touches them and are mutated only by the
// transition operations on `ModelState`.

use std::fmt;

use serde::Serialize;

/// How acquisitions of a resource class accumulate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Discipline {
    /// Two-state resource: `Free` or `Held`
    Exclusive,
    /// Counter of outstanding acquisitions, optionally bounded
    Stacking { limit: Option<u32> },
    /// Counter whose limit is asserted but not enforced: acquisitions at or
    /// past `limit` are reported and still counted.
    Counting { limit: u32 },
}

/// What releasing through a null handle means for a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NullRelease {
    /// The modeled API ignores null (`kfree(NULL)`, `usb_free_urb(NULL)`)
    NoOp,
    /// Passing null is itself a contract violation
    Violation,
}

/// Static description of a family of tracked resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceClass {
    pub name: &'static str,
    pub discipline: Discipline,
    pub null_release: NullRelease,
}

impl ResourceClass {
    pub const fn exclusive(name: &'static str) -> Self {
        Self {
            name,
            discipline: Discipline::Exclusive,
            null_release: NullRelease::Violation,
        }
    }

    pub const fn stacking(name: &'static str) -> Self {
        Self {
            name,
            discipline: Discipline::Stacking { limit: None },
            null_release: NullRelease::Violation,
        }
    }

    pub const fn counting(name: &'static str, limit: u32) -> Self {
        Self {
            name,
            discipline: Discipline::Counting { limit },
            null_release: NullRelease::Violation,
        }
    }

    /// Bound a stacking class; acquisitions beyond `limit` are violations.
    pub const fn with_limit(self, limit: u32) -> Self {
        Self {
            discipline: Discipline::Stacking { limit: Some(limit) },
            ..self
        }
    }

    pub const fn allowing_null_release(self) -> Self {
        Self {
            null_release: NullRelease::NoOp,
            ..self
        }
    }

    /// Identity of one instance (or the single global cell when `instance` is `None`).
    pub fn id(&self, instance: Option<u64>) -> ResourceId {
        ResourceId {
            class: self.name,
            instance,
        }
    }

    pub fn rest_state(&self) -> ResourceState {
        ResourceState::rest(self.discipline)
    }
}

/// Identity of a tracked resource cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResourceId {
    pub class: &'static str,
    pub instance: Option<u64>,
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance {
            Some(instance) => write!(f, "{}@{:#x}", self.class, instance),
            None => write!(f, "{}", self.class),
        }
    }
}

/// Current state of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceState {
    Free,
    Held,
    Count(u32),
}

impl ResourceState {
    pub fn rest(discipline: Discipline) -> Self {
        match discipline {
            Discipline::Exclusive => ResourceState::Free,
            Discipline::Stacking { .. } | Discipline::Counting { .. } => ResourceState::Count(0),
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, ResourceState::Free | ResourceState::Count(0))
    }

    /// Outstanding acquisitions: 0 or 1 for exclusive cells.
    pub fn outstanding(&self) -> u32 {
        match self {
            ResourceState::Free => 0,
            ResourceState::Held => 1,
            ResourceState::Count(count) => *count,
        }
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceState::Free => write!(f, "free"),
            ResourceState::Held => write!(f, "held"),
            ResourceState::Count(count) => write!(f, "count({})", count),
        }
    }
}

/// Why a cell refused a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellFault {
    AlreadyHeld,
    LimitReached(u32),
    NotHeld,
}

/// Mutable state of one tracked resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCell {
    id: ResourceId,
    discipline: Discipline,
    state: ResourceState,
}

impl ResourceCell {
    pub(crate) fn new(id: ResourceId, discipline: Discipline) -> Self {
        Self {
            id,
            discipline,
            state: ResourceState::rest(discipline),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    pub fn read(&self) -> ResourceState {
        self.state
    }

    pub fn is_rest(&self) -> bool {
        self.state.is_rest()
    }

    pub(crate) fn can_acquire(&self) -> Result<(), CellFault> {
        match (self.discipline, self.state) {
            (Discipline::Exclusive, ResourceState::Held) => Err(CellFault::AlreadyHeld),
            (Discipline::Stacking { limit: Some(limit) }, ResourceState::Count(count))
            | (Discipline::Counting { limit }, ResourceState::Count(count))
                if count >= limit =>
            {
                Err(CellFault::LimitReached(limit))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn can_release(&self) -> Result<(), CellFault> {
        if self.state.is_rest() {
            Err(CellFault::NotHeld)
        } else {
            Ok(())
        }
    }

    /// Record one more acquisition. A held exclusive cell stays held and a
    /// bounded stacking counter saturates at its limit; a counting cell
    /// keeps going.
    pub(crate) fn advance(&mut self) {
        self.state = match (self.discipline, self.state) {
            (Discipline::Exclusive, _) => ResourceState::Held,
            (Discipline::Stacking { limit }, ResourceState::Count(count)) => {
                let next = count.saturating_add(1);
                ResourceState::Count(limit.map_or(next, |limit| next.min(limit)))
            }
            (Discipline::Counting { .. }, ResourceState::Count(count)) => {
                ResourceState::Count(count.saturating_add(1))
            }
            (Discipline::Stacking { .. } | Discipline::Counting { .. }, _) => ResourceState::Count(1),
        };
    }

    /// Record one release; never goes below rest.
    pub(crate) fn retreat(&mut self) {
        self.state = match self.state {
            ResourceState::Held | ResourceState::Free => ResourceState::Free,
            ResourceState::Count(count) => ResourceState::Count(count.saturating_sub(1)),
        };
    }
}
