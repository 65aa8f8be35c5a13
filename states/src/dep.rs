use std::{
    any::{Any, TypeId, type_name},
    collections::BTreeMap,
};

use crate::{Compute, State, StateSyncStatus};

pub(crate) enum Slot {
    State(Box<dyn State>),
    Compute(Box<dyn Compute>),
}

impl Slot {
    pub(crate) fn as_any(&self) -> &dyn Any {
        match self {
            Self::State(state) => state.as_any(),
            Self::Compute(compute) => compute.as_any(),
        }
    }

    pub(crate) fn as_any_mut(&mut self) -> &mut dyn Any {
        match self {
            Self::State(state) => state.as_any_mut(),
            Self::Compute(compute) => compute.as_any_mut(),
        }
    }

    pub(crate) fn snapshot(&self) -> Option<Box<dyn Any + Send>> {
        match self {
            Self::State(state) => state.snapshot(),
            Self::Compute(compute) => compute.snapshot(),
        }
    }
}

pub(crate) struct Cell {
    pub(crate) name: &'static str,
    pub(crate) slot: Slot,
    pub(crate) status: StateSyncStatus,
}

impl Cell {
    pub(crate) fn state<T: State>(state: T) -> Self {
        Self {
            name: type_name::<T>(),
            slot: Slot::State(Box::new(state)),
            status: StateSyncStatus::Clean,
        }
    }

    pub(crate) fn compute<T: Compute>(compute: T) -> Self {
        Self {
            name: type_name::<T>(),
            slot: Slot::Compute(Box::new(compute)),
            status: StateSyncStatus::Init,
        }
    }
}

/// Read-only view of every other cell, handed to [`Compute::compute`].
pub struct Dep<'a> {
    cells: &'a BTreeMap<TypeId, Cell>,
}

impl<'a> Dep<'a> {
    pub(crate) fn new(cells: &'a BTreeMap<TypeId, Cell>) -> Self {
        Self { cells }
    }

    pub fn get<T: Any>(&self) -> Option<&'a T> {
        self.cells
            .get(&TypeId::of::<T>())
            .and_then(|cell| cell.slot.as_any().downcast_ref::<T>())
    }

    /// # Panics
    /// Panics if `T` was never registered with the context.
    pub fn state<T: State>(&self) -> &'a T {
        self.get::<T>()
            .unwrap_or_else(|| panic!("State {} is not registered", type_name::<T>()))
    }

    /// # Panics
    /// Panics if `T` was never recorded with the context.
    pub fn compute<T: Compute>(&self) -> &'a T {
        self.get::<T>()
            .unwrap_or_else(|| panic!("Compute {} is not recorded", type_name::<T>()))
    }
}
