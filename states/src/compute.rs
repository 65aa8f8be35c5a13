use std::any::TypeId;

use crate::{Dep, State};

/// A derived cell.
///
/// `deps()` names every upstream cell (states or other computes). Whenever one
/// of them changes the context calls `compute()` again, in topological order,
/// with a read-only view of the whole current snapshot.
pub trait Compute: State {
    fn deps(&self) -> Vec<TypeId>;

    fn compute(&mut self, deps: Dep<'_>);
}

/// Shorthand for building the `deps()` list.
#[macro_export]
macro_rules! deps {
    ($($ty:ty),* $(,)?) => {
        vec![$(::std::any::TypeId::of::<$ty>()),*]
    };
}
