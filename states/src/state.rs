use std::any::Any;

/// A primitive cell owned by a [`StateCtx`](crate::StateCtx).
///
/// Cells are keyed by their concrete type, so every cell of a screen is its own
/// type (usually a newtype). Most implementations come from [`impl_state!`].
pub trait State: Any + Send {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Copy handed to commands through [`CommandSnapshot`](crate::CommandSnapshot).
    ///
    /// Cells returning `None` are invisible to commands.
    fn snapshot(&self) -> Option<Box<dyn Any + Send>> {
        None
    }
}

/// Implements [`State`] for `Clone` types, including them in command snapshots.
#[macro_export]
macro_rules! impl_state {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::State for $ty {
                fn as_any(&self) -> &dyn ::std::any::Any {
                    self
                }

                fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                    self
                }

                fn snapshot(&self) -> ::std::option::Option<::std::boxed::Box<dyn ::std::any::Any + Send>> {
                    ::std::option::Option::Some(::std::boxed::Box::new(::std::clone::Clone::clone(self)))
                }
            }
        )+
    };
}
