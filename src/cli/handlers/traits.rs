//! Handler traits and common patterns
//!
//! Every command handler borrows the shared [`CliContext`]; the factory trait
//! and macro below keep their construction uniform.

use super::super::CliContext;

/// Trait for handlers that can be created from a CLI context
pub trait HandlerFactory<'a> {
    type Handler;

    /// Create a new handler instance from the given context
    fn create(context: &'a CliContext) -> Self::Handler;
}

/// Implements [`HandlerFactory`] for a handler with a `new(&CliContext)` constructor
macro_rules! impl_context_handler {
    ($handler:ty) => {
        impl<'a> crate::cli::handlers::traits::HandlerFactory<'a> for $handler {
            type Handler = Self;

            fn create(context: &'a crate::cli::CliContext) -> Self::Handler {
                Self::new(context)
            }
        }
    };
}

pub(crate) use impl_context_handler;

/// Builds handlers bound to one context
pub struct HandlerBuilder<'a> {
    context: &'a CliContext,
}

impl<'a> HandlerBuilder<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    pub fn create<F>(&self) -> F::Handler
    where
        F: HandlerFactory<'a>,
    {
        F::create(self.context)
    }
}
