//! Around hooks: a single named wrapper per operation, selected with
//! `x-specgate-around`, that can authorise, short-circuit, or decorate the
//! normal invocation.

mod core;

pub use core::{run_around, AroundHook, HookRegistry, Next};
