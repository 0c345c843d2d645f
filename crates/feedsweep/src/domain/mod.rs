//! Tree model, selectors, and sweep outcomes.

pub mod dom;
pub mod errors;
pub mod model;
pub mod mutation;
pub mod selector;
