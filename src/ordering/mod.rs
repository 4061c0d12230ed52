// Copyright 2025 Cowboy AI, LLC.

//! Ordering algorithms used during composition

pub mod linear_extension;
pub mod linearizer;

pub use linear_extension::{linear_extension, CyclicOrder};
pub use linearizer::{Linearizer, PrecedenceNode};
