// ABOUTME: Resource module - the binary exclusion primitive agents compete for.
// ABOUTME: One resource sits between every pair of adjacent agents in the ring.

mod resource;

pub use resource::{Claim, HolderId, Resource};

#[cfg(test)]
mod resource_test;
