// ABOUTME: Root module for dining - concurrent agents sharing a ring of resources.
// ABOUTME: Re-exports all public types from submodules.

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod hook;
pub mod observer;
pub mod prelude;
pub mod resource;
pub mod vitality;

pub use error::DiningError;
