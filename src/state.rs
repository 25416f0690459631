//! State management module - live V49 configuration
//!
//! This module provides the single owner of the controller configuration.
//! The editor and any other observer subscribe to it instead of keeping
//! their own copy.

mod store;

pub use store::{StateStore, Subscription, SubscriptionId};
