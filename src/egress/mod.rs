//! Egress Publisher (spec.md §4.6): fire-and-forget event emission with
//! completion-callback logging, shared by the matching coordinator and
//! the dead-letter handler so both egress paths log failures the same
//! way.

pub mod publisher;

pub use publisher::EgressPublisher;
