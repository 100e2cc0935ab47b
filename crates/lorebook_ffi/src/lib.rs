//! Flutter-facing bridge crate for the Lorebook core.

pub mod api;
