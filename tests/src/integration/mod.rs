//! Cross-crate integration tests.

mod distribution;
mod end_to_end;
