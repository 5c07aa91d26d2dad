#![allow(clippy::should_implement_trait)]
pub mod error;
pub mod normalize;
pub mod types;
