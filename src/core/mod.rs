pub mod levels;
pub mod orders;
pub mod retest;
