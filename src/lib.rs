pub mod basic;
pub mod cards;
pub mod cli;
pub mod display;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod evolve;
pub mod genome;
pub mod hand;
pub mod persist;
