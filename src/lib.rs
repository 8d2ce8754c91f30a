pub mod demo;
pub mod engine;
pub mod nn;
pub mod viz;
