pub mod environment;
pub mod mortality;
pub mod reproduction;
pub mod transition;
