pub mod frame;
pub mod roster;
pub mod synthetic;
