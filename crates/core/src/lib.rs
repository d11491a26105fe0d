pub mod controller;
pub mod instructions;
pub mod mission;
pub mod ports;
pub mod result;
