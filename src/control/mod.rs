pub mod arming;
pub mod cascade;
pub mod controller;
pub mod failsafe;
pub mod pid;
pub mod setpoint;
