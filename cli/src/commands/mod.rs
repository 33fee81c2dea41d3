pub mod clear;
pub mod cli;
pub mod plan;
pub mod run;
pub mod status;
