pub mod cli;
pub mod player;
