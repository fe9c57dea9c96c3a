pub mod book;
pub mod cli;
pub mod comms;
pub mod config;
pub mod decision;
pub mod encoding;
pub mod error;
pub mod model;
pub mod prelude;
pub mod rules;
pub mod utils;

pub mod consts {
    /// Moves the encoder keeps, most recent last.
    pub const DEFAULT_WINDOW: usize = 64;
}
