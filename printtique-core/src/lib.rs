pub mod assets;
pub mod blend;
pub mod catalog;
pub mod color;
pub mod commands;
pub mod id;
pub mod io;
pub mod projection;
pub mod queue;
pub mod session;
pub mod state;

pub use id::StudioID;
