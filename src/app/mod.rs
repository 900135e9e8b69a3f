pub mod cli;
pub mod config;
pub mod events;
pub mod keys;
pub mod session;
pub mod watch;
pub mod window;

pub use events::AppEvent;
pub use session::Session;
pub use window::{WindowKind, WindowName, WindowState};
