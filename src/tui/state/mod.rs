pub mod app_state;
pub mod modes;
pub mod removal;

pub use app_state::App;
pub use modes::{AppMode, SortMode};
pub use removal::{RemovalProgress, RemovalResultDisplay};
