pub mod navigation;
pub mod selection;
pub mod sorting;

pub use navigation::{clamp_selection, navigate_down, navigate_up};
pub use selection::{deselect_all, select_all, toggle_selection};
pub use sorting::sorted_indices;
