pub mod components;
pub mod screens;

pub use screens::{render_library_list, render_removing, LibraryListData};
