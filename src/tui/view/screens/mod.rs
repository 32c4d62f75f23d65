mod library_list;
mod removing;

pub use library_list::{render_library_list, LibraryListData};
pub use removing::render_removing;
