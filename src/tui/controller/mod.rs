pub mod common;
pub mod library_list;
pub mod removing;

pub use common::{handle_confirm_key, handle_help_key, handle_result_key};
pub use library_list::handle_library_list_key;
pub use removing::handle_removing_key;
