pub mod txt_loader;

pub use txt_loader::load_items_from_folder;
