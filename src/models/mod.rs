pub mod batch_state;
pub mod item;
pub mod loaders;
pub mod parser;

pub use batch_state::{BatchState, BatchSummary, HaltReason, ItemOutcome};
pub use item::{items_from, Item, ParsedContent};
pub use loaders::load_items_from_folder;
pub use parser::{ChapterParser, ContentParser};
