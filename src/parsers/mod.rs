pub mod forms;

pub use forms::{classify_input, is_protected, parse_forms};
