mod cache;

pub use cache::{Atom, intern_text, resolve_text, text_count};
