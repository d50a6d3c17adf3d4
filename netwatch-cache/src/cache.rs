use lazy_static::lazy_static;
use std::sync::RwLock;
pub use string_cache::DefaultAtom as Atom;

lazy_static! {
    static ref PANEL_TEXT: RwLock<Vec<Atom>> = RwLock::new(Vec::new());
}

/// Interns a panel string and returns its stable id.
///
/// Ids are process-wide and never reused, so the renderer can key its glyph
/// pixmaps on them across frames and resizes.
pub fn intern_text(s: &str) -> usize {
    let atom = Atom::from(s);
    if let Some(idx) = read_table().iter().position(|a| *a == atom) {
        return idx;
    }
    let mut table = PANEL_TEXT.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    // another caller may have inserted it between the two locks
    match table.iter().position(|a| *a == atom) {
        Some(idx) => idx,
        None => {
            table.push(atom);
            table.len() - 1
        }
    }
}

/// Current count of unique texts
pub fn text_count() -> usize {
    read_table().len()
}

pub fn resolve_text(id: usize) -> Option<Atom> {
    read_table().get(id).cloned()
}

fn read_table() -> std::sync::RwLockReadGuard<'static, Vec<Atom>> {
    PANEL_TEXT.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_maps_to_same_id() {
        let a = intern_text("Protocol: UDP");
        let b = intern_text("Protocol: UDP");
        assert_eq!(a, b);
        assert_eq!(resolve_text(a).as_deref(), Some("Protocol: UDP"));
    }

    #[test]
    fn distinct_texts_get_distinct_ids() {
        let a = intern_text("Country: FI");
        let b = intern_text("Country: SE");
        assert_ne!(a, b);
        assert!(text_count() >= 2);
        assert!(resolve_text(usize::MAX).is_none());
    }
}
