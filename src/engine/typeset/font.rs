//! Font discovery.
//!
//! The fonts bundled with `typst-assets` are always available so a resume
//! renders on machines without any system fonts. Extra directories are
//! walked recursively.

use std::path::Path;

use jwalk::WalkDir;
use typst::foundations::Bytes;
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;

use crate::debug;

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc", "otc"];

/// Loaded fonts plus the book typst uses to pick among them.
pub struct FontSet {
    pub book: LazyHash<FontBook>,
    pub fonts: Vec<Font>,
}

impl FontSet {
    pub fn len(&self) -> usize {
        self.fonts.len()
    }
}

/// Load embedded fonts and every font file under `dirs`.
///
/// Unreadable files are skipped. Fails only if no font at all is available.
pub fn load_fonts(dirs: &[impl AsRef<Path>]) -> Result<FontSet, String> {
    let mut fonts: Vec<Font> = typst_assets::fonts()
        .flat_map(|data| Font::iter(Bytes::new(data)))
        .collect();

    for dir in dirs {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            debug!("engine"; "font dir {} does not exist, skipping", dir.display());
            continue;
        }
        for entry in WalkDir::new(dir).into_iter().flatten() {
            let path = entry.path();
            let is_font = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if !is_font {
                continue;
            }
            match std::fs::read(&path) {
                Ok(data) => fonts.extend(Font::iter(Bytes::new(data))),
                Err(e) => debug!("engine"; "skipping font {}: {}", path.display(), e),
            }
        }
    }

    if fonts.is_empty() {
        return Err("no fonts available".to_string());
    }

    let book = LazyHash::new(FontBook::from_fonts(&fonts));
    Ok(FontSet { book, fonts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_embedded_fonts_always_load() {
        let set = load_fonts(&[PathBuf::from("/definitely/not/here")]).unwrap();
        assert!(set.len() > 0);
    }
}
