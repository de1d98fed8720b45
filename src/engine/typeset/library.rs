//! Global shared Typst standard library.
//!
//! Built once on first access and wrapped in `LazyHash` so comemo can cache
//! across compiles. Every `SourceWorld` hands out the same instance.

use std::sync::LazyLock;

use typst::utils::LazyHash;
use typst::{Library, LibraryExt};

pub static GLOBAL_LIBRARY: LazyLock<LazyHash<Library>> =
    LazyLock::new(|| LazyHash::new(Library::builder().build()));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_has_global_scope() {
        let scope = GLOBAL_LIBRARY.global.scope();
        assert!(scope.get("text").is_some(), "Should have text function");
        assert!(scope.get("page").is_some(), "Should have page function");
    }

    #[test]
    fn test_library_is_shared() {
        assert!(std::ptr::eq(&*GLOBAL_LIBRARY, &*GLOBAL_LIBRARY));
    }
}
