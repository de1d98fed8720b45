//! Configuration section definitions.
//!
//! Each module corresponds to a section in `vitae.toml`:
//!
//! | Module    | TOML Section | Purpose                                  |
//! |-----------|--------------|------------------------------------------|
//! | `session` | `[session]`  | Debounce and autosave timing             |
//! | `engine`  | `[engine]`   | Typst engine startup and fonts           |
//! | `store`   | `[store]`    | Filesystem store location, signed URLs   |
//! | `preview` | `[preview]`  | Where `vitae edit` writes preview pages  |
//! | `user`    | `[user]`     | Identity used by the CLI                 |

mod engine;
mod preview;
mod session;
mod store;
mod user;

pub use engine::EngineConfig;
pub use preview::PreviewConfig;
pub use session::SessionConfig;
pub use store::StoreConfig;
pub use user::UserConfig;
