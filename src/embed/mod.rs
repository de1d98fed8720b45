//! Embedded static resources for Vitae.
//!
//! # Usage
//!
//! ```ignore
//! use embed::typst::{RESUME_TYP, ResumeVars};
//!
//! let source = RESUME_TYP.render(&ResumeVars { title: "CV", name: "Alice", email: "a@b.c" });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod typst {
    use super::{Template, TemplateVars};

    /// Variables for the starter resume.
    pub struct ResumeVars<'a> {
        pub title: &'a str,
        pub name: &'a str,
        pub email: &'a str,
    }

    impl TemplateVars for ResumeVars<'_> {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__TITLE__", &escape(self.title))
                .replace("__NAME__", &escape(self.name))
                .replace("__EMAIL__", &escape(self.email))
        }
    }

    /// Escape for use inside a typst string literal.
    fn escape(value: &str) -> String {
        value.replace('\\', "\\\\").replace('"', "\\\"")
    }

    /// Starter resume for `vitae new`.
    pub const RESUME_TYP: Template<ResumeVars> =
        Template::new(include_str!("typst/resume.typ"));

}
