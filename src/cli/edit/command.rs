//! Line commands typed into `vitae edit`.

use std::path::PathBuf;

use crate::session::LeaveChoice;

pub const HELP: &str =
    ":w save  :e [path] export pdf  :r retry engine  :keep/:reload resolve conflict  :q quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Save,
    Export(Option<PathBuf>),
    Retry,
    Keep,
    Reload,
    Quit,
    Help,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(String::from("empty command"));
        };
        let arg = words.next();
        if words.next().is_some() {
            return Err(format!("too many arguments for {name}"));
        }

        let command = match (name, arg) {
            (":w" | ":save", None) => Self::Save,
            (":e" | ":export", path) => Self::Export(path.map(PathBuf::from)),
            (":r" | ":retry", None) => Self::Retry,
            (":keep", None) => Self::Keep,
            (":reload", None) => Self::Reload,
            (":q" | ":quit", None) => Self::Quit,
            (":h" | ":help" | "?", None) => Self::Help,
            (_, Some(_)) if name.starts_with(':') => {
                return Err(format!("{name} takes no argument"));
            }
            _ => return Err(format!("unknown command `{name}`")),
        };
        Ok(command)
    }
}

/// Answer to the save/discard/cancel prompt. Anything else cancels.
pub fn parse_choice(line: &str) -> LeaveChoice {
    match line.trim().to_ascii_lowercase().as_str() {
        "s" | "save" => LeaveChoice::Save,
        "d" | "discard" => LeaveChoice::Discard,
        _ => LeaveChoice::Cancel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(":w"), Ok(Command::Save));
        assert_eq!(Command::parse("  :q  "), Ok(Command::Quit));
        assert_eq!(Command::parse(":e"), Ok(Command::Export(None)));
        assert_eq!(
            Command::parse(":e out/cv.pdf"),
            Ok(Command::Export(Some(PathBuf::from("out/cv.pdf"))))
        );
        assert_eq!(Command::parse(":reload"), Ok(Command::Reload));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse(":x").is_err());
        assert!(Command::parse(":w now").is_err());
        assert!(Command::parse(":e a b").is_err());
    }

    #[test]
    fn test_parse_choice_defaults_to_cancel() {
        assert_eq!(parse_choice("S"), LeaveChoice::Save);
        assert_eq!(parse_choice("discard\n"), LeaveChoice::Discard);
        assert_eq!(parse_choice(""), LeaveChoice::Cancel);
        assert_eq!(parse_choice("maybe"), LeaveChoice::Cancel);
    }
}
