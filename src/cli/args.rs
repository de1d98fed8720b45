//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::store::Role;

/// Vitae resume editor CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: vitae.toml)
    #[arg(short = 'C', long, global = true, default_value = "vitae.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Print scheduler and save internals
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Act as this user id (overrides [user].id)
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Email of the acting user (overrides [user].email)
    #[arg(long, global = true)]
    pub email: Option<String>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a project from the resume template
    #[command(visible_alias = "n")]
    New {
        /// Project title
        title: String,

        /// Project type recorded with the project
        #[arg(long, default_value = "resume")]
        kind: String,
    },

    /// Open a project in an editing session
    #[command(visible_alias = "e")]
    Edit {
        /// Project id
        project: String,
    },

    /// Compile a project and write its PDF
    #[command(visible_alias = "x")]
    Export {
        /// Project id
        project: String,

        /// Output file (default: <project>.pdf)
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Grant another user access to a project
    Share {
        /// Project id
        project: String,

        /// User id to share with
        user_id: String,

        /// Allow editing (default: read-only)
        #[arg(long)]
        edit: bool,
    },

    /// Set the role override for an email (member, cxo)
    Role { email: String, role: Role },

    /// Print a signed URL for a project's stored PDF
    Link {
        /// Project id
        project: String,

        /// Lifetime in seconds (default: [store].signed_url_ttl_secs)
        #[arg(long)]
        ttl: Option<u64>,

        /// Check an existing URL instead of creating one
        #[arg(long, value_name = "URL", conflicts_with = "ttl")]
        verify: Option<String>,
    },

    /// Delete a project and its files (owner only)
    Rm {
        /// Project id
        project: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_with_global_flags() {
        let cli = Cli::parse_from(["vitae", "edit", "abc123", "--user", "alice", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.user.as_deref(), Some("alice"));
        assert_eq!(cli.config, PathBuf::from("vitae.toml"));
        assert!(matches!(cli.command, Commands::Edit { ref project } if project == "abc123"));
    }

    #[test]
    fn test_role_parses() {
        let cli = Cli::parse_from(["vitae", "role", "ceo@example.com", "cxo"]);
        assert!(matches!(cli.command, Commands::Role { role: Role::Cxo, .. }));
    }

    #[test]
    fn test_link_ttl_conflicts_with_verify() {
        let result = Cli::try_parse_from(["vitae", "link", "p", "--ttl", "5", "--verify", "u"]);
        assert!(result.is_err());
    }
}
