//! CLI for crm-graph.
//!
//! Subcommands:
//! - `init`: connect and apply pending schema migrations
//! - `check`: verify connectivity, schema version and (optionally) a tenant

mod check;
mod init;

use clap::{Parser, Subcommand};

/// crm-graph - multi-tenant CRM graph
#[derive(Parser)]
#[command(name = "crm-graph")]
#[command(about = "Multi-tenant CRM data access over Neo4j")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply pending schema migrations
    Init,

    /// Check connectivity and schema version
    Check {
        /// Also require this tenant to exist
        #[arg(long)]
        tenant: Option<String>,
    },
}

impl App {
    pub async fn run(self) -> color_eyre::Result<()> {
        match self.command {
            Command::Init => self.run_init().await,
            Command::Check { ref tenant } => self.run_check(tenant.as_deref()).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_with_tenant() {
        let app = App::try_parse_from(["crm-graph", "-v", "check", "--tenant", "acme"]).unwrap();
        assert!(app.verbose);
        match app.command {
            Command::Check { tenant } => assert_eq!(tenant.as_deref(), Some("acme")),
            Command::Init => panic!("expected check"),
        }
    }

    #[test]
    fn test_parse_init() {
        let app = App::try_parse_from(["crm-graph", "init"]).unwrap();
        assert!(!app.verbose);
        assert!(matches!(app.command, Command::Init));
    }
}
