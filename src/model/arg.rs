use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

use crate::integration::types::{ContactOperation, IntegrationType};

/// Console for exercising OAuth integrations against the integrations backend
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Backend origin, overrides `backendUrl` from the config file
    #[arg(long)]
    pub backend_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the OAuth handshake for an integration
    Connect {
        #[command(flatten)]
        target: TargetArgs,

        /// Print the authorization URL instead of launching the browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Load integration data with the stored credentials
    Load {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// HubSpot contact operations
    Contact {
        #[arg(value_enum)]
        operation: ContactOperationArg,

        #[command(flatten)]
        identity: IdentityArgs,

        /// Contact ID (get, update, delete)
        #[arg(long)]
        contact_id: Option<String>,

        /// Contact properties as JSON (create, update)
        /// Example: {"email":"test@hubspot.com","firstname":"Test","lastname":"User"}
        #[arg(long)]
        properties: Option<String>,
    },

    /// Serve the console API holding one in-memory session
    Serve {
        /// Bind host, overrides `host` from the config file
        #[arg(long)]
        host: Option<String>,

        /// Bind port, overrides `port` from the config file
        #[arg(long)]
        port: Option<u16>,

        /// Do not launch the browser on connect; clients open the returned URL
        #[arg(long)]
        no_browser: bool,
    },
}

/// User and organization, defaulting to the configured test identity
#[derive(ClapArgs, Debug, Clone)]
pub struct IdentityArgs {
    /// User identifier (default: `defaultUser` from the config file)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Organization identifier (default: `defaultOrg` from the config file)
    #[arg(short, long)]
    pub org: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct TargetArgs {
    #[command(flatten)]
    pub identity: IdentityArgs,

    /// Integration type
    #[arg(short, long, value_enum)]
    pub integration: IntegrationArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationArg {
    Notion,
    Airtable,
    Hubspot,
}

impl From<IntegrationArg> for IntegrationType {
    fn from(arg: IntegrationArg) -> Self {
        match arg {
            IntegrationArg::Notion => IntegrationType::Notion,
            IntegrationArg::Airtable => IntegrationType::Airtable,
            IntegrationArg::Hubspot => IntegrationType::Hubspot,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOperationArg {
    Get,
    Create,
    Update,
    Delete,
}

impl From<ContactOperationArg> for ContactOperation {
    fn from(arg: ContactOperationArg) -> Self {
        match arg {
            ContactOperationArg::Get => ContactOperation::Get,
            ContactOperationArg::Create => ContactOperation::Create,
            ContactOperationArg::Update => ContactOperation::Update,
            ContactOperationArg::Delete => ContactOperation::Delete,
        }
    }
}
