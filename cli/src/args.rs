use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use url::Url;
use vouch_types::{ReferenceTypeRequest, RouteError};

#[derive(Parser, Debug)]
#[command(name = "vouch")]
#[command(about = "Check whether a reference can be left for a user")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ~/.vouch/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL (overrides config and VOUCH_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<Url>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate the leave-reference page for a route
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Page path, e.g. /leave-reference/friend/5 or /leave-reference/hosted/5/42
    #[arg(conflicts_with_all = ["reference_type", "user", "host_request"])]
    pub path: Option<String>,

    /// Reference type route segment (friend, surfed, hosted)
    #[arg(long = "type", requires = "user")]
    pub reference_type: Option<String>,

    /// Subject user id
    #[arg(long, requires = "reference_type")]
    pub user: Option<String>,

    /// Host request id the reference is left for
    #[arg(long, requires = "user")]
    pub host_request: Option<String>,

    /// Print the page after every state change, not just the final one
    #[arg(long)]
    pub progress: bool,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum RequestArgsError {
    #[error("give a page path or both --type and --user")]
    Missing,
    #[error(transparent)]
    Route(#[from] RouteError),
}

impl CheckArgs {
    pub fn request(&self) -> Result<ReferenceTypeRequest, RequestArgsError> {
        if let Some(path) = &self.path {
            return ReferenceTypeRequest::parse_path(path).map_err(Into::into);
        }
        match (&self.reference_type, &self.user) {
            (Some(reference_type), Some(user)) => ReferenceTypeRequest::from_segments(
                reference_type,
                user,
                self.host_request.as_deref(),
            )
            .map_err(Into::into),
            _ => Err(RequestArgsError::Missing),
        }
    }
}
