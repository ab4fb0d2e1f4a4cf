pub mod cfn;
pub mod cli;
pub mod commands;
pub mod ec2;
pub mod stacks;

use std::env;

use anyhow::Result;
use aws_config::{meta::region::RegionProviderChain, SdkConfig};
use aws_types::region::Region;
pub use cli::{Cli, Commands};
use rust_embed::RustEmbed;

/// Embeds the contents of the `files/` directory into the binary
///
/// This struct contains the user-data scripts baked into generated templates
#[derive(RustEmbed)]
#[folder = "files/"]
pub struct Assets;

/// Get the configuration to authn/authz with AWS that will be used across AWS clients
///
/// The resolver never reads ambient process-global credentials on its own; the
/// config constructed here is passed down explicitly to the regional clients
pub async fn get_sdk_config(profile: Option<String>, region: Option<String>) -> Result<SdkConfig> {
  let aws_region = match region {
    Some(region) => Some(Region::new(region)),
    None => env::var("AWS_DEFAULT_REGION").ok().map(Region::new),
  };

  let region_provider = RegionProviderChain::first_try(aws_region).or_default_provider();

  let mut loader = aws_config::from_env().region(region_provider);
  if let Some(profile) = profile {
    loader = loader.profile_name(profile);
  }

  Ok(loader.load().await)
}
