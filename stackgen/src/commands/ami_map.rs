use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::ec2::{self, Ec2ImageCatalog};

/// Input arguments for `ami-map` command
#[derive(Args, Debug, Serialize, Deserialize)]
pub struct AmiMapInput {
  /// Named AWS credential profile to use
  #[arg(short, long)]
  pub profile: Option<String>,

  /// AMI name pattern, optionally ending in a wildcard
  #[arg(short, long, default_value = ec2::DEFAULT_NAME_PATTERN)]
  pub name_pattern: String,

  /// Maximum number of concurrent per-region queries
  #[arg(long, default_value_t = ec2::DEFAULT_CONCURRENCY)]
  pub concurrency: usize,
}

impl AmiMapInput {
  /// Resolve the map and print it as JSON on stdout
  pub async fn print(&self) -> Result<()> {
    let config = crate::get_sdk_config(self.profile.clone(), None).await?;
    let catalog = Ec2ImageCatalog::new(config);
    let map = ec2::create_ami_region_map(&catalog, &self.name_pattern, self.concurrency).await?;

    println!("{}", serde_json::to_string_pretty(&map)?);

    Ok(())
  }
}
