use std::{collections::BTreeMap, fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{
  ec2::{self, Ec2ImageCatalog},
  stacks,
};

/// Input arguments for the template generation commands
#[derive(Args, Debug, Serialize, Deserialize)]
pub struct GenerateInput {
  /// Named AWS credential profile to use
  #[arg(short, long)]
  pub profile: Option<String>,

  /// AMI name pattern, optionally ending in a wildcard
  #[arg(short, long, default_value = ec2::DEFAULT_NAME_PATTERN)]
  pub name_pattern: String,

  /// Maximum number of concurrent per-region queries
  #[arg(long, default_value_t = ec2::DEFAULT_CONCURRENCY)]
  pub concurrency: usize,

  /// Path to a previously resolved region -> AMI map (JSON, as printed by `ami-map`);
  /// skips querying EC2
  #[arg(long)]
  pub ami_map: Option<PathBuf>,
}

impl GenerateInput {
  async fn region_map(&self) -> Result<BTreeMap<String, String>> {
    match &self.ami_map {
      Some(path) => {
        let contents = fs::read_to_string(path).with_context(|| format!("failed to read AMI map {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("failed to parse AMI map {}", path.display()))
      }
      None => {
        let config = crate::get_sdk_config(self.profile.clone(), None).await?;
        let catalog = Ec2ImageCatalog::new(config);
        ec2::create_ami_region_map(&catalog, &self.name_pattern, self.concurrency).await
      }
    }
  }

  /// Generate the dev stack template and print it as YAML on stdout
  pub async fn dev_stack(&self) -> Result<()> {
    let map = self.region_map().await?;
    let template = stacks::dev_stack(&map)?;

    println!("{}", template.to_yaml()?);

    Ok(())
  }

  /// Generate the Jenkins master template and print it as YAML on stdout
  pub async fn jenkins(&self) -> Result<()> {
    let map = self.region_map().await?;
    let template = stacks::jenkins(&map)?;

    println!("{}", template.to_yaml()?);

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  fn input(ami_map: Option<PathBuf>) -> GenerateInput {
    GenerateInput {
      profile: None,
      name_pattern: ec2::DEFAULT_NAME_PATTERN.to_owned(),
      concurrency: ec2::DEFAULT_CONCURRENCY,
      ami_map,
    }
  }

  #[tokio::test]
  async fn it_loads_the_map_from_a_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"us-east-1": "ami-2", "eu-west-1": "ami-3"}}"#).unwrap();

    let map = input(Some(file.path().to_path_buf())).region_map().await.unwrap();
    assert_eq!(map["us-east-1"], "ami-2");
    assert_eq!(map["eu-west-1"], "ami-3");
  }

  #[tokio::test]
  async fn it_fails_on_a_missing_map_file() {
    let result = input(Some(PathBuf::from("/nonexistent/ami-map.json"))).region_map().await;
    assert!(result.unwrap_err().to_string().contains("failed to read AMI map"));
  }
}
