use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ec2::{
  config::{self, retry::RetryConfig},
  types::Filter,
  Client,
};
use aws_types::region::Region;
use chrono::{DateTime, FixedOffset};
use futures::{stream, StreamExt};
use tracing::{debug, warn};

/// Ubuntu 18.04 LTS (bionic) image name pattern
pub const DEFAULT_NAME_PATTERN: &str = "ubuntu/images/hvm-ssd/ubuntu-bionic-18.04-amd64*";

/// Maximum number of per-region image queries in flight at once
pub const DEFAULT_CONCURRENCY: usize = 15;

const MAX_API_RETRIES: u32 = 3;

/// One candidate image returned by a regional catalog query
///
/// The creation date is parsed up front so that latest-selection compares
/// timestamps, not strings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageCandidate {
  /// The image identifier - unique within a region, not globally
  pub id: String,

  /// The image name the pattern was matched against
  pub name: String,

  /// When the image was created
  pub created: DateTime<FixedOffset>,
}

/// The two provider operations the resolver needs: list regions and query one
/// region's image catalog
///
/// Trait wrapper to support testing
#[async_trait]
pub trait ImageCatalog {
  /// Enumerate all regions available to the session
  async fn regions(&self) -> Result<Vec<String>>;

  /// List the images in `region` whose name matches `name_pattern`
  ///
  /// The pattern is passed through to the provider's `name` filter, so it
  /// follows `describe-images` glob semantics (e.g. a trailing `*`)
  async fn images(&self, region: &str, name_pattern: &str) -> Result<Vec<ImageCandidate>>;
}

/// `ImageCatalog` backed by the EC2 API
///
/// Each region is a separate endpoint with its own catalog, so every query
/// gets a client scoped to that region, all sharing one caller-provided config
pub struct Ec2ImageCatalog {
  config: SdkConfig,
}

impl Ec2ImageCatalog {
  pub fn new(config: SdkConfig) -> Self {
    Self { config }
  }

  fn client(&self, region: Option<&str>) -> Client {
    let mut builder = config::Builder::from(&self.config).retry_config(RetryConfig::standard().with_max_attempts(MAX_API_RETRIES));
    if let Some(region) = region {
      builder = builder.region(Region::new(region.to_owned()));
    }

    Client::from_conf(builder.build())
  }
}

#[async_trait]
impl ImageCatalog for Ec2ImageCatalog {
  async fn regions(&self) -> Result<Vec<String>> {
    let response = self
      .client(None)
      .describe_regions()
      .send()
      .await
      .context("failed to enumerate regions")?;

    let regions = response
      .regions()
      .unwrap_or_default()
      .iter()
      .filter_map(|region| region.region_name().map(ToOwned::to_owned))
      .collect();

    Ok(regions)
  }

  async fn images(&self, region: &str, name_pattern: &str) -> Result<Vec<ImageCandidate>> {
    let response = self
      .client(Some(region))
      .describe_images()
      .filters(Filter::builder().name("name").values(name_pattern).build())
      .send()
      .await
      .with_context(|| format!("failed to query images in {region}"))?;

    let candidates = response
      .images()
      .unwrap_or_default()
      .iter()
      .filter_map(|image| {
        let id = image.image_id()?.to_owned();
        let name = image.name()?.to_owned();
        let created = match image.creation_date().map(DateTime::parse_from_rfc3339) {
          Some(Ok(created)) => created,
          _ => {
            warn!("skipping {id} in {region}: missing or malformed creation date");
            return None;
          }
        };

        Some(ImageCandidate { id, name, created })
      })
      .collect();

    Ok(candidates)
  }
}

/// Select the most recently created image
///
/// An explicit max-fold with strict `>`: ties keep the earliest-listed record,
/// and an empty catalog is `None` rather than a panic
pub fn latest_image(candidates: &[ImageCandidate]) -> Option<&ImageCandidate> {
  candidates
    .iter()
    .reduce(|latest, candidate| if candidate.created > latest.created { candidate } else { latest })
}

/// Resolve the latest image matching `name_pattern` in every region
///
/// Region queries are independent, so they fan out with at most `concurrency`
/// in flight; each worker owns its result and the map is assembled by this
/// single collecting task. Regions with no match are omitted from the map with
/// a warning. A failed region enumeration, or any region query that still
/// fails after the client's retries, aborts the whole resolution - no partial
/// map is returned.
pub async fn create_ami_region_map<C>(catalog: &C, name_pattern: &str, concurrency: usize) -> Result<BTreeMap<String, String>>
where
  C: ImageCatalog + Sync,
{
  if name_pattern.is_empty() {
    bail!("image name pattern must not be empty");
  }

  let regions = catalog.regions().await?;
  debug!("resolving latest image matching {name_pattern} across {} regions", regions.len());

  let results: Vec<Result<(String, Option<String>)>> = stream::iter(regions)
    .map(|region| async move {
      let candidates = catalog.images(&region, name_pattern).await?;
      let latest = latest_image(&candidates).map(|image| image.id.clone());
      Ok((region, latest))
    })
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await;

  let mut map = BTreeMap::new();
  for result in results {
    let (region, latest) = result?;
    match latest {
      Some(id) => {
        debug!("{region}: {id}");
        map.insert(region, id);
      }
      None => warn!("no image matching {name_pattern} in {region}, omitting it from the map"),
    }
  }

  Ok(map)
}
