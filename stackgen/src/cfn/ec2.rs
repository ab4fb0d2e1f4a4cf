//! `AWS::EC2::*` resource properties

use serde::Serialize;

use super::{Tag, Value};

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroup {
  pub group_description: String,

  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub security_group_ingress: Vec<SecurityGroupRule>,

  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub tags: Vec<Tag>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupRule {
  pub ip_protocol: String,

  pub from_port: u16,

  pub to_port: u16,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub cidr_ip: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_security_group_id: Option<Value>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

impl SecurityGroupRule {
  /// A single-port TCP rule open to the world
  pub fn tcp_open(port: u16, description: &str) -> Self {
    Self {
      ip_protocol: "tcp".to_owned(),
      from_port: port,
      to_port: port,
      cidr_ip: Some("0.0.0.0/0".to_owned()),
      source_security_group_id: None,
      description: Some(description.to_owned()),
    }
  }

  /// A single-port TCP rule restricted to members of another security group
  pub fn tcp_from_group(port: u16, group_id: Value, description: &str) -> Self {
    Self {
      ip_protocol: "tcp".to_owned(),
      from_port: port,
      to_port: port,
      cidr_ip: None,
      source_security_group_id: Some(group_id),
      description: Some(description.to_owned()),
    }
  }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Instance {
  pub image_id: Value,

  pub instance_type: String,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub key_name: Option<Value>,

  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub security_groups: Vec<Value>,

  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub tags: Vec<Tag>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_data: Option<Value>,
}
