//! A small CloudFormation document model
//!
//! Covers the pieces the generated stacks use - parameters, mappings, the
//! intrinsic functions, cfn-init metadata, and a handful of resource types -
//! all serialized through serde into the template key layout CloudFormation
//! expects

pub mod ec2;
pub mod rds;

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

const FORMAT_VERSION: &str = "2010-09-09";

/// A template property value: either a literal string or an intrinsic function
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Value {
  String(String),
  Ref {
    #[serde(rename = "Ref")]
    logical_id: String,
  },
  GetAtt {
    #[serde(rename = "Fn::GetAtt")]
    attribute: (String, String),
  },
  FindInMap {
    #[serde(rename = "Fn::FindInMap")]
    lookup: (String, Box<Value>, String),
  },
  Base64 {
    #[serde(rename = "Fn::Base64")]
    value: Box<Value>,
  },
  Join {
    #[serde(rename = "Fn::Join")]
    join: (String, Vec<Value>),
  },
}

impl Value {
  pub fn reference(logical_id: impl Into<String>) -> Self {
    Self::Ref {
      logical_id: logical_id.into(),
    }
  }

  pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
    Self::GetAtt {
      attribute: (logical_id.into(), attribute.into()),
    }
  }

  pub fn find_in_map(map: impl Into<String>, key: Value, attribute: impl Into<String>) -> Self {
    Self::FindInMap {
      lookup: (map.into(), Box::new(key), attribute.into()),
    }
  }

  pub fn base64(value: Value) -> Self {
    Self::Base64 { value: Box::new(value) }
  }

  pub fn join(separator: impl Into<String>, parts: Vec<Value>) -> Self {
    Self::Join {
      join: (separator.into(), parts),
    }
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Self::String(value.to_owned())
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Self::String(value)
  }
}

/// A resource tag
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
  pub key: String,
  pub value: Value,
}

impl Tag {
  pub fn name(value: Value) -> Self {
    Self {
      key: "Name".to_owned(),
      value,
    }
  }
}

/// A template input parameter
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
  pub r#type: String,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub default: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub allowed_pattern: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub constraint_description: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub min_length: Option<u32>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_length: Option<u32>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub no_echo: Option<bool>,
}

/// A template output
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,

  pub value: Value,
}

/// `AWS::CloudFormation::Init` metadata attached to an instance
///
/// Keys below the `Init` block are lowercase per the cfn-init config schema
#[derive(Clone, Debug, Serialize)]
pub struct Metadata {
  #[serde(rename = "AWS::CloudFormation::Init")]
  pub init: Init,
}

#[derive(Clone, Debug, Serialize)]
pub struct Init {
  pub config: InitConfig,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct InitConfig {
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub files: BTreeMap<String, InitFile>,
}

#[derive(Clone, Debug, Serialize)]
pub struct InitFile {
  pub content: Value,
  pub mode: String,
  pub owner: String,
  pub group: String,
}

impl InitFile {
  /// A root-owned file with the given mode
  pub fn new(content: Value, mode: &str) -> Self {
    Self {
      content,
      mode: mode.to_owned(),
      owner: "root".to_owned(),
      group: "root".to_owned(),
    }
  }
}

impl Metadata {
  pub fn init_files(files: BTreeMap<String, InitFile>) -> Self {
    Self {
      init: Init {
        config: InitConfig { files },
      },
    }
  }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreationPolicy {
  pub resource_signal: ResourceSignal,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceSignal {
  /// An ISO-8601 duration, e.g. `PT15M`
  pub timeout: String,
}

impl CreationPolicy {
  pub fn resource_signal(timeout: &str) -> Self {
    Self {
      resource_signal: ResourceSignal {
        timeout: timeout.to_owned(),
      },
    }
  }
}

/// Properties for the supported resource types
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Properties {
  Instance(ec2::Instance),
  SecurityGroup(ec2::SecurityGroup),
  DbInstance(rds::DbInstance),
}

/// One resource entry in the `Resources` section
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
  pub r#type: String,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub metadata: Option<Metadata>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub creation_policy: Option<CreationPolicy>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub depends_on: Option<String>,

  pub properties: Properties,
}

impl Resource {
  fn new(r#type: &str, properties: Properties) -> Self {
    Self {
      r#type: r#type.to_owned(),
      metadata: None,
      creation_policy: None,
      depends_on: None,
      properties,
    }
  }

  pub fn instance(instance: ec2::Instance) -> Self {
    Self::new("AWS::EC2::Instance", Properties::Instance(instance))
  }

  pub fn security_group(group: ec2::SecurityGroup) -> Self {
    Self::new("AWS::EC2::SecurityGroup", Properties::SecurityGroup(group))
  }

  pub fn db_instance(instance: rds::DbInstance) -> Self {
    Self::new("AWS::RDS::DBInstance", Properties::DbInstance(instance))
  }

  pub fn with_metadata(mut self, metadata: Metadata) -> Self {
    self.metadata = Some(metadata);
    self
  }

  pub fn with_creation_policy(mut self, policy: CreationPolicy) -> Self {
    self.creation_policy = Some(policy);
    self
  }

  pub fn with_depends_on(mut self, logical_id: &str) -> Self {
    self.depends_on = Some(logical_id.to_owned());
    self
  }
}

/// A two-level `Mappings` entry: top key, second key, attribute -> value
pub type Mapping = BTreeMap<String, BTreeMap<String, String>>;

/// Wrap a region -> AMI map into the `{region: {ami: id}}` mapping shape used
/// with `Fn::FindInMap` against `AWS::Region`
pub fn region_mapping(ami_map: &BTreeMap<String, String>) -> Mapping {
  ami_map
    .iter()
    .map(|(region, id)| (region.clone(), BTreeMap::from([("ami".to_owned(), id.clone())])))
    .collect()
}

/// A CloudFormation template document
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
  #[serde(rename = "AWSTemplateFormatVersion")]
  format_version: String,

  #[serde(skip_serializing_if = "Option::is_none")]
  description: Option<String>,

  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  parameters: BTreeMap<String, Parameter>,

  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  mappings: BTreeMap<String, Mapping>,

  resources: BTreeMap<String, Resource>,

  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  outputs: BTreeMap<String, Output>,
}

impl Template {
  pub fn new(description: Option<&str>) -> Self {
    Self {
      format_version: FORMAT_VERSION.to_owned(),
      description: description.map(ToOwned::to_owned),
      parameters: BTreeMap::new(),
      mappings: BTreeMap::new(),
      resources: BTreeMap::new(),
      outputs: BTreeMap::new(),
    }
  }

  pub fn add_parameter(&mut self, logical_id: &str, parameter: Parameter) -> &mut Self {
    self.parameters.insert(logical_id.to_owned(), parameter);
    self
  }

  pub fn add_mapping(&mut self, name: &str, mapping: Mapping) -> &mut Self {
    self.mappings.insert(name.to_owned(), mapping);
    self
  }

  pub fn add_resource(&mut self, logical_id: &str, resource: Resource) -> &mut Self {
    self.resources.insert(logical_id.to_owned(), resource);
    self
  }

  pub fn add_output(&mut self, logical_id: &str, output: Output) -> &mut Self {
    self.outputs.insert(logical_id.to_owned(), output);
    self
  }

  pub fn to_yaml(&self) -> Result<String> {
    Ok(serde_yaml::to_string(self)?)
  }

  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::{json, to_value};

  use super::*;

  #[test]
  fn it_serializes_ref() {
    let value = to_value(Value::reference("KeyName")).unwrap();
    assert_eq!(value, json!({"Ref": "KeyName"}));
  }

  #[test]
  fn it_serializes_get_att() {
    let value = to_value(Value::get_att("Database", "Endpoint.Address")).unwrap();
    assert_eq!(value, json!({"Fn::GetAtt": ["Database", "Endpoint.Address"]}));
  }

  #[test]
  fn it_serializes_find_in_map() {
    let value = to_value(Value::find_in_map("RegionMap", Value::reference("AWS::Region"), "ami")).unwrap();
    assert_eq!(value, json!({"Fn::FindInMap": ["RegionMap", {"Ref": "AWS::Region"}, "ami"]}));
  }

  #[test]
  fn it_serializes_base64_join() {
    let value = to_value(Value::base64(Value::join(
      "",
      vec!["#!/bin/bash\n".into(), Value::reference("AWS::StackName")],
    )))
    .unwrap();
    assert_eq!(
      value,
      json!({"Fn::Base64": {"Fn::Join": ["", ["#!/bin/bash\n", {"Ref": "AWS::StackName"}]]}})
    );
  }

  #[test]
  fn it_serializes_template_sections() {
    let mut template = Template::new(Some("Test Stack"));
    template
      .add_parameter(
        "KeyName",
        Parameter {
          r#type: "AWS::EC2::KeyPair::KeyName".to_owned(),
          description: Some("An existing EC2 KeyPair.".to_owned()),
          ..Default::default()
        },
      )
      .add_mapping(
        "RegionMap",
        region_mapping(&BTreeMap::from([("us-east-1".to_owned(), "ami-2".to_owned())])),
      )
      .add_resource(
        "SecurityGroup",
        Resource::security_group(ec2::SecurityGroup {
          group_description: "SSH".to_owned(),
          security_group_ingress: vec![ec2::SecurityGroupRule::tcp_open(22, "SSH")],
          ..Default::default()
        }),
      );

    let value = to_value(&template).unwrap();
    assert_eq!(value["AWSTemplateFormatVersion"], "2010-09-09");
    assert_eq!(value["Description"], "Test Stack");
    assert_eq!(value["Mappings"]["RegionMap"]["us-east-1"]["ami"], "ami-2");
    assert_eq!(value["Resources"]["SecurityGroup"]["Type"], "AWS::EC2::SecurityGroup");
    assert_eq!(
      value["Resources"]["SecurityGroup"]["Properties"]["SecurityGroupIngress"][0]["FromPort"],
      22
    );
    // Empty sections are dropped entirely
    assert!(value.get("Outputs").is_none());
  }

  #[test]
  fn it_skips_unset_parameter_fields() {
    let parameter = Parameter {
      r#type: "String".to_owned(),
      no_echo: Some(true),
      ..Default::default()
    };
    let value = to_value(parameter).unwrap();
    assert_eq!(value, json!({"Type": "String", "NoEcho": true}));
  }
}
