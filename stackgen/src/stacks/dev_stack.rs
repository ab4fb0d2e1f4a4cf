use std::collections::BTreeMap;

use anyhow::Result;

use super::{signaled_user_data, user_data_script};
use crate::cfn::{
  ec2, rds, region_mapping, CreationPolicy, InitFile, Metadata, Output, Parameter, Resource, Tag, Template, Value,
};

const ALPHANUMERIC_PATTERN: &str = "[-_a-zA-Z0-9]*";

/// The dev stack: one instance reachable over SSH/HTTP/HTTPS and a MySQL
/// database only reachable from that instance
pub fn dev_stack(ami_map: &BTreeMap<String, String>) -> Result<Template> {
  let mut template = Template::new(Some("Dev Stack"));

  template
    .add_parameter(
      "KeyName",
      Parameter {
        r#type: "AWS::EC2::KeyPair::KeyName".to_owned(),
        description: Some("An existing EC2 KeyPair.".to_owned()),
        constraint_description: Some("An existing EC2 KeyPair.".to_owned()),
        ..Default::default()
      },
    )
    .add_parameter(
      "DBPass",
      Parameter {
        r#type: "String".to_owned(),
        description: Some("The database admin account password".to_owned()),
        constraint_description: Some("Must contain only alphanumeric characters".to_owned()),
        allowed_pattern: Some(ALPHANUMERIC_PATTERN.to_owned()),
        no_echo: Some(true),
        ..Default::default()
      },
    )
    .add_parameter(
      "DBName",
      Parameter {
        r#type: "String".to_owned(),
        description: Some("The database name".to_owned()),
        constraint_description: Some("Must begin with a letter and contain only alphanumeric characters".to_owned()),
        allowed_pattern: Some(ALPHANUMERIC_PATTERN.to_owned()),
        default: Some("appdb".to_owned()),
        ..Default::default()
      },
    )
    .add_parameter(
      "DBUser",
      Parameter {
        r#type: "String".to_owned(),
        description: Some("Username for MySQL database access".to_owned()),
        constraint_description: Some("Must begin with a letter and contain only alphanumeric characters".to_owned()),
        allowed_pattern: Some(ALPHANUMERIC_PATTERN.to_owned()),
        default: Some("admin".to_owned()),
        ..Default::default()
      },
    );

  template.add_mapping("RegionMap", region_mapping(ami_map));

  template.add_resource(
    "EC2SecurityGroup",
    Resource::security_group(ec2::SecurityGroup {
      group_description: "EC2 Security Group".to_owned(),
      security_group_ingress: vec![
        ec2::SecurityGroupRule::tcp_open(22, "SSH"),
        ec2::SecurityGroupRule::tcp_open(80, "HTTP"),
        ec2::SecurityGroupRule::tcp_open(443, "HTTPS"),
      ],
      tags: vec![Tag::name(Value::reference("AWS::StackName"))],
    }),
  );

  template.add_resource(
    "DBSecurityGroup",
    Resource::security_group(ec2::SecurityGroup {
      group_description: "DB Security Group".to_owned(),
      security_group_ingress: vec![ec2::SecurityGroupRule::tcp_from_group(
        3306,
        Value::get_att("EC2SecurityGroup", "GroupId"),
        "MySQL",
      )],
      tags: vec![Tag::name(Value::reference("AWS::StackName"))],
    }),
  );

  let user_data = signaled_user_data(user_data_script("dev-stack-user-data.sh")?, "Instance");
  template.add_resource(
    "Instance",
    Resource::instance(ec2::Instance {
      image_id: Value::find_in_map("RegionMap", Value::reference("AWS::Region"), "ami"),
      instance_type: "t2.micro".to_owned(),
      key_name: Some(Value::reference("KeyName")),
      security_groups: vec![Value::reference("EC2SecurityGroup"), Value::reference("DBSecurityGroup")],
      tags: vec![Tag::name(Value::reference("AWS::StackName"))],
      user_data: Some(user_data),
    })
    .with_metadata(Metadata::init_files(BTreeMap::from([(
      "/tmp/instance.txt".to_owned(),
      InitFile::new(Value::reference("AWS::StackName"), "000644"),
    )])))
    .with_creation_policy(CreationPolicy::resource_signal("PT15M"))
    .with_depends_on("Database"),
  );

  template.add_resource(
    "Database",
    Resource::db_instance(rds::DbInstance {
      db_name: Value::reference("DBName"),
      allocated_storage: 20,
      db_instance_class: "db.t2.micro".to_owned(),
      engine: "MySQL".to_owned(),
      engine_version: "5.7.21".to_owned(),
      master_username: Value::reference("DBUser"),
      master_user_password: Value::reference("DBPass"),
      vpc_security_groups: vec![Value::get_att("DBSecurityGroup", "GroupId")],
    }),
  );

  template
    .add_output(
      "InstanceDnsName",
      Output {
        description: Some("PublicDnsName".to_owned()),
        value: Value::get_att("Instance", "PublicDnsName"),
      },
    )
    .add_output(
      "DatabaseDnsName",
      Output {
        description: Some("DBEndpoint".to_owned()),
        value: Value::get_att("Database", "Endpoint.Address"),
      },
    );

  Ok(template)
}

#[cfg(test)]
mod tests {
  use serde_json::{json, to_value};

  use super::*;

  fn fixture_map() -> BTreeMap<String, String> {
    BTreeMap::from([
      ("us-east-1".to_owned(), "ami-2".to_owned()),
      ("eu-west-1".to_owned(), "ami-3".to_owned()),
    ])
  }

  #[test]
  fn it_builds_the_dev_stack() {
    let template = dev_stack(&fixture_map()).unwrap();
    let value = to_value(&template).unwrap();

    assert_eq!(value["Description"], "Dev Stack");
    for parameter in ["KeyName", "DBPass", "DBName", "DBUser"] {
      assert!(value["Parameters"].get(parameter).is_some(), "missing {parameter}");
    }
    assert_eq!(value["Parameters"]["DBPass"]["NoEcho"], true);
    assert_eq!(value["Mappings"]["RegionMap"]["us-east-1"]["ami"], "ami-2");
    assert_eq!(value["Mappings"]["RegionMap"]["eu-west-1"]["ami"], "ami-3");
  }

  #[test]
  fn it_wires_the_instance_to_the_region_map() {
    let template = dev_stack(&fixture_map()).unwrap();
    let value = to_value(&template).unwrap();

    let instance = &value["Resources"]["Instance"];
    assert_eq!(instance["Type"], "AWS::EC2::Instance");
    assert_eq!(
      instance["Properties"]["ImageId"],
      json!({"Fn::FindInMap": ["RegionMap", {"Ref": "AWS::Region"}, "ami"]})
    );
    assert_eq!(instance["DependsOn"], "Database");
    assert_eq!(instance["CreationPolicy"]["ResourceSignal"]["Timeout"], "PT15M");
    assert_eq!(
      instance["Metadata"]["AWS::CloudFormation::Init"]["config"]["files"]["/tmp/instance.txt"]["content"],
      json!({"Ref": "AWS::StackName"})
    );
  }

  #[test]
  fn it_locks_the_database_to_the_instance_group() {
    let template = dev_stack(&fixture_map()).unwrap();
    let value = to_value(&template).unwrap();

    let rule = &value["Resources"]["DBSecurityGroup"]["Properties"]["SecurityGroupIngress"][0];
    assert_eq!(rule["FromPort"], 3306);
    assert_eq!(rule["SourceSecurityGroupId"], json!({"Fn::GetAtt": ["EC2SecurityGroup", "GroupId"]}));

    let database = &value["Resources"]["Database"];
    assert_eq!(database["Type"], "AWS::RDS::DBInstance");
    assert_eq!(
      database["Properties"]["VPCSecurityGroups"][0],
      json!({"Fn::GetAtt": ["DBSecurityGroup", "GroupId"]})
    );
  }

  #[test]
  fn it_exposes_instance_and_database_endpoints() {
    let template = dev_stack(&fixture_map()).unwrap();
    let value = to_value(&template).unwrap();

    assert_eq!(
      value["Outputs"]["InstanceDnsName"]["Value"],
      json!({"Fn::GetAtt": ["Instance", "PublicDnsName"]})
    );
    assert_eq!(
      value["Outputs"]["DatabaseDnsName"]["Value"],
      json!({"Fn::GetAtt": ["Database", "Endpoint.Address"]})
    );
  }

  #[test]
  fn it_serializes_to_yaml() {
    let template = dev_stack(&fixture_map()).unwrap();
    let yaml = template.to_yaml().unwrap();
    assert!(yaml.contains("AWSTemplateFormatVersion:"));
    assert!(yaml.contains("RegionMap:"));
    assert!(yaml.contains("ami-2"));
  }
}
