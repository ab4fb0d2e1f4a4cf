use std::collections::BTreeMap;

use anyhow::Result;

use super::{cfn_invocation, user_data_script};
use crate::cfn::{
  ec2, region_mapping, CreationPolicy, InitFile, Metadata, Output, Parameter, Resource, Tag, Template, Value,
};

const NGINX_PROXY_CONF: &str = "server { listen 80 default_server; listen [::]:80 default_server; location / { \
                                proxy_pass http://localhost:8080; proxy_set_header Host $host; proxy_set_header \
                                X-Real-IP $remote_addr; } }";

/// A Jenkins master: one instance running Jenkins behind an nginx reverse proxy
pub fn jenkins(ami_map: &BTreeMap<String, String>) -> Result<Template> {
  let mut template = Template::new(Some("Jenkins Master"));

  template
    .add_parameter(
      "KeyName",
      Parameter {
        r#type: "AWS::EC2::KeyPair::KeyName".to_owned(),
        description: Some("Name of an existing EC2 KeyPair for SSH access".to_owned()),
        constraint_description: Some("Must be the name of an existing EC2 KeyPair.".to_owned()),
        ..Default::default()
      },
    )
    .add_parameter(
      "PassWord",
      Parameter {
        r#type: "String".to_owned(),
        description: Some("Password for the admin account".to_owned()),
        constraint_description: Some(
          "A complex password at least eight chars long with alphanumeric characters, dashes and underscores."
            .to_owned(),
        ),
        allowed_pattern: Some("[-_a-zA-Z0-9]*".to_owned()),
        min_length: Some(8),
        max_length: Some(64),
        no_echo: Some(true),
        ..Default::default()
      },
    );

  template.add_mapping("RegionMap", region_mapping(ami_map));

  template.add_resource(
    "SecurityGroup",
    Resource::security_group(ec2::SecurityGroup {
      group_description: "SSH, HTTP/HTTPS open for 0.0.0.0/0".to_owned(),
      security_group_ingress: vec![
        ec2::SecurityGroupRule::tcp_open(22, "SSH"),
        ec2::SecurityGroupRule::tcp_open(80, "HTTP"),
        ec2::SecurityGroupRule::tcp_open(443, "HTTPS"),
      ],
      tags: vec![Tag::name(Value::reference("AWS::StackName"))],
    }),
  );

  template.add_resource(
    "Instance",
    Resource::instance(ec2::Instance {
      image_id: Value::find_in_map("RegionMap", Value::reference("AWS::Region"), "ami"),
      instance_type: "t2.micro".to_owned(),
      key_name: Some(Value::reference("KeyName")),
      security_groups: vec![Value::reference("SecurityGroup")],
      tags: vec![Tag::name(Value::reference("AWS::StackName"))],
      user_data: Some(user_data()?),
    })
    .with_metadata(Metadata::init_files(BTreeMap::from([(
      "/etc/nginx/conf.d/jenkins.conf".to_owned(),
      InitFile::new(NGINX_PROXY_CONF.into(), "000644"),
    )])))
    .with_creation_policy(CreationPolicy::resource_signal("PT15M")),
  );

  template.add_output(
    "PublicDnsName",
    Output {
      description: Some("PublicDnsName".to_owned()),
      value: Value::join("", vec!["http://".into(), Value::get_att("Instance", "PublicDnsName")]),
    },
  );

  Ok(template)
}

/// Install Jenkins, set the admin password, then apply the cfn-init metadata
/// (which writes the nginx proxy config), swap nginx over to it, and signal
fn user_data() -> Result<Value> {
  let mut parts: Vec<Value> = vec![
    user_data_script("jenkins-user-data.sh")?.into(),
    "# Change the password for the admin account\n".into(),
    "echo 'jenkins.model.Jenkins.instance.securityRealm.createAccount(\"admin\", \"".into(),
    Value::reference("PassWord"),
    "\")' | java -jar /var/cache/jenkins/war/WEB-INF/jenkins-cli.jar -s \"http://localhost:8080/\" -auth \
     \"admin:$(cat /var/lib/jenkins/secrets/initialAdminPassword)\" groovy =\n"
      .into(),
  ];
  parts.extend(cfn_invocation("cfn-init", "", "Instance"));
  parts.push("unlink /etc/nginx/sites-enabled/default\n".into());
  parts.push("systemctl reload nginx\n".into());
  parts.extend(cfn_invocation("cfn-signal", " -e $?", "Instance"));

  Ok(Value::base64(Value::join("", parts)))
}
