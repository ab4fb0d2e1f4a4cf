//! Template assembly
//!
//! Each stack is a pure function from a resolved region -> AMI map to a
//! `cfn::Template`; no network access happens here

mod dev_stack;
mod jenkins;

pub use dev_stack::dev_stack;
pub use jenkins::jenkins;

use anyhow::{anyhow, Result};

use crate::{cfn::Value, Assets};

/// Load an embedded user-data script from `files/`
fn user_data_script(name: &str) -> Result<String> {
  let file = Assets::get(name).ok_or_else(|| anyhow!("embedded script {name} not found"))?;
  Ok(std::str::from_utf8(file.data.as_ref())?.to_owned())
}

/// An invocation of a cfn bootstrap tool (cfn-init, cfn-signal) as join
/// parts, so it can reference the stack name and region of the running stack
fn cfn_invocation(tool: &str, args: &str, logical_id: &str) -> Vec<Value> {
  vec![
    format!("/usr/local/bin/{tool}{args} --resource={logical_id} --region=").into(),
    Value::reference("AWS::Region"),
    " --stack=".into(),
    Value::reference("AWS::StackName"),
    "\n".into(),
  ]
}

/// User data that finishes by signaling the resource's `CreationPolicy`
fn signaled_user_data(script: String, logical_id: &str) -> Value {
  let mut parts: Vec<Value> = vec![script.into(), "# Signal CloudFormation when set up is complete\n".into()];
  parts.extend(cfn_invocation("cfn-signal", " -e $?", logical_id));

  Value::base64(Value::join("", parts))
}

#[cfg(test)]
mod tests {
  use serde_json::to_value;

  use super::*;

  #[test]
  fn it_loads_embedded_scripts() {
    for name in ["dev-stack-user-data.sh", "jenkins-user-data.sh"] {
      let script = user_data_script(name).unwrap();
      assert!(script.starts_with("#!/bin/bash"));
    }
  }

  #[test]
  fn it_appends_signal_to_user_data() {
    let value = to_value(signaled_user_data("#!/bin/bash\n".to_owned(), "Instance")).unwrap();
    let parts = &value["Fn::Base64"]["Fn::Join"][1];
    assert_eq!(parts[0], "#!/bin/bash\n");
    assert!(parts[2].as_str().unwrap().contains("cfn-signal"));
    assert!(parts[2].as_str().unwrap().contains("--resource=Instance"));
    assert_eq!(parts[3], to_value(Value::reference("AWS::Region")).unwrap());
    assert_eq!(parts[5], to_value(Value::reference("AWS::StackName")).unwrap());
  }
}
