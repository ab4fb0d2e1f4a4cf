//! `AWS::RDS::*` resource properties

use serde::Serialize;

use super::Value;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DbInstance {
  #[serde(rename = "DBName")]
  pub db_name: Value,

  pub allocated_storage: u32,

  #[serde(rename = "DBInstanceClass")]
  pub db_instance_class: String,

  pub engine: String,

  pub engine_version: String,

  pub master_username: Value,

  pub master_user_password: Value,

  #[serde(rename = "VPCSecurityGroups", skip_serializing_if = "Vec::is_empty")]
  pub vpc_security_groups: Vec<Value>,
}

#[cfg(test)]
mod tests {
  use serde_json::to_value;

  use super::*;

  #[test]
  fn it_uses_rds_casing() {
    let db = DbInstance {
      db_name: Value::reference("DBName"),
      allocated_storage: 20,
      db_instance_class: "db.t2.micro".to_owned(),
      engine: "MySQL".to_owned(),
      engine_version: "5.7.21".to_owned(),
      master_username: Value::reference("DBUser"),
      master_user_password: Value::reference("DBPass"),
      vpc_security_groups: vec![Value::get_att("DBSecurityGroup", "GroupId")],
    };

    let value = to_value(db).unwrap();
    assert_eq!(value["DBName"], serde_json::json!({"Ref": "DBName"}));
    assert_eq!(value["DBInstanceClass"], "db.t2.micro");
    assert_eq!(value["VPCSecurityGroups"][0]["Fn::GetAtt"][0], "DBSecurityGroup");
  }
}
