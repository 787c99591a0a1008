use jira_operator::crd::Jira;
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&Jira::crd())?);
    Ok(())
}
