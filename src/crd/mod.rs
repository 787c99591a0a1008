//! Custom Resource Definitions for the Jira operator

mod jira;

#[cfg(test)]
mod tests;

pub use jira::{AppState, Jira, JiraIngressPolicy, JiraPodPolicy, JiraSpec, JiraStatus};
