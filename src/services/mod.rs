pub mod issue_service;

pub use issue_service::{CreateOutcome, IssueReply, IssueService};
