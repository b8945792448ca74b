pub mod github;
pub mod gitlab;
pub mod provider;

pub use provider::{
    for_provider, CreatePullRequest, HostCredentials, HostError, PullRequest, SourceHost,
};
