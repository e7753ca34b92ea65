use serde::Deserialize;
use serde_json::Value;

/// The shapes a trigger payload may arrive in.
///
/// Invocations come from several producers (manual test events, DynamoDB stream
/// records, plain strings), so the repository name can be wrapped in a few
/// different ways. The variants are tried in precedence order; anything
/// unrecognized falls through to `Other` and is stringified wholesale.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MirrorEvent {
    Repository {
        repository: RepositoryField,
    },
    RepositoryName {
        #[serde(rename = "repositoryName")]
        repository_name: String,
    },
    Bare(String),
    Other(Value),
}

/// A `repository` field is either a plain string or a one-key attribute
/// wrapper (`{"S": "name"}`) as produced by DynamoDB stream records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RepositoryField {
    Plain(String),
    Attribute {
        #[serde(rename = "S")]
        value: String,
    },
}

impl MirrorEvent {
    /// Resolve the repository name this event refers to.
    pub fn repository(&self) -> String {
        match self {
            Self::Repository {
                repository: RepositoryField::Plain(name),
            } => name.clone(),
            Self::Repository {
                repository: RepositoryField::Attribute { value },
            } => value.clone(),
            Self::RepositoryName { repository_name } => repository_name.clone(),
            Self::Bare(name) => name.clone(),
            Self::Other(value) => value.to_string(),
        }
    }
}

impl From<Value> for MirrorEvent {
    fn from(payload: Value) -> Self {
        // `Other` matches any value, so deserialization cannot actually fail.
        serde_json::from_value(payload.clone()).unwrap_or(Self::Other(payload))
    }
}
