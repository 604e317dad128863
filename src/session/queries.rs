//! GraphQL documents issued by the session.

use serde_json::{json, Map};

use crate::graphql::GraphQLRequest;
use crate::session::profile::Visibility;

pub const LOGIN_QUERY: &str = r#"query GetUserData {
  currentUser {
    name
    avatarUrl
    userSkills {
      experience
      skill {
        name
      }
    }
    profile {
      visibility
    }
    jobApplications {
      nodes {
        job {
          title
        }
      }
    }
  }
}"#;

pub const UPDATE_VISIBILITY_MUTATION: &str = r#"mutation UpdateProfileVisibility($visibility: String!) {
  updateProfile(input: { visibility: $visibility }) {
    profile {
      visibility
    }
  }
}"#;

pub fn login_request() -> GraphQLRequest {
    GraphQLRequest::new(LOGIN_QUERY)
}

pub fn update_visibility_request(visibility: Visibility) -> GraphQLRequest {
    let mut variables = Map::new();
    variables.insert("visibility".to_string(), json!(visibility.as_str()));
    GraphQLRequest::new(UPDATE_VISIBILITY_MUTATION).with_variables(variables)
}
