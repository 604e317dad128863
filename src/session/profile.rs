//! Typed projections of the two GraphQL shapes the session consumes.
//!
//! Responses are parsed into explicit types at the network boundary; a shape
//! that does not match is an error rather than a half-filled profile.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    #[error("response has no data")]
    MissingData,

    #[error("no user is associated with this API key")]
    NoCurrentUser,

    #[error("visibility update was not confirmed")]
    NoConfirmation,

    #[error("unexpected response shape: {0}")]
    Shape(String),
}

/// Who can see a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Private,
    Public,
    ClientsOnly,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Public => "public",
            Visibility::ClientsOnly => "clients_only",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    /// Accepts `private`, `public` and `clients_only` in any case, with or
    /// without separators (`clientsOnly`, `CLIENTS_ONLY`, `clients-only`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "private" => Ok(Visibility::Private),
            "public" => Ok(Visibility::Public),
            "clientsonly" => Ok(Visibility::ClientsOnly),
            _ => Err(format!("unknown visibility '{}'", s)),
        }
    }
}

impl Serialize for Visibility {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Visibility {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub name: String,
    pub experience_years: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobApplication {
    pub title: String,
}

/// Client-side view of the signed-in user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub avatar_url: Option<String>,
    pub skills: Vec<Skill>,
    pub job_applications: Vec<JobApplication>,
    pub visibility: Visibility,
}

impl UserProfile {
    /// Project `data.currentUser` of a login response.
    pub fn from_login_response(body: &Value) -> Result<Self, ProfileError> {
        let data = data_of(body)?;
        let login = LoginData::deserialize(data).map_err(|e| ProfileError::Shape(e.to_string()))?;
        let user = login.current_user.ok_or(ProfileError::NoCurrentUser)?;

        let visibility = user
            .profile
            .and_then(|p| p.visibility)
            .ok_or_else(|| ProfileError::Shape("currentUser.profile.visibility is missing".into()))?;

        let skills = user
            .user_skills
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| {
                entry.skill.map(|skill| Skill {
                    name: skill.name,
                    experience_years: entry.experience,
                })
            })
            .collect();

        let job_applications = user
            .job_applications
            .map(JobApplicationConnection::into_applications)
            .unwrap_or_default();

        Ok(UserProfile {
            name: user.name,
            avatar_url: user.avatar_url,
            skills,
            job_applications,
            visibility,
        })
    }
}

/// Read the confirmed value from `data.updateProfile.profile.visibility`.
pub fn visibility_from_mutation_response(body: &Value) -> Result<Visibility, ProfileError> {
    let data = data_of(body)?;
    let result =
        UpdateProfileData::deserialize(data).map_err(|e| ProfileError::Shape(e.to_string()))?;

    result
        .update_profile
        .and_then(|payload| payload.profile)
        .and_then(|profile| profile.visibility)
        .ok_or(ProfileError::NoConfirmation)
}

fn data_of(body: &Value) -> Result<&Value, ProfileError> {
    match body.get("data") {
        Some(Value::Null) | None => Err(ProfileError::MissingData),
        Some(data) => Ok(data),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    current_user: Option<CurrentUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentUser {
    name: String,
    #[serde(default)]
    avatar_url: Option<String>,
    #[serde(default)]
    user_skills: Option<Vec<UserSkillNode>>,
    #[serde(default)]
    profile: Option<ProfileNode>,
    #[serde(default)]
    job_applications: Option<JobApplicationConnection>,
}

#[derive(Deserialize)]
struct UserSkillNode {
    #[serde(default)]
    experience: Option<u32>,
    #[serde(default)]
    skill: Option<NamedNode>,
}

#[derive(Deserialize)]
struct NamedNode {
    name: String,
}

#[derive(Deserialize)]
struct ProfileNode {
    #[serde(default)]
    visibility: Option<Visibility>,
}

/// Accepts both `nodes { ... }` and Relay `edges { node { ... } }` forms
#[derive(Deserialize)]
struct JobApplicationConnection {
    #[serde(default)]
    nodes: Option<Vec<Option<JobApplicationNode>>>,
    #[serde(default)]
    edges: Option<Vec<Option<JobApplicationEdge>>>,
}

impl JobApplicationConnection {
    fn into_applications(self) -> Vec<JobApplication> {
        let nodes = match (self.nodes, self.edges) {
            (Some(nodes), _) => nodes,
            (None, Some(edges)) => edges.into_iter().flatten().map(|e| e.node).collect(),
            (None, None) => Vec::new(),
        };

        nodes
            .into_iter()
            .flatten()
            .filter_map(|node| node.job)
            .map(|job| JobApplication { title: job.title })
            .collect()
    }
}

#[derive(Deserialize)]
struct JobApplicationEdge {
    #[serde(default)]
    node: Option<JobApplicationNode>,
}

#[derive(Deserialize)]
struct JobApplicationNode {
    #[serde(default)]
    job: Option<JobNode>,
}

#[derive(Deserialize)]
struct JobNode {
    title: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileData {
    #[serde(default)]
    update_profile: Option<UpdateProfilePayload>,
}

#[derive(Deserialize)]
struct UpdateProfilePayload {
    #[serde(default)]
    profile: Option<ProfileNode>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_login_projection() {
        let body = json!({"data": {"currentUser": {
            "name": "Ana",
            "userSkills": [],
            "jobApplications": {"nodes": []},
            "profile": {"visibility": "private"}
        }}});

        let profile = UserProfile::from_login_response(&body).unwrap();
        assert_eq!(profile.name, "Ana");
        assert_eq!(profile.avatar_url, None);
        assert!(profile.skills.is_empty());
        assert!(profile.job_applications.is_empty());
        assert_eq!(profile.visibility, Visibility::Private);
    }

    #[test]
    fn test_full_login_projection_keeps_order() {
        let body = json!({"data": {"currentUser": {
            "name": "Ana",
            "avatarUrl": "https://cdn.example/ana.png",
            "userSkills": [
                {"experience": 5, "skill": {"name": "Rust"}},
                {"experience": null, "skill": {"name": "GraphQL"}},
                {"experience": 2, "skill": null}
            ],
            "jobApplications": {"nodes": [
                {"job": {"title": "Backend Engineer"}},
                {"job": null},
                {"job": {"title": "Platform Engineer"}}
            ]},
            "profile": {"visibility": "clients_only"}
        }}});

        let profile = UserProfile::from_login_response(&body).unwrap();
        assert_eq!(profile.avatar_url.as_deref(), Some("https://cdn.example/ana.png"));
        assert_eq!(
            profile.skills,
            vec![
                Skill { name: "Rust".into(), experience_years: Some(5) },
                Skill { name: "GraphQL".into(), experience_years: None },
            ]
        );
        let titles: Vec<_> = profile.job_applications.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["Backend Engineer", "Platform Engineer"]);
        assert_eq!(profile.visibility, Visibility::ClientsOnly);
    }

    #[test]
    fn test_relay_edges_form() {
        let body = json!({"data": {"currentUser": {
            "name": "Ana",
            "userSkills": null,
            "jobApplications": {"edges": [{"node": {"job": {"title": "Designer"}}}]},
            "profile": {"visibility": "public"}
        }}});

        let profile = UserProfile::from_login_response(&body).unwrap();
        assert_eq!(profile.job_applications, vec![JobApplication { title: "Designer".into() }]);
        assert_eq!(profile.visibility, Visibility::Public);
    }

    #[test]
    fn test_login_shape_errors() {
        assert_eq!(
            UserProfile::from_login_response(&json!({"errors": [{"message": "x"}]})),
            Err(ProfileError::MissingData)
        );
        assert_eq!(
            UserProfile::from_login_response(&json!({"data": {"currentUser": null}})),
            Err(ProfileError::NoCurrentUser)
        );
        assert!(matches!(
            UserProfile::from_login_response(&json!({"data": {"currentUser": {"name": 7}}})),
            Err(ProfileError::Shape(_))
        ));
        assert!(matches!(
            UserProfile::from_login_response(&json!({"data": {"currentUser": {"name": "Ana"}}})),
            Err(ProfileError::Shape(_))
        ));
        assert!(matches!(
            UserProfile::from_login_response(&json!({"data": {"currentUser": {
                "name": "Ana", "profile": {"visibility": "everyone"}
            }}})),
            Err(ProfileError::Shape(_))
        ));
    }

    #[test]
    fn test_visibility_parsing() {
        assert_eq!("private".parse::<Visibility>(), Ok(Visibility::Private));
        assert_eq!("PUBLIC".parse::<Visibility>(), Ok(Visibility::Public));
        assert_eq!("clientsOnly".parse::<Visibility>(), Ok(Visibility::ClientsOnly));
        assert_eq!("clients-only".parse::<Visibility>(), Ok(Visibility::ClientsOnly));
        assert!("hidden".parse::<Visibility>().is_err());
        assert_eq!(serde_json::to_value(Visibility::ClientsOnly).unwrap(), json!("clients_only"));
    }

    #[test]
    fn test_mutation_confirmation() {
        let body = json!({"data": {"updateProfile": {"profile": {"visibility": "public"}}}});
        assert_eq!(visibility_from_mutation_response(&body), Ok(Visibility::Public));

        let unconfirmed = json!({"data": {"updateProfile": null}});
        assert_eq!(
            visibility_from_mutation_response(&unconfirmed),
            Err(ProfileError::NoConfirmation)
        );
    }
}
