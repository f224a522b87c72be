use serde::{Deserialize, Serialize};

/// Whether a user sends event messages, receives them, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Sender,
    Receiver,
    Both,
}

/// Public part of a user record returned by discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub role: UserRole,
}

impl UserSummary {
    pub fn new(uid: impl Into<String>, role: UserRole) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            photo_url: None,
            role,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }
}

/// One discovery result. Read-only; sessions never mutate these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredUser {
    pub user: UserSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_event_type_ids: Option<Vec<String>>,
}

impl DiscoveredUser {
    pub fn new(user: UserSummary) -> Self {
        Self {
            user,
            distance_km: None,
            favorite_event_type_ids: None,
        }
    }

    pub fn uid(&self) -> &str {
        &self.user.uid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_directory_payload() {
        let json = r#"{
            "user": {"uid": "u1", "displayName": "Ana", "photoURL": "https://img/1.jpg", "role": "both"},
            "distanceKm": 12.5,
            "favoriteEventTypeIds": ["birthday"]
        }"#;

        let user: DiscoveredUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.uid(), "u1");
        assert_eq!(user.user.role, UserRole::Both);
        assert_eq!(user.user.photo_url.as_deref(), Some("https://img/1.jpg"));
        assert_eq!(user.distance_km, Some(12.5));
    }
}
