use crate::errors::FieldError;
use serde::{Deserialize, Serialize};

/// Event as returned by the site api.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsvp_link: Option<String>,
}

/// E-board member as returned by the site api.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: i64,
    pub name: String,
    /// Older records stored this under `age`.
    #[serde(alias = "age")]
    pub year: String,
    pub major: String,
    pub role: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub picture: String,
}

/// Mutable form state behind the event modal. The `image` field carries an
/// existing URL when editing, or the freshly uploaded one at submit time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsvp_link: Option<String>,
}

impl EventDraft {
    /// Prefill for editing.
    pub fn from_event(event: &Event) -> Self {
        EventDraft {
            title: event.title.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            date: event.date.clone(),
            image: event.image.clone(),
            rsvp_link: event.rsvp_link.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(FieldError { field: "title", message: "Title is required" });
        }
        if self.description.trim().is_empty() {
            errors.push(FieldError { field: "description", message: "Description is required" });
        }
        if self.location.trim().is_empty() {
            errors.push(FieldError { field: "location", message: "Location is required" });
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Mutable form state behind the member modal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDraft {
    pub name: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub picture: String,
}

impl MemberDraft {
    pub fn from_member(member: &Member) -> Self {
        MemberDraft {
            name: member.name.clone(),
            year: member.year.clone(),
            major: member.major.clone(),
            role: member.role.clone(),
            description: member.description.clone(),
            picture: member.picture.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError { field: "name", message: "Name is required" });
        }
        if self.year.trim().is_empty() {
            errors.push(FieldError { field: "year", message: "Year is required" });
        }
        if self.major.trim().is_empty() {
            errors.push(FieldError { field: "major", message: "Major is required" });
        }
        if self.role.trim().is_empty() {
            errors.push(FieldError { field: "role", message: "Role is required" });
        }
        if self.description.trim().is_empty() {
            errors.push(FieldError { field: "description", message: "Description is required" });
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
