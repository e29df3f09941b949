//! Playlist and track identity types
use serde::{Deserialize, Serialize};

/// Identity of a playlist as known to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaylistRef {
    /// Backend playlist identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Owner display name, if the backend reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Cover image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl PlaylistRef {
    /// Create a playlist reference with just an id and name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner: None,
            image_url: None,
        }
    }
}

/// Lightweight description of a track inside a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSummary {
    /// Backend track identifier
    pub id: String,
    /// Track title
    pub name: String,
    /// Artist names in credit order
    #[serde(default)]
    pub artists: Vec<String>,
    /// Popularity on the external platform (0-100)
    #[serde(default)]
    pub popularity: u8,
}

impl TrackSummary {
    /// Create a track summary
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        artists: Vec<String>,
        popularity: u8,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            artists,
            popularity,
        }
    }
}
