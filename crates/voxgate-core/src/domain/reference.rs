//! Reference voice types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReferenceError;

/// Maximum length of a reference id, in characters.
pub const MAX_REFERENCE_ID_LEN: usize = 255;

/// A validated reference voice id.
///
/// Ids use letters, digits, hyphen, underscore and space, are 1 to 255
/// characters long, and are not whitespace-only. Because the id doubles as
/// a directory name in the filesystem store, the character set also rules
/// out path separators and `.`/`..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ReferenceId(String);

impl ReferenceId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, ReferenceError> {
        let id = raw.into();
        if id.trim().is_empty() {
            return Err(ReferenceError::InvalidId {
                id,
                reason: "reference id cannot be empty",
            });
        }
        if id.chars().count() > MAX_REFERENCE_ID_LEN {
            return Err(ReferenceError::InvalidId {
                id,
                reason: "reference id is longer than 255 characters",
            });
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' '))
        {
            return Err(ReferenceError::InvalidId {
                id,
                reason: "only letters, numbers, hyphens, underscores and spaces are allowed",
            });
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ReferenceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One conditioning sample: raw audio bytes plus the words spoken in it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceAudio {
    #[serde(with = "crate::wire::bytes")]
    pub audio: Vec<u8>,
    pub text: String,
}

impl fmt::Debug for ReferenceAudio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceAudio")
            .field("audio_len", &self.audio.len())
            .field("text", &self.text)
            .finish()
    }
}

/// Where a generation gets its voice conditioning from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReferenceSelector {
    /// No conditioning; the engine uses its default voice.
    #[default]
    None,
    /// Samples supplied inline with the request.
    Inline(Vec<ReferenceAudio>),
    /// A voice previously saved in the reference store.
    Saved(ReferenceId),
}

impl ReferenceSelector {
    pub const fn saved_id(&self) -> Option<&ReferenceId> {
        match self {
            Self::Saved(id) => Some(id),
            _ => None,
        }
    }
}
