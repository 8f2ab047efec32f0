//! Playable game references and stand-in executable resolution.

use serde::{Deserialize, Serialize};

/// Characters that are illegal in a Windows file name.
///
/// Path separators are not listed so relative sub-paths such as
/// `win64/game.exe` survive sanitization.
pub const RESERVED_FILENAME_CHARS: &[char] = &[':', '*', '?', '"', '<', '>', '|'];

/// A platform-specific executable entry from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Executable {
    /// Catalog OS key (`win32`, `darwin`, `linux`).
    pub os: String,
    /// Executable path relative to the game folder.
    pub name: String,
}

/// A playable entry from the catalog or the custom game list.
///
/// Several references may share one `id` when the user saved a renamed copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GameRef {
    /// Stable catalog identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Icon hash on the icon CDN.
    #[serde(default)]
    pub icon: Option<String>,
    /// Known executables per platform.
    #[serde(default)]
    pub executables: Option<Vec<Executable>>,
}

impl GameRef {
    /// Build a reference with no icon or executables.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon: None,
            executables: None,
        }
    }

    /// Catalog executable for `platform`, if any.
    #[must_use]
    pub fn executable_for(&self, platform: &str) -> Option<&str> {
        self.executables
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|exe| exe.os == platform)
            .map(|exe| exe.name.as_str())
    }

    /// Stand-in executable name for `platform`, sanitized for the file system.
    ///
    /// Falls back to `<name>.exe` when the catalog has no entry for the platform.
    #[must_use]
    pub fn resolve_executable(&self, platform: &str) -> String {
        let raw = self
            .executable_for(platform)
            .map_or_else(|| format!("{}.exe", self.name), str::to_owned);
        sanitize_executable_name(&raw)
    }

    /// Icon URL on `cdn`, if the game has an icon.
    #[must_use]
    pub fn icon_url(&self, cdn: &str) -> Option<String> {
        self.icon
            .as_deref()
            .filter(|hash| !hash.is_empty())
            .map(|hash| icon_url(cdn, &self.id, hash))
    }
}

/// Strip [`RESERVED_FILENAME_CHARS`] while keeping `/` and `\`.
#[must_use]
pub fn sanitize_executable_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| !RESERVED_FILENAME_CHARS.contains(c))
        .collect()
}

/// `<cdn>/<id>/<icon>.png?size=64`
#[must_use]
pub fn icon_url(cdn: &str, id: &str, icon: &str) -> String {
    format!("{}/{id}/{icon}.png?size=64", cdn.trim_end_matches('/'))
}
