use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ReminderTone {
    Gentle,
    Firm,
}

impl Default for ReminderTone {
    fn default() -> Self {
        ReminderTone::Gentle
    }
}

/// A saved focus length offered next to the profile's default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusPreset {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub minutes: u32,
    pub label: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tone: ReminderTone,
    pub morning_hour: u32,
    pub afternoon_hour: u32,
    pub evening_hour: u32,
    pub default_focus_minutes: u32,
    pub default_mantra: String,
    /// While a focus session runs, new captures land in the session's dump.
    pub route_captures_to_focus_dump: bool,
    #[serde(default)]
    pub focus_presets: Vec<FocusPreset>,
}

impl UserProfile {
    pub const DEFAULT_MORNING_HOUR: u32 = 9;
    pub const DEFAULT_AFTERNOON_HOUR: u32 = 13;
    pub const DEFAULT_EVENING_HOUR: u32 = 19;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
            tone: ReminderTone::Gentle,
            morning_hour: Self::DEFAULT_MORNING_HOUR,
            afternoon_hour: Self::DEFAULT_AFTERNOON_HOUR,
            evening_hour: Self::DEFAULT_EVENING_HOUR,
            default_focus_minutes: 45,
            default_mantra: "I am here now.".into(),
            route_captures_to_focus_dump: true,
            focus_presets: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("profile name is required");
        }
        for (field, hour) in [
            ("morningHour", self.morning_hour),
            ("afternoonHour", self.afternoon_hour),
            ("eveningHour", self.evening_hour),
        ] {
            if hour > 23 {
                bail!("{field} must be between 0 and 23, got {hour}");
            }
        }
        if self.default_focus_minutes == 0 {
            bail!("defaultFocusMinutes must be greater than zero");
        }
        if let Some(preset) = self.focus_presets.iter().find(|p| p.minutes == 0) {
            bail!("focus preset {} must be longer than zero minutes", preset.id);
        }
        Ok(())
    }

    /// Presets ordered by `sort_order`, then creation time.
    pub fn sorted_presets(&self) -> Vec<FocusPreset> {
        let mut presets = self.focus_presets.clone();
        presets.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        presets
    }

    fn next_sort_order(&self) -> i64 {
        self.focus_presets
            .iter()
            .map(|p| p.sort_order)
            .max()
            .map_or(1, |max| max + 1)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileData {
    profiles: Vec<UserProfile>,
    active_profile_id: Option<String>,
}

/// `profiles.json` -> `profiles.json.bak`.
fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

/// JSON-file backed profile list with an active-profile pointer.
pub struct ProfileStore {
    path: PathBuf,
    data: RwLock<ProfileData>,
}

impl ProfileStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read profiles from {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(data) => data,
                Err(err) => {
                    let backup = backup_path(&path);
                    fs::rename(&path, &backup).with_context(|| {
                        format!("Failed to move unreadable profiles to {}", backup.display())
                    })?;
                    log::warn!(
                        "Unreadable profiles file {} moved to {}: {err}",
                        path.display(),
                        backup.display()
                    );
                    ProfileData::default()
                }
            }
        } else {
            ProfileData::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Creates "Me" when there are no profiles, or activates the first one
    /// when nothing is active.
    pub fn ensure_default_profile(&self) -> Result<UserProfile> {
        let mut guard = self.write()?;

        if guard.profiles.is_empty() {
            let profile = UserProfile::new("Me");
            guard.active_profile_id = Some(profile.id.clone());
            guard.profiles.push(profile);
            self.persist(&guard)?;
        } else if active_in(&guard).is_none() {
            let first = guard.profiles.first().map(|p| p.id.clone());
            guard.active_profile_id = first;
            self.persist(&guard)?;
        }

        active_in(&guard)
            .cloned()
            .ok_or_else(|| anyhow!("no active profile after ensuring default"))
    }

    pub fn active_profile(&self) -> Option<UserProfile> {
        let guard = self.data.read().ok()?;
        active_in(&guard).cloned()
    }

    pub fn profiles(&self) -> Vec<UserProfile> {
        self.data
            .read()
            .map(|guard| guard.profiles.clone())
            .unwrap_or_default()
    }

    pub fn upsert_profile(&self, profile: UserProfile) -> Result<UserProfile> {
        profile.validate()?;

        let mut guard = self.write()?;
        match guard.profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile.clone(),
            None => guard.profiles.push(profile.clone()),
        }
        if guard.active_profile_id.is_none() {
            guard.active_profile_id = Some(profile.id.clone());
        }
        self.persist(&guard)?;
        Ok(profile)
    }

    pub fn set_active_profile(&self, profile_id: &str) -> Result<()> {
        let mut guard = self.write()?;
        if !guard.profiles.iter().any(|p| p.id == profile_id) {
            bail!("profile {profile_id} not found");
        }
        guard.active_profile_id = Some(profile_id.to_string());
        self.persist(&guard)
    }

    pub fn delete_profile(&self, profile_id: &str) -> Result<()> {
        let mut guard = self.write()?;
        if !guard.profiles.iter().any(|p| p.id == profile_id) {
            bail!("profile {profile_id} not found");
        }
        if guard.profiles.len() == 1 {
            bail!("cannot delete the last profile");
        }

        guard.profiles.retain(|p| p.id != profile_id);
        if guard.active_profile_id.as_deref() == Some(profile_id) {
            let first = guard.profiles.first().map(|p| p.id.clone());
            guard.active_profile_id = first;
        }
        self.persist(&guard)
    }

    pub fn presets(&self, profile_id: &str) -> Result<Vec<FocusPreset>> {
        let guard = self
            .data
            .read()
            .map_err(|_| anyhow!("profile store lock poisoned"))?;
        let profile = guard
            .profiles
            .iter()
            .find(|p| p.id == profile_id)
            .ok_or_else(|| anyhow!("profile {profile_id} not found"))?;
        Ok(profile.sorted_presets())
    }

    /// Appends a preset after the profile's last one. A blank label becomes
    /// "{minutes} min".
    pub fn add_preset(&self, profile_id: &str, minutes: u32, label: &str) -> Result<FocusPreset> {
        if minutes == 0 {
            bail!("focus preset must be longer than zero minutes");
        }

        let mut guard = self.write()?;
        let profile = guard
            .profiles
            .iter_mut()
            .find(|p| p.id == profile_id)
            .ok_or_else(|| anyhow!("profile {profile_id} not found"))?;

        let label = label.trim();
        let preset = FocusPreset {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            minutes,
            label: if label.is_empty() {
                format!("{minutes} min")
            } else {
                label.to_string()
            },
            sort_order: profile.next_sort_order(),
        };
        profile.focus_presets.push(preset.clone());
        self.persist(&guard)?;
        Ok(preset)
    }

    pub fn remove_preset(&self, profile_id: &str, preset_id: &str) -> Result<()> {
        let mut guard = self.write()?;
        let profile = guard
            .profiles
            .iter_mut()
            .find(|p| p.id == profile_id)
            .ok_or_else(|| anyhow!("profile {profile_id} not found"))?;

        let before = profile.focus_presets.len();
        profile.focus_presets.retain(|p| p.id != preset_id);
        if profile.focus_presets.len() == before {
            bail!("focus preset {preset_id} not found");
        }
        self.persist(&guard)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, ProfileData>> {
        self.data
            .write()
            .map_err(|_| anyhow!("profile store lock poisoned"))
    }

    fn persist(&self, data: &ProfileData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write profiles to {}", self.path.display()))
    }
}

fn active_in(data: &ProfileData) -> Option<&UserProfile> {
    let id = data.active_profile_id.as_deref()?;
    data.profiles.iter().find(|p| p.id == id)
}
