//! Building task records from a presentation definition and a device list.
//!
//! A presentation lists screens (storage file plus optional logical name) and one
//! display duration per screen. Every device gets its own [`Task`] carrying the same
//! config; screens without a logical name get one derived from the media file.

pub mod file_name;

use serde::Deserialize;
use thiserror::Error;

use crate::media::{MediaError, MediaLibrary};
use crate::task::{PresentationConfig, Task, CONNECTION_UNCHECKED, TASK_STATUS_UNTOUCHED};

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("presentation {0} must not be empty")]
    MissingField(&'static str),
    #[error("presentation has no screens")]
    NoScreens,
    #[error("{durations} durations for {screens} screens")]
    DurationMismatch { durations: usize, screens: usize },
    #[error("no devices given")]
    NoDevices,
    #[error("device #{index} needs a non-empty id, name and url")]
    IncompleteDevice { index: usize },
    #[error("media file {0} has no extension")]
    NoExtension(String),
    #[error("unsupported media format {0}")]
    UnsupportedFormat(String),
    #[error("media file name {0} contains no numeric id")]
    NoMediaId(String),
    #[error("media file {0} is empty")]
    EmptyMedia(String),
    #[error(transparent)]
    Media(#[from] MediaError),
}

/// One slide: storage file and the name the device should know it by.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Screen {
    /// Path relative to the media root.
    pub file: String,
    /// Logical name; derived from `file` when empty.
    pub file_name: String,
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Presentation {
    pub id: String,
    pub name: String,
    pub version: String,
    pub duration: Vec<u32>,
    pub screens: Vec<Screen>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// Validate `presentation` and build the device-independent part of its tasks.
pub async fn prepare_sample(
    presentation: &Presentation,
    media: &MediaLibrary,
) -> Result<Task, PrepareError> {
    for (value, field) in [
        (&presentation.id, "id"),
        (&presentation.name, "name"),
        (&presentation.version, "version"),
    ] {
        if value.is_empty() {
            return Err(PrepareError::MissingField(field));
        }
    }
    if presentation.screens.is_empty() {
        return Err(PrepareError::NoScreens);
    }
    if presentation.duration.len() != presentation.screens.len() {
        return Err(PrepareError::DurationMismatch {
            durations: presentation.duration.len(),
            screens: presentation.screens.len(),
        });
    }

    let mut files = Vec::with_capacity(presentation.screens.len());
    let mut real_files = Vec::with_capacity(presentation.screens.len());
    for (i, screen) in presentation.screens.iter().enumerate() {
        let name = if screen.file_name.is_empty() {
            let size = media.file_size(&screen.file).await?;
            let derived = file_name::logical_file_name(&screen.file, size)?;
            tracing::debug!(screen = i, file = %screen.file, name = %derived, "derived file name");
            derived
        } else {
            screen.file_name.clone()
        };
        files.push(name);
        real_files.push(screen.file.clone());
    }

    Ok(Task {
        new_presentation_id: presentation.id.clone(),
        new_presentation_name: presentation.name.clone(),
        new_presentation_version: presentation.version.clone(),
        config: Some(PresentationConfig {
            file: files,
            duration: presentation.duration.clone(),
        }),
        real_files,
        ..Task::default()
    })
}

/// One task per device from a prepared sample. Fails on the first incomplete device.
pub fn tasks_for_devices(sample: &Task, devices: &[Device]) -> Result<Vec<Task>, PrepareError> {
    if devices.is_empty() {
        return Err(PrepareError::NoDevices);
    }
    devices
        .iter()
        .enumerate()
        .map(|(index, d)| {
            if d.id.is_empty() || d.name.is_empty() || d.url.is_empty() {
                return Err(PrepareError::IncompleteDevice { index });
            }
            Ok(Task {
                id: d.id.clone(),
                name: d.name.clone(),
                url: d.url.clone(),
                left_files: Vec::new(),
                task_status: TASK_STATUS_UNTOUCHED,
                connection_status: CONNECTION_UNCHECKED,
                ..sample.clone()
            })
        })
        .collect()
}

/// [`prepare_sample`] followed by [`tasks_for_devices`].
pub async fn prepare_tasks(
    presentation: &Presentation,
    devices: &[Device],
    media: &MediaLibrary,
) -> Result<Vec<Task>, PrepareError> {
    let sample = prepare_sample(presentation, media).await?;
    tasks_for_devices(&sample, devices)
}
