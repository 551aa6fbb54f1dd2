//! Field-level access used by conditional upserts.

use super::types::Task;

/// Every patchable field of a [`Task`]. `id` is identity and never patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskField {
    Name,
    Url,
    OldPresentationId,
    OldPresentationName,
    OldPresentationVersion,
    NewPresentationId,
    NewPresentationName,
    NewPresentationVersion,
    Config,
    RealFiles,
    LeftFiles,
    TaskStatus,
    ConnectionStatus,
}

impl TaskField {
    pub const ALL: &'static [TaskField] = &[
        TaskField::Name,
        TaskField::Url,
        TaskField::OldPresentationId,
        TaskField::OldPresentationName,
        TaskField::OldPresentationVersion,
        TaskField::NewPresentationId,
        TaskField::NewPresentationName,
        TaskField::NewPresentationVersion,
        TaskField::Config,
        TaskField::RealFiles,
        TaskField::LeftFiles,
        TaskField::TaskStatus,
        TaskField::ConnectionStatus,
    ];

    /// The three `old*` fields.
    pub const OLD_PRESENTATION: &'static [TaskField] = &[
        TaskField::OldPresentationId,
        TaskField::OldPresentationName,
        TaskField::OldPresentationVersion,
    ];

    /// Whether `a` and `b` hold the same value for this field.
    pub fn equal(self, a: &Task, b: &Task) -> bool {
        match self {
            TaskField::Name => a.name == b.name,
            TaskField::Url => a.url == b.url,
            TaskField::OldPresentationId => a.old_presentation_id == b.old_presentation_id,
            TaskField::OldPresentationName => a.old_presentation_name == b.old_presentation_name,
            TaskField::OldPresentationVersion => {
                a.old_presentation_version == b.old_presentation_version
            }
            TaskField::NewPresentationId => a.new_presentation_id == b.new_presentation_id,
            TaskField::NewPresentationName => a.new_presentation_name == b.new_presentation_name,
            TaskField::NewPresentationVersion => {
                a.new_presentation_version == b.new_presentation_version
            }
            TaskField::Config => a.config == b.config,
            TaskField::RealFiles => a.real_files == b.real_files,
            TaskField::LeftFiles => a.left_files == b.left_files,
            TaskField::TaskStatus => a.task_status == b.task_status,
            TaskField::ConnectionStatus => a.connection_status == b.connection_status,
        }
    }

    /// Copy this field's value from `src` into `dst`.
    pub fn copy(self, dst: &mut Task, src: &Task) {
        match self {
            TaskField::Name => dst.name = src.name.clone(),
            TaskField::Url => dst.url = src.url.clone(),
            TaskField::OldPresentationId => {
                dst.old_presentation_id = src.old_presentation_id.clone()
            }
            TaskField::OldPresentationName => {
                dst.old_presentation_name = src.old_presentation_name.clone()
            }
            TaskField::OldPresentationVersion => {
                dst.old_presentation_version = src.old_presentation_version.clone()
            }
            TaskField::NewPresentationId => {
                dst.new_presentation_id = src.new_presentation_id.clone()
            }
            TaskField::NewPresentationName => {
                dst.new_presentation_name = src.new_presentation_name.clone()
            }
            TaskField::NewPresentationVersion => {
                dst.new_presentation_version = src.new_presentation_version.clone()
            }
            TaskField::Config => dst.config = src.config.clone(),
            TaskField::RealFiles => dst.real_files = src.real_files.clone(),
            TaskField::LeftFiles => dst.left_files = src.left_files.clone(),
            TaskField::TaskStatus => dst.task_status = src.task_status,
            TaskField::ConnectionStatus => dst.connection_status = src.connection_status,
        }
    }
}
