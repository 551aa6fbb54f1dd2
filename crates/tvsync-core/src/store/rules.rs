//! Conditional upsert rules.
//!
//! A rule list is evaluated top to bottom against `(previous, candidate)`; the first
//! matching [`Condition`] selects the [`FieldPatch`] that decides which fields of the
//! candidate overwrite the stored record.

use crate::task::{Task, TaskField};

/// When a rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// No record exists yet.
    NewRecord,
    /// A record exists and every listed field equals the candidate's.
    FieldsEqual(&'static [TaskField]),
    /// A record exists.
    Always,
}

/// Which candidate fields are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPatch {
    /// The candidate replaces the record.
    All,
    /// Every field except these; the listed ones keep their stored values.
    AllExcept(&'static [TaskField]),
    /// Only these fields.
    OnlySet(&'static [TaskField]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertRule {
    pub condition: Condition,
    pub patch: FieldPatch,
}

impl UpsertRule {
    pub const fn new(condition: Condition, patch: FieldPatch) -> Self {
        Self { condition, patch }
    }
}

impl Condition {
    pub fn matches(&self, previous: Option<&Task>, candidate: &Task) -> bool {
        match (self, previous) {
            (Condition::NewRecord, prev) => prev.is_none(),
            (Condition::FieldsEqual(fields), Some(prev)) => {
                fields.iter().all(|f| f.equal(prev, candidate))
            }
            (Condition::Always, Some(_)) => true,
            (_, None) => false,
        }
    }
}

impl FieldPatch {
    fn writes(&self, field: TaskField) -> bool {
        match self {
            FieldPatch::All => true,
            FieldPatch::AllExcept(kept) => !kept.contains(&field),
            FieldPatch::OnlySet(written) => written.contains(&field),
        }
    }

    /// Merge `candidate` into `previous` (or start from the candidate for a new record).
    pub fn apply(&self, previous: Option<&Task>, candidate: &Task) -> Task {
        let Some(prev) = previous else {
            return candidate.clone();
        };
        let mut out = prev.clone();
        for &field in TaskField::ALL {
            if self.writes(field) {
                field.copy(&mut out, candidate);
            }
        }
        out
    }
}

/// Evaluate `rules` and return the record to store, or `None` if no rule matched.
pub fn evaluate(previous: Option<&Task>, candidate: &Task, rules: &[UpsertRule]) -> Option<Task> {
    rules
        .iter()
        .find(|r| r.condition.matches(previous, candidate))
        .map(|r| r.patch.apply(previous, candidate))
}

const PRESENTATION_KEY: &[TaskField] = &[
    TaskField::Url,
    TaskField::NewPresentationId,
    TaskField::NewPresentationVersion,
];

const URL_ONLY: &[TaskField] = &[TaskField::Url];

const ASSIGNMENT_RESENT_KEEP: &[TaskField] = &[
    TaskField::OldPresentationId,
    TaskField::OldPresentationName,
    TaskField::OldPresentationVersion,
    TaskField::LeftFiles,
    TaskField::TaskStatus,
    TaskField::ConnectionStatus,
];

const ASSIGNMENT_CHANGED_KEEP: &[TaskField] = &[
    TaskField::OldPresentationId,
    TaskField::OldPresentationName,
    TaskField::OldPresentationVersion,
    TaskField::ConnectionStatus,
];

const CONFIG_SENT_WRITES: &[TaskField] = &[
    TaskField::OldPresentationId,
    TaskField::OldPresentationName,
    TaskField::OldPresentationVersion,
    TaskField::LeftFiles,
    TaskField::TaskStatus,
    TaskField::ConnectionStatus,
];

const FILE_SENT_WRITES: &[TaskField] = &[
    TaskField::LeftFiles,
    TaskField::TaskStatus,
    TaskField::ConnectionStatus,
];

const CONNECTION_ONLY: &[TaskField] = &[TaskField::ConnectionStatus];

/// Operator (re)assigns a presentation. New devices are created; a re-sent identical
/// assignment keeps delivery progress; a different presentation resets the queue and
/// progress but keeps what the device last accepted.
pub const ASSIGNMENT_RULES: &[UpsertRule] = &[
    UpsertRule::new(Condition::NewRecord, FieldPatch::All),
    UpsertRule::new(
        Condition::FieldsEqual(PRESENTATION_KEY),
        FieldPatch::AllExcept(ASSIGNMENT_RESENT_KEEP),
    ),
    UpsertRule::new(Condition::Always, FieldPatch::AllExcept(ASSIGNMENT_CHANGED_KEEP)),
];

/// Device accepted a config. Only recorded if the assignment and address are still the
/// ones the config was built from; otherwise only the connection outcome survives.
pub const CONFIG_SENT_RULES: &[UpsertRule] = &[
    UpsertRule::new(
        Condition::FieldsEqual(PRESENTATION_KEY),
        FieldPatch::OnlySet(CONFIG_SENT_WRITES),
    ),
    UpsertRule::new(Condition::FieldsEqual(URL_ONLY), FieldPatch::OnlySet(CONNECTION_ONLY)),
    UpsertRule::new(Condition::Always, FieldPatch::OnlySet(&[])),
];

/// Device acknowledged a file chunk.
pub const FILE_SENT_RULES: &[UpsertRule] = &[
    UpsertRule::new(
        Condition::FieldsEqual(PRESENTATION_KEY),
        FieldPatch::OnlySet(FILE_SENT_WRITES),
    ),
    UpsertRule::new(Condition::FieldsEqual(URL_ONLY), FieldPatch::OnlySet(CONNECTION_ONLY)),
    UpsertRule::new(Condition::Always, FieldPatch::OnlySet(&[])),
];

/// Probe result or transport failure: only the failure counter moves.
pub const CONNECTION_STATUS_RULES: &[UpsertRule] = &[UpsertRule::new(
    Condition::Always,
    FieldPatch::OnlySet(CONNECTION_ONLY),
)];
