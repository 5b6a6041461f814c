//! Records the statistics are computed from, and their groupable fields.

use super::aggregation::Groupable;
use crate::types::Bag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Vocabularies
// ============================================================================

/// Application status codes with display names.
pub const APPLICATION_STATUSES: &[(&str, &str)] = &[
    ("P", "Under review"),
    ("R", "Wait listed"),
    ("I", "Invited"),
    ("LR", "Last reminder"),
    ("C", "Confirmed"),
    ("X", "Cancelled"),
    ("A", "Attended"),
    ("E", "Expired"),
    ("D", "Dubious"),
    ("IV", "Invalid"),
];

/// Status code of applicants who confirmed.
pub const STATUS_CONFIRMED: &str = "C";
/// Status code of applicants who showed up.
pub const STATUS_ATTENDED: &str = "A";

const GENDERS: &[(&str, &str)] = &[
    ("NA", "Prefer not to answer"),
    ("M", "Male"),
    ("F", "Female"),
    ("NB", "Non-binary"),
    ("X", "Prefer to self-describe"),
];

const CLASS_STATUSES: &[(&str, &str)] = &[
    ("HS", "High school"),
    ("1", "First year"),
    ("2", "Second year"),
    ("3", "Third year"),
    ("4", "Fourth year"),
    ("5", "Fifth year or more"),
    ("M", "Master"),
    ("PHD", "PhD"),
    ("G", "Graduated"),
];

const TSHIRT_SIZES: &[(&str, &str)] = &[
    ("XS", "Unisex - XS"),
    ("S", "Unisex - S"),
    ("M", "Unisex - M"),
    ("L", "Unisex - L"),
    ("XL", "Unisex - XL"),
    ("XXL", "Unisex - XXL"),
];

const DIETS: &[(&str, &str)] = &[
    ("None", "No requirements"),
    ("Vegeterian", "Vegeterian"),
    ("Vegan", "Vegan"),
    ("No pork", "No pork"),
    ("Gluten-free", "Gluten-free"),
    ("Others", "Others"),
];

const ATTENDANCE_TYPES: &[(&str, &str)] = &[
    ("O", "Online"),
    ("P", "In person"),
    ("H", "Hybrid"),
];

const FIRST_TIMER: &[(&str, &str)] = &[("true", "First hackathon"), ("false", "Returning hacker")];

/// Reimbursement status codes with display names.
pub const REIMBURSEMENT_STATUSES: &[(&str, &str)] = &[
    ("D", "Draft"),
    ("PS", "Pending submission"),
    ("PV", "Pending validation"),
    ("A", "Accepted"),
    ("X", "Rejected"),
    ("F", "Friend submission"),
    ("E", "Expired"),
];

/// Reimbursement status code of unsent drafts.
pub const REIMBURSEMENT_DRAFT: &str = "D";

/// Find the display name for a code.
#[must_use]
pub fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table
        .iter()
        .find_map(|(code, name)| (*code == key).then_some(*name))
}

// ============================================================================
// Applications
// ============================================================================

/// Kind of application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationKind {
    /// Hacker
    Hacker,
    /// Mentor
    Mentor,
    /// Volunteer
    Volunteer,
}

impl ApplicationKind {
    /// Single-letter storage code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Hacker => "H",
            Self::Mentor => "M",
            Self::Volunteer => "V",
        }
    }

    /// Parse a storage code (unknown codes are treated as hackers).
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "M" => Self::Mentor,
            "V" => Self::Volunteer,
            _ => Self::Hacker,
        }
    }
}

/// A submitted application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    /// Status code (see [`APPLICATION_STATUSES`])
    pub status: String,
    /// Hacker, mentor or volunteer
    pub kind: ApplicationKind,
    /// Gender code
    pub gender: Option<String>,
    /// Class standing code
    pub class_status: Option<String>,
    /// Degree or major (free text)
    pub degree: Option<String>,
    /// T-shirt size code
    pub tshirt_size: Option<String>,
    /// Diet code
    pub diet: Option<String>,
    /// Diet details when `diet` is "Others"
    pub other_diet: Option<String>,
    /// Hardware the applicant asked for
    pub hardware: Option<String>,
    /// How they heard about the event
    pub hear_about: Option<String>,
    /// Attendance type code
    pub attendance_type: Option<String>,
    /// First hackathon
    pub first_timer: bool,
    /// Submission time
    pub submitted_at: DateTime<Utc>,
}

impl ApplicationRecord {
    /// Minimal record with the given status; everything else empty.
    #[must_use]
    pub fn with_status(status: impl Into<String>, submitted_at: DateTime<Utc>) -> Self {
        Self {
            status: status.into(),
            kind: ApplicationKind::Hacker,
            gender: None,
            class_status: None,
            degree: None,
            tshirt_size: None,
            diet: None,
            other_diet: None,
            hardware: None,
            hear_about: None,
            attendance_type: None,
            first_timer: false,
            submitted_at,
        }
    }

    /// Confirmed and not yet checked in.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.status == STATUS_CONFIRMED
    }

    /// Showed up.
    #[must_use]
    pub fn has_attended(&self) -> bool {
        self.status == STATUS_ATTENDED
    }

    /// Not a mentor.
    #[must_use]
    pub fn is_not_mentor(&self) -> bool {
        self.kind != ApplicationKind::Mentor
    }
}

/// Groupable fields of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationField {
    /// Status code
    Status,
    /// Gender code
    Gender,
    /// Class standing code
    ClassStatus,
    /// Degree or major
    Degree,
    /// T-shirt size
    TshirtSize,
    /// Diet code
    Diet,
    /// Diet free text
    OtherDiet,
    /// Hardware free text
    Hardware,
    /// Acquisition channel
    HearAbout,
    /// Attendance type code
    AttendanceType,
    /// `true` / `false`
    FirstTimer,
    /// Submission day (`YYYY-MM-DD`)
    SubmissionDate,
}

impl Groupable for ApplicationRecord {
    type Field = ApplicationField;

    fn key(&self, field: ApplicationField) -> Option<String> {
        match field {
            ApplicationField::Status => Some(self.status.clone()),
            ApplicationField::Gender => self.gender.clone(),
            ApplicationField::ClassStatus => self.class_status.clone(),
            ApplicationField::Degree => self.degree.clone(),
            ApplicationField::TshirtSize => self.tshirt_size.clone(),
            ApplicationField::Diet => self.diet.clone(),
            ApplicationField::OtherDiet => self.other_diet.clone(),
            ApplicationField::Hardware => self.hardware.clone(),
            ApplicationField::HearAbout => self.hear_about.clone(),
            ApplicationField::AttendanceType => self.attendance_type.clone(),
            ApplicationField::FirstTimer => Some(self.first_timer.to_string()),
            ApplicationField::SubmissionDate => {
                Some(self.submitted_at.date_naive().format("%Y-%m-%d").to_string())
            },
        }
    }

    fn label(field: ApplicationField, key: &str) -> Option<&'static str> {
        match field {
            ApplicationField::Status => lookup(APPLICATION_STATUSES, key),
            ApplicationField::Gender => lookup(GENDERS, key),
            ApplicationField::ClassStatus => lookup(CLASS_STATUSES, key),
            ApplicationField::TshirtSize => lookup(TSHIRT_SIZES, key),
            ApplicationField::Diet => lookup(DIETS, key),
            ApplicationField::AttendanceType => lookup(ATTENDANCE_TYPES, key),
            ApplicationField::FirstTimer => lookup(FIRST_TIMER, key),
            ApplicationField::Degree
            | ApplicationField::OtherDiet
            | ApplicationField::Hardware
            | ApplicationField::HearAbout
            | ApplicationField::SubmissionDate => None,
        }
    }
}

// ============================================================================
// Reimbursements
// ============================================================================

/// A travel reimbursement. Amounts are in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReimbursementRecord {
    /// Status code (see [`REIMBURSEMENT_STATUSES`])
    pub status: String,
    /// Amount finally assigned
    pub final_amount: Option<i64>,
    /// Maximum amount the applicant may receive
    pub max_amount: Option<i64>,
}

impl ReimbursementRecord {
    /// Still an unsent draft.
    #[must_use]
    pub fn is_draft(&self) -> bool {
        self.status == REIMBURSEMENT_DRAFT
    }
}

/// Groupable fields of a reimbursement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReimbursementField {
    /// Status code
    Status,
    /// Assigned amount (sum only)
    FinalAmount,
    /// Maximum amount (sum only)
    MaxAmount,
}

impl Groupable for ReimbursementRecord {
    type Field = ReimbursementField;

    fn key(&self, field: ReimbursementField) -> Option<String> {
        match field {
            ReimbursementField::Status => Some(self.status.clone()),
            ReimbursementField::FinalAmount => self.final_amount.map(|a| a.to_string()),
            ReimbursementField::MaxAmount => self.max_amount.map(|a| a.to_string()),
        }
    }

    fn amount(&self, field: ReimbursementField) -> Option<i64> {
        match field {
            ReimbursementField::FinalAmount => self.final_amount,
            ReimbursementField::MaxAmount => self.max_amount,
            ReimbursementField::Status => None,
        }
    }

    fn label(field: ReimbursementField, key: &str) -> Option<&'static str> {
        match field {
            ReimbursementField::Status => lookup(REIMBURSEMENT_STATUSES, key),
            ReimbursementField::FinalAmount | ReimbursementField::MaxAmount => None,
        }
    }
}

// ============================================================================
// Workshops
// ============================================================================

/// A scheduled workshop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopRecord {
    /// Workshop id
    pub id: i64,
    /// Title
    pub title: String,
}

/// One attendee scanned into a workshop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Workshop attended
    pub workshop_id: i64,
}

/// Groupable fields of an attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceField {
    /// Workshop id
    Workshop,
}

impl Groupable for AttendanceRecord {
    type Field = AttendanceField;

    fn key(&self, field: AttendanceField) -> Option<String> {
        match field {
            AttendanceField::Workshop => Some(self.workshop_id.to_string()),
        }
    }
}

// ============================================================================
// Bags
// ============================================================================

/// Groupable fields of a bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BagField {
    /// `A` / `R`
    Status,
    /// Room name (`null` for special bags)
    Room,
    /// Free-text type
    Category,
}

impl Groupable for Bag {
    type Field = BagField;

    fn key(&self, field: BagField) -> Option<String> {
        match field {
            BagField::Status => Some(self.status.code().to_string()),
            BagField::Room => self.position.room().map(ToString::to_string),
            BagField::Category => Some(self.category.clone()),
        }
    }

    fn label(field: BagField, key: &str) -> Option<&'static str> {
        match field {
            BagField::Status => crate::types::BagStatus::from_code(key).map(|s| s.label()),
            BagField::Room | BagField::Category => None,
        }
    }
}
