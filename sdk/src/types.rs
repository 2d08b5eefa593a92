//! Course catalog data model
//!
//! `CourseRecord` is one scheduled section as it appears in the schedule CSV.
//! `FieldKey` is the closed set of metadata keys the language model may filter on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::EngineError;

/// One scheduled course section. The CRN is the primary key.
///
/// Serialized with the schedule's column labels; this JSON is the document text
/// stored for every course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    #[serde(rename = "SUBJ")]
    pub subject: String,
    #[serde(rename = "CRSE NUM")]
    pub course_number: String,
    #[serde(rename = "SEC")]
    pub section: String,
    #[serde(rename = "CRN")]
    pub crn: String,
    #[serde(rename = "Schedule Type Code")]
    pub schedule_type_code: String,
    #[serde(rename = "Campus Code")]
    pub campus_code: String,
    #[serde(rename = "Title Short Desc")]
    pub title: String,
    #[serde(rename = "Instruction Mode Desc")]
    pub instruction_mode: String,
    #[serde(rename = "Meeting Type Codes")]
    pub meeting_type_codes: String,
    #[serde(rename = "Meet Days")]
    pub meet_days: String,
    #[serde(rename = "Begin Time")]
    pub begin_time: String,
    #[serde(rename = "End Time")]
    pub end_time: String,
    #[serde(rename = "Meet Start")]
    pub meet_start: String,
    #[serde(rename = "Meet End")]
    pub meet_end: String,
    #[serde(rename = "BLDG")]
    pub building: String,
    #[serde(rename = "RM")]
    pub room: String,
    #[serde(rename = "Actual Enrollment")]
    pub actual_enrollment: String,
    #[serde(rename = "Primary Instructor First Name")]
    pub instructor_first_name: String,
    #[serde(rename = "Primary Instructor Last Name")]
    pub instructor_last_name: String,
    #[serde(rename = "Primary Instructor Email")]
    pub instructor_email: String,
    #[serde(rename = "College")]
    pub college: String,
}

impl CourseRecord {
    /// Number of positional columns in a schedule row
    pub const COLUMN_COUNT: usize = 21;

    /// Build a record from a positional schedule row.
    ///
    /// Returns `None` for short rows, which are discarded during ingestion.
    pub fn from_row<S: AsRef<str>>(row: &[S]) -> Option<Self> {
        if row.len() < Self::COLUMN_COUNT {
            return None;
        }
        let col = |i: usize| row[i].as_ref().to_string();
        Some(Self {
            subject: col(0),
            course_number: col(1),
            section: col(2),
            crn: col(3),
            schedule_type_code: col(4),
            campus_code: col(5),
            title: col(6),
            instruction_mode: col(7),
            meeting_type_codes: col(8),
            meet_days: col(9),
            begin_time: col(10),
            end_time: col(11),
            meet_start: col(12),
            meet_end: col(13),
            building: col(14),
            room: col(15),
            actual_enrollment: col(16),
            instructor_first_name: col(17),
            instructor_last_name: col(18),
            instructor_email: col(19),
            college: col(20),
        })
    }

    /// "First Last", the canonical instructor name
    pub fn instructor_full_name(&self) -> String {
        format!("{} {}", self.instructor_first_name, self.instructor_last_name)
    }

    /// Value of a queryable field on this record
    pub fn field(&self, key: FieldKey) -> String {
        match key {
            FieldKey::Crn => self.crn.clone(),
            FieldKey::Subject => self.subject.clone(),
            FieldKey::CourseNumber => self.course_number.clone(),
            FieldKey::Section => self.section.clone(),
            FieldKey::TitleShortDesc => self.title.clone(),
            FieldKey::PrimaryInstructorEmail => self.instructor_email.clone(),
            FieldKey::College => self.college.clone(),
            FieldKey::MeetDays => self.meet_days.clone(),
            FieldKey::BeginTime => self.begin_time.clone(),
            FieldKey::EndTime => self.end_time.clone(),
            FieldKey::Building => self.building.clone(),
            FieldKey::Room => self.room.clone(),
            FieldKey::InstructorFirstName => self.instructor_first_name.clone(),
            FieldKey::InstructorLastName => self.instructor_last_name.clone(),
            FieldKey::InstructorFullName => self.instructor_full_name(),
        }
    }

    /// Metadata map stored alongside the course document, one entry per `FieldKey`
    pub fn metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        FieldKey::ALL
            .iter()
            .map(|key| (key.as_str().to_string(), self.field(*key).into()))
            .collect()
    }
}

/// Metadata keys the model may extract from user text.
///
/// `InstructorFullName` and `TitleShortDesc` are synthetic: their values are
/// fuzzy and get canonicalized against a reference collection before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldKey {
    #[serde(rename = "CRN")]
    Crn,
    Subject,
    CourseNumber,
    Section,
    TitleShortDesc,
    PrimaryInstructorEmail,
    College,
    MeetDays,
    BeginTime,
    EndTime,
    Building,
    Room,
    InstructorFirstName,
    InstructorLastName,
    InstructorFullName,
}

impl FieldKey {
    pub const ALL: [FieldKey; 15] = [
        FieldKey::Crn,
        FieldKey::Subject,
        FieldKey::CourseNumber,
        FieldKey::Section,
        FieldKey::TitleShortDesc,
        FieldKey::PrimaryInstructorEmail,
        FieldKey::College,
        FieldKey::MeetDays,
        FieldKey::BeginTime,
        FieldKey::EndTime,
        FieldKey::Building,
        FieldKey::Room,
        FieldKey::InstructorFirstName,
        FieldKey::InstructorLastName,
        FieldKey::InstructorFullName,
    ];

    /// Wire name used in tool arguments and store metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::Crn => "CRN",
            FieldKey::Subject => "Subject",
            FieldKey::CourseNumber => "CourseNumber",
            FieldKey::Section => "Section",
            FieldKey::TitleShortDesc => "TitleShortDesc",
            FieldKey::PrimaryInstructorEmail => "PrimaryInstructorEmail",
            FieldKey::College => "College",
            FieldKey::MeetDays => "MeetDays",
            FieldKey::BeginTime => "BeginTime",
            FieldKey::EndTime => "EndTime",
            FieldKey::Building => "Building",
            FieldKey::Room => "Room",
            FieldKey::InstructorFirstName => "InstructorFirstName",
            FieldKey::InstructorLastName => "InstructorLastName",
            FieldKey::InstructorFullName => "InstructorFullName",
        }
    }

    /// Human description advertised to the model in the tool schema
    pub fn description(&self) -> &'static str {
        match self {
            FieldKey::Crn => "Course Reference Number",
            FieldKey::Subject => "Subject code, e.g. CS",
            FieldKey::CourseNumber => "Course number, e.g. 272",
            FieldKey::Section => "Section number",
            FieldKey::TitleShortDesc => "The subject of the course. e.g. Bioinformatics",
            FieldKey::PrimaryInstructorEmail => "Email of the primary instructor",
            FieldKey::College => "Name of the college",
            FieldKey::MeetDays => "Days of the week when the course meets",
            FieldKey::BeginTime => "Start time of the course",
            FieldKey::EndTime => "End time of the course",
            FieldKey::Building => "Building where the course is held, e.g Lo Schiavo or LS",
            FieldKey::Room => "Room number where the course is held, e.g G12",
            FieldKey::InstructorFirstName => "First name of the instructor",
            FieldKey::InstructorLastName => "Last name of the instructor",
            FieldKey::InstructorFullName => "Full name of the instructor",
        }
    }

    /// True for the fuzzy keys resolved through a reference collection
    pub fn is_synthetic(&self) -> bool {
        matches!(self, FieldKey::InstructorFullName | FieldKey::TitleShortDesc)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| EngineError::UnknownField(s.to_string()))
    }
}
