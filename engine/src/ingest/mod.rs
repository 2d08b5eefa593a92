//! Course schedule ingestion
//!
//! Loads the registrar's schedule CSV into the store:
//! - one course document per CRN, with queryable metadata
//! - one instructor reference record per distinct full name
//! - one subject reference record per distinct course title
//!
//! Records are written in batches. With `reset`, all three collections are
//! dropped and recreated first.

use crate::store::{CatalogCollections, Record};
use sdk::errors::EngineError;
use sdk::CourseRecord;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Counts reported after a load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub courses: usize,
    pub instructors: usize,
    pub subjects: usize,
    pub skipped_rows: usize,
}

/// Parsed schedule rows plus the number of rows that were too short
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    pub courses: Vec<CourseRecord>,
    pub skipped_rows: usize,
}

/// Reads a schedule CSV from disk
pub fn read_courses_from_csv(path: &Path) -> Result<Schedule, EngineError> {
    let file = std::fs::File::open(path).map_err(|e| {
        EngineError::Ingest(format!("failed to open {}: {}", path.display(), e))
    })?;
    read_courses(file)
}

/// Reads schedule rows. The first row is the header; shorter rows are skipped.
pub fn read_courses<R: Read>(reader: R) -> Result<Schedule, EngineError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let header_len = csv_reader
        .headers()
        .map_err(|e| EngineError::Ingest(format!("failed to read CSV header: {}", e)))?
        .len();

    let mut schedule = Schedule::default();
    for (line, row) in csv_reader.records().enumerate() {
        let row = row.map_err(|e| EngineError::Ingest(format!("bad CSV row {}: {}", line + 2, e)))?;
        let fields: Vec<&str> = row.iter().collect();

        let record = if fields.len() < header_len {
            None
        } else {
            CourseRecord::from_row(&fields)
        };

        match record {
            Some(course) => schedule.courses.push(course),
            None => {
                debug!("Skipping short row {} ({} fields)", line + 2, fields.len());
                schedule.skipped_rows += 1;
            }
        }
    }

    Ok(schedule)
}

/// Course documents keyed by CRN. A repeated CRN keeps its last row.
pub fn course_records(courses: &[CourseRecord]) -> Result<Vec<Record>, EngineError> {
    let mut records: Vec<Record> = Vec::with_capacity(courses.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for course in courses {
        let document = serde_json::to_string(course)
            .map_err(|e| EngineError::Ingest(format!("failed to encode course: {}", e)))?;
        let record = Record::new(course.crn.clone(), document).with_metadata(course.metadata());

        match positions.get(&course.crn) {
            Some(&i) => {
                warn!("Duplicate CRN {}, keeping the later row", course.crn);
                records[i] = record;
            }
            None => {
                positions.insert(course.crn.clone(), records.len());
                records.push(record);
            }
        }
    }

    Ok(records)
}

/// Distinct values in first-seen order, as `document = id = text` records
fn distinct_records<I: IntoIterator<Item = String>>(values: I) -> Vec<Record> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| !v.trim().is_empty())
        .filter(|v| seen.insert(v.clone()))
        .map(|v| Record::new(v.clone(), v))
        .collect()
}

pub fn instructor_records(courses: &[CourseRecord]) -> Vec<Record> {
    distinct_records(courses.iter().map(CourseRecord::instructor_full_name))
}

pub fn subject_records(courses: &[CourseRecord]) -> Vec<Record> {
    distinct_records(courses.iter().map(|c| c.title.clone()))
}

/// Drops and recreates all three collections
pub async fn reset_collections(collections: &CatalogCollections) -> Result<(), EngineError> {
    for name in collections.names() {
        collections.store().delete_collection(name).await?;
    }
    info!("Deleted collections");

    create_collections(collections).await?;
    info!("Created collections");
    Ok(())
}

/// Creates any of the three collections that are missing
pub async fn create_collections(collections: &CatalogCollections) -> Result<(), EngineError> {
    for name in collections.names() {
        collections.store().create_collection(name).await?;
    }
    Ok(())
}

async fn upsert_batched(
    collections: &CatalogCollections,
    collection: &str,
    records: &[Record],
    batch_size: usize,
) -> Result<(), EngineError> {
    for (i, batch) in records.chunks(batch_size.max(1)).enumerate() {
        collections.store().upsert(collection, batch).await?;
        debug!(
            "Wrote batch {} ({} records) into '{}'",
            i + 1,
            batch.len(),
            collection
        );
    }
    Ok(())
}

/// Writes courses and both reference sets
pub async fn load_schedule(
    collections: &CatalogCollections,
    schedule: &Schedule,
    batch_size: usize,
) -> Result<IngestReport, EngineError> {
    let courses = course_records(&schedule.courses)?;
    let instructors = instructor_records(&schedule.courses);
    let subjects = subject_records(&schedule.courses);

    upsert_batched(collections, &collections.courses, &courses, batch_size).await?;
    info!("Added {} courses to '{}'", courses.len(), collections.courses);

    upsert_batched(collections, &collections.instructors, &instructors, batch_size).await?;
    info!(
        "Added {} instructors to '{}'",
        instructors.len(),
        collections.instructors
    );

    upsert_batched(collections, &collections.subjects, &subjects, batch_size).await?;
    info!("Added {} subjects to '{}'", subjects.len(), collections.subjects);

    Ok(IngestReport {
        courses: courses.len(),
        instructors: instructors.len(),
        subjects: subjects.len(),
        skipped_rows: schedule.skipped_rows,
    })
}

/// Full `catalog ingest` flow
pub async fn ingest_csv(
    collections: &CatalogCollections,
    path: &Path,
    reset: bool,
    batch_size: usize,
) -> Result<IngestReport, EngineError> {
    info!("Ingesting schedule from {}", path.display());
    let schedule = read_courses_from_csv(path)?;

    if reset {
        reset_collections(collections).await?;
    } else {
        create_collections(collections).await?;
    }

    load_schedule(collections, &schedule, batch_size).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "SUBJ,CRSE NUM,SEC,CRN,Schedule Type Code,Campus Code,Title Short Desc,Instruction Mode Desc,Meeting Type Codes,Meet Days,Begin Time,End Time,Meet Start,Meet End,BLDG,RM,Actual Enrollment,Primary Instructor First Name,Primary Instructor Last Name,Primary Instructor Email,College";

    fn row(subject: &str, crn: &str, title: &str, first: &str, last: &str) -> String {
        format!(
            "{},272,01,{},LEC,M,{},In-Person,CLAS,TR,2:40 PM,4:25 PM,08/26/2024,12/13/2024,LS,G12,30,{},{},{}@usf.edu,Arts and Sciences",
            subject, crn, title, first, last, first.to_lowercase()
        )
    }

    #[test]
    fn test_read_courses_skips_short_rows() {
        let csv = format!(
            "{}\n{}\nCS,272,01\n{}\n",
            HEADER,
            row("CS", "40646", "Software Development", "Ada", "Lovelace"),
            row("MATH", "40001", "Calculus", "Alan", "Turing"),
        );
        let schedule = read_courses(csv.as_bytes()).unwrap();
        assert_eq!(schedule.courses.len(), 2);
        assert_eq!(schedule.skipped_rows, 1);
        assert_eq!(schedule.courses[0].crn, "40646");
        assert_eq!(schedule.courses[1].title, "Calculus");
    }

    #[test]
    fn test_course_records_keep_last_duplicate() {
        let csv = format!(
            "{}\n{}\n{}\n",
            HEADER,
            row("CS", "1", "Old Title", "Ada", "Lovelace"),
            row("CS", "1", "New Title", "Ada", "Lovelace"),
        );
        let schedule = read_courses(csv.as_bytes()).unwrap();
        let records = course_records(&schedule.courses).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].document.contains("\"Title Short Desc\":\"New Title\""));
        assert_eq!(records[0].metadata["InstructorFullName"], "Ada Lovelace");
        assert_eq!(records[0].metadata["TitleShortDesc"], "New Title");
    }

    #[test]
    fn test_reference_sets_are_distinct_in_first_seen_order() {
        let csv = format!(
            "{}\n{}\n{}\n{}\n",
            HEADER,
            row("CS", "1", "Software Development", "Ada", "Lovelace"),
            row("CS", "2", "Data Structures", "Alan", "Turing"),
            row("CS", "3", "Software Development", "Ada", "Lovelace"),
        );
        let schedule = read_courses(csv.as_bytes()).unwrap();

        let instructors = instructor_records(&schedule.courses);
        let names: Vec<&str> = instructors.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(names, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(instructors[0].document, instructors[0].id);

        let subjects = subject_records(&schedule.courses);
        let titles: Vec<&str> = subjects.iter().map(|r| r.document.as_str()).collect();
        assert_eq!(titles, vec!["Software Development", "Data Structures"]);
    }

    #[test]
    fn test_missing_file_is_ingest_error() {
        let err = read_courses_from_csv(Path::new("/nonexistent/schedule.csv")).unwrap_err();
        assert!(matches!(err, EngineError::Ingest(_)));
    }
}
