//! CSV roster ingestion and results export.
//!
//! The ingestion side turns an instructor-supplied CSV into the
//! non-empty `{name, answer}` pairs the scoring pipeline expects:
//! columns are detected by header keywords (case-insensitive), rows
//! with an empty name or answer are dropped, and file order is
//! preserved. The export side writes scored results back out as a
//! tabular CSV for record keeping.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use eduassess_core::{Candidate, ScoredCandidate};

/// Header keywords that identify the student-name column.
const NAME_KEYWORDS: [&str; 2] = ["name", "student"];

/// Header keywords that identify the answer column.
const ANSWER_KEYWORDS: [&str; 3] = ["answer", "response", "text"];

/// Errors from roster ingestion and export.
#[derive(Error, Debug)]
pub enum RosterError {
    /// File could not be read or written.
    #[error("roster I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV.
    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    /// Neither a name nor an answer column could be identified.
    #[error("could not find name/answer columns; headers found: {found}")]
    MissingColumns { found: String },

    /// Every row was filtered out (empty name or answer).
    #[error("no valid rows in roster; columns used: {name_column}, {answer_column}")]
    EmptyRoster {
        name_column: String,
        answer_column: String,
    },
}

/// A loaded candidate roster.
#[derive(Debug, Clone)]
pub struct Roster {
    /// Candidates in file order, empties already filtered.
    pub candidates: Vec<Candidate>,

    /// Header of the column the names came from.
    pub name_column: String,

    /// Header of the column the answers came from.
    pub answer_column: String,
}

/// Load a candidate roster from a CSV file.
pub fn load_roster(path: &Path) -> Result<Roster, RosterError> {
    let file = File::open(path)?;
    let roster = load_roster_from_reader(file)?;
    info!(
        candidates = roster.candidates.len(),
        name_column = %roster.name_column,
        answer_column = %roster.answer_column,
        "loaded roster from {}",
        path.display()
    );
    Ok(roster)
}

/// Load a candidate roster from any CSV reader.
///
/// The first column whose header contains "name" or "student" supplies
/// the names; the first containing "answer", "response" or "text"
/// supplies the answers. Matching is case-insensitive. Rows where
/// either field trims to empty are dropped; surviving rows keep their
/// input order.
pub fn load_roster_from_reader<R: Read>(reader: R) -> Result<Roster, RosterError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();

    let name_index = find_column(&headers, &NAME_KEYWORDS);
    let answer_index = find_column(&headers, &ANSWER_KEYWORDS);

    let (name_index, answer_index) = match (name_index, answer_index) {
        (Some(n), Some(a)) => (n, a),
        _ => {
            return Err(RosterError::MissingColumns {
                found: headers.iter().collect::<Vec<_>>().join(", "),
            })
        }
    };

    let name_column = headers[name_index].to_string();
    let answer_column = headers[answer_index].to_string();

    let mut candidates = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let name = record.get(name_index).unwrap_or("").trim();
        let answer = record.get(answer_index).unwrap_or("").trim();
        if name.is_empty() || answer.is_empty() {
            debug!(row = ?record.position().map(|p| p.line()), "dropping incomplete row");
            continue;
        }
        candidates.push(Candidate::new(name, answer));
    }

    if candidates.is_empty() {
        return Err(RosterError::EmptyRoster {
            name_column,
            answer_column,
        });
    }

    Ok(Roster {
        candidates,
        name_column,
        answer_column,
    })
}

/// Write scored results to a CSV file.
pub fn export_results(path: &Path, results: &[ScoredCandidate]) -> Result<(), RosterError> {
    let csv = results_to_csv(results)?;
    let mut file = File::create(path)?;
    file.write_all(csv.as_bytes())?;
    info!(rows = results.len(), "exported results to {}", path.display());
    Ok(())
}

/// Render scored results as a CSV document.
///
/// Columns: Student Name, Score (%), Similarity (%), Status, Feedback,
/// Student Answer. Status is `PASS`/`FAIL`.
pub fn results_to_csv(results: &[ScoredCandidate]) -> Result<String, RosterError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "Student Name",
        "Score (%)",
        "Similarity (%)",
        "Status",
        "Feedback",
        "Student Answer",
    ])?;

    for result in results {
        let score = result.score.to_string();
        let similarity = result.similarity.to_string();
        writer.write_record([
            result.name.as_str(),
            score.as_str(),
            similarity.as_str(),
            if result.passed { "PASS" } else { "FAIL" },
            result.feedback.as_str(),
            result.answer.as_str(),
        ])?;
    }

    writer.flush().map_err(RosterError::Io)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| RosterError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;
    // The writer only ever receives valid UTF-8.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn find_column(headers: &csv::StringRecord, keywords: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let lower = header.to_lowercase();
        keywords.iter().any(|keyword| lower.contains(keyword))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use eduassess_core::PASS_THRESHOLD;

    fn scored(name: &str, score: u8) -> ScoredCandidate {
        ScoredCandidate {
            name: name.to_string(),
            answer: "the answer, with a comma".to_string(),
            similarity: score,
            score,
            passed: score >= PASS_THRESHOLD,
            feedback: "Good work".to_string(),
        }
    }

    #[test]
    fn test_load_simple_roster() {
        let csv = "name,answer\nJohn Doe,Photosynthesis converts light\nJane Smith,Plants use sunlight\n";
        let roster = load_roster_from_reader(csv.as_bytes()).expect("load");

        assert_eq!(roster.candidates.len(), 2);
        assert_eq!(roster.candidates[0].name, "John Doe");
        assert_eq!(roster.candidates[1].answer, "Plants use sunlight");
        assert_eq!(roster.name_column, "name");
        assert_eq!(roster.answer_column, "answer");
    }

    #[test]
    fn test_column_sniffing_is_case_insensitive() {
        let csv = "Student ID,Student Name,Response Text\n1,Amy,Because gravity\n";
        let roster = load_roster_from_reader(csv.as_bytes()).expect("load");

        // "Student ID" contains "student" and wins the name column; the
        // heuristic takes the first match per keyword set.
        assert_eq!(roster.name_column, "Student ID");
        assert_eq!(roster.answer_column, "Response Text");
        assert_eq!(roster.candidates[0].name, "1");
    }

    #[test]
    fn test_rows_with_empty_fields_are_dropped() {
        let csv = "name,answer\nAmy,has an answer\nBob,\n,orphan answer\nCal,  \nDee,also has one\n";
        let roster = load_roster_from_reader(csv.as_bytes()).expect("load");

        let names: Vec<_> = roster.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Amy", "Dee"]);
    }

    #[test]
    fn test_order_is_preserved() {
        let csv = "name,answer\nZoe,a\nAmy,b\nMia,c\n";
        let roster = load_roster_from_reader(csv.as_bytes()).expect("load");

        let names: Vec<_> = roster.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Zoe", "Amy", "Mia"]);
    }

    #[test]
    fn test_missing_columns_error_names_headers() {
        let csv = "id,grade\n1,A\n";
        let err = load_roster_from_reader(csv.as_bytes()).unwrap_err();
        match err {
            RosterError::MissingColumns { found } => {
                assert!(found.contains("id"));
                assert!(found.contains("grade"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_all_rows_filtered_is_an_error() {
        let csv = "name,answer\nAmy,\n,\n";
        let err = load_roster_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, RosterError::EmptyRoster { .. }));
    }

    #[test]
    fn test_results_csv_shape() {
        let results = vec![scored("Amy", 85), scored("Bob", 40)];
        let csv = results_to_csv(&results).expect("render");

        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Student Name,Score (%),Similarity (%),Status,Feedback,Student Answer"
        );
        let amy = lines.next().unwrap();
        assert!(amy.starts_with("Amy,85,85,PASS,"));
        // The comma inside the answer field forces quoting.
        assert!(amy.contains("\"the answer, with a comma\""));
        let bob = lines.next().unwrap();
        assert!(bob.contains(",FAIL,"));
    }

    #[test]
    fn test_export_roundtrip_through_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results.csv");

        export_results(&path, &[scored("Amy", 72)]).expect("export");
        let written = std::fs::read_to_string(&path).expect("read back");
        assert!(written.contains("Amy,72,72,PASS"));
    }
}
