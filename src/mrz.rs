//! TD1 machine-readable zone decoding
//!
//! Decodes the three 30-character lines printed on ID-card sized travel
//! documents into an [`MrzRecord`]. Check digits are extracted as-is; use
//! [`MrzRecord::check_digits`] to verify them explicitly.

use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Number of lines in a TD1 zone
pub const TD1_LINES: usize = 3;
/// Characters per TD1 line
pub const TD1_LINE_LENGTH: usize = 30;

const FILLER: char = '<';
const NAME_SEPARATOR: &str = "<<";

/// The input does not have the TD1 shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("expected {expected} lines, found {found}")]
    LineCount { expected: usize, found: usize },

    #[error("line {line} must be {expected} characters long, found {found}")]
    LineLength {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// A YYMMDD field with its century resolved.
///
/// Month and day are taken as printed; no calendar validation happens here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MrzDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl MrzDate {
    /// Calendar date, or `None` when the printed month/day cannot exist
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl fmt::Display for MrzDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Names {
    pub surname: String,
    pub given_names: Vec<String>,
}

/// Decoded TD1 record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MrzRecord {
    pub document_type: String,
    pub issuing_country: String,
    pub document_number: String,
    pub document_number_check_digit: char,
    pub optional_data1: String,
    pub birth_date: MrzDate,
    pub birth_date_check_digit: char,
    pub sex: char,
    pub expiration_date: MrzDate,
    pub expiration_date_check_digit: char,
    pub nationality: String,
    pub optional_data2: String,
    pub composite_check_digit: char,
    pub names: Names,
    #[serde(skip)]
    lines: [Vec<char>; TD1_LINES],
}

/// Outcome of recomputing each ICAO 9303 check digit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckDigitReport {
    pub document_number: bool,
    pub birth_date: bool,
    pub expiration_date: bool,
    pub composite: bool,
}

impl CheckDigitReport {
    pub fn all_valid(&self) -> bool {
        self.document_number && self.birth_date && self.expiration_date && self.composite
    }
}

impl MrzRecord {
    /// Recompute the check digits from the raw lines and compare them with
    /// the printed ones. Decoding never calls this.
    pub fn check_digits(&self) -> CheckDigitReport {
        let [line1, line2, _] = &self.lines;

        let mut composite: Vec<char> = span(line1, 6, 30);
        composite.extend(span(line2, 1, 7));
        composite.extend(span(line2, 9, 15));
        composite.extend(span(line2, 19, 29));

        CheckDigitReport {
            document_number: matches_check_digit(
                &span(line1, 6, 14),
                self.document_number_check_digit,
            ),
            birth_date: matches_check_digit(&span(line2, 1, 6), self.birth_date_check_digit),
            expiration_date: matches_check_digit(
                &span(line2, 9, 14),
                self.expiration_date_check_digit,
            ),
            composite: matches_check_digit(&composite, self.composite_check_digit),
        }
    }
}

/// Decode a TD1 zone, resolving two-digit years against the current year
pub fn parse_td1<S: AsRef<str>>(lines: &[S]) -> Result<MrzRecord, FormatError> {
    parse_td1_with_year(lines, Local::now().year())
}

/// Decode a TD1 zone, resolving two-digit years against `current_year`.
///
/// A two-digit year greater than `current_year % 100` belongs to the 1900s,
/// anything else to the 2000s. This is an approximation and misplaces
/// birth dates more than a century back or expiry dates far in the future.
pub fn parse_td1_with_year<S: AsRef<str>>(
    lines: &[S],
    current_year: i32,
) -> Result<MrzRecord, FormatError> {
    if lines.len() != TD1_LINES {
        return Err(FormatError::LineCount {
            expected: TD1_LINES,
            found: lines.len(),
        });
    }

    let rows: Vec<Vec<char>> = lines.iter().map(|l| l.as_ref().chars().collect()).collect();
    for (index, row) in rows.iter().enumerate() {
        if row.len() != TD1_LINE_LENGTH {
            return Err(FormatError::LineLength {
                line: index + 1,
                expected: TD1_LINE_LENGTH,
                found: row.len(),
            });
        }
    }

    let current_yy = current_year.rem_euclid(100) as u32;
    let (line1, line2, line3) = (&rows[0], &rows[1], &rows[2]);

    let record = MrzRecord {
        document_type: strip_filler(&span(line1, 1, 2)),
        issuing_country: span(line1, 3, 5).into_iter().collect(),
        document_number: strip_filler(&span(line1, 6, 14)),
        document_number_check_digit: line1[14],
        optional_data1: strip_filler(&span(line1, 16, 30)),
        birth_date: parse_date("birth_date", &span(line2, 1, 6), current_yy),
        birth_date_check_digit: line2[6],
        sex: line2[7],
        expiration_date: parse_date("expiration_date", &span(line2, 9, 14), current_yy),
        expiration_date_check_digit: line2[14],
        nationality: span(line2, 16, 18).into_iter().collect(),
        optional_data2: strip_filler(&span(line2, 19, 29)),
        composite_check_digit: line2[29],
        names: parse_names(&line3.iter().collect::<String>()),
        lines: [line1.clone(), line2.clone(), line3.clone()],
    };

    tracing::debug!(
        document_type = %record.document_type,
        issuing_country = %record.issuing_country,
        birth_date = %record.birth_date,
        expiration_date = %record.expiration_date,
        "Decoded TD1 MRZ"
    );

    Ok(record)
}

/// Pull the MRZ candidate out of OCR full text: the last three non-empty
/// lines with all whitespace removed.
pub fn mrz_lines_from_text(text: &str) -> Vec<String> {
    let lines: Vec<String> = text
        .lines()
        .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|line| !line.is_empty())
        .collect();

    let skip = lines.len().saturating_sub(TD1_LINES);
    lines.into_iter().skip(skip).collect()
}

/// Expand a two-digit year to four digits around the current year
pub fn expand_year(yy: u32, current_yy: u32) -> i32 {
    if yy > current_yy {
        1900 + yy as i32
    } else {
        2000 + yy as i32
    }
}

/// ICAO 9303 check digit (weights 7, 3, 1). `None` for characters outside
/// `0-9`, `A-Z` and `<`.
pub fn check_digit(data: &[char]) -> Option<char> {
    const WEIGHTS: [u32; 3] = [7, 3, 1];

    let mut sum = 0u32;
    for (i, &c) in data.iter().enumerate() {
        let value = match c {
            '0'..='9' => c as u32 - '0' as u32,
            'A'..='Z' => c as u32 - 'A' as u32 + 10,
            FILLER => 0,
            _ => return None,
        };
        sum += value * WEIGHTS[i % WEIGHTS.len()];
    }

    char::from_digit(sum % 10, 10)
}

fn matches_check_digit(data: &[char], printed: char) -> bool {
    check_digit(data) == Some(printed)
}

/// Characters `from..=to`, 1-indexed
fn span(line: &[char], from: usize, to: usize) -> Vec<char> {
    line[from - 1..to].to_vec()
}

fn strip_filler(chars: &[char]) -> String {
    chars.iter().filter(|&&c| c != FILLER).collect()
}

fn parse_date(field: &'static str, yymmdd: &[char], current_yy: u32) -> MrzDate {
    let yy = two_digits(field, &yymmdd[0..2]);
    MrzDate {
        year: expand_year(yy, current_yy),
        month: two_digits(field, &yymmdd[2..4]),
        day: two_digits(field, &yymmdd[4..6]),
    }
}

fn two_digits(field: &'static str, pair: &[char]) -> u32 {
    match (pair[0].to_digit(10), pair[1].to_digit(10)) {
        (Some(tens), Some(units)) => tens * 10 + units,
        _ => {
            let raw: String = pair.iter().collect();
            tracing::warn!(field, raw = %raw, "Non-digit characters in MRZ date, reading as 0");
            0
        }
    }
}

fn parse_names(line: &str) -> Names {
    let mut segments = line.split(NAME_SEPARATOR);

    let surname = segments
        .next()
        .unwrap_or_default()
        .replace(FILLER, " ")
        .trim()
        .to_string();

    let given = segments.collect::<Vec<_>>().join(" ").replace(FILLER, " ");
    let given_names = given.split_whitespace().map(str::to_string).collect();

    Names {
        surname,
        given_names,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ICAO_SAMPLE: [&str; 3] = [
        "I<UTOD231458907<<<<<<<<<<<<<<<",
        "7408122F1204159UTO<<<<<<<<<<<6",
        "ERIKSSON<<ANNA<MARIA<<<<<<<<<<",
    ];

    fn pad(line: &str) -> String {
        format!("{:<<width$}", line, width = TD1_LINE_LENGTH)
    }

    #[test]
    fn test_parses_icao_sample() {
        let record = parse_td1_with_year(&ICAO_SAMPLE, 2026).unwrap();

        assert_eq!(record.document_type, "I");
        assert_eq!(record.issuing_country, "UTO");
        assert_eq!(record.document_number, "D23145890");
        assert_eq!(record.document_number_check_digit, '7');
        assert_eq!(record.optional_data1, "");
        assert_eq!(
            record.birth_date,
            MrzDate {
                year: 1974,
                month: 8,
                day: 12
            }
        );
        assert_eq!(record.birth_date_check_digit, '2');
        assert_eq!(record.sex, 'F');
        assert_eq!(
            record.expiration_date,
            MrzDate {
                year: 2012,
                month: 4,
                day: 15
            }
        );
        assert_eq!(record.expiration_date_check_digit, '9');
        assert_eq!(record.nationality, "UTO");
        assert_eq!(record.optional_data2, "");
        assert_eq!(record.composite_check_digit, '6');
        assert_eq!(record.names.surname, "ERIKSSON");
        assert_eq!(record.names.given_names, vec!["ANNA", "MARIA"]);
    }

    #[test]
    fn test_filler_removed_inside_fields() {
        let lines = [
            "IDUTOAB<12<3456<OPT<DATA<<<<<<".to_string(),
            pad("9001011M3001012UTOX<Y"),
            pad("DOE<<JANE"),
        ];
        let record = parse_td1_with_year(&lines, 2026).unwrap();

        assert_eq!(record.document_type, "ID");
        assert_eq!(record.document_number, "AB12345");
        assert_eq!(record.document_number_check_digit, '6');
        assert_eq!(record.optional_data1, "OPTDATA");
        assert_eq!(record.optional_data2, "XY");
    }

    #[test]
    fn test_name_split_on_double_filler() {
        let lines = [pad("I<UTO"), pad("000101"), pad("SMITH<<JOHN<PAUL")];
        let record = parse_td1_with_year(&lines, 2026).unwrap();

        assert_eq!(record.names.surname, "SMITH");
        assert_eq!(record.names.given_names, vec!["JOHN", "PAUL"]);
    }

    #[test]
    fn test_compound_surname_keeps_spaces() {
        let lines = [pad("I<UTO"), pad("000101"), pad("VAN<DER<BERG<<ANNA")];
        let record = parse_td1_with_year(&lines, 2026).unwrap();

        assert_eq!(record.names.surname, "VAN DER BERG");
        assert_eq!(record.names.given_names, vec!["ANNA"]);
    }

    #[test]
    fn test_surname_only() {
        let lines = [pad("I<UTO"), pad("000101"), pad("PLATO")];
        let record = parse_td1_with_year(&lines, 2026).unwrap();

        assert_eq!(record.names.surname, "PLATO");
        assert!(record.names.given_names.is_empty());
    }

    #[test]
    fn test_rejects_wrong_line_count() {
        let err = parse_td1_with_year(&ICAO_SAMPLE[..2], 2026).unwrap_err();
        assert_eq!(
            err,
            FormatError::LineCount {
                expected: 3,
                found: 2
            }
        );

        let four = [pad(""), pad(""), pad(""), pad("")];
        assert!(matches!(
            parse_td1_with_year(&four, 2026),
            Err(FormatError::LineCount { found: 4, .. })
        ));
    }

    #[test]
    fn test_rejects_wrong_line_length() {
        let lines = [
            ICAO_SAMPLE[0].to_string(),
            format!("{}<", ICAO_SAMPLE[1]),
            ICAO_SAMPLE[2].to_string(),
        ];
        let err = parse_td1_with_year(&lines, 2026).unwrap_err();
        assert_eq!(
            err,
            FormatError::LineLength {
                line: 2,
                expected: 30,
                found: 31
            }
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let lines = [pad("I<UTOÄ"), pad("000101"), pad("MÜLLER<<JÖRG")];
        let record = parse_td1_with_year(&lines, 2026).unwrap();
        assert_eq!(record.names.surname, "MÜLLER");
    }

    #[test]
    fn test_year_expansion_boundaries() {
        // equal to the current year stays in this century
        assert_eq!(expand_year(26, 26), 2026);
        assert_eq!(expand_year(27, 26), 1927);
        assert_eq!(expand_year(25, 26), 2025);
        assert_eq!(expand_year(0, 0), 2000);
        assert_eq!(expand_year(99, 0), 1999);
    }

    #[test]
    fn test_dates_follow_reference_year() {
        let lines = [pad("I<UTO"), pad("2612310M2701011"), pad("X")];

        let record = parse_td1_with_year(&lines, 2026).unwrap();
        assert_eq!(record.birth_date.year, 2026);
        assert_eq!(record.expiration_date.year, 1927);

        let record = parse_td1_with_year(&lines, 2027).unwrap();
        assert_eq!(record.expiration_date.year, 2027);
    }

    #[test]
    fn test_invalid_calendar_date_is_kept() {
        let lines = [pad("I<UTO"), pad("991332"), pad("X")];
        let record = parse_td1_with_year(&lines, 2026).unwrap();

        assert_eq!(record.birth_date.month, 13);
        assert_eq!(record.birth_date.day, 32);
        assert_eq!(record.birth_date.to_naive_date(), None);
    }

    #[test]
    fn test_non_digit_date_reads_as_zero() {
        let lines = [pad("I<UTO"), pad("74O812"), pad("X")];
        let record = parse_td1_with_year(&lines, 2026).unwrap();

        assert_eq!(record.birth_date.year, 1974);
        assert_eq!(record.birth_date.month, 0);
        assert_eq!(record.birth_date.day, 12);
    }

    #[test]
    fn test_to_naive_date_and_display() {
        let date = MrzDate {
            year: 1974,
            month: 8,
            day: 12,
        };
        assert_eq!(date.to_naive_date(), NaiveDate::from_ymd_opt(1974, 8, 12));
        assert_eq!(date.to_string(), "1974-08-12");
    }

    #[test]
    fn test_check_digits_on_icao_sample() {
        let record = parse_td1_with_year(&ICAO_SAMPLE, 2026).unwrap();
        let report = record.check_digits();
        assert!(report.all_valid(), "{:?}", report);
    }

    #[test]
    fn test_check_digit_mismatch_does_not_fail_decode() {
        let lines = [
            "I<UTOD231458901<<<<<<<<<<<<<<<",
            ICAO_SAMPLE[1],
            ICAO_SAMPLE[2],
        ];
        let record = parse_td1_with_year(&lines, 2026).unwrap();
        let report = record.check_digits();

        assert!(!report.document_number);
        assert!(report.birth_date);
        assert!(report.expiration_date);
        assert!(!report.all_valid());
    }

    #[test]
    fn test_check_digit_rejects_lowercase() {
        assert_eq!(check_digit(&['a']), None);
        assert_eq!(check_digit(&['<', '<']), Some('0'));
    }

    #[test]
    fn test_mrz_lines_from_text_takes_last_three() {
        let text = "UNITED KINGDOM\nIDENTITY CARD\n\
                    I<UTO D23145890 7<<<<<<<<<<<<<<<\n\
                    7408122F1204159UTO<<<<<<<<<<<6\n\
                    ERIKSSON<<ANNA<MARIA<<<<<<<<<<\n\n";
        let lines = mrz_lines_from_text(text);

        assert_eq!(lines, ICAO_SAMPLE.map(str::to_string).to_vec());
    }

    #[test]
    fn test_mrz_lines_from_short_text() {
        assert_eq!(mrz_lines_from_text("ONE\n\nTWO"), vec!["ONE", "TWO"]);
        assert!(mrz_lines_from_text("").is_empty());
    }
}
