//! Front-of-card text extraction for the UAE national identity card

use crate::recognizer::RecognizedText;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

const COUNTRY_PHRASE: &str = "united arab emirates";
const NAME_LABEL: &str = "name:";
const NATIONALITY_LABEL: &str = "nationality:";

/// Fields read from the front of the card. Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmiratesIdFront {
    pub name: String,
    pub id_number: String,
    pub nationality: String,
}

fn id_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // 784-YYYY-NNNNNNN-C with optional space or hyphen separators
    PATTERN.get_or_init(|| {
        Regex::new(r"784[\s-]*\d{4}[\s-]*\d{7}[\s-]*\d").expect("static regex is valid")
    })
}

/// Extract front-of-card fields, or `None` when the text is not from a UAE card
pub fn extract_front(ocr: &RecognizedText) -> Option<EmiratesIdFront> {
    if !ocr.text.to_lowercase().contains(COUNTRY_PHRASE) {
        tracing::debug!("Country phrase not found, not an Emirates ID front");
        return None;
    }

    let name = text_after_label(ocr, NAME_LABEL)
        .map(|value| value.trim().to_string())
        .unwrap_or_default();

    let id_number = id_number_pattern()
        .find(&ocr.text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let nationality = text_after_label(ocr, NATIONALITY_LABEL)
        .map(|value| value.to_lowercase().trim().to_string())
        .unwrap_or_default();

    tracing::debug!(
        has_name = !name.is_empty(),
        has_id_number = !id_number.is_empty(),
        has_nationality = !nationality.is_empty(),
        "Extracted Emirates ID front"
    );

    Some(EmiratesIdFront {
        name,
        id_number,
        nationality,
    })
}

/// Text following `label` in the first block that contains it, in the
/// block's original case. ASCII lowering keeps byte offsets aligned.
fn text_after_label<'a>(ocr: &'a RecognizedText, label: &str) -> Option<&'a str> {
    ocr.blocks.iter().find_map(|block| {
        let lowered = block.text.to_ascii_lowercase();
        lowered
            .find(label)
            .map(|start| &block.text[start + label.len()..])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(blocks: &[&str]) -> RecognizedText {
        RecognizedText::from_blocks(blocks.iter().copied())
    }

    #[test]
    fn test_extracts_all_fields() {
        let ocr = card(&[
            "UNITED ARAB EMIRATES",
            "FEDERAL AUTHORITY FOR IDENTITY & CITIZENSHIP",
            "ID Number 784-1990-1234567-1",
            "Name: Mohammed Ahmed Ali",
            "Nationality: United Arab Emirates ",
        ]);

        let front = extract_front(&ocr).unwrap();
        assert_eq!(front.name, "Mohammed Ahmed Ali");
        assert_eq!(front.id_number, "784-1990-1234567-1");
        assert_eq!(front.nationality, "united arab emirates");
    }

    #[test]
    fn test_returns_none_without_country_phrase() {
        let ocr = card(&[
            "REPUBLIC OF UTOPIA",
            "Name: Anna Eriksson",
            "784-1990-1234567-1",
        ]);
        assert_eq!(extract_front(&ocr), None);
    }

    #[test]
    fn test_country_phrase_is_case_insensitive() {
        let ocr = card(&["United Arab Emirates"]);
        assert!(extract_front(&ocr).is_some());
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let ocr = card(&["united arab emirates", "resident identity card"]);
        assert_eq!(extract_front(&ocr), Some(EmiratesIdFront::default()));
    }

    #[test]
    fn test_id_number_without_separators() {
        let ocr = card(&["UNITED ARAB EMIRATES", "784199012345671"]);
        assert_eq!(extract_front(&ocr).unwrap().id_number, "784199012345671");
    }

    #[test]
    fn test_id_number_with_spaces() {
        let ocr = card(&["UNITED ARAB EMIRATES", "784 1990 1234567 1"]);
        assert_eq!(extract_front(&ocr).unwrap().id_number, "784 1990 1234567 1");
    }

    #[test]
    fn test_name_keeps_original_case_from_first_matching_block() {
        let ocr = card(&[
            "UNITED ARAB EMIRATES",
            "NAME: Fatima Al Mansoori",
            "name: second",
        ]);
        assert_eq!(extract_front(&ocr).unwrap().name, "Fatima Al Mansoori");
    }

    #[test]
    fn test_nationality_label_does_not_satisfy_name() {
        let ocr = card(&["UNITED ARAB EMIRATES", "Nationality: India"]);
        let front = extract_front(&ocr).unwrap();
        assert_eq!(front.name, "");
        assert_eq!(front.nationality, "india");
    }
}
