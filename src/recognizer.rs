use crate::error::ScanError;
use image::DynamicImage;
use serde::Serialize;
use std::path::Path;

/// A unit of recognized text, in reading order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextBlock {
    pub text: String,
}

/// Text recognition result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecognizedText {
    /// Full recognized text, blocks separated by newlines
    pub text: String,
    pub blocks: Vec<TextBlock>,
}

impl RecognizedText {
    /// Build a result from per-block texts, joining them for the full text
    pub fn from_blocks<I, S>(blocks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let blocks: Vec<TextBlock> = blocks
            .into_iter()
            .map(|text| TextBlock { text: text.into() })
            .collect();
        let text = blocks
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Self { text, blocks }
    }
}

/// Trait that all text recognition engines must implement
pub trait TextRecognizer: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize text in an image file
    fn recognize(&self, path: &Path) -> Result<RecognizedText, ScanError> {
        let image = crate::vision::load_image(path)?;
        self.recognize_image(&image)
    }

    /// Recognize text in an already decoded image
    fn recognize_image(&self, image: &DynamicImage) -> Result<RecognizedText, ScanError>;

    /// Get supported MIME types
    fn supported_formats(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_blocks_joins_text() {
        let result = RecognizedText::from_blocks(["first line", "second line"]);
        assert_eq!(result.text, "first line\nsecond line");
        assert_eq!(result.blocks.len(), 2);
        assert_eq!(result.blocks[1].text, "second line");
    }

    #[test]
    fn test_from_blocks_empty() {
        let result = RecognizedText::from_blocks(Vec::<String>::new());
        assert!(result.text.is_empty());
        assert!(result.blocks.is_empty());
    }
}
