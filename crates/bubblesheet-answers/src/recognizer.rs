use bubblesheet_core::{GrayImageView, PixelRect};

/// Error returned by a [`TextRecognizer`].
pub type RecognizeError = Box<dyn std::error::Error + Send + Sync>;

/// External text recognition for free-text and info regions.
///
/// Implementations wrap whatever OCR engine the caller has; the pipeline only
/// hands over cropped gray images and stores the returned string.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &GrayImageView<'_>) -> Result<String, RecognizeError>;
}

impl<F> TextRecognizer for F
where
    F: Fn(&GrayImageView<'_>) -> Result<String, RecognizeError> + Send + Sync,
{
    fn recognize(&self, image: &GrayImageView<'_>) -> Result<String, RecognizeError> {
        self(image)
    }
}

/// Collapse runs of whitespace within each line and drop blank lines.
pub fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split a region of `height` rows into `fields` equal bands.
pub fn field_rows(width: usize, height: usize, fields: usize) -> Vec<PixelRect> {
    let n = fields.max(1);
    (0..n)
        .map(|i| {
            let y0 = i * height / n;
            let y1 = (i + 1) * height / n;
            PixelRect {
                x: 0,
                y: y0,
                width,
                height: y1 - y0,
            }
        })
        .collect()
}

/// Run the recognizer over the whole region, or row by row when rows are given.
///
/// Failures are logged and yield `None`.
pub(crate) fn recognize_region(
    recognizer: &dyn TextRecognizer,
    region: &GrayImageView<'_>,
    rows: &[PixelRect],
    index: usize,
) -> Option<String> {
    let raw = if rows.len() <= 1 {
        recognizer.recognize(region)
    } else {
        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            let line = match region.crop(*row) {
                Some(img) => recognizer.recognize(&img.view()),
                None => Ok(String::new()),
            };
            match line {
                Ok(text) => lines.push(normalize_whitespace(&text).replace('\n', " ")),
                Err(err) => {
                    log::warn!("question {index}: text recognition failed: {err}");
                    return None;
                }
            }
        }
        Ok(lines.join("\n"))
    };

    match raw {
        Ok(text) if rows.len() > 1 => Some(text),
        Ok(text) => Some(normalize_whitespace(&text)),
        Err(err) => {
            log::warn!("question {index}: text recognition failed: {err}");
            None
        }
    }
}
