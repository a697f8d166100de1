//! Markdown section handling for generated text.
use crate::pipeline::PipelineStage;
use regex::Regex;

/// Text stored for a stage the combined response did not contain.
pub const SECTION_PLACEHOLDER: &str = "Seção não encontrada na resposta.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("section {title:?} not found in response")]
pub struct UnknownSectionError {
    pub title: String,
}

fn heading_pattern(title: &str) -> Result<Regex, UnknownSectionError> {
    Regex::new(&format!(
        r"(?mi)^#{{1,2}}[ \t]+[^\n]*?{}[^\n]*(?:\n|$)",
        regex::escape(title)
    ))
    .map_err(|_| UnknownSectionError {
        title: title.to_string(),
    })
}

fn next_heading_offset(body: &str) -> Option<usize> {
    let next = Regex::new(r"(?m)^#{1,2}[ \t]").ok()?;
    next.find(body).map(|found| found.start())
}

/// Body of the `#`/`##` heading whose line contains `title`, up to the next
/// heading of the same or higher level. `###` subsections stay in the body.
pub fn extract_section(text: &str, title: &str) -> Result<String, UnknownSectionError> {
    let heading = heading_pattern(title)?;
    let Some(found) = heading.find(text) else {
        return Err(UnknownSectionError {
            title: title.to_string(),
        });
    };
    let body = &text[found.end()..];
    let end = next_heading_offset(body).unwrap_or(body.len());
    let section = body[..end].trim();
    if section.is_empty() {
        return Err(UnknownSectionError {
            title: title.to_string(),
        });
    }
    Ok(section.to_string())
}

/// Section text for `stage`, or `None` when the response lacks it.
pub fn section_for(text: &str, stage: PipelineStage) -> Option<String> {
    match extract_section(text, stage.title()) {
        Ok(section) => Some(section),
        Err(err) => {
            tracing::warn!(stage = %stage, error = %err, "combined response missing section");
            None
        }
    }
}

/// Drop a leading heading that repeats the stage title.
pub fn strip_leading_heading(text: &str, stage: PipelineStage) -> String {
    let trimmed = text.trim_start();
    let (first, rest) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
    let is_repeat = first.starts_with('#')
        && first
            .to_lowercase()
            .contains(&stage.title().to_lowercase());
    if is_repeat {
        rest.trim().to_string()
    } else {
        text.trim().to_string()
    }
}
