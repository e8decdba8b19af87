//! Renders root/season/filename templates against a `MatchContext` and
//! resolves them to a destination path (spec.md §4.8).

use std::path::{Path, PathBuf};

use paddock_model::MatchContext;

use crate::error::DestinationError;

const MAX_SEGMENT_LEN: usize = 255;

/// The three templates a pattern (or its `destination_overrides`)
/// supplies. Placeholders are `{key}`, resolved against `MatchContext`.
#[derive(Debug, Clone)]
pub struct DestinationTemplates {
    pub root_folder: String,
    pub season_folder: String,
    pub filename: String,
}

/// Renders `templates` against `context`, sanitizes each segment, and
/// joins them under `destination_dir`, rejecting any result that would
/// escape it.
pub fn build_destination(
    templates: &DestinationTemplates,
    context: &MatchContext,
    destination_dir: &Path,
) -> Result<PathBuf, DestinationError> {
    let root = sanitize_segment(&render(&templates.root_folder, context)?)?;
    let season = sanitize_segment(&render(&templates.season_folder, context)?)?;
    let mut filename = sanitize_segment(&render(&templates.filename, context)?)?;
    if !context.extension.is_empty() && !filename.ends_with(&format!(".{}", context.extension)) {
        filename.push('.');
        filename.push_str(&context.extension);
    }

    let mut path = destination_dir.to_path_buf();
    path.push(root);
    path.push(season);
    path.push(filename);

    ensure_within(&path, destination_dir)?;
    Ok(path)
}

/// Substitutes every `{key}` or `{key:NN}` placeholder in `template` with
/// `context.get(key)`, zero-padding numeric values to width `NN` when a
/// width spec is present (mirroring `pattern::compiler::template_groups`'s
/// placeholder parsing). Errors if any referenced key is absent.
fn render(template: &str, context: &MatchContext) -> Result<String, DestinationError> {
    let mut rendered = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '{' {
            rendered.push(c);
            continue;
        }
        let Some(end) = template[i..].find('}') else {
            rendered.push(c);
            continue;
        };
        let inner = &template[i + 1..i + end];
        let mut parts = inner.splitn(2, ':');
        let key = parts.next().unwrap_or(inner);
        let width_spec = parts.next();
        let value = context
            .get(key)
            .ok_or_else(|| DestinationError::TemplateError(key.to_string()))?;
        let value = match width_spec {
            Some(spec) => apply_width_spec(&value, spec),
            None => value,
        };
        rendered.push_str(&value);
        while let Some((j, _)) = chars.peek() {
            if *j > i + end {
                break;
            }
            chars.next();
        }
    }
    Ok(rendered)
}

/// Zero-pads `value` to `spec` (a decimal width, e.g. `"02"`) when it
/// parses as an integer; non-numeric values pass through unchanged.
fn apply_width_spec(value: &str, spec: &str) -> String {
    let Ok(width) = spec.parse::<usize>() else {
        return value.to_string();
    };
    match value.parse::<i64>() {
        Ok(n) => format!("{n:0width$}"),
        Err(_) => value.to_string(),
    }
}

/// Strips control characters, replaces path separators with a single
/// space, collapses whitespace, trims to a platform-safe length, and
/// rejects an empty result. Acronym casing from the metadata is left
/// untouched — this never title-cases.
fn sanitize_segment(raw: &str) -> Result<String, DestinationError> {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if c.is_control() {
                ' '
            } else if c == std::path::MAIN_SEPARATOR || c == '/' || c == '\\' {
                ' '
            } else {
                c
            }
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim();

    if trimmed.is_empty() {
        return Err(DestinationError::UnsafePath("empty segment".to_string()));
    }

    if trimmed.len() > MAX_SEGMENT_LEN {
        let mut truncated = trimmed.chars().collect::<Vec<_>>();
        truncated.truncate(MAX_SEGMENT_LEN);
        let truncated: String = truncated.into_iter().collect();
        if truncated.trim().is_empty() {
            return Err(DestinationError::NameTooLong(raw.to_string()));
        }
        return Ok(truncated.trim().to_string());
    }

    Ok(trimmed.to_string())
}

/// Rejects any path that, once normalized, escapes `destination_dir`.
fn ensure_within(path: &Path, destination_dir: &Path) -> Result<(), DestinationError> {
    let normalized = normalize(path);
    let base = normalize(destination_dir);
    if normalized.starts_with(&base) {
        Ok(())
    } else {
        Err(DestinationError::UnsafePath(format!(
            "{} escapes {}",
            path.display(),
            destination_dir.display()
        )))
    }
}

/// Lexical normalization (no filesystem access): resolves `.`/`..`
/// components without requiring the path to exist.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> MatchContext {
        MatchContext {
            sport_id: "formula1_2025".into(),
            sport_name: "Formula 1".into(),
            show_title: "Formula 1".into(),
            show_display_title: "Formula 1".into(),
            season_title: "Monaco Grand Prix".into(),
            season_number: 5,
            season_round: 5,
            season_year: Some(2025),
            episode_title: "Race".into(),
            episode_number: 6,
            episode_display_number: "6".into(),
            episode_summary: None,
            episode_originally_available: None,
            source_filename: "Formula.1.2025.Round05.Monaco.Race.mkv".into(),
            source_stem: "Formula.1.2025.Round05.Monaco.Race".into(),
            extension: "mkv".into(),
            suffix: String::new(),
            relative_source: "Formula.1.2025.Round05.Monaco.Race.mkv".into(),
            captures: Default::default(),
        }
    }

    #[test]
    fn renders_the_seed_scenario_destination() {
        let templates = DestinationTemplates {
            root_folder: "{show_title} {season_year}".into(),
            season_folder: "{season_round:02} {season_title}".into(),
            filename: "{show_title} - S{season_number:02}E{episode_number:02} - {episode_title}".into(),
        };
        let dest = build_destination(&templates, &context(), Path::new("/media/sports")).unwrap();
        assert_eq!(
            dest,
            Path::new("/media/sports/Formula 1 2025/05 Monaco Grand Prix/Formula 1 - S05E06 - Race.mkv")
        );
    }

    #[test]
    fn width_spec_zero_pads_numeric_values_but_leaves_text_untouched() {
        let templates = DestinationTemplates {
            root_folder: "{show_title:02}".into(),
            season_folder: "{season_number:02}".into(),
            filename: "{episode_number:03}".into(),
        };
        let dest = build_destination(&templates, &context(), Path::new("/media/sports")).unwrap();
        assert_eq!(
            dest,
            Path::new("/media/sports/Formula 1/05/006.mkv")
        );
    }

    #[test]
    fn missing_key_is_a_template_error() {
        let templates = DestinationTemplates {
            root_folder: "{nonexistent_key}".into(),
            season_folder: "{season_title}".into(),
            filename: "{episode_title}".into(),
        };
        let err = build_destination(&templates, &context(), Path::new("/media")).unwrap_err();
        assert!(matches!(err, DestinationError::TemplateError(_)));
    }

    #[test]
    fn traversal_outside_destination_dir_is_rejected() {
        let templates = DestinationTemplates {
            root_folder: "../../etc".into(),
            season_folder: "season".into(),
            filename: "{episode_title}".into(),
        };
        let err = build_destination(&templates, &context(), Path::new("/media/sports")).unwrap_err();
        assert!(matches!(err, DestinationError::UnsafePath(_)));
    }

    #[test]
    fn control_characters_and_separators_are_sanitized() {
        let segment = sanitize_segment("Race\u{0007} / Results\n\n").unwrap();
        assert_eq!(segment, "Race   Results");
    }

    #[test]
    fn empty_segment_after_sanitization_is_rejected() {
        assert!(sanitize_segment("   \u{0001}  ").is_err());
    }
}
