//! Per-event expansion of the intro script template.
//!
//! The template is the rendering application's own script with `$field`
//! placeholders inside string literals, e.g. `layer.text = "$title";`.
//! Each placeholder is replaced by the event's value for that field, escaped
//! so the literal stays valid. Placeholders naming a field the event does not
//! have are left as they are.

use std::path::Path;

use bumper_common::error::{BumperError, BumperResult};
use bumper_project_model::Event;

/// Expand every `$field` placeholder in `template` against `event`.
///
/// At each `$` the longest field name of the event that follows it is
/// replaced, so `$personnames` is not mistaken for `$persons` followed by
/// `names`. Substituted text is never scanned again.
pub fn expand_script(template: &str, event: &Event) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let field = event
            .field_names()
            .filter(|name| !name.is_empty() && after.starts_with(name))
            .max_by_key(|name| name.len());

        match field.and_then(|name| event.field_text(name).map(|text| (name.len(), text))) {
            Some((len, text)) => {
                out.push_str(&escape_script_string(&text));
                rest = &after[len..];
            }
            None => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape a value for use inside a double-quoted script string literal.
pub fn escape_script_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Read the template, expand it for `event` and write a fresh script file.
/// The template file itself is never modified.
pub async fn write_script(template_path: &Path, event: &Event, output: &Path) -> BumperResult<()> {
    if !template_path.is_file() {
        return Err(BumperError::missing_asset(template_path));
    }
    let template = tokio::fs::read_to_string(template_path).await?;
    let script = expand_script(&template, event);
    tokio::fs::write(output, script).await?;
    tracing::debug!(
        event_id = %event.id,
        template = %template_path.display(),
        output = %output.display(),
        "Wrote expanded script"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumper_project_model::{EventId, ReservedJob};

    const TEMPLATE: &str = r#"
var comp = app.project.item(1);
comp.layer("title").property("Source Text").setValue("$title");
comp.layer("names").property("Source Text").setValue("$personnames");
comp.layer("who").property("Source Text").setValue("$persons");
comp.layer("room").property("Source Text").setValue("$room");
comp.layer("cost").property("Source Text").setValue("$5 $unknown");
"#;

    fn talk() -> Event {
        Event::new(EventId::Talk(23), r#"He said "hi""#)
            .with_field("persons", serde_json::json!(["Ada", "Grace"]))
            .with_field("personnames", "Ada, Grace")
            .with_field("room", "Saal 1")
    }

    #[test]
    fn test_expansion_replaces_known_fields() {
        let script = expand_script(TEMPLATE, &talk());
        assert!(script.contains(r#"setValue("He said \"hi\"")"#));
        assert!(script.contains(r#"setValue("Ada, Grace");"#));
        assert!(script.contains(r#"setValue("Saal 1")"#));
    }

    #[test]
    fn test_longest_field_name_wins() {
        let event = Event::new(EventId::Talk(1), "T")
            .with_field("persons", "P")
            .with_field("personnames", "NAMES");
        assert_eq!(expand_script("$personnames|$persons", &event), "NAMES|P");
    }

    #[test]
    fn test_unknown_placeholders_pass_through() {
        let script = expand_script(TEMPLATE, &Event::reserved(ReservedJob::Pause));
        assert!(script.contains(r#"setValue("Pause Loop")"#));
        assert!(script.contains("$personnames"));
        assert!(script.contains("$room"));
        assert!(script.contains("$5 $unknown"));
    }

    #[test]
    fn test_prefix_placeholders_match_like_substring_replacement() {
        let event = Event::new(EventId::Talk(1), "Hello");
        assert_eq!(expand_script("[$titleText]", &event), "[HelloText]");
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let event = Event::new(EventId::Talk(4), "$id");
        assert_eq!(expand_script("$title/$id", &event), "$id/4");
    }

    #[test]
    fn test_expansion_is_deterministic() {
        let event = talk();
        assert_eq!(expand_script(TEMPLATE, &event), expand_script(TEMPLATE, &event));
    }

    #[test]
    fn test_escape_backslash_and_newline() {
        assert_eq!(escape_script_string("a\\b\nc"), "a\\\\b\\nc");
    }

    #[tokio::test]
    async fn test_write_script_leaves_template_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("intro.jsx");
        let output = dir.path().join("23.jsx");
        std::fs::write(&template, "setValue(\"$title\")").unwrap();

        write_script(&template, &talk(), &output).await.unwrap();

        assert_eq!(std::fs::read_to_string(&template).unwrap(), "setValue(\"$title\")");
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            r#"setValue("He said \"hi\"")"#
        );
    }

    #[tokio::test]
    async fn test_write_script_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_script(&dir.path().join("intro.jsx"), &talk(), &dir.path().join("o.jsx"))
            .await
            .unwrap_err();
        assert!(matches!(err, BumperError::MissingAsset { .. }));
    }
}
