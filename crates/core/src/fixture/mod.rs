//! Fixture contract: metadata lives in a literal default export
//!
//! ```text
//! import { Button } from '@scope/react-button';
//!
//! console.log(Button);
//!
//! export default { name: 'Button' };
//! ```
//!
//! [`strip_fixture_metadata`] folds the exported value, validates it as
//! [`FixtureMetadata`] and returns the source without the export statement,
//! so the metadata never contributes to the measured size.

mod eval;
mod lexer;

use crate::data::FixtureMetadata;
use crate::error::{ExtractionFailure, Result};
use eval::Evaluator;
use lexer::{tokenize, Token};
use serde_json::Value;

/// Fixture source with its metadata taken out
#[derive(Debug, Clone, PartialEq)]
pub struct StrippedFixture {
    pub metadata: FixtureMetadata,
    pub code: String,
}

/// Extract the default-exported metadata and remove it from the source
pub fn strip_fixture_metadata(source: &str) -> Result<StrippedFixture> {
    let tokens = tokenize(source)?;

    let export_at = find_default_export(&tokens).ok_or(ExtractionFailure::MissingDefaultExport)?;
    let mut evaluator = Evaluator::new(&tokens, export_at + 2);
    let value = evaluator.expression()?;

    let mut end_index = evaluator.position();
    match tokens.get(end_index) {
        None => {}
        Some(t) if t.is_punct(";") => end_index += 1,
        Some(t) if t.newline_before => {}
        Some(t) => {
            return Err(ExtractionFailure::NotStaticallyEvaluable(format!(
                "unexpected `{}` after the exported value",
                &source[t.start..t.end]
            ))
            .into())
        }
    }

    let metadata = validate_metadata(value.into_json())?;

    let start = tokens[export_at].start;
    let end = statement_end(source, tokens[end_index - 1].end);
    let mut code = String::with_capacity(source.len() - (end - start));
    code.push_str(&source[..start]);
    code.push_str(&source[end..]);

    Ok(StrippedFixture { metadata, code })
}

/// Index of the first top-level `export default` token pair
fn find_default_export(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        if token.is_punct("{") || token.is_punct("(") || token.is_punct("[") {
            depth += 1;
        } else if token.is_punct("}") || token.is_punct(")") || token.is_punct("]") {
            depth = depth.saturating_sub(1);
        } else if depth == 0
            && token.is_ident("export")
            && tokens.get(i + 1).is_some_and(|next| next.is_ident("default"))
            // `obj.export default` is not a statement
            && !(i > 0 && (tokens[i - 1].is_punct(".") || tokens[i - 1].is_punct("?.")))
        {
            return Some(i);
        }
    }
    None
}

/// Extend a statement over trailing blanks and a single line break
fn statement_end(source: &str, end: usize) -> usize {
    let rest = &source[end..];
    let blanks = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    let after = &rest[blanks..];
    if after.starts_with("\r\n") {
        end + blanks + 2
    } else if after.starts_with('\n') {
        end + blanks + 1
    } else {
        end + blanks
    }
}

/// Check folded metadata against the fixture schema
fn validate_metadata(value: Value) -> std::result::Result<FixtureMetadata, ExtractionFailure> {
    if !value.is_object() {
        return Err(ExtractionFailure::SchemaViolation(format!(
            "metadata must be an object, got {}",
            json_type(&value)
        )));
    }

    match value.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => {}
        Some(Value::String(_)) => {
            return Err(ExtractionFailure::SchemaViolation(
                "`name` must not be empty".to_string(),
            ))
        }
        Some(other) => {
            return Err(ExtractionFailure::SchemaViolation(format!(
                "`name` must be a string, got {}",
                json_type(other)
            )))
        }
        None => {
            return Err(ExtractionFailure::SchemaViolation(
                "missing required property `name`".to_string(),
            ))
        }
    }

    serde_json::from_value(value).map_err(|e| ExtractionFailure::SchemaViolation(e.to_string()))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    fn failure(source: &str) -> ExtractionFailure {
        match strip_fixture_metadata(source) {
            Err(Error::MetadataExtraction(reason)) => reason,
            other => panic!("expected extraction failure for {:?}, got {:?}", source, other),
        }
    }

    #[test]
    fn test_strip_single_line_fixture() {
        let stripped =
            strip_fixture_metadata("export default { name: 'X' }; console.log(1);").unwrap();

        assert_eq!(stripped.metadata.name, "X");
        assert_eq!(stripped.code, "console.log(1);");
        assert!(!stripped.code.contains("export default"));
    }

    #[test]
    fn test_strip_keeps_surrounding_code() {
        let source = concat!(
            "import { Button } from '@scope/react-button';\n\n",
            "console.log(Button);\n\n",
            "export default {\n  name: 'Button',\n  threshold: 1024,\n};\n",
        );
        let stripped = strip_fixture_metadata(source).unwrap();

        assert_eq!(
            stripped.code,
            "import { Button } from '@scope/react-button';\n\nconsole.log(Button);\n\n"
        );
        assert_eq!(stripped.metadata.name, "Button");
        assert_eq!(stripped.metadata.extra.get("threshold"), Some(&serde_json::json!(1024)));
    }

    #[test]
    fn test_strip_without_semicolon() {
        let stripped = strip_fixture_metadata("export default { name: 'A' }\nfoo();\n").unwrap();
        assert_eq!(stripped.code, "foo();\n");

        let stripped = strip_fixture_metadata("bar();\nexport default { name: 'B' }").unwrap();
        assert_eq!(stripped.code, "bar();\n");
    }

    #[test]
    fn test_nested_default_export_is_ignored() {
        let source = concat!(
            "const x = { export: 1 };\n",
            "function f() { return { default: 2 } }\n",
            "export default { name: 'Top' };",
        );
        let stripped = strip_fixture_metadata(source).unwrap();
        assert_eq!(stripped.metadata.name, "Top");
        assert!(stripped.code.starts_with("const x = { export: 1 };"));
    }

    #[test]
    fn test_export_inside_string_or_comment_is_ignored() {
        let source = concat!(
            "// export default { name: 'comment' }\n",
            "const s = \"export default 1\";\n",
            "export default { name: 'real' };",
        );
        let stripped = strip_fixture_metadata(source).unwrap();
        assert_eq!(stripped.metadata.name, "real");
        assert!(stripped.code.contains("// export default { name: 'comment' }"));
    }

    #[test]
    fn test_missing_default_export() {
        assert_eq!(failure("console.log(1);"), ExtractionFailure::MissingDefaultExport);
        assert_eq!(
            failure("const meta = { name: 'x' };\nexport { meta as default };"),
            ExtractionFailure::MissingDefaultExport
        );
    }

    #[test]
    fn test_runtime_value_is_rejected() {
        assert!(matches!(
            failure("export default computeAtRuntime();"),
            ExtractionFailure::NotStaticallyEvaluable(_)
        ));
        assert!(matches!(
            failure("export default function Fixture() {}"),
            ExtractionFailure::NotStaticallyEvaluable(_)
        ));
        assert!(matches!(
            failure("export default { name: 'x' } + other;"),
            ExtractionFailure::NotStaticallyEvaluable(_)
        ));
    }

    #[test]
    fn test_trailing_tokens_on_same_line_are_rejected() {
        assert!(matches!(
            failure("export default { name: 'x' } foo();"),
            ExtractionFailure::NotStaticallyEvaluable(_)
        ));
    }

    #[test]
    fn test_schema_violations() {
        for source in [
            "export default 'Button';",
            "export default [{ name: 'x' }];",
            "export default {};",
            "export default { name: '' };",
            "export default { name: '   ' };",
            "export default { name: 42 };",
            "export default { name: undefined };",
        ] {
            assert!(
                matches!(failure(source), ExtractionFailure::SchemaViolation(_)),
                "expected schema violation for {:?}",
                source
            );
        }
    }

    #[test]
    fn test_syntax_error_is_reported() {
        assert!(matches!(
            failure("const s = 'open;\nexport default { name: 'x' };"),
            ExtractionFailure::Syntax(_)
        ));
    }

    #[test]
    fn test_folded_name() {
        let stripped =
            strip_fixture_metadata("export default { name: 'Button' + ' - ' + `all` };").unwrap();
        assert_eq!(stripped.metadata.name, "Button - all");
    }

    #[test]
    fn test_error_message_mentions_example() {
        let err = strip_fixture_metadata("console.log(1)").unwrap_err();
        assert!(err.to_string().contains("export default { name: 'Test fixture' }"));
    }

    #[test]
    fn test_regex_after_control_header_or_block() {
        for source in [
            "if (true) /'/.test('a');\nexport default { name: 'x' };",
            "function f() {}\n/\"/.test('a');\nexport default { name: 'x' };",
        ] {
            let stripped = strip_fixture_metadata(source).unwrap();
            assert_eq!(stripped.metadata.name, "x");
            assert!(stripped.code.contains(".test('a');"));
        }
    }

    #[test]
    fn test_deeply_nested_export_is_rejected() {
        let source = format!("export default {};", "[".repeat(20_000));
        assert_eq!(
            failure(&source),
            ExtractionFailure::NotStaticallyEvaluable("expression nested too deeply".to_string())
        );
    }
}
