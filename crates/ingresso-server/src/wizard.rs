//! Terminal front end for config flows
//!
//! Renders each form as a numbered list and submits the chosen option.
//! An empty answer takes the field default, `q` aborts the flow.

use std::io::{BufRead, Write};

use anyhow::{bail, Result};
use ingresso_config_flow::{FlowManager, FlowResult, FormField};
use serde_json::{json, Map, Value};

/// What the user answered for one field
#[derive(Debug, PartialEq, Eq)]
enum Answer {
    Value(String),
    Quit,
    Invalid,
}

/// Drive a started flow to completion
///
/// Returns the final result (`create_entry` or `abort`).
pub async fn drive<R, W>(
    flows: &FlowManager,
    mut result: FlowResult,
    input: &mut R,
    output: &mut W,
) -> Result<FlowResult>
where
    R: BufRead,
    W: Write,
{
    while !result.is_finished() {
        let flow_id = result.flow_id.clone();
        render_errors(&result, output)?;

        let submission = if result.data_schema.is_empty() {
            // Nothing to choose: the step failed to load its list
            write!(output, "Retry? [Y/n] ")?;
            output.flush()?;
            match read_line(input)?.as_deref() {
                None => bail!("input closed"),
                Some("n") | Some("N") | Some("q") => {
                    return Ok(flows.abort_flow(&flow_id).await?);
                }
                Some(_) => None,
            }
        } else {
            match ask_fields(&result.data_schema, input, output)? {
                Some(values) => Some(Value::Object(values)),
                None => return Ok(flows.abort_flow(&flow_id).await?),
            }
        };

        result = flows.progress_flow(&flow_id, submission).await?;
    }

    Ok(result)
}

fn render_errors<W: Write>(result: &FlowResult, output: &mut W) -> Result<()> {
    let Some(errors) = &result.errors else {
        return Ok(());
    };

    let city = result
        .description_placeholders
        .as_ref()
        .and_then(|p| p.get("city_name"))
        .map(String::as_str)
        .unwrap_or("");

    let mut errors: Vec<_> = errors.iter().collect();
    errors.sort();
    for (field, error) in errors {
        let message = match error.as_str() {
            "cannot_connect" => "Could not reach Ingresso.com".to_string(),
            "no_theaters" => format!("No theaters found in {}", city),
            "invalid_city" => "Unknown city".to_string(),
            "invalid_theater" => "Unknown theater".to_string(),
            other => format!("{}: {}", field, other),
        };
        writeln!(output, "! {}", message)?;
    }
    Ok(())
}

/// Ask every field; `None` when the user quits
fn ask_fields<R, W>(
    fields: &[FormField],
    input: &mut R,
    output: &mut W,
) -> Result<Option<Map<String, Value>>>
where
    R: BufRead,
    W: Write,
{
    let mut values = Map::new();

    for field in fields {
        loop {
            writeln!(output, "{}:", field.name)?;
            for (i, option) in field.options.iter().enumerate() {
                let marker = match &field.default {
                    Some(Value::String(d)) if d == &option.value => " (current)",
                    _ => "",
                };
                writeln!(output, "  {:>3}) {}{}", i + 1, option.label, marker)?;
            }
            write!(output, "> ")?;
            output.flush()?;

            let Some(line) = read_line(input)? else {
                bail!("input closed");
            };
            match parse_answer(field, &line) {
                Answer::Value(value) => {
                    values.insert(field.name.clone(), json!(value));
                    break;
                }
                Answer::Quit => return Ok(None),
                Answer::Invalid => writeln!(output, "! Pick a number from the list")?,
            }
        }
    }

    Ok(Some(values))
}

/// Number from the list, an option value, or empty for the default
fn parse_answer(field: &FormField, line: &str) -> Answer {
    if line == "q" {
        return Answer::Quit;
    }
    if line.is_empty() {
        return match &field.default {
            Some(Value::String(default)) => Answer::Value(default.clone()),
            _ => Answer::Invalid,
        };
    }
    if let Ok(n) = line.parse::<usize>() {
        if let Some(option) = n.checked_sub(1).and_then(|i| field.options.get(i)) {
            return Answer::Value(option.value.clone());
        }
    }
    match field.options.iter().find(|o| o.value == line) {
        Some(option) => Answer::Value(option.value.clone()),
        None => Answer::Invalid,
    }
}

/// Trimmed next line, `None` at end of input
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ingresso_api::{ApiResult, City, IngressoApi, Movie, NowPlayingQuery, Theater};
    use ingresso_config_entries::{ConfigEntries, Storage};
    use ingresso_config_flow::{FlowResultType, SelectOption};
    use std::io::Cursor;
    use std::sync::Arc;

    struct FixedApi;

    #[async_trait]
    impl IngressoApi for FixedApi {
        async fn fetch_now_playing(&self, _query: &NowPlayingQuery) -> ApiResult<Vec<Movie>> {
            Ok(Vec::new())
        }

        async fn fetch_cities(&self) -> ApiResult<Vec<City>> {
            Ok(vec![City {
                id: "48".to_string(),
                name: "Recife".to_string(),
                uf: "PE".to_string(),
            }])
        }

        async fn fetch_theaters(&self, _city_id: &str, _partnership: &str) -> ApiResult<Vec<Theater>> {
            Ok(vec![
                Theater {
                    id: "1260".to_string(),
                    name: "UCI Recife".to_string(),
                },
                Theater {
                    id: "1301".to_string(),
                    name: "Cinépolis Recife".to_string(),
                },
            ])
        }
    }

    fn field() -> FormField {
        FormField::select(
            "theater",
            vec![
                SelectOption::new("1260", "UCI Recife"),
                SelectOption::new("1301", "Cinépolis Recife"),
            ],
        )
    }

    #[test]
    fn test_parse_answer() {
        let f = field();
        assert_eq!(parse_answer(&f, "2"), Answer::Value("1301".to_string()));
        assert_eq!(parse_answer(&f, "1260"), Answer::Value("1260".to_string()));
        assert_eq!(parse_answer(&f, "0"), Answer::Invalid);
        assert_eq!(parse_answer(&f, "3"), Answer::Invalid);
        assert_eq!(parse_answer(&f, ""), Answer::Invalid);
        assert_eq!(parse_answer(&f, "q"), Answer::Quit);

        let f = field().with_default("1301");
        assert_eq!(parse_answer(&f, ""), Answer::Value("1301".to_string()));
    }

    #[tokio::test]
    async fn test_drive_to_create_entry() {
        let dir = tempfile::TempDir::new().unwrap();
        let entries = Arc::new(ConfigEntries::new(Arc::new(Storage::new(dir.path())), "ingresso"));
        let flows = FlowManager::new(Arc::new(FixedApi), entries.clone(), "encora");

        let start = flows.start_user_flow().await.unwrap();
        let mut input = Cursor::new("7\n1\n2\n");
        let mut output = Vec::new();
        let result = drive(&flows, start, &mut input, &mut output).await.unwrap();

        assert_eq!(result.result_type, FlowResultType::CreateEntry);
        assert_eq!(result.title.as_deref(), Some("Recife - Cinépolis Recife"));
        assert_eq!(entries.len(), 1);

        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("Recife - PE"));
        assert!(printed.contains("Pick a number"));
    }

    #[tokio::test]
    async fn test_quit_aborts() {
        let dir = tempfile::TempDir::new().unwrap();
        let entries = Arc::new(ConfigEntries::new(Arc::new(Storage::new(dir.path())), "ingresso"));
        let flows = FlowManager::new(Arc::new(FixedApi), entries.clone(), "encora");

        let start = flows.start_user_flow().await.unwrap();
        let mut input = Cursor::new("q\n");
        let result = drive(&flows, start, &mut input, &mut Vec::new()).await.unwrap();

        assert_eq!(result.result_type, FlowResultType::Abort);
        assert!(entries.is_empty());
        assert!(flows.list_flows().await.is_empty());
    }
}
