use super::{Context, OutputFormat};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use formdoc_engine::{DocumentEditor, LogicEvaluator};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct VisibilityArgs {
    /// Document JSON file
    pub document: PathBuf,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PageVisibility {
    page_id: String,
    visible: bool,
    fields: Vec<FieldVisibility>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldVisibility {
    field_position_id: String,
    field_id: String,
    visible: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    hidden_columns: Vec<String>,
}

fn collect(editor: &DocumentEditor) -> Vec<PageVisibility> {
    let logic = LogicEvaluator::new(editor.document(), &editor.config().active_view);
    logic
        .pages_for_view()
        .iter()
        .map(|page| PageVisibility {
            page_id: page.id.clone(),
            visible: editor.should_show_page(&page.id),
            fields: page
                .field_positions
                .iter()
                .map(|position| {
                    let columns = editor
                        .field(&position.field)
                        .map(|field| field.table_columns().iter().map(|c| c.id.clone()).collect::<Vec<_>>())
                        .unwrap_or_default();
                    FieldVisibility {
                        field_position_id: position.id.clone(),
                        field_id: position.field.clone(),
                        visible: editor.should_show_field(&position.field),
                        hidden_columns: columns
                            .into_iter()
                            .filter(|column| !editor.should_show_column(&position.field, column))
                            .collect(),
                    }
                })
                .collect(),
        })
        .collect()
}

pub fn visibility(args: VisibilityArgs, ctx: &Context) -> Result<()> {
    let editor = ctx.open(&args.document)?;
    let pages = collect(&editor);

    if ctx.format == OutputFormat::Json {
        return ctx.print_json(&pages);
    }

    println!("👁  {} view", editor.config().active_view.bright_white());
    for page in &pages {
        let marker = if page.visible { "●".green() } else { "○".dimmed() };
        println!("{} page {}", marker, page.page_id);
        for field in &page.fields {
            let marker = if field.visible { "●".green() } else { "○".dimmed() };
            print!("    {} {} ({})", marker, field.field_id, field.field_position_id);
            if !field.hidden_columns.is_empty() {
                print!(" hidden columns: {}", field.hidden_columns.join(", ").yellow());
            }
            println!();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formdoc_engine::EditorConfig;

    #[test]
    fn test_collects_pages_fields_and_columns() {
        let editor = DocumentEditor::from_json_str(
            r#"{
                "files": [ { "_id": "f", "pages": [ { "_id": "p1", "fieldPositions": [
                    { "_id": "fp1", "field": "t1" },
                    { "_id": "fp2", "field": "gone" }
                ] } ] } ],
                "fields": [
                    { "_id": "t1", "type": "table", "tableColumns": [
                        { "_id": "c1", "type": "text" },
                        { "_id": "c2", "type": "text", "hiddenViews": ["mobile"] }
                    ] },
                    { "_id": "gone", "type": "text", "hidden": true }
                ]
            }"#,
            EditorConfig::default(),
        )
        .unwrap();

        let pages = collect(&editor);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].visible);
        assert_eq!(pages[0].fields[0].hidden_columns, vec!["c2".to_string()]);
        assert!(!pages[0].fields[1].visible);
    }
}
