//! Path navigation: `page`, `page/fieldPosition` or `page/fieldPosition/row`.

use crate::logic::LogicEvaluator;
use crate::rows::find_row;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GotoConfig {
    /// Open the row form when the path names a row
    #[serde(default)]
    pub open: bool,
}

/// Where a successful navigation lands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTarget {
    pub page_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_position_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_id: Option<String>,
    #[serde(default)]
    pub open_row_form: bool,
}

impl NavigationTarget {
    fn page(page_id: &str) -> Self {
        Self {
            page_id: page_id.to_string(),
            field_position_id: None,
            field_id: None,
            row_id: None,
            open_row_form: false,
        }
    }
}

/// Resolves a navigation path for the active view. `None` on any failure.
pub fn resolve(logic: &LogicEvaluator<'_>, doc: &formdoc_model::Document, path: &str, config: &GotoConfig) -> Option<NavigationTarget> {
    let mut components = path.split('/').filter(|c| !c.is_empty());
    let Some(page_id) = components.next() else {
        warn!("Navigation path is empty");
        return None;
    };
    let position_id = components.next();
    let row_id = components.next();

    let Some(page) = logic.pages_for_view().iter().find(|p| p.id == page_id) else {
        warn!(page_id, "Page not found in the active view");
        return None;
    };
    if !logic.should_show_page(page_id) {
        warn!(page_id, "Page is hidden");
        return None;
    }

    let mut target = NavigationTarget::page(page_id);
    let Some(position_id) = position_id else {
        return Some(target);
    };

    let Some(position) = page.field_positions.iter().find(|p| p.id == position_id) else {
        warn!(page_id, position_id, "Field position not found on page");
        return None;
    };
    if !logic.should_show_field(&position.field) {
        warn!(page_id, position_id, "Field is hidden");
        return None;
    }
    target.field_position_id = Some(position_id.to_string());
    target.field_id = Some(position.field.clone());

    let Some(row_id) = row_id else {
        return Some(target);
    };

    let Some(field) = doc.field(&position.field) else {
        warn!(field_id = %position.field, "Field not found");
        return None;
    };
    if !field.is_row_container() {
        warn!(field_id = %field.id, "Field is not a table or collection");
        return None;
    }
    if find_row(field, row_id).is_none() {
        warn!(field_id = %field.id, row_id, "Row not found or deleted");
        return None;
    }

    target.row_id = Some(row_id.to_string());
    target.open_row_form = config.open;
    Some(target)
}
