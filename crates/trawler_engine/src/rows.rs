use scraper::{ElementRef, Html, Selector};

/// Rows with fewer cells than this are unparseable and skipped.
pub const MIN_ROW_CELLS: usize = 6;

/// Flattens an HTML snapshot into ordered cell arrays.
///
/// Row candidates come from classic table bodies and from ARIA grid
/// rowgroups; only when neither matches anything does the whole document's
/// `tr` set serve as a fallback. Header rows fall out naturally: their cells
/// are `th`, not `td`, so they never reach the cell floor.
pub fn extract_rows(html: &str) -> Vec<Vec<String>> {
    let doc = Html::parse_document(html);

    let grouped = Selector::parse(
        "table tbody tr, \
         div[role=\"table\"] div[role=\"rowgroup\"] tr, \
         div[role=\"table\"] div[role=\"rowgroup\"] [role=\"row\"]",
    )
    .ok();
    let any_tr = Selector::parse("tr").ok();
    let cells = Selector::parse("td, [role=\"cell\"]").ok();

    let Some(cells) = cells else {
        return Vec::new();
    };

    let mut row_elements: Vec<ElementRef<'_>> = grouped
        .as_ref()
        .map(|sel| doc.select(sel).collect())
        .unwrap_or_default();
    if row_elements.is_empty() {
        if let Some(sel) = any_tr.as_ref() {
            row_elements = doc.select(sel).collect();
        }
    }

    row_elements
        .into_iter()
        .filter_map(|row| {
            let cell_texts: Vec<String> = row.select(&cells).map(cell_text).collect();
            (cell_texts.len() >= MIN_ROW_CELLS).then_some(cell_texts)
        })
        .collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
