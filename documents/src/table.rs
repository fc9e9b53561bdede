//! Rendering of scraped statistics tables into text blocks.

use crate::record::StatTable;

/// Placeholder for an empty cell.
const MISSING: &str = "N/A";

/// One rendered slice of a statistics table.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TablePart {
    pub text: String,
    pub part: usize,
    pub parts: usize,
    pub rows: usize,
}

/// `per_game` -> `Per Game`.
pub(crate) fn table_title(table_id: &str) -> String {
    table_id
        .split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_row(headers: &[String], row: &[Option<String>]) -> String {
    row.iter()
        .enumerate()
        .map(|(i, cell)| {
            let value = cell
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(MISSING);
            match headers.get(i).map(|h| h.trim()).filter(|h| !h.is_empty()) {
                Some(header) => format!("{header}: {value}"),
                None => format!("Column {}: {value}", i + 1),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a table as one or more text blocks of at most `max_rows` rows.
///
/// `subject` is the opening line that names who the table is about; it is
/// repeated in every part so each block stands on its own. Tables without
/// populated rows render to nothing.
pub(crate) fn render_table(
    subject: &str,
    table_id: &str,
    table: &StatTable,
    max_rows: usize,
) -> Vec<TablePart> {
    let rows: Vec<&Vec<Option<String>>> = table.populated_rows().collect();
    if rows.is_empty() {
        return Vec::new();
    }

    let max_rows = max_rows.max(1);
    let title = table_title(table_id);
    let parts = rows.len().div_ceil(max_rows);

    rows.chunks(max_rows)
        .enumerate()
        .map(|(i, chunk)| {
            let mut text = format!("{subject}\n{title} Statistics");
            if parts > 1 {
                text.push_str(&format!(" (part {} of {parts})", i + 1));
            }
            if !table.headers.is_empty() {
                text.push_str(&format!("\nColumns: {}", table.headers.join(", ")));
            }
            for (offset, row) in chunk.iter().enumerate() {
                let number = i * max_rows + offset + 1;
                text.push_str(&format!("\nRow {number}: {}", render_row(&table.headers, row)));
            }
            TablePart {
                text,
                part: i + 1,
                parts,
                rows: chunk.len(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cell(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_table_title() {
        assert_eq!(table_title("per_game"), "Per Game");
        assert_eq!(table_title("advanced"), "Advanced");
    }

    #[test]
    fn test_render_table_splits_and_repeats_subject() {
        let table = StatTable {
            headers: vec!["Season".to_string(), "PTS".to_string()],
            rows: vec![
                vec![cell("2018-19"), cell("27.4")],
                vec![cell("2019-20"), None],
                vec![cell("2020-21"), cell("25.0")],
            ],
        };

        let parts = render_table("Player: LeBron James", "per_game", &table, 2);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].text.starts_with("Player: LeBron James\nPer Game Statistics (part 1 of 2)"));
        assert!(parts[0].text.contains("Row 2: Season: 2019-20, PTS: N/A"));
        assert!(parts[1].text.starts_with("Player: LeBron James"));
        assert!(parts[1].text.contains("Row 3: Season: 2020-21, PTS: 25.0"));
        assert_eq!(parts[1].rows, 1);
    }

    #[test]
    fn test_render_empty_table() {
        let table = StatTable {
            headers: vec!["Season".to_string()],
            rows: vec![vec![None]],
        };
        assert!(render_table("Coach: X", "coaching", &table, 10).is_empty());
    }
}
