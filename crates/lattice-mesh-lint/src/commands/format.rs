//! Formatting utilities for table output

/// Render rows as a column-aligned table with headers.
///
/// Each row is a Vec of strings. Cells beyond the header count are dropped.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let num_cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(num_cols) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(render_line(headers, &widths));
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        lines.push(render_line(&cells, &widths));
    }
    lines.join("\n")
}

fn render_line(cells: &[&str], widths: &[usize]) -> String {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    line.join("  ").trim_end().to_string()
}

/// Print rows as a column-aligned table with headers.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    println!("{}", format_table(headers, rows));
}
