use crate::registry::RegistryScope;

use super::ResolvedArtifact;

const HEADERS: [&str; 5] = ["Artifact", "Version", "Depth", "Priority", "Selected"];

/// Render an installation plan as an aligned text table, in plan order.
///
/// Registry names are printed as seen from `scope`.
pub fn render_plan(plan: &[ResolvedArtifact], scope: &dyn RegistryScope) -> String {
    let rows: Vec<[String; 5]> = plan
        .iter()
        .map(|entry| {
            [
                entry.reference(scope),
                entry.artifact.version().to_string(),
                entry.depth.to_string(),
                entry.priority.to_string(),
                if entry.initial_selection { "yes" } else { "" }.to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let header = HEADERS.map(str::to_string);
    let rule = widths.map(|w| "-".repeat(w));
    for row in std::iter::once(&header).chain(std::iter::once(&rule)).chain(&rows) {
        let line: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}
