use crate::io;
use crate::metrics::{calculate_code_metrics, CodeMetrics};
use anyhow::{Context, Result};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Table};
use std::path::Path;

pub fn run_metrics(file: &Path, json: bool) -> Result<()> {
    let code = io::read_file(file)?;
    let metrics = calculate_code_metrics(&code, None)
        .with_context(|| format!("Failed to analyze {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    println!("{}", file.display().to_string().bold().blue());
    println!("  Characters: {}", metrics.len);
    println!("  Lines: {}", metrics.lines);
    println!(
        "  Cyclomatic complexity: {}",
        complexity_display(metrics.cyc_comp)
    );
    println!("  Nodes: {}", metrics.nodes.all);
    println!();
    println!("{}", render_kind_table(&metrics));
    Ok(())
}

/// Node count and volume of every kind present in the file
pub fn render_kind_table(metrics: &CodeMetrics) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Kind", "Nodes", "Volume"]);

    for (kind, count) in metrics.nodes.kinds.iter().filter(|(_, count)| *count > 0) {
        table.add_row(vec![
            Cell::new(kind.name()),
            Cell::new(count).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", metrics.volumes[kind])).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

fn complexity_display(cyc_comp: usize) -> ColoredString {
    let text = cyc_comp.to_string();
    match cyc_comp {
        0..=10 => text.green(),
        11..=20 => text.yellow(),
        _ => text.red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_table_lists_present_kinds() {
        let metrics = calculate_code_metrics("x = 1\nif x:\n    print(x)\n", None).unwrap();
        let rendered = render_kind_table(&metrics).to_string();

        assert!(rendered.contains("Kind"));
        assert!(rendered.contains("CONDITION"));
        assert!(rendered.contains("CALL"));
        assert!(!rendered.contains("LOOP"));
    }
}
