use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table as Grid};

use crate::cards::ALL_BJ_RANKS;
use crate::evaluate::{BatchAggregate, RunSummary};
use crate::evolve::GenerationReport;
use crate::genome::{Genome, MeanGenome, Table, ALL_TABLES, COLS};

fn action_letter(table: Table) -> &'static str {
    match table {
        Table::Split => "P",
        Table::SoftDouble | Table::HardDouble => "D",
        Table::SoftStand | Table::HardStand => "S",
    }
}

fn row_heading(table: Table, row: usize) -> String {
    let label = table.row_label(row);
    match table {
        Table::Split => format!("{}{}", label, label),
        Table::SoftDouble => format!("A{}", label),
        _ => label,
    }
}

/// Rows shown for a table. The fixed row is left out.
fn shown_rows(table: Table) -> impl Iterator<Item = usize> {
    let skip = table.forced_row().map(|(row, _)| row);
    (0..table.rows()).filter(move |&r| Some(r) != skip)
}

fn grid_header() -> Vec<Cell> {
    let mut header = vec![Cell::new("")];
    for rank in ALL_BJ_RANKS {
        header.push(Cell::new(rank.to_string()).set_alignment(CellAlignment::Center));
    }
    header
}

pub fn genome_grid(genome: &Genome, table: Table) -> String {
    let mut grid = Grid::new();
    grid.set_content_arrangement(ContentArrangement::Dynamic);
    grid.set_header(grid_header());

    let yes = action_letter(table);
    for row in shown_rows(table) {
        let mut cells = vec![Cell::new(row_heading(table, row).bold().to_string())];
        for col in 0..COLS {
            let cell = if genome.cell(table, row, col) {
                Cell::new(yes.green().bold().to_string())
            } else {
                Cell::new("-".dimmed().to_string())
            };
            cells.push(cell.set_alignment(CellAlignment::Center));
        }
        grid.add_row(cells);
    }

    format!("  {}\n{}", table.as_str().bold(), grid)
}

pub fn mean_grid(mean: &MeanGenome, table: Table) -> String {
    let mut grid = Grid::new();
    grid.set_content_arrangement(ContentArrangement::Dynamic);
    grid.set_header(grid_header());

    for row in shown_rows(table) {
        let mut cells = vec![Cell::new(row_heading(table, row).bold().to_string())];
        for col in 0..COLS {
            let p = mean.cell(table, row, col);
            let text = format!("{:.2}", p);
            let styled = if p >= 0.75 {
                text.green().bold().to_string()
            } else if p > 0.25 {
                text.yellow().to_string()
            } else {
                text.dimmed().to_string()
            };
            cells.push(Cell::new(styled).set_alignment(CellAlignment::Center));
        }
        grid.add_row(cells);
    }

    format!("  {} (probability)\n{}", table.as_str().bold(), grid)
}

pub fn genome_tables(genome: &Genome) -> String {
    ALL_TABLES
        .iter()
        .map(|&t| genome_grid(genome, t))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn mean_tables(mean: &MeanGenome) -> String {
    ALL_TABLES
        .iter()
        .map(|&t| mean_grid(mean, t))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn rate(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => "n/a".dimmed().to_string(),
    }
}

fn signed_rate(value: Option<f64>) -> String {
    match value {
        Some(v) if v >= 0.0 => format!("{:+.2}%", v * 100.0).green().to_string(),
        Some(v) => format!("{:+.2}%", v * 100.0).red().to_string(),
        None => "n/a".dimmed().to_string(),
    }
}

pub fn summary_table(summary: &RunSummary) -> String {
    let mut table = Grid::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Metric").set_alignment(CellAlignment::Left),
        Cell::new("Value").set_alignment(CellAlignment::Right),
    ]);

    let rows: Vec<(&str, String)> = vec![
        ("Rounds played", summary.rounds_played.to_string()),
        ("Hands settled", summary.hands_settled.to_string()),
        ("Hands won", summary.hands_won.to_string()),
        ("Hands lost", summary.hands_lost.to_string()),
        ("Draws", summary.draws.to_string()),
        ("Win rate", rate(summary.win_rate)),
        ("Loss rate", rate(summary.loss_rate)),
        ("Draw rate", rate(summary.draw_rate)),
        ("Edge", signed_rate(summary.edge)),
        ("Doubled", rate(summary.double_rate)),
        ("Doubled and won", rate(summary.double_win_rate)),
        ("Doubled and lost", rate(summary.double_loss_rate)),
        ("Split", rate(summary.split_rate)),
        ("Split hand won", rate(summary.split_win_rate)),
        ("Split hand lost", rate(summary.split_loss_rate)),
        ("Player bankroll", summary.final_bankroll.to_string()),
        ("Dealer bankroll", summary.final_dealer_bankroll.to_string()),
        ("Fitness", format!("{:.4}", summary.fitness)),
    ];
    for (name, value) in rows {
        table.add_row(vec![
            Cell::new(name.bold().to_string()),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }
    if summary.bankrupt {
        table.add_row(vec![
            Cell::new("Bankrupt".bold().to_string()),
            Cell::new("yes".red().bold().to_string()).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

pub fn batch_table(summaries: &[RunSummary], aggregate: &BatchAggregate) -> String {
    let mut table = Grid::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Run", "Rounds", "Bankroll", "Fitness", "Edge", "Bankrupt"]);

    for (i, s) in summaries.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(s.rounds_played).set_alignment(CellAlignment::Right),
            Cell::new(s.final_bankroll).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.4}", s.fitness)).set_alignment(CellAlignment::Right),
            Cell::new(signed_rate(s.edge)).set_alignment(CellAlignment::Right),
            Cell::new(if s.bankrupt { "yes".red().to_string() } else { "no".to_string() }),
        ]);
    }
    table.add_row(vec![
        Cell::new("mean".bold().to_string()),
        Cell::new(""),
        Cell::new(format!("{:.1}", aggregate.mean_final_bankroll)).set_alignment(CellAlignment::Right),
        Cell::new(format!("{:.4}", aggregate.mean_fitness)).set_alignment(CellAlignment::Right),
        Cell::new(signed_rate(aggregate.mean_edge)).set_alignment(CellAlignment::Right),
        Cell::new(format!("{}/{}", aggregate.bankrupt, aggregate.runs)),
    ]);

    table.to_string()
}

pub fn generation_table(reports: &[GenerationReport]) -> String {
    let mut table = Grid::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Generation", "Elite mean", "Best", "Broke"]);
    for r in reports {
        table.add_row(vec![
            Cell::new(r.generation),
            Cell::new(format!("{:.4}", r.elite_mean)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.4}", r.best)).set_alignment(CellAlignment::Right),
            Cell::new(r.bankrupt).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

pub fn print_section(title: &str, content: &str) {
    println!("\n{}", title.cyan().bold());
    println!("{}", content);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{} {}", "\u{2713}".green().bold(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::basic_strategy;

    #[test]
    fn fixed_row_is_not_shown() {
        assert_eq!(shown_rows(Table::Split).count(), 10);
        assert_eq!(shown_rows(Table::SoftDouble).count(), 9);
        assert_eq!(shown_rows(Table::HardStand).last(), Some(18));
    }

    #[test]
    fn row_headings() {
        assert_eq!(row_heading(Table::Split, 7), "88");
        assert_eq!(row_heading(Table::SoftDouble, 5), "A6");
        assert_eq!(row_heading(Table::HardStand, 10), "12");
    }

    #[test]
    fn grid_lists_every_upcard() {
        colored::control::set_override(false);
        let out = genome_grid(&basic_strategy(), Table::Split);
        assert!(out.contains("split"));
        assert!(out.contains('T'));
        assert!(out.contains('P'));
    }
}
