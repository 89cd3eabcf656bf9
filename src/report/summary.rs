//! Terminal tables for churn summaries and training runs

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use super::analytics::ChurnSummary;

/// Summary of an offline training run
#[derive(Debug, Default)]
pub struct TrainingReport {
    pub rows: usize,
    pub columns: usize,
    pub trained: bool,
    pub accuracy: Option<f64>,
    pub top_features: Vec<(String, f64)>,
    pub train_time: Option<Duration>,
}

impl TrainingReport {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            ..Default::default()
        }
    }

    pub fn set_train_time(&mut self, elapsed: Duration) {
        self.train_time = Some(elapsed);
    }

    pub fn display(&self) {
        print_heading("📋", "TRAINING SUMMARY");

        let mut table = new_table();
        table.add_row(vec![Cell::new("📁 Rows"), Cell::new(self.rows)]);
        table.add_row(vec![Cell::new("🧮 Columns"), Cell::new(self.columns)]);
        table.add_row(vec![
            Cell::new("🌲 Model"),
            if self.trained {
                Cell::new("trained").fg(Color::Green).add_attribute(Attribute::Bold)
            } else {
                Cell::new("skipped (no Churn column)").fg(Color::Yellow)
            },
        ]);
        if let Some(accuracy) = self.accuracy {
            table.add_row(vec![
                Cell::new("🎯 Training accuracy"),
                Cell::new(format!("{:.2}%", accuracy))
                    .fg(accuracy_color(accuracy))
                    .add_attribute(Attribute::Bold),
            ]);
        }
        if let Some(elapsed) = self.train_time {
            table.add_row(vec![
                Cell::new("⏱️  Train time"),
                Cell::new(format!("{:.2}s", elapsed.as_secs_f64())),
            ]);
        }
        print_indented(&table);

        if !self.top_features.is_empty() {
            print_heading("📝", "TOP FEATURES");
            let mut table = new_table();
            table.set_header(vec![
                Cell::new("Feature").add_attribute(Attribute::Bold),
                Cell::new("Importance").add_attribute(Attribute::Bold),
            ]);
            for (feature, importance) in &self.top_features {
                table.add_row(vec![
                    Cell::new(feature),
                    Cell::new(format!("{:.4}", importance)),
                ]);
            }
            print_indented(&table);
        }
    }
}

/// Print a churn summary as a table
pub fn display_churn_summary(summary: &ChurnSummary) {
    print_heading("📊", "CHURN SUMMARY");

    let mut table = new_table();
    table.add_row(vec![
        Cell::new("👥 Total customers"),
        Cell::new(summary.total_customers),
    ]);
    table.add_row(vec![
        Cell::new("📉 Churn rate"),
        rate_cell(summary.churn_rate, Color::Red),
    ]);
    table.add_row(vec![
        Cell::new("📈 Retention rate"),
        rate_cell(summary.retention_rate, Color::Green),
    ]);
    print_indented(&table);

    if !summary.contract_breakdown.is_empty() {
        print_heading("📝", "CHURN BY CONTRACT");
        let mut table = new_table();
        table.set_header(vec![
            Cell::new("Contract").add_attribute(Attribute::Bold),
            Cell::new("Churn rate").add_attribute(Attribute::Bold),
        ]);
        for entry in &summary.contract_breakdown {
            table.add_row(vec![
                Cell::new(&entry.contract),
                Cell::new(format!("{:.1}%", entry.churn_rate)),
            ]);
        }
        print_indented(&table);
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table
}

fn rate_cell(rate: Option<f64>, color: Color) -> Cell {
    match rate {
        Some(rate) => Cell::new(format!("{:.1}%", rate))
            .fg(color)
            .add_attribute(Attribute::Bold),
        None => Cell::new("n/a").fg(Color::DarkGrey),
    }
}

fn accuracy_color(accuracy: f64) -> Color {
    if accuracy > 90.0 {
        Color::Green
    } else if accuracy > 75.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn print_heading(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}
