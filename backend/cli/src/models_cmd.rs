//! CLI Models Command
//!
//! Lists the models the hosted endpoint offers for this key.

use qchat_core::Model;

use crate::terminal_output::{note_warn, render_table, Column};

pub fn models_table(models: &[Model]) -> String {
    let columns = [
        Column::right("#"),
        Column::left("Model"),
        Column::left("Description").with_max_width(60),
    ];
    let rows: Vec<Vec<String>> = models
        .iter()
        .enumerate()
        .map(|(i, m)| vec![(i + 1).to_string(), m.id.clone(), m.description.clone()])
        .collect();
    render_table(&columns, &rows)
}

pub fn run(models: &[Model]) {
    if models.is_empty() {
        note_warn("No models available for this API key.");
        return;
    }
    println!("\n{}", models_table(models));
}
