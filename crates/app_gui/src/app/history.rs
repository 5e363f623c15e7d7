//! Recent-classifications table and CSV export.

use super::{UiApp, show_error};
use eframe::egui;
use fruitscan_core::export_csv;
use rfd::FileDialog;

impl UiApp {
    /// Renders the last few history records, oldest first.
    pub(super) fn render_history_panel(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.strong("History");
            let records = self.session.history().records();
            if ui
                .add_enabled(!records.is_empty(), egui::Button::new("Export CSV"))
                .clicked()
                && let Some(path) = FileDialog::new()
                    .add_filter("CSV", &["csv"])
                    .set_file_name("classification_history.csv")
                    .save_file()
            {
                match export_csv(records, &path) {
                    Ok(()) => self.status = format!("History exported: {}", path.display()),
                    Err(e) => show_error("Error", &format!("Export failed: {e:#}")),
                }
            }
        });
        ui.add_space(4.0);
        egui::Grid::new("history-grid")
            .num_columns(3)
            .striped(true)
            .min_col_width(130.0)
            .show(ui, |ui| {
                ui.strong("Date");
                ui.strong("Prediction");
                ui.strong("Confidence");
                ui.end_row();
                for record in self.session.recent_history() {
                    ui.label(record.date());
                    ui.label(record.prediction());
                    ui.label(record.confidence());
                    ui.end_row();
                }
            });
    }
}
