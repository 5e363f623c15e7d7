//! The egui shell around a [`Session`].

mod history;

use eframe::{App, Frame, egui};
use fruitscan_core::{
    ClassificationError, ClassifyError, ClassifyTask, SUPPORTED_EXTENSIONS, Session, TaskPoll,
};
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};

/// Modal error box.
pub fn show_error(title: &str, message: &str) {
    let _ = MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title(title)
        .set_description(message)
        .set_buttons(MessageButtons::Ok)
        .show();
}

pub struct UiApp {
    session: Session,
    task: Option<ClassifyTask>,
    progress: f32,
    status: String,
    canvas_tex: Option<egui::TextureHandle>,
    canvas_dirty: bool,
}

impl UiApp {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            task: None,
            progress: 0.0,
            status: "Waiting for an image...".to_string(),
            canvas_tex: None,
            canvas_dirty: true,
        }
    }

    fn busy(&self) -> bool {
        self.task.is_some()
    }

    fn pick_image(&mut self) {
        let Some(path) = FileDialog::new()
            .set_title("Choose a fruit picture")
            .add_filter("Images", &SUPPORTED_EXTENSIONS)
            .pick_file()
        else {
            return;
        };
        match self.session.load_image(&path) {
            Ok(()) => {
                self.canvas_dirty = true;
                self.progress = 0.0;
                self.status = "Image loaded. Click 'Classify' to analyze it.".to_string();
            }
            Err(e) => show_error("Error", &format!("Could not load the image: {e}")),
        }
    }

    fn start_classify(&mut self) {
        match ClassifyTask::spawn(&mut self.session) {
            Ok(task) => {
                self.task = Some(task);
                self.progress = 0.0;
                self.status = "Classifying...".to_string();
            }
            Err(ClassifyError::Failed(e)) => self.report_failure(&e),
            // The button is disabled in these states.
            Err(e) => tracing::debug!("classify ignored: {e}"),
        }
    }

    fn poll_task(&mut self, ctx: &egui::Context) {
        let Some(task) = self.task.take() else {
            return;
        };
        match task.poll(&mut self.session) {
            TaskPoll::Pending(task, latest) => {
                self.task = Some(task);
                if let Some(p) = latest {
                    self.progress = f32::from(p.percent()) / 100.0;
                }
                ctx.request_repaint();
            }
            TaskPoll::Done(Ok(result)) => {
                self.progress = 1.0;
                self.status = format!(
                    "Detected fruit: {}\nConfidence: {}",
                    result.label,
                    result.confidence_display()
                );
            }
            TaskPoll::Done(Err(e)) => self.report_failure(&e),
        }
    }

    fn report_failure(&mut self, e: &ClassificationError) {
        self.progress = 0.0;
        self.status = "Classification failed. You can try again.".to_string();
        show_error("Error", &format!("Classification failed: {e}"));
    }

    fn canvas_texture(&mut self, ctx: &egui::Context) -> Option<egui::TextureId> {
        if self.canvas_dirty || self.canvas_tex.is_none() {
            let canvas = self.session.canvas();
            let size = [canvas.width() as usize, canvas.height() as usize];
            let color = egui::ColorImage::from_rgb(size, canvas.as_raw());
            self.canvas_tex = Some(ctx.load_texture("canvas", color, egui::TextureOptions::LINEAR));
            self.canvas_dirty = false;
        }
        self.canvas_tex.as_ref().map(|t| t.id())
    }
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_task(ctx);

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.heading("FruitScan");
            ui.label("Identify your fruit with a trained classifier.");
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!self.busy(), egui::Button::new("Load image..."))
                    .clicked()
                {
                    self.pick_image();
                }
                let can_classify = self.session.can_classify() && !self.busy();
                if ui
                    .add_enabled(can_classify, egui::Button::new("Classify"))
                    .clicked()
                {
                    self.start_classify();
                }
            });
        });

        egui::TopBottomPanel::bottom("history").show(ctx, |ui| {
            self.render_history_panel(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                let side = self.session.canvas().width() as f32;
                let (resp, painter) =
                    ui.allocate_painter(egui::Vec2::splat(side), egui::Sense::hover());
                if let Some(id) = self.canvas_texture(ctx) {
                    let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                    painter.image(id, resp.rect, uv, egui::Color32::WHITE);
                }

                ui.vertical(|ui| {
                    ui.label(&self.status);
                    ui.add_space(6.0);
                    ui.add(egui::ProgressBar::new(self.progress).desired_width(200.0));
                });
            });
        });
    }
}
