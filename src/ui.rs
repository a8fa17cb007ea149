use egui::Context;

use crate::controller::FrameView;

/// Debug readout text, regenerated only when its content changes
pub struct DebugText {
    text: String,
    generation: u64,
}

impl DebugText {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            generation: 0,
        }
    }

    /// Replace the text; returns false (and keeps the old buffer) when unchanged
    pub fn set(&mut self, text: String) -> bool {
        if text == self.text {
            return false;
        }
        self.text = text;
        self.generation += 1;
        true
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Bumped on every content change
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Default for DebugText {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the overlay and return egui output
pub fn build_ui(egui_ctx: &Context, raw_input: egui::RawInput, frame: &FrameView<'_>) -> egui::FullOutput {
    egui_ctx.run(raw_input, |ctx| {
        draw_debug_window(ctx, frame);
    })
}

fn draw_debug_window(ctx: &Context, frame: &FrameView<'_>) {
    egui::Window::new("Console")
        .default_pos([8.0, 8.0])
        .default_size([220.0, 120.0])
        .show(ctx, |ui| {
            for line in frame.debug_text.text().lines() {
                ui.label(egui::RichText::new(line).monospace().small());
            }
            ui.separator();
            ui.label(egui::RichText::new("Controls:").small());
            ui.label(egui::RichText::new("Arrows - Move x / z").small());
            ui.label(egui::RichText::new("W / S - Up / Down").small());
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_does_not_bump_generation() {
        let mut text = DebugText::new();
        assert!(text.set("pos: 0 0 0".to_string()));
        assert_eq!(text.generation(), 1);
        assert!(!text.set("pos: 0 0 0".to_string()));
        assert_eq!(text.generation(), 1);
        assert!(text.set("pos: 1 0 0".to_string()));
        assert_eq!(text.generation(), 2);
        assert_eq!(text.text(), "pos: 1 0 0");
    }
}
