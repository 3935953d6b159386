use egui::Context;

use crate::controller::Simulation;

/// Readouts the panel shows but does not own.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PanelStats {
    pub fps: f32,
    pub ducks: usize,
}

/// Build the debug panel and return egui output
pub fn build_ui(
    egui_ctx: &Context,
    raw_input: egui::RawInput,
    sim: &mut Simulation,
    stats: PanelStats,
) -> egui::FullOutput {
    egui_ctx.run(raw_input, |ctx| {
        draw_debug_window(ctx, sim, stats);
    })
}

fn to_srgb8(rgb: [f32; 3]) -> [u8; 3] {
    rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn from_srgb8(rgb: [u8; 3]) -> [f32; 3] {
    rgb.map(|c| c as f32 / 255.0)
}

pub fn draw_debug_window(ctx: &Context, sim: &mut Simulation, stats: PanelStats) {
    egui::Window::new("Debug")
        .default_pos([8.0, 8.0])
        .default_width(260.0)
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(format!("FPS: {:.0}", stats.fps)).small());
            ui.label(egui::RichText::new(format!("Ducks: {}", stats.ducks)).small());
            ui.separator();

            ui.add(
                egui::Slider::new(&mut sim.lights.ambient.intensity, 0.0..=1.0)
                    .step_by(0.01)
                    .text("Ambient Light Intensity"),
            );
            ui.add(
                egui::Slider::new(&mut sim.lights.moon.intensity, 0.0..=1.0)
                    .step_by(0.01)
                    .text("Moon Directional Light Intensity"),
            );
            ui.add(
                egui::Slider::new(&mut sim.lights.sun.intensity, 0.0..=4.0)
                    .step_by(0.01)
                    .text("Sun Directional Light Intensity"),
            );

            ui.horizontal(|ui| {
                let mut color = to_srgb8(sim.lights.ghost.color);
                if ui.color_edit_button_srgb(&mut color).changed() {
                    sim.lights.ghost.color = from_srgb8(color);
                }
                ui.label("color");
            });

            if ui.button("createDuck").clicked() {
                sim.spawn_random_duck();
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ghost_colour_survives_the_picker() {
        let ghost = crate::config::hex_rgb(0x95f0d7);
        assert_eq!(to_srgb8(ghost), [0x95, 0xf0, 0xd7]);
        assert_eq!(from_srgb8(to_srgb8(ghost)), ghost);
    }
}
