use eframe::egui::{Align2, Color32, Sense, Stroke, TextStyle, Vec2, Widget};

/// Dial for picking a number in `0..count`, e.g. the hour or the minute of a dose.
///
/// The first value sits at the top and values go clockwise.
pub struct Knob<'a> {
    value: &'a mut u8,
    count: u8,
    label_every: u8,
    hand_color: Option<Color32>,
    fill: Option<Color32>,
    stroke: Option<Stroke>,
    radius: Option<f32>,
}

impl<'a> Knob<'a> {
    pub fn new(value: &'a mut u8, count: u8) -> Self {
        Self {
            value,
            count: count.max(1),
            label_every: 1,
            hand_color: None,
            fill: None,
            stroke: None,
            radius: None,
        }
    }

    /// Only draw every n-th value around the rim
    pub fn label_every(mut self, n: u8) -> Self {
        self.label_every = n.max(1);
        self
    }

    /// Set how big the knob should be
    pub const fn radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    // set the outline color of the knob
    pub const fn stroke(mut self, stroke: Stroke) -> Self {
        self.stroke = Some(stroke);
        self
    }

    // set the background color of the knob
    pub const fn fill(mut self, fill: Color32) -> Self {
        self.fill = Some(fill);
        self
    }

    // set the hand color of the knob
    pub const fn hand_color(mut self, hand_color: Color32) -> Self {
        self.hand_color = Some(hand_color);
        self
    }
}

/// value under a pointer at `degrees` (0 = 12 o'clock, clockwise)
pub(crate) fn value_at_angle(degrees: f32, count: u8) -> u8 {
    let part_angle = 360. / f32::from(count);
    let index = (degrees.rem_euclid(360.) / part_angle).floor();
    // rounding at exactly 360 can land one past the end
    (index as u8).min(count - 1)
}

impl Widget for Knob<'_> {
    // partially from https://github.com/obsqrbtz/egui_knob and https://codeberg.org/pintariching/egui_timepicker
    fn ui(self, ui: &mut eframe::egui::Ui) -> eframe::egui::Response {
        let Self {
            value,
            count,
            label_every,
            hand_color,
            fill,
            stroke,
            radius,
        } = self;

        let desired_radius = radius.unwrap_or_else(|| ui.spacing().slider_width / 2.);
        let (rect, mut response) =
            ui.allocate_exact_size(Vec2::splat(desired_radius * 2.), Sense::click_and_drag());
        // the angle (degrees) for each value
        let part_angle = 360. / f32::from(count);
        if response.dragged() || response.clicked() {
            if let Some(pointer) = response.interact_pointer_pos() {
                // inverse of the drawing math below, +90 so the top is 0
                let angle = (pointer - rect.center()).angle().to_degrees() + 90.;
                let new_value = value_at_angle(angle, count);
                if new_value != *value {
                    *value = new_value;
                    response.mark_changed();
                }
            }
        }
        let visuals = ui.style().interact(&response);
        ui.painter().circle_filled(
            rect.center(),
            desired_radius,
            fill.unwrap_or(visuals.bg_fill),
        );
        let border_stroke = stroke.unwrap_or(visuals.fg_stroke);
        for i in (0..count).step_by(usize::from(label_every)) {
            let angle = part_angle.mul_add(f32::from(i), -90.);
            let position = rect.center()
                + Vec2::angled(angle.to_radians())
                    * (desired_radius - ui.style().spacing.icon_width_inner);
            ui.painter().text(
                position,
                Align2::CENTER_CENTER,
                format!("{i:02}"),
                TextStyle::Small.resolve(ui.style()),
                ui.style().visuals.text_color(),
            );
        }
        ui.painter()
            .circle_stroke(rect.center(), desired_radius, border_stroke);
        // we subtract 90 so the first value is at the top
        let angle = part_angle.mul_add(f32::from(*value), -90.);
        let tip = rect.center() + Vec2::angled(angle.to_radians()) * desired_radius * 0.7;
        let mut hand_stroke = visuals.fg_stroke;
        if let Some(color) = hand_color {
            hand_stroke.color = color;
        }
        ui.painter().line_segment([rect.center(), tip], hand_stroke);
        ui.painter().circle_filled(
            tip,
            hand_stroke.width * 2.,
            hand_color.unwrap_or(visuals.fg_stroke.color),
        );
        response
    }
}
