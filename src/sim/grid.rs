use serde::{Deserialize, Serialize};

use crate::domain::{Footprint, Pose, Track};
use crate::geometry::{bearing_degrees, normalize};

fn default_car_size_ratio() -> f64 {
    0.2
}
fn default_car_length_ratio() -> f64 {
    2.0
}
fn default_offset_factor() -> f64 {
    2.0
}
fn default_row_offset_factor() -> f64 {
    1.1
}
fn default_spacing_factor() -> f64 {
    1.5
}

/// Starting grid proportions, all relative to the track width at the
/// finish line.
///
/// Car width is `track width * car_size_ratio` and car length is
/// `width * car_length_ratio`. The first row sits `offset_factor` car
/// lengths behind the line, each further row `row_offset_factor` car
/// lengths behind the previous, and the two cars of a row are
/// `spacing_factor` car widths apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    #[serde(default = "default_car_size_ratio")]
    pub car_size_ratio: f64,
    #[serde(default = "default_car_length_ratio")]
    pub car_length_ratio: f64,
    #[serde(default = "default_offset_factor")]
    pub offset_factor: f64,
    #[serde(default = "default_row_offset_factor")]
    pub row_offset_factor: f64,
    #[serde(default = "default_spacing_factor")]
    pub spacing_factor: f64,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            car_size_ratio: default_car_size_ratio(),
            car_length_ratio: default_car_length_ratio(),
            offset_factor: default_offset_factor(),
            row_offset_factor: default_row_offset_factor(),
            spacing_factor: default_spacing_factor(),
        }
    }
}

impl GridLayout {
    /// Rectangle footprint of a grid car on `track`
    pub fn footprint(&self, track: &Track) -> Footprint {
        Footprint::for_track_width(
            track.width_at_finish(),
            self.car_size_ratio,
            self.car_length_ratio,
        )
    }
}

/// Poses for `count` cars lined up two abreast behind the finish gate,
/// all facing across it. Slot 0 is nearest the line.
pub fn starting_grid(track: &Track, count: usize, layout: &GridLayout) -> Vec<Pose> {
    let gate = track.finish_gate();
    let (ox, oy) = gate.outer_anchor();
    let (ix, iy) = gate.inner_anchor();
    // Square fallback gates have no direction; lay the grid along +x
    let along = normalize((ix - ox, iy - oy)).unwrap_or((1.0, 0.0));
    let forward = (-along.1, along.0);
    let heading = bearing_degrees((0.0, 0.0), forward).unwrap_or(0.0);

    let car_width = track.width_at_finish() * layout.car_size_ratio;
    let car_length = car_width * layout.car_length_ratio;
    let offset = car_length * layout.offset_factor;
    let row_offset = car_length * layout.row_offset_factor;
    let spacing = car_width * layout.spacing_factor;
    let (mx, my) = gate.midpoint();

    (0..count)
        .map(|slot| {
            let row = (slot / 2) as f64;
            let col = (slot % 2) as f64 - 0.5;
            let back = offset + row * row_offset;
            Pose::new(
                mx - forward.0 * back + along.0 * col * spacing,
                my - forward.1 * back + along.1 * col * spacing,
                heading,
            )
        })
        .collect()
}
