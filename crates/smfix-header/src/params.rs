//! Print parameters scraped from the processed G-code
//!
//! Slicers list their settings as `; key = value` comments. Those, the move
//! commands and the tool changes are folded into one [`HeaderParams`]
//! record that the header layouts read from.

use serde::Serialize;
use smfix_core::Sequence;
use smfix_settings::HeaderSettings;

use crate::estimate::parse_estimated_time;
use crate::thumbnail::extract_thumbnail;

pub const TOOLHEAD_SINGLE: &str = "singleExtruderToolheadForSM2";
pub const TOOLHEAD_DUAL: &str = "dualExtruderToolheadForSM2";

/// The IDEX printer; always gets the versioned header
pub const MODEL_J1: &str = "Snapmaker J1";

/// Slicer setting keys per field, most specific first
const LAYER_HEIGHT: &[&str] = &["layer_height"];
const NOZZLE_DIAMETER: &[&str] = &["nozzle_diameter"];
const FILAMENT_TYPE: &[&str] = &["filament_type"];
const NOZZLE_TEMPERATURE: &[&str] = &[
    "nozzle_temperature_initial_layer",
    "first_layer_temperature",
    "nozzle_temperature",
    "temperature",
];
const BED_TEMPERATURE: &[&str] = &[
    "hot_plate_temp_initial_layer",
    "first_layer_bed_temperature",
    "hot_plate_temp",
    "bed_temperature",
];
const RETRACTION: &[&str] = &["retraction_length", "retract_length"];
const SWITCH_RETRACTION: &[&str] = &["retract_length_toolchange"];
const PRINT_SPEED: &[&str] = &["max_print_speed", "outer_wall_speed", "perimeter_speed"];
const FILAMENT_USED_MM: &[&str] = &["filament used [mm]"];
const FILAMENT_USED_G: &[&str] = &["filament used [g]"];
const PRINTER_MODEL: &[&str] = &["printer_model"];
const TOTAL_LAYERS: &[&str] = &["total layers count"];
const ESTIMATED_TIME: &[&str] = &["estimated printing time (normal mode)"];

/// Value of a `; <key> = <value>` comment for the first matching key
///
/// Returns the index of the key that matched along with the trimmed value.
/// Empty values do not count.
pub fn setting<'a>(comment: &'a str, keys: &[&str]) -> Option<(usize, &'a str)> {
    if comment.len() <= 5 || !comment.starts_with(';') {
        return None;
    }
    keys.iter().enumerate().find_map(|(i, key)| {
        let value = comment
            .strip_prefix("; ")?
            .strip_prefix(*key)?
            .strip_prefix(" =")?
            .trim();
        (!value.is_empty()).then_some((i, value))
    })
}

/// Split a per-tool list on `;` when present, otherwise `,`
///
/// Always yields at least two trimmed entries.
pub fn split_list(value: &str) -> Vec<String> {
    let delimiter = if value.contains(';') { ';' } else { ',' };
    let mut entries: Vec<String> = value.split(delimiter).map(|s| s.trim().to_string()).collect();
    while entries.len() < 2 {
        entries.push(String::new());
    }
    entries
}

/// Numeric per-tool list; entries that do not parse are zero
pub fn split_floats(value: &str) -> Vec<f64> {
    split_list(value)
        .iter()
        .map(|s| s.parse::<f64>().unwrap_or(0.0))
        .collect()
}

fn pair<T: Clone + Default>(values: &[T]) -> [T; 2] {
    [
        values.first().cloned().unwrap_or_default(),
        values.get(1).cloned().unwrap_or_default(),
    ]
}

/// Work range of the absolute moves
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub max_z: f64,
}

#[derive(Debug, Default)]
struct AxisRange {
    min: Option<f64>,
    max: Option<f64>,
}

impl AxisRange {
    fn observe(&mut self, value: f64) {
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }
}

/// Everything the firmware header needs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeaderParams {
    /// 0 for the legacy layout, 1 for the versioned one
    pub version: u8,
    pub model: String,
    pub tool_head: String,
    pub print_mode: String,
    /// Body lines, not counting the header
    pub total_lines: usize,
    pub total_layers: usize,
    pub layer_height: f64,
    pub estimated_time_sec: u64,
    pub print_speed_sec: f64,
    pub nozzle_diameters: [f64; 2],
    pub nozzle_temperatures: [f64; 2],
    pub bed_temperatures: [f64; 2],
    pub retractions: [f64; 2],
    pub switch_retractions: [f64; 2],
    pub filament_types: [String; 2],
    pub filament_used_mm: [f64; 2],
    pub filament_used_g: [f64; 2],
    pub bounds: Bounds,
    pub left_extruder_used: bool,
    pub right_extruder_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Best match per field; a more specific key beats a later line
#[derive(Default)]
struct Found<'a> {
    value: Option<(usize, &'a str)>,
}

impl<'a> Found<'a> {
    fn offer(&mut self, comment: &'a str, keys: &[&str]) {
        if let Some((rank, value)) = setting(comment, keys) {
            if self.value.map_or(true, |(best, _)| rank <= best) {
                self.value = Some((rank, value));
            }
        }
    }

    fn get(&self) -> Option<&'a str> {
        self.value.map(|(_, v)| v)
    }
}

#[derive(Default)]
struct Settings<'a> {
    layer_height: Found<'a>,
    nozzle_diameter: Found<'a>,
    filament_type: Found<'a>,
    nozzle_temperature: Found<'a>,
    bed_temperature: Found<'a>,
    retraction: Found<'a>,
    switch_retraction: Found<'a>,
    print_speed: Found<'a>,
    filament_used_mm: Found<'a>,
    filament_used_g: Found<'a>,
    printer_model: Found<'a>,
    total_layers: Found<'a>,
    estimated_time: Found<'a>,
}

impl<'a> Settings<'a> {
    fn offer(&mut self, comment: &'a str) {
        self.layer_height.offer(comment, LAYER_HEIGHT);
        self.nozzle_diameter.offer(comment, NOZZLE_DIAMETER);
        self.filament_type.offer(comment, FILAMENT_TYPE);
        self.nozzle_temperature.offer(comment, NOZZLE_TEMPERATURE);
        self.bed_temperature.offer(comment, BED_TEMPERATURE);
        self.retraction.offer(comment, RETRACTION);
        self.switch_retraction.offer(comment, SWITCH_RETRACTION);
        self.print_speed.offer(comment, PRINT_SPEED);
        self.filament_used_mm.offer(comment, FILAMENT_USED_MM);
        self.filament_used_g.offer(comment, FILAMENT_USED_G);
        self.printer_model.offer(comment, PRINTER_MODEL);
        self.total_layers.offer(comment, TOTAL_LAYERS);
        self.estimated_time.offer(comment, ESTIMATED_TIME);
    }
}

fn floats(found: &Found<'_>) -> [f64; 2] {
    found.get().map_or([0.0; 2], |v| pair(&split_floats(v)))
}

fn first_float(found: &Found<'_>) -> f64 {
    floats(found)[0]
}

impl HeaderParams {
    /// Scrape the processed body
    pub fn from_sequence(sequence: &Sequence, settings: &HeaderSettings) -> Self {
        let mut found = Settings::default();
        let mut layer_changes = 0usize;
        let mut absolute = true;
        let (mut x, mut y, mut z) = (
            AxisRange::default(),
            AxisRange::default(),
            AxisRange::default(),
        );
        let (mut left, mut right) = (false, false);

        for block in sequence.iter() {
            if block.is_comment() {
                let comment = block.comment();
                if comment.starts_with(";LAYER_CHANGE") {
                    layer_changes += 1;
                }
                found.offer(comment);
                continue;
            }

            if block.is("G90") {
                absolute = true;
            } else if block.is("G91") {
                absolute = false;
            } else if absolute && (block.is("G0") || block.is("G1")) {
                for (word, range) in [('X', &mut x), ('Y', &mut y), ('Z', &mut z)] {
                    if let Ok(value) = block.param_as::<f64>(word) {
                        range.observe(value);
                    }
                }
            } else if block.word() == Some('T') {
                if let Some(tool) = block.command().and_then(|c| c.address_as::<i32>().ok()) {
                    match tool {
                        t if t < 0 => {}
                        t if t % 2 == 0 => left = true,
                        _ => right = true,
                    }
                }
            }
        }

        if !left && !right {
            left = true;
        }

        let nozzle_count = found
            .nozzle_diameter
            .get()
            .map_or(0, |v| v.split([',', ';']).filter(|s| !s.trim().is_empty()).count());
        let dual_nozzle = nozzle_count >= 2;

        let model = found
            .printer_model
            .get()
            .map_or_else(|| settings.default_model.clone(), str::to_string);

        let version = match settings.force_version {
            Some(version) => version,
            None if (left && right) || dual_nozzle || model == MODEL_J1 => 1,
            None => 0,
        };

        let total_layers = found
            .total_layers
            .get()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(layer_changes);

        let filament_types = found
            .filament_type
            .get()
            .map_or_else(Default::default, |v| pair(&split_list(v)));

        let bounds = Bounds {
            min_x: x.min.unwrap_or(0.0),
            min_y: y.min.unwrap_or(0.0),
            min_z: z.min.unwrap_or(0.0),
            max_x: x.max.unwrap_or(0.0),
            max_y: y.max.unwrap_or(0.0),
            max_z: z.max.unwrap_or(0.0),
        };

        let params = Self {
            version,
            model,
            tool_head: (if dual_nozzle { TOOLHEAD_DUAL } else { TOOLHEAD_SINGLE }).to_string(),
            print_mode: settings.print_mode.clone(),
            total_lines: sequence.len(),
            total_layers,
            layer_height: first_float(&found.layer_height),
            estimated_time_sec: found.estimated_time.get().map_or(0, parse_estimated_time),
            print_speed_sec: first_float(&found.print_speed),
            nozzle_diameters: floats(&found.nozzle_diameter),
            nozzle_temperatures: floats(&found.nozzle_temperature),
            bed_temperatures: floats(&found.bed_temperature),
            retractions: floats(&found.retraction),
            switch_retractions: floats(&found.switch_retraction),
            filament_types,
            filament_used_mm: floats(&found.filament_used_mm),
            filament_used_g: floats(&found.filament_used_g),
            bounds,
            left_extruder_used: left,
            right_extruder_used: right,
            thumbnail: extract_thumbnail(sequence),
        };
        tracing::debug!(
            "Header params: version {}, model '{}', {} layers, {} lines",
            params.version,
            params.model,
            params.total_layers,
            params.total_lines
        );
        params
    }

    /// Filament used by both extruders, in mm
    pub fn total_filament_mm(&self) -> f64 {
        self.filament_used_mm.iter().sum()
    }

    /// Filament used by both extruders, in g
    pub fn total_filament_g(&self) -> f64 {
        self.filament_used_g.iter().sum()
    }

    /// The bed is shared, so the hotter of the two requests wins
    pub fn bed_temperature(&self) -> f64 {
        self.bed_temperatures[0].max(self.bed_temperatures[1])
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(text: &str) -> HeaderParams {
        let sequence = Sequence::parse(text).unwrap();
        HeaderParams::from_sequence(&sequence, &HeaderSettings::default())
    }

    #[test]
    fn test_setting() {
        assert_eq!(setting("; layer_height = 0.2", LAYER_HEIGHT), Some((0, "0.2")));
        assert_eq!(setting("; layer_height =", LAYER_HEIGHT), None);
        assert_eq!(setting("; first_layer_height = 0.3", LAYER_HEIGHT), None);
        assert_eq!(
            setting("; temperature = 210,215", NOZZLE_TEMPERATURE),
            Some((3, "210,215"))
        );
        assert_eq!(setting("G1 X1", LAYER_HEIGHT), None);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("PLA;PETG"), vec!["PLA", "PETG"]);
        assert_eq!(split_list("0.4, 0.6"), vec!["0.4", "0.6"]);
        assert_eq!(split_list("PLA"), vec!["PLA", ""]);
        assert_eq!(split_floats("200,abc"), vec![200.0, 0.0]);
    }

    #[test]
    fn test_scraped_settings() {
        let p = params(
            "; layer_height = 0.2\n\
             ; nozzle_diameter = 0.4,0.6\n\
             ; filament_type = PLA;PETG\n\
             ; temperature = 190,200\n\
             ; nozzle_temperature_initial_layer = 210,220\n\
             ; bed_temperature = 60,70\n\
             ; retract_length = 0.8,1.2\n\
             ; retract_length_toolchange = 16,18\n\
             ; max_print_speed = 150\n\
             ; filament used [mm] = 1000.5, 250\n\
             ; filament used [g] = 3.1, 0.9\n\
             ; printer_model = Snapmaker 2.0 A350\n\
             ; estimated printing time (normal mode) = 1h 2m 3s\n",
        );
        assert_eq!(p.layer_height, 0.2);
        assert_eq!(p.nozzle_diameters, [0.4, 0.6]);
        assert_eq!(p.filament_types, ["PLA".to_string(), "PETG".to_string()]);
        assert_eq!(p.nozzle_temperatures, [210.0, 220.0]);
        assert_eq!(p.bed_temperature(), 70.0);
        assert_eq!(p.retractions, [0.8, 1.2]);
        assert_eq!(p.switch_retractions, [16.0, 18.0]);
        assert_eq!(p.print_speed_sec, 150.0);
        assert_eq!(p.total_filament_mm(), 1250.5);
        assert_eq!(p.model, "Snapmaker 2.0 A350");
        assert_eq!(p.estimated_time_sec, 3723);
        assert_eq!(p.tool_head, TOOLHEAD_DUAL);
        assert_eq!(p.version, 1);
    }

    #[test]
    fn test_single_extruder_legacy_header() {
        let p = params(
            "; printer_model = Snapmaker 2.0 A250\n; nozzle_diameter = 0.4\nT0\nG1 X1\n",
        );
        assert_eq!(p.version, 0);
        assert_eq!(p.tool_head, TOOLHEAD_SINGLE);
        assert!(p.left_extruder_used);
        assert!(!p.right_extruder_used);
    }

    #[test]
    fn test_default_model_is_j1() {
        let p = params("G1 X1\n");
        assert_eq!(p.model, MODEL_J1);
        assert_eq!(p.version, 1);
        assert!(p.left_extruder_used);
    }

    #[test]
    fn test_both_extruders_force_versioned_header() {
        let p = params("; printer_model = A400\nT0\nT1\n");
        assert!(p.left_extruder_used && p.right_extruder_used);
        assert_eq!(p.version, 1);
    }

    #[test]
    fn test_forced_version() {
        let settings = HeaderSettings {
            force_version: Some(0),
            ..HeaderSettings::default()
        };
        let sequence = Sequence::parse("T0\nT1\n").unwrap();
        assert_eq!(HeaderParams::from_sequence(&sequence, &settings).version, 0);
    }

    #[test]
    fn test_layer_count() {
        let counted = params(";LAYER_CHANGE\nG1 Z0.2\n;LAYER_CHANGE\nG1 Z0.4\n");
        assert_eq!(counted.total_layers, 2);

        let declared = params("; total layers count = 120\n;LAYER_CHANGE\n");
        assert_eq!(declared.total_layers, 120);
    }

    #[test]
    fn test_bounds_ignore_relative_moves() {
        let p = params("G90\nG0 X10 Y20 Z0.2\nG1 X-5 Y40\nG91\nG1 X100\nG90\nG1 Z3\n");
        assert_eq!(
            p.bounds,
            Bounds {
                min_x: -5.0,
                min_y: 20.0,
                min_z: 0.2,
                max_x: 10.0,
                max_y: 40.0,
                max_z: 3.0,
            }
        );
    }

    #[test]
    fn test_empty_bounds_are_zero() {
        assert_eq!(params("M104 S200\n").bounds, Bounds::default());
    }

    #[test]
    fn test_json_dump() {
        let json = params("; layer_height = 0.2\n").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["layer_height"], 0.2);
        assert!(value.get("thumbnail").is_none());
    }
}
