//! Firmware header layouts
//!
//! Snapmaker firmware reads print metadata from a comment block at the top
//! of the file. Older single-extruder machines expect the legacy layout,
//! the J1 and dual-extruder prints the versioned one. Field names, order
//! and number formats are fixed by the firmware, spelling included.

use smfix_core::MARK;

use crate::params::HeaderParams;

/// Lines the legacy layout adds on top of the body
const V0_HEADER_LINES: usize = 34;
/// Lines the versioned layout adds on top of the body
const V1_HEADER_LINES: usize = 27;
/// Slicer estimates run short on the legacy firmware
const V0_TIME_FACTOR: f64 = 1.07;

const HEADER_START: &str = ";Header Start";
const HEADER_END: &str = ";Header End\n\n";

/// Legacy header
pub fn header_v0(p: &HeaderParams) -> Vec<String> {
    let mut h = Vec::with_capacity(36);
    h.push(MARK.to_string());
    h.push(HEADER_START.to_string());
    h.push(";FAVOR:Marlin".to_string());
    h.push(";TIME:6666".to_string());
    h.push(format!(";Filament used: {:.5}m", p.total_filament_mm() / 1000.0));
    h.push(format!(";Layer height: {:.2}", p.layer_height));
    h.push(";header_type: 3dp".to_string());
    h.push(format!(";tool_head: {}", p.tool_head));
    h.push(format!(";machine: {}", p.model));
    h.push(format!(";file_total_lines: {}", p.total_lines + V0_HEADER_LINES));
    h.push(format!(
        ";estimated_time(s): {:.0}",
        p.estimated_time_sec as f64 * V0_TIME_FACTOR
    ));
    h.push(format!(";nozzle_temperature(°C): {:.0}", p.nozzle_temperatures[0]));
    h.push(format!(";nozzle_0_diameter(mm): {:.1}", p.nozzle_diameters[0]));
    h.push(format!(";nozzle_0_material: {}", p.filament_types[0]));
    h.push(format!(";Extruder 0 Retraction Distance: {:.2}", p.retractions[0]));
    h.push(format!(
        ";Extruder 0 Switch Retraction Distance: {:.2}",
        p.switch_retractions[0]
    ));
    h.push(format!(";nozzle_1_temperature(°C): {:.0}", p.nozzle_temperatures[1]));
    h.push(format!(";nozzle_1_diameter(mm): {:.1}", p.nozzle_diameters[1]));
    h.push(format!(";nozzle_1_material: {}", p.filament_types[1]));
    h.push(format!(";Extruder 1 Retraction Distance: {:.2}", p.retractions[1]));
    h.push(format!(
        ";Extruder 1 Switch Retraction Distance: {:.2}",
        p.switch_retractions[1]
    ));
    h.push(format!(";build_plate_temperature(°C): {:.0}", p.bed_temperature()));
    h.push(format!(";work_speed(mm/minute): {:.0}", p.print_speed_sec * 60.0));
    h.push(format!(";max_x(mm): {:.4}", p.bounds.max_x));
    h.push(format!(";max_y(mm): {:.4}", p.bounds.max_y));
    h.push(format!(";max_z(mm): {:.4}", p.bounds.max_z));
    h.push(format!(";min_x(mm): {:.4}", p.bounds.min_x));
    h.push(format!(";min_y(mm): {:.4}", p.bounds.min_y));
    h.push(format!(";min_z(mm): {:.4}", p.bounds.min_z));
    h.push(format!(";layer_number: {}", p.total_layers));
    h.push(format!(";layer_height: {:.2}", p.layer_height));
    h.push(format!(";matierial_weight: {:.4}", p.total_filament_g()));
    h.push(format!(";matierial_length: {:.5}", p.total_filament_mm() / 1000.0));
    if let Some(thumbnail) = &p.thumbnail {
        h.push(format!(";thumbnail: {}", thumbnail));
    }
    h.push(HEADER_END.to_string());
    h
}

/// Versioned header
pub fn header_v1(p: &HeaderParams) -> Vec<String> {
    let mut h = Vec::with_capacity(32);
    h.push(MARK.to_string());
    h.push(HEADER_START.to_string());
    h.push(";Version:1".to_string());
    h.push(format!(";Printer:{}", p.model));
    h.push(format!(";Estimated Print Time:{}", p.estimated_time_sec));
    h.push(format!(";Lines:{}", p.total_lines + V1_HEADER_LINES));
    h.push(format!(";Extruder Mode:{}", p.print_mode));
    for e in 0..2 {
        h.push(format!(";Extruder {} Nozzle Size:{:.1}", e, p.nozzle_diameters[e]));
        h.push(format!(";Extruder {} Material:{}", e, p.filament_types[e]));
        h.push(format!(
            ";Extruder {} Print Temperature:{:.0}",
            e, p.nozzle_temperatures[e]
        ));
        h.push(format!(";Extruder {} Retraction Distance:{:.2}", e, p.retractions[e]));
        h.push(format!(
            ";Extruder {} Switch Retraction Distance:{:.2}",
            e, p.switch_retractions[e]
        ));
    }
    h.push(format!(";Bed Temperature:{:.0}", p.bed_temperature()));
    h.push(format!(";Work Range - Min X:{:.4}", p.bounds.min_x));
    h.push(format!(";Work Range - Min Y:{:.4}", p.bounds.min_y));
    h.push(format!(";Work Range - Min Z:{:.4}", p.bounds.min_z));
    h.push(format!(";Work Range - Max X:{:.4}", p.bounds.max_x));
    h.push(format!(";Work Range - Max Y:{:.4}", p.bounds.max_y));
    h.push(format!(";Work Range - Max Z:{:.4}", p.bounds.max_z));
    let used = if p.left_extruder_used && p.right_extruder_used { 2 } else { 1 };
    h.push(format!(";Extruder(s) Used:{}", used));
    if let Some(thumbnail) = &p.thumbnail {
        h.push(format!(";Thumbnail:{}", thumbnail));
    }
    h.push(HEADER_END.to_string());
    h
}

/// Header lines in the layout `params.version` asks for
pub fn build_header(params: &HeaderParams) -> Vec<String> {
    match params.version {
        1 => header_v1(params),
        _ => header_v0(params),
    }
}

/// Header text; the last line already ends with a blank line
pub fn render_header(params: &HeaderParams) -> String {
    build_header(params).join("\n")
}
