use serde_json::{json, Value};

use crate::types::{CameraInfo, UserData};

pub const CSV_HEADERS: [&str; 24] = [
    "First Name",
    "Last Name",
    "Email",
    "IsMobile",
    "ScreenPixelsHeight",
    "ScreenPixelsWidth",
    "PlatformName",
    "PlatformVersion",
    "PlatformVendor",
    "BrowserName",
    "BrowserVersion",
    "BrowserVendor",
    "SetHeaderBrowserAccept-CH",
    "SetHeaderHardwareAccept-CH",
    "SetHeaderPlatformAccept-CH",
    "JavascriptGetHighEntropyValues",
    "JavascriptHardwareProfile",
    "CameraCount",
    "Camera1_Label",
    "Camera1_FacingMode",
    "Camera1_Resolution",
    "Camera2_Label",
    "Camera2_FacingMode",
    "Camera2_Resolution",
];

const LINE_ENDING: &str = "\r\n";

/// Renders one cell: always quoted, inner quotes doubled.
pub fn format_csv_value(value: &Value) -> String {
    let text = match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
        }
    };

    format!("\"{}\"", text.replace('"', "\"\""))
}

fn camera_cells(camera: Option<&CameraInfo>) -> [Value; 3] {
    match camera {
        Some(camera) => [
            json!(camera.label),
            json!(camera.facing_mode.as_str()),
            json!(camera.current_resolution.to_string()),
        ],
        None => [json!(""), json!(""), json!("")],
    }
}

fn user_row(user: &UserData) -> String {
    let device = &user.device_data;

    let mut values = vec![
        json!(user.first_name),
        json!(user.last_name),
        json!(user.email),
        json!(device.is_mobile),
        json!(device.screen_pixels_height),
        json!(device.screen_pixels_width),
        json!(device.platform_name),
        json!(device.platform_version),
        json!(device.platform_vendor),
        json!(device.browser_name),
        json!(device.browser_version),
        json!(device.browser_vendor),
        json!(device.set_header_browser_accept_ch),
        json!(device.set_header_hardware_accept_ch),
        json!(device.set_header_platform_accept_ch),
        device.javascript_get_high_entropy_values.clone(),
        device.javascript_hardware_profile.clone(),
        json!(device.cameras.len()),
    ];
    values.extend(camera_cells(device.cameras.first()));
    values.extend(camera_cells(device.cameras.get(1)));

    values
        .iter()
        .map(format_csv_value)
        .collect::<Vec<_>>()
        .join(",")
}

/// Header plus one row per user, CRLF-joined. Empty input gives an empty string.
pub fn users_to_csv(users: &[UserData]) -> String {
    if users.is_empty() {
        return String::new();
    }

    let header = CSV_HEADERS
        .iter()
        .map(|h| format!("\"{}\"", h))
        .collect::<Vec<_>>()
        .join(",");

    std::iter::once(header)
        .chain(users.iter().map(user_row))
        .collect::<Vec<_>>()
        .join(LINE_ENDING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeviceData, FacingMode, Resolution};
    use chrono::Utc;

    fn user(cameras: usize) -> UserData {
        let mut device_data = DeviceData::default();
        device_data.cameras = (0..cameras)
            .map(|i| CameraInfo {
                device_id: format!("cam{}", i),
                label: format!("Camera {}", i + 1),
                facing_mode: if i == 0 { FacingMode::Back } else { FacingMode::Front },
                current_resolution: Resolution { width: 1920 + i as u32, height: 1080 },
                supported_resolutions: vec![],
            })
            .collect();

        UserData {
            id: "id1".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: "jane@x.com".to_string(),
            timestamp: Utc::now(),
            device_data,
        }
    }

    /// Splits a row of quoted cells. Good enough for cells without commas.
    fn cells(row: &str) -> Vec<String> {
        row.split("\",\"")
            .map(|c| c.trim_matches('"').to_string())
            .collect()
    }

    #[test]
    fn test_empty_input_is_empty_string() {
        assert_eq!(users_to_csv(&[]), "");
    }

    #[test]
    fn test_row_and_column_counts() {
        let csv = users_to_csv(&[user(0), user(1), user(2)]);
        let rows: Vec<&str> = csv.split("\r\n").collect();

        assert_eq!(rows.len(), 4);
        assert!(!csv.ends_with("\r\n"));
        for row in rows {
            assert_eq!(cells(row).len(), CSV_HEADERS.len());
            assert!(row.starts_with('"') && row.ends_with('"'));
        }
    }

    #[test]
    fn test_header_row() {
        let csv = users_to_csv(&[user(0)]);
        let header = csv.split("\r\n").next().unwrap();

        assert!(header.starts_with("\"First Name\",\"Last Name\",\"Email\",\"IsMobile\""));
        assert!(header.ends_with("\"Camera2_Resolution\""));
    }

    #[test]
    fn test_no_cameras_renders_empty_slots() {
        let csv = users_to_csv(&[user(0)]);
        let row = cells(csv.split("\r\n").nth(1).unwrap());

        assert_eq!(row[17], "0");
        assert!(row[18..].iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_only_first_two_cameras_rendered() {
        let csv = users_to_csv(&[user(3)]);
        let row = cells(csv.split("\r\n").nth(1).unwrap());

        assert_eq!(row[17], "3");
        assert_eq!(&row[18..21], &["Camera 1", "back", "1920x1080"]);
        assert_eq!(&row[21..24], &["Camera 2", "front", "1921x1080"]);
        assert!(!csv.contains("Camera 3"));
    }

    #[test]
    fn test_one_camera_fills_second_slot_with_blanks() {
        let csv = users_to_csv(&[user(1)]);
        let row = cells(csv.split("\r\n").nth(1).unwrap());

        assert_eq!(row[17], "1");
        assert_eq!(row[18], "Camera 1");
        assert!(row[21..].iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_default_row_prefix() {
        let csv = users_to_csv(&[user(0)]);
        let row = csv.split("\r\n").nth(1).unwrap();

        assert!(row.starts_with(r#""Jane","Doe","jane@x.com","false","0","0","Unknown""#));
    }

    #[test]
    fn test_cell_formatting() {
        assert_eq!(format_csv_value(&Value::Null), "\"\"");
        assert_eq!(format_csv_value(&json!(true)), "\"true\"");
        assert_eq!(format_csv_value(&json!(42)), "\"42\"");
        assert_eq!(format_csv_value(&json!("say \"hi\"")), "\"say \"\"hi\"\"\"");
        assert_eq!(format_csv_value(&json!({"a": 1})), "\"{\"\"a\"\":1}\"");
        assert_eq!(format_csv_value(&json!([1, 2])), "\"[1,2]\"");
    }

    #[test]
    fn test_diagnostic_object_is_json_text() {
        let mut u = user(0);
        u.device_data.javascript_hardware_profile = json!({"cores": 8});
        let csv = users_to_csv(&[u]);

        assert!(csv.contains(r#""{""cores"":8}""#));
    }
}
