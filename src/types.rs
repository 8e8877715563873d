use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use chrono::{DateTime, Utc};
use tracing::warn;

pub const UNKNOWN: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "Not Available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    Front,
    Back,
    #[default]
    #[serde(other)]
    Unknown,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::Front => "front",
            FacingMode::Back => "back",
            FacingMode::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub facing_mode: FacingMode,
    pub current_resolution: Resolution,
    #[serde(default)]
    pub supported_resolutions: Vec<Resolution>,
}

/// Signals describing the submitting device and browser.
///
/// Keys outside the known set (pixel ratio, logical screen size, ...) are
/// kept in `extra` so they survive storage, but nothing exports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceData {
    pub is_mobile: bool,
    pub screen_pixels_height: u32,
    pub screen_pixels_width: u32,
    pub platform_name: String,
    pub platform_version: String,
    pub platform_vendor: String,
    pub browser_name: String,
    pub browser_version: String,
    pub browser_vendor: String,
    #[serde(rename = "setHeaderBrowserAcceptCH")]
    pub set_header_browser_accept_ch: String,
    #[serde(rename = "setHeaderHardwareAcceptCH")]
    pub set_header_hardware_accept_ch: String,
    #[serde(rename = "setHeaderPlatformAcceptCH")]
    pub set_header_platform_accept_ch: String,
    pub javascript_get_high_entropy_values: Value,
    pub javascript_hardware_profile: Value,
    #[serde(deserialize_with = "deserialize_cameras")]
    pub cameras: Vec<CameraInfo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for DeviceData {
    fn default() -> Self {
        Self {
            is_mobile: false,
            screen_pixels_height: 0,
            screen_pixels_width: 0,
            platform_name: UNKNOWN.to_string(),
            platform_version: UNKNOWN.to_string(),
            platform_vendor: UNKNOWN.to_string(),
            browser_name: UNKNOWN.to_string(),
            browser_version: UNKNOWN.to_string(),
            browser_vendor: UNKNOWN.to_string(),
            set_header_browser_accept_ch: NOT_AVAILABLE.to_string(),
            set_header_hardware_accept_ch: NOT_AVAILABLE.to_string(),
            set_header_platform_accept_ch: NOT_AVAILABLE.to_string(),
            javascript_get_high_entropy_values: Value::String(NOT_AVAILABLE.to_string()),
            javascript_hardware_profile: Value::String(NOT_AVAILABLE.to_string()),
            cameras: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// Client-reported signals. A field that is present replaces the
/// server-inferred value; an absent (or null) field leaves it alone.
///
/// Decoded one key at a time: a field with the wrong type is dropped on its
/// own and the rest of the payload still applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceDataPatch {
    pub is_mobile: Option<bool>,
    pub screen_pixels_height: Option<u32>,
    pub screen_pixels_width: Option<u32>,
    pub platform_name: Option<String>,
    pub platform_version: Option<String>,
    pub platform_vendor: Option<String>,
    pub browser_name: Option<String>,
    pub browser_version: Option<String>,
    pub browser_vendor: Option<String>,
    pub set_header_browser_accept_ch: Option<String>,
    pub set_header_hardware_accept_ch: Option<String>,
    pub set_header_platform_accept_ch: Option<String>,
    pub javascript_get_high_entropy_values: Option<Value>,
    pub javascript_hardware_profile: Option<Value>,
    pub cameras: Option<Vec<CameraInfo>>,
    pub extra: Map<String, Value>,
}

impl DeviceDataPatch {
    pub fn from_fields(mut fields: Map<String, Value>) -> Self {
        let mut patch = Self::default();

        macro_rules! take {
            ($($key:literal => $field:ident),* $(,)?) => {
                $( patch.$field = take_field(&mut fields, $key); )*
            };
        }

        take!(
            "isMobile" => is_mobile,
            "screenPixelsHeight" => screen_pixels_height,
            "screenPixelsWidth" => screen_pixels_width,
            "platformName" => platform_name,
            "platformVersion" => platform_version,
            "platformVendor" => platform_vendor,
            "browserName" => browser_name,
            "browserVersion" => browser_version,
            "browserVendor" => browser_vendor,
            "setHeaderBrowserAcceptCH" => set_header_browser_accept_ch,
            "setHeaderHardwareAcceptCH" => set_header_hardware_accept_ch,
            "setHeaderPlatformAcceptCH" => set_header_platform_accept_ch,
            "javascriptGetHighEntropyValues" => javascript_get_high_entropy_values,
            "javascriptHardwareProfile" => javascript_hardware_profile,
        );

        patch.cameras = match fields.remove("cameras") {
            None | Some(Value::Null) => None,
            Some(value) => Some(normalize_cameras(value)),
        };
        patch.extra = fields;
        patch
    }
}

impl<'de> Deserialize<'de> for DeviceDataPatch {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self::from_fields(fields))
    }
}

fn take_field<T: DeserializeOwned>(fields: &mut Map<String, Value>, key: &str) -> Option<T> {
    match fields.remove(key)? {
        Value::Null => None,
        value => match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Ignoring client field {}: {}", key, e);
                None
            }
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_device_data")]
    pub device_data: DeviceData,
}

/// A submission before the store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub device_data: DeviceData,
}

/// Turns whatever was stored under `cameras` into a list.
///
/// Accepts a list, a JSON string holding a list, or null. Anything that
/// fails to parse becomes an empty list.
pub fn normalize_cameras(value: Value) -> Vec<CameraInfo> {
    let parsed = match value {
        Value::Null => return Vec::new(),
        Value::String(raw) => serde_json::from_str::<Vec<CameraInfo>>(&raw),
        other => serde_json::from_value::<Vec<CameraInfo>>(other),
    };

    match parsed {
        Ok(cameras) => cameras,
        Err(e) => {
            warn!("Discarding unreadable camera data: {}", e);
            Vec::new()
        }
    }
}

fn deserialize_cameras<'de, D>(deserializer: D) -> Result<Vec<CameraInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(normalize_cameras(value))
}

fn deserialize_device_data<'de, D>(deserializer: D) -> Result<DeviceData, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<DeviceData>::deserialize(deserializer)?.unwrap_or_default())
}
