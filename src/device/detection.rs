use once_cell::sync::Lazy;
use regex::Regex;

use super::user_agent::{parse_user_agent, DeviceType};
use crate::types::{DeviceData, UNKNOWN};

static MOBILE_TOKENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)mobile|android|iphone|ipad|ipod").expect("mobile token pattern"));

/// Screen size the form reported alongside the submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientHints {
    pub screen_width: u32,
    pub screen_height: u32,
}

impl ClientHints {
    pub fn from_form(width: Option<&str>, height: Option<&str>) -> Self {
        Self {
            screen_width: width.map(parse_leading_int).unwrap_or(0),
            screen_height: height.map(parse_leading_int).unwrap_or(0),
        }
    }
}

/// Leading unsigned integer of a form value; anything else is 0.
/// Leading digits after an optional `+`. Saturates at `u32::MAX`.
fn parse_leading_int(raw: &str) -> u32 {
    let trimmed = raw.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    unsigned
        .chars()
        .map_while(|c| c.to_digit(10))
        .fold(0u32, |acc, digit| acc.saturating_mul(10).saturating_add(digit))
}

/// Everything the server can tell about a device from its request alone.
pub fn detect_device(user_agent: &str, hints: ClientHints) -> DeviceData {
    let ua = parse_user_agent(user_agent);

    let is_mobile = matches!(ua.device_type, Some(DeviceType::Mobile | DeviceType::Tablet))
        || MOBILE_TOKENS.is_match(user_agent);

    DeviceData {
        is_mobile,
        screen_pixels_height: hints.screen_height,
        screen_pixels_width: hints.screen_width,
        platform_name: ua.os_name.unwrap_or_else(|| UNKNOWN.to_string()),
        platform_version: ua.os_version.unwrap_or_else(|| UNKNOWN.to_string()),
        browser_name: ua.browser_name.unwrap_or_else(|| UNKNOWN.to_string()),
        browser_version: ua.browser_version.unwrap_or_else(|| UNKNOWN.to_string()),
        ..DeviceData::default()
    }
}
