use crate::types::{DeviceData, DeviceDataPatch};

/// Overlays client-reported signals on the server-inferred ones.
/// Any field the client sent replaces the server value.
pub fn merge_device_data(server: DeviceData, client: DeviceDataPatch) -> DeviceData {
    let mut merged = server;

    macro_rules! overlay {
        ($($field:ident),* $(,)?) => {
            $(
                if let Some(value) = client.$field {
                    merged.$field = value;
                }
            )*
        };
    }

    overlay!(
        is_mobile,
        screen_pixels_height,
        screen_pixels_width,
        platform_name,
        platform_version,
        platform_vendor,
        browser_name,
        browser_version,
        browser_vendor,
        set_header_browser_accept_ch,
        set_header_hardware_accept_ch,
        set_header_platform_accept_ch,
        javascript_get_high_entropy_values,
        javascript_hardware_profile,
        cameras,
    );

    merged.extra.extend(client.extra);
    merged
}
