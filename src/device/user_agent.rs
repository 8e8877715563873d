use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Mobile,
    Tablet,
}

/// What can be read out of a User-Agent header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAgentInfo {
    pub browser_name: Option<String>,
    pub browser_version: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub device_type: Option<DeviceType>,
}

struct Rule {
    pattern: Regex,
    name: &'static str,
}

fn rule(pattern: &str, name: &'static str) -> Rule {
    Rule {
        pattern: Regex::new(pattern).expect("built-in user agent pattern"),
        name,
    }
}

// Order matters: Edge and Opera also claim Chrome, and Chrome claims Safari.
static BROWSER_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(r"Edg(?:e|A|iOS)?/([\d.]+)", "Edge"),
        rule(r"(?:OPR|Opera)/([\d.]+)", "Opera"),
        rule(r"SamsungBrowser/([\d.]+)", "Samsung Browser"),
        rule(r"FxiOS/([\d.]+)", "Firefox"),
        rule(r"Firefox/([\d.]+)", "Firefox"),
        rule(r"CriOS/([\d.]+)", "Chrome"),
        rule(r"Chrome/([\d.]+)", "Chrome"),
        rule(r"Version/([\d.]+).*Mobile.*Safari/", "Mobile Safari"),
        rule(r"Version/([\d.]+).*Safari/", "Safari"),
        rule(r"MSIE ([\d.]+)", "IE"),
        rule(r"Trident/.*rv:([\d.]+)", "IE"),
    ]
});

// iOS before macOS ("like Mac OS X"), Android before Linux.
static OS_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(r"Windows Phone(?: OS)? ([\d.]+)", "Windows Phone"),
        rule(r"Windows NT ([\d.]+)", "Windows"),
        rule(r"(?:iPhone|iPad|iPod).*? OS (\d+[_\d]*)", "iOS"),
        rule(r"Android ([\d.]+)", "Android"),
        rule(r"CrOS \S+ ([\d.]+)", "Chrome OS"),
        rule(r"Mac OS X (\d+[_.\d]*)", "Mac OS"),
        rule(r"(Linux)", "Linux"),
    ]
});

static TABLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)ipad|tablet|kindle|silk|playbook").expect("tablet pattern"));
static ANDROID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)android").expect("android pattern"));
static MOBILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)iphone|ipod|mobile|windows phone").expect("mobile pattern"));

fn first_match(rules: &[Rule], ua: &str) -> Option<(&'static str, Option<String>)> {
    rules.iter().find_map(|r| {
        r.pattern.captures(ua).map(|caps| {
            let version = caps.get(1).map(|m| m.as_str().replace('_', "."));
            (r.name, version)
        })
    })
}

fn windows_version(nt: &str) -> String {
    match nt {
        "10.0" => "10",
        "6.3" => "8.1",
        "6.2" => "8",
        "6.1" => "7",
        "6.0" => "Vista",
        "5.2" | "5.1" => "XP",
        other => other,
    }
    .to_string()
}

fn device_type(ua: &str) -> Option<DeviceType> {
    let android = ANDROID.is_match(ua);
    if TABLET.is_match(ua) || (android && !ua.contains("Mobile")) {
        Some(DeviceType::Tablet)
    } else if MOBILE.is_match(ua) || android {
        Some(DeviceType::Mobile)
    } else {
        None
    }
}

pub fn parse_user_agent(ua: &str) -> UserAgentInfo {
    let mut info = UserAgentInfo {
        device_type: device_type(ua),
        ..Default::default()
    };

    if let Some((name, version)) = first_match(&BROWSER_RULES, ua) {
        info.browser_name = Some(name.to_string());
        info.browser_version = version;
    }

    if let Some((name, version)) = first_match(&OS_RULES, ua) {
        info.os_name = Some(name.to_string());
        info.os_version = match name {
            "Windows" => version.map(|v| windows_version(&v)),
            "Linux" => None,
            _ => version,
        };
    }

    info
}
