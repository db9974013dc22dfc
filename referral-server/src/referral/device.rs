//! User-agent and edge-header parsing for click records

use shared::models::{DeviceInfo, DeviceType, GeoLocation};

use super::fraud::is_bot_user_agent;

pub fn parse_user_agent(user_agent: Option<&str>) -> DeviceInfo {
    let Some(ua) = user_agent.map(str::trim).filter(|ua| !ua.is_empty()) else {
        return DeviceInfo {
            device_type: DeviceType::Unknown,
            os: None,
            browser: None,
        };
    };
    DeviceInfo {
        device_type: device_type(ua),
        os: os(ua).map(str::to_string),
        browser: browser(ua).map(str::to_string),
    }
}

fn device_type(ua: &str) -> DeviceType {
    if is_bot_user_agent(ua) {
        DeviceType::Bot
    } else if ua.contains("iPad")
        || ua.contains("Tablet")
        || (ua.contains("Android") && !ua.contains("Mobile"))
    {
        DeviceType::Tablet
    } else if ua.contains("Mobi") || ua.contains("iPhone") {
        DeviceType::Mobile
    } else {
        DeviceType::Desktop
    }
}

fn os(ua: &str) -> Option<&'static str> {
    // iOS user agents also contain "Mac OS X"
    if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod") {
        Some("iOS")
    } else if ua.contains("Android") {
        Some("Android")
    } else if ua.contains("Windows") {
        Some("Windows")
    } else if ua.contains("Mac OS") || ua.contains("Macintosh") {
        Some("macOS")
    } else if ua.contains("Linux") {
        Some("Linux")
    } else {
        None
    }
}

fn browser(ua: &str) -> Option<&'static str> {
    // order matters: Edge and Opera carry "Chrome", Chrome carries "Safari"
    if ua.contains("Edg/") {
        Some("Edge")
    } else if ua.contains("OPR/") || ua.contains("Opera") {
        Some("Opera")
    } else if ua.contains("Firefox/") {
        Some("Firefox")
    } else if ua.contains("Chrome/") || ua.contains("CriOS/") {
        Some("Chrome")
    } else if ua.contains("Safari/") {
        Some("Safari")
    } else {
        None
    }
}

/// Country/city from CDN headers, normalised
pub fn geo_location(country: Option<&str>, city: Option<&str>) -> GeoLocation {
    let clean = |v: Option<&str>| {
        v.map(str::trim)
            .filter(|v| !v.is_empty() && *v != "XX")
            .map(str::to_string)
    };
    GeoLocation {
        country: clean(country).map(|c| c.to_ascii_uppercase()),
        city: clean(city),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desktop_chrome() {
        let info = parse_user_agent(Some(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        ));
        assert_eq!(info.device_type, DeviceType::Desktop);
        assert_eq!(info.os.as_deref(), Some("Windows"));
        assert_eq!(info.browser.as_deref(), Some("Chrome"));
    }

    #[test]
    fn test_iphone_safari() {
        let info = parse_user_agent(Some(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
        ));
        assert_eq!(info.device_type, DeviceType::Mobile);
        assert_eq!(info.os.as_deref(), Some("iOS"));
        assert_eq!(info.browser.as_deref(), Some("Safari"));
    }

    #[test]
    fn test_ipad_and_edge() {
        let ipad = parse_user_agent(Some("Mozilla/5.0 (iPad; CPU OS 16_0 like Mac OS X) Safari/604.1"));
        assert_eq!(ipad.device_type, DeviceType::Tablet);

        let pixel = parse_user_agent(Some("Mozilla/5.0 (Linux; Android 14; Pixel 8) Chrome/120.0 Mobile Safari/537.36"));
        assert_eq!(pixel.device_type, DeviceType::Mobile);
        assert_eq!(pixel.os.as_deref(), Some("Android"));

        let edge = parse_user_agent(Some(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 Chrome/120.0 Safari/537.36 Edg/120.0",
        ));
        assert_eq!(edge.os.as_deref(), Some("macOS"));
        assert_eq!(edge.browser.as_deref(), Some("Edge"));
    }

    #[test]
    fn test_bot_and_missing() {
        assert_eq!(
            parse_user_agent(Some("Googlebot/2.1 (+http://www.google.com/bot.html)")).device_type,
            DeviceType::Bot
        );
        assert_eq!(parse_user_agent(None).device_type, DeviceType::Unknown);
        assert_eq!(parse_user_agent(Some("  ")).device_type, DeviceType::Unknown);
    }

    #[test]
    fn test_geo_location() {
        let geo = geo_location(Some("sg"), Some(" Singapore "));
        assert_eq!(geo.country.as_deref(), Some("SG"));
        assert_eq!(geo.city.as_deref(), Some("Singapore"));
        assert_eq!(geo_location(Some("XX"), None), GeoLocation::default());
    }
}
