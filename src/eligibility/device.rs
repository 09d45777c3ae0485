use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::DeviceVisibility;

pub const DEFAULT_MOBILE_MAX_WIDTH_PX: u32 = 768;

const MOBILE_UA_TOKENS: &[&str] = &["mobi", "android", "iphone", "ipod", "ipad", "windows phone"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum DeviceClass {
    Desktop,
    Mobile,
}

impl DeviceClass {
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if MOBILE_UA_TOKENS.iter().any(|token| ua.contains(token)) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    pub fn from_viewport_width(width_px: u32, mobile_max_width_px: u32) -> Self {
        if width_px < mobile_max_width_px {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    pub fn is_visible(&self, visibility: &DeviceVisibility) -> bool {
        match self {
            DeviceClass::Desktop => visibility.show_on_desktop,
            DeviceClass::Mobile => visibility.show_on_mobile,
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Desktop => f.write_str("desktop"),
            DeviceClass::Mobile => f.write_str("mobile"),
        }
    }
}
