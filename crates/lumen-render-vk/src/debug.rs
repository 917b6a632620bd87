// SPDX-License-Identifier: CEPL-1.0
use std::ffi::{c_void, CStr};

use ash::vk;
use tracing::{debug, error, trace, warn, Level};

pub(crate) fn severity_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Level {
    use vk::DebugUtilsMessageSeverityFlagsEXT as S;
    if severity.contains(S::ERROR) {
        Level::ERROR
    } else if severity.contains(S::WARNING) {
        Level::WARN
    } else if severity.contains(S::INFO) {
        Level::DEBUG
    } else {
        Level::TRACE
    }
}

/// Validation-layer messages go to the tracing subscriber at the matching level.
pub(crate) unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut c_void,
) -> vk::Bool32 {
    if data.is_null() || (*data).p_message.is_null() {
        return vk::FALSE;
    }
    let msg = CStr::from_ptr((*data).p_message).to_string_lossy();
    match severity_level(severity) {
        Level::ERROR => error!("[vulkan {:?}] {}", types, msg),
        Level::WARN => warn!("[vulkan {:?}] {}", types, msg),
        Level::DEBUG => debug!("[vulkan {:?}] {}", types, msg),
        _ => trace!("[vulkan {:?}] {}", types, msg),
    }
    vk::FALSE
}

pub(crate) fn messenger_create_info<'a>() -> vk::DebugUtilsMessengerCreateInfoEXT<'a> {
    vk::DebugUtilsMessengerCreateInfoEXT {
        s_type: vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
        message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
            | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        pfn_user_callback: Some(debug_callback),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vk::DebugUtilsMessageSeverityFlagsEXT as S;

    #[test]
    fn severities_map_to_levels() {
        assert_eq!(severity_level(S::ERROR), Level::ERROR);
        assert_eq!(severity_level(S::WARNING), Level::WARN);
        assert_eq!(severity_level(S::INFO), Level::DEBUG);
        assert_eq!(severity_level(S::VERBOSE), Level::TRACE);
    }

    #[test]
    fn callback_ignores_null_data() {
        let r = unsafe {
            debug_callback(
                S::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                std::ptr::null(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(r, vk::FALSE);
    }
}
