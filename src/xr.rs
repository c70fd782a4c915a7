//! WebXR capability probe. Entering an immersive session is left to the page.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XrSupport {
    /// `navigator.xr` exists.
    Available,
    Unavailable,
}

impl XrSupport {
    /// Looks for `navigator.xr`. Native builds never have it.
    pub fn detect() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            let has_xr = web_sys::window()
                .map(|window| window.navigator())
                .and_then(|navigator| {
                    js_sys::Reflect::has(&navigator, &wasm_bindgen::JsValue::from_str("xr")).ok()
                })
                .unwrap_or(false);
            if has_xr {
                return XrSupport::Available;
            }
        }
        XrSupport::Unavailable
    }

    pub fn is_available(self) -> bool {
        self == XrSupport::Available
    }
}

impl fmt::Display for XrSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XrSupport::Available => f.write_str("WebXR available"),
            XrSupport::Unavailable => f.write_str("WebXR unavailable"),
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn native_builds_report_no_xr() {
        let support = XrSupport::detect();
        assert_eq!(support, XrSupport::Unavailable);
        assert!(!support.is_available());
        assert_eq!(support.to_string(), "WebXR unavailable");
    }
}
