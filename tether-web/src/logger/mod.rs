use wasm_bindgen::JsValue;
use web_sys::console;

pub struct Logger;

impl Logger {
    pub fn debug(msg: &str) {
        console::debug_1(&format!("[tether] {}", msg).into());
    }

    pub fn info(msg: &str) {
        console::info_1(&format!("[tether] {}", msg).into());
    }

    pub fn warn(msg: &str) {
        console::warn_1(&format!("[tether] {}", msg).into());
    }

    pub fn error(err: &JsValue) {
        console::error_2(&"[tether]".into(), err);
    }
}
