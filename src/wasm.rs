use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn layout_table(json: &str) -> Result<String, JsValue> {
    crate::layout_json_to_string(json).map_err(|e| JsValue::from_str(&e.to_string()))
}
