//! Types exposed to JavaScript via wasm-bindgen.

use folio_browser::{EditorConfig, ToolbarMetrics};
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

/// Options for `new HtmlEditor(options)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct EditorOptions {
    pub initial_html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Image URLs offered by the picker. Images are only editable when set.
    #[serde(default)]
    pub assets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_toolbar: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<JsEditorConfig>,
}

/// Timing overrides. Missing fields keep their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct JsEditorConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_delay_ms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_delay_ms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_duration_ms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_duration_ms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolbar: Option<JsToolbarMetrics>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct JsToolbarMetrics {
    pub height: f64,
    pub width: f64,
    pub padding: f64,
    pub min_top: f64,
}

impl From<JsEditorConfig> for EditorConfig {
    fn from(js: JsEditorConfig) -> Self {
        let defaults = EditorConfig::default();
        EditorConfig {
            poll_interval_ms: js.poll_interval_ms.unwrap_or(defaults.poll_interval_ms),
            settle_delay_ms: js.settle_delay_ms.unwrap_or(defaults.settle_delay_ms),
            focus_delay_ms: js.focus_delay_ms.unwrap_or(defaults.focus_delay_ms),
            status_duration_ms: js.status_duration_ms.unwrap_or(defaults.status_duration_ms),
            error_duration_ms: js.error_duration_ms.unwrap_or(defaults.error_duration_ms),
            toolbar: js.toolbar.map(ToolbarMetrics::from).unwrap_or(defaults.toolbar),
        }
    }
}

impl From<JsToolbarMetrics> for ToolbarMetrics {
    fn from(js: JsToolbarMetrics) -> Self {
        ToolbarMetrics {
            height: js.height,
            width: js.width,
            padding: js.padding,
            min_top: js.min_top,
        }
    }
}

/// A formatting command from the toolbar.
///
/// `command` is an `execCommand` name (`bold`, `formatBlock`, `foreColor`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct JsCommand {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Image awaiting a replacement pick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct JsImageRequest {
    pub sandbox: u64,
    pub image: u32,
}

/// Current status and error texts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct JsMessages {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let js = JsEditorConfig {
            settle_delay_ms: Some(0),
            ..Default::default()
        };
        let config = EditorConfig::from(js);
        assert_eq!(config.settle_delay_ms, 0);
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.toolbar, ToolbarMetrics::default());
    }
}
