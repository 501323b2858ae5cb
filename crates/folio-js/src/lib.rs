//! WASM bindings for the folio HTML editor.
//!
//! Exposes `HtmlEditor` to JavaScript/TypeScript hosts. The host supplies
//! the chrome (toolbar, link dialog, image picker, file input) and wires it
//! to the editor's methods and callbacks.

mod boundary;
mod editor;
mod host;
mod log_buffer;
mod types;

pub use editor::*;
pub use types::*;

use wasm_bindgen::prelude::*;

/// Install the panic hook and the tracing subscriber.
#[wasm_bindgen(start)]
pub fn init() {
    std::panic::set_hook(Box::new(|info: &std::panic::PanicHookInfo<'_>| {
        console_error_panic_hook::hook(info);
        boundary::report_panic(info);
    }));
    init_tracing();
}

fn init_tracing() {
    use tracing::Level;
    use tracing::subscriber::set_global_default;
    use tracing_subscriber::Registry;
    use tracing_subscriber::layer::SubscriberExt;

    let console_level = if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(console_level)
            .build(),
    );

    let registry = Registry::default()
        .with(wasm_layer)
        .with(log_buffer::LogCaptureLayer);

    let _ = set_global_default(registry);
}

/// Recent editor log lines, newest last. Useful for bug reports.
#[wasm_bindgen(js_name = getRecentLogs)]
pub fn get_recent_logs() -> String {
    log_buffer::recent_logs().join("\n")
}
