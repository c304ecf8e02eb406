use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use serde_json::Value;
use shinydesk::DisplaySurface;
use tauri::{AppHandle, Manager, WebviewWindow};
use tokio::{
    sync::oneshot,
    time::{timeout, Duration},
};

const EVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Pending script evaluations waiting for the page to call back.
#[derive(Default)]
pub struct EvalRegistry {
    pending: Mutex<HashMap<u64, oneshot::Sender<Value>>>,
    next_id: AtomicU64,
}

impl EvalRegistry {
    fn register(&self) -> (u64, oneshot::Receiver<Value>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(id, sender);
        }
        (id, receiver)
    }

    fn forget(&self, id: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&id);
        }
    }

    fn resolve(&self, id: u64, value: Value) {
        let sender = self.pending.lock().ok().and_then(|mut pending| pending.remove(&id));
        if let Some(sender) = sender {
            let _ = sender.send(value);
        }
    }
}

/// The page reports evaluation results back through this command.
#[tauri::command]
pub fn surface_eval_result(app_handle: AppHandle, id: u64, value: Value) {
    app_handle.state::<EvalRegistry>().resolve(id, value);
}

/// [`DisplaySurface`] backed by a Tauri webview window.
///
/// Webview script evaluation is one-way, so results round-trip through
/// `surface_eval_result`: the injected wrapper evaluates the script and
/// invokes the command with the outcome.
pub struct WebviewSurface {
    window: WebviewWindow,
}

impl WebviewSurface {
    pub fn new(window: WebviewWindow) -> Self {
        Self { window }
    }
}

#[async_trait]
impl DisplaySurface for WebviewSurface {
    async fn load(&self, url: &str) -> Result<(), String> {
        let target =
            serde_json::to_string(url).map_err(|error| format!("Failed to encode URL: {error}"))?;
        self.window
            .eval(&format!("window.location.replace({target});"))
            .map_err(|error| format!("Failed to navigate to {url}: {error}"))
    }

    async fn evaluate_script(&self, script: &str) -> Result<Value, String> {
        let registry = self.window.app_handle().state::<EvalRegistry>();
        let (id, receiver) = registry.register();

        let script_json = serde_json::to_string(script)
            .map_err(|error| format!("Failed to encode script: {error}"))?;
        let wrapped = format!(
            "(function() {{\n  var report = function(value) {{\n    window.__TAURI_INTERNALS__.invoke('surface_eval_result', {{ id: {id}, value: value === undefined ? null : value }});\n  }};\n  try {{\n    report(eval({script_json}));\n  }} catch (error) {{\n    report({{ evalError: String(error) }});\n  }}\n}})();"
        );
        if let Err(error) = self.window.eval(&wrapped) {
            registry.forget(id);
            return Err(format!("Failed to evaluate script: {error}"));
        }

        let value = match timeout(EVAL_TIMEOUT, receiver).await {
            Ok(Ok(value)) => value,
            Ok(Err(_)) => return Err("Script result channel closed.".to_string()),
            Err(_) => {
                registry.forget(id);
                return Err("Timed out waiting for the script result.".to_string());
            }
        };
        if let Some(message) = value.get("evalError").and_then(Value::as_str) {
            return Err(format!("Script failed in page: {message}"));
        }
        Ok(value)
    }

    async fn maximize(&self) -> Result<(), String> {
        self.window
            .maximize()
            .map_err(|error| format!("Failed to maximize window: {error}"))
    }

    async fn focus(&self) -> Result<(), String> {
        self.window
            .set_focus()
            .map_err(|error| format!("Failed to focus window: {error}"))
    }
}
