use async_trait::async_trait;
use serde_json::Value;

/// Narrow interface to the visible shell window.
///
/// The supervision core only ever loads a URL, evaluates page script, and
/// adjusts window prominence, so the whole launch flow can run against a
/// fake surface with no windowing toolkit present. The shell package
/// implements this for a real webview window.
#[async_trait]
pub trait DisplaySurface: Send + Sync {
    async fn load(&self, url: &str) -> Result<(), String>;

    /// Evaluates script in the loaded page and returns its result.
    async fn evaluate_script(&self, script: &str) -> Result<Value, String>;

    async fn maximize(&self) -> Result<(), String>;

    async fn focus(&self) -> Result<(), String>;
}
