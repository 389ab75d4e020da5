use super::traits::{DriverFactory, PageDriver};
use crate::config::BrowserConfig;
use crate::error::RenderingError;
use anyhow::Context;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use tracing::{debug, info};

/// Launches one headless Chrome and hands out a fresh tab per session
pub struct ChromeFactory {
    browser: Browser,
}

impl ChromeFactory {
    pub async fn launch(config: &BrowserConfig) -> anyhow::Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_width, config.window_height)))
            .build()
            .context("Failed to build launch options")?;

        let browser = tokio::task::spawn_blocking(move || Browser::new(options))
            .await
            .context("Chrome launch task panicked")?
            .context("Failed to launch Chrome browser")?;

        Ok(Self { browser })
    }
}

#[async_trait]
impl DriverFactory for ChromeFactory {
    async fn open(&self) -> Result<Box<dyn PageDriver>, RenderingError> {
        let browser = self.browser.clone();
        let tab = tokio::task::spawn_blocking(move || browser.new_tab())
            .await
            .map_err(|e| RenderingError::new(format!("tab task failed: {}", e)))?
            .map_err(|e| RenderingError::new(format!("could not open tab: {:#}", e)))?;

        debug!("Opened browser tab");
        Ok(Box::new(ChromeDriver { tab }))
    }
}

/// A single Chrome tab. Every CDP call blocks, so each one runs on the
/// blocking pool.
pub struct ChromeDriver {
    tab: Arc<Tab>,
}

impl ChromeDriver {
    async fn run<T, F>(&self, op: F) -> Result<T, RenderingError>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> anyhow::Result<T> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || op(&tab))
            .await
            .map_err(|e| RenderingError::new(format!("browser task failed: {}", e)))?
            .map_err(|e| RenderingError::new(format!("{:#}", e)))
    }

    /// Evaluate a script that yields a boolean.
    async fn check(&self, script: String) -> Result<bool, RenderingError> {
        self.run(move |tab| {
            let result = tab.evaluate(&script, false)?;
            Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
        })
        .await
    }
}

fn js_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn goto(&mut self, url: &str) -> Result<(), RenderingError> {
        let url = url.to_string();
        self.run(move |tab| {
            tab.navigate_to(&url)?;
            tab.wait_until_navigated()?;
            Ok(())
        })
        .await
    }

    async fn html(&self) -> Result<String, RenderingError> {
        self.run(|tab| tab.get_content()).await
    }

    async fn current_url(&self) -> Result<String, RenderingError> {
        self.run(|tab| Ok(tab.get_url())).await
    }

    async fn exists(&self, selector: &str) -> Result<bool, RenderingError> {
        self.check(format!("document.querySelector({}) !== null", js_string(selector)))
            .await
    }

    async fn click(&mut self, selector: &str) -> Result<bool, RenderingError> {
        self.check(format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.click(); return true; }})()",
            js_string(selector)
        ))
        .await
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<bool, RenderingError> {
        self.check(format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; \
             el.focus(); el.value = {}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true; }})()",
            js_string(selector),
            js_string(text)
        ))
        .await
    }

    async fn close(&mut self) -> Result<(), RenderingError> {
        self.run(|tab| {
            tab.close(true)?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string("a[data-testid='x']"), r#""a[data-testid='x']""#);
        assert_eq!(js_string(r#"say "hi""#), r#""say \"hi\"""#);
    }
}
