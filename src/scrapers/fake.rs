//! Scripted in-memory browser used by the unit tests.

use super::traits::{DriverFactory, PageDriver};
use crate::error::RenderingError;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Serves fixture HTML by URL and records every interaction.
#[derive(Clone, Default)]
pub struct FakeDriver {
    /// URL substring → page HTML; the longest matching substring wins
    routes: Vec<(String, String)>,
    /// Selector → URL loaded when that selector is clicked
    click_targets: HashMap<String, String>,
    /// URL substring whose load never completes
    hang_on: Option<String>,
    goto_failures: Arc<AtomicUsize>,
    current_url: String,
    current_html: String,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url_part: &str, html: &str) -> Self {
        self.routes.push((url_part.to_string(), html.to_string()));
        self
    }

    pub fn on_click(mut self, selector: &str, url: &str) -> Self {
        self.click_targets.insert(selector.to_string(), url.to_string());
        self
    }

    pub fn hang_on(mut self, url_part: &str) -> Self {
        self.hang_on = Some(url_part.to_string());
        self
    }

    /// Make the next `count` page loads fail.
    pub fn fail_next_gotos(self, count: usize) -> Self {
        self.goto_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|e| e.starts_with(prefix)).count()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn matches(&self, css: &str) -> bool {
        let document = Html::parse_document(&self.current_html);
        match Selector::parse(css) {
            Ok(selector) => document.select(&selector).next().is_some(),
            Err(_) => false,
        }
    }

    fn page_for(&self, url: &str) -> Option<String> {
        self.routes
            .iter()
            .filter(|(part, _)| url.contains(part.as_str()))
            .max_by_key(|(part, _)| part.len())
            .map(|(_, html)| html.clone())
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn goto(&mut self, url: &str) -> Result<(), RenderingError> {
        self.record(format!("goto:{}", url));

        if let Some(part) = &self.hang_on {
            if url.contains(part.as_str()) {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
            }
        }

        let remaining = self.goto_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.goto_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RenderingError::new(format!("scripted failure loading {}", url)));
        }

        let html = self
            .page_for(url)
            .ok_or_else(|| RenderingError::new(format!("no route for {}", url)))?;
        self.current_url = url.to_string();
        self.current_html = html;
        Ok(())
    }

    async fn html(&self) -> Result<String, RenderingError> {
        Ok(self.current_html.clone())
    }

    async fn current_url(&self) -> Result<String, RenderingError> {
        Ok(self.current_url.clone())
    }

    async fn exists(&self, selector: &str) -> Result<bool, RenderingError> {
        Ok(self.matches(selector))
    }

    async fn click(&mut self, selector: &str) -> Result<bool, RenderingError> {
        if !self.matches(selector) {
            return Ok(false);
        }
        self.record(format!("click:{}", selector));
        if let Some(target) = self.click_targets.get(selector).cloned() {
            self.goto(&target).await?;
        }
        Ok(true)
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<bool, RenderingError> {
        if !self.matches(selector) {
            return Ok(false);
        }
        self.record(format!("fill:{}={}", selector, text));
        Ok(true)
    }

    async fn close(&mut self) -> Result<(), RenderingError> {
        self.record("close".to_string());
        Ok(())
    }
}

/// Hands out clones of one scripted driver; clones share the log.
pub struct FakeFactory {
    template: FakeDriver,
    open_failures: AtomicUsize,
}

impl FakeFactory {
    pub fn new(template: FakeDriver) -> Self {
        Self {
            template,
            open_failures: AtomicUsize::new(0),
        }
    }

    pub fn failing(template: FakeDriver) -> Self {
        Self {
            template,
            open_failures: AtomicUsize::new(usize::MAX),
        }
    }
}

#[async_trait]
impl DriverFactory for FakeFactory {
    async fn open(&self) -> Result<Box<dyn PageDriver>, RenderingError> {
        if self.open_failures.load(Ordering::SeqCst) > 0 {
            return Err(RenderingError::new("browser unavailable"));
        }
        self.template.record("open".to_string());
        Ok(Box::new(self.template.clone()))
    }
}
