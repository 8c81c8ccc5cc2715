use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::debug;

use courtbot_core::config::StealthConfig;
use courtbot_webdriver::{ElementRef, Session, WebDriverClient, WebDriverError};

use crate::entropy::Entropy;
use crate::script::FINGERPRINT_SCRIPT;

/// Human-like interaction layer. The flow routes every page interaction
/// through this engine instead of issuing raw protocol calls; the target
/// site runs client-side bot heuristics.
pub struct StealthEngine {
    driver: WebDriverClient,
    entropy: Entropy,
    config: StealthConfig,
    // Only persistent state: when we last touched the page, for idle checks.
    last_activity: Mutex<Instant>,
}

impl StealthEngine {
    pub fn new(driver: WebDriverClient, config: StealthConfig) -> Self {
        Self {
            driver,
            entropy: Entropy::new(config.seed),
            config,
            last_activity: Mutex::new(Instant::now()),
        }
    }

    /// Inject the fingerprint-spoofing script. Call once per fresh page
    /// load; the script itself is idempotent per document.
    pub async fn prime_page(&self, session: &Session) -> Result<(), WebDriverError> {
        self.driver.execute(session, FINGERPRINT_SCRIPT, vec![]).await?;
        self.touch();
        debug!(session = %session.id, "page primed");
        Ok(())
    }

    /// Pre-click pause drawn from a human reaction-time range.
    pub async fn approach_delay(&self) {
        let ms = self.entropy.range(self.config.reaction_min_ms, self.config.reaction_max_ms);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// Move the pointer to randomized coordinates along a curved path with
    /// randomized duration.
    pub async fn wander_pointer(&self, session: &Session) -> Result<(), WebDriverError> {
        let target_x = self.entropy.range_f64(100.0, 1100.0);
        let target_y = self.entropy.range_f64(100.0, 700.0);
        self.move_pointer(session, target_x, target_y).await
    }

    pub async fn move_pointer(
        &self,
        session: &Session,
        target_x: f64,
        target_y: f64,
    ) -> Result<(), WebDriverError> {
        let start_x = self.entropy.range_f64(50.0, 900.0);
        let start_y = self.entropy.range_f64(50.0, 600.0);

        // Control points pull the path off the straight line.
        let c1 = (
            start_x + (target_x - start_x) * 0.25 + self.entropy.range_f64(-60.0, 60.0),
            start_y + (target_y - start_y) * 0.25 + self.entropy.range_f64(-40.0, 40.0),
        );
        let c2 = (
            target_x + self.entropy.range_f64(-15.0, 15.0),
            target_y + self.entropy.range_f64(-15.0, 15.0),
        );

        let distance = ((target_x - start_x).powi(2) + (target_y - start_y).powi(2)).sqrt();
        let steps = ((12.0 + distance / 40.0) as u64).min(30);

        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let (x, y) = cubic_bezier(t, (start_x, start_y), c1, c2, (target_x, target_y));

            self.driver
                .execute(
                    session,
                    "document.dispatchEvent(new MouseEvent('mousemove', \
                     { clientX: arguments[0], clientY: arguments[1], bubbles: true }));",
                    vec![json!(x), json!(y)],
                )
                .await?;

            // Ease in/out: slow near the ends, fast in the middle.
            let pace = 1.0 - (2.0 * t - 1.0).abs();
            let ms = 8 + ((1.0 - pace) * 14.0) as u64 + self.entropy.range(0, 6);
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        self.touch();
        Ok(())
    }

    /// Scroll down the page in a few smooth, unevenly timed steps.
    pub async fn human_scroll(&self, session: &Session) -> Result<(), WebDriverError> {
        let steps = self.entropy.range(2, 5);
        for i in 0..steps {
            let top = (i + 1) * self.entropy.range(180, 360);
            self.driver
                .execute(
                    session,
                    "window.scrollTo({ top: arguments[0], behavior: 'smooth' });",
                    vec![json!(top)],
                )
                .await?;
            tokio::time::sleep(Duration::from_millis(self.entropy.range(300, 700))).await;
        }
        self.touch();
        Ok(())
    }

    /// Character-by-character typing with randomized inter-keystroke delay
    /// and a small probability of a mid-sequence blur.
    pub async fn human_type(
        &self,
        session: &Session,
        element: &ElementRef,
        text: &str,
    ) -> Result<(), WebDriverError> {
        let chars: Vec<char> = text.chars().collect();
        for (i, c) in chars.iter().enumerate() {
            self.driver
                .send_keys(session, element, &c.to_string())
                .await?;

            // Humans occasionally click away mid-entry and come back.
            if i > 0 && i + 1 < chars.len() && self.entropy.chance(self.config.blur_probability) {
                self.driver
                    .execute(
                        session,
                        "arguments[0].blur(); arguments[0].focus();",
                        vec![element.as_arg()],
                    )
                    .await?;
                tokio::time::sleep(Duration::from_millis(self.entropy.range(200, 600))).await;
            }

            let ms = self.entropy.range(self.config.key_delay_min_ms, self.config.key_delay_max_ms);
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        self.touch();
        Ok(())
    }

    /// Time since the engine last interacted with the page.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().unwrap().elapsed()
    }

    fn touch(&self) {
        *self.last_activity.lock().unwrap() = Instant::now();
    }
}

fn cubic_bezier(
    t: f64,
    p0: (f64, f64),
    p1: (f64, f64),
    p2: (f64, f64),
    p3: (f64, f64),
) -> (f64, f64) {
    let mt = 1.0 - t;
    let x = mt.powi(3) * p0.0
        + 3.0 * mt.powi(2) * t * p1.0
        + 3.0 * mt * t.powi(2) * p2.0
        + t.powi(3) * p3.0;
    let y = mt.powi(3) * p0.1
        + 3.0 * mt.powi(2) * t * p1.1
        + 3.0 * mt * t.powi(2) * p2.1
        + t.powi(3) * p3.1;
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bezier_hits_endpoints() {
        let p0 = (0.0, 0.0);
        let p3 = (100.0, 50.0);
        assert_eq!(cubic_bezier(0.0, p0, (10.0, 0.0), (90.0, 50.0), p3), p0);
        assert_eq!(cubic_bezier(1.0, p0, (10.0, 0.0), (90.0, 50.0), p3), p3);
    }

    #[test]
    fn bezier_midpoint_stays_between_endpoints() {
        let (x, y) = cubic_bezier(0.5, (0.0, 0.0), (25.0, 10.0), (75.0, 40.0), (100.0, 50.0));
        assert!(x > 0.0 && x < 100.0);
        assert!(y > 0.0 && y < 50.0);
    }

    #[test]
    fn idle_clock_starts_fresh() {
        use courtbot_core::config::WebDriverConfig;

        let driver = WebDriverClient::new(WebDriverConfig {
            endpoint: "http://127.0.0.1:9515".into(),
            request_timeout_seconds: 1,
            headless: true,
            window_width: 800,
            window_height: 600,
        })
        .unwrap();
        let engine = StealthEngine::new(driver, StealthConfig { seed: Some(3), ..StealthConfig::default() });
        assert!(engine.idle_for() < Duration::from_secs(1));
    }
}
