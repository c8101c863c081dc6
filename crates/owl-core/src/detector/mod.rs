//! Captcha and firewall detection.
//!
//! Rules are data: regex signatures matched against the document markup
//! plus HTTP status hints. The defaults cover the common vendor markers;
//! deployments can extend or replace the rule set without touching code.

use regex::RegexSet;
use serde::{Deserialize, Serialize};

/// What a navigation landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detection {
    /// An interactive challenge (reCAPTCHA, hCaptcha, Turnstile, ...).
    Captcha,
    /// A block/challenge page served by a perimeter firewall or CDN.
    Firewall,
}

/// One rule set; build with [`DetectorRules::builder`] or use the defaults.
#[derive(Debug)]
pub struct DetectorRules {
    captcha: RegexSet,
    firewall: RegexSet,
    /// Statuses that make firewall signatures decisive on their own.
    firewall_statuses: Vec<u16>,
}

impl Default for DetectorRules {
    fn default() -> Self {
        Self::builder()
            .captcha_signature(r"(?i)g-recaptcha|recaptcha/api")
            .captcha_signature(r"(?i)h-captcha|hcaptcha\.com/1/api")
            .captcha_signature(r"(?i)cf-turnstile|challenges\.cloudflare\.com/turnstile")
            .captcha_signature(r"(?i)<title>\s*(just a moment|verification required)")
            .captcha_signature(r"(?i)press\s*&?\s*hold to confirm you are\s*a human")
            .firewall_signature(r"(?i)<title>\s*attention required!\s*\|\s*cloudflare")
            .firewall_signature(r"(?i)access denied.{0,200}(akamai|reference #)")
            .firewall_signature(r"(?i)request unsuccessful\. incapsula incident")
            .firewall_signature(r"(?i)the requested url was rejected.{0,100}support id")
            .firewall_signature(r"(?i)error 15: access denied")
            .firewall_status(403)
            .firewall_status(429)
            .firewall_status(503)
            .build()
    }
}

impl DetectorRules {
    /// Start an empty rule set.
    pub fn builder() -> DetectorRulesBuilder {
        DetectorRulesBuilder::default()
    }

    /// Classify a rendered document.
    ///
    /// Captcha signatures win over firewall signatures: a challenge page
    /// the user can actually solve is the more actionable classification.
    /// Firewall signatures alone require a blocking status to be decisive;
    /// with a 200 they are ignored (sites legitimately mention vendors).
    pub fn detect(&self, html: &str, http_status: Option<u16>) -> Option<Detection> {
        if self.captcha.is_match(html) {
            return Some(Detection::Captcha);
        }
        let status_blocked = http_status.is_some_and(|s| self.firewall_statuses.contains(&s));
        if self.firewall.is_match(html) && status_blocked {
            return Some(Detection::Firewall);
        }
        // A blocking status with an empty or tiny interstitial body is a
        // firewall response even without a vendor marker.
        if status_blocked && html.len() < 512 && !html.is_empty() {
            return Some(Detection::Firewall);
        }
        None
    }
}

/// Builder for [`DetectorRules`].
#[derive(Debug, Default)]
pub struct DetectorRulesBuilder {
    captcha: Vec<String>,
    firewall: Vec<String>,
    firewall_statuses: Vec<u16>,
}

impl DetectorRulesBuilder {
    pub fn captcha_signature(mut self, pattern: &str) -> Self {
        self.captcha.push(pattern.to_string());
        self
    }

    pub fn firewall_signature(mut self, pattern: &str) -> Self {
        self.firewall.push(pattern.to_string());
        self
    }

    pub fn firewall_status(mut self, status: u16) -> Self {
        self.firewall_statuses.push(status);
        self
    }

    /// Compile the rule set.
    ///
    /// # Panics
    ///
    /// Panics if a signature is not a valid regex; rule sets are built at
    /// startup from static or operator-reviewed data.
    pub fn build(self) -> DetectorRules {
        DetectorRules {
            captcha: RegexSet::new(&self.captcha).expect("invalid captcha signature"),
            firewall: RegexSet::new(&self.firewall).expect("invalid firewall signature"),
            firewall_statuses: self.firewall_statuses,
        }
    }
}

#[cfg(test)]
mod tests;
