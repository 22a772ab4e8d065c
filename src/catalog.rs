//! Passphrase catalog
//!
//! Static per-locale lists of phrases. Enrollment speaks phrases `0..3` of
//! the selected locale in order; login draws one phrase at random from the
//! whole locale list.

use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of phrases every locale must carry (one per enrollment sample)
pub const MIN_PHRASES_PER_LOCALE: usize = 3;

/// Immutable locale → phrases mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct PassphraseCatalog {
    locales: BTreeMap<String, Vec<String>>,
}

impl PassphraseCatalog {
    /// Build a catalog, enforcing the per-locale minimum and non-empty phrases
    pub fn new(locales: BTreeMap<String, Vec<String>>) -> Result<Self> {
        if locales.is_empty() {
            return Err(Error::InvalidCatalog("catalog has no locales".to_string()));
        }

        for (locale, phrases) in &locales {
            if locale.trim().is_empty() {
                return Err(Error::InvalidCatalog("empty locale id".to_string()));
            }
            if phrases.len() < MIN_PHRASES_PER_LOCALE {
                return Err(Error::InvalidCatalog(format!(
                    "locale '{}' has {} phrases (minimum {})",
                    locale,
                    phrases.len(),
                    MIN_PHRASES_PER_LOCALE
                )));
            }
            if phrases.iter().any(|p| p.trim().is_empty()) {
                return Err(Error::InvalidCatalog(format!(
                    "locale '{}' contains an empty phrase",
                    locale
                )));
            }
        }

        Ok(Self { locales })
    }

    /// Built-in catalog: english, marathi, hindi
    pub fn builtin() -> Self {
        let mut locales = BTreeMap::new();

        locales.insert(
            "english".to_string(),
            to_owned(&[
                "Voice is the key",
                "Unlock with your voice",
                "Secure voice identity",
                "Voice Unlock Access",
                "Trust the Sound",
                "Speak to Sign In",
                "Authenticate Me",
                "Vocal Identity Check",
                "Let Me In",
                "Verify My Voice",
                "Sound is Key",
                "Secure Entry Now",
                "Log Me In Securely",
            ]),
        );
        locales.insert(
            "marathi".to_string(),
            to_owned(&[
                "आवाज म्हणजेच ओळख",
                "तुमच्या आवाजाने उघडा",
                "सुरक्षित आवाज ओळख",
            ]),
        );
        locales.insert(
            "hindi".to_string(),
            to_owned(&["आवाज है चाबी", "अपनी आवाज से खोलो", "सुरक्षित आवाज पहचान"]),
        );

        Self { locales }
    }

    /// Locale ids in sorted order
    pub fn locales(&self) -> Vec<&str> {
        self.locales.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, locale: &str) -> bool {
        self.locales.contains_key(locale)
    }

    pub fn phrases_for(&self, locale: &str) -> Result<&[String]> {
        self.locales
            .get(locale)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownLocale(locale.to_string()))
    }

    pub fn phrase_at(&self, locale: &str, index: usize) -> Result<&str> {
        let phrases = self.phrases_for(locale)?;
        phrases
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| Error::IndexOutOfRange {
                locale: locale.to_string(),
                index,
                len: phrases.len(),
            })
    }

    /// Draw a phrase uniformly at random; deterministic when a seed is given
    pub fn draw(&self, locale: &str, seed: Option<u64>) -> Result<&str> {
        match seed {
            Some(seed) => self.draw_with(locale, &mut StdRng::seed_from_u64(seed)),
            None => self.draw_with(locale, &mut rand::thread_rng()),
        }
    }

    /// Draw a phrase using a caller-owned RNG
    pub fn draw_with<R: Rng + ?Sized>(&self, locale: &str, rng: &mut R) -> Result<&str> {
        let phrases = self.phrases_for(locale)?;
        phrases
            .choose(rng)
            .map(String::as_str)
            .ok_or_else(|| Error::IndexOutOfRange {
                locale: locale.to_string(),
                index: 0,
                len: 0,
            })
    }
}

impl Default for PassphraseCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TryFrom<BTreeMap<String, Vec<String>>> for PassphraseCatalog {
    type Error = Error;

    fn try_from(locales: BTreeMap<String, Vec<String>>) -> Result<Self> {
        Self::new(locales)
    }
}

impl From<PassphraseCatalog> for BTreeMap<String, Vec<String>> {
    fn from(catalog: PassphraseCatalog) -> Self {
        catalog.locales
    }
}

fn to_owned(phrases: &[&str]) -> Vec<String> {
    phrases.iter().map(|p| p.to_string()).collect()
}
