// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! The immutable list of bank sources.

use crate::types::{ExtractorVariant as V, KursError, KursResult, SourceDescriptor as S};
use std::collections::HashSet;

/// Ordered, name-unique collection of source descriptors.
///
/// Registry order is the order records appear in a snapshot.
#[derive(Debug, Clone)]
pub struct Registry {
    sources: Vec<S>,
}

impl Registry {
    pub fn new(sources: Vec<S>) -> KursResult<Self> {
        let mut seen = HashSet::new();
        for s in &sources {
            if !seen.insert(s.name.as_str()) {
                return Err(KursError::Config(format!("duplicate source name: {}", s.name)));
            }
        }
        Ok(Self { sources })
    }

    pub fn sources(&self) -> &[S] {
        &self.sources
    }

    pub fn iter(&self) -> impl Iterator<Item = &S> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name.clone()).collect()
    }

    /// Exact name lookup.
    pub fn get(&self, name: &str) -> Option<&S> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// First source whose name contains `needle`, case-insensitively.
    pub fn find(&self, needle: &str) -> Option<&S> {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.sources
            .iter()
            .find(|s| s.name.to_lowercase().contains(&needle))
    }

    /// Static sources, in registry order.
    pub fn light(&self) -> impl Iterator<Item = &S> {
        self.sources.iter().filter(|s| s.is_light())
    }

    /// Rendered sources, in registry order.
    pub fn heavy(&self) -> impl Iterator<Item = &S> {
        self.sources.iter().filter(|s| !s.is_light())
    }
}

/// The 31 Uzbek commercial banks tracked by default.
pub fn default_registry() -> Registry {
    let sources = vec![
        S::fetched("Ipoteka Bank", "https://www.ipotekabank.uz/currency/"),
        S::fetched("KDB Bank Uzbekistan", "https://kdb.uz/ru/interactive-services/exchange-rates"),
        S::fetched("Microcreditbank", "https://mkbank.uz/ru/services/exchange-rates/"),
        S::fetched("Orient Finans Bank", "https://ofb.uz/about/kurs-obmena-valyut/"),
        S::fetched("Poytaxt Bank", "https://poytaxtbank.uz/ru/services/exchange-rates/"),
        S::rendered("TBC Bank", "https://tbcbank.uz/ru/currencies/", 5000).with_variant(V::Tbc),
        S::fetched("Trastbank", "https://trustbank.uz/ru/services/exchange-rates/"),
        S::rendered("Agrobank", "https://agrobank.uz/ru/person/exchange_rates", 8000),
        S::rendered("AloqaBank", "https://aloqabank.uz/ru/services/exchange-rates/", 6000),
        S::rendered("ANOR BANK", "https://anorbank.uz/about/exchange-rates/", 8000),
        S::rendered("APEXBANK", "https://www.apexbank.uz/ru/about/exchange-rates/", 8000),
        S::rendered("Asakabank", "https://asakabank.uz/uz/physical-persons/home", 8000)
            .with_variant(V::Asaka)
            .with_alt("https://asakabank.uz/ru/exchange-rates"),
        S::rendered("Asia Alliance Bank", "https://aab.uz/ru/exchange-rates/", 8000),
        S::rendered("BRB", "https://brb.uz/", 10000).with_variant(V::Brb),
        S::rendered("DavrBank", "https://davrbank.uz/ru/exchange-rate", 6000),
        S::rendered("Garant Bank", "https://garantbank.uz/ru/exchange-rates", 6000),
        S::rendered("Hamkorbank", "https://hamkorbank.uz/exchange-rate/", 8000)
            .with_variant(V::Hamkor),
        S::rendered("Hayot Bank", "https://hayotbank.uz/main/exchange-rate", 7000)
            .with_variant(V::Hayot),
        S::rendered("InFinBank", "https://www.infinbank.com/ru/private/exchange-rates/", 8000)
            .with_alt("https://www.infinbank.com/ru/exchange-rates/"),
        S::rendered("Ipak Yo'li Banki", "https://ipakyulibank.uz/physical/valyuta-ayirboshlash", 7000)
            .with_variant(V::Extended),
        S::rendered("Kapitalbank", "https://www.kapitalbank.uz/uz/services/exchange-rates/", 8000),
        S::rendered("Madad Invest Bank", "https://www.madadinvestbank.uz/", 6000),
        S::rendered("Octobank", "https://octobank.uz/o-banke/kurs-valyut", 7000),
        S::rendered("SaderatBank", "https://saderatbank.uz/", 6000),
        S::rendered("SanoatQurilishBank", "https://sqb.uz/uz/individuals/exchange-money/", 9000)
            .with_alt("https://sqb.uz/ru/individuals/currency-rates/"),
        S::rendered("Tenge Bank", "https://tengebank.uz/exchange-rates", 9000),
        S::rendered("Turon Bank", "https://turonbank.uz/ru/services/exchange-rates/", 6000),
        S::rendered("Universalbank", "https://universalbank.uz/currency", 9000)
            .with_alt("https://universalbank.uz/"),
        S::rendered("Ziraat Bank", "https://ziraatbank.uz/ru/exchange-rates", 8000),
        S::rendered("NBU (UzNatsbank)", "https://nbu.uz/ru/fizicheskim-litsam-kursy-valyut", 6000),
        S::rendered("Xalq Banki", "https://xb.uz/page/valyuta-ayirboshlash", 10000),
    ];
    Registry::new(sources).expect("built-in source names are unique")
}
