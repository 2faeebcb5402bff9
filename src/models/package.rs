use std::collections::HashMap;

/// Package name to price, in whole currency units.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceList {
    prices: HashMap<String, i64>,
}

const DEFAULT_PRICES: [(&str, i64); 4] = [
    ("Package A", 2000),
    ("Package B", 3000),
    ("Package C", 4000),
    ("Package D", 5000),
];

impl Default for PriceList {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_PRICES.iter().map(|(name, price)| (*name, *price)))
    }
}

impl PriceList {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        let prices = pairs
            .into_iter()
            .map(|(name, price)| (normalize(name), price))
            .collect();
        Self { prices }
    }

    /// Parses `"Package A=2000,Package B=3000"`.
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let mut pairs = Vec::new();
        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, price) = entry
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("invalid price entry: {entry}"))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(anyhow::anyhow!("missing package name in: {entry}"));
            }
            let price: i64 = price
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid price in: {entry}"))?;
            if price < 0 {
                return Err(anyhow::anyhow!("negative price in: {entry}"));
            }
            pairs.push((name, price));
        }
        if pairs.is_empty() {
            return Err(anyhow::anyhow!("price list is empty"));
        }
        Ok(Self::from_pairs(pairs))
    }

    /// Unknown packages are priced at zero.
    pub fn price_of(&self, package: &str) -> i64 {
        self.prices.get(&normalize(package)).copied().unwrap_or(0)
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
