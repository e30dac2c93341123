//! Advertising platforms and the measures their sheets carry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{InvalidMeasureError, InvalidPlatformError};

/// One of the two advertising platforms, each with its own sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Platform {
    #[serde(rename = "Meta Ads")]
    MetaAds,
    #[serde(rename = "Google Ads")]
    GoogleAds,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::MetaAds, Platform::GoogleAds];

    /// Name of the workbook sheet holding this platform's table.
    pub fn sheet_name(self) -> &'static str {
        match self {
            Platform::MetaAds => "Meta Ads",
            Platform::GoogleAds => "Google Ads",
        }
    }

    /// Columns that must be present on this platform's sheet.
    pub fn required_measures(self) -> &'static [Measure] {
        match self {
            Platform::MetaAds => &[
                Measure::Revenue,
                Measure::Purchases,
                Measure::Cost,
                Measure::CartAdds,
                Measure::Checkouts,
            ],
            Platform::GoogleAds => &[
                Measure::Revenue,
                Measure::Purchases,
                Measure::Cost,
                Measure::Impressions,
            ],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

impl FromStr for Platform {
    type Err = InvalidPlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "meta" | "metaads" | "facebook" | "facebookads" => Ok(Platform::MetaAds),
            "google" | "googleads" => Ok(Platform::GoogleAds),
            _ => Err(InvalidPlatformError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Platform {
    type Error = InvalidPlatformError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A numeric column of a platform sheet.
///
/// The first six are the core measures used by the KPIs; the rest are
/// extended columns only consumed by the ad-hoc metric chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", rename_all = "snake_case")]
pub enum Measure {
    Revenue,
    Purchases,
    Cost,
    CartAdds,
    Checkouts,
    Impressions,
    Cpc,
    Cpm,
    Views,
    Reach,
    Cac,
    Roas,
}

impl Measure {
    pub const ALL: [Measure; 12] = [
        Measure::Revenue,
        Measure::Purchases,
        Measure::Cost,
        Measure::CartAdds,
        Measure::Checkouts,
        Measure::Impressions,
        Measure::Cpc,
        Measure::Cpm,
        Measure::Views,
        Measure::Reach,
        Measure::Cac,
        Measure::Roas,
    ];

    /// Measures offered by the ad-hoc chart when none are configured.
    pub const CHARTABLE: [Measure; 6] = [
        Measure::Revenue,
        Measure::Purchases,
        Measure::Cost,
        Measure::Impressions,
        Measure::CartAdds,
        Measure::Checkouts,
    ];

    /// Stable snake_case identifier used in config files and exports.
    pub fn key(self) -> &'static str {
        match self {
            Measure::Revenue => "revenue",
            Measure::Purchases => "purchases",
            Measure::Cost => "cost",
            Measure::CartAdds => "cart_adds",
            Measure::Checkouts => "checkouts",
            Measure::Impressions => "impressions",
            Measure::Cpc => "cpc",
            Measure::Cpm => "cpm",
            Measure::Views => "views",
            Measure::Reach => "reach",
            Measure::Cac => "cac",
            Measure::Roas => "roas",
        }
    }

    /// Header spellings accepted for this column, first one is canonical.
    pub fn headers(self) -> &'static [&'static str] {
        match self {
            Measure::Revenue => &["Receita", "Revenue", "Faturamento"],
            Measure::Purchases => &["Compras", "Purchases"],
            Measure::Cost => &["Custo", "Cost", "Investimento", "Spend"],
            Measure::CartAdds => &["Carrinhos", "Cart Adds", "Cart-Adds", "Add to Cart"],
            Measure::Checkouts => &[
                "Finalização de compra",
                "Checkout Completions",
                "Checkout-Completions",
                "Checkouts",
            ],
            Measure::Impressions => &["Impressões", "Impressions"],
            Measure::Cpc => &["CPC", "Custo por clique"],
            Measure::Cpm => &["CPM"],
            Measure::Views => &["Visualizações", "Views"],
            Measure::Reach => &["Alcance", "Reach"],
            Measure::Cac => &["CAC"],
            Measure::Roas => &["ROAS"],
        }
    }

    pub fn canonical_header(self) -> &'static str {
        self.headers()[0]
    }

    /// Matches a sheet header against the accepted spellings.
    pub fn from_header(header: &str) -> Option<Measure> {
        let header = header.trim();
        Measure::ALL
            .into_iter()
            .find(|m| m.headers().iter().any(|candidate| lower_eq(candidate, header)))
    }
}

/// Header spellings accepted for the date column.
pub const DATE_HEADERS: &[&str] = &["Data", "Date", "Dia"];

pub fn is_date_header(header: &str) -> bool {
    let header = header.trim();
    DATE_HEADERS.iter().any(|candidate| lower_eq(candidate, header))
}

// Unicode-aware: `eq_ignore_ascii_case` misses "IMPRESSÕES".
fn lower_eq(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_header())
    }
}

impl FromStr for Measure {
    type Err = InvalidMeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Measure::ALL
            .into_iter()
            .find(|m| m.key() == trimmed.to_lowercase().replace('-', "_"))
            .or_else(|| Measure::from_header(trimmed))
            .ok_or_else(|| InvalidMeasureError(s.to_string()))
    }
}

impl TryFrom<String> for Measure {
    type Error = InvalidMeasureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parses_common_spellings() {
        assert_eq!("Meta Ads".parse::<Platform>(), Ok(Platform::MetaAds));
        assert_eq!("meta".parse::<Platform>(), Ok(Platform::MetaAds));
        assert_eq!("google-ads".parse::<Platform>(), Ok(Platform::GoogleAds));
        assert_eq!("GOOGLE".parse::<Platform>(), Ok(Platform::GoogleAds));
    }

    #[test]
    fn test_platform_rejects_unknown_tag() {
        let err = "tiktok".parse::<Platform>().unwrap_err();
        assert_eq!(err, InvalidPlatformError("tiktok".into()));
    }

    #[test]
    fn test_platform_deserializes_from_sheet_name() {
        let p: Platform = serde_json::from_str("\"Google Ads\"").unwrap();
        assert_eq!(p, Platform::GoogleAds);
        assert!(serde_json::from_str::<Platform>("\"bing\"").is_err());
    }

    #[test]
    fn test_measure_from_header_accepts_portuguese_and_english() {
        assert_eq!(Measure::from_header("Receita"), Some(Measure::Revenue));
        assert_eq!(Measure::from_header(" revenue "), Some(Measure::Revenue));
        assert_eq!(Measure::from_header("IMPRESSÕES"), Some(Measure::Impressions));
        assert_eq!(
            Measure::from_header("Finalização de compra"),
            Some(Measure::Checkouts)
        );
        assert_eq!(Measure::from_header("Observações"), None);
    }

    #[test]
    fn test_measure_from_str_accepts_keys_and_headers() {
        assert_eq!("cart_adds".parse::<Measure>(), Ok(Measure::CartAdds));
        assert_eq!("cart-adds".parse::<Measure>(), Ok(Measure::CartAdds));
        assert_eq!("Carrinhos".parse::<Measure>(), Ok(Measure::CartAdds));
        assert!("clicks".parse::<Measure>().is_err());
    }

    #[test]
    fn test_date_header() {
        assert!(is_date_header("Data"));
        assert!(is_date_header(" date"));
        assert!(!is_date_header("Dia da Semana"));
    }
}
