//! KPI functions over a date-filtered platform table.
//!
//! Every function is pure. Rates whose denominator sums to zero are 0, and
//! rankings whose dataset-wide guard fails return [`Ranked::NoData`].

use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;

use super::types::{CheckoutPerformance, Investment, Ranked, TrailingTrend, TrendDirection};
use super::utility::{group_ratios, group_sums, ratio};
use crate::dataset::{DateRange, Dataset};
use crate::platform::{Measure, Platform};

pub const DEFAULT_TREND_WINDOW_DAYS: u32 = 7;

/// Purchases over cart adds (Meta Ads) or over impressions (Google Ads).
pub fn conversion_rate(data: &Dataset, platform: Platform) -> f64 {
    let denominator = match platform {
        Platform::MetaAds => Measure::CartAdds,
        Platform::GoogleAds => Measure::Impressions,
    };
    ratio(data.total(Measure::Purchases), data.total(denominator))
}

/// Day label with the largest revenue sum.
pub fn highest_revenue_day(data: &Dataset) -> Ranked {
    if data.total(Measure::Revenue) <= 0.0 {
        return Ranked::NoData;
    }
    let per_day = group_sums(data, |r| r.day_label.clone(), Measure::Revenue);
    pick(per_day, |candidate, best| candidate > best)
}

/// Day label with the largest average ticket (revenue per purchase).
pub fn highest_ticket_day(data: &Dataset) -> Ranked {
    if data.total(Measure::Purchases) <= 0.0 {
        return Ranked::NoData;
    }
    let per_day = group_ratios(
        data,
        |r| r.day_label.clone(),
        Measure::Revenue,
        Measure::Purchases,
    );
    pick(per_day, |candidate, best| candidate > best)
}

/// Checkout completions over cart adds; only meaningful for Meta Ads.
pub fn checkout_performance(data: &Dataset, platform: Platform) -> CheckoutPerformance {
    match platform {
        Platform::MetaAds => {
            let cart_adds = data.total(Measure::CartAdds);
            if cart_adds > 0.0 {
                CheckoutPerformance::Rate(data.total(Measure::Checkouts) / cart_adds)
            } else {
                CheckoutPerformance::NotApplicable
            }
        }
        Platform::GoogleAds => CheckoutPerformance::NotApplicable,
    }
}

/// Total spend and revenue over spend.
pub fn investment_and_return(data: &Dataset) -> Investment {
    let total_cost = data.total(Measure::Cost);
    let roas = if total_cost > 0.0 {
        data.total(Measure::Revenue) / total_cost
    } else {
        0.0
    };
    Investment { total_cost, roas }
}

pub fn total_revenue(data: &Dataset) -> f64 {
    data.total(Measure::Revenue)
}

/// Weekday with the smallest customer acquisition cost (cost per purchase).
pub fn lowest_cac_weekday(data: &Dataset) -> Ranked {
    if data.total(Measure::Purchases) <= 0.0 {
        return Ranked::NoData;
    }
    let per_weekday = group_ratios(data, |r| r.weekday.clone(), Measure::Cost, Measure::Purchases);
    pick(per_weekday, |candidate, best| candidate < best)
}

/// Conversion rate over the last `window_days` days of `data` against the
/// `window_days` days right before them.
///
/// Takes the whole platform table, not the user's filtered range: the windows
/// end at the table's own latest date. A zero window is treated as one day.
pub fn conversion_rate_trailing_window(
    data: &Dataset,
    platform: Platform,
    window_days: u32,
) -> TrailingTrend {
    let window_days = window_days.max(1);

    let Some(last) = data.max_date() else {
        return TrailingTrend {
            window_days,
            current_window: None,
            previous_window: None,
            current_rate: 0.0,
            previous_rate: 0.0,
            trend: TrendDirection::Unchanged,
        };
    };

    let width = u64::from(window_days);
    let current = DateRange::new(days_before(last, width - 1), last);
    let previous = DateRange::new(days_before(last, 2 * width - 1), days_before(last, width));

    let current_rate = conversion_rate(&data.filter(&current), platform);
    let previous_rate = conversion_rate(&data.filter(&previous), platform);

    TrailingTrend {
        window_days,
        current_window: Some(current),
        previous_window: Some(previous),
        current_rate,
        previous_rate,
        trend: TrendDirection::between(previous_rate, current_rate),
    }
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days))
        .unwrap_or(NaiveDate::MIN)
}

/// First group, in key order, that no later group beats.
fn pick(groups: BTreeMap<String, f64>, beats: impl Fn(f64, f64) -> bool) -> Ranked {
    let mut best: Option<(String, f64)> = None;
    for (label, value) in groups {
        let replace = match &best {
            Some((_, current)) => beats(value, *current),
            None => true,
        };
        if replace {
            best = Some((label, value));
        }
    }

    match best {
        Some((label, value)) => Ranked::Found { label, value },
        None => Ranked::NoData,
    }
}
