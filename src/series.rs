use std::collections::HashMap;

use chrono::NaiveDate;
use futures::future::try_join_all;
use log::{debug, warn};

use crate::dates;
use crate::error::{Error, Result};
use crate::models::{LocationId, RawMeasurement, ResolvedDay};
use crate::provider::DataProvider;

/// Longest lookback a single request may ask for.
pub const MAX_WINDOW_DAYS: u32 = 366;

/// The last `window_days` days of measurements for `location`, ending today
/// in the local time zone. See [`assemble_series_at`].
pub async fn assemble_series<P: DataProvider + ?Sized>(
    provider: &P,
    location: LocationId,
    window_days: u32,
) -> Result<Vec<ResolvedDay>> {
    assemble_series_at(provider, location, window_days, dates::today()).await
}

/// Exactly one [`ResolvedDay`] per calendar day of the window ending at
/// `today`, oldest first. Days the provider has no record for are
/// placeholders with no concentrations.
///
/// Every concentration reference is resolved concurrently. Any failure fails
/// the whole series.
pub async fn assemble_series_at<P: DataProvider + ?Sized>(
    provider: &P,
    location: LocationId,
    window_days: u32,
    today: NaiveDate,
) -> Result<Vec<ResolvedDay>> {
    let too_large = Error::WindowTooLarge {
        requested: window_days,
        max: MAX_WINDOW_DAYS,
    };
    if window_days > MAX_WINDOW_DAYS {
        return Err(too_large);
    }
    let window = dates::window_ending(today, window_days).ok_or(too_large)?;
    let Some(&start) = window.first() else {
        return Ok(Vec::new());
    };

    let records = provider.fetch_raw_measurements(location, start).await?;
    debug!(
        "location {}: {} of {} days sampled since {}",
        location,
        records.len(),
        window_days,
        dates::date_stamp(start)
    );
    let mut by_date = index_by_date(records, location, start, today);

    let days = window
        .into_iter()
        .map(|date| resolve_day(provider, date, by_date.remove(&date)));
    try_join_all(days).await
}

fn index_by_date(
    records: Vec<RawMeasurement>,
    location: LocationId,
    start: NaiveDate,
    end: NaiveDate,
) -> HashMap<NaiveDate, RawMeasurement> {
    let mut by_date: HashMap<NaiveDate, RawMeasurement> = HashMap::with_capacity(records.len());
    for record in records {
        if record.location != location {
            debug!("ignoring measurement {} of location {}", record.id, record.location);
            continue;
        }
        if record.date < start || record.date > end {
            debug!("ignoring measurement {} dated {} outside the window", record.id, record.date);
            continue;
        }
        if let Some(kept) = by_date.get(&record.date) {
            warn!(
                "measurement {} duplicates {} for {}, keeping the first",
                record.id, kept.id, record.date
            );
            continue;
        }
        by_date.insert(record.date, record);
    }
    by_date
}

async fn resolve_day<P: DataProvider + ?Sized>(
    provider: &P,
    date: NaiveDate,
    record: Option<RawMeasurement>,
) -> Result<ResolvedDay> {
    let Some(record) = record else {
        return Ok(ResolvedDay::placeholder(date));
    };

    let concentrations = try_join_all(
        record
            .concentrations
            .iter()
            .map(|&id| provider.fetch_concentration(id)),
    )
    .await?;
    for concentration in &concentrations {
        if let Some(owner) = concentration.pollen.filter(|&owner| owner != record.id) {
            warn!(
                "concentration {} listed by measurement {} belongs to measurement {}",
                concentration.id, record.id, owner
            );
        }
    }

    Ok(ResolvedDay {
        date,
        measurement: Some(record.id),
        concentrations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::fake::FakeProvider;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 14).unwrap()
    }

    /// Day `n` of a window of `len` days ending today, counting from 1.
    fn day(n: u32, len: u32) -> NaiveDate {
        today() - Duration::days(i64::from(len - n))
    }

    fn assert_calendar(series: &[ResolvedDay], len: u32) {
        let dates: Vec<NaiveDate> = series.iter().map(|d| d.date).collect();
        assert_eq!(dates, dates::window_ending(today(), len).unwrap());
    }

    #[tokio::test]
    async fn no_measurements_gives_only_placeholders() {
        let provider = FakeProvider::sample();
        let series = assemble_series_at(&provider, 1, 7, today()).await.unwrap();

        assert_eq!(series.len(), 7);
        assert_calendar(&series, 7);
        assert!(series.iter().all(|d| d.is_placeholder() && d.concentrations.is_empty()));
    }

    #[tokio::test]
    async fn every_day_sampled_gives_no_placeholders() {
        let mut provider = FakeProvider::sample().with_concentration(500, 1, 3.0);
        for n in 1..=5 {
            provider = provider.with_measurement(1, n, day(n, 5), &[500]);
        }

        let series = assemble_series_at(&provider, 1, 5, today()).await.unwrap();

        assert_calendar(&series, 5);
        assert!(series.iter().all(|d| !d.is_placeholder()));
        assert!(series.iter().all(|d| d.concentrations.len() == 1));
    }

    #[tokio::test]
    async fn gap_in_the_middle_is_padded_in_place() {
        let mut provider = FakeProvider::sample()
            .with_concentration(1, 1, 12.0)
            .with_concentration(2, 2, 40.0);
        // Shuffled arrival order: later days first.
        for n in (10..=14).chain(1..=5) {
            provider = provider.with_measurement(1, 100 + n, day(n, 14), &[1, 2]);
        }

        let series = assemble_series_at(&provider, 1, 14, today()).await.unwrap();

        assert_eq!(series.len(), 14);
        assert_calendar(&series, 14);
        for (i, resolved) in series.iter().enumerate() {
            let n = i as u32 + 1;
            if (6..=9).contains(&n) {
                assert!(resolved.is_placeholder(), "day {} should be padding", n);
            } else {
                assert_eq!(resolved.measurement, Some(100 + n));
                assert_eq!(resolved.concentration_for(2).map(|c| c.value), Some(40.0));
            }
        }
    }

    #[tokio::test]
    async fn concentrations_keep_reference_order() {
        let provider = FakeProvider::sample()
            .with_concentration(30, 2, 1.0)
            .with_concentration(10, 1, 2.0)
            .with_concentration(20, 1, 3.0)
            .with_measurement(1, 1, today(), &[30, 10, 20]);

        let series = assemble_series_at(&provider, 1, 1, today()).await.unwrap();
        let ids: Vec<u32> = series[0].concentrations.iter().map(|c| c.id).collect();

        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn measurement_without_references_is_not_padding() {
        let provider = FakeProvider::sample().with_measurement(1, 9, today(), &[]);
        let series = assemble_series_at(&provider, 1, 2, today()).await.unwrap();

        assert!(series[0].is_placeholder());
        assert_eq!(series[1].measurement, Some(9));
        assert!(series[1].concentrations.is_empty());
    }

    #[tokio::test]
    async fn records_outside_the_window_and_duplicates_are_dropped() {
        let provider = FakeProvider::sample()
            .with_concentration(1, 1, 5.0)
            .with_concentration(2, 1, 6.0)
            .with_measurement(1, 1, day(2, 3), &[1])
            .with_measurement(1, 2, day(2, 3), &[2])
            .with_measurement(1, 3, today() + Duration::days(1), &[2]);

        let series = assemble_series_at(&provider, 1, 3, today()).await.unwrap();

        assert_calendar(&series, 3);
        assert_eq!(series[1].measurement, Some(1));
        assert_eq!(series[1].concentrations[0].value, 5.0);
        assert!(series[2].is_placeholder());
    }

    #[tokio::test]
    async fn records_of_other_locations_are_ignored() {
        let provider = FakeProvider::sample()
            .with_concentration(1, 1, 5.0)
            .with_measurement(1, 1, day(1, 2), &[1])
            .with_record(
                1,
                RawMeasurement {
                    id: 2,
                    location: 2,
                    date: day(2, 2),
                    concentrations: vec![1],
                },
            );

        let series = assemble_series_at(&provider, 1, 2, today()).await.unwrap();

        assert_eq!(series[0].measurement, Some(1));
        assert!(series[1].is_placeholder());
        assert_eq!(provider.concentration_fetches(), 1);
    }

    #[tokio::test]
    async fn one_unresolvable_reference_fails_the_series() {
        let provider = FakeProvider::sample()
            .with_concentration(1, 1, 5.0)
            .with_measurement(1, 1, day(1, 3), &[1])
            .with_measurement(1, 2, day(3, 3), &[1, 404]);

        let error = assemble_series_at(&provider, 1, 3, today()).await.unwrap_err();

        assert!(matches!(error, Error::ResolutionFailure { id: 404, .. }));
    }

    #[tokio::test]
    async fn unreachable_provider_fails_the_series() {
        let provider = FakeProvider::sample().unreachable();
        let error = assemble_series_at(&provider, 1, 14, today()).await.unwrap_err();

        assert!(matches!(error, Error::ProviderUnavailable { .. }));
    }

    #[tokio::test]
    async fn empty_window_does_not_contact_the_provider() {
        let provider = FakeProvider::sample();
        let series = assemble_series_at(&provider, 1, 0, today()).await.unwrap();

        assert!(series.is_empty());
        assert_eq!(provider.measurement_fetches(), 0);
        assert_eq!(provider.concentration_fetches(), 0);
    }

    #[tokio::test]
    async fn oversized_window_is_an_error() {
        let provider = FakeProvider::sample();

        let error = assemble_series_at(&provider, 1, 100_000_000, today()).await.unwrap_err();
        assert!(matches!(
            error,
            Error::WindowTooLarge { requested: 100_000_000, max: MAX_WINDOW_DAYS }
        ));
        assert_eq!(provider.measurement_fetches(), 0);

        let series = assemble_series_at(&provider, 1, MAX_WINDOW_DAYS, today()).await.unwrap();
        assert_eq!(series.len(), MAX_WINDOW_DAYS as usize);
    }

    #[tokio::test(start_paused = true)]
    async fn references_are_resolved_concurrently() {
        let delay = std::time::Duration::from_secs(1);
        let mut provider = FakeProvider::sample().with_concentration_delay(delay);
        for id in 1..=4 {
            provider = provider.with_concentration(id, 1, f64::from(id));
        }
        let provider = provider
            .with_measurement(1, 1, day(1, 3), &[1, 2, 3, 4])
            .with_measurement(1, 2, day(3, 3), &[4, 3]);

        let started = tokio::time::Instant::now();
        let series = assemble_series_at(&provider, 1, 3, today()).await.unwrap();

        assert_eq!(provider.concentration_fetches(), 6);
        assert_eq!(series[0].concentrations.len(), 4);
        assert_eq!(series[2].concentrations.len(), 2);
        // Six lookups of one second each finish together.
        assert!(started.elapsed() < delay * 2);
    }
}
