// src/aggregate.rs
//! Dual-source aggregation: APOD + horoscope for one selection, fetched
//! concurrently and joined.

use std::time::Instant;

use chrono::Local;
use metrics::histogram;

use crate::fetch::{FetchClient, FetchError};
use crate::model::{HoroscopeReading, ImageOfDay, Selection};
use crate::telemetry::{ensure_metrics_described, AGGREGATE_MS};
use crate::upstream::Endpoints;

pub const IMAGE_UPSTREAM: &str = "image";
pub const HOROSCOPE_UPSTREAM: &str = "horoscope";

#[derive(Clone)]
pub struct Aggregator {
    client: FetchClient,
    endpoints: Endpoints,
}

impl Aggregator {
    pub fn new(client: FetchClient, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    /// Fetch both sources for `sel`. Succeeds only if both succeed.
    ///
    /// The date is checked and both URLs are built before anything goes on the
    /// wire, so a future date (`FetchError::FutureDate`) or an invalid input
    /// (`FetchError::InvalidUri`) fails with no request at all. The
    /// first fetch to fail wins; its sibling is dropped mid-flight.
    pub async fn aggregate(
        &self,
        sel: &Selection,
    ) -> Result<(ImageOfDay, HoroscopeReading), FetchError> {
        ensure_metrics_described();

        sel.ensure_not_future(Local::now().date_naive())?;
        let image_url = self.endpoints.apod_url(sel.date)?;
        let horoscope_url = self.endpoints.horoscope_url(&sel.sign)?;

        let t0 = Instant::now();
        let image = async {
            self.client
                .fetch_url::<ImageOfDay>(&image_url)
                .await
                .map_err(|e| FetchError::joined(IMAGE_UPSTREAM, e))
        };
        let horoscope = async {
            self.client
                .fetch_url::<HoroscopeReading>(&horoscope_url)
                .await
                .map_err(|e| FetchError::joined(HOROSCOPE_UPSTREAM, e))
        };
        let joined = tokio::try_join!(image, horoscope);

        histogram!(AGGREGATE_MS).record(t0.elapsed().as_secs_f64() * 1_000.0);
        tracing::debug!(
            target: "aggregate",
            date = %sel.date,
            sign = %sel.sign,
            ok = joined.is_ok(),
            "aggregation finished"
        );
        joined
    }
}
