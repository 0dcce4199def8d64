// src/upstream.rs
//! Request URLs for the two upstream sources.

use anyhow::Context;
use chrono::NaiveDate;
use url::Url;

use crate::fetch::FetchError;

pub const DEFAULT_APOD_BASE_URL: &str = "https://api.nasa.gov/planetary/apod";
pub const DEFAULT_HOROSCOPE_BASE_URL: &str =
    "https://horoscope-app-api.vercel.app/api/v1/get-horoscope/daily";

/// Period marker sent to the horoscope API; only the daily reading is used.
pub const HOROSCOPE_PERIOD: &str = "today";

#[derive(Debug, Clone)]
pub struct Endpoints {
    apod_base: Url,
    horoscope_base: Url,
    api_key: String,
}

impl Endpoints {
    pub fn new(apod_base: &str, horoscope_base: &str, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let apod_base = Url::parse(apod_base)
            .with_context(|| format!("parsing apod base url `{apod_base}`"))?;
        let horoscope_base = Url::parse(horoscope_base)
            .with_context(|| format!("parsing horoscope base url `{horoscope_base}`"))?;
        if apod_base.cannot_be_a_base() || horoscope_base.cannot_be_a_base() {
            anyhow::bail!("upstream base urls must be hierarchical (http/https)");
        }
        Ok(Self {
            apod_base,
            horoscope_base,
            api_key: api_key.into(),
        })
    }

    /// `GET {apod}?api_key=…&date=YYYY-MM-DD`
    pub fn apod_url(&self, date: NaiveDate) -> Result<Url, FetchError> {
        if self.api_key.trim().is_empty() {
            return Err(FetchError::InvalidUri("apod api key is empty".into()));
        }
        let mut url = self.apod_base.clone();
        url.query_pairs_mut()
            .append_pair("api_key", &self.api_key)
            .append_pair("date", &date.format("%Y-%m-%d").to_string());
        Ok(url)
    }

    /// `GET {horoscope}?sign=…&day=today`
    pub fn horoscope_url(&self, sign: &str) -> Result<Url, FetchError> {
        if !is_encodable_sign(sign) {
            return Err(FetchError::InvalidUri(format!(
                "sign `{}` cannot be used as a query value",
                sign.escape_debug()
            )));
        }
        let mut url = self.horoscope_base.clone();
        url.query_pairs_mut()
            .append_pair("sign", sign)
            .append_pair("day", HOROSCOPE_PERIOD);
        Ok(url)
    }
}

/// Sign ids go into the query verbatim, so only RFC 3986 unreserved characters pass.
pub fn is_encodable_sign(sign: &str) -> bool {
    !sign.is_empty()
        && sign
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'))
}
