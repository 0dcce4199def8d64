// src/model.rs
//! Data shapes flowing through the dashboard pipeline: user selection, the two
//! upstream payloads, and the projected record the presentation layer renders.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::fetch::FetchError;

/// The user's (date, sign) pair. Compared by value for de-duplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    pub date: NaiveDate,
    pub sign: String,
}

impl Selection {
    pub fn new(date: NaiveDate, sign: impl Into<String>) -> Self {
        Self {
            date,
            sign: sign.into(),
        }
    }

    pub fn for_sign(date: NaiveDate, sign: ZodiacSign) -> Self {
        Self::new(date, sign.as_str())
    }

    /// APOD only publishes up to the current day.
    pub fn ensure_not_future(&self, today: NaiveDate) -> Result<(), FetchError> {
        if self.date > today {
            return Err(FetchError::FutureDate {
                date: self.date,
                today,
            });
        }
        Ok(())
    }

    /// `YYYY-MM-DD`, the format the APOD endpoint expects.
    pub fn date_param(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date_param(), self.sign)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

impl ZodiacSign {
    pub const ALL: [ZodiacSign; 12] = [
        ZodiacSign::Aries,
        ZodiacSign::Taurus,
        ZodiacSign::Gemini,
        ZodiacSign::Cancer,
        ZodiacSign::Leo,
        ZodiacSign::Virgo,
        ZodiacSign::Libra,
        ZodiacSign::Scorpio,
        ZodiacSign::Sagittarius,
        ZodiacSign::Capricorn,
        ZodiacSign::Aquarius,
        ZodiacSign::Pisces,
    ];

    /// Identifier used on the wire (`sign=` query parameter).
    pub fn as_str(self) -> &'static str {
        match self {
            ZodiacSign::Aries => "aries",
            ZodiacSign::Taurus => "taurus",
            ZodiacSign::Gemini => "gemini",
            ZodiacSign::Cancer => "cancer",
            ZodiacSign::Leo => "leo",
            ZodiacSign::Virgo => "virgo",
            ZodiacSign::Libra => "libra",
            ZodiacSign::Scorpio => "scorpio",
            ZodiacSign::Sagittarius => "sagittarius",
            ZodiacSign::Capricorn => "capricorn",
            ZodiacSign::Aquarius => "aquarius",
            ZodiacSign::Pisces => "pisces",
        }
    }
}

impl fmt::Display for ZodiacSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZodiacSign {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ZodiacSign::ALL
            .into_iter()
            .find(|z| z.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow::anyhow!("unknown zodiac sign `{wanted}`"))
    }
}

/// Astronomy Picture of the Day, as returned by the APOD endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageOfDay {
    pub title: String,
    pub date: String,
    pub explanation: String,
    #[serde(rename = "url")]
    pub image_url: Url,
    #[serde(rename = "hdurl", default)]
    pub high_res_url: Option<Url>,
    pub media_type: String,
    #[serde(default)]
    pub copyright: Option<String>,
}

/// Wire shape of the horoscope API; flattened into `HoroscopeReading`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoroscopeResponse {
    status: i64,
    success: bool,
    data: HoroscopeData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HoroscopeData {
    date: String,
    horoscope_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HoroscopeResponse", into = "HoroscopeResponse")]
pub struct HoroscopeReading {
    pub status_code: i64,
    pub success: bool,
    pub date: String,
    pub text: String,
}

impl From<HoroscopeResponse> for HoroscopeReading {
    fn from(r: HoroscopeResponse) -> Self {
        Self {
            status_code: r.status,
            success: r.success,
            date: r.data.date,
            text: r.data.horoscope_data,
        }
    }
}

impl From<HoroscopeReading> for HoroscopeResponse {
    fn from(r: HoroscopeReading) -> Self {
        Self {
            status: r.status_code,
            success: r.success,
            data: HoroscopeData {
                date: r.date,
                horoscope_data: r.text,
            },
        }
    }
}

/// The unified view model published by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRecord {
    pub image_title: String,
    pub image_url: Url,
    pub horoscope_text: String,
}

impl DashboardRecord {
    pub fn from_parts(image: &ImageOfDay, horoscope: &HoroscopeReading) -> Self {
        Self {
            image_title: image.title.clone(),
            image_url: image.image_url.clone(),
            horoscope_text: horoscope.text.clone(),
        }
    }
}

/// Snapshot observed by renderers. Written only by the orchestrator task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineState {
    pub is_loading: bool,
    pub last_error: Option<String>,
    pub current: Option<DashboardRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const APOD_JSON: &str = r#"{
        "title": "Orion in Red and Blue",
        "date": "2024-01-01",
        "explanation": "A wide field view.",
        "url": "https://apod.nasa.gov/apod/image/2401/orion.jpg",
        "hdurl": "https://apod.nasa.gov/apod/image/2401/orion_big.jpg",
        "media_type": "image",
        "service_version": "v1"
    }"#;

    #[test]
    fn apod_decodes_with_renamed_fields() {
        let img: ImageOfDay = serde_json::from_str(APOD_JSON).unwrap();
        assert_eq!(img.media_type, "image");
        assert_eq!(
            img.image_url.as_str(),
            "https://apod.nasa.gov/apod/image/2401/orion.jpg"
        );
        assert!(img.high_res_url.is_some());
        assert!(img.copyright.is_none());
    }

    #[test]
    fn horoscope_is_flattened() {
        let raw = r#"{"status":200,"success":true,"data":{"date":"Jan 1, 2024","horoscope_data":"Be bold."}}"#;
        let h: HoroscopeReading = serde_json::from_str(raw).unwrap();
        assert_eq!(h.status_code, 200);
        assert!(h.success);
        assert_eq!(h.date, "Jan 1, 2024");
        assert_eq!(h.text, "Be bold.");
    }

    #[test]
    fn horoscope_serializes_back_to_wire_shape() {
        let raw = r#"{"status":200,"success":false,"data":{"date":"d","horoscope_data":"t"}}"#;
        let h: HoroscopeReading = serde_json::from_str(raw).unwrap();

        let out = serde_json::to_value(&h).unwrap();
        assert_eq!(out["data"]["horoscope_data"], "t");
        assert!(out.get("text").is_none());

        let again: HoroscopeReading = serde_json::from_value(out).unwrap();
        assert_eq!(again, h);
    }

    #[test]
    fn horoscope_missing_data_is_an_error() {
        let raw = r#"{"status":200,"success":true}"#;
        assert!(serde_json::from_str::<HoroscopeReading>(raw).is_err());
    }

    #[test]
    fn record_projects_title_url_and_text() {
        let img: ImageOfDay = serde_json::from_str(APOD_JSON).unwrap();
        let h = HoroscopeReading {
            status_code: 200,
            success: true,
            date: "Jan 1, 2024".into(),
            text: "Be bold.".into(),
        };
        let rec = DashboardRecord::from_parts(&img, &h);
        assert_eq!(rec.image_title, "Orion in Red and Blue");
        assert_eq!(rec.image_url, img.image_url);
        assert_eq!(rec.horoscope_text, "Be bold.");
    }

    #[test]
    fn zodiac_parse_is_case_insensitive() {
        assert_eq!("Aries".parse::<ZodiacSign>().unwrap(), ZodiacSign::Aries);
        assert_eq!(" PISCES ".parse::<ZodiacSign>().unwrap(), ZodiacSign::Pisces);
        assert!("ophiuchus".parse::<ZodiacSign>().is_err());
    }

    #[test]
    fn selection_formats_date_param() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let s = Selection::for_sign(d, ZodiacSign::Leo);
        assert_eq!(s.date_param(), "2024-01-05");
        assert_eq!(s.to_string(), "2024-01-05 leo");
    }

    #[test]
    fn dates_after_today_are_rejected() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(Selection::new(today, "leo").ensure_not_future(today).is_ok());
        assert!(Selection::new(today.pred_opt().unwrap(), "leo")
            .ensure_not_future(today)
            .is_ok());

        let tomorrow = today.succ_opt().unwrap();
        let err = Selection::new(tomorrow, "leo")
            .ensure_not_future(today)
            .unwrap_err();
        assert_eq!(err, FetchError::FutureDate { date: tomorrow, today });
        assert!(err.to_string().contains("2024-03-02"), "{err}");
    }
}
