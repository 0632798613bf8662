//! Nominatim / OpenStreetMap geocoder client.
//!
//! Nominatim has strict rate limits: **1 request per second** maximum on the
//! public instance, and every request must carry an identifying
//! `User-Agent`. Rate limiting is enforced by [`crate::Geocoder`], not here.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use async_trait::async_trait;

use crate::{GeocodeError, GeocodeProvider, GeocodedAddress};

/// Free-form Nominatim search client.
pub struct NominatimProvider {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimProvider {
    /// Creates a client for the search endpoint at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl GeocodeProvider for NominatimProvider {
    fn name(&self) -> &str {
        "nominatim"
    }

    async fn geocode(&self, query: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("countrycodes", "us"),
                ("format", "jsonv2"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        let body: serde_json::Value = resp.error_for_status()?.json().await?;
        parse_response(&body)
    }
}

/// Parses Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    let display_name = first["display_name"].as_str().map(String::from);

    Ok(Some(GeocodedAddress {
        latitude: lat,
        longitude: lon,
        matched_address: display_name,
    }))
}
