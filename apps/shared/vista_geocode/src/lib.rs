//! Reverse-geocoding client for Vista endpoints
//!
//! Both the host controller and the map runtime resolve coordinates to
//! addresses against a Nominatim-shaped HTTP service, each with its own
//! client instance on an independent network path.
//!
//! # Error policy
//!
//! Lookups never fail upward: network errors, non-OK statuses and
//! malformed payloads are logged and resolved as `None`. Callers handle
//! the absence of an address, not an error.

use serde::Deserialize;
use tracing::{debug, warn};

use vista_protocol::{AddressData, Coordinate};

/// Response body of the geocoding service's `/reverse` endpoint
#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: String,
    #[serde(default)]
    address: ReverseAddress,
}

/// Address component object inside a reverse response
///
/// The service reports the locality under different keys depending on
/// the place kind; `city`, `town` and `village` are folded in that order.
#[derive(Debug, Default, Deserialize)]
struct ReverseAddress {
    road: Option<String>,
    house_number: Option<String>,
    postcode: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    country: Option<String>,
}

impl ReverseResponse {
    fn into_address_data(self) -> AddressData {
        let ReverseAddress {
            road,
            house_number,
            postcode,
            city,
            town,
            village,
            country,
        } = self.address;

        AddressData {
            label: self.display_name,
            road,
            house_number,
            postcode,
            city: city.or(town).or(village),
            country,
        }
    }
}

/// Reverse-geocoding HTTP client
#[derive(Clone)]
pub struct GeocodeClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GeocodeClient {
    /// Create a client for the given service endpoint
    /// (e.g., "https://nominatim.openstreetmap.org")
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Get the configured service endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Resolve a coordinate to a structured address
    ///
    /// Returns `None` on any failure; the failure is logged, never raised.
    pub async fn reverse(&self, coordinates: Coordinate) -> Option<AddressData> {
        let url = format!(
            "{}/reverse?lon={}&lat={}&format=jsonv2",
            self.endpoint.trim_end_matches('/'),
            coordinates.lng,
            coordinates.lat
        );

        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Reverse geocoding request for {} failed: {}", coordinates, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(
                "Reverse geocoding for {} returned status {}",
                coordinates,
                response.status()
            );
            return None;
        }

        match response.json::<ReverseResponse>().await {
            Ok(body) => {
                let address = body.into_address_data();
                debug!("Resolved {} to '{}'", coordinates, address.label);
                Some(address)
            }
            Err(e) => {
                warn!("Malformed reverse geocoding payload for {}: {}", coordinates, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "display_name": "Carrer de Mallorca, 401, 08013 Barcelona, Spain",
            "address": {
                "road": "Carrer de Mallorca",
                "house_number": "401",
                "postcode": "08013",
                "city": "Barcelona",
                "country": "Spain"
            }
        }"#;

        let parsed: ReverseResponse = serde_json::from_str(json).unwrap();
        let address = parsed.into_address_data();
        assert_eq!(address.label, "Carrer de Mallorca, 401, 08013 Barcelona, Spain");
        assert_eq!(address.road.as_deref(), Some("Carrer de Mallorca"));
        assert_eq!(address.house_number.as_deref(), Some("401"));
        assert_eq!(address.city.as_deref(), Some("Barcelona"));
        assert_eq!(address.country.as_deref(), Some("Spain"));
    }

    #[test]
    fn test_locality_fallback_chain() {
        let json = r#"{
            "display_name": "Sant Cugat del Vallès, Spain",
            "address": {"town": "Sant Cugat del Vallès", "country": "Spain"}
        }"#;

        let parsed: ReverseResponse = serde_json::from_str(json).unwrap();
        let address = parsed.into_address_data();
        assert_eq!(address.city.as_deref(), Some("Sant Cugat del Vallès"));
        assert!(address.road.is_none());
    }

    #[test]
    fn test_missing_address_object() {
        let json = r#"{"display_name": "Somewhere"}"#;

        let parsed: ReverseResponse = serde_json::from_str(json).unwrap();
        let address = parsed.into_address_data();
        assert_eq!(address.label, "Somewhere");
        assert!(address.city.is_none());
    }

    #[tokio::test]
    async fn test_network_failure_resolves_to_none() {
        // Grab a port nothing is listening on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = GeocodeClient::new(format!("http://127.0.0.1:{}", port));
        let result = client.reverse(Coordinate::new(2.17, 41.38)).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_non_ok_status_resolves_to_none() {
        use std::io::Write as _;

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        // Minimal one-shot HTTP server answering 500 to anything
        let server = std::thread::spawn(move || {
            if let Ok((mut socket, _)) = listener.accept() {
                let _ = socket
                    .write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n");
            }
        });

        let client = GeocodeClient::new(format!("http://{}", addr));
        let result = client.reverse(Coordinate::new(2.17, 41.38)).await;
        assert!(result.is_none());

        server.join().unwrap();
    }
}
