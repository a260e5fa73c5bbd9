//! Primary-marketplace client implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::credentials::CredentialPool;
use crate::metrics;

use super::config::MarketplaceConfig;
use super::types::{DiscoveredEvent, MarketplaceApi, RawSeat};

/// Seat numbers synthesized for general-admission rows.
const GA_PLACEHOLDER_SEATS: &str = "20,21,22,23";

/// Default list-price multiplier suggested for discovered events.
const DEFAULT_MARKUP: f64 = 1.6;

static EVENT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/event/([A-Z0-9]+)(?:\?|$)").expect("valid event id pattern"));

/// Client for the primary marketplace.
///
/// Every request attempt draws a fresh credential bundle from the pool and
/// reports the outcome back, so failing bundles rotate out under load.
pub struct PrimaryMarketplaceClient {
    client: Client,
    config: MarketplaceConfig,
    pool: Arc<CredentialPool>,
}

impl PrimaryMarketplaceClient {
    pub fn new(config: MarketplaceConfig, pool: Arc<CredentialPool>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            pool,
        }
    }

    fn build_search_url(&self, name: &str, city: &str, page: u32) -> String {
        format!(
            "{}?apikey={}&keyword={}&locale=*&city={}&size={}&page={}",
            self.config.discovery_url,
            self.config.consumer_key.as_deref().unwrap_or_default(),
            urlencoding::encode(name),
            urlencoding::encode(city),
            self.config.page_size,
            page
        )
    }

    fn build_quickpicks_url(&self, event_id: &str, offset: u32) -> String {
        format!(
            "{}/event/{}/quickpicks?show=places+sections\
             &mode=primary:ppsectionrow+resale:ga_areas&qty=2&q=not('accessible')\
             &includeStandard=true&includeResale=false&embed=area&embed=offer\
             &apikey={}&apisecret={}&limit={}&offset={}&sort=listprice",
            self.config.quickpicks_url.trim_end_matches('/'),
            urlencoding::encode(event_id),
            self.config.api_key.as_deref().unwrap_or_default(),
            self.config.api_secret.as_deref().unwrap_or_default(),
            self.config.seat_page_limit,
            offset
        )
    }

    /// Fetch one page, drawing a fresh bundle per attempt and rotating on
    /// failure. Returns `None` once the attempts are exhausted.
    async fn get_with_rotation<T: serde::de::DeserializeOwned>(&self, url: &str) -> Option<T> {
        for attempt in 1..=self.config.max_retries {
            let bundle = self.pool.acquire();
            let headers = header_map(bundle.headers());

            let response = match self.client.get(url).headers(headers).send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!(
                        attempt,
                        max = self.config.max_retries,
                        error = %e,
                        "marketplace request failed"
                    );
                    self.pool.report_failure(&bundle);
                    metrics::MARKETPLACE_REQUESTS
                        .with_label_values(&["transport_error"])
                        .inc();
                    continue;
                }
            };

            if !response.status().is_success() {
                warn!(
                    attempt,
                    max = self.config.max_retries,
                    status = %response.status(),
                    "marketplace request rejected"
                );
                self.pool.report_failure(&bundle);
                metrics::MARKETPLACE_REQUESTS
                    .with_label_values(&["rejected"])
                    .inc();
                continue;
            }

            self.pool.report_success(&bundle);
            metrics::MARKETPLACE_REQUESTS.with_label_values(&["ok"]).inc();

            match response.json::<T>().await {
                Ok(body) => return Some(body),
                Err(e) => {
                    // Success status with an unreadable body: treat the page
                    // as unusable rather than burning further credentials.
                    warn!(error = %e, "failed to parse marketplace response");
                    return None;
                }
            }
        }

        None
    }
}

#[async_trait]
impl MarketplaceApi for PrimaryMarketplaceClient {
    async fn search(
        &self,
        name: &str,
        city: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<DiscoveredEvent> {
        let target_name = name.trim().to_lowercase();
        let mut results = Vec::new();
        let mut page = 0u32;

        loop {
            let url = self.build_search_url(name, city, page);
            let Some(body) = self.get_with_rotation::<DiscoveryResponse>(&url).await else {
                // A dead page aborts the whole search; skipping ahead would
                // silently drop events in the middle of the window.
                warn!(page, "search aborted after exhausting retries");
                break;
            };

            let Some(events) = body.embedded.map(|e| e.events) else {
                break;
            };
            if events.is_empty() {
                break;
            }

            for event in &events {
                match discovered_event(event, &target_name, city, start, end) {
                    Some(discovered) => results.push(discovered),
                    None => continue,
                }
            }

            let Some(page_info) = body.page else {
                break;
            };
            if page_info.number + 1 >= page_info.total_pages {
                break;
            }
            page += 1;
        }

        debug!(query = name, results = results.len(), "search complete");
        results
    }

    async fn get_seats(&self, event_id: &str) -> Vec<RawSeat> {
        let mut seats = Vec::new();
        let mut offset = 0u32;
        let limit = self.config.seat_page_limit;

        loop {
            let url = self.build_quickpicks_url(event_id, offset);
            let Some(body) = self.get_with_rotation::<QuickpicksResponse>(&url).await else {
                warn!(event_id, offset, "seat fetch aborted after exhausting retries");
                break;
            };

            let picks = body.picks.unwrap_or_default();
            if picks.is_empty() {
                break;
            }

            let offers = body
                .embedded
                .map(|e| {
                    e.offer
                        .into_iter()
                        .map(|o| (o.offer_id.clone(), o))
                        .collect::<HashMap<_, _>>()
                })
                .unwrap_or_default();

            let page_count = picks.len();
            seats.extend(normalize_picks(picks, &offers));

            if (page_count as u32) < limit {
                break;
            }
            offset += limit;
        }

        debug!(event_id, seats = seats.len(), "seat fetch complete");
        seats
    }
}

/// Filter and convert one upstream event into a discovery result.
fn discovered_event(
    event: &DiscoveryEvent,
    target_name: &str,
    city: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Option<DiscoveredEvent> {
    let name = event.name.as_deref()?;
    if name.trim().to_lowercase() != target_name {
        return None;
    }

    let dates = event.dates.as_ref()?.start.as_ref()?;
    let date = NaiveDate::parse_from_str(dates.local_date.as_deref()?, "%Y-%m-%d").ok()?;
    if date < start || date > end {
        return None;
    }

    let marketplace_id = event
        .url
        .as_deref()
        .and_then(extract_event_id)
        .unwrap_or_default();

    let venue = event
        .embedded
        .as_ref()
        .and_then(|e| e.venues.first())
        .and_then(|v| v.name.clone())
        .unwrap_or_default();

    Some(DiscoveredEvent {
        marketplace_id,
        name: name.to_string(),
        city: city.to_string(),
        date,
        time: dates.local_time.clone().unwrap_or_default(),
        venue,
        markup: DEFAULT_MARKUP,
    })
}

/// Extract the marketplace-native id from an event's canonical URL.
fn extract_event_id(url: &str) -> Option<String> {
    EVENT_ID_RE
        .captures(url)
        .map(|captures| captures[1].to_string())
}

/// Normalize one page of picks into raw seats.
///
/// "general-seating" picks become a single synthetic GA row; "seat" picks
/// expand each offer group with seats into its own row; anything whose
/// selection is not "standard" is ignored.
fn normalize_picks(picks: Vec<Pick>, offers: &HashMap<String, Offer>) -> Vec<RawSeat> {
    let mut seats = Vec::new();

    for pick in picks {
        if pick.selection.as_deref() != Some("standard") {
            continue;
        }

        match pick.kind.as_deref() {
            Some("general-seating") => {
                let offer = pick.offers.first().and_then(|id| offers.get(id));
                seats.push(RawSeat {
                    section: pick.section.clone().unwrap_or_default(),
                    row: "GA".to_string(),
                    seats: GA_PLACEHOLDER_SEATS.to_string(),
                    price: offer.and_then(|o| o.list_price).unwrap_or(0.0),
                    face_value: offer.and_then(|o| o.face_value).unwrap_or(0.0),
                    fees: None,
                });
            }
            Some("seat") => {
                for group in &pick.offer_groups {
                    if group.seats.is_empty() {
                        continue;
                    }
                    let offer = group.offers.first().and_then(|id| offers.get(id));
                    seats.push(RawSeat {
                        section: pick.section.clone().unwrap_or_default(),
                        row: pick.row.clone().unwrap_or_default(),
                        seats: join_seats(&group.seats),
                        price: offer.and_then(|o| o.list_price).unwrap_or(0.0),
                        face_value: offer.and_then(|o| o.face_value).unwrap_or(0.0),
                        fees: None,
                    });
                }
            }
            _ => {}
        }
    }

    seats
}

/// Seat numbers arrive as either strings or integers; join them verbatim.
fn join_seats(seats: &[serde_json::Value]) -> String {
    seats
        .iter()
        .map(|seat| match seat {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Build a reqwest header map, skipping entries that are not valid HTTP
/// header names/values.
fn header_map(headers: &HashMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            continue;
        };
        let Ok(value) = HeaderValue::from_str(value) else {
            continue;
        };
        map.insert(name, value);
    }
    map
}

// Upstream response shapes (discovery).

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    #[serde(rename = "_embedded")]
    embedded: Option<DiscoveryEmbedded>,
    page: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
struct DiscoveryEmbedded {
    #[serde(default)]
    events: Vec<DiscoveryEvent>,
}

#[derive(Debug, Deserialize)]
struct DiscoveryEvent {
    name: Option<String>,
    url: Option<String>,
    dates: Option<EventDates>,
    #[serde(rename = "_embedded")]
    embedded: Option<EventEmbedded>,
}

#[derive(Debug, Deserialize)]
struct EventDates {
    start: Option<EventDateStart>,
}

#[derive(Debug, Deserialize)]
struct EventDateStart {
    #[serde(rename = "localDate")]
    local_date: Option<String>,
    #[serde(rename = "localTime")]
    local_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventEmbedded {
    #[serde(default)]
    venues: Vec<VenueRef>,
}

#[derive(Debug, Deserialize)]
struct VenueRef {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(rename = "totalPages")]
    total_pages: u32,
    number: u32,
}

// Upstream response shapes (seat quotes).

#[derive(Debug, Deserialize)]
struct QuickpicksResponse {
    picks: Option<Vec<Pick>>,
    #[serde(rename = "_embedded")]
    embedded: Option<QuickpicksEmbedded>,
}

#[derive(Debug, Deserialize)]
struct QuickpicksEmbedded {
    #[serde(default)]
    offer: Vec<Offer>,
}

#[derive(Debug, Deserialize)]
struct Offer {
    #[serde(rename = "offerId")]
    offer_id: String,
    #[serde(rename = "listPrice")]
    list_price: Option<f64>,
    #[serde(rename = "faceValue")]
    face_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Pick {
    #[serde(rename = "type")]
    kind: Option<String>,
    selection: Option<String>,
    section: Option<String>,
    row: Option<String>,
    #[serde(default)]
    offers: Vec<String>,
    #[serde(rename = "offerGroups", default)]
    offer_groups: Vec<OfferGroup>,
}

#[derive(Debug, Deserialize)]
struct OfferGroup {
    #[serde(default)]
    offers: Vec<String>,
    #[serde(default)]
    seats: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_event_id() {
        assert_eq!(
            extract_event_id("https://market.example.com/hamlet-tickets/event/1A00610BDE82915A"),
            Some("1A00610BDE82915A".to_string())
        );
        assert_eq!(
            extract_event_id("https://market.example.com/event/Z7R8G0?camefrom=search"),
            Some("Z7R8G0".to_string())
        );
        assert_eq!(extract_event_id("https://market.example.com/venue/xyz"), None);
        // Lowercase ids are not part of the canonical URL format.
        assert_eq!(extract_event_id("https://market.example.com/event/abc123"), None);
    }

    #[test]
    fn test_join_seats_mixed_types() {
        let seats = vec![
            serde_json::json!(12),
            serde_json::json!("13"),
            serde_json::json!(14),
        ];
        assert_eq!(join_seats(&seats), "12,13,14");
    }

    fn offer(id: &str, list: f64, face: f64) -> Offer {
        Offer {
            offer_id: id.to_string(),
            list_price: Some(list),
            face_value: Some(face),
        }
    }

    #[test]
    fn test_normalize_picks_general_seating() {
        let offers: HashMap<_, _> = [("o1".to_string(), offer("o1", 55.0, 45.0))].into();
        let picks = vec![Pick {
            kind: Some("general-seating".to_string()),
            selection: Some("standard".to_string()),
            section: Some("Floor".to_string()),
            row: None,
            offers: vec!["o1".to_string()],
            offer_groups: vec![],
        }];

        let seats = normalize_picks(picks, &offers);
        assert_eq!(seats.len(), 1);
        assert_eq!(seats[0].row, "GA");
        assert_eq!(seats[0].seats, GA_PLACEHOLDER_SEATS);
        assert_eq!(seats[0].price, 55.0);
        assert_eq!(seats[0].face_value, 45.0);
    }

    #[test]
    fn test_normalize_picks_expands_offer_groups() {
        let offers: HashMap<_, _> = [
            ("o1".to_string(), offer("o1", 100.0, 80.0)),
            ("o2".to_string(), offer("o2", 120.0, 90.0)),
        ]
        .into();
        let picks = vec![Pick {
            kind: Some("seat".to_string()),
            selection: Some("standard".to_string()),
            section: Some("Orchestra".to_string()),
            row: Some("A".to_string()),
            offers: vec![],
            offer_groups: vec![
                OfferGroup {
                    offers: vec!["o1".to_string()],
                    seats: vec![serde_json::json!(12), serde_json::json!(13)],
                },
                OfferGroup {
                    offers: vec!["o2".to_string()],
                    seats: vec![serde_json::json!(14)],
                },
                OfferGroup {
                    offers: vec!["o1".to_string()],
                    seats: vec![],
                },
            ],
        }];

        let seats = normalize_picks(picks, &offers);
        assert_eq!(seats.len(), 2);
        assert_eq!(seats[0].seats, "12,13");
        assert_eq!(seats[0].price, 100.0);
        assert_eq!(seats[1].seats, "14");
        assert_eq!(seats[1].price, 120.0);
    }

    #[test]
    fn test_normalize_picks_ignores_non_standard() {
        let offers = HashMap::new();
        let picks = vec![Pick {
            kind: Some("seat".to_string()),
            selection: Some("resale".to_string()),
            section: Some("Orchestra".to_string()),
            row: Some("A".to_string()),
            offers: vec![],
            offer_groups: vec![OfferGroup {
                offers: vec![],
                seats: vec![serde_json::json!(1)],
            }],
        }];

        assert!(normalize_picks(picks, &offers).is_empty());
    }

    #[test]
    fn test_discovered_event_filters() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

        let event = DiscoveryEvent {
            name: Some("  Hamlet ".to_string()),
            url: Some("https://market.example.com/event/AB12CD".to_string()),
            dates: Some(EventDates {
                start: Some(EventDateStart {
                    local_date: Some("2024-06-15".to_string()),
                    local_time: Some("19:30".to_string()),
                }),
            }),
            embedded: Some(EventEmbedded {
                venues: vec![VenueRef {
                    name: Some("The Globe".to_string()),
                }],
            }),
        };

        let discovered = discovered_event(&event, "hamlet", "London", start, end).unwrap();
        assert_eq!(discovered.marketplace_id, "AB12CD");
        assert_eq!(discovered.venue, "The Globe");
        assert_eq!(discovered.time, "19:30");

        // Name mismatch.
        assert!(discovered_event(&event, "macbeth", "London", start, end).is_none());

        // Out of the date window.
        let late_start = NaiveDate::from_ymd_opt(2024, 6, 16).unwrap();
        assert!(discovered_event(&event, "hamlet", "London", late_start, end).is_none());
    }

    #[test]
    fn test_header_map_skips_invalid_entries() {
        let mut headers = HashMap::new();
        headers.insert("User-Agent".to_string(), "ok".to_string());
        headers.insert("Bad Name".to_string(), "value".to_string());
        headers.insert("X-Other".to_string(), "bad\nvalue".to_string());

        let map = header_map(&headers);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("user-agent"));
    }
}
