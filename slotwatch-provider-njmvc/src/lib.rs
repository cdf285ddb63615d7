//! Provider implementation for the New Jersey MVC appointment wizard.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use scraper::{Html, Selector};
use tracing::{debug, warn};

use slotwatch_core::{
    model::{FetchTarget, RawSlot},
    plugin::SitePlugin,
    ports::{PortError, SlotSource},
};

/// Static NJ MVC type and location table.
pub mod catalog;

pub use catalog::catalog;

const ORIGIN: &str = "https://telegov.njportal.com";
const WIZARD_PATH: &str = "/njmvc/AppointmentWizard";
const CONTAINER_SELECTOR: &str = "#timeslots";
const SLOT_SELECTOR: &str = "a[href]";

/// Booking page fetcher for the NJ MVC appointment wizard.
pub struct NjMvcSlotSource {
    client: Client,
    origin: String,
}

impl NjMvcSlotSource {
    /// Create a new slot source bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_origin(client, ORIGIN)
    }

    /// Create a slot source talking to a different origin, such as a mock server.
    #[must_use]
    pub fn with_origin<S: Into<String>>(client: Client, origin: S) -> Self {
        let origin: String = origin.into();
        Self {
            client,
            origin: origin.trim_end_matches('/').to_owned(),
        }
    }

    /// Booking page URL for a (type, location) pair.
    #[must_use]
    pub fn page_url(&self, target: FetchTarget) -> String {
        format!(
            "{}{WIZARD_PATH}/{}/{}",
            self.origin, target.type_code, target.location_code
        )
    }
}

#[async_trait]
impl SlotSource for NjMvcSlotSource {
    async fn fetch(&self, target: FetchTarget) -> Result<Vec<RawSlot>, PortError> {
        let url = self.page_url(target);
        debug!(%url, "Fetching booking page");

        let html = fetch_html(self.client.get(&url)).await?;
        let slots = extract_slots(&html, &self.origin)?;

        debug!(%url, count = slots.len(), "Parsed booking page");
        Ok(slots)
    }
}

/// Build the plugin bundle for the NJ MVC provider.
#[must_use]
pub fn plugin(client: Client) -> SitePlugin {
    SitePlugin {
        name: String::from("NJ MVC"),
        catalog: Arc::new(catalog()),
        source: Arc::new(NjMvcSlotSource::new(client)),
    }
}

/// Pull every bookable slot out of a booking page.
///
/// Anchors whose href does not end in `/{date}/{time}` with a valid compact
/// time are skipped with a warning.
///
/// # Errors
///
/// Returns [`PortError::MissingContainer`] when the page has no timeslot container.
pub fn extract_slots(html: &str, origin: &str) -> Result<Vec<RawSlot>, PortError> {
    let container_selector = selector(CONTAINER_SELECTOR)?;
    let slot_selector = selector(SLOT_SELECTOR)?;

    let document = Html::parse_document(html);
    let container = document
        .select(&container_selector)
        .next()
        .ok_or(PortError::MissingContainer)?;

    Ok(container
        .select(&slot_selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| {
            let slot = parse_slot_href(origin, href);
            if slot.is_none() {
                warn!(href, "Skipping malformed slot link");
            }
            slot
        })
        .collect())
}

/// Turn a relative slot href into a [`RawSlot`].
///
/// The date is the second-to-last path segment and the time the last one.
/// Surrounding whitespace and trailing slashes are ignored when segmenting.
#[must_use]
pub fn parse_slot_href(origin: &str, href: &str) -> Option<RawSlot> {
    let href = href.trim();
    let mut segments = href.trim_end_matches('/').rsplit('/');
    let time = format_compact_time(segments.next()?)?;
    let date = segments.next().filter(|date| !date.is_empty())?;

    Some(RawSlot {
        url: format!("{origin}{href}"),
        date: date.to_owned(),
        time,
    })
}

/// Render the site's compact time string as a clock label.
///
/// Three digits are `HMM` and always read as morning (`925` becomes
/// `09:25AM`). Four digits are `HHMM`, labelled PM from hour 12 upward with
/// the hour left as is (`1430` becomes `14:30PM`). Anything else is rejected.
#[must_use]
pub fn format_compact_time(raw: &str) -> Option<String> {
    if !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    match raw.len() {
        3 => {
            let (hour, minutes) = raw.split_at(1);
            Some(format!("0{hour}:{minutes}AM"))
        }
        4 => {
            let (hour, minutes) = raw.split_at(2);
            let meridiem = if hour.parse::<u32>().ok()? >= 12 { "PM" } else { "AM" };
            Some(format!("{hour}:{minutes}{meridiem}"))
        }
        _ => None,
    }
}

fn selector(css: &str) -> Result<Selector, PortError> {
    Selector::parse(css)
        .map_err(|err| PortError::Internal(format!("Invalid selector {css}: {err:?}")))
}

// Small helper to fetch a page body with status handling.
async fn fetch_html(req: RequestBuilder) -> Result<String, PortError> {
    req.send()
        .await
        .map_err(PortError::from)?
        .error_for_status()
        .map_err(PortError::from)?
        .text()
        .await
        .map_err(PortError::from)
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const TARGET: FetchTarget = FetchTarget {
        type_code: 12,
        location_code: 141,
    };

    const PAGE: &str = r#"<html><body>
        <div id="timeslots">
            <a href="/njmvc/AppointmentWizard/12/141/2024-01-02/925">9:25 AM</a>
            <a href="/njmvc/AppointmentWizard/12/141/2024-01-02/1430">2:30 PM</a>
            <a href="/njmvc/AppointmentWizard/12/141/2024-01-02/93000">broken</a>
            <a>no link</a>
        </div>
        <a href="/njmvc/AppointmentWizard/12/141/2024-01-03/1000">outside</a>
    </body></html>"#;

    #[test]
    fn formats_three_digit_times_as_morning() {
        assert_eq!(format_compact_time("925").as_deref(), Some("09:25AM"), "925");
        assert_eq!(format_compact_time("005").as_deref(), Some("00:05AM"), "005");
    }

    #[test]
    fn formats_four_digit_times_literally() {
        assert_eq!(format_compact_time("1430").as_deref(), Some("14:30PM"), "1430");
        assert_eq!(format_compact_time("1200").as_deref(), Some("12:00PM"), "noon");
        assert_eq!(format_compact_time("0050").as_deref(), Some("00:50AM"), "0050");
        assert_eq!(format_compact_time("1059").as_deref(), Some("10:59AM"), "1059");
    }

    #[test]
    fn rejects_other_shapes() {
        for raw in ["", "93", "93000", "9a5", "12:0"] {
            assert_eq!(format_compact_time(raw), None, "{raw:?} must be rejected");
        }
    }

    #[test]
    fn parses_date_and_time_from_href() {
        let slot = parse_slot_href(ORIGIN, "/njmvc/AppointmentWizard/12/141/2024-01-02/925/");

        assert_eq!(
            slot,
            Some(RawSlot {
                url: "https://telegov.njportal.com/njmvc/AppointmentWizard/12/141/2024-01-02/925/"
                    .to_owned(),
                date: "2024-01-02".to_owned(),
                time: "09:25AM".to_owned(),
            }),
            "trailing slash ignored when segmenting"
        );
        assert_eq!(parse_slot_href(ORIGIN, "925"), None, "no date segment");
    }

    #[test]
    fn extracts_only_slots_inside_container() {
        let slots = extract_slots(PAGE, ORIGIN).expect("container present");

        let times: Vec<&str> = slots.iter().map(|slot| slot.time.as_str()).collect();
        assert_eq!(times, ["09:25AM", "14:30PM"], "malformed and outside links skipped");
    }

    #[test]
    fn missing_container_is_an_error() {
        let result = extract_slots("<html><body><p>No appointments</p></body></html>", ORIGIN);
        assert!(matches!(result, Err(PortError::MissingContainer)), "container required");
    }

    #[test]
    fn builds_page_url_from_template() {
        let source = NjMvcSlotSource::new(Client::new());
        assert_eq!(
            source.page_url(TARGET),
            "https://telegov.njportal.com/njmvc/AppointmentWizard/12/141",
            "template url"
        );
    }

    #[tokio::test]
    async fn fetches_and_resolves_slots() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/njmvc/AppointmentWizard/12/141"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let source = NjMvcSlotSource::with_origin(Client::new(), server.uri());
        let slots = source.fetch(TARGET).await.expect("fetch succeeds");

        let urls: Vec<String> = slots.into_iter().map(|slot| slot.url).collect();
        assert_eq!(
            urls,
            [
                format!("{}/njmvc/AppointmentWizard/12/141/2024-01-02/925", server.uri()),
                format!("{}/njmvc/AppointmentWizard/12/141/2024-01-02/1430", server.uri()),
            ],
            "hrefs resolved against the origin"
        );
    }

    #[tokio::test]
    async fn server_errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/njmvc/AppointmentWizard/12/141"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = NjMvcSlotSource::with_origin(Client::new(), server.uri());
        let result = source.fetch(TARGET).await;

        assert!(matches!(result, Err(PortError::Network(_))), "non-2xx is a fetch error");
    }

    #[tokio::test]
    async fn page_without_container_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/njmvc/AppointmentWizard/12/141"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let source = NjMvcSlotSource::with_origin(Client::new(), server.uri());
        let result = source.fetch(TARGET).await;

        assert!(matches!(result, Err(PortError::MissingContainer)), "missing container");
    }
}
