use std::future::Future;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::EXPOSE_BASE_URL;
use crate::types::{Listing, Money};

/// Failure modes of a page fetch.
///
/// All of these are per-tick, non-fatal: the tick aborts and the next
/// scheduled tick is the retry.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("search request failed")]
    Transport(#[from] reqwest::Error),
    #[error("malformed search response")]
    Decode(#[from] serde_json::Error),
    #[error("search response carries no result list (page {0})")]
    MissingResults(u32),
}

/// Anything that can produce the full set of current listings.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Listing>, FetchError>;
}

// ── wire shape ─────────────────────────────────────────────────────
//
// The search endpoint nests its payload three levels deep and uses dotted
// and @-prefixed keys. These structs exist only to be flattened into
// `Listing` immediately after decode; nothing else in the crate touches
// them.

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "searchResponseModel")]
    model: SearchResponseModel,
}

#[derive(Debug, Deserialize)]
struct SearchResponseModel {
    #[serde(rename = "resultlist.resultlist")]
    resultlist: ResultList,
}

#[derive(Debug, Deserialize)]
struct ResultList {
    paging: Paging,
    #[serde(rename = "resultlistEntries", default)]
    entries: Vec<EntryList>,
}

/// Pagination metadata reported by the search endpoint. The count on page 1
/// is authoritative for the whole walk.
#[derive(Debug, Clone, Deserialize)]
pub struct Paging {
    #[serde(rename = "pageNumber")]
    pub page_number: u32,
    #[serde(rename = "pageSize", default)]
    pub page_size: u32,
    #[serde(rename = "numberOfPages")]
    pub number_of_pages: u32,
    #[serde(rename = "numberOfHits", default)]
    pub number_of_hits: u32,
    #[serde(rename = "numberOfListings", default)]
    pub number_of_listings: u32,
}

#[derive(Debug, Deserialize)]
struct EntryList {
    #[serde(rename = "resultlistEntry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "resultlist.realEstate")]
    real_estate: RealEstate,
}

#[derive(Debug, Deserialize)]
struct RealEstate {
    #[serde(default)]
    title: String,
    price: Money,
    #[serde(rename = "livingSpace", default)]
    living_space: f32,
    #[serde(rename = "numberOfRooms", default)]
    number_of_rooms: f32,
    #[serde(rename = "calculatedTotalRent")]
    calculated_total_rent: CalculatedTotalRent,
}

#[derive(Debug, Deserialize)]
struct CalculatedTotalRent {
    #[serde(rename = "totalRent")]
    total_rent: Money,
}

/// One decoded page: authoritative paging metadata plus normalized listings.
#[derive(Debug)]
pub struct SearchPage {
    pub paging: Paging,
    pub listings: Vec<Listing>,
}

fn normalize(entry: Entry) -> Listing {
    let Entry { id, real_estate } = entry;
    let link = format!("{EXPOSE_BASE_URL}/{id}");
    Listing {
        title: real_estate.title,
        warm_rent: real_estate.calculated_total_rent.total_rent,
        cold_rent: real_estate.price,
        living_space: real_estate.living_space,
        number_of_rooms: real_estate.number_of_rooms,
        link,
        id,
    }
}

/// Decode one page body into paging metadata and flat listings.
///
/// A missing `resultlistEntries[0]` is a decode failure for the page; an
/// empty `resultlistEntry` array inside it is a valid empty page.
pub fn parse_page(body: &str, page_number: u32) -> Result<SearchPage, FetchError> {
    let response: SearchResponse = serde_json::from_str(body)?;
    let resultlist = response.model.resultlist;
    let entry_list = resultlist
        .entries
        .into_iter()
        .next()
        .ok_or(FetchError::MissingResults(page_number))?;
    let listings = entry_list.entries.into_iter().map(normalize).collect();
    Ok(SearchPage {
        paging: resultlist.paging,
        listings,
    })
}

/// Rewrite the configured search URL to request a specific page, keeping
/// every other query filter intact.
pub fn page_url(base: &Url, page: u32) -> Url {
    let mut url = base.clone();
    let params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "pagenumber")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(params)
        .append_pair("pagenumber", &page.to_string());
    url
}

/// Walk all result pages starting at page 1, trusting its page count.
///
/// The page count is unknown until page 1 answers, so at least one fetch
/// always happens. Fetches are sequential; any page failure aborts the walk.
pub async fn walk_pages<F, Fut>(fetch: F) -> Result<Vec<Listing>, FetchError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<SearchPage, FetchError>>,
{
    let first = fetch(1).await?;
    let total_pages = first.paging.number_of_pages;
    let mut listings = first.listings;
    for page in 2..=total_pages {
        listings.extend(fetch(page).await?.listings);
    }
    debug!(
        "fetched {} listings across {} page(s)",
        listings.len(),
        total_pages.max(1)
    );
    Ok(listings)
}

/// Live listing source backed by the ImmobilienScout24 search endpoint.
pub struct ImmoScoutSource {
    client: Client,
    search_url: Url,
}

impl ImmoScoutSource {
    pub fn new(client: Client, search_url: Url) -> Self {
        Self { client, search_url }
    }

    /// Fetch and decode a single result page. One outbound POST per call.
    pub async fn fetch_page(&self, page: u32) -> Result<SearchPage, FetchError> {
        let url = page_url(&self.search_url, page);
        debug!("requesting {url}");
        let body = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_page(&body, page)
    }
}

#[async_trait]
impl ListingSource for ImmoScoutSource {
    async fn fetch_all(&self) -> Result<Vec<Listing>, FetchError> {
        walk_pages(|page| self.fetch_page(page)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn entry_json(id: &str, title: &str, warm_rent: f64) -> serde_json::Value {
        json!({
            "@id": id,
            "@publishDate": "2024-05-01T10:00:00.000+0200",
            "resultlist.realEstate": {
                "@id": id,
                "title": title,
                "price": { "value": 900.0, "currency": "EUR" },
                "livingSpace": 54.5,
                "numberOfRooms": 2.5,
                "calculatedTotalRent": {
                    "totalRent": { "value": warm_rent, "currency": "EUR" }
                }
            }
        })
    }

    fn page_json(page: u32, total: u32, entries: Vec<serde_json::Value>) -> String {
        json!({
            "searchResponseModel": {
                "resultlist.resultlist": {
                    "paging": {
                        "pageNumber": page,
                        "pageSize": 20,
                        "numberOfPages": total,
                        "numberOfHits": entries.len(),
                        "numberOfListings": entries.len()
                    },
                    "resultlistEntries": [ { "resultlistEntry": entries } ]
                }
            }
        })
        .to_string()
    }

    #[test]
    fn decodes_nested_page_into_flat_listings() {
        let body = page_json(1, 3, vec![entry_json("123", "Helle Altbauwohnung", 1050.0)]);
        let page = parse_page(&body, 1).unwrap();

        assert_eq!(page.paging.page_number, 1);
        assert_eq!(page.paging.number_of_pages, 3);
        assert_eq!(page.listings.len(), 1);

        let listing = &page.listings[0];
        assert_eq!(listing.id, "123");
        assert_eq!(listing.title, "Helle Altbauwohnung");
        assert_eq!(listing.warm_rent.value, dec!(1050));
        assert_eq!(listing.warm_rent.currency, "EUR");
        assert_eq!(listing.cold_rent.value, dec!(900));
        assert!((listing.living_space - 54.5).abs() < f32::EPSILON);
        assert!((listing.number_of_rooms - 2.5).abs() < f32::EPSILON);
        assert_eq!(listing.link, "https://www.immobilienscout24.de/expose/123");
    }

    #[test]
    fn missing_result_list_is_a_decode_failure() {
        let body = json!({
            "searchResponseModel": {
                "resultlist.resultlist": {
                    "paging": { "pageNumber": 1, "numberOfPages": 1 },
                    "resultlistEntries": []
                }
            }
        })
        .to_string();
        assert!(matches!(
            parse_page(&body, 1),
            Err(FetchError::MissingResults(1))
        ));
    }

    #[test]
    fn absent_result_list_field_is_a_decode_failure() {
        let body = json!({
            "searchResponseModel": {
                "resultlist.resultlist": {
                    "paging": { "pageNumber": 2, "numberOfPages": 2 }
                }
            }
        })
        .to_string();
        assert!(matches!(
            parse_page(&body, 2),
            Err(FetchError::MissingResults(2))
        ));
    }

    #[test]
    fn empty_entry_array_is_a_valid_empty_page() {
        let body = page_json(1, 0, vec![]);
        let page = parse_page(&body, 1).unwrap();
        assert!(page.listings.is_empty());
        assert_eq!(page.paging.number_of_pages, 0);
    }

    #[test]
    fn garbage_body_is_a_decode_error() {
        assert!(matches!(
            parse_page("not json at all", 1),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn page_url_overrides_pagenumber_and_keeps_filters() {
        let base = Url::parse(
            "https://www.immobilienscout24.de/Suche/de/berlin/wohnung-mieten\
             ?numberofrooms=2.0-&price=-1500.0&pagenumber=7",
        )
        .unwrap();
        let url = page_url(&base, 3);

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("numberofrooms".to_string(), "2.0-".to_string())));
        assert!(pairs.contains(&("price".to_string(), "-1500.0".to_string())));
        assert!(pairs.contains(&("pagenumber".to_string(), "3".to_string())));
        assert_eq!(
            pairs.iter().filter(|(k, _)| k == "pagenumber").count(),
            1
        );
    }

    #[test]
    fn page_url_works_without_existing_query() {
        let base = Url::parse("https://www.immobilienscout24.de/Suche/de/berlin/wohnung-mieten")
            .unwrap();
        let url = page_url(&base, 2);
        assert_eq!(url.query(), Some("pagenumber=2"));
    }

    // ── pagination walker ──────────────────────────────────────────

    #[tokio::test]
    async fn walker_discovers_page_count_from_page_one() {
        let fetch = |page: u32| async move {
            match page {
                1 => parse_page(&page_json(1, 2, vec![entry_json("a", "A", 1000.0)]), 1),
                2 => parse_page(&page_json(2, 2, vec![entry_json("b", "B", 900.0)]), 2),
                n => panic!("unexpected page {n}"),
            }
        };
        let listings = walk_pages(fetch).await.unwrap();
        // Aggregation keeps fetch order; ranking happens later in the engine.
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].id, "a");
        assert_eq!(listings[1].id, "b");
    }

    #[tokio::test]
    async fn walker_with_zero_pages_returns_empty() {
        let fetch = |page: u32| async move {
            assert_eq!(page, 1, "only page 1 may be fetched");
            parse_page(&page_json(1, 0, vec![]), 1)
        };
        let listings = walk_pages(fetch).await.unwrap();
        assert!(listings.is_empty());
    }

    #[tokio::test]
    async fn walker_propagates_mid_walk_failure() {
        let fetch = |page: u32| async move {
            match page {
                1 => parse_page(&page_json(1, 2, vec![entry_json("a", "A", 1000.0)]), 1),
                n => Err(FetchError::MissingResults(n)),
            }
        };
        assert!(matches!(
            walk_pages(fetch).await,
            Err(FetchError::MissingResults(2))
        ));
    }
}
