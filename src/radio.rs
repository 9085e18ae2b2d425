//! Internet radio catalog.
//!
//! Stations come from radio-browser for a fixed set of countries, merged with a hand kept local
//! list and cached on disk for a week. Playback of the streams is not handled here.

use std::{
    collections::{BTreeMap, HashSet},
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const COUNTRIES: [&str; 4] = ["Israel", "United Kingdom", "United States", "Canada"];
const RADIO_BROWSER: &str = "https://de1.api.radio-browser.info/json/stations/bycountry";
const CACHE_LIFETIME_SECS: i64 = 7 * 24 * 60 * 60;

/// Country name to its stations, sorted by station name.
pub type Catalog = BTreeMap<String, Vec<Station>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub country: String,
    pub name: String,
    pub url: String,
}

/// A station as radio-browser or the local file describe it, every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawStation {
    pub name: Option<String>,
    pub country: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Error)]
pub enum RadioError {
    #[error("couldn't fetch stations: {0}")]
    Http(#[from] reqwest::Error),
    #[error("couldn't write {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("couldn't serialize stations: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Where station lists come from.
pub trait StationSource {
    /// # Errors
    /// if the stations for `country` couldn't be fetched
    fn fetch(&self, country: &str) -> Result<Vec<RawStation>, RadioError>;
}

#[derive(Debug)]
pub struct RadioBrowser {
    client: reqwest::blocking::Client,
}

impl RadioBrowser {
    /// # Errors
    /// if the http client can't be set up
    pub fn new(timeout: Duration) -> Result<Self, RadioError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dose_clock/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl StationSource for RadioBrowser {
    fn fetch(&self, country: &str) -> Result<Vec<RawStation>, RadioError> {
        let stations = self
            .client
            .get(format!("{RADIO_BROWSER}/{country}"))
            .send()?
            .error_for_status()?
            .json()?;
        Ok(stations)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    stations: Catalog,
    /// unix seconds
    last_update: i64,
}

/// The station files, normally in the data directory.
#[derive(Debug, Clone)]
pub struct RadioPaths {
    /// hand kept `{"country": [stations]}`, optional
    pub local: PathBuf,
    pub cache: PathBuf,
}

impl RadioPaths {
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            local: dir.join("radio_stations.json"),
            cache: dir.join("radio_stations_cache.json"),
        }
    }
}

/// Keeps the first station of each name, drops nameless ones and sorts by name ignoring case.
#[must_use]
pub fn dedupe_and_sort(stations: Vec<RawStation>) -> Vec<Station> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Station> = stations
        .into_iter()
        .filter_map(|raw| {
            let name = raw.name.filter(|n| !n.is_empty())?;
            seen.insert(name.clone()).then(|| Station {
                country: raw.country.unwrap_or_default(),
                name,
                url: raw.url.unwrap_or_default(),
            })
        })
        .collect();
    unique.sort_by_key(|s| s.name.to_lowercase());
    unique
}

/// Fetched stations first, then the local ones, per country.
#[must_use]
pub fn merge(
    fetched: Vec<(String, Vec<RawStation>)>,
    local: BTreeMap<String, Vec<RawStation>>,
) -> Catalog {
    let mut merged: BTreeMap<String, Vec<RawStation>> = BTreeMap::new();
    for (country, stations) in fetched.into_iter().chain(local) {
        merged.entry(country).or_default().extend(stations);
    }
    merged
        .into_iter()
        .map(|(country, stations)| (country, dedupe_and_sort(stations)))
        .collect()
}

fn load_local(path: &Path) -> BTreeMap<String, Vec<RawStation>> {
    let Ok(contents) = fs::read_to_string(path) else {
        return BTreeMap::new();
    };
    serde_json::from_str(&contents).unwrap_or_else(|e| {
        log::warn!("local stations {} are malformed, ignoring them: {e}", path.display());
        BTreeMap::new()
    })
}

fn read_cache(path: &Path) -> Option<CacheFile> {
    let contents = fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents)
        .map_err(|e| log::warn!("radio cache {} is malformed: {e}", path.display()))
        .ok()
}

fn write_cache(path: &Path, stations: &Catalog, now: DateTime<Utc>) -> Result<(), RadioError> {
    let io_err = |source| RadioError::Io {
        path: path.to_path_buf(),
        source,
    };
    let contents = serde_json::to_string(&CacheFile {
        stations: stations.clone(),
        last_update: now.timestamp(),
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, contents).map_err(io_err)
}

/// The station catalog as of `now`.
///
/// A cache younger than a week is used as is. Otherwise every country is fetched again; failed
/// countries count as empty. If every fetch failed the old cache is kept whatever its age, and
/// without one only the local stations are returned.
pub fn load_catalog(source: &impl StationSource, paths: &RadioPaths, now: DateTime<Utc>) -> Catalog {
    let cache = read_cache(&paths.cache);
    if let Some(cache) = &cache {
        if now.timestamp() - cache.last_update < CACHE_LIFETIME_SECS {
            return cache.stations.clone();
        }
    }

    let mut any_fetched = false;
    let fetched = COUNTRIES
        .iter()
        .map(|&country| {
            let stations = source.fetch(country).unwrap_or_else(|e| {
                log::warn!("no stations for {country}: {e}");
                Vec::new()
            });
            any_fetched |= !stations.is_empty();
            (country.to_string(), stations)
        })
        .collect();

    if !any_fetched {
        if let Some(cache) = cache {
            log::info!("radio-browser unreachable, keeping the old station list");
            return cache.stations;
        }
    }

    let catalog = merge(fetched, load_local(&paths.local));
    // an offline run shouldn't pin an empty list for a week
    if any_fetched {
        if let Err(e) = write_cache(&paths.cache, &catalog, now) {
            log::warn!("{e}");
        }
    }
    catalog
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::TimeZone;

    use super::*;

    fn raw(name: &str, url: &str) -> RawStation {
        RawStation {
            name: Some(name.to_string()),
            country: None,
            url: Some(url.to_string()),
        }
    }

    /// hands out the same stations for every country, counting calls
    struct Canned {
        stations: Vec<RawStation>,
        calls: Cell<usize>,
        fail: bool,
    }

    impl Canned {
        fn new(stations: Vec<RawStation>) -> Self {
            Self {
                stations,
                calls: Cell::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(Vec::new())
            }
        }
    }

    impl StationSource for Canned {
        fn fetch(&self, country: &str) -> Result<Vec<RawStation>, RadioError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(RadioError::Io {
                    path: PathBuf::from(country),
                    source: io::Error::other("offline"),
                });
            }
            Ok(self.stations.clone())
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).single().expect("valid datetime")
    }

    #[test]
    fn first_name_wins_and_nameless_are_dropped() {
        let stations = vec![
            raw("kan 88", "http://first"),
            RawStation::default(),
            raw("", "http://empty"),
            raw("BBC Radio 1", "http://bbc"),
            raw("kan 88", "http://second"),
        ];
        let unique = dedupe_and_sort(stations);
        assert_eq!(
            unique,
            [
                Station {
                    country: String::new(),
                    name: "BBC Radio 1".to_string(),
                    url: "http://bbc".to_string(),
                },
                Station {
                    country: String::new(),
                    name: "kan 88".to_string(),
                    url: "http://first".to_string(),
                },
            ]
        );
    }

    #[test]
    fn local_stations_join_their_country() {
        let fetched = vec![
            ("Israel".to_string(), vec![raw("b", "http://b")]),
            ("Canada".to_string(), vec![raw("CBC", "http://cbc")]),
        ];
        let local = BTreeMap::from([
            ("Israel".to_string(), vec![raw("A", "http://a"), raw("b", "http://local-b")]),
            ("France".to_string(), vec![raw("FIP", "http://fip")]),
        ]);
        let catalog = merge(fetched, local);

        assert_eq!(
            catalog.keys().map(String::as_str).collect::<Vec<_>>(),
            ["Canada", "France", "Israel"]
        );
        let israel: Vec<_> = catalog["Israel"].iter().map(|s| (s.name.as_str(), s.url.as_str())).collect();
        assert_eq!(israel, [("A", "http://a"), ("b", "http://b")]);
    }

    #[test]
    fn fresh_cache_skips_fetching() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = RadioPaths::in_dir(dir.path());
        let source = Canned::new(vec![raw("Galgalatz", "http://glz")]);

        let first = load_catalog(&source, &paths, day(1));
        assert_eq!(source.calls.get(), COUNTRIES.len());
        assert_eq!(first.len(), COUNTRIES.len());
        assert!(paths.cache.exists());

        let again = load_catalog(&source, &paths, day(7));
        assert_eq!(source.calls.get(), COUNTRIES.len());
        assert_eq!(again, first);

        // a week later the cache is stale
        load_catalog(&source, &paths, day(8));
        assert_eq!(source.calls.get(), 2 * COUNTRIES.len());
    }

    #[test]
    fn unreachable_source_keeps_stale_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = RadioPaths::in_dir(dir.path());
        let first = load_catalog(&Canned::new(vec![raw("Galgalatz", "http://glz")]), &paths, day(1));

        let offline = Canned::failing();
        assert_eq!(load_catalog(&offline, &paths, day(20)), first);
        assert_eq!(offline.calls.get(), COUNTRIES.len());
    }

    #[test]
    fn unreachable_source_without_cache_uses_local_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = RadioPaths::in_dir(dir.path());
        fs::write(
            &paths.local,
            r#"{"Israel": [{"name": "Kan Bet", "url": "http://kan", "country": "Israel"}]}"#,
        )
        .expect("write");

        let catalog = load_catalog(&Canned::failing(), &paths, day(1));
        assert_eq!(catalog["Israel"].len(), 1);
        assert_eq!(catalog["Israel"][0].name, "Kan Bet");
        assert!(catalog["Canada"].is_empty());
        assert!(!paths.cache.exists());
    }

    #[test]
    fn radio_browser_fields_are_picked_out() {
        let json = r#"[{"changeuuid": "x", "name": "Kan 88", "url": "http://kan88",
            "country": "Israel", "votes": 12, "tags": "news"}, {"url": "http://anon"}]"#;
        let stations: Vec<RawStation> = serde_json::from_str(json).expect("parse");
        let unique = dedupe_and_sort(stations);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].country, "Israel");
    }
}
