//! USDB HTTP client

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::parse::{self, DATASET_NOT_FOUND, LOGIN_INVALID, NOT_LOGGED_IN};
use super::{BASE_URL, MetadataFetcher, SongDetails, UsdbError, UsdbSong};
use crate::library::SongId;

const TIMEOUT: Duration = Duration::from_secs(10);
const MAX_SONG_ID: u32 = 100_000;
const SONGS_PER_PAGE: usize = 100;

/// USDB account
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy)]
enum Page {
    Details(SongId),
    Txt(SongId),
    /// Song list ordered by descending id, starting at the given offset
    List { start: u32 },
}

/// HTTP client for the USDB website, keeping the login session in a cookie store
pub struct UsdbClient {
    http_client: Mutex<Client>,
    credentials: Option<Credentials>,
}

impl UsdbClient {
    /// Create a new client; pages requiring login fail without credentials
    pub fn new(credentials: Option<Credentials>) -> Result<Self, UsdbError> {
        Ok(Self {
            http_client: Mutex::new(Self::build_http_client()?),
            credentials,
        })
    }

    fn build_http_client() -> Result<Client, UsdbError> {
        Ok(Client::builder()
            .user_agent(concat!("karaoke-sync/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .timeout(TIMEOUT)
            .build()?)
    }

    /// Log in with the configured credentials; false if USDB rejected them
    pub async fn login(&self) -> Result<bool, UsdbError> {
        let Some(credentials) = &self.credentials else {
            warn!("Not logged in to USDB. Run `karaoke-sync auth` to store your credentials.");
            return Ok(false);
        };

        let client = self.http_client.lock().await.clone();
        let response = client
            .post(BASE_URL)
            .form(&[
                ("user", credentials.username.as_str()),
                ("pass", credentials.password.as_str()),
                ("login", "Login"),
            ])
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;

        if text.contains(LOGIN_INVALID) {
            warn!("Login to USDB with user '{}' failed!", credentials.username);
            return Ok(false);
        }
        info!("Successfully logged in to USDB with user '{}'.", credentials.username);
        Ok(true)
    }

    fn request(client: &Client, page: Page) -> RequestBuilder {
        let url = format!("{}index.php", BASE_URL);
        match page {
            Page::Details(song_id) => client
                .get(url)
                .query(&[("link", "detail"), ("id", song_id.value().to_string().as_str())]),
            Page::Txt(song_id) => client
                .post(url)
                .query(&[("link", "gettxt"), ("id", song_id.value().to_string().as_str())])
                .form(&[("wd", "1")]),
            Page::List { start } => client
                .post(url)
                .query(&[("link", "list")])
                .form(&[
                    ("order", "id".to_string()),
                    ("ud", "desc".to_string()),
                    ("limit", SONGS_PER_PAGE.to_string()),
                    ("start", start.to_string()),
                ]),
        }
    }

    async fn get_page_once(&self, page: Page) -> Result<String, UsdbError> {
        let client = self.http_client.lock().await.clone();
        debug!("Requesting USDB page {:?}", page);
        let text = Self::request(&client, page)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        if text.contains(NOT_LOGGED_IN) {
            return Err(UsdbError::AuthRequired);
        }
        if text.contains(DATASET_NOT_FOUND) {
            return Err(UsdbError::NotFound);
        }
        Ok(text)
    }

    /// Fetch a page, retrying once after a dropped connection or an expired login
    async fn get_page(&self, page: Page) -> Result<String, UsdbError> {
        match self.get_page_once(page).await {
            Err(e) if e.is_connection() => {
                debug!("Connection failed; session may have expired; retrying ...");
                *self.http_client.lock().await = Self::build_http_client()?;
            }
            Err(UsdbError::AuthRequired) if self.credentials.is_some() => {
                debug!("Page {:?} is private; trying to log in ...", page);
                if !self.login().await? {
                    return Err(UsdbError::AuthRequired);
                }
            }
            result => return result,
        }
        self.get_page_once(page).await
    }
}

#[async_trait]
impl MetadataFetcher for UsdbClient {
    async fn song_details(&self, song_id: SongId) -> Result<SongDetails, UsdbError> {
        let html = self.get_page(Page::Details(song_id)).await?;
        parse::parse_song_page(&html, song_id)
    }

    async fn song_txt(&self, song_id: SongId) -> Result<String, UsdbError> {
        debug!("Fetching notes");
        let html = self.get_page(Page::Txt(song_id)).await?;
        parse::parse_song_txt(&html)
    }

    async fn available_songs(&self, max_skip_id: SongId) -> Result<Vec<UsdbSong>, UsdbError> {
        let mut songs = Vec::new();
        for start in (0..MAX_SONG_ID).step_by(SONGS_PER_PAGE) {
            let html = self.get_page(Page::List { start }).await?;
            let new: Vec<UsdbSong> = parse::parse_song_list(&html)
                .into_iter()
                .filter(|song| song.song_id > max_skip_id)
                .collect();
            let last_page = new.len() < SONGS_PER_PAGE;
            songs.extend(new);
            if last_page {
                break;
            }
        }
        info!("Fetched {} new song(s) from USDB.", songs.len());
        Ok(songs)
    }
}
