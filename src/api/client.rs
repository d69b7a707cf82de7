use crate::api::parser;
use crate::api::{ApiError, BulletinApi, ProductDownload, RerunReceipt};
use crate::app::BulletinSummary;
use crate::log::LogDocument;
use async_trait::async_trait;
use chrono::Local;
use color_eyre::eyre::{eyre, Result};
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::{Client, Response, Url};
use tracing::debug;

/// [`BulletinApi`] over HTTP. No request timeout is set beyond reqwest's defaults.
#[derive(Clone)]
pub struct HttpApi {
    http: Client,
    base: Url,
}

impl HttpApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| eyre!("Invalid API URL '{base_url}': {e}"))?;
        if base.cannot_be_a_base() {
            return Err(eyre!("Invalid API URL '{base_url}': not a base URL"));
        }
        let http = Client::builder()
            .user_agent(concat!("bw/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {e}"))?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// `{base}/api/bulletins[/{id}[/{action}]]`, with each segment percent-encoded.
    fn endpoint(&self, tail: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Network(format!("invalid base URL {}", self.base)))?
            .pop_if_empty()
            .extend(["api", "bulletins"])
            .extend(tail);
        Ok(url)
    }

    /// Passes 2xx responses through; turns anything else into [`ApiError::Api`].
    async fn check(resp: Response) -> Result<Response, ApiError> {
        Self::check_with(resp, |_| None).await
    }

    /// Like [`Self::check`], but lets `classify` claim a non-2xx body first.
    async fn check_with(
        resp: Response,
        classify: impl FnOnce(&str) -> Option<ApiError>,
    ) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(classify(&body).unwrap_or_else(|| {
            parser::error_from_body(status.as_u16(), status.canonical_reason(), &body)
        }))
    }
}

#[async_trait]
impl BulletinApi for HttpApi {
    async fn list_bulletins(&self) -> Result<Vec<BulletinSummary>, ApiError> {
        let url = self.endpoint(&[])?;
        debug!(%url, "GET bulletins");
        let resp = Self::check(self.http.get(url).send().await?).await?;
        parser::parse_bulletins(&resp.text().await?)
    }

    async fn rerun(&self, id: &str) -> Result<RerunReceipt, ApiError> {
        let url = self.endpoint(&[id, "rerun"])?;
        debug!(%url, "POST rerun");
        let resp = self.http.post(url).send().await?;
        let resp = Self::check_with(resp, parser::rerun_rejection).await?;
        parser::parse_rerun(&resp.text().await?)
    }

    async fn fetch_full_log(&self, id: &str) -> Result<LogDocument, ApiError> {
        let url = self.endpoint(&[id, "full_log"])?;
        debug!(%url, "GET full log");
        let resp = Self::check(self.http.get(url).send().await?).await?;
        parser::parse_full_log(id, &resp.text().await?)
    }

    async fn download_product(&self, id: &str, index: usize) -> Result<ProductDownload, ApiError> {
        let url = self.endpoint(&[id, "download_product"])?;
        debug!(%url, index, "GET product");
        let resp = self
            .http
            .get(url)
            .query(&[("index", index)])
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let disposition = resp
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let file_name =
            parser::product_file_name(disposition.as_deref(), id, Local::now().date_naive());
        let bytes = resp.bytes().await?.to_vec();
        Ok(ProductDownload { file_name, bytes })
    }
}
