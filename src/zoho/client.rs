use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};
use crate::zoho::api_types::{
  into_record, ApiField, ApiFieldsResponse, ApiFormsResponse, ApiRecordResponse,
  ApiRecordsResponse, ApiReportsResponse,
};
use crate::zoho::auth::Authorizer;
use crate::zoho::cache::MetadataCache;
use crate::zoho::types::{Form, Record, Report};

/// Build the HTTP connection pool shared by the API client and the authorizer.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
  reqwest::Client::builder()
    .timeout(timeout)
    .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
    .build()
    .map_err(|e| Error::upstream("http client", None, e.to_string()))
}

/// Zoho Creator API client.
///
/// Holds one pooled `reqwest::Client` for its whole lifetime; requests borrow
/// connections from the pool and the pool is only dropped by [`close`].
///
/// [`close`]: ZohoClient::close
pub struct ZohoClient {
  http: reqwest::Client,
  base_url: Url,
  auth: Arc<dyn Authorizer>,
  cache: RwLock<MetadataCache>,
}

impl ZohoClient {
  pub fn new(
    http: reqwest::Client,
    base_url: Url,
    auth: Arc<dyn Authorizer>,
    cache_ttl_secs: u64,
  ) -> Result<Self> {
    if base_url.cannot_be_a_base() {
      return Err(Error::upstream(
        base_url.as_str(),
        None,
        "base URL cannot carry a path",
      ));
    }

    Ok(Self {
      http,
      base_url,
      auth,
      cache: RwLock::new(MetadataCache::new(cache_ttl_secs)),
    })
  }

  /// List forms with their fields, served from cache while it is fresh.
  ///
  /// A refresh fetches the form list and then each form's fields one by one.
  /// The cache is only replaced once every fetch succeeded.
  pub async fn list_forms(&self, force_refresh: bool) -> Result<Vec<Form>> {
    if !force_refresh {
      let cache = self.read_cache();
      if !cache.needs_refresh() {
        return Ok(cache.forms().to_vec());
      }
    }

    let url = self.endpoint(&["forms"]);
    let (_, response): (_, ApiFormsResponse) = self.send_json(self.http.get(url.clone()), &url).await?;

    let mut forms = Vec::with_capacity(response.forms.len());
    for api_form in response.forms {
      let fields = self.get_form_fields(&api_form.link_name).await?;
      forms.push(api_form.into_form(fields));
    }

    self.write_cache().update_forms(forms.clone());
    tracing::info!(count = forms.len(), "refreshed form metadata");

    Ok(forms)
  }

  async fn get_form_fields(&self, form_link_name: &str) -> Result<Vec<ApiField>> {
    let url = self.endpoint(&["forms", form_link_name, "fields"]);
    let (_, response): (_, ApiFieldsResponse) = self.send_json(self.http.get(url.clone()), &url).await?;
    Ok(response.fields)
  }

  /// Look up one form by exact link name among the (cache-aware) form list.
  pub async fn find_form(&self, link_name: &str) -> Result<Option<Form>> {
    {
      let cache = self.read_cache();
      if !cache.needs_refresh() {
        return Ok(cache.get_form(link_name).cloned());
      }
    }

    let forms = self.list_forms(true).await?;
    Ok(forms.into_iter().find(|f| f.link_name == link_name))
  }

  /// List reports. Reports are not cached.
  pub async fn list_reports(&self) -> Result<Vec<Report>> {
    let url = self.endpoint(&["reports"]);
    let (_, response): (_, ApiReportsResponse) = self.send_json(self.http.get(url.clone()), &url).await?;
    Ok(response.reports.into_iter().map(Report::from).collect())
  }

  /// Get records of a form. `criteria` is handed to Zoho unchanged.
  pub async fn get_records(
    &self,
    form_link_name: &str,
    criteria: Option<&str>,
    limit: Option<u32>,
  ) -> Result<Vec<Record>> {
    let url = self.endpoint(&["forms", form_link_name, "records"]);

    let mut query: Vec<(&str, String)> = Vec::new();
    if let Some(criteria) = criteria.filter(|c| !c.is_empty()) {
      query.push(("criteria", criteria.to_string()));
    }
    if let Some(limit) = limit.filter(|l| *l > 0) {
      query.push(("limit", limit.to_string()));
    }

    let request = self.http.get(url.clone()).query(&query);
    let (status, response): (_, ApiRecordsResponse) = self.send_json(request, &url).await?;

    response
      .records
      .into_iter()
      .map(|raw| {
        into_record(form_link_name, raw, None, None)
          .map_err(|e| Error::upstream(url.as_str(), Some(status), e.to_string()))
      })
      .collect()
  }

  /// Get a single record by id.
  pub async fn get_record(&self, form_link_name: &str, record_id: &str) -> Result<Record> {
    let url = self.endpoint(&["forms", form_link_name, "records", record_id]);
    let (status, response): (_, ApiRecordResponse) = self.send_json(self.http.get(url.clone()), &url).await?;

    into_record(form_link_name, response.record, Some(record_id), None)
      .map_err(|e| Error::upstream(url.as_str(), Some(status), e.to_string()))
  }

  /// Create a record. The returned record carries the data that was sent,
  /// not whatever Zoho echoes back.
  pub async fn create_record(&self, form_link_name: &str, data: Map<String, Value>) -> Result<Record> {
    let url = self.endpoint(&["forms", form_link_name, "records"]);
    self
      .write_record(Method::POST, url, form_link_name, None, data)
      .await
  }

  /// Update a record. Same data policy as [`ZohoClient::create_record`].
  pub async fn update_record(
    &self,
    form_link_name: &str,
    record_id: &str,
    data: Map<String, Value>,
  ) -> Result<Record> {
    let url = self.endpoint(&["forms", form_link_name, "records", record_id]);
    self
      .write_record(Method::PATCH, url, form_link_name, Some(record_id), data)
      .await
  }

  async fn write_record(
    &self,
    method: Method,
    url: Url,
    form_link_name: &str,
    record_id: Option<&str>,
    data: Map<String, Value>,
  ) -> Result<Record> {
    let body = json!({ "data": &data });
    let request = self.http.request(method, url.clone()).json(&body);
    let (status, response): (_, ApiRecordResponse) = self.send_json(request, &url).await?;

    into_record(form_link_name, response.record, record_id, Some(data))
      .map_err(|e| Error::upstream(url.as_str(), Some(status), e.to_string()))
  }

  /// Release the connection pool and the authorizer.
  pub async fn close(self) {
    self.auth.close().await;
    drop(self.http);
    tracing::info!("closed Zoho API client");
  }

  // ==========================================================================
  // Internals
  // ==========================================================================

  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    // Checked in new(): the base URL can carry a path
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  /// Send an authorized request and decode a JSON body.
  /// Returns the response status alongside the body.
  async fn send_json<T: DeserializeOwned>(
    &self,
    request: RequestBuilder,
    url: &Url,
  ) -> Result<(u16, T)> {
    let endpoint = url.as_str();
    let headers = self.auth.authorized_headers().await?;

    tracing::debug!(endpoint, "sending Zoho request");
    let response = request.headers(headers).send().await.map_err(|e| {
      tracing::warn!(endpoint, error = %e, "Zoho request failed");
      Error::upstream(endpoint, e.status().map(|s| s.as_u16()), e.to_string())
    })?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      tracing::warn!(endpoint, status = status.as_u16(), "Zoho returned an error status");
      return Err(Error::upstream(endpoint, Some(status.as_u16()), body));
    }

    let bytes = response
      .bytes()
      .await
      .map_err(|e| Error::upstream(endpoint, Some(status.as_u16()), e.to_string()))?;

    let body = serde_json::from_slice(&bytes).map_err(|e| {
      tracing::warn!(endpoint, error = %e, "malformed Zoho response body");
      Error::upstream(
        endpoint,
        Some(status.as_u16()),
        format!("malformed response body: {}", e),
      )
    })?;

    Ok((status.as_u16(), body))
  }

  fn read_cache(&self) -> RwLockReadGuard<'_, MetadataCache> {
    self.cache.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write_cache(&self) -> RwLockWriteGuard<'_, MetadataCache> {
    self.cache.write().unwrap_or_else(PoisonError::into_inner)
  }
}
