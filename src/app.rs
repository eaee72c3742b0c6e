use color_eyre::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;

use crate::config::Config;
use crate::server;
use crate::zoho::auth::{Authorizer, OAuthRefresher, StaticToken};
use crate::zoho::client::{build_http_client, ZohoClient};

/// Server context shared by every request handler
pub struct App {
  client: ZohoClient,
}

impl App {
  pub fn new(config: &Config) -> Result<Self> {
    let http = build_http_client(Duration::from_secs(config.http.timeout_secs))?;

    let auth: Arc<dyn Authorizer> = match Config::get_access_token() {
      Some(token) => {
        tracing::info!("using static access token from ZOHO_ACCESS_TOKEN");
        Arc::new(StaticToken::new(token))
      }
      None => Arc::new(OAuthRefresher::new(
        http.clone(),
        &config.accounts_url()?,
        config.client_id()?,
        Config::get_client_secret()?,
        Config::get_refresh_token()?,
      )?),
    };

    let base_url = config.api_base_url()?;
    tracing::info!(base_url = %base_url, ttl_secs = config.cache.ttl_secs, "configured Zoho client");

    let client = ZohoClient::new(http, base_url, auth, config.cache.ttl_secs)?;
    Ok(Self::from_client(client))
  }

  pub fn from_client(client: ZohoClient) -> Self {
    Self { client }
  }

  pub fn client(&self) -> &ZohoClient {
    &self.client
  }

  /// Serve MCP requests over stdin/stdout until stdin closes.
  pub async fn run(&self) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    server::serve(self, reader, tokio::io::stdout()).await?;
    Ok(())
  }

  pub async fn shutdown(self) {
    self.client.close().await;
  }
}
