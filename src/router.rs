//! `zoho://` resource addresses and their resolution into JSON documents.

use serde::Serialize;
use serde_json::json;
use std::fmt;

use crate::error::{Error, Result};
use crate::zoho::client::ZohoClient;

pub const SCHEME: &str = "zoho";
pub const MIME_JSON: &str = "application/json";

/// A parsed resource address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceAddress {
  /// `zoho://forms`
  Forms,
  /// `zoho://reports`
  Reports,
  /// `zoho://form/{link_name}`
  Form { link_name: String },
  /// `zoho://report/{link_name}[/filter/{criteria}]`
  Report {
    link_name: String,
    criteria: Option<String>,
  },
}

impl ResourceAddress {
  pub fn parse(address: &str) -> Result<Self> {
    let (scheme, rest) = address.split_once("://").unwrap_or(("", address));
    if scheme != SCHEME {
      return Err(Error::UnsupportedScheme(scheme.to_string()));
    }

    let parts: Vec<&str> = rest
      .trim_matches('/')
      .split('/')
      .filter(|p| !p.is_empty())
      .collect();

    let resource_type = *parts.first().ok_or(Error::EmptyPath)?;
    let link_name = || {
      parts
        .get(1)
        .map(|s| s.to_string())
        .ok_or_else(|| Error::MissingLinkName(resource_type.to_string()))
    };

    match resource_type {
      "forms" => Ok(Self::Forms),
      "reports" => Ok(Self::Reports),
      "form" => Ok(Self::Form {
        link_name: link_name()?,
      }),
      "report" => {
        let link_name = link_name()?;
        // Criteria is passed through exactly as written in the address
        let criteria = match (parts.get(2), parts.get(3)) {
          (Some(&"filter"), Some(criteria)) => Some(criteria.to_string()),
          _ => None,
        };
        Ok(Self::Report {
          link_name,
          criteria,
        })
      }
      other => Err(Error::UnknownResourceType(other.to_string())),
    }
  }
}

impl fmt::Display for ResourceAddress {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Forms => write!(f, "{}://forms", SCHEME),
      Self::Reports => write!(f, "{}://reports", SCHEME),
      Self::Form { link_name } => write!(f, "{}://form/{}", SCHEME, link_name),
      Self::Report {
        link_name,
        criteria: None,
      } => write!(f, "{}://report/{}", SCHEME, link_name),
      Self::Report {
        link_name,
        criteria: Some(criteria),
      } => write!(f, "{}://report/{}/filter/{}", SCHEME, link_name, criteria),
    }
  }
}

/// Resolved resource, tagged with the address it was read from
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
  pub uri: String,
  pub mime_type: String,
  pub text: String,
}

/// Entry in the resource listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
  pub uri: String,
  pub name: String,
  pub description: String,
  pub mime_type: String,
}

impl ResourceDescriptor {
  fn new(address: ResourceAddress, name: impl Into<String>, description: impl Into<String>) -> Self {
    Self {
      uri: address.to_string(),
      name: name.into(),
      description: description.into(),
      mime_type: MIME_JSON.to_string(),
    }
  }
}

/// Read the resource at `uri`. Resolves fully or fails; failures are logged
/// here and returned unchanged.
pub async fn read_resource(client: &ZohoClient, uri: &str) -> Result<ResourceContents> {
  let result = async {
    let address = ResourceAddress::parse(uri)?;
    tracing::debug!(uri, ?address, "reading resource");
    resolve(client, &address).await
  }
  .await;

  match result {
    Ok(text) => Ok(ResourceContents {
      uri: uri.to_string(),
      mime_type: MIME_JSON.to_string(),
      text,
    }),
    Err(e) => {
      if e.is_caller_error() {
        tracing::warn!(uri, kind = e.kind(), error = %e, "failed to read resource");
      } else {
        tracing::error!(uri, kind = e.kind(), error = %e, "failed to read resource");
      }
      Err(e)
    }
  }
}

async fn resolve(client: &ZohoClient, address: &ResourceAddress) -> Result<String> {
  let document = match address {
    ResourceAddress::Forms => {
      let forms = client.list_forms(false).await?;
      json!(forms
        .iter()
        .map(|form| json!({
          "link_name": form.link_name,
          "display_name": form.display_name,
          "field_count": form.fields.len(),
        }))
        .collect::<Vec<_>>())
    }
    ResourceAddress::Reports => {
      let reports = client.list_reports().await?;
      json!(reports
        .iter()
        .map(|report| json!({
          "link_name": report.link_name,
          "display_name": report.display_name,
        }))
        .collect::<Vec<_>>())
    }
    ResourceAddress::Form { link_name } => {
      let form = client
        .find_form(link_name)
        .await?
        .ok_or_else(|| Error::not_found("form", link_name.as_str()))?;
      json!({
        "link_name": form.link_name,
        "display_name": form.display_name,
        "fields": form.fields,
      })
    }
    ResourceAddress::Report {
      link_name,
      criteria,
    } => {
      let records = client
        .get_records(link_name, criteria.as_deref(), None)
        .await?;
      json!({
        "report_name": link_name,
        "records": records,
      })
    }
  };

  serde_json::to_string_pretty(&document)
    .map_err(|e| Error::upstream(address.to_string(), None, format!("failed to serialize resource: {}", e)))
}

/// Everything a caller can read: the two collections plus one entry per form
/// and per report.
pub async fn list_resources(client: &ZohoClient) -> Result<Vec<ResourceDescriptor>> {
  let mut resources = vec![
    ResourceDescriptor::new(
      ResourceAddress::Forms,
      "All Forms",
      "List of all available Zoho Creator forms",
    ),
    ResourceDescriptor::new(
      ResourceAddress::Reports,
      "All Reports",
      "List of all available Zoho Creator reports",
    ),
  ];

  let forms = client.list_forms(false).await.inspect_err(|e| {
    tracing::error!(error = %e, "failed to list forms for resource listing");
  })?;
  resources.extend(forms.into_iter().map(|form| {
    let description = format!("Form definition and fields for {}", form.display_name);
    ResourceDescriptor::new(
      ResourceAddress::Form {
        link_name: form.link_name,
      },
      form.display_name,
      description,
    )
  }));

  let reports = client.list_reports().await.inspect_err(|e| {
    tracing::error!(error = %e, "failed to list reports for resource listing");
  })?;
  resources.extend(reports.into_iter().map(|report| {
    let description = format!("Records from {} report", report.display_name);
    ResourceDescriptor::new(
      ResourceAddress::Report {
        link_name: report.link_name,
        criteria: None,
      },
      report.display_name,
      description,
    )
  }));

  Ok(resources)
}
