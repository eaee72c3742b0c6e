//! Short-lived cache of form metadata.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use super::types::Form;

/// Default time-to-live for cached form metadata
pub const DEFAULT_TTL_SECS: u64 = 300;

/// One complete set of forms as returned by a single refresh.
#[derive(Debug, Default)]
struct FormSnapshot {
  /// Forms in upstream order
  forms: Vec<Form>,
  /// link_name -> position in `forms`
  index: HashMap<String, usize>,
  refreshed_at: Option<DateTime<Utc>>,
}

impl FormSnapshot {
  fn build(forms: Vec<Form>, refreshed_at: DateTime<Utc>) -> Self {
    let mut ordered: Vec<Form> = Vec::with_capacity(forms.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(forms.len());

    for form in forms {
      match index.get(&form.link_name) {
        // Duplicate link name in one batch: the later form wins
        Some(&pos) => ordered[pos] = form,
        None => {
          index.insert(form.link_name.clone(), ordered.len());
          ordered.push(form);
        }
      }
    }

    Self {
      forms: ordered,
      index,
      refreshed_at: Some(refreshed_at),
    }
  }
}

/// Form metadata cache with a fixed TTL.
///
/// A refresh replaces the snapshot as a whole; entries are never merged.
#[derive(Debug)]
pub struct MetadataCache {
  snapshot: FormSnapshot,
  ttl: Duration,
}

impl MetadataCache {
  pub fn new(ttl_secs: u64) -> Self {
    Self {
      snapshot: FormSnapshot::default(),
      // Out-of-range TTLs saturate to "never stale"
      ttl: i64::try_from(ttl_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX),
    }
  }

  /// True if the cache was never filled or is older than the TTL.
  pub fn needs_refresh(&self) -> bool {
    self.needs_refresh_at(Utc::now())
  }

  pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
    match self.snapshot.refreshed_at {
      None => true,
      Some(refreshed_at) => now - refreshed_at > self.ttl,
    }
  }

  /// Replace every cached form. No merge with prior entries.
  pub fn update_forms(&mut self, forms: Vec<Form>) {
    self.update_forms_at(forms, Utc::now());
  }

  pub fn update_forms_at(&mut self, forms: Vec<Form>, now: DateTime<Utc>) {
    self.snapshot = FormSnapshot::build(forms, now);
  }

  pub fn get_form(&self, link_name: &str) -> Option<&Form> {
    self
      .snapshot
      .index
      .get(link_name)
      .map(|&pos| &self.snapshot.forms[pos])
  }

  /// All cached forms in upstream order.
  pub fn forms(&self) -> &[Form] {
    &self.snapshot.forms
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::zoho::types::AccessType;

  fn form(link_name: &str, display_name: &str) -> Form {
    Form {
      link_name: link_name.to_string(),
      display_name: display_name.to_string(),
      fields: Vec::new(),
      access_type: AccessType::Read,
      last_modified: Utc::now(),
    }
  }

  #[test]
  fn test_empty_cache_needs_refresh() {
    let cache = MetadataCache::new(300);
    assert!(cache.needs_refresh());
    assert!(cache.needs_refresh_at(Utc::now() - Duration::days(365)));
    assert!(cache.forms().is_empty());
  }

  #[test]
  fn test_fresh_after_update_then_stale_after_ttl() {
    let mut cache = MetadataCache::new(300);
    let t0 = Utc::now();
    cache.update_forms_at(vec![form("a", "A")], t0);

    assert!(!cache.needs_refresh_at(t0));
    assert!(!cache.needs_refresh_at(t0 + Duration::seconds(300)));
    assert!(cache.needs_refresh_at(t0 + Duration::seconds(301)));
  }

  #[test]
  fn test_update_forms_is_fresh_now() {
    let mut cache = MetadataCache::new(60);
    cache.update_forms(vec![form("a", "A")]);
    assert!(!cache.needs_refresh());
  }

  #[test]
  fn test_huge_ttl_never_goes_stale() {
    let mut cache = MetadataCache::new(10_000_000_000_000_000);
    let t0 = Utc::now();
    cache.update_forms_at(vec![form("a", "A")], t0);
    assert!(!cache.needs_refresh_at(t0 + Duration::days(365 * 1000)));

    let mut cache = MetadataCache::new(u64::MAX);
    cache.update_forms_at(vec![form("a", "A")], t0);
    assert!(!cache.needs_refresh_at(t0 + Duration::days(365 * 1000)));
  }

  #[test]
  fn test_replacement_is_total() {
    let mut cache = MetadataCache::new(300);
    cache.update_forms(vec![form("a", "A"), form("b", "B")]);
    cache.update_forms(vec![form("b", "B2"), form("c", "C")]);

    assert!(cache.get_form("a").is_none());
    assert_eq!(cache.get_form("b").unwrap().display_name, "B2");
    assert!(cache.get_form("c").is_some());
    assert_eq!(cache.forms().len(), 2);
  }

  #[test]
  fn test_get_form_is_exact_match() {
    let mut cache = MetadataCache::new(300);
    cache.update_forms(vec![form("Orders", "Orders")]);
    assert!(cache.get_form("orders").is_none());
    assert!(cache.get_form("Order").is_none());
    assert!(cache.get_form("Orders").is_some());
  }

  #[test]
  fn test_duplicate_link_name_last_wins() {
    let mut cache = MetadataCache::new(300);
    cache.update_forms(vec![form("a", "first"), form("b", "B"), form("a", "second")]);

    assert_eq!(cache.forms().len(), 2);
    assert_eq!(cache.forms()[0].display_name, "second");
    assert_eq!(cache.get_form("a").unwrap().display_name, "second");
  }
}
