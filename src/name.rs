//! FQDN normalization and zone suffix arithmetic.
//!
//! Every name that enters the store or the resolver goes through
//! [`normalize_name`]: lowercased, whitespace-trimmed, and terminated with a
//! trailing dot. The empty string normalizes to the root (`"."`).

use std::str::FromStr;

use trust_dns_proto::rr::Name;

use crate::error::Error;

/// Lowercase, trim, and FQDN-terminate a DNS name.
pub fn normalize_name(name: &str) -> String {
    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() {
        return ".".to_string();
    }
    if name.ends_with('.') {
        name
    } else {
        format!("{name}.")
    }
}

/// Normalize a list of names, dropping entries that normalize to the root.
pub fn normalize_names(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|n| normalize_name(n))
        .filter(|n| n != ".")
        .collect()
}

/// Label-wise suffix test: is `name` equal to, or a subdomain of, `zone`?
///
/// Both arguments must already be normalized FQDNs.
pub fn zone_contains(zone: &str, name: &str) -> bool {
    if zone == "." {
        return true;
    }
    name == zone || name.ends_with(&format!(".{zone}"))
}

/// Number of labels in a normalized FQDN (the root has zero).
pub fn label_count(fqdn: &str) -> usize {
    fqdn.split('.').filter(|l| !l.is_empty()).count()
}

/// All but the leftmost label of a normalized FQDN. Names with one label or
/// fewer fall back to the name itself.
pub fn parent_zone(fqdn: &str) -> String {
    let fqdn = normalize_name(fqdn);
    match fqdn.split_once('.') {
        Some((_, rest)) if label_count(rest) >= 1 => normalize_name(rest),
        _ => fqdn,
    }
}

/// Validate that an API-supplied name parses as a DNS name and is not root.
///
/// Returns the normalized FQDN form.
pub fn validate_name(name: &str) -> Result<String, Error> {
    let normalized = normalize_name(name);
    if normalized == "." {
        return Err(Error::Validation("missing record name".to_string()));
    }
    Name::from_str(&normalized)
        .map_err(|_| Error::Validation(format!("invalid DNS name \"{name}\"")))?;
    Ok(normalized)
}
