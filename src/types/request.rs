use serde::{Deserialize, Serialize};

use crate::core::error::Error;

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginData {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterData {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub(crate) refresh: &'a str,
}

/// Query accepted by the subscription listing.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SubscriptionFilter {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_cycle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_renewal_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_renewal_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,
}

impl SubscriptionFilter {
    /// Encodes the filter as a query string, starting from page 1 and
    /// dropping empty values.
    pub fn to_query(&self) -> Result<String, Error> {
        let mut filter = self.clone();

        for value in [
            &mut filter.billing_cycle,
            &mut filter.max_price,
            &mut filter.min_price,
            &mut filter.max_renewal_date,
            &mut filter.min_renewal_date,
            &mut filter.service_name,
            &mut filter.active,
        ] {
            if value.as_deref().is_some_and(str::is_empty) {
                *value = None;
            }
        }

        if filter.page.as_deref().is_none_or(str::is_empty) {
            filter.page = Some("1".to_string());
        }

        Ok(serde_urlencoded::to_string(filter)?)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdQuery {
    pub(crate) id: Option<String>,
}

impl IdQuery {
    pub(crate) fn require(self) -> Result<String, Error> {
        self.id.filter(|id| !id.is_empty()).ok_or(Error::MissingId)
    }
}

/// Backend path of one subscription. Ids are a single path segment of
/// ASCII letters, digits, `-` and `_`.
pub(crate) fn subscription_path(id: &str) -> Result<String, Error> {
    if id.is_empty() {
        return Err(Error::MissingId);
    }

    if !id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(Error::InvalidId(id.to_string()));
    }

    Ok(format!("subscriptions/{id}/"))
}
