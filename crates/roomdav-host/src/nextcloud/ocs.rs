//! Group, user, and preference operations over the OCS provisioning API.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::error::{HostError, HostResult};
use crate::store::{GroupStore, PreferenceStore, UserDirectory};

use super::NextcloudHost;

const OCS_OK: i64 = 100;
const OCS_EXISTS: i64 = 102;

#[derive(Debug, Deserialize)]
struct OcsEnvelope<T> {
    ocs: OcsBody<T>,
}

#[derive(Debug, Deserialize)]
struct OcsBody<T> {
    meta: OcsMeta,
    data: T,
}

#[derive(Debug, Deserialize)]
struct OcsMeta {
    statuscode: i64,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroupListData {
    #[serde(default)]
    groups: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GroupMembersData {
    #[serde(default)]
    users: Vec<String>,
}

impl NextcloudHost {
    /// Sends an OCS request and unwraps the JSON envelope without judging the
    /// OCS status code; callers decide what each code means. The data payload
    /// is ignored (the host serializes it as either an object or an array).
    async fn ocs_call(
        &self,
        operation: &'static str,
        method: reqwest::Method,
        url: &str,
        form: &[(&str, &str)],
    ) -> HostResult<(i64, Option<String>)> {
        let mut request = self
            .request(method, url)
            .header("OCS-APIRequest", "true")
            .query(&[("format", "json")]);
        if !form.is_empty() {
            request = request.form(form);
        }
        let response = request.send().await?;
        Self::check_status(operation, response.status())?;
        let envelope: OcsEnvelope<serde_json::Value> = response.json().await?;
        Ok((envelope.ocs.meta.statuscode, envelope.ocs.meta.message))
    }
}

#[async_trait]
impl GroupStore for NextcloudHost {
    async fn group_exists(&self, group_id: &str) -> HostResult<bool> {
        let url = self.ocs_url("groups");
        let response = self
            .request(reqwest::Method::GET, &url)
            .header("OCS-APIRequest", "true")
            .query(&[("format", "json"), ("search", group_id)])
            .send()
            .await?;
        Self::check_status("group_exists", response.status())?;
        let envelope: OcsEnvelope<GroupListData> = response.json().await?;
        Ok(envelope
            .ocs
            .data
            .groups
            .iter()
            .any(|g| g == group_id))
    }

    async fn create_group(&self, group_id: &str) -> HostResult<bool> {
        let url = self.ocs_url("groups");
        let (statuscode, message) = self
            .ocs_call("create_group", reqwest::Method::POST, &url, &[("groupid", group_id)])
            .await?;
        if statuscode == OCS_EXISTS {
            warn!(group_id, "group already exists on host");
            return Ok(true);
        }
        if statuscode != OCS_OK {
            warn!(group_id, statuscode, message = message.as_deref().unwrap_or(""), "host refused group creation");
        }
        Ok(statuscode == OCS_OK)
    }

    async fn delete_group(&self, group_id: &str) -> HostResult<bool> {
        let url = self.ocs_url(&format!("groups/{group_id}"));
        let (statuscode, message) = self
            .ocs_call("delete_group", reqwest::Method::DELETE, &url, &[])
            .await?;
        if statuscode != OCS_OK {
            warn!(group_id, statuscode, message = message.as_deref().unwrap_or(""), "host refused group deletion");
        }
        Ok(statuscode == OCS_OK)
    }

    async fn set_group_display_name(&self, group_id: &str, display_name: &str) -> HostResult<()> {
        let url = self.ocs_url(&format!("groups/{group_id}"));
        let (statuscode, message) = self
            .ocs_call(
                "set_group_display_name",
                reqwest::Method::PUT,
                &url,
                &[("key", "displayname"), ("value", display_name)],
            )
            .await?;
        if statuscode != OCS_OK {
            warn!(group_id, statuscode, message = message.as_deref().unwrap_or(""), "host did not apply group display name");
        }
        Ok(())
    }

    async fn group_members(&self, group_id: &str) -> HostResult<Option<Vec<String>>> {
        let url = self.ocs_url(&format!("groups/{group_id}"));
        let response = self
            .request(reqwest::Method::GET, &url)
            .header("OCS-APIRequest", "true")
            .query(&[("format", "json")])
            .send()
            .await?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        Self::check_status("group_members", response.status())?;
        let envelope: OcsEnvelope<GroupMembersData> = response.json().await?;
        if envelope.ocs.meta.statuscode == OCS_OK {
            Ok(Some(envelope.ocs.data.users))
        } else {
            Ok(None)
        }
    }

    async fn add_member(&self, group_id: &str, user_id: &str) -> HostResult<()> {
        let url = self.ocs_url(&format!("users/{user_id}/groups"));
        let (statuscode, message) = self
            .ocs_call("add_member", reqwest::Method::POST, &url, &[("groupid", group_id)])
            .await?;
        if statuscode != OCS_OK {
            warn!(group_id, user_id, statuscode, message = message.as_deref().unwrap_or(""), "host did not add group member");
        }
        Ok(())
    }

    async fn remove_member(&self, group_id: &str, user_id: &str) -> HostResult<()> {
        let url = self.ocs_url(&format!("users/{user_id}/groups"));
        let (statuscode, message) = self
            .ocs_call("remove_member", reqwest::Method::DELETE, &url, &[("groupid", group_id)])
            .await?;
        if statuscode != OCS_OK {
            warn!(group_id, user_id, statuscode, message = message.as_deref().unwrap_or(""), "host did not remove group member");
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for NextcloudHost {
    async fn user_exists(&self, user_id: &str) -> HostResult<bool> {
        let url = self.ocs_url(&format!("users/{user_id}"));
        let response = self
            .request(reqwest::Method::GET, &url)
            .header("OCS-APIRequest", "true")
            .query(&[("format", "json")])
            .send()
            .await?;
        if response.status().as_u16() == 404 {
            return Ok(false);
        }
        Self::check_status("user_exists", response.status())?;
        let envelope: OcsEnvelope<serde_json::Value> = response.json().await?;
        Ok(envelope.ocs.meta.statuscode == OCS_OK)
    }
}

#[async_trait]
impl PreferenceStore for NextcloudHost {
    /// Writes a user preference through the provisioning config endpoint.
    /// Requires the service account to carry host admin rights.
    async fn set_preference(
        &self,
        user_id: &str,
        app: &str,
        key: &str,
        value: &str,
    ) -> HostResult<()> {
        let url = format!(
            "{}/ocs/v2.php/apps/provisioning_api/api/v1/config/users/{user_id}/{app}/{key}",
            self.base_url
        );
        let response = self
            .request(reqwest::Method::PUT, &url)
            .header("OCS-APIRequest", "true")
            .query(&[("format", "json")])
            .form(&[("configValue", value)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(HostError::UnexpectedStatus {
                operation: "set_preference",
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}
